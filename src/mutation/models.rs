use std::{
    collections::{HashSet, VecDeque},
    fmt::{self, Display},
    sync::{Arc, Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::{error::ConsoleError, string::tail};

/// Identifies what a mutation is scoped to, e.g. `container:abc123` or `pull:nginx`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ResourceKey(String);

impl ResourceKey {
    pub fn new(kind: &str, id: impl Display) -> Self {
        Self(format!("{}:{}", kind, id))
    }

    /// The id part, if this key is of `kind`.
    pub fn id_of(&self, kind: &str) -> Option<&str> {
        self.0.strip_prefix(kind)?.strip_prefix(':')
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Set of resource keys with a mutation in flight.
#[derive(Default)]
pub struct BusyFlags {
    keys: Mutex<HashSet<ResourceKey>>,
}

impl BusyFlags {
    /// Marks `key` busy. Returns `None` if it already is.
    pub fn try_acquire(self: &Arc<Self>, key: ResourceKey) -> Option<BusyGuard> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(BusyGuard {
            flags: Arc::clone(self),
            key,
        })
    }

    pub fn is_busy(&self, key: &ResourceKey) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    pub fn busy_keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

/// Clears its key when dropped.
pub struct BusyGuard {
    flags: Arc<BusyFlags>,
    key: ResourceKey,
}

impl BusyGuard {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flags
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationState {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// Who asked for a collection refresh. Only operator refreshes post a success notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Operator,
}

#[derive(Serialize, Deserialize)]
pub struct KeyState {
    pub key: ResourceKey,
    pub state: MutationState,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
    Info,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub id: Uuid,
    pub level: Level,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Notification {
    fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            detail: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Level::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Failure notice for `error`; engine logs, if any, are cut to their last `log_tail` chars.
    pub fn from_error(error: &ConsoleError, generic: &str, log_tail: usize) -> Self {
        let notification = Self::error(error.report(generic));
        match error.logs() {
            Some(logs) if !logs.is_empty() => notification.with_detail(tail(logs, log_tail)),
            _ => notification,
        }
    }
}

/// Bounded queue of transient notices, oldest evicted first.
pub struct Notifier {
    limit: usize,
    queue: Mutex<VecDeque<Notification>>,
}

impl Notifier {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, notification: Notification) {
        match notification.level {
            Level::Error => log::warn!("{}", notification.message),
            _ => log::info!("{}", notification.message),
        }

        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        while queue.len() >= self.limit {
            queue.pop_front();
        }
        queue.push_back(notification);
    }

    pub fn peek(&self) -> Vec<Notification> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn drain(&self) -> Vec<Notification> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}
