use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use log::debug;

use crate::utils::error::{ConsoleError, ConsoleResult};

use super::{
    models::{BusyFlags, MutationState, Notification, Notifier, ResourceKey},
    store::Store,
};

/// Runs engine mutations under per-key busy flags and turns their outcome into notifications.
pub struct Pipeline {
    busy: Arc<BusyFlags>,
    notifier: Notifier,
    outcomes: Mutex<HashMap<ResourceKey, MutationState>>,
    log_tail: usize,
}

impl Pipeline {
    pub fn new(notification_limit: usize, log_tail: usize) -> Self {
        Self {
            busy: Arc::new(BusyFlags::default()),
            notifier: Notifier::new(notification_limit),
            outcomes: Mutex::new(HashMap::new()),
            log_tail,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn busy(&self) -> &BusyFlags {
        &self.busy
    }

    pub fn notify(&self, notification: Notification) {
        self.notifier.push(notification);
    }

    /// Publishes a failure notice for `error` and hands it back.
    pub fn report(&self, error: ConsoleError, generic: &str) -> ConsoleError {
        self.notify(Notification::from_error(&error, generic, self.log_tail));
        error
    }

    pub fn state(&self, key: &ResourceKey) -> MutationState {
        if self.busy.is_busy(key) {
            return MutationState::Submitting;
        }
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
            .unwrap_or(MutationState::Idle)
    }

    /// Submits `request` for `key`.
    ///
    /// If `key` is already submitting, `request` is dropped unpolled and `Busy` is returned, so
    /// no second request ever leaves for the same key. On success the message built by
    /// `success` is published; on failure a report built from the error, or `failure` when
    /// the engine gave no reason.
    pub async fn submit<T, Fut, S>(
        &self,
        key: ResourceKey,
        failure: &str,
        success: S,
        request: Fut,
    ) -> ConsoleResult<T>
    where
        Fut: Future<Output = ConsoleResult<T>>,
        S: FnOnce(&T) -> String,
    {
        self.submit_with(key, failure, |value| Some(success(value)), request).await
    }

    /// Like [`Pipeline::submit`], but success posts a notice only when `success` returns one.
    /// Failures are always reported.
    pub async fn submit_with<T, Fut, S>(
        &self,
        key: ResourceKey,
        failure: &str,
        success: S,
        request: Fut,
    ) -> ConsoleResult<T>
    where
        Fut: Future<Output = ConsoleResult<T>>,
        S: FnOnce(&T) -> Option<String>,
    {
        let Some(guard) = self.busy.try_acquire(key.clone()) else {
            debug!("Rejected {}: already submitting", key);
            return Err(ConsoleError::Busy(key));
        };
        debug!("{}: Idle -> Submitting", guard.key());

        let result = request.await;
        let state = match &result {
            Ok(value) => {
                if let Some(message) = success(value) {
                    self.notify(Notification::success(message));
                }
                MutationState::Succeeded
            }
            Err(e) => {
                self.notify(Notification::from_error(e, failure, self.log_tail));
                MutationState::Failed
            }
        };
        debug!("{}: Submitting -> {:?}", guard.key(), state);
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, state);

        drop(guard);
        result
    }

    /// Authoritative re-fetch of `store`. The prior snapshot stays in place if `fetch` fails
    /// or a read issued after this one was applied first.
    pub async fn resync<T, Fut>(&self, store: &Store<T>, failure: &str, fetch: Fut) -> bool
    where
        Fut: Future<Output = ConsoleResult<Vec<T>>>,
    {
        match store.load(fetch).await {
            Ok(Some(snapshot)) => {
                debug!("Resynced collection to version {}", snapshot.version);
                true
            }
            Ok(None) => false,
            Err(e) => {
                self.report(e, failure);
                false
            }
        }
    }
}
