use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use actix_web::rt::time::timeout;
use log::debug;
use tokio::sync::watch;

/// How long list endpoints hold a `since` request open.
pub const LONG_POLL: Duration = Duration::from_secs(25);

/// Immutable view of a collection at one point in time.
pub struct Snapshot<T> {
    pub version: u64,
    pub items: Arc<Vec<T>>,
    read: u64,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            items: Arc::clone(&self.items),
            read: self.read,
        }
    }
}

/// Issue order of a list read against one [`Store`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReadTicket(u64);

/// Client-side cache of an engine-owned collection. Only [`Store::replace_from`] changes it,
/// and every change is a whole new snapshot published to subscribers.
///
/// Reads are applied in the order they were issued, not the order they complete: a list read
/// that was sent before the last applied one is dropped.
pub struct Store<T> {
    tx: watch::Sender<Snapshot<T>>,
    issued: AtomicU64,
}

impl<T> Default for Store<T> {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(Snapshot {
            version: 0,
            items: Arc::new(Vec::new()),
            read: 0,
        });
        Self {
            tx,
            issued: AtomicU64::new(0),
        }
    }
}

impl<T> Store<T> {
    pub fn snapshot(&self) -> Snapshot<T> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.tx.subscribe()
    }

    /// Waits up to `wait` for a snapshot newer than `version`, then returns the current one.
    pub async fn newer_than(&self, version: u64, wait: Duration) -> Snapshot<T> {
        let mut rx = self.subscribe();
        let _ = timeout(wait, rx.wait_for(|snapshot| snapshot.version > version)).await;
        self.snapshot()
    }

    /// Stamps a list read about to be sent.
    pub fn begin_read(&self) -> ReadTicket {
        ReadTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Publishes `items` read under `ticket`, unless a later read was applied already.
    pub fn replace_from(&self, ticket: ReadTicket, items: Vec<T>) -> Option<Snapshot<T>> {
        let applied = self.tx.send_if_modified(|snapshot| {
            if ticket.0 <= snapshot.read {
                return false;
            }
            snapshot.read = ticket.0;
            snapshot.version += 1;
            snapshot.items = Arc::new(items);
            true
        });
        if !applied {
            debug!("Dropped list read {:?}, a later read was applied", ticket);
            return None;
        }
        Some(self.snapshot())
    }

    /// Stamps a read, awaits `fetch` and publishes its items in issue order.
    pub async fn load<E, Fut>(&self, fetch: Fut) -> Result<Option<Snapshot<T>>, E>
    where
        Fut: Future<Output = Result<Vec<T>, E>>,
    {
        let ticket = self.begin_read();
        let items = fetch.await?;
        Ok(self.replace_from(ticket, items))
    }

    #[cfg(test)]
    pub fn replace(&self, items: Vec<T>) -> Snapshot<T> {
        let ticket = self.begin_read();
        self.replace_from(ticket, items).unwrap_or_else(|| self.snapshot())
    }
}

impl<T: Clone> Store<T> {
    /// Items matching `predicate`; never mutates the cache.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.snapshot()
            .items
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }
}
