//! Pending request table
//!
//! Maps a transaction id to the completion handle of the request waiting
//! on it. Entries are always removed before they are completed, so a
//! handle can never be completed twice.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;

use zigcoord_core::{CoordError, CoordResult, Tsn};

/// What a request finally resolves to
pub type Outcome = CoordResult<Bytes>;

struct Entry {
    generation: u64,
    tx: oneshot::Sender<Outcome>,
}

/// Receiving half of a pending entry
#[derive(Debug)]
pub struct PendingHandle {
    tsn: Tsn,
    generation: u64,
    rx: oneshot::Receiver<Outcome>,
}

impl PendingHandle {
    pub fn tsn(&self) -> Tsn {
        self.tsn
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the entry to be resolved or abandoned
    pub async fn wait(self) -> Outcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            // Sender dropped without completing: the table itself went away
            Err(_) => Err(CoordError::Shutdown(self.tsn)),
        }
    }

    /// Wait at most `limit`, then call `expire` to retire the entry
    ///
    /// Whatever completed the entry first is returned, so a reply that
    /// lands while the deadline fires still wins. `expire` must leave the
    /// entry completed or removed.
    pub async fn wait_until(self, limit: Duration, expire: impl FnOnce(Tsn)) -> Outcome {
        let tsn = self.tsn;
        let wait = self.wait();
        tokio::pin!(wait);

        match tokio::time::timeout(limit, &mut wait).await {
            Ok(outcome) => outcome,
            Err(_) => {
                expire(tsn);
                wait.await
            }
        }
    }
}

/// Outstanding requests keyed by transaction id
#[derive(Default)]
pub struct PendingTable {
    entries: HashMap<Tsn, Entry>,
    next_generation: u64,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new outstanding request
    ///
    /// A second registration for a live id means the allocator/table
    /// contract was broken and is reported as `DuplicateTransaction`.
    pub fn register(&mut self, tsn: Tsn) -> CoordResult<PendingHandle> {
        if self.entries.contains_key(&tsn) {
            return Err(CoordError::DuplicateTransaction(tsn));
        }

        let (tx, rx) = oneshot::channel();
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        self.entries.insert(tsn, Entry { generation, tx });

        Ok(PendingHandle {
            tsn,
            generation,
            rx,
        })
    }

    /// Complete the entry for `tsn` with a reply payload
    ///
    /// Returns false if nothing was waiting on `tsn`.
    pub fn resolve(&mut self, tsn: Tsn, args: Bytes) -> bool {
        self.complete(tsn, Ok(args))
    }

    /// Complete the entry for `tsn` with a failure
    pub fn abandon(&mut self, tsn: Tsn, reason: CoordError) -> bool {
        self.complete(tsn, Err(reason))
    }

    /// Drop the entry for `tsn` without completing it, but only if it is
    /// still the registration identified by `generation`
    pub fn forget(&mut self, tsn: Tsn, generation: u64) -> bool {
        match self.entries.get(&tsn) {
            Some(entry) if entry.generation == generation => {
                self.entries.remove(&tsn);
                true
            }
            _ => false,
        }
    }

    /// Abandon every entry, e.g. on shutdown
    pub fn abandon_all(&mut self, reason: impl Fn(Tsn) -> CoordError) -> usize {
        let drained: Vec<(Tsn, Entry)> = self.entries.drain().collect();
        let count = drained.len();
        for (tsn, entry) in drained {
            let _ = entry.tx.send(Err(reason(tsn)));
        }
        count
    }

    pub fn contains(&self, tsn: Tsn) -> bool {
        self.entries.contains_key(&tsn)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn complete(&mut self, tsn: Tsn, outcome: Outcome) -> bool {
        match self.entries.remove(&tsn) {
            Some(entry) => {
                // The requester may have stopped listening; that is its call
                let _ = entry.tx.send(outcome);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for PendingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.entries.keys().copied().collect();
        ids.sort();
        f.debug_struct("PendingTable").field("pending", &ids).finish()
    }
}
