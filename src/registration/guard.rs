//! Per-email mutual exclusion for the lookup-then-insert sequence.
//!
//! Only serializes signups inside one process. Several instances behind a load
//! balancer still race; that needs a unique index in the database.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = Arc<Mutex<HashMap<String, Entry>>>;

#[derive(Debug, Default)]
struct Entry {
    lock: Arc<AsyncMutex<()>>,
    // Slots alive for this key, holding or waiting.
    users: usize,
}

/// Normalize an email into the lock key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Default)]
pub struct EmailGuard {
    locks: LockMap,
}

impl EmailGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other lease for the same normalized email is alive.
    ///
    /// Cancel safe: dropping the returned future before it resolves leaves no
    /// entry behind.
    pub async fn lock(&self, email: &str) -> EmailLease {
        let slot = self.slot(normalize_email(email));
        let guard = Arc::clone(&slot.lock).lock_owned().await;

        EmailLease {
            _guard: guard,
            slot,
        }
    }

    fn slot(&self, key: String) -> Slot {
        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = map.entry(key.clone()).or_default();
        entry.users += 1;

        Slot {
            key,
            lock: Arc::clone(&entry.lock),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of emails currently held or waited on.
    #[must_use]
    pub fn active_keys(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// One interested party in a map entry, whether still waiting or holding.
#[derive(Debug)]
struct Slot {
    key: String,
    lock: Arc<AsyncMutex<()>>,
    locks: LockMap,
}

impl Drop for Slot {
    fn drop(&mut self) {
        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = map.get_mut(&self.key).is_some_and(|entry| {
            entry.users = entry.users.saturating_sub(1);
            entry.users == 0
        });
        if idle {
            map.remove(&self.key);
        }
    }
}

/// Held for the duration of one registration attempt.
#[derive(Debug)]
pub struct EmailLease {
    _guard: OwnedMutexGuard<()>,
    slot: Slot,
}

impl EmailLease {
    #[must_use]
    pub fn email(&self) -> &str {
        &self.slot.key
    }
}
