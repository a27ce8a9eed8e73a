//! Per-batch mutual exclusion between concurrent runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per batch id, created on first use.
#[derive(Debug, Default)]
pub struct BatchLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl BatchLocks {
    fn lock_for(&self, batch: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(batch.to_string()).or_default())
    }

    /// Lock every batch in `batches`, which must be sorted and de-duplicated.
    /// Taking locks in one global order keeps overlapping runs from deadlocking.
    pub async fn acquire(&self, batches: &[String]) -> Vec<OwnedMutexGuard<()>> {
        let mut guards = Vec::with_capacity(batches.len());
        for batch in batches {
            guards.push(self.lock_for(batch).lock_owned().await);
        }
        guards
    }
}
