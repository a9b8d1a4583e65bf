//! Per-key async mutexes.
//!
//! A webhook's read-merge-write (and, for insights, notify and delete) runs
//! while holding the lock for its storage key. Different keys never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as TokioMutex, OwnedMutexGuard};

use crate::models::StorageKey;

/// Idle slots are pruned once the table grows past this size.
const PRUNE_THRESHOLD: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct KeyLocks {
    slots: Arc<Mutex<HashMap<StorageKey, Arc<TokioMutex<()>>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Released when the guard drops.
    pub async fn lock(&self, key: &StorageKey) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            if slots.len() > PRUNE_THRESHOLD {
                // Held or awaited slots have clones outside the table.
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            slots.entry(key.clone()).or_default().clone()
        };
        slot.lock_owned().await
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn key(phone: &str) -> StorageKey {
        StorageKey::from_phone(phone).unwrap()
    }

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = KeyLocks::new();
        let guard = locks.lock(&key("5551234567")).await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _g = contender.lock(&key("555-123-4567")).await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .expect("lock released")
            .unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_contend() {
        let locks = KeyLocks::new();
        let _a = locks.lock(&key("5551111111")).await;
        let b = tokio::time::timeout(Duration::from_millis(200), locks.lock(&key("5552222222"))).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn idle_slots_are_pruned() {
        let locks = KeyLocks::new();
        for n in 0..=PRUNE_THRESHOLD {
            let _g = locks.lock(&key(&format!("555{n:07}"))).await;
        }
        assert_eq!(locks.len(), PRUNE_THRESHOLD + 1);

        let _held = locks.lock(&key("5559999999")).await;
        assert_eq!(locks.len(), 1);
    }
}
