//! API key rotation with per-key cooldown.
//!
//! A [`KeyPool`] is an explicit handle owned by whoever serves requests (the
//! server state, the CLI). Clones share the same rotation state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::traits::CredentialProvider;

#[derive(Debug)]
struct KeyPoolInner {
    keys: Vec<String>,
    current: usize,
    /// Keys in cooldown, with the instant they failed.
    failed: HashMap<String, Instant>,
}

/// Snapshot of pool health for status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyPoolStatus {
    pub total_keys: usize,
    pub current_key_index: usize,
    pub failed_keys_count: usize,
    pub cooldown_minutes: u64,
    pub has_available_keys: bool,
}

/// Round-robin API key pool with cooldown on failure.
#[derive(Debug, Clone)]
pub struct KeyPool {
    cooldown: Duration,
    inner: Arc<Mutex<KeyPoolInner>>,
}

impl KeyPool {
    pub fn new(keys: Vec<String>, cooldown: Duration) -> Self {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keys.is_empty() {
            tracing::warn!("Key pool initialised with no API keys");
        } else {
            tracing::info!(keys = keys.len(), "Key pool initialised");
        }

        Self {
            cooldown,
            inner: Arc::new(Mutex::new(KeyPoolInner {
                keys,
                current: 0,
                failed: HashMap::new(),
            })),
        }
    }

    /// Parse a comma-separated key list, as found in `GROQ_API_KEYS`.
    pub fn from_csv(csv: &str, cooldown: Duration) -> Self {
        Self::new(csv.split(',').map(str::to_string).collect(), cooldown)
    }

    pub fn len(&self) -> usize {
        self.lock_inner().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, KeyPoolInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned key pool mutex");
            poisoned.into_inner()
        })
    }

    /// Next key not in cooldown. When every key is cooling down, the key at
    /// the rotation cursor is returned anyway. `None` only for an empty pool.
    pub fn get_available_key(&self) -> Option<String> {
        let mut inner = self.lock_inner();
        let cooldown = self.cooldown;
        inner.failed.retain(|_, failed_at| failed_at.elapsed() < cooldown);

        let n = inner.keys.len();
        if n == 0 {
            return None;
        }

        for _ in 0..n {
            let key = &inner.keys[inner.current];
            if !inner.failed.contains_key(key) {
                return Some(key.clone());
            }
            inner.current = (inner.current + 1) % n;
        }

        tracing::warn!("All API keys are in cooldown, using least recently failed");
        Some(inner.keys[inner.current].clone())
    }

    /// Put `key` into cooldown and advance the rotation cursor.
    pub fn mark_key_failed(&self, key: &str) {
        let mut inner = self.lock_inner();
        inner.failed.insert(key.to_string(), Instant::now());
        if !inner.keys.is_empty() {
            inner.current = (inner.current + 1) % inner.keys.len();
        }
        tracing::warn!(
            key_prefix = %key.chars().take(10).collect::<String>(),
            cooldown_secs = self.cooldown.as_secs(),
            "Marked API key as failed"
        );
    }

    pub fn status(&self) -> KeyPoolStatus {
        let has_available_keys = self.get_available_key().is_some();
        let inner = self.lock_inner();
        KeyPoolStatus {
            total_keys: inner.keys.len(),
            current_key_index: inner.current,
            failed_keys_count: inner.failed.len(),
            cooldown_minutes: self.cooldown.as_secs() / 60,
            has_available_keys,
        }
    }
}

impl CredentialProvider for KeyPool {
    fn acquire(&self) -> Option<String> {
        self.get_available_key()
    }

    fn report_failure(&self, credential: &str) {
        self.mark_key_failed(credential);
    }
}
