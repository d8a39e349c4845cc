use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use super::Storage;

/// In-process [`Storage`], mostly for tests and throwaway sessions.
///
/// Clones share the same map, so a test can keep one handle to inspect what
/// another component wrote. `writes()` counts successful `set` calls.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    values: Arc<Mutex<HashMap<String, serde_json::Value>>>,
    writes: Arc<Mutex<u64>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> u64 {
        *self.writes.lock().expect("storage lock poisoned")
    }

    /// Make every following `set` fail until turned off again.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().expect("storage lock poisoned") = fail;
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let values = self.values.lock().expect("storage lock poisoned");
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        if *self.fail_writes.lock().expect("storage lock poisoned") {
            anyhow::bail!("Write to {} rejected", key);
        }
        self.values
            .lock()
            .expect("storage lock poisoned")
            .insert(key.to_string(), value.clone());
        *self.writes.lock().expect("storage lock poisoned") += 1;
        Ok(())
    }
}
