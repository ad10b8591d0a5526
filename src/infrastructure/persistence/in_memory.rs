//! In-memory artifact store.
//!
//! Thread-safe through a `RwLock`; contents are lost when the process
//! exits. Used by tests and by callers that never want to touch disk.

use crate::domain::ports::ArtifactStore;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct InMemoryArtifactStore {
    artifacts: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.artifacts
            .read()
            .map(|artifacts| artifacts.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn exists(&self, key: &str) -> Result<bool> {
        let artifacts = self
            .artifacts
            .read()
            .map_err(|e| anyhow::anyhow!("artifact store lock poisoned: {}", e))?;
        Ok(artifacts.contains_key(key))
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let artifacts = self
            .artifacts
            .read()
            .map_err(|e| anyhow::anyhow!("artifact store lock poisoned: {}", e))?;
        Ok(artifacts.get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut artifacts = self
            .artifacts
            .write()
            .map_err(|e| anyhow::anyhow!("artifact store lock poisoned: {}", e))?;
        artifacts.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryArtifactStore::new();
        assert!(store.is_empty());
        assert!(store.load("lstm_model").unwrap().is_none());

        store.save("lstm_model", &[1, 2, 3]).unwrap();
        assert!(store.exists("lstm_model").unwrap());
        assert_eq!(store.load("lstm_model").unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.len(), 1);
    }
}
