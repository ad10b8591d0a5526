//! Cache-aside access to trained-model artifacts.
//!
//! The "check artifact, else train and persist" sequence for a key runs under
//! that key's mutex, so concurrent first-time callers train once and every
//! later caller loads the artifact the first one wrote.
//!
//! Key mutexes live in one process-wide table indexed by store instance and
//! key. Every cache built over the same `Arc<dyn ArtifactStore>` therefore
//! shares them, however many caches or registries the caller creates.

use crate::domain::errors::ForecastError;
use crate::domain::ml::StrategyKind;
use crate::domain::ports::ArtifactStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::{debug, info, warn};

/// Store instance (its allocation address) and artifact key.
type LockKey = (usize, String);

static KEY_LOCKS: OnceLock<Mutex<HashMap<LockKey, Arc<Mutex<()>>>>> = OnceLock::new();

fn key_locks() -> &'static Mutex<HashMap<LockKey, Arc<Mutex<()>>>> {
    KEY_LOCKS.get_or_init(|| Mutex::new(HashMap::new()))
}

pub struct ArtifactCache {
    store: Arc<dyn ArtifactStore>,
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic in another trainer leaves nothing half-written behind the
    // guard itself, so the lock stays usable.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ArtifactCache {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    fn store_id(&self) -> usize {
        Arc::as_ptr(&self.store) as *const () as usize
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = lock_ignoring_poison(key_locks());
        locks
            .entry((self.store_id(), key.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Load the model stored under `key`, or train and persist a new one.
    ///
    /// A stored artifact that fails to decode or fails `validate` is treated
    /// as [`ForecastError::ModelUnavailable`]: it is logged, retrained and
    /// overwritten rather than returned to the caller.
    pub fn get_or_train<M, V, T>(
        &self,
        strategy: StrategyKind,
        key: &str,
        validate: V,
        train: T,
    ) -> Result<M, ForecastError>
    where
        M: Serialize + DeserializeOwned,
        V: Fn(&M) -> Result<(), String>,
        T: FnOnce() -> Result<M, ForecastError>,
    {
        let key_lock = self.key_lock(key);
        let _guard = lock_ignoring_poison(&key_lock);

        if let Some(model) = self.try_load(strategy, key, &validate)? {
            return Ok(model);
        }

        info!("No usable {} artifact under '{}', training", strategy, key);
        let model = train()?;

        let bytes = serde_json::to_vec(&model).map_err(|e| ForecastError::ArtifactStore {
            key: key.to_string(),
            reason: format!("failed to serialize model: {}", e),
        })?;
        self.store
            .save(key, &bytes)
            .map_err(|e| ForecastError::ArtifactStore {
                key: key.to_string(),
                reason: format!("{:#}", e),
            })?;

        Ok(model)
    }

    fn try_load<M, V>(
        &self,
        strategy: StrategyKind,
        key: &str,
        validate: &V,
    ) -> Result<Option<M>, ForecastError>
    where
        M: DeserializeOwned,
        V: Fn(&M) -> Result<(), String>,
    {
        let store_error = |e: anyhow::Error| ForecastError::ArtifactStore {
            key: key.to_string(),
            reason: format!("{:#}", e),
        };

        if !self.store.exists(key).map_err(store_error)? {
            debug!("Artifact '{}' does not exist", key);
            return Ok(None);
        }

        let Some(bytes) = self.store.load(key).map_err(store_error)? else {
            return Ok(None);
        };

        let decoded = serde_json::from_slice::<M>(&bytes)
            .map_err(|e| format!("failed to decode artifact: {}", e))
            .and_then(|model| validate(&model).map(|_| model));

        match decoded {
            Ok(model) => {
                info!("Reusing persisted {} model '{}'", strategy, key);
                Ok(Some(model))
            }
            Err(reason) => {
                let unavailable = ForecastError::ModelUnavailable { strategy, reason };
                warn!("{}; retraining and overwriting '{}'", unavailable, key);
                Ok(None)
            }
        }
    }
}
