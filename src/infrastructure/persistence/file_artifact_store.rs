use crate::domain::ports::ArtifactStore;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Stores each artifact as `<dir>/<key>.json`.
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create model directory {:?}", dir))?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl ArtifactStore for FileArtifactStore {
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key).is_file())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!("No artifact at {:?}", path);
            return Ok(None);
        }

        let bytes = fs::read(&path).with_context(|| format!("Failed to read artifact {:?}", path))?;
        info!("Loaded artifact '{}' from {:?} ({} bytes)", key, path, bytes.len());
        Ok(Some(bytes))
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key);

        // Atomic write: write to temp file then rename
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, bytes)
            .with_context(|| format!("Failed to write temp artifact {:?}", temp_path))?;
        fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to rename artifact into {:?}", path))?;

        info!("Saved artifact '{}' to {:?}", key, path);
        Ok(())
    }
}
