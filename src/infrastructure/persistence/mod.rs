pub mod file_artifact_store;
pub mod in_memory;

pub use file_artifact_store::FileArtifactStore;
pub use in_memory::InMemoryArtifactStore;
