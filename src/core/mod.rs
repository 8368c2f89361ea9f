pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items for convenience
pub use config::{Config, InferenceProfile};
pub use errors::{
    ConfigError, InferenceError, PipelineError, StatusError, StorageError,
};
pub use types::{
    JobEnvelope, JobInput, JobResult, JobStatus, MockupEntry, PetFeatures, PromptPair,
};
