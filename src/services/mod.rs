pub mod inference;
pub mod status;
pub mod storage;

// Re-export commonly used services
pub use inference::{DiffusionClient, EngineHandle, InferenceEngine};
pub use status::{StatusReporter, SupabaseReporter};
pub use storage::{parse_locator, BlobStore, S3Gateway};
