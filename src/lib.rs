// Library exports for the pet portrait generation worker

// Core modules
pub mod core;
pub mod orchestration;
pub mod pipeline;
pub mod services;
pub mod utils;

// Re-export commonly used types and functions
pub use self::core::{
    config::{Config, InferenceProfile},
    errors::{ConfigError, InferenceError, PipelineError, StatusError, StorageError},
    types::{JobEnvelope, JobInput, JobResult, JobStatus, MockupEntry, PetFeatures, PromptPair},
};

pub use orchestration::JobPipeline;

pub use pipeline::{analyze_pet_features, create_product_mockup, generate_prompt, PRODUCT_TYPES};

pub use services::{BlobStore, DiffusionClient, EngineHandle, InferenceEngine, S3Gateway, StatusReporter, SupabaseReporter};

pub use utils::{encode_jpeg_async, load_image_from_memory_async};
