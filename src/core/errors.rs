// Custom error types for better error handling and debugging
//
// Using thiserror for ergonomic error definitions with:
// - Context preservation
// - Type-safe error matching
// - Automatic Display/Error trait implementations
// - Source error chaining

use thiserror::Error;

/// Blob store errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid locator '{0}' (expected s3://bucket/key)")]
    InvalidLocator(String),

    #[error("Storage request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Storage returned status {status} for key '{key}'")]
    UnexpectedStatus { key: String, status: u16 },

    #[error("Image decoding failed: {0}")]
    DecodeFailed(#[from] image::ImageError),
}

/// Status backend errors. These are always logged and discarded by the
/// pipeline; losing a progress update never fails the job.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Status update request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Status backend returned status {0}")]
    UnexpectedStatus(u16),
}

/// Inference engine errors
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Engine initialization failed: {0}")]
    InitFailed(String),

    #[error("Inference request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Inference endpoint returned status {0}")]
    UnexpectedStatus(u16),

    #[error("Invalid inference response: {0}")]
    InvalidResponse(String),

    #[error("Generated image decoding failed: {0}")]
    DecodeFailed(#[from] image::ImageError),
}

/// Pipeline orchestration errors. Converted exactly once, at the pipeline
/// boundary, into a FAILED status report plus a failure JobResult.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No source images provided")]
    NoSourceImages,

    #[error("Failed to download source image '{url}': {source}")]
    DownloadFailed {
        url: String,
        #[source]
        source: StorageError,
    },

    #[error("AI image generation failed: {0}")]
    InferenceFailed(#[from] InferenceError),

    #[error("Failed to upload '{key}': {source}")]
    UploadFailed {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to create {product_type} mockup: {reason}")]
    MockupFailed { product_type: String, reason: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown inference profile '{0}' (expected 'fast' or 'quality')")]
    UnknownProfile(String),

    #[error("Invalid server port: {0}")]
    InvalidPort(String),
}

// Convenience type aliases for Results
pub type StorageResult<T> = Result<T, StorageError>;
pub type StatusResult<T> = Result<T, StatusError>;
pub type InferenceResult<T> = Result<T, InferenceError>;
pub type PipelineResult<T> = Result<T, PipelineError>;
