// Wire and domain types for the pet portrait generation workflow

use serde::{Deserialize, Serialize};

/// Serverless invocation wrapper: the host posts `{ "input": { ... } }`
#[derive(Debug, Clone, Deserialize)]
pub struct JobEnvelope {
    pub input: JobInput,
}

/// One generation job as received from the host. Immutable once parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct JobInput {
    #[serde(rename = "designId")]
    pub design_id: String,
    /// Style identifier; unknown values fall back to the default style at
    /// prompt-build time, so this is echoed back verbatim in the result.
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(rename = "imageUrls", default)]
    pub image_urls: Vec<String>,
}

fn default_style() -> String {
    "METAL".to_string()
}

/// One uploaded mockup in the result payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MockupEntry {
    pub product_type: String,
    pub url: String,
}

/// Final job outcome. This is the pipeline's only return value; failures are
/// carried here rather than raised across the pipeline boundary.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mockup_urls: Option<Vec<MockupEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    pub fn completed(
        design_id: String,
        ai_image_url: String,
        mockup_urls: Vec<MockupEntry>,
    ) -> Self {
        Self {
            success: true,
            design_id: Some(design_id),
            ai_image_url: Some(ai_image_url),
            mockup_urls: Some(mockup_urls),
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            success: false,
            design_id: None,
            ai_image_url: None,
            mockup_urls: None,
            error: Some(error),
        }
    }
}

/// Status values understood by the status backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

/// Coarse description of the pet photo, consumed only by the prompt builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetFeatures {
    pub description: String,
    /// Empty when no dominant color could be extracted
    pub color_info: String,
    pub composition: String,
}

/// Positive/negative prompt pair handed to the inference engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub positive: String,
    pub negative: String,
}
