// Inference engine boundary
//
// The generative model runs out of process behind an HTTP endpoint; this
// module holds the client and the once-per-process shared handle. The model
// may be stochastic, so nothing here assumes reproducible output.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::core::config::{Config, InferenceProfile};
use crate::core::errors::{InferenceError, InferenceResult};
use crate::core::types::PromptPair;

/// Opaque prompt-in/image-out generation contract
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn generate(
        &self,
        source: &DynamicImage,
        prompts: &PromptPair,
    ) -> InferenceResult<DynamicImage>;
}

/// HTTP client for a diffusion sidecar endpoint
pub struct DiffusionClient {
    http_client: reqwest::Client,
    endpoint: String,
    profile: InferenceProfile,
}

impl DiffusionClient {
    /// Build the client and verify the endpoint is reachable. This is the
    /// expensive step shared across jobs; see [`EngineHandle`].
    pub async fn connect(config: &Config) -> InferenceResult<Self> {
        let profile = config.inference_profile();
        info!(
            "Loading inference engine ({}x{}, {} steps)",
            profile.width, profile.height, profile.num_inference_steps
        );

        let http_client = reqwest::Client::builder()
            // Generation at 1024x1024/28 steps can take minutes
            .timeout(Duration::from_secs(600))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| InferenceError::InitFailed(e.to_string()))?;

        let endpoint = config.inference.endpoint.trim_end_matches('/').to_string();

        let response = http_client
            .get(format!("{}/health", endpoint))
            .send()
            .await
            .map_err(|e| InferenceError::InitFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(InferenceError::InitFailed(format!(
                "inference endpoint health check returned {}",
                response.status()
            )));
        }

        info!("Inference engine ready");
        Ok(Self {
            http_client,
            endpoint,
            profile,
        })
    }
}

#[async_trait]
impl InferenceEngine for DiffusionClient {
    async fn generate(
        &self,
        source: &DynamicImage,
        prompts: &PromptPair,
    ) -> InferenceResult<DynamicImage> {
        let source = source.clone();
        let encoded_source = tokio::task::spawn_blocking(move || {
            let mut png_bytes = Vec::new();
            source
                .write_to(
                    &mut std::io::Cursor::new(&mut png_bytes),
                    image::ImageFormat::Png,
                )
                .map(|_| general_purpose::STANDARD.encode(png_bytes))
        })
        .await
        .map_err(|e| InferenceError::InvalidResponse(format!("encode task failed: {}", e)))??;

        let request_body = serde_json::json!({
            "prompt": prompts.positive,
            "negative_prompt": prompts.negative,
            "init_image": encoded_source,
            "width": self.profile.width,
            "height": self.profile.height,
            "num_inference_steps": self.profile.num_inference_steps,
            "guidance_scale": self.profile.guidance_scale,
            "options": {
                "attention_slicing": self.profile.attention_slicing,
                "cpu_offload": self.profile.cpu_offload,
            },
        });

        debug!(prompt = %prompts.positive, "Requesting generation");

        let response = self
            .http_client
            .post(format!("{}/generate", self.endpoint))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(InferenceError::UnexpectedStatus(
                response.status().as_u16(),
            ));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        let image_b64 = body["image"]
            .as_str()
            .ok_or_else(|| InferenceError::InvalidResponse("missing 'image' field".to_string()))?;

        let image_bytes = general_purpose::STANDARD
            .decode(image_b64)
            .map_err(|e| InferenceError::InvalidResponse(format!("invalid base64 image: {}", e)))?;

        let generated = tokio::task::spawn_blocking(move || image::load_from_memory(&image_bytes))
            .await
            .map_err(|e| InferenceError::InvalidResponse(format!("decode task failed: {}", e)))??;

        Ok(generated)
    }
}

/// Once-initialized shared engine.
///
/// The first job to reach the generation stage triggers initialization; all
/// later jobs in the process reuse the same engine. A failed initialization
/// leaves the cell empty, so the next job retries instead of inheriting a
/// poisoned engine.
pub struct EngineHandle {
    config: Arc<Config>,
    cell: OnceCell<Arc<dyn InferenceEngine>>,
}

impl EngineHandle {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// Handle with a pre-initialized engine (used by tests and by hosts
    /// that warm the model before accepting jobs).
    pub fn with_engine(config: Arc<Config>, engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            config,
            cell: OnceCell::new_with(Some(engine)),
        }
    }

    pub async fn get(&self) -> InferenceResult<&Arc<dyn InferenceEngine>> {
        self.cell
            .get_or_try_init(|| async {
                let client = DiffusionClient::connect(&self.config).await?;
                Ok(Arc::new(client) as Arc<dyn InferenceEngine>)
            })
            .await
    }
}
