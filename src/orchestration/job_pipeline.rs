// Job pipeline: main workflow coordinator
//
// One job runs to completion on one worker invocation. Stages are strictly
// sequential (each consumes the previous stage's output) and the six mockups
// are composited one at a time to bound peak memory and keep the reported
// progress monotonic.

use image::DynamicImage;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::core::config::Config;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::types::{JobInput, JobResult, JobStatus, MockupEntry};
use crate::pipeline::{analyze_pet_features, compose_mockup_async, generate_prompt, PRODUCT_TYPES};
use crate::services::inference::EngineHandle;
use crate::services::status::StatusReporter;
use crate::services::storage::BlobStore;
use crate::services::{S3Gateway, SupabaseReporter};
use crate::utils::encode_jpeg_async;

// Progress checkpoints; mockups interpolate from MOCKUPS to 94 in six
// equal steps
const PROGRESS_DOWNLOAD: u8 = 10;
const PROGRESS_ANALYZE: u8 = 25;
const PROGRESS_GENERATE: u8 = 40;
const PROGRESS_MOCKUPS: u8 = 70;
const PROGRESS_PER_MOCKUP: u8 = 4;
const PROGRESS_COMPLETE: u8 = 100;

/// Main job pipeline
pub struct JobPipeline {
    store: Arc<dyn BlobStore>,
    status: Arc<dyn StatusReporter>,
    engine: EngineHandle,
}

impl JobPipeline {
    /// Wire up the production services.
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        info!("Initializing services...");

        let store = Arc::new(S3Gateway::new(config.clone())?);
        let status = Arc::new(SupabaseReporter::new(config.clone())?);
        let engine = EngineHandle::new(config.clone());

        if !config.status_configured() {
            warn!("Status backend not configured; progress reporting disabled");
        }

        Ok(Self {
            store,
            status,
            engine,
        })
    }

    /// Pipeline over injected services (tests, warm-started hosts).
    pub fn with_services(
        store: Arc<dyn BlobStore>,
        status: Arc<dyn StatusReporter>,
        engine: EngineHandle,
    ) -> Self {
        Self {
            store,
            status,
            engine,
        }
    }

    /// Run one job to completion. Never returns an error: any stage failure
    /// is converted here, exactly once, into a FAILED status report plus a
    /// failure result carrying the same error text.
    #[instrument(skip(self, input), fields(design_id = %input.design_id, style = %input.style))]
    pub async fn run(&self, input: &JobInput) -> JobResult {
        info!(
            "Processing job {} with style {}",
            input.design_id, input.style
        );

        match self.execute(input).await {
            Ok(result) => {
                info!("Job {} completed successfully", input.design_id);
                result
            }
            Err(e) => {
                let message = e.to_string();
                error!("Job {} failed: {}", input.design_id, message);
                self.report(
                    &input.design_id,
                    JobStatus::Failed,
                    0,
                    "Failed",
                    Some(json!({ "error": message })),
                )
                .await;
                JobResult::failed(message)
            }
        }
    }

    async fn execute(&self, input: &JobInput) -> PipelineResult<JobResult> {
        let design_id = &input.design_id;

        self.report(design_id, JobStatus::Processing, PROGRESS_DOWNLOAD, "Downloading images", None)
            .await;

        // Download every locator in input order; any single failure aborts.
        // Only the first image feeds analysis and generation; the rest are
        // validated and discarded.
        let mut source_images = Vec::with_capacity(input.image_urls.len());
        for url in &input.image_urls {
            let image = self.store.fetch(url).await.map_err(|source| {
                PipelineError::DownloadFailed {
                    url: url.clone(),
                    source,
                }
            })?;
            source_images.push(image);
        }

        let source_image = source_images.first().ok_or(PipelineError::NoSourceImages)?;

        self.report(design_id, JobStatus::Processing, PROGRESS_ANALYZE, "Analyzing pet features", None)
            .await;
        let features = analyze_pet_features(source_image);

        self.report(design_id, JobStatus::Processing, PROGRESS_GENERATE, "Generating AI artwork", None)
            .await;
        let prompts = generate_prompt(&features, &input.style);
        let engine = self.engine.get().await?;
        let ai_image = engine.generate(source_image, &prompts).await?;

        let ai_image_key = format!("generated/{}/ai_image.jpg", design_id);
        let ai_image_url = self
            .upload_jpeg(ai_image.clone(), &ai_image_key)
            .await?;

        self.report(design_id, JobStatus::Processing, PROGRESS_MOCKUPS, "Creating product mockups", None)
            .await;

        let mut mockup_urls = Vec::with_capacity(PRODUCT_TYPES.len());
        for (i, product_type) in PRODUCT_TYPES.iter().enumerate() {
            let mockup_bytes = compose_mockup_async(ai_image.clone(), product_type)
                .await
                .map_err(|e| PipelineError::MockupFailed {
                    product_type: product_type.to_string(),
                    reason: e.to_string(),
                })?;

            let mockup_key = format!("mockups/{}/{}_mockup.jpg", design_id, product_type);
            let mockup_url = self
                .store
                .store(mockup_bytes, &mockup_key, "image/jpeg")
                .await
                .map_err(|source| PipelineError::UploadFailed {
                    key: mockup_key.clone(),
                    source,
                })?;

            mockup_urls.push(MockupEntry {
                product_type: product_type.to_string(),
                url: mockup_url,
            });

            // 70% to 94% across the six products
            let progress = PROGRESS_MOCKUPS + (i as u8 + 1) * PROGRESS_PER_MOCKUP;
            self.report(
                design_id,
                JobStatus::Processing,
                progress,
                &format!("Creating {} mockup", product_type),
                None,
            )
            .await;
        }

        self.report(
            design_id,
            JobStatus::Completed,
            PROGRESS_COMPLETE,
            "Completed",
            Some(json!({
                "generated_images": [{ "url": &ai_image_url, "style": &input.style }],
                "mockups": &mockup_urls,
            })),
        )
        .await;

        Ok(JobResult::completed(
            design_id.clone(),
            ai_image_url,
            mockup_urls,
        ))
    }

    async fn upload_jpeg(&self, image: DynamicImage, key: &str) -> PipelineResult<String> {
        let bytes = encode_jpeg_async(image).await?;
        self.store
            .store(bytes, key, "image/jpeg")
            .await
            .map_err(|source| PipelineError::UploadFailed {
                key: key.to_string(),
                source,
            })
    }

    /// Fire-and-forget status update. A lost update costs observability
    /// only, so failures are logged and discarded here rather than joining
    /// the pipeline failure path.
    async fn report(
        &self,
        job_id: &str,
        status: JobStatus,
        progress: u8,
        step: &str,
        extra: Option<serde_json::Value>,
    ) {
        if let Err(e) = self
            .status
            .update(job_id, status, progress, step, extra)
            .await
        {
            warn!(job_id, step, "Status update failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{Rgb, RgbImage};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::core::errors::{
        InferenceError, InferenceResult, StatusError, StatusResult, StorageError, StorageResult,
    };
    use crate::core::types::{PetFeatures, PromptPair};
    use crate::services::inference::InferenceEngine;

    fn sample_png() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([180, 120, 60])));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// In-memory blob store preloaded with source images
    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl MemoryStore {
        fn with_object(key: &str, bytes: Vec<u8>) -> Self {
            let store = Self::default();
            store.objects.lock().unwrap().insert(key.to_string(), bytes);
            store
        }

        fn stored_keys(&self) -> Vec<String> {
            let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
            keys.sort();
            keys
        }
    }

    #[async_trait]
    impl BlobStore for MemoryStore {
        async fn fetch(&self, locator: &str) -> StorageResult<DynamicImage> {
            let (_, key) = crate::services::parse_locator(locator)?;
            let bytes = self
                .objects
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| StorageError::UnexpectedStatus {
                    key: key.to_string(),
                    status: 404,
                })?;
            Ok(image::load_from_memory(&bytes)?)
        }

        async fn store(
            &self,
            bytes: Vec<u8>,
            key: &str,
            _content_type: &str,
        ) -> StorageResult<String> {
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), bytes);
            Ok(format!("s3://test-bucket/{}", key))
        }
    }

    /// Blob store whose uploads fail after a given count
    struct FlakyStore {
        inner: MemoryStore,
        allowed_uploads: Mutex<usize>,
    }

    #[async_trait]
    impl BlobStore for FlakyStore {
        async fn fetch(&self, locator: &str) -> StorageResult<DynamicImage> {
            self.inner.fetch(locator).await
        }

        async fn store(
            &self,
            bytes: Vec<u8>,
            key: &str,
            content_type: &str,
        ) -> StorageResult<String> {
            // Guard must not live across the await below
            {
                let mut allowed = self.allowed_uploads.lock().unwrap();
                if *allowed == 0 {
                    return Err(StorageError::UnexpectedStatus {
                        key: key.to_string(),
                        status: 503,
                    });
                }
                *allowed -= 1;
            }
            self.inner.store(bytes, key, content_type).await
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct RecordedUpdate {
        status: JobStatus,
        progress: u8,
        step: String,
        extra: Option<Value>,
    }

    /// Status reporter that records every update
    #[derive(Default)]
    struct RecordingReporter {
        updates: Mutex<Vec<RecordedUpdate>>,
    }

    #[async_trait]
    impl StatusReporter for RecordingReporter {
        async fn update(
            &self,
            _job_id: &str,
            status: JobStatus,
            progress: u8,
            step: &str,
            extra: Option<Value>,
        ) -> StatusResult<()> {
            self.updates.lock().unwrap().push(RecordedUpdate {
                status,
                progress,
                step: step.to_string(),
                extra,
            });
            Ok(())
        }
    }

    /// Status reporter whose backend is unreachable throughout
    struct UnreachableReporter;

    #[async_trait]
    impl StatusReporter for UnreachableReporter {
        async fn update(
            &self,
            _job_id: &str,
            _status: JobStatus,
            _progress: u8,
            _step: &str,
            _extra: Option<Value>,
        ) -> StatusResult<()> {
            Err(StatusError::UnexpectedStatus(502))
        }
    }

    /// Engine returning a fixed solid image
    struct StubEngine;

    #[async_trait]
    impl InferenceEngine for StubEngine {
        async fn generate(
            &self,
            _source: &DynamicImage,
            _prompts: &PromptPair,
        ) -> InferenceResult<DynamicImage> {
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                64,
                64,
                Rgb([90, 40, 160]),
            )))
        }
    }

    /// Engine that always fails
    struct BrokenEngine;

    #[async_trait]
    impl InferenceEngine for BrokenEngine {
        async fn generate(
            &self,
            _source: &DynamicImage,
            _prompts: &PromptPair,
        ) -> InferenceResult<DynamicImage> {
            Err(InferenceError::InitFailed("CUDA out of memory".to_string()))
        }
    }

    fn test_config() -> Arc<Config> {
        Arc::new(Config::new().unwrap())
    }

    fn pipeline_with(
        store: Arc<dyn BlobStore>,
        status: Arc<dyn StatusReporter>,
        engine: Arc<dyn InferenceEngine>,
    ) -> JobPipeline {
        JobPipeline::with_services(
            store,
            status,
            EngineHandle::with_engine(test_config(), engine),
        )
    }

    fn job(design_id: &str, style: &str, urls: &[&str]) -> JobInput {
        JobInput {
            design_id: design_id.to_string(),
            style: style.to_string(),
            image_urls: urls.iter().map(|u| u.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn successful_job_yields_six_mockups() {
        let store = Arc::new(MemoryStore::with_object("uploads/pet.png", sample_png()));
        let status = Arc::new(RecordingReporter::default());
        let pipeline = pipeline_with(store.clone(), status.clone(), Arc::new(StubEngine));

        let result = pipeline
            .run(&job("d-1", "ROYAL", &["s3://test-bucket/uploads/pet.png"]))
            .await;

        assert!(result.success);
        assert_eq!(result.design_id.as_deref(), Some("d-1"));
        assert_eq!(
            result.ai_image_url.as_deref(),
            Some("s3://test-bucket/generated/d-1/ai_image.jpg")
        );

        let mockups = result.mockup_urls.unwrap();
        assert_eq!(mockups.len(), 6);
        let product_types: Vec<&str> = mockups.iter().map(|m| m.product_type.as_str()).collect();
        assert_eq!(product_types, PRODUCT_TYPES);
        assert!(mockups.iter().all(|m| !m.url.is_empty()));

        // One generated image plus six mockups landed in the store
        let keys = store.stored_keys();
        assert!(keys.contains(&"generated/d-1/ai_image.jpg".to_string()));
        assert_eq!(
            keys.iter().filter(|k| k.starts_with("mockups/d-1/")).count(),
            6
        );

        let updates = status.updates.lock().unwrap();
        let last = updates.last().unwrap();
        assert_eq!(last.status, JobStatus::Completed);
        assert_eq!(last.progress, 100);
        let extra = last.extra.as_ref().unwrap();
        assert_eq!(extra["generated_images"][0]["style"], "ROYAL");
        assert_eq!(extra["mockups"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn mockup_progress_is_strictly_increasing_and_ends_at_94() {
        let store = Arc::new(MemoryStore::with_object("uploads/pet.png", sample_png()));
        let status = Arc::new(RecordingReporter::default());
        let pipeline = pipeline_with(store, status.clone(), Arc::new(StubEngine));

        let result = pipeline
            .run(&job("d-2", "KNIGHT", &["s3://test-bucket/uploads/pet.png"]))
            .await;
        assert!(result.success);

        let updates = status.updates.lock().unwrap();
        let mockup_progress: Vec<u8> = updates
            .iter()
            .filter(|u| u.step.ends_with(" mockup"))
            .map(|u| u.progress)
            .collect();

        assert_eq!(mockup_progress, vec![74, 78, 82, 86, 90, 94]);
        assert!(mockup_progress.windows(2).all(|w| w[0] < w[1]));

        // Overall progress never decreases before the terminal update
        let all_progress: Vec<u8> = updates.iter().map(|u| u.progress).collect();
        assert!(all_progress.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn empty_image_list_fails_with_no_source_images() {
        let store = Arc::new(MemoryStore::default());
        let status = Arc::new(RecordingReporter::default());
        let pipeline = pipeline_with(store, status.clone(), Arc::new(StubEngine));

        let result = pipeline.run(&job("d-3", "ROYAL", &[])).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No source images provided"));

        let updates = status.updates.lock().unwrap();
        let last = updates.last().unwrap();
        assert_eq!(last.status, JobStatus::Failed);
        assert_eq!(last.progress, 0);
        assert_eq!(last.step, "Failed");
        assert_eq!(
            last.extra.as_ref().unwrap()["error"],
            "No source images provided"
        );
    }

    #[tokio::test]
    async fn download_failure_aborts_the_job() {
        let store = Arc::new(MemoryStore::default());
        let status = Arc::new(RecordingReporter::default());
        let pipeline = pipeline_with(store, status, Arc::new(StubEngine));

        let result = pipeline
            .run(&job("d-4", "ROYAL", &["s3://test-bucket/missing.png"]))
            .await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("missing.png"), "error was: {}", error);
    }

    #[tokio::test]
    async fn inference_failure_is_contained_to_a_failure_result() {
        let store = Arc::new(MemoryStore::with_object("uploads/pet.png", sample_png()));
        let status = Arc::new(RecordingReporter::default());
        let pipeline = pipeline_with(store, status.clone(), Arc::new(BrokenEngine));

        let result = pipeline
            .run(&job("d-5", "SUPERHERO", &["s3://test-bucket/uploads/pet.png"]))
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("CUDA out of memory"));

        let updates = status.updates.lock().unwrap();
        assert_eq!(updates.last().unwrap().status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn mockup_upload_failure_aborts_remaining_mockups() {
        let inner = MemoryStore::with_object("uploads/pet.png", sample_png());
        let store = Arc::new(FlakyStore {
            inner,
            // Generated image plus two mockups succeed, third mockup fails
            allowed_uploads: Mutex::new(3),
        });
        let status = Arc::new(RecordingReporter::default());
        let pipeline = pipeline_with(store.clone(), status.clone(), Arc::new(StubEngine));

        let result = pipeline
            .run(&job("d-6", "ROYAL", &["s3://test-bucket/uploads/pet.png"]))
            .await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("mug_mockup.jpg"));

        // No mockup beyond the failing one was attempted
        let keys = store.inner.stored_keys();
        assert!(keys.contains(&"mockups/d-6/hoodie_mockup.jpg".to_string()));
        assert!(!keys.iter().any(|k| k.contains("tote_mockup")));
        assert!(!keys.iter().any(|k| k.contains("poster_mockup")));
    }

    #[tokio::test]
    async fn unreachable_status_backend_does_not_change_outcome() {
        let store = Arc::new(MemoryStore::with_object("uploads/pet.png", sample_png()));
        let pipeline = pipeline_with(store, Arc::new(UnreachableReporter), Arc::new(StubEngine));

        let result = pipeline
            .run(&job("d-7", "ROYAL", &["s3://test-bucket/uploads/pet.png"]))
            .await;

        assert!(result.success);
        assert_eq!(result.mockup_urls.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn extra_source_images_are_downloaded_but_unused() {
        let store = MemoryStore::with_object("uploads/a.png", sample_png());
        store
            .objects
            .lock()
            .unwrap()
            .insert("uploads/b.png".to_string(), sample_png());
        let store = Arc::new(store);
        let status = Arc::new(RecordingReporter::default());
        let pipeline = pipeline_with(store, status, Arc::new(StubEngine));

        let result = pipeline
            .run(&job(
                "d-8",
                "ROYAL",
                &[
                    "s3://test-bucket/uploads/a.png",
                    "s3://test-bucket/uploads/b.png",
                ],
            ))
            .await;
        assert!(result.success);

        // A missing second image still aborts the job even though it is
        // never used downstream
        let store = Arc::new(MemoryStore::with_object("uploads/a.png", sample_png()));
        let pipeline = pipeline_with(
            store,
            Arc::new(RecordingReporter::default()),
            Arc::new(StubEngine),
        );
        let result = pipeline
            .run(&job(
                "d-9",
                "ROYAL",
                &[
                    "s3://test-bucket/uploads/a.png",
                    "s3://test-bucket/uploads/gone.png",
                ],
            ))
            .await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn pet_features_feed_the_prompt() {
        // Sanity check that the analysis stage wiring matches the prompt
        // builder contract end to end
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([180, 120, 60])));
        let features: PetFeatures = analyze_pet_features(&img);
        let prompts = generate_prompt(&features, "METAL");
        assert!(prompts.positive.contains("RGB(180, 120, 60)"));
        assert!(prompts.positive.contains("regal royal portrait"));
    }
}
