// Status backend reporter
//
// Applies partial updates to the job record. Every call returns an explicit
// Result so the "never fails the job" contract lives at the call site: the
// pipeline logs and discards failures instead of propagating them.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::config::Config;
use crate::core::errors::{StatusError, StatusResult};
use crate::core::types::JobStatus;

/// Partial-update record store keyed by job id
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn update(
        &self,
        job_id: &str,
        status: JobStatus,
        progress: u8,
        step: &str,
        extra: Option<Value>,
    ) -> StatusResult<()>;
}

/// Supabase REST implementation (PATCH on the designs table filtered by id)
pub struct SupabaseReporter {
    config: Arc<Config>,
    http_client: reqwest::Client,
}

impl SupabaseReporter {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create status HTTP client: {}", e))?;

        Ok(Self { config, http_client })
    }
}

#[async_trait]
impl StatusReporter for SupabaseReporter {
    async fn update(
        &self,
        job_id: &str,
        status: JobStatus,
        progress: u8,
        step: &str,
        extra: Option<Value>,
    ) -> StatusResult<()> {
        let (url, api_key) = match (&self.config.status.url, &self.config.status.api_key) {
            (Some(url), Some(key)) => (url, key),
            _ => {
                warn!("Status backend credentials not configured, skipping status update");
                return Ok(());
            }
        };

        let mut payload = json!({
            "status": status.as_str(),
            "progress": progress,
            "current_step": step,
            "updated_at": chrono::Utc::now().to_rfc3339(),
        });
        if let (Some(map), Some(Value::Object(extra_map))) = (payload.as_object_mut(), extra) {
            map.extend(extra_map);
        }

        let response = self
            .http_client
            .patch(format!(
                "{}/rest/v1/designs?id=eq.{}",
                url.trim_end_matches('/'),
                job_id
            ))
            .header("apikey", api_key)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StatusError::UnexpectedStatus(response.status().as_u16()));
        }

        debug!(job_id, step, progress, "Status updated");
        Ok(())
    }
}
