use crate::core::errors::ConfigError;
use std::env;
use tracing::Level;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub log_level: Level,
}

/// Blob store configuration (S3-compatible gateway)
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub access_token: Option<String>,
    pub bucket: String,
}

/// Status backend configuration. Missing URL or key degrades status
/// reporting to a logged no-op, never an error.
#[derive(Debug, Clone)]
pub struct StatusConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
}

/// Named set of inference resolution/step/guidance constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceProfile {
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub attention_slicing: bool,
    pub cpu_offload: bool,
}

impl InferenceProfile {
    /// Low-footprint profile for 16GB-class GPUs
    pub fn fast() -> Self {
        Self {
            width: 512,
            height: 512,
            num_inference_steps: 20,
            guidance_scale: 7.5,
            attention_slicing: false,
            cpu_offload: false,
        }
    }

    /// High-fidelity profile for print quality, with memory-saving toggles
    pub fn quality() -> Self {
        Self {
            width: 1024,
            height: 1024,
            num_inference_steps: 28,
            guidance_scale: 7.5,
            attention_slicing: true,
            cpu_offload: true,
        }
    }
}

/// Inference engine configuration
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub endpoint: String,
    pub profile: InferenceProfile,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub status: StatusConfig,
    pub inference: InferenceConfig,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        Self::load_from_env()
    }

    fn load_from_env() -> Result<Self, ConfigError> {
        // Parse log level
        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "trace" => Some(Level::TRACE),
                "debug" => Some(Level::DEBUG),
                "info" => Some(Level::INFO),
                "warn" | "warning" => Some(Level::WARN),
                "error" => Some(Level::ERROR),
                _ => None,
            })
            .unwrap_or(Level::INFO);

        let port = match env::var("SERVER_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => 8000,
        };

        let profile = match env::var("INFERENCE_PROFILE") {
            Ok(raw) => match raw.to_lowercase().as_str() {
                "fast" => InferenceProfile::fast(),
                "quality" => InferenceProfile::quality(),
                _ => return Err(ConfigError::UnknownProfile(raw)),
            },
            Err(_) => InferenceProfile::fast(),
        };

        Ok(Self {
            server: ServerConfig {
                port,
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                log_level,
            },
            storage: StorageConfig {
                endpoint: env::var("STORAGE_ENDPOINT").ok().filter(|s| !s.is_empty()),
                access_token: env::var("STORAGE_ACCESS_TOKEN")
                    .ok()
                    .filter(|s| !s.is_empty()),
                bucket: env::var("S3_BUCKET_NAME")
                    .unwrap_or_else(|_| "pet-ai-storage".to_string()),
            },
            status: StatusConfig {
                url: env::var("SUPABASE_URL").ok().filter(|s| !s.is_empty()),
                api_key: env::var("SUPABASE_ANON_KEY").ok().filter(|s| !s.is_empty()),
            },
            inference: InferenceConfig {
                endpoint: env::var("INFERENCE_ENDPOINT")
                    .unwrap_or_else(|_| "http://127.0.0.1:7860".to_string()),
                profile,
            },
        })
    }

    pub fn server_port(&self) -> u16 {
        self.server.port
    }

    pub fn server_host(&self) -> &str {
        &self.server.host
    }

    pub fn log_level(&self) -> Level {
        self.server.log_level
    }

    pub fn bucket(&self) -> &str {
        &self.storage.bucket
    }

    pub fn inference_profile(&self) -> InferenceProfile {
        self.inference.profile
    }

    pub fn status_configured(&self) -> bool {
        self.status.url.is_some() && self.status.api_key.is_some()
    }
}

// Note: No Default implementation because Config::new() can fail
// Users should explicitly call Config::new()? and handle errors

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_profile_constants() {
        let profile = InferenceProfile::fast();
        assert_eq!((profile.width, profile.height), (512, 512));
        assert_eq!(profile.num_inference_steps, 20);
        assert_eq!(profile.guidance_scale, 7.5);
        assert!(!profile.attention_slicing);
        assert!(!profile.cpu_offload);
    }

    #[test]
    fn quality_profile_constants() {
        let profile = InferenceProfile::quality();
        assert_eq!((profile.width, profile.height), (1024, 1024));
        assert_eq!(profile.num_inference_steps, 28);
        assert!(profile.attention_slicing);
        assert!(profile.cpu_offload);
    }
}
