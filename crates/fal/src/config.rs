//! fal client configuration loaded from environment variables.

use std::time::Duration;

use crate::client::app_root;

/// Default queue endpoint.
pub const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";

/// Default storage endpoint used for source image uploads.
pub const DEFAULT_STORAGE_URL: &str = "https://rest.alpha.fal.ai";

/// Default text-to-image model.
pub const DEFAULT_MODEL: &str = "fal-ai/flux/schnell";

/// Default image-to-image model.
pub const DEFAULT_IMAGE_TO_IMAGE_MODEL: &str = "fal-ai/flux/dev/image-to-image";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum FalConfigError {
    #[error("{image_to_image_model} is not served by the same fal app as {model}")]
    AppMismatch {
        model: String,
        image_to_image_model: String,
    },
}

/// Connection settings for [`crate::FalClient`].
#[derive(Debug, Clone)]
pub struct FalConfig {
    /// API key sent as `Authorization: Key <key>`.
    pub api_key: String,
    pub queue_url: String,
    pub storage_url: String,
    pub model: String,
    pub image_to_image_model: String,
    pub request_timeout: Duration,
}

impl FalConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                            |
    /// |----------------------------|------------------------------------|
    /// | `FAL_KEY`                  | empty                              |
    /// | `FAL_QUEUE_URL`            | `https://queue.fal.run`            |
    /// | `FAL_STORAGE_URL`          | `https://rest.alpha.fal.ai`        |
    /// | `FAL_MODEL`                | `fal-ai/flux/schnell`              |
    /// | `FAL_IMAGE_TO_IMAGE_MODEL` | `fal-ai/flux/dev/image-to-image`   |
    /// | `FAL_REQUEST_TIMEOUT_SECS` | `30`                               |
    ///
    /// Status and result lookups use the app root of `FAL_MODEL`, so both
    /// models must belong to the same fal app. Panics otherwise.
    pub fn from_env() -> Self {
        let api_key = std::env::var("FAL_KEY").unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!("FAL_KEY is not set; provider calls will be rejected");
        }

        let request_timeout_secs: u64 = std::env::var("FAL_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
            .parse()
            .expect("FAL_REQUEST_TIMEOUT_SECS must be a valid u64");

        let config = Self {
            api_key,
            queue_url: env_or("FAL_QUEUE_URL", DEFAULT_QUEUE_URL),
            storage_url: env_or("FAL_STORAGE_URL", DEFAULT_STORAGE_URL),
            model: env_or("FAL_MODEL", DEFAULT_MODEL),
            image_to_image_model: env_or("FAL_IMAGE_TO_IMAGE_MODEL", DEFAULT_IMAGE_TO_IMAGE_MODEL),
            request_timeout: Duration::from_secs(request_timeout_secs),
        };
        config
            .validate()
            .expect("FAL_MODEL and FAL_IMAGE_TO_IMAGE_MODEL must share a fal app");
        config
    }

    /// Check that both models resolve to the same queue app, since request
    /// ids carry no record of the model they were submitted to.
    pub fn validate(&self) -> Result<(), FalConfigError> {
        let text = app_root(&self.model);
        let image = app_root(&self.image_to_image_model);
        if text != image {
            return Err(FalConfigError::AppMismatch {
                model: self.model.clone(),
                image_to_image_model: self.image_to_image_model.clone(),
            });
        }
        Ok(())
    }

    /// Configuration with defaults and the given key, for tests and tooling.
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            storage_url: DEFAULT_STORAGE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            image_to_image_model: DEFAULT_IMAGE_TO_IMAGE_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_models_share_an_app() {
        assert!(FalConfig::with_key("k").validate().is_ok());
    }

    #[test]
    fn image_to_image_model_from_another_app_is_rejected() {
        let mut config = FalConfig::with_key("k");
        config.image_to_image_model = "fal-ai/flux-pro/v1.1/redux".to_string();

        let err = config.validate().unwrap_err();

        assert!(matches!(err, FalConfigError::AppMismatch { .. }));
        assert_eq!(
            err.to_string(),
            "fal-ai/flux-pro/v1.1/redux is not served by the same fal app as fal-ai/flux/schnell"
        );
    }

    #[test]
    fn variants_of_one_app_are_accepted() {
        let mut config = FalConfig::with_key("k");
        config.model = "fal-ai/flux/dev".to_string();
        config.image_to_image_model = "fal-ai/flux/dev/image-to-image".to_string();

        assert!(config.validate().is_ok());
    }
}
