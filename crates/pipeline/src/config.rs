//! Orchestration settings.

use imagegen_core::types::TaskId;

/// Default cap on tasks generating at the provider at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Settings shared by the dispatcher and the reconciler.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of tasks in `Submitted` state at once.
    pub max_concurrent: usize,
    /// Public base URL of this service. When set, submissions ask the
    /// provider to call back `{base}/api/v1/images/{task_id}/webhook`.
    pub webhook_base_url: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            webhook_base_url: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default              |
    /// |------------------------|----------------------|
    /// | `MAX_CONCURRENT_TASKS` | `5`                  |
    /// | `API_WEBHOOK_BASEURL`  | unset (poll only)    |
    pub fn from_env() -> Self {
        let max_concurrent: usize = std::env::var("MAX_CONCURRENT_TASKS")
            .unwrap_or_else(|_| DEFAULT_MAX_CONCURRENT.to_string())
            .parse()
            .expect("MAX_CONCURRENT_TASKS must be a valid usize");

        let webhook_base_url = std::env::var("API_WEBHOOK_BASEURL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty());

        Self {
            max_concurrent,
            webhook_base_url,
        }
    }

    /// Callback URL for a task, if callbacks are enabled.
    pub fn callback_url(&self, task_id: TaskId) -> Option<String> {
        self.webhook_base_url
            .as_ref()
            .map(|base| format!("{base}/api/v1/images/{task_id}/webhook"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_url_is_none_without_base() {
        assert_eq!(PipelineConfig::default().callback_url(TaskId::nil()), None);
    }

    #[test]
    fn callback_url_points_at_webhook_route() {
        let config = PipelineConfig {
            webhook_base_url: Some("https://api.example.com".into()),
            ..Default::default()
        };
        assert_eq!(
            config.callback_url(TaskId::nil()).unwrap(),
            "https://api.example.com/api/v1/images/00000000-0000-0000-0000-000000000000/webhook"
        );
    }
}
