use std::time::Duration;

/// Server configuration loaded from environment variables.
///
/// All fields except the access token have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background loops to stop (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Shared secret expected in the `access-token` header.
    pub access_token: String,
    /// Background loop intervals.
    pub scheduler: SchedulerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                       |
    /// | `ACCESS_TOKEN`          | required                   |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let access_token = std::env::var("ACCESS_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())
            .expect("ACCESS_TOKEN must be set");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            access_token,
            scheduler: SchedulerConfig::from_env(),
        }
    }
}

/// Intervals of the submission and reconciliation loops.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub submission_interval: Duration,
    pub reconciliation_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            submission_interval: Duration::from_secs(5),
            reconciliation_interval: Duration::from_secs(10),
        }
    }
}

impl SchedulerConfig {
    /// | Env Var                        | Default |
    /// |--------------------------------|---------|
    /// | `SUBMISSION_INTERVAL_SECS`     | `5`     |
    /// | `RECONCILIATION_INTERVAL_SECS` | `10`    |
    pub fn from_env() -> Self {
        let submission_secs: u64 = std::env::var("SUBMISSION_INTERVAL_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("SUBMISSION_INTERVAL_SECS must be a valid u64");

        let reconciliation_secs: u64 = std::env::var("RECONCILIATION_INTERVAL_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("RECONCILIATION_INTERVAL_SECS must be a valid u64");

        Self {
            submission_interval: Duration::from_secs(submission_secs.max(1)),
            reconciliation_interval: Duration::from_secs(reconciliation_secs.max(1)),
        }
    }
}
