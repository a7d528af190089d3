use std::str::FromStr;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP API listen port (default: 3000)
    pub http_port: u16,

    /// Number of notification delivery workers (default: 5)
    pub notifier_workers: usize,

    /// Maximum delivery attempts per notification, first attempt included (default: 3)
    pub notifier_max_retries: u32,

    /// Capacity of the bounded notification queue (default: 1000)
    pub notifier_queue_capacity: usize,

    /// Backoff unit in milliseconds; attempt N waits 2^(N-1) units (default: 1000)
    pub notifier_backoff_base_ms: u64,

    /// Probability that a simulated delivery attempt fails (default: 0.1)
    pub notifier_failure_rate: f64,

    /// Upper bound of the simulated delivery latency in milliseconds (default: 0)
    pub notifier_max_latency_ms: u64,

    /// Seed the in-memory store with sample users, follows and posts
    pub seed_sample_data: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            http_port: parse_var(&lookup, "HTTP_PORT", 3000)?,
            notifier_workers: parse_var(&lookup, "NOTIFIER_WORKERS", 5)?,
            notifier_max_retries: parse_var(&lookup, "NOTIFIER_MAX_RETRIES", 3)?,
            notifier_queue_capacity: parse_var(&lookup, "NOTIFIER_QUEUE_CAPACITY", 1000)?,
            notifier_backoff_base_ms: parse_var(&lookup, "NOTIFIER_BACKOFF_BASE_MS", 1000)?,
            notifier_failure_rate: parse_var(&lookup, "NOTIFIER_FAILURE_RATE", 0.1)?,
            notifier_max_latency_ms: parse_var(&lookup, "NOTIFIER_MAX_LATENCY_MS", 0)?,
            seed_sample_data: parse_var(&lookup, "SEED_SAMPLE_DATA", true)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.notifier_workers == 0 {
            anyhow::bail!("NOTIFIER_WORKERS must be at least 1");
        }
        if self.notifier_max_retries == 0 {
            anyhow::bail!("NOTIFIER_MAX_RETRIES must be at least 1");
        }
        if self.notifier_queue_capacity == 0 {
            anyhow::bail!("NOTIFIER_QUEUE_CAPACITY must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.notifier_failure_rate) {
            anyhow::bail!("NOTIFIER_FAILURE_RATE must be between 0 and 1");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: 3000,
            notifier_workers: 5,
            notifier_max_retries: 3,
            notifier_queue_capacity: 1000,
            notifier_backoff_base_ms: 1000,
            notifier_failure_rate: 0.1,
            notifier_max_latency_ms: 0,
            seed_sample_data: true,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            anyhow::anyhow!(
                "{} must be a valid {}",
                key,
                std::any::type_name::<T>()
            )
        }),
        _ => Ok(default),
    }
}
