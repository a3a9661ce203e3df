use crate::purity::{effective_threshold, DEFAULT_THRESHOLD};
use crate::retry::MAX_ENGINE_ATTEMPTS;
use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,

    // Engine (OpenAI-compatible)
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_api_url: String,
    pub engine_max_tokens: u32,
    pub engine_timeout: Duration,
    pub engine_max_attempts: u32,

    // Purity
    pub purity_threshold: f64,

    // Cache
    pub cache_capacity: usize,
    pub cache_shards: usize,
    pub fallback_ttl: Duration,

    // Feedback loop
    pub held_out_capacity: usize,
    pub feedback_schedule_times: Vec<String>,
    pub fallback_spike_rate: f64,
    pub fallback_spike_min_samples: usize,
    /// Reports kept in memory; the oldest closed ones are dropped beyond this
    pub feedback_retention: usize,

    // Pipeline
    pub worker_concurrency: usize,
    pub terminology_seed_path: Option<String>,

    // Server
    pub api_key: Option<String>,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            openai_api_key: String::new(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            engine_max_tokens: 2000,
            engine_timeout: Duration::from_secs(20),
            engine_max_attempts: 1,
            purity_threshold: DEFAULT_THRESHOLD,
            cache_capacity: 4096,
            cache_shards: 16,
            fallback_ttl: Duration::from_secs(3600),
            held_out_capacity: 500,
            feedback_schedule_times: vec!["03:00".to_string()],
            fallback_spike_rate: 0.5,
            fallback_spike_min_samples: 20,
            feedback_retention: 1000,
            worker_concurrency: 8,
            terminology_seed_path: None,
            api_key: None,
            port: 8080,
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset or unparseable.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read an optional variable, treating an empty value as unset.
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        Ok(Self {
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),

            // Engine
            openai_api_key: std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?,
            openai_model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_api_url: std::env::var("OPENAI_API_URL").unwrap_or(defaults.openai_api_url),
            engine_max_tokens: env_or("ENGINE_MAX_TOKENS", defaults.engine_max_tokens),
            engine_timeout: Duration::from_secs(env_or(
                "ENGINE_TIMEOUT_SECS",
                defaults.engine_timeout.as_secs(),
            )),
            engine_max_attempts: env_or("ENGINE_MAX_ATTEMPTS", defaults.engine_max_attempts)
                .clamp(1, MAX_ENGINE_ATTEMPTS),

            // Purity
            purity_threshold: effective_threshold(env_or(
                "PURITY_THRESHOLD",
                defaults.purity_threshold,
            )),

            // Cache
            cache_capacity: env_or("CACHE_CAPACITY", defaults.cache_capacity).max(1),
            cache_shards: env_or("CACHE_SHARDS", defaults.cache_shards).clamp(1, 256),
            fallback_ttl: Duration::from_secs(env_or(
                "FALLBACK_TTL_SECS",
                defaults.fallback_ttl.as_secs(),
            )),

            // Feedback loop
            held_out_capacity: env_or("HELD_OUT_CAPACITY", defaults.held_out_capacity),
            feedback_schedule_times: env_opt("FEEDBACK_SCHEDULE_TIMES")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.feedback_schedule_times),
            fallback_spike_rate: env_or("FALLBACK_SPIKE_RATE", defaults.fallback_spike_rate),
            fallback_spike_min_samples: env_or(
                "FALLBACK_SPIKE_MIN_SAMPLES",
                defaults.fallback_spike_min_samples,
            ),
            feedback_retention: env_or("FEEDBACK_RETENTION", defaults.feedback_retention).max(1),

            // Pipeline
            worker_concurrency: env_or("WORKER_CONCURRENCY", defaults.worker_concurrency).max(1),
            terminology_seed_path: env_opt("TERMINOLOGY_SEED_PATH"),

            // Server
            api_key: env_opt("API_KEY"),
            port: env_or("PORT", defaults.port),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purity::PURITY_FLOOR;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "ENVIRONMENT",
        "OPENAI_API_KEY",
        "OPENAI_MODEL",
        "ENGINE_MAX_ATTEMPTS",
        "ENGINE_TIMEOUT_SECS",
        "PURITY_THRESHOLD",
        "CACHE_SHARDS",
        "FEEDBACK_RETENTION",
        "FEEDBACK_SCHEDULE_TIMES",
        "TERMINOLOGY_SEED_PATH",
        "API_KEY",
        "PORT",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_requires_api_key() {
        clear_env();
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");

        let config = Config::from_env().unwrap();
        assert_eq!(config.openai_api_key, "sk-test");
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.engine_max_attempts, 1);
        assert_eq!(config.engine_timeout, Duration::from_secs(20));
        assert_eq!(config.purity_threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.feedback_schedule_times, vec!["03:00"]);
        assert_eq!(config.terminology_seed_path, None);
        assert_eq!(config.api_key, None);
        assert_eq!(config.port, 8080);
        assert_eq!(config.feedback_retention, 1000);
        assert!(!config.is_production());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_clamps_values() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("ENGINE_MAX_ATTEMPTS", "5");
        std::env::set_var("PURITY_THRESHOLD", "0.4");
        std::env::set_var("CACHE_SHARDS", "0");
        std::env::set_var("FEEDBACK_RETENTION", "0");

        let config = Config::from_env().unwrap();
        assert_eq!(config.engine_max_attempts, 2);
        assert_eq!(config.purity_threshold, PURITY_FLOOR);
        assert_eq!(config.cache_shards, 1);
        assert_eq!(config.feedback_retention, 1);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_parses_lists_and_options() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("FEEDBACK_SCHEDULE_TIMES", "03:00, 15:30");
        std::env::set_var("API_KEY", "admin-secret");
        std::env::set_var("TERMINOLOGY_SEED_PATH", "  ");
        std::env::set_var("PORT", "not-a-port");
        std::env::set_var("ENVIRONMENT", "production");

        let config = Config::from_env().unwrap();
        assert_eq!(config.feedback_schedule_times, vec!["03:00", "15:30"]);
        assert_eq!(config.api_key.as_deref(), Some("admin-secret"));
        assert_eq!(config.terminology_seed_path, None);
        assert_eq!(config.port, 8080);
        assert!(config.is_production());

        clear_env();
    }
}
