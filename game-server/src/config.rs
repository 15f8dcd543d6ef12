use std::env;
use std::time::Duration;

use game_core::RunnerPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub ai_min_interval_ms: u64,
    pub ai_max_interval_ms: u64,
    pub ai_success_rate: f64,
    pub advisory_url: Option<String>,
    pub puzzles_directory: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3030".to_string())
                .parse()
                .expect("Invalid PORT"),
            ai_min_interval_ms: env::var("AI_MIN_INTERVAL_MS")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .expect("Invalid AI_MIN_INTERVAL_MS"),
            ai_max_interval_ms: env::var("AI_MAX_INTERVAL_MS")
                .unwrap_or_else(|_| "7000".to_string())
                .parse()
                .expect("Invalid AI_MAX_INTERVAL_MS"),
            ai_success_rate: env::var("AI_SUCCESS_RATE")
                .unwrap_or_else(|_| "0.7".to_string())
                .parse()
                .expect("Invalid AI_SUCCESS_RATE"),
            advisory_url: env::var("ADVISORY_URL").ok(),
            puzzles_directory: env::var("PUZZLES_DIRECTORY").ok(),
        }
    }

    /// The timer and success settings for automated actors, as configured.
    pub fn runner_policy(&self) -> RunnerPolicy {
        RunnerPolicy {
            min_interval: Duration::from_millis(self.ai_min_interval_ms),
            max_interval: Duration::from_millis(self.ai_max_interval_ms),
            success_rate: self.ai_success_rate,
            rng_seed: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
