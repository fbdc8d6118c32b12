//! Configuration loading from environment.

use std::env;

/// Application configuration.
pub struct Config {
    pub database_url: String,
    /// Optional fixed seed for the random source, for deterministic
    /// account-number and reference generation.
    pub rng_seed: Option<u64>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://ledger.db?mode=rwc".to_string());

        let rng_seed = match env::var("LEDGER_RNG_SEED") {
            Ok(seed) => Some(seed.parse()?),
            Err(_) => None,
        };

        Ok(Self {
            database_url,
            rng_seed,
        })
    }
}
