//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::game::GameConfig;
use crate::util::rate_limit::DEFAULT_INPUT_RATE_LIMIT;

/// Highest accepted tick rate
pub const MAX_TICK_RATE: u32 = 240;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Ticks of countdown after `ready` (0 = start immediately)
    pub countdown_ticks: u32,
    /// Fixed seed for asteroid waves
    pub sim_seed: Option<u64>,
    /// Inbound messages allowed per client per second
    pub input_rate_limit: u32,

    /// Allowed client origins for CORS (comma-separated); CORS is off when unset
    pub client_origin: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let tick_rate = parse_or(&lookup, "TICK_RATE", crate::game::tuning::DEFAULT_TICK_RATE)?;
        if tick_rate == 0 || tick_rate > MAX_TICK_RATE {
            return Err(ConfigError::Invalid("TICK_RATE"));
        }

        let input_rate_limit = parse_or(&lookup, "INPUT_RATE_LIMIT", DEFAULT_INPUT_RATE_LIMIT)?;
        if input_rate_limit == 0 {
            return Err(ConfigError::Invalid("INPUT_RATE_LIMIT"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            tick_rate,
            countdown_ticks: parse_or(&lookup, "COUNTDOWN_TICKS", 0)?,
            sim_seed: lookup("SIM_SEED")
                .map(|v| v.parse().map_err(|_| ConfigError::Invalid("SIM_SEED")))
                .transpose()?,
            input_rate_limit,

            client_origin: lookup("CLIENT_ORIGIN").filter(|v| !v.trim().is_empty()),
        })
    }

    /// Simulation parameters derived from this configuration
    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            countdown_ticks: self.countdown_ticks,
            seed: self.sim_seed,
            ..GameConfig::default()
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
