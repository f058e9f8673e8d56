use std::env;
use std::str::FromStr;

use dotenvy::dotenv;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    /// Only `serve` signs tokens, so the CLI runs without it.
    pub jwt_secret: Option<String>,
    pub server_addr: String,
    pub api_prefix: String,
    pub access_token_ttl: usize,

    // Rate limiting, 0 disables
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_attendance_per_min: u32,

    // Face pipeline
    pub cascade_path: String,
    pub detect_scale_factor: f64,
    pub detect_min_neighbors: u32,
    pub detect_min_face_size: u32,
    pub match_threshold: f64,
    pub recognizer_cache: bool,

    pub max_payload_bytes: usize,
    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            jwt_secret: lookup("JWT_SECRET").filter(|s| !s.is_empty()),
            server_addr: lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:5000".to_string()),
            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            access_token_ttl: parse_or(&lookup, "ACCESS_TOKEN_TTL", 900)?, // 15 min

            rate_login_per_min: parse_or(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parse_or(&lookup, "RATE_REGISTER_PER_MIN", 30)?,
            rate_attendance_per_min: parse_or(&lookup, "RATE_ATTENDANCE_PER_MIN", 120)?,

            cascade_path: lookup("CASCADE_PATH")
                .unwrap_or_else(|| "haarcascade_frontalface_default.xml".to_string()),
            detect_scale_factor: parse_or(&lookup, "DETECT_SCALE_FACTOR", 1.1)?,
            detect_min_neighbors: parse_or(&lookup, "DETECT_MIN_NEIGHBORS", 5)?,
            detect_min_face_size: parse_or(&lookup, "DETECT_MIN_FACE_SIZE", 0)?,
            match_threshold: parse_or(&lookup, "MATCH_THRESHOLD", 70.0)?,
            recognizer_cache: parse_or(&lookup, "RECOGNIZER_CACHE", true)?,

            max_payload_bytes: parse_or(&lookup, "MAX_PAYLOAD_BYTES", 10 * 1024 * 1024)?,
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_level: parse_or(&lookup, "LOG_LEVEL", tracing::Level::DEBUG)?,
        };

        if config.detect_scale_factor <= 1.0 {
            return Err(ConfigError::Invalid {
                key: "DETECT_SCALE_FACTOR",
                value: config.detect_scale_factor.to_string(),
            });
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(default),
    }
}
