//! Environment-driven settings, read once at startup.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MODEL_DIR: &str = "model_utils";
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:4000",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:4000",
];

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which backend serves yield prediction and crop recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredictorMode {
    /// ONNX artifacts from the model directory.
    #[default]
    Artifact,
    /// Built-in heuristics, no files needed.
    Heuristic,
}

impl FromStr for PredictorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "artifact" | "onnx" => Ok(PredictorMode::Artifact),
            "heuristic" | "mock" => Ok(PredictorMode::Heuristic),
            other => Err(format!("expected 'artifact' or 'heuristic', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub workers: usize,
    pub cors_origins: Vec<String>,
    pub model_dir: PathBuf,
    pub predictor_mode: PredictorMode,
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            debug: true,
            workers: num_cpus::get(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            predictor_mode: PredictorMode::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            value,
            reason: e.to_string(),
        })
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = parse("PORT", port)?;
        }
        if let Some(debug) = lookup("DEBUG") {
            config.debug = debug.trim().eq_ignore_ascii_case("true");
        }
        if let Some(workers) = lookup("WORKERS") {
            config.workers = parse("WORKERS", workers)?;
            if config.workers == 0 {
                return Err(ConfigError::InvalidValue {
                    var: "WORKERS",
                    value: "0".to_string(),
                    reason: "at least one worker is required".to_string(),
                });
            }
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(dir) = lookup("MODEL_DIR") {
            config.model_dir = PathBuf::from(dir);
        }
        if let Some(mode) = lookup("PREDICTOR_MODE") {
            config.predictor_mode = parse("PREDICTOR_MODE", mode)?;
        }
        if let Some(limit) = lookup("MAX_BODY_BYTES") {
            config.max_body_bytes = parse("MAX_BODY_BYTES", limit)?;
        }

        Ok(config)
    }

    pub fn default_log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
