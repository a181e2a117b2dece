//! Runtime configuration for the scanner service
//!
//! Loaded from `SCANNER_*` environment variables with warned defaults.
//! Algorithm parameters never live here; they travel in the request options.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

const DEFAULT_GRPC_HOST: &str = "0.0.0.0";
const DEFAULT_GRPC_PORT: u16 = 8080;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Deployment environment tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Local,
    /// Shared development deployment
    Dev,
    /// Production deployment
    Prod,
}

/// Listener settings consumed by the transport adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrpcConfig {
    /// Bind address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Per-request deadline, in seconds
    pub request_timeout_secs: u64,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_GRPC_HOST.to_string(),
            port: DEFAULT_GRPC_PORT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Scanner service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Deployment environment
    pub env: Environment,
    /// Listener settings
    pub grpc: GrpcConfig,
    /// How long cached scan results stay valid, in seconds
    pub cache_ttl_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            env: Environment::default(),
            grpc: GrpcConfig::default(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl ScannerConfig {
    /// Load configuration from environment variables, warning and falling
    /// back to defaults for anything missing or malformed.
    #[must_use]
    pub fn from_env() -> Self {
        let env = match std::env::var("SCANNER_ENV").as_deref() {
            Ok("local") => Environment::Local,
            Ok("dev") => Environment::Dev,
            Ok("prod") => Environment::Prod,
            Ok(other) => {
                warn!(value = other, "unknown SCANNER_ENV, using local");
                Environment::Local
            }
            Err(_) => Environment::Local,
        };

        Self {
            env,
            grpc: GrpcConfig {
                host: std::env::var("SCANNER_GRPC_HOST")
                    .unwrap_or_else(|_| DEFAULT_GRPC_HOST.to_string()),
                port: parsed_var("SCANNER_GRPC_PORT", DEFAULT_GRPC_PORT),
                request_timeout_secs: parsed_var(
                    "SCANNER_GRPC_TIMEOUT_SECS",
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                ),
            },
            cache_ttl_secs: parsed_var("SCANNER_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
        }
    }

    /// Cache TTL as a duration.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Per-request deadline as a duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.grpc.request_timeout_secs)
    }
}

/// Parse an environment variable, warning and defaulting when it is set but
/// malformed.
fn parsed_var<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "malformed value, using default");
            default
        }),
        Err(_) => default,
    }
}
