use crate::Error;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Which cache backend the proxy talks to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheKind {
    Memory,
    Http,
}

impl FromStr for CacheKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(CacheKind::Memory),
            "http" => Ok(CacheKind::Http),
            other => Err(Error::InvalidConfig(format!(
                "unknown cache type '{}', expected 'memory' or 'http'",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub kind: CacheKind,
    pub url: String,
    pub name: String,
    pub timeout: Duration,
    pub max_entries: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub allowed_origins: Vec<String>,
    pub allow_invalidation: bool,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
}

impl Config {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_HTTP_PORT: u16 = 8080;
    const DEFAULT_UPSTREAM_URL: &'static str = "http://localhost:9000/DiyanetService";
    const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 10_000;
    const DEFAULT_CACHE_URL: &'static str = "http://localhost:8090";
    const DEFAULT_CACHE_NAME: &'static str = "vakit";
    const DEFAULT_CACHE_TIMEOUT_MS: u64 = 1_000;

    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build the config from any variable source, falling back to defaults on bad values
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |name: &str, default: u64| -> u64 {
            match var(name) {
                Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                    warn!("{} has invalid value '{}', using {}", name, raw, default);
                    default
                }),
                None => default,
            }
        };

        let http_port = match var("VAKIT_HTTP_PORT") {
            Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
                warn!(
                    "VAKIT_HTTP_PORT has invalid value '{}', using {}",
                    raw,
                    Self::DEFAULT_HTTP_PORT
                );
                Self::DEFAULT_HTTP_PORT
            }),
            None => Self::DEFAULT_HTTP_PORT,
        };

        let kind = match var("VAKIT_CACHE_TYPE") {
            Some(raw) => raw.parse::<CacheKind>().unwrap_or_else(|e| {
                warn!("{}, falling back to the in-memory cache", e);
                CacheKind::Memory
            }),
            None => CacheKind::Memory,
        };

        let max_entries = var("VAKIT_CACHE_MAX_ENTRIES").and_then(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|_| warn!("VAKIT_CACHE_MAX_ENTRIES has invalid value '{}', ignoring", raw))
                .ok()
        });

        Self {
            host: var("VAKIT_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            http_port,
            allowed_origins: var("VAKIT_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            allow_invalidation: var("VAKIT_ALLOW_INVALIDATION")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            upstream: UpstreamConfig {
                url: var("VAKIT_UPSTREAM_URL")
                    .unwrap_or_else(|| Self::DEFAULT_UPSTREAM_URL.to_string()),
                username: var("VAKIT_UPSTREAM_USERNAME").filter(|s| !s.is_empty()),
                password: var("VAKIT_UPSTREAM_PASSWORD"),
                timeout: Duration::from_millis(parsed(
                    "VAKIT_UPSTREAM_TIMEOUT_MS",
                    Self::DEFAULT_UPSTREAM_TIMEOUT_MS,
                )),
            },
            cache: CacheConfig {
                kind,
                url: var("VAKIT_CACHE_URL").unwrap_or_else(|| Self::DEFAULT_CACHE_URL.to_string()),
                name: var("VAKIT_CACHE_NAME")
                    .unwrap_or_else(|| Self::DEFAULT_CACHE_NAME.to_string()),
                timeout: Duration::from_millis(parsed(
                    "VAKIT_CACHE_TIMEOUT_MS",
                    Self::DEFAULT_CACHE_TIMEOUT_MS,
                )),
                max_entries,
            },
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}
