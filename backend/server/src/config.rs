use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

pub const DEFAULT_PUBLIC_BASE_URL: &str = "https://galyleo.app";
pub const DEFAULT_STUDIO_BASE_URL: &str = "https://galyleo.app";

/// Which collaborators back the user registry and the blob store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Redis registry + S3 bucket
    Cloud,
    /// In-process maps, nothing survives a restart
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cloud" => Ok(Backend::Cloud),
            "memory" => Ok(Backend::Memory),
            other => Err(format!("unknown backend '{other}', expected cloud or memory")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub studio_secret: Option<String>,
    pub backend: Backend,
    pub redis_url: String,
    pub dashboard_bucket: String,
    pub s3_endpoint: Option<String>,
    pub public_base_url: String,
    pub studio_base_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let backend = try_load("BACKEND", "cloud")?;
        let studio_secret = var("STUDIO_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| read_secret("STUDIO_SECRET"));

        if studio_secret.is_none() {
            warn!("STUDIO_SECRET not configured, auto-provisioning of users is disabled");
        }

        let public_base_url: String = try_load("PUBLIC_BASE_URL", DEFAULT_PUBLIC_BASE_URL)?;
        let studio_base_url: String = try_load("STUDIO_BASE_URL", DEFAULT_STUDIO_BASE_URL)?;
        if public_base_url.is_empty() || studio_base_url.is_empty() {
            bail!("PUBLIC_BASE_URL and STUDIO_BASE_URL must not be empty");
        }

        Ok(Self {
            port: try_load("PORT", "8080")?,
            studio_secret,
            backend,
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379")?,
            dashboard_bucket: try_load("DASHBOARD_BUCKET", "user-galyleo-dashboards")?,
            s3_endpoint: var("S3_ENDPOINT").ok(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            studio_base_url: studio_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// In-memory configuration with the given secret, used for local runs and tests.
    pub fn memory(studio_secret: Option<&str>) -> Self {
        Self {
            port: 8080,
            studio_secret: studio_secret.map(str::to_string),
            backend: Backend::Memory,
            redis_url: String::new(),
            dashboard_bucket: String::new(),
            s3_endpoint: None,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            studio_base_url: DEFAULT_STUDIO_BASE_URL.to_string(),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("Environment variable {key} not found");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e: T::Err| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw}"))
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("No {secret_name} secret file: {e}");
        })
        .ok()
        .filter(|s| !s.is_empty())
}
