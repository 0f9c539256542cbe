use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::config::env::{self, EnvKey};

pub const DEFAULT_KEY_REGEX: &str = "[^a-zA-Z0-9]";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Which property of an ad identifies its creative in the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyField {
    Resolution,
    Url,
    UniversalAdId,
}

impl From<&str> for KeyField {
    fn from(s: &str) -> Self {
        match s {
            "resolution" => KeyField::Resolution,
            "url" => KeyField::Url,
            _ => KeyField::UniversalAdId,
        }
    }
}

#[derive(Clone, Debug)]
pub struct KeyConfig {
    pub field: KeyField,
    pub regex: Regex,
}

impl KeyConfig {
    pub fn new(field: KeyField, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            field,
            regex: Regex::new(pattern)?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub store_backend: StoreBackend,
    pub redis_url: Option<String>,
    pub encore_url: Url,
    pub encore_jobs_path: String,
    pub encore_profile: String,
    pub ad_server_url: Url,
    pub asset_server_url: Url,
    pub output_bucket_url: Url,
    pub root_url: Url,
    pub key: KeyConfig,
    pub jit_packaging: bool,
    pub packaging_queue: String,
    /// TTL in seconds for records that are still being transcoded or packaged.
    pub in_flight_ttl: Option<u64>,
    pub osc_access_token: Option<String>,
    pub environment: String,
    pub kpi_post_url: Option<Url>,
    pub kpi_export_interval: Duration,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let store_backend = match env::get_or(EnvKey::StoreBackend, "redis").as_str() {
            "redis" => StoreBackend::Redis,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: EnvKey::StoreBackend.as_str(),
                    reason: format!("unknown backend '{other}'"),
                });
            }
        };

        let redis_url = env::get_opt(EnvKey::RedisUrl);
        if store_backend == StoreBackend::Redis && redis_url.is_none() {
            return Err(ConfigError::Missing(EnvKey::RedisUrl.as_str()));
        }

        let key_field = KeyField::from(env::get_or(EnvKey::KeyField, "universalAdId").as_str());
        let key_regex = env::get_or(EnvKey::KeyRegex, DEFAULT_KEY_REGEX);
        let key = KeyConfig::new(key_field, &key_regex).map_err(|e| ConfigError::Invalid {
            key: EnvKey::KeyRegex.as_str(),
            reason: e.to_string(),
        })?;

        let in_flight_ttl = match env::get_parsed(EnvKey::InFlightTtl, 3600u64) {
            0 => None,
            ttl => Some(ttl),
        };

        let kpi_post_url = env::get_opt(EnvKey::KpiPostUrl)
            .map(|raw| parse_url(EnvKey::KpiPostUrl, &raw))
            .transpose()?;

        let legacy_port = env::get_parsed(EnvKey::LegacyPort, 8000u16);

        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, legacy_port),
            store_backend,
            redis_url,
            encore_url: required_url(EnvKey::EncoreUrl)?,
            encore_jobs_path: env::get_or(EnvKey::EncoreJobsPath, "encoreJobs"),
            encore_profile: env::get_or(EnvKey::EncoreProfile, "program"),
            ad_server_url: required_url(EnvKey::AdServerUrl)?,
            asset_server_url: required_url(EnvKey::AssetServerUrl)?,
            output_bucket_url: required_url(EnvKey::OutputBucketUrl)?,
            root_url: required_url(EnvKey::RootUrl)?,
            key,
            jit_packaging: env::get_or(EnvKey::JitPackage, "false") == "true",
            packaging_queue: env::get_or(EnvKey::PackagingQueue, "package"),
            in_flight_ttl,
            osc_access_token: env::get_opt(EnvKey::OscAccessToken),
            environment: env::get_or(EnvKey::Environment, "prod"),
            kpi_post_url,
            kpi_export_interval: Duration::from_secs(
                env::get_parsed(EnvKey::KpiExportInterval, 60u64).max(1),
            ),
        })
    }
}

#[cfg(test)]
impl AppConfig {
    pub(crate) fn sample() -> Self {
        let url = |raw: &str| Url::parse(raw).unwrap();
        Self {
            server_port: 8000,
            store_backend: StoreBackend::Memory,
            redis_url: None,
            encore_url: url("https://encore.example.com"),
            encore_jobs_path: "encoreJobs".to_string(),
            encore_profile: "program".to_string(),
            ad_server_url: url("https://ads.example.com"),
            asset_server_url: url("https://assets.example.com"),
            output_bucket_url: url("s3://bucket/out"),
            root_url: url("https://normalizer.example.com"),
            key: KeyConfig::new(KeyField::UniversalAdId, DEFAULT_KEY_REGEX).unwrap(),
            jit_packaging: true,
            packaging_queue: "package".to_string(),
            in_flight_ttl: Some(3600),
            osc_access_token: None,
            environment: "prod".to_string(),
            kpi_post_url: None,
            kpi_export_interval: Duration::from_secs(60),
        }
    }
}

fn required_url(key: EnvKey) -> Result<Url, ConfigError> {
    let raw = env::get_opt(key).ok_or(ConfigError::Missing(key.as_str()))?;
    parse_url(key, &raw)
}

fn parse_url(key: EnvKey, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim().trim_end_matches('/')).map_err(|e| ConfigError::Invalid {
        key: key.as_str(),
        reason: e.to_string(),
    })
}
