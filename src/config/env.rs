use std::env;
use std::str::FromStr;

#[derive(Clone, Copy)]
pub enum EnvKey {
    ServerPort,
    LegacyPort,
    StoreBackend,
    RedisUrl,
    EncoreUrl,
    EncoreJobsPath,
    EncoreProfile,
    AdServerUrl,
    AssetServerUrl,
    OutputBucketUrl,
    RootUrl,
    KeyField,
    KeyRegex,
    JitPackage,
    PackagingQueue,
    InFlightTtl,
    OscAccessToken,
    Environment,
    KpiPostUrl,
    KpiExportInterval,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::LegacyPort => "PORT",
            EnvKey::StoreBackend => "STORE_BACKEND",
            EnvKey::RedisUrl => "REDIS_URL",
            EnvKey::EncoreUrl => "ENCORE_URL",
            EnvKey::EncoreJobsPath => "ENCORE_JOBS_PATH",
            EnvKey::EncoreProfile => "ENCORE_PROFILE",
            EnvKey::AdServerUrl => "AD_SERVER_URL",
            EnvKey::AssetServerUrl => "ASSET_SERVER_URL",
            EnvKey::OutputBucketUrl => "OUTPUT_BUCKET_URL",
            EnvKey::RootUrl => "ROOT_URL",
            EnvKey::KeyField => "KEY_FIELD",
            EnvKey::KeyRegex => "KEY_REGEX",
            EnvKey::JitPackage => "JIT_PACKAGE",
            EnvKey::PackagingQueue => "PACKAGING_QUEUE",
            EnvKey::InFlightTtl => "IN_FLIGHT_TTL",
            EnvKey::OscAccessToken => "OSC_ACCESS_TOKEN",
            EnvKey::Environment => "ENVIRONMENT",
            EnvKey::KpiPostUrl => "KPI_POST_URL",
            EnvKey::KpiExportInterval => "KPI_EXPORT_INTERVAL_SECS",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

/// Like [`get`], but treats an empty value the same as an unset one.
pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str()).ok().filter(|v| !v.trim().is_empty())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
