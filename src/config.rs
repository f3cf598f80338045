use std::{collections::HashMap, path::PathBuf, time::Duration};

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Settings taken from `REPOFETCH_*` environment variables.
pub struct RepofetchConfig {
    pub cache_dir: Option<PathBuf>,
    pub entry_prefix: Option<String>,
    pub remote_prefix: Option<String>,
    pub acquisition_timeout: Option<Duration>,
}

impl RepofetchConfig {
    pub fn load() -> anyhow::Result<Self> {
        Ok(RawConfig::load(None)?.into())
    }
}

impl From<RawConfig> for RepofetchConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            cache_dir: raw.cache.dir,
            entry_prefix: raw.cache.prefix,
            remote_prefix: raw.remote.prefix,
            acquisition_timeout: raw.git.timeout.map(Duration::from_secs),
        }
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    remote: RemoteConfig,
    #[serde(default)]
    git: GitConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct CacheConfig {
    dir: Option<PathBuf>,
    prefix: Option<String>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RemoteConfig {
    prefix: Option<String>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct GitConfig {
    /// Seconds.
    timeout: Option<u64>,
}

impl RawConfig {
    fn load(env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                Environment::with_prefix("REPOFETCH")
                    .separator("_")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}
