use crate::consts::DEFAULT_COMPILER_LIST;
use config::{Config, File};
use cron::Schedule;
use serde::{de::IgnoredAny, Deserialize};
use serde_with::{serde_as, DisplayFromStr};
use std::{num::NonZeroU32, path::PathBuf, str::FromStr};
use url::Url;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub compiler: CompilerFetcherSettings,
    pub rpc: RpcSettings,

    // Is required as we deny unknown fields, but allow users provide
    // path to config through PREFIX__CONFIG env variable. If removed,
    // the setup would fail with `unknown field `config`, expected one of...`
    #[serde(rename = "config")]
    pub config_path: IgnoredAny,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerFetcherSettings {
    pub compilers_dir: PathBuf,
    pub list_url: Url,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub refresh_versions_schedule: Option<Schedule>,
    /// Timeout for list and binary downloads, in seconds.
    pub fetch_timeout: u64,
}

impl Default for CompilerFetcherSettings {
    fn default() -> Self {
        let mut default_dir = std::env::temp_dir();
        default_dir.push("solidity-compilers");
        Self {
            compilers_dir: default_dir,
            list_url: Url::try_from(DEFAULT_COMPILER_LIST).expect("valid url"),
            refresh_versions_schedule: Some(
                Schedule::from_str("0 0 * * * * *").expect("valid schedule"), // every hour
            ),
            fetch_timeout: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RpcSettings {
    pub url: Url,
    /// Timeout for a single `eth_getCode` request, in seconds.
    pub request_timeout: u64,
    /// Number of attempts the client makes per request. Should be at least one.
    pub request_attempts: NonZeroU32,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            url: Url::try_from("http://localhost:8545").expect("valid url"),
            request_timeout: 10,
            request_attempts: NonZeroU32::new(3).expect("is not zero"),
        }
    }
}

impl Settings {
    pub fn new() -> anyhow::Result<Self> {
        let config_path = std::env::var("CONTRACT_VERIFICATION__CONFIG");

        let mut builder = Config::builder();
        if let Ok(config_path) = config_path {
            builder = builder.add_source(File::with_name(&config_path));
        };
        // Use `__` so that it would be possible to address keys with underscores in names (e.g. `list_url`)
        builder = builder
            .add_source(config::Environment::with_prefix("CONTRACT_VERIFICATION").separator("__"));

        let settings: Settings = builder.build()?.try_deserialize()?;

        Ok(settings)
    }
}
