use crate::chain::Chain;
use crate::checker::ApiEndpoints;
use crate::error::ConfigError;
use crate::utils::ProxyManager;
use config::{Config, Environment, File};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Where a sequential scan starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumePoint {
    /// Decimal page index.
    Page(String),
    /// Private material; its page is looked up through the generator.
    Key(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub chain: Chain,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Requests per minute per client. Falls back to the chain's default.
    #[serde(default)]
    pub rate_per_minute: Option<u32>,
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default)]
    pub resume: Option<ResumePoint>,
    #[serde(default = "default_proxy_file")]
    pub proxy_file: PathBuf,
    /// Discovery log; defaults to `<chain>_output.txt`.
    #[serde(default)]
    pub output_file: Option<PathBuf>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Render the status line on stdout every second.
    #[serde(default = "default_status_line")]
    pub status_line: bool,
    #[serde(default)]
    pub endpoints: ApiEndpoints,
}

fn default_workers() -> usize {
    1
}

fn default_proxy_file() -> PathBuf {
    PathBuf::from(ProxyManager::PROXY_FILE)
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_status_line() -> bool {
    true
}

impl ScanConfig {
    /// Minimal config for `chain`; every other field takes its default.
    pub fn for_chain(chain: Chain) -> Self {
        Self {
            chain,
            workers: default_workers(),
            rate_per_minute: None,
            api_keys: Vec::new(),
            resume: None,
            proxy_file: default_proxy_file(),
            output_file: None,
            request_timeout_secs: default_request_timeout_secs(),
            status_line: default_status_line(),
            endpoints: ApiEndpoints::default(),
        }
    }

    /// Loads a TOML (or any format the `config` crate detects) file, then
    /// applies `SCOUT_*` environment overrides, e.g. `SCOUT_WORKERS=8`.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("SCOUT")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("api_keys"),
            )
            .build()
            .map_err(|e| ConfigError::Load { msg: e.to_string() })?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| ConfigError::Load { msg: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workers".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.rate_per_minute == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "rate_per_minute".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if let Some(index) = self.api_keys.iter().position(|k| k.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "api_keys".into(),
                reason: format!("entry {} is blank", index + 1),
            });
        }
        if self.chain.requires_credential() && self.api_keys.is_empty() {
            return Err(ConfigError::MissingField {
                field: "api_keys".into(),
            });
        }
        if let Some(ResumePoint::Page(page)) = &self.resume {
            parse_page(page)?;
        }
        Ok(())
    }

    pub fn rate_per_minute(&self) -> u32 {
        self.rate_per_minute
            .unwrap_or_else(|| self.chain.default_rate_per_minute())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn output_file(&self) -> PathBuf {
        self.output_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.chain.default_output_file()))
    }
}

/// Parses a decimal page index.
pub fn parse_page(page: &str) -> Result<BigUint, ConfigError> {
    BigUint::parse_bytes(page.trim().as_bytes(), 10).ok_or_else(|| ConfigError::InvalidValue {
        field: "resume.page".into(),
        reason: format!("'{page}' is not a decimal page index"),
    })
}
