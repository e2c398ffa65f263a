//! Minter configuration.

use arbor_core::{BalanceGuard, DEFAULT_BALANCE_FLOOR, DEFAULT_TOP_UP_AMOUNT};
use arbor_types::{Cluster, Lamports};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default timeout for a single RPC request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,
}

/// Configuration for a minting run.
#[derive(Debug, Clone, PartialEq)]
pub struct MinterConfig {
    /// JSON-RPC endpoint. Falls back to the cluster's public endpoint.
    pub endpoint: Option<String>,

    /// Cluster, used for explorer links and faucet availability.
    pub cluster: Cluster,

    /// Maximum mints in flight. `None` submits the whole batch at once.
    pub max_concurrency: Option<usize>,

    /// Deadline for one mint, measured from when it starts submitting.
    pub job_deadline: Option<Duration>,

    /// Deadline for the whole batch.
    pub batch_deadline: Option<Duration>,

    /// Operational floor for the payer.
    pub balance_floor: Lamports,

    /// Amount requested per top-up.
    pub top_up_amount: Lamports,

    /// Top the payer up before planning when below the floor.
    pub auto_top_up: bool,

    /// Fetch program logs for every failed mint.
    pub fetch_logs_on_failure: bool,

    /// Timeout for a single RPC request.
    pub request_timeout: Duration,
}

impl Default for MinterConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            cluster: Cluster::default(),
            max_concurrency: None,
            job_deadline: None,
            batch_deadline: None,
            balance_floor: DEFAULT_BALANCE_FLOOR,
            top_up_amount: DEFAULT_TOP_UP_AMOUNT,
            auto_top_up: false,
            fetch_logs_on_failure: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl MinterConfig {
    /// Create a configuration for `cluster` with defaults everywhere else.
    pub fn new(cluster: Cluster) -> Self {
        Self {
            cluster,
            ..Default::default()
        }
    }

    /// Set the RPC endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the cluster.
    pub fn with_cluster(mut self, cluster: Cluster) -> Self {
        self.cluster = cluster;
        self
    }

    /// Bound the number of mints in flight.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max.max(1));
        self
    }

    /// Set the per-job deadline.
    pub fn with_job_deadline(mut self, deadline: Duration) -> Self {
        self.job_deadline = Some(deadline);
        self
    }

    /// Set the batch deadline.
    pub fn with_batch_deadline(mut self, deadline: Duration) -> Self {
        self.batch_deadline = Some(deadline);
        self
    }

    /// Set the payer's operational floor.
    pub fn with_balance_floor(mut self, floor: Lamports) -> Self {
        self.balance_floor = floor;
        self
    }

    /// Set the amount requested per top-up.
    pub fn with_top_up_amount(mut self, amount: Lamports) -> Self {
        self.top_up_amount = amount;
        self
    }

    /// Enable or disable the pre-run top-up.
    pub fn with_auto_top_up(mut self, enabled: bool) -> Self {
        self.auto_top_up = enabled;
        self
    }

    /// Enable or disable log fetching for failed mints.
    pub fn with_fetch_logs_on_failure(mut self, enabled: bool) -> Self {
        self.fetch_logs_on_failure = enabled;
        self
    }

    /// Set the RPC request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The endpoint to connect to.
    pub fn rpc_url(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.cluster.default_rpc_url())
    }

    /// Balance guard built from the floor and top-up amount.
    pub fn balance_guard(&self) -> BalanceGuard {
        BalanceGuard::new(self.balance_floor).with_top_up_amount(self.top_up_amount)
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(contents)?;
        file.into_config()
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

/// On-disk form. Durations are humantime strings such as `"30s"` or `"5m"`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    endpoint: Option<String>,
    cluster: Option<Cluster>,
    max_concurrency: Option<usize>,
    job_deadline: Option<String>,
    batch_deadline: Option<String>,
    balance_floor: Option<u64>,
    top_up_amount: Option<u64>,
    auto_top_up: Option<bool>,
    fetch_logs_on_failure: Option<bool>,
    request_timeout: Option<String>,
}

impl ConfigFile {
    fn into_config(self) -> Result<MinterConfig, ConfigError> {
        let mut config = MinterConfig::default();

        config.endpoint = self.endpoint;
        if let Some(cluster) = self.cluster {
            config.cluster = cluster;
        }
        config.max_concurrency = match self.max_concurrency {
            Some(0) => return Err(ConfigError::ZeroConcurrency),
            other => other,
        };
        config.job_deadline = parse_duration("job_deadline", self.job_deadline)?;
        config.batch_deadline = parse_duration("batch_deadline", self.batch_deadline)?;
        if let Some(timeout) = parse_duration("request_timeout", self.request_timeout)? {
            config.request_timeout = timeout;
        }
        if let Some(floor) = self.balance_floor {
            config.balance_floor = Lamports(floor);
        }
        if let Some(amount) = self.top_up_amount {
            config.top_up_amount = Lamports(amount);
        }
        if let Some(enabled) = self.auto_top_up {
            config.auto_top_up = enabled;
        }
        if let Some(enabled) = self.fetch_logs_on_failure {
            config.fetch_logs_on_failure = enabled;
        }

        Ok(config)
    }
}

fn parse_duration(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|raw| {
            humantime::parse_duration(&raw)
                .map_err(|_| ConfigError::InvalidDuration { field, value: raw })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MinterConfig::default();
        assert_eq!(config.cluster, Cluster::Devnet);
        assert_eq!(config.rpc_url(), "https://api.devnet.solana.com");
        assert_eq!(config.max_concurrency, None);
        assert_eq!(config.balance_floor, Lamports(500_000_000));
        assert!(!config.auto_top_up);
    }

    #[test]
    fn test_from_toml_str() {
        let config = MinterConfig::from_toml_str(
            r#"
            endpoint = "http://127.0.0.1:8899"
            cluster = "testnet"
            max_concurrency = 8
            job_deadline = "30s"
            batch_deadline = "5m"
            balance_floor = 250000000
            fetch_logs_on_failure = false
            "#,
        )
        .unwrap();

        assert_eq!(config.rpc_url(), "http://127.0.0.1:8899");
        assert_eq!(config.cluster, Cluster::Testnet);
        assert_eq!(config.max_concurrency, Some(8));
        assert_eq!(config.job_deadline, Some(Duration::from_secs(30)));
        assert_eq!(config.batch_deadline, Some(Duration::from_secs(300)));
        assert_eq!(config.balance_floor, Lamports(250_000_000));
        assert_eq!(config.top_up_amount, DEFAULT_TOP_UP_AMOUNT);
        assert!(!config.fetch_logs_on_failure);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            MinterConfig::from_toml_str("job_deadline = \"soon\""),
            Err(ConfigError::InvalidDuration {
                field: "job_deadline",
                ..
            })
        ));
        assert!(matches!(
            MinterConfig::from_toml_str("max_concurrency = 0"),
            Err(ConfigError::ZeroConcurrency)
        ));
        assert!(matches!(
            MinterConfig::from_toml_str("max_concurency = 4"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cluster = \"mainnet-beta\"").unwrap();

        let config = MinterConfig::load(file.path()).unwrap();
        assert_eq!(config.cluster, Cluster::Mainnet);
        assert_eq!(config.rpc_url(), "https://api.mainnet-beta.solana.com");
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            MinterConfig::load("/nonexistent/arbor.toml"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_builder() {
        let config = MinterConfig::new(Cluster::Testnet)
            .with_endpoint("http://localhost:8899")
            .with_max_concurrency(0)
            .with_job_deadline(Duration::from_secs(5));
        assert_eq!(config.max_concurrency, Some(1));
        assert_eq!(config.job_deadline, Some(Duration::from_secs(5)));
        assert_eq!(config.balance_guard().floor(), DEFAULT_BALANCE_FLOOR);
    }
}
