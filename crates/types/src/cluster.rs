//! Ledger clusters and block-explorer links.

use crate::{Address, Signature};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::form_urlencoded;

/// Base URL of the public block explorer.
pub const EXPLORER_BASE_URL: &str = "https://explorer.solana.com";

/// A ledger cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Cluster {
    #[default]
    Devnet,
    Testnet,
    Mainnet,
    /// A private or local cluster, identified by its RPC URL.
    Custom(String),
}

impl Cluster {
    /// Public RPC endpoint of the cluster.
    pub fn default_rpc_url(&self) -> &str {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::Mainnet => "https://api.mainnet-beta.solana.com",
            Cluster::Custom(url) => url,
        }
    }

    /// Whether the cluster hands out free test funds.
    pub fn has_faucet(&self) -> bool {
        !matches!(self, Cluster::Mainnet)
    }

    /// Explorer page for a transaction.
    pub fn explorer_tx_url(&self, signature: &str) -> String {
        self.explorer_url("tx", signature)
    }

    /// Explorer page for an account.
    pub fn explorer_address_url(&self, address: &Address) -> String {
        self.explorer_url("address", &address.to_base58())
    }

    /// Explorer page for a confirmed signature.
    pub fn explorer_signature_url(&self, signature: &Signature) -> String {
        self.explorer_tx_url(&signature.to_base58())
    }

    fn explorer_url(&self, kind: &str, id: &str) -> String {
        let base = format!("{}/{}/{}", EXPLORER_BASE_URL, kind, id);
        match self {
            Cluster::Mainnet => base,
            Cluster::Devnet | Cluster::Testnet => format!("{}?cluster={}", base, self),
            Cluster::Custom(url) => {
                let encoded: String = form_urlencoded::byte_serialize(url.as_bytes()).collect();
                format!("{}?cluster=custom&customUrl={}", base, encoded)
            }
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cluster::Devnet => write!(f, "devnet"),
            Cluster::Testnet => write!(f, "testnet"),
            Cluster::Mainnet => write!(f, "mainnet-beta"),
            Cluster::Custom(url) => write!(f, "{}", url),
        }
    }
}

impl FromStr for Cluster {
    type Err = UnknownClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "mainnet" | "mainnet-beta" => Ok(Cluster::Mainnet),
            lower if lower.starts_with("http://") || lower.starts_with("https://") => {
                Ok(Cluster::Custom(s.to_string()))
            }
            _ => Err(UnknownClusterError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Cluster {
    type Error = UnknownClusterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cluster> for String {
    fn from(cluster: Cluster) -> Self {
        cluster.to_string()
    }
}

/// Cluster name that is neither a known cluster nor an RPC URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown cluster: {0} (expected devnet, testnet, mainnet-beta or an http(s) URL)")]
pub struct UnknownClusterError(pub String);
