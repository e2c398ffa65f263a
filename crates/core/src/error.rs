//! Error types for planning and ledger access.

use arbor_types::{DepthSizePair, Lamports, SizingError};
use thiserror::Error;

/// Errors returned by a ledger collaborator.
///
/// Variants that describe a transaction the ledger saw may carry its
/// signature as a structured field. Diagnostics prefer that field and only
/// fall back to scanning the message text when it is absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The request never reached the ledger or the connection failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        signature: Option<String>,
    },

    /// The transaction was submitted but rejected or failed on-chain.
    #[error("{message}")]
    Rejected {
        message: String,
        signature: Option<String>,
    },

    /// The response could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl LedgerError {
    /// Rejection with no structured signature, only text.
    pub fn rejected(message: impl Into<String>) -> Self {
        LedgerError::Rejected {
            message: message.into(),
            signature: None,
        }
    }

    /// The structured signature, if the error carries one.
    pub fn signature(&self) -> Option<&str> {
        match self {
            LedgerError::Rpc { signature, .. } | LedgerError::Rejected { signature, .. } => {
                signature.as_deref()
            }
            LedgerError::Transport(_) | LedgerError::Decode(_) => None,
        }
    }
}

/// Errors while turning a tree shape into a storage requirement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    /// Canopy depth exceeds tree depth.
    #[error("Invalid sizing: canopy depth {canopy_depth} exceeds max depth {max_depth}")]
    InvalidSizing { canopy_depth: u32, max_depth: u32 },

    /// Depth/buffer combination is not in the supported table.
    #[error("Unsupported tree shape: {0}")]
    UnsupportedShape(DepthSizePair),

    /// The allocation cost lookup failed.
    #[error("Allocation cost lookup failed: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<SizingError> for PlanningError {
    fn from(err: SizingError) -> Self {
        match err {
            SizingError::CanopyTooDeep {
                canopy_depth,
                max_depth,
            } => PlanningError::InvalidSizing {
                canopy_depth,
                max_depth,
            },
            SizingError::UnsupportedShape(pair) => PlanningError::UnsupportedShape(pair),
        }
    }
}

/// The balance does not cover the allocation cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Insufficient funds: balance {balance} is below allocation cost {cost}")]
pub struct InsufficientFunds {
    pub balance: Lamports,
    pub cost: Lamports,
}

impl InsufficientFunds {
    /// How much is missing.
    pub fn shortfall(&self) -> Lamports {
        self.cost.saturating_sub(self.balance)
    }
}
