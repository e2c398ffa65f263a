//! Mint jobs, their outcomes, and the ledger records they produce.

use crate::{Address, Lamports, RecordMetadata, Signature};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// A provisioned tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRef {
    /// Tree account address.
    pub address: Address,
    /// Signature of the allocation transaction.
    pub signature: Signature,
}

/// A collection that groups minted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRef {
    /// Collection mint.
    pub mint: Address,
    /// Metadata account of the collection mint.
    pub metadata_account: Address,
    /// Master edition account of the collection mint.
    pub master_edition_account: Address,
}

/// One record to mint into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintJob {
    /// Owner of the new leaf.
    pub recipient: Address,
    pub metadata: RecordMetadata,
    /// Tree the leaf is appended to.
    pub tree: Address,
    pub collection: CollectionRef,
}

/// Why a job did not produce a confirmed signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The ledger or transport rejected the submission.
    Submission,
    /// A job or batch deadline elapsed first.
    TimedOut,
    /// The submitting task panicked.
    Panicked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Submission => write!(f, "submission"),
            FailureKind::TimedOut => write!(f, "timed out"),
            FailureKind::Panicked => write!(f, "panicked"),
        }
    }
}

/// A per-job failure, kept as data rather than propagated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: FailureKind,
    /// Error text as reported by the collaborator.
    pub message: String,
    /// Signature of the failed transaction, when the error carried one.
    pub signature: Option<String>,
}

impl ErrorInfo {
    /// A submission failure.
    pub fn submission(message: impl Into<String>, signature: Option<String>) -> Self {
        Self {
            kind: FailureKind::Submission,
            message: message.into(),
            signature,
        }
    }

    /// A failure with no transaction behind it.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            signature: None,
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Terminal state of one submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionOutcome {
    Confirmed(Signature),
    Failed(ErrorInfo),
}

impl TransactionOutcome {
    /// Signature of a confirmed mint.
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            TransactionOutcome::Confirmed(sig) => Some(sig),
            TransactionOutcome::Failed(_) => None,
        }
    }

    /// Error of a failed mint.
    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            TransactionOutcome::Confirmed(_) => None,
            TransactionOutcome::Failed(info) => Some(info),
        }
    }

    /// Check if the mint was confirmed.
    pub fn is_success(&self) -> bool {
        matches!(self, TransactionOutcome::Confirmed(_))
    }
}

/// Balance of an address at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub address: Address,
    pub balance: Lamports,
    pub taken_at: SystemTime,
}

impl BalanceSnapshot {
    /// Snapshot taken now.
    pub fn now(address: Address, balance: Lamports) -> Self {
        Self {
            address,
            balance,
            taken_at: SystemTime::now(),
        }
    }

    /// Lamports spent between this snapshot and a later one.
    ///
    /// Diagnostic only: top-ups landing in between make this an underestimate.
    pub fn spent_until(&self, later: &BalanceSnapshot) -> Lamports {
        self.balance.saturating_sub(later.balance)
    }
}

/// The parts of a confirmed transaction the diagnostics care about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub slot: u64,
    /// Program log output. `None` when the node did not record any.
    pub log_messages: Option<Vec<String>>,
    /// Execution error rendered as text, if the transaction failed.
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let ok = TransactionOutcome::Confirmed(Signature::new([3u8; 64]));
        assert!(ok.is_success());
        assert!(ok.signature().is_some());
        assert!(ok.error().is_none());

        let failed = TransactionOutcome::Failed(ErrorInfo::submission("blockhash not found", None));
        assert!(!failed.is_success());
        assert!(failed.signature().is_none());
        assert_eq!(failed.error().unwrap().kind, FailureKind::Submission);
    }

    #[test]
    fn test_spent_until_saturates() {
        let address = Address::new([1u8; 32]);
        let before = BalanceSnapshot::now(address, Lamports(1_000));
        let after = BalanceSnapshot::now(address, Lamports(400));
        assert_eq!(before.spent_until(&after), Lamports(600));

        let topped_up = BalanceSnapshot::now(address, Lamports(5_000));
        assert_eq!(before.spent_until(&topped_up), Lamports::ZERO);
    }
}
