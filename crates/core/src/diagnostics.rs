//! Failure diagnostics: recover a transaction signature from an error and
//! pull the transaction's program logs.
//!
//! Error text coming back from the network layer has no stable format. A
//! structured signature field is always preferred; the text scan is a
//! fallback for sources that only hand back a message. Nothing in this
//! module returns an error or panics: an unresolved signature is `None`, a
//! failed log fetch is a [`LogReport::FetchFailed`].

use crate::{LedgerClient, LedgerError};
use arbor_types::{Cluster, ErrorInfo};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Optional `...Error: ` prefix at the start of a line, then `Transaction`
/// or `Signature` (keywords match in any case), a space, and a token of at
/// least 32 base58 characters that ends at a non-alphanumeric character.
const SIGNATURE_PATTERN: &str = r"(?m)^(?:.*?(?i:error): )?(?i:transaction|signature) ([1-9A-HJ-NP-Za-km-z]{32,})(?:[^0-9A-Za-z]|$)";

fn signature_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(SIGNATURE_PATTERN).ok())
        .as_ref()
}

/// An error that may identify the transaction it came from.
pub trait DiagnosticSource {
    /// Signature carried as a typed field, if any.
    fn structured_signature(&self) -> Option<&str>;

    /// Human-readable error text.
    fn message(&self) -> String;
}

impl DiagnosticSource for LedgerError {
    fn structured_signature(&self) -> Option<&str> {
        self.signature()
    }

    fn message(&self) -> String {
        self.to_string()
    }
}

impl DiagnosticSource for ErrorInfo {
    fn structured_signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    fn message(&self) -> String {
        self.message.clone()
    }
}

impl DiagnosticSource for str {
    fn structured_signature(&self) -> Option<&str> {
        None
    }

    fn message(&self) -> String {
        self.to_string()
    }
}

/// Signature of the transaction behind `error`.
pub fn extract_signature<E: DiagnosticSource + ?Sized>(error: &E) -> Option<String> {
    if let Some(signature) = error
        .structured_signature()
        .filter(|s| !s.trim().is_empty())
    {
        return Some(signature.to_string());
    }
    extract_signature_from_text(&error.message())
}

/// Scan free-form error text for a transaction signature.
pub fn extract_signature_from_text(text: &str) -> Option<String> {
    signature_pattern()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

/// What a log fetch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogReport {
    /// Program log lines in execution order.
    Logs(Vec<String>),
    /// The record exists but carries no log messages.
    NoLogMessages,
    /// The ledger has no record of the signature.
    NotFound,
    /// The lookup itself failed.
    FetchFailed(String),
}

impl LogReport {
    /// Log lines, if any were fetched.
    pub fn lines(&self) -> &[String] {
        match self {
            LogReport::Logs(lines) => lines,
            _ => &[],
        }
    }
}

/// Fetch the program logs of `signature`. Failures are reported, not raised.
pub async fn fetch_logs<L: LedgerClient + ?Sized>(ledger: &L, signature: &str) -> LogReport {
    match ledger.get_transaction_record(signature).await {
        Ok(Some(record)) => match record.log_messages {
            Some(lines) if !lines.is_empty() => LogReport::Logs(lines),
            _ => LogReport::NoLogMessages,
        },
        Ok(None) => LogReport::NotFound,
        Err(e) => {
            warn!(signature, error = %e, "Failed to fetch transaction logs");
            LogReport::FetchFailed(e.to_string())
        }
    }
}

/// Everything diagnostics could find out about one failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    pub signature: Option<String>,
    pub explorer_url: Option<String>,
    /// Present only when logs were requested and a signature was found.
    pub logs: Option<LogReport>,
}

impl Diagnosis {
    /// Whether a signature was recovered.
    pub fn is_resolved(&self) -> bool {
        self.signature.is_some()
    }
}

/// Extract the signature of a failure, link it, and optionally fetch logs.
pub async fn diagnose<L, E>(ledger: &L, cluster: &Cluster, error: &E, with_logs: bool) -> Diagnosis
where
    L: LedgerClient + ?Sized,
    E: DiagnosticSource + ?Sized,
{
    let Some(signature) = extract_signature(error) else {
        info!("No transaction signature found in error");
        return Diagnosis {
            signature: None,
            explorer_url: None,
            logs: None,
        };
    };

    let explorer_url = cluster.explorer_tx_url(&signature);

    let logs = if with_logs {
        let report = fetch_logs(ledger, &signature).await;
        log_report(&signature, &explorer_url, &report);
        Some(report)
    } else {
        info!(%signature, explorer = %explorer_url, "Failed transaction");
        None
    };

    Diagnosis {
        signature: Some(signature),
        explorer_url: Some(explorer_url),
        logs,
    }
}

fn log_report(signature: &str, explorer_url: &str, report: &LogReport) {
    match report {
        LogReport::Logs(lines) => {
            info!(signature, explorer = explorer_url, lines = lines.len(), "Transaction logs");
            for line in lines {
                info!(signature, "  {}", line);
            }
        }
        LogReport::NoLogMessages => {
            info!(signature, explorer = explorer_url, "No log messages provided by RPC");
        }
        LogReport::NotFound => {
            info!(signature, explorer = explorer_url, "Transaction not found");
        }
        LogReport::FetchFailed(reason) => {
            warn!(signature, explorer = explorer_url, reason = %reason, "Could not fetch transaction logs");
        }
    }
}
