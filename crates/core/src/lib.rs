//! Core logic for provisioning a compressed-record tree and minting into it.
//!
//! This crate holds the parts that need real design and no transport:
//!
//! - **Planning**: tree shape → account size, capacity, and allocation cost
//! - **Feasibility**: stop before spending when the balance cannot cover it
//! - **Balance guard**: keep an actor above an operational floor
//! - **Diagnostics**: recover a signature from an error and fetch its logs
//!
//! Network access goes through the [`LedgerClient`] and [`RecordIssuer`]
//! capabilities; the batch orchestration that fans out over them lives in
//! `arbor-minter`.

mod balance;
mod diagnostics;
mod error;
mod feasibility;
mod planner;
mod traits;

#[cfg(test)]
mod testing;

pub use balance::{
    ensure_minimum_balance, BalanceCheck, BalanceGuard, DEFAULT_BALANCE_FLOOR,
    DEFAULT_TOP_UP_AMOUNT,
};
pub use diagnostics::{
    diagnose, extract_signature, extract_signature_from_text, fetch_logs, Diagnosis,
    DiagnosticSource, LogReport,
};
pub use error::{InsufficientFunds, LedgerError, PlanningError};
pub use feasibility::{check_feasible, require_feasible};
pub use planner::compute_requirements;
pub use traits::{LedgerClient, RecordIssuer};
