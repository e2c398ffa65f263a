//! Feasibility gate ahead of tree allocation.

use crate::InsufficientFunds;
use arbor_types::Lamports;
use tracing::warn;

/// Whether `balance` covers `cost`. Equality is feasible.
pub fn check_feasible(balance: Lamports, cost: Lamports) -> bool {
    balance >= cost
}

/// Gate form of [`check_feasible`].
///
/// A shortfall is never transient within a run, so callers stop here and
/// make no further network calls.
pub fn require_feasible(balance: Lamports, cost: Lamports) -> Result<(), InsufficientFunds> {
    if check_feasible(balance, cost) {
        return Ok(());
    }

    let err = InsufficientFunds { balance, cost };
    warn!(
        balance = balance.get(),
        cost = cost.get(),
        shortfall = err.shortfall().get(),
        "Not enough funds to allocate the tree"
    );
    Err(err)
}
