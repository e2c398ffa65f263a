//! Capacity planning: tree shape to storage size and allocation cost.

use crate::{LedgerClient, PlanningError};
use arbor_types::{StorageRequirement, TreeSizingParams};
use tracing::{debug, info};

/// Compute how much space a tree of `params` needs and what it costs.
///
/// The shape is validated locally before anything else, so an invalid or
/// unsupported shape never costs a network round-trip. The cost itself comes
/// from the ledger's rent-exemption query and is deterministic for a given
/// fee schedule.
pub async fn compute_requirements<L: LedgerClient + ?Sized>(
    ledger: &L,
    params: TreeSizingParams,
) -> Result<StorageRequirement, PlanningError> {
    params.validate()?;

    let size_bytes = params.account_size();
    debug!(%params, size_bytes, "Computed tree account size");

    let allocation_cost = ledger.get_allocation_cost(size_bytes).await?;
    let capacity = params.capacity();

    info!(
        %params,
        size_bytes,
        allocation_cost = allocation_cost.get(),
        allocation_cost_sol = %allocation_cost.format_sol(false),
        capacity,
        "Planned tree storage"
    );

    Ok(StorageRequirement {
        params,
        size_bytes,
        allocation_cost,
        capacity,
    })
}
