//! End-to-end run: plan, gate, provision, mint, diagnose, report.

use crate::batch::{BatchLimits, BatchMinter};
use crate::config::MinterConfig;
use crate::report::{BatchReport, LatencyStats};
use arbor_core::{
    compute_requirements, diagnose, require_feasible, InsufficientFunds, LedgerClient,
    LedgerError, PlanningError, RecordIssuer,
};
use arbor_types::{
    Address, BalanceSnapshot, Cluster, CollectionMetadata, MetadataError, MintJob, RecordMetadata,
    TreeSizingParams,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that stop a run before the batch is submitted.
///
/// Per-job failures are not errors: they are reported as outcomes.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    InsufficientFunds(#[from] InsufficientFunds),

    #[error("Invalid metadata: {0}")]
    Metadata(#[from] MetadataError),

    #[error("{requested} recipients exceed tree capacity of {capacity}")]
    ExceedsCapacity { requested: u64, capacity: u64 },

    #[error("Balance lookup failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Failed to create {stage}: {source}")]
    Provisioning {
        stage: &'static str,
        #[source]
        source: LedgerError,
    },
}

/// What to provision and whom to mint to.
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub sizing: TreeSizingParams,
    pub collection: CollectionMetadata,
    /// Metadata shared by every minted record.
    pub record: RecordMetadata,
    /// One record is minted per recipient, in this order.
    pub recipients: Vec<Address>,
}

/// Runs a mint request against a ledger and an issuer.
pub struct Pipeline<L: ?Sized, I: ?Sized> {
    ledger: Arc<L>,
    issuer: Arc<I>,
    payer: Address,
    config: MinterConfig,
}

impl<L, I> Pipeline<L, I>
where
    L: LedgerClient + ?Sized,
    I: RecordIssuer + ?Sized + 'static,
{
    /// Create a pipeline that spends from `payer`.
    pub fn new(ledger: Arc<L>, issuer: Arc<I>, payer: Address, config: MinterConfig) -> Self {
        Self {
            ledger,
            issuer,
            payer,
            config,
        }
    }

    pub fn cluster(&self) -> &Cluster {
        &self.config.cluster
    }

    /// Run the request to completion.
    ///
    /// Returns an error only when the run stops before minting. Once the
    /// batch is submitted every job is settled and reported.
    pub async fn run(&self, request: MintRequest) -> Result<BatchReport, PipelineError> {
        let started = Instant::now();
        request.collection.validate()?;
        request.record.validate()?;

        if self.config.auto_top_up {
            if self.config.cluster.has_faucet() {
                self.config
                    .balance_guard()
                    .ensure_minimum_balance(self.ledger.as_ref(), &self.payer, false)
                    .await?;
            } else {
                warn!(cluster = %self.config.cluster, "No faucet on this cluster; skipping top-up");
            }
        }

        let balance = self.ledger.get_balance(&self.payer).await?;
        let starting_balance = BalanceSnapshot::now(self.payer, balance);
        info!(
            payer = %self.payer,
            balance = %balance.format_sol(false),
            "Starting balance"
        );

        let requirement = compute_requirements(self.ledger.as_ref(), request.sizing).await?;

        let requested = request.recipients.len() as u64;
        if requested > requirement.capacity {
            return Err(PipelineError::ExceedsCapacity {
                requested,
                capacity: requirement.capacity,
            });
        }

        require_feasible(balance, requirement.allocation_cost)?;

        let tree = self
            .issuer
            .create_tree(&request.sizing)
            .await
            .map_err(|source| PipelineError::Provisioning {
                stage: "tree",
                source,
            })?;
        info!(tree = %tree.address, signature = %tree.signature, "Tree created");

        let collection = self
            .issuer
            .create_collection(&request.collection)
            .await
            .map_err(|source| PipelineError::Provisioning {
                stage: "collection",
                source,
            })?;
        info!(collection = %collection.mint, "Collection created");

        let jobs: Vec<MintJob> = request
            .recipients
            .iter()
            .map(|recipient| MintJob {
                recipient: *recipient,
                metadata: request.record.clone(),
                tree: tree.address,
                collection,
            })
            .collect();

        let minter = BatchMinter::new(Arc::clone(&self.issuer)).with_limits(BatchLimits {
            max_concurrency: self.config.max_concurrency,
            job_deadline: self.config.job_deadline,
            batch_deadline: self.config.batch_deadline,
        });
        let results = minter.mint_batch_timed(jobs).await;

        // Lookups share the mint ceiling; `buffered` keeps job order.
        let with_logs = self.config.fetch_logs_on_failure;
        let lookups = self.config.max_concurrency.unwrap_or(results.len()).max(1);
        let diagnoses: Vec<_> = stream::iter(results.iter())
            .map(|result| async move {
                match result.outcome.error() {
                    Some(error) => Some(
                        diagnose(self.ledger.as_ref(), &self.config.cluster, error, with_logs)
                            .await,
                    ),
                    None => None,
                }
            })
            .buffered(lookups)
            .collect()
            .await;

        let final_balance = match self.ledger.get_balance(&self.payer).await {
            Ok(balance) => Some(BalanceSnapshot::now(self.payer, balance)),
            Err(e) => {
                warn!(error = %e, "Failed to read closing balance");
                None
            }
        };

        let latency = LatencyStats::from_latencies(results.iter().filter_map(|r| r.latency));
        let report = BatchReport {
            cluster: self.config.cluster.clone(),
            requirement,
            tree,
            collection,
            jobs: BatchReport::jobs_from(&request.recipients, results, diagnoses),
            latency,
            starting_balance,
            final_balance,
            elapsed: started.elapsed(),
        };
        report.log();
        Ok(report)
    }
}
