//! Concurrent batch minting with settle-all aggregation.
//!
//! Every job runs as its own tokio task against a shared issuer. The batch
//! waits for all of them: a failed, panicked or timed-out job becomes a
//! `Failed` outcome at its own index and never affects its siblings.

use arbor_core::{LedgerError, RecordIssuer};
use arbor_types::{ErrorInfo, FailureKind, MintJob, Signature, TransactionOutcome};
use futures::future::join_all;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Limits applied to one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchLimits {
    /// Maximum mints in flight. `None` submits every job at once.
    pub max_concurrency: Option<usize>,
    /// Deadline for one mint, counted from when it acquires a slot.
    pub job_deadline: Option<Duration>,
    /// Deadline for the whole batch, counted from submission.
    pub batch_deadline: Option<Duration>,
}

/// Outcome of one job with its submission latency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub outcome: TransactionOutcome,
    /// Time from acquiring a slot to completion. `None` when the job never
    /// finished on its own.
    pub latency: Option<Duration>,
}

type TaskOutput = (Result<Result<Signature, LedgerError>, Duration>, Duration);

/// Mints a batch of records concurrently.
pub struct BatchMinter<I: ?Sized> {
    issuer: Arc<I>,
    limits: BatchLimits,
}

impl<I> BatchMinter<I>
where
    I: RecordIssuer + ?Sized + 'static,
{
    /// Create a minter with unbounded fan-out and no deadlines.
    pub fn new(issuer: Arc<I>) -> Self {
        Self {
            issuer,
            limits: BatchLimits::default(),
        }
    }

    /// Set the batch limits.
    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    /// Mint every job. The result has one outcome per job, in job order.
    pub async fn mint_batch(&self, jobs: Vec<MintJob>) -> Vec<TransactionOutcome> {
        self.mint_batch_timed(jobs)
            .await
            .into_iter()
            .map(|result| result.outcome)
            .collect()
    }

    /// [`mint_batch`](Self::mint_batch) with per-job latency.
    pub async fn mint_batch_timed(&self, jobs: Vec<MintJob>) -> Vec<JobResult> {
        let total = jobs.len();
        info!(
            jobs = total,
            max_concurrency = ?self.limits.max_concurrency,
            job_deadline = ?self.limits.job_deadline,
            batch_deadline = ?self.limits.batch_deadline,
            "Submitting mint batch"
        );

        let slots = self
            .limits
            .max_concurrency
            .map(|max| Arc::new(Semaphore::new(max.max(1))));
        let batch_deadline = self.limits.batch_deadline.map(|d| Instant::now() + d);

        let handles: Vec<JoinHandle<TaskOutput>> = jobs
            .into_iter()
            .map(|job| {
                let issuer = Arc::clone(&self.issuer);
                let slots = slots.clone();
                let job_deadline = self.limits.job_deadline;
                tokio::spawn(async move {
                    // Held until the task ends; the semaphore is never closed.
                    let _permit = match slots {
                        Some(slots) => slots.acquire_owned().await.ok(),
                        None => None,
                    };
                    let started = Instant::now();
                    let result = match job_deadline {
                        Some(deadline) => tokio::time::timeout(deadline, issuer.mint_record(&job))
                            .await
                            .map_err(|_| deadline),
                        None => Ok(issuer.mint_record(&job).await),
                    };
                    (result, started.elapsed())
                })
            })
            .collect();

        let results = join_all(
            handles
                .into_iter()
                .enumerate()
                .map(|(index, handle)| settle(index, handle, batch_deadline)),
        )
        .await;

        let confirmed = results.iter().filter(|r| r.outcome.is_success()).count();
        info!(
            jobs = total,
            confirmed,
            failed = total - confirmed,
            "Mint batch settled"
        );
        results
    }
}

/// Wait for one task and turn whatever it produced into a [`JobResult`].
async fn settle(
    index: usize,
    mut handle: JoinHandle<TaskOutput>,
    batch_deadline: Option<Instant>,
) -> JobResult {
    let joined = match batch_deadline {
        Some(at) => match tokio::time::timeout_at(at, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                handle.abort();
                warn!(index, "Batch deadline elapsed before mint completed");
                return JobResult {
                    outcome: TransactionOutcome::Failed(ErrorInfo::new(
                        FailureKind::TimedOut,
                        "batch deadline elapsed",
                    )),
                    latency: None,
                };
            }
        },
        None => handle.await,
    };

    match joined {
        Ok((Ok(Ok(signature)), latency)) => {
            debug!(index, %signature, ?latency, "Mint confirmed");
            JobResult {
                outcome: TransactionOutcome::Confirmed(signature),
                latency: Some(latency),
            }
        }
        Ok((Ok(Err(e)), latency)) => {
            warn!(index, error = %e, "Mint failed");
            let signature = e.signature().map(str::to_string);
            JobResult {
                outcome: TransactionOutcome::Failed(ErrorInfo::submission(e.to_string(), signature)),
                latency: Some(latency),
            }
        }
        Ok((Err(deadline), _)) => {
            warn!(index, ?deadline, "Job deadline elapsed before mint completed");
            JobResult {
                outcome: TransactionOutcome::Failed(ErrorInfo::new(
                    FailureKind::TimedOut,
                    format!("job deadline of {:?} elapsed", deadline),
                )),
                latency: None,
            }
        }
        Err(e) => {
            warn!(index, error = %e, "Mint task did not complete");
            JobResult {
                outcome: TransactionOutcome::Failed(join_failure(e)),
                latency: None,
            }
        }
    }
}

fn join_failure(err: JoinError) -> ErrorInfo {
    if err.is_panic() {
        let message = panic_message(err.into_panic());
        ErrorInfo::new(FailureKind::Panicked, format!("mint task panicked: {}", message))
    } else {
        ErrorInfo::new(FailureKind::Submission, "mint task was cancelled")
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_test_helpers::{recipients, MintBehavior, MockLedger};
    use arbor_types::{Address, CollectionRef, Lamports, RecordMetadata};

    const PAYER: Address = Address::new([9u8; 32]);

    fn jobs(recipients: &[Address]) -> Vec<MintJob> {
        recipients
            .iter()
            .enumerate()
            .map(|(i, recipient)| MintJob {
                recipient: *recipient,
                metadata: RecordMetadata::new(
                    format!("Record #{}", i),
                    "REC",
                    format!("https://example.com/{}.json", i),
                ),
                tree: Address::new([1u8; 32]),
                collection: CollectionRef {
                    mint: Address::new([2u8; 32]),
                    metadata_account: Address::new([3u8; 32]),
                    master_edition_account: Address::new([4u8; 32]),
                },
            })
            .collect()
    }

    fn funded() -> MockLedger {
        MockLedger::new(PAYER).with_balance(PAYER, Lamports(10_000_000_000))
    }

    #[tokio::test]
    async fn test_one_failure_keeps_siblings() {
        let to = recipients(8);
        let ledger = Arc::new(funded().with_behavior(to[3], MintBehavior::Fail { structured: true }));
        let minter = BatchMinter::new(Arc::clone(&ledger));

        let outcomes = minter.mint_batch(jobs(&to)).await;

        assert_eq!(outcomes.len(), 8);
        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 7);
        let failure = outcomes[3].error().unwrap();
        assert_eq!(failure.kind, FailureKind::Submission);
        assert!(failure.signature.is_some());
        assert_eq!(ledger.minted().len(), 7);
    }

    #[tokio::test]
    async fn test_panic_becomes_failed_outcome_at_its_index() {
        let to = recipients(5);
        let ledger = Arc::new(funded().with_behavior(to[2], MintBehavior::Panic));
        let minter = BatchMinter::new(Arc::clone(&ledger));

        let outcomes = minter.mint_batch(jobs(&to)).await;

        assert_eq!(outcomes.len(), 5);
        let failure = outcomes[2].error().unwrap();
        assert_eq!(failure.kind, FailureKind::Panicked);
        assert!(failure.message.contains("issuer crashed"));
        for (i, outcome) in outcomes.iter().enumerate() {
            if i != 2 {
                assert!(outcome.is_success(), "job {} should be confirmed", i);
            }
        }
    }

    #[tokio::test]
    async fn test_job_deadline_times_out_stalled_job_only() {
        let to = recipients(4);
        let ledger = Arc::new(funded().with_behavior(to[1], MintBehavior::Stall));
        let minter = BatchMinter::new(Arc::clone(&ledger)).with_limits(BatchLimits {
            job_deadline: Some(Duration::from_millis(50)),
            ..Default::default()
        });

        let results = minter.mint_batch_timed(jobs(&to)).await;

        assert_eq!(results.len(), 4);
        assert_eq!(
            results[1].outcome.error().map(|e| e.kind),
            Some(FailureKind::TimedOut)
        );
        assert!(results[1].latency.is_none());
        assert_eq!(results.iter().filter(|r| r.outcome.is_success()).count(), 3);
        assert!(results[0].latency.is_some());
    }

    #[tokio::test]
    async fn test_batch_deadline_times_out_stalled_job() {
        let to = recipients(3);
        let ledger = Arc::new(funded().with_behavior(to[0], MintBehavior::Stall));
        let minter = BatchMinter::new(Arc::clone(&ledger)).with_limits(BatchLimits {
            batch_deadline: Some(Duration::from_millis(50)),
            ..Default::default()
        });

        let outcomes = minter.mint_batch(jobs(&to)).await;

        assert_eq!(
            outcomes[0].error().map(|e| e.kind),
            Some(FailureKind::TimedOut)
        );
        assert!(outcomes[1].is_success());
        assert!(outcomes[2].is_success());
    }

    #[tokio::test]
    async fn test_concurrency_ceiling() {
        let to = recipients(12);
        let ledger = Arc::new(funded().with_mint_delay(Duration::from_millis(20)));
        let minter = BatchMinter::new(Arc::clone(&ledger)).with_limits(BatchLimits {
            max_concurrency: Some(3),
            ..Default::default()
        });

        let outcomes = minter.mint_batch(jobs(&to)).await;

        assert!(outcomes.iter().all(|o| o.is_success()));
        assert_eq!(ledger.max_in_flight(), 3);
    }

    #[tokio::test]
    async fn test_unbounded_fan_out() {
        let to = recipients(6);
        let ledger = Arc::new(funded().with_mint_delay(Duration::from_millis(50)));
        let minter = BatchMinter::new(Arc::clone(&ledger));

        minter.mint_batch(jobs(&to)).await;

        assert_eq!(ledger.max_in_flight(), 6);
    }

    #[tokio::test]
    async fn test_each_job_submitted_once() {
        let to = recipients(5);
        let ledger = Arc::new(funded().with_behavior(to[0], MintBehavior::Fail { structured: false }));
        let minter = BatchMinter::new(Arc::clone(&ledger));

        minter.mint_batch(jobs(&to)).await;

        assert_eq!(ledger.network_calls(), 5);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let minter = BatchMinter::new(Arc::new(funded()));
        assert!(minter.mint_batch(Vec::new()).await.is_empty());
    }
}
