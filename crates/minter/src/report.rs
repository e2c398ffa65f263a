//! Report of a pipeline run.

use crate::batch::JobResult;
use arbor_core::Diagnosis;
use arbor_types::{
    Address, BalanceSnapshot, Cluster, CollectionRef, Lamports, StorageRequirement,
    TransactionOutcome, TreeRef,
};
use hdrhistogram::Histogram;
use std::time::Duration;
use tracing::{info, warn};

/// Longest latency the histogram distinguishes.
pub const MAX_TRACKED_LATENCY: Duration = Duration::from_secs(3_600);

/// Latency distribution of confirmed and failed mints that completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyStats {
    pub samples: u64,
    pub min: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
    pub max: Duration,
}

impl LatencyStats {
    /// Summarize `latencies`, recorded at microsecond resolution. Values
    /// above [`MAX_TRACKED_LATENCY`] are clamped to it.
    pub fn from_latencies(latencies: impl IntoIterator<Item = Duration>) -> Self {
        let highest = MAX_TRACKED_LATENCY.as_micros() as u64;
        let Ok(mut histogram) = Histogram::<u64>::new_with_bounds(1, highest, 3) else {
            return Self::default();
        };
        for latency in latencies {
            let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
            histogram.saturating_record(micros);
        }
        if histogram.is_empty() {
            return Self::default();
        }

        let at = |quantile: f64| Duration::from_micros(histogram.value_at_quantile(quantile));
        Self {
            samples: histogram.len(),
            min: Duration::from_micros(histogram.min()),
            p50: at(0.50),
            p90: at(0.90),
            p99: at(0.99),
            max: Duration::from_micros(histogram.max()),
        }
    }
}

/// One job as it appears in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub recipient: Address,
    pub outcome: TransactionOutcome,
    pub latency: Option<Duration>,
    /// Present for failed jobs.
    pub diagnosis: Option<Diagnosis>,
}

/// Everything a pipeline run produced.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub cluster: Cluster,
    pub requirement: StorageRequirement,
    pub tree: TreeRef,
    pub collection: CollectionRef,
    pub jobs: Vec<JobReport>,
    pub latency: LatencyStats,
    pub starting_balance: BalanceSnapshot,
    /// `None` when the closing balance read failed.
    pub final_balance: Option<BalanceSnapshot>,
    pub elapsed: Duration,
}

impl BatchReport {
    /// Assemble jobs from recipients, batch results and diagnoses, all in job
    /// order.
    pub(crate) fn jobs_from(
        recipients: &[Address],
        results: Vec<JobResult>,
        mut diagnoses: Vec<Option<Diagnosis>>,
    ) -> Vec<JobReport> {
        diagnoses.resize(results.len(), None);
        recipients
            .iter()
            .zip(results)
            .zip(diagnoses)
            .map(|((recipient, result), diagnosis)| JobReport {
                recipient: *recipient,
                outcome: result.outcome,
                latency: result.latency,
                diagnosis,
            })
            .collect()
    }

    pub fn total(&self) -> usize {
        self.jobs.len()
    }

    pub fn succeeded(&self) -> usize {
        self.jobs.iter().filter(|j| j.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Indices of failed jobs.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.jobs
            .iter()
            .enumerate()
            .filter(|(_, j)| !j.outcome.is_success())
            .map(|(i, _)| i)
            .collect()
    }

    /// Lamports spent over the run. Diagnostic only.
    pub fn net_spend(&self) -> Option<Lamports> {
        self.final_balance
            .as_ref()
            .map(|closing| self.starting_balance.spent_until(closing))
    }

    /// Narrate the report through `tracing`.
    pub fn log(&self) {
        info!(
            tree = %self.tree.address,
            explorer = %self.cluster.explorer_address_url(&self.tree.address),
            size_bytes = self.requirement.size_bytes,
            capacity = self.requirement.capacity,
            allocation_cost = %self.requirement.allocation_cost.format_sol(false),
            "Tree"
        );
        info!(
            collection = %self.collection.mint,
            explorer = %self.cluster.explorer_address_url(&self.collection.mint),
            "Collection"
        );
        info!(
            total = self.total(),
            succeeded = self.succeeded(),
            failed = self.failed(),
            elapsed = ?self.elapsed,
            "Mint results"
        );
        if self.latency.samples > 0 {
            info!(
                samples = self.latency.samples,
                min = ?self.latency.min,
                p50 = ?self.latency.p50,
                p90 = ?self.latency.p90,
                p99 = ?self.latency.p99,
                max = ?self.latency.max,
                "Mint latency"
            );
        }
        for index in self.failed_indices() {
            let job = &self.jobs[index];
            let error = job.outcome.error().map(ToString::to_string).unwrap_or_default();
            let explorer = job
                .diagnosis
                .as_ref()
                .and_then(|d| d.explorer_url.as_deref())
                .unwrap_or("-");
            warn!(index, recipient = %job.recipient, %error, explorer, "Mint failed");
        }
        match self.net_spend() {
            Some(spent) => info!(
                starting = %self.starting_balance.balance.format_sol(false),
                spent = %spent.format_sol(false),
                "Balance"
            ),
            None => warn!("Closing balance unavailable; net spend unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_types::{ErrorInfo, FailureKind, Signature, TreeSizingParams};
    use tracing_test::traced_test;

    fn report(jobs: Vec<JobReport>, final_balance: Option<Lamports>) -> BatchReport {
        let payer = Address::new([9u8; 32]);
        BatchReport {
            cluster: Cluster::Devnet,
            requirement: StorageRequirement {
                params: TreeSizingParams::new(3, 8, 0),
                size_bytes: 1_304,
                allocation_cost: Lamports(9_966_720),
                capacity: 8,
            },
            tree: TreeRef {
                address: Address::new([1u8; 32]),
                signature: Signature::new([1u8; 64]),
            },
            collection: CollectionRef {
                mint: Address::new([2u8; 32]),
                metadata_account: Address::new([3u8; 32]),
                master_edition_account: Address::new([4u8; 32]),
            },
            jobs,
            latency: LatencyStats::default(),
            starting_balance: BalanceSnapshot::now(payer, Lamports(1_000_000_000)),
            final_balance: final_balance.map(|b| BalanceSnapshot::now(payer, b)),
            elapsed: Duration::from_millis(120),
        }
    }

    fn job(outcome: TransactionOutcome) -> JobReport {
        JobReport {
            recipient: Address::new([5u8; 32]),
            outcome,
            latency: None,
            diagnosis: None,
        }
    }

    #[test]
    fn test_latency_percentiles() {
        let latencies = (1..=100).map(Duration::from_millis);
        let stats = LatencyStats::from_latencies(latencies);

        assert_eq!(stats.samples, 100);
        assert_eq!(stats.min, Duration::from_millis(1));
        // Three significant digits of precision.
        let p50 = stats.p50.as_micros() as i64;
        assert!((p50 - 50_000).abs() <= 50, "p50 was {}", p50);
        assert!(stats.max >= Duration::from_millis(100));
        assert!(stats.max <= Duration::from_micros(100_100));
    }

    #[test]
    fn test_latency_keeps_long_samples() {
        let stats = LatencyStats::from_latencies([
            Duration::from_millis(250),
            Duration::from_secs(2),
        ]);

        assert_eq!(stats.samples, 2);
        let min = stats.min.as_micros() as i64;
        assert!((min - 250_000).abs() <= 250, "min was {}", min);
        let max = stats.max.as_micros() as i64;
        assert!((max - 2_000_000).abs() <= 2_000, "max was {}", max);
        assert!(stats.p50 >= Duration::from_millis(249));
    }

    #[test]
    fn test_latency_clamped_to_tracked_range() {
        let stats = LatencyStats::from_latencies([Duration::from_secs(7_200)]);
        assert_eq!(stats.samples, 1);
        assert!(stats.max >= Duration::from_secs(3_590));
        assert!(stats.max <= Duration::from_secs(3_610));
    }

    #[test]
    fn test_latency_empty() {
        assert_eq!(LatencyStats::from_latencies(Vec::new()), LatencyStats::default());
    }

    #[test]
    fn test_counts_and_spend() {
        let jobs = vec![
            job(TransactionOutcome::Confirmed(Signature::new([7u8; 64]))),
            job(TransactionOutcome::Failed(ErrorInfo::new(FailureKind::TimedOut, "late"))),
            job(TransactionOutcome::Confirmed(Signature::new([8u8; 64]))),
        ];
        let report = report(jobs, Some(Lamports(990_000_000)));

        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failed_indices(), vec![1]);
        assert_eq!(report.net_spend(), Some(Lamports(10_000_000)));
    }

    #[traced_test]
    #[test]
    fn test_log_without_closing_balance() {
        let report = report(Vec::new(), None);
        assert_eq!(report.net_spend(), None);
        report.log();
        assert!(logs_contain("Mint results"));
        assert!(logs_contain("net spend unknown"));
    }

    #[test]
    fn test_jobs_from_pads_missing_diagnoses() {
        let recipients = [Address::new([1u8; 32]), Address::new([2u8; 32])];
        let results = vec![
            JobResult {
                outcome: TransactionOutcome::Confirmed(Signature::new([1u8; 64])),
                latency: Some(Duration::from_millis(3)),
            },
            JobResult {
                outcome: TransactionOutcome::Failed(ErrorInfo::submission("boom", None)),
                latency: Some(Duration::from_millis(4)),
            },
        ];

        let jobs = BatchReport::jobs_from(&recipients, results, Vec::new());

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].recipient, recipients[1]);
        assert!(jobs[1].diagnosis.is_none());
        assert_eq!(jobs[0].latency, Some(Duration::from_millis(3)));
    }
}
