//! Batch minting into a provisioned compressed-record tree.
//!
//! - [`BatchMinter`]: concurrent, settle-all submission of mint jobs
//! - [`Pipeline`]: plan, gate, provision, mint and diagnose in one run
//! - [`BatchReport`]: outcomes, latency and spend of a run
//! - [`RpcClient`]: [`LedgerClient`](arbor_core::LedgerClient) over JSON-RPC
//! - [`MinterConfig`]: builder and TOML configuration

pub mod batch;
pub mod client;
pub mod config;
pub mod pipeline;
pub mod report;

pub use batch::{BatchLimits, BatchMinter, JobResult};
pub use client::RpcClient;
pub use config::{ConfigError, MinterConfig, DEFAULT_REQUEST_TIMEOUT};
pub use pipeline::{MintRequest, Pipeline, PipelineError};
pub use report::{BatchReport, JobReport, LatencyStats, MAX_TRACKED_LATENCY};
