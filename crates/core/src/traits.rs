//! Capabilities the core calls into.
//!
//! The core never talks to the network directly. Everything it needs from a
//! ledger is expressed by two traits:
//!
//! - [`LedgerClient`]: balance and cost queries, test-fund top-ups and
//!   transaction record lookups. Read-mostly, no signing key required.
//! - [`RecordIssuer`]: the three record-creation primitives (allocate a tree,
//!   issue a collection, mint into the tree). These sign and send
//!   transactions and live outside this workspace.
//!
//! Both traits are `Send + Sync` and take `&self`: a single connection is
//! shared by every concurrent task of a batch, and implementations must
//! support concurrent outstanding requests.

use crate::LedgerError;
use arbor_types::{
    Address, CollectionMetadata, CollectionRef, Lamports, MintJob, Signature, TransactionRecord,
    TreeRef, TreeSizingParams,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Read access to the ledger plus the faucet.
///
/// # Example
///
/// ```ignore
/// let balance = ledger.get_balance(&payer).await?;
/// let cost = ledger.get_allocation_cost(requirement.size_bytes).await?;
/// if balance < cost {
///     ledger.request_top_up(&payer, Lamports::ONE_SOL).await?;
/// }
/// ```
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current balance of `address`.
    async fn get_balance(&self, address: &Address) -> Result<Lamports, LedgerError>;

    /// Minimum balance that keeps an account of `size_bytes` allocated.
    async fn get_allocation_cost(&self, size_bytes: u64) -> Result<Lamports, LedgerError>;

    /// Ask the cluster faucet to send `amount` to `address`.
    async fn request_top_up(
        &self,
        address: &Address,
        amount: Lamports,
    ) -> Result<Signature, LedgerError>;

    /// Look up a transaction by signature.
    ///
    /// The signature is taken as text because diagnostics recover it from
    /// error messages and cannot always decode it to a full [`Signature`].
    /// Returns `Ok(None)` when the ledger has no record of it.
    async fn get_transaction_record(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionRecord>, LedgerError>;
}

/// The record-creation primitives.
#[async_trait]
pub trait RecordIssuer: Send + Sync {
    /// Allocate and initialize a tree account.
    async fn create_tree(&self, params: &TreeSizingParams) -> Result<TreeRef, LedgerError>;

    /// Create the collection mint and its metadata.
    async fn create_collection(
        &self,
        metadata: &CollectionMetadata,
    ) -> Result<CollectionRef, LedgerError>;

    /// Mint one record into `job.tree`. Returns the confirmed signature.
    async fn mint_record(&self, job: &MintJob) -> Result<Signature, LedgerError>;
}

#[async_trait]
impl<T: LedgerClient + ?Sized> LedgerClient for Arc<T> {
    async fn get_balance(&self, address: &Address) -> Result<Lamports, LedgerError> {
        (**self).get_balance(address).await
    }

    async fn get_allocation_cost(&self, size_bytes: u64) -> Result<Lamports, LedgerError> {
        (**self).get_allocation_cost(size_bytes).await
    }

    async fn request_top_up(
        &self,
        address: &Address,
        amount: Lamports,
    ) -> Result<Signature, LedgerError> {
        (**self).request_top_up(address, amount).await
    }

    async fn get_transaction_record(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        (**self).get_transaction_record(signature).await
    }
}

#[async_trait]
impl<T: RecordIssuer + ?Sized> RecordIssuer for Arc<T> {
    async fn create_tree(&self, params: &TreeSizingParams) -> Result<TreeRef, LedgerError> {
        (**self).create_tree(params).await
    }

    async fn create_collection(
        &self,
        metadata: &CollectionMetadata,
    ) -> Result<CollectionRef, LedgerError> {
        (**self).create_collection(metadata).await
    }

    async fn mint_record(&self, job: &MintJob) -> Result<Signature, LedgerError> {
        (**self).mint_record(job).await
    }
}
