//! Test helpers for arbor.
//!
//! [`MockLedger`] implements both [`LedgerClient`] and [`RecordIssuer`] in
//! memory. Balances move the way they would on a cluster (tree allocation
//! and mints are charged to the payer, top-ups credit the recipient) and
//! individual mints can be scripted to fail, panic or stall by recipient.
//! Signatures come from a seeded RNG, so runs are reproducible.

use arbor_core::{LedgerClient, LedgerError, RecordIssuer};
use arbor_types::{
    Address, CollectionMetadata, CollectionRef, Lamports, MintJob, Signature, TransactionRecord,
    TreeRef, TreeSizingParams,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Fee charged for every transaction.
pub const TRANSACTION_FEE: Lamports = Lamports(5_000);

/// Flat cost of creating a collection (mint, metadata and edition accounts).
pub const COLLECTION_COST: Lamports = Lamports(15_115_600);

/// Rent-exemption formula: 128 bytes of account overhead, 3480 lamports per
/// byte-year, two years.
pub fn rent_exempt_minimum(size_bytes: u64) -> Lamports {
    Lamports((size_bytes + 128) * 3_480 * 2)
}

/// How a scripted mint behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintBehavior {
    /// Succeed after the configured delay.
    Succeed,
    /// Fail on-chain. The error carries the signature only in its text unless
    /// `structured` is set.
    Fail { structured: bool },
    /// Panic inside the issuer.
    Panic,
    /// Never complete.
    Stall,
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<Address, Lamports>,
    records: HashMap<String, TransactionRecord>,
    top_ups: Vec<(Address, Lamports)>,
    trees: Vec<TreeRef>,
    collections: Vec<CollectionRef>,
    minted: Vec<Address>,
    slot: u64,
}

/// In-memory ledger and record issuer.
pub struct MockLedger {
    payer: Address,
    state: Mutex<LedgerState>,
    rng: Mutex<ChaCha8Rng>,
    behaviors: Mutex<HashMap<Address, MintBehavior>>,
    fixed_cost: Option<Lamports>,
    mint_delay: Duration,
    lookup_delay: Duration,
    fail_balance_reads: bool,
    network_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    lookups_in_flight: AtomicUsize,
    max_lookups_in_flight: AtomicUsize,
}

impl MockLedger {
    /// Create a ledger where `payer` pays for every issued record.
    pub fn new(payer: Address) -> Self {
        Self {
            payer,
            state: Mutex::new(LedgerState::default()),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(42)),
            behaviors: Mutex::new(HashMap::new()),
            fixed_cost: None,
            mint_delay: Duration::ZERO,
            lookup_delay: Duration::ZERO,
            fail_balance_reads: false,
            network_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            lookups_in_flight: AtomicUsize::new(0),
            max_lookups_in_flight: AtomicUsize::new(0),
        }
    }

    /// Set a starting balance.
    pub fn with_balance(self, address: Address, balance: Lamports) -> Self {
        self.state.lock().balances.insert(address, balance);
        self
    }

    /// Quote this cost for every allocation instead of the rent formula.
    pub fn with_fixed_cost(mut self, cost: Lamports) -> Self {
        self.fixed_cost = Some(cost);
        self
    }

    /// Delay each mint by `delay`.
    pub fn with_mint_delay(mut self, delay: Duration) -> Self {
        self.mint_delay = delay;
        self
    }

    /// Delay each transaction record lookup by `delay`.
    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = delay;
        self
    }

    /// Make every balance read fail.
    pub fn with_failing_balance_reads(mut self) -> Self {
        self.fail_balance_reads = true;
        self
    }

    /// Script the mint to `recipient`.
    pub fn with_behavior(self, recipient: Address, behavior: MintBehavior) -> Self {
        self.behaviors.lock().insert(recipient, behavior);
        self
    }

    /// Current balance without counting a network call.
    pub fn balance_of(&self, address: &Address) -> Lamports {
        self.state
            .lock()
            .balances
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    /// Every call made through either trait.
    pub fn network_calls(&self) -> usize {
        self.network_calls.load(Ordering::SeqCst)
    }

    /// Highest number of mints observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of transaction record lookups observed in flight at once.
    pub fn max_lookups_in_flight(&self) -> usize {
        self.max_lookups_in_flight.load(Ordering::SeqCst)
    }

    /// Recipients of completed mints, in completion order.
    pub fn minted(&self) -> Vec<Address> {
        self.state.lock().minted.clone()
    }

    /// Trees created so far.
    pub fn trees(&self) -> Vec<TreeRef> {
        self.state.lock().trees.clone()
    }

    /// Collections created so far.
    pub fn collections(&self) -> Vec<CollectionRef> {
        self.state.lock().collections.clone()
    }

    /// Top-ups requested so far.
    pub fn top_ups(&self) -> Vec<(Address, Lamports)> {
        self.state.lock().top_ups.clone()
    }

    fn next_signature(&self) -> Signature {
        let mut bytes = [0u8; 64];
        self.rng.lock().fill_bytes(&mut bytes);
        Signature::new(bytes)
    }

    fn next_address(&self) -> Address {
        let mut bytes = [0u8; 32];
        self.rng.lock().fill_bytes(&mut bytes);
        Address::new(bytes)
    }

    fn record_call(&self) {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Debit the payer, failing the way a cluster does when funds run out.
    fn charge(&self, signature: &Signature, amount: Lamports) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        let balance = state.balances.entry(self.payer).or_default();
        if *balance < amount {
            return Err(LedgerError::Rejected {
                message: format!(
                    "Transaction {} failed: insufficient lamports {}, need {}",
                    signature,
                    balance.get(),
                    amount.get()
                ),
                signature: Some(signature.to_base58()),
            });
        }
        *balance = balance.saturating_sub(amount);
        Ok(())
    }

    fn confirm(&self, signature: &Signature, logs: Vec<String>, error: Option<String>) {
        let mut state = self.state.lock();
        state.slot += 1;
        let slot = state.slot;
        state.records.insert(
            signature.to_base58(),
            TransactionRecord {
                slot,
                log_messages: Some(logs),
                error,
            },
        );
    }

    fn allocation_cost(&self, size_bytes: u64) -> Lamports {
        self.fixed_cost
            .unwrap_or_else(|| rent_exempt_minimum(size_bytes))
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn get_balance(&self, address: &Address) -> Result<Lamports, LedgerError> {
        self.record_call();
        if self.fail_balance_reads {
            return Err(LedgerError::Transport("connection refused".into()));
        }
        Ok(self.balance_of(address))
    }

    async fn get_allocation_cost(&self, size_bytes: u64) -> Result<Lamports, LedgerError> {
        self.record_call();
        Ok(self.allocation_cost(size_bytes))
    }

    async fn request_top_up(
        &self,
        address: &Address,
        amount: Lamports,
    ) -> Result<Signature, LedgerError> {
        self.record_call();
        let signature = self.next_signature();
        {
            let mut state = self.state.lock();
            state.top_ups.push((*address, amount));
            let balance = state.balances.entry(*address).or_default();
            *balance = *balance + amount;
        }
        self.confirm(&signature, vec!["Program 11111111111111111111111111111111 success".into()], None);
        Ok(signature)
    }

    async fn get_transaction_record(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        self.record_call();
        let now = self.lookups_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_lookups_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.lookups_in_flight);

        if !self.lookup_delay.is_zero() {
            tokio::time::sleep(self.lookup_delay).await;
        }
        Ok(self.state.lock().records.get(signature).cloned())
    }
}

#[async_trait]
impl RecordIssuer for MockLedger {
    async fn create_tree(&self, params: &TreeSizingParams) -> Result<TreeRef, LedgerError> {
        self.record_call();
        let signature = self.next_signature();
        let cost = self.allocation_cost(params.account_size()) + TRANSACTION_FEE;
        self.charge(&signature, cost)?;

        let tree = TreeRef {
            address: self.next_address(),
            signature,
        };
        self.confirm(
            &signature,
            vec!["Program log: Instruction: CreateTreeConfig".into()],
            None,
        );
        self.state.lock().trees.push(tree);
        Ok(tree)
    }

    async fn create_collection(
        &self,
        _metadata: &CollectionMetadata,
    ) -> Result<CollectionRef, LedgerError> {
        self.record_call();
        let signature = self.next_signature();
        self.charge(&signature, COLLECTION_COST + TRANSACTION_FEE)?;

        let collection = CollectionRef {
            mint: self.next_address(),
            metadata_account: self.next_address(),
            master_edition_account: self.next_address(),
        };
        self.confirm(
            &signature,
            vec!["Program log: Instruction: CreateMasterEditionV3".into()],
            None,
        );
        self.state.lock().collections.push(collection);
        Ok(collection)
    }

    async fn mint_record(&self, job: &MintJob) -> Result<Signature, LedgerError> {
        self.record_call();
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if !self.mint_delay.is_zero() {
            tokio::time::sleep(self.mint_delay).await;
        }

        let behavior = self
            .behaviors
            .lock()
            .get(&job.recipient)
            .cloned()
            .unwrap_or(MintBehavior::Succeed);

        let signature = self.next_signature();
        match behavior {
            MintBehavior::Succeed => {
                self.charge(&signature, TRANSACTION_FEE)?;
                self.confirm(
                    &signature,
                    vec![
                        "Program log: Instruction: MintToCollectionV1".into(),
                        "Program log: Leaf appended".into(),
                    ],
                    None,
                );
                self.state.lock().minted.push(job.recipient);
                Ok(signature)
            }
            MintBehavior::Fail { structured } => {
                self.charge(&signature, TRANSACTION_FEE)?;
                self.confirm(
                    &signature,
                    vec![
                        "Program log: Instruction: MintToCollectionV1".into(),
                        "Program log: Error: Collection verification failed".into(),
                    ],
                    Some("InstructionError(0, Custom(6021))".into()),
                );
                Err(LedgerError::Rejected {
                    message: format!(
                        "Error: Transaction {} failed: custom program error: 0x1785",
                        signature
                    ),
                    signature: structured.then(|| signature.to_base58()),
                })
            }
            MintBehavior::Panic => panic!("issuer crashed minting to {}", job.recipient),
            MintBehavior::Stall => std::future::pending().await,
        }
    }
}

/// `count` distinct deterministic recipient addresses.
pub fn recipients(count: usize) -> Vec<Address> {
    (0..count)
        .map(|i| {
            let mut bytes = [0u8; 32];
            bytes[..8].copy_from_slice(&(i as u64 + 1).to_le_bytes());
            bytes[31] = 0xA5;
            Address::new(bytes)
        })
        .collect()
}
