//! In-crate ledger stub for unit tests.

use crate::{LedgerClient, LedgerError};
use arbor_types::{Address, Lamports, Signature, TransactionRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Rent-exemption formula: 128 bytes of overhead, 3480 lamports per
/// byte-year, two years.
pub fn rent_exempt_minimum(size_bytes: u64) -> Lamports {
    Lamports((size_bytes + 128) * 3_480 * 2)
}

#[derive(Default)]
pub struct StubLedger {
    pub balances: Mutex<HashMap<Address, Lamports>>,
    pub records: HashMap<String, TransactionRecord>,
    pub fixed_cost: Option<Lamports>,
    pub fail_cost_lookup: bool,
    pub fail_top_up: bool,
    pub fail_record_lookup: bool,
    pub cost_lookups: AtomicUsize,
    pub top_ups: Mutex<Vec<(Address, Lamports)>>,
}

impl StubLedger {
    pub fn with_balance(address: Address, balance: Lamports) -> Self {
        let stub = Self::default();
        stub.balances.lock().insert(address, balance);
        stub
    }
}

#[async_trait]
impl LedgerClient for StubLedger {
    async fn get_balance(&self, address: &Address) -> Result<Lamports, LedgerError> {
        Ok(self
            .balances
            .lock()
            .get(address)
            .copied()
            .unwrap_or_default())
    }

    async fn get_allocation_cost(&self, size_bytes: u64) -> Result<Lamports, LedgerError> {
        self.cost_lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_cost_lookup {
            return Err(LedgerError::Transport("connection refused".into()));
        }
        Ok(self
            .fixed_cost
            .unwrap_or_else(|| rent_exempt_minimum(size_bytes)))
    }

    async fn request_top_up(
        &self,
        address: &Address,
        amount: Lamports,
    ) -> Result<Signature, LedgerError> {
        if self.fail_top_up {
            return Err(LedgerError::Rpc {
                code: 429,
                message: "airdrop limit reached".into(),
                signature: None,
            });
        }
        self.top_ups.lock().push((*address, amount));
        let mut balances = self.balances.lock();
        let balance = balances.entry(*address).or_default();
        *balance = *balance + amount;
        Ok(Signature::new([9u8; 64]))
    }

    async fn get_transaction_record(
        &self,
        signature: &str,
    ) -> Result<Option<TransactionRecord>, LedgerError> {
        if self.fail_record_lookup {
            return Err(LedgerError::Transport("timed out".into()));
        }
        Ok(self.records.get(signature).cloned())
    }
}
