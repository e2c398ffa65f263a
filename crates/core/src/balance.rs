//! Balance guard: keep an actor funded above an operational floor.

use crate::{LedgerClient, LedgerError};
use arbor_types::{Address, Lamports, Signature, LAMPORTS_PER_SOL};
use tracing::{info, warn};

/// Default operational floor: half a SOL.
pub const DEFAULT_BALANCE_FLOOR: Lamports = Lamports(LAMPORTS_PER_SOL / 2);

/// Default amount requested per top-up: one SOL.
pub const DEFAULT_TOP_UP_AMOUNT: Lamports = Lamports(LAMPORTS_PER_SOL);

/// Result of a balance check.
///
/// `before` is the balance as read before any remediation and is what
/// [`observed`](Self::observed) returns. When a top-up was requested the
/// balance is read again into `after`; a top-up is not guaranteed to have
/// landed by then, so `after` may still equal `before`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceCheck {
    pub before: Lamports,
    /// Signature of the top-up request, if one was made.
    pub top_up: Option<Signature>,
    /// Balance after remediation. Equal to `before` when no top-up was
    /// requested; `None` if the re-read failed.
    pub after: Option<Lamports>,
}

impl BalanceCheck {
    /// The balance read before remediation.
    pub fn observed(&self) -> Lamports {
        self.before
    }

    /// Whether a top-up was requested.
    pub fn topped_up(&self) -> bool {
        self.top_up.is_some()
    }
}

/// Tops an actor up from the faucet when its balance drops below a floor.
#[derive(Debug, Clone, Copy)]
pub struct BalanceGuard {
    floor: Lamports,
    top_up_amount: Lamports,
}

impl Default for BalanceGuard {
    fn default() -> Self {
        Self {
            floor: DEFAULT_BALANCE_FLOOR,
            top_up_amount: DEFAULT_TOP_UP_AMOUNT,
        }
    }
}

impl BalanceGuard {
    /// Create a guard with the given floor and the default top-up amount.
    pub fn new(floor: Lamports) -> Self {
        Self {
            floor,
            ..Default::default()
        }
    }

    /// Set the amount requested per top-up.
    pub fn with_top_up_amount(mut self, amount: Lamports) -> Self {
        self.top_up_amount = amount;
        self
    }

    pub fn floor(&self) -> Lamports {
        self.floor
    }

    pub fn top_up_amount(&self) -> Lamports {
        self.top_up_amount
    }

    /// Whether a balance calls for remediation.
    pub fn needs_top_up(&self, balance: Lamports, force: bool) -> bool {
        force || balance < self.floor
    }

    /// Read the actor's balance and top it up when below the floor or when
    /// `force` is set.
    ///
    /// A failed balance read or top-up request is returned as an error; a
    /// failed re-read after a successful top-up is not, since the top-up has
    /// already been spent.
    pub async fn ensure_minimum_balance<L: LedgerClient + ?Sized>(
        &self,
        ledger: &L,
        actor: &Address,
        force: bool,
    ) -> Result<BalanceCheck, LedgerError> {
        let before = ledger.get_balance(actor).await?;

        if !self.needs_top_up(before, force) {
            return Ok(BalanceCheck {
                before,
                top_up: None,
                after: Some(before),
            });
        }

        info!(
            %actor,
            balance = before.get(),
            floor = self.floor.get(),
            amount = self.top_up_amount.get(),
            force,
            "Requesting top-up"
        );
        let signature = ledger.request_top_up(actor, self.top_up_amount).await?;
        info!(%actor, %signature, "Top-up requested");

        let after = match ledger.get_balance(actor).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!(%actor, error = %e, "Could not re-read balance after top-up");
                None
            }
        };

        Ok(BalanceCheck {
            before,
            top_up: Some(signature),
            after,
        })
    }
}

/// Check `actor` against `floor`, topping up by the default amount.
///
/// Returns the full [`BalanceCheck`]; [`BalanceCheck::observed`] gives the
/// pre-remediation balance.
pub async fn ensure_minimum_balance<L: LedgerClient + ?Sized>(
    ledger: &L,
    actor: &Address,
    floor: Lamports,
    force: bool,
) -> Result<BalanceCheck, LedgerError> {
    BalanceGuard::new(floor)
        .ensure_minimum_balance(ledger, actor, force)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubLedger;

    const ACTOR: Address = Address::new([4u8; 32]);
    const FLOOR: Lamports = Lamports(500_000_000);

    #[tokio::test]
    async fn test_no_top_up_at_or_above_floor() {
        let ledger = StubLedger::with_balance(ACTOR, FLOOR);
        let check = ensure_minimum_balance(&ledger, &ACTOR, FLOOR, false)
            .await
            .unwrap();

        assert!(!check.topped_up());
        assert_eq!(check.observed(), FLOOR);
        assert_eq!(check.after, Some(FLOOR));
        assert!(ledger.top_ups.lock().is_empty());
    }

    #[tokio::test]
    async fn test_top_up_below_floor() {
        let ledger = StubLedger::with_balance(ACTOR, Lamports(499_999_999));
        let check = ensure_minimum_balance(&ledger, &ACTOR, FLOOR, false)
            .await
            .unwrap();

        assert!(check.topped_up());
        assert_eq!(check.observed(), Lamports(499_999_999));
        assert_eq!(check.after, Some(Lamports(1_499_999_999)));
        assert_eq!(
            ledger.top_ups.lock().as_slice(),
            &[(ACTOR, DEFAULT_TOP_UP_AMOUNT)]
        );
    }

    #[tokio::test]
    async fn test_force_always_tops_up() {
        let ledger = StubLedger::with_balance(ACTOR, Lamports(10 * LAMPORTS_PER_SOL));
        let check = ensure_minimum_balance(&ledger, &ACTOR, FLOOR, true)
            .await
            .unwrap();

        assert!(check.topped_up());
        assert_eq!(check.observed(), Lamports(10 * LAMPORTS_PER_SOL));
        assert_eq!(ledger.top_ups.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_custom_top_up_amount() {
        let ledger = StubLedger::with_balance(ACTOR, Lamports::ZERO);
        let guard = BalanceGuard::new(FLOOR).with_top_up_amount(Lamports(2 * LAMPORTS_PER_SOL));
        let check = guard.ensure_minimum_balance(&ledger, &ACTOR, false).await.unwrap();
        assert_eq!(check.after, Some(Lamports(2 * LAMPORTS_PER_SOL)));
    }

    #[tokio::test]
    async fn test_top_up_failure_is_an_error() {
        let ledger = StubLedger {
            fail_top_up: true,
            ..Default::default()
        };
        let err = ensure_minimum_balance(&ledger, &ACTOR, FLOOR, false)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rpc { code: 429, .. }));
    }

    #[test]
    fn test_needs_top_up() {
        let guard = BalanceGuard::default();
        assert!(guard.needs_top_up(Lamports(0), false));
        assert!(!guard.needs_top_up(DEFAULT_BALANCE_FLOOR, false));
        assert!(guard.needs_top_up(DEFAULT_BALANCE_FLOOR, true));
    }
}
