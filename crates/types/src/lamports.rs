//! Currency amounts in the ledger's smallest unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Number of lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// An amount of lamports.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Lamports(pub u64);

impl Lamports {
    /// Zero lamports.
    pub const ZERO: Self = Lamports(0);

    /// One whole SOL.
    pub const ONE_SOL: Self = Lamports(LAMPORTS_PER_SOL);

    /// Get the raw value.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Whole SOL as a float, for display only.
    pub fn to_sol(self) -> f64 {
        self.0 as f64 / LAMPORTS_PER_SOL as f64
    }

    /// Subtract, clamping at zero.
    pub fn saturating_sub(self, other: Lamports) -> Lamports {
        Lamports(self.0.saturating_sub(other.0))
    }

    /// Format as SOL with thousands separators.
    ///
    /// Amounts under one SOL (or any amount when `force_decimals` is set) are
    /// shown with ten fraction digits so that fee-sized values stay visible.
    /// Larger amounts are rounded to at most three fraction digits and never
    /// shown with fewer than two.
    pub fn format_sol(self, force_decimals: bool) -> String {
        let mut whole = self.0 / LAMPORTS_PER_SOL;
        let frac = self.0 % LAMPORTS_PER_SOL;

        let frac_str = if whole == 0 || force_decimals {
            format!("{:09}0", frac)
        } else {
            let mut milli = (frac + 500_000) / 1_000_000;
            if milli == 1000 {
                whole += 1;
                milli = 0;
            }
            let s = format!("{:03}", milli);
            match s.strip_suffix('0') {
                Some(trimmed) => trimmed.to_string(),
                None => s,
            }
        };

        format!("{}.{}", group_thousands(whole), frac_str)
    }
}

/// Saturates at `u64::MAX`.
impl Add for Lamports {
    type Output = Lamports;

    fn add(self, rhs: Lamports) -> Lamports {
        Lamports(self.0.saturating_add(rhs.0))
    }
}

impl From<u64> for Lamports {
    fn from(value: u64) -> Self {
        Lamports(value)
    }
}

impl fmt::Display for Lamports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lamports", group_thousands(self.0))
    }
}

/// Insert `,` separators every three digits.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_048_576), "1,048,576");
    }

    #[test]
    fn test_format_sub_sol_uses_ten_digits() {
        assert_eq!(Lamports(5_000).format_sol(false), "0.0000050000");
        assert_eq!(Lamports(500_000_000).format_sol(false), "0.5000000000");
    }

    #[test]
    fn test_format_whole_sol() {
        assert_eq!(Lamports(2 * LAMPORTS_PER_SOL).format_sol(false), "2.00");
        assert_eq!(Lamports(1_500_000_000).format_sol(false), "1.50");
        assert_eq!(Lamports(1_234_567_890).format_sol(false), "1.235");
        assert_eq!(Lamports(1_999_900_000).format_sol(false), "2.00");
        assert_eq!(
            Lamports(15_813_509_760).format_sol(true),
            "15.8135097600"
        );
    }

    #[test]
    fn test_add_saturates() {
        assert_eq!(Lamports(5_000) + Lamports(15_115_600), Lamports(15_120_600));
        assert_eq!(Lamports(u64::MAX) + Lamports(1), Lamports(u64::MAX));
    }

    #[test]
    fn test_saturating_sub() {
        assert_eq!(Lamports(5).saturating_sub(Lamports(7)), Lamports::ZERO);
        assert_eq!(Lamports(7).saturating_sub(Lamports(5)), Lamports(2));
    }
}
