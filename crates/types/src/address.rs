//! Ledger addresses and transaction signatures.
//!
//! Both are fixed-width byte strings that travel over the wire and through
//! logs in base58 form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 32-byte account address (public key).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    /// Size of an address in bytes.
    pub const BYTES: usize = 32;

    /// The all-zero address (system program).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create an address from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode as base58.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl FromStr for Address {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<32>(s).map(Self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.to_base58();
        write!(f, "Address({}..)", &encoded[..encoded.len().min(8)])
    }
}

/// A 64-byte transaction signature.
///
/// The first signature of a transaction doubles as its identifier on the
/// ledger, so this is also what log lookups and explorer links are keyed on.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Size of a signature in bytes.
    pub const BYTES: usize = 64;

    /// Create a signature from raw bytes.
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Encode as base58.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl FromStr for Signature {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<64>(s).map(Self)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.to_base58();
        write!(f, "Signature({}..)", &encoded[..encoded.len().min(8)])
    }
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], EncodingError> {
    let bytes = bs58::decode(s)
        .into_vec()
        .map_err(|_| EncodingError::InvalidBase58)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| EncodingError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        })
}

macro_rules! base58_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_base58())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

base58_serde!(Address);
base58_serde!(Signature);

/// Errors that can occur when parsing base58 strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    /// Decoded byte length does not match the type.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Characters outside the base58 alphabet.
    #[error("Invalid base58 string")]
    InvalidBase58,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_base58_roundtrip() {
        let address = Address::new([7u8; 32]);
        let parsed: Address = address.to_base58().parse().unwrap();
        assert_eq!(address, parsed);
    }

    #[test]
    fn test_system_program_address() {
        assert_eq!(Address::ZERO.to_base58(), "11111111111111111111111111111111");
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = "232PpcrPc6Kz7geafvbRzt5HnHP4kX88yvzUCN69WXQC"
            .parse::<Signature>()
            .unwrap_err();
        assert_eq!(
            err,
            EncodingError::InvalidLength {
                expected: 64,
                actual: 32
            }
        );
    }

    #[test]
    fn test_invalid_alphabet_rejected() {
        // '0', 'O', 'I' and 'l' are not part of the alphabet.
        assert_eq!(
            "0OIl".parse::<Address>().unwrap_err(),
            EncodingError::InvalidBase58
        );
    }

    #[test]
    fn test_serde_as_string() {
        let address: Address = "232PpcrPc6Kz7geafvbRzt5HnHP4kX88yvzUCN69WXQC".parse().unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"232PpcrPc6Kz7geafvbRzt5HnHP4kX88yvzUCN69WXQC\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
