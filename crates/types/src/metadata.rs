//! Record and collection metadata.

use crate::Address;
use serde::{Deserialize, Serialize};

/// Longest name the metadata program stores.
pub const MAX_NAME_LENGTH: usize = 32;

/// Longest symbol the metadata program stores.
pub const MAX_SYMBOL_LENGTH: usize = 10;

/// Longest URI the metadata program stores.
pub const MAX_URI_LENGTH: usize = 200;

/// Most creators a record may list.
pub const MAX_CREATORS: usize = 5;

/// Royalty basis points cannot exceed 100%.
pub const MAX_SELLER_FEE_BASIS_POINTS: u16 = 10_000;

/// A creator entitled to a share of royalties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub address: Address,
    pub verified: bool,
    /// Percentage share, all creators must sum to 100.
    pub share: u8,
}

impl Creator {
    /// An unverified creator taking the whole share.
    pub fn sole(address: Address) -> Self {
        Self {
            address,
            verified: false,
            share: 100,
        }
    }
}

/// Token standard of a minted record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStandard {
    #[default]
    NonFungible,
    FungibleAsset,
    Fungible,
    NonFungibleEdition,
}

/// Metadata committed with every minted leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub name: String,
    pub symbol: String,
    /// Off-chain JSON metadata location.
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Vec<Creator>,
    pub primary_sale_happened: bool,
    pub is_mutable: bool,
    pub edition_nonce: Option<u8>,
    pub token_standard: TokenStandard,
}

impl RecordMetadata {
    /// Immutable non-fungible metadata with no royalties and no creators.
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            uri: uri.into(),
            seller_fee_basis_points: 0,
            creators: Vec::new(),
            primary_sale_happened: false,
            is_mutable: false,
            edition_nonce: Some(0),
            token_standard: TokenStandard::NonFungible,
        }
    }

    /// Add a creator.
    pub fn with_creator(mut self, creator: Creator) -> Self {
        self.creators.push(creator);
        self
    }

    /// Set royalties.
    pub fn with_seller_fee_basis_points(mut self, bps: u16) -> Self {
        self.seller_fee_basis_points = bps;
        self
    }

    /// Check field limits enforced by the metadata program.
    pub fn validate(&self) -> Result<(), MetadataError> {
        validate_common(
            &self.name,
            &self.symbol,
            &self.uri,
            self.seller_fee_basis_points,
            &self.creators,
        )
    }
}

/// Metadata of the collection that groups minted records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Vec<Creator>,
    pub is_mutable: bool,
}

impl CollectionMetadata {
    /// Immutable collection metadata with no royalties and no creators.
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            uri: uri.into(),
            seller_fee_basis_points: 0,
            creators: Vec::new(),
            is_mutable: false,
        }
    }

    /// Add a creator.
    pub fn with_creator(mut self, creator: Creator) -> Self {
        self.creators.push(creator);
        self
    }

    /// Set royalties.
    pub fn with_seller_fee_basis_points(mut self, bps: u16) -> Self {
        self.seller_fee_basis_points = bps;
        self
    }

    /// Check field limits enforced by the metadata program.
    pub fn validate(&self) -> Result<(), MetadataError> {
        validate_common(
            &self.name,
            &self.symbol,
            &self.uri,
            self.seller_fee_basis_points,
            &self.creators,
        )
    }
}

fn validate_common(
    name: &str,
    symbol: &str,
    uri: &str,
    seller_fee_basis_points: u16,
    creators: &[Creator],
) -> Result<(), MetadataError> {
    check_length("name", name, MAX_NAME_LENGTH)?;
    check_length("symbol", symbol, MAX_SYMBOL_LENGTH)?;
    check_length("uri", uri, MAX_URI_LENGTH)?;

    if seller_fee_basis_points > MAX_SELLER_FEE_BASIS_POINTS {
        return Err(MetadataError::InvalidSellerFee(seller_fee_basis_points));
    }

    if creators.len() > MAX_CREATORS {
        return Err(MetadataError::TooManyCreators(creators.len()));
    }

    if !creators.is_empty() {
        let total: u32 = creators.iter().map(|c| c.share as u32).sum();
        if total != 100 {
            return Err(MetadataError::InvalidCreatorShares(total));
        }
    }

    Ok(())
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), MetadataError> {
    if value.len() > max {
        return Err(MetadataError::FieldTooLong {
            field,
            max,
            actual: value.len(),
        });
    }
    Ok(())
}

/// Metadata field violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("Metadata {field} is {actual} bytes, limit is {max}")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("Seller fee of {0} basis points exceeds 10000")]
    InvalidSellerFee(u16),

    #[error("{0} creators listed, at most 5 allowed")]
    TooManyCreators(usize),

    #[error("Creator shares sum to {0}, expected 100")]
    InvalidCreatorShares(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let metadata = RecordMetadata::new("Compressed Demo", "xnftd", "https://example.com/1.json")
            .with_creator(Creator::sole(Address::new([1u8; 32])));
        assert!(metadata.validate().is_ok());
        assert_eq!(metadata.token_standard, TokenStandard::NonFungible);
    }

    #[test]
    fn test_long_symbol_rejected() {
        let metadata = CollectionMetadata::new("Demo", "WAYTOOLONGSYMBOL", "https://example.com");
        assert_eq!(
            metadata.validate(),
            Err(MetadataError::FieldTooLong {
                field: "symbol",
                max: MAX_SYMBOL_LENGTH,
                actual: 16
            })
        );
    }

    #[test]
    fn test_creator_shares_must_total_100() {
        let metadata = RecordMetadata::new("Demo", "D", "https://example.com")
            .with_creator(Creator {
                address: Address::new([1u8; 32]),
                verified: false,
                share: 60,
            })
            .with_creator(Creator {
                address: Address::new([2u8; 32]),
                verified: false,
                share: 30,
            });
        assert_eq!(
            metadata.validate(),
            Err(MetadataError::InvalidCreatorShares(90))
        );
    }

    #[test]
    fn test_seller_fee_limit() {
        let metadata = CollectionMetadata::new("Demo", "D", "u").with_seller_fee_basis_points(10_001);
        assert_eq!(
            metadata.validate(),
            Err(MetadataError::InvalidSellerFee(10_001))
        );
    }
}
