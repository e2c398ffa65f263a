//! Value types shared across the arbor crates.
//!
//! Everything here is plain data: addresses and signatures, currency amounts,
//! tree shapes and their account layout, record metadata, and the jobs and
//! outcomes that flow through a minting batch. No I/O happens in this crate.

mod address;
mod cluster;
mod job;
mod lamports;
mod metadata;
mod tree;

pub use address::{Address, EncodingError, Signature};
pub use cluster::{Cluster, UnknownClusterError, EXPLORER_BASE_URL};
pub use job::{
    BalanceSnapshot, CollectionRef, ErrorInfo, FailureKind, MintJob, TransactionOutcome,
    TransactionRecord, TreeRef,
};
pub use lamports::{group_thousands, Lamports, LAMPORTS_PER_SOL};
pub use metadata::{
    CollectionMetadata, Creator, MetadataError, RecordMetadata, TokenStandard, MAX_CREATORS,
    MAX_NAME_LENGTH, MAX_SELLER_FEE_BASIS_POINTS, MAX_SYMBOL_LENGTH, MAX_URI_LENGTH,
};
pub use tree::{
    DepthSizePair, SizingError, StorageRequirement, TreeSizingParams, DEFAULT_CANOPY_GAP,
    HEADER_SIZE, NODE_SIZE, SUPPORTED_DEPTH_SIZE_PAIRS,
};
