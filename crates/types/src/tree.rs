//! Concurrent Merkle tree shape and on-chain account layout.
//!
//! A tree account holds a fixed header, the tree body (a ring buffer of
//! change logs plus the current rightmost path) and an optional canopy of
//! cached upper-level nodes. Every node is a 32-byte hash.
//!
//! # Layout
//!
//! ```text
//! header   = 1 (account type) + 1 (version) + 4 + 4 + 32 + 8 + 6   = 56
//! changelog / path = 32 + 32 * max_depth + 4 + 4              = 40 + 32d
//! body     = 3 * 8 + (max_buffer_size + 1) * (40 + 32d)
//! canopy   = (2^(canopy_depth + 1) - 2) * 32
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of a tree node.
pub const NODE_SIZE: u64 = 32;

/// Account type discriminator plus the V1 header.
pub const HEADER_SIZE: u64 = 1 + 1 + 4 + 4 + 32 + 8 + 6;

/// Levels left uncached between the leaves and the default canopy.
pub const DEFAULT_CANOPY_GAP: u32 = 5;

/// A `(max_depth, max_buffer_size)` combination the tree program accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepthSizePair {
    /// Depth of the tree.
    pub max_depth: u32,
    /// Number of concurrent changes the change log can hold.
    pub max_buffer_size: u32,
}

impl DepthSizePair {
    /// Create a pair. Support is checked separately.
    pub const fn new(max_depth: u32, max_buffer_size: u32) -> Self {
        Self {
            max_depth,
            max_buffer_size,
        }
    }

    /// Maximum number of leaves.
    pub fn capacity(&self) -> u64 {
        1u64 << self.max_depth
    }

    /// Whether this pair appears in [`SUPPORTED_DEPTH_SIZE_PAIRS`].
    pub fn is_supported(&self) -> bool {
        SUPPORTED_DEPTH_SIZE_PAIRS.contains(self)
    }
}

impl fmt::Display for DepthSizePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "depth={} buffer={}", self.max_depth, self.max_buffer_size)
    }
}

/// Every shape the tree program can be initialized with.
pub const SUPPORTED_DEPTH_SIZE_PAIRS: &[DepthSizePair] = &[
    DepthSizePair::new(3, 8),
    DepthSizePair::new(5, 8),
    DepthSizePair::new(6, 16),
    DepthSizePair::new(7, 16),
    DepthSizePair::new(8, 16),
    DepthSizePair::new(9, 16),
    DepthSizePair::new(10, 32),
    DepthSizePair::new(11, 32),
    DepthSizePair::new(12, 32),
    DepthSizePair::new(13, 32),
    DepthSizePair::new(14, 64),
    DepthSizePair::new(14, 256),
    DepthSizePair::new(14, 1024),
    DepthSizePair::new(14, 2048),
    DepthSizePair::new(15, 64),
    DepthSizePair::new(16, 64),
    DepthSizePair::new(17, 64),
    DepthSizePair::new(18, 64),
    DepthSizePair::new(19, 64),
    DepthSizePair::new(20, 64),
    DepthSizePair::new(20, 256),
    DepthSizePair::new(20, 1024),
    DepthSizePair::new(20, 2048),
    DepthSizePair::new(24, 64),
    DepthSizePair::new(24, 256),
    DepthSizePair::new(24, 512),
    DepthSizePair::new(24, 1024),
    DepthSizePair::new(24, 2048),
    DepthSizePair::new(26, 512),
    DepthSizePair::new(26, 1024),
    DepthSizePair::new(26, 2048),
    DepthSizePair::new(30, 512),
    DepthSizePair::new(30, 1024),
    DepthSizePair::new(30, 2048),
];

/// Shape of a tree to provision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeSizingParams {
    /// Depth of the tree; capacity is `2^max_depth` leaves.
    pub max_depth: u32,
    /// Change-log slots for concurrent updates.
    pub max_buffer_size: u32,
    /// Upper tree levels cached on-chain.
    pub canopy_depth: u32,
}

impl TreeSizingParams {
    /// Create sizing parameters.
    pub fn new(max_depth: u32, max_buffer_size: u32, canopy_depth: u32) -> Self {
        Self {
            max_depth,
            max_buffer_size,
            canopy_depth,
        }
    }

    /// Sizing for a supported pair with the canopy set `DEFAULT_CANOPY_GAP`
    /// levels above the leaves.
    pub fn with_default_canopy(pair: DepthSizePair) -> Self {
        Self::new(
            pair.max_depth,
            pair.max_buffer_size,
            pair.max_depth.saturating_sub(DEFAULT_CANOPY_GAP),
        )
    }

    /// The depth/buffer pair of this shape.
    pub fn pair(&self) -> DepthSizePair {
        DepthSizePair::new(self.max_depth, self.max_buffer_size)
    }

    /// Theoretical number of records the tree can hold.
    ///
    /// Saturates at `u64::MAX` for depths of 64 or more; such shapes are never
    /// supported anyway.
    pub fn capacity(&self) -> u64 {
        1u64.checked_shl(self.max_depth).unwrap_or(u64::MAX)
    }

    /// Check the shape against the canopy invariant and the supported table.
    pub fn validate(&self) -> Result<(), SizingError> {
        if self.canopy_depth > self.max_depth {
            return Err(SizingError::CanopyTooDeep {
                canopy_depth: self.canopy_depth,
                max_depth: self.max_depth,
            });
        }
        if !self.pair().is_supported() {
            return Err(SizingError::UnsupportedShape(self.pair()));
        }
        Ok(())
    }

    /// Bytes the tree account occupies.
    ///
    /// Does not validate; callers should run [`validate`](Self::validate)
    /// first.
    pub fn account_size(&self) -> u64 {
        HEADER_SIZE
            + tree_body_size(self.max_depth, self.max_buffer_size)
            + canopy_size(self.canopy_depth)
    }
}

impl fmt::Display for TreeSizingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "depth={} buffer={} canopy={}",
            self.max_depth, self.max_buffer_size, self.canopy_depth
        )
    }
}

/// Size of one change log entry, which is also the size of the rightmost path.
fn path_entry_size(max_depth: u32) -> u64 {
    NODE_SIZE + NODE_SIZE * max_depth as u64 + 4 + 4
}

/// Sequence number, active index and buffer size, then the change logs and
/// the rightmost path.
fn tree_body_size(max_depth: u32, max_buffer_size: u32) -> u64 {
    3 * 8 + (max_buffer_size as u64 + 1) * path_entry_size(max_depth)
}

/// Every node of the top `canopy_depth` levels, excluding the root.
fn canopy_size(canopy_depth: u32) -> u64 {
    if canopy_depth == 0 {
        return 0;
    }
    let nodes = 1u64
        .checked_shl(canopy_depth.saturating_add(1))
        .unwrap_or(u64::MAX)
        - 2;
    nodes.saturating_mul(NODE_SIZE)
}

/// Storage a tree needs and what it costs to keep it allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRequirement {
    /// The shape this requirement was computed for.
    pub params: TreeSizingParams,
    /// Account size in bytes.
    pub size_bytes: u64,
    /// One-time cost to allocate the account, in lamports.
    pub allocation_cost: crate::Lamports,
    /// Maximum number of records.
    pub capacity: u64,
}

/// Shape validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SizingError {
    /// Canopy cannot cache more levels than the tree has.
    #[error("Canopy depth {canopy_depth} exceeds max depth {max_depth}")]
    CanopyTooDeep {
        /// Requested canopy depth.
        canopy_depth: u32,
        /// Tree depth.
        max_depth: u32,
    },

    /// The tree program does not accept this depth/buffer combination.
    #[error("Unsupported tree shape: {0}")]
    UnsupportedShape(DepthSizePair),
}
