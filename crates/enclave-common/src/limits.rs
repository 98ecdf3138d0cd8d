//! Per-container resource limits.
//!
//! Every field is optional: an unset field means "leave unchanged" on the
//! way out and "not reported" on the way back. Zero is a real value and is
//! never used as a stand-in for unset.

use serde::{Deserialize, Serialize};

use crate::constants::QUOTA_BLOCK_SIZE;

/// Network traffic shaping limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthLimits {
    /// Sustained rate in bytes per second.
    pub rate_in_bytes_per_second: Option<u64>,
    /// Burst rate in bytes per second.
    pub burst_rate_in_bytes_per_second: Option<u64>,
}

/// CPU scheduling weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuLimits {
    /// Relative CPU shares.
    pub limit_in_shares: Option<u64>,
}

/// Memory ceiling. When exceeded, the container is stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLimits {
    /// Memory usage limit in bytes.
    pub limit_in_bytes: Option<u64>,
}

/// Disk quota limits, in quota blocks, inodes, and bytes.
///
/// Byte limits are a convenience: they only take effect through the block
/// limit they derive (see [`DiskLimits::with_derived_blocks`]). A non-zero
/// byte limit replaces the matching block limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskLimits {
    /// Soft block limit.
    pub block_soft: Option<u64>,
    /// Hard block limit.
    pub block_hard: Option<u64>,
    /// Soft inode limit.
    pub inode_soft: Option<u64>,
    /// Hard inode limit.
    pub inode_hard: Option<u64>,
    /// Soft limit in bytes.
    pub byte_soft: Option<u64>,
    /// Hard limit in bytes.
    pub byte_hard: Option<u64>,
}

impl DiskLimits {
    /// Derives block limits from their byte counterparts.
    ///
    /// Each derived value is `ceil(bytes / QUOTA_BLOCK_SIZE)`. A zero or unset
    /// byte limit leaves the block limit untouched.
    #[must_use]
    pub fn with_derived_blocks(mut self) -> Self {
        if let Some(blocks) = self.byte_soft.and_then(bytes_to_blocks) {
            self.block_soft = Some(blocks);
        }
        if let Some(blocks) = self.byte_hard.and_then(bytes_to_blocks) {
            self.block_hard = Some(blocks);
        }
        self
    }
}

/// Converts a byte count into quota blocks, rounding up. Zero maps to `None`.
#[must_use]
pub const fn bytes_to_blocks(bytes: u64) -> Option<u64> {
    if bytes == 0 {
        None
    } else {
        Some(bytes.div_ceil(QUOTA_BLOCK_SIZE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_soft_rounds_up_to_blocks() {
        let limits = DiskLimits {
            byte_soft: Some(1025),
            ..DiskLimits::default()
        }
        .with_derived_blocks();
        assert_eq!(limits.block_soft, Some(2));
        assert_eq!(limits.block_hard, None);
    }

    #[test]
    fn exact_multiple_does_not_round() {
        let limits = DiskLimits {
            byte_hard: Some(4096),
            ..DiskLimits::default()
        }
        .with_derived_blocks();
        assert_eq!(limits.block_hard, Some(4));
    }

    #[test]
    fn derived_block_matches_ceiling_for_many_sizes() {
        for bytes in [1_u64, 1023, 1024, 1025, 2047, 2048, 1_000_000, u64::MAX] {
            let limits = DiskLimits {
                byte_soft: Some(bytes),
                ..DiskLimits::default()
            }
            .with_derived_blocks();
            let expected = bytes / 1024 + u64::from(bytes % 1024 != 0);
            assert_eq!(limits.block_soft, Some(expected), "bytes = {bytes}");
        }
    }

    #[test]
    fn zero_bytes_leave_blocks_untouched() {
        let limits = DiskLimits {
            block_soft: Some(7),
            byte_soft: Some(0),
            ..DiskLimits::default()
        }
        .with_derived_blocks();
        assert_eq!(limits.block_soft, Some(7));
    }

    #[test]
    fn byte_limit_replaces_block_limit() {
        let limits = DiskLimits {
            block_soft: Some(7),
            byte_soft: Some(10 * 1024),
            block_hard: Some(3),
            ..DiskLimits::default()
        }
        .with_derived_blocks();
        assert_eq!(limits.block_soft, Some(10));
        assert_eq!(limits.block_hard, Some(3));
    }

    #[test]
    fn unset_limits_are_distinct_from_zero() {
        let unset = MemoryLimits::default();
        let zero = MemoryLimits {
            limit_in_bytes: Some(0),
        };
        assert_ne!(unset, zero);
    }
}
