//! # Storage Geometry Constants
//!
//! This module centralizes the block and record geometry of the table
//! storage engine. The values are interdependent; they are co-located
//! here so a change to one cannot silently invalidate another.
//!
//! ## Dependency Graph
//!
//! ```text
//! BLOCK_POWER (12)
//!       │
//!       └─> BLOCK_SIZE (4096 bytes, 1 << BLOCK_POWER)
//!                 │
//! NODE_POWER (4)  │
//!       │         │
//!       └─> NODE_SIZE (16 bytes, 1 << NODE_POWER)
//!                 │
//!                 ├─> ENTRIES (256, BLOCK_SIZE / NODE_SIZE)
//!                 │     Maximum records held by one block. The block
//!                 │     index guarantees no slot ever spans more.
//!                 │
//! BLOCK_FILL (0.5)│
//!       │         │
//!       └─────────┴─> NEW_ENTRIES (128, BLOCK_FILL * ENTRIES)
//!                       Records placed into each fresh block when an
//!                       insert splits a full block. The remaining
//!                       headroom lets later inserts at the same spot
//!                       stay in-place instead of splitting again.
//! ```
//!
//! ## Critical Invariants
//!
//! Enforced by compile-time assertions below:
//!
//! 1. `NODE_POWER <= BLOCK_POWER` (a record fits in a block)
//! 2. `NEW_ENTRIES >= 1` (a split always makes progress)
//! 3. `NEW_ENTRIES <= ENTRIES` (a fresh block is never overfilled)
//!
//! ## File Name Suffixes
//!
//! A table is stored as three files sharing a caller-chosen prefix. The
//! data file uses the bare prefix; the sidecars append one character,
//! and the advisory lock appends an extension:
//!
//! ```text
//! <prefix>        block data
//! <prefix>x       block index
//! <prefix>i       counters (allocated blocks, used blocks, records)
//! <prefix>.lock   advisory lock
//! ```

/// Log2 of the block size in bytes.
pub const BLOCK_POWER: u32 = 12;

/// Block (page) size in bytes.
pub const BLOCK_SIZE: usize = 1 << BLOCK_POWER;

/// Log2 of the record size in bytes.
pub const NODE_POWER: u32 = 4;

/// Record size in bytes. One record stores one XML tree node.
pub const NODE_SIZE: usize = 1 << NODE_POWER;

/// Maximum number of records per block.
pub const ENTRIES: usize = BLOCK_SIZE / NODE_SIZE;

/// Target fill factor for blocks created by a split.
pub const BLOCK_FILL: f64 = 0.5;

/// Number of records placed into each fresh block on a split.
pub const NEW_ENTRIES: usize = (BLOCK_FILL * ENTRIES as f64) as usize;

/// Suffix of the block index sidecar file.
pub const INDEX_SUFFIX: char = 'x';

/// Suffix of the counters sidecar file.
pub const INFO_SUFFIX: char = 'i';

/// Extension of the advisory lock file.
pub const LOCK_EXTENSION: &str = ".lock";

/// Size of the counters sidecar in bytes: three big-endian 32-bit ints.
pub const INFO_SIZE: usize = 12;

/// Size of one block index entry in bytes: two big-endian 32-bit ints.
pub const INDEX_ENTRY_SIZE: usize = 8;

const _: () = assert!(NODE_POWER <= BLOCK_POWER);
const _: () = assert!(NEW_ENTRIES >= 1);
const _: () = assert!(NEW_ENTRIES <= ENTRIES);
const _: () = assert!(BLOCK_SIZE % NODE_SIZE == 0);
