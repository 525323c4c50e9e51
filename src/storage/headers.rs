//! # Sidecar File Formats
//!
//! Type-safe, zerocopy-based layouts for the two sidecar files that
//! accompany each block data file. All multi-byte integers are
//! big-endian, matching the record field encoding.
//!
//! ## Counters Sidecar (`<prefix>i`)
//!
//! A fixed 12-byte header holding the three table counters:
//!
//! ```text
//! Offset  Size  Description
//! 0       4     Blocks ever allocated in the data file (including
//!               blocks orphaned by deletion)
//! 4       4     Used blocks (= length of the block index)
//! 8       4     Record count
//! ```
//!
//! ## Block Index Sidecar (`<prefix>x`)
//!
//! `used` consecutive 8-byte entries, slot 0 first:
//!
//! ```text
//! Offset  Size  Description
//! 0       4     firstPre: first logical position held by the block
//! 4       4     blockNo: physical block number in the data file
//! ```
//!
//! `firstPre` values are strictly ascending and start at 0; entry `i`
//! covers positions `[firstPre[i], firstPre[i+1])`, the last entry up to
//! the record count.
//!
//! ## Zerocopy Safety
//!
//! Both structs derive `FromBytes`/`IntoBytes`/`Immutable`/
//! `KnownLayout`/`Unaligned`, so they parse from and serialize to raw
//! sidecar bytes without copies or alignment constraints. Sizes are
//! verified by compile-time assertions.

use eyre::{ensure, Result};
use zerocopy::big_endian::I32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{INDEX_ENTRY_SIZE, INFO_SIZE};

/// The three table counters persisted in the counters sidecar.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct TableInfo {
    blocks: I32,
    used: I32,
    count: I32,
}

const _: () = assert!(std::mem::size_of::<TableInfo>() == INFO_SIZE);

impl TableInfo {
    pub fn new(blocks: u32, used: u32, count: u32) -> Self {
        Self {
            blocks: I32::new(blocks as i32),
            used: I32::new(used as i32),
            count: I32::new(count as i32),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() == INFO_SIZE,
            "counters sidecar has {} bytes, expected {}",
            bytes.len(),
            INFO_SIZE
        );

        let info = Self::ref_from_bytes(bytes)
            .map_err(|e| eyre::eyre!("failed to parse table counters: {:?}", e))?;

        ensure!(
            info.blocks.get() >= 0 && info.used.get() >= 0 && info.count.get() >= 0,
            "negative table counters (blocks={}, used={}, count={})",
            info.blocks.get(),
            info.used.get(),
            info.count.get()
        );

        Ok(info)
    }

    /// Blocks ever allocated in the data file.
    pub fn blocks(&self) -> u32 {
        self.blocks.get() as u32
    }

    /// Used blocks, i.e. the block index length.
    pub fn used(&self) -> u32 {
        self.used.get() as u32
    }

    /// Record count.
    pub fn count(&self) -> u32 {
        self.count.get() as u32
    }
}

/// One block index entry: the first logical position held by a block,
/// and the block's physical number.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct IndexEntry {
    first_pre: I32,
    block_no: I32,
}

const _: () = assert!(std::mem::size_of::<IndexEntry>() == INDEX_ENTRY_SIZE);

impl IndexEntry {
    pub fn new(first_pre: u32, block_no: u32) -> Self {
        Self {
            first_pre: I32::new(first_pre as i32),
            block_no: I32::new(block_no as i32),
        }
    }

    pub fn first_pre(&self) -> u32 {
        self.first_pre.get() as u32
    }

    pub fn block_no(&self) -> u32 {
        self.block_no.get() as u32
    }
}

/// Decodes a block index sidecar into its two parallel arrays. The byte
/// length must match the `used` counter exactly.
pub fn decode_index(bytes: &[u8], used: u32) -> Result<(Vec<u32>, Vec<u32>)> {
    let expected = used as usize * INDEX_ENTRY_SIZE;
    ensure!(
        bytes.len() == expected,
        "block index sidecar has {} bytes, expected {} for {} entries",
        bytes.len(),
        expected,
        used
    );

    let entries = <[IndexEntry]>::ref_from_bytes(bytes)
        .map_err(|e| eyre::eyre!("failed to parse block index: {:?}", e))?;

    let mut first_pres = Vec::with_capacity(entries.len());
    let mut block_nos = Vec::with_capacity(entries.len());
    for entry in entries {
        ensure!(
            entry.first_pre.get() >= 0 && entry.block_no.get() >= 0,
            "negative block index entry ({}, {})",
            entry.first_pre.get(),
            entry.block_no.get()
        );
        first_pres.push(entry.first_pre());
        block_nos.push(entry.block_no());
    }
    Ok((first_pres, block_nos))
}

/// Encodes the two parallel index arrays into sidecar bytes.
pub fn encode_index(first_pres: &[u32], block_nos: &[u32]) -> Vec<u8> {
    debug_assert_eq!(first_pres.len(), block_nos.len());
    let mut bytes = Vec::with_capacity(first_pres.len() * INDEX_ENTRY_SIZE);
    for (&fp, &block) in first_pres.iter().zip(block_nos) {
        bytes.extend_from_slice(IndexEntry::new(fp, block).as_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_size_is_12() {
        assert_eq!(std::mem::size_of::<TableInfo>(), 12);
    }

    #[test]
    fn info_round_trip() {
        let info = TableInfo::new(7, 5, 900);
        let parsed = TableInfo::from_bytes(info.as_bytes()).unwrap();
        assert_eq!(parsed.blocks(), 7);
        assert_eq!(parsed.used(), 5);
        assert_eq!(parsed.count(), 900);
    }

    #[test]
    fn info_is_big_endian() {
        let info = TableInfo::new(1, 2, 0x0102_0304);
        assert_eq!(
            info.as_bytes(),
            [0, 0, 0, 1, 0, 0, 0, 2, 1, 2, 3, 4]
        );
    }

    #[test]
    fn info_rejects_short_buffer() {
        assert!(TableInfo::from_bytes(&[0u8; 8]).is_err());
    }

    #[test]
    fn info_rejects_negative_counters() {
        let mut bytes = [0u8; 12];
        bytes[0] = 0x80;
        assert!(TableInfo::from_bytes(&bytes).is_err());
    }

    #[test]
    fn index_round_trip() {
        let first_pres = vec![0, 128, 300];
        let block_nos = vec![0, 2, 1];
        let bytes = encode_index(&first_pres, &block_nos);
        assert_eq!(bytes.len(), 24);

        let (fp, bn) = decode_index(&bytes, 3).unwrap();
        assert_eq!(fp, first_pres);
        assert_eq!(bn, block_nos);
    }

    #[test]
    fn index_rejects_length_mismatch() {
        let bytes = encode_index(&[0, 10], &[0, 1]);
        assert!(decode_index(&bytes, 3).is_err());
        assert!(decode_index(&bytes[..15], 2).is_err());
    }

    #[test]
    fn empty_index_decodes() {
        let (fp, bn) = decode_index(&[], 0).unwrap();
        assert!(fp.is_empty());
        assert!(bn.is_empty());
    }
}
