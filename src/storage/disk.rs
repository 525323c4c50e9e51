//! # Disk Table Engine
//!
//! This module implements [`DiskTable`], the on-disk backend of the
//! [`Table`](super::Table) capability. It provides random access to a
//! dense array of fixed-size records while supporting bulk range
//! insertion and deletion that never rewrite unaffected blocks.
//!
//! ## Block Index
//!
//! Records are packed into fixed-size blocks. Two parallel arrays map
//! logical positions to physical blocks: `first_pres[i]` is the first
//! position held by slot `i`, `block_nos[i]` the block that stores it.
//! Slot `i` covers positions `[first_pres[i], first_pres[i+1])`, the
//! last slot up to the record count.
//!
//! ```text
//! first_pres:  [0,        5,        9  ]      count = 12
//! block_nos:   [2,        0,        7  ]
//!                │          │         │
//!                ▼          ▼         ▼
//! data file:   block 2    block 0   block 7
//!              pre 0..5   pre 5..9  pre 9..12
//! ```
//!
//! Physical block numbers are in allocation order, not position order,
//! and gaps are normal: deletion drops slots from the index but never
//! reuses their block numbers, so the data file only grows.
//!
//! ## Single Buffered Block
//!
//! Exactly one block is held in memory. The cursor first checks the
//! buffered block's position window, then binary-searches the index
//! with the current slot as the initial probe, which makes ascending
//! scans nearly free. A dirty buffer is written back before another
//! block replaces it.
//!
//! ## Insertion
//!
//! Records are inserted after a position. If they fit into the free
//! space of the covering block, the trailing records shift right and the
//! index is renumbered. Otherwise the block splits: the displaced tail
//! is saved, the payload is cut into fresh blocks filled only to the
//! configured fill factor (leaving headroom so later inserts nearby stay
//! in-place), the tail gets a block of its own, and the new slots splice
//! into the index. Inserting before position 0 packs fully-filled fresh
//! blocks in front of the index instead; this is the bulk-load path.
//!
//! ## Deletion
//!
//! A range confined to one block is compacted in the buffer. A range
//! spanning blocks walks forward, counts slots whose blocks die
//! entirely, drops them from the index, and compacts the surviving tail
//! of the final block. Slots left without records are always pruned, so
//! every slot in the index covers at least one record. Partially
//! emptied blocks are not merged with neighbours.
//!
//! ## Dirty State
//!
//! | Operation        | buffer dirty | index dirty | current slot        |
//! |------------------|--------------|-------------|---------------------|
//! | `read*`          | unchanged    | unchanged   | may move            |
//! | `write*`         | set          | unchanged   | may move            |
//! | `insert` in-place| set          | set         | unchanged           |
//! | `insert` split   | set          | set         | advances            |
//! | `delete`         | set          | set         | may move or reload  |
//! | `flush`          | cleared      | cleared     | unchanged           |
//!
//! `flush` writes the buffer back, then persists the block index and
//! counters sidecars. Nothing else touches disk metadata, so a crash
//! between flushes loses unflushed work; there is no logging layer.
//!
//! ## Exclusive Ownership
//!
//! Every operation takes `&mut self`; the borrow checker serializes all
//! access to one engine. The file triple itself is guarded by an
//! advisory lock file held from open to drop, so two engines cannot own
//! the same table.

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{bail, ensure, Result, WrapErr};
use zerocopy::IntoBytes;

use super::headers::{decode_index, encode_index, TableInfo};
use super::{get1, get2, get4, get5, put1, put2, put4, put5, BlockFile, DirLock, Table};
use crate::config::{TableConfig, INDEX_SUFFIX, INFO_SUFFIX, LOCK_EXTENSION};

/// On-disk table of fixed-size records with a sparse block index and a
/// single buffered block.
#[derive(Debug)]
pub struct DiskTable {
    cfg: TableConfig,
    file: BlockFile,
    index_path: PathBuf,
    info_path: PathBuf,
    _lock: DirLock,

    /// The one buffered block.
    buffer: Box<[u8]>,
    /// Physical number of the buffered block; `None` while the table is
    /// empty and no block is resident.
    cur_block: Option<u32>,
    /// Slot of the buffered block.
    cur_idx: usize,
    /// First position covered by the buffered block.
    first_pre: u32,
    /// First position past the buffered block.
    next_pre: u32,

    /// First position per slot, strictly ascending from 0.
    first_pres: Vec<u32>,
    /// Physical block number per slot.
    block_nos: Vec<u32>,

    /// Blocks ever allocated in the data file; never decreases.
    total_blocks: u32,
    /// Record count.
    count: u32,

    buf_dirty: bool,
    index_dirty: bool,
}

impl DiskTable {
    /// Creates an empty table in `dir` under the given filename prefix,
    /// truncating any previous table with the same prefix.
    pub fn create<P: AsRef<Path>>(dir: P, prefix: &str, cfg: TableConfig) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("failed to create table directory '{}'", dir.display()))?;

        let lock = DirLock::acquire(dir.join(format!("{prefix}{LOCK_EXTENSION}")))?;
        let info_path = dir.join(format!("{prefix}{INFO_SUFFIX}"));
        let index_path = dir.join(format!("{prefix}{INDEX_SUFFIX}"));

        let file = BlockFile::create(dir.join(prefix), cfg.block_size())?;
        fs::write(&info_path, TableInfo::new(0, 0, 0).as_bytes())
            .wrap_err_with(|| format!("failed to write '{}'", info_path.display()))?;
        fs::write(&index_path, [0u8; 0])
            .wrap_err_with(|| format!("failed to write '{}'", index_path.display()))?;

        Ok(Self {
            cfg,
            file,
            index_path,
            info_path,
            _lock: lock,
            buffer: vec![0; cfg.block_size()].into_boxed_slice(),
            cur_block: None,
            cur_idx: 0,
            first_pre: 0,
            next_pre: 0,
            first_pres: Vec::new(),
            block_nos: Vec::new(),
            total_blocks: 0,
            count: 0,
            buf_dirty: false,
            index_dirty: false,
        })
    }

    /// Opens an existing table. The configuration must match the one
    /// the table was created with; the geometry is not stored on disk.
    pub fn open<P: AsRef<Path>>(dir: P, prefix: &str, cfg: TableConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let lock = DirLock::acquire(dir.join(format!("{prefix}{LOCK_EXTENSION}")))?;
        let info_path = dir.join(format!("{prefix}{INFO_SUFFIX}"));
        let index_path = dir.join(format!("{prefix}{INDEX_SUFFIX}"));

        let info_bytes = fs::read(&info_path)
            .wrap_err_with(|| format!("failed to read '{}'", info_path.display()))?;
        let info = TableInfo::from_bytes(&info_bytes)?;

        let index_bytes = fs::read(&index_path)
            .wrap_err_with(|| format!("failed to read '{}'", index_path.display()))?;
        let (first_pres, block_nos) = decode_index(&index_bytes, info.used())?;

        let file = BlockFile::open(dir.join(prefix), cfg.block_size())?;
        ensure!(
            file.block_count()? == info.blocks() as u64,
            "data file '{}' holds {} blocks but the counters record {}",
            dir.join(prefix).display(),
            file.block_count()?,
            info.blocks()
        );

        let mut table = Self {
            cfg,
            file,
            index_path,
            info_path,
            _lock: lock,
            buffer: vec![0; cfg.block_size()].into_boxed_slice(),
            cur_block: None,
            cur_idx: 0,
            first_pre: 0,
            next_pre: 0,
            first_pres,
            block_nos,
            total_blocks: info.blocks(),
            count: info.count(),
            buf_dirty: false,
            index_dirty: false,
        };
        table.verify()?;

        if !table.first_pres.is_empty() {
            let next = if table.first_pres.len() > 1 {
                table.first_pres[1]
            } else {
                table.count
            };
            table.load_slot(0, 0, next)?;
        }
        Ok(table)
    }

    /// Number of records in the table.
    pub fn size(&self) -> u32 {
        self.count
    }

    /// Number of live blocks (index slots).
    pub fn blocks(&self) -> u32 {
        self.first_pres.len() as u32
    }

    /// Number of blocks ever allocated in the data file, including
    /// blocks orphaned by deletion.
    pub fn total_blocks(&self) -> u32 {
        self.total_blocks
    }

    /// Checks the structural invariants of the block index. Cheap
    /// enough for assertions in tests; also run when a table is opened.
    pub fn verify(&self) -> Result<()> {
        let used = self.first_pres.len();
        ensure!(
            used == self.block_nos.len(),
            "index arrays diverge: {} first positions, {} block numbers",
            used,
            self.block_nos.len()
        );
        if self.count == 0 {
            ensure!(used == 0, "empty table with {} index slots", used);
            return Ok(());
        }
        ensure!(used > 0, "{} records but an empty block index", self.count);
        ensure!(
            self.first_pres[0] == 0,
            "first index slot starts at {}, expected 0",
            self.first_pres[0]
        );

        let entries = self.cfg.entries() as u32;
        for i in 0..used {
            let next = if i + 1 < used {
                self.first_pres[i + 1]
            } else {
                self.count
            };
            ensure!(
                next > self.first_pres[i],
                "slot {} covers no records (firstPre {} >= next {})",
                i,
                self.first_pres[i],
                next
            );
            ensure!(
                next - self.first_pres[i] <= entries,
                "slot {} covers {} records, more than a block holds ({})",
                i,
                next - self.first_pres[i],
                entries
            );
            ensure!(
                self.block_nos[i] < self.total_blocks,
                "slot {} references block {} beyond the {} allocated",
                i,
                self.block_nos[i],
                self.total_blocks
            );
        }

        let mut seen = self.block_nos.clone();
        seen.sort_unstable();
        seen.dedup();
        ensure!(
            seen.len() == used,
            "block index references the same block from two slots"
        );
        Ok(())
    }

    /// Reads a 1-byte field of record `pre`.
    pub fn read1(&mut self, pre: u32, off: usize) -> Result<u32> {
        let o = self.field_offset(pre, off, 1)?;
        Ok(get1(&self.buffer, o))
    }

    /// Reads a 2-byte big-endian field of record `pre`.
    pub fn read2(&mut self, pre: u32, off: usize) -> Result<u32> {
        let o = self.field_offset(pre, off, 2)?;
        Ok(get2(&self.buffer, o))
    }

    /// Reads a 4-byte big-endian field of record `pre`.
    pub fn read4(&mut self, pre: u32, off: usize) -> Result<u32> {
        let o = self.field_offset(pre, off, 4)?;
        Ok(get4(&self.buffer, o))
    }

    /// Reads a 5-byte big-endian field of record `pre`.
    pub fn read5(&mut self, pre: u32, off: usize) -> Result<u64> {
        let o = self.field_offset(pre, off, 5)?;
        Ok(get5(&self.buffer, o))
    }

    /// Writes a 1-byte field of record `pre`.
    pub fn write1(&mut self, pre: u32, off: usize, value: u32) -> Result<()> {
        let o = self.field_offset(pre, off, 1)?;
        put1(&mut self.buffer, o, value);
        self.buf_dirty = true;
        Ok(())
    }

    /// Writes a 2-byte big-endian field of record `pre`.
    pub fn write2(&mut self, pre: u32, off: usize, value: u32) -> Result<()> {
        let o = self.field_offset(pre, off, 2)?;
        put2(&mut self.buffer, o, value);
        self.buf_dirty = true;
        Ok(())
    }

    /// Writes a 4-byte big-endian field of record `pre`.
    pub fn write4(&mut self, pre: u32, off: usize, value: u32) -> Result<()> {
        let o = self.field_offset(pre, off, 4)?;
        put4(&mut self.buffer, o, value);
        self.buf_dirty = true;
        Ok(())
    }

    /// Writes a 5-byte big-endian field of record `pre`.
    pub fn write5(&mut self, pre: u32, off: usize, value: u64) -> Result<()> {
        let o = self.field_offset(pre, off, 5)?;
        put5(&mut self.buffer, o, value);
        self.buf_dirty = true;
        Ok(())
    }

    /// Inserts records after position `pre` (`-1` inserts before the
    /// first record). The payload length must be a multiple of the
    /// record size.
    pub fn insert(&mut self, pre: i32, entries: &[u8]) -> Result<()> {
        let node = self.cfg.node_size();
        ensure!(
            entries.len() % node == 0,
            "payload of {} bytes is not a multiple of the record size {}",
            entries.len(),
            node
        );
        if entries.is_empty() {
            return Ok(());
        }
        ensure!(
            pre >= -1 && (pre as i64) < self.count as i64,
            "insert position {} out of range (count={})",
            pre,
            self.count
        );

        let nr = (entries.len() / node) as u32;
        ensure!(
            self.count as u64 + nr as u64 <= i32::MAX as u64,
            "inserting {} records would exceed the table capacity",
            nr
        );

        self.index_dirty = true;

        // position after which the payload lands; 0 means before all
        let at = (pre + 1) as u32;
        if at == 0 {
            return self.insert_before_first(entries, nr);
        }

        self.cursor(at - 1)?;
        self.count += nr;
        let ins = at - self.first_pre;
        let used = self.next_pre - self.first_pre;

        // in-place: payload fits into the covering block's free space
        if nr < self.cfg.entries() as u32 - used {
            self.buf_dirty = true;
            self.copy_records(ins, ins + nr, self.next_pre - at);
            self.buffer[ins as usize * node..ins as usize * node + entries.len()]
                .copy_from_slice(entries);

            for fp in self.first_pres[self.cur_idx + 1..].iter_mut() {
                *fp += nr;
            }
            self.next_pre += nr;
            return Ok(());
        }

        // split: save the displaced tail of the covering block
        let move_cnt = self.next_pre - at;
        let tail =
            self.buffer[ins as usize * node..(ins + move_cnt) as usize * node].to_vec();

        let new_entries = self.cfg.new_entries() as u32;
        let mut new_slots = (nr.div_ceil(new_entries) + 1) as usize;
        // insertion at the block boundary displaces nothing
        if at == self.next_pre {
            new_slots -= 1;
        }

        let splice_at = self.cur_idx + 1;
        self.first_pres
            .splice(splice_at..splice_at, std::iter::repeat(0).take(new_slots));
        self.block_nos
            .splice(splice_at..splice_at, std::iter::repeat(0).take(new_slots));

        // cut the payload into fresh blocks, filled to the fill factor
        let mut written = 0u32;
        for chunk in entries.chunks(new_entries as usize * node) {
            let block = self.alloc_block()?;
            self.buffer[..chunk.len()].copy_from_slice(chunk);
            self.cur_idx += 1;
            self.first_pres[self.cur_idx] = at + written;
            self.block_nos[self.cur_idx] = block;
            written += (chunk.len() / node) as u32;
        }

        // the displaced tail gets a block of its own
        if move_cnt > 0 {
            let block = self.alloc_block()?;
            self.buffer[..tail.len()].copy_from_slice(&tail);
            self.cur_idx += 1;
            self.first_pres[self.cur_idx] = at + nr;
            self.block_nos[self.cur_idx] = block;
        }

        for fp in self.first_pres[self.cur_idx + 1..].iter_mut() {
            *fp += nr;
        }
        self.first_pre = self.first_pres[self.cur_idx];
        self.next_pre = if self.cur_idx + 1 < self.first_pres.len() {
            self.first_pres[self.cur_idx + 1]
        } else {
            self.count
        };
        Ok(())
    }

    /// Deletes the `nr` records `[first, first + nr)`.
    pub fn delete(&mut self, first: u32, nr: u32) -> Result<()> {
        if nr == 0 {
            return Ok(());
        }
        ensure!(
            first as u64 + nr as u64 <= self.count as u64,
            "delete range {}..{} out of range (count={})",
            first,
            first as u64 + nr as u64,
            self.count
        );

        self.index_dirty = true;
        self.cursor(first)?;

        let last = first + nr - 1;
        let mut from = first - self.first_pre;

        // confined to the covering block: compact in the buffer
        if last < self.next_pre {
            self.buf_dirty = true;
            self.copy_records(from + nr, from, self.next_pre - last - 1);
            self.update_pre(nr);

            if self.next_pre == self.first_pre {
                self.first_pres.remove(self.cur_idx);
                self.block_nos.remove(self.cur_idx);
                self.reload_after_prune()?;
            }
            return Ok(());
        }

        // walk the range, counting blocks that die entirely
        let mut fully_dropped = 0usize;
        while self.next_pre <= last {
            if from == 0 {
                fully_dropped += 1;
            }
            self.next_slot()?;
            from = 0;
        }

        if fully_dropped > 0 {
            let start = self.cur_idx - fully_dropped;
            self.first_pres.drain(start..self.cur_idx);
            self.block_nos.drain(start..self.cur_idx);
            self.cur_idx = start;
        }

        // compact the surviving tail of the final block
        let tail = self.next_pre - last - 1;
        self.buf_dirty = true;
        self.copy_records(last + 1 - self.first_pre, 0, tail);
        self.first_pres[self.cur_idx] = first;
        self.first_pre = first;
        self.update_pre(nr);

        if tail == 0 {
            self.first_pres.remove(self.cur_idx);
            self.block_nos.remove(self.cur_idx);
            self.reload_after_prune()?;
        }
        Ok(())
    }

    /// Writes back the buffer and persists the block index and counters
    /// if they changed.
    pub fn flush(&mut self) -> Result<()> {
        self.write_back()?;
        if self.index_dirty {
            fs::write(
                &self.index_path,
                encode_index(&self.first_pres, &self.block_nos),
            )
            .wrap_err_with(|| format!("failed to write '{}'", self.index_path.display()))?;
            fs::write(
                &self.info_path,
                TableInfo::new(self.total_blocks, self.blocks(), self.count).as_bytes(),
            )
            .wrap_err_with(|| format!("failed to write '{}'", self.info_path.display()))?;
            self.index_dirty = false;
        }
        Ok(())
    }

    /// Loads the block covering `pre` and returns the record's byte
    /// offset within the buffer.
    fn cursor(&mut self, pre: u32) -> Result<usize> {
        ensure!(
            pre < self.count,
            "position {} out of range (count={})",
            pre,
            self.count
        );
        if pre >= self.first_pre && pre < self.next_pre {
            return Ok(((pre - self.first_pre) as usize) << self.cfg.node_power());
        }

        // binary search, starting from the current slot: tree walks
        // mostly move to a neighbouring block
        let used = self.first_pres.len();
        let last = used - 1;
        let mut lo = 0isize;
        let mut hi = last as isize;
        let mut mid = self.cur_idx as isize;
        let mut fp = self.first_pre;
        let mut np = self.next_pre;
        loop {
            if pre < fp {
                hi = mid - 1;
            } else if pre >= np {
                lo = mid + 1;
            } else {
                break;
            }
            if lo > hi {
                bail!(
                    "block index corrupt: no slot covers position {} \
                     (slots={}, probe={}, bounds={}..{})",
                    pre,
                    used,
                    mid,
                    lo,
                    hi
                );
            }
            mid = (lo + hi) >> 1;
            fp = self.first_pres[mid as usize];
            np = if mid as usize == last {
                fp + self.cfg.entries() as u32
            } else {
                self.first_pres[mid as usize + 1]
            };
        }

        let mid = mid as usize;
        let next = if mid == last {
            self.count
        } else {
            self.first_pres[mid + 1]
        };
        self.load_slot(mid, fp, next)?;
        Ok(((pre - self.first_pre) as usize) << self.cfg.node_power())
    }

    /// Bounds-checks a field access and returns its byte offset in the
    /// buffer, loading the covering block.
    fn field_offset(&mut self, pre: u32, off: usize, width: usize) -> Result<usize> {
        ensure!(
            off + width <= self.cfg.node_size(),
            "field at byte {}..{} exceeds the record size {}",
            off,
            off + width,
            self.cfg.node_size()
        );
        Ok(self.cursor(pre)? + off)
    }

    /// Buffers the block of slot `idx` with the given position window,
    /// writing back the previous block first.
    fn load_slot(&mut self, idx: usize, first: u32, next: u32) -> Result<()> {
        let block = self.block_nos[idx];
        self.write_back()?;
        self.file.read_block(block, &mut self.buffer)?;
        self.cur_block = Some(block);
        self.cur_idx = idx;
        self.first_pre = first;
        self.next_pre = next;
        Ok(())
    }

    /// Advances the buffer to the following slot.
    fn next_slot(&mut self) -> Result<()> {
        let idx = self.cur_idx + 1;
        let next = if idx + 1 < self.first_pres.len() {
            self.first_pres[idx + 1]
        } else {
            self.count
        };
        self.load_slot(idx, self.next_pre, next)
    }

    /// Writes the buffered block back if it diverged from disk.
    fn write_back(&mut self) -> Result<()> {
        if self.buf_dirty {
            let Some(block) = self.cur_block else {
                bail!("dirty buffer without a resident block");
            };
            self.file.write_block(block, &self.buffer)?;
            self.buf_dirty = false;
        }
        Ok(())
    }

    /// Makes the buffer represent a freshly allocated block and returns
    /// its number. The buffer contents are undefined until the caller
    /// fills them; the block is marked dirty so they reach disk.
    fn alloc_block(&mut self) -> Result<u32> {
        self.write_back()?;
        let block = self.total_blocks;
        self.total_blocks += 1;
        self.cur_block = Some(block);
        self.buf_dirty = true;
        Ok(block)
    }

    /// Renumbers all slots after the current one down by `nr` deleted
    /// records and refreshes the window end.
    fn update_pre(&mut self, nr: u32) {
        for fp in self.first_pres[self.cur_idx + 1..].iter_mut() {
            *fp -= nr;
        }
        self.count -= nr;
        self.next_pre = if self.cur_idx + 1 < self.first_pres.len() {
            self.first_pres[self.cur_idx + 1]
        } else {
            self.count
        };
    }

    /// Repositions the buffer after the current slot was pruned. The
    /// pruned block stays in the data file with its last image; every
    /// allocated block reaches disk, keeping the file dense.
    fn reload_after_prune(&mut self) -> Result<()> {
        let used = self.first_pres.len();
        if used == 0 {
            self.write_back()?;
            self.cur_block = None;
            self.cur_idx = 0;
            self.first_pre = 0;
            self.next_pre = 0;
            return Ok(());
        }
        let idx = self.cur_idx.min(used - 1);
        let first = self.first_pres[idx];
        let next = if idx + 1 < used {
            self.first_pres[idx + 1]
        } else {
            self.count
        };
        self.load_slot(idx, first, next)
    }

    /// Inserts before position 0: packs the payload into fully-filled
    /// fresh blocks spliced in front of the index. Used for bulk loads
    /// into an empty table and for prepends that overflow block 0.
    fn insert_before_first(&mut self, entries: &[u8], nr: u32) -> Result<()> {
        let node = self.cfg.node_size();
        let entries_per_block = self.cfg.entries();

        if !self.first_pres.is_empty() {
            let used = if self.first_pres.len() > 1 {
                self.first_pres[1]
            } else {
                self.count
            };
            // prepend in-place when block 0 has room
            if nr < entries_per_block as u32 - used {
                self.cursor(0)?;
                self.count += nr;
                self.buf_dirty = true;
                self.copy_records(0, nr, used);
                self.buffer[..entries.len()].copy_from_slice(entries);

                for fp in self.first_pres[1..].iter_mut() {
                    *fp += nr;
                }
                self.next_pre += nr;
                return Ok(());
            }
        }

        let new_slots = entries.chunks(entries_per_block * node).count();
        self.first_pres
            .splice(0..0, std::iter::repeat(0).take(new_slots));
        self.block_nos
            .splice(0..0, std::iter::repeat(0).take(new_slots));

        let mut written = 0u32;
        for (slot, chunk) in entries.chunks(entries_per_block * node).enumerate() {
            let block = self.alloc_block()?;
            self.buffer[..chunk.len()].copy_from_slice(chunk);
            self.first_pres[slot] = written;
            self.block_nos[slot] = block;
            written += (chunk.len() / node) as u32;
        }

        for fp in self.first_pres[new_slots..].iter_mut() {
            *fp += nr;
        }
        self.count += nr;
        self.cur_idx = new_slots - 1;
        self.first_pre = self.first_pres[self.cur_idx];
        self.next_pre = if new_slots < self.first_pres.len() {
            self.first_pres[new_slots]
        } else {
            self.count
        };
        Ok(())
    }

    /// Moves `count` records within the buffer from record slot `from`
    /// to record slot `to` (overlap-safe).
    fn copy_records(&mut self, from: u32, to: u32, count: u32) {
        let node = self.cfg.node_size();
        let src = from as usize * node;
        let dst = to as usize * node;
        let len = count as usize * node;
        self.buffer.copy_within(src..src + len, dst);
    }
}

impl Table for DiskTable {
    fn read1(&mut self, pre: u32, off: usize) -> Result<u32> {
        DiskTable::read1(self, pre, off)
    }

    fn read2(&mut self, pre: u32, off: usize) -> Result<u32> {
        DiskTable::read2(self, pre, off)
    }

    fn read4(&mut self, pre: u32, off: usize) -> Result<u32> {
        DiskTable::read4(self, pre, off)
    }

    fn read5(&mut self, pre: u32, off: usize) -> Result<u64> {
        DiskTable::read5(self, pre, off)
    }

    fn write1(&mut self, pre: u32, off: usize, value: u32) -> Result<()> {
        DiskTable::write1(self, pre, off, value)
    }

    fn write2(&mut self, pre: u32, off: usize, value: u32) -> Result<()> {
        DiskTable::write2(self, pre, off, value)
    }

    fn write4(&mut self, pre: u32, off: usize, value: u32) -> Result<()> {
        DiskTable::write4(self, pre, off, value)
    }

    fn write5(&mut self, pre: u32, off: usize, value: u64) -> Result<()> {
        DiskTable::write5(self, pre, off, value)
    }

    fn insert(&mut self, pre: i32, entries: &[u8]) -> Result<()> {
        DiskTable::insert(self, pre, entries)
    }

    fn delete(&mut self, first: u32, nr: u32) -> Result<()> {
        DiskTable::delete(self, first, nr)
    }

    fn size(&self) -> u32 {
        DiskTable::size(self)
    }

    fn blocks(&self) -> u32 {
        DiskTable::blocks(self)
    }

    fn flush(&mut self) -> Result<()> {
        DiskTable::flush(self)
    }

    fn close(&mut self) -> Result<()> {
        DiskTable::flush(self)
    }
}

impl Drop for DiskTable {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn small_cfg() -> TableConfig {
        // 64-byte blocks, 16-byte records: 4 entries, 2 per split block
        TableConfig::new(6, 4, 0.5).unwrap()
    }

    fn records(tags: &[u8]) -> Vec<u8> {
        let mut payload = Vec::new();
        for &tag in tags {
            let mut record = [0u8; 16];
            record[0] = tag;
            payload.extend_from_slice(&record);
        }
        payload
    }

    #[test]
    fn create_starts_empty() {
        let dir = tempdir().unwrap();
        let table = DiskTable::create(dir.path(), "tbl", small_cfg()).unwrap();

        assert_eq!(table.size(), 0);
        assert_eq!(table.blocks(), 0);
        assert_eq!(table.total_blocks(), 0);
        table.verify().unwrap();
    }

    #[test]
    fn create_then_reopen_round_trips() {
        let dir = tempdir().unwrap();
        {
            let mut table = DiskTable::create(dir.path(), "tbl", small_cfg()).unwrap();
            table.insert(-1, &records(&[10, 20, 30])).unwrap();
            table.flush().unwrap();
        }
        let mut table = DiskTable::open(dir.path(), "tbl", small_cfg()).unwrap();
        assert_eq!(table.size(), 3);
        assert_eq!(table.read1(1, 0).unwrap(), 20);
    }

    #[test]
    fn open_rejects_truncated_counters() {
        let dir = tempdir().unwrap();
        {
            let mut table = DiskTable::create(dir.path(), "tbl", small_cfg()).unwrap();
            table.insert(-1, &records(&[1])).unwrap();
            table.flush().unwrap();
        }
        let info = dir.path().join("tbli");
        std::fs::write(&info, [0u8; 7]).unwrap();
        assert!(DiskTable::open(dir.path(), "tbl", small_cfg()).is_err());
    }

    #[test]
    fn open_rejects_missing_sidecar() {
        let dir = tempdir().unwrap();
        {
            let mut table = DiskTable::create(dir.path(), "tbl", small_cfg()).unwrap();
            table.insert(-1, &records(&[1])).unwrap();
            table.flush().unwrap();
        }
        std::fs::remove_file(dir.path().join("tblx")).unwrap();
        assert!(DiskTable::open(dir.path(), "tbl", small_cfg()).is_err());
    }

    #[test]
    fn second_open_is_locked_out() {
        let dir = tempdir().unwrap();
        let _table = DiskTable::create(dir.path(), "tbl", small_cfg()).unwrap();
        assert!(DiskTable::open(dir.path(), "tbl", small_cfg()).is_err());
    }

    #[test]
    fn reads_reject_out_of_range_positions() {
        let dir = tempdir().unwrap();
        let mut table = DiskTable::create(dir.path(), "tbl", small_cfg()).unwrap();
        table.insert(-1, &records(&[1, 2])).unwrap();

        assert!(table.read1(2, 0).is_err());
        assert!(table.write1(9, 0, 0).is_err());
    }

    #[test]
    fn fields_reject_record_overflow() {
        let dir = tempdir().unwrap();
        let mut table = DiskTable::create(dir.path(), "tbl", small_cfg()).unwrap();
        table.insert(-1, &records(&[1])).unwrap();

        assert!(table.read4(0, 13).is_err());
        assert!(table.read5(0, 12).is_err());
        assert_eq!(table.read5(0, 11).unwrap(), 0);
    }

    #[test]
    fn insert_rejects_misaligned_payload() {
        let dir = tempdir().unwrap();
        let mut table = DiskTable::create(dir.path(), "tbl", small_cfg()).unwrap();
        assert!(table.insert(-1, &[0u8; 17]).is_err());
    }

    #[test]
    fn insert_rejects_position_past_end() {
        let dir = tempdir().unwrap();
        let mut table = DiskTable::create(dir.path(), "tbl", small_cfg()).unwrap();
        table.insert(-1, &records(&[1, 2])).unwrap();
        assert!(table.insert(2, &records(&[3])).is_err());
        assert!(table.insert(-2, &records(&[3])).is_err());
    }

    #[test]
    fn delete_rejects_range_past_end() {
        let dir = tempdir().unwrap();
        let mut table = DiskTable::create(dir.path(), "tbl", small_cfg()).unwrap();
        table.insert(-1, &records(&[1, 2])).unwrap();
        assert!(table.delete(1, 2).is_err());
    }

    #[test]
    fn wide_fields_round_trip_through_disk() {
        let dir = tempdir().unwrap();
        let mut table = DiskTable::create(dir.path(), "tbl", TableConfig::default()).unwrap();
        table.insert(-1, &[0u8; 32]).unwrap();

        table.write4(0, 4, 0xDEAD_BEEF).unwrap();
        table.write5(1, 8, 0x1_2345_6789).unwrap();
        table.flush().unwrap();

        assert_eq!(table.read4(0, 4).unwrap(), 0xDEAD_BEEF);
        assert_eq!(table.read5(1, 8).unwrap(), 0x1_2345_6789);
    }
}
