//! Memory-resident table backend.
//!
//! Keeps the whole record array in one growable buffer. Used for
//! transient documents that never touch disk, and in tests as a
//! behavioral oracle for the disk engine: both backends expose the same
//! positional semantics, so any divergence is a bug in the block
//! machinery.

use eyre::{ensure, Result};

use super::{get1, get2, get4, get5, put1, put2, put4, put5, Table};
use crate::config::TableConfig;

#[derive(Debug)]
pub struct MemTable {
    cfg: TableConfig,
    data: Vec<u8>,
    count: u32,
}

impl MemTable {
    pub fn new(cfg: TableConfig) -> Self {
        Self {
            cfg,
            data: Vec::new(),
            count: 0,
        }
    }

    /// Number of records.
    pub fn size(&self) -> u32 {
        self.count
    }

    fn field_offset(&self, pre: u32, off: usize, width: usize) -> Result<usize> {
        ensure!(
            pre < self.count,
            "position {} out of range (count={})",
            pre,
            self.count
        );
        ensure!(
            off + width <= self.cfg.node_size(),
            "field at byte {}..{} exceeds the record size {}",
            off,
            off + width,
            self.cfg.node_size()
        );
        Ok(pre as usize * self.cfg.node_size() + off)
    }
}

impl Table for MemTable {
    fn read1(&mut self, pre: u32, off: usize) -> Result<u32> {
        let o = self.field_offset(pre, off, 1)?;
        Ok(get1(&self.data, o))
    }

    fn read2(&mut self, pre: u32, off: usize) -> Result<u32> {
        let o = self.field_offset(pre, off, 2)?;
        Ok(get2(&self.data, o))
    }

    fn read4(&mut self, pre: u32, off: usize) -> Result<u32> {
        let o = self.field_offset(pre, off, 4)?;
        Ok(get4(&self.data, o))
    }

    fn read5(&mut self, pre: u32, off: usize) -> Result<u64> {
        let o = self.field_offset(pre, off, 5)?;
        Ok(get5(&self.data, o))
    }

    fn write1(&mut self, pre: u32, off: usize, value: u32) -> Result<()> {
        let o = self.field_offset(pre, off, 1)?;
        put1(&mut self.data, o, value);
        Ok(())
    }

    fn write2(&mut self, pre: u32, off: usize, value: u32) -> Result<()> {
        let o = self.field_offset(pre, off, 2)?;
        put2(&mut self.data, o, value);
        Ok(())
    }

    fn write4(&mut self, pre: u32, off: usize, value: u32) -> Result<()> {
        let o = self.field_offset(pre, off, 4)?;
        put4(&mut self.data, o, value);
        Ok(())
    }

    fn write5(&mut self, pre: u32, off: usize, value: u64) -> Result<()> {
        let o = self.field_offset(pre, off, 5)?;
        put5(&mut self.data, o, value);
        Ok(())
    }

    fn insert(&mut self, pre: i32, entries: &[u8]) -> Result<()> {
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
        ensure!(
            self.count as u64 + (entries.len() / node) as u64 <= i32::MAX as u64,
            "inserting {} records would exceed the table capacity",
            entries.len() / node
        );

        let at = (pre + 1) as usize * node;
        self.data.splice(at..at, entries.iter().copied());
        self.count += (entries.len() / node) as u32;
        Ok(())
    }

    fn delete(&mut self, first: u32, nr: u32) -> Result<()> {
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

        let node = self.cfg.node_size();
        self.data
            .drain(first as usize * node..(first + nr) as usize * node);
        self.count -= nr;
        Ok(())
    }

    fn size(&self) -> u32 {
        self.count
    }

    // the memory backend keeps no block index
    fn blocks(&self) -> u32 {
        0
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MemTable {
        MemTable::new(TableConfig::new(6, 4, 0.5).unwrap())
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
    fn insert_before_first_and_after() {
        let mut t = table();
        t.insert(-1, &records(&[2, 3])).unwrap();
        t.insert(-1, &records(&[1])).unwrap();
        t.insert(2, &records(&[4])).unwrap();

        assert_eq!(t.size(), 4);
        for pre in 0..4 {
            assert_eq!(t.read1(pre, 0).unwrap(), pre + 1);
        }
    }

    #[test]
    fn delete_renumbers() {
        let mut t = table();
        t.insert(-1, &records(&[1, 2, 3, 4, 5])).unwrap();
        t.delete(1, 3).unwrap();

        assert_eq!(t.size(), 2);
        assert_eq!(t.read1(0, 0).unwrap(), 1);
        assert_eq!(t.read1(1, 0).unwrap(), 5);
    }

    #[test]
    fn fields_round_trip() {
        let mut t = table();
        t.insert(-1, &records(&[0])).unwrap();

        t.write2(0, 2, 0xBEEF).unwrap();
        t.write5(0, 4, 0xA_BBCC_DDEE).unwrap();
        assert_eq!(t.read2(0, 2).unwrap(), 0xBEEF);
        assert_eq!(t.read5(0, 4).unwrap(), 0xA_BBCC_DDEE);
    }

    #[test]
    fn rejects_bad_ranges() {
        let mut t = table();
        t.insert(-1, &records(&[1])).unwrap();

        assert!(t.read1(1, 0).is_err());
        assert!(t.insert(1, &records(&[2])).is_err());
        assert!(t.delete(0, 2).is_err());
        assert!(t.insert(0, &[0u8; 5]).is_err());
    }
}
