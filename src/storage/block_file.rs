//! # Block Data File
//!
//! Whole-block I/O over the table data file. The file is a plain
//! concatenation of fixed-size blocks with no header; block `n` lives at
//! byte offset `n * block_size`. The file grows by writing at the next
//! block-aligned offset past the end; it never shrinks, and block
//! numbers freed by deletion are never reused.
//!
//! The engine above keeps exactly one block buffered, so this type does
//! no caching of its own: every call is one seek plus one full-block
//! read or write.
//!
//! ## Error Handling
//!
//! All fallible operations return `eyre::Result` with the file path and
//! the block number in context. A failed read leaves the caller's
//! buffer contents unspecified but never touches the file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};

#[derive(Debug)]
pub struct BlockFile {
    file: File,
    path: PathBuf,
    block_size: usize,
}

impl BlockFile {
    /// Opens an existing block file. The file length must be a multiple
    /// of the block size.
    pub fn open<P: AsRef<Path>>(path: P, block_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .wrap_err_with(|| format!("failed to open block file '{}'", path.display()))?;

        let file_size = file
            .metadata()
            .wrap_err_with(|| format!("failed to get metadata for '{}'", path.display()))?
            .len();

        ensure!(
            file_size % block_size as u64 == 0,
            "block file '{}' size {} is not a multiple of the block size {}",
            path.display(),
            file_size,
            block_size
        );

        Ok(Self {
            file,
            path,
            block_size,
        })
    }

    /// Creates a new, empty block file, truncating any existing one.
    pub fn create<P: AsRef<Path>>(path: P, block_size: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .wrap_err_with(|| format!("failed to create block file '{}'", path.display()))?;

        Ok(Self {
            file,
            path,
            block_size,
        })
    }

    /// Reads block `block_no` into `buf`, which must be exactly one
    /// block long.
    pub fn read_block(&mut self, block_no: u32, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.block_size);
        self.file
            .seek(SeekFrom::Start(block_no as u64 * self.block_size as u64))
            .and_then(|_| self.file.read_exact(buf))
            .wrap_err_with(|| {
                format!(
                    "failed to read block {} from '{}'",
                    block_no,
                    self.path.display()
                )
            })
    }

    /// Writes `buf` as block `block_no`, extending the file if the
    /// block lies past the current end.
    pub fn write_block(&mut self, block_no: u32, buf: &[u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.block_size);
        self.file
            .seek(SeekFrom::Start(block_no as u64 * self.block_size as u64))
            .and_then(|_| self.file.write_all(buf))
            .wrap_err_with(|| {
                format!(
                    "failed to write block {} to '{}'",
                    block_no,
                    self.path.display()
                )
            })
    }

    /// Number of whole blocks currently in the file.
    pub fn block_count(&self) -> Result<u64> {
        let file_size = self
            .file
            .metadata()
            .wrap_err_with(|| format!("failed to get metadata for '{}'", self.path.display()))?
            .len();
        Ok(file_size / self.block_size as u64)
    }

    /// Forces file contents to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.file
            .sync_all()
            .wrap_err_with(|| format!("failed to sync '{}'", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn blocks_round_trip() {
        let dir = tempdir().unwrap();
        let mut bf = BlockFile::create(dir.path().join("tbl"), 64).unwrap();

        let block_a = [0xAAu8; 64];
        let block_b = [0xBBu8; 64];
        bf.write_block(0, &block_a).unwrap();
        bf.write_block(1, &block_b).unwrap();

        let mut buf = [0u8; 64];
        bf.read_block(0, &mut buf).unwrap();
        assert_eq!(buf, block_a);
        bf.read_block(1, &mut buf).unwrap();
        assert_eq!(buf, block_b);
        assert_eq!(bf.block_count().unwrap(), 2);
    }

    #[test]
    fn sparse_write_extends_file() {
        let dir = tempdir().unwrap();
        let mut bf = BlockFile::create(dir.path().join("tbl"), 64).unwrap();

        bf.write_block(3, &[7u8; 64]).unwrap();
        assert_eq!(bf.block_count().unwrap(), 4);

        let mut buf = [1u8; 64];
        bf.read_block(3, &mut buf).unwrap();
        assert_eq!(buf, [7u8; 64]);
    }

    #[test]
    fn read_past_end_fails() {
        let dir = tempdir().unwrap();
        let mut bf = BlockFile::create(dir.path().join("tbl"), 64).unwrap();

        let mut buf = [0u8; 64];
        assert!(bf.read_block(0, &mut buf).is_err());
    }

    #[test]
    fn open_rejects_partial_blocks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tbl");
        std::fs::write(&path, [0u8; 100]).unwrap();

        assert!(BlockFile::open(&path, 64).is_err());
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempdir().unwrap();
        assert!(BlockFile::open(dir.path().join("absent"), 64).is_err());
    }
}
