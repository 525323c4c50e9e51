//! # XyloDB - Table Storage for a Native XML Database
//!
//! XyloDB stores an XML document as a dense array of fixed-size records,
//! one per tree node in pre-order. This crate implements the storage core
//! that backs that array: a paged block file, a sparse sorted index from
//! logical record positions to physical blocks, and the structural
//! algorithms that keep both consistent across bulk insertion and
//! deletion.
//!
//! ## Architecture
//!
//! The storage core sits below the query and update layers:
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Query / Update Execution (ext.)    │
//! ├─────────────────────────────────────┤
//! │   Table Access (read/write/insert/   │
//! │   delete over logical positions)     │
//! ├─────────────────────────────────────┤
//! │   Block Index (firstPre → blockNo)   │
//! ├─────────────────────────────────────┤
//! │   Block File (fixed-size pages,      │
//! │   single buffered block)             │
//! └─────────────────────────────────────┘
//! ```
//!
//! The two lower layers live in [`storage`]; the uppermost layer is an
//! external collaborator that drives the [`storage::Table`] operations.
//!
//! ## File Layout
//!
//! A database is a directory holding one file triple per table, named by
//! a common prefix:
//!
//! ```text
//! database_dir/
//! ├── tbl       # block data file: concatenated fixed-size blocks
//! ├── tblx      # block index: (firstPre, blockNo) pairs, big-endian
//! ├── tbli      # counters: allocated blocks, used blocks, record count
//! └── tbl.lock  # advisory lock while an engine owns the triple
//! ```
//!
//! ## Workload Shape
//!
//! Tree traversals read records in long ascending runs, and document
//! updates insert or delete contiguous pre-order ranges. The engine is
//! built for exactly that shape: one buffered block, a hot-restarting
//! binary search over the index, and block splits that leave fill-factor
//! headroom so subsequent inserts stay in-place.
//!
//! ## Module Overview
//!
//! - [`config`]: block/record geometry constants and [`TableConfig`]
//! - [`storage`]: the [`storage::Table`] trait and its disk and memory
//!   backends

pub mod config;
pub mod storage;

pub use config::TableConfig;
pub use storage::{DiskTable, MemTable, Table};
