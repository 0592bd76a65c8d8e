//! Extracts the contents of a raw Wii or Wii U NAND flash dump into a
//! host-side directory tree.
//!
//! The entry point is [`NandContext::establish`], which probes the dump
//! variant, resolves the decryption key and locates the newest
//! superblock, followed by [`walker::extract`], which walks the file
//! system table and pushes directories/files to a [`writer::NandWriter`].

pub mod bytes;
pub mod cluster;
pub mod context;
pub mod error;
pub mod fat;
pub mod fst;
pub mod geometry;
pub mod key;
pub mod superblock;
pub mod walker;
pub mod writer;

pub use context::NandContext;
pub use error::NandError;
pub use geometry::{DumpVariant, FsFamily, Geometry};
pub use walker::{extract, ExtractionStats};
pub use writer::{FsWriter, NandWriter};
