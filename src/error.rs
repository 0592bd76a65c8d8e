use std::io;

use thiserror::Error;

/// Every failure this crate can produce, per the error kinds it documents.
#[derive(Error, Debug)]
pub enum NandError {
    #[error("failed to open NAND image {path}: {source}")]
    ImageOpenError { path: String, #[source] source: io::Error },

    #[error("image length {len:#x} does not match any recognised NAND dump size")]
    UnknownImageSize { len: u64 },

    #[error("magic {magic:#010x} at cluster 0x7FF0 is not a recognised filesystem")]
    UnknownFilesystem { magic: u32 },

    #[error("a WiiU filesystem magic was found in a BootMii dump, which is not a valid combination")]
    IncompatibleVariant,

    #[error("no 16-byte AES key could be resolved from any known source")]
    KeyUnavailable,

    #[error("no superblock slot had both a valid magic and an increasing generation")]
    NoSuperblock,

    #[error("I/O error reading NAND image: {0}")]
    ImageIoError(#[from] io::Error),

    #[error("failed to write {path}: {source}")]
    WriterError { path: String, #[source] source: io::Error },

    #[error("cycle detected in FST links at entry {entry}")]
    CycleDetected { entry: u16 },
}
