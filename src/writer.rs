use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::error::NandError;

/// The host-side sink the tree walker pushes decoded directories and
/// files into. Paths are relative to the extraction's output root;
/// an empty path refers to the root itself.
pub trait NandWriter {
    fn make_directory(&mut self, path: &str) -> Result<(), NandError>;
    fn write_file(&mut self, path: &str, bytes: &[u8], length: usize) -> Result<(), NandError>;
}

/// Writes extracted directories and files under a real host directory.
pub struct FsWriter {
    root: PathBuf,
}

impl FsWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsWriter { root: root.into() }
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        }
    }
}

impl NandWriter for FsWriter {
    fn make_directory(&mut self, path: &str) -> Result<(), NandError> {
        let full = self.resolve(path);
        fs::create_dir_all(&full).map_err(|source| NandError::WriterError {
            path: full.display().to_string(),
            source,
        })
    }

    fn write_file(&mut self, path: &str, bytes: &[u8], length: usize) -> Result<(), NandError> {
        let full = self.resolve(path);
        write_exact(&full, &bytes[..length]).map_err(|source| NandError::WriterError {
            path: full.display().to_string(),
            source,
        })
    }
}

fn write_exact(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.flush()
}
