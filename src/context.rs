use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

use crate::{
    error::NandError,
    geometry::{self, DumpVariant, FsFamily, Geometry},
    key, superblock,
};

/// All state derived once at startup and held read-only for the life
/// of one extraction: the open image handle, the resolved key, the
/// geometry, and the located FAT/FST offsets. Threaded explicitly
/// through the walker instead of living behind process-wide globals.
pub struct NandContext<R> {
    pub image: R,
    pub variant: DumpVariant,
    pub family: FsFamily,
    pub geometry: Geometry,
    pub key: [u8; 16],
    pub fat_offset: u64,
    pub fst_offset: u64,
}

impl<R: Read + Seek> NandContext<R> {
    /// Runs the probe, key resolution and superblock location in one
    /// shot, producing the immutable context the walker needs.
    pub fn establish(mut image: R) -> Result<Self, NandError> {
        let len = image.seek(SeekFrom::End(0))?;
        let variant = geometry::detect_variant(len)?;
        let geometry = Geometry::for_variant(variant);
        let family = geometry::detect_family(&mut image, &geometry)?;
        let key = key::resolve_key(&mut image, variant, family)?;
        let location = superblock::locate_superblock(&mut image, family, &geometry)?;
        let fat_offset = location.fat_offset();
        let fst_offset = location.fst_offset(&geometry);

        log::info!(
            "resolved NAND context: variant={variant:?} family={family:?} \
             superblock={:#x} fat={fat_offset:#x} fst={fst_offset:#x}",
            location.offset
        );

        Ok(NandContext { image, variant, family, geometry, key, fat_offset, fst_offset })
    }
}

impl NandContext<File> {
    /// Opens `path` and establishes the context over it in one step,
    /// surfacing a failure to open the file as [`NandError::ImageOpenError`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, NandError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| NandError::ImageOpenError {
            path: path.display().to_string(),
            source,
        })?;
        Self::establish(file)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn open_missing_image_is_image_open_error() {
        let result = NandContext::open("/nonexistent/path/to/nand.bin");
        assert!(matches!(result, Err(NandError::ImageOpenError { .. })));
    }

    #[test]
    fn establish_rejects_unrecognised_length() {
        let cursor = std::io::Cursor::new(vec![0u8; 123]);
        let result = NandContext::establish(cursor);
        assert!(matches!(result, Err(NandError::UnknownImageSize { len: 123 })));
    }
}
