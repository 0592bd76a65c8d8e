use std::io::{Read, Seek, SeekFrom};

use crate::{bytes::read_be_u32, error::NandError};

pub const PAGE_PAYLOAD: u64 = 2048;
pub const PAGE_SPARE: u64 = 64;
pub const CLUSTER_PAGES: u64 = 8;
pub const CLUSTER_PAYLOAD: u64 = CLUSTER_PAGES * PAGE_PAYLOAD;
pub const TOTAL_CLUSTERS: u64 = 0x10000;
pub const BOOTMII_TRAILER: u64 = 0x400;

const WII_MAGIC: u32 = 0x5346_4653; // "SFFS"
const WIIU_MAGIC: u32 = 0x5346_5321; // "SFS!" byte-swapped

/// Which of the three recognised NAND dump shapes this image is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpVariant {
    NoEcc,
    Ecc,
    BootMii,
}

/// Which on-flash filesystem this image carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsFamily {
    Wii,
    WiiU,
}

/// Derived constants that stay fixed for the life of one extraction.
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    pub variant: DumpVariant,
    pub page_stride: u64,
    pub cluster_stride: u64,
    pub fst_ecc_stride: u64,
    pub fat_ecc_stride: u64,
}

impl Geometry {
    pub fn for_variant(variant: DumpVariant) -> Self {
        let page_stride = match variant {
            DumpVariant::NoEcc => PAGE_PAYLOAD,
            DumpVariant::Ecc | DumpVariant::BootMii => PAGE_PAYLOAD + PAGE_SPARE,
        };
        let (fst_ecc_stride, fat_ecc_stride) = match variant {
            DumpVariant::NoEcc => (0, 0),
            DumpVariant::Ecc | DumpVariant::BootMii => (2, 32),
        };
        Geometry {
            variant,
            page_stride,
            cluster_stride: page_stride * CLUSTER_PAGES,
            fst_ecc_stride,
            fat_ecc_stride,
        }
    }
}

pub fn no_ecc_image_len() -> u64 {
    PAGE_PAYLOAD * CLUSTER_PAGES * TOTAL_CLUSTERS
}

pub fn ecc_image_len() -> u64 {
    (PAGE_PAYLOAD + PAGE_SPARE) * CLUSTER_PAGES * TOTAL_CLUSTERS
}

pub fn bootmii_image_len() -> u64 {
    ecc_image_len() + BOOTMII_TRAILER
}

/// Maps a total image length onto exactly one dump variant.
pub fn detect_variant(file_len: u64) -> Result<DumpVariant, NandError> {
    let variant = if file_len == no_ecc_image_len() {
        DumpVariant::NoEcc
    } else if file_len == ecc_image_len() {
        DumpVariant::Ecc
    } else if file_len == bootmii_image_len() {
        DumpVariant::BootMii
    } else {
        return Err(NandError::UnknownImageSize { len: file_len });
    };
    log::debug!("detected dump variant {variant:?} from image length {file_len:#x}");
    Ok(variant)
}

/// Reads the filesystem magic at cluster 0x7FF0 and maps it to a family.
pub fn detect_family<R: Read + Seek>(
    image: &mut R,
    geometry: &Geometry,
) -> Result<FsFamily, NandError> {
    image.seek(SeekFrom::Start(geometry.cluster_stride * 0x7FF0))?;
    let magic = read_be_u32(image)?;
    let family = match magic {
        WII_MAGIC => FsFamily::Wii,
        WIIU_MAGIC => {
            if geometry.variant == DumpVariant::BootMii {
                return Err(NandError::IncompatibleVariant);
            }
            FsFamily::WiiU
        }
        _ => return Err(NandError::UnknownFilesystem { magic }),
    };
    log::debug!("detected filesystem family {family:?}");
    Ok(family)
}
