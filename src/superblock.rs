use std::io::{Read, Seek, SeekFrom};

use crate::{
    bytes::read_be_u32,
    error::NandError,
    geometry::{FsFamily, Geometry, TOTAL_CLUSTERS},
};

const WII_SLOT_START_CLUSTER: u64 = 0x7F00;
const WIIU_SLOT_START_CLUSTER: u64 = 0x7C00;
const SLOTS_PER_WINDOW: u64 = 16;

const WII_SUPERBLOCK_MAGIC: u32 = 0x5346_4653; // "SFFS"
const WIIU_SUPERBLOCK_MAGIC: u32 = 0x2153_4653;

fn required_magic(family: FsFamily) -> u32 {
    match family {
        FsFamily::Wii => WII_SUPERBLOCK_MAGIC,
        FsFamily::WiiU => WIIU_SUPERBLOCK_MAGIC,
    }
}

/// The chosen superblock slot, with the FAT/FST offsets it implies.
pub struct SuperblockLocation {
    pub offset: u64,
}

impl SuperblockLocation {
    pub fn fat_offset(&self) -> u64 {
        self.offset + 0x0C
    }

    pub fn fst_offset(&self, geometry: &Geometry) -> u64 {
        self.fat_offset() + 4 * geometry.cluster_stride
    }
}

/// Scans the rotating superblock slots and returns the one with the
/// largest monotonically increasing generation number.
pub fn locate_superblock<R: Read + Seek>(
    image: &mut R,
    family: FsFamily,
    geometry: &Geometry,
) -> Result<SuperblockLocation, NandError> {
    let start_cluster = match family {
        FsFamily::Wii => WII_SLOT_START_CLUSTER,
        FsFamily::WiiU => WIIU_SLOT_START_CLUSTER,
    };
    let window_stride = SLOTS_PER_WINDOW * geometry.cluster_stride;
    let scan_end = TOTAL_CLUSTERS * geometry.cluster_stride;
    let magic = required_magic(family);

    let mut loc = start_cluster * geometry.cluster_stride;
    let mut best_gen: u32 = 0;
    let mut best_offset: Option<u64> = None;

    while loc < scan_end {
        image.seek(SeekFrom::Start(loc))?;
        let slot_magic = read_be_u32(image)?;
        if slot_magic != magic {
            log::debug!("superblock slot at {loc:#x} has bad magic {slot_magic:#010x}, skipping");
            loc += window_stride;
            continue;
        }

        let generation = read_be_u32(image)?;
        if generation > best_gen {
            best_gen = generation;
            best_offset = Some(loc);
            loc += window_stride;
        } else {
            break;
        }
    }

    let offset = best_offset.ok_or(NandError::NoSuperblock)?;
    log::info!("chosen superblock at {offset:#x} with generation {best_gen}");
    Ok(SuperblockLocation { offset })
}
