use std::io::{self, Read, Seek, SeekFrom};

use aes::{
    cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit},
    Aes128,
};

use crate::{error::NandError, geometry::Geometry};

type Aes128CbcDec = cbc::Decryptor<Aes128>;

pub const CLUSTER_PAYLOAD: usize = 16384;
const PAGE_PAYLOAD: usize = 2048;
const CLUSTER_PAGES: usize = 8;
const ZERO_IV: [u8; 16] = [0; 16];

/// Reads the eight pages making up one logical cluster, discards any
/// spare/ECC bytes, and AES-CBC decrypts the result in place with a
/// fresh zero IV (each cluster is encrypted independently on-device).
pub fn read_cluster<R: Read + Seek>(
    image: &mut R,
    index: u16,
    geometry: &Geometry,
    key: &[u8; 16],
) -> Result<[u8; CLUSTER_PAYLOAD], NandError> {
    image.seek(SeekFrom::Start(index as u64 * geometry.cluster_stride))?;

    let mut cluster = [0u8; CLUSTER_PAYLOAD];
    let mut page = vec![0u8; geometry.page_stride as usize];
    for i in 0..CLUSTER_PAGES {
        image.read_exact(&mut page)?;
        cluster[i * PAGE_PAYLOAD..][..PAGE_PAYLOAD].copy_from_slice(&page[..PAGE_PAYLOAD]);
    }

    Aes128CbcDec::new(key.into(), &ZERO_IV.into())
        .decrypt_padded_mut::<NoPadding>(&mut cluster)
        .map_err(|_| {
            NandError::ImageIoError(io::Error::new(
                io::ErrorKind::InvalidData,
                "cluster payload is not a multiple of the AES block size",
            ))
        })?;

    Ok(cluster)
}
