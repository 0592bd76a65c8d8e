use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
};

use crate::{
    error::NandError,
    geometry::{DumpVariant, FsFamily},
};

pub const BOOTMII_KEY_OFFSET: u64 = 0x2100_0158;
const OTP_PATH: &str = "otp.bin";
const OTP_WII_OFFSET: u64 = 0x058;
const OTP_WIIU_OFFSET: u64 = 0x170;
const KEYS_PATH: &str = "keys.bin";
const KEYS_WII_OFFSET: u64 = 0x158;

/// Tries the BootMii inline key, then otp.bin, then keys.bin, in that
/// priority, returning the first 16 bytes that could be read.
pub fn resolve_key<R: Read + Seek>(
    image: &mut R,
    variant: DumpVariant,
    family: FsFamily,
) -> Result<[u8; 16], NandError> {
    resolve_key_with(image, variant, family, try_key_file)
}

/// Same priority order as [`resolve_key`], but with the key-file lookup
/// taken as an injectable function instead of a hardcoded `File::open`
/// call, so the OTP/keys.bin fallback chain can be exercised in tests
/// without touching the real working directory.
fn resolve_key_with<R: Read + Seek>(
    image: &mut R,
    variant: DumpVariant,
    family: FsFamily,
    open: impl Fn(&str, u64) -> Option<[u8; 16]>,
) -> Result<[u8; 16], NandError> {
    if variant == DumpVariant::BootMii {
        log::info!("using inline BootMii key at image offset {BOOTMII_KEY_OFFSET:#x}");
        return read_key_at(image, BOOTMII_KEY_OFFSET);
    }

    let otp_offset = match family {
        FsFamily::Wii => OTP_WII_OFFSET,
        FsFamily::WiiU => OTP_WIIU_OFFSET,
    };
    if let Some(key) = open(OTP_PATH, otp_offset) {
        log::info!("using key from {OTP_PATH}");
        return Ok(key);
    }
    log::debug!("{OTP_PATH} unavailable, trying {KEYS_PATH}");

    if family == FsFamily::Wii {
        if let Some(key) = open(KEYS_PATH, KEYS_WII_OFFSET) {
            log::info!("using key from {KEYS_PATH}");
            return Ok(key);
        }
        log::debug!("{KEYS_PATH} unavailable");
    }

    Err(NandError::KeyUnavailable)
}

fn try_key_file(path: &str, offset: u64) -> Option<[u8; 16]> {
    let mut file = File::open(path).ok()?;
    file.seek(SeekFrom::Start(offset)).ok()?;
    let mut key = [0u8; 16];
    file.read_exact(&mut key).ok()?;
    Some(key)
}

fn read_key_at<R: Read + Seek>(image: &mut R, offset: u64) -> Result<[u8; 16], NandError> {
    image.seek(SeekFrom::Start(offset))?;
    let mut key = [0u8; 16];
    image.read_exact(&mut key)?;
    Ok(key)
}
