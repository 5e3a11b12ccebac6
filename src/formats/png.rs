use memchr::memmem;

use crate::types::{StructureResult, TrailingData};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

pub const IHDR_CHUNK_TYPE: &[u8; 4] = b"IHDR";
pub const IEND_CHUNK_TYPE: &[u8; 4] = b"IEND";

/// IEND must sit within this many bytes of the end.
const IEND_TAIL_WINDOW: usize = 100;

pub fn validate_png(data: &[u8]) -> StructureResult {
    if !data.starts_with(&PNG_SIGNATURE) {
        return StructureResult::corrupt("Invalid PNG signature");
    }

    if data.get(12..16) != Some(IHDR_CHUNK_TYPE.as_slice()) {
        return StructureResult::corrupt("PNG without valid IHDR chunk");
    }

    if !has_iend_near_end(data) {
        return StructureResult::corrupt("PNG without IEND chunk (corrupt)");
    }

    StructureResult::ok()
}

fn has_iend_near_end(data: &[u8]) -> bool {
    let start = data.len().saturating_sub(IEND_TAIL_WINDOW);
    memmem::find(&data[start..], IEND_CHUNK_TYPE).is_some()
}

/// Position of the last `IEND` type tag after the signature.
pub fn find_last_iend(data: &[u8]) -> Option<usize> {
    let body = data.get(PNG_SIGNATURE.len()..)?;
    memmem::rfind(body, IEND_CHUNK_TYPE).map(|pos| pos + PNG_SIGNATURE.len())
}

/// Bytes following the full IEND chunk (type tag at `iend_pos`, CRC after it).
pub fn bytes_after_iend(data: &[u8], iend_pos: usize) -> usize {
    data.len().saturating_sub(iend_pos + 8)
}

pub fn check_trailing(data: &[u8], threshold: usize) -> Option<TrailingData> {
    let iend_pos = find_last_iend(data)?;
    let trailing = bytes_after_iend(data, iend_pos);
    (trailing > threshold).then(|| TrailingData {
        suspicious: true,
        trailing_bytes: trailing,
        message: "Suspicious data after end of PNG image".to_string(),
    })
}
