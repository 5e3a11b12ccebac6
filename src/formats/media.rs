//! MP4/QuickTime and Matroska/WebM header checks.

use memchr::memmem;

use crate::types::StructureResult;

pub const FTYP_BOX: &[u8; 4] = b"ftyp";
pub const EBML_HEADER: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// `ftyp` must start inside this prefix.
const FTYP_SEARCH_LIMIT: usize = 256;

pub fn validate_mp4(data: &[u8]) -> StructureResult {
    let prefix = &data[..data.len().min(FTYP_SEARCH_LIMIT)];
    if memmem::find(prefix, FTYP_BOX).is_none() {
        return StructureResult::corrupt("MP4/MOV without valid ftyp box");
    }
    StructureResult::ok()
}

pub fn validate_ebml(data: &[u8]) -> StructureResult {
    if !data.starts_with(&EBML_HEADER) {
        return StructureResult::corrupt("MKV/WebM without EBML header");
    }
    StructureResult::ok()
}
