use crate::types::StructureResult;

pub const JPEG_SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

const MIN_MARKERS: usize = 3;

/// Counts `0xFF xx` pairs where `xx` is neither stuffing (0x00) nor fill (0xFF).
pub fn count_markers(data: &[u8]) -> usize {
    data.windows(2)
        .filter(|pair| pair[0] == 0xFF && pair[1] != 0x00 && pair[1] != 0xFF)
        .count()
}

pub fn validate_jpeg(data: &[u8]) -> StructureResult {
    if !data.starts_with(&JPEG_SOI) {
        return StructureResult::corrupt("Invalid JPEG signature");
    }

    if !data.ends_with(&JPEG_EOI) {
        return StructureResult::corrupt("JPEG has no valid end-of-image marker (EOI)");
    }

    if count_markers(data) < MIN_MARKERS {
        return StructureResult::corrupt("JPEG with corrupt structure (insufficient markers)");
    }

    StructureResult::ok()
}
