//! Hidden-payload signature scan

use crate::signatures::SignatureTable;
use crate::types::{Detection, FileTag};

/// Every dangerous signature starting in the first `window` bytes, ordered
/// by offset then kind. Executable magics are dropped when the buffer opens
/// with an image header, since compressed image data produces them by chance.
pub fn scan(table: &SignatureTable, data: &[u8], window: usize) -> Vec<Detection> {
    let image = table.has_image_header(data);
    table
        .find_dangerous(data, window)
        .into_iter()
        .filter(|(_, kind)| !(image && kind.is_executable()))
        .filter_map(|(offset, kind)| {
            table
                .risk_of(kind)
                .map(|risk| Detection::new(kind, offset, risk))
        })
        .collect()
}

/// Drops the file's own header match at offset 0.
pub fn without_self_match(detections: Vec<Detection>, detected: FileTag) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|d| !d.is_self_match(detected))
        .collect()
}
