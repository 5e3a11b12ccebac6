use crate::types::StructureResult;

pub const GIF87A: &[u8; 6] = b"GIF87a";
pub const GIF89A: &[u8; 6] = b"GIF89a";
pub const GIF_TRAILER: u8 = 0x3B;

pub fn validate_gif(data: &[u8]) -> StructureResult {
    if !data.starts_with(GIF87A) && !data.starts_with(GIF89A) {
        return StructureResult::corrupt("Invalid GIF signature");
    }

    if data.last() != Some(&GIF_TRAILER) {
        return StructureResult::corrupt("GIF without valid trailer (corrupt)");
    }

    StructureResult::ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_versions_accepted() {
        assert!(validate_gif(b"GIF87a\x01\x00\x01\x00\x00\x00\x00;").valid);
        assert!(validate_gif(b"GIF89a\x01\x00\x01\x00\x00\x00\x00;").valid);
    }

    #[test]
    fn gif8_without_version_is_rejected() {
        let result = validate_gif(b"GIF88a\x01\x00\x01\x00\x00\x00\x00;");
        assert_eq!(result.reason.as_deref(), Some("Invalid GIF signature"));
    }

    #[test]
    fn missing_trailer_is_corrupt() {
        assert!(!validate_gif(b"GIF89a\x01\x00\x01\x00\x00\x00\x00\x00").valid);
    }
}
