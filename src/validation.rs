use crate::formats::{gif, jpeg, media, png};
use crate::types::{FileTag, StructureResult};

/// Format-specific structure check. Types without a rule pass.
pub fn validate_structure(data: &[u8], tag: FileTag) -> StructureResult {
    match tag {
        FileTag::Jpeg => jpeg::validate_jpeg(data),
        FileTag::Png => png::validate_png(data),
        FileTag::Gif => gif::validate_gif(data),
        FileTag::Mp4 => media::validate_mp4(data),
        FileTag::Mkv | FileTag::Webm => media::validate_ebml(data),
        FileTag::Bmp
        | FileTag::Webp
        | FileTag::Avi
        | FileTag::Wav
        | FileTag::Mp3
        | FileTag::Pdf
        | FileTag::Zip
        | FileTag::Rar
        | FileTag::SevenZip
        | FileTag::Exe
        | FileTag::Elf
        | FileTag::Docx
        | FileTag::Pptx
        | FileTag::Xlsx
        | FileTag::Odt
        | FileTag::Txt
        | FileTag::Unknown => StructureResult::ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unvalidated_types_fail_open() {
        assert!(validate_structure(b"garbage bytes", FileTag::Bmp).valid);
        assert!(validate_structure(b"garbage bytes", FileTag::Zip).valid);
    }

    #[test]
    fn webm_uses_ebml_rule() {
        assert!(!validate_structure(b"not an ebml file", FileTag::Webm).valid);
    }
}
