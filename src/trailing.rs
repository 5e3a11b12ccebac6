use crate::formats::png;
use crate::types::{FileTag, TrailingData};

/// Suspicious appended bytes for image types. JPEG is never flagged since
/// data after EOI is legal.
pub fn check_trailing(data: &[u8], tag: FileTag, threshold: usize) -> Option<TrailingData> {
    match tag {
        FileTag::Png => png::check_trailing(data, threshold),
        FileTag::Jpeg | FileTag::Gif | FileTag::Bmp | FileTag::Webp => None,
        FileTag::Avi
        | FileTag::Wav
        | FileTag::Mp4
        | FileTag::Mkv
        | FileTag::Webm
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
        | FileTag::Unknown => None,
    }
}
