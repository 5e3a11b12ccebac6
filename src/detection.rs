//! Content-based type detection
//!
//! Sniffing runs first, then OOXML/ODF disambiguation for ZIP candidates,
//! then the magic-number fallback chain and finally the plain-text heuristic.

use memchr::memmem;

use crate::signatures::{SignatureKind, SignatureTable};
use crate::types::{FileTag, TEXT_PRINTABLE_RATIO, TEXT_SAMPLE};

const ODT_MIME: &[u8] = b"application/vnd.oasis.opendocument.text";
const MKV_MIME: &str = "video/x-matroska";

/// The EBML DocType sits inside the header, well before this offset.
const EBML_DOCTYPE_WINDOW: usize = 64;

/// Detected tag plus the sniffer's MIME answer, when it gave one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedType {
    pub tag: FileTag,
    pub mime: Option<String>,
}

impl DetectedType {
    pub fn is_unknown(&self) -> bool {
        self.tag == FileTag::Unknown
    }
}

struct Sniffed {
    tag: Option<FileTag>,
    mime: &'static str,
    zip_candidate: bool,
}

/// infer reports any EBML magic as WebM; only a `webm` DocType makes it one.
fn declares_webm(data: &[u8]) -> bool {
    let header = &data[..data.len().min(EBML_DOCTYPE_WINDOW)];
    memmem::find(header, b"webm").is_some()
}

fn sniff(data: &[u8]) -> Option<Sniffed> {
    let kind = infer::get(data)?;
    let ext = kind.extension().to_ascii_lowercase();
    let tag = match ext.as_str() {
        "jpg" | "jpeg" => Some(FileTag::Jpeg),
        "png" => Some(FileTag::Png),
        "gif" => Some(FileTag::Gif),
        "webp" => Some(FileTag::Webp),
        "bmp" => Some(FileTag::Bmp),
        "pdf" => Some(FileTag::Pdf),
        "zip" => Some(FileTag::Zip),
        "rar" => Some(FileTag::Rar),
        "7z" => Some(FileTag::SevenZip),
        "mp4" | "m4a" | "mov" => Some(FileTag::Mp4),
        "webm" if declares_webm(data) => Some(FileTag::Webm),
        "webm" | "mkv" => Some(FileTag::Mkv),
        "avi" => Some(FileTag::Avi),
        "wav" => Some(FileTag::Wav),
        "mp3" => Some(FileTag::Mp3),
        _ => None,
    };
    let zip_candidate = tag == Some(FileTag::Zip)
        || kind.mime_type() == "application/zip"
        || matches!(ext.as_str(), "docx" | "xlsx" | "pptx" | "odt");
    let mime = match tag {
        Some(FileTag::Mkv) => MKV_MIME,
        _ => kind.mime_type(),
    };
    Some(Sniffed {
        tag,
        mime,
        zip_candidate,
    })
}

/// Office flavour of a ZIP container, by its internal path prefixes.
pub fn resolve_zip_flavor(data: &[u8]) -> FileTag {
    let contains = |needle: &[u8]| memmem::find(data, needle).is_some();
    if contains(b"word/") {
        FileTag::Docx
    } else if contains(b"ppt/") {
        FileTag::Pptx
    } else if contains(b"xl/") {
        FileTag::Xlsx
    } else if contains(b"mimetype") && contains(ODT_MIME) {
        FileTag::Odt
    } else {
        FileTag::Zip
    }
}

fn riff_subtype(data: &[u8]) -> Option<FileTag> {
    match data.get(8..12)? {
        b"WEBP" => Some(FileTag::Webp),
        b"AVI " => Some(FileTag::Avi),
        b"WAVE" => Some(FileTag::Wav),
        _ => None,
    }
}

/// Magic-number fallback chain, in fixed priority order.
pub fn detect_by_signature(table: &SignatureTable, data: &[u8]) -> Option<FileTag> {
    const LEADING: [(SignatureKind, FileTag); 4] = [
        (SignatureKind::Jpeg, FileTag::Jpeg),
        (SignatureKind::Png, FileTag::Png),
        (SignatureKind::Gif, FileTag::Gif),
        (SignatureKind::Bmp, FileTag::Bmp),
    ];
    const TRAILING: [(SignatureKind, FileTag); 8] = [
        (SignatureKind::Mp4Ftyp, FileTag::Mp4),
        (SignatureKind::Ebml, FileTag::Mkv),
        (SignatureKind::Pdf, FileTag::Pdf),
        (SignatureKind::Zip, FileTag::Zip),
        (SignatureKind::Rar, FileTag::Rar),
        (SignatureKind::SevenZip, FileTag::SevenZip),
        (SignatureKind::Exe, FileTag::Exe),
        (SignatureKind::Elf, FileTag::Elf),
    ];

    if let Some(&(_, tag)) = LEADING
        .iter()
        .find(|(kind, _)| table.matches_header(*kind, data))
    {
        return Some(tag);
    }
    if table.matches_header(SignatureKind::Riff, data) {
        if let Some(tag) = riff_subtype(data) {
            return Some(tag);
        }
    }
    TRAILING
        .iter()
        .find(|(kind, _)| table.matches_header(*kind, data))
        .map(|&(_, tag)| tag)
}

/// Plain-text heuristic over the first 4 KiB.
pub fn looks_like_text(data: &[u8]) -> bool {
    let sample = &data[..data.len().min(TEXT_SAMPLE)];
    if sample.is_empty() {
        return false;
    }
    let printable = sample
        .iter()
        .filter(|&&b| matches!(b, 0x09 | 0x0A | 0x0D | 0x20..=0x7E))
        .count();
    printable as f64 / sample.len() as f64 > TEXT_PRINTABLE_RATIO
}

/// Detects the real type of `data`.
pub fn detect_type(table: &SignatureTable, data: &[u8]) -> DetectedType {
    let sniffed = sniff(data);
    let mime = sniffed.as_ref().map(|s| s.mime.to_string());
    let mut tag = sniffed.as_ref().and_then(|s| s.tag);

    if sniffed.as_ref().is_some_and(|s| s.zip_candidate) {
        tag = Some(resolve_zip_flavor(data));
    }

    let tag = tag
        .or_else(|| detect_by_signature(table, data))
        .unwrap_or_else(|| {
            if looks_like_text(data) {
                FileTag::Txt
            } else {
                FileTag::Unknown
            }
        });

    tracing::debug!(detected = %tag, mime = ?mime, "type detection");
    DetectedType { tag, mime }
}
