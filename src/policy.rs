//! Upload admission policy
//!
//! Turns an [`AnalysisResult`] into an accept/reject decision and checks the
//! client-declared MIME type against the detected content.

use serde::Serialize;

use crate::signatures::SignatureKind;
use crate::types::{AnalysisResult, FileTag, Risk};

const BLOCKED_EXTENSIONS: &[&str] = &[
    ".exe", ".bat", ".cmd", ".com", ".scr", ".vbs", ".js", ".jar", ".app", ".deb", ".rpm", ".sh",
    ".bash", ".elf", ".bin",
];

const BLOCKED_MIMES: &[&str] = &[
    "application/x-msdownload",
    "application/x-executable",
    "application/x-sh",
    "application/x-bat",
    "text/x-sh",
];

/// Types admitted despite an unsafe verdict, unless corrupted or carrying a
/// non-EXE critical detection.
pub const RELAXED_TYPES: &[FileTag] = &[
    FileTag::Mp4,
    FileTag::Webm,
    FileTag::Mkv,
    FileTag::Avi,
    FileTag::Wav,
    FileTag::Mp3,
    FileTag::Pdf,
    FileTag::Zip,
    FileTag::Docx,
    FileTag::Xlsx,
    FileTag::Pptx,
    FileTag::Txt,
    FileTag::Rar,
    FileTag::SevenZip,
    FileTag::Odt,
];

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

const OOXML_EXTENSIONS: &[(&str, &str)] = &[
    (DOCX_MIME, ".docx"),
    (PPTX_MIME, ".pptx"),
    (XLSX_MIME, ".xlsx"),
];

pub const CORRUPTED_REASON: &str = "file is corrupted or has an invalid structure";
pub const HIDDEN_CONTENT_REASON: &str = "hidden content or steganography detected";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickCheck {
    pub safe: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl QuickCheck {
    fn pass() -> Self {
        Self {
            safe: true,
            reason: None,
        }
    }

    fn block(reason: &str) -> Self {
        Self {
            safe: false,
            reason: Some(reason.to_string()),
        }
    }
}

fn extension_of(filename: &str) -> Option<String> {
    let lower = filename.to_lowercase();
    let (_, ext) = lower.rsplit_once('.')?;
    (!ext.is_empty()).then(|| format!(".{ext}"))
}

/// Extension/MIME blocklist run before any content analysis.
pub fn quick_validation(mime: &str, filename: &str) -> QuickCheck {
    if extension_of(filename).is_some_and(|ext| BLOCKED_EXTENSIONS.contains(&ext.as_str())) {
        return QuickCheck::block("File extension not allowed");
    }
    if BLOCKED_MIMES.contains(&mime) {
        return QuickCheck::block("File type not allowed");
    }
    QuickCheck::pass()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum Admission {
    Accept,
    /// Unsafe verdict tolerated for a relaxed type
    AcceptWithWarning { critical: usize },
    Reject { reason: String },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Admission::Reject { .. })
    }
}

pub fn admit(result: &AnalysisResult) -> Admission {
    if result.safe {
        return Admission::Accept;
    }

    if RELAXED_TYPES.contains(&result.detected_type) && !result.is_corrupted() {
        let critical = result
            .hidden_files
            .iter()
            .filter(|d| d.risk == Risk::Critical);
        let non_exe = critical
            .clone()
            .filter(|d| d.kind != SignatureKind::Exe)
            .count();
        if non_exe == 0 {
            let critical = critical.count();
            tracing::warn!(
                detected = %result.detected_type,
                critical,
                details = %result.details,
                "admitting unsafe file under relaxed policy"
            );
            return Admission::AcceptWithWarning { critical };
        }
    }

    let reason = if result.is_corrupted() {
        CORRUPTED_REASON
    } else {
        HIDDEN_CONTENT_REASON
    };
    Admission::Reject {
        reason: reason.to_string(),
    }
}

/// Declared MIME strings acceptable for a detected type.
pub fn expected_mimes(tag: FileTag) -> &'static [&'static str] {
    match tag {
        FileTag::Jpeg => &["image/jpeg", "image/jpg"],
        FileTag::Png => &["image/png"],
        FileTag::Gif => &["image/gif"],
        FileTag::Bmp => &["image/bmp"],
        FileTag::Webp => &["image/webp"],
        FileTag::Pdf => &["application/pdf"],
        FileTag::Mp4 => &["video/mp4", "video/quicktime"],
        FileTag::Webm => &["video/webm"],
        FileTag::Mkv => &["video/x-matroska", "video/webm"],
        FileTag::Avi => &["video/x-msvideo"],
        FileTag::Wav => &["audio/wav", "audio/x-wav"],
        FileTag::Mp3 => &["audio/mpeg"],
        FileTag::Zip => &["application/zip"],
        FileTag::Docx => &[DOCX_MIME],
        FileTag::Xlsx => &[XLSX_MIME],
        FileTag::Pptx => &[PPTX_MIME],
        FileTag::Txt => &["text/plain"],
        FileTag::Rar => &["application/x-rar-compressed", "application/vnd.rar"],
        FileTag::SevenZip => &["application/x-7z-compressed"],
        FileTag::Odt => &["application/vnd.oasis.opendocument.text"],
        FileTag::Exe | FileTag::Elf | FileTag::Unknown => &[],
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MimeCheck {
    Match,
    /// No allow-list exists for the detected type
    Unchecked,
    OoxmlAsZip,
    Mismatch { declared: String, detected: FileTag },
}

impl MimeCheck {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, MimeCheck::Mismatch { .. })
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            MimeCheck::Mismatch { declared, detected } => Some(format!(
                "The file claims to be {declared} but its content is {detected}"
            )),
            _ => None,
        }
    }
}

fn is_ooxml_as_zip(detected: FileTag, declared_mime: &str, filename: &str) -> bool {
    if detected != FileTag::Zip {
        return false;
    }
    let declared_ext = filename
        .rsplit('.')
        .next()
        .map(|ext| format!(".{}", ext.to_lowercase()));
    OOXML_EXTENSIONS
        .iter()
        .any(|&(mime, ext)| mime == declared_mime && declared_ext.as_deref() == Some(ext))
}

pub fn check_declared_mime(result: &AnalysisResult, declared_mime: &str, filename: &str) -> MimeCheck {
    let expected = expected_mimes(result.detected_type);
    if expected.is_empty() {
        return MimeCheck::Unchecked;
    }

    let declared_matches = expected.contains(&declared_mime);
    let detected_matches = result
        .detected_mime
        .as_deref()
        .is_some_and(|mime| expected.contains(&mime));
    if declared_matches || detected_matches {
        return MimeCheck::Match;
    }

    if is_ooxml_as_zip(result.detected_type, declared_mime, filename) {
        tracing::warn!(declared = declared_mime, filename, "OOXML declared, ZIP detected");
        return MimeCheck::OoxmlAsZip;
    }

    MimeCheck::Mismatch {
        declared: declared_mime.to_string(),
        detected: result.detected_type,
    }
}
