use serde::Serialize;
use std::fmt;

use crate::signatures::SignatureKind;

pub const MIN_FILE_SIZE: usize = 12;
pub const SCAN_WINDOW: usize = 10 * 1024 * 1024;
pub const ENTROPY_SAMPLE: usize = 100_000;
pub const ENTROPY_THRESHOLD: f64 = 8.0;
pub const TRAILING_THRESHOLD: usize = 1024;
pub const MAX_INFLATED_STREAM: usize = 64 * 1024 * 1024;
pub const TEXT_SAMPLE: usize = 4096;
pub const TEXT_PRINTABLE_RATIO: f64 = 0.95;

/// Content-detected file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileTag {
    #[serde(rename = "JPEG")]
    Jpeg,
    #[serde(rename = "PNG")]
    Png,
    #[serde(rename = "GIF")]
    Gif,
    #[serde(rename = "BMP")]
    Bmp,
    #[serde(rename = "WEBP")]
    Webp,
    #[serde(rename = "AVI")]
    Avi,
    #[serde(rename = "WAV")]
    Wav,
    #[serde(rename = "MP4")]
    Mp4,
    #[serde(rename = "MKV")]
    Mkv,
    #[serde(rename = "WEBM")]
    Webm,
    #[serde(rename = "MP3")]
    Mp3,
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "ZIP")]
    Zip,
    #[serde(rename = "RAR")]
    Rar,
    #[serde(rename = "7Z")]
    SevenZip,
    #[serde(rename = "EXE")]
    Exe,
    #[serde(rename = "ELF")]
    Elf,
    #[serde(rename = "DOCX")]
    Docx,
    #[serde(rename = "PPTX")]
    Pptx,
    #[serde(rename = "XLSX")]
    Xlsx,
    #[serde(rename = "ODT")]
    Odt,
    #[serde(rename = "TXT")]
    Txt,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl FileTag {
    pub const fn name(&self) -> &'static str {
        match self {
            FileTag::Jpeg => "JPEG",
            FileTag::Png => "PNG",
            FileTag::Gif => "GIF",
            FileTag::Bmp => "BMP",
            FileTag::Webp => "WEBP",
            FileTag::Avi => "AVI",
            FileTag::Wav => "WAV",
            FileTag::Mp4 => "MP4",
            FileTag::Mkv => "MKV",
            FileTag::Webm => "WEBM",
            FileTag::Mp3 => "MP3",
            FileTag::Pdf => "PDF",
            FileTag::Zip => "ZIP",
            FileTag::Rar => "RAR",
            FileTag::SevenZip => "7Z",
            FileTag::Exe => "EXE",
            FileTag::Elf => "ELF",
            FileTag::Docx => "DOCX",
            FileTag::Pptx => "PPTX",
            FileTag::Xlsx => "XLSX",
            FileTag::Odt => "ODT",
            FileTag::Txt => "TXT",
            FileTag::Unknown => "UNKNOWN",
        }
    }

    pub const fn is_image(&self) -> bool {
        matches!(
            self,
            FileTag::Jpeg | FileTag::Png | FileTag::Gif | FileTag::Bmp | FileTag::Webp
        )
    }

    /// The scanner kind that is this type's own header, if any.
    pub const fn own_signature(&self) -> Option<SignatureKind> {
        match self {
            FileTag::Zip => Some(SignatureKind::Zip),
            FileTag::Rar => Some(SignatureKind::Rar),
            FileTag::SevenZip => Some(SignatureKind::SevenZip),
            FileTag::Exe => Some(SignatureKind::Exe),
            FileTag::Elf => Some(SignatureKind::Elf),
            FileTag::Pdf => Some(SignatureKind::Pdf),
            _ => None,
        }
    }
}

impl fmt::Display for FileTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Risk {
    Critical,
    High,
    Medium,
}

impl Risk {
    pub const fn is_blocking(&self) -> bool {
        matches!(self, Risk::Critical | Risk::High)
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Risk::Critical => write!(f, "CRITICAL"),
            Risk::High => write!(f, "HIGH"),
            Risk::Medium => write!(f, "MEDIUM"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DetectionContext {
    #[serde(rename = "PDF_IMAGE")]
    PdfImage,
}

/// One dangerous signature found while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    #[serde(rename = "type")]
    pub kind: SignatureKind,
    pub offset: usize,
    pub risk: Risk,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<DetectionContext>,
}

impl Detection {
    pub fn new(kind: SignatureKind, offset: usize, risk: Risk) -> Self {
        Self {
            kind,
            offset,
            risk,
            context: None,
        }
    }

    pub fn in_context(mut self, context: DetectionContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Offset-0 match of the file's own header.
    pub fn is_self_match(&self, detected: FileTag) -> bool {
        self.offset == 0 && detected.own_signature() == Some(self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StructureResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailingData {
    pub suspicious: bool,
    pub trailing_bytes: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfImageRecord {
    pub filter: Option<String>,
    #[serde(rename = "type")]
    pub file_type: FileTag,
    pub entropy: f64,
    pub hidden_files: Vec<Detection>,
    pub suspicious: bool,
    pub obj_index: usize,
}

/// Verdict for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub safe: bool,
    pub detected_type: FileTag,
    pub detected_mime: Option<String>,
    pub entropy: f64,
    pub hidden_files: Vec<Detection>,
    pub pdf_image_analysis: Vec<PdfImageRecord>,
    pub trailing_data: Option<TrailingData>,
    pub high_entropy: bool,
    pub file_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrupted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub antivirus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub details: String,
}

impl AnalysisResult {
    /// Early unsafe verdict carrying no scan evidence.
    pub fn rejected(detected_type: FileTag, file_size: usize, details: impl Into<String>) -> Self {
        Self {
            safe: false,
            detected_type,
            detected_mime: None,
            entropy: 0.0,
            hidden_files: Vec::new(),
            pdf_image_analysis: Vec::new(),
            trailing_data: None,
            high_entropy: false,
            file_size,
            corrupted: None,
            antivirus: None,
            error: None,
            details: details.into(),
        }
    }

    pub fn is_corrupted(&self) -> bool {
        self.corrupted.unwrap_or(false)
    }

    pub fn has_critical(&self) -> bool {
        self.hidden_files.iter().any(|d| d.risk == Risk::Critical)
    }
}

/// Two-decimal rounding used for every reported entropy value.
pub fn round_entropy(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
