//! Magic-number table
//!
//! One immutable table of file signatures, built once and shared by
//! reference across every analysis. The dangerous subset is compiled into an
//! Aho-Corasick automaton so the hidden-payload scan stays linear in the
//! scanned window.

use aho_corasick::AhoCorasick;
use serde::Serialize;
use std::fmt;

use crate::types::Risk;

/// Kinds of magic numbers the table knows about.
///
/// Variant order is the tie-break order for detections found at the same
/// offset, so keep the dangerous kinds in scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SignatureKind {
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
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "RIFF")]
    Riff,
    #[serde(rename = "MP4_FTYP")]
    Mp4Ftyp,
    #[serde(rename = "EBML")]
    Ebml,
    #[serde(rename = "JPEG")]
    Jpeg,
    #[serde(rename = "PNG")]
    Png,
    #[serde(rename = "GIF")]
    Gif,
    #[serde(rename = "BMP")]
    Bmp,
}

impl SignatureKind {
    pub const fn name(&self) -> &'static str {
        match self {
            SignatureKind::Zip => "ZIP",
            SignatureKind::Rar => "RAR",
            SignatureKind::SevenZip => "7Z",
            SignatureKind::Exe => "EXE",
            SignatureKind::Elf => "ELF",
            SignatureKind::Pdf => "PDF",
            SignatureKind::Riff => "RIFF",
            SignatureKind::Mp4Ftyp => "MP4_FTYP",
            SignatureKind::Ebml => "EBML",
            SignatureKind::Jpeg => "JPEG",
            SignatureKind::Png => "PNG",
            SignatureKind::Gif => "GIF",
            SignatureKind::Bmp => "BMP",
        }
    }

    /// Executable payloads, suppressed inside image files.
    pub const fn is_executable(&self) -> bool {
        matches!(self, SignatureKind::Exe | SignatureKind::Elf)
    }
}

impl fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A magic number and where it is accepted as a file header.
#[derive(Debug, Clone)]
pub struct Signature {
    kind: SignatureKind,
    magic: &'static [u8],
    /// Header may start at any offset below this bound (1 = offset 0 only)
    header_window: usize,
    risk: Option<Risk>,
}

impl Signature {
    pub const fn new(kind: SignatureKind, magic: &'static [u8]) -> Self {
        Self {
            kind,
            magic,
            header_window: 1,
            risk: None,
        }
    }

    pub const fn with_header_window(self, window: usize) -> Self {
        Self {
            header_window: window,
            ..self
        }
    }

    pub const fn dangerous(self, risk: Risk) -> Self {
        Self {
            risk: Some(risk),
            ..self
        }
    }

    pub fn kind(&self) -> SignatureKind {
        self.kind
    }

    pub fn magic(&self) -> &'static [u8] {
        self.magic
    }

    pub fn header_window(&self) -> usize {
        self.header_window
    }

    pub fn risk(&self) -> Option<Risk> {
        self.risk
    }

    #[inline]
    pub fn matches_at(&self, data: &[u8], offset: usize) -> bool {
        data.get(offset..)
            .is_some_and(|tail| tail.starts_with(self.magic))
    }

    /// True when the magic sits anywhere inside the header window.
    pub fn matches_header(&self, data: &[u8]) -> bool {
        let window = self.header_window.min(data.len());
        (0..window).any(|offset| self.matches_at(data, offset))
    }
}

const STANDARD_SIGNATURES: [Signature; 13] = [
    Signature::new(SignatureKind::Zip, &[0x50, 0x4B, 0x03, 0x04]).dangerous(Risk::High),
    Signature::new(SignatureKind::Rar, &[0x52, 0x61, 0x72, 0x21]).dangerous(Risk::High),
    Signature::new(SignatureKind::SevenZip, &[0x37, 0x7A, 0xBC, 0xAF]).dangerous(Risk::High),
    Signature::new(SignatureKind::Exe, &[0x4D, 0x5A]).dangerous(Risk::Critical),
    Signature::new(SignatureKind::Elf, &[0x7F, 0x45, 0x4C, 0x46]).dangerous(Risk::Critical),
    Signature::new(SignatureKind::Pdf, &[0x25, 0x50, 0x44, 0x46]).dangerous(Risk::Medium),
    Signature::new(SignatureKind::Riff, &[0x52, 0x49, 0x46, 0x46]).dangerous(Risk::Medium),
    // 'ftyp' box, normally at offset 4
    Signature::new(SignatureKind::Mp4Ftyp, &[0x66, 0x74, 0x79, 0x70])
        .with_header_window(16)
        .dangerous(Risk::Medium),
    Signature::new(SignatureKind::Ebml, &[0x1A, 0x45, 0xDF, 0xA3]).dangerous(Risk::Medium),
    Signature::new(SignatureKind::Jpeg, &[0xFF, 0xD8, 0xFF]),
    Signature::new(SignatureKind::Png, &[0x89, 0x50, 0x4E, 0x47]),
    Signature::new(SignatureKind::Gif, &[0x47, 0x49, 0x46, 0x38]),
    Signature::new(SignatureKind::Bmp, &[0x42, 0x4D]),
];

/// Kinds whose header marks the buffer as an image for the executable
/// false-positive rule. RIFF stands in for WEBP.
const IMAGE_HEADER_KINDS: [SignatureKind; 5] = [
    SignatureKind::Jpeg,
    SignatureKind::Png,
    SignatureKind::Gif,
    SignatureKind::Bmp,
    SignatureKind::Riff,
];

/// Immutable, process-wide signature table.
///
/// # Example
///
/// ```
/// use stegoguard::signatures::{SignatureKind, SignatureTable};
///
/// let table = SignatureTable::standard();
/// let hits = table.find_dangerous(b"..PK\x03\x04..", 16);
/// assert_eq!(hits, vec![(2, SignatureKind::Zip)]);
/// ```
#[derive(Debug)]
pub struct SignatureTable {
    signatures: Vec<Signature>,
    /// Aho-Corasick automaton over the dangerous magics
    pattern_matcher: Option<AhoCorasick>,
    /// Maps pattern index to signature index
    pattern_map: Vec<usize>,
    longest_dangerous: usize,
}

impl SignatureTable {
    pub fn standard() -> Self {
        Self::from_signatures(STANDARD_SIGNATURES.to_vec())
    }

    pub fn from_signatures(signatures: Vec<Signature>) -> Self {
        let mut table = Self {
            signatures,
            pattern_matcher: None,
            pattern_map: Vec::new(),
            longest_dangerous: 0,
        };
        table.build_pattern_matcher();
        table
    }

    fn build_pattern_matcher(&mut self) {
        let mut patterns: Vec<&[u8]> = Vec::new();
        let mut pattern_map = Vec::new();

        for (idx, sig) in self.signatures.iter().enumerate() {
            if sig.risk.is_some() {
                patterns.push(sig.magic);
                pattern_map.push(idx);
            }
        }

        self.longest_dangerous = patterns.iter().map(|p| p.len()).max().unwrap_or(0);
        if !patterns.is_empty() {
            self.pattern_matcher = AhoCorasick::new(&patterns).ok();
        }
        self.pattern_map = pattern_map;
    }

    pub fn get(&self, kind: SignatureKind) -> Option<&Signature> {
        self.signatures.iter().find(|sig| sig.kind == kind)
    }

    /// True when `data` carries the header of `kind` inside its header window.
    pub fn matches_header(&self, kind: SignatureKind, data: &[u8]) -> bool {
        self.get(kind).is_some_and(|sig| sig.matches_header(data))
    }

    pub fn risk_of(&self, kind: SignatureKind) -> Option<Risk> {
        self.get(kind).and_then(|sig| sig.risk)
    }

    pub fn has_image_header(&self, data: &[u8]) -> bool {
        IMAGE_HEADER_KINDS
            .iter()
            .any(|&kind| self.get(kind).is_some_and(|sig| sig.matches_at(data, 0)))
    }

    pub fn dangerous(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.iter().filter(|sig| sig.risk.is_some())
    }

    /// Every dangerous magic starting below `window`, sorted by offset then
    /// by kind.
    pub fn find_dangerous(&self, data: &[u8], window: usize) -> Vec<(usize, SignatureKind)> {
        let window = window.min(data.len());
        let mut hits = match &self.pattern_matcher {
            Some(matcher) => {
                let end = (window + self.longest_dangerous.saturating_sub(1)).min(data.len());
                matcher
                    .find_overlapping_iter(&data[..end])
                    .filter(|mat| mat.start() < window)
                    .map(|mat| {
                        let sig = &self.signatures[self.pattern_map[mat.pattern().as_usize()]];
                        (mat.start(), sig.kind)
                    })
                    .collect::<Vec<_>>()
            }
            None => self.find_dangerous_linear(data, window),
        };
        hits.sort_unstable();
        hits
    }

    fn find_dangerous_linear(&self, data: &[u8], window: usize) -> Vec<(usize, SignatureKind)> {
        let mut hits = Vec::new();
        for offset in 0..window {
            for sig in self.dangerous() {
                if sig.matches_at(data, offset) {
                    hits.push((offset, sig.kind));
                }
            }
        }
        hits
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl Default for SignatureTable {
    fn default() -> Self {
        Self::standard()
    }
}
