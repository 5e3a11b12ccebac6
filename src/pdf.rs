//! Embedded image extraction for PDF containers
//!
//! Works directly on the raw bytes: every `/Subtype /Image` dictionary is
//! paired with the next `stream` ... `endstream` body, which is inflated
//! when declared `FlateDecode` and otherwise taken verbatim.

use flate2::read::{DeflateDecoder, ZlibDecoder};
use memchr::memmem;
use std::io::{self, Read};

use crate::config::AnalyzerConfig;
use crate::detection::detect_type;
use crate::entropy::sampled_entropy;
use crate::scanning::scan;
use crate::signatures::SignatureTable;
use crate::types::{PdfImageRecord, round_entropy};

const SUBTYPE: &[u8] = b"/Subtype";
const IMAGE: &[u8] = b"/Image";
const FILTER: &[u8] = b"/Filter";
const STREAM: &[u8] = b"stream";
const ENDSTREAM: &[u8] = b"endstream";

/// `/Image` must follow `/Subtype` inside this many bytes.
const SUBTYPE_WINDOW: usize = 40;
const INFLATE_CHUNK: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStream {
    pub data: Vec<u8>,
    pub filter: Option<String>,
    /// Byte offset of the `/Subtype` token that introduced the image
    pub obj_index: usize,
}

#[inline]
fn is_pdf_space(b: u8) -> bool {
    matches!(b, 0x09..=0x0D | 0x20 | 0xA0)
}

#[inline]
fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)
        .and_then(|tail| memmem::find(tail, needle))
        .map(|pos| pos + from)
}

fn skip_space(data: &[u8], mut pos: usize) -> usize {
    while data.get(pos).copied().is_some_and(is_pdf_space) {
        pos += 1;
    }
    pos
}

fn name_at(data: &[u8], pos: usize) -> Option<&[u8]> {
    let tail = data.get(pos..)?;
    let len = tail
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    (len > 0).then(|| &tail[..len])
}

fn declares_image(window: &[u8]) -> bool {
    memmem::find_iter(window, SUBTYPE).any(|pos| {
        let value = skip_space(window, pos + SUBTYPE.len());
        window
            .get(value..)
            .is_some_and(|tail| tail.starts_with(IMAGE))
    })
}

/// First name in a `/Filter /Name` or `/Filter [ /Name ... ]` entry.
pub fn parse_filter(header: &[u8]) -> Option<String> {
    let occurrences: Vec<usize> = memmem::find_iter(header, FILTER).collect();

    for &pos in &occurrences {
        let value = skip_space(header, pos + FILTER.len());
        if header.get(value) == Some(&b'/') {
            if let Some(name) = name_at(header, value + 1) {
                return Some(String::from_utf8_lossy(name).into_owned());
            }
        }
    }

    let array = occurrences.iter().find_map(|&pos| {
        let open = skip_space(header, pos + FILTER.len());
        if header.get(open) != Some(&b'[') {
            return None;
        }
        let inner = header.get(open + 1..)?;
        let close = memchr::memchr(b']', inner)?;
        (close > 0).then(|| &inner[..close])
    })?;

    memchr::memchr_iter(b'/', array)
        .find_map(|slash| name_at(array, slash + 1))
        .map(|name| String::from_utf8_lossy(name).into_owned())
}

fn read_bounded<R: Read>(mut reader: R, limit: usize) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut buf = [0u8; INFLATE_CHUNK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        if out.len() + n > limit {
            let remaining = limit.saturating_sub(out.len());
            out.extend_from_slice(&buf[..remaining]);
            tracing::debug!(limit, "inflated stream truncated at cap");
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    Ok(out)
}

/// zlib, then raw deflate, then the bytes as they are.
pub fn inflate_best_effort(raw: &[u8], limit: usize) -> Vec<u8> {
    match read_bounded(ZlibDecoder::new(raw), limit) {
        Ok(out) => out,
        Err(zlib_err) => match read_bounded(DeflateDecoder::new(raw), limit) {
            Ok(out) => out,
            Err(raw_err) => {
                tracing::debug!(%zlib_err, %raw_err, "FlateDecode failed, keeping raw stream");
                raw.to_vec()
            }
        },
    }
}

/// Lazy walk over the image streams of a PDF, in file order.
///
/// Each stream is inflated only when it is yielded, so at most one inflated
/// body is alive per consumer step.
pub struct ImageStreams<'a> {
    data: &'a [u8],
    max_inflated: usize,
    idx: usize,
}

impl<'a> ImageStreams<'a> {
    pub fn new(data: &'a [u8], max_inflated: usize) -> Self {
        Self {
            data,
            max_inflated,
            idx: 0,
        }
    }
}

impl Iterator for ImageStreams<'_> {
    type Item = ImageStream;

    fn next(&mut self) -> Option<ImageStream> {
        let data = self.data;

        while let Some(pos) = find_from(data, SUBTYPE, self.idx) {
            self.idx = pos + SUBTYPE.len();

            let window = &data[pos..(pos + SUBTYPE_WINDOW).min(data.len())];
            if !declares_image(window) {
                continue;
            }
            let Some(stream_pos) = find_from(data, STREAM, pos) else {
                continue;
            };
            let Some(end_pos) = find_from(data, ENDSTREAM, stream_pos) else {
                continue;
            };

            let filter = parse_filter(&data[pos..stream_pos]);

            let mut start = stream_pos + STREAM.len();
            if data.get(start) == Some(&b'\r') {
                start += 1;
            }
            if data.get(start) == Some(&b'\n') {
                start += 1;
            }
            if end_pos <= start {
                continue;
            }

            let raw = &data[start..end_pos];
            let bytes = match filter.as_deref() {
                Some("FlateDecode") => inflate_best_effort(raw, self.max_inflated),
                _ => raw.to_vec(),
            };

            tracing::debug!(
                offset = pos,
                filter = ?filter,
                len = bytes.len(),
                "embedded PDF image"
            );
            self.idx = end_pos + ENDSTREAM.len();
            return Some(ImageStream {
                data: bytes,
                filter,
                obj_index: pos,
            });
        }

        self.idx = data.len();
        None
    }
}

/// Every image stream declared in `data`, in file order.
pub fn extract_images(data: &[u8], max_inflated: usize) -> Vec<ImageStream> {
    ImageStreams::new(data, max_inflated).collect()
}

/// Runs detection, scanning and entropy over each extracted image.
///
/// Images are consumed one at a time and dropped once analyzed.
pub fn analyze_images<I>(
    table: &SignatureTable,
    images: I,
    config: &AnalyzerConfig,
) -> Vec<PdfImageRecord>
where
    I: IntoIterator<Item = ImageStream>,
{
    images
        .into_iter()
        .map(|image| {
            let file_type = detect_type(table, &image.data).tag;
            let entropy = sampled_entropy(&image.data, config.entropy_sample);
            let hidden_files = scan(table, &image.data, config.scan_window);
            let suspicious = hidden_files.iter().any(|d| d.risk.is_blocking())
                || entropy > config.entropy_threshold;
            PdfImageRecord {
                filter: image.filter,
                file_type,
                entropy: round_entropy(entropy),
                hidden_files,
                suspicious,
                obj_index: image.obj_index,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::{DeflateEncoder, ZlibEncoder};
    use std::io::Write;

    fn pdf_with_image(dict: &str, body: &[u8]) -> Vec<u8> {
        let mut pdf = b"%PDF-1.4\n1 0 obj\n".to_vec();
        pdf.extend_from_slice(dict.as_bytes());
        pdf.extend_from_slice(b"\nstream\r\n");
        pdf.extend_from_slice(body);
        pdf.extend_from_slice(b"\nendstream\nendobj\n%%EOF\n");
        pdf
    }

    #[test]
    fn filter_name_and_array() {
        assert_eq!(
            parse_filter(b"/Subtype /Image /Filter /DCTDecode ").as_deref(),
            Some("DCTDecode")
        );
        assert_eq!(
            parse_filter(b"/Filter [ /FlateDecode /DCTDecode ] ").as_deref(),
            Some("FlateDecode")
        );
        assert_eq!(parse_filter(b"/Filter []"), None);
        assert_eq!(parse_filter(b"/Width 4 /Height 4"), None);
    }

    #[test]
    fn subtype_must_be_image() {
        assert!(declares_image(b"/Subtype /Image /Width 4"));
        assert!(declares_image(b"/Subtype\n\t/Image"));
        assert!(!declares_image(b"/Subtype /Form /BBox"));
    }

    #[test]
    fn image_outside_window_is_ignored() {
        let dict = format!("<< /Subtype{}/Image >>", " ".repeat(40));
        let pdf = pdf_with_image(&dict, b"payload");
        assert!(extract_images(&pdf, 1 << 20).is_empty());
    }

    #[test]
    fn extracts_raw_body_after_crlf() {
        let pdf = pdf_with_image("<< /Subtype /Image /Filter /DCTDecode >>", b"\xFF\xD8\xFFbody");
        let images = extract_images(&pdf, 1 << 20);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].filter.as_deref(), Some("DCTDecode"));
        assert_eq!(images[0].data, b"\xFF\xD8\xFFbody\n");
        assert_eq!(&pdf[images[0].obj_index..images[0].obj_index + 8], b"/Subtype");
    }

    #[test]
    fn flate_zlib_and_raw_deflate() {
        let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
        zlib.write_all(b"zlib image bytes").unwrap();
        let zlib = zlib.finish().unwrap();

        let mut raw = DeflateEncoder::new(Vec::new(), Compression::default());
        raw.write_all(b"raw image bytes").unwrap();
        let raw = raw.finish().unwrap();

        assert_eq!(inflate_best_effort(&zlib, 1 << 20), b"zlib image bytes");
        assert_eq!(inflate_best_effort(&raw, 1 << 20), b"raw image bytes");
    }

    #[test]
    fn inflate_caps_output() {
        let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
        zlib.write_all(&[0u8; 100_000]).unwrap();
        let zlib = zlib.finish().unwrap();
        assert_eq!(inflate_best_effort(&zlib, 1000).len(), 1000);
    }

    #[test]
    fn streams_are_yielded_one_at_a_time() {
        let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
        zlib.write_all(&[0u8; 200_000]).unwrap();
        let bomb = zlib.finish().unwrap();

        let mut pdf = b"%PDF-1.4\n".to_vec();
        for _ in 0..8 {
            pdf.extend_from_slice(b"<< /Subtype /Image /Filter /FlateDecode >>\nstream\n");
            pdf.extend_from_slice(&bomb);
            pdf.extend_from_slice(b"\nendstream\n");
        }

        let mut streams = ImageStreams::new(&pdf, 4096);
        let first = streams.next().unwrap();
        assert_eq!(first.data.len(), 4096);
        assert_eq!(streams.count(), 7);

        let config = AnalyzerConfig::default();
        let table = SignatureTable::standard();
        let records = analyze_images(&table, ImageStreams::new(&pdf, 4096), &config);
        assert_eq!(records.len(), 8);
        assert!(records.windows(2).all(|w| w[0].obj_index < w[1].obj_index));
    }

    #[test]
    fn missing_endstream_stops_cleanly() {
        let pdf = b"%PDF-1.4\n<< /Subtype /Image >>\nstream\nno end".to_vec();
        assert!(extract_images(&pdf, 1 << 20).is_empty());
    }
}
