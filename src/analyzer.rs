//! Verdict aggregation
//!
//! Runs detection, antivirus, validation, scanning, trailing-data and
//! entropy checks over one buffer and folds them into an [`AnalysisResult`].

use std::path::Path;
use std::sync::Arc;

use crate::antivirus::{AntivirusScanner, is_threat, scanner_from_config};
use crate::config::AnalyzerConfig;
use crate::detection::{DetectedType, detect_type};
use crate::entropy::sampled_entropy;
use crate::error::AnalysisError;
use crate::pdf::{ImageStreams, analyze_images};
use crate::scanning::{scan, without_self_match};
use crate::signatures::SignatureTable;
use crate::trailing::check_trailing;
use crate::types::{
    AnalysisResult, Detection, DetectionContext, FileTag, PdfImageRecord, Risk, TrailingData,
    round_entropy,
};
use crate::validation::validate_structure;

pub const SAFE_DETAILS: &str = "File is safe";
pub const READ_ERROR_DETAILS: &str = "Error analyzing file";

/// File analyzer sharing one immutable [`SignatureTable`].
///
/// # Example
///
/// ```
/// use stegoguard::{Analyzer, AnalyzerConfig, FileTag};
///
/// let analyzer = Analyzer::new(AnalyzerConfig::default());
/// let jpeg = [
///     0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0xFF, 0xD9,
/// ];
/// let result = analyzer.analyze_bytes(&jpeg);
/// assert!(result.safe);
/// assert_eq!(result.detected_type, FileTag::Jpeg);
/// ```
pub struct Analyzer {
    table: Arc<SignatureTable>,
    config: AnalyzerConfig,
    antivirus: Box<dyn AntivirusScanner>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_table(Arc::new(SignatureTable::standard()), config)
    }

    pub fn with_table(table: Arc<SignatureTable>, config: AnalyzerConfig) -> Self {
        let antivirus = scanner_from_config(config.antivirus.clone());
        Self {
            table,
            config,
            antivirus,
        }
    }

    pub fn with_antivirus(mut self, scanner: Box<dyn AntivirusScanner>) -> Self {
        self.antivirus = scanner;
        self
    }

    pub fn table(&self) -> &Arc<SignatureTable> {
        &self.table
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze_file(&self, path: &Path) -> AnalysisResult {
        match read_input(path) {
            Ok(data) => self.analyze_bytes(&data),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "unreadable input");
                rejection(&err, FileTag::Unknown, 0)
            }
        }
    }

    pub fn analyze_bytes(&self, data: &[u8]) -> AnalysisResult {
        let size = data.len();
        if size < self.config.min_file_size {
            return rejection(&AnalysisError::TooSmall { size }, FileTag::Unknown, size);
        }

        let detected = detect_type(&self.table, data);

        if let Some(reply) = self.antivirus_threat(data) {
            tracing::warn!(detected = %detected.tag, reply = %reply, "antivirus threat");
            let mut result = AnalysisResult::rejected(
                detected.tag,
                size,
                format!("Antivirus detected a threat: {reply}"),
            );
            result.detected_mime = detected.mime;
            result.antivirus = Some(reply);
            return result;
        }

        match self.inspect(data, &detected) {
            Ok(result) => result,
            Err(err) => {
                tracing::info!(detected = %detected.tag, reason = %err, "file rejected");
                rejection(&err, detected.tag, size)
            }
        }
    }

    fn antivirus_threat(&self, data: &[u8]) -> Option<String> {
        match self.antivirus.scan(data) {
            Ok(Some(reply)) => {
                tracing::debug!(reply = %reply, "antivirus reply");
                is_threat(&reply).then_some(reply)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(error = %err, "antivirus scan skipped");
                None
            }
        }
    }

    fn inspect(
        &self,
        data: &[u8],
        detected: &DetectedType,
    ) -> Result<AnalysisResult, AnalysisError> {
        let tag = detected.tag;
        if detected.is_unknown() {
            return Err(AnalysisError::UnrecognizedType);
        }

        let structure = validate_structure(data, tag);
        if !structure.valid {
            return Err(AnalysisError::StructuralCorruption(
                structure.reason.unwrap_or_default(),
            ));
        }

        let mut hidden_files = without_self_match(
            scan(&self.table, data, self.config.scan_window),
            tag,
        );
        let trailing_data = check_trailing(data, tag, self.config.trailing_threshold);
        let entropy = sampled_entropy(data, self.config.entropy_sample);
        let high_entropy = entropy > self.config.entropy_threshold;

        let critical = hidden_files.iter().any(|d| d.risk == Risk::Critical);
        let high = hidden_files.iter().any(|d| d.risk == Risk::High);

        let pdf_image_analysis = if tag == FileTag::Pdf {
            self.inspect_pdf_images(data, &mut hidden_files)
        } else {
            Vec::new()
        };
        let suspicious_images = pdf_image_analysis.iter().filter(|r| r.suspicious).count();
        let trailing_flagged = trailing_data.as_ref().is_some_and(|t| t.suspicious);

        let suspicious = critical
            || high
            || trailing_flagged
            || (high_entropy && !matches!(tag, FileTag::Zip | FileTag::Rar))
            || suspicious_images > 0;

        let details = if suspicious {
            build_details(
                &hidden_files,
                trailing_data.as_ref(),
                high_entropy,
                suspicious_images,
            )
        } else {
            SAFE_DETAILS.to_string()
        };

        tracing::info!(
            detected = %tag,
            size = data.len(),
            entropy,
            hidden = hidden_files.len(),
            safe = !suspicious,
            "analysis complete"
        );

        Ok(AnalysisResult {
            safe: !suspicious,
            detected_type: tag,
            detected_mime: detected.mime.clone(),
            entropy: round_entropy(entropy),
            hidden_files,
            pdf_image_analysis,
            trailing_data,
            high_entropy,
            file_size: data.len(),
            corrupted: None,
            antivirus: None,
            error: None,
            details,
        })
    }

    /// Analyzes embedded images and promotes detections from suspicious ones.
    fn inspect_pdf_images(
        &self,
        data: &[u8],
        hidden_files: &mut Vec<Detection>,
    ) -> Vec<PdfImageRecord> {
        let images = ImageStreams::new(data, self.config.max_inflated_stream);
        let records = analyze_images(&self.table, images, &self.config);
        for record in records.iter().filter(|r| r.suspicious) {
            hidden_files.extend(
                record
                    .hidden_files
                    .iter()
                    .cloned()
                    .map(|d| d.in_context(DetectionContext::PdfImage)),
            );
        }
        records
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

pub fn read_input(path: &Path) -> Result<Vec<u8>, AnalysisError> {
    std::fs::read(path).map_err(|source| AnalysisError::UnreadableInput {
        path: path.to_path_buf(),
        source,
    })
}

fn rejection(err: &AnalysisError, tag: FileTag, size: usize) -> AnalysisResult {
    match err {
        AnalysisError::UnreadableInput { .. } => {
            let mut result = AnalysisResult::rejected(FileTag::Unknown, size, READ_ERROR_DETAILS);
            result.error = Some(err.to_string());
            result
        }
        AnalysisError::TooSmall { .. } | AnalysisError::UnrecognizedType => {
            AnalysisResult::rejected(FileTag::Unknown, size, err.to_string())
        }
        AnalysisError::StructuralCorruption(_) => {
            let mut result = AnalysisResult::rejected(tag, size, err.to_string());
            result.corrupted = Some(true);
            result
        }
    }
}

fn kinds_with_risk(hidden: &[Detection], risk: Risk) -> Vec<&'static str> {
    hidden
        .iter()
        .filter(|d| d.risk == risk)
        .map(|d| d.kind.name())
        .collect()
}

fn build_details(
    hidden: &[Detection],
    trailing: Option<&TrailingData>,
    high_entropy: bool,
    suspicious_images: usize,
) -> String {
    let mut warnings = Vec::new();

    let critical = kinds_with_risk(hidden, Risk::Critical);
    if !critical.is_empty() {
        warnings.push(format!("EXECUTABLES DETECTED: {}", critical.join(", ")));
    }
    let high = kinds_with_risk(hidden, Risk::High);
    if !high.is_empty() {
        warnings.push(format!("HIDDEN ARCHIVES DETECTED: {}", high.join(", ")));
    }
    if let Some(t) = trailing.filter(|t| t.suspicious) {
        warnings.push(format!("{} ({} bytes)", t.message, t.trailing_bytes));
    }
    if high_entropy {
        warnings.push("Abnormally high entropy (possible hidden encryption)".to_string());
    }
    if suspicious_images > 0 {
        warnings.push(format!("Suspicious embedded PDF images: {suspicious_images}"));
    }

    warnings.join(" | ")
}
