use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

use stegoguard::analyzer::read_input;
use stegoguard::policy::{admit, check_declared_mime, quick_validation};
use stegoguard::types::ENTROPY_THRESHOLD;
use stegoguard::{
    Admission, AnalysisResult, Analyzer, AnalyzerConfig, ClamdConfig, MimeCheck, QuickCheck,
};

#[derive(Parser, Debug)]
#[command(name = "stegoguard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Classify files by content: real type, structure, hidden payloads, entropy", long_about = None)]
pub struct Cli {
    /// Files or directories (regular files directly inside are analyzed)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Entropy above this value marks a file suspicious
    #[arg(long, default_value_t = ENTROPY_THRESHOLD)]
    pub entropy_threshold: f64,

    #[arg(long, env = "CLAMD_HOST")]
    pub clamd_host: Option<String>,

    #[arg(long, env = "CLAMD_PORT")]
    pub clamd_port: Option<String>,

    #[arg(long, default_value_t = 5000)]
    pub clamd_timeout_ms: u64,

    /// MIME type the uploader declared; enables the blocklist and MIME checks
    #[arg(long)]
    pub declared_mime: Option<String>,

    /// Pretty-print JSON reports
    #[arg(long)]
    pub pretty: bool,
}

impl Cli {
    pub fn clamd_config(&self) -> Option<ClamdConfig> {
        ClamdConfig::from_lookup(|key| match key {
            "CLAMD_HOST" => self.clamd_host.clone(),
            "CLAMD_PORT" => self.clamd_port.clone(),
            _ => None,
        })
        .map(|config| config.with_timeout(Duration::from_millis(self.clamd_timeout_ms)))
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig::new()
            .with_entropy_threshold(self.entropy_threshold)
            .with_antivirus(self.clamd_config())
    }
}

/// Expands directories one level deep, keeping input order.
pub fn collect_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries = Vec::new();
            for entry in std::fs::read_dir(input)
                .with_context(|| format!("Failed to list {}", input.display()))?
            {
                let entry = entry.with_context(|| format!("Failed to list {}", input.display()))?;
                if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                    entries.push(entry.path());
                }
            }
            entries.sort();
            files.extend(entries);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file: String,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_check: Option<QuickCheck>,
    pub analysis: AnalysisResult,
    pub admission: Admission,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_check: Option<MimeCheck>,
}

impl FileReport {
    pub fn is_rejected(&self) -> bool {
        !self.admission.is_admitted()
            || self.quick_check.as_ref().is_some_and(|q| !q.safe)
            || self.mime_check.as_ref().is_some_and(MimeCheck::is_mismatch)
    }
}

pub fn report_for(analyzer: &Analyzer, path: &Path, declared_mime: Option<&str>) -> FileReport {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (analysis, sha256, size) = match read_input(path) {
        Ok(data) => {
            let digest = hex::encode(Sha256::digest(&data));
            (analyzer.analyze_bytes(&data), Some(digest), data.len())
        }
        Err(_) => (analyzer.analyze_file(path), None, 0),
    };

    let admission = admit(&analysis);
    let quick_check = declared_mime.map(|mime| quick_validation(mime, &filename));
    let mime_check = declared_mime
        .filter(|_| admission.is_admitted())
        .map(|mime| check_declared_mime(&analysis, mime, &filename));

    FileReport {
        file: path.display().to_string(),
        size,
        sha256,
        quick_check,
        analysis,
        admission,
        mime_check,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn clamd_from_flags() {
        let cli = Cli::try_parse_from([
            "stegoguard",
            "--clamd-host",
            "av.local",
            "--clamd-port",
            "3311",
            "--clamd-timeout-ms",
            "250",
            "a.bin",
        ])
        .unwrap();
        let clamd = cli.clamd_config().unwrap();
        assert_eq!(clamd.address(), "av.local:3311");
        assert_eq!(clamd.timeout, Duration::from_millis(250));
    }

    #[test]
    fn directories_expand_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), b"b").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let loose = dir.path().join("a.txt");
        let files = collect_paths(&[dir.path().to_path_buf(), loose.clone()]).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.txt"), dir.path().join("b.txt"), loose]
        );
    }

    #[test]
    fn report_hashes_and_checks_declared_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        fs::write(&path, b"plain notes pretending to be a picture\n").unwrap();

        let report = report_for(&Analyzer::default(), &path, Some("image/png"));
        assert_eq!(report.size, 39);
        assert_eq!(report.sha256.as_ref().map(String::len), Some(64));
        assert!(report.analysis.safe);
        assert!(report.quick_check.as_ref().is_some_and(|q| q.safe));
        assert!(report.mime_check.as_ref().is_some_and(MimeCheck::is_mismatch));
        assert!(report.is_rejected());
    }

    #[test]
    fn missing_file_is_reported_not_fatal() {
        let report = report_for(&Analyzer::default(), Path::new("/nonexistent/x.jpg"), None);
        assert_eq!(report.size, 0);
        assert!(report.sha256.is_none());
        assert!(report.analysis.error.is_some());
        assert!(report.is_rejected());
    }
}
