use std::time::Duration;

use crate::types::{
    ENTROPY_SAMPLE, ENTROPY_THRESHOLD, MAX_INFLATED_STREAM, MIN_FILE_SIZE, SCAN_WINDOW,
    TRAILING_THRESHOLD,
};

pub const CLAMD_DEFAULT_PORT: u16 = 3310;
pub const CLAMD_DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunable heuristics for one [`Analyzer`](crate::analyzer::Analyzer).
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub min_file_size: usize,
    pub scan_window: usize,
    pub entropy_sample: usize,
    pub entropy_threshold: f64,
    pub trailing_threshold: usize,
    pub max_inflated_stream: usize,
    pub antivirus: Option<ClamdConfig>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_file_size: MIN_FILE_SIZE,
            scan_window: SCAN_WINDOW,
            entropy_sample: ENTROPY_SAMPLE,
            entropy_threshold: ENTROPY_THRESHOLD,
            trailing_threshold: TRAILING_THRESHOLD,
            max_inflated_stream: MAX_INFLATED_STREAM,
            antivirus: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entropy_threshold(mut self, threshold: f64) -> Self {
        self.entropy_threshold = threshold;
        self
    }

    pub fn with_entropy_sample(mut self, bytes: usize) -> Self {
        self.entropy_sample = bytes;
        self
    }

    pub fn with_scan_window(mut self, bytes: usize) -> Self {
        self.scan_window = bytes;
        self
    }

    pub fn with_trailing_threshold(mut self, bytes: usize) -> Self {
        self.trailing_threshold = bytes;
        self
    }

    pub fn with_max_inflated_stream(mut self, bytes: usize) -> Self {
        self.max_inflated_stream = bytes;
        self
    }

    pub fn with_antivirus(mut self, clamd: Option<ClamdConfig>) -> Self {
        self.antivirus = clamd;
        self
    }
}

/// Where to reach a clamd daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClamdConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl ClamdConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: CLAMD_DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `CLAMD_HOST` and `CLAMD_PORT`; both must be present.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("CLAMD_HOST").filter(|h| !h.trim().is_empty())?;
        let port = lookup("CLAMD_PORT")?;
        Some(Self::new(host.trim(), parse_port(&port)))
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(raw: &str) -> u16 {
    raw.trim().parse().unwrap_or(CLAMD_DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.min_file_size, 12);
        assert_eq!(config.scan_window, 10 * 1024 * 1024);
        assert_eq!(config.entropy_sample, 100_000);
        assert_eq!(config.entropy_threshold, 8.0);
        assert_eq!(config.trailing_threshold, 1024);
        assert!(config.antivirus.is_none());
    }

    #[test]
    fn builder_overrides() {
        let config = AnalyzerConfig::new()
            .with_entropy_threshold(7.5)
            .with_scan_window(64);
        assert_eq!(config.entropy_threshold, 7.5);
        assert_eq!(config.scan_window, 64);
    }

    #[test]
    fn clamd_requires_host_and_port() {
        assert!(ClamdConfig::from_lookup(lookup(&[("CLAMD_HOST", "av")])).is_none());
        assert!(ClamdConfig::from_lookup(lookup(&[("CLAMD_PORT", "3310")])).is_none());

        let config =
            ClamdConfig::from_lookup(lookup(&[("CLAMD_HOST", "av"), ("CLAMD_PORT", "9999")]))
                .unwrap();
        assert_eq!(config.address(), "av:9999");
        assert_eq!(config.timeout, CLAMD_DEFAULT_TIMEOUT);
    }

    #[test]
    fn bad_port_falls_back_to_default() {
        let config =
            ClamdConfig::from_lookup(lookup(&[("CLAMD_HOST", "av"), ("CLAMD_PORT", "nope")]))
                .unwrap();
        assert_eq!(config.port, CLAMD_DEFAULT_PORT);
    }
}
