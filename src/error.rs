use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Conditions that end the analysis of one file early.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Cannot read {}: {source}", path.display())]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("File too small or empty ({size} bytes)")]
    TooSmall { size: usize },

    #[error("Unrecognized or corrupt file type")]
    UnrecognizedType,

    #[error("CORRUPTED FILE: {0}")]
    StructuralCorruption(String),
}

/// Failures talking to an external antivirus daemon. Never fatal.
#[derive(Error, Debug)]
pub enum AntivirusError {
    #[error("Cannot connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("Cannot resolve antivirus address {0}")]
    Resolve(String),

    #[error("Antivirus scan timed out")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Antivirus protocol error: {0}")]
    Protocol(String),
}

impl AntivirusError {
    /// Maps socket timeouts onto [`AntivirusError::Timeout`].
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => AntivirusError::Timeout,
            _ => AntivirusError::Io(err),
        }
    }
}
