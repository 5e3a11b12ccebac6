//! Optional antivirus collaborator
//!
//! The analyzer only ever sees the [`AntivirusScanner`] trait. Failures are
//! reported as [`AntivirusError`] and the caller carries on without them.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use crate::config::ClamdConfig;
use crate::error::AntivirusError;

const INSTREAM_COMMAND: &[u8] = b"zINSTREAM\0";
const INSTREAM_CHUNK: usize = 64 * 1024;

pub trait AntivirusScanner: Send + Sync {
    /// Scans `data`. `Ok(None)` means the scan was skipped.
    fn scan(&self, data: &[u8]) -> Result<Option<String>, AntivirusError>;
}

/// True when a scanner reply reports a detection.
pub fn is_threat(reply: &str) -> bool {
    reply.to_ascii_uppercase().contains("FOUND")
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScanner;

impl AntivirusScanner for NoopScanner {
    fn scan(&self, _data: &[u8]) -> Result<Option<String>, AntivirusError> {
        Ok(None)
    }
}

/// clamd client speaking `zINSTREAM` over TCP.
#[derive(Debug, Clone)]
pub struct ClamdScanner {
    config: ClamdConfig,
}

impl ClamdScanner {
    pub fn new(config: ClamdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClamdConfig {
        &self.config
    }

    fn connect(&self) -> Result<TcpStream, AntivirusError> {
        let address = self.config.address();
        let addrs: Vec<SocketAddr> = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|_| AntivirusError::Resolve(address.clone()))?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.config.timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.config.timeout))?;
                    stream.set_write_timeout(Some(self.config.timeout))?;
                    return Ok(stream);
                }
                Err(err) => last_err = Some(err),
            }
        }

        match last_err {
            Some(source) => Err(AntivirusError::Connect { address, source }),
            None => Err(AntivirusError::Resolve(address)),
        }
    }
}

impl AntivirusScanner for ClamdScanner {
    fn scan(&self, data: &[u8]) -> Result<Option<String>, AntivirusError> {
        let mut stream = self.connect()?;

        stream
            .write_all(INSTREAM_COMMAND)
            .map_err(AntivirusError::from_io)?;
        for chunk in data.chunks(INSTREAM_CHUNK) {
            let len = u32::try_from(chunk.len())
                .map_err(|_| AntivirusError::Protocol("chunk too large".to_string()))?;
            stream
                .write_all(&len.to_be_bytes())
                .map_err(AntivirusError::from_io)?;
            stream.write_all(chunk).map_err(AntivirusError::from_io)?;
        }
        stream
            .write_all(&0u32.to_be_bytes())
            .map_err(AntivirusError::from_io)?;
        stream.flush().map_err(AntivirusError::from_io)?;

        let mut reply = Vec::new();
        BufReader::new(stream)
            .read_until(0, &mut reply)
            .map_err(AntivirusError::from_io)?;
        if reply.last() == Some(&0) {
            reply.pop();
        }

        let reply = String::from_utf8_lossy(&reply).trim().to_string();
        if reply.is_empty() {
            return Err(AntivirusError::Protocol("empty reply".to_string()));
        }
        Ok(Some(reply))
    }
}

/// Scanner for an optional clamd configuration.
pub fn scanner_from_config(config: Option<ClamdConfig>) -> Box<dyn AntivirusScanner> {
    match config {
        Some(clamd) => Box::new(ClamdScanner::new(clamd)),
        None => Box::new(NoopScanner),
    }
}
