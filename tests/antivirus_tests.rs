use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use stegoguard::antivirus::{AntivirusScanner, ClamdScanner};
use stegoguard::{Analyzer, AnalyzerConfig, AntivirusError, ClamdConfig, FileTag};

const JPEG_MINIMAL: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0xFF, 0xD9,
];

/// Reads one zINSTREAM request and returns the streamed payload.
fn read_instream(stream: &mut TcpStream) -> Vec<u8> {
    let mut command = [0u8; 10];
    stream.read_exact(&mut command).unwrap();
    assert_eq!(&command, b"zINSTREAM\0");

    let mut payload = Vec::new();
    loop {
        let mut len = [0u8; 4];
        stream.read_exact(&mut len).unwrap();
        let len = u32::from_be_bytes(len) as usize;
        if len == 0 {
            break;
        }
        let mut chunk = vec![0u8; len];
        stream.read_exact(&mut chunk).unwrap();
        payload.extend_from_slice(&chunk);
    }
    payload
}

fn mock_clamd(reply: &'static [u8]) -> (u16, thread::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let payload = read_instream(&mut stream);
        stream.write_all(reply).unwrap();
        payload
    });
    (port, handle)
}

fn config(port: u16) -> ClamdConfig {
    ClamdConfig::new("127.0.0.1", port).with_timeout(Duration::from_secs(2))
}

#[test]
fn test_clamd_streams_payload_in_chunks() {
    let (port, handle) = mock_clamd(b"stream: OK\0");
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

    let reply = ClamdScanner::new(config(port)).scan(&data).unwrap();
    assert_eq!(reply.as_deref(), Some("stream: OK"));
    assert_eq!(handle.join().unwrap(), data);
}

#[test]
fn test_clamd_threat_rejects_file() {
    let (port, handle) = mock_clamd(b"stream: Eicar-Test-Signature FOUND\0");
    let analyzer = Analyzer::new(AnalyzerConfig::default().with_antivirus(Some(config(port))));

    let result = analyzer.analyze_bytes(JPEG_MINIMAL);
    handle.join().unwrap();
    assert!(!result.safe);
    assert_eq!(result.detected_type, FileTag::Jpeg);
    assert_eq!(
        result.antivirus.as_deref(),
        Some("stream: Eicar-Test-Signature FOUND")
    );
}

#[test]
fn test_closed_port_is_a_connect_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let err = ClamdScanner::new(config(port)).scan(b"data").unwrap_err();
    assert!(matches!(err, AntivirusError::Connect { .. }));

    let analyzer = Analyzer::new(AnalyzerConfig::default().with_antivirus(Some(config(port))));
    assert!(analyzer.analyze_bytes(JPEG_MINIMAL).safe);
}

#[test]
fn test_silent_daemon_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _ = read_instream(&mut stream);
        thread::sleep(Duration::from_millis(800));
    });

    let scanner = ClamdScanner::new(
        ClamdConfig::new("127.0.0.1", port).with_timeout(Duration::from_millis(200)),
    );
    let err = scanner.scan(JPEG_MINIMAL).unwrap_err();
    assert!(matches!(err, AntivirusError::Timeout));
    handle.join().unwrap();
}
