#![no_main]
use libfuzzer_sys::fuzz_target;
use stegoguard::Analyzer;

fuzz_target!(|data: &[u8]| {
    let result = Analyzer::default().analyze_bytes(data);
    assert!((0.0..=8.0).contains(&result.entropy));
    assert_eq!(result.file_size, data.len());
});
