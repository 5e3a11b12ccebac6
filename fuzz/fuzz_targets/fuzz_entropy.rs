#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let h = stegoguard::entropy::calculate_entropy(data);
    assert!((0.0..=8.0).contains(&h));
});
