#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for image in stegoguard::pdf::extract_images(data, 1 << 20) {
        assert!(image.obj_index < data.len());
    }
});
