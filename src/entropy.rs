use std::sync::LazyLock;

const ENTROPY_LUT_SIZE: usize = 4097;

static ENTROPY_LUT: LazyLock<[f64; ENTROPY_LUT_SIZE]> = LazyLock::new(|| {
    let mut lut = [0.0f64; ENTROPY_LUT_SIZE];
    for (c, entry) in lut.iter_mut().enumerate().skip(1) {
        let cf = c as f64;
        *entry = cf * cf.log2();
    }
    lut
});

/// Shannon entropy in bits per byte, clamped to `[0, 8]`.
pub fn calculate_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut freq = [0u32; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }
    let n = data.len();
    let log2_n = (n as f64).log2();
    let lut = &*ENTROPY_LUT;
    let sum: f64 = freq
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let idx = c as usize;
            if idx < ENTROPY_LUT_SIZE {
                lut[idx]
            } else {
                let cf = c as f64;
                cf * cf.log2()
            }
        })
        .sum();
    (log2_n - sum / n as f64).clamp(0.0, 8.0)
}

/// Entropy of the first `sample` bytes.
pub fn sampled_entropy(data: &[u8], sample: usize) -> f64 {
    calculate_entropy(&data[..sample.min(data.len())])
}
