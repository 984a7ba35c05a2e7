//! Normalized Shannon entropy of a byte stream.

/// Entropy of `data` in bits per byte, divided by 8. Returns 0 for empty
/// input; a uniform stream approaches 1.
pub fn normalized_shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    for b in data {
        counts[*b as usize] += 1;
    }
    let total = data.len() as f64;
    let bits: f64 = counts
        .iter()
        .filter(|c| **c > 0)
        .map(|c| {
            let p = *c as f64 / total;
            -p * p.log2()
        })
        .sum();
    bits / 8.0
}
