use rand::Rng;
use std::fmt::Write;

/// Random stand-in for a semantic embedding: `dims` values in `[0, 1)`.
pub fn mock_embedding<R: Rng + ?Sized>(dims: usize, rng: &mut R) -> Vec<f32> {
    (0..dims).map(|_| rng.random::<f32>()).collect()
}

/// Render a vector as a SQL vector literal: `[0.123456, 0.654321]`.
pub fn format_embedding(vec: &[f32]) -> String {
    // "0.xxxxxx, " is 10 bytes per element
    let mut out = String::with_capacity(2 + vec.len() * 10);
    out.push('[');
    for (i, v) in vec.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{v:.6}");
    }
    out.push(']');
    out
}
