//! Cosine similarity shared by the exact-match resolver and the knowledge
//! index. Both tiers must score with the same formula.

/// Epsilon added to the denominator to avoid division by zero on degenerate
/// (all-zero) vectors.
const NORM_EPSILON: f32 = 1e-9;

pub fn l2_norm(v: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for x in v {
        sum += x * x;
    }
    sum.sqrt()
}

pub fn cosine_similarity(a: &[f32], b: &[f32], a_norm: f32, b_norm: f32) -> f32 {
    let mut dot = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
    }
    dot / (a_norm * b_norm + NORM_EPSILON)
}

/// Cosine similarity is mathematically bounded to [-1, 1] but the computed
/// value may drift past the bound; clamp before any threshold comparison.
pub fn clamp_score(score: f32) -> f32 {
    score.clamp(-1.0, 1.0)
}
