use serde::Serialize;

use crate::models::CatalogItem;

/// A catalog item together with its cosine similarity to the query vector
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoredItem {
    #[serde(flatten)]
    pub item: CatalogItem,
    pub similarity: f32,
}

/// Cosine similarity of two vectors, clamped to [-1, 1]
///
/// Returns 0 when either vector has zero magnitude or the dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }

    let similarity = (dot / denominator).clamp(-1.0, 1.0) as f32;
    if similarity.is_nan() {
        0.0
    } else {
        similarity
    }
}

/// Scores every candidate against `query` and keeps the best `top_k`
///
/// Candidates are expected in store order; the sort is stable so equal scores
/// keep that order.
pub fn rank(query: &[f32], candidates: Vec<CatalogItem>, top_k: usize) -> Vec<ScoredItem> {
    let mut scored: Vec<ScoredItem> = candidates
        .into_iter()
        .map(|item| ScoredItem {
            similarity: cosine_similarity(query, &item.embedding),
            item,
        })
        .collect();

    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(top_k);
    scored
}
