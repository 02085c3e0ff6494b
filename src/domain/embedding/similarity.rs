//! Vector similarity and ranking

use std::cmp::Ordering;

/// Cosine similarity of two vectors; 0 for mismatched, empty or zero-norm input
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let (dot, aa, bb) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, aa, bb), (x, y)| {
            (dot + x * y, aa + x * x, bb + y * y)
        });

    let denom = (aa * bb).sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

/// Rank candidates by descending cosine similarity to `query`.
///
/// The sort is stable, so equal scores keep the iteration order of
/// `candidates`. Returns at most `top_k` entries.
pub fn rank_by_similarity<'a, T, I>(query: &[f32], candidates: I, top_k: usize) -> Vec<(T, f32)>
where
    I: IntoIterator<Item = (T, &'a [f32])>,
{
    if top_k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(T, f32)> = candidates
        .into_iter()
        .map(|(item, vector)| {
            let score = cosine_similarity(query, vector);
            (item, score)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);
    scored
}
