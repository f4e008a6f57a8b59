use std::cmp::Ordering;

/// Orders `(item, score)` pairs by descending score and keeps the first `k`.
///
/// The sort is stable: equal scores keep the order in which the pairs were
/// supplied, which for retrieval is the pool scan order. Fewer than `k`
/// candidates are returned as-is, without padding.
pub fn rank<T>(mut scored: Vec<(T, f32)>, k: usize) -> Vec<(T, f32)> {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    scored
}
