use thiserror::Error;

/// Base points for a query term found at least once in a chunk.
const TERM_HIT_POINTS: f32 = 1.0;
/// Extra points for every occurrence of a term beyond the first.
const REPEAT_BONUS: f32 = 0.2;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimilarityError {
    /// One of the vectors has zero magnitude, so the angle is undefined.
    #[error("cannot compute cosine similarity with zero vector")]
    ZeroNorm,

    #[error("embedding dimension mismatch: query {query} vs candidate {candidate}")]
    DimensionMismatch { query: usize, candidate: usize },
}

/// Keyword relevance of `chunk_text` against already-normalized `terms`.
///
/// Each term contained in the lower-cased text scores one point, plus
/// `0.2` for every further non-overlapping occurrence. Zero hits score `0.0`.
pub fn keyword_score(chunk_text: &str, terms: &[String]) -> f32 {
    let haystack = chunk_text.to_lowercase();
    terms
        .iter()
        .map(|term| match haystack.matches(term.as_str()).count() {
            0 => 0.0,
            occurrences => TERM_HIT_POINTS + REPEAT_BONUS * (occurrences - 1) as f32,
        })
        .sum()
}

/// `dot(a, b) / (|a| * |b|)`, clamped to `[-1, 1]`.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, SimilarityError> {
    if query.len() != candidate.len() {
        return Err(SimilarityError::DimensionMismatch {
            query: query.len(),
            candidate: candidate.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut q_norm = 0.0f32;
    let mut c_norm = 0.0f32;

    for (q, c) in query.iter().zip(candidate.iter()) {
        dot += q * c;
        q_norm += q * q;
        c_norm += c * c;
    }

    let denom = q_norm.sqrt() * c_norm.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return Err(SimilarityError::ZeroNorm);
    }

    Ok((dot / denom).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn repeated_terms_earn_a_diminishing_bonus() {
        let score = keyword_score("cats and cats and dogs", &terms(&["cats", "dogs"]));
        assert!((score - 2.2).abs() < 1e-6, "score was {score}");
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let score = keyword_score("Concatenation of CATALOGS", &terms(&["cat"]));
        assert!((score - 1.2).abs() < 1e-6, "score was {score}");
    }

    #[test]
    fn no_hits_or_no_terms_score_zero() {
        assert_eq!(keyword_score("nothing relevant", &terms(&["rust"])), 0.0);
        assert_eq!(keyword_score("anything", &[]), 0.0);
    }

    #[test]
    fn identical_vectors_are_fully_similar() {
        let score = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let score = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        let score = cosine_similarity(&[1.0, 1.0], &[-2.0, -2.0]).unwrap();
        assert!((score + 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_reported_not_divided() {
        assert_eq!(
            cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]),
            Err(SimilarityError::ZeroNorm)
        );
        assert_eq!(
            cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]),
            Err(SimilarityError::ZeroNorm)
        );
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        assert_eq!(
            cosine_similarity(&[1.0], &[1.0, 0.0]),
            Err(SimilarityError::DimensionMismatch {
                query: 1,
                candidate: 2
            })
        );
    }
}
