//! Pure retrieval primitives: query term extraction, relevance scoring and
//! top-K ranking. Nothing in here touches storage or providers.

pub mod keywords;
pub mod ranking;
pub mod similarity;

pub use keywords::{extract_keywords, STOP_WORDS};
pub use ranking::rank;
pub use similarity::{cosine_similarity, keyword_score, SimilarityError};
