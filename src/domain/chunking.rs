//! Fixed-size text splitting with overlap.

use super::DomainError;

/// Upper bound on a single chunk, in characters.
pub const MAX_CHUNK_SIZE: usize = 20_000;

/// Character span `[start, end)` of one chunk within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub start: usize,
    pub end: usize,
}

/// Splits text into windows of at most `chunk_size` characters where each
/// window overlaps its predecessor by up to `chunk_overlap` characters.
///
/// Windows that stop before the end of the text are pulled back to just after
/// the last whitespace in their second half, so words are not cut when a
/// natural break is close. Every character of the input lands in at least one
/// chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, DomainError> {
        if chunk_size == 0 {
            return Err(DomainError::validation("chunk_size must be greater than zero"));
        }
        if chunk_size > MAX_CHUNK_SIZE {
            return Err(DomainError::limit(format!(
                "chunk_size cannot exceed {MAX_CHUNK_SIZE} characters"
            )));
        }
        if chunk_overlap >= chunk_size {
            return Err(DomainError::validation(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        self.spans_of(&chars)
            .into_iter()
            .map(|span| chars[span.start..span.end].iter().collect())
            .collect()
    }

    pub fn spans(&self, text: &str) -> Vec<ChunkSpan> {
        let chars: Vec<char> = text.chars().collect();
        self.spans_of(&chars)
    }

    fn spans_of(&self, chars: &[char]) -> Vec<ChunkSpan> {
        let total = chars.len();
        let mut spans = Vec::new();
        if chars.iter().all(|c| c.is_whitespace()) {
            return spans;
        }

        let mut start = 0;
        loop {
            let hard_end = (start + self.chunk_size).min(total);
            let end = if hard_end == total {
                total
            } else {
                Self::soft_break(chars, start, hard_end)
            };
            spans.push(ChunkSpan { start, end });
            if end == total {
                break;
            }
            start = end.saturating_sub(self.chunk_overlap).max(start + 1);
        }
        spans
    }

    fn soft_break(chars: &[char], start: usize, hard_end: usize) -> usize {
        let floor = start + (hard_end - start) / 2;
        (floor..hard_end)
            .rev()
            .find(|&idx| chars[idx].is_whitespace())
            .map(|idx| idx + 1)
            .unwrap_or(hard_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(len: usize) -> String {
        let words = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"];
        let mut text = String::new();
        let mut i = 0;
        while text.chars().count() < len {
            text.push_str(words[i % words.len()]);
            text.push(if i % 9 == 8 { '\n' } else { ' ' });
            i += 1;
        }
        text.chars().take(len).collect()
    }

    #[test]
    fn rejects_invalid_configuration() {
        assert!(matches!(
            TextSplitter::new(0, 0),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            TextSplitter::new(50, 50),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            TextSplitter::new(MAX_CHUNK_SIZE + 1, 10),
            Err(DomainError::LimitExceeded(_))
        ));
    }

    #[test]
    fn blank_text_has_no_chunks() {
        let splitter = TextSplitter::new(500, 50).unwrap();
        assert!(splitter.split("").is_empty());
        assert!(splitter.split(" \n\t ").is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let splitter = TextSplitter::new(500, 50).unwrap();
        assert_eq!(splitter.split("just a note"), vec!["just a note"]);
    }

    #[test]
    fn default_settings_cover_every_character() {
        let splitter = TextSplitter::new(500, 50).unwrap();
        for len in [1, 499, 500, 501, 1234, 5000] {
            let text = sample(len);
            let spans = splitter.spans(&text);
            assert_eq!(spans.first().map(|s| s.start), Some(0));
            assert_eq!(spans.last().map(|s| s.end), Some(len));
            for pair in spans.windows(2) {
                assert!(pair[1].start <= pair[0].end, "gap between {pair:?}");
                assert!(pair[1].start > pair[0].start);
                assert!(pair[0].end - pair[1].start <= 50);
            }
            assert!(spans.iter().all(|s| s.end - s.start <= 500));
        }
    }

    #[test]
    fn chunks_in_order_reassemble_the_text() {
        let splitter = TextSplitter::new(500, 50).unwrap();
        let text = sample(2600);
        let chunks = splitter.split(&text);
        let spans = splitter.spans(&text);
        assert_eq!(chunks.len(), spans.len());

        let mut rebuilt = String::new();
        let mut covered = 0;
        for (chunk, span) in chunks.iter().zip(&spans) {
            let skip = covered - span.start;
            rebuilt.extend(chunk.chars().skip(skip));
            covered = span.end;
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn breaks_after_whitespace_when_possible() {
        let splitter = TextSplitter::new(10, 0).unwrap();
        let chunks = splitter.split("aaaa bbbb cccc dddd");
        assert_eq!(chunks, vec!["aaaa bbbb ", "cccc dddd"]);
    }

    #[test]
    fn unbroken_text_is_cut_hard() {
        let splitter = TextSplitter::new(4, 1).unwrap();
        let chunks = splitter.split("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let splitter = TextSplitter::new(3, 0).unwrap();
        assert_eq!(splitter.split("ééééé"), vec!["ééé", "éé"]);
    }
}
