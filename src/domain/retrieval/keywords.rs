/// Closed list of function words ignored when matching query terms.
pub const STOP_WORDS: [&str; 14] = [
    "the", "a", "an", "in", "on", "at", "to", "for", "of", "and", "is", "are", "was", "were",
];

const MIN_TERM_CHARS: usize = 3;

/// Normalizes free text into the significant terms used for keyword scoring.
///
/// Lower-cases, drops every character that is neither a word character nor
/// whitespace, splits on whitespace and removes stop words and tokens shorter
/// than three characters. Terms are unique and keep their first-seen order.
/// Blank or all-stop-word input yields an empty list.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .filter(|c| is_word_char(*c) || c.is_whitespace())
        .collect();

    let mut terms: Vec<String> = Vec::new();
    for token in normalized.split_whitespace() {
        if token.chars().count() < MIN_TERM_CHARS || STOP_WORDS.contains(&token) {
            continue;
        }
        if !terms.iter().any(|existing| existing == token) {
            terms.push(token.to_string());
        }
    }
    terms
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
