//! Grounded prompt assembly handed to answer generators.

pub const NO_CONTEXT_PLACEHOLDER: &str = "No additional context available.";
pub const CONTEXT_SEPARATOR: &str = "\n\n";

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Labels contexts `Context 1: ...`, `Context 2: ...` in retrieval order and
/// joins them with a blank line.
pub fn format_contexts<S: AsRef<str>>(contexts: &[S]) -> String {
    if contexts.is_empty() {
        return format!("Context 1: {NO_CONTEXT_PLACEHOLDER}");
    }
    contexts
        .iter()
        .enumerate()
        .map(|(idx, ctx)| format!("Context {}: {}", idx + 1, ctx.as_ref()))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

pub fn build_user_prompt<S: AsRef<str>>(question: &str, contexts: &[S]) -> String {
    format!(
        "Answer the following question based on the provided context.\n\
         If the context doesn't contain relevant information, just say you don't know \
         but provide general information if possible.\n\n\
         Context:\n{}\n\nQuestion: {}\n\nAnswer:",
        format_contexts(contexts),
        question
    )
}
