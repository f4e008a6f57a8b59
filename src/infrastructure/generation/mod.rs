//! Answer generators consuming retrieval output.

pub mod extractive;
pub mod openai_chat;

pub use extractive::ExtractiveGenerator;
pub use openai_chat::OpenAiChatGenerator;
