//! Utility modules

pub mod text;

pub use text::{is_word_char, word_at, word_for_selection};
