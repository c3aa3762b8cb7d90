//! Word extraction helpers for toggle actions
//!
//! Offsets are char indices into a [`Rope`].

use std::ops::Range;

use ropey::Rope;

/// Check if a character can be part of a highlighted word
pub fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Extract the word at a caret offset
///
/// A caret sitting right after a word (e.g. at the end of `foo|`) still
/// resolves to that word. Offsets past the end are clamped to the last char.
pub fn word_at(text: &Rope, offset: usize) -> Option<String> {
    let len = text.len_chars();
    if len == 0 {
        return None;
    }

    let mut offset = offset.min(len - 1);
    if !is_word_char(text.char(offset)) {
        if offset > 0 && is_word_char(text.char(offset - 1)) {
            offset -= 1;
        } else {
            return None;
        }
    }

    let mut start = offset;
    while start > 0 && is_word_char(text.char(start - 1)) {
        start -= 1;
    }

    let mut end = offset;
    while end < len && is_word_char(text.char(end)) {
        end += 1;
    }

    (start < end).then(|| text.slice(start..end).to_string())
}

/// Pick the word a toggle action should act on
///
/// A selection made only of word characters resolves to the word at its
/// start; anything else falls back to the word under the caret.
pub fn word_for_selection(text: &Rope, selection: Range<usize>, caret: usize) -> Option<String> {
    let len = text.len_chars();
    let start = selection.start.min(len);
    let end = selection.end.min(len);
    if start < end && text.slice(start..end).chars().all(is_word_char) {
        if let Some(word) = word_at(text, start) {
            return Some(word);
        }
    }
    word_at(text, caret)
}
