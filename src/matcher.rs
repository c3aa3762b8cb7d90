//! Whole-word literal matching
//!
//! A term is escaped and wrapped in `\b` word boundaries, so `foo` matches the
//! standalone word but not `foobar` or `foo_bar`, and a term containing `.` or
//! `*` only ever matches itself. Offsets are reported as character indices,
//! the same unit `ropey` uses for buffer positions.

use std::ops::Range;

use regex::Regex;

/// A compiled whole-word matcher for one literal term
#[derive(Debug, Clone)]
pub struct WordMatcher {
    term: String,
    /// `None` for an empty term, which never matches
    regex: Option<Regex>,
}

impl WordMatcher {
    /// Compile a matcher for `term`
    ///
    /// Fails only if the escaped pattern exceeds the regex size limit.
    pub fn new(term: &str) -> Result<Self, regex::Error> {
        let regex = if term.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(r"\b{}\b", regex::escape(term)))?)
        };
        Ok(Self {
            term: term.to_string(),
            regex,
        })
    }

    /// The literal term this matcher was built from
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Lazily iterate over all matches in `text` as `[start, end)` char ranges
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> Matches<'r, 't> {
        Matches {
            inner: self.regex.as_ref().map(|re| re.find_iter(text)),
            text,
            byte_pos: 0,
            char_pos: 0,
        }
    }

    /// Check whether `text` contains at least one match
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }
}

/// Iterator over whole-word matches, yielding char ranges
///
/// Byte offsets from the regex engine are converted incrementally, so the
/// whole iteration walks the text once.
pub struct Matches<'r, 't> {
    inner: Option<regex::Matches<'r, 't>>,
    text: &'t str,
    byte_pos: usize,
    char_pos: usize,
}

impl Iterator for Matches<'_, '_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let m = self.inner.as_mut()?.next()?;
        self.char_pos += self.text[self.byte_pos..m.start()].chars().count();
        let start = self.char_pos;
        self.char_pos += m.as_str().chars().count();
        self.byte_pos = m.end();
        Some(start..self.char_pos)
    }
}

/// Find all whole-word occurrences of `term` in `text`
///
/// Convenience wrapper for one-off searches. Long-lived callers should keep a
/// [`WordMatcher`] instead of recompiling per call.
pub fn find_matches(text: &str, term: &str) -> Vec<Range<usize>> {
    match WordMatcher::new(term) {
        Ok(matcher) => matcher.find_iter(text).collect(),
        Err(e) => {
            tracing::warn!("Could not compile matcher for {:?}: {}", term, e);
            Vec::new()
        }
    }
}
