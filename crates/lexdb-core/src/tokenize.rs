//! The one normalization used at ingestion and at query time.
//!
//! A term is a maximal run of alphanumeric characters, lowercased. Runs
//! shorter than [`MIN_TOKEN_CHARS`] are dropped before positions are
//! assigned, so positions count kept tokens only.

/// Shorter runs ("a", "I", stray digits) are not indexed.
pub const MIN_TOKEN_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub term: String,
    pub position: usize,
}

/// Lazy `(term, position)` stream over a piece of text. Cloning restarts
/// from the clone point; calling [`tokenize`] again restarts from zero.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    rest: &'a str,
    position: usize,
}

pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens { rest: text, position: 0 }
}

/// Lowercases a raw prefix the same way terms are lowercased.
pub fn normalize_term(raw: &str) -> String {
    raw.to_lowercase()
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let start = self.rest.find(char::is_alphanumeric)?;
            let tail = &self.rest[start..];
            let end = tail.find(|c: char| !c.is_alphanumeric()).unwrap_or(tail.len());
            let word = &tail[..end];
            self.rest = &tail[end..];
            if word.chars().count() < MIN_TOKEN_CHARS {
                continue;
            }
            let token = Token { term: normalize_term(word), position: self.position };
            self.position += 1;
            return Some(token);
        }
    }
}
