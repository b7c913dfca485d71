//! Typed scan failures.

use thiserror::Error;

/// Fatal lexical errors.
///
/// These conditions have no recovery strategy: the scan of the current
/// input stops and the embedding application decides whether to abort.
/// Unterminated braced or quoted values are not fatal at this layer;
/// they surface as [`crate::TokenKind::Illegal`] tokens instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScanError {
    /// A rune in token position that starts no known token.
    #[error("token '{ch}' unrecognised at offset {pos}")]
    UnrecognizedToken { ch: char, pos: u32 },

    /// An `@` inside a braced value without an active backslash escape.
    #[error("unexpected '@' in braced value at offset {pos}")]
    UnexpectedAtSign { pos: u32 },
}

impl ScanError {
    /// The rune offset the error occurred at.
    pub fn pos(&self) -> u32 {
        match *self {
            ScanError::UnrecognizedToken { pos, .. } => pos,
            ScanError::UnexpectedAtSign { pos } => pos,
        }
    }
}
