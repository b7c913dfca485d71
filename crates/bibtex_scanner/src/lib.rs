//! bibtex_scanner: Lexer/tokenizer for the BibTeX record format.
//!
//! Converts source text into a stream of (kind, literal) tokens for a
//! parser to consume, with support for:
//! - Exact nested-brace balancing in braced and quoted values
//! - Backslash macro escapes inside braced values
//! - Case-insensitive keyword classification of bare runs
//! - Typed fatal errors and span-carrying diagnostics

mod char_codes;
mod error;
mod scanner;
mod token;

pub use error::ScanError;
pub use scanner::{Scanner, ScannerState};
pub use token::{TokenInfo, TokenKind};
