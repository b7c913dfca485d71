//! The BibTeX scanner/lexer.
//!
//! Converts source text into a stream of tokens that the parser
//! consumes. Braced and quoted values are scanned with exact nested
//! brace counting; backslash escapes inside braced values keep TeX
//! macro markup, including `@`, as literal content.

use crate::char_codes::{is_alphanum, is_bare_symbol, is_whitespace};
use crate::error::ScanError;
use crate::token::{TokenInfo, TokenKind};
use bibtex_core::text::TextSpan;
use bibtex_diagnostics::{messages, Diagnostic, DiagnosticCollection};

/// Saved scanner state for lookahead.
pub struct ScannerState {
    pub pos: usize,
    pub token_start: usize,
    pub token: TokenKind,
    pub token_value: String,
    pub brace_is_value: bool,
}

/// The scanner converts BibTeX source text into tokens.
///
/// Each instance owns its cursor and its mode flag, so independent
/// scans of different inputs never interfere with each other.
pub struct Scanner {
    /// The source text being scanned.
    text: Vec<char>,
    /// Current position in the text, in runes.
    pos: usize,
    /// Start of the current token (after leading whitespace).
    token_start: usize,
    /// The current token kind.
    token: TokenKind,
    /// The literal text of the current token.
    token_value: String,
    /// Whether the previous token was `=`, in which case the next `{`
    /// opens a field value instead of scanning as a left-brace token.
    brace_is_value: bool,
    /// Accumulated diagnostics.
    diagnostics: DiagnosticCollection,
}

impl Scanner {
    /// Create a new scanner for the given source text.
    pub fn new(text: &str) -> Self {
        Self {
            text: text.chars().collect(),
            pos: 0,
            token_start: 0,
            token: TokenKind::Illegal,
            token_value: String::new(),
            brace_is_value: false,
            diagnostics: DiagnosticCollection::new(),
        }
    }

    /// Get the current token kind.
    #[inline]
    pub fn token(&self) -> TokenKind {
        self.token
    }

    /// Get the current token's literal text.
    #[inline]
    pub fn token_value(&self) -> &str {
        &self.token_value
    }

    /// Get the start position of the current token (after whitespace).
    #[inline]
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// Get the current position (end of the current token).
    #[inline]
    pub fn token_end(&self) -> usize {
        self.pos
    }

    /// Get a TokenInfo for the current token.
    pub fn token_info(&self) -> TokenInfo {
        TokenInfo {
            kind: self.token,
            pos: self.token_start as u32,
            end: self.pos as u32,
            text: self.token_value.clone(),
        }
    }

    /// Get the accumulated diagnostics.
    pub fn diagnostics(&self) -> &DiagnosticCollection {
        &self.diagnostics
    }

    /// Take the accumulated diagnostics, leaving an empty collection.
    pub fn take_diagnostics(&mut self) -> DiagnosticCollection {
        std::mem::take(&mut self.diagnostics)
    }

    /// Save the full scanner state for lookahead.
    pub fn save_state(&self) -> ScannerState {
        ScannerState {
            pos: self.pos,
            token_start: self.token_start,
            token: self.token,
            token_value: self.token_value.clone(),
            brace_is_value: self.brace_is_value,
        }
    }

    /// Restore the full scanner state from a saved state.
    pub fn restore_state(&mut self, state: ScannerState) {
        self.pos = state.pos;
        self.token_start = state.token_start;
        self.token = state.token;
        self.token_value = state.token_value;
        self.brace_is_value = state.brace_is_value;
    }

    /// Look ahead: save state, call f, restore state and return the result.
    pub fn look_ahead<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.save_state();
        let result = f(self);
        self.restore_state(saved);
        result
    }

    // ========================================================================
    // Core scanning
    // ========================================================================

    /// Read the next rune and advance the cursor. Returns None once the
    /// input is exhausted.
    #[inline]
    fn read(&mut self) -> Option<char> {
        let ch = self.text.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    /// Push the previously read rune back on the cursor. The grammar
    /// never needs more than one rune of pushback.
    #[inline]
    fn unread(&mut self) {
        debug_assert!(self.pos > 0);
        self.pos -= 1;
    }

    /// The span from `start` to the current position.
    fn span_from(&self, start: usize) -> TextSpan {
        TextSpan::from_bounds(start as u32, self.pos as u32)
    }

    /// Scan the next token and return its kind.
    ///
    /// The literal text is available from [`Scanner::token_value`] until
    /// the next call. Once the input is exhausted, every further call
    /// returns [`TokenKind::Eof`] with an empty literal.
    ///
    /// Unterminated braced or quoted values return
    /// [`TokenKind::Illegal`] carrying the partial text, with a
    /// span-carrying diagnostic added to the collection. An
    /// unrecognised rune or an unescaped `@` inside a braced value is
    /// fatal and returns an error.
    pub fn scan(&mut self) -> Result<TokenKind, ScanError> {
        self.token_value.clear();
        self.skip_whitespace();
        self.token_start = self.pos;

        let ch = match self.read() {
            Some(ch) => ch,
            None => {
                self.token = TokenKind::Eof;
                return Ok(self.token);
            }
        };

        if is_alphanum(ch) {
            self.unread();
            return self.scan_value();
        }

        self.token = match ch {
            '@' => TokenKind::AtSign,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '=' => {
                self.brace_is_value = true;
                TokenKind::Equals
            }
            '"' => return Ok(self.scan_quoted()),
            '{' => {
                if self.brace_is_value {
                    self.brace_is_value = false;
                    return self.scan_braced();
                }
                TokenKind::LeftBrace
            }
            '}' => TokenKind::RightBrace,
            '#' => TokenKind::Pound,
            _ => {
                let literal = ch.to_string();
                self.diagnostics.add(Diagnostic::with_span(
                    self.span_from(self.token_start),
                    &messages::UNRECOGNIZED_CHARACTER,
                    &[literal.as_str()],
                ));
                return Err(ScanError::UnrecognizedToken {
                    ch,
                    pos: self.token_start as u32,
                });
            }
        };
        self.token_value.push(ch);
        Ok(self.token)
    }

    /// Dispatch for a value position: a quoted value, a braced value,
    /// or a bare run.
    fn scan_value(&mut self) -> Result<TokenKind, ScanError> {
        match self.read() {
            Some('"') => Ok(self.scan_quoted()),
            Some('{') => self.scan_braced(),
            Some(_) => {
                // Not an open quote/brace.
                self.unread();
                Ok(self.scan_bare())
            }
            None => {
                self.token = TokenKind::Eof;
                Ok(self.token)
            }
        }
    }

    /// Consume a bare (unquoted, unbraced) run and classify it.
    fn scan_bare(&mut self) -> TokenKind {
        loop {
            let ch = match self.read() {
                Some(ch) => ch,
                None => break,
            };
            if (!is_alphanum(ch) && !is_bare_symbol(ch)) || is_whitespace(ch) {
                self.unread();
                break;
            }
            self.token_value.push(ch);
        }
        self.token = match TokenKind::from_keyword(&self.token_value) {
            Some(keyword) => keyword,
            // Integer runs scan as plain identifiers.
            None if self.token_value.parse::<i64>().is_ok() => TokenKind::Ident,
            None => TokenKind::BareIdent,
        };
        self.token
    }

    /// Consume a braced value, like `{this}`. The opening brace has
    /// already been read; scanning ends when the matching close brace
    /// balances it. A backslash opens a macro escape that runs until
    /// the next whitespace; within it `@` is literal markup, outside it
    /// `@` is fatal.
    fn scan_braced(&mut self) -> Result<TokenKind, ScanError> {
        let mut brace = 1i32;
        let mut macro_escape = false;
        loop {
            let ch = match self.read() {
                Some(ch) => ch,
                None => {
                    self.diagnostics.add(Diagnostic::with_span(
                        self.span_from(self.token_start),
                        &messages::UNTERMINATED_BRACED_VALUE,
                        &[],
                    ));
                    self.token = TokenKind::Illegal;
                    return Ok(self.token);
                }
            };
            match ch {
                '\\' => {
                    self.token_value.push(ch);
                    macro_escape = true;
                }
                '{' => {
                    self.token_value.push(ch);
                    brace += 1;
                }
                '}' => {
                    brace -= 1;
                    macro_escape = false;
                    if brace == 0 {
                        // Balances the open brace.
                        self.token = TokenKind::Ident;
                        return Ok(self.token);
                    }
                    self.token_value.push(ch);
                }
                '@' if macro_escape => self.token_value.push(ch),
                '@' => {
                    let pos = (self.pos - 1) as u32;
                    self.diagnostics.add(Diagnostic::with_span(
                        TextSpan::new(pos, 1),
                        &messages::UNEXPECTED_ATSIGN,
                        &[],
                    ));
                    return Err(ScanError::UnexpectedAtSign { pos });
                }
                ch if is_whitespace(ch) => {
                    self.token_value.push(ch);
                    macro_escape = false;
                }
                ch => self.token_value.push(ch),
            }
        }
    }

    /// Consume a quoted value, like `"this"`. The opening quote has
    /// already been read. Braces may nest inside the value; a `"` only
    /// terminates it at brace depth zero.
    fn scan_quoted(&mut self) -> TokenKind {
        let mut brace = 0i32;
        loop {
            let ch = match self.read() {
                Some(ch) => ch,
                None => {
                    self.diagnostics.add(Diagnostic::with_span(
                        self.span_from(self.token_start),
                        &messages::UNTERMINATED_QUOTED_VALUE,
                        &[],
                    ));
                    self.token = TokenKind::Illegal;
                    return self.token;
                }
            };
            match ch {
                '{' => {
                    self.token_value.push(ch);
                    brace += 1;
                }
                '}' => {
                    self.token_value.push(ch);
                    brace -= 1;
                }
                '"' if brace == 0 => {
                    // Matches the open quote.
                    self.token = TokenKind::Ident;
                    return self.token;
                }
                ch => self.token_value.push(ch),
            }
        }
    }

    /// Consume a run of whitespace without emitting a token.
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.read() {
            if !is_whitespace(ch) {
                self.unread();
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_ok(scanner: &mut Scanner) -> TokenKind {
        scanner.scan().expect("scan failed")
    }

    #[test]
    fn test_scan_delimiters() {
        let mut scanner = Scanner::new("@ : , #");
        assert_eq!(scan_ok(&mut scanner), TokenKind::AtSign);
        assert_eq!(scanner.token_value(), "@");
        assert_eq!(scan_ok(&mut scanner), TokenKind::Colon);
        assert_eq!(scan_ok(&mut scanner), TokenKind::Comma);
        assert_eq!(scan_ok(&mut scanner), TokenKind::Pound);
        assert_eq!(scan_ok(&mut scanner), TokenKind::Eof);
    }

    #[test]
    fn test_equals_makes_next_brace_a_value() {
        let mut scanner = Scanner::new("= {x}");
        assert_eq!(scan_ok(&mut scanner), TokenKind::Equals);
        assert_eq!(scan_ok(&mut scanner), TokenKind::Ident);
        assert_eq!(scanner.token_value(), "x");
        assert_eq!(scan_ok(&mut scanner), TokenKind::Eof);
    }

    #[test]
    fn test_brace_without_equals_is_literal() {
        let mut scanner = Scanner::new("{x}");
        assert_eq!(scan_ok(&mut scanner), TokenKind::LeftBrace);
        assert_eq!(scan_ok(&mut scanner), TokenKind::BareIdent);
        assert_eq!(scanner.token_value(), "x");
        assert_eq!(scan_ok(&mut scanner), TokenKind::RightBrace);
    }

    #[test]
    fn test_value_flag_clears_after_braced_value() {
        let mut scanner = Scanner::new("= {x} {y}");
        assert_eq!(scan_ok(&mut scanner), TokenKind::Equals);
        assert_eq!(scan_ok(&mut scanner), TokenKind::Ident);
        assert_eq!(scan_ok(&mut scanner), TokenKind::LeftBrace);
    }

    #[test]
    fn test_bare_classification() {
        let mut scanner = Scanner::new("article string 2021 mr2021");
        assert_eq!(scan_ok(&mut scanner), TokenKind::BareIdent);
        assert_eq!(scanner.token_value(), "article");
        assert_eq!(scan_ok(&mut scanner), TokenKind::StringKeyword);
        assert_eq!(scan_ok(&mut scanner), TokenKind::Ident);
        assert_eq!(scanner.token_value(), "2021");
        assert_eq!(scan_ok(&mut scanner), TokenKind::BareIdent);
    }

    #[test]
    fn test_bare_symbols_continue_the_run() {
        let mut scanner = Scanner::new("doi:10.1000/182 key_a-b.c+d");
        assert_eq!(scan_ok(&mut scanner), TokenKind::BareIdent);
        assert_eq!(scanner.token_value(), "doi:10.1000/182");
        assert_eq!(scan_ok(&mut scanner), TokenKind::BareIdent);
        assert_eq!(scanner.token_value(), "key_a-b.c+d");
    }

    #[test]
    fn test_token_positions() {
        let mut scanner = Scanner::new("  abc ");
        assert_eq!(scan_ok(&mut scanner), TokenKind::BareIdent);
        assert_eq!(scanner.token_start(), 2);
        assert_eq!(scanner.token_end(), 5);
        let info = scanner.token_info();
        assert_eq!(info.pos, 2);
        assert_eq!(info.end, 5);
        assert_eq!(info.text, "abc");
        assert_eq!(info.len(), 3);
    }

    #[test]
    fn test_unrecognized_rune_is_fatal() {
        let mut scanner = Scanner::new("  %");
        assert_eq!(
            scanner.scan(),
            Err(ScanError::UnrecognizedToken { ch: '%', pos: 2 })
        );
        assert!(scanner.diagnostics().has_errors());
    }

    #[test]
    fn test_look_ahead_restores_state() {
        let mut scanner = Scanner::new("title = {x}");
        assert_eq!(scan_ok(&mut scanner), TokenKind::BareIdent);
        let next = scanner.look_ahead(|s| s.scan());
        assert_eq!(next, Ok(TokenKind::Equals));
        // Position and current token are restored.
        assert_eq!(scanner.token(), TokenKind::BareIdent);
        assert_eq!(scanner.token_value(), "title");
        assert_eq!(scan_ok(&mut scanner), TokenKind::Equals);
    }

    #[test]
    fn test_save_state_includes_value_flag() {
        let mut scanner = Scanner::new("= {x}");
        assert_eq!(scan_ok(&mut scanner), TokenKind::Equals);
        let saved = scanner.save_state();
        assert_eq!(scan_ok(&mut scanner), TokenKind::Ident);
        scanner.restore_state(saved);
        // The `{` must still scan as a value after restoring.
        assert_eq!(scan_ok(&mut scanner), TokenKind::Ident);
        assert_eq!(scanner.token_value(), "x");
    }
}
