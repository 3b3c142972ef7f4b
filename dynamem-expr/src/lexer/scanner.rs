//! Lexer implementation

use super::token::*;
use std::iter::Peekable;
use std::str::CharIndices;

/// Lexer for the expression language.
///
/// Single pass over UTF-8 input. Unknown characters become `Illegal`
/// tokens that the parser turns into errors.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            pos: 0,
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    /// Get the next token from the source.
    fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start_pos = self.pos;
        let start_line = self.line;
        let start_col = self.column;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) => match c {
                ',' => {
                    self.advance();
                    TokenKind::Comma
                }
                '.' => {
                    self.advance();
                    TokenKind::Dot
                }
                '(' => {
                    self.advance();
                    TokenKind::LParen
                }
                ')' => {
                    self.advance();
                    TokenKind::RParen
                }
                '[' => {
                    self.advance();
                    TokenKind::LBracket
                }
                ']' => {
                    self.advance();
                    TokenKind::RBracket
                }
                '+' => {
                    self.advance();
                    TokenKind::Plus
                }
                '-' => {
                    self.advance();
                    TokenKind::Minus
                }
                '=' => {
                    self.advance();
                    TokenKind::Eq
                }
                '<' => {
                    self.advance();
                    match self.peek_char() {
                        Some('=') => {
                            self.advance();
                            TokenKind::Le
                        }
                        Some('>') => {
                            self.advance();
                            TokenKind::Ne
                        }
                        _ => TokenKind::Lt,
                    }
                }
                '>' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::Ge
                    } else {
                        TokenKind::Gt
                    }
                }
                '#' => self.scan_placeholder('#'),
                ':' => self.scan_placeholder(':'),

                c if c.is_ascii_digit() => self.scan_number(),

                c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),

                c => {
                    self.advance();
                    TokenKind::Illegal(format!("Unexpected character: {}", c))
                }
            },
        };

        Token {
            kind,
            span: Span {
                start: start_pos,
                end: self.pos,
                line: start_line,
                column: start_col,
            },
        }
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let ident = &self.source[start..self.pos];

        // Check keywords (case-insensitive)
        match ident.to_lowercase().as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "between" => TokenKind::Between,
            "in" => TokenKind::In,
            "set" => TokenKind::Set,
            "add" => TokenKind::Add,
            "remove" => TokenKind::Remove,
            "delete" => TokenKind::Delete,
            _ => TokenKind::Ident(ident.to_string()),
        }
    }

    /// Scan a `#name` or `:value` placeholder.
    fn scan_placeholder(&mut self, sigil: char) -> TokenKind {
        let start = self.pos;
        self.advance(); // consume sigil

        let mut saw_body = false;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                saw_body = true;
                self.advance();
            } else {
                break;
            }
        }

        if !saw_body {
            return TokenKind::Illegal(format!("Dangling placeholder sigil: {}", sigil));
        }

        let text = self.source[start..self.pos].to_string();
        if sigil == '#' {
            TokenKind::NamePlaceholder(text)
        } else {
            TokenKind::ValuePlaceholder(text)
        }
    }

    /// Scan a digit sequence (list index).
    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::Number(self.source[start..self.pos].to_string())
    }

    /// Skip whitespace, tracking line/column positions.
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Peek at the current character without consuming it.
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    /// Advance to the next character, tracking position.
    fn advance(&mut self) -> Option<char> {
        let (i, c) = self.chars.next()?;
        self.pos = i + c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The lexer is total: any input tokenizes, ends in Eof, and spans
        /// stay inside the source.
        #[test]
        fn prop_lexer_total(input in "\\PC{0,80}") {
            let tokens = Lexer::new(&input).tokenize();
            prop_assert!(!tokens.is_empty());
            prop_assert_eq!(&tokens.last().expect("eof").kind, &TokenKind::Eof);
            for token in &tokens {
                prop_assert!(token.span.start <= token.span.end);
                prop_assert!(token.span.end <= input.len());
            }
        }
    }
}
