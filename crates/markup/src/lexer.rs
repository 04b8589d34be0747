//! Hand-written scanner for `.swen` source text.
//!
//! The lexer walks the UTF-8 byte stream once, producing tagged tokens with
//! source spans into a caller-provided bounded arena. Whitespace (including
//! `\r`) separates tokens; `\n` advances the line counter. Keywords are
//! resolved through a first-character-dispatched table.

use swen_scene::Arena;

use crate::error::{ParseError, ParseErrorKind};
use crate::token::{classify_word, Span, Token, TokenTag};

/// Default bounded capacity of the token arena.
pub const DEFAULT_TOKEN_CAPACITY: usize = 65536;

/// Characters that terminate a number or identifier run.
fn is_break(byte: u8) -> bool {
    byte.is_ascii_whitespace()
        || matches!(
            byte,
            b'{' | b'}' | b'[' | b']' | b'(' | b')' | b',' | b':' | b';' | b'.' | b'"'
        )
}

/// Scanner state over one source string.
pub struct Lexer<'src> {
    src: &'src str,
    bytes: &'src [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'src> Lexer<'src> {
    #[must_use]
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole source into `tokens`. The last token is always
    /// [`TokenTag::Eof`].
    ///
    /// # Errors
    /// Aborts on the first malformed number or string, or when the token
    /// arena overflows.
    pub fn tokenize_into(
        &mut self,
        tokens: &mut Arena<Token<'src>>,
    ) -> Result<(), ParseError> {
        loop {
            let token = self.next_token()?;
            let done = token.tag == TokenTag::Eof;
            let span = token.span;
            tokens
                .push(token)
                .map_err(|_| ParseError::new(ParseErrorKind::OutOfMemory, span))?;
            if done {
                return Ok(());
            }
        }
    }

    fn next_token(&mut self) -> Result<Token<'src>, ParseError> {
        self.skip_whitespace();

        let span = self.span_here();
        let Some(&byte) = self.bytes.get(self.pos) else {
            return Ok(Token::new("", TokenTag::Eof, span));
        };

        match byte {
            b'"' => self.lex_string(span),
            b'-' | b'0'..=b'9' => self.lex_number(span),
            b'{' => Ok(self.punct(TokenTag::LBrace, span)),
            b'}' => Ok(self.punct(TokenTag::RBrace, span)),
            b'[' => Ok(self.punct(TokenTag::LBracket, span)),
            b']' => Ok(self.punct(TokenTag::RBracket, span)),
            b'(' => Ok(self.punct(TokenTag::LParen, span)),
            b')' => Ok(self.punct(TokenTag::RParen, span)),
            b',' => Ok(self.punct(TokenTag::Comma, span)),
            b':' => Ok(self.punct(TokenTag::Colon, span)),
            b';' => Ok(self.punct(TokenTag::Semicolon, span)),
            b'.' => Ok(self.punct(TokenTag::Dot, span)),
            _ => Ok(self.lex_word(span)),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&byte) = self.bytes.get(self.pos) {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.advance();
        }
    }

    fn advance(&mut self) {
        if let Some(&byte) = self.bytes.get(self.pos) {
            if byte == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.pos += 1;
        }
    }

    fn span_here(&self) -> Span {
        Span::new(self.line, self.column, self.pos as u32)
    }

    fn punct(&mut self, tag: TokenTag, span: Span) -> Token<'src> {
        let start = self.pos;
        self.advance();
        Token::new(&self.src[start..self.pos], tag, span)
    }

    /// A sign optionally followed by digits with at most one `.`. A lone
    /// minus is handed back as an identifier.
    fn lex_number(&mut self, span: Span) -> Result<Token<'src>, ParseError> {
        let start = self.pos;
        if self.bytes[self.pos] == b'-' {
            let next_is_digit = self
                .bytes
                .get(self.pos + 1)
                .is_some_and(u8::is_ascii_digit);
            self.advance();
            if !next_is_digit {
                return Ok(Token::new(
                    &self.src[start..self.pos],
                    TokenTag::Identifier,
                    span,
                ));
            }
        }

        let mut saw_dot = false;
        while let Some(&byte) = self.bytes.get(self.pos) {
            match byte {
                b'0'..=b'9' => self.advance(),
                b'.' => {
                    if saw_dot {
                        return Err(ParseError::new(ParseErrorKind::InvalidNumber, span));
                    }
                    saw_dot = true;
                    self.advance();
                }
                _ if is_break(byte) => break,
                _ => return Err(ParseError::new(ParseErrorKind::InvalidNumber, span)),
            }
        }

        let tag = if saw_dot { TokenTag::Float } else { TokenTag::Int };
        Ok(Token::new(&self.src[start..self.pos], tag, span))
    }

    /// A double-quoted string. Quotes are stripped from the literal; a
    /// newline or end-of-input before the closing quote is an error.
    fn lex_string(&mut self, span: Span) -> Result<Token<'src>, ParseError> {
        self.advance();
        let content_start = self.pos;
        loop {
            match self.bytes.get(self.pos) {
                None | Some(b'\n') => {
                    return Err(ParseError::new(ParseErrorKind::InvalidString, span));
                }
                Some(b'"') => {
                    let literal = &self.src[content_start..self.pos];
                    self.advance();
                    return Ok(Token::new(literal, TokenTag::Str, span));
                }
                Some(_) => self.advance(),
            }
        }
    }

    /// Longest run of non-break characters; keywords resolve through the
    /// dispatch table, everything else falls back to `identifier`.
    fn lex_word(&mut self, span: Span) -> Token<'src> {
        let start = self.pos;
        while let Some(&byte) = self.bytes.get(self.pos) {
            if is_break(byte) {
                break;
            }
            self.advance();
        }
        let word = &self.src[start..self.pos];
        Token::new(word, classify_word(word), span)
    }
}

/// Tokenize into a fresh default-capacity arena.
///
/// # Errors
/// Propagates the first lexer error.
pub fn tokenize(src: &str) -> Result<Arena<Token<'_>>, ParseError> {
    let mut tokens = Arena::with_capacity(DEFAULT_TOKEN_CAPACITY);
    Lexer::new(src).tokenize_into(&mut tokens)?;
    Ok(tokens)
}
