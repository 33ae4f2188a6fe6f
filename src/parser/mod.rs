//! Cursor over fragment program text.
//!
//! [ParseState] couples the tokenizer with the state the compiler accumulates while reading a
//! program: usage masks, the parameter table and the logger. The operand parsers in
//! [operand] and the statement loop in [crate::compiler] drive it.
//!
//! Alternatives are tried with [ParseState::parse_string] and [ParseState::peek_token], which
//! leave the cursor in place when nothing matches. Required tokens are read with
//! [ParseState::parse_token], which consumes the offending token on failure. Errors propagate
//! immediately and the first one ends the compilation.

pub mod token;
pub(crate) mod operand;

use logos::Logos;
use nom::{
    IResult,
    combinator::map_res,
    number::complete::recognize_float,
};
use slog::Logger;

use crate::error::{ErrorKind, ParseError};
use crate::instruction::{TextureTarget, MAX_TEXTURE_IMAGE_UNITS};
use crate::parameters::ParameterList;

pub use token::Token;

pub(crate) type Result<T> = std::result::Result<T, ParseError>;

pub(crate) struct ParseState<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    line_start: usize,
    token_start: usize,

    /// Bit `n` is set if input register `n` is read.
    pub inputs_read: u32,
    /// Bit `n` is set if output register `n` is written.
    pub outputs_written: u32,
    pub textures_used: [Option<TextureTarget>; MAX_TEXTURE_IMAGE_UNITS],
    pub parameters: ParameterList,
    pub logger: Logger,
}

impl<'a> ParseState<'a> {
    pub fn new(source: &'a str, logger: Logger) -> ParseState<'a> {
        ParseState {
            source,
            pos: 0,
            line: 1,
            line_start: 0,
            token_start: 0,
            inputs_read: 0,
            outputs_written: 0,
            textures_used: [None; MAX_TEXTURE_IMAGE_UNITS],
            parameters: ParameterList::new(),
            logger,
        }
    }

    /// Byte offset of the cursor.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Byte offset of the most recently consumed token.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// Line number of the cursor, starting from 1.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Column of the cursor, starting from 1.
    pub fn column(&self) -> usize {
        self.source[self.line_start..self.pos].chars().count() + 1
    }

    pub fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    /// Creates an error located at the most recently consumed token.
    pub fn error(&self, kind: ErrorKind) -> ParseError {
        ParseError::new(kind, self.token_start)
    }

    /// Creates an error located at the next token.
    pub fn error_ahead(&mut self, kind: ErrorKind) -> ParseError {
        self.skip_ignored();
        ParseError::new(kind, self.pos)
    }

    /// Moves the cursor forward by `len` bytes.
    pub fn advance(&mut self, len: usize) {
        self.advance_to(self.pos + len);
    }

    fn advance_to(&mut self, target: usize) {
        let bytes = self.source.as_bytes();

        for i in self.pos..target {
            match bytes[i] {
                b'\n' => self.begin_line(i + 1),
                b'\r' if bytes.get(i + 1) != Some(&b'\n') => self.begin_line(i + 1),
                _ => (),
            }
        }

        self.pos = target;
    }

    fn begin_line(&mut self, start: usize) {
        self.line += 1;
        self.line_start = start;
    }

    /// Moves the cursor past whitespace and comments.
    pub fn skip_ignored(&mut self) {
        let mut lexer = Token::lexer(self.rest());

        let target = match lexer.next() {
            Some(_) => self.pos + lexer.span().start,
            None => self.source.len(),
        };

        self.advance_to(target);
    }

    /// Consumes and returns the next token, or `None` at the end of the program text.
    pub fn next_token(&mut self) -> Option<Token<'a>> {
        let mut lexer = Token::lexer(self.rest());
        let token = lexer.next();
        let span = lexer.span();

        match token {
            Some(token) => {
                self.token_start = self.pos + span.start;
                self.advance_to(self.pos + span.end);
                Some(token)
            },
            None => {
                self.advance_to(self.source.len());
                self.token_start = self.pos;
                None
            },
        }
    }

    /// Returns the next token without consuming it.
    pub fn peek_token(&self) -> Option<Token<'a>> {
        Token::lexer(self.rest()).next()
    }

    /// Consumes the next token, failing at the end of the program text.
    pub fn parse_token(&mut self) -> Result<Token<'a>> {
        match self.next_token() {
            Some(token) => Ok(token),
            None => Err(self.error(ErrorKind::UnexpectedEnd)),
        }
    }

    /// Consumes `expected` if the program text continues with it.
    ///
    /// Matches raw characters, so multi character punctuation such as `!!` and keywords that
    /// do not lex as a single identifier can be matched.
    pub fn parse_string(&mut self, expected: &str) -> bool {
        self.skip_ignored();

        if self.rest().starts_with(expected) {
            self.token_start = self.pos;
            self.advance_to(self.pos + expected.len());
            true
        } else {
            false
        }
    }

    /// Like [ParseState::parse_string], but only if the match is not followed by an identifier
    /// character.
    pub fn parse_keyword(&mut self, keyword: &str) -> bool {
        self.skip_ignored();

        let rest = self.rest();

        if !rest.starts_with(keyword) {
            return false;
        }

        let boundary = rest[keyword.len()..]
            .chars()
            .next()
            .map(|ch| !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'))
            .unwrap_or(true);

        if boundary {
            self.token_start = self.pos;
            self.advance_to(self.pos + keyword.len());
        }

        boundary
    }

    /// Consumes `expected`, failing if the program text continues with something else.
    pub fn expect(&mut self, expected: &'static str) -> Result<()> {
        if self.parse_string(expected) {
            return Ok(());
        }

        match self.next_token() {
            Some(_) => Err(self.error(ErrorKind::Expected(expected))),
            None => Err(self.error(ErrorKind::UnexpectedEnd)),
        }
    }

    /// Consumes a floating point literal with an optional sign and exponent.
    pub fn parse_float(&mut self) -> Result<f32> {
        self.skip_ignored();

        let rest = self.rest();
        let result: IResult<&str, f32> = map_res(recognize_float, |s: &str| s.parse::<f32>())(rest);

        match result {
            Ok((remaining, value)) => {
                self.token_start = self.pos;
                self.advance_to(self.pos + rest.len() - remaining.len());
                Ok(value)
            },
            Err(_) if rest.is_empty() => Err(ParseError::new(ErrorKind::UnexpectedEnd, self.pos)),
            Err(_) => Err(ParseError::new(ErrorKind::InvalidNumber, self.pos)),
        }
    }

    /// Consumes a decimal integer token.
    pub fn parse_integer(&mut self) -> Result<usize> {
        match self.parse_token()? {
            Token::Integer(digits) => digits
                .parse()
                .map_err(|_| self.error(ErrorKind::InvalidNumber)),
            _ => Err(self.error(ErrorKind::Expected("integer"))),
        }
    }

    /// Consumes an identifier token.
    pub fn parse_identifier(&mut self) -> Result<&'a str> {
        match self.parse_token()? {
            Token::Identifier(name) => Ok(name),
            _ => Err(self.error(ErrorKind::Expected("identifier"))),
        }
    }

    /// Whether only whitespace and comments remain.
    pub fn at_end(&self) -> bool {
        self.peek_token().is_none()
    }
}
