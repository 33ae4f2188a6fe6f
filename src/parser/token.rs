//! Tokens and a tokenizer for fragment program text.

use logos::{Lexer, Logos};

use std::fmt;

/// Enumeration of all tokens of the program text.
#[derive(Logos, Debug, PartialEq, Clone, Copy)]
pub enum Token<'a> {
    /// Errorneous token that could not be interpreted as any of the other variants.
    #[error]
    #[regex(r"[ \t\r\n]+", logos::skip)]
    #[regex(r"#[^\r\n]*", logos::skip)]
    Error,

    /// A maximal run of decimal digits.
    #[regex("[0-9]+", Lexer::slice)]
    Integer(&'a str),

    /// A case sensitive name which begins with a letter and can contain the characters
    /// `A-Za-z0-9_$`.
    #[regex("[A-Za-z][A-Za-z0-9_$]*", Lexer::slice)]
    Identifier(&'a str),

    /// Any other single character.
    #[regex(r"[^A-Za-z0-9 \t\r\n#]", Lexer::slice)]
    Punctuation(&'a str),
}

impl<'a> Token<'a> {
    /// The text of the token.
    pub fn as_str(&self) -> &'a str {
        match self {
            Token::Integer(text) | Token::Identifier(text) | Token::Punctuation(text) => text,
            Token::Error => "",
        }
    }
}

impl<'t> fmt::Display for Token<'t> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Error => write!(f, "<error>"),
            Token::Integer(text) => write!(f, "{}", text),
            Token::Identifier(text) => write!(f, "{}", text),
            Token::Punctuation(text) => write!(f, "{}", text),
        }
    }
}
