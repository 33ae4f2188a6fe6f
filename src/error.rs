//! Error types of the program parser and the rendering context.

use std::fmt;

use itertools::Itertools;

/// Whether an error comes from malformed program text or from a well formed program that
/// breaks a rule of the instruction set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    Syntax,
    Semantic,
}

/// The reason a program failed to compile.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorKind {
    /// The program does not start with `!!FP1.0`.
    InvalidHeader,
    /// The program starts with `!!FCP1.0`, which names a register combiner program.
    UnsupportedCombinerProgram,
    /// The program text ended in the middle of a statement.
    UnexpectedEnd,
    /// A specific piece of syntax was expected.
    Expected(&'static str),
    /// The token does not start any valid construct in its position.
    UnexpectedToken,
    UnknownInstruction {
        name: String,
        suggestion: Option<&'static str>,
    },
    /// A precision, condition update or saturation suffix the opcode does not allow.
    InvalidSuffix,
    UndefinedSymbol(String),
    DuplicateSymbol(String),
    ReservedIdentifier(String),
    InvalidTemporary,
    InvalidInputRegister,
    InvalidOutputRegister,
    /// Both `o[COLR]` and `o[COLH]` are written.
    ConflictingColorOutputs,
    InvalidLocalParameter,
    InvalidTextureUnit,
    InvalidTextureTarget,
    /// A texture unit is used with two different targets.
    TextureTargetConflict {
        unit: usize,
    },
    InvalidSwizzle,
    InvalidWriteMask,
    InvalidConditionMask,
    InvalidNumber,
    InvalidDestination,
    InvalidSource,
    /// Tokens follow the `END` statement.
    CodeAfterEnd,
    MissingEnd,
    ProgramTooLong,
    /// The program never writes an output register.
    NoOutputsWritten,
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::UnknownInstruction { .. }
            | ErrorKind::InvalidSuffix
            | ErrorKind::UndefinedSymbol(_)
            | ErrorKind::DuplicateSymbol(_)
            | ErrorKind::ReservedIdentifier(_)
            | ErrorKind::InvalidTemporary
            | ErrorKind::InvalidInputRegister
            | ErrorKind::InvalidOutputRegister
            | ErrorKind::InvalidLocalParameter
            | ErrorKind::InvalidTextureUnit
            | ErrorKind::ConflictingColorOutputs
            | ErrorKind::TextureTargetConflict { .. }
            | ErrorKind::ProgramTooLong
            | ErrorKind::NoOutputsWritten => ErrorCategory::Semantic,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::InvalidHeader => write!(f, "expected '!!FP1.0' header"),
            ErrorKind::UnsupportedCombinerProgram =>
                write!(f, "fragment combiner programs are not supported"),
            ErrorKind::UnexpectedEnd => write!(f, "unexpected end of program"),
            ErrorKind::Expected(what) => write!(f, "expected {}", what),
            ErrorKind::UnexpectedToken => write!(f, "unexpected token"),
            ErrorKind::UnknownInstruction { name, suggestion: Some(suggestion) } =>
                write!(f, "unknown instruction '{}', did you mean '{}'?", name, suggestion),
            ErrorKind::UnknownInstruction { name, suggestion: None } =>
                write!(f, "unknown instruction '{}'", name),
            ErrorKind::InvalidSuffix => write!(f, "invalid instruction suffix"),
            ErrorKind::UndefinedSymbol(name) => write!(f, "undefined symbol '{}'", name),
            ErrorKind::DuplicateSymbol(name) => write!(f, "duplicate definition of '{}'", name),
            ErrorKind::ReservedIdentifier(name) =>
                write!(f, "'{}' is a reserved identifier", name),
            ErrorKind::InvalidTemporary => write!(f, "invalid temporary register"),
            ErrorKind::InvalidInputRegister => write!(f, "invalid fragment input register"),
            ErrorKind::InvalidOutputRegister => write!(f, "invalid result register"),
            ErrorKind::ConflictingColorOutputs =>
                write!(f, "illegal to write to both o[COLR] and o[COLH]"),
            ErrorKind::InvalidLocalParameter => write!(f, "invalid local parameter register"),
            ErrorKind::InvalidTextureUnit => write!(f, "invalid texture image unit"),
            ErrorKind::InvalidTextureTarget => write!(f, "invalid texture target"),
            ErrorKind::TextureTargetConflict { unit } =>
                write!(f, "texture unit {} used with conflicting targets", unit),
            ErrorKind::InvalidSwizzle => write!(f, "invalid swizzle"),
            ErrorKind::InvalidWriteMask => write!(f, "invalid write mask"),
            ErrorKind::InvalidConditionMask => write!(f, "invalid condition code mask"),
            ErrorKind::InvalidNumber => write!(f, "invalid number"),
            ErrorKind::InvalidDestination => write!(f, "invalid destination register"),
            ErrorKind::InvalidSource => write!(f, "invalid source register"),
            ErrorKind::CodeAfterEnd => write!(f, "extra characters after END"),
            ErrorKind::MissingEnd => write!(f, "missing END statement"),
            ErrorKind::ProgramTooLong => write!(f, "too many instructions"),
            ErrorKind::NoOutputsWritten => write!(f, "program does not write any result register"),
        }
    }
}

/// Error produced when compiling program text.
///
/// Holds the reason, the byte offset of the offending token and the chain of constructs
/// that were being parsed. For line and column information see [ParseError::verbose].
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    pub kind: ErrorKind,
    /// Byte offset into the program text.
    pub position: usize,
    context: Vec<&'static str>,
}

impl ParseError {
    pub fn new(kind: ErrorKind, position: usize) -> ParseError {
        ParseError {
            kind,
            position,
            context: Vec::new(),
        }
    }

    /// The constructs being parsed when the error occurred, innermost first.
    pub fn context(&self) -> &[&'static str] {
        &self.context
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Calculates the line and column of the error from the original program text.
    ///
    /// # Parameters
    /// - `input`: The program text the error was produced from.
    pub fn verbose(self, input: &str) -> VerboseParseError {
        let position = std::cmp::min(self.position, input.len());

        let mut line = 1;
        let mut column = 1;

        for ch in input[..position].chars() {
            if ch == '\n' {
                line += 1;
                column = 0;
            }

            column += 1;
        }

        let rest: String = input[position..]
            .chars()
            .take_while(|ch| *ch != '\n' && *ch != '\r')
            .take(20)
            .collect();

        VerboseParseError {
            line,
            column,
            error: self,
            rest,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.context.is_empty() {
            return write!(f, "error at position {}: {}", self.position, self.kind);
        }

        let ctx = self.context.iter()
            .rev()
            .join(": ");

        write!(f, "error at position {}: {}: {}", self.position, ctx, self.kind)
    }
}

impl std::error::Error for ParseError {}

/// A [ParseError] together with its line and column.
///
/// Created with [ParseError::verbose].
#[derive(Clone, Debug)]
pub struct VerboseParseError {
    pub line: usize,
    pub column: usize,
    pub error: ParseError,
    rest: String,
}

impl fmt::Display for VerboseParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "at line {} col {}: {}, at '{}'", self.line, self.column, self.error.kind, self.rest)
    }
}

/// Attaches the name of the construct being parsed to an error.
pub(crate) trait ErrorExt {
    fn context(self, ctx: &'static str) -> Self;
}

impl<T> ErrorExt for Result<T, ParseError> {
    fn context(mut self, ctx: &'static str) -> Self {
        if let Err(ref mut err) = self {
            err.context.push(ctx);
        }

        self
    }
}

/// Errors of the rendering context operations that are not about program text.
#[derive(Clone, Debug, PartialEq)]
pub enum ContextError {
    /// No program has been compiled successfully yet.
    NoProgram,
    InvalidLocalParameter(usize),
    UndefinedParameter(String),
    /// The named parameter was defined with `DEFINE` and can not be changed.
    ConstantParameter(String),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContextError::NoProgram => write!(f, "no program loaded"),
            ContextError::InvalidLocalParameter(index) =>
                write!(f, "local parameter index {} out of range", index),
            ContextError::UndefinedParameter(name) =>
                write!(f, "program has no parameter named '{}'", name),
            ContextError::ConstantParameter(name) =>
                write!(f, "'{}' is a constant and can not be changed", name),
        }
    }
}

impl std::error::Error for ContextError {}
