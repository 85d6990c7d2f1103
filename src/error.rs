use std::fmt::{self, Display};

use itertools::Itertools;
use nom::error::ErrorKind;

use crate::arena::ArenaError;
use crate::isa::{AddrMode, Mnemonic};

/// Reasons a program line is rejected by the line parser.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    EmptyLine,
    /// `;text` instead of `; text`.
    CommentSpacing,
    TooManyFields,
    UnknownInstruction {
        name: String,
        suggestion: Option<Mnemonic>,
    },
    UnknownPragma(String),
    LabelSyntax(String),
    /// Mnemonic, mode or register name, or something that reads as a hex number.
    ReservedWord(String),
    LabelMissing,
    OperandMissing,
    OperandSyntax(String),
    AddressingMode {
        mnemonic: Mnemonic,
        mode: AddrMode,
    },
    ByteRange,
    WordRange,
    TooManyValues {
        max: usize,
    },
    Arena(ArenaError),
    Nom(ErrorKind),
}

impl Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseErrorKind::EmptyLine => write!(f, "empty line"),
            ParseErrorKind::CommentSpacing => write!(f, "comment must have space after ;"),
            ParseErrorKind::TooManyFields => write!(f, "too long; expect at most \"label inst op\""),
            ParseErrorKind::UnknownInstruction { name, suggestion: Some(m) } => {
                write!(f, "unknown instruction '{}' (did you mean {}?)", name, m)
            }
            ParseErrorKind::UnknownInstruction { name, suggestion: None } => {
                write!(f, "unknown instruction '{}'", name)
            }
            ParseErrorKind::UnknownPragma(name) => write!(f, "unknown pragma '{}'", name),
            ParseErrorKind::LabelSyntax(text) => write!(f, "'{}' does not have label syntax", text),
            ParseErrorKind::ReservedWord(text) => {
                write!(f, "'{}' is a reserved word (or hex lookalike)", text)
            }
            ParseErrorKind::LabelMissing => write!(f, "label missing"),
            ParseErrorKind::OperandMissing => write!(f, "operand missing"),
            ParseErrorKind::OperandSyntax(text) => {
                write!(f, "unknown addressing mode syntax '{}'", text)
            }
            ParseErrorKind::AddressingMode { mnemonic, mode } => {
                write!(f, "{} does not have addressing mode {}", mnemonic, mode)
            }
            ParseErrorKind::ByteRange => write!(f, "must be 00..FF"),
            ParseErrorKind::WordRange => write!(f, "must be 0000..FFFF"),
            ParseErrorKind::TooManyValues { max } => write!(f, "too many values (max {})", max),
            ParseErrorKind::Arena(err) => write!(f, "{}", err),
            ParseErrorKind::Nom(_) => write!(f, "unexpected input"),
        }
    }
}

/// Error of the line parser: the reason plus the stack of contexts it bubbled through.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub context: Vec<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            context: Vec::new(),
        }
    }
}

impl From<ParseErrorKind> for ParseError {
    fn from(kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind)
    }
}

impl From<ArenaError> for ParseError {
    fn from(err: ArenaError) -> ParseError {
        ParseError::new(ParseErrorKind::Arena(err))
    }
}

pub trait ErrorExt {
    fn context<T>(self, ctx: T) -> Self
    where
        T: Into<String>;
}

impl<R> ErrorExt for Result<R, ParseError> {
    fn context<T>(mut self, ctx: T) -> Self
    where
        T: Into<String>,
    {
        if let Err(ref mut err) = self {
            err.context.push(ctx.into());
        }

        self
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.context.is_empty() {
            return write!(f, "{}", self.kind);
        }

        let ctx = self.context.iter().rev().join(": ");

        write!(f, "{}: {}", ctx, self.kind)
    }
}

impl nom::error::ParseError<&str> for ParseError {
    fn from_error_kind(_input: &str, kind: ErrorKind) -> Self {
        ParseError::new(ParseErrorKind::Nom(kind))
    }

    fn append(_input: &str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    fn add_context(_input: &str, ctx: &'static str, mut other: Self) -> Self {
        other.context.push(ctx.to_string());
        other
    }
}

/// Errors of the line store editing operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramError {
    /// The line store is at capacity.
    OutOfLines { capacity: usize },
    NoSuchLine { line: usize, len: usize },
    /// `last` precedes `first`.
    BadRange { first: usize, last: usize },
    /// The move target lies inside the moved range.
    MoveIntoRange { before: usize },
    /// Moving a range to just before the line that already follows it.
    MoveToSameLocation,
    Parse(ParseError),
}

impl From<ParseError> for ProgramError {
    fn from(err: ParseError) -> ProgramError {
        ProgramError::Parse(err)
    }
}

impl Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProgramError::OutOfLines { capacity } => {
                write!(f, "out of line memory ({} lines)", capacity)
            }
            ProgramError::NoSuchLine { line, len } => {
                write!(f, "line {:03X} does not exist (program has {} lines)", line, len)
            }
            ProgramError::BadRange { first, last } => {
                write!(f, "line {:03X} is less than line {:03X}", last, first)
            }
            ProgramError::MoveIntoRange { before } => {
                write!(f, "can not move to {:03X}, it is within the moved lines", before)
            }
            ProgramError::MoveToSameLocation => write!(f, "move to same location ignored"),
            ProgramError::Parse(err) => write!(f, "{}", err),
        }
    }
}

/// Errors of the emitters.
#[derive(Debug, Clone, PartialEq)]
pub enum EmitError {
    /// Listing and install need an error-free compile.
    CompileErrors { errors: usize },
    /// The memory refused a write.
    Memory { address: u16, message: String },
}

impl Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EmitError::CompileErrors { errors } => {
                write!(f, "program has {} compile error(s)", errors)
            }
            EmitError::Memory { address, message } => {
                write!(f, "write to {:04X} failed: {}", address, message)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// A compile-time error or warning, or a non-fatal remark of the line parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Index of the offending line in the line store, if the diagnostic concerns one.
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn error<S: Into<String>>(line: Option<usize>, message: S) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            line,
            message: message.into(),
        }
    }

    pub fn warning<S: Into<String>>(line: Option<usize>, message: S) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            line,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        };

        match self.line {
            Some(line) => write!(f, "{}: line {:03X}: {}", severity, line, self.message),
            None => write!(f, "{}: {}", severity, self.message),
        }
    }
}
