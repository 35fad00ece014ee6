use std::fmt;
use std::io;

/// What went wrong on a particular source line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    DuplicateSymbol,
    InvalidOpcode,
    InvalidOperand,
    RequiredOneOperand,
    RequiredTwoOperands,
}

impl ErrorKind {
    fn message(self) -> &'static str {
        match self {
            ErrorKind::DuplicateSymbol => "duplicate symbol",
            ErrorKind::InvalidOpcode => "invalid opcode",
            ErrorKind::InvalidOperand => "invalid operand",
            ErrorKind::RequiredOneOperand => "one operand is required by",
            ErrorKind::RequiredTwoOperands => "two operands are required by",
        }
    }
}

/// A diagnostic tied to a source line: the kind, the line number and the
/// token that triggered it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineError {
    pub kind: ErrorKind,
    pub line: u32,
    pub keyword: String,
}

impl LineError {
    pub fn new(kind: ErrorKind, line: u32, keyword: &str) -> LineError {
        LineError {
            kind,
            line,
            keyword: keyword.to_owned(),
        }
    }
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "line {}: {} '{}'",
            self.line,
            self.kind.message(),
            self.keyword
        )
    }
}

#[derive(Debug)]
pub enum Error {
    Line(LineError),
    EndNotFound,
    NotAsmFile(String),
    MissingSource(String),
    CreateOutput(String),
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Line(err) => write!(f, "{}", err),
            Error::EndNotFound => write!(f, "END mnemonic is not found"),
            Error::NotAsmFile(name) => write!(f, "'{}' is not .asm file", name),
            Error::MissingSource(name) => write!(f, "there is no such file '{}'", name),
            Error::CreateOutput(name) => write!(f, "cannot create '{}' file", name),
            Error::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<LineError> for Error {
    fn from(err: LineError) -> Error {
        Error::Line(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
