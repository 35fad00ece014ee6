use std::fmt;
use std::io;

use sicobj::RecordError;
use sicvm::memory::MemError;

#[derive(Debug)]
pub enum Error {
    MissingFile(String),
    Io(io::Error),
    Record {
        file: String,
        line: usize,
        source: RecordError,
    },
    MissingHeader {
        file: String,
    },
    DuplicateSymbol {
        name: String,
    },
    UnresolvedSymbol {
        name: String,
    },
    InvalidReference {
        number: u8,
    },
    Memory(MemError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingFile(name) => write!(f, "there is no such file '{}'", name),
            Error::Io(err) => write!(f, "{}", err),
            Error::Record { file, line, source } => {
                write!(f, "{}: line {}: {}", file, line, source)
            }
            Error::MissingHeader { file } => {
                write!(f, "{}: header record is not found", file)
            }
            Error::DuplicateSymbol { name } => {
                write!(f, "external symbol '{}' is already defined", name)
            }
            Error::UnresolvedSymbol { name } => {
                write!(f, "cannot resolve external symbol '{}'", name)
            }
            Error::InvalidReference { number } => {
                write!(f, "invalid reference number '{:02}'", number)
            }
            Error::Memory(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<MemError> for Error {
    fn from(err: MemError) -> Error {
        Error::Memory(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
