use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedInput,
    UnexpectedEndOfStream,
    StructuralError,
    PathTypeMismatch,
    InvalidPattern,
    Io,
    Deserialize,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MalformedInput => "malformed input",
            ErrorKind::UnexpectedEndOfStream => "unexpected end of stream",
            ErrorKind::StructuralError => "structural error",
            ErrorKind::PathTypeMismatch => "path type mismatch",
            ErrorKind::InvalidPattern => "invalid pattern",
            ErrorKind::Io => "io error",
            ErrorKind::Deserialize => "deserialize error",
        };
        f.write_str(name)
    }
}

/// Where an error was detected. Lines and columns start at 1; `offset` is
/// the byte position from the start of the input when known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub offset: Option<u64>,
    pub line: u64,
    pub column: u64,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}{}", location_suffix(.location))]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<Location>,
}

fn location_suffix(location: &Option<Location>) -> String {
    match location {
        Some(location) => format!(" at {location}"),
        None => String::new(),
    }
}

impl Error {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedInput, message)
    }

    pub fn unexpected_end(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnexpectedEndOfStream, message)
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StructuralError, message)
    }

    pub fn path_type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PathTypeMismatch, message)
    }

    pub fn invalid_pattern(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPattern, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn deserialize(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Deserialize, message)
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_path_type_mismatch(&self) -> bool {
        self.kind == ErrorKind::PathTypeMismatch
    }
}
