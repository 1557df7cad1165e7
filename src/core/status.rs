//! Status codes shared by every backend and by the dispatcher.

use std::fmt;
use std::io;

/// Canonical status codes.
///
/// The set is closed: backends map their native errors onto it, and callers
/// compare against it. `Ok` never appears inside a [`Status`]; it is what
/// [`Code::of`] reports for a successful result.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Code {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl Code {
    /// Returns the code carried by `result`, `Code::Ok` on success.
    pub fn of<T>(result: &std::result::Result<T, Status>) -> Code {
        match result {
            Ok(_) => Code::Ok,
            Err(status) => status.code(),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Code::Ok => "OK",
            Code::Cancelled => "CANCELLED",
            Code::Unknown => "UNKNOWN",
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Code::NotFound => "NOT_FOUND",
            Code::AlreadyExists => "ALREADY_EXISTS",
            Code::PermissionDenied => "PERMISSION_DENIED",
            Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Code::FailedPrecondition => "FAILED_PRECONDITION",
            Code::Aborted => "ABORTED",
            Code::OutOfRange => "OUT_OF_RANGE",
            Code::Unimplemented => "UNIMPLEMENTED",
            Code::Internal => "INTERNAL",
            Code::Unavailable => "UNAVAILABLE",
            Code::DataLoss => "DATA_LOSS",
            Code::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-OK outcome of a backend or dispatcher operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Status {
    code: Code,
    message: String,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Status {
        Status {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Status {
        Status::new(Code::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Status {
        Status::new(Code::AlreadyExists, message)
    }

    pub fn failed_precondition(message: impl Into<String>) -> Status {
        Status::new(Code::FailedPrecondition, message)
    }

    pub fn unimplemented(message: impl Into<String>) -> Status {
        Status::new(Code::Unimplemented, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Status {
        Status::new(Code::InvalidArgument, message)
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prefixes the message with `context`, keeping the code.
    pub fn context(self, context: impl fmt::Display) -> Status {
        Status {
            code: self.code,
            message: format!("{}: {}", context, self.message),
        }
    }
}

impl From<io::Error> for Status {
    fn from(err: io::Error) -> Self {
        let code = match err.kind() {
            io::ErrorKind::NotFound => Code::NotFound,
            io::ErrorKind::AlreadyExists => Code::AlreadyExists,
            io::ErrorKind::IsADirectory
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::DirectoryNotEmpty => Code::FailedPrecondition,
            io::ErrorKind::PermissionDenied => Code::PermissionDenied,
            io::ErrorKind::Unsupported => Code::Unimplemented,
            io::ErrorKind::InvalidInput => Code::InvalidArgument,
            _ => Code::Unknown,
        };
        Status::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_of_result() {
        let ok: std::result::Result<(), Status> = Ok(());
        assert_eq!(Code::of(&ok), Code::Ok);

        let err: std::result::Result<(), Status> = Err(Status::not_found("gone"));
        assert_eq!(Code::of(&err), Code::NotFound);
    }

    #[test]
    fn test_display() {
        let status = Status::already_exists("/a_dir");
        assert_eq!(status.to_string(), "ALREADY_EXISTS: /a_dir");
    }

    #[test]
    fn test_context_keeps_code() {
        let status = Status::failed_precondition("is a directory").context("/a_file");
        assert_eq!(status.code(), Code::FailedPrecondition);
        assert_eq!(status.message(), "/a_file: is a directory");
    }

    #[test]
    fn test_from_io_error() {
        let cases = [
            (io::ErrorKind::NotFound, Code::NotFound),
            (io::ErrorKind::AlreadyExists, Code::AlreadyExists),
            (io::ErrorKind::IsADirectory, Code::FailedPrecondition),
            (io::ErrorKind::NotADirectory, Code::FailedPrecondition),
            (io::ErrorKind::PermissionDenied, Code::PermissionDenied),
            (io::ErrorKind::Unsupported, Code::Unimplemented),
            (io::ErrorKind::TimedOut, Code::Unknown),
        ];
        for (kind, code) in cases {
            let status: Status = io::Error::from(kind).into();
            assert_eq!(status.code(), code, "{:?}", kind);
        }
    }
}
