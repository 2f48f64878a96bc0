pub mod codec;

use std::{fmt, io};

pub use codec::*;

use crate::{ErrorExt, StackError, StatusCode};

/// Ошибка без собственного типа: код и готовое сообщение. Её строят
/// `bail!` и `ensure!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericError {
    status: StatusCode,
    message: String,
}

impl GenericError {
    pub fn new(
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for GenericError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GenericError {}

impl ErrorExt for GenericError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Ошибки файловой системы CLI: вид ошибки определяет статус.
impl From<io::Error> for StackError {
    fn from(err: io::Error) -> Self {
        let status = match err.kind() {
            io::ErrorKind::NotFound => StatusCode::NotFound,
            io::ErrorKind::PermissionDenied => StatusCode::PermissionDenied,
            io::ErrorKind::UnexpectedEof => StatusCode::UnexpectedEof,
            _ => StatusCode::Io,
        };
        StackError::new(GenericError::new(status, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_error_display_is_message() {
        let err = GenericError::new(StatusCode::InvalidArgs, "preview_bytes must be a number");
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
        assert_eq!(err.to_string(), err.message());
    }

    #[test]
    fn test_io_error_status() {
        let cases = [
            (io::ErrorKind::NotFound, StatusCode::NotFound),
            (io::ErrorKind::PermissionDenied, StatusCode::PermissionDenied),
            (io::ErrorKind::UnexpectedEof, StatusCode::UnexpectedEof),
            (io::ErrorKind::WriteZero, StatusCode::Io),
        ];
        for (kind, status) in cases {
            let err = StackError::from(io::Error::new(kind, "message.bin"));
            assert_eq!(err.status_code(), status, "{kind:?}");
            assert!(err.to_string().contains("message.bin"));
        }
    }
}
