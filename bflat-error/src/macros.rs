use crate::StackError;

/// Возвращает `Err(StackError)` из текущей функции.
///
/// `bail!(err)` принимает любую ошибку с `ErrorExt`; `bail!(code, "fmt", args..)`
/// строит `GenericError` с кодом и сообщением.
#[macro_export]
macro_rules! bail {
    ($code:expr, $($fmt:tt)+) => {
        return ::core::result::Result::Err($crate::StackError::new(
            $crate::types::GenericError::new($code, format!($($fmt)+)),
        ))
    };
    ($err:expr $(,)?) => {
        return ::core::result::Result::Err($crate::StackError::from($err))
    };
}

/// `bail!`, если условие ложно.
///
/// ```
/// use bflat_error::{ensure, BflatResult, StatusCode};
///
/// fn check_count(count: u64, available: usize) -> BflatResult<()> {
///     ensure!(
///         count <= available as u64,
///         StatusCode::SizeLimit,
///         "array of {} elements in {} bytes",
///         count,
///         available
///     );
///     Ok(())
/// }
///
/// assert!(check_count(2, 8).is_ok());
/// assert!(check_count(9, 8).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($rest:tt)+) => {
        if !($cond) {
            $crate::bail!($($rest)+);
        }
    };
}

/// Добавление контекста к любому `Result`, ошибка которого превращается в
/// `StackError`.
pub trait ResultExt<T> {
    fn context(
        self,
        msg: impl Into<String>,
    ) -> Result<T, StackError>;

    /// Сообщение строится только при ошибке.
    fn with_context<M: Into<String>>(
        self,
        msg: impl FnOnce() -> M,
    ) -> Result<T, StackError>;
}

impl<T, E: Into<StackError>> ResultExt<T> for Result<T, E> {
    #[track_caller]
    fn context(
        self,
        msg: impl Into<String>,
    ) -> Result<T, StackError> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().context(msg)),
        }
    }

    #[track_caller]
    fn with_context<M: Into<String>>(
        self,
        msg: impl FnOnce() -> M,
    ) -> Result<T, StackError> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().context(msg())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BflatResult, DecodeError, StatusCode};

    fn read_tag(bytes: &[u8]) -> BflatResult<u8> {
        let Some(&first) = bytes.first() else {
            bail!(DecodeError::Tag { offset: 0 });
        };
        ensure!(first & 0x07 != 0, StatusCode::Unsupported, "overflow tag length");
        ensure!(
            bytes.len() > usize::from(first & 0x07),
            StatusCode::DecodingError,
            "tag of {} bytes, {} available",
            first & 0x07,
            bytes.len() - 1
        );
        Ok(first & 0x07)
    }

    #[test]
    fn test_bail_with_error_value() {
        let err = read_tag(&[]).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidTag);
        assert_eq!(err.decode_offset(), Some(0));
    }

    #[test]
    fn test_ensure_forms() {
        assert_eq!(read_tag(&[0x2B, b'f', b'o', b'o']).unwrap(), 3);
        assert_eq!(
            read_tag(&[0x28]).unwrap_err().status_code(),
            StatusCode::Unsupported
        );

        let err = read_tag(&[0x2B, b'f']).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::DecodingError);
        assert_eq!(err.to_string(), "tag of 3 bytes, 1 available");
    }

    #[test]
    fn test_result_ext_context() {
        let r: Result<(), DecodeError> = Err(DecodeError::format("varint", 2));
        let err = r.context("record 5").unwrap_err();
        assert_eq!(err.contexts()[0].message, "record 5");
        assert_eq!(err.to_string(), "record 5: malformed varint at byte 2");
    }

    #[test]
    fn test_with_context_is_lazy() {
        let mut built = false;
        let ok: Result<u8, DecodeError> = Ok(1);
        let value = ok
            .with_context(|| {
                built = true;
                "unused"
            })
            .unwrap();
        assert_eq!(value, 1);
        assert!(!built);
    }
}
