use std::{fmt, panic::Location, sync::Arc};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{DecodeError, ErrorExt, StatusCode};

/// Ошибка прикладного уровня: корневая причина и цепочка контекстов,
/// добавленных по пути вверх (`"dump" → "record 3"`).
#[derive(Clone)]
pub struct StackError {
    root: Arc<dyn ErrorExt>,
    contexts: Vec<ErrorContext>,
}

/// Одно звено цепочки: сообщение и место, где оно добавлено.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub message: String,
    pub location: &'static Location<'static>,
}

/// Машиночитаемый отчёт об ошибке (для JSON-вывода CLI).
#[cfg(feature = "serde")]
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: u32,
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<String>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StackError {
    pub fn new<E: ErrorExt>(err: E) -> Self {
        Self {
            root: Arc::new(err),
            contexts: Vec::new(),
        }
    }

    /// Добавляет звено контекста; место вызова запоминается.
    #[track_caller]
    pub fn context(
        mut self,
        msg: impl Into<String>,
    ) -> Self {
        self.contexts.push(ErrorContext {
            message: msg.into(),
            location: Location::caller(),
        });
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.root.status_code()
    }

    pub fn client_message(&self) -> String {
        self.root.client_message()
    }

    pub fn root(&self) -> &dyn ErrorExt {
        self.root.as_ref()
    }

    /// Контексты в порядке добавления (от внутреннего к внешнему).
    pub fn contexts(&self) -> &[ErrorContext] {
        &self.contexts
    }

    pub fn downcast_ref<T: ErrorExt>(&self) -> Option<&T> {
        self.root.as_any().downcast_ref::<T>()
    }

    /// Смещение в сообщении, если корневая причина - ошибка декодирования.
    pub fn decode_offset(&self) -> Option<usize> {
        self.downcast_ref::<DecodeError>().map(DecodeError::offset)
    }

    /// Код завершения процесса для этой ошибки.
    pub fn exit_code(&self) -> u8 {
        self.status_code().exit_code()
    }

    #[cfg(feature = "serde")]
    pub fn to_report(&self) -> ErrorReport {
        let code = self.status_code();
        ErrorReport {
            code: code.code(),
            status: format!("{code:?}"),
            message: self.client_message(),
            offset: self.decode_offset(),
            contexts: self.contexts.iter().map(|c| c.message.clone()).collect(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StackError
////////////////////////////////////////////////////////////////////////////////

impl fmt::Debug for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let contexts: Vec<String> = self
            .contexts
            .iter()
            .map(|c| format!("{} ({}:{})", c.message, c.location.file(), c.location.line()))
            .collect();
        f.debug_struct("StackError")
            .field("root", &self.root.to_string())
            .field("status_code", &self.status_code())
            .field("contexts", &contexts)
            .finish()
    }
}

/// Внешние контексты идут первыми: `dump → record 3: malformed ...`.
impl fmt::Display for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for ctx in self.contexts.iter().rev() {
            write!(f, "{}: ", ctx.message)?;
        }
        write!(f, "{}", self.root)
    }
}

impl std::error::Error for StackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.root.as_ref())
    }
}

impl<E: ErrorExt> From<E> for StackError {
    fn from(e: E) -> Self {
        StackError::new(e)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
