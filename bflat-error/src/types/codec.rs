use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибка разбора сообщения BFlat.
///
/// `offset` отсчитывается от начала буфера, переданного декодеру. Нижние
/// уровни (varint, тег, значение) сообщают смещение относительно своего
/// среза, а вызывающий код сдвигает его через [`DecodeError::with_offset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Структурное нарушение: усечённый varint, недостаточно байт под
    /// значение, неизвестный тип, некорректная длина массива.
    #[error("malformed {context} at byte {offset}")]
    Format {
        context: &'static str,
        offset: usize,
    },

    /// Заголовок или имя тега не помещаются в оставшиеся байты.
    #[error("invalid tag at byte {offset}")]
    Tag { offset: usize },
}

/// Ошибка записи сообщения.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Аллокатор отказал в выделении памяти под буфер.
    #[error("failed to allocate {requested} bytes for output buffer")]
    Allocation { requested: usize },

    /// Требуемая ёмкость не представима в `usize`.
    #[error("output buffer capacity overflow: {length} + {additional} bytes")]
    CapacityOverflow { length: usize, additional: usize },
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl DecodeError {
    /// Ошибка формата в позиции `offset`.
    pub const fn format(
        context: &'static str,
        offset: usize,
    ) -> Self {
        Self::Format { context, offset }
    }

    /// Смещение, на котором обнаружена ошибка.
    pub const fn offset(&self) -> usize {
        match self {
            Self::Format { offset, .. } | Self::Tag { offset } => *offset,
        }
    }

    /// Переносит смещение в систему координат внешнего буфера.
    pub fn with_offset(
        self,
        base: usize,
    ) -> Self {
        match self {
            Self::Format { context, offset } => Self::Format {
                context,
                offset: offset.saturating_add(base),
            },
            Self::Tag { offset } => Self::Tag {
                offset: offset.saturating_add(base),
            },
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl ErrorExt for DecodeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Format { .. } => StatusCode::DecodingError,
            Self::Tag { .. } => StatusCode::InvalidTag,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ErrorExt for EncodeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Allocation { .. } => StatusCode::SerializationFailed,
            Self::CapacityOverflow { .. } => StatusCode::SizeLimit,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn client_message(&self) -> String {
        match self {
            Self::Allocation { .. } => "Out of memory while encoding".to_string(),
            Self::CapacityOverflow { .. } => self.to_string(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
