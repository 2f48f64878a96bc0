//! Коды типов значений и раскладка байта заголовка.
//!
//! ```text
//!  bit 7   bits 6..3   bits 2..0
//! +-----+-----------+-----------+
//! |array|   type    | tag length|   0 = длина тега идёт отдельным varint
//! +-----+-----------+-----------+
//! ```

use std::fmt;

use num_enum::TryFromPrimitive;
use serde::Serialize;

/// Флаг "значение является массивом".
pub const ARRAY_FLAG: u8 = 0x80;
/// Сдвиг кода типа внутри заголовка.
pub const TYPE_SHIFT: u8 = 3;
/// Маска кода типа после сдвига.
pub const TYPE_MASK: u8 = 0x0F;
/// Маска встроенной длины тега.
pub const TAG_LENGTH_MASK: u8 = 0x07;
/// Имена короче этого значения кодируются прямо в заголовке.
pub const MAX_INLINE_TAG_LEN: usize = 8;

/// Тип значения BFlat (4-битный код).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ValueType {
    Null = 0x0,
    String = 0x1,
    Binary = 0x2,
    Int8 = 0x3,
    Int16 = 0x4,
    Int32 = 0x5,
    Int64 = 0x6,
    Double = 0x7,
    DateTime = 0x8,
    #[serde(rename = "leb128")]
    LebInt = 0x9,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ValueType {
    /// Все типы в порядке кодов.
    pub const ALL: [ValueType; 10] = [
        Self::Null,
        Self::String,
        Self::Binary,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Double,
        Self::DateTime,
        Self::LebInt,
    ];

    /// 4-битный код типа.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Ширина полезной нагрузки для типов фиксированного размера.
    ///
    /// `None` для String/Binary/LebInt: их длина известна только после
    /// разбора.
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            Self::Null => Some(0),
            Self::Int8 => Some(1),
            Self::Int16 => Some(2),
            Self::Int32 => Some(4),
            Self::Int64 | Self::Double | Self::DateTime => Some(8),
            Self::String | Self::Binary | Self::LebInt => None,
        }
    }

    /// Строка или бинарные данные с префиксом длины.
    pub const fn is_length_prefixed(self) -> bool {
        matches!(self, Self::String | Self::Binary)
    }

    /// Целочисленный тип (включая DateTime и LebInt).
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 | Self::DateTime | Self::LebInt
        )
    }

    /// Имя типа для вывода и разбора аргументов CLI.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String => "string",
            Self::Binary => "binary",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Double => "double",
            Self::DateTime => "datetime",
            Self::LebInt => "leb128",
        }
    }

    /// Обратное к [`ValueType::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// Собирает байт заголовка. `inline_len` должен быть меньше 8 (0 означает
/// внешнюю длину).
#[inline]
pub const fn make_header(
    value_type: ValueType,
    is_array: bool,
    inline_len: u8,
) -> u8 {
    let array = if is_array { ARRAY_FLAG } else { 0 };
    array | (value_type.code() << TYPE_SHIFT) | (inline_len & TAG_LENGTH_MASK)
}

/// Разбирает байт заголовка на (флаг массива, сырой код типа, встроенная
/// длина тега). Код типа не проверяется.
#[inline]
pub const fn split_header(header: u8) -> (bool, u8, u8) {
    (
        header & ARRAY_FLAG != 0,
        (header >> TYPE_SHIFT) & TYPE_MASK,
        header & TAG_LENGTH_MASK,
    )
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for ValueType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
