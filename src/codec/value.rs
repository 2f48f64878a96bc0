//! Кодек полезной нагрузки скаляров и элементов массивов.
//!
//! Целые и `Double` фиксированной ширины пишутся в little-endian через
//! `byteorder`. String/Binary: ULEB128-длина и сырые байты. LebInt: SLEB128.

use std::fmt;

use bflat_error::DecodeError;
use byteorder::{ByteOrder, LittleEndian};
use serde::{ser::SerializeMap, Serialize, Serializer};

use super::{
    value_type::ValueType,
    varint::{
        decode_sleb128, decode_uleb128, encode_sleb128, encode_uleb128, max_sleb128_size,
        max_uleb128_size,
    },
};

/// Одно декодированное значение. Строки и бинарные данные заимствуются из
/// исходного буфера.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Null,
    String(&'a [u8]),
    Binary(&'a [u8]),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Double(f64),
    DateTime(i64),
    LebInt(i64),
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<'a> Scalar<'a> {
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::String(_) => ValueType::String,
            Self::Binary(_) => ValueType::Binary,
            Self::Int8(_) => ValueType::Int8,
            Self::Int16(_) => ValueType::Int16,
            Self::Int32(_) => ValueType::Int32,
            Self::Int64(_) => ValueType::Int64,
            Self::Double(_) => ValueType::Double,
            Self::DateTime(_) => ValueType::DateTime,
            Self::LebInt(_) => ValueType::LebInt,
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Любое целое (включая DateTime и LebInt), расширенное до `i64`.
    pub const fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int8(v) => Some(v as i64),
            Self::Int16(v) => Some(v as i64),
            Self::Int32(v) => Some(v as i64),
            Self::Int64(v) | Self::DateTime(v) | Self::LebInt(v) => Some(v),
            _ => None,
        }
    }

    /// `Double` как есть, целые конвертируются.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Double(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    /// Сырые байты String/Binary.
    pub const fn as_bytes(&self) -> Option<&'a [u8]> {
        match *self {
            Self::String(b) | Self::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// String/Binary как `&str`, если байты являются корректным UTF-8.
    pub fn as_str(&self) -> Option<&'a str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }
}

/// Верхняя граница размера полезной нагрузки.
///
/// `payload_len` учитывается только для String/Binary.
pub const fn max_payload_size(
    value_type: ValueType,
    payload_len: usize,
) -> usize {
    match value_type {
        ValueType::String | ValueType::Binary => max_uleb128_size() + payload_len,
        ValueType::LebInt => max_sleb128_size(),
        ValueType::Null => 0,
        ValueType::Int8 => 1,
        ValueType::Int16 => 2,
        ValueType::Int32 => 4,
        ValueType::Int64 | ValueType::Double | ValueType::DateTime => 8,
    }
}

/// Записывает полезную нагрузку `value` в начало `out`.
///
/// `out` должен вмещать [`max_payload_size`] байт для типа значения.
pub fn encode_scalar(
    out: &mut [u8],
    value: &Scalar<'_>,
) -> usize {
    match *value {
        Scalar::Null => 0,
        Scalar::String(b) | Scalar::Binary(b) => encode_bytes(out, b),
        Scalar::Int8(v) => {
            out[0] = v as u8;
            1
        }
        Scalar::Int16(v) => {
            LittleEndian::write_i16(&mut out[..2], v);
            2
        }
        Scalar::Int32(v) => {
            LittleEndian::write_i32(&mut out[..4], v);
            4
        }
        Scalar::Int64(v) | Scalar::DateTime(v) => {
            LittleEndian::write_i64(&mut out[..8], v);
            8
        }
        Scalar::Double(v) => {
            LittleEndian::write_f64(&mut out[..8], v);
            8
        }
        Scalar::LebInt(v) => encode_sleb128(v, out),
    }
}

/// ULEB128-длина и сами байты.
pub fn encode_bytes(
    out: &mut [u8],
    bytes: &[u8],
) -> usize {
    let pos = encode_uleb128(bytes.len() as u64, out);
    out[pos..pos + bytes.len()].copy_from_slice(bytes);
    pos + bytes.len()
}

/// Разбирает одну полезную нагрузку типа `value_type` из начала `bytes`.
///
/// Возвращает значение и число прочитанных байт. Смещение в ошибке
/// отсчитывается от начала `bytes`.
pub fn decode_scalar(
    value_type: ValueType,
    bytes: &[u8],
) -> Result<(Scalar<'_>, usize), DecodeError> {
    match value_type {
        ValueType::String => {
            decode_bytes(bytes, "string value").map(|(b, n)| (Scalar::String(b), n))
        }
        ValueType::Binary => {
            decode_bytes(bytes, "binary value").map(|(b, n)| (Scalar::Binary(b), n))
        }
        ValueType::LebInt => decode_sleb128(bytes)
            .map(|(v, n)| (Scalar::LebInt(v), n))
            .map_err(|_| DecodeError::format("leb128 value", 0)),
        fixed => {
            let width = max_payload_size(fixed, 0);
            if bytes.len() < width {
                return Err(DecodeError::format(payload_context(fixed), 0));
            }
            Ok((read_fixed(fixed, &bytes[..width]), width))
        }
    }
}

/// Строка или бинарные данные с префиксом длины.
pub fn decode_bytes<'a>(
    bytes: &'a [u8],
    context: &'static str,
) -> Result<(&'a [u8], usize), DecodeError> {
    let (len, used) = decode_uleb128(bytes).map_err(|_| DecodeError::format(context, 0))?;
    let end = usize::try_from(len)
        .ok()
        .and_then(|len| used.checked_add(len))
        .filter(|&end| end <= bytes.len())
        .ok_or(DecodeError::format(context, used))?;
    Ok((&bytes[used..end], end))
}

/// Интерпретирует ровно `fixed_width()` байт как значение типа `value_type`.
///
/// Для типов переменной длины возвращает `Scalar::Null`, вызывающий код
/// проверяет тип заранее.
pub(crate) fn read_fixed(
    value_type: ValueType,
    raw: &[u8],
) -> Scalar<'_> {
    match value_type {
        ValueType::Int8 => Scalar::Int8(raw[0] as i8),
        ValueType::Int16 => Scalar::Int16(LittleEndian::read_i16(raw)),
        ValueType::Int32 => Scalar::Int32(LittleEndian::read_i32(raw)),
        ValueType::Int64 => Scalar::Int64(LittleEndian::read_i64(raw)),
        ValueType::DateTime => Scalar::DateTime(LittleEndian::read_i64(raw)),
        ValueType::Double => Scalar::Double(LittleEndian::read_f64(raw)),
        ValueType::Null | ValueType::String | ValueType::Binary | ValueType::LebInt => {
            Scalar::Null
        }
    }
}

pub(crate) const fn payload_context(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Null => "null value",
        ValueType::String => "string value",
        ValueType::Binary => "binary value",
        ValueType::Int8 => "int8 value",
        ValueType::Int16 => "int16 value",
        ValueType::Int32 => "int32 value",
        ValueType::Int64 => "int64 value",
        ValueType::Double => "double value",
        ValueType::DateTime => "datetime value",
        ValueType::LebInt => "leb128 value",
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for Scalar<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::String(b) | Self::Binary(b) => write!(f, "\"{}\"", String::from_utf8_lossy(b)),
            Self::Double(v) => write!(f, "{v}"),
            other => match other.as_i64() {
                Some(v) => write!(f, "{v}"),
                None => Ok(()),
            },
        }
    }
}

/// JSON-представление: строки как строки, бинарные данные как
/// `{"hex": "..."}`, числа как числа.
impl Serialize for Scalar<'_> {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match *self {
            Self::Null => serializer.serialize_unit(),
            Self::String(b) => serializer.serialize_str(&String::from_utf8_lossy(b)),
            Self::Binary(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02x}")).collect();
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("hex", &hex)?;
                map.end()
            }
            Self::Double(v) => serializer.serialize_f64(v),
            Self::Int8(v) => serializer.serialize_i8(v),
            Self::Int16(v) => serializer.serialize_i16(v),
            Self::Int32(v) => serializer.serialize_i32(v),
            Self::Int64(v) | Self::DateTime(v) | Self::LebInt(v) => serializer.serialize_i64(v),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
