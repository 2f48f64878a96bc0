//! Разбор одной записи: заголовок, тег и либо скалярное значение, либо
//! количество элементов массива.

use bflat_error::DecodeError;

use super::{
    tag::{decode_tag, Tag},
    value::{decode_scalar, Scalar},
    value_type::{split_header, ValueType},
    varint::decode_uleb128,
};

/// Что следует за тегом.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordBody<'a> {
    Scalar(Scalar<'a>),
    /// Элементы не разобраны, известно только их количество.
    Array { count: u64 },
}

/// Результат [`decode_record`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordHeader<'a> {
    pub tag: Tag<'a>,
    pub value_type: ValueType,
    pub body: RecordBody<'a>,
    /// Байтовая длина для String/Binary/LebInt, ширина для остальных
    /// скаляров, количество элементов для массивов.
    pub length: u64,
}

impl RecordHeader<'_> {
    pub const fn is_array(&self) -> bool {
        matches!(self.body, RecordBody::Array { .. })
    }
}

/// Разбирает одну запись в начале `bytes`.
///
/// Для массива читаются только заголовок, тег и varint-количество; тело
/// массива остаётся непрочитанным. Возвращает запись и число прочитанных
/// байт. Ошибки тега дают `DecodeError::Tag`, всё остальное
/// `DecodeError::Format`; смещения отсчитываются от начала `bytes`.
pub fn decode_record(bytes: &[u8]) -> Result<(RecordHeader<'_>, usize), DecodeError> {
    let Some(&header) = bytes.first() else {
        return Err(DecodeError::Tag { offset: 0 });
    };
    let (is_array, code, _) = split_header(header);
    let value_type =
        ValueType::try_from(code).map_err(|_| DecodeError::format("value type", 0))?;

    let (tag, mut pos) = decode_tag(bytes)?;

    if is_array {
        let (count, used) = decode_uleb128(&bytes[pos..])
            .map_err(|_| DecodeError::format("array count", pos))?;
        pos += used;
        let record = RecordHeader {
            tag,
            value_type,
            body: RecordBody::Array { count },
            length: count,
        };
        return Ok((record, pos));
    }

    let payload = &bytes[pos..];
    let (scalar, used) = decode_scalar(value_type, payload).map_err(|e| e.with_offset(pos))?;
    let length = match scalar {
        Scalar::String(b) | Scalar::Binary(b) => b.len() as u64,
        _ => used as u64,
    };
    pos += used;

    let record = RecordHeader {
        tag,
        value_type,
        body: RecordBody::Scalar(scalar),
        length,
    };
    Ok((record, pos))
}

/// Измеряет тело массива из `count` элементов типа `value_type` в начале
/// `bytes`, не материализуя элементы.
///
/// Фиксированная ширина проверяется умножением, переменная обходится по
/// элементам. Тело не может выйти за пределы `bytes`.
pub fn array_body_len(
    value_type: ValueType,
    count: u64,
    bytes: &[u8],
) -> Result<usize, DecodeError> {
    if let Some(width) = value_type.fixed_width() {
        return usize::try_from(count)
            .ok()
            .and_then(|count| count.checked_mul(width))
            .filter(|&len| len <= bytes.len())
            .ok_or(DecodeError::format("array body", 0));
    }

    // Каждый элемент переменной длины занимает хотя бы один байт.
    if count > bytes.len() as u64 {
        return Err(DecodeError::format("array body", 0));
    }

    let mut pos = 0;
    for _ in 0..count {
        let (_, used) =
            decode_scalar(value_type, &bytes[pos..]).map_err(|e| e.with_offset(pos))?;
        pos += used;
    }
    Ok(pos)
}
