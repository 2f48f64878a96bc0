//! Последовательное чтение сообщений BFlat без копирования.
//!
//! [`Deserializer`] держит только заимствованный срез и позицию курсора.
//! Массив возвращается целиком как [`Array`]: тело уже измерено, а курсор
//! стоит после него, поэтому недочитанный массив не ломает разбор следующей
//! записи. Элементы читаются через под-курсор [`ArrayElements`].

use std::fmt;

use bflat_error::DecodeError;
use serde::{
    ser::{Error as _, SerializeSeq, SerializeStruct},
    Serialize, Serializer as SerdeSerializer,
};
use tracing::{debug, trace};

use crate::codec::{
    array_body_len, decode_record,
    value::{decode_bytes, read_fixed},
    varint::decode_sleb128,
    RecordBody, Scalar, Tag, ValueType,
};

/// Курсор по сообщению, лежащему целиком в памяти.
///
/// ```
/// use bflat::{Deserializer, Scalar};
///
/// let data = [0x2B, b'f', b'o', b'o', 0x01, 0x00, 0x00, 0x00];
/// let mut reader = Deserializer::new(&data);
///
/// let record = reader.next_record().unwrap().unwrap();
/// assert_eq!(record.tag(), "foo");
/// assert_eq!(record.scalar(), Some(Scalar::Int32(1)));
/// assert!(reader.next_record().unwrap().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Deserializer<'a> {
    data: &'a [u8],
    pos: usize,
    poisoned: bool,
}

/// Одна запись сообщения.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record<'a> {
    offset: usize,
    tag: Tag<'a>,
    value_type: ValueType,
    value: Value<'a>,
    length: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Scalar(Scalar<'a>),
    Array(Array<'a>),
}

/// Однородный массив. Тело уже проверено на целостность при чтении записи.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Array<'a> {
    element_type: ValueType,
    count: u64,
    body: &'a [u8],
    offset: usize,
}

/// Под-курсор по элементам массива.
///
/// Итератор выдаёт элементы как [`Scalar`]. Методы `next_*` повторяют
/// покатегорийное чтение: вызов не той категории даёт
/// `DecodeError::Format`, выйти за тело массива нельзя.
#[derive(Debug, Clone)]
pub struct ArrayElements<'a> {
    element_type: ValueType,
    remaining: u64,
    body: &'a [u8],
    pos: usize,
    offset: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы Deserializer
////////////////////////////////////////////////////////////////////////////////

impl<'a> Deserializer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            poisoned: false,
        }
    }

    /// Начинает разбор нового сообщения.
    pub fn reset(
        &mut self,
        data: &'a [u8],
    ) {
        *self = Self::new(data);
    }

    /// Смещение курсора от начала сообщения.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Ещё не прочитанные байты.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn is_at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    /// Следующая запись.
    ///
    /// `Ok(None)` только если курсор ровно на конце сообщения. Усечённый или
    /// повреждённый хвост даёт ошибку; курсор при этом не сдвигается.
    pub fn next_record(&mut self) -> Result<Option<Record<'a>>, DecodeError> {
        if self.is_at_end() {
            return Ok(None);
        }

        let offset = self.pos;
        match decode_at(self.data, offset) {
            Ok((record, used)) => {
                self.pos += used;
                trace!(
                    offset,
                    tag = %record.tag,
                    value_type = %record.value_type,
                    array = record.is_array(),
                    "Decoded record"
                );
                Ok(Some(record))
            }
            Err(e) => {
                debug!(offset, error = %e, "Failed to decode record");
                Err(e)
            }
        }
    }
}

/// Разбирает запись в `data[offset..]`, включая измерение тела массива.
/// Смещения в ошибках отсчитываются от начала `data`.
fn decode_at(
    data: &[u8],
    offset: usize,
) -> Result<(Record<'_>, usize), DecodeError> {
    let rest = &data[offset..];
    let (header, mut used) = decode_record(rest).map_err(|e| e.with_offset(offset))?;

    let value = match header.body {
        RecordBody::Scalar(scalar) => Value::Scalar(scalar),
        RecordBody::Array { count } => {
            let body_len = array_body_len(header.value_type, count, &rest[used..])
                .map_err(|e| e.with_offset(offset + used))?;
            let array = Array {
                element_type: header.value_type,
                count,
                body: &rest[used..used + body_len],
                offset: offset + used,
            };
            used += body_len;
            Value::Array(array)
        }
    };

    let record = Record {
        offset,
        tag: header.tag,
        value_type: header.value_type,
        value,
        length: header.length,
    };
    Ok((record, used))
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы Record / Array / ArrayElements
////////////////////////////////////////////////////////////////////////////////

impl<'a> Record<'a> {
    /// Смещение заголовка записи от начала сообщения.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn tag(&self) -> Tag<'a> {
        self.tag
    }

    /// Тип значения, для массива тип элементов.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn is_array(&self) -> bool {
        matches!(self.value, Value::Array(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Value::Scalar(Scalar::Null))
    }

    pub fn value(&self) -> Value<'a> {
        self.value
    }

    pub fn scalar(&self) -> Option<Scalar<'a>> {
        match self.value {
            Value::Scalar(scalar) => Some(scalar),
            Value::Array(_) => None,
        }
    }

    pub fn array(&self) -> Option<Array<'a>> {
        match self.value {
            Value::Array(array) => Some(array),
            Value::Scalar(_) => None,
        }
    }

    /// Длина, зависящая от типа: байты для String/Binary/LebInt, ширина
    /// для остальных скаляров, количество элементов для массива.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.length
    }
}

impl<'a> Array<'a> {
    pub fn element_type(&self) -> ValueType {
        self.element_type
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Сырое тело массива (для фиксированной ширины: элементы подряд в
    /// little-endian).
    pub fn raw(&self) -> &'a [u8] {
        self.body
    }

    /// Элемент по индексу, `None` за пределами массива.
    ///
    /// Для фиксированной ширины доступ прямой. String, Binary и LebInt
    /// читаются от начала тела, это O(n).
    pub fn get(
        &self,
        index: usize,
    ) -> Option<Scalar<'a>> {
        if index as u64 >= self.count {
            return None;
        }
        let Some(width) = self.element_type.fixed_width() else {
            return self.elements().nth(index)?.ok();
        };
        if width == 0 {
            return Some(Scalar::Null);
        }
        let start = index.checked_mul(width)?;
        let raw = self.body.get(start..start + width)?;
        Some(read_fixed(self.element_type, raw))
    }

    pub fn elements(&self) -> ArrayElements<'a> {
        ArrayElements {
            element_type: self.element_type,
            remaining: self.count,
            body: self.body,
            pos: 0,
            offset: self.offset,
        }
    }
}

impl<'a> ArrayElements<'a> {
    /// Сколько элементов ещё не прочитано.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Сырые байты следующего элемента фиксированной ширины.
    pub fn next_fixed(&mut self) -> Result<Option<&'a [u8]>, DecodeError> {
        let Some(width) = self.element_type.fixed_width() else {
            return Err(self.wrong_category("fixed-width element"));
        };
        if self.remaining == 0 {
            return Ok(None);
        }
        let raw = self
            .body
            .get(self.pos..self.pos + width)
            .ok_or_else(|| DecodeError::format("array element", self.offset + self.pos))?;
        self.advance(width);
        Ok(Some(raw))
    }

    /// Следующая строка (байты без проверки UTF-8).
    pub fn next_string(&mut self) -> Result<Option<&'a [u8]>, DecodeError> {
        if self.element_type != ValueType::String {
            return Err(self.wrong_category("string element"));
        }
        self.next_length_prefixed("string value")
    }

    pub fn next_binary(&mut self) -> Result<Option<&'a [u8]>, DecodeError> {
        if self.element_type != ValueType::Binary {
            return Err(self.wrong_category("binary element"));
        }
        self.next_length_prefixed("binary value")
    }

    pub fn next_leb128(&mut self) -> Result<Option<i64>, DecodeError> {
        if self.element_type != ValueType::LebInt {
            return Err(self.wrong_category("leb128 element"));
        }
        if self.remaining == 0 {
            return Ok(None);
        }
        let (value, used) = decode_sleb128(&self.body[self.pos..])
            .map_err(|_| DecodeError::format("leb128 value", self.offset + self.pos))?;
        self.advance(used);
        Ok(Some(value))
    }

    /// Следующий элемент любого типа.
    pub fn next_element(&mut self) -> Result<Option<Scalar<'a>>, DecodeError> {
        match self.element_type {
            ValueType::String => Ok(self.next_string()?.map(Scalar::String)),
            ValueType::Binary => Ok(self.next_binary()?.map(Scalar::Binary)),
            ValueType::LebInt => Ok(self.next_leb128()?.map(Scalar::LebInt)),
            fixed => Ok(self.next_fixed()?.map(|raw| read_fixed(fixed, raw))),
        }
    }

    fn next_length_prefixed(
        &mut self,
        context: &'static str,
    ) -> Result<Option<&'a [u8]>, DecodeError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let (bytes, used) = decode_bytes(&self.body[self.pos..], context)
            .map_err(|e| e.with_offset(self.offset + self.pos))?;
        self.advance(used);
        Ok(Some(bytes))
    }

    fn advance(
        &mut self,
        used: usize,
    ) {
        self.pos += used;
        self.remaining -= 1;
    }

    fn wrong_category(
        &self,
        context: &'static str,
    ) -> DecodeError {
        DecodeError::format(context, self.offset + self.pos)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl<'a> Iterator for Deserializer<'a> {
    type Item = Result<Record<'a>, DecodeError>;

    /// После первой ошибки итератор больше ничего не выдаёт.
    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }
        match self.next_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.poisoned = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for Deserializer<'_> {}

impl<'a> Iterator for ArrayElements<'a> {
    type Item = Result<Scalar<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_element() {
            Ok(element) => element.map(Ok),
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (0, Some(remaining))
    }
}

impl fmt::Display for Record<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}=", self.tag)?;
        match self.value {
            Value::Scalar(scalar) => write!(f, "{scalar}"),
            Value::Array(array) => write!(f, "{array}"),
        }
    }
}

/// Массив null печатается как `[null; N]`: тело пустое, и `N` ничем не
/// ограничено.
impl fmt::Display for Array<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.element_type == ValueType::Null {
            return write!(f, "[null; {}]", self.count);
        }
        f.write_str("[")?;
        for (i, element) in self.elements().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match element {
                Ok(scalar) => write!(f, "{scalar}")?,
                Err(_) => f.write_str("?")?,
            }
        }
        f.write_str("]")
    }
}

/// Массив null сериализуется как `null`; число элементов есть в поле `len`
/// записи.
impl Serialize for Array<'_> {
    fn serialize<S: SerdeSerializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        if self.element_type == ValueType::Null {
            return serializer.serialize_none();
        }
        let len = usize::try_from(self.count).ok();
        let mut seq = serializer.serialize_seq(len)?;
        for element in self.elements() {
            let scalar = element.map_err(S::Error::custom)?;
            seq.serialize_element(&scalar)?;
        }
        seq.end()
    }
}

/// JSON-форма записи для вывода CLI.
impl Serialize for Record<'_> {
    fn serialize<S: SerdeSerializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Record", 6)?;
        state.serialize_field("offset", &self.offset)?;
        state.serialize_field("tag", &self.tag.to_string_lossy())?;
        state.serialize_field("type", &self.value_type)?;
        state.serialize_field("array", &self.is_array())?;
        state.serialize_field("len", &self.length)?;
        match &self.value {
            Value::Scalar(scalar) => state.serialize_field("value", scalar)?,
            Value::Array(array) => state.serialize_field("value", array)?,
        }
        state.end()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Serializer;

    fn message() -> Vec<u8> {
        let mut s: Serializer = Serializer::new();
        s.append_int32_array("ints", &[10, -20, 30]).unwrap();
        s.append_string_array("names", &["a", "bc"]).unwrap();
        s.append_int8("tail", 5).unwrap();
        s.data().to_vec()
    }

    #[test]
    fn test_clean_end_is_none() {
        let mut reader = Deserializer::new(&[]);
        assert_eq!(reader.next_record(), Ok(None));
        assert!(reader.is_at_end());
    }

    /// Массив можно пропустить целиком, следующая запись читается корректно.
    #[test]
    fn test_skipping_array_keeps_cursor_in_sync() {
        let data = message();
        let mut reader = Deserializer::new(&data);

        let ints = reader.next_record().unwrap().unwrap();
        assert!(ints.is_array());
        assert_eq!(ints.len(), 3);

        let names = reader.next_record().unwrap().unwrap();
        assert_eq!(names.tag(), "names");

        let tail = reader.next_record().unwrap().unwrap();
        assert_eq!(tail.scalar(), Some(Scalar::Int8(5)));
        assert_eq!(reader.next_record(), Ok(None));
    }

    #[test]
    fn test_partial_drain_then_next_record() {
        let data = message();
        let mut reader = Deserializer::new(&data);
        reader.next_record().unwrap();

        let names = reader.next_record().unwrap().unwrap().array().unwrap();
        let mut elements = names.elements();
        assert_eq!(elements.next_string(), Ok(Some(&b"a"[..])));
        assert_eq!(elements.remaining(), 1);

        let tail = reader.next_record().unwrap().unwrap();
        assert_eq!(tail.tag(), "tail");
    }

    #[test]
    fn test_fixed_array_random_access() {
        let data = message();
        let mut reader = Deserializer::new(&data);
        let ints = reader.next_record().unwrap().unwrap().array().unwrap();

        assert_eq!(ints.element_type(), ValueType::Int32);
        assert_eq!(ints.get(0), Some(Scalar::Int32(10)));
        assert_eq!(ints.get(1), Some(Scalar::Int32(-20)));
        assert_eq!(ints.get(2), Some(Scalar::Int32(30)));
        assert_eq!(ints.get(3), None);
        assert_eq!(ints.raw().len(), 12);
    }

    #[test]
    fn test_wrong_drain_category_is_format_error() {
        let data = message();
        let mut reader = Deserializer::new(&data);
        let ints = reader.next_record().unwrap().unwrap().array().unwrap();

        let mut elements = ints.elements();
        assert!(matches!(
            elements.next_string(),
            Err(DecodeError::Format { .. })
        ));
        assert!(elements.next_leb128().is_err());
        assert_eq!(elements.next_fixed(), Ok(Some(&10i32.to_le_bytes()[..])));
    }

    #[test]
    fn test_drains_stop_at_array_end() {
        let mut s: Serializer = Serializer::new();
        s.append_leb128_array("l", &[-1]).unwrap();
        s.append_leb128("after", 3).unwrap();

        let mut reader = Deserializer::new(s.data());
        let array = reader.next_record().unwrap().unwrap().array().unwrap();
        let mut elements = array.elements();
        assert_eq!(elements.next_leb128(), Ok(Some(-1)));
        // Следующий LebInt принадлежит другой записи и недоступен.
        assert_eq!(elements.next_leb128(), Ok(None));
    }

    #[test]
    fn test_failed_decode_does_not_move_cursor() {
        let mut data = message();
        data.truncate(data.len() - 1);
        let mut reader = Deserializer::new(&data);
        reader.next_record().unwrap();
        reader.next_record().unwrap();

        let before = reader.position();
        let err = reader.next_record().unwrap_err();
        assert_eq!(reader.position(), before);
        assert!(err.offset() >= before);
        // Повторный вызов даёт ту же ошибку.
        assert_eq!(reader.next_record(), Err(err));
    }

    #[test]
    fn test_iterator_fuses_after_error() {
        let data = [0x2B, b'f', b'o', b'o', 0x01];
        let results: Vec<_> = Deserializer::new(&data).collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_reset_starts_over() {
        let data = message();
        let mut reader = Deserializer::new(&data);
        assert_eq!(reader.by_ref().count(), 3);

        reader.reset(&data);
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.count(), 3);
    }

    #[test]
    fn test_null_array_elements() {
        let mut s: Serializer = Serializer::new();
        s.append_null_array("n", 2).unwrap();
        let mut reader = Deserializer::new(s.data());
        let array = reader.next_record().unwrap().unwrap().array().unwrap();

        let elements: Vec<_> = array.elements().collect::<Result<_, _>>().unwrap();
        assert_eq!(elements, vec![Scalar::Null, Scalar::Null]);
        assert_eq!(array.get(1), Some(Scalar::Null));
        assert_eq!(array.get(2), None);
    }

    /// 11 байт объявляют 2^62 null-элементов: вывод не зависит от их числа.
    #[test]
    fn test_huge_null_array_renders_in_constant_time() {
        let data = [0x81, b'n', 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x40];
        let record = Deserializer::new(&data).next_record().unwrap().unwrap();
        assert_eq!(record.len(), 1 << 62);

        assert_eq!(record.to_string(), "n=[null; 4611686018427387904]");

        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["len"], 1u64 << 62);
        assert_eq!(json["value"], serde_json::Value::Null);

        let array = record.array().unwrap();
        assert_eq!(array.get((1u64 << 40) as usize), Some(Scalar::Null));
        assert_eq!(array.elements().take(3).count(), 3);
    }

    #[test]
    fn test_get_on_variable_width_arrays() {
        let data = message();
        let mut reader = Deserializer::new(&data);
        reader.next_record().unwrap();
        let names = reader.next_record().unwrap().unwrap().array().unwrap();

        assert_eq!(names.get(0), Some(Scalar::String(b"a")));
        assert_eq!(names.get(1), Some(Scalar::String(b"bc")));
        assert_eq!(names.get(2), None);
    }

    #[test]
    fn test_display() {
        let data = message();
        let shown: Vec<String> = Deserializer::new(&data)
            .map(|r| r.unwrap().to_string())
            .collect();
        assert_eq!(shown, vec!["ints=[10, -20, 30]", "names=[\"a\", \"bc\"]", "tail=5"]);
    }

    #[test]
    fn test_json_form() {
        let data = message();
        let record = Deserializer::new(&data).next().unwrap().unwrap();
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "offset": 0,
                "tag": "ints",
                "type": "int32",
                "array": true,
                "len": 3,
                "value": [10, -20, 30]
            })
        );
    }
}
