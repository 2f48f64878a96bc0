//! Запись сообщений BFlat.
//!
//! Каждый `append_*` резервирует худший случай размера (тег + полезная
//! нагрузка), затем пишет и сдвигает длину. Ошибка возможна только при
//! росте хранилища, поэтому частично записанных записей не бывает.

use bflat_error::EncodeError;
use bytes::Bytes;
use tracing::debug;

use crate::{
    buffer::{InlineBuffer, OutputBuffer, SharedBuffer},
    codec::{
        encode_scalar, encode_tag, encode_uleb128, max_payload_size, max_tag_size,
        max_uleb128_size, Scalar, ValueType,
    },
};

/// Потоковый писатель сообщения поверх подменяемого хранилища `B`.
///
/// ```
/// use bflat::Serializer;
///
/// let mut s: Serializer = Serializer::new();
/// s.append_int32("foo", 1).unwrap();
/// assert_eq!(s.data(), &[0x2B, b'f', b'o', b'o', 0x01, 0x00, 0x00, 0x00]);
/// ```
#[derive(Debug, Clone)]
pub struct Serializer<B: OutputBuffer = InlineBuffer> {
    buffer: B,
    length: usize,
}

/// Генерирует `append_<t>`, `push_<t>` и `append_<t>_array` для типов
/// фиксированной ширины.
macro_rules! fixed_width_appenders {
    ($( $ty:ty => $variant:ident, $append:ident, $push:ident, $append_array:ident; )*) => {
        $(
            #[doc = concat!("Тег и значение `", stringify!($ty), "` (`ValueType::", stringify!($variant), "`).")]
            pub fn $append(
                &mut self,
                tag: impl AsRef<[u8]>,
                value: $ty,
            ) -> Result<(), EncodeError> {
                self.append_scalar(tag, &Scalar::$variant(value))
            }

            #[doc = concat!("Элемент массива `", stringify!($ty), "` без тега.")]
            pub fn $push(
                &mut self,
                value: $ty,
            ) -> Result<(), EncodeError> {
                self.push_scalar(&Scalar::$variant(value))
            }

            #[doc = concat!("Массив `", stringify!($ty), "` целиком: заголовок и все элементы.")]
            pub fn $append_array(
                &mut self,
                tag: impl AsRef<[u8]>,
                values: &[$ty],
            ) -> Result<(), EncodeError> {
                self.append_array_tag(tag, ValueType::$variant, values.len())?;
                for &value in values {
                    self.$push(value)?;
                }
                Ok(())
            }
        )*
    };
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<B: OutputBuffer + Default> Serializer<B> {
    pub fn new() -> Self {
        Self::with_buffer(B::default())
    }
}

impl<B: OutputBuffer> Serializer<B> {
    /// Писатель поверх готового хранилища. Существующее содержимое
    /// хранилища считается мусором.
    pub fn with_buffer(buffer: B) -> Self {
        Self { buffer, length: 0 }
    }

    /// Закодированное сообщение.
    pub fn data(&self) -> &[u8] {
        &self.buffer.data()[..self.length]
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Начинает новое сообщение, не освобождая хранилище.
    pub fn reset(&mut self) {
        self.length = 0;
    }

    /// Хранилище и длина сообщения в нём.
    pub fn into_parts(self) -> (B, usize) {
        (self.buffer, self.length)
    }

    /// Заголовок массива: тег с флагом массива и количество элементов.
    ///
    /// За ним должно последовать ровно `count` вызовов `push_*` того же типа.
    /// Для готовых срезов удобнее `append_*_array`.
    pub fn append_array_tag(
        &mut self,
        tag: impl AsRef<[u8]>,
        element_type: ValueType,
        count: usize,
    ) -> Result<(), EncodeError> {
        let tag = tag.as_ref();
        self.reserve(checked_sum(max_tag_size(tag.len()), max_uleb128_size())?)?;
        self.write_tag(element_type, true, tag);
        let start = self.length;
        let written = encode_uleb128(count as u64, &mut self.buffer.data_mut()[start..]);
        self.length += written;
        Ok(())
    }

    /// Тег и произвольное скалярное значение.
    pub fn append_scalar(
        &mut self,
        tag: impl AsRef<[u8]>,
        value: &Scalar<'_>,
    ) -> Result<(), EncodeError> {
        let tag = tag.as_ref();
        let payload = max_payload_size(value.value_type(), payload_len(value));
        self.reserve(checked_sum(max_tag_size(tag.len()), payload)?)?;
        self.write_tag(value.value_type(), false, tag);
        self.write_payload(value);
        Ok(())
    }

    /// Скалярное значение без тега, как элемент массива.
    pub fn push_scalar(
        &mut self,
        value: &Scalar<'_>,
    ) -> Result<(), EncodeError> {
        self.reserve(max_payload_size(value.value_type(), payload_len(value)))?;
        self.write_payload(value);
        Ok(())
    }

    pub fn append_null(
        &mut self,
        tag: impl AsRef<[u8]>,
    ) -> Result<(), EncodeError> {
        self.append_scalar(tag, &Scalar::Null)
    }

    /// Массив из `count` null: у элементов нет полезной нагрузки.
    pub fn append_null_array(
        &mut self,
        tag: impl AsRef<[u8]>,
        count: usize,
    ) -> Result<(), EncodeError> {
        self.append_array_tag(tag, ValueType::Null, count)
    }

    pub fn append_string(
        &mut self,
        tag: impl AsRef<[u8]>,
        value: &str,
    ) -> Result<(), EncodeError> {
        self.append_scalar(tag, &Scalar::String(value.as_bytes()))
    }

    pub fn push_string(
        &mut self,
        value: &str,
    ) -> Result<(), EncodeError> {
        self.push_scalar(&Scalar::String(value.as_bytes()))
    }

    pub fn append_string_array<S: AsRef<str>>(
        &mut self,
        tag: impl AsRef<[u8]>,
        values: &[S],
    ) -> Result<(), EncodeError> {
        self.append_array_tag(tag, ValueType::String, values.len())?;
        for value in values {
            self.push_string(value.as_ref())?;
        }
        Ok(())
    }

    pub fn append_binary(
        &mut self,
        tag: impl AsRef<[u8]>,
        value: &[u8],
    ) -> Result<(), EncodeError> {
        self.append_scalar(tag, &Scalar::Binary(value))
    }

    pub fn push_binary(
        &mut self,
        value: &[u8],
    ) -> Result<(), EncodeError> {
        self.push_scalar(&Scalar::Binary(value))
    }

    pub fn append_binary_array<V: AsRef<[u8]>>(
        &mut self,
        tag: impl AsRef<[u8]>,
        values: &[V],
    ) -> Result<(), EncodeError> {
        self.append_array_tag(tag, ValueType::Binary, values.len())?;
        for value in values {
            self.push_binary(value.as_ref())?;
        }
        Ok(())
    }

    /// Целое в SLEB128 (`ValueType::LebInt`).
    pub fn append_leb128(
        &mut self,
        tag: impl AsRef<[u8]>,
        value: i64,
    ) -> Result<(), EncodeError> {
        self.append_scalar(tag, &Scalar::LebInt(value))
    }

    pub fn push_leb128(
        &mut self,
        value: i64,
    ) -> Result<(), EncodeError> {
        self.push_scalar(&Scalar::LebInt(value))
    }

    pub fn append_leb128_array(
        &mut self,
        tag: impl AsRef<[u8]>,
        values: &[i64],
    ) -> Result<(), EncodeError> {
        self.append_array_tag(tag, ValueType::LebInt, values.len())?;
        for &value in values {
            self.push_leb128(value)?;
        }
        Ok(())
    }

    fixed_width_appenders! {
        i8 => Int8, append_int8, push_int8, append_int8_array;
        i16 => Int16, append_int16, push_int16, append_int16_array;
        i32 => Int32, append_int32, push_int32, append_int32_array;
        i64 => Int64, append_int64, push_int64, append_int64_array;
        f64 => Double, append_double, push_double, append_double_array;
        i64 => DateTime, append_datetime, push_datetime, append_datetime_array;
    }

    /// Гарантирует `additional` свободных байт после текущей длины.
    ///
    /// Новая ёмкость равна ближайшей степени двойки не меньше требуемой.
    fn reserve(
        &mut self,
        additional: usize,
    ) -> Result<(), EncodeError> {
        let overflow = EncodeError::CapacityOverflow {
            length: self.length,
            additional,
        };
        let required = self.length.checked_add(additional).ok_or(overflow)?;
        if required <= self.buffer.capacity() {
            return Ok(());
        }

        let new_capacity = required.checked_next_power_of_two().ok_or(overflow)?;
        debug!(
            from = self.buffer.capacity(),
            to = new_capacity,
            length = self.length,
            "Growing output buffer"
        );
        self.buffer.resize(new_capacity, self.length)
    }

    fn write_tag(
        &mut self,
        value_type: ValueType,
        is_array: bool,
        tag: &[u8],
    ) {
        let start = self.length;
        let written = encode_tag(
            &mut self.buffer.data_mut()[start..],
            value_type,
            is_array,
            tag,
        );
        self.length += written;
    }

    fn write_payload(
        &mut self,
        value: &Scalar<'_>,
    ) {
        let start = self.length;
        let written = encode_scalar(&mut self.buffer.data_mut()[start..], value);
        self.length += written;
    }
}

impl Serializer<SharedBuffer> {
    /// Отдаёт сообщение как `Bytes` без копирования.
    pub fn freeze(self) -> Bytes {
        self.buffer.freeze(self.length)
    }
}

impl<B: OutputBuffer + Default> Default for Serializer<B> {
    fn default() -> Self {
        Self::new()
    }
}

fn payload_len(value: &Scalar<'_>) -> usize {
    value.as_bytes().map_or(0, <[u8]>::len)
}

fn checked_sum(
    a: usize,
    b: usize,
) -> Result<usize, EncodeError> {
    a.checked_add(b).ok_or(EncodeError::CapacityOverflow {
        length: a,
        additional: b,
    })
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::HeapBuffer;

    #[test]
    fn test_int32_known_bytes() {
        let mut s: Serializer = Serializer::new();
        s.append_int32("foo", 1).unwrap();
        assert_eq!(s.data(), &[0x2B, 0x66, 0x6F, 0x6F, 0x01, 0x00, 0x00, 0x00]);
        assert_eq!(s.len(), 8);
    }

    #[test]
    fn test_long_tag_uses_overflow_form() {
        let mut s: Serializer = Serializer::new();
        s.append_int32("this is a longer tag name", 1).unwrap();
        assert_eq!(&s.data()[..2], &[0x28, 0x19]);
        assert_eq!(s.len(), 2 + 25 + 4);
    }

    /// Тест проверяет побайтно массив LebInt из эталонного сообщения.
    #[test]
    fn test_leb128_array_known_bytes() {
        let mut s: Serializer = Serializer::new();
        s.append_leb128_array("leb128", &[0, -1, 1, -127, 127, -128, 128, -65536, 65536])
            .unwrap();
        assert_eq!(
            s.data(),
            &[
                0xCE, 0x6C, 0x65, 0x62, 0x31, 0x32, 0x38, 0x09, 0x00, 0x7F, 0x01, 0x81, 0x7F,
                0xFF, 0x00, 0x80, 0x7F, 0x80, 0x01, 0x80, 0x80, 0x7C, 0x80, 0x80, 0x04
            ]
        );
    }

    #[test]
    fn test_manual_array_equals_slice_helper() {
        let mut manual: Serializer = Serializer::new();
        manual.append_array_tag("xs", ValueType::Int16, 3).unwrap();
        for v in [1, -2, 300] {
            manual.push_int16(v).unwrap();
        }

        let mut helper: Serializer = Serializer::new();
        helper.append_int16_array("xs", &[1, -2, 300]).unwrap();
        assert_eq!(manual.data(), helper.data());
    }

    #[test]
    fn test_null_record_and_null_array() {
        let mut s: Serializer = Serializer::new();
        s.append_null("null").unwrap();
        s.append_null_array("n", 5).unwrap();
        assert_eq!(s.data(), &[0x04, b'n', b'u', b'l', b'l', 0x81, b'n', 0x05]);
    }

    #[test]
    fn test_empty_tag() {
        let mut s: Serializer = Serializer::new();
        s.append_int8("", -1).unwrap();
        assert_eq!(s.data(), &[0x18, 0x00, 0xFF]);
    }

    /// Рост идёт до степени двойки, содержимое сохраняется.
    #[test]
    fn test_growth_preserves_prefix() {
        let mut s = Serializer::<HeapBuffer>::new();
        assert_eq!(s.capacity(), 0);

        s.append_int32("foo", 7).unwrap();
        let first = s.data().to_vec();
        assert!(s.capacity().is_power_of_two());

        let blob = vec![0xAB; 5000];
        s.append_binary("blob", &blob).unwrap();
        assert!(s.capacity() >= s.len());
        assert!(s.capacity().is_power_of_two());
        assert_eq!(&s.data()[..first.len()], &first[..]);
    }

    #[test]
    fn test_inline_buffer_spills_on_large_message() {
        let mut s: Serializer<InlineBuffer<16>> = Serializer::new();
        s.append_int8("a", 1).unwrap();
        assert_eq!(s.capacity(), 16);

        s.append_string("b", &"x".repeat(100)).unwrap();
        assert!(s.capacity() > 16);
        let (buffer, len) = s.into_parts();
        assert!(buffer.spilled());
        assert_eq!(len, 3 + 2 + 1 + 100);
        assert_eq!(&buffer.data()[..3], &[0x19, b'a', 0x01]);
    }

    #[test]
    fn test_reset_keeps_capacity() {
        let mut s = Serializer::<HeapBuffer>::new();
        s.append_string("k", &"v".repeat(300)).unwrap();
        let capacity = s.capacity();

        s.reset();
        assert!(s.is_empty());
        assert_eq!(s.capacity(), capacity);

        s.append_int8("k", 1).unwrap();
        assert_eq!(s.data(), &[0x19, b'k', 0x01]);
    }

    #[test]
    fn test_freeze_shared_buffer() {
        let mut s = Serializer::<SharedBuffer>::new();
        s.append_double("d", 9.999).unwrap();
        let len = s.len();
        let bytes = s.freeze();
        assert_eq!(bytes.len(), len);
        assert_eq!(bytes[0], 0x39);
    }

    #[test]
    fn test_string_and_binary_arrays() {
        let mut s: Serializer = Serializer::new();
        let values: [&[u8]; 6] = [b"", b"a", b"aaa", b"aaaa", b"a", b""];
        s.append_binary_array("binary", &values).unwrap();
        assert_eq!(
            s.data(),
            &[
                0x96, 0x62, 0x69, 0x6E, 0x61, 0x72, 0x79, 0x06, 0x00, 0x01, 0x61, 0x03, 0x61,
                0x61, 0x61, 0x04, 0x61, 0x61, 0x61, 0x61, 0x01, 0x61, 0x00
            ]
        );

        s.reset();
        s.append_string_array("s", &["x".to_string(), "yz".to_string()]).unwrap();
        assert_eq!(s.data(), &[0x89, b's', 0x02, 0x01, b'x', 0x02, b'y', b'z']);
    }
}
