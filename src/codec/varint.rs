//! Variable-length integer encoding (ULEB128 / SLEB128).
//!
//! Каждый байт несёт 7 бит данных, старший бит (0x80) означает
//! "дальше есть ещё байты". Младшая группа идёт первой.
//!
//! - беззнаковый вариант: 0..=127 занимает 1 байт, `u64::MAX` 10 байт;
//! - знаковый вариант: бит 6 последнего байта задаёт знак, так что -64..=63
//!   помещается в 1 байт.
//!
//! Декодеры никогда не читают за пределы переданного среза. Биты сверх 64
//! молча отбрасываются.

use bflat_error::DecodeError;

const VALUE_MASK: u8 = 0x7F;
const CONTINUATION_BIT: u8 = 0x80;
const SIGN_BIT: u8 = 0x40;
const GROUP_BITS: u32 = 7;

/// Максимальная длина LEB128 для 64-битного значения: `ceil(64 / 7)`.
pub const MAX_LEB128_LEN: usize = 10;

/// Верхняя граница размера ULEB128 для любого `u64`.
///
/// Сериализатор резервирует именно столько, а не точный размер.
pub const fn max_uleb128_size() -> usize {
    MAX_LEB128_LEN
}

/// Верхняя граница размера SLEB128 для любого `i64`.
pub const fn max_sleb128_size() -> usize {
    MAX_LEB128_LEN
}

/// Точный размер ULEB128-кодировки `value`.
pub fn uleb128_size(mut value: u64) -> usize {
    let mut size = 1;
    value >>= GROUP_BITS;
    while value != 0 {
        value >>= GROUP_BITS;
        size += 1;
    }
    size
}

/// Точный размер SLEB128-кодировки `value`.
pub fn sleb128_size(mut value: i64) -> usize {
    let mut size = 0;
    loop {
        let byte = (value as u8) & VALUE_MASK;
        value >>= GROUP_BITS;
        size += 1;
        if is_last_signed_group(value, byte) {
            return size;
        }
    }
}

/// Записывает `value` в ULEB128 в начало `out` и возвращает число байт.
///
/// `out` должен вмещать [`max_uleb128_size`] байт (или хотя бы
/// [`uleb128_size`]`(value)`), иначе индексация паникует.
///
/// # Examples
/// ```
/// use bflat::codec::varint::encode_uleb128;
///
/// let mut buf = [0u8; 10];
/// assert_eq!(encode_uleb128(300, &mut buf), 2);
/// assert_eq!(&buf[..2], &[0xAC, 0x02]);
/// ```
pub fn encode_uleb128(
    mut value: u64,
    out: &mut [u8],
) -> usize {
    let mut written = 0;
    loop {
        let mut byte = (value as u8) & VALUE_MASK;
        value >>= GROUP_BITS;
        if value != 0 {
            byte |= CONTINUATION_BIT;
        }
        out[written] = byte;
        written += 1;
        if value == 0 {
            return written;
        }
    }
}

/// Записывает `value` в SLEB128 в начало `out` и возвращает число байт.
///
/// Кодирование минимально и для отрицательных чисел: `-1` даёт `[0x7F]`,
/// `127` даёт `[0xFF, 0x00]`.
pub fn encode_sleb128(
    mut value: i64,
    out: &mut [u8],
) -> usize {
    let mut written = 0;
    loop {
        let mut byte = (value as u8) & VALUE_MASK;
        // Арифметический сдвиг сохраняет знак.
        value >>= GROUP_BITS;
        let last = is_last_signed_group(value, byte);
        if !last {
            byte |= CONTINUATION_BIT;
        }
        out[written] = byte;
        written += 1;
        if last {
            return written;
        }
    }
}

/// Читает ULEB128 из начала `bytes`.
///
/// Возвращает значение и число прочитанных байт. Если терминирующий байт не
/// найден в пределах среза, возвращается `DecodeError::Format` со смещением
/// начала varint (0).
pub fn decode_uleb128(bytes: &[u8]) -> Result<(u64, usize), DecodeError> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        if shift < u64::BITS {
            value |= u64::from(byte & VALUE_MASK) << shift;
        }
        if byte & CONTINUATION_BIT == 0 {
            return Ok((value, i + 1));
        }
        shift = shift.saturating_add(GROUP_BITS);
    }

    Err(DecodeError::format("varint", 0))
}

/// Читает SLEB128 из начала `bytes`.
///
/// После терминирующего байта значение расширяется знаком по биту 6, если
/// накопленный сдвиг меньше 64.
pub fn decode_sleb128(bytes: &[u8]) -> Result<(i64, usize), DecodeError> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        if shift < u64::BITS {
            value |= u64::from(byte & VALUE_MASK) << shift;
        }
        shift = shift.saturating_add(GROUP_BITS);

        if byte & CONTINUATION_BIT == 0 {
            if shift < u64::BITS && byte & SIGN_BIT != 0 {
                value |= !0u64 << shift;
            }
            return Ok((value as i64, i + 1));
        }
    }

    Err(DecodeError::format("varint", 0))
}

/// Последняя ли это группа: оставшееся значение вместе со знаковым битом
/// только что выписанного байта однозначно восстанавливает число.
#[inline]
fn is_last_signed_group(
    rest: i64,
    byte: u8,
) -> bool {
    (rest == 0 && byte & SIGN_BIT == 0) || (rest == -1 && byte & SIGN_BIT != 0)
}
