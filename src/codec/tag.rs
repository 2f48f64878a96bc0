//! Кодек имени поля (тега).
//!
//! Имена длиной 1..=7 байт кладут длину прямо в заголовок. Остальные,
//! включая пустое имя, пишут в заголовке 0 и следом ULEB128-длину.

use std::{borrow::Cow, fmt, str::Utf8Error};

use bflat_error::DecodeError;

use super::{
    value_type::{make_header, split_header, ValueType, MAX_INLINE_TAG_LEN},
    varint::{decode_uleb128, encode_uleb128, max_uleb128_size, uleb128_size},
};

/// Имя поля, заимствованное из исходного буфера.
///
/// UTF-8 не проверяется при разборе, только при вызове [`Tag::as_str`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tag<'a>(&'a [u8]);

impl<'a> Tag<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &'a [u8] {
        self.0
    }

    /// Имя как `&str`, если байты являются корректным UTF-8.
    pub fn as_str(&self) -> Result<&'a str, Utf8Error> {
        std::str::from_utf8(self.0)
    }

    pub fn to_string_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.0)
    }

    pub const fn len(&self) -> usize {
        self.0.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Tag<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "Tag({:?})", self.to_string_lossy())
    }
}

impl fmt::Display for Tag<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl PartialEq<str> for Tag<'_> {
    fn eq(
        &self,
        other: &str,
    ) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for Tag<'_> {
    fn eq(
        &self,
        other: &&str,
    ) -> bool {
        self.0 == other.as_bytes()
    }
}

/// Верхняя граница размера заголовка с тегом длиной `name_len`.
pub const fn max_tag_size(name_len: usize) -> usize {
    1 + max_uleb128_size() + name_len
}

/// Точный размер заголовка с тегом длиной `name_len`.
pub fn tag_size(name_len: usize) -> usize {
    if is_inline(name_len) {
        1 + name_len
    } else {
        1 + uleb128_size(name_len as u64) + name_len
    }
}

#[inline]
fn is_inline(name_len: usize) -> bool {
    name_len != 0 && name_len < MAX_INLINE_TAG_LEN
}

/// Пишет заголовок и имя в начало `out`, возвращает число байт.
///
/// `out` должен вмещать [`max_tag_size`]`(name.len())` байт.
pub fn encode_tag(
    out: &mut [u8],
    value_type: ValueType,
    is_array: bool,
    name: &[u8],
) -> usize {
    let mut pos = 1;
    if is_inline(name.len()) {
        out[0] = make_header(value_type, is_array, name.len() as u8);
    } else {
        out[0] = make_header(value_type, is_array, 0);
        pos += encode_uleb128(name.len() as u64, &mut out[pos..]);
    }
    out[pos..pos + name.len()].copy_from_slice(name);
    pos + name.len()
}

/// Разбирает заголовок и имя в начале `bytes`.
///
/// Возвращает тег и число прочитанных байт (заголовок включён). Код типа
/// здесь не проверяется. Любая нехватка байт даёт `DecodeError::Tag`.
pub fn decode_tag(bytes: &[u8]) -> Result<(Tag<'_>, usize), DecodeError> {
    let Some(&header) = bytes.first() else {
        return Err(DecodeError::Tag { offset: 0 });
    };
    let (_, _, inline_len) = split_header(header);

    let (name_len, start) = if inline_len != 0 {
        (inline_len as usize, 1)
    } else {
        let (len, used) =
            decode_uleb128(&bytes[1..]).map_err(|_| DecodeError::Tag { offset: 1 })?;
        let len = usize::try_from(len).map_err(|_| DecodeError::Tag { offset: 1 })?;
        (len, 1 + used)
    };

    let end = start
        .checked_add(name_len)
        .filter(|&end| end <= bytes.len())
        .ok_or(DecodeError::Tag { offset: start })?;

    Ok((Tag(&bytes[start..end]), end))
}
