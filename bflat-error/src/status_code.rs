use std::fmt;

use num_enum::TryFromPrimitive;

/// Категории ошибок BFlat.
///
/// Числовые диапазоны: 1xxx общие, 2xxx входные аргументы и файлы,
/// 5xxx запись сообщения, 6xxx ввод-вывод, 8xxx формат сообщения.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    Success = 0,

    Unknown = 1000,
    Unsupported = 1001,
    Unexpected = 1002,
    Internal = 1003,
    InvalidArgs = 1004,

    NotFound = 2000,

    SerializationFailed = 5003,

    Io = 6000,
    PermissionDenied = 6001,
    UnexpectedEof = 6007,

    SizeLimit = 8007,
    DecodingError = 8011,
    InvalidTag = 8012,
}

impl StatusCode {
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// `None` для чисел, которым не соответствует ни один вариант.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::try_from(code).ok()
    }

    /// Виноват вход: аргументы, отсутствующий файл или байты сообщения.
    pub fn is_client_error(self) -> bool {
        matches!(self, Self::InvalidArgs | Self::NotFound) || self.is_format_error()
    }

    /// Сообщение не соответствует формату BFlat или лимитам.
    pub fn is_format_error(self) -> bool {
        (8000..9000).contains(&self.code())
    }

    /// Код завершения CLI: 0 успех, 2 неверный вход, 3 ввод-вывод,
    /// 1 всё остальное.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Io | Self::PermissionDenied | Self::UnexpectedEof => 3,
            code if code.is_client_error() => 2,
            _ => 1,
        }
    }
}

impl From<StatusCode> for u32 {
    fn from(status: StatusCode) -> Self {
        status.code()
    }
}

/// `DecodingError (8011)`.
impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{self:?} ({})", self.code())
    }
}
