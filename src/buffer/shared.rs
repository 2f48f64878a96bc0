use bflat_error::EncodeError;
use bytes::{Bytes, BytesMut};

use super::OutputBuffer;

/// Хранилище на `bytes::BytesMut`.
///
/// Готовое сообщение отдаётся как [`Bytes`] без копирования (см.
/// `Serializer::<SharedBuffer>::freeze`), его можно передавать между
/// потоками и клонировать по счётчику ссылок.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: BytesMut,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Обрезает хранилище до `length` байт и замораживает его.
    pub fn freeze(
        mut self,
        length: usize,
    ) -> Bytes {
        self.bytes.truncate(length);
        self.bytes.freeze()
    }
}

impl OutputBuffer for SharedBuffer {
    fn data(&self) -> &[u8] {
        &self.bytes
    }

    fn data_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    fn resize(
        &mut self,
        new_capacity: usize,
        _preserve: usize,
    ) -> Result<(), EncodeError> {
        let current = self.bytes.len();
        if new_capacity <= current {
            return Ok(());
        }
        // BytesMut не умеет сообщать об ошибке аллокации; отсекаем хотя бы
        // размеры, которые Vec заведомо не выделит.
        if new_capacity > isize::MAX as usize {
            return Err(EncodeError::Allocation {
                requested: new_capacity,
            });
        }

        self.bytes.resize(new_capacity, 0);
        Ok(())
    }
}
