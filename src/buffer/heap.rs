use bflat_error::EncodeError;

use super::OutputBuffer;

/// Хранилище целиком в куче. Начинает с нулевой ёмкости.
#[derive(Debug, Clone, Default)]
pub struct HeapBuffer {
    bytes: Vec<u8>,
}

impl HeapBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Заранее выделяет `capacity` байт.
    pub fn with_capacity(capacity: usize) -> Result<Self, EncodeError> {
        let mut buffer = Self::new();
        buffer.resize(capacity, 0)?;
        Ok(buffer)
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl OutputBuffer for HeapBuffer {
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

        // Vec копирует всё содержимое при переаллокации, `preserve` не нужен.
        self.bytes
            .try_reserve_exact(new_capacity - current)
            .map_err(|_| EncodeError::Allocation {
                requested: new_capacity,
            })?;
        self.bytes.resize(new_capacity, 0);
        Ok(())
    }
}
