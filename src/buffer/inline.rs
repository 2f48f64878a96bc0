use bflat_error::EncodeError;

use super::OutputBuffer;

/// Размер встроенной области по умолчанию.
pub const DEFAULT_INLINE_CAPACITY: usize = 1024;

/// Хранилище с небольшой встроенной областью: короткие сообщения
/// собираются без аллокаций, длинные переезжают в кучу.
#[derive(Debug, Clone)]
pub struct InlineBuffer<const N: usize = DEFAULT_INLINE_CAPACITY> {
    storage: Storage<N>,
}

#[derive(Debug, Clone)]
enum Storage<const N: usize> {
    Inline([u8; N]),
    Heap(Vec<u8>),
}

impl<const N: usize> InlineBuffer<N> {
    pub fn new() -> Self {
        Self {
            storage: Storage::Inline([0; N]),
        }
    }

    /// Данные уже переехали в кучу.
    pub fn spilled(&self) -> bool {
        matches!(self.storage, Storage::Heap(_))
    }
}

impl<const N: usize> Default for InlineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> OutputBuffer for InlineBuffer<N> {
    fn data(&self) -> &[u8] {
        match &self.storage {
            Storage::Inline(bytes) => bytes,
            Storage::Heap(bytes) => bytes,
        }
    }

    fn data_mut(&mut self) -> &mut [u8] {
        match &mut self.storage {
            Storage::Inline(bytes) => bytes,
            Storage::Heap(bytes) => bytes,
        }
    }

    fn resize(
        &mut self,
        new_capacity: usize,
        preserve: usize,
    ) -> Result<(), EncodeError> {
        if new_capacity <= self.capacity() {
            return Ok(());
        }

        let mut grown = Vec::new();
        grown
            .try_reserve_exact(new_capacity)
            .map_err(|_| EncodeError::Allocation {
                requested: new_capacity,
            })?;
        grown.resize(new_capacity, 0);

        let preserve = preserve.min(self.capacity());
        grown[..preserve].copy_from_slice(&self.data()[..preserve]);
        self.storage = Storage::Heap(grown);
        Ok(())
    }
}
