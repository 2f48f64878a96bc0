//! Подменяемые хранилища для [`Serializer`](crate::Serializer).
//!
//! Сериализатор работает с хранилищем только через трейт [`OutputBuffer`]:
//! получить байты, узнать ёмкость, вырасти с сохранением префикса.

mod heap;
mod inline;
mod shared;

use bflat_error::EncodeError;
pub use heap::HeapBuffer;
pub use inline::{InlineBuffer, DEFAULT_INLINE_CAPACITY};
pub use shared::SharedBuffer;

/// Хранилище байт, в которое пишет сериализатор.
///
/// Весь срез `data()` считается доступным для записи; ёмкость равна его
/// длине. Хранилище никогда не сжимается.
pub trait OutputBuffer {
    fn data(&self) -> &[u8];

    fn data_mut(&mut self) -> &mut [u8];

    fn capacity(&self) -> usize {
        self.data().len()
    }

    /// Увеличивает ёмкость хотя бы до `new_capacity`, сохраняя первые
    /// `preserve` байт. Если ёмкости уже хватает, ничего не делает.
    fn resize(
        &mut self,
        new_capacity: usize,
        preserve: usize,
    ) -> Result<(), EncodeError>;
}
