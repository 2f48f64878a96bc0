//! BFlat: компактный бинарный формат «тег = значение».
//!
//! Сообщение состоит из записей, идущих подряд без общего заголовка. Каждая
//! запись содержит байт заголовка (флаг массива, тип, длина тега), сам тег и
//! полезную нагрузку. Чтение не копирует данные: строки, бинарные значения и
//! теги возвращаются как срезы исходного буфера.
//!
//! ```
//! use bflat::{Deserializer, Scalar, Serializer};
//!
//! let mut s: Serializer = Serializer::new();
//! s.append_int32("foo", 1)?;
//! s.append_string("name", "bflat")?;
//! s.append_leb128_array("ids", &[1, -2, 300])?;
//!
//! let mut d = Deserializer::new(s.data());
//! let first = d.next_record()?.unwrap();
//! assert_eq!(first.tag(), "foo");
//! assert_eq!(first.scalar(), Some(Scalar::Int32(1)));
//!
//! let second = d.next_record()?.unwrap();
//! assert_eq!(second.scalar().and_then(|v| v.as_str()), Some("bflat"));
//!
//! let ids = d.next_record()?.unwrap().array().unwrap();
//! let values: Vec<i64> = ids
//!     .elements()
//!     .map(|e| e.map(|v| v.as_i64().unwrap_or_default()))
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(values, [1, -2, 300]);
//! assert!(d.next_record()?.is_none());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Output buffers the serializer writes into (inline, heap, `BytesMut`).
pub mod buffer;
/// Wire-level primitives: varints, tags, value payloads.
pub mod codec;
/// Settings loading for the CLI: file, environment, defaults.
pub mod config;
/// Zero-copy reader of records and arrays.
pub mod deserializer;
/// Logging setup on top of `tracing-subscriber`.
pub mod logging;
/// Append-only message writer.
pub mod serializer;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Output buffers.
pub use buffer::{HeapBuffer, InlineBuffer, OutputBuffer, SharedBuffer};
/// Codec primitives.
pub use codec::{Scalar, Tag, ValueType};
/// Settings.
pub use config::Settings;
/// Reader types.
pub use deserializer::{Array, ArrayElements, Deserializer, Record, Value};
/// Errors.
pub use bflat_error::{BflatResult, DecodeError, EncodeError, ErrorExt, StackError, StatusCode};
/// Logging.
pub use logging::{init_logging, LogFormat, LoggingConfig};
/// Writer.
pub use serializer::Serializer;
