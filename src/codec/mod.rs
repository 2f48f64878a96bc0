//! Wire-level codec: varints, tags, value payloads and single-record decode.

pub mod record;
pub mod tag;
pub mod value;
pub mod value_type;
pub mod varint;

pub use record::{array_body_len, decode_record, RecordBody, RecordHeader};
pub use tag::{decode_tag, encode_tag, max_tag_size, tag_size, Tag};
pub use value::{decode_scalar, encode_scalar, max_payload_size, Scalar};
pub use value_type::ValueType;
pub use varint::{
    decode_sleb128, decode_uleb128, encode_sleb128, encode_uleb128, max_sleb128_size,
    max_uleb128_size, sleb128_size, uleb128_size,
};
