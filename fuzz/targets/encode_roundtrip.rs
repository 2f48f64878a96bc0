#![no_main]

use arbitrary::Arbitrary;
use bflat::{Deserializer, Scalar, Serializer};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum FuzzValue {
    Null,
    String(String),
    Binary(Vec<u8>),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Double(f64),
    DateTime(i64),
    LebInt(i64),
}

impl FuzzValue {
    fn as_scalar(&self) -> Scalar<'_> {
        match self {
            Self::Null => Scalar::Null,
            Self::String(s) => Scalar::String(s.as_bytes()),
            Self::Binary(b) => Scalar::Binary(b),
            Self::Int8(v) => Scalar::Int8(*v),
            Self::Int16(v) => Scalar::Int16(*v),
            Self::Int32(v) => Scalar::Int32(*v),
            Self::Int64(v) => Scalar::Int64(*v),
            Self::Double(v) => Scalar::Double(*v),
            Self::DateTime(v) => Scalar::DateTime(*v),
            Self::LebInt(v) => Scalar::LebInt(*v),
        }
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzField {
    tag: Vec<u8>,
    value: FuzzValue,
}

fn same(
    a: &Scalar<'_>,
    b: &Scalar<'_>,
) -> bool {
    match (a, b) {
        (Scalar::Double(x), Scalar::Double(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

// Любой набор полей, записанный сериализатором, читается обратно без потерь.
fuzz_target!(|fields: Vec<FuzzField>| {
    let mut s: Serializer = Serializer::new();
    for field in &fields {
        s.append_scalar(&field.tag, &field.value.as_scalar())
            .expect("append failed");
    }

    let mut reader = Deserializer::new(s.data());
    for field in &fields {
        let record = reader
            .next_record()
            .expect("decode failed")
            .expect("record missing");
        assert_eq!(record.tag().as_bytes(), field.tag.as_slice());
        assert_eq!(record.value_type(), field.value.as_scalar().value_type());
        let decoded = record.scalar().expect("scalar expected");
        assert!(same(&decoded, &field.value.as_scalar()));
    }
    assert_eq!(reader.next_record(), Ok(None));
});
