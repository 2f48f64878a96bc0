use std::hint::black_box;

use bflat::{Deserializer, HeapBuffer, InlineBuffer, OutputBuffer, Serializer, SharedBuffer};
use bflat_error::EncodeError;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Типичное сообщение: несколько скаляров, строка и два массива.
fn write_message<B: OutputBuffer>(
    s: &mut Serializer<B>,
    series: &[i64],
) -> Result<(), EncodeError> {
    s.append_int32("id", 42)?;
    s.append_string("symbol", "BFLAT")?;
    s.append_double("price", 101.25)?;
    s.append_datetime("ts", 1_700_000_000_000)?;
    s.append_null("note")?;
    s.append_leb128_array("deltas", series)?;
    s.append_int64_array("raw", series)?;
    s.append_binary("payload", &[0x5A; 64])
}

fn series() -> Vec<i64> {
    let mut rng = SmallRng::seed_from_u64(7);
    (0..256).map(|_| rng.gen_range(-10_000..10_000)).collect()
}

fn bench_serialize(c: &mut Criterion) {
    let series = series();
    let mut group = c.benchmark_group("serialize");

    group.bench_function("inline (fresh)", |b| {
        b.iter(|| {
            let mut s: Serializer<InlineBuffer> = Serializer::new();
            write_message(&mut s, black_box(&series)).unwrap();
            s.len()
        })
    });
    group.bench_function("heap (fresh)", |b| {
        b.iter(|| {
            let mut s: Serializer<HeapBuffer> = Serializer::new();
            write_message(&mut s, black_box(&series)).unwrap();
            s.len()
        })
    });
    group.bench_function("heap (reused)", |b| {
        let mut s: Serializer<HeapBuffer> = Serializer::new();
        b.iter(|| {
            s.reset();
            write_message(&mut s, black_box(&series)).unwrap();
            s.len()
        })
    });
    group.bench_function("shared + freeze", |b| {
        b.iter_batched(
            Serializer::<SharedBuffer>::new,
            |mut s| {
                write_message(&mut s, black_box(&series)).unwrap();
                s.freeze()
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_deserialize(c: &mut Criterion) {
    let series = series();
    let mut s: Serializer<HeapBuffer> = Serializer::new();
    write_message(&mut s, &series).unwrap();
    let data = s.data().to_vec();

    let mut group = c.benchmark_group("deserialize");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("records only", |b| {
        b.iter(|| Deserializer::new(black_box(&data)).filter(Result::is_ok).count())
    });
    group.bench_function("records + elements", |b| {
        b.iter(|| {
            let mut elements = 0usize;
            for record in Deserializer::new(black_box(&data)) {
                if let Some(array) = record.unwrap().array() {
                    elements += array.elements().filter(Result::is_ok).count();
                }
            }
            elements
        })
    });
    group.finish();
}

criterion_group!(benches, bench_serialize, bench_deserialize);
criterion_main!(benches);
