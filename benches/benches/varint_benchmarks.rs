use std::hint::black_box;

use bflat::codec::{decode_sleb128, decode_uleb128, encode_sleb128, encode_uleb128};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::SmallRng, Rng, SeedableRng};

const BATCH: usize = 1024;

/// Значения с заданным числом значащих бит.
fn values(bits: u32) -> Vec<i64> {
    let mut rng = SmallRng::seed_from_u64(0xBF1A7);
    let mask = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
    (0..BATCH)
        .map(|_| (rng.gen::<u64>() & mask) as i64)
        .collect()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint encode");
    group.throughput(Throughput::Elements(BATCH as u64));

    for bits in [7, 21, 42, 64] {
        let input = values(bits);
        let mut out = vec![0u8; BATCH * 10];

        group.bench_with_input(BenchmarkId::new("uleb128", bits), &input, |b, input| {
            b.iter(|| {
                let mut pos = 0;
                for &v in input {
                    pos += encode_uleb128(black_box(v as u64), &mut out[pos..]);
                }
                pos
            })
        });
        group.bench_with_input(BenchmarkId::new("sleb128", bits), &input, |b, input| {
            b.iter(|| {
                let mut pos = 0;
                for &v in input {
                    pos += encode_sleb128(black_box(v.wrapping_neg()), &mut out[pos..]);
                }
                pos
            })
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint decode");
    group.throughput(Throughput::Elements(BATCH as u64));

    for bits in [7, 21, 42, 64] {
        let input = values(bits);
        let mut unsigned = vec![0u8; BATCH * 10];
        let mut signed = vec![0u8; BATCH * 10];
        let (mut ulen, mut slen) = (0, 0);
        for &v in &input {
            ulen += encode_uleb128(v as u64, &mut unsigned[ulen..]);
            slen += encode_sleb128(v.wrapping_neg(), &mut signed[slen..]);
        }
        unsigned.truncate(ulen);
        signed.truncate(slen);

        group.bench_with_input(BenchmarkId::new("uleb128", bits), &unsigned, |b, data| {
            b.iter(|| {
                let mut pos = 0;
                let mut sum = 0u64;
                while pos < data.len() {
                    let (v, used) = decode_uleb128(black_box(&data[pos..])).unwrap();
                    sum = sum.wrapping_add(v);
                    pos += used;
                }
                sum
            })
        });
        group.bench_with_input(BenchmarkId::new("sleb128", bits), &signed, |b, data| {
            b.iter(|| {
                let mut pos = 0;
                let mut sum = 0i64;
                while pos < data.len() {
                    let (v, used) = decode_sleb128(black_box(&data[pos..])).unwrap();
                    sum = sum.wrapping_add(v);
                    pos += used;
                }
                sum
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
