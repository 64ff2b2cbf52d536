use bytestore::ByteBuf;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;

fn bench_push(c: &mut Criterion) {
    c.bench_function("bytebuf_push_64k", |b| {
        b.iter_batched(
            ByteBuf::new,
            |mut buf| {
                for i in 0..65_536usize {
                    buf.push((i % 256) as u8);
                }
                black_box(buf)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_append(c: &mut Criterion) {
    c.bench_function("bytebuf_append_chunks", |b| {
        let chunk = [0x5au8; 256];
        b.iter_batched(
            ByteBuf::new,
            |mut buf| {
                for _ in 0..256 {
                    buf.append(&chunk);
                }
                black_box(buf)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_append_format(c: &mut Criterion) {
    c.bench_function("bytebuf_append_format", |b| {
        b.iter_batched(
            ByteBuf::new,
            |mut buf| {
                for i in 0..1_000u32 {
                    buf.append_format(format_args!("record {} value {}\n", i, i * 7))
                        .unwrap();
                }
                black_box(buf)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_push, bench_append, bench_append_format
}
criterion_main!(benches);
