use bfg::{decode_image, encode_image};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const WIDTH: u32 = 256;
const HEIGHT: u32 = 256;
const N_CHANNELS: u8 = 3;

fn solid(pixel_count: usize) -> Vec<u8> {
    vec![128u8; pixel_count]
}

fn gradient(pixel_count: usize) -> Vec<u8> {
    (0..pixel_count).map(|i| (i % 256) as u8).collect()
}

fn noisy(pixel_count: usize) -> Vec<u8> {
    let mut state = 0x1234_5678u32;
    (0..pixel_count)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}

fn encode(c: &mut Criterion) {
    let pixel_count = (WIDTH * HEIGHT * N_CHANNELS as u32) as usize;
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(pixel_count as u64));

    for (name, pixels) in [
        ("solid", solid(pixel_count)),
        ("gradient", gradient(pixel_count)),
        ("noisy", noisy(pixel_count)),
    ] {
        group.bench_with_input(BenchmarkId::new("encode_image", name), &pixels, |b, input| {
            b.iter(|| encode_image(WIDTH, HEIGHT, N_CHANNELS, input).unwrap())
        });
    }
}

fn decode(c: &mut Criterion) {
    let pixel_count = (WIDTH * HEIGHT * N_CHANNELS as u32) as usize;
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(pixel_count as u64));

    for (name, pixels) in [
        ("solid", solid(pixel_count)),
        ("gradient", gradient(pixel_count)),
        ("noisy", noisy(pixel_count)),
    ] {
        let (header, payload) = encode_image(WIDTH, HEIGHT, N_CHANNELS, &pixels).unwrap();
        group.bench_with_input(
            BenchmarkId::new("decode_image", name),
            &(header, payload),
            |b, (header, payload)| b.iter(|| decode_image(header, payload).unwrap()),
        );
    }
}

criterion_group!(benches, encode, decode);
criterion_main!(benches);
