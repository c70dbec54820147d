use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use comsat_mpq::crypto::{decrypt_block, decrypt_bytes, encrypt_block, hash_string, hash_type};
use std::hint::black_box;

const KEY: u32 = 0xC3AF_3770;

fn bench_decrypt_block(c: &mut Criterion) {
    let mut data = vec![0x1234_5678u32; 1024]; // one 4 KiB sector

    c.bench_function("decrypt_block_4kb", |b| {
        b.iter(|| {
            decrypt_block(&mut data, black_box(KEY));
        });
    });
}

fn bench_decrypt_bytes(c: &mut Criterion) {
    let mut group = c.benchmark_group("decrypt_bytes");

    for size in [16usize, 4096, 4099, 64 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut data = vec![0xA5u8; size];
            b.iter(|| decrypt_bytes(&mut data, black_box(KEY)));
        });
    }

    group.finish();
}

fn bench_hash_string(c: &mut Criterion) {
    let names = [
        "replay.details",
        "replay.game.events",
        "enUS.SC2Data\\LocalizedData\\GameStrings.txt",
        "Base.SC2Data\\GameData\\UnitData.xml",
    ];

    c.bench_function("hash_string_lookup_triple", |b| {
        b.iter(|| {
            for name in &names {
                black_box(hash_string(black_box(name), hash_type::TABLE_OFFSET));
                black_box(hash_string(black_box(name), hash_type::NAME_A));
                black_box(hash_string(black_box(name), hash_type::NAME_B));
            }
        });
    });
}

fn bench_round_trip(c: &mut Criterion) {
    let original_data = vec![0x1234_5678u32; 1024];

    c.bench_function("encrypt_decrypt_round_trip_4kb", |b| {
        b.iter(|| {
            let mut data = original_data.clone();
            encrypt_block(&mut data, KEY);
            decrypt_block(&mut data, KEY);
            black_box(data);
        });
    });
}

criterion_group!(
    benches,
    bench_decrypt_block,
    bench_decrypt_bytes,
    bench_hash_string,
    bench_round_trip
);
criterion_main!(benches);
