//! Performance benchmarks for hush-crypto.
//!
//! Run with: `cargo bench -p hush-crypto`

use std::io::Write;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use hush_crypto::aead::AeadKey;
use hush_crypto::hash;
use hush_crypto::keys::KeyType;
use hush_crypto::scalar::reduce32;
use hush_crypto::stream::{EncryptWriter, StreamKey};
use rand_core::OsRng;

const SIZES: [usize; 5] = [64, 1024, 4096, 16384, 65536];

// ============================================================================
// AEAD Benchmarks
// ============================================================================

fn bench_aead_seal(c: &mut Criterion) {
    let mut group = c.benchmark_group("aead_seal");
    let key = AeadKey::new([0x42u8; 32]);

    for size in SIZES {
        let plaintext = vec![0xAA; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| key.seal(&mut OsRng, black_box(&plaintext)).unwrap())
        });
    }

    group.finish();
}

fn bench_aead_open(c: &mut Criterion) {
    let mut group = c.benchmark_group("aead_open");
    let key = AeadKey::new([0x42u8; 32]);

    for size in SIZES {
        let sealed = key.seal(&mut OsRng, &vec![0xAA; size]).unwrap();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| key.open(black_box(&sealed)).unwrap())
        });
    }

    group.finish();
}

// ============================================================================
// Streaming Cipher Benchmarks
// ============================================================================

fn bench_cfb_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("cfb_stream");
    let key = StreamKey::new([0x42u8; 32], [0x24u8; 16]);

    for size in SIZES {
        let plaintext = vec![0xAA; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut writer = EncryptWriter::new(&key, Vec::with_capacity(size));
                writer.write_all(black_box(&plaintext)).unwrap();
                writer.finish().unwrap()
            })
        });
    }

    group.finish();
}

// ============================================================================
// Checksum Benchmarks
// ============================================================================

fn bench_checksums(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksums");

    for size in SIZES {
        let data = vec![0xAA; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| hash::checksums(black_box(&data)))
        });
    }

    group.finish();
}

// ============================================================================
// Key Exchange Benchmarks
// ============================================================================

fn bench_dual_exchange(c: &mut Criterion) {
    let (bob, bob_pub) = KeyType::Ed25519.generate(&mut OsRng).unwrap();

    c.bench_function("dual_exchange_sender", |b| {
        b.iter(|| bob_pub.dual_exchange(&mut OsRng).unwrap())
    });

    let (_, tx) = bob_pub.dual_exchange(&mut OsRng).unwrap();
    c.bench_function("dual_exchange_recipient", |b| {
        b.iter(|| bob.dual_secret(black_box(&tx)).unwrap())
    });
}

fn bench_key_exchange(c: &mut Criterion) {
    for key_type in [KeyType::Ed25519, KeyType::EcdsaP384] {
        let (alice, _) = key_type.generate(&mut OsRng).unwrap();
        let (_, bob_pub) = key_type.generate(&mut OsRng).unwrap();
        c.bench_function(&format!("key_exchange_{key_type}"), |b| {
            b.iter(|| alice.key_exchange(black_box(&bob_pub)).unwrap())
        });
    }
}

fn bench_reduce32(c: &mut Criterion) {
    let input = [0xffu8; 32];
    c.bench_function("scalar_reduce32", |b| b.iter(|| reduce32(black_box(&input))));
}

// ============================================================================
// Signature Benchmarks
// ============================================================================

fn bench_sign(c: &mut Criterion) {
    let mut group = c.benchmark_group("sign");
    let message = vec![0xAA; 1024];

    for key_type in [KeyType::Ed25519, KeyType::EcdsaP384, KeyType::Rsa2048] {
        let (private, _) = key_type.generate(&mut OsRng).unwrap();
        group.bench_function(key_type.token(), |b| {
            b.iter(|| private.sign(black_box(&message)).unwrap())
        });
    }

    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("verify");
    let message = vec![0xAA; 1024];

    for key_type in [KeyType::Ed25519, KeyType::EcdsaP384, KeyType::Rsa2048] {
        let (private, public) = key_type.generate(&mut OsRng).unwrap();
        let signature = private.sign(&message).unwrap();
        group.bench_function(key_type.token(), |b| {
            b.iter(|| public.verify(black_box(&message), black_box(&signature)))
        });
    }

    group.finish();
}

criterion_group!(aead_benches, bench_aead_seal, bench_aead_open);

criterion_group!(stream_benches, bench_cfb_stream, bench_checksums);

criterion_group!(
    exchange_benches,
    bench_dual_exchange,
    bench_key_exchange,
    bench_reduce32,
);

criterion_group!(signature_benches, bench_sign, bench_verify);

criterion_main!(
    aead_benches,
    stream_benches,
    exchange_benches,
    signature_benches,
);
