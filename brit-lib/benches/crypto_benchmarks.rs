//! Envelope benchmarks
//!
//! Run with: `cargo bench --bench crypto_benchmarks`

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use brit_lib::codec::WireFormat;
use brit_lib::crypto::{generate_key_pair, CryptoBox, EncryptOptions};
use brit_lib::{PayerRequest, SessionId, WalletIdentity};

fn bench_identity_derivation(c: &mut Criterion) {
    let seed = [7u8; 64];
    c.bench_function("wallet_identity_derive", |b| {
        b.iter(|| WalletIdentity::derive(black_box(&seed)))
    });
}

fn bench_key_generation(c: &mut Criterion) {
    c.bench_function("generate_key_pair_unprotected", |b| {
        b.iter(|| generate_key_pair(black_box("bench"), "", Utc::now()))
    });
}

fn bench_payer_request(c: &mut Criterion) {
    let (public, secret) = generate_key_pair("matcher", "", Utc::now()).unwrap();
    let key = public.first_encryption_key().unwrap().clone();
    let request = PayerRequest::new(
        WalletIdentity::derive(&[1u8; 32]).unwrap(),
        SessionId::random(),
    )
    .encode();

    let mut group = c.benchmark_group("payer_request");
    for armor in [false, true] {
        let options = EncryptOptions::default().with_armor(armor);
        let label = if armor { "armored" } else { "binary" };
        group.bench_function(BenchmarkId::new("encrypt", label), |b| {
            b.iter(|| CryptoBox::encrypt(black_box(&request), &key, &options))
        });
        let ciphertext = CryptoBox::encrypt(&request, &key, &options).unwrap();
        group.bench_function(BenchmarkId::new("decrypt", label), |b| {
            b.iter(|| CryptoBox::decrypt(black_box(&ciphertext), &secret, ""))
        });
    }
    group.finish();
}

fn bench_session_throughput(c: &mut Criterion) {
    let session = SessionId::random();
    let options = EncryptOptions::default();
    let mut group = c.benchmark_group("session_encrypt");
    for size in [256usize, 4 * 1024, 64 * 1024] {
        let plaintext = vec![0x42u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &plaintext, |b, data| {
            b.iter(|| {
                CryptoBox::encrypt_with_session(black_box(data), session.as_bytes(), &options)
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_identity_derivation,
    bench_key_generation,
    bench_payer_request,
    bench_session_throughput
);
criterion_main!(benches);
