//! Benchmarks for key derivation and the object cipher.
//!
//! Benchmark groups:
//! - `kdf_legacy`: MD5 based file key derivation for revisions 2 to 4
//! - `kdf_aesv3`: the revision 5 and revision 6 password hash
//! - `object_cipher`: per-object encryption throughput for each algorithm

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use pdfcrypt_core::security::aesv3::compute_hash;
use pdfcrypt_core::security::legacy::{compute_encryption_key, compute_owner_key};
use pdfcrypt_core::security::password::pad_password;
use pdfcrypt_core::{
    CryptoProvider, Credentials, EncryptOptions, EncryptionAlgorithm, PDFObjRef, PdfEncrypt,
};

const DOC_ID: &[u8] = b"benchmark-doc-id";

fn bench_legacy(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdf_legacy");
    let user = *pad_password(b"user");
    let owner = *pad_password(b"owner");

    for (revision, key_len) in [(2u8, 5usize), (3, 16), (4, 16)] {
        let o = *compute_owner_key(&user, &owner, key_len, revision, false);
        group.bench_with_input(BenchmarkId::new("file_key", revision), &revision, |b, &r| {
            b.iter(|| {
                compute_encryption_key(
                    black_box(DOC_ID),
                    black_box(&user),
                    &o,
                    0xFFFF_FFFC,
                    key_len,
                    r,
                    true,
                )
            });
        });
        group.bench_with_input(BenchmarkId::new("owner_key", revision), &revision, |b, &r| {
            b.iter(|| compute_owner_key(black_box(&user), black_box(&owner), key_len, r, false));
        });
    }
    group.finish();
}

fn bench_aesv3(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdf_aesv3");
    let salt = [0x5Au8; 8];
    let u = [0x11u8; 48];

    for revision in [5u8, 6] {
        group.bench_with_input(BenchmarkId::new("user", revision), &revision, |b, &r| {
            b.iter(|| compute_hash(black_box(b"user password"), r, &salt, None));
        });
        group.bench_with_input(BenchmarkId::new("owner", revision), &revision, |b, &r| {
            b.iter(|| compute_hash(black_box(b"owner password"), r, &salt, Some(&u)));
        });
    }
    group.finish();
}

fn bench_object_cipher(c: &mut Criterion) {
    let mut group = c.benchmark_group("object_cipher");
    let data = b"BT /F1 12 Tf 72 720 Td (benchmark payload) Tj ET\n".repeat(1300);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for algorithm in EncryptionAlgorithm::ALL {
        let (handler, mut ctx) = PdfEncrypt::create(
            &Credentials::new("user", "owner"),
            &EncryptOptions::new(algorithm),
            DOC_ID,
            CryptoProvider::system(),
        )
        .expect("create handler");
        let obj = PDFObjRef::new(42, 0);
        let ciphertext = handler.encrypt(&mut ctx, obj, &data).expect("encrypt");

        group.bench_function(BenchmarkId::new("encrypt", algorithm), |b| {
            b.iter(|| handler.encrypt(&mut ctx, obj, black_box(&data)));
        });
        group.bench_function(BenchmarkId::new("decrypt", algorithm), |b| {
            b.iter(|| handler.decrypt(&ctx, obj, black_box(&ciphertext)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_legacy, bench_aesv3, bench_object_cipher);
criterion_main!(benches);
