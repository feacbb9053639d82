//! Store loading benchmarks
//!
//! Measures the cost of the work done once per connector start:
//! - PKCS#12 and PEM parsing
//! - loading through `KeyStoreLoader` from disk
//! - full resolution of key and trust stores
//!
//! Run with: cargo bench --bench store_loading

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::x509::X509;
use tempfile::TempDir;
use tlsbind::tls::{
    KeyStore, KeyStoreLoader, Secret, StaticStoreMaterial, StoreType, TlsConfig,
    TrustMaterialResolver,
};

const SERVER_PEM: &str = include_str!("../tests/resources/server.pem");
const PASSWORD: &str = "secret";

fn pkcs12_der() -> Vec<u8> {
    let cert = X509::from_pem(SERVER_PEM.as_bytes()).unwrap();
    let key = PKey::private_key_from_pem(SERVER_PEM.as_bytes()).unwrap();
    Pkcs12::builder()
        .name("server")
        .pkey(&key)
        .cert(&cert)
        .build2(PASSWORD)
        .unwrap()
        .to_der()
        .unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let der = pkcs12_der();
    let password = Secret::new(PASSWORD);

    group.bench_function("pkcs12", |b| {
        b.iter(|| {
            let store = KeyStore::from_pkcs12(black_box(&der), Some(&password), "OpenSSL").unwrap();
            black_box(store);
        });
    });

    group.bench_function("pem", |b| {
        b.iter(|| {
            let store = KeyStore::from_pem(black_box(SERVER_PEM.as_bytes()), None, "OpenSSL").unwrap();
            black_box(store);
        });
    });

    group.finish();
}

fn bench_loader(c: &mut Criterion) {
    let mut group = c.benchmark_group("loader");
    let dir = TempDir::new().unwrap();
    let p12 = dir.path().join("server.p12");
    let pem = dir.path().join("server.pem");
    std::fs::write(&p12, pkcs12_der()).unwrap();
    std::fs::write(&pem, SERVER_PEM).unwrap();
    let p12 = p12.to_str().unwrap().to_string();
    let pem = format!("file:{}", pem.to_str().unwrap());

    let loader = KeyStoreLoader::default();
    let password = Secret::new(PASSWORD);

    group.bench_function("pkcs12_file", |b| {
        b.iter(|| {
            let store = loader
                .load(Some(&p12), Some(&password), &StoreType::Pkcs12, None)
                .unwrap();
            black_box(store);
        });
    });

    group.bench_function("pem_file", |b| {
        b.iter(|| {
            let store = loader.load(Some(&pem), None, &StoreType::Pem, None).unwrap();
            black_box(store);
        });
    });

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let dir = TempDir::new().unwrap();
    let p12 = dir.path().join("server.p12");
    std::fs::write(&p12, pkcs12_der()).unwrap();
    let p12 = p12.to_str().unwrap().to_string();

    let resolver = TrustMaterialResolver::default();
    let configured = TlsConfig::builder()
        .key_store(p12.clone())
        .key_store_password(PASSWORD)
        .trust_store(p12)
        .trust_store_password(PASSWORD)
        .build();

    group.bench_function("configured_stores", |b| {
        b.iter(|| {
            let stores = resolver.resolve(black_box(&configured), None).unwrap();
            black_box(stores);
        });
    });

    let store = Arc::new(
        KeyStore::from_pkcs12(&pkcs12_der(), Some(&Secret::new(PASSWORD)), "OpenSSL").unwrap(),
    );
    let material = StaticStoreMaterial::new()
        .with_key_store(store.clone())
        .with_trust_store(store);
    let empty = TlsConfig::default();

    group.bench_function("external_stores", |b| {
        b.iter(|| {
            let stores = resolver.resolve(black_box(&empty), Some(&material)).unwrap();
            black_box(stores);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_loader, bench_resolve);
criterion_main!(benches);
