//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::ssl::{SslConnector, SslMethod, SslStream, SslVerifyMode, SslVersion};
use openssl::x509::X509;
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

use tlsbind::connector::{Connector, PlatformDefaults};
use tlsbind::tls::{
    KeyStore, PrivateKeyEntry, Secret, SecurityProvider, StoreEntry, StoreError, StoreHandle,
    StoreType,
};

/// Self-signed certificate and RSA key for CN=example.com
pub const SERVER_PEM: &str = include_str!("../resources/server.pem");

pub const STORE_PASSWORD: &str = "secret";
pub const KEY_ALIAS: &str = "server";

/// Store files written to a temporary directory
pub struct Fixtures {
    dir: TempDir,
}

impl Fixtures {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("server.p12"), server_pkcs12(STORE_PASSWORD)).unwrap();
        std::fs::write(dir.path().join("server.pem"), SERVER_PEM).unwrap();
        Fixtures { dir }
    }

    /// PKCS#12 key store protected by [`STORE_PASSWORD`]
    pub fn key_store(&self) -> String {
        self.path("server.p12")
    }

    /// PEM bundle with certificate and unencrypted key
    pub fn pem_store(&self) -> String {
        self.path("server.pem")
    }

    pub fn write(&self, name: &str, contents: &[u8]) -> String {
        let mut file = std::fs::File::create(self.dir.path().join(name)).unwrap();
        file.write_all(contents).unwrap();
        self.path(name)
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_str().unwrap().to_string()
    }
}

pub fn server_pkcs12(password: &str) -> Vec<u8> {
    let cert = X509::from_pem(SERVER_PEM.as_bytes()).unwrap();
    let key = PKey::private_key_from_pem(SERVER_PEM.as_bytes()).unwrap();
    Pkcs12::builder()
        .name(KEY_ALIAS)
        .pkey(&key)
        .cert(&cert)
        .build2(password)
        .unwrap()
        .to_der()
        .unwrap()
}

/// Load the fixture key store the way an external store provider would
pub fn load_store() -> StoreHandle {
    let der = server_pkcs12(STORE_PASSWORD);
    Arc::new(KeyStore::from_pkcs12(&der, Some(&Secret::new(STORE_PASSWORD)), "OpenSSL").unwrap())
}

/// Connector on an ephemeral loopback port
pub fn connector() -> Connector {
    connector_with_defaults(PlatformDefaults::default())
}

pub fn connector_with_defaults(defaults: PlatformDefaults) -> Connector {
    Connector::with_defaults("127.0.0.1:0".parse().unwrap(), defaults)
}

/// Platform defaults carrying a stale global trust store password
pub fn defaults_with_trust_password(password: &str) -> PlatformDefaults {
    PlatformDefaults {
        truststore_file: Some(PathBuf::from("/nonexistent/platform/cacerts")),
        truststore_type: StoreType::Pkcs12,
        truststore_password: Some(Secret::new(password)),
    }
}

/// Stand-in for a PKCS#11 token provider
pub struct MockPkcs11Provider;

impl MockPkcs11Provider {
    pub const NAME: &'static str = "Mock-PKCS11";
}

impl SecurityProvider for MockPkcs11Provider {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn supports(&self, store_type: &StoreType) -> bool {
        store_type.is_hardware_backed()
    }

    fn load(
        &self,
        store_type: &StoreType,
        input: Option<&[u8]>,
        password: Option<&Secret>,
    ) -> Result<KeyStore, StoreError> {
        assert!(input.is_none(), "token stores are never read from a stream");
        if password.is_none() {
            return Err(StoreError::Provider("token PIN required".to_string()));
        }

        let cert = X509::from_pem(SERVER_PEM.as_bytes())?;
        let key = PKey::private_key_from_pem(SERVER_PEM.as_bytes())?;
        Ok(KeyStore::new(store_type.clone(), Self::NAME).with_entry(StoreEntry::PrivateKey(
            PrivateKeyEntry {
                alias: Some("token-key".to_string()),
                key,
                chain: vec![cert],
            },
        )))
    }
}

/// Log output captured from `tracing` while a closure runs
#[derive(Clone, Default)]
pub struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    pub fn capture<R>(&self, f: impl FnOnce() -> R) -> R {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedOutput {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter(self.0.clone())
    }
}

/// Connect a TLS client, optionally pinned to one protocol version
pub fn connect(
    addr: SocketAddr,
    version: Option<SslVersion>,
    client_cert: bool,
) -> Result<SslStream<TcpStream>, String> {
    let mut builder = SslConnector::builder(SslMethod::tls_client()).unwrap();
    builder.set_verify(SslVerifyMode::NONE);
    if let Some(version) = version {
        builder.set_min_proto_version(Some(version)).unwrap();
        builder.set_max_proto_version(Some(version)).unwrap();
    }
    if client_cert {
        let cert = X509::from_pem(SERVER_PEM.as_bytes()).unwrap();
        let key = PKey::private_key_from_pem(SERVER_PEM.as_bytes()).unwrap();
        builder.set_certificate(&cert).unwrap();
        builder.set_private_key(&key).unwrap();
    }

    let stream = TcpStream::connect(addr).map_err(|e| e.to_string())?;
    builder
        .build()
        .configure()
        .unwrap()
        .verify_hostname(false)
        .connect("localhost", stream)
        .map_err(|e| e.to_string())
}
