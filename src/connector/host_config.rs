//! TLS host configuration of a connector
//!
//! The settable TLS state a connector materializes when it starts. A fresh
//! host configuration is created from [`PlatformDefaults`] for every
//! connector lifecycle; the TLS binder writes it once before start.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::tls::config::{ClientAuth, Secret, StoreType, TLS_PROTOCOL_FAMILY};
use crate::tls::store::StoreHandle;

/// Protocol versions negotiated when none are configured
pub const DEFAULT_ENABLED_PROTOCOLS: [&str; 2] = ["TLSv1.2", "TLSv1.3"];

/// Environment variable naming the platform trust store file
pub const TRUST_STORE_ENV: &str = "SSL_TRUST_STORE";
/// Environment variable naming the platform trust store type
pub const TRUST_STORE_TYPE_ENV: &str = "SSL_TRUST_STORE_TYPE";
/// Environment variable holding the platform trust store password
pub const TRUST_STORE_PASSWORD_ENV: &str = "SSL_TRUST_STORE_PASSWORD";

/// Ambient trust settings a listener starts from
#[derive(Debug, Clone)]
pub struct PlatformDefaults {
    pub truststore_file: Option<PathBuf>,
    pub truststore_type: StoreType,
    pub truststore_password: Option<Secret>,
}

impl Default for PlatformDefaults {
    fn default() -> Self {
        PlatformDefaults {
            truststore_file: None,
            truststore_type: StoreType::Pem,
            truststore_password: None,
        }
    }
}

impl PlatformDefaults {
    /// Read the platform defaults from the process environment
    pub fn from_env() -> Self {
        let defaults = PlatformDefaults::default();
        PlatformDefaults {
            truststore_file: std::env::var_os(TRUST_STORE_ENV).map(PathBuf::from),
            truststore_type: std::env::var(TRUST_STORE_TYPE_ENV)
                .map(StoreType::from)
                .unwrap_or(defaults.truststore_type),
            truststore_password: std::env::var(TRUST_STORE_PASSWORD_ENV).ok().map(Secret::from),
        }
    }
}

/// Client certificate verification mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientVerify {
    /// Don't request client certificates
    #[default]
    None,
    /// Request client certificate but don't require it
    Optional,
    /// Require client certificate
    Required,
}

impl ClientVerify {
    pub fn verify_mode(&self) -> openssl::ssl::SslVerifyMode {
        use openssl::ssl::SslVerifyMode;

        match self {
            ClientVerify::None => SslVerifyMode::NONE,
            ClientVerify::Optional => SslVerifyMode::PEER,
            ClientVerify::Required => SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT,
        }
    }
}

impl From<ClientAuth> for ClientVerify {
    fn from(auth: ClientAuth) -> Self {
        match auth {
            ClientAuth::None => ClientVerify::None,
            ClientAuth::Want => ClientVerify::Optional,
            ClientAuth::Need => ClientVerify::Required,
        }
    }
}

/// Certificate entry of a host configuration
#[derive(Debug, Clone)]
pub struct SslHostCertificate {
    keystore: StoreHandle,
    keystore_password: Option<Secret>,
    key_password: Option<Secret>,
    key_alias: Option<String>,
}

impl SslHostCertificate {
    pub fn new(keystore: StoreHandle) -> Self {
        SslHostCertificate {
            keystore,
            keystore_password: None,
            key_password: None,
            key_alias: None,
        }
    }

    pub fn with_keystore_password(mut self, password: Option<Secret>) -> Self {
        self.keystore_password = password;
        self
    }

    pub fn with_key_password(mut self, password: Option<Secret>) -> Self {
        self.key_password = password;
        self
    }

    pub fn with_key_alias(mut self, alias: Option<String>) -> Self {
        self.key_alias = alias;
        self
    }

    pub fn keystore(&self) -> &StoreHandle {
        &self.keystore
    }

    pub fn keystore_password(&self) -> Option<&Secret> {
        self.keystore_password.as_ref()
    }

    pub fn key_password(&self) -> Option<&Secret> {
        self.key_password.as_ref()
    }

    pub fn key_alias(&self) -> Option<&str> {
        self.key_alias.as_deref()
    }
}

/// TLS settings of one listener
#[derive(Debug, Clone)]
pub struct SslHostConfig {
    ciphers: Option<String>,
    ssl_protocol: String,
    enabled_protocols: BTreeSet<String>,
    certificates: Vec<SslHostCertificate>,
    truststore_file: Option<PathBuf>,
    truststore_type: StoreType,
    truststore_password: Option<Secret>,
    truststore: Option<StoreHandle>,
    certificate_verification: ClientVerify,
}

impl SslHostConfig {
    pub fn new(defaults: &PlatformDefaults) -> Self {
        SslHostConfig {
            ciphers: None,
            ssl_protocol: TLS_PROTOCOL_FAMILY.to_string(),
            enabled_protocols: DEFAULT_ENABLED_PROTOCOLS.iter().map(|p| p.to_string()).collect(),
            certificates: Vec::new(),
            truststore_file: defaults.truststore_file.clone(),
            truststore_type: defaults.truststore_type.clone(),
            truststore_password: defaults.truststore_password.clone(),
            truststore: None,
            certificate_verification: ClientVerify::None,
        }
    }

    /// Colon-separated cipher suites, `None` for the OpenSSL defaults
    pub fn ciphers(&self) -> Option<&str> {
        self.ciphers.as_deref()
    }

    pub fn set_ciphers(&mut self, ciphers: impl Into<String>) {
        self.ciphers = Some(ciphers.into());
    }

    pub fn ssl_protocol(&self) -> &str {
        &self.ssl_protocol
    }

    pub fn set_ssl_protocol(&mut self, protocol: impl Into<String>) {
        self.ssl_protocol = protocol.into();
    }

    pub fn enabled_protocols(&self) -> &BTreeSet<String> {
        &self.enabled_protocols
    }

    pub fn set_enabled_protocols<I, S>(&mut self, protocols: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_protocols = protocols.into_iter().map(Into::into).collect();
    }

    pub fn certificates(&self) -> &[SslHostCertificate] {
        &self.certificates
    }

    /// Replace every certificate entry with `certificate`
    pub fn set_certificate(&mut self, certificate: SslHostCertificate) {
        self.certificates = vec![certificate];
    }

    pub fn truststore_file(&self) -> Option<&PathBuf> {
        self.truststore_file.as_ref()
    }

    pub fn truststore_type(&self) -> &StoreType {
        &self.truststore_type
    }

    pub fn truststore_password(&self) -> Option<&Secret> {
        self.truststore_password.as_ref()
    }

    pub fn set_truststore_password(&mut self, password: Option<Secret>) {
        self.truststore_password = password;
    }

    pub fn truststore(&self) -> Option<&StoreHandle> {
        self.truststore.as_ref()
    }

    pub fn set_truststore(&mut self, store: Option<StoreHandle>) {
        self.truststore = store;
    }

    pub fn certificate_verification(&self) -> ClientVerify {
        self.certificate_verification
    }

    pub fn set_certificate_verification(&mut self, mode: ClientVerify) {
        self.certificate_verification = mode;
    }
}
