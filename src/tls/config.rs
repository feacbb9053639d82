//! TLS configuration
//!
//! Declarative TLS settings for a connector. A [`TlsConfig`] is either built
//! in code through [`TlsConfigBuilder`] or deserialized from TOML using
//! kebab-case keys:
//!
//! ```toml
//! key-store = "server.p12"
//! key-store-password = "secret"
//! enabled-protocols = ["TLSv1.2", "TLSv1.3"]
//! ciphers = ["TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256"]
//! client-auth = "want"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use zeroize::Zeroizing;

use super::error::TlsError;

/// Protocol family negotiated by every TLS connector
pub const TLS_PROTOCOL_FAMILY: &str = "TLS";

/// TLS version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TlsVersion {
    /// TLS 1.0
    Tls10,
    /// TLS 1.1
    Tls11,
    /// TLS 1.2
    Tls12,
    /// TLS 1.3
    Tls13,
}

impl TlsVersion {
    /// All versions, oldest first
    pub const ALL: [TlsVersion; 4] = [
        TlsVersion::Tls10,
        TlsVersion::Tls11,
        TlsVersion::Tls12,
        TlsVersion::Tls13,
    ];

    /// Get OpenSSL protocol version constant
    pub fn to_openssl_version(&self) -> openssl::ssl::SslVersion {
        use openssl::ssl::SslVersion;
        match self {
            TlsVersion::Tls10 => SslVersion::TLS1,
            TlsVersion::Tls11 => SslVersion::TLS1_1,
            TlsVersion::Tls12 => SslVersion::TLS1_2,
            TlsVersion::Tls13 => SslVersion::TLS1_3,
        }
    }

    /// OpenSSL option that disables this version
    pub fn disable_option(&self) -> openssl::ssl::SslOptions {
        use openssl::ssl::SslOptions;
        match self {
            TlsVersion::Tls10 => SslOptions::NO_TLSV1,
            TlsVersion::Tls11 => SslOptions::NO_TLSV1_1,
            TlsVersion::Tls12 => SslOptions::NO_TLSV1_2,
            TlsVersion::Tls13 => SslOptions::NO_TLSV1_3,
        }
    }

    /// Get version as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls10 => "TLSv1",
            TlsVersion::Tls11 => "TLSv1.1",
            TlsVersion::Tls12 => "TLSv1.2",
            TlsVersion::Tls13 => "TLSv1.3",
        }
    }
}

impl FromStr for TlsVersion {
    type Err = TlsError;

    /// Parse TLS version from string (case-insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TLSV1.0" | "TLS1.0" | "TLSV1" | "TLS1" => Ok(TlsVersion::Tls10),
            "TLSV1.1" | "TLS1.1" => Ok(TlsVersion::Tls11),
            "TLSV1.2" | "TLS1.2" => Ok(TlsVersion::Tls12),
            "TLSV1.3" | "TLS1.3" => Ok(TlsVersion::Tls13),
            _ => Err(TlsError::InvalidVersion(s.to_string())),
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client certificate authentication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientAuth {
    /// Don't request client certificates
    #[default]
    None,
    /// Request client certificate but don't require it
    Want,
    /// Require client certificate
    Need,
}

/// Key store container type
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum StoreType {
    /// PKCS#12 archive (DER)
    #[default]
    Pkcs12,
    /// PEM bundle: certificates plus an optional private key
    Pem,
    /// Hardware token reached through a security provider
    Pkcs11,
    /// Any other type name, left to registered providers
    Other(String),
}

impl StoreType {
    /// Whether the store lives in hardware and has no file location
    pub fn is_hardware_backed(&self) -> bool {
        matches!(self, StoreType::Pkcs11)
    }

    pub fn as_str(&self) -> &str {
        match self {
            StoreType::Pkcs12 => "PKCS12",
            StoreType::Pem => "PEM",
            StoreType::Pkcs11 => "PKCS11",
            StoreType::Other(name) => name,
        }
    }
}

impl From<&str> for StoreType {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "PKCS12" | "P12" | "PFX" => StoreType::Pkcs12,
            "PEM" => StoreType::Pem,
            "PKCS11" => StoreType::Pkcs11,
            _ => StoreType::Other(s.trim().to_string()),
        }
    }
}

impl From<String> for StoreType {
    fn from(s: String) -> Self {
        StoreType::from(s.as_str())
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Password or passphrase, zeroized on drop and redacted in debug output
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Secret::new(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Secret::new(value)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Declarative TLS settings (immutable after building)
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TlsConfig {
    enabled: bool,
    key_store: Option<String>,
    key_store_password: Option<Secret>,
    key_password: Option<Secret>,
    key_store_type: StoreType,
    key_store_provider: Option<String>,
    key_alias: Option<String>,
    trust_store: Option<String>,
    trust_store_password: Option<Secret>,
    trust_store_type: StoreType,
    trust_store_provider: Option<String>,
    enabled_protocols: Vec<String>,
    ciphers: Vec<String>,
    protocol: String,
    client_auth: ClientAuth,
}

impl Default for TlsConfig {
    fn default() -> Self {
        TlsConfig {
            enabled: true,
            key_store: None,
            key_store_password: None,
            key_password: None,
            key_store_type: StoreType::default(),
            key_store_provider: None,
            key_alias: None,
            trust_store: None,
            trust_store_password: None,
            trust_store_type: StoreType::default(),
            trust_store_provider: None,
            enabled_protocols: Vec::new(),
            ciphers: Vec::new(),
            protocol: TLS_PROTOCOL_FAMILY.to_string(),
            client_auth: ClientAuth::None,
        }
    }
}

impl TlsConfig {
    /// Create a new configuration builder
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::new()
    }

    /// Parse a configuration from a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, TlsError> {
        toml::from_str(s).map_err(|e| TlsError::Config(e.to_string()))
    }

    /// Read and parse a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TlsError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn key_store(&self) -> Option<&str> {
        self.key_store.as_deref()
    }

    pub fn key_store_password(&self) -> Option<&Secret> {
        self.key_store_password.as_ref()
    }

    pub fn key_password(&self) -> Option<&Secret> {
        self.key_password.as_ref()
    }

    pub fn key_store_type(&self) -> &StoreType {
        &self.key_store_type
    }

    pub fn key_store_provider(&self) -> Option<&str> {
        self.key_store_provider.as_deref()
    }

    pub fn key_alias(&self) -> Option<&str> {
        self.key_alias.as_deref()
    }

    pub fn trust_store(&self) -> Option<&str> {
        self.trust_store.as_deref()
    }

    pub fn trust_store_password(&self) -> Option<&Secret> {
        self.trust_store_password.as_ref()
    }

    pub fn trust_store_type(&self) -> &StoreType {
        &self.trust_store_type
    }

    pub fn trust_store_provider(&self) -> Option<&str> {
        self.trust_store_provider.as_deref()
    }

    /// Enabled protocol versions, in declaration order
    pub fn enabled_protocols(&self) -> &[String] {
        &self.enabled_protocols
    }

    /// Cipher suites, in declaration order
    pub fn ciphers(&self) -> &[String] {
        &self.ciphers
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn client_auth(&self) -> ClientAuth {
        self.client_auth
    }

    /// Password used to open the key store
    ///
    /// Falls back to the key password when no store password is declared.
    pub fn effective_key_store_password(&self) -> Option<&Secret> {
        self.key_store_password.as_ref().or(self.key_password.as_ref())
    }

    /// Password protecting the private key entry
    ///
    /// Falls back to the key store password when no key password is declared.
    pub fn effective_key_password(&self) -> Option<&Secret> {
        self.key_password.as_ref().or(self.key_store_password.as_ref())
    }
}

/// TLS configuration builder
#[derive(Debug, Default)]
pub struct TlsConfigBuilder {
    config: TlsConfig,
}

impl TlsConfigBuilder {
    fn new() -> Self {
        TlsConfigBuilder {
            config: TlsConfig::default(),
        }
    }

    /// Enable or disable TLS for the connector
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Set key store location (file path, optionally `file:` prefixed)
    pub fn key_store(mut self, location: impl Into<String>) -> Self {
        self.config.key_store = Some(location.into());
        self
    }

    pub fn key_store_password(mut self, password: impl Into<Secret>) -> Self {
        self.config.key_store_password = Some(password.into());
        self
    }

    pub fn key_password(mut self, password: impl Into<Secret>) -> Self {
        self.config.key_password = Some(password.into());
        self
    }

    pub fn key_store_type(mut self, store_type: impl Into<StoreType>) -> Self {
        self.config.key_store_type = store_type.into();
        self
    }

    /// Set the security provider used to instantiate the key store
    pub fn key_store_provider(mut self, provider: impl Into<String>) -> Self {
        self.config.key_store_provider = Some(provider.into());
        self
    }

    /// Select the private key entry by alias
    pub fn key_alias(mut self, alias: impl Into<String>) -> Self {
        self.config.key_alias = Some(alias.into());
        self
    }

    pub fn trust_store(mut self, location: impl Into<String>) -> Self {
        self.config.trust_store = Some(location.into());
        self
    }

    pub fn trust_store_password(mut self, password: impl Into<Secret>) -> Self {
        self.config.trust_store_password = Some(password.into());
        self
    }

    pub fn trust_store_type(mut self, store_type: impl Into<StoreType>) -> Self {
        self.config.trust_store_type = store_type.into();
        self
    }

    pub fn trust_store_provider(mut self, provider: impl Into<String>) -> Self {
        self.config.trust_store_provider = Some(provider.into());
        self
    }

    /// Restrict negotiation to these protocol versions
    pub fn enabled_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.enabled_protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Set cipher suites (IANA or OpenSSL names, order preserved)
    pub fn ciphers<I, S>(mut self, ciphers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.ciphers = ciphers.into_iter().map(Into::into).collect();
        self
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.config.protocol = protocol.into();
        self
    }

    pub fn client_auth(mut self, mode: ClientAuth) -> Self {
        self.config.client_auth = mode;
        self
    }

    /// Build the TLS configuration
    pub fn build(self) -> TlsConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_version_parsing() {
        assert_eq!("TLSv1.2".parse::<TlsVersion>().unwrap(), TlsVersion::Tls12);
        assert_eq!("tlsv1.3".parse::<TlsVersion>().unwrap(), TlsVersion::Tls13);
        assert_eq!("TLS1.0".parse::<TlsVersion>().unwrap(), TlsVersion::Tls10);
        assert_eq!("TLSv1".parse::<TlsVersion>().unwrap(), TlsVersion::Tls10);
        assert!("SSLv3".parse::<TlsVersion>().is_err());
        assert!("invalid".parse::<TlsVersion>().is_err());
    }

    #[test]
    fn test_store_type_parsing() {
        assert_eq!(StoreType::from("pkcs11"), StoreType::Pkcs11);
        assert_eq!(StoreType::from("PKCS12"), StoreType::Pkcs12);
        assert_eq!(StoreType::from("pem"), StoreType::Pem);
        assert_eq!(StoreType::from("JKS"), StoreType::Other("JKS".to_string()));
        assert!(StoreType::Pkcs11.is_hardware_backed());
        assert!(!StoreType::Pkcs12.is_hardware_backed());
    }

    #[test]
    fn test_defaults() {
        let config = TlsConfig::builder().build();

        assert!(config.enabled());
        assert_eq!(config.key_store(), None);
        assert_eq!(config.key_store_type(), &StoreType::Pkcs12);
        assert_eq!(config.protocol(), "TLS");
        assert_eq!(config.client_auth(), ClientAuth::None);
        assert!(config.ciphers().is_empty());
        assert!(config.enabled_protocols().is_empty());
    }

    #[test]
    fn test_builder_keeps_order() {
        let config = TlsConfig::builder()
            .ciphers(["CHARLIE", "ALPHA", "BRAVO", "ALPHA"])
            .enabled_protocols(["TLSv1.3", "TLSv1.2"])
            .build();

        assert_eq!(config.ciphers(), ["CHARLIE", "ALPHA", "BRAVO", "ALPHA"]);
        assert_eq!(config.enabled_protocols(), ["TLSv1.3", "TLSv1.2"]);
    }

    #[test]
    fn test_password_fallbacks() {
        let config = TlsConfig::builder().key_password("password").build();
        assert_eq!(config.effective_key_store_password().unwrap().expose(), "password");
        assert_eq!(config.effective_key_password().unwrap().expose(), "password");

        let config = TlsConfig::builder()
            .key_store_password("secret")
            .key_password("password")
            .build();
        assert_eq!(config.effective_key_store_password().unwrap().expose(), "secret");
        assert_eq!(config.effective_key_password().unwrap().expose(), "password");
    }

    #[test]
    fn test_secret_is_redacted() {
        let config = TlsConfig::builder().key_store_password("hunter2").build();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("Secret(***)"));
    }

    #[test]
    fn test_from_toml() {
        let config = TlsConfig::from_toml_str(
            r#"
            key-store = "file:server.p12"
            key-store-password = "secret"
            key-store-type = "pkcs12"
            key-alias = "server"
            trust-store = "ca.pem"
            trust-store-type = "PEM"
            enabled-protocols = ["TLSv1.2"]
            ciphers = ["ALPHA", "BRAVO"]
            client-auth = "need"
            "#,
        )
        .unwrap();

        assert_eq!(config.key_store(), Some("file:server.p12"));
        assert_eq!(config.key_store_password().unwrap().expose(), "secret");
        assert_eq!(config.key_alias(), Some("server"));
        assert_eq!(config.trust_store_type(), &StoreType::Pem);
        assert_eq!(config.enabled_protocols(), ["TLSv1.2"]);
        assert_eq!(config.ciphers(), ["ALPHA", "BRAVO"]);
        assert_eq!(config.client_auth(), ClientAuth::Need);
        assert!(config.enabled());
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = TlsConfig::from_toml_str("key-stor = \"typo.p12\"").unwrap_err();
        assert!(matches!(err, TlsError::Config(_)));
    }
}
