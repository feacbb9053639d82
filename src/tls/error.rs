//! TLS errors
//!
//! Two layers: [`StoreError`] describes why a single store could not be
//! materialized, [`TlsError`] is what the customizer and the connector
//! surface to their callers.

/// Errors raised while reading or parsing a single store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("Unsupported key store type '{0}'")]
    UnsupportedType(String),

    #[error("Security provider '{0}' is not registered")]
    UnknownProvider(String),

    #[error("No security provider supports key store type '{0}'")]
    NoProvider(String),

    #[error("Security provider '{provider}' does not support key store type '{store_type}'")]
    ProviderMismatch { provider: String, store_type: String },

    #[error("Key store location is not set")]
    MissingLocation,

    #[error("Key store file exceeds {0} bytes")]
    TooLarge(u64),

    #[error("Key store contains no entries")]
    Empty,

    #[error("{0}")]
    Provider(String),
}

/// Role a store plays for a connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreRole {
    /// Holds the server's private key and certificate chain
    Key,
    /// Holds the anchors client certificates are verified against
    Trust,
}

impl std::fmt::Display for StoreRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreRole::Key => f.write_str("key"),
            StoreRole::Trust => f.write_str("trust"),
        }
    }
}

/// TLS customization and connector errors
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("{0}")]
    InvalidConfiguration(String),

    #[error("Could not load {role} store '{location}'")]
    StoreLoad {
        role: StoreRole,
        location: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to start connector: {0}")]
    Startup(String),

    #[error("Invalid TLS configuration file: {0}")]
    Config(String),

    #[error("Invalid TLS version: {0}")]
    InvalidVersion(String),

    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("Connector is not started")]
    NotStarted,

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TlsError {
    /// Build a store load failure, rendering an absent location as `null`
    pub fn store_load(role: StoreRole, location: Option<&str>, source: StoreError) -> Self {
        TlsError::StoreLoad {
            role,
            location: location.unwrap_or("null").to_string(),
            source,
        }
    }

    /// Whether this error belongs to the server-startup category
    ///
    /// Startup failures abort the connector before it reaches `Started`.
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            TlsError::StoreLoad { .. } | TlsError::Startup(_) | TlsError::InvalidVersion(_)
        )
    }
}
