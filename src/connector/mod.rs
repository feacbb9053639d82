//! TLS network connector
//!
//! A [`Connector`] is a listener that owns a TLS host configuration and a
//! lifecycle state. Customizers write the host configuration while the
//! connector is `Created`; [`Connector::start`] then materializes it into an
//! OpenSSL server context and binds the socket. A connector either reaches
//! `Started` with the full TLS configuration applied or ends up `Failed`.
//!
//! # Examples
//!
//! ```no_run
//! use tlsbind::connector::Connector;
//! use tlsbind::tls::{TlsConfig, TlsConnectorCustomizer};
//!
//! let config = TlsConfig::builder()
//!     .key_store("server.p12")
//!     .key_store_password("secret")
//!     .enabled_protocols(["TLSv1.3"])
//!     .build();
//!
//! let mut connector = Connector::new("127.0.0.1:8443".parse().unwrap());
//! TlsConnectorCustomizer::new(config).customize(&mut connector).unwrap();
//! connector.start().unwrap();
//!
//! let session = connector.accept().unwrap();
//! println!("negotiated {}", session.info().version);
//! ```

pub mod host_config;
pub mod session;

pub use host_config::{ClientVerify, PlatformDefaults, SslHostCertificate, SslHostConfig};
pub use session::{HandshakeInfo, TlsSession};

use std::collections::BTreeSet;
use std::net::{SocketAddr, TcpListener};

use openssl::error::ErrorStack;
use openssl::ssl::{Ssl, SslContext, SslContextBuilder, SslMethod, SslOptions};
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, error, info, warn};

use crate::tls::config::TlsVersion;
use crate::tls::error::TlsError;
use crate::tls::loader::KeyStoreLoader;
use crate::tls::store::StoreHandle;

/// Listen backlog
pub const LISTEN_BACKLOG: i32 = 128;

/// Session id context, required once client verification is enabled
const SESSION_ID_CONTEXT: &[u8] = b"tlsbind";

/// Connector lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Starting,
    Started,
    Failed,
    Stopped,
}

/// TLS listener
pub struct Connector {
    addr: SocketAddr,
    defaults: PlatformDefaults,
    host_config: SslHostConfig,
    state: LifecycleState,
    loader: KeyStoreLoader,
    listener: Option<TcpListener>,
    context: Option<SslContext>,
}

impl Connector {
    /// Create a connector using the platform defaults of the environment
    pub fn new(addr: SocketAddr) -> Self {
        Self::with_defaults(addr, PlatformDefaults::from_env())
    }

    pub fn with_defaults(addr: SocketAddr, defaults: PlatformDefaults) -> Self {
        let host_config = SslHostConfig::new(&defaults);
        Connector {
            addr,
            defaults,
            host_config,
            state: LifecycleState::Created,
            loader: KeyStoreLoader::default(),
            listener: None,
            context: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether the host configuration may still be changed
    pub fn is_configurable(&self) -> bool {
        matches!(self.state, LifecycleState::Created | LifecycleState::Stopped)
    }

    pub fn defaults(&self) -> &PlatformDefaults {
        &self.defaults
    }

    pub fn host_config(&self) -> &SslHostConfig {
        &self.host_config
    }

    pub fn host_config_mut(&mut self) -> &mut SslHostConfig {
        &mut self.host_config
    }

    /// Loader used for the platform trust store
    pub fn store_loader(&self) -> &KeyStoreLoader {
        &self.loader
    }

    /// Replace the loader used for the platform trust store
    ///
    /// Kept across [`stop`](Self::stop), unlike the host configuration.
    pub fn set_store_loader(&mut self, loader: KeyStoreLoader) {
        self.loader = loader;
    }

    /// Record a failure that happened before start
    pub fn mark_failed(&mut self) {
        self.state = LifecycleState::Failed;
    }

    /// Bound address once started, configured address otherwise
    pub fn local_addr(&self) -> SocketAddr {
        self.listener
            .as_ref()
            .and_then(|l| l.local_addr().ok())
            .unwrap_or(self.addr)
    }

    /// Build the TLS context and bind the listener
    pub fn start(&mut self) -> Result<(), TlsError> {
        if !self.is_configurable() {
            return Err(TlsError::Startup(format!(
                "Connector cannot start from state {:?}",
                self.state
            )));
        }

        self.state = LifecycleState::Starting;
        let started = self.build_context().and_then(|context| Ok((context, self.bind()?)));

        match started {
            Ok((context, listener)) => {
                self.context = Some(context);
                self.listener = Some(listener);
                self.state = LifecycleState::Started;
                info!(addr = %self.local_addr(), "Connector started");
                Ok(())
            }
            Err(e) => {
                self.state = LifecycleState::Failed;
                error!(addr = %self.addr, error = %e, "Connector failed to start");
                Err(e)
            }
        }
    }

    /// Accept one connection and complete the TLS handshake
    pub fn accept(&self) -> Result<TlsSession, TlsError> {
        let (listener, context) = match (&self.listener, &self.context) {
            (Some(listener), Some(context)) => (listener, context),
            _ => return Err(TlsError::NotStarted),
        };

        let (stream, peer) = listener.accept()?;
        let ssl = Ssl::new(context)?;
        let stream = ssl
            .accept(stream)
            .map_err(|e| TlsError::HandshakeFailed(format!("Accept failed: {}", e)))?;

        let session = TlsSession::new(stream, peer);
        debug!(
            peer = %peer,
            version = %session.info().version,
            cipher = %session.info().cipher,
            "TLS session established"
        );
        Ok(session)
    }

    /// Close the listener
    ///
    /// The host configuration is reset to the platform defaults; it has to
    /// be customized again before the next start.
    pub fn stop(&mut self) {
        self.listener = None;
        self.context = None;
        self.host_config = SslHostConfig::new(&self.defaults);
        self.state = LifecycleState::Stopped;
        info!(addr = %self.addr, "Connector stopped");
    }

    fn build_context(&self) -> Result<SslContext, TlsError> {
        let host = &self.host_config;
        let mut builder = SslContextBuilder::new(SslMethod::tls_server())?;

        let mut versions = enabled_versions(host.enabled_protocols())?;
        if let Some(ciphers) = host.ciphers() {
            apply_ciphers(&mut builder, ciphers, &mut versions)?;
        }
        apply_protocols(&mut builder, &versions)?;

        let certificate = host
            .certificates()
            .first()
            .ok_or_else(|| TlsError::Startup("No certificate configured for TLS host".to_string()))?;
        let entry = certificate
            .keystore()
            .private_key_entry(certificate.key_alias())
            .ok_or_else(|| {
                TlsError::Startup(match certificate.key_alias() {
                    Some(alias) => format!("Keystore does not contain specified alias '{}'", alias),
                    None => "Keystore does not contain a private key entry".to_string(),
                })
            })?;
        let (leaf, chain) = entry
            .chain
            .split_first()
            .ok_or_else(|| TlsError::Startup("Private key entry has no certificate".to_string()))?;

        builder.set_private_key(&entry.key)?;
        builder.set_certificate(leaf)?;
        for cert in chain {
            builder.add_extra_chain_cert(cert.clone())?;
        }
        builder
            .check_private_key()
            .map_err(|e| TlsError::Startup(format!("Private key does not match certificate: {}", e)))?;

        if let Some(trust) = self.trust_material() {
            for cert in trust.trusted_certificates() {
                builder.cert_store_mut().add_cert(cert)?;
            }
        }

        builder.set_verify(host.certificate_verification().verify_mode());
        builder.set_session_id_context(SESSION_ID_CONTEXT)?;

        Ok(builder.build())
    }

    /// Trust store used to verify clients
    ///
    /// An explicit trust store wins. Otherwise the platform trust store is
    /// loaded through the connector's store loader, from its file or, for
    /// hardware-backed types, from its provider. Failing that, the connector
    /// runs without trust anchors.
    fn trust_material(&self) -> Option<StoreHandle> {
        let host = &self.host_config;

        if let Some(store) = host.truststore() {
            if let Some(password) = host.truststore_password() {
                if !store.verify_password(password) {
                    warn!("Password verification failed for trust store, ignoring supplied password");
                }
            }
            return Some(store.clone());
        }

        let location = host.truststore_file().map(|f| f.to_string_lossy().into_owned());
        if location.is_none() && !host.truststore_type().is_hardware_backed() {
            return None;
        }

        match self.loader.load_trust(
            location.as_deref(),
            host.truststore_password(),
            host.truststore_type(),
            None,
        ) {
            Ok(store) => Some(store),
            Err(e) => {
                warn!(truststore = ?location, error = %e, "Platform trust store unavailable");
                None
            }
        }
    }

    fn bind(&self) -> Result<TcpListener, TlsError> {
        let bind = || -> std::io::Result<TcpListener> {
            let socket = Socket::new(Domain::for_address(self.addr), Type::STREAM, Some(Protocol::TCP))?;
            socket.set_reuse_address(true)?;
            socket.bind(&self.addr.into())?;
            socket.listen(LISTEN_BACKLOG)?;
            Ok(socket.into())
        };

        bind().map_err(|e| TlsError::Startup(format!("Failed to bind {}: {}", self.addr, e)))
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("addr", &self.local_addr())
            .field("state", &self.state)
            .field("host_config", &self.host_config)
            .finish()
    }
}

/// Parse the enabled protocol names
fn enabled_versions(protocols: &BTreeSet<String>) -> Result<BTreeSet<TlsVersion>, TlsError> {
    let versions = protocols
        .iter()
        .map(|p| p.parse::<TlsVersion>())
        .collect::<Result<BTreeSet<_>, _>>()?;

    if versions.is_empty() {
        return Err(TlsError::Startup("No TLS protocol versions enabled".to_string()));
    }
    Ok(versions)
}

/// Restrict negotiation to exactly these versions
fn apply_protocols(builder: &mut SslContextBuilder, versions: &BTreeSet<TlsVersion>) -> Result<(), TlsError> {
    let (min, max) = match (versions.first(), versions.last()) {
        (Some(min), Some(max)) => (*min, *max),
        _ => return Err(TlsError::Startup("No TLS protocol versions enabled".to_string())),
    };

    builder.set_min_proto_version(Some(min.to_openssl_version()))?;
    builder.set_max_proto_version(Some(max.to_openssl_version()))?;

    // Versions between min and max that were not enabled
    let mut disabled = SslOptions::empty();
    for version in TlsVersion::ALL {
        if version > min && version < max && !versions.contains(&version) {
            disabled |= version.disable_option();
        }
    }
    builder.set_options(disabled);

    Ok(())
}

/// Apply a colon-separated suite list
///
/// IANA names are translated to OpenSSL names. Each suite is sorted into the
/// TLS 1.2 cipher list or the TLS 1.3 cipher suites; names OpenSSL does not
/// know are skipped. A version left without any configured suite is removed
/// from `versions`, so OpenSSL never falls back to its default suites for it.
fn apply_ciphers(
    builder: &mut SslContextBuilder,
    ciphers: &str,
    versions: &mut BTreeSet<TlsVersion>,
) -> Result<(), TlsError> {
    let mut tls12 = Vec::new();
    let mut tls13 = Vec::new();

    for suite in ciphers.split(':').map(str::trim).filter(|s| !s.is_empty()) {
        let name = openssl_cipher_name(suite);
        if probe(|b| b.set_cipher_list(&name)) {
            tls12.push(name);
        } else if probe(|b| b.set_ciphersuites(suite)) {
            tls13.push(suite.to_string());
        } else {
            warn!(cipher = suite, "Ignoring unsupported cipher suite");
        }
    }

    if tls12.is_empty() && tls13.is_empty() {
        return Err(TlsError::Startup(format!(
            "None of the configured cipher suites are supported: {}",
            ciphers
        )));
    }

    let enabled = versions.clone();

    // TLS 1.2 and older negotiate from the cipher list
    if tls12.is_empty() {
        versions.retain(|v| *v == TlsVersion::Tls13);
    } else {
        builder.set_cipher_list(&tls12.join(":"))?;
    }
    if tls13.is_empty() {
        versions.remove(&TlsVersion::Tls13);
    } else {
        builder.set_ciphersuites(&tls13.join(":"))?;
    }

    for version in enabled.difference(versions) {
        warn!(protocol = %version, "Disabling protocol version without configured cipher suites");
    }

    if versions.is_empty() {
        return Err(TlsError::Startup(format!(
            "No enabled protocol version can use the configured cipher suites: {}",
            ciphers
        )));
    }

    Ok(())
}

fn openssl_cipher_name(suite: &str) -> String {
    match openssl::ssl::cipher_name(suite) {
        "(NONE)" => suite.to_string(),
        name => name.to_string(),
    }
}

/// Try a setting on a scratch context
fn probe(f: impl FnOnce(&mut SslContextBuilder) -> Result<(), ErrorStack>) -> bool {
    SslContextBuilder::new(SslMethod::tls_server())
        .map(|mut builder| f(&mut builder).is_ok())
        .unwrap_or(false)
}
