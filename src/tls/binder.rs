//! Connector TLS binding
//!
//! [`TlsConnectorBinder`] writes resolved stores, cipher suites and protocol
//! versions into a connector's [`SslHostConfig`]. [`TlsConnectorCustomizer`]
//! is the entry point that resolves the stores for a configuration and binds
//! them to a connector before it starts.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::config::{TlsConfig, TLS_PROTOCOL_FAMILY};
use super::error::TlsError;
use super::loader::KeyStoreLoader;
use super::provider::SecurityProviders;
use super::resolver::{ResolvedStores, StoreMaterial, TrustMaterialResolver};
use crate::connector::{ClientVerify, Connector, SslHostCertificate, SslHostConfig};

/// Applies resolved TLS material to a host configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsConnectorBinder;

impl TlsConnectorBinder {
    /// Write `config` and `stores` into `host`
    ///
    /// Cipher suites are joined verbatim; validation happens when the
    /// connector builds its TLS context.
    pub fn bind(&self, host: &mut SslHostConfig, config: &TlsConfig, stores: ResolvedStores) {
        if !config.ciphers().is_empty() {
            host.set_ciphers(config.ciphers().join(":"));
        }

        if config.protocol() != TLS_PROTOCOL_FAMILY {
            warn!(
                protocol = config.protocol(),
                "Ignoring configured protocol, connectors always negotiate the TLS family"
            );
        }
        host.set_ssl_protocol(TLS_PROTOCOL_FAMILY);

        if !config.enabled_protocols().is_empty() {
            host.set_enabled_protocols(config.enabled_protocols().iter().cloned());
        }

        host.set_certificate(
            SslHostCertificate::new(stores.key_store)
                .with_keystore_password(stores.key_store_password)
                .with_key_password(stores.key_password)
                .with_key_alias(stores.key_alias),
        );

        // The truststore file keeps its platform default when nothing resolved
        if let Some(trust_store) = stores.trust_store {
            host.set_truststore(Some(trust_store));
            host.set_truststore_password(stores.trust_store_password);
        }

        host.set_certificate_verification(ClientVerify::from(config.client_auth()));

        debug!(
            ciphers = ?host.ciphers(),
            protocols = ?host.enabled_protocols(),
            client_verify = ?host.certificate_verification(),
            "Bound TLS host configuration"
        );
    }
}

/// Configures TLS on a connector
pub struct TlsConnectorCustomizer {
    config: TlsConfig,
    material: Option<Arc<dyn StoreMaterial>>,
    resolver: TrustMaterialResolver,
    binder: TlsConnectorBinder,
}

impl TlsConnectorCustomizer {
    /// Customizer loading every store from `config` with the built-in providers
    pub fn new(config: TlsConfig) -> Self {
        TlsConnectorCustomizer {
            config,
            material: None,
            resolver: TrustMaterialResolver::default(),
            binder: TlsConnectorBinder,
        }
    }

    /// Use pre-loaded stores ahead of the configured ones
    pub fn with_store_material(mut self, material: Arc<dyn StoreMaterial>) -> Self {
        self.material = Some(material);
        self
    }

    /// Load stores through `providers` instead of the built-in registry
    ///
    /// The registry is handed to the connector as well, for its platform
    /// trust store.
    pub fn with_providers(mut self, providers: SecurityProviders) -> Self {
        self.resolver = TrustMaterialResolver::new(KeyStoreLoader::new(providers));
        self
    }

    pub fn config(&self) -> &TlsConfig {
        &self.config
    }

    /// Resolve the stores and bind them to `connector`
    ///
    /// Disabled configurations leave the connector untouched. Any failure
    /// marks the connector failed so that it never starts half-configured.
    pub fn customize(&self, connector: &mut Connector) -> Result<(), TlsError> {
        if !self.config.enabled() {
            debug!("TLS disabled, connector left unchanged");
            return Ok(());
        }

        if !connector.is_configurable() {
            return Err(TlsError::InvalidConfiguration(format!(
                "Connector cannot be customized in state {:?}",
                connector.state()
            )));
        }

        let stores = match self.resolver.resolve(&self.config, self.material.as_deref()) {
            Ok(stores) => stores,
            Err(e) => {
                connector.mark_failed();
                return Err(e);
            }
        };

        // The platform trust store is loaded at start through the same providers
        connector.set_store_loader(self.resolver.loader().clone());
        self.binder.bind(connector.host_config_mut(), &self.config, stores);
        info!(addr = %connector.local_addr(), "TLS configured for connector");
        Ok(())
    }
}

impl std::fmt::Debug for TlsConnectorCustomizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConnectorCustomizer")
            .field("config", &self.config)
            .field("material", &self.material.is_some())
            .field("resolver", &self.resolver)
            .finish()
    }
}
