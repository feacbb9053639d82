//! Key and trust material resolution
//!
//! Decides which store supplies the key material and which supplies the
//! trust material for a connector. Stores handed over by an external
//! [`StoreMaterial`] take precedence over the declarative configuration for
//! the role they fill. The two sources are never mixed for the trust role:
//! when external material supplies only a key store, trust falls back to the
//! platform defaults even if the configuration declares a trust store.

use tracing::debug;

use super::config::{Secret, TlsConfig};
use super::error::TlsError;
use super::loader::KeyStoreLoader;
use super::store::StoreHandle;

/// Collaborator supplying pre-loaded stores
pub trait StoreMaterial: Send + Sync {
    fn key_store(&self) -> Option<StoreHandle>;

    fn trust_store(&self) -> Option<StoreHandle>;
}

/// [`StoreMaterial`] holding fixed handles
#[derive(Debug, Clone, Default)]
pub struct StaticStoreMaterial {
    key_store: Option<StoreHandle>,
    trust_store: Option<StoreHandle>,
}

impl StaticStoreMaterial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_store(mut self, store: StoreHandle) -> Self {
        self.key_store = Some(store);
        self
    }

    pub fn with_trust_store(mut self, store: StoreHandle) -> Self {
        self.trust_store = Some(store);
        self
    }
}

impl StoreMaterial for StaticStoreMaterial {
    fn key_store(&self) -> Option<StoreHandle> {
        self.key_store.clone()
    }

    fn trust_store(&self) -> Option<StoreHandle> {
        self.trust_store.clone()
    }
}

/// Where a resolved store came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSource {
    /// Supplied by external store material
    External,
    /// Loaded from the declarative configuration
    Configured,
    /// Nothing resolved; the listener's platform default applies
    PlatformDefault,
}

/// Outcome of resolution, consumed by the binder
#[derive(Debug)]
pub struct ResolvedStores {
    pub key_store: StoreHandle,
    pub key_store_source: StoreSource,
    pub key_store_password: Option<Secret>,
    pub key_password: Option<Secret>,
    pub key_alias: Option<String>,
    pub trust_store: Option<StoreHandle>,
    pub trust_store_source: StoreSource,
    pub trust_store_password: Option<Secret>,
}

/// Resolves effective key and trust stores
#[derive(Debug, Clone, Default)]
pub struct TrustMaterialResolver {
    loader: KeyStoreLoader,
}

impl TrustMaterialResolver {
    pub fn new(loader: KeyStoreLoader) -> Self {
        TrustMaterialResolver { loader }
    }

    pub fn loader(&self) -> &KeyStoreLoader {
        &self.loader
    }

    /// Resolve the stores for `config`
    ///
    /// Loader failures propagate unchanged.
    pub fn resolve(
        &self,
        config: &TlsConfig,
        material: Option<&dyn StoreMaterial>,
    ) -> Result<ResolvedStores, TlsError> {
        let external_key = material.and_then(|m| m.key_store());
        let external_trust = material.and_then(|m| m.trust_store());

        let (key_store, key_store_source) = match external_key {
            Some(store) => (store, StoreSource::External),
            None => {
                let store = self.loader.load(
                    config.key_store(),
                    config.effective_key_store_password(),
                    config.key_store_type(),
                    config.key_store_provider(),
                )?;
                (store, StoreSource::Configured)
            }
        };

        let (trust_store, trust_store_source, trust_store_password) = match external_trust {
            Some(store) => (Some(store), StoreSource::External, None),
            None if key_store_source == StoreSource::External => {
                debug!("External key store without trust store, using platform default trust");
                (None, StoreSource::PlatformDefault, None)
            }
            None => match config.trust_store() {
                Some(location) => {
                    let store = self.loader.load_trust(
                        Some(location),
                        config.trust_store_password(),
                        config.trust_store_type(),
                        config.trust_store_provider(),
                    )?;
                    (
                        Some(store),
                        StoreSource::Configured,
                        config.trust_store_password().cloned(),
                    )
                }
                None => (None, StoreSource::PlatformDefault, None),
            },
        };

        if let Some(alias) = config.key_alias() {
            if key_store.private_key_entry(Some(alias)).is_none() {
                return Err(TlsError::InvalidConfiguration(format!(
                    "Keystore does not contain specified alias '{}'",
                    alias
                )));
            }
        }

        debug!(
            key_store = ?key_store_source,
            trust_store = ?trust_store_source,
            "Resolved TLS stores"
        );

        Ok(ResolvedStores {
            key_store,
            key_store_source,
            key_store_password: config.effective_key_store_password().cloned(),
            key_password: config.effective_key_password().cloned(),
            key_alias: config.key_alias().map(str::to_string),
            trust_store,
            trust_store_source,
            trust_store_password,
        })
    }
}
