//! Security providers
//!
//! A provider knows how to instantiate stores of one or more types. The
//! built-in [`OpensslProvider`] parses file-based PKCS#12 and PEM stores;
//! hardware-backed stores (PKCS#11 tokens) come from providers registered by
//! the embedding application.

use std::sync::Arc;

use super::config::{Secret, StoreType};
use super::error::StoreError;
use super::store::KeyStore;

/// Name of the built-in provider
pub const OPENSSL_PROVIDER: &str = "OpenSSL";

/// Store factory for one or more store types
pub trait SecurityProvider: Send + Sync {
    /// Provider name, matched exactly against `key-store-provider`
    fn name(&self) -> &str;

    /// Whether the provider can instantiate stores of this type
    fn supports(&self, store_type: &StoreType) -> bool;

    /// Instantiate and load a store
    ///
    /// `input` holds the store file contents, and is `None` for
    /// hardware-backed stores that have no file representation.
    fn load(
        &self,
        store_type: &StoreType,
        input: Option<&[u8]>,
        password: Option<&Secret>,
    ) -> Result<KeyStore, StoreError>;
}

/// Built-in provider for PKCS#12 and PEM files
#[derive(Debug, Default, Clone, Copy)]
pub struct OpensslProvider;

impl SecurityProvider for OpensslProvider {
    fn name(&self) -> &str {
        OPENSSL_PROVIDER
    }

    fn supports(&self, store_type: &StoreType) -> bool {
        matches!(store_type, StoreType::Pkcs12 | StoreType::Pem)
    }

    fn load(
        &self,
        store_type: &StoreType,
        input: Option<&[u8]>,
        password: Option<&Secret>,
    ) -> Result<KeyStore, StoreError> {
        let input = input.ok_or(StoreError::MissingLocation)?;
        match store_type {
            StoreType::Pkcs12 => KeyStore::from_pkcs12(input, password, OPENSSL_PROVIDER),
            StoreType::Pem => KeyStore::from_pem(input, password, OPENSSL_PROVIDER),
            other => Err(StoreError::UnsupportedType(other.to_string())),
        }
    }
}

/// Ordered registry of security providers
#[derive(Clone)]
pub struct SecurityProviders {
    providers: Vec<Arc<dyn SecurityProvider>>,
}

impl SecurityProviders {
    /// Registry without any provider
    pub fn empty() -> Self {
        SecurityProviders { providers: Vec::new() }
    }

    /// Append a provider; earlier providers win when several support a type
    pub fn register(&mut self, provider: Arc<dyn SecurityProvider>) {
        self.providers.push(provider);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, provider: Arc<dyn SecurityProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Remove a provider by name, returning whether it was registered
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.providers.len();
        self.providers.retain(|p| p.name() != name);
        before != self.providers.len()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn SecurityProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Pick the provider for a store type
    ///
    /// A named provider must exist and support the type. Without a name the
    /// first registered provider supporting the type is used.
    pub fn select(
        &self,
        store_type: &StoreType,
        name: Option<&str>,
    ) -> Result<&Arc<dyn SecurityProvider>, StoreError> {
        match name {
            Some(name) => {
                let provider = self
                    .get(name)
                    .ok_or_else(|| StoreError::UnknownProvider(name.to_string()))?;
                if !provider.supports(store_type) {
                    return Err(StoreError::ProviderMismatch {
                        provider: name.to_string(),
                        store_type: store_type.to_string(),
                    });
                }
                Ok(provider)
            }
            None => self
                .providers
                .iter()
                .find(|p| p.supports(store_type))
                .ok_or_else(|| match store_type {
                    StoreType::Other(name) => StoreError::UnsupportedType(name.clone()),
                    other => StoreError::NoProvider(other.to_string()),
                }),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

impl Default for SecurityProviders {
    fn default() -> Self {
        SecurityProviders::empty().with(Arc::new(OpensslProvider))
    }
}

impl std::fmt::Debug for SecurityProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
