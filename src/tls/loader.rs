//! Key store loading
//!
//! Turns a logical store descriptor (location, password, type, provider)
//! into a loaded [`StoreHandle`]. File-based stores are read from disk and
//! parsed by the selected provider; hardware-backed stores are handed to
//! their provider with the password only.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::config::{Secret, StoreType};
use super::error::{StoreError, StoreRole, TlsError};
use super::provider::SecurityProviders;
use super::store::StoreHandle;

/// Upper bound on the size of a store file
pub const MAX_STORE_FILE_SIZE: u64 = 4_000_000;

/// Location prefix accepted for plain file paths
const FILE_PREFIX: &str = "file:";

/// Loads stores through a registry of security providers
#[derive(Debug, Clone, Default)]
pub struct KeyStoreLoader {
    providers: SecurityProviders,
}

impl KeyStoreLoader {
    pub fn new(providers: SecurityProviders) -> Self {
        KeyStoreLoader { providers }
    }

    pub fn providers(&self) -> &SecurityProviders {
        &self.providers
    }

    /// Load a key store
    ///
    /// Hardware-backed types must not carry a location; every other type
    /// must. Failures to read or parse are reported as
    /// [`TlsError::StoreLoad`] naming the attempted location.
    pub fn load(
        &self,
        location: Option<&str>,
        password: Option<&Secret>,
        store_type: &StoreType,
        provider: Option<&str>,
    ) -> Result<StoreHandle, TlsError> {
        self.load_as(StoreRole::Key, location, password, store_type, provider)
    }

    /// Load a trust store, with the same rules as [`load`](Self::load)
    pub fn load_trust(
        &self,
        location: Option<&str>,
        password: Option<&Secret>,
        store_type: &StoreType,
        provider: Option<&str>,
    ) -> Result<StoreHandle, TlsError> {
        self.load_as(StoreRole::Trust, location, password, store_type, provider)
    }

    fn load_as(
        &self,
        role: StoreRole,
        location: Option<&str>,
        password: Option<&Secret>,
        store_type: &StoreType,
        provider: Option<&str>,
    ) -> Result<StoreHandle, TlsError> {
        let has_location = location.is_some_and(|l| !l.trim().is_empty());

        if store_type.is_hardware_backed() {
            if has_location {
                return Err(TlsError::InvalidConfiguration(format!(
                    "Input keystore location is not valid for keystore type '{}'",
                    store_type
                )));
            }

            debug!(%role, store_type = %store_type, provider = ?provider, "Loading hardware-backed store");
            return self
                .load_from_provider(store_type, None, password, provider)
                .map_err(|e| TlsError::store_load(role, location, e));
        }

        let path = match location {
            Some(l) if has_location => l,
            _ => return Err(TlsError::store_load(role, location, StoreError::MissingLocation)),
        };

        debug!(%role, location = path, store_type = %store_type, provider = ?provider, "Loading store");
        read_store_file(path)
            .and_then(|bytes| self.load_from_provider(store_type, Some(&bytes), password, provider))
            .map_err(|e| TlsError::store_load(role, location, e))
    }

    fn load_from_provider(
        &self,
        store_type: &StoreType,
        input: Option<&[u8]>,
        password: Option<&Secret>,
        provider: Option<&str>,
    ) -> Result<StoreHandle, StoreError> {
        let provider = self.providers.select(store_type, provider)?;
        let store = provider.load(store_type, input, password)?;

        debug!(
            provider = provider.name(),
            store_type = %store_type,
            entries = store.entries().len(),
            "Key store loaded"
        );
        Ok(Arc::new(store))
    }
}

/// Read a store file, closing it on every exit path
fn read_store_file(location: &str) -> Result<Vec<u8>, StoreError> {
    let path = Path::new(location.strip_prefix(FILE_PREFIX).unwrap_or(location));
    let file = File::open(path)?;

    let mut contents = Vec::new();
    file.take(MAX_STORE_FILE_SIZE + 1).read_to_end(&mut contents)?;
    if contents.len() as u64 > MAX_STORE_FILE_SIZE {
        return Err(StoreError::TooLarge(MAX_STORE_FILE_SIZE));
    }

    Ok(contents)
}
