//! TLS material resolution for connectors
//!
//! This module decides which key and trust stores a connector uses, loads
//! them, and binds them together with cipher suite and protocol restrictions
//! to the connector's TLS host configuration.
//!
//! # Architecture
//!
//! Resolution runs once per connector start, leaf-first:
//!
//! 1. `KeyStoreLoader` turns a store descriptor (location, password, type,
//!    provider) into a loaded `KeyStore`, through a registry of
//!    `SecurityProvider`s. PKCS#12 and PEM files are built in; PKCS#11
//!    tokens come from registered providers.
//! 2. `TrustMaterialResolver` picks the key and trust sources, preferring
//!    stores handed over by an external `StoreMaterial`.
//! 3. `TlsConnectorBinder` writes the result into the connector's
//!    `SslHostConfig`; `TlsConnectorCustomizer` drives the whole sequence.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use tlsbind::connector::Connector;
//! use tlsbind::tls::{StaticStoreMaterial, TlsConfig, TlsConnectorCustomizer};
//!
//! let config = TlsConfig::from_file("tls.toml").unwrap();
//! let material = StaticStoreMaterial::new();
//!
//! let mut connector = Connector::new("0.0.0.0:8443".parse().unwrap());
//! TlsConnectorCustomizer::new(config)
//!     .with_store_material(Arc::new(material))
//!     .customize(&mut connector)
//!     .unwrap();
//! connector.start().unwrap();
//! ```

pub mod binder;
pub mod cert;
pub mod config;
pub mod error;
pub mod loader;
pub mod provider;
pub mod resolver;
pub mod store;

pub use binder::{TlsConnectorBinder, TlsConnectorCustomizer};
pub use cert::CertInfo;
pub use config::{ClientAuth, Secret, StoreType, TlsConfig, TlsConfigBuilder, TlsVersion};
pub use error::{StoreError, StoreRole, TlsError};
pub use loader::KeyStoreLoader;
pub use provider::{OpensslProvider, SecurityProvider, SecurityProviders};
pub use resolver::{
    ResolvedStores, StaticStoreMaterial, StoreMaterial, StoreSource, TrustMaterialResolver,
};
pub use store::{KeyStore, PrivateKeyEntry, StoreEntry, StoreHandle};

/// Result type for TLS operations
pub type Result<T> = std::result::Result<T, TlsError>;
