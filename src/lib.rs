//! tlsbind - TLS configuration for embedded server connectors
//!
//! This crate resolves TLS key and trust material from declarative settings
//! or externally supplied stores, and binds it to a network connector.

pub mod connector;
pub mod tls;
