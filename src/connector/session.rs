//! Accepted TLS sessions

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

use openssl::ssl::{SslRef, SslStream};

use crate::tls::cert::{peer_cert_chain, CertInfo};

/// Parameters negotiated during the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeInfo {
    /// Negotiated TLS version (e.g., "TLSv1.3")
    pub version: String,
    /// Negotiated cipher suite (OpenSSL name)
    pub cipher: String,
    /// Client certificate chain, empty when none was presented
    pub peer_cert_chain: Vec<CertInfo>,
}

impl HandshakeInfo {
    pub fn from_ssl(ssl: &SslRef) -> Self {
        HandshakeInfo {
            version: ssl.version_str().to_string(),
            cipher: ssl
                .current_cipher()
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| "<undef>".to_string()),
            peer_cert_chain: peer_cert_chain(ssl),
        }
    }
}

/// Server side of an established TLS connection
pub struct TlsSession {
    stream: SslStream<TcpStream>,
    peer: SocketAddr,
    info: HandshakeInfo,
}

impl TlsSession {
    pub(crate) fn new(stream: SslStream<TcpStream>, peer: SocketAddr) -> Self {
        let info = HandshakeInfo::from_ssl(stream.ssl());
        TlsSession { stream, peer, info }
    }

    pub fn info(&self) -> &HandshakeInfo {
        &self.info
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Send close_notify and shut the TCP connection down
    pub fn close(mut self) -> std::io::Result<()> {
        // The peer may already be gone; close_notify is best effort
        let _ = self.stream.shutdown();
        self.stream.get_mut().shutdown(Shutdown::Both)
    }
}

impl std::fmt::Debug for TlsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsSession")
            .field("peer", &self.peer)
            .field("info", &self.info)
            .finish()
    }
}

impl Read for TlsSession {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TlsSession {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush()
    }
}
