// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! WebSocket Transport
//!
//! Real transport implementation using tungstenite for WebSocket connections.
//! Supports both native-tls and rustls TLS backends; plain `ws://` needs
//! neither.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

#[cfg(all(feature = "network-native-tls", not(feature = "network-rustls")))]
use native_tls::TlsConnector;

#[cfg(feature = "network-rustls")]
use rustls::pki_types::ServerName;
#[cfg(feature = "network-rustls")]
use std::sync::Arc;

use tracing::{debug, warn};
use tungstenite::client::IntoClientRequest;
use tungstenite::http::{HeaderName, HeaderValue};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use super::error::NetworkError;
use super::transport::{ConnectionState, Frame, Transport, TransportConfig, TransportResult};

/// WebSocket transport for Engine.IO sessions.
///
/// Supports both ws:// (plaintext) and wss:// (TLS) connections.
///
/// # Example
///
/// ```ignore
/// use siobridge_core::network::{WebSocketTransport, TransportConfig};
///
/// let mut transport = WebSocketTransport::new();
/// let config = TransportConfig {
///     server_url: "ws://localhost:4000/socket.io/?EIO=4&transport=websocket".to_string(),
///     ..Default::default()
/// };
/// transport.connect(&config)?;
/// ```
pub struct WebSocketTransport {
    socket: Option<WebSocket<MaybeTlsStream<TcpStream>>>,
    /// Handle on the raw socket, used to retune timeouts after the handshake.
    tcp: Option<TcpStream>,
    config: TransportConfig,
    state: ConnectionState,
}

impl WebSocketTransport {
    /// Creates a new WebSocket transport.
    pub fn new() -> Self {
        WebSocketTransport {
            socket: None,
            tcp: None,
            config: TransportConfig::default(),
            state: ConnectionState::Disconnected,
        }
    }

    /// Parses a WebSocket URL into host and port.
    fn parse_url(url: &str) -> Result<(String, u16, bool), NetworkError> {
        let is_tls = url.starts_with("wss://");
        let url_without_scheme = url
            .strip_prefix("wss://")
            .or_else(|| url.strip_prefix("ws://"))
            .ok_or_else(|| {
                NetworkError::InvalidRequest("Invalid URL scheme (expected ws:// or wss://)".into())
            })?;

        // Split host:port/path?query
        let host_port = url_without_scheme
            .split(['/', '?'])
            .next()
            .unwrap_or(url_without_scheme);

        if host_port.is_empty() {
            return Err(NetworkError::InvalidRequest("Missing host".into()));
        }

        let (host, port) = match host_port.rfind(':') {
            Some(colon_pos) if !host_port.ends_with(']') => {
                let host = &host_port[..colon_pos];
                let port_str = &host_port[colon_pos + 1..];
                let port: u16 = port_str
                    .parse()
                    .map_err(|_| NetworkError::InvalidRequest(format!("Invalid port: {}", port_str)))?;
                (host.to_string(), port)
            }
            _ => {
                let default_port = if is_tls { 443 } else { 80 };
                (host_port.to_string(), default_port)
            }
        };

        Ok((host, port, is_tls))
    }

    fn open_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, NetworkError> {
        let addrs: Vec<SocketAddr> = (host.trim_matches(['[', ']']), port)
            .to_socket_addrs()
            .map_err(|e| NetworkError::ConnectionFailed(format!("Cannot resolve {}: {}", host, e)))?
            .collect();

        let mut last_error = NetworkError::ConnectionFailed(format!("No address for {}", host));
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    last_error = NetworkError::Timeout;
                }
                Err(e) => last_error = NetworkError::ConnectionFailed(e.to_string()),
            }
        }
        Err(last_error)
    }

    /// Create a TLS stream using native-tls
    #[cfg(all(feature = "network-native-tls", not(feature = "network-rustls")))]
    fn create_tls_stream(
        host: &str,
        tcp_stream: TcpStream,
    ) -> Result<MaybeTlsStream<TcpStream>, NetworkError> {
        let connector = TlsConnector::new()
            .map_err(|e| NetworkError::ConnectionFailed(format!("TLS error: {}", e)))?;
        let tls_stream = connector
            .connect(host, tcp_stream)
            .map_err(|e| NetworkError::ConnectionFailed(format!("TLS handshake failed: {}", e)))?;
        Ok(MaybeTlsStream::NativeTls(tls_stream))
    }

    /// Create a TLS stream using rustls
    #[cfg(feature = "network-rustls")]
    fn create_tls_stream(
        host: &str,
        tcp_stream: TcpStream,
    ) -> Result<MaybeTlsStream<TcpStream>, NetworkError> {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let server_name: ServerName<'_> = host.to_string().try_into().map_err(|_| {
            NetworkError::ConnectionFailed(format!("Invalid server name: {}", host))
        })?;

        let tls_conn = rustls::ClientConnection::new(Arc::new(config), server_name)
            .map_err(|e| NetworkError::ConnectionFailed(format!("TLS setup failed: {}", e)))?;

        let tls_stream = rustls::StreamOwned::new(tls_conn, tcp_stream);
        Ok(MaybeTlsStream::Rustls(tls_stream))
    }

    #[cfg(not(any(feature = "network-native-tls", feature = "network-rustls")))]
    fn create_tls_stream(
        _host: &str,
        _tcp_stream: TcpStream,
    ) -> Result<MaybeTlsStream<TcpStream>, NetworkError> {
        Err(NetworkError::ConnectionFailed(
            "wss:// requires the network-native-tls or network-rustls feature".into(),
        ))
    }

    fn handshake(
        &self,
        config: &TransportConfig,
        host: &str,
        port: u16,
        is_tls: bool,
    ) -> Result<(WebSocket<MaybeTlsStream<TcpStream>>, TcpStream), NetworkError> {
        let connect_timeout = Duration::from_millis(config.connect_timeout_ms.max(1));
        let tcp_stream = Self::open_tcp(host, port, connect_timeout)?;

        // The upgrade exchange is bounded by the connect timeout
        tcp_stream
            .set_read_timeout(Some(connect_timeout))
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        tcp_stream
            .set_write_timeout(Some(Duration::from_millis(config.io_timeout_ms.max(1))))
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        tcp_stream
            .set_nodelay(true)
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        let tcp_handle = tcp_stream
            .try_clone()
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        let stream: MaybeTlsStream<TcpStream> = if is_tls {
            Self::create_tls_stream(host, tcp_stream)?
        } else {
            MaybeTlsStream::Plain(tcp_stream)
        };

        let mut request = config
            .server_url
            .as_str()
            .into_client_request()
            .map_err(|e| NetworkError::InvalidRequest(format!("Invalid WebSocket request: {}", e)))?;

        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| NetworkError::InvalidRequest(format!("Invalid header name: {}", e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| NetworkError::InvalidRequest(format!("Invalid header value: {}", e)))?;
            request.headers_mut().insert(name, value);
        }

        let (socket, _response) = tungstenite::client(request, stream).map_err(|e| {
            NetworkError::ConnectionFailed(format!("WebSocket handshake failed: {}", e))
        })?;

        // From here on reads return every poll interval so the driver can tick
        tcp_handle
            .set_read_timeout(Some(Duration::from_millis(config.poll_interval_ms.max(1))))
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        Ok((socket, tcp_handle))
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, config: &TransportConfig) -> TransportResult<()> {
        if matches!(self.state, ConnectionState::Connected) {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        self.config = config.clone();

        let (host, port, is_tls) = Self::parse_url(&config.server_url).inspect_err(|_| {
            self.state = ConnectionState::Disconnected;
        })?;

        debug!(%host, port, is_tls, "opening websocket");

        let (socket, tcp) = self
            .handshake(config, &host, port, is_tls)
            .inspect_err(|_| {
                self.state = ConnectionState::Disconnected;
            })?;

        self.socket = Some(socket);
        self.tcp = Some(tcp);
        self.state = ConnectionState::Connected;

        Ok(())
    }

    fn disconnect(&mut self) -> TransportResult<()> {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None); // Ignore errors on close
            let _ = socket.flush();
        }
        if let Some(tcp) = self.tcp.take() {
            let _ = tcp.shutdown(std::net::Shutdown::Both);
        }
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.state.clone()
    }

    fn send(&mut self, frame: Frame) -> TransportResult<()> {
        let socket = self.socket.as_mut().ok_or(NetworkError::NotConnected)?;

        let ws_message = match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(data) => Message::Binary(data),
        };

        socket.send(ws_message).map_err(|e| {
            // Connection may be broken
            if matches!(
                e,
                tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed
            ) {
                self.state = ConnectionState::Disconnected;
                NetworkError::ConnectionClosed
            } else {
                NetworkError::SendFailed(e.to_string())
            }
        })?;

        Ok(())
    }

    fn receive(&mut self) -> TransportResult<Option<Frame>> {
        let socket = self.socket.as_mut().ok_or(NetworkError::NotConnected)?;

        match socket.read() {
            Ok(Message::Text(text)) => Ok(Some(Frame::Text(text))),
            Ok(Message::Binary(data)) => Ok(Some(Frame::Binary(data))),
            // tungstenite queues the pong itself
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => Ok(None),
            Ok(Message::Close(close)) => {
                debug!(?close, "websocket closed by peer");
                self.state = ConnectionState::Disconnected;
                Err(NetworkError::ConnectionClosed)
            }
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                // Nothing within the poll interval
                Ok(None)
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                self.state = ConnectionState::Disconnected;
                Err(NetworkError::ConnectionClosed)
            }
            Err(e) => {
                warn!(error = %e, "websocket read failed");
                self.state = ConnectionState::Disconnected;
                Err(NetworkError::ReceiveFailed(e.to_string()))
            }
        }
    }
}

// INLINE_TEST_REQUIRED: Tests private parse_url function for URL parsing logic
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_wss() {
        let (host, port, is_tls) = WebSocketTransport::parse_url("wss://io.example.com").unwrap();
        assert_eq!(host, "io.example.com");
        assert_eq!(port, 443);
        assert!(is_tls);
    }

    #[test]
    fn test_parse_url_ws() {
        let (host, port, is_tls) = WebSocketTransport::parse_url("ws://localhost:4000").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 4000);
        assert!(!is_tls);
    }

    #[test]
    fn test_parse_url_with_engine_path() {
        let (host, port, is_tls) = WebSocketTransport::parse_url(
            "ws://127.0.0.1:4000/socket.io/?EIO=4&transport=websocket",
        )
        .unwrap();
        assert_eq!(host, "127.0.0.1");
        assert_eq!(port, 4000);
        assert!(!is_tls);
    }

    #[test]
    fn test_parse_url_query_without_path() {
        let (host, port, _) = WebSocketTransport::parse_url("ws://localhost:81?EIO=4").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 81);
    }

    #[test]
    fn test_parse_url_ipv6_default_port() {
        let (host, port, _) = WebSocketTransport::parse_url("ws://[::1]/socket.io/").unwrap();
        assert_eq!(host, "[::1]");
        assert_eq!(port, 80);
    }

    #[test]
    fn test_parse_url_invalid_scheme() {
        let result = WebSocketTransport::parse_url("http://example.com");
        assert!(matches!(result, Err(NetworkError::InvalidRequest(_))));
    }

    #[test]
    fn test_parse_url_invalid_port() {
        let result = WebSocketTransport::parse_url("ws://localhost:notaport");
        assert!(matches!(result, Err(NetworkError::InvalidRequest(_))));
    }

    #[test]
    fn test_new_transport_disconnected() {
        let transport = WebSocketTransport::new();
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_send_without_connect_fails() {
        let mut transport = WebSocketTransport::new();
        let result = transport.send(Frame::from("2"));
        assert!(matches!(result, Err(NetworkError::NotConnected)));
    }

    #[test]
    fn test_receive_without_connect_fails() {
        let mut transport = WebSocketTransport::new();
        let result = transport.receive();
        assert!(matches!(result, Err(NetworkError::NotConnected)));
    }

    #[test]
    fn test_disconnect_when_not_connected_ok() {
        let mut transport = WebSocketTransport::new();
        let result = transport.disconnect();
        assert!(result.is_ok());
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }
}
