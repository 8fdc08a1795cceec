use std::io;

use crate::{extension::Extensions, socket::RawSocket};

/// A WebSocket connection handed to the application after a successful
/// handshake. Framing is left to whoever consumes the socket.
#[derive(Debug)]
pub struct Connection {
    max_payload: usize,
    socket: Option<RawSocket>,
    extensions: Extensions,
}

impl Connection {
    pub fn new(max_payload: usize) -> Self {
        Self {
            max_payload,
            socket: None,
            extensions: Extensions::default(),
        }
    }

    /// Binds the upgraded transport and the negotiated extensions.
    pub fn start(&mut self, socket: RawSocket, extensions: Option<Extensions>) {
        self.socket = Some(socket);
        self.extensions = extensions.unwrap_or_default();
    }

    #[inline]
    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    #[inline]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.socket.is_some()
    }

    pub fn socket(&self) -> Option<&RawSocket> {
        self.socket.as_ref()
    }

    pub fn socket_mut(&mut self) -> Option<&mut RawSocket> {
        self.socket.as_mut()
    }

    pub fn into_socket(self) -> Option<RawSocket> {
        self.socket
    }

    /// Discards incoming bytes until the peer ends the stream, then releases
    /// the transport.
    pub async fn closed(&mut self) -> io::Result<()> {
        let socket = match self.socket.as_mut() {
            Some(socket) => socket,
            None => return Ok(()),
        };
        let mut buf = vec![0u8; 4096];
        let result = loop {
            match socket.read(&mut buf).await {
                Ok(0) => break Ok(()),
                Ok(_) => continue,
                Err(e) => break Err(e),
            }
        };
        socket.destroy();
        result
    }
}
