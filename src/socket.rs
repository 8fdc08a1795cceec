use std::{fmt::Debug, io, net::SocketAddr};

use futures::FutureExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{
    config::http::HttpConfig,
    extension::Extensions,
    request::{ReadError, Request},
};

pub trait RwStream: AsyncRead + AsyncWrite + Unpin + Send + Sync {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + Sync> RwStream for T {}

pub type BoxStream = Box<dyn RwStream>;

/// Error hook installed while a handshake owns the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortGuard {
    Detached,
    /// The next reported transport error destroys the socket.
    Armed,
    /// An error was reported while armed; the socket is gone.
    Fired,
}

/// The raw duplex transport of one accepted connection.
pub struct RawSocket {
    stream: Option<BufReader<BoxStream>>,
    peer: Option<SocketAddr>,
    readable: bool,
    writable: bool,
    guard: AbortGuard,
    extensions: Option<Extensions>,
}

impl Debug for RawSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawSocket")
            .field("peer", &self.peer)
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .field("destroyed", &self.stream.is_none())
            .field("guard", &self.guard)
            .finish()
    }
}

impl RawSocket {
    pub fn new<S: RwStream + 'static>(stream: S, peer: Option<SocketAddr>) -> Self {
        Self::with_capacity(8192, stream, peer)
    }

    pub fn with_capacity<S: RwStream + 'static>(
        capacity: usize,
        stream: S,
        peer: Option<SocketAddr>,
    ) -> Self {
        let stream: BoxStream = Box::new(stream);
        Self {
            stream: Some(BufReader::with_capacity(capacity, stream)),
            peer,
            readable: true,
            writable: true,
            guard: AbortGuard::Detached,
            extensions: None,
        }
    }

    #[inline]
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub(crate) fn peer_str(&self) -> String {
        match self.peer {
            Some(addr) => addr.to_string(),
            None => "-".to_string(),
        }
    }

    #[inline]
    pub fn is_readable(&self) -> bool {
        self.readable && self.stream.is_some()
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable && self.stream.is_some()
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.stream.is_none()
    }

    #[inline]
    pub fn guard(&self) -> AbortGuard {
        self.guard
    }

    pub fn attach_guard(&mut self) {
        if self.guard == AbortGuard::Detached {
            self.guard = AbortGuard::Armed;
        }
    }

    pub fn detach_guard(&mut self) {
        if self.guard == AbortGuard::Armed {
            self.guard = AbortGuard::Detached;
        }
    }

    /// Routes a transport error through the abort guard and hands it back.
    pub fn report_error(&mut self, err: io::Error) -> io::Error {
        if self.guard == AbortGuard::Armed {
            self.guard = AbortGuard::Fired;
            log::debug!(peer = self.peer_str().as_str(); "transport error during handshake, {}", err);
            self.destroy();
        }
        err
    }

    /// Updates the readable/writable flags from what the transport already
    /// knows, without waiting on it.
    pub fn probe(&mut self) {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => {
                self.readable = false;
                self.writable = false;
                return;
            }
        };

        let state = match stream.fill_buf().now_or_never() {
            None => None,
            Some(Ok(buf)) => Some(Ok(buf.is_empty())),
            Some(Err(e)) => Some(Err(e)),
        };
        match state {
            Some(Ok(true)) => self.readable = false,
            Some(Ok(false)) | None => {}
            Some(Err(e)) => {
                self.readable = false;
                self.writable = false;
                self.report_error(e);
            }
        }
    }

    pub async fn read_request(
        &mut self,
        buf: &mut String,
        cfg: &HttpConfig,
    ) -> Result<Request, ReadError> {
        let stream = match self.stream.as_mut() {
            Some(stream) if self.readable => stream,
            _ => return Err(ReadError::Closed),
        };
        match Request::read_from(stream, buf, cfg).await {
            Ok(mut req) => {
                req.set_peer(self.peer);
                Ok(req)
            }
            Err(ReadError::Closed) => {
                self.readable = false;
                Err(ReadError::Closed)
            }
            Err(ReadError::Io(e)) => {
                self.readable = false;
                Err(ReadError::Io(self.report_error(e)))
            }
            Err(e) => Err(e),
        }
    }

    /// Reads whatever arrives next; `Ok(0)` once the peer has ended.
    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let stream = match self.stream.as_mut() {
            Some(stream) if self.readable => stream,
            _ => return Ok(0),
        };
        match stream.read(buf).await {
            Ok(0) => {
                self.readable = false;
                Ok(0)
            }
            Ok(size) => Ok(size),
            Err(e) => {
                self.readable = false;
                Err(self.report_error(e))
            }
        }
    }

    /// Writes `buf` and flushes it.
    pub async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let stream = match self.stream.as_mut() {
            Some(stream) if self.writable => stream,
            _ => return Err(io::Error::from(io::ErrorKind::NotConnected)),
        };
        let result = match stream.write_all(buf).await {
            Ok(_) => stream.flush().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.writable = false;
                Err(self.report_error(e))
            }
        }
    }

    /// Ends the write side, then releases the transport.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if self.writable {
                if let Err(e) = stream.shutdown().await {
                    log::trace!(peer = self.peer_str().as_str(); "shutdown failed, {}", e);
                }
            }
        }
        self.readable = false;
        self.writable = false;
    }

    /// Releases the transport immediately. Idempotent.
    pub fn destroy(&mut self) {
        if self.stream.take().is_some() {
            #[cfg(debug_assertions)]
            {
                log::trace!(peer = self.peer_str().as_str(); "socket destroyed");
            }
        }
        self.readable = false;
        self.writable = false;
    }

    #[inline]
    pub fn extensions(&self) -> Option<&Extensions> {
        self.extensions.as_ref()
    }

    pub fn set_extensions(&mut self, extensions: Extensions) {
        self.extensions = Some(extensions);
    }

    pub fn take_extensions(&mut self) -> Option<Extensions> {
        self.extensions.take()
    }
}
