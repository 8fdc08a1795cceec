use std::sync::Arc;

use base64::Engine;
use sha1::{Digest, Sha1};

use crate::{
    config::http::HttpConfig,
    connection::Connection,
    extension::{self, Extension},
    observer::Observer,
    request::{ReadError, Request},
    response::{reason, Response},
    socket::RawSocket,
    validate,
};

const GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// `Sec-WebSocket-Accept` value for a client key (RFC 6455 section 1.3).
pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(GUID);
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Received,
    Validating,
    Negotiating,
    Upgrading,
    Upgraded,
    Rejected,
    Aborted,
}

impl State {
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Upgraded | State::Rejected | State::Aborted)
    }
}

/// Per-request handshake record.
#[derive(Debug)]
pub struct HandshakeContext {
    state: State,
    accept_key: Option<String>,
}

impl HandshakeContext {
    pub fn new() -> Self {
        Self {
            state: State::Received,
            accept_key: None,
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    pub fn accept_key(&self) -> Option<&str> {
        self.accept_key.as_deref()
    }

    fn advance(&mut self, next: State) {
        debug_assert!(!self.state.is_terminal(), "{:?} -> {:?}", self.state, next);
        #[cfg(debug_assertions)]
        {
            log::trace!("handshake {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }
}

impl Default for HandshakeContext {
    fn default() -> Self {
        Self::new()
    }
}

/// How one request left the pipeline.
#[derive(Debug)]
pub enum Outcome {
    /// `426` sent; the socket stays open for further HTTP requests.
    UpgradeRequired(RawSocket),
    /// Error response sent and the socket closed.
    Rejected(u16),
    /// Socket destroyed without a response.
    Aborted,
    /// Socket handed to the application.
    Upgraded,
}

/// Shared, read-only handshake settings of a server.
pub struct Handshaker {
    path: String,
    max_payload: usize,
    extensions: Box<[Box<dyn Extension>]>,
    http: HttpConfig,
    observer: Arc<dyn Observer>,
}

impl Handshaker {
    pub(crate) fn new(
        path: String,
        max_payload: usize,
        extensions: Box<[Box<dyn Extension>]>,
        http: HttpConfig,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            path,
            max_payload,
            extensions,
            http,
            observer,
        }
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    #[inline]
    pub fn extensions(&self) -> &[Box<dyn Extension>] {
        &self.extensions
    }

    #[inline]
    pub fn http(&self) -> &HttpConfig {
        &self.http
    }

    pub(crate) fn observer(&self) -> &Arc<dyn Observer> {
        &self.observer
    }

    /// Empty path matches everything, otherwise exact match only.
    pub fn should_handle(&self, path: &str) -> bool {
        self.path.is_empty() || self.path == path
    }

    /// Serves HTTP requests on `socket` until one of them is upgraded or the
    /// connection goes away.
    pub async fn dispatch(&self, mut socket: RawSocket) {
        let mut buf = String::with_capacity(256);
        loop {
            let request = match socket.read_request(&mut buf, &self.http).await {
                Ok(request) => request,
                Err(ReadError::Closed) => {
                    socket.close().await;
                    return;
                }
                Err(e) if e.is_malformed() => {
                    log::debug!(peer = socket.peer_str().as_str(); "bad request, {}", e);
                    socket.attach_guard();
                    self.close_connection(HandshakeContext::new(), socket, 400)
                        .await;
                    return;
                }
                Err(_e) => {
                    #[cfg(debug_assertions)]
                    {
                        log::trace!(peer = socket.peer_str().as_str(); "read failed, {}", _e);
                    }
                    socket.destroy();
                    return;
                }
            };

            match self.handle_request(request, socket).await {
                Outcome::UpgradeRequired(next) => socket = next,
                _ => return,
            }
        }
    }

    /// Runs one request through validation, negotiation and upgrade.
    pub async fn handle_request(&self, request: Request, mut socket: RawSocket) -> Outcome {
        let mut ctx = HandshakeContext::new();
        socket.attach_guard();

        ctx.advance(State::Validating);
        if !validate::asks_for_upgrade(&request) {
            return self.ask_to_upgrade(ctx, socket).await;
        }
        let version = request.headers().get("sec-websocket-version");
        if !validate::is_version_and_path_compatible(self, &request, version)
            || !validate::has_valid_key(&request)
        {
            log::debug!(
                peer = socket.peer_str().as_str(), method = request.method(), path = request.path();
                "upgrade rejected"
            );
            return self.close_connection(ctx, socket, 400).await;
        }

        ctx.advance(State::Negotiating);
        if let Err(e) = extension::negotiate(self, &mut socket, &request) {
            log::debug!(peer = socket.peer_str().as_str(); "extension negotiation failed, {}", e);
            return self.close_connection(ctx, socket, 400).await;
        }

        ctx.advance(State::Upgrading);
        self.upgrade_connection(ctx, request, socket).await
    }

    async fn ask_to_upgrade(&self, mut ctx: HandshakeContext, mut socket: RawSocket) -> Outcome {
        let mut resp = Response::new(426);
        resp.text(reason(426));

        let mut buf = Vec::with_capacity(128);
        resp.write_to(&mut buf);
        match socket.write_all(&buf).await {
            Ok(_) => {
                ctx.advance(State::Rejected);
                Outcome::UpgradeRequired(socket)
            }
            Err(_) => {
                ctx.advance(State::Aborted);
                socket.destroy();
                Outcome::Aborted
            }
        }
    }

    async fn close_connection(
        &self,
        mut ctx: HandshakeContext,
        mut socket: RawSocket,
        code: u16,
    ) -> Outcome {
        let mut resp = Response::new(code);
        resp.headers_mut().set("Connection", "close");
        resp.text(reason(code));

        let mut buf = Vec::with_capacity(128);
        resp.write_to(&mut buf);
        let written = socket.write_all(&buf).await;
        socket.detach_guard();
        socket.close().await;

        match written {
            Ok(_) => {
                ctx.advance(State::Rejected);
                Outcome::Rejected(code)
            }
            Err(_) => {
                ctx.advance(State::Aborted);
                Outcome::Aborted
            }
        }
    }

    async fn upgrade_connection(
        &self,
        mut ctx: HandshakeContext,
        request: Request,
        mut socket: RawSocket,
    ) -> Outcome {
        socket.probe();
        if !socket.is_readable() || !socket.is_writable() {
            log::debug!(peer = socket.peer_str().as_str(); "peer went away before upgrade");
            ctx.advance(State::Aborted);
            socket.destroy();
            return Outcome::Aborted;
        }

        let key = accept_key(request.headers().get("sec-websocket-key").unwrap_or_default().trim());
        let mut resp = Response::new(101);
        resp.headers_mut().set("Upgrade", "websocket");
        resp.headers_mut().set("Connection", "Upgrade");
        resp.headers_mut().set("Sec-WebSocket-Accept", &key);
        if let Some(extensions) = socket.extensions() {
            resp.headers_mut()
                .set("Sec-WebSocket-Extensions", &extension::serialize(extensions));
        }
        ctx.accept_key = Some(key);
        self.observer.on_headers(&mut resp);

        let mut buf = Vec::with_capacity(256);
        resp.write_to(&mut buf);
        if socket.write_all(&buf).await.is_err() {
            ctx.advance(State::Aborted);
            return Outcome::Aborted;
        }
        socket.detach_guard();
        ctx.advance(State::Upgraded);

        #[cfg(debug_assertions)]
        {
            log::trace!(peer = socket.peer_str().as_str(); "upgraded, accept: {}", ctx.accept_key().unwrap_or_default());
        }

        let extensions = socket.take_extensions();
        let mut connection = Connection::new(self.max_payload);
        connection.start(socket, extensions);
        self.observer.on_connection(connection, request);
        Outcome::Upgraded
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{accept_key, HandshakeContext, State};
    use crate::{
        observer::ChannelObserver,
        server::{Server, ServerOptions},
    };

    #[test]
    fn rfc_sample_key() {
        assert_eq!(
            accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
        assert_eq!(accept_key("x3JJHMbDL1EzLkh9GBhXDw=="), accept_key("x3JJHMbDL1EzLkh9GBhXDw=="));
        assert_eq!(accept_key("x3JJHMbDL1EzLkh9GBhXDw=="), "HSmrc0sMlYUkAGmm5OPpG2HaGWk=");
    }

    #[test]
    fn context_starts_received() {
        let mut ctx = HandshakeContext::new();
        assert_eq!(ctx.state(), State::Received);
        assert!(ctx.accept_key().is_none());
        ctx.advance(State::Validating);
        ctx.advance(State::Rejected);
        assert!(ctx.state().is_terminal());
    }

    #[test]
    fn path_matching() {
        let (observer, _) = ChannelObserver::new();
        let observer = Arc::new(observer);

        let opts = ServerOptions {
            host: Some("localhost".to_string()),
            port: Some(80),
            ..Default::default()
        };
        let any = Server::new(opts, observer.clone()).unwrap();
        assert!(any.should_handle("/"));
        assert!(any.should_handle("/anything"));

        let opts = ServerOptions {
            host: Some("localhost".to_string()),
            port: Some(80),
            path: "/chat".to_string(),
            ..Default::default()
        };
        let chat = Server::new(opts, observer).unwrap();
        assert!(chat.should_handle("/chat"));
        assert!(!chat.should_handle("/chat/"));
        assert!(!chat.should_handle("/other"));
        assert!(!chat.handshaker().should_handle("/"));
    }
}
