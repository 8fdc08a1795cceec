use std::{error::Error, fmt::Display};

use crate::{error::ConfigurationError, handshake::Handshaker, request::Request, socket::RawSocket};

mod deflate;
mod params;

pub use deflate::PerMessageDeflate;
pub use params::parse;

/// Ordered `key[=value]` parameters of one extension offer or answer.
pub type Params = Vec<(String, Option<String>)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    /// The header does not follow the extension list grammar.
    Malformed(String),
    /// An offer carries a parameter the extension does not understand.
    InvalidParam { extension: String, param: String },
    /// Every offer of the extension conflicts with the server settings.
    NoAcceptableOffer(String),
}

impl Display for NegotiationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NegotiationError::Malformed(msg) => write!(f, "malformed extensions header: {}", msg),
            NegotiationError::InvalidParam { extension, param } => {
                write!(f, "invalid parameter `{}` for `{}`", param, extension)
            }
            NegotiationError::NoAcceptableOffer(name) => {
                write!(f, "no acceptable offer for `{}`", name)
            }
        }
    }
}

impl Error for NegotiationError {}

/// Offers from a client, grouped by extension name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Offers(Vec<(String, Vec<Params>)>);

impl Offers {
    pub(crate) fn push(&mut self, name: &str, params: Params) {
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some((_, offers)) => offers.push(params),
            None => self.0.push((name.to_string(), vec![params])),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[Params]> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, offers)| offers.as_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Extensions accepted for one connection, in server configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions(Vec<(String, Params)>);

impl Extensions {
    pub fn push(&mut self, name: &str, params: Params) {
        self.0.push((name.to_string(), params));
    }

    pub fn get(&self, name: &str) -> Option<&Params> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Params)> {
        self.0.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub trait Extension: Send + Sync {
    /// Registered extension token, e.g. `permessage-deflate`.
    fn name(&self) -> &str;

    /// Called once by the server before any request is handled. An error
    /// here stops the server from being built.
    fn setup(&mut self, max_payload: usize) -> Result<(), ConfigurationError>;

    /// Picks one of the client's offers and returns the parameters to answer
    /// with.
    fn accept(&self, offers: &[Params]) -> Result<Params, NegotiationError>;
}

/// Runs the configured extensions against the offers in `request`, attaching
/// whatever they accept to `socket`.
pub fn negotiate(
    server: &Handshaker,
    socket: &mut RawSocket,
    request: &Request,
) -> Result<(), NegotiationError> {
    let configured = server.extensions();
    if configured.is_empty() {
        return Ok(());
    }
    let header = match request.headers().joined("sec-websocket-extensions") {
        Some(v) => v,
        None => return Ok(()),
    };

    let offers = parse(&header)?;
    let mut accepted = Extensions::default();
    for ext in configured.iter() {
        let offered = match offers.get(ext.name()) {
            Some(offered) => offered,
            None => continue,
        };
        let params = ext.accept(offered)?;
        accepted.push(ext.name(), params);
    }

    if !accepted.is_empty() {
        socket.set_extensions(accepted);
    }
    Ok(())
}

/// Renders accepted extensions as a `Sec-WebSocket-Extensions` value.
pub fn serialize(extensions: &Extensions) -> String {
    let mut buf = String::new();
    for (idx, (name, params)) in extensions.0.iter().enumerate() {
        if idx > 0 {
            buf.push_str(", ");
        }
        params::format_params(name, params, &mut buf);
    }
    buf
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{negotiate, serialize, Extension, Extensions, NegotiationError, Params};
    use crate::{
        error::ConfigurationError,
        observer::ChannelObserver,
        request::Request,
        server::{Server, ServerOptions},
        socket::RawSocket,
    };

    struct Echo(&'static str);

    impl Extension for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn setup(&mut self, _max_payload: usize) -> Result<(), ConfigurationError> {
            Ok(())
        }

        fn accept(&self, offers: &[Params]) -> Result<Params, NegotiationError> {
            Ok(offers[0].clone())
        }
    }

    fn server(extensions: Vec<Box<dyn Extension>>) -> Server {
        let (observer, _) = ChannelObserver::new();
        let opts = ServerOptions {
            host: Some("127.0.0.1".to_string()),
            port: Some(8080),
            extensions,
            ..Default::default()
        };
        Server::new(opts, Arc::new(observer)).unwrap()
    }

    fn request(extensions: &[&str]) -> Request {
        let mut req = Request::new("GET", "/");
        for v in extensions {
            req.headers_mut().append("Sec-WebSocket-Extensions", v);
        }
        req
    }

    #[test]
    fn serializes_in_order() {
        let mut extensions = Extensions::default();
        extensions.push(
            "permessage-deflate",
            vec![
                ("server_no_context_takeover".to_string(), None),
                ("client_max_window_bits".to_string(), Some("10".to_string())),
            ],
        );
        extensions.push("x-tag", vec![("label".to_string(), Some("a b".to_string()))]);
        assert_eq!(
            serialize(&extensions),
            "permessage-deflate; server_no_context_takeover; client_max_window_bits=10, x-tag; label=\"a b\""
        );
    }

    #[test]
    fn nothing_configured_or_offered() {
        let (_, stream) = tokio::io::duplex(64);
        let mut socket = RawSocket::new(stream, None);

        let plain = server(vec![]);
        negotiate(plain.handshaker(), &mut socket, &request(&["x-a; bad=\"\""])).unwrap();
        assert!(socket.extensions().is_none());

        let server = server(vec![Box::new(Echo("x-a"))]);
        negotiate(server.handshaker(), &mut socket, &request(&[])).unwrap();
        assert!(socket.extensions().is_none());
        negotiate(server.handshaker(), &mut socket, &request(&["x-b"])).unwrap();
        assert!(socket.extensions().is_none());
    }

    #[test]
    fn follows_configured_order_across_lines() {
        let (_, stream) = tokio::io::duplex(64);
        let mut socket = RawSocket::new(stream, None);
        let server = server(vec![Box::new(Echo("x-b")), Box::new(Echo("x-a"))]);

        negotiate(
            server.handshaker(),
            &mut socket,
            &request(&["x-a; v=1", "x-b, x-a; v=2"]),
        )
        .unwrap();
        let names: Vec<&str> = socket.extensions().unwrap().iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["x-b", "x-a"]);
        assert_eq!(
            serialize(socket.extensions().unwrap()),
            "x-b, x-a; v=1"
        );
    }

    #[test]
    fn malformed_header_fails() {
        let (_, stream) = tokio::io::duplex(64);
        let mut socket = RawSocket::new(stream, None);
        let server = server(vec![Box::new(Echo("x-a"))]);
        let err = negotiate(server.handshaker(), &mut socket, &request(&["x-a;;"])).unwrap_err();
        assert!(matches!(err, NegotiationError::Malformed(_)));
        assert!(socket.extensions().is_none());
    }
}
