pub mod config;
pub mod connection;
pub mod error;
pub mod extension;
pub mod handshake;
pub mod headers;
pub mod observer;
pub mod request;
pub mod response;
pub mod server;
pub mod socket;
pub mod validate;

pub use connection::Connection;
pub use error::ConfigurationError;
pub use extension::{Extension, Extensions, NegotiationError, PerMessageDeflate};
pub use handshake::{accept_key, HandshakeContext, Handshaker, Outcome, State};
pub use observer::{ChannelObserver, Event, Observer};
pub use request::{ReadError, Request};
pub use response::Response;
pub use server::{Server, ServerOptions};
pub use socket::{AbortGuard, RawSocket, RwStream};
