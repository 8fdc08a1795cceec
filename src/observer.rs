use std::{io, net::SocketAddr};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{connection::Connection, request::Request, response::Response};

/// Receives server lifecycle notifications.
///
/// Callbacks run inline on the task that produced them and must not block.
pub trait Observer: Send + Sync {
    fn on_listening(&self, _addr: SocketAddr) {}

    /// Listener failures. The error is handed over as is, source included.
    fn on_error(&self, _err: io::Error) {}

    /// Last chance to edit a `101` response before it is written.
    fn on_headers(&self, _response: &mut Response) {}

    fn on_connection(&self, connection: Connection, request: Request);
}

#[derive(Debug)]
pub enum Event {
    Listening(SocketAddr),
    Error(io::Error),
    Connection(Connection, Request),
}

/// Forwards notifications to an unbounded channel.
pub struct ChannelObserver {
    sx: UnboundedSender<Event>,
}

impl ChannelObserver {
    pub fn new() -> (Self, UnboundedReceiver<Event>) {
        let (sx, rx) = mpsc::unbounded_channel();
        (Self { sx }, rx)
    }
}

impl Observer for ChannelObserver {
    fn on_listening(&self, addr: SocketAddr) {
        let _ = self.sx.send(Event::Listening(addr));
    }

    fn on_error(&self, err: io::Error) {
        let _ = self.sx.send(Event::Error(err));
    }

    fn on_connection(&self, connection: Connection, request: Request) {
        if self.sx.send(Event::Connection(connection, request)).is_err() {
            log::debug!("connection dropped, no receiver");
        }
    }
}
