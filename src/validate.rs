use base64::Engine;

use crate::{handshake::Handshaker, request::Request};

/// Whether the request signals a WebSocket upgrade at all.
pub fn asks_for_upgrade(request: &Request) -> bool {
    let upgrade = match request.headers().get("upgrade") {
        Some(v) => v,
        None => return false,
    };
    upgrade.trim().eq_ignore_ascii_case("websocket")
        && request.headers().has_token("connection", "upgrade")
}

pub fn is_version_and_path_compatible(
    server: &Handshaker,
    request: &Request,
    version: Option<&str>,
) -> bool {
    version.map(|v| v.trim()) == Some("13")
        && request.method() == "GET"
        && server.should_handle(request.path())
}

/// `Sec-WebSocket-Key` must be a base64-encoded 16-byte nonce.
pub fn has_valid_key(request: &Request) -> bool {
    match request.headers().get("sec-websocket-key") {
        Some(key) => match base64::engine::general_purpose::STANDARD.decode(key.trim()) {
            Ok(nonce) => nonce.len() == 16,
            Err(_) => false,
        },
        None => false,
    }
}
