use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::headers::Headers;

static REASONS: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for item in [
        "100 Continue",
        "101 Switching Protocols",
        "200 OK",
        "204 No Content",
        "400 Bad Request",
        "403 Forbidden",
        "404 Not Found",
        "405 Method Not Allowed",
        "408 Request Timeout",
        "413 Payload Too Large",
        "414 URI Too Long",
        "426 Upgrade Required",
        "431 Request Header Fields Too Large",
        "500 Internal Server Error",
        "501 Not Implemented",
        "503 Service Unavailable",
        "505 HTTP Version Not Supported",
    ] {
        if let Some((code, reason)) = item.split_once(' ') {
            if let Ok(code) = code.parse::<u16>() {
                map.insert(code, reason);
            }
        }
    }
    map
});

/// Standard reason phrase of `code`, `Unknown` for codes outside the table.
pub fn reason(code: u16) -> &'static str {
    REASONS.get(&code).copied().unwrap_or("Unknown")
}

#[derive(Debug, Clone)]
pub struct Response {
    code: u16,
    headers: Headers,
    body: Vec<u8>,
}

impl Response {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            headers: Headers::new(),
            body: vec![],
        }
    }

    #[inline]
    pub fn code(&self) -> u16 {
        self.code
    }

    #[inline]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    #[inline]
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Sets a `text/plain` body.
    pub fn text(&mut self, txt: &str) -> &mut Self {
        self.headers.set("Content-Type", "text/plain");
        self.body.clear();
        self.body.extend(txt.as_bytes());
        self
    }

    /// Serializes the status line, headers and body. Every final response
    /// carries a `Content-Length` so the peer can find the next message; a
    /// `101` ends at the blank line and the bytes after it belong to the
    /// upgraded protocol.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend(format!("HTTP/1.1 {} {}\r\n", self.code, reason(self.code)).as_bytes());
        self.headers.write_to(buf);
        if self.code >= 200 && !self.headers.contains("content-length") {
            buf.extend(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        }
        buf.extend(b"\r\n");
        buf.extend(&self.body);
    }
}
