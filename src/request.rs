use std::{error::Error, fmt::Display, io, net::SocketAddr};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::{config::http::HttpConfig, headers::Headers};

#[derive(Debug)]
pub enum ReadError {
    /// Peer closed the stream before sending a request.
    Closed,
    /// Stream ended in the middle of a request.
    UnexpectedEof,
    Io(io::Error),
    LineTooLong,
    BadRequestLine,
    BadHeaderLine,
    TooManyHeaders,
    BadContentLength,
    BodyTooLarge,
    UnsupportedTransferEncoding,
}

impl ReadError {
    /// Whether the peer sent something that deserves a `400`.
    pub fn is_malformed(&self) -> bool {
        !matches!(
            self,
            ReadError::Closed | ReadError::UnexpectedEof | ReadError::Io(_)
        )
    }
}

impl Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Closed => write!(f, "peer closed"),
            ReadError::UnexpectedEof => write!(f, "unexpected eof"),
            ReadError::Io(e) => write!(f, "io: {}", e),
            ReadError::LineTooLong => write!(f, "line too long"),
            ReadError::BadRequestLine => write!(f, "bad request line"),
            ReadError::BadHeaderLine => write!(f, "bad header line"),
            ReadError::TooManyHeaders => write!(f, "too many headers"),
            ReadError::BadContentLength => write!(f, "bad content-length"),
            ReadError::BodyTooLarge => write!(f, "body too large"),
            ReadError::UnsupportedTransferEncoding => write!(f, "unsupported transfer-encoding"),
        }
    }
}

impl Error for ReadError {}

/// A parsed HTTP/1.1 request head. Bodies are drained, never kept.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    target: String,
    version: String,
    headers: Headers,
    peer: Option<SocketAddr>,
}

fn is_tchar(c: u8) -> bool {
    c.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&c)
}

pub(crate) fn is_token(v: &str) -> bool {
    !v.is_empty() && v.bytes().all(is_tchar)
}

async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut String,
    limit: usize,
    bad: fn() -> ReadError,
) -> Result<usize, ReadError> {
    buf.clear();
    let size = match (&mut *reader).take(limit as u64).read_line(buf).await {
        Ok(size) => size,
        Err(e) if e.kind() == io::ErrorKind::InvalidData => return Err(bad()),
        Err(e) => return Err(ReadError::Io(e)),
    };
    if size > 0 && !buf.ends_with('\n') {
        if size >= limit {
            return Err(ReadError::LineTooLong);
        }
        return Err(ReadError::UnexpectedEof);
    }
    Ok(size)
}

fn trim_eol(buf: &str) -> &str {
    buf.trim_end_matches('\n').trim_end_matches('\r')
}

impl Request {
    pub fn new(method: &str, target: &str) -> Self {
        Self {
            method: method.to_string(),
            target: target.to_string(),
            version: "HTTP/1.1".to_string(),
            headers: Headers::new(),
            peer: None,
        }
    }

    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Request target without its query string.
    pub fn path(&self) -> &str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => &self.target,
        }
    }

    #[inline]
    pub fn version(&self) -> &str {
        &self.version
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
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub(crate) fn set_peer(&mut self, peer: Option<SocketAddr>) {
        self.peer = peer;
    }

    /// Reads one request head from `reader` and drains its body.
    ///
    /// `buf` is a scratch line buffer that callers reuse across requests on
    /// the same connection.
    pub async fn read_from<R: AsyncBufRead + Unpin>(
        reader: &mut R,
        buf: &mut String,
        cfg: &HttpConfig,
    ) -> Result<Self, ReadError> {
        let line_limit = cfg.max_header_line_size.0;

        let mut first = true;
        loop {
            let size = read_line(reader, buf, line_limit, || ReadError::BadRequestLine).await?;
            if size == 0 {
                if first {
                    return Err(ReadError::Closed);
                }
                return Err(ReadError::UnexpectedEof);
            }
            // empty lines before the request line are skipped
            if !trim_eol(buf).is_empty() {
                break;
            }
            first = false;
        }

        let mut parts = trim_eol(buf).split(' ');
        let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(t), Some(v), None) => (m, t, v),
            _ => return Err(ReadError::BadRequestLine),
        };
        if !is_token(method) || target.is_empty() || !version.starts_with("HTTP/1.") {
            return Err(ReadError::BadRequestLine);
        }

        let mut req = Request::new(method, target);
        req.version = version.to_string();

        loop {
            let size = read_line(reader, buf, line_limit, || ReadError::BadHeaderLine).await?;
            if size == 0 {
                return Err(ReadError::UnexpectedEof);
            }
            let line = trim_eol(buf);
            if line.is_empty() {
                break;
            }
            if req.headers.len() >= cfg.max_headers_count as usize {
                return Err(ReadError::TooManyHeaders);
            }
            let (name, value) = match line.split_once(':') {
                Some(pair) => pair,
                None => return Err(ReadError::BadHeaderLine),
            };
            if !is_token(name) {
                return Err(ReadError::BadHeaderLine);
            }
            req.headers.append(name, value.trim());
        }

        req.drain_body(reader, cfg).await?;
        Ok(req)
    }

    async fn drain_body<R: AsyncBufRead + Unpin>(
        &self,
        reader: &mut R,
        cfg: &HttpConfig,
    ) -> Result<(), ReadError> {
        if self.headers.contains("transfer-encoding") {
            return Err(ReadError::UnsupportedTransferEncoding);
        }

        let mut length: Option<u64> = None;
        for v in self.headers.get_all("content-length") {
            let v = match v.trim().parse::<u64>() {
                Ok(v) => v,
                Err(_) => return Err(ReadError::BadContentLength),
            };
            match length {
                Some(prev) if prev != v => return Err(ReadError::BadContentLength),
                _ => length = Some(v),
            }
        }

        let length = match length {
            None | Some(0) => return Ok(()),
            Some(v) => v,
        };
        if length > cfg.max_body_size.0 as u64 {
            return Err(ReadError::BodyTooLarge);
        }

        let copied = tokio::io::copy(&mut (&mut *reader).take(length), &mut tokio::io::sink())
            .await
            .map_err(ReadError::Io)?;
        if copied < length {
            return Err(ReadError::UnexpectedEof);
        }
        Ok(())
    }
}
