use std::{
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use tokio::io::{AsyncRead, AsyncReadExt};

use wsd::{Connection, Extension, Observer, Request, Response, Server, ServerOptions};

pub const CLIENT_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";
pub const ACCEPT: &str = "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=";

pub fn block_on<F: Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(f)
}

#[derive(Default)]
pub struct Recorder {
    connections: Mutex<Vec<(Connection, Request)>>,
    headers: AtomicUsize,
    stamp: Option<(&'static str, &'static str)>,
}

impl Recorder {
    pub fn stamping(k: &'static str, v: &'static str) -> Self {
        Self {
            stamp: Some((k, v)),
            ..Default::default()
        }
    }

    pub fn connections(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    pub fn headers_fired(&self) -> usize {
        self.headers.load(Ordering::SeqCst)
    }

    pub fn take(&self) -> (Connection, Request) {
        self.connections.lock().unwrap().pop().unwrap()
    }
}

impl Observer for Recorder {
    fn on_headers(&self, response: &mut Response) {
        self.headers.fetch_add(1, Ordering::SeqCst);
        if let Some((k, v)) = self.stamp {
            response.headers_mut().set(k, v);
        }
    }

    fn on_connection(&self, connection: Connection, request: Request) {
        self.connections.lock().unwrap().push((connection, request));
    }
}

pub fn server(
    path: &str,
    max_payload: usize,
    extensions: Vec<Box<dyn Extension>>,
    observer: Arc<Recorder>,
) -> Server {
    let opts = ServerOptions {
        host: Some("127.0.0.1".to_string()),
        port: Some(8080),
        path: path.to_string(),
        max_payload,
        extensions,
        ..Default::default()
    };
    Server::new(opts, observer).unwrap()
}

pub fn request(method: &str, target: &str, headers: &[(&str, &str)]) -> String {
    let mut txt = format!("{} {} HTTP/1.1\r\nHost: example.com\r\n", method, target);
    for (k, v) in headers {
        txt.push_str(&format!("{}: {}\r\n", k, v));
    }
    txt.push_str("\r\n");
    txt
}

pub fn upgrade(target: &str, extra: &[(&str, &str)]) -> String {
    let mut headers = vec![
        ("Upgrade", "websocket"),
        ("Connection", "Upgrade"),
        ("Sec-WebSocket-Key", CLIENT_KEY),
        ("Sec-WebSocket-Version", "13"),
    ];
    headers.extend_from_slice(extra);
    request("GET", target, &headers)
}

pub struct Reply {
    pub code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn header(&self, k: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(k))
            .map(|(_, v)| v.as_str())
    }
}

/// Reads exactly one response, leaving anything after it in the stream.
pub async fn read_reply<R: AsyncRead + Unpin>(r: &mut R) -> Reply {
    let mut head = vec![];
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        r.read_exact(&mut byte).await.unwrap();
        head.push(byte[0]);
    }

    let txt = String::from_utf8(head).unwrap();
    let mut lines = txt.split("\r\n");
    let code = lines
        .next()
        .unwrap()
        .split(' ')
        .nth(1)
        .unwrap()
        .parse::<u16>()
        .unwrap();

    let mut headers = vec![];
    for line in lines.filter(|l| !l.is_empty()) {
        let (k, v) = line.split_once(": ").unwrap();
        headers.push((k.to_string(), v.to_string()));
    }

    let mut reply = Reply {
        code,
        headers,
        body: vec![],
    };
    if let Some(size) = reply.header("content-length") {
        let mut body = vec![0u8; size.parse::<usize>().unwrap()];
        r.read_exact(&mut body).await.unwrap();
        reply.body = body;
    }
    reply
}
