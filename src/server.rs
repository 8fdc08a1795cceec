use std::{sync::Arc, time::Duration};

use tokio::net::TcpListener;

use crate::{
    config::http::HttpConfig,
    error::ConfigurationError,
    extension::Extension,
    handshake::Handshaker,
    observer::Observer,
    socket::RawSocket,
};

pub const DEFAULT_MAX_PAYLOAD: usize = 100 * 1024 * 1024;

pub struct ServerOptions {
    /// An already bound listener; takes precedence over `host` and `port`.
    pub transport: Option<TcpListener>,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Empty matches every request path.
    pub path: String,
    pub max_payload: usize,
    pub extensions: Vec<Box<dyn Extension>>,
    pub http: HttpConfig,
}

impl Default for ServerOptions {
    fn default() -> Self {
        let mut http = HttpConfig::default();
        http.autofix();
        Self {
            transport: None,
            host: None,
            port: None,
            path: String::new(),
            max_payload: DEFAULT_MAX_PAYLOAD,
            extensions: vec![],
            http,
        }
    }
}

enum Transport {
    Listener(TcpListener),
    Address(String, u16),
}

pub struct Server {
    handshaker: Arc<Handshaker>,
    transport: Transport,
}

impl Server {
    pub fn new(options: ServerOptions, observer: Arc<dyn Observer>) -> Result<Self, ConfigurationError> {
        let ServerOptions {
            transport,
            host,
            port,
            path,
            max_payload,
            mut extensions,
            mut http,
        } = options;

        let transport = match (transport, host, port) {
            (Some(listener), _, _) => Transport::Listener(listener),
            (None, Some(host), Some(port)) if !host.is_empty() && port != 0 => {
                Transport::Address(host, port)
            }
            _ => {
                return Err(ConfigurationError::new(
                    "one of `transport` or `host` and `port` must be provided",
                ))
            }
        };
        if max_payload == 0 {
            return Err(ConfigurationError::new("`max_payload` must be greater than 0"));
        }

        for ext in extensions.iter_mut() {
            ext.setup(max_payload)?;
        }
        http.autofix();

        Ok(Self {
            handshaker: Arc::new(Handshaker::new(
                path,
                max_payload,
                extensions.into_boxed_slice(),
                http,
                observer,
            )),
            transport,
        })
    }

    #[inline]
    pub fn handshaker(&self) -> &Arc<Handshaker> {
        &self.handshaker
    }

    #[inline]
    pub fn extensions(&self) -> &[Box<dyn Extension>] {
        self.handshaker.extensions()
    }

    pub fn should_handle(&self, path: &str) -> bool {
        self.handshaker.should_handle(path)
    }

    /// Binds if needed, then accepts connections forever. Each connection is
    /// served on its own task.
    pub async fn serve(self) {
        let observer = self.handshaker.observer().clone();
        let listener = match self.transport {
            Transport::Listener(listener) => listener,
            Transport::Address(host, port) => match TcpListener::bind((host.as_str(), port)).await {
                Ok(listener) => listener,
                Err(e) => {
                    log::error!(host = host.as_str(), port = port; "bind failed, {}", e);
                    observer.on_error(e);
                    return;
                }
            },
        };

        match listener.local_addr() {
            Ok(addr) => observer.on_listening(addr),
            Err(e) => observer.on_error(e),
        }

        let bufsize = self.handshaker.http().read_buf_size.0;
        loop {
            let (stream, addr) = match listener.accept().await {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("accept failed, {}", e);
                    observer.on_error(e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    continue;
                }
            };

            #[cfg(debug_assertions)]
            {
                log::trace!(peer = addr.to_string().as_str(); "connection made");
            }

            let handshaker = self.handshaker.clone();
            tokio::spawn(async move {
                let socket = RawSocket::with_capacity(bufsize, stream, Some(addr));
                handshaker.dispatch(socket).await;
            });
        }
    }
}
