use clap::Parser;
use serde::Deserialize;

use utils::anyhow;

use crate::server::{ServerOptions, DEFAULT_MAX_PAYLOAD};

use self::{
    bytes_size::BytesSize,
    extensions::{DeflateConfig, ExtensionsConfig},
    http::HttpConfig,
    logging::LoggingConfig,
};

pub mod bytes_size;
pub mod extensions;
pub mod http;
pub mod logging;
mod split_unit;

#[derive(Parser, Debug, Default)]
#[command(name = "wsd")]
#[command(about = "A WebSocket upgrade server", long_about = None)]
pub struct Args {
    #[arg(name = "config")]
    /// config file path(toml)
    pub file: Option<String>,

    #[arg(long)]
    /// listening address, overrides `host` and `port`
    pub addr: Option<String>,

    #[arg(long)]
    /// only upgrade requests to this path
    pub path: Option<String>,

    #[arg(long)]
    /// max message payload, e.g. `16mb`
    pub max_payload: Option<BytesSize>,

    #[arg(long)]
    /// enable permessage-deflate negotiation
    pub deflate: bool,
}

#[derive(Deserialize, Clone, Default, Debug)]
pub struct Config {
    #[serde(default, alias = "Host")]
    pub host: String,

    #[serde(default, alias = "Port")]
    pub port: u16,

    #[serde(default, alias = "Path")]
    pub path: String,

    #[serde(default, alias = "MaxPayload")]
    pub max_payload: BytesSize,

    #[serde(default, alias = "Http")]
    pub http: HttpConfig,

    #[serde(default, alias = "Extensions")]
    pub extensions: ExtensionsConfig,

    #[serde(default, alias = "Logging", alias = "Log", alias = "log")]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load(fp: &str) -> anyhow::Result<Self> {
        let txt = anyhow::result(std::fs::read_to_string(fp))?;
        let mut config = anyhow::result(toml::from_str::<Self>(txt.as_str()))?;
        config.autofix()?;
        Ok(config)
    }

    /// Command line values win over the file.
    pub fn merge(&mut self, args: &Args) -> anyhow::Result<()> {
        if let Some(addr) = args.addr.as_ref() {
            let (host, port) = anyhow::option(addr.rsplit_once(':'), "`addr` must be `host:port`")?;
            self.host = host.trim_start_matches('[').trim_end_matches(']').to_string();
            self.port = anyhow::result(port.parse::<u16>())?;
        }
        if let Some(path) = args.path.as_ref() {
            self.path = path.clone();
        }
        if let Some(size) = args.max_payload {
            self.max_payload = size;
        }
        if args.deflate && self.extensions.permessage_deflate.is_none() {
            self.extensions.permessage_deflate = Some(DeflateConfig::default());
        }
        self.autofix()
    }

    pub fn autofix(&mut self) -> anyhow::Result<()> {
        if self.host.is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            self.port = 8080;
        }
        if !self.path.is_empty() && !self.path.starts_with('/') {
            return anyhow::error(&format!("path must start with `/`, `{}`", self.path));
        }
        if self.max_payload.0 < 1 {
            self.max_payload = BytesSize(DEFAULT_MAX_PAYLOAD);
        }
        self.http.autofix();
        self.extensions.autofix()?;
        self.logging.autofix()?;
        Ok(())
    }

    pub fn options(&self) -> ServerOptions {
        ServerOptions {
            transport: None,
            host: Some(self.host.clone()),
            port: Some(self.port),
            path: self.path.clone(),
            max_payload: self.max_payload.0,
            extensions: self.extensions.build(),
            http: self.http.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Args, Config};
    use crate::server::DEFAULT_MAX_PAYLOAD;

    #[test]
    fn full_file() {
        let mut config: Config = toml::from_str(
            r#"
host = "0.0.0.0"
port = 9001
path = "/chat"
max_payload = "16mb"

[http]
max_header_line_size = "4kb"
max_headers_count = 64

[extensions.permessage_deflate]
server_no_context_takeover = true
client_max_window_bits = 12

[logging]
level = "debug"
console = true
renderer = "colored"
"#,
        )
        .unwrap();
        config.autofix().unwrap();

        assert_eq!(config.port, 9001);
        assert_eq!(config.max_payload.0, 16 * 1024 * 1024);
        assert_eq!(config.http.max_header_line_size.0, 4096);
        assert_eq!(config.http.max_body_size.0, 1024 * 1024);

        let opts = config.options();
        assert_eq!(opts.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(opts.path, "/chat");
        assert_eq!(opts.extensions.len(), 1);
        assert_eq!(opts.extensions[0].name(), "permessage-deflate");
    }

    #[test]
    fn empty_file_gets_defaults() {
        let mut config: Config = toml::from_str("").unwrap();
        config.autofix().unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_payload.0, DEFAULT_MAX_PAYLOAD);
        assert!(config.options().extensions.is_empty());
    }

    #[test]
    fn invalid_values() {
        let mut config: Config = toml::from_str(r#"path = "chat""#).unwrap();
        assert!(config.autofix().is_err());

        let mut config: Config = toml::from_str(
            r#"
[extensions.permessage_deflate]
server_max_window_bits = 20
"#,
        )
        .unwrap();
        assert!(config.autofix().is_err());
    }

    #[test]
    fn args_override_file() {
        let mut config = Config::default();
        let args = Args {
            addr: Some("[::1]:9002".to_string()),
            path: Some("/ws".to_string()),
            deflate: true,
            ..Default::default()
        };
        config.merge(&args).unwrap();
        assert_eq!(config.host, "::1");
        assert_eq!(config.port, 9002);
        assert_eq!(config.path, "/ws");
        assert!(config.extensions.permessage_deflate.is_some());

        let args = Args {
            addr: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(Config::default().merge(&args).is_err());
    }
}
