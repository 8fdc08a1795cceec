use serde::Deserialize;

use super::bytes_size::BytesSize;

/// Limits applied while reading HTTP requests before an upgrade.
#[derive(Deserialize, Clone, Default, Debug)]
pub struct HttpConfig {
    #[serde(default, alias = "MaxHeaderLineSize")]
    pub max_header_line_size: BytesSize,

    #[serde(default, alias = "MaxHeadersCount")]
    pub max_headers_count: u32,

    #[serde(default, alias = "MaxBodySize")]
    pub max_body_size: BytesSize,

    #[serde(default, alias = "ReadBufSize")]
    pub read_buf_size: BytesSize,
}

impl HttpConfig {
    pub fn autofix(&mut self) {
        if self.max_header_line_size.0 < 1 {
            self.max_header_line_size = BytesSize(8 * 1024); // 8KB
        }
        if self.max_headers_count < 1 {
            self.max_headers_count = 128;
        }
        if self.max_body_size.0 < 1 {
            self.max_body_size = BytesSize(1024 * 1024); // 1MB
        }
        if self.read_buf_size.0 < 1024 {
            self.read_buf_size = BytesSize(8 * 1024);
        }
    }
}
