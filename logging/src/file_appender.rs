use tokio::io::AsyncWriteExt;
use utils::anyhow;

use crate::{
    appender::{Appender, Filter},
    item::Item,
};

pub struct FileAppender {
    inner: tokio::io::BufWriter<tokio::fs::File>,
    filter: Box<dyn Filter>,
    render_name: String,
}

#[async_trait::async_trait]
impl Appender for FileAppender {
    #[inline]
    fn renderer(&self) -> &str {
        &self.render_name
    }

    #[inline]
    fn filter(&self, item: &Item) -> bool {
        self.filter.filter(item)
    }

    async fn writeall(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.inner.write_all(buf).await
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush().await
    }
}

impl FileAppender {
    /// Opens `fp` for appending, creating missing parent directories.
    pub fn new(
        fp: &str,
        mut bufsize: usize,
        renderer: &str,
        filter: Box<dyn Filter>,
    ) -> anyhow::Result<Self> {
        if let Some(dir) = std::path::Path::new(fp).parent() {
            if !dir.as_os_str().is_empty() {
                anyhow::result(std::fs::create_dir_all(dir))?;
            }
        }

        let file = anyhow::result(
            std::fs::File::options()
                .append(true)
                .create(true)
                .open(fp),
        )?;
        let file = tokio::fs::File::from_std(file);

        if bufsize < 8192 {
            bufsize = 8192;
        }

        Ok(Self {
            inner: tokio::io::BufWriter::with_capacity(bufsize, file),
            render_name: renderer.to_string(),
            filter,
        })
    }
}
