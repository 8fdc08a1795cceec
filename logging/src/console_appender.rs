use std::io::Write;

use crate::{
    appender::{Appender, Filter},
    item::Item,
};

pub struct ConsoleAppender {
    rendername: String,
    filter: Box<dyn Filter>,
}

impl ConsoleAppender {
    pub fn new(renderer: &str, filter: Box<dyn Filter>) -> Self {
        Self {
            rendername: renderer.to_string(),
            filter,
        }
    }
}

#[async_trait::async_trait]
impl Appender for ConsoleAppender {
    fn renderer(&self) -> &str {
        &self.rendername
    }

    fn filter(&self, item: &Item) -> bool {
        self.filter.filter(item)
    }

    async fn writeall(&mut self, buf: &[u8]) -> std::io::Result<()> {
        std::io::stdout().lock().write_all(buf)
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        std::io::stdout().flush()
    }
}
