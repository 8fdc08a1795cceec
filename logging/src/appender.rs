use crate::item::Item;

pub trait Renderer: Send + Sync {
    fn name(&self) -> &str;
    fn render(&self, item: &Item, buf: &mut Vec<u8>);
}

pub trait Filter: Send + Sync {
    fn filter(&self, item: &Item) -> bool;
}

impl<T: Fn(&Item) -> bool + Send + Sync> Filter for T {
    fn filter(&self, item: &Item) -> bool {
        (self)(item)
    }
}

/// Passes items at `level` or more severe.
#[derive(Debug, Clone, Copy)]
pub struct LevelFilter(pub log::Level);

impl Filter for LevelFilter {
    fn filter(&self, item: &Item) -> bool {
        item.level <= self.0
    }
}

#[async_trait::async_trait]
pub trait Appender: Send + Sync {
    fn renderer(&self) -> &str; // renderer name

    fn filter(&self, item: &Item) -> bool;

    async fn writeall(&mut self, buf: &[u8]) -> std::io::Result<()>;

    async fn flush(&mut self) -> std::io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::{Filter, LevelFilter};
    use crate::item::Item;

    fn item(level: log::Level) -> Item {
        Item {
            time: std::time::SystemTime::now(),
            level,
            target: String::new(),
            file: "",
            line: 0,
            msg: String::new(),
            kvs: smallvec::smallvec![],
        }
    }

    #[test]
    fn level_filter() {
        let f = LevelFilter(log::Level::Info);
        assert!(f.filter(&item(log::Level::Error)));
        assert!(f.filter(&item(log::Level::Info)));
        assert!(!f.filter(&item(log::Level::Debug)));
    }
}
