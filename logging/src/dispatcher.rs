use std::collections::HashSet;

use utils::anyhow;

use crate::{appender::Renderer, item::Item, Appender};

enum Message {
    Flush(std::sync::mpsc::Sender<()>),
    LogItem(Item),
}

pub struct Dispatcher {
    level: log::LevelFilter,
    sx: std::sync::mpsc::Sender<Message>,
}

impl log::Log for Dispatcher {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if self.sx.send(Message::LogItem(Item::from(record))).is_err() {
            eprintln!("logging: consumer is gone, drop `{}`", record.args());
        }
    }

    fn flush(&self) {
        let (done_sx, done_rx) = std::sync::mpsc::channel();
        if self.sx.send(Message::Flush(done_sx)).is_err() {
            return;
        }
        _ = done_rx.recv_timeout(std::time::Duration::from_secs(3));
    }
}

/// Flushes every appender when dropped.
pub struct ShutdownGuard(());

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        log::logger().flush();
    }
}

struct Consumer {
    appenders: Vec<Box<dyn Appender>>,
    renderers: Vec<Box<dyn Renderer>>,
    map: Vec<usize>, // appender idx -> renderer idx
}

impl Consumer {
    fn init(&mut self) -> anyhow::Result<()> {
        if self.renderers.is_empty() {
            return anyhow::error("empty renderers");
        }

        if self.appenders.is_empty() {
            return anyhow::error("empty appenders");
        }

        let mut names = HashSet::new();
        for renderer in self.renderers.iter() {
            if !names.insert(renderer.name().to_lowercase()) {
                return anyhow::error(&format!("repeated renderer `{}`", renderer.name()));
            }
        }

        for appender in self.appenders.iter() {
            let ridx = self
                .renderers
                .iter()
                .position(|r| r.name().eq_ignore_ascii_case(appender.renderer()));
            match ridx {
                Some(ridx) => self.map.push(ridx),
                None => {
                    return anyhow::error(&format!(
                        "renderer `{}` is not found",
                        appender.renderer()
                    ));
                }
            }
        }
        Ok(())
    }

    async fn consume(&mut self, item: &Item, render_bufs: &mut [Vec<u8>]) {
        let mut rendered: smallvec::SmallVec<[bool; 4]> =
            smallvec::smallvec![false; self.renderers.len()];

        for (aidx, appender) in self.appenders.iter().enumerate() {
            if !appender.filter(item) {
                continue;
            }
            let ridx = self.map[aidx];
            if rendered[ridx] {
                continue;
            }
            rendered[ridx] = true;

            let buf = &mut render_bufs[ridx];
            buf.clear();
            self.renderers[ridx].render(item, buf);
        }

        let mut fs = vec![];
        for (aidx, appender) in self.appenders.iter_mut().enumerate() {
            if !appender.filter(item) {
                continue;
            }
            fs.push(appender.writeall(&render_bufs[self.map[aidx]]));
        }

        for wr in futures::future::join_all(fs).await {
            if let Err(e) = wr {
                eprintln!("logging: write failed, {}", e);
            }
        }
    }

    async fn flush(&mut self) {
        let mut fs = vec![];
        for appender in self.appenders.iter_mut() {
            fs.push(appender.flush());
        }

        for wr in futures::future::join_all(fs).await {
            if let Err(e) = wr {
                eprintln!("logging: flush failed, {}", e);
            }
        }
    }
}

/// Installs the global logger. Items are rendered and written on a dedicated
/// thread; the returned guard flushes pending output when dropped.
pub fn init(
    level: log::Level,
    appenders: Vec<Box<dyn Appender>>,
    renderers: Vec<Box<dyn Renderer>>,
) -> anyhow::Result<ShutdownGuard> {
    let c = appenders.len();
    let mut consumer = Consumer {
        appenders,
        renderers,
        map: Vec::with_capacity(c),
    };
    consumer.init()?;

    let runtime = anyhow::result(
        tokio::runtime::Builder::new_current_thread()
            .max_blocking_threads(1)
            .build(),
    )?;

    let (sx, rx) = std::sync::mpsc::channel();
    let dispatcher = Dispatcher {
        level: level.to_level_filter(),
        sx,
    };
    anyhow::result(log::set_boxed_logger(Box::new(dispatcher)))?;
    log::set_max_level(level.to_level_filter());

    std::thread::Builder::new()
        .name("logging".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                let mut render_bufs = vec![Vec::<u8>::default(); consumer.renderers.len()];

                for msg in rx {
                    match msg {
                        Message::Flush(done) => {
                            consumer.flush().await;
                            _ = done.send(());
                        }
                        Message::LogItem(ref item) => {
                            consumer.consume(item, &mut render_bufs).await;
                        }
                    }
                }
                consumer.flush().await;
            })
        })
        .map_or_else(
            |e| anyhow::error(&format!("spawn logging thread failed, {}", e)),
            |_| Ok(ShutdownGuard(())),
        )
}
