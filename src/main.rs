use std::sync::Arc;

use clap::Parser;
use utils::anyhow;

use wsd::{
    config::{Args, Config},
    ChannelObserver, Event, Server,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = match args.file.as_ref() {
        Some(fp) => Config::load(fp)?,
        None => Config::default(),
    };
    config.merge(&args)?;

    let _guard = config.logging.init()?;

    let (observer, mut events) = ChannelObserver::new();
    let server = Server::new(config.options(), Arc::new(observer))?;
    let serving = tokio::spawn(server.serve());

    let mut listening = false;
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(Event::Listening(addr)) => {
                        listening = true;
                        log::info!("wsd listening @ {}, pid: {}", addr, std::process::id());
                    }
                    Some(Event::Error(e)) => {
                        log::error!("server error, {}", e);
                    }
                    Some(Event::Connection(mut conn, req)) => {
                        let peer = req.peer().map(|v| v.to_string()).unwrap_or_default();
                        log::info!(peer = peer.as_str(), path = req.path(); "connection upgraded, {} extension(s)", conn.extensions().len());
                        tokio::spawn(async move {
                            if let Err(e) = conn.closed().await {
                                log::debug!(peer = peer.as_str(); "connection failed, {}", e);
                            }
                        });
                    }
                    None => {
                        if !listening {
                            anyhow::error::<()>("server stopped before listening")?;
                        }
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("wsd is preparing to shutdown");
                break;
            }
        }
    }

    serving.abort();
    Ok(())
}
