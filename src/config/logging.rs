use std::str::FromStr;

use serde::Deserialize;

use logging::{
    init as logging_init, Appender, ColorScheme, ColorfulLineRendererBuilder, ConsoleAppender,
    FileAppender, JsonLineRenderer, LevelFilter, Renderer, ShutdownGuard,
};
use utils::anyhow;

use super::bytes_size::BytesSize;

#[derive(Deserialize, Clone, Default, Debug)]
pub struct LoggingConfig {
    #[serde(default, alias = "Disable")]
    pub disable: Option<bool>,

    #[serde(default, alias = "Level")]
    pub level: Option<String>,

    #[serde(default, alias = "Console", alias = "debug", alias = "Debug")]
    pub console: Option<bool>,

    #[serde(default, alias = "Directory")]
    pub directory: String,

    #[serde(default, alias = "Filename")]
    pub filename: String,

    #[serde(default, alias = "BufferSize")]
    pub buffer_size: BytesSize,

    #[serde(default, alias = "Renderer", alias = "renderer_name")]
    pub renderer: String,

    #[serde(default, alias = "TimeLayout")]
    pub timelayout: String,
}

impl LoggingConfig {
    pub fn autofix(&mut self) -> anyhow::Result<()> {
        if let Some(level) = self.level.as_ref() {
            if log::Level::from_str(level).is_err() {
                return anyhow::error(&format!("unknown log level `{}`", level));
            }
        }
        if self.filename.is_empty() {
            self.filename = "wsd.log".to_string();
        }
        if self.buffer_size.0 < 8192 {
            self.buffer_size = BytesSize(8192);
        }
        if self.timelayout.is_empty() {
            self.timelayout = "%Y-%m-%d %H:%M:%S%.3f".to_string();
        }
        Ok(())
    }

    fn level(&self) -> log::Level {
        match self.level.as_ref().map(|v| log::Level::from_str(v)) {
            Some(Ok(level)) => level,
            _ => log::Level::Info,
        }
    }

    fn renderer_name(&self, default: &str) -> String {
        if self.renderer.is_empty() {
            return default.to_string();
        }
        self.renderer.to_lowercase()
    }

    fn renderer(&self, name: &str) -> anyhow::Result<Box<dyn Renderer>> {
        match name {
            "color" | "colored" | "colorful" => {
                let mut builder = ColorfulLineRendererBuilder::new();
                builder.with_name(name).with_timelayout(&self.timelayout);
                Ok(Box::new(builder.finish()))
            }
            "plain" | "text" => {
                let mut builder = ColorfulLineRendererBuilder::new();
                builder
                    .with_name(name)
                    .with_scheme(ColorScheme::none())
                    .with_timelayout(&self.timelayout);
                Ok(Box::new(builder.finish()))
            }
            "json" => Ok(Box::new(JsonLineRenderer::new(name, &self.timelayout))),
            _ => anyhow::error(&format!(
                "unknown log line renderer name(`json`, `colored`, `plain`), `{}`",
                name
            )),
        }
    }

    /// Installs the global logger. `None` when logging is disabled or no
    /// output is configured.
    pub fn init(&self) -> anyhow::Result<Option<ShutdownGuard>> {
        if self.disable.unwrap_or(false) {
            return Ok(None);
        }

        let level = self.level();
        let mut appenders: Vec<Box<dyn Appender>> = vec![];
        let mut names: Vec<String> = vec![];

        if self.console.unwrap_or(false) {
            let name = self.renderer_name("colored");
            appenders.push(Box::new(ConsoleAppender::new(
                &name,
                Box::new(LevelFilter(level)),
            )));
            names.push(name);
        }

        if !self.directory.is_empty() {
            let name = self.renderer_name("json");
            let fp = std::path::Path::new(&self.directory).join(&self.filename);
            appenders.push(Box::new(FileAppender::new(
                fp.to_string_lossy().as_ref(),
                self.buffer_size.0,
                &name,
                Box::new(LevelFilter(level)),
            )?));
            names.push(name);
        }

        if appenders.is_empty() {
            return Ok(None);
        }

        names.dedup();
        let mut renderers = vec![];
        for name in names.iter() {
            renderers.push(self.renderer(name)?);
        }
        Ok(Some(logging_init(level, appenders, renderers)?))
    }
}

#[cfg(test)]
mod tests {
    use logging::{Item, Renderer};

    use super::LoggingConfig;

    #[test]
    fn autofix_fills_defaults() {
        let mut cfg: LoggingConfig = toml::from_str(
            r#"
debug = true
renderer = "Json"
"#,
        )
        .unwrap();
        cfg.autofix().unwrap();
        assert_eq!(cfg.console, Some(true));
        assert_eq!(cfg.filename, "wsd.log");
        assert_eq!(cfg.buffer_size.0, 8192);
        assert_eq!(cfg.renderer_name("colored"), "json");
        assert!(cfg.renderer("json").is_ok());
        assert!(cfg.renderer("xml").is_err());
    }

    #[test]
    fn plain_renderer_for_uncolored_consoles() {
        let mut cfg: LoggingConfig = toml::from_str(
            r#"
console = true
renderer = "Plain"
timelayout = "T"
"#,
        )
        .unwrap();
        cfg.autofix().unwrap();

        let name = cfg.renderer_name("colored");
        assert_eq!(name, "plain");
        let renderer = cfg.renderer(&name).unwrap();
        assert_eq!(renderer.name(), "plain");

        let item = Item {
            time: std::time::SystemTime::now(),
            level: log::Level::Info,
            target: "wsd".to_string(),
            file: "src/server.rs",
            line: 7,
            msg: "listening".to_string(),
            kvs: Default::default(),
        };
        let mut buf = vec![];
        renderer.render(&item, &mut buf);
        let line = String::from_utf8(buf).unwrap();
        assert!(!line.contains('\x1b'), "{:?}", line);
        assert!(line.contains("listening"));
    }

    #[test]
    fn rejects_unknown_level() {
        let mut cfg = LoggingConfig {
            level: Some("loud".to_string()),
            ..Default::default()
        };
        assert!(cfg.autofix().is_err());
    }

    #[test]
    fn disabled_or_empty_installs_nothing() {
        let mut cfg = LoggingConfig {
            disable: Some(true),
            console: Some(true),
            ..Default::default()
        };
        cfg.autofix().unwrap();
        assert!(cfg.init().unwrap().is_none());

        let mut cfg = LoggingConfig::default();
        cfg.autofix().unwrap();
        assert!(cfg.init().unwrap().is_none());
    }
}
