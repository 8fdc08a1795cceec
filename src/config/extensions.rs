use serde::Deserialize;

use utils::anyhow;

use crate::extension::{Extension, PerMessageDeflate};

#[derive(Deserialize, Clone, Default, Debug)]
pub struct DeflateConfig {
    #[serde(default, alias = "ServerNoContextTakeover")]
    pub server_no_context_takeover: bool,

    #[serde(default, alias = "ClientNoContextTakeover")]
    pub client_no_context_takeover: bool,

    #[serde(default, alias = "ServerMaxWindowBits")]
    pub server_max_window_bits: Option<u8>,

    #[serde(default, alias = "ClientMaxWindowBits")]
    pub client_max_window_bits: Option<u8>,
}

#[derive(Deserialize, Clone, Default, Debug)]
pub struct ExtensionsConfig {
    #[serde(
        default,
        alias = "PerMessageDeflate",
        alias = "permessage-deflate",
        alias = "deflate"
    )]
    pub permessage_deflate: Option<DeflateConfig>,
}

impl ExtensionsConfig {
    pub fn autofix(&mut self) -> anyhow::Result<()> {
        if let Some(deflate) = self.permessage_deflate.as_ref() {
            for (name, bits) in [
                ("server_max_window_bits", deflate.server_max_window_bits),
                ("client_max_window_bits", deflate.client_max_window_bits),
            ] {
                if let Some(bits) = bits {
                    if !(8..=15).contains(&bits) {
                        return anyhow::error(&format!(
                            "permessage_deflate.{} must be in 8..=15, got {}",
                            name, bits
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Extensions in negotiation order.
    pub fn build(&self) -> Vec<Box<dyn Extension>> {
        let mut extensions: Vec<Box<dyn Extension>> = vec![];
        if let Some(cfg) = self.permessage_deflate.as_ref() {
            let mut deflate = PerMessageDeflate::new();
            deflate.server_no_context_takeover = cfg.server_no_context_takeover;
            deflate.client_no_context_takeover = cfg.client_no_context_takeover;
            deflate.server_max_window_bits = cfg.server_max_window_bits;
            deflate.client_max_window_bits = cfg.client_max_window_bits;
            extensions.push(Box::new(deflate));
        }
        extensions
    }
}
