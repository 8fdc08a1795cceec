use crate::error::ConfigurationError;

use super::{Extension, NegotiationError, Params};

const NAME: &str = "permessage-deflate";

const SERVER_NO_CONTEXT_TAKEOVER: &str = "server_no_context_takeover";
const CLIENT_NO_CONTEXT_TAKEOVER: &str = "client_no_context_takeover";
const SERVER_MAX_WINDOW_BITS: &str = "server_max_window_bits";
const CLIENT_MAX_WINDOW_BITS: &str = "client_max_window_bits";

/// Parameter negotiation for `permessage-deflate` (RFC 7692). Compression
/// itself belongs to the framing layer.
#[derive(Debug, Clone, Default)]
pub struct PerMessageDeflate {
    pub server_no_context_takeover: bool,
    pub client_no_context_takeover: bool,
    pub server_max_window_bits: Option<u8>,
    pub client_max_window_bits: Option<u8>,
    max_payload: usize,
}

#[derive(Debug, Default)]
struct Offer {
    server_no_context_takeover: bool,
    client_no_context_takeover: bool,
    server_max_window_bits: Option<u8>,
    /// `Some(None)` is the bare flag.
    client_max_window_bits: Option<Option<u8>>,
}

fn window_bits(v: &str) -> Option<u8> {
    match v.parse::<u8>() {
        Ok(bits) if (8..=15).contains(&bits) => Some(bits),
        _ => None,
    }
}

impl Offer {
    fn parse(params: &Params) -> Result<Self, NegotiationError> {
        let mut offer = Offer::default();
        let mut seen: Vec<&str> = vec![];

        for (k, v) in params.iter() {
            let invalid = || NegotiationError::InvalidParam {
                extension: NAME.to_string(),
                param: k.clone(),
            };
            if seen.contains(&k.as_str()) {
                return Err(invalid());
            }
            seen.push(k.as_str());

            match (k.as_str(), v.as_deref()) {
                (SERVER_NO_CONTEXT_TAKEOVER, None) => offer.server_no_context_takeover = true,
                (CLIENT_NO_CONTEXT_TAKEOVER, None) => offer.client_no_context_takeover = true,
                (SERVER_MAX_WINDOW_BITS, Some(v)) => {
                    offer.server_max_window_bits = Some(window_bits(v).ok_or_else(invalid)?);
                }
                (CLIENT_MAX_WINDOW_BITS, None) => offer.client_max_window_bits = Some(None),
                (CLIENT_MAX_WINDOW_BITS, Some(v)) => {
                    offer.client_max_window_bits = Some(Some(window_bits(v).ok_or_else(invalid)?));
                }
                _ => return Err(invalid()),
            }
        }
        Ok(offer)
    }
}

impl PerMessageDeflate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ceiling recorded by `setup`.
    #[inline]
    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    fn compatible(&self, offer: &Offer) -> bool {
        if offer.server_no_context_takeover && !self.server_no_context_takeover {
            return false;
        }
        if let (Some(ours), Some(theirs)) = (self.server_max_window_bits, offer.server_max_window_bits) {
            if ours > theirs {
                return false;
            }
        }
        if self.client_max_window_bits.is_some() && offer.client_max_window_bits.is_none() {
            return false;
        }
        true
    }

    fn answer(&self, offer: &Offer) -> Params {
        let mut params: Params = vec![];
        if self.server_no_context_takeover || offer.server_no_context_takeover {
            params.push((SERVER_NO_CONTEXT_TAKEOVER.to_string(), None));
        }
        if self.client_no_context_takeover || offer.client_no_context_takeover {
            params.push((CLIENT_NO_CONTEXT_TAKEOVER.to_string(), None));
        }
        if let Some(bits) = self.server_max_window_bits.or(offer.server_max_window_bits) {
            params.push((SERVER_MAX_WINDOW_BITS.to_string(), Some(bits.to_string())));
        }
        let client_bits = match (self.client_max_window_bits, offer.client_max_window_bits) {
            (Some(ours), Some(Some(theirs))) => Some(ours.min(theirs)),
            (Some(ours), _) => Some(ours),
            (None, Some(Some(theirs))) => Some(theirs),
            (None, _) => None,
        };
        if let Some(bits) = client_bits {
            params.push((CLIENT_MAX_WINDOW_BITS.to_string(), Some(bits.to_string())));
        }
        params
    }
}

impl Extension for PerMessageDeflate {
    fn name(&self) -> &str {
        NAME
    }

    fn setup(&mut self, max_payload: usize) -> Result<(), ConfigurationError> {
        for (name, bits) in [
            (SERVER_MAX_WINDOW_BITS, self.server_max_window_bits),
            (CLIENT_MAX_WINDOW_BITS, self.client_max_window_bits),
        ] {
            if let Some(bits) = bits {
                if !(8..=15).contains(&bits) {
                    return Err(ConfigurationError::new(&format!(
                        "{}: `{}` must be in 8..=15, got {}",
                        NAME, name, bits
                    )));
                }
            }
        }
        self.max_payload = max_payload;
        Ok(())
    }

    fn accept(&self, offers: &[Params]) -> Result<Params, NegotiationError> {
        let mut parsed = Vec::with_capacity(offers.len());
        for params in offers {
            parsed.push(Offer::parse(params)?);
        }
        match parsed.iter().find(|offer| self.compatible(offer)) {
            Some(offer) => Ok(self.answer(offer)),
            None => Err(NegotiationError::NoAcceptableOffer(NAME.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PerMessageDeflate;
    use crate::extension::{parse, serialize, Extension, Extensions, NegotiationError, Params};

    fn offers(header: &str) -> Vec<Params> {
        parse(header)
            .unwrap()
            .get("permessage-deflate")
            .unwrap()
            .to_vec()
    }

    fn answer(ext: &PerMessageDeflate, header: &str) -> Result<String, NegotiationError> {
        let params = ext.accept(&offers(header))?;
        let mut accepted = Extensions::default();
        accepted.push(ext.name(), params);
        Ok(serialize(&accepted))
    }

    #[test]
    fn default_settings_accept_browser_offer() {
        let ext = PerMessageDeflate::new();
        assert_eq!(
            answer(&ext, "permessage-deflate; client_max_window_bits").unwrap(),
            "permessage-deflate"
        );
        assert_eq!(
            answer(&ext, "permessage-deflate; client_no_context_takeover; client_max_window_bits=10").unwrap(),
            "permessage-deflate; client_no_context_takeover; client_max_window_bits=10"
        );
    }

    #[test]
    fn server_settings_merge_into_answer() {
        let mut ext = PerMessageDeflate::new();
        ext.server_no_context_takeover = true;
        ext.server_max_window_bits = Some(10);
        ext.client_max_window_bits = Some(12);

        assert_eq!(
            answer(&ext, "permessage-deflate; server_max_window_bits=9; client_max_window_bits, permessage-deflate; client_max_window_bits=11").unwrap(),
            "permessage-deflate; server_no_context_takeover; server_max_window_bits=10; client_max_window_bits=11"
        );
    }

    #[test]
    fn incompatible_offers() {
        let ext = PerMessageDeflate::new();
        assert_eq!(
            answer(&ext, "permessage-deflate; server_no_context_takeover").unwrap_err(),
            NegotiationError::NoAcceptableOffer("permessage-deflate".to_string())
        );

        let mut ext = PerMessageDeflate::new();
        ext.client_max_window_bits = Some(10);
        assert!(answer(&ext, "permessage-deflate").is_err());
    }

    #[test]
    fn invalid_parameters() {
        let ext = PerMessageDeflate::new();
        for header in [
            "permessage-deflate; foo",
            "permessage-deflate; server_no_context_takeover=1",
            "permessage-deflate; server_max_window_bits",
            "permessage-deflate; server_max_window_bits=16",
            "permessage-deflate; client_max_window_bits=7",
            "permessage-deflate; client_max_window_bits; client_max_window_bits",
        ] {
            let err = answer(&ext, header).unwrap_err();
            assert!(matches!(err, NegotiationError::InvalidParam { .. }), "{}", header);
        }
    }

    #[test]
    fn setup_records_payload_ceiling() {
        let mut ext = PerMessageDeflate::new();
        ext.setup(1024).unwrap();
        assert_eq!(ext.max_payload(), 1024);
    }

    #[test]
    fn setup_rejects_out_of_range_window_bits() {
        for (server, client) in [(Some(7), None), (Some(16), None), (None, Some(0)), (Some(15), Some(20))] {
            let mut ext = PerMessageDeflate::new();
            ext.server_max_window_bits = server;
            ext.client_max_window_bits = client;
            let err = ext.setup(1024).unwrap_err();
            assert!(err.msg().contains("max_window_bits"), "{}", err);
            assert_eq!(ext.max_payload(), 0);
        }

        let mut ext = PerMessageDeflate::new();
        ext.server_max_window_bits = Some(8);
        ext.client_max_window_bits = Some(15);
        assert!(ext.setup(1024).is_ok());
    }
}
