use std::error::Error;
use std::fmt::{Display, Formatter};

use utils::anyhow::MsgError;

/// Raised while building a server from options that can never work.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ConfigurationError(String);

impl ConfigurationError {
    pub fn new(msg: &str) -> Self {
        Self(msg.to_string())
    }

    pub fn msg(&self) -> &str {
        &self.0
    }
}

impl Error for ConfigurationError {}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConfigurationError{{{}}}", self.0)
    }
}

impl From<MsgError> for ConfigurationError {
    fn from(value: MsgError) -> Self {
        Self(value.msg().to_string())
    }
}
