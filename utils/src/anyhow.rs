#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgError(String);

impl MsgError {
    pub fn msg(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MsgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for MsgError {}

pub type Result<T> = std::result::Result<T, MsgError>;

pub fn error<V>(msg: &str) -> Result<V> {
    Err(MsgError(msg.to_string()))
}

#[inline]
pub fn result<T>(r: std::result::Result<T, impl std::fmt::Display>) -> Result<T> {
    match r {
        Ok(v) => Ok(v),
        Err(e) => Err(MsgError(e.to_string())),
    }
}

#[inline]
pub fn option<T>(o: Option<T>, msg: &str) -> Result<T> {
    match o {
        Some(v) => Ok(v),
        None => Err(MsgError(msg.to_string())),
    }
}
