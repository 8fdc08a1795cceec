use crate::request::is_token;

use super::{NegotiationError, Offers, Params};

/// Splits `v` on `sep` outside double quotes.
fn split_unquoted(v: &str, sep: char) -> Result<Vec<&str>, NegotiationError> {
    let mut items = vec![];
    let mut begin = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (idx, c) in v.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            c if c == sep && !quoted => {
                items.push(&v[begin..idx]);
                begin = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    if quoted || escaped {
        return Err(NegotiationError::Malformed(format!(
            "unterminated quoted string in `{}`",
            v
        )));
    }
    items.push(&v[begin..]);
    Ok(items)
}

fn unquote(v: &str) -> Option<String> {
    let inner = v.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(chars.next()?),
            '"' => return None,
            c => out.push(c),
        }
    }
    Some(out)
}

fn parse_param(item: &str) -> Result<(String, Option<String>), NegotiationError> {
    let malformed = || NegotiationError::Malformed(format!("bad extension parameter `{}`", item));

    let (key, value) = match item.split_once('=') {
        Some((k, v)) => (k.trim(), Some(v.trim())),
        None => (item.trim(), None),
    };
    if !is_token(key) {
        return Err(malformed());
    }

    let value = match value {
        None => None,
        Some(v) if v.starts_with('"') => match unquote(v) {
            // quoted values must still be tokens once unescaped
            Some(v) if is_token(&v) => Some(v),
            _ => return Err(malformed()),
        },
        Some(v) if is_token(v) => Some(v.to_string()),
        Some(_) => return Err(malformed()),
    };
    Ok((key.to_string(), value))
}

/// Parses a `Sec-WebSocket-Extensions` value into offers grouped by
/// extension name, keeping the order names first appear in.
pub fn parse(header: &str) -> Result<Offers, NegotiationError> {
    let mut offers = Offers::default();
    for element in split_unquoted(header, ',')? {
        let mut parts = split_unquoted(element, ';')?.into_iter();
        let name = parts.next().unwrap_or_default().trim();
        if !is_token(name) {
            return Err(NegotiationError::Malformed(format!(
                "bad extension name in `{}`",
                element.trim()
            )));
        }

        let mut params: Params = vec![];
        for part in parts {
            params.push(parse_param(part)?);
        }
        offers.push(name, params);
    }
    Ok(offers)
}

pub(crate) fn format_params(name: &str, params: &Params, buf: &mut String) {
    buf.push_str(name);
    for (k, v) in params.iter() {
        buf.push_str("; ");
        buf.push_str(k);
        if let Some(v) = v {
            buf.push('=');
            if is_token(v) {
                buf.push_str(v);
            } else {
                buf.push('"');
                for c in v.chars() {
                    if c == '"' || c == '\\' {
                        buf.push('\\');
                    }
                    buf.push(c);
                }
                buf.push('"');
            }
        }
    }
}
