/// Splits `12mb512kb` into `[("12", "mb"), ("512", "kb")]`. Whitespace is
/// ignored.
pub(crate) fn split_unit(v: &str) -> Result<Vec<(String, String)>, String> {
    let mut items: Vec<(String, String)> = vec![];

    for c in v.chars() {
        if c.is_whitespace() {
            continue;
        }

        if c.is_ascii_digit() {
            match items.last_mut() {
                Some(item) if item.1.is_empty() => item.0.push(c),
                _ => items.push((c.to_string(), String::new())),
            }
            continue;
        }

        match items.last_mut() {
            Some(item) => item.1.push(c),
            None => return Err(format!("bad unit string, `{}`", v)),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::split_unit;

    fn pairs(v: &[(&str, &str)]) -> Vec<(String, String)> {
        v.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn test_split_unit() {
        assert_eq!(split_unit("12").unwrap(), pairs(&[("12", "")]));
        assert_eq!(split_unit("").unwrap(), pairs(&[]));
        assert_eq!(split_unit("1 mb 512kb").unwrap(), pairs(&[("1", "mb"), ("512", "kb")]));
        assert!(split_unit("kb").is_err());
    }
}
