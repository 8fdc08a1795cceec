/// Ordered header list with case-insensitive lookups.
///
/// Names keep the case they were inserted with so responses go out exactly as
/// written; repeated names are kept as separate entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    items: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self { items: vec![] }
    }

    pub fn append(&mut self, k: &str, v: &str) {
        self.items.push((k.to_string(), v.to_string()));
    }

    /// Replaces every value of `k` with `v`, keeping the position of the
    /// first existing entry.
    pub fn set(&mut self, k: &str, v: &str) {
        match self.items.iter().position(|(n, _)| n.eq_ignore_ascii_case(k)) {
            None => self.append(k, v),
            Some(idx) => {
                self.items[idx].1 = v.to_string();
                let mut seen = 0;
                self.items.retain(|(n, _)| {
                    if !n.eq_ignore_ascii_case(k) {
                        return true;
                    }
                    seen += 1;
                    seen == 1
                });
            }
        }
    }

    pub fn remove(&mut self, k: &str) {
        self.items.retain(|(n, _)| !n.eq_ignore_ascii_case(k));
    }

    pub fn contains(&self, k: &str) -> bool {
        self.items.iter().any(|(n, _)| n.eq_ignore_ascii_case(k))
    }

    pub fn get(&self, k: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(k))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a, 'b>(&'a self, k: &'b str) -> impl Iterator<Item = &'a str> + 'b
    where
        'a: 'b,
    {
        self.items
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(k))
            .map(|(_, v)| v.as_str())
    }

    /// All values of `k` joined with `, `, as if sent on one line.
    pub fn joined(&self, k: &str) -> Option<String> {
        let values: Vec<&str> = self.get_all(k).collect();
        if values.is_empty() {
            return None;
        }
        Some(values.join(", "))
    }

    /// Whether any value of `k` lists `token` among its comma-separated
    /// elements (case-insensitive).
    pub fn has_token(&self, k: &str, token: &str) -> bool {
        self.get_all(k).any(|v| {
            v.split(',')
                .map(|item| item.trim())
                .any(|item| item.eq_ignore_ascii_case(token))
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn write_to(&self, buf: &mut Vec<u8>) {
        for (k, v) in self.items.iter() {
            buf.extend(k.as_bytes());
            buf.extend(b": ");
            buf.extend(v.as_bytes());
            buf.extend(b"\r\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Headers;

    #[test]
    fn lookups_ignore_case() {
        let mut headers = Headers::new();
        headers.append("Sec-WebSocket-Version", "13");
        assert_eq!(headers.get("sec-websocket-version"), Some("13"));
        assert!(headers.contains("SEC-WEBSOCKET-VERSION"));
        assert!(!headers.contains("sec-websocket-key"));
    }

    #[test]
    fn values_outlive_the_lookup_key() {
        let mut headers = Headers::new();
        headers.append("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==");
        headers.append("Sec-WebSocket-Extensions", "x-a");
        headers.append("sec-websocket-extensions", "x-b");

        let key = {
            let name = String::from("SEC-WEBSOCKET-KEY");
            headers.get(&name)
        };
        assert_eq!(key, Some("dGhlIHNhbXBsZSBub25jZQ=="));

        let offers: Vec<&str> = {
            let name = String::from("sec-websocket-extensions");
            headers.get_all(&name).collect()
        };
        assert_eq!(offers, vec!["x-a", "x-b"]);
    }

    #[test]
    fn set_collapses_repeated_values() {
        let mut headers = Headers::new();
        headers.append("Upgrade", "websocket");
        headers.append("X-Tag", "a");
        headers.append("x-tag", "b");
        headers.set("X-TAG", "c");

        assert_eq!(headers.get_all("x-tag").collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(headers.len(), 2);

        headers.remove("upgrade");
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec![("X-Tag", "c")]);
    }

    #[test]
    fn tokens_across_lines() {
        let mut headers = Headers::new();
        headers.append("Connection", "keep-alive");
        headers.append("Connection", " Upgrade , close");
        assert!(headers.has_token("connection", "upgrade"));
        assert!(!headers.has_token("connection", "upgrades"));
        assert_eq!(
            headers.joined("connection").unwrap(),
            "keep-alive,  Upgrade , close"
        );
    }

    #[test]
    fn writes_in_insertion_order() {
        let mut headers = Headers::new();
        headers.append("Upgrade", "websocket");
        headers.append("Connection", "Upgrade");
        let mut buf = vec![];
        headers.write_to(&mut buf);
        assert_eq!(buf, b"Upgrade: websocket\r\nConnection: Upgrade\r\n");
    }
}
