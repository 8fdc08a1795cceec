use utils::luxon;

use crate::{appender::Renderer, item::Item};

#[derive(Debug, Default)]
pub struct JsonLineRenderer {
    name: String,
    timelayout: String,
}

impl JsonLineRenderer {
    pub fn new(name: &str, timelayout: &str) -> Self {
        Self {
            name: name.to_string(),
            timelayout: timelayout.to_string(),
        }
    }
}

fn push_quoted(buf: &mut Vec<u8>, txt: &str) {
    match serde_json::to_string(txt) {
        Ok(v) => buf.extend(v.as_bytes()),
        Err(_) => buf.extend("\"\"".as_bytes()),
    }
}

impl Renderer for JsonLineRenderer {
    fn name(&self) -> &str {
        if self.name.is_empty() {
            return "JsonLineRenderer";
        }
        &self.name
    }

    fn render(&self, item: &Item, buf: &mut Vec<u8>) {
        buf.push(b'{');

        push_quoted(buf, "level");
        buf.push(b':');
        push_quoted(buf, item.level.as_str());

        buf.push(b',');
        push_quoted(buf, "time");
        buf.push(b':');
        let time_in_txt = if self.timelayout.is_empty() {
            luxon::fmtlocal(item.time, "%Y-%m-%d %H:%M:%S%.6f %Z")
        } else {
            luxon::fmtlocal(item.time, &self.timelayout)
        };
        push_quoted(buf, &time_in_txt);

        if !item.target.is_empty() {
            buf.push(b',');
            push_quoted(buf, "target");
            buf.push(b':');
            push_quoted(buf, &item.target);
        }

        buf.push(b',');
        push_quoted(buf, "lineno");
        buf.push(b':');
        push_quoted(buf, &format!("{}:{}", item.file, item.line));

        buf.push(b',');
        push_quoted(buf, "message");
        buf.push(b':');
        push_quoted(buf, &item.msg);

        if item.kvs.is_empty() {
            buf.extend("}\n".as_bytes());
            return;
        }

        buf.push(b',');
        push_quoted(buf, "kvs");
        buf.push(b':');

        buf.push(b'{');
        let last = item.kvs.len() - 1;
        for (idx, pair) in item.kvs.iter().enumerate() {
            push_quoted(buf, &pair.0);
            buf.push(b':');
            buf.extend(pair.1.as_bytes());
            if idx != last {
                buf.push(b',');
            }
        }

        buf.extend("}}\n".as_bytes());
    }
}
