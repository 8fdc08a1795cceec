#[inline]
pub fn fmtlocal(v: std::time::SystemTime, fmt: &str) -> String {
    let v: chrono::DateTime<chrono::Local> = v.into();
    v.format(fmt).to_string()
}
