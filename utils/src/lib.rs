pub mod anyhow;
pub mod luxon;
