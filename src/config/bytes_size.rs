use std::str::FromStr;

use serde::{de::Visitor, Deserialize};

use super::split_unit::split_unit;

/// A byte count written as `1024`, `"8kb"` or `"1mb512kb"`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BytesSize(pub usize);

impl FromStr for BytesSize {
    type Err = String;

    fn from_str(v: &str) -> Result<Self, Self::Err> {
        let mut amount: usize = 0;
        for (nums, units) in split_unit(v)? {
            let num = match nums.parse::<usize>() {
                Ok(v) => v,
                Err(_) => return Err(format!("bad number value, `{}`", nums)),
            };

            let unit: usize = match units.to_lowercase().as_str() {
                "" | "b" => 1,
                "k" | "kb" => 1024,
                "m" | "mb" => 1024 * 1024,
                "g" | "gb" => 1024 * 1024 * 1024,
                _ => return Err(format!("bad unit, `{}` not in `b,k,m,g`", units)),
            };

            amount = match num.checked_mul(unit).and_then(|v| v.checked_add(amount)) {
                Some(v) => v,
                None => return Err(format!("size overflow, `{}`", v)),
            };
        }
        Ok(BytesSize(amount))
    }
}

struct BytesSizeVisitor;

impl<'de> Visitor<'de> for BytesSizeVisitor {
    type Value = BytesSize;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a size in bytes, such as `12kb`, `1024`")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        BytesSize::from_str(v).map_err(E::custom)
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        usize::try_from(v)
            .map(BytesSize)
            .map_err(|_| E::custom(format!("size overflow, `{}`", v)))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        usize::try_from(v)
            .map(BytesSize)
            .map_err(|_| E::custom(format!("bad size, `{}`", v)))
    }
}

impl<'de> Deserialize<'de> for BytesSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(BytesSizeVisitor)
    }
}
