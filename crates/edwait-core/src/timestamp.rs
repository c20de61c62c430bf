//! Timestamp parsing and serde helpers for tabular visit data.
//!
//! Input accepts `YYYY-MM-DD HH:MM[:SS[.fff]]` with either a space or `T`
//! separator; output is always `YYYY-MM-DD HH:MM:SS`. Empty cells and JSON
//! `null` are read as missing.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serializer};

pub const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const INPUT_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parses a timestamp in any accepted input format.
#[must_use]
pub fn parse(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&value.format(OUTPUT_FORMAT))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}

pub mod optional {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => super::serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse(s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{s}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2009, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_accepted_formats() {
        assert_eq!(parse("2009-03-14 09:05:30"), Some(at(9, 5, 30)));
        assert_eq!(parse("2009-03-14T09:05:30"), Some(at(9, 5, 30)));
        assert_eq!(parse("2009-03-14 09:05"), Some(at(9, 5, 0)));
        assert_eq!(parse(" 2009-03-14T09:05 "), Some(at(9, 5, 0)));
        let fractional = parse("2009-03-14 09:05:30.250").unwrap();
        assert_eq!(fractional.format(OUTPUT_FORMAT).to_string(), "2009-03-14 09:05:30");
    }

    #[test]
    fn test_rejected_formats() {
        assert_eq!(parse("14/03/2009 09:05"), None);
        assert_eq!(parse(""), None);
    }
}
