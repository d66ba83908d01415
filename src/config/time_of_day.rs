//! `"HH:MM"` (or `"HH:MM:SS"`) time-of-day fields.

use chrono::NaiveTime;
use serde::{de, Deserialize, Deserializer, Serializer};

pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.format("%H:%M:%S").to_string())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_time_of_day(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid time of day '{raw}', expected HH:MM")))
}
