//! Inbound feed: one JSON message per tick carrying the application topology
//! and, usually, the latest telemetry sample.

pub mod demo;
mod frame;
mod source;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

pub use frame::{FrameDecoder, parse_frame};
pub use source::{FeedEvent, FeedSource, read_frames, spawn};

/// One tick of the feed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeedMessage {
    #[serde(default)]
    pub apps: Vec<App>,
    /// `None` on heartbeat-only ticks
    #[serde(default)]
    pub sample: Option<Sample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub name: String,
    #[serde(default)]
    pub instances: Vec<Instance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub addr: String,
    #[serde(default)]
    pub status: Status,
    /// Last up/down transition, preformatted by the producer
    #[serde(default)]
    pub time: String,
    /// Time spent in the current state, preformatted by the producer
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Up,
    Down,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Up => "UP",
            Status::Down => "DOWN",
            Status::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub value: SampleValues,
}

/// Composite-key (`"<addr>,<metric>"`) values of one sample, in the order the
/// producer wrote them. A `null` value is kept as `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleValues {
    entries: Vec<(String, Option<f64>)>,
    /// Key to position in `entries`
    positions: HashMap<String, usize>,
}

impl SampleValues {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_capacity(capacity: usize) -> Self {
        SampleValues {
            entries: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.put(key.into(), Some(value));
    }

    /// A later duplicate overwrites in place, keeping first-seen order.
    fn put(&mut self, key: String, value: Option<f64>) {
        match self.positions.get(&key) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.positions
            .get(key)
            .and_then(|&pos| self.entries[pos].1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for SampleValues {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut values = SampleValues::new();
        for (k, v) in iter {
            values.insert(k, v);
        }
        values
    }
}

impl Serialize for SampleValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SampleValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValuesVisitor;

        impl<'de> Visitor<'de> for ValuesVisitor {
            type Value = SampleValues;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of metric keys to numbers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SampleValues, A::Error> {
                let mut values = SampleValues::with_capacity(access.size_hint().unwrap_or(0).min(4096));
                while let Some((key, value)) = access.next_entry::<String, Option<f64>>()? {
                    values.put(key, value);
                }
                Ok(values)
            }
        }

        deserializer.deserialize_map(ValuesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        let inst: Instance =
            serde_json::from_str(r#"{"addr":"a:1","status":"UP","time":"t","duration":"d"}"#)
                .unwrap();
        assert_eq!(inst.status, Status::Up);

        let inst: Instance = serde_json::from_str(r#"{"addr":"a:1","status":"DOWN"}"#).unwrap();
        assert_eq!(inst.status, Status::Down);

        let inst: Instance = serde_json::from_str(r#"{"addr":"a:1","status":"flapping"}"#).unwrap();
        assert_eq!(inst.status, Status::Unknown);

        let inst: Instance = serde_json::from_str(r#"{"addr":"a:1"}"#).unwrap();
        assert_eq!(inst.status, Status::Unknown);
    }

    #[test]
    fn test_sample_values_keep_document_order() {
        let sample: Sample = serde_json::from_str(
            r#"{"timestamp":1000,"value":{"z:1,cpu_usage":1,"a:1,cpu_usage":2,"m:1,mem_used_bytes":3}}"#,
        )
        .unwrap();
        let keys: Vec<&str> = sample.value.keys().collect();
        assert_eq!(keys, vec!["z:1,cpu_usage", "a:1,cpu_usage", "m:1,mem_used_bytes"]);
        assert_eq!(sample.value.get("a:1,cpu_usage"), Some(2.0));
    }

    #[test]
    fn test_duplicate_key_overwrites_in_place() {
        let sample: Sample = serde_json::from_str(
            r#"{"timestamp":1,"value":{"a:1,cpu_usage":1,"b:1,cpu_usage":2,"a:1,cpu_usage":3}}"#,
        )
        .unwrap();
        let entries: Vec<(&str, Option<f64>)> = sample.value.iter().collect();
        assert_eq!(
            entries,
            vec![("a:1,cpu_usage", Some(3.0)), ("b:1,cpu_usage", Some(2.0))]
        );
    }

    #[test]
    fn test_wide_sample_decodes_in_order() {
        let body: Vec<String> = (0..20_000)
            .map(|i| format!(r#""10.0.{}.{}:80,cpu_usage":{}"#, i / 256, i % 256, i))
            .collect();
        let json = format!(r#"{{"timestamp":1,"value":{{{}}}}}"#, body.join(","));

        let sample: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample.value.len(), 20_000);
        assert_eq!(sample.value.keys().nth(257), Some("10.0.1.1:80,cpu_usage"));
        assert_eq!(sample.value.get("10.0.78.31:80,cpu_usage"), Some(19_999.0));
    }

    #[test]
    fn test_null_value_is_absent() {
        let sample: Sample =
            serde_json::from_str(r#"{"timestamp":1,"value":{"a,cpu_usage":null}}"#).unwrap();
        assert_eq!(sample.value.len(), 1);
        assert_eq!(sample.value.get("a,cpu_usage"), None);
    }

    #[test]
    fn test_heartbeat_message() {
        let msg: FeedMessage = serde_json::from_str(r#"{"apps":[],"sample":null}"#).unwrap();
        assert!(msg.sample.is_none());

        let msg: FeedMessage = serde_json::from_str(r#"{"apps":[]}"#).unwrap();
        assert!(msg.sample.is_none());
    }

    #[test]
    fn test_message_serializes_back_to_feed_shape() {
        let msg = FeedMessage {
            apps: vec![App {
                name: "svc".into(),
                instances: vec![Instance {
                    name: String::new(),
                    addr: "10.0.0.1:8080".into(),
                    status: Status::Unknown,
                    time: String::new(),
                    duration: String::new(),
                }],
            }],
            sample: Some(Sample {
                timestamp: 5,
                value: [("10.0.0.1:8080,cpu_usage", 1.5)].into_iter().collect(),
            }),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""status":"UNKNOWN""#));
        assert!(json.contains(r#""value":{"10.0.0.1:8080,cpu_usage":1.5}"#));
    }
}
