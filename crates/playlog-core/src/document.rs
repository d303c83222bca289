//! Generic document tree used by the structured-document heuristics.
//!
//! Parsers convert into [`Node`] so that track detection and alias lookup
//! never depend on a concrete file format.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use serde_json::Value;

/// One value in a parsed document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Date(DateTime<FixedOffset>),
    Data(Vec<u8>),
    Map(NodeMap),
    List(Vec<Node>),
}

/// Ordered key/value map. Lookups return the first entry for a key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMap(Vec<(String, Node)>);

impl NodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Node) {
        self.0.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON rendering kept on events for traceability.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Node)> for NodeMap {
    fn from_iter<I: IntoIterator<Item = (String, Node)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Node {
    pub const fn as_map(&self) -> Option<&NodeMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Map(_) | Self::List(_))
    }

    /// Whether the value carries nothing usable (blank string, empty container).
    pub fn is_blank(&self) -> bool {
        match self {
            Self::String(s) => s.trim().is_empty(),
            Self::Data(d) => d.is_empty(),
            Self::Map(m) => m.is_empty(),
            Self::List(l) => l.is_empty(),
            Self::Integer(_) | Self::Real(_) | Self::Boolean(_) | Self::Date(_) => false,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::from(*i),
            Self::Real(r) => serde_json::Number::from_f64(*r).map_or(Value::Null, Value::Number),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Date(d) => Value::String(d.to_rfc3339()),
            Self::Data(d) => Value::String(
                d.iter()
                    .map(|b| format!("{b:02x}"))
                    .collect::<String>(),
            ),
            Self::Map(m) => m.to_json(),
            Self::List(l) => Value::Array(l.iter().map(Self::to_json).collect()),
        }
    }
}

impl From<plist::Value> for Node {
    fn from(value: plist::Value) -> Self {
        match value {
            plist::Value::Dictionary(dict) => Self::Map(
                dict.into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
            plist::Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            plist::Value::String(s) => Self::String(s),
            plist::Value::Boolean(b) => Self::Boolean(b),
            plist::Value::Real(r) => Self::Real(r),
            plist::Value::Integer(i) => i
                .as_signed()
                .map(Self::Integer)
                .or_else(|| {
                    i.as_unsigned()
                        .map(|u| Self::Integer(i64::try_from(u).unwrap_or(i64::MAX)))
                })
                .unwrap_or(Self::Integer(0)),
            plist::Value::Date(date) => date_node(SystemTime::from(date)),
            plist::Value::Data(bytes) => Self::Data(bytes),
            plist::Value::Uid(uid) => Self::Integer(i64::try_from(uid.get()).unwrap_or(i64::MAX)),
            _ => Self::String(String::new()),
        }
    }
}

/// Dates outside chrono's range become a blank string node.
fn date_node(time: SystemTime) -> Node {
    let epoch = DateTime::<Utc>::UNIX_EPOCH;
    let converted = match time.duration_since(UNIX_EPOCH) {
        Ok(after) => TimeDelta::from_std(after)
            .ok()
            .and_then(|delta| epoch.checked_add_signed(delta)),
        Err(before) => TimeDelta::from_std(before.duration())
            .ok()
            .and_then(|delta| epoch.checked_sub_signed(delta)),
    };
    converted.map_or_else(
        || Node::String(String::new()),
        |utc| Node::Date(utc.fixed_offset()),
    )
}
