//! Untyped configuration tree with path lookup.
//!
//! # Design
//! YAML allows mapping keys of any scalar type, so a single level of the
//! bootstrap document may mix `hostdb_rw:`, `42:` and `1.5:` keys. The tree
//! keeps each key's YAML type in `ConfigKey` and compares path segments
//! against the key's canonical rendering:
//!
//! - strings pass through,
//! - integers render as base-10 digits,
//! - floats render as the shortest round-trippable decimal, switching to
//!   exponent form (`1e+06`, `1.5e-05`) outside the `[1e-4, 1e6)` range.
//!
//! Scalar values collapse to `ConfigNode::Scalar` strings; lookup only ever
//! descends through mappings.

use std::fmt;

use tracing::debug;

/// Mapping key of the configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigKey {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl ConfigKey {
    /// Canonical string form used for path comparisons.
    pub fn render(&self) -> String {
        match self {
            ConfigKey::Str(s) => s.clone(),
            ConfigKey::Int(i) => i.to_string(),
            ConfigKey::UInt(u) => u.to_string(),
            ConfigKey::Float(f) => render_float(*f),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// A node of the configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    /// Key/value pairs in document order.
    Mapping(Vec<(ConfigKey, ConfigNode)>),
    Sequence(Vec<ConfigNode>),
    /// Terminal value. YAML numbers and booleans keep their textual form,
    /// `null` becomes the empty string.
    Scalar(String),
}

impl ConfigNode {
    /// Walk `path` from this node.
    ///
    /// Returns `None` when an intermediate node is not a mapping or when no
    /// key at some level renders to the segment. An empty path yields `self`.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&ConfigNode> {
        let mut node = self;
        for segment in path {
            let segment = segment.as_ref();
            let ConfigNode::Mapping(entries) = node else {
                return None;
            };
            node = entries
                .iter()
                .find(|(key, _)| key.render() == segment)
                .map(|(_, value)| value)?;
        }
        Some(node)
    }

    /// Terminal string, if this node is a scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigNode::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

impl From<serde_yaml::Value> for ConfigNode {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value;

        match value {
            Value::Null => ConfigNode::Scalar(String::new()),
            Value::Bool(b) => ConfigNode::Scalar(b.to_string()),
            Value::Number(n) => ConfigNode::Scalar(render_number(&n)),
            Value::String(s) => ConfigNode::Scalar(s),
            Value::Sequence(items) => {
                ConfigNode::Sequence(items.into_iter().map(ConfigNode::from).collect())
            }
            Value::Mapping(mapping) => {
                let mut entries = Vec::with_capacity(mapping.len());
                for (key, value) in mapping {
                    match config_key(&key) {
                        Some(key) => entries.push((key, ConfigNode::from(value))),
                        None => debug!(?key, "skipping non-scalar configuration key"),
                    }
                }
                ConfigNode::Mapping(entries)
            }
            Value::Tagged(tagged) => ConfigNode::from(tagged.value),
        }
    }
}

fn config_key(key: &serde_yaml::Value) -> Option<ConfigKey> {
    use serde_yaml::Value;

    match key {
        Value::String(s) => Some(ConfigKey::Str(s.clone())),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(ConfigKey::Int(i))
            } else if let Some(u) = n.as_u64() {
                Some(ConfigKey::UInt(u))
            } else {
                n.as_f64().map(ConfigKey::Float)
            }
        }
        Value::Tagged(tagged) => config_key(&tagged.value),
        _ => None,
    }
}

fn render_number(n: &serde_yaml::Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(render_float).unwrap_or_default()
    }
}

/// Shortest round-trippable rendering of `f`, `%g` style.
pub fn render_float(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if f == 0.0 {
        return if f.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // `{:e}` yields the shortest digits, e.g. `1.234567e6` or `5e-1`.
    let sci = format!("{f:e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return sci,
    };
    if (-4..6).contains(&exp) {
        return f.to_string();
    }
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.abs())
}
