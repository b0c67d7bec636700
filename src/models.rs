use std::collections::BTreeMap;

/// Scalar property value attached to a node or edge.
///
/// Lists serialize with `|` as the array delimiter, which is what the
/// generated neo4j-admin import call declares via `--array-delimiter`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
}

impl Value {
    /// Render the value as a single CSV field.
    pub fn to_field(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::List(items) => items.join("|"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

/// Property map ordered by key so output columns are deterministic.
pub type Properties = BTreeMap<String, Value>;

/// A graph node. The `(id, label)` pair is unique across one pipeline run;
/// the deduplicator enforces this.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub properties: Properties,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            properties: Properties::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Key used by the deduplicator. `\x1f` cannot appear in cleaned ids,
    /// so the concatenation is collision-free.
    pub fn dedup_key(&self) -> String {
        format!("{}\u{1f}{}", self.id, self.label)
    }
}

/// A graph edge. Endpoints may reference nodes emitted by a different
/// adapter in the same run; endpoints that never resolve are counted as
/// dangling but still written.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Explicit edge identifier. `None` derives a composite key from the
    /// endpoints and label.
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    pub label: String,
    pub properties: Properties,
}

impl Edge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            source: source.into(),
            target: target.into(),
            label: label.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Deduplication key: the explicit id when present, otherwise a
    /// composite of endpoints and label.
    pub fn dedup_key(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{}\u{1f}{}\u{1f}{}", self.source, self.label, self.target),
        }
    }
}

/// Build a CURIE-style identifier (`uniprot:P04637`).
pub fn curie(prefix: &str, identifier: &str) -> String {
    format!("{}:{}", prefix, identifier)
}

/// Clean a string for safe embedding in CSV rows and Cypher statements.
///
/// Pipes become commas because `|` is the array delimiter; quotes become
/// carets so values survive un-escaped Cypher templates downstream.
pub fn clean_field(value: &str) -> String {
    value
        .replace('|', ",")
        .replace('\'', "^")
        .replace('"', "^")
        .replace(['\n', '\r', '\t'], " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_to_field_scalars() {
        assert_eq!(Value::from("abc").to_field(), "abc");
        assert_eq!(Value::from(42i64).to_field(), "42");
        assert_eq!(Value::from(true).to_field(), "true");
        assert_eq!(Value::from(0.4f64).to_field(), "0.4");
    }

    #[test]
    fn value_list_joins_with_pipe() {
        let v = Value::from(vec!["TP53".to_string(), "P53".to_string()]);
        assert_eq!(v.to_field(), "TP53|P53");
    }

    #[test]
    fn node_dedup_key_includes_label() {
        let a = Node::new("uniprot:P04637", "protein");
        let b = Node::new("uniprot:P04637", "gene");
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn edge_dedup_key_prefers_explicit_id() {
        let e = Edge::new("a", "b", "interacts").with_id("edge-1");
        assert_eq!(e.dedup_key(), "edge-1");
    }

    #[test]
    fn edge_dedup_key_composite_is_directional() {
        let ab = Edge::new("a", "b", "interacts");
        let ba = Edge::new("b", "a", "interacts");
        assert_ne!(ab.dedup_key(), ba.dedup_key());
    }

    #[test]
    fn curie_formats_prefix() {
        assert_eq!(curie("uniprot", "P04637"), "uniprot:P04637");
    }

    #[test]
    fn clean_field_strips_delimiters() {
        assert_eq!(clean_field("a|b"), "a,b");
        assert_eq!(clean_field("it's \"quoted\""), "it^s ^quoted^");
        assert_eq!(clean_field("  padded\tvalue\n"), "padded value");
    }

    #[test]
    fn builder_accumulates_properties() {
        let n = Node::new("go:GO:0008150", "go_term")
            .with("name", "biological_process")
            .with("obsolete", false);
        assert_eq!(n.properties.len(), 2);
        assert_eq!(
            n.properties.get("name"),
            Some(&Value::String("biological_process".into()))
        );
    }
}
