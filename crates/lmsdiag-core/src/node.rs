//! Shape-tolerant tree used by every parser.
//!
//! Markup and JSON documents are both lowered into `Node` so the extractors
//! can walk them with one set of accessors. Elements that may repeat are
//! stored as `List` even when a single instance is present (see the
//! always-plural handling in the assessment parser), and `items()` lets
//! callers iterate a value without caring whether it is a list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key under which element text is stored when an element also has
/// attributes or children.
pub const TEXT_KEY: &str = "#text";

/// Prefix for attribute keys inside a `Map`.
pub const ATTR_PREFIX: char = '@';

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Leaf(String),
    List(Vec<Node>),
    Map(BTreeMap<String, Node>),
}

impl Node {
    /// Empty map node.
    pub fn map() -> Self {
        Node::Map(BTreeMap::new())
    }

    /// Look up a key on a map node. Lists and leaves have no keys.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Map(m) => m.get(key),
            _ => None,
        }
    }

    /// View this node as a sequence: the items of a list, or the node itself.
    pub fn items(&self) -> &[Node] {
        match self {
            Node::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    /// All values stored under `key`, flattened to a slice.
    pub fn children(&self, key: &str) -> &[Node] {
        self.get(key).map(Node::items).unwrap_or(&[])
    }

    /// First value stored under `key`.
    pub fn first(&self, key: &str) -> Option<&Node> {
        self.children(key).first()
    }

    /// Follow a chain of keys, taking the first item at every step.
    pub fn path(&self, keys: &[&str]) -> Option<&Node> {
        keys.iter().try_fold(self, |node, key| node.first(key))
    }

    /// Text content of a leaf, or the `#text` entry of a map.
    pub fn text(&self) -> Option<&str> {
        match self {
            Node::Leaf(s) => Some(s.as_str()),
            Node::Map(m) => m.get(TEXT_KEY).and_then(Node::text),
            Node::List(items) => items.first().and_then(Node::text),
        }
    }

    /// Every text leaf in this subtree, trimmed and joined by single
    /// spaces. Attribute values are skipped.
    pub fn text_content(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        parts.join(" ")
    }

    fn collect_text<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::Leaf(s) => {
                let s = s.trim();
                if !s.is_empty() {
                    out.push(s);
                }
            }
            Node::List(items) => items.iter().for_each(|n| n.collect_text(out)),
            Node::Map(m) => {
                for (k, v) in m {
                    if !k.starts_with(ATTR_PREFIX) {
                        v.collect_text(out);
                    }
                }
            }
        }
    }

    /// Attribute value stored as `@name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            Node::Map(m) => m.get(&format!("{ATTR_PREFIX}{name}")).and_then(Node::text),
            _ => None,
        }
    }

    /// Numeric value of a leaf (or `#text`), if it parses.
    pub fn as_f64(&self) -> Option<f64> {
        self.text().and_then(|s| s.trim().parse::<f64>().ok())
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Node::Map(_))
    }

    /// True if any map anywhere in this subtree has one of `keys`.
    pub fn contains_key(&self, keys: &[&str]) -> bool {
        match self {
            Node::Leaf(_) => false,
            Node::List(items) => items.iter().any(|n| n.contains_key(keys)),
            Node::Map(m) => {
                keys.iter().any(|k| m.contains_key(*k))
                    || m.values().any(|n| n.contains_key(keys))
            }
        }
    }

    /// True if any leaf in this subtree satisfies `pred`.
    pub fn any_leaf(&self, pred: &dyn Fn(&str) -> bool) -> bool {
        match self {
            Node::Leaf(s) => pred(s),
            Node::List(items) => items.iter().any(|n| n.any_leaf(pred)),
            Node::Map(m) => m.values().any(|n| n.any_leaf(pred)),
        }
    }

    /// Every value stored under `key` at any depth, in document order of
    /// the map keys. Does not descend into the matched values themselves.
    pub fn find_all<'a>(&'a self, key: &str) -> Vec<&'a Node> {
        let mut out = Vec::new();
        self.collect_key(key, &mut out);
        out
    }

    fn collect_key<'a>(&'a self, key: &str, out: &mut Vec<&'a Node>) {
        match self {
            Node::Leaf(_) => {}
            Node::List(items) => items.iter().for_each(|n| n.collect_key(key, out)),
            Node::Map(m) => {
                for (k, v) in m {
                    if k == key {
                        out.extend(v.items());
                    } else {
                        v.collect_key(key, out);
                    }
                }
            }
        }
    }
}

impl From<&serde_json::Value> for Node {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Node::Leaf(String::new()),
            Value::Bool(b) => Node::Leaf(b.to_string()),
            Value::Number(n) => Node::Leaf(n.to_string()),
            Value::String(s) => Node::Leaf(s.clone()),
            Value::Array(items) => Node::List(items.iter().map(Node::from).collect()),
            Value::Object(map) => Node::Map(
                map.iter().map(|(k, v)| (k.clone(), Node::from(v))).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_items_treats_single_value_as_sequence() {
        let node = Node::from(&json!({"a": {"b": "1"}, "c": [{"b": "2"}, {"b": "3"}]}));
        assert_eq!(node.children("a").len(), 1);
        assert_eq!(node.children("c").len(), 2);
        assert!(node.children("missing").is_empty());
    }

    #[test]
    fn test_path_and_numbers() {
        let node = Node::from(&json!({"log": {"entries": [{"response": {"status": 404}}]}}));
        let status = node.path(&["log", "entries", "response", "status"]).and_then(Node::as_f64);
        assert_eq!(status, Some(404.0));
    }

    #[test]
    fn test_attr_and_text() {
        let mut m = BTreeMap::new();
        m.insert("@ident".to_string(), Node::Leaf("q1".into()));
        m.insert(TEXT_KEY.to_string(), Node::Leaf("hello".into()));
        let node = Node::Map(m);
        assert_eq!(node.attr("ident"), Some("q1"));
        assert_eq!(node.text(), Some("hello"));
    }

    #[test]
    fn test_text_content_joins_nested_leaves() {
        let node = Node::from(&json!({
            "@identifier": "A",
            "p": [{"b": "True"}]
        }));
        assert_eq!(node.text(), None);
        assert_eq!(node.text_content(), "True");
        assert_eq!(Node::Leaf("  plain ".into()).text_content(), "plain");
    }

    #[test]
    fn test_find_all_and_contains_key() {
        let node = Node::from(&json!({
            "section": [{"item": [{"id": "1"}], "section": {"item": {"id": "2"}}}]
        }));
        assert_eq!(node.find_all("item").len(), 2);
        assert!(node.contains_key(&["id"]));
        assert!(!node.contains_key(&["feedback"]));
    }
}
