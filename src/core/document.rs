//! # Document Access
//!
//! Dashboards, panels and targets are kept as raw `serde_json::Value` trees so that
//! fields grafctl does not know about survive a fetch/save round trip untouched.
//! The [`JsonPath`] extension trait adds key-path navigation and lenient typed reads
//! on top of `Value`: a missing key or a type mismatch yields the type's default
//! instead of an error.

use serde_json::{Map, Value};

/// Key-path navigation and defaulting accessors for JSON trees.
pub trait JsonPath {
    /// Returns the node at `path`, if every key along the way exists.
    fn at(&self, path: &[&str]) -> Option<&Value>;

    /// Mutable variant of [`JsonPath::at`].
    fn at_mut(&mut self, path: &[&str]) -> Option<&mut Value>;

    /// Sets the node at `path`, creating intermediate objects as needed.
    /// Intermediate nodes that are not objects are replaced by empty objects.
    fn set_at(&mut self, path: &[&str], value: Value);

    /// Removes the leaf at `path` and returns it.
    fn delete_at(&mut self, path: &[&str]) -> Option<Value>;

    /// The string at `path`, or `""`.
    fn str_at(&self, path: &[&str]) -> &str;

    /// The integer at `path`, or `0`.
    fn i64_at(&self, path: &[&str]) -> i64;

    /// The array at `path`, or an empty slice.
    fn array_at(&self, path: &[&str]) -> &[Value];

    /// The array at `path` for in-place edits.
    fn array_at_mut(&mut self, path: &[&str]) -> Option<&mut Vec<Value>>;
}

impl JsonPath for Value {
    fn at(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(self, |node, key| node.get(*key))
    }

    fn at_mut(&mut self, path: &[&str]) -> Option<&mut Value> {
        path.iter()
            .try_fold(self, |node, key| node.get_mut(*key))
    }

    fn set_at(&mut self, path: &[&str], value: Value) {
        let Some((leaf, parents)) = path.split_last() else {
            return;
        };

        let mut node = self;
        for key in parents {
            node = ensure_object(node)
                .entry((*key).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        ensure_object(node).insert((*leaf).to_string(), value);
    }

    fn delete_at(&mut self, path: &[&str]) -> Option<Value> {
        let (leaf, parents) = path.split_last()?;
        self.at_mut(parents)?.as_object_mut()?.remove(*leaf)
    }

    fn str_at(&self, path: &[&str]) -> &str {
        self.at(path).and_then(Value::as_str).unwrap_or_default()
    }

    fn i64_at(&self, path: &[&str]) -> i64 {
        self.at(path).and_then(Value::as_i64).unwrap_or_default()
    }

    fn array_at(&self, path: &[&str]) -> &[Value] {
        self.at(path)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn array_at_mut(&mut self, path: &[&str]) -> Option<&mut Vec<Value>> {
        self.at_mut(path).and_then(Value::as_array_mut)
    }
}

/// Coerces `node` into an object, discarding any non-object content.
fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    match node {
        Value::Object(map) => map,
        other => {
            *other = Value::Object(Map::new());
            ensure_object(other)
        }
    }
}
