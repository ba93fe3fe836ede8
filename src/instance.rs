//! Located views into the instance being explained.
//!
//! Every node carries its instance location. Values live at `#<pointer>`;
//! property names live at `#*<pointer>` so that a `propertyNames` failure on
//! key `Foo` (`#*/Foo`) never collides with a failure on its value (`#/Foo`).
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::pointer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Boolean,
            Value::Number(_) => JsonType::Number,
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::Array,
            Value::Object(_) => JsonType::Object,
        }
    }

    /// Parse a `type` keyword name. `integer` maps onto `Number`.
    pub fn from_schema_name(name: &str) -> Option<Self> {
        Some(match name {
            "null" => JsonType::Null,
            "boolean" => JsonType::Boolean,
            "number" | "integer" => JsonType::Number,
            "string" => JsonType::String,
            "array" => JsonType::Array,
            "object" => JsonType::Object,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug)]
pub enum NodeValue<'a> {
    Value(&'a Value),
    /// A property name, viewed as a string instance.
    Name(&'a str),
}

#[derive(Clone, Debug)]
pub struct JsonNode<'a> {
    pub location: String,
    pub value: NodeValue<'a>,
}

impl<'a> JsonNode<'a> {
    pub fn root(value: &'a Value) -> Self {
        JsonNode { location: "#".to_string(), value: NodeValue::Value(value) }
    }

    pub fn json_type(&self) -> JsonType {
        match self.value {
            NodeValue::Value(value) => JsonType::of(value),
            NodeValue::Name(_) => JsonType::String,
        }
    }

    /// The node as an owned JSON value (names become strings).
    pub fn to_value(&self) -> Value {
        match self.value {
            NodeValue::Value(value) => value.clone(),
            NodeValue::Name(name) => Value::String(name.to_string()),
        }
    }

    pub fn as_object(&self) -> Option<&'a Map<String, Value>> {
        match self.value {
            NodeValue::Value(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&'a [Value]> {
        match self.value {
            NodeValue::Value(Value::Array(items)) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self.value {
            NodeValue::Value(Value::String(s)) => Some(s),
            NodeValue::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_name(&self) -> bool {
        matches!(self.value, NodeValue::Name(_))
    }

    pub fn property(&self, name: &str) -> Option<JsonNode<'a>> {
        let (key, value) = self.as_object()?.get_key_value(name)?;
        Some(JsonNode {
            location: pointer::append(&self.location, key),
            value: NodeValue::Value(value),
        })
    }

    pub fn item(&self, index: usize) -> Option<JsonNode<'a>> {
        let value = self.as_array()?.get(index)?;
        Some(JsonNode {
            location: pointer::append_index(&self.location, index),
            value: NodeValue::Value(value),
        })
    }

    /// Property entries in document order.
    pub fn entries(&self) -> Vec<(&'a str, JsonNode<'a>)> {
        let Some(map) = self.as_object() else {
            return Vec::new();
        };
        map.iter()
            .map(|(key, value)| {
                let node = JsonNode {
                    location: pointer::append(&self.location, key),
                    value: NodeValue::Value(value),
                };
                (key.as_str(), node)
            })
            .collect()
    }

    pub fn items(&self) -> Vec<JsonNode<'a>> {
        let Some(items) = self.as_array() else {
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .map(|(index, value)| JsonNode {
                location: pointer::append_index(&self.location, index),
                value: NodeValue::Value(value),
            })
            .collect()
    }

    /// Property-name nodes, addressed with the `#*` prefix.
    pub fn names(&self) -> Vec<JsonNode<'a>> {
        let Some(map) = self.as_object() else {
            return Vec::new();
        };
        map.keys()
            .map(|key| JsonNode {
                location: name_location(&self.location, key),
                value: NodeValue::Name(key),
            })
            .collect()
    }
}

/// `#/a` + `Foo` → `#*/a/Foo`.
pub fn name_location(parent: &str, name: &str) -> String {
    let parent_pointer = pointer_of(parent);
    format!("#*{parent_pointer}/{}", pointer::escape_token(name))
}

/// The JSON pointer part of an instance location (`#*/a` and `#/a` both give `/a`).
pub fn pointer_of(location: &str) -> &str {
    location
        .strip_prefix("#*")
        .or_else(|| location.strip_prefix('#'))
        .unwrap_or(location)
}

pub fn is_name_location(location: &str) -> bool {
    location.starts_with("#*")
}

/// Value locations for a name location: `#*/a/Foo` → `#/a/Foo`.
pub fn value_location_of(location: &str) -> Option<String> {
    location.strip_prefix("#*").map(|rest| format!("#{rest}"))
}

/// Normalize a validator-reported instance location.
///
/// `""` and `/a` gain a `#` prefix; `*/a` and `#*/a` become `#*/a`.
pub fn normalize_location(location: &str) -> String {
    if location.is_empty() || location.starts_with('/') || location.starts_with('*') {
        format!("#{location}")
    } else {
        location.to_string()
    }
}

/// Resolve an instance location back to a node.
pub fn lookup<'a>(instance: &'a Value, location: &str) -> Option<JsonNode<'a>> {
    let name_node = is_name_location(location);
    let tokens = pointer::segments(pointer_of(location));
    let mut node = JsonNode::root(instance);
    let Some((last, parents)) = tokens.split_last() else {
        return (!name_node).then_some(node);
    };
    for token in parents {
        node = child(&node, token)?;
    }
    if name_node {
        let (key, _) = node.as_object()?.get_key_value(last.as_str())?;
        return Some(JsonNode { location: location.to_string(), value: NodeValue::Name(key) });
    }
    child(&node, last)
}

fn child<'a>(node: &JsonNode<'a>, token: &str) -> Option<JsonNode<'a>> {
    match node.json_type() {
        JsonType::Object => node.property(token),
        JsonType::Array => node.item(token.parse().ok()?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn child_locations_escape_tokens() {
        let value = json!({"a/b": [1, {"c": true}]});
        let root = JsonNode::root(&value);
        let child = root.property("a/b").unwrap();
        assert_eq!(child.location, "#/a~1b");
        assert_eq!(child.item(1).unwrap().location, "#/a~1b/1");
    }

    #[test]
    fn name_nodes_use_star_prefix() {
        let value = json!({"outer": {"Foo": 1}});
        let outer = JsonNode::root(&value).property("outer").unwrap();
        let names = outer.names();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].location, "#*/outer/Foo");
        assert_eq!(names[0].as_str(), Some("Foo"));
        assert_eq!(names[0].json_type(), JsonType::String);
    }

    #[test]
    fn normalize_prefixes_hash() {
        assert_eq!(normalize_location(""), "#");
        assert_eq!(normalize_location("/foo"), "#/foo");
        assert_eq!(normalize_location("*/Foo"), "#*/Foo");
        assert_eq!(normalize_location("#*/Foo"), "#*/Foo");
        assert_eq!(normalize_location("#/foo"), "#/foo");
    }

    #[test]
    fn lookup_finds_values_and_names() {
        let value = json!({"list": [10, 20], "Foo": "x"});
        assert_eq!(lookup(&value, "#/list/1").unwrap().to_value(), json!(20));
        assert_eq!(lookup(&value, "#*/Foo").unwrap().to_value(), json!("Foo"));
        assert_eq!(lookup(&value, "#").unwrap().json_type(), JsonType::Object);
        assert!(lookup(&value, "#/missing").is_none());
        assert!(lookup(&value, "#*").is_none());
    }

    #[test]
    fn value_location_strips_star() {
        assert_eq!(value_location_of("#*/a/Foo").as_deref(), Some("#/a/Foo"));
        assert_eq!(value_location_of("#/a"), None);
    }
}
