//! Compiled schema arena.
//!
//! Nodes are addressed by absolute schema location, so `$ref` cycles are just
//! two locations naming each other; nothing holds a live reference.
use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde_json::Value;

use crate::keyword::KeywordKind;

#[derive(Clone, Debug, Default)]
pub struct Ast {
    root: String,
    nodes: IndexMap<String, SchemaNode>,
    literals: HashMap<String, Value>,
    keywords: HashMap<String, (String, usize)>,
}

#[derive(Clone, Debug)]
pub enum SchemaNode {
    Bool(bool),
    Keywords(Vec<KeywordNode>),
}

#[derive(Clone, Debug)]
pub struct KeywordNode {
    /// Absolute keyword location, e.g. `https://example.com/main#/properties`.
    pub location: String,
    pub keyword: Keyword,
}

/// Compiled keyword values. Subschemas are referenced by location.
#[derive(Clone, Debug)]
pub enum Keyword {
    AllOf(Vec<String>),
    AnyOf(Vec<String>),
    OneOf(Vec<String>),
    Not(String),
    Ref(String),
    If(String),
    Then(String),
    Else(String),
    Properties(IndexMap<String, String>),
    PatternProperties(Vec<(Regex, String)>),
    AdditionalProperties { defined: DefinedProperties, schema: String },
    PropertyNames(String),
    DependentSchemas(Vec<(String, String)>),
    PrefixItems(Vec<String>),
    Items { prefix_items: usize, schema: String },
    Contains { schema: String, min_contains: u64, max_contains: Option<u64> },
    /// `parent` is the schema location that owns the keyword.
    UnevaluatedProperties { parent: String, schema: String },
    UnevaluatedItems { parent: String, schema: String },
    /// Leaf keyword; its value is read from the literal table.
    Assertion(KeywordKind),
}

/// Names and patterns declared by sibling `properties`/`patternProperties`.
#[derive(Clone, Debug, Default)]
pub struct DefinedProperties {
    pub names: IndexSet<String>,
    pub patterns: Vec<Regex>,
}

impl DefinedProperties {
    pub fn is_defined(&self, name: &str) -> bool {
        self.names.contains(name) || self.patterns.iter().any(|regex| regex.is_match(name))
    }
}

impl Keyword {
    pub fn kind(&self) -> KeywordKind {
        match self {
            Keyword::AllOf(_) => KeywordKind::AllOf,
            Keyword::AnyOf(_) => KeywordKind::AnyOf,
            Keyword::OneOf(_) => KeywordKind::OneOf,
            Keyword::Not(_) => KeywordKind::Not,
            Keyword::Ref(_) => KeywordKind::Ref,
            Keyword::If(_) => KeywordKind::If,
            Keyword::Then(_) => KeywordKind::Then,
            Keyword::Else(_) => KeywordKind::Else,
            Keyword::Properties(_) => KeywordKind::Properties,
            Keyword::PatternProperties(_) => KeywordKind::PatternProperties,
            Keyword::AdditionalProperties { .. } => KeywordKind::AdditionalProperties,
            Keyword::PropertyNames(_) => KeywordKind::PropertyNames,
            Keyword::DependentSchemas(_) => KeywordKind::DependentSchemas,
            Keyword::PrefixItems(_) => KeywordKind::PrefixItems,
            Keyword::Items { .. } => KeywordKind::Items,
            Keyword::Contains { .. } => KeywordKind::Contains,
            Keyword::UnevaluatedProperties { .. } => KeywordKind::UnevaluatedProperties,
            Keyword::UnevaluatedItems { .. } => KeywordKind::UnevaluatedItems,
            Keyword::Assertion(kind) => *kind,
        }
    }
}

impl Ast {
    pub fn new(root: impl Into<String>) -> Self {
        Ast { root: root.into(), ..Ast::default() }
    }

    /// Schema location of the compiled root.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn node(&self, location: &str) -> Option<&SchemaNode> {
        self.nodes.get(location)
    }

    pub fn contains(&self, location: &str) -> bool {
        self.nodes.contains_key(location)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Raw JSON value of a keyword, by keyword location.
    pub fn literal(&self, keyword_location: &str) -> Option<&Value> {
        self.literals.get(keyword_location)
    }

    pub fn keyword(&self, keyword_location: &str) -> Option<&KeywordNode> {
        let (node_location, index) = self.keywords.get(keyword_location)?;
        match self.nodes.get(node_location)? {
            SchemaNode::Keywords(keywords) => keywords.get(*index),
            SchemaNode::Bool(_) => None,
        }
    }

    /// Keywords of the schema at `location` (empty for boolean schemas).
    pub fn keywords(&self, location: &str) -> &[KeywordNode] {
        match self.nodes.get(location) {
            Some(SchemaNode::Keywords(keywords)) => keywords,
            _ => &[],
        }
    }

    pub fn insert_literal(&mut self, keyword_location: String, value: Value) {
        self.literals.insert(keyword_location, value);
    }

    /// Reserve a location before its keywords are compiled so cycles terminate.
    pub fn reserve(&mut self, location: &str) {
        self.nodes.entry(location.to_string()).or_insert(SchemaNode::Bool(true));
    }

    pub fn insert_node(&mut self, location: String, node: SchemaNode) {
        if let SchemaNode::Keywords(keywords) = &node {
            for (index, keyword) in keywords.iter().enumerate() {
                self.keywords.insert(keyword.location.clone(), (location.clone(), index));
            }
        }
        self.nodes.insert(location, node);
    }
}
