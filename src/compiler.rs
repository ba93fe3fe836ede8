//! Schema compilation: raw JSON Schema documents → [`Ast`].
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::ast::{Ast, DefinedProperties, Keyword, KeywordNode, SchemaNode};
use crate::error::CompileError;
use crate::keyword::KeywordKind;
use crate::pointer;

/// Produces the compiled AST for a schema and maps relative keyword pointers
/// onto absolute schema locations.
pub trait SchemaCompiler {
    fn compile(&self, schema_id: &str) -> Result<Ast, CompileError>;

    /// `"/properties/foo/$ref/minLength"` relative to `schema_id` → absolute location.
    fn resolve_absolute(&self, schema_id: &str, keyword_pointer: &str) -> Result<String, CompileError>;
}

/// In-memory registry of schema documents keyed by URI.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    documents: IndexMap<String, Value>,
}

// ————————————————————————————————————————————————————————————————————————————
// REGISTRY
// ————————————————————————————————————————————————————————————————————————————

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document. A root `$id` that differs from `uri` is registered too.
    pub fn register(&mut self, uri: &str, schema: Value) -> Result<(), CompileError> {
        let uri = normalize_document_uri(uri)?;
        if let Some(id) = schema.get("$id").and_then(Value::as_str) {
            let alias = join_reference(&uri, id)?;
            let alias = strip_fragment(&alias);
            if alias != uri {
                self.documents.insert(alias.to_string(), schema.clone());
            }
        }
        self.documents.insert(uri, schema);
        Ok(())
    }

    pub fn with(mut self, uri: &str, schema: Value) -> Result<Self, CompileError> {
        self.register(uri, schema)?;
        Ok(self)
    }

    pub fn document_uris(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    fn document(&self, uri: &str) -> Result<&Value, CompileError> {
        self.documents
            .get(uri)
            .ok_or_else(|| CompileError::UnknownSchema { uri: uri.to_string() })
    }

    /// Split a schema id into a registered document URI and a JSON pointer.
    fn locate(&self, schema_id: &str) -> Result<(String, String), CompileError> {
        let (document, fragment) = schema_id.split_once('#').unwrap_or((schema_id, ""));
        let document = normalize_document_uri(document)?;
        self.document(&document)?;
        let fragment_pointer = pointer::decode_fragment(fragment).ok_or_else(|| {
            CompileError::InvalidPointer { uri: document.clone(), pointer: fragment.to_string() }
        })?;
        let pointer = self.fragment_pointer(&document, &fragment_pointer)?;
        Ok((document, pointer))
    }

    /// A fragment is either a JSON pointer or a plain-name `$anchor`.
    fn fragment_pointer(&self, document: &str, fragment: &str) -> Result<String, CompileError> {
        if fragment.is_empty() || fragment.starts_with('/') {
            return Ok(fragment.to_string());
        }
        let root = self.document(document)?;
        find_anchor(root, fragment, String::new()).ok_or_else(|| CompileError::InvalidPointer {
            uri: document.to_string(),
            pointer: fragment.to_string(),
        })
    }

    /// Resolve a `$ref` value found in `document` to (document, pointer).
    fn resolve_reference(&self, document: &str, reference: &str) -> Result<(String, String), CompileError> {
        let target = join_reference(document, reference)?;
        let (target_document, fragment) = target.split_once('#').unwrap_or((target.as_str(), ""));
        self.document(target_document)?;
        let fragment = pointer::decode_fragment(fragment).ok_or_else(|| {
            CompileError::InvalidReference {
                reference: reference.to_string(),
                reason: "malformed percent-encoding".to_string(),
            }
        })?;
        let pointer = self.fragment_pointer(target_document, &fragment)?;
        Ok((target_document.to_string(), pointer))
    }
}

impl SchemaCompiler for SchemaRegistry {
    fn compile(&self, schema_id: &str) -> Result<Ast, CompileError> {
        let (document, pointer) = self.locate(schema_id)?;
        let mut compilation = Compilation {
            registry: self,
            ast: Ast::new(pointer::schema_location(&document, &pointer)),
        };
        compilation.compile_schema(&document, &pointer)?;
        debug!(schema = schema_id, nodes = compilation.ast.len(), "compiled schema");
        Ok(compilation.ast)
    }

    fn resolve_absolute(&self, schema_id: &str, keyword_pointer: &str) -> Result<String, CompileError> {
        let (mut document, mut current) = self.locate(schema_id)?;
        let relative = keyword_pointer.strip_prefix('#').unwrap_or(keyword_pointer);
        let segments = pointer::segments(relative);
        let last = segments.len().saturating_sub(1);
        for (position, segment) in segments.iter().enumerate() {
            let value = self.pointer_value(&document, &current)?;
            if segment == "$ref" && position != last {
                let reference = value.get("$ref").and_then(Value::as_str).ok_or_else(|| {
                    CompileError::InvalidPointer { uri: document.clone(), pointer: relative.to_string() }
                })?;
                (document, current) = self.resolve_reference(&document, reference)?;
                continue;
            }
            let next = pointer::append(&current, segment);
            if step(value, segment).is_none() {
                return Err(CompileError::InvalidPointer { uri: document, pointer: next });
            }
            current = next;
        }
        Ok(pointer::schema_location(&document, &current))
    }
}

impl SchemaRegistry {
    fn pointer_value(&self, document: &str, pointer: &str) -> Result<&Value, CompileError> {
        self.document(document)?.pointer(pointer).ok_or_else(|| CompileError::InvalidPointer {
            uri: document.to_string(),
            pointer: pointer.to_string(),
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// COMPILATION
// ————————————————————————————————————————————————————————————————————————————

struct Compilation<'r> {
    registry: &'r SchemaRegistry,
    ast: Ast,
}

impl Compilation<'_> {
    fn compile_schema(&mut self, document: &str, schema_pointer: &str) -> Result<String, CompileError> {
        let location = pointer::schema_location(document, schema_pointer);
        if self.ast.contains(&location) {
            return Ok(location);
        }
        let registry = self.registry;
        let value = registry.pointer_value(document, schema_pointer)?;
        match value {
            Value::Bool(flag) => {
                self.ast.insert_node(location.clone(), SchemaNode::Bool(*flag));
            }
            Value::Object(map) => {
                self.ast.reserve(&location);
                let mut keywords = Vec::with_capacity(map.len());
                for (name, keyword_value) in map {
                    let keyword_pointer = pointer::append(schema_pointer, name);
                    let Some(keyword) =
                        self.compile_keyword(document, &location, map, name, keyword_value, &keyword_pointer)?
                    else {
                        continue;
                    };
                    let keyword_location = pointer::schema_location(document, &keyword_pointer);
                    self.ast.insert_literal(keyword_location.clone(), keyword_value.clone());
                    keywords.push(KeywordNode { location: keyword_location, keyword });
                }
                self.ast.insert_node(location.clone(), SchemaNode::Keywords(keywords));
            }
            _ => {
                return Err(CompileError::InvalidKeyword {
                    location,
                    reason: "a schema must be an object or a boolean".to_string(),
                });
            }
        }
        Ok(location)
    }

    fn compile_keyword(
        &mut self,
        document: &str,
        parent: &str,
        siblings: &Map<String, Value>,
        name: &str,
        value: &Value,
        keyword_pointer: &str,
    ) -> Result<Option<Keyword>, CompileError> {
        let Some(kind) = KeywordKind::from_name(name) else {
            return Ok(None);
        };
        let location = || pointer::schema_location(document, keyword_pointer);
        let keyword = match kind {
            KeywordKind::AllOf => Keyword::AllOf(self.compile_list(document, keyword_pointer, value)?),
            KeywordKind::AnyOf => Keyword::AnyOf(self.compile_list(document, keyword_pointer, value)?),
            KeywordKind::OneOf => Keyword::OneOf(self.compile_list(document, keyword_pointer, value)?),
            KeywordKind::Not => Keyword::Not(self.compile_schema(document, keyword_pointer)?),
            KeywordKind::If => Keyword::If(self.compile_schema(document, keyword_pointer)?),
            KeywordKind::Then | KeywordKind::Else if !siblings.contains_key("if") => return Ok(None),
            KeywordKind::Then => Keyword::Then(self.compile_schema(document, keyword_pointer)?),
            KeywordKind::Else => Keyword::Else(self.compile_schema(document, keyword_pointer)?),
            KeywordKind::PropertyNames => {
                Keyword::PropertyNames(self.compile_schema(document, keyword_pointer)?)
            }
            KeywordKind::Ref => {
                let reference = value.as_str().ok_or_else(|| CompileError::InvalidKeyword {
                    location: location(),
                    reason: "$ref must be a string".to_string(),
                })?;
                let (target_document, target_pointer) =
                    self.registry.resolve_reference(document, reference)?;
                Keyword::Ref(self.compile_schema(&target_document, &target_pointer)?)
            }
            KeywordKind::Properties => {
                let mut properties = IndexMap::new();
                for property in object_of(value, &location)?.keys() {
                    let child = pointer::append(keyword_pointer, property);
                    properties.insert(property.clone(), self.compile_schema(document, &child)?);
                }
                Keyword::Properties(properties)
            }
            KeywordKind::PatternProperties => {
                let mut patterns = Vec::new();
                for pattern in object_of(value, &location)?.keys() {
                    let regex = compile_regex(pattern, &location)?;
                    let child = pointer::append(keyword_pointer, pattern);
                    patterns.push((regex, self.compile_schema(document, &child)?));
                }
                Keyword::PatternProperties(patterns)
            }
            KeywordKind::AdditionalProperties => Keyword::AdditionalProperties {
                defined: defined_properties(siblings, &location)?,
                schema: self.compile_schema(document, keyword_pointer)?,
            },
            KeywordKind::DependentSchemas => {
                let mut dependents = Vec::new();
                for property in object_of(value, &location)?.keys() {
                    let child = pointer::append(keyword_pointer, property);
                    dependents.push((property.clone(), self.compile_schema(document, &child)?));
                }
                Keyword::DependentSchemas(dependents)
            }
            KeywordKind::PrefixItems => {
                Keyword::PrefixItems(self.compile_list(document, keyword_pointer, value)?)
            }
            // Draft 2019-09 tuple form
            KeywordKind::Items if value.is_array() => {
                Keyword::PrefixItems(self.compile_list(document, keyword_pointer, value)?)
            }
            KeywordKind::Items => Keyword::Items {
                prefix_items: siblings.get("prefixItems").and_then(Value::as_array).map_or(0, Vec::len),
                schema: self.compile_schema(document, keyword_pointer)?,
            },
            KeywordKind::Contains => Keyword::Contains {
                schema: self.compile_schema(document, keyword_pointer)?,
                min_contains: siblings.get("minContains").and_then(Value::as_u64).unwrap_or(1),
                max_contains: siblings.get("maxContains").and_then(Value::as_u64),
            },
            KeywordKind::UnevaluatedProperties => Keyword::UnevaluatedProperties {
                parent: parent.to_string(),
                schema: self.compile_schema(document, keyword_pointer)?,
            },
            KeywordKind::UnevaluatedItems => Keyword::UnevaluatedItems {
                parent: parent.to_string(),
                schema: self.compile_schema(document, keyword_pointer)?,
            },
            KeywordKind::Validation => return Ok(None),
            assertion => Keyword::Assertion(assertion),
        };
        Ok(Some(keyword))
    }

    fn compile_list(&mut self, document: &str, keyword_pointer: &str, value: &Value) -> Result<Vec<String>, CompileError> {
        let items = value.as_array().ok_or_else(|| CompileError::InvalidKeyword {
            location: pointer::schema_location(document, keyword_pointer),
            reason: "expected an array of schemas".to_string(),
        })?;
        (0..items.len())
            .map(|index| self.compile_schema(document, &pointer::append_index(keyword_pointer, index)))
            .collect()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn object_of<'v>(value: &'v Value, location: &impl Fn() -> String) -> Result<&'v Map<String, Value>, CompileError> {
    value.as_object().ok_or_else(|| CompileError::InvalidKeyword {
        location: location(),
        reason: "expected an object of schemas".to_string(),
    })
}

fn compile_regex(pattern: &str, location: &impl Fn() -> String) -> Result<Regex, CompileError> {
    Regex::new(pattern).map_err(|source| CompileError::InvalidRegex { location: location(), source })
}

fn defined_properties(siblings: &Map<String, Value>, location: &impl Fn() -> String) -> Result<DefinedProperties, CompileError> {
    let names: IndexSet<String> = siblings
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| properties.keys().cloned().collect())
        .unwrap_or_default();
    let patterns = match siblings.get("patternProperties").and_then(Value::as_object) {
        Some(patterns) => patterns
            .keys()
            .map(|pattern| compile_regex(pattern, location))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    Ok(DefinedProperties { names, patterns })
}

fn step<'v>(value: &'v Value, segment: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn find_anchor(value: &Value, anchor: &str, at: String) -> Option<String> {
    match value {
        Value::Object(map) => {
            if map.get("$anchor").and_then(Value::as_str) == Some(anchor) {
                return Some(at);
            }
            map.iter().find_map(|(key, child)| find_anchor(child, anchor, pointer::append(&at, key)))
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(index, child)| find_anchor(child, anchor, pointer::append_index(&at, index))),
        _ => None,
    }
}

fn normalize_document_uri(uri: &str) -> Result<String, CompileError> {
    let uri = strip_fragment(uri);
    let parsed = Url::parse(uri).map_err(|error| CompileError::InvalidReference {
        reference: uri.to_string(),
        reason: error.to_string(),
    })?;
    Ok(parsed.to_string())
}

fn join_reference(base: &str, reference: &str) -> Result<String, CompileError> {
    let invalid = |reason: String| CompileError::InvalidReference { reference: reference.to_string(), reason };
    let base = Url::parse(base).map_err(|error| invalid(error.to_string()))?;
    let joined = base.join(reference).map_err(|error| invalid(error.to_string()))?;
    Ok(joined.to_string())
}

fn strip_fragment(uri: &str) -> &str {
    uri.split_once('#').map_or(uri, |(document, _)| document)
}
