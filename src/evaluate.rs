//! Re-walks the compiled schema against the instance, using the error index to
//! decide which keywords failed, and produces a [`NormalizedOutput`].
//!
//! Every frame also returns the property names and item indices its passing
//! keywords claimed. `unevaluatedProperties`/`unevaluatedItems` consume those
//! claims through a shadow pass (see [`scope`]).
pub mod scope;

use std::collections::HashSet;

use serde_json::Value;
use tracing::warn;

use crate::ast::{Ast, Keyword, KeywordNode, SchemaNode};
use crate::index::ErrorIndex;
use crate::instance::JsonNode;
use crate::keyword::KeywordKind;
use crate::normalized::{KeywordOutput, NormalizedOutput};
use crate::pointer;

pub use scope::{Claims, ShadowRoot};

pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Result of evaluating one schema location against one instance location.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    pub output: NormalizedOutput,
    pub valid: bool,
    /// Claims of the passing keywords. Callers only fold them when `valid`.
    pub claims: Claims,
}

impl Frame {
    fn empty() -> Self {
        Frame { valid: true, ..Frame::default() }
    }
}

/// What a keyword produced before it is folded into its frame.
#[derive(Debug)]
struct Applied {
    outputs: Vec<NormalizedOutput>,
    children_valid: bool,
    claims: Claims,
}

impl Applied {
    fn none() -> Self {
        Applied { outputs: Vec::new(), children_valid: true, claims: Claims::default() }
    }

    /// A frame evaluated against a child instance node.
    fn child(&mut self, frame: Frame) -> bool {
        self.outputs.push(frame.output);
        self.children_valid &= frame.valid;
        frame.valid
    }

    /// A frame evaluated against the same instance node; its claims carry over.
    fn same_instance(&mut self, mut frame: Frame) -> bool {
        if frame.valid {
            self.claims.extend(std::mem::take(&mut frame.claims));
        }
        self.child(frame)
    }
}

type FrameKey = (String, String, Option<ShadowRoot>);

pub struct Evaluator<'a> {
    ast: &'a Ast,
    index: &'a ErrorIndex,
    max_depth: usize,
    active: HashSet<FrameKey>,
}

impl<'a> Evaluator<'a> {
    pub fn new(ast: &'a Ast, index: &'a ErrorIndex) -> Self {
        Evaluator { ast, index, max_depth: DEFAULT_MAX_DEPTH, active: HashSet::new() }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn ast(&self) -> &'a Ast {
        self.ast
    }

    /// Evaluate the compiled root against the whole instance.
    pub fn evaluate(&mut self, instance: &Value) -> NormalizedOutput {
        let root = self.ast.root().to_string();
        self.evaluate_schema(&root, &JsonNode::root(instance), None, 0).output
    }

    pub fn evaluate_schema(
        &mut self,
        location: &str,
        node: &JsonNode<'_>,
        shadow: Option<&ShadowRoot>,
        depth: usize,
    ) -> Frame {
        if depth > self.max_depth {
            warn!(schema = location, instance = %node.location, depth, "evaluation depth limit reached");
            return Frame::empty();
        }
        let key = (location.to_string(), node.location.clone(), shadow.cloned());
        if !self.active.insert(key.clone()) {
            warn!(schema = location, instance = %node.location, "schema re-entered at the same instance location");
            return Frame::empty();
        }
        let frame = self.evaluate_frame(location, node, shadow, depth);
        self.active.remove(&key);
        frame
    }

    fn evaluate_frame(
        &mut self,
        location: &str,
        node: &JsonNode<'_>,
        shadow: Option<&ShadowRoot>,
        depth: usize,
    ) -> Frame {
        let ast = self.ast;
        let mut frame = Frame::empty();
        match ast.node(location) {
            None => warn!(schema = location, "schema location was never compiled"),
            Some(SchemaNode::Bool(true)) => {
                frame.output.record(
                    &node.location,
                    KeywordKind::Validation,
                    location,
                    KeywordOutput::Valid(true),
                );
            }
            Some(SchemaNode::Bool(false)) => {
                // an untaken branch (`then: false` whose `if` failed) is never reported
                if self.false_schema_failed(location, node) {
                    frame.output.record(
                        &node.location,
                        KeywordKind::Validation,
                        location,
                        KeywordOutput::Valid(false),
                    );
                    frame.valid = false;
                }
            }
            Some(SchemaNode::Keywords(keywords)) => {
                for keyword in keywords {
                    self.apply_keyword(keyword, node, shadow, depth, &mut frame);
                }
            }
        }
        frame
    }

    /// A `false` schema fails only when the validator says so: either at the
    /// schema itself, or through the keyword that applied it to this child.
    fn false_schema_failed(&self, location: &str, node: &JsonNode<'_>) -> bool {
        if self.index.is_failed(location, &node.location) {
            return true;
        }
        let Some((parent_instance, _)) = node.location.rsplit_once('/') else {
            return false;
        };
        let owner = self.ast.keyword(location).or_else(|| {
            let (parent, _) = location.rsplit_once('/')?;
            self.ast.keyword(parent)
        });
        owner.is_some_and(|owner| {
            matches!(
                owner.keyword.kind(),
                KeywordKind::AdditionalProperties
                    | KeywordKind::UnevaluatedProperties
                    | KeywordKind::Items
                    | KeywordKind::UnevaluatedItems
                    | KeywordKind::PrefixItems
                    | KeywordKind::Properties
                    | KeywordKind::PatternProperties
            ) && self.index.is_failed(&owner.location, parent_instance)
        })
    }

    fn apply_keyword(
        &mut self,
        keyword: &KeywordNode,
        node: &JsonNode<'_>,
        shadow: Option<&ShadowRoot>,
        depth: usize,
        frame: &mut Frame,
    ) {
        let kind = keyword.keyword.kind();
        if matches!(keyword.keyword, Keyword::Assertion(_)) && !kind.applies_to(node.json_type()) {
            return;
        }
        let Some(applied) = self.applicator(&keyword.keyword, node, shadow, depth) else {
            return;
        };
        let reported = kind != KeywordKind::If && self.index.is_failed(&keyword.location, &node.location);
        let valid = applied.children_valid && !reported;
        if kind.simple_applicator() {
            for output in applied.outputs {
                frame.output.merge(output);
            }
        } else if !valid {
            let output = if kind.branching_applicator() {
                KeywordOutput::Branches(applied.outputs)
            } else {
                KeywordOutput::Valid(false)
            };
            frame.output.record(&node.location, kind, &keyword.location, output);
        } else if kind.applies_to(node.json_type()) {
            frame.output.record(&node.location, kind, &keyword.location, KeywordOutput::Valid(true));
        }
        if valid {
            frame.claims.extend(applied.claims);
        } else {
            frame.valid = false;
        }
    }

    /// `None` means the keyword is skipped entirely (the shadow root's own
    /// `unevaluated*` keyword).
    fn applicator(
        &mut self,
        keyword: &Keyword,
        node: &JsonNode<'_>,
        shadow: Option<&ShadowRoot>,
        depth: usize,
    ) -> Option<Applied> {
        let depth = depth + 1;
        let mut applied = Applied::none();
        match keyword {
            Keyword::Assertion(_) => {}
            Keyword::AllOf(schemas) => {
                for schema in schemas {
                    let frame = self.evaluate_schema(schema, node, shadow, depth);
                    applied.same_instance(frame);
                }
            }
            Keyword::AnyOf(schemas) | Keyword::OneOf(schemas) => {
                let mut any_valid = false;
                for schema in schemas {
                    let frame = self.evaluate_schema(schema, node, shadow, depth);
                    any_valid |= applied.same_instance(frame);
                }
                // branch failures are only implied for anyOf; oneOf relies on the index
                applied.children_valid = any_valid || matches!(keyword, Keyword::OneOf(_));
            }
            Keyword::Not(schema) => {
                let frame = self.evaluate_schema(schema, node, shadow, depth);
                applied.outputs.push(frame.output);
            }
            Keyword::Ref(schema) | Keyword::Then(schema) | Keyword::Else(schema) => {
                let frame = self.evaluate_schema(schema, node, shadow, depth);
                applied.same_instance(frame);
            }
            Keyword::If(schema) => {
                let frame = self.evaluate_schema(schema, node, shadow, depth);
                if frame.valid {
                    applied.claims = frame.claims;
                }
            }
            Keyword::DependentSchemas(dependents) => {
                let Some(object) = node.as_object() else {
                    return Some(applied);
                };
                for (property, schema) in dependents {
                    if object.contains_key(property) {
                        let frame = self.evaluate_schema(schema, node, shadow, depth);
                        applied.same_instance(frame);
                    }
                }
            }
            Keyword::Properties(properties) => {
                if node.as_object().is_none() {
                    return Some(applied);
                }
                for (name, schema) in properties {
                    match node.property(name) {
                        Some(child) => {
                            let frame = self.evaluate_schema(schema, &child, shadow, depth);
                            applied.child(frame);
                            applied.claims.properties.insert(name.clone());
                        }
                        None => {
                            let mut absent = NormalizedOutput::new();
                            absent.touch(&pointer::append(&node.location, name));
                            applied.outputs.push(absent);
                        }
                    }
                }
            }
            Keyword::PatternProperties(patterns) => {
                for (name, child) in node.entries() {
                    for (regex, schema) in patterns {
                        if regex.is_match(name) {
                            let frame = self.evaluate_schema(schema, &child, shadow, depth);
                            applied.child(frame);
                            applied.claims.properties.insert(name.to_string());
                        }
                    }
                }
            }
            Keyword::AdditionalProperties { defined, schema } => {
                for (name, child) in node.entries() {
                    if !defined.is_defined(name) {
                        let frame = self.evaluate_schema(schema, &child, shadow, depth);
                        applied.child(frame);
                        applied.claims.properties.insert(name.to_string());
                    }
                }
            }
            Keyword::PropertyNames(schema) => {
                for name in node.names() {
                    let frame = self.evaluate_schema(schema, &name, shadow, depth);
                    applied.child(frame);
                }
            }
            Keyword::PrefixItems(schemas) => {
                for (index, schema) in schemas.iter().enumerate() {
                    if let Some(item) = node.item(index) {
                        let frame = self.evaluate_schema(schema, &item, shadow, depth);
                        applied.child(frame);
                        applied.claims.items.insert(index);
                    }
                }
            }
            Keyword::Items { prefix_items, schema } => {
                for (index, item) in node.items().into_iter().enumerate().skip(*prefix_items) {
                    let frame = self.evaluate_schema(schema, &item, shadow, depth);
                    applied.child(frame);
                    applied.claims.items.insert(index);
                }
            }
            Keyword::Contains { schema, .. } => {
                for (index, item) in node.items().into_iter().enumerate() {
                    let frame = self.evaluate_schema(schema, &item, shadow, depth);
                    if frame.valid {
                        applied.claims.items.insert(index);
                    }
                    applied.outputs.push(frame.output);
                }
            }
            Keyword::UnevaluatedProperties { parent, schema } => {
                return self.unevaluated_properties(parent, schema, node, shadow, depth);
            }
            Keyword::UnevaluatedItems { parent, schema } => {
                return self.unevaluated_items(parent, schema, node, shadow, depth);
            }
        }
        Some(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{SchemaCompiler, SchemaRegistry};
    use serde_json::json;

    const MAIN: &str = "https://example.com/main";

    fn evaluate(schema: Value, instance: Value, failures: &[(&str, &str)]) -> NormalizedOutput {
        let registry = SchemaRegistry::new().with(MAIN, schema).unwrap();
        let ast = registry.compile(MAIN).unwrap();
        let mut index = ErrorIndex::default();
        for (keyword, instance_location) in failures {
            index.insert(&format!("{MAIN}#{keyword}"), instance_location);
        }
        Evaluator::new(&ast, &index).evaluate(&instance)
    }

    fn at<'o>(output: &'o NormalizedOutput, location: &str) -> &'o crate::normalized::InstanceOutput {
        output.get(location).unwrap()
    }

    #[test]
    fn leaf_failures_come_from_the_index() {
        let output = evaluate(json!({"minLength": 3, "type": "string"}), json!("aa"), &[("/minLength", "")]);
        let root = at(&output, "#");
        assert_eq!(root.failed(KeywordKind::MinLength).len(), 1);
        assert!(root.get(KeywordKind::Type).unwrap().values().all(KeywordOutput::is_valid));
    }

    #[test]
    fn type_gated_keywords_record_nothing() {
        let output = evaluate(json!({"minLength": 3, "maximum": 2}), json!("aa"), &[("/maximum", "")]);
        let root = at(&output, "#");
        assert!(root.get(KeywordKind::Maximum).is_none());
        assert!(root.get(KeywordKind::MinLength).is_some());
    }

    #[test]
    fn simple_applicators_flatten_children() {
        let output = evaluate(
            json!({"allOf": [{"minimum": 2}, {"minimum": 3}], "properties": {"a": {"type": "string"}, "b": {}}}),
            json!({"a": 1}),
            &[("/properties/a/type", "/a")],
        );
        assert!(output.get("#").and_then(|root| root.get(KeywordKind::AllOf)).is_none());
        assert_eq!(at(&output, "#/a").failed(KeywordKind::Type).len(), 1);
        assert!(at(&output, "#/b").is_empty());
    }

    #[test]
    fn failed_branching_applicators_keep_branches() {
        let output = evaluate(
            json!({"anyOf": [{"type": "string"}, {"type": "number"}]}),
            json!(true),
            &[("/anyOf", ""), ("/anyOf/0/type", ""), ("/anyOf/1/type", "")],
        );
        let failed = at(&output, "#").failed(KeywordKind::AnyOf);
        let KeywordOutput::Branches(branches) = failed[0].1 else {
            panic!("expected branches");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[1].get("#").unwrap().failed(KeywordKind::Type).len(), 1);
    }

    #[test]
    fn failing_children_fail_the_parent_applicator() {
        let output = evaluate(
            json!({"anyOf": [{"properties": {"a": {"type": "string"}}}]}),
            json!({"a": 1}),
            &[("/anyOf/0/properties/a/type", "/a")],
        );
        assert_eq!(at(&output, "#").failed(KeywordKind::AnyOf).len(), 1);
    }

    #[test]
    fn false_schema_marks_the_location() {
        let output = evaluate(
            json!({"properties": {"a": {}}, "additionalProperties": false}),
            json!({"a": 1, "b": 2}),
            &[("/additionalProperties", "")],
        );
        let failed = at(&output, "#/b").failed(KeywordKind::Validation);
        assert_eq!(failed[0].0, "https://example.com/main#/additionalProperties");
        assert!(output.get("#/a").is_none());
    }

    #[test]
    fn unreported_false_schema_records_nothing() {
        let output = evaluate(
            json!({"if": {"type": "string"}, "then": false, "minimum": 10}),
            json!(5),
            &[("/minimum", "")],
        );
        let root = at(&output, "#");
        assert!(root.get(KeywordKind::Validation).is_none());
        assert!(root.failed(KeywordKind::Then).is_empty());
        assert_eq!(root.failed(KeywordKind::Minimum).len(), 1);
    }

    #[test]
    fn reported_false_schema_fails_its_keyword() {
        let output = evaluate(json!({"if": {"type": "string"}, "then": false}), json!("x"), &[("/then", "")]);
        let failed = at(&output, "#").failed(KeywordKind::Validation);
        assert_eq!(failed[0].0, "https://example.com/main#/then");
    }

    #[test]
    fn property_names_use_name_locations() {
        let output = evaluate(
            json!({"propertyNames": {"maxLength": 2}}),
            json!({"Foo": 1}),
            &[("/propertyNames/maxLength", "*/Foo")],
        );
        assert_eq!(at(&output, "#*/Foo").failed(KeywordKind::MaxLength).len(), 1);
    }

    #[test]
    fn items_after_prefix_use_absolute_indices() {
        let output = evaluate(
            json!({"prefixItems": [{"type": "string"}], "items": {"type": "number"}}),
            json!(["a", 1, "x"]),
            &[("/items/type", "/2")],
        );
        assert_eq!(at(&output, "#/2").failed(KeywordKind::Type).len(), 1);
        assert!(at(&output, "#/1").failed(KeywordKind::Type).is_empty());
    }

    #[test]
    fn unevaluated_properties_sees_claims_through_refs() {
        let output = evaluate(
            json!({
                "allOf": [{"$ref": "#/$defs/base"}],
                "properties": {"b": true},
                "unevaluatedProperties": false,
                "$defs": {"base": {"properties": {"a": true}}}
            }),
            json!({"a": 1, "b": 2, "c": 3}),
            &[("/unevaluatedProperties", "/c")],
        );
        assert!(at(&output, "#/a").failed(KeywordKind::Validation).is_empty());
        assert!(at(&output, "#/b").failed(KeywordKind::Validation).is_empty());
        assert_eq!(at(&output, "#/c").failed(KeywordKind::Validation).len(), 1);
    }

    #[test]
    fn failed_anyof_branches_do_not_claim() {
        let output = evaluate(
            json!({
                "anyOf": [
                    {"properties": {"a": {"type": "string"}}},
                    {"properties": {"b": true}}
                ],
                "unevaluatedProperties": false
            }),
            json!({"a": 1, "b": 2}),
            &[("/anyOf/0/properties/a/type", "/a"), ("/unevaluatedProperties", "/a")],
        );
        assert_eq!(at(&output, "#/a").failed(KeywordKind::Validation).len(), 1);
        assert!(output.get("#/b").is_none());
    }

    #[test]
    fn unevaluated_items_after_contains() {
        let output = evaluate(
            json!({"contains": {"type": "string"}, "unevaluatedItems": false}),
            json!(["a", 1]),
            &[("/contains/type", "/1"), ("/unevaluatedItems", "/1")],
        );
        assert!(output.get("#/0").is_none());
        assert_eq!(at(&output, "#/1").failed(KeywordKind::Validation).len(), 1);
    }

    #[test]
    fn recursive_refs_terminate() {
        let output = evaluate(
            json!({"$ref": "#", "unevaluatedProperties": false}),
            json!({"a": 1}),
            &[("/unevaluatedProperties", "/a")],
        );
        assert!(output.get("#/a").is_some());
    }
}
