//! Error Object Builder: walks a [`NormalizedOutput`] and renders one
//! localized message per failing keyword family.
//!
//! Locations are visited in insertion order; at each location the handlers
//! below run in their fixed priority order.
pub mod arr;
pub mod num;
pub mod obj;
pub mod text;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ast::Ast;
use crate::instance::{self, JsonNode};
use crate::pointer;
use crate::keyword::KeywordKind;
use crate::localization::Localization;
use crate::normalized::{InstanceOutput, KeywordOutput, NormalizedOutput};
use crate::select::{self, Selection};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaLocation {
    One(String),
    Many(Vec<String>),
}

impl SchemaLocation {
    /// One location stays a string; several become a list.
    pub fn from_locations(mut locations: Vec<String>) -> Self {
        if locations.len() == 1 {
            SchemaLocation::One(locations.remove(0))
        } else {
            SchemaLocation::Many(locations)
        }
    }

    pub fn locations(&self) -> Vec<&str> {
        match self {
            SchemaLocation::One(location) => vec![location.as_str()],
            SchemaLocation::Many(locations) => locations.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorObject {
    pub schema_location: SchemaLocation,
    pub instance_location: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub errors: Vec<ErrorObject>,
}

/// One instance location being described.
pub struct Site<'s, 'i> {
    pub location: &'s str,
    pub output: &'s InstanceOutput,
    pub node: JsonNode<'i>,
}

type Handler = fn(&DiagnosticBuilder<'_>, &Site<'_, '_>, &mut Vec<ErrorObject>);

const HANDLERS: [Handler; 17] = [
    any_of,
    one_of,
    false_schema,
    constant,
    arr::contains,
    obj::required,
    enumeration,
    num::range,
    format,
    text::length,
    arr::items_range,
    obj::properties_range,
    multiple_of,
    not,
    pattern,
    type_,
    arr::unique_items,
];

pub struct DiagnosticBuilder<'a> {
    ast: &'a Ast,
    instance: &'a Value,
    l10n: &'a Localization,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<'a> DiagnosticBuilder<'a> {
    pub fn new(ast: &'a Ast, instance: &'a Value, l10n: &'a Localization) -> Self {
        DiagnosticBuilder { ast, instance, l10n }
    }

    pub fn build(&self, output: &NormalizedOutput) -> Vec<ErrorObject> {
        let mut errors = Vec::new();
        for (location, instance_output) in output.iter() {
            // locations of absent properties only mark what a branch declared
            let Some(node) = instance::lookup(self.instance, location) else {
                continue;
            };
            let site = Site { location, output: instance_output, node };
            for handler in HANDLERS {
                handler(self, &site, &mut errors);
            }
        }
        errors
    }

    pub(crate) fn literal(&self, keyword_location: &str) -> Option<&'a Value> {
        self.ast.literal(keyword_location)
    }

    pub(crate) fn message(&self, id: &str, args: &[(&str, String)]) -> String {
        self.l10n.message(id, args)
    }

    pub(crate) fn l10n(&self) -> &'a Localization {
        self.l10n
    }

    pub(crate) fn ast(&self) -> &'a Ast {
        self.ast
    }
}

fn push(errors: &mut Vec<ErrorObject>, site: &Site<'_, '_>, locations: Vec<String>, message: String) {
    errors.push(ErrorObject {
        schema_location: SchemaLocation::from_locations(locations),
        instance_location: site.location.to_string(),
        message,
    });
}

/// Run `describe` for every failed keyword of `kind` at the site.
fn each_failed(
    site: &Site<'_, '_>,
    kind: KeywordKind,
    errors: &mut Vec<ErrorObject>,
    mut describe: impl FnMut(&str, &KeywordOutput) -> Option<String>,
) {
    for (location, output) in site.output.failed(kind) {
        if let Some(message) = describe(location, output) {
            push(errors, site, vec![location.to_string()], message);
        }
    }
}

fn json_text(value: &Value) -> String {
    value.to_string()
}

fn quoted(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

// ------------------------------ Composites -------------------------------- //

fn any_of(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    for (location, output) in site.output.failed(KeywordKind::AnyOf) {
        if let KeywordOutput::Branches(branches) = output {
            resolve_alternatives(builder, site, location, branches, errors);
        }
    }
}

fn one_of(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    for (location, output) in site.output.failed(KeywordKind::OneOf) {
        let KeywordOutput::Branches(branches) = output else {
            continue;
        };
        let matched = branches
            .iter()
            .filter(|branch| branch.iter().all(|(_, output)| output.all_valid()))
            .count();
        if matched > 1 {
            let message = builder.message("one-of-multiple-error", &[("matched", matched.to_string())]);
            push(errors, site, vec![location.to_string()], message);
        } else {
            resolve_alternatives(builder, site, location, branches, errors);
        }
    }
}

fn resolve_alternatives(
    builder: &DiagnosticBuilder<'_>,
    site: &Site<'_, '_>,
    location: &str,
    branches: &[NormalizedOutput],
    errors: &mut Vec<ErrorObject>,
) {
    match select::select_alternative(branches, site.location, builder.instance, builder.ast) {
        Selection::Branch(index) => errors.extend(builder.build(&branches[index])),
        Selection::NoMatch { types, values } => {
            let l10n = builder.l10n();
            let actual = quoted(site.node.json_type().as_str());
            let types: Vec<String> = types.iter().map(|name| quoted(name)).collect();
            let values: Vec<String> = values.iter().map(json_text).collect();
            let message = match (types.is_empty(), values.is_empty()) {
                (_, true) => builder.message(
                    "type-error",
                    &[("expected", l10n.disjunction(&types)), ("actual", actual)],
                ),
                (true, false) => builder.message(
                    "enum-error-fallback",
                    &[
                        ("instanceValue", json_text(&site.node.to_value())),
                        ("allowedValues", l10n.disjunction(&values)),
                    ],
                ),
                (false, false) => builder.message(
                    "any-of-error",
                    &[
                        ("types", l10n.disjunction(&types)),
                        ("values", l10n.disjunction(&values)),
                        ("actual", actual),
                    ],
                ),
            };
            push(errors, site, vec![location.to_string()], message);
        }
        Selection::Unresolved => {}
    }
}

/// A `false` subschema. Under property/item applicators the offending
/// property or index is named.
fn false_schema(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    each_failed(site, KeywordKind::Validation, errors, |location, _| {
        let owner = builder.ast().keyword(location).map(|keyword| keyword.keyword.kind());
        let parent = location
            .rsplit_once('/')
            .and_then(|(parent, _)| builder.ast().keyword(parent))
            .map(|keyword| keyword.keyword.kind());
        let last = pointer::last_token(site.location);
        Some(match (owner, parent, last) {
            (
                Some(KeywordKind::AdditionalProperties | KeywordKind::UnevaluatedProperties),
                _,
                Some(name),
            ) => builder.message("additional-properties-error", &[("propertyName", name)]),
            (Some(KeywordKind::Items | KeywordKind::UnevaluatedItems), _, Some(index))
            | (_, Some(KeywordKind::PrefixItems), Some(index)) => {
                builder.message("additional-items-error", &[("index", index)])
            }
            _ => builder.message("false-schema-error", &[]),
        })
    });
}

// -------------------------------- Values ---------------------------------- //

fn constant(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    each_failed(site, KeywordKind::Const, errors, |location, _| {
        let expected = builder.literal(location)?;
        Some(builder.message("const-error", &[("expectedValue", json_text(expected))]))
    });
}

fn enumeration(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    each_failed(site, KeywordKind::Enum, errors, |location, _| {
        let allowed = builder.literal(location)?.as_array()?;
        let current = site.node.to_value();
        let instance_value = json_text(&current);
        let current_text = comparable_text(&current);
        let best = allowed
            .iter()
            .map(|value| {
                let text = comparable_text(value);
                let weight = levenshtein(&text, &current_text);
                (value, text, weight)
            })
            .min_by_key(|(_, _, weight)| *weight);
        match best {
            Some((value, text, weight)) if allowed.len() == 1 || weight < text.chars().count() => Some(
                builder.message(
                    "enum-error-suggestion",
                    &[("instanceValue", instance_value), ("suggestion", json_text(value))],
                ),
            ),
            _ => {
                let values: Vec<String> = allowed.iter().map(json_text).collect();
                Some(builder.message(
                    "enum-error-fallback",
                    &[("instanceValue", instance_value), ("allowedValues", builder.l10n().disjunction(&values))],
                ))
            }
        }
    });
}

fn comparable_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Edit distance over chars.
fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut current = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        previous = current;
    }
    previous[b.len()]
}

fn type_(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    each_failed(site, KeywordKind::Type, errors, |location, _| {
        let expected: Vec<String> = match builder.literal(location)? {
            Value::String(name) => vec![quoted(name)],
            Value::Array(names) => names.iter().filter_map(Value::as_str).map(quoted).collect(),
            _ => return None,
        };
        Some(builder.message(
            "type-error",
            &[
                ("expected", builder.l10n().disjunction(&expected)),
                ("actual", quoted(site.node.json_type().as_str())),
            ],
        ))
    });
}

// ------------------------------ Assertions -------------------------------- //

fn format(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    each_failed(site, KeywordKind::Format, errors, |location, _| {
        let format = builder.literal(location)?.as_str()?;
        Some(builder.message("format-error", &[("format", format.to_string())]))
    });
}

fn multiple_of(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    each_failed(site, KeywordKind::MultipleOf, errors, |location, _| {
        let divisor = builder.literal(location)?;
        Some(builder.message("multiple-of-error", &[("divisor", json_text(divisor))]))
    });
}

fn not(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    each_failed(site, KeywordKind::Not, errors, |_, _| Some(builder.message("not-error", &[])));
}

fn pattern(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    each_failed(site, KeywordKind::Pattern, errors, |location, _| {
        let pattern = builder.literal(location)?.as_str()?;
        Some(builder.message("pattern-error", &[("pattern", pattern.to_string())]))
    });
}

// ------------------------------- Combining -------------------------------- //

/// Paired lower/upper count bounds folded across every recorded sibling.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct CountRange {
    pub min: Option<u64>,
    pub max: Option<u64>,
    /// Locations of the siblings that failed, in encounter order.
    pub failed: Vec<String>,
}

pub(crate) fn count_range(
    builder: &DiagnosticBuilder<'_>,
    site: &Site<'_, '_>,
    min_kind: KeywordKind,
    max_kind: KeywordKind,
) -> Option<CountRange> {
    let mut range = CountRange::default();
    for (kind, is_min) in [(min_kind, true), (max_kind, false)] {
        let Some(keywords) = site.output.get(kind) else {
            continue;
        };
        for (location, output) in keywords {
            if !output.is_valid() {
                range.failed.push(location.clone());
            }
            let Some(bound) = builder.literal(location).and_then(count_bound) else {
                continue;
            };
            if is_min {
                range.min = Some(range.min.map_or(bound, |min| min.max(bound)));
            } else {
                range.max = Some(range.max.map_or(bound, |max| max.min(bound)));
            }
        }
    }
    (!range.failed.is_empty()).then_some(range)
}

fn count_bound(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|bound| *bound >= 0.0 && bound.fract() == 0.0)
            .map(|bound| bound as u64)
    })
}

/// Render `{constraints}` for a range family from its min/max phrases.
pub(crate) fn range_message(
    builder: &DiagnosticBuilder<'_>,
    id: &str,
    phrases: Vec<String>,
) -> String {
    let constraints = builder.l10n().conjunction(&phrases);
    builder.message(id, &[("constraints", constraints)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalized::KeywordOutput;
    use serde_json::json;

    fn describe(ast: &Ast, instance: &Value, output: &NormalizedOutput) -> Vec<ErrorObject> {
        let l10n = Localization::default();
        DiagnosticBuilder::new(ast, instance, &l10n).build(output)
    }

    fn ast_with(literals: &[(&str, Value)]) -> Ast {
        let mut ast = Ast::default();
        for (location, value) in literals {
            ast.insert_literal(location.to_string(), value.clone());
        }
        ast
    }

    #[test]
    fn levenshtein_counts_edits() {
        assert_eq!(levenshtein("rwd", "red"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn enum_suggests_close_values() {
        let ast = ast_with(&[("s#/enum", json!(["red", "green", "blue"]))]);
        let mut output = NormalizedOutput::new();
        output.record("#", KeywordKind::Enum, "s#/enum", KeywordOutput::Valid(false));
        let errors = describe(&ast, &json!("rwd"), &output);
        assert_eq!(errors[0].message, "Unexpected value \"rwd\". Did you mean \"red\"?");

        let errors = describe(&ast, &json!("zzzzzzzz"), &output);
        assert_eq!(
            errors[0].message,
            "Unexpected value \"zzzzzzzz\". Expected one of: \"red\", \"green\", or \"blue\"."
        );
    }

    #[test]
    fn type_lists_expected_types() {
        let ast = ast_with(&[("s#/type", json!(["number", "null"]))]);
        let mut output = NormalizedOutput::new();
        output.record("#", KeywordKind::Type, "s#/type", KeywordOutput::Valid(false));
        let errors = describe(&ast, &json!("x"), &output);
        assert_eq!(
            errors[0].message,
            "The instance should be of type \"number\" or \"null\" but found \"string\"."
        );
        assert_eq!(errors[0].schema_location, SchemaLocation::One("s#/type".into()));
    }

    #[test]
    fn passing_keywords_produce_nothing() {
        let ast = ast_with(&[("s#/const", json!(2))]);
        let mut output = NormalizedOutput::new();
        output.record("#", KeywordKind::Const, "s#/const", KeywordOutput::Valid(true));
        assert!(describe(&ast, &json!(2), &output).is_empty());
    }

    #[test]
    fn absent_locations_are_skipped() {
        let mut output = NormalizedOutput::new();
        output.record("#/missing", KeywordKind::Not, "s#/properties/missing/not", KeywordOutput::Valid(false));
        assert!(describe(&Ast::default(), &json!({}), &output).is_empty());
    }

    #[test]
    fn schema_location_serializes_untagged() {
        let error = ErrorObject {
            schema_location: SchemaLocation::from_locations(vec!["a".into(), "b".into()]),
            instance_location: "#".into(),
            message: "m".into(),
        };
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"schemaLocation": ["a", "b"], "instanceLocation": "#", "message": "m"})
        );
    }
}
