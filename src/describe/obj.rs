//! Object keyword families.
use indexmap::IndexSet;
use serde_json::Value;

use super::{count_range, push, range_message, DiagnosticBuilder, ErrorObject, Site};
use crate::keyword::KeywordKind;

/// `required` and `dependentRequired` together: one message naming every
/// property still missing.
pub(super) fn required(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    let Some(object) = site.node.as_object() else {
        return;
    };
    let mut missing: IndexSet<String> = IndexSet::new();
    let mut locations = Vec::new();

    for (location, _) in site.output.failed(KeywordKind::Required) {
        locations.push(location.to_string());
        let names = builder.literal(location).and_then(Value::as_array);
        missing.extend(names.into_iter().flatten().filter_map(Value::as_str).map(str::to_string));
    }

    for (location, _) in site.output.failed(KeywordKind::DependentRequired) {
        let Some(dependencies) = builder.literal(location).and_then(Value::as_object) else {
            continue;
        };
        let mut triggered = false;
        for (property, names) in dependencies {
            if !object.contains_key(property) {
                continue;
            }
            triggered = true;
            let names = names.as_array().into_iter().flatten().filter_map(Value::as_str);
            missing.extend(names.map(str::to_string));
        }
        if triggered {
            locations.push(location.to_string());
        }
    }

    missing.retain(|name| !object.contains_key(name));
    if missing.is_empty() {
        return;
    }
    let missing: Vec<String> = missing.into_iter().collect();
    let message = builder.message(
        "required-error",
        &[
            ("instanceLocation", site.location.to_string()),
            ("missingProperties", builder.l10n().conjunction(&missing)),
        ],
    );
    push(errors, site, locations, message);
}

pub(super) fn properties_range(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    let Some(range) = count_range(builder, site, KeywordKind::MinProperties, KeywordKind::MaxProperties) else {
        return;
    };
    let mut phrases = Vec::new();
    if let Some(min) = range.min {
        phrases.push(builder.message("properties-error-min", &[("minProperties", min.to_string())]));
    }
    if let Some(max) = range.max {
        phrases.push(builder.message("properties-error-max", &[("maxProperties", max.to_string())]));
    }
    let message = range_message(builder, "properties-error", phrases);
    push(errors, site, range.failed, message);
}

#[cfg(test)]
mod tests {
    use crate::ast::Ast;
    use crate::describe::{DiagnosticBuilder, ErrorObject, SchemaLocation};
    use crate::keyword::KeywordKind;
    use crate::localization::Localization;
    use crate::normalized::{KeywordOutput, NormalizedOutput};
    use serde_json::{json, Value};

    fn describe(ast: &Ast, instance: &Value, output: &NormalizedOutput) -> Vec<ErrorObject> {
        let l10n = Localization::default();
        DiagnosticBuilder::new(ast, instance, &l10n).build(output)
    }

    #[test]
    fn required_lists_only_absent_names() {
        let mut ast = Ast::default();
        ast.insert_literal("s#/required".into(), json!(["foo", "bar", "baz"]));
        let mut output = NormalizedOutput::new();
        output.record("#", KeywordKind::Required, "s#/required", KeywordOutput::Valid(false));

        let errors = describe(&ast, &json!({"foo": 1, "bar": 2, "extra": true}), &output);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "\"#\" is missing required property(s): baz.");
    }

    #[test]
    fn dependent_required_joins_required() {
        let mut ast = Ast::default();
        ast.insert_literal("s#/required".into(), json!(["id"]));
        ast.insert_literal("s#/dependentRequired".into(), json!({"card": ["billing", "zip"], "other": ["x"]}));
        let mut output = NormalizedOutput::new();
        output.record("#", KeywordKind::Required, "s#/required", KeywordOutput::Valid(false));
        output.record("#", KeywordKind::DependentRequired, "s#/dependentRequired", KeywordOutput::Valid(false));

        let errors = describe(&ast, &json!({"card": 1, "zip": 2}), &output);
        assert_eq!(
            errors[0].schema_location,
            SchemaLocation::Many(vec!["s#/required".into(), "s#/dependentRequired".into()])
        );
        assert_eq!(errors[0].message, "\"#\" is missing required property(s): id and billing.");
    }

    #[test]
    fn property_counts() {
        let mut ast = Ast::default();
        ast.insert_literal("s#/maxProperties".into(), json!(1));
        let mut output = NormalizedOutput::new();
        output.record("#", KeywordKind::MaxProperties, "s#/maxProperties", KeywordOutput::Valid(false));

        let errors = describe(&ast, &json!({"a": 1, "b": 2}), &output);
        assert_eq!(errors[0].message, "The instance should have maximum 1 properties.");
    }
}
