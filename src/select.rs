//! Picks the alternative of a failed `anyOf`/`oneOf` that best explains the failure.
//!
//! 1. Drop branches whose `type`/`enum`/`const` at the instance location all failed.
//! 2. None left: report the union of what every branch would have accepted.
//! 3. One left: that branch.
//! 4. Several left on an object: narrow by discriminator properties, then by
//!    overlap with the instance's own properties.
//! 5. Anything else stays unresolved and produces no message.
use indexmap::IndexSet;
use serde_json::Value;
use tracing::debug;

use crate::ast::Ast;
use crate::instance::{self, JsonType};
use crate::keyword::KeywordKind;
use crate::normalized::NormalizedOutput;

const SHAPE_KEYWORDS: [KeywordKind; 3] = [KeywordKind::Type, KeywordKind::Enum, KeywordKind::Const];

#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    /// Explain the failure through this branch's own errors.
    Branch(usize),
    /// No branch accepts the instance's shape.
    NoMatch { types: Vec<String>, values: Vec<Value> },
    Unresolved,
}

pub fn select_alternative(
    branches: &[NormalizedOutput],
    instance_location: &str,
    instance: &Value,
    ast: &Ast,
) -> Selection {
    let survivors: Vec<usize> = (0..branches.len())
        .filter(|&index| shape_matches(&branches[index], instance_location))
        .collect();

    match survivors.as_slice() {
        [] => {
            let (types, values) = accepted_shapes(branches, instance_location, ast);
            debug!(instance = instance_location, "no alternative matches the instance shape");
            Selection::NoMatch { types, values }
        }
        [only] => Selection::Branch(*only),
        _ => {
            let is_object = instance::lookup(instance, instance_location)
                .is_some_and(|node| node.json_type() == JsonType::Object);
            if !is_object {
                debug!(instance = instance_location, candidates = survivors.len(), "alternatives left unresolved");
                return Selection::Unresolved;
            }
            discriminate(branches, &survivors, instance_location, instance)
        }
    }
}

fn shape_matches(branch: &NormalizedOutput, instance_location: &str) -> bool {
    let Some(output) = branch.get(instance_location) else {
        return true;
    };
    let mut present = SHAPE_KEYWORDS.iter().filter_map(|kind| output.get(*kind)).peekable();
    if present.peek().is_none() {
        return true;
    }
    present.any(|keywords| keywords.values().all(|result| result.is_valid()))
}

fn accepted_shapes(
    branches: &[NormalizedOutput],
    instance_location: &str,
    ast: &Ast,
) -> (Vec<String>, Vec<Value>) {
    let mut types = IndexSet::new();
    let mut values: Vec<Value> = Vec::new();
    let mut push_value = |value: &Value| {
        if !values.contains(value) {
            values.push(value.clone());
        }
    };
    for output in branches.iter().filter_map(|branch| branch.get(instance_location)) {
        for kind in SHAPE_KEYWORDS {
            for location in output.get(kind).into_iter().flat_map(|keywords| keywords.keys()) {
                match (kind, ast.literal(location)) {
                    (KeywordKind::Type, Some(Value::String(name))) => {
                        types.insert(name.clone());
                    }
                    (KeywordKind::Type, Some(Value::Array(names))) => {
                        types.extend(names.iter().filter_map(Value::as_str).map(str::to_string));
                    }
                    (KeywordKind::Enum, Some(Value::Array(allowed))) => allowed.iter().for_each(&mut push_value),
                    (KeywordKind::Const, Some(value)) => push_value(value),
                    _ => {}
                }
            }
        }
    }
    (types.into_iter().collect(), values)
}

// ---------------------------- Discrimination ------------------------------ //

/// First-level instance locations below `instance_location` that a branch touched.
fn defined_properties(branch: &NormalizedOutput, instance_location: &str) -> IndexSet<String> {
    let prefix = format!("{instance_location}/");
    branch
        .iter()
        .filter_map(|(location, _)| {
            let rest = location.strip_prefix(&prefix)?;
            let segment = rest.split('/').next()?;
            Some(format!("{prefix}{segment}"))
        })
        .collect()
}

fn discriminate(
    branches: &[NormalizedOutput],
    survivors: &[usize],
    instance_location: &str,
    instance: &Value,
) -> Selection {
    let defined: Vec<IndexSet<String>> = survivors
        .iter()
        .map(|&index| defined_properties(&branches[index], instance_location))
        .collect();
    let mut discriminators = defined[0].clone();
    for properties in &defined[1..] {
        discriminators.retain(|location| properties.contains(location));
    }

    let own_properties: IndexSet<String> = instance::lookup(instance, instance_location)
        .map(|node| node.entries().into_iter().map(|(_, child)| child.location).collect())
        .unwrap_or_default();
    let by_overlap = |candidates: &[usize]| -> Selection {
        let mut best: Option<(usize, usize)> = None;
        for &index in candidates {
            let overlap = defined_properties(&branches[index], instance_location)
                .intersection(&own_properties)
                .count();
            if best.is_none_or(|(_, max)| overlap > max) {
                best = Some((index, overlap));
            }
        }
        debug!(instance = instance_location, choice = ?best, "alternative chosen by property overlap");
        best.map_or(Selection::Unresolved, |(index, _)| Selection::Branch(index))
    };

    if discriminators.is_empty() {
        return by_overlap(survivors);
    }

    let discriminated: Vec<usize> = survivors
        .iter()
        .copied()
        .filter(|&index| {
            discriminators.iter().any(|location| {
                branches[index]
                    .get(location)
                    .is_some_and(|output| output.all_valid())
            })
        })
        .collect();

    match discriminated.as_slice() {
        [] => {
            debug!(
                instance = instance_location,
                discriminators = ?discriminators,
                "no alternative satisfies a discriminator; left unresolved"
            );
            Selection::Unresolved
        }
        [only] => Selection::Branch(*only),
        many => by_overlap(many),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalized::KeywordOutput;
    use serde_json::json;

    fn branch(entries: &[(&str, KeywordKind, &str, bool)]) -> NormalizedOutput {
        let mut output = NormalizedOutput::new();
        for (instance_location, kind, keyword_location, valid) in entries {
            output.record(instance_location, *kind, keyword_location, KeywordOutput::Valid(*valid));
        }
        output
    }

    #[test]
    fn single_type_match_selects_that_branch() {
        let branches = vec![
            branch(&[("#", KeywordKind::Type, "s#/anyOf/0/type", false)]),
            branch(&[
                ("#", KeywordKind::Type, "s#/anyOf/1/type", true),
                ("#", KeywordKind::MinLength, "s#/anyOf/1/minLength", false),
            ]),
        ];
        let selection = select_alternative(&branches, "#", &json!("aa"), &Ast::default());
        assert_eq!(selection, Selection::Branch(1));
    }

    #[test]
    fn no_type_match_collects_every_declared_shape() {
        let mut ast = Ast::default();
        ast.insert_literal("s#/anyOf/0/type".into(), json!("string"));
        ast.insert_literal("s#/anyOf/1/type".into(), json!(["number", "string"]));
        ast.insert_literal("s#/anyOf/2/const".into(), json!(42));
        let branches = vec![
            branch(&[("#", KeywordKind::Type, "s#/anyOf/0/type", false)]),
            branch(&[("#", KeywordKind::Type, "s#/anyOf/1/type", false)]),
            branch(&[("#", KeywordKind::Const, "s#/anyOf/2/const", false)]),
        ];
        let selection = select_alternative(&branches, "#", &json!(true), &ast);
        assert_eq!(
            selection,
            Selection::NoMatch { types: vec!["string".into(), "number".into()], values: vec![json!(42)] }
        );
    }

    #[test]
    fn overlap_picks_the_branch_sharing_most_properties() {
        let branches = vec![
            branch(&[
                ("#/name", KeywordKind::Type, "s#/anyOf/0/properties/name/type", true),
                ("#/name", KeywordKind::Pattern, "s#/anyOf/0/properties/name/pattern", false),
            ]),
            branch(&[("#", KeywordKind::Required, "s#/anyOf/1/required", false)]),
        ];
        let instance = json!({"name": "ABC"});
        let selection = select_alternative(&branches, "#", &instance, &Ast::default());
        assert_eq!(selection, Selection::Branch(0));
    }

    #[test]
    fn discriminator_selects_the_valid_branch() {
        let branches = vec![
            branch(&[
                ("#/kind", KeywordKind::Const, "s#/anyOf/0/properties/kind/const", false),
                ("#/size", KeywordKind::Minimum, "s#/anyOf/0/properties/size/minimum", false),
            ]),
            branch(&[
                ("#/kind", KeywordKind::Const, "s#/anyOf/1/properties/kind/const", true),
                ("#/size", KeywordKind::Maximum, "s#/anyOf/1/properties/size/maximum", false),
            ]),
        ];
        let instance = json!({"kind": "b", "size": 20});
        let selection = select_alternative(&branches, "#", &instance, &Ast::default());
        assert_eq!(selection, Selection::Branch(1));
    }

    #[test]
    fn discriminator_without_valid_branch_is_unresolved() {
        let branches = vec![
            branch(&[("#/kind", KeywordKind::Const, "s#/anyOf/0/properties/kind/const", false)]),
            branch(&[("#/kind", KeywordKind::Const, "s#/anyOf/1/properties/kind/const", false)]),
        ];
        let selection = select_alternative(&branches, "#", &json!({"kind": "c"}), &Ast::default());
        assert_eq!(selection, Selection::Unresolved);
    }

    #[test]
    fn absent_discriminator_falls_back_to_overlap() {
        let mut first = branch(&[("#/a", KeywordKind::Type, "s#/anyOf/0/properties/a/type", false)]);
        first.touch("#/kind");
        let mut second = branch(&[("#/b", KeywordKind::Type, "s#/anyOf/1/properties/b/type", false)]);
        second.touch("#/kind");
        let instance = json!({"a": 1, "b": "x"});
        let selection = select_alternative(&[first, second], "#", &instance, &Ast::default());
        assert_eq!(selection, Selection::Branch(0));
    }

    #[test]
    fn several_survivors_on_scalars_are_unresolved() {
        let branches = vec![
            branch(&[("#", KeywordKind::MinLength, "s#/anyOf/0/minLength", false)]),
            branch(&[("#", KeywordKind::Pattern, "s#/anyOf/1/pattern", false)]),
        ];
        let selection = select_alternative(&branches, "#", &json!("x"), &Ast::default());
        assert_eq!(selection, Selection::Unresolved);
    }
}
