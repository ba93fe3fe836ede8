//! `minimum`, `maximum` and their exclusive forms, folded into one message.
use ordered_float::OrderedFloat;
use serde_json::Value;

use super::{push, range_message, DiagnosticBuilder, ErrorObject, Site};
use crate::keyword::KeywordKind;

/// The tightest bound seen so far on one side, with the literal that set it.
#[derive(Debug, Default)]
struct Bound<'v> {
    inclusive: Option<(OrderedFloat<f64>, &'v Value)>,
    exclusive: Option<(OrderedFloat<f64>, &'v Value)>,
}

enum Side {
    Lower,
    Upper,
}

impl<'v> Bound<'v> {
    fn tighten(slot: &mut Option<(OrderedFloat<f64>, &'v Value)>, candidate: (OrderedFloat<f64>, &'v Value), side: &Side) {
        let tighter = match (slot.as_ref(), side) {
            (None, _) => true,
            (Some((current, _)), Side::Lower) => candidate.0 > *current,
            (Some((current, _)), Side::Upper) => candidate.0 < *current,
        };
        if tighter {
            *slot = Some(candidate);
        }
    }

    /// The effective bound. An exclusive bound wins ties with an inclusive one.
    fn effective(&self, side: &Side) -> Option<(&'v Value, bool)> {
        match (self.inclusive, self.exclusive) {
            (None, None) => None,
            (Some((_, value)), None) => Some((value, false)),
            (None, Some((_, value))) => Some((value, true)),
            (Some((inclusive, inclusive_value)), Some((exclusive, exclusive_value))) => {
                let exclusive_wins = match side {
                    Side::Lower => exclusive >= inclusive,
                    Side::Upper => exclusive <= inclusive,
                };
                if exclusive_wins {
                    Some((exclusive_value, true))
                } else {
                    Some((inclusive_value, false))
                }
            }
        }
    }
}

const FAMILY: [(KeywordKind, Side, bool); 4] = [
    (KeywordKind::Minimum, Side::Lower, false),
    (KeywordKind::ExclusiveMinimum, Side::Lower, true),
    (KeywordKind::Maximum, Side::Upper, false),
    (KeywordKind::ExclusiveMaximum, Side::Upper, true),
];

pub(super) fn range(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    let mut lower = Bound::default();
    let mut upper = Bound::default();
    let mut failed = Vec::new();

    for (kind, side, exclusive) in &FAMILY {
        let Some(keywords) = site.output.get(*kind) else {
            continue;
        };
        for (location, output) in keywords {
            if !output.is_valid() {
                failed.push(location.clone());
            }
            let Some(value) = builder.literal(location) else {
                continue;
            };
            let Some(number) = value.as_f64() else {
                continue;
            };
            let bound = match side {
                Side::Lower => &mut lower,
                Side::Upper => &mut upper,
            };
            let slot = if *exclusive { &mut bound.exclusive } else { &mut bound.inclusive };
            Bound::tighten(slot, (OrderedFloat(number), value), side);
        }
    }
    if failed.is_empty() {
        return;
    }

    let mut phrases = Vec::new();
    if let Some((value, exclusive)) = lower.effective(&Side::Lower) {
        let id = if exclusive { "number-error-exclusive-minimum" } else { "number-error-minimum" };
        phrases.push(builder.message(id, &[("minimum", value.to_string())]));
    }
    if let Some((value, exclusive)) = upper.effective(&Side::Upper) {
        let id = if exclusive { "number-error-exclusive-maximum" } else { "number-error-maximum" };
        phrases.push(builder.message(id, &[("maximum", value.to_string())]));
    }
    let message = range_message(builder, "number-error", phrases);
    push(errors, site, failed, message);
}

#[cfg(test)]
mod tests {
    use crate::ast::Ast;
    use crate::describe::{DiagnosticBuilder, SchemaLocation};
    use crate::keyword::KeywordKind;
    use crate::localization::Localization;
    use crate::normalized::{KeywordOutput, NormalizedOutput};
    use serde_json::json;

    #[test]
    fn folds_bounds_across_siblings() {
        let mut ast = Ast::default();
        ast.insert_literal("s#/allOf/0/minimum".into(), json!(2));
        ast.insert_literal("s#/allOf/1/minimum".into(), json!(3));
        ast.insert_literal("s#/allOf/2/exclusiveMaximum".into(), json!(10));
        let mut output = NormalizedOutput::new();
        output.record("#", KeywordKind::Minimum, "s#/allOf/0/minimum", KeywordOutput::Valid(false));
        output.record("#", KeywordKind::Minimum, "s#/allOf/1/minimum", KeywordOutput::Valid(false));
        output.record("#", KeywordKind::ExclusiveMaximum, "s#/allOf/2/exclusiveMaximum", KeywordOutput::Valid(true));

        let l10n = Localization::default();
        let instance = json!(1);
        let errors = DiagnosticBuilder::new(&ast, &instance, &l10n).build(&output);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].schema_location,
            SchemaLocation::Many(vec!["s#/allOf/0/minimum".into(), "s#/allOf/1/minimum".into()])
        );
        assert_eq!(
            errors[0].message,
            "The instance should be greater than or equal to 3 and less than 10."
        );
    }

    #[test]
    fn exclusive_bound_wins_ties() {
        let mut ast = Ast::default();
        ast.insert_literal("s#/minimum".into(), json!(5));
        ast.insert_literal("s#/exclusiveMinimum".into(), json!(5));
        let mut output = NormalizedOutput::new();
        output.record("#", KeywordKind::Minimum, "s#/minimum", KeywordOutput::Valid(true));
        output.record("#", KeywordKind::ExclusiveMinimum, "s#/exclusiveMinimum", KeywordOutput::Valid(false));

        let l10n = Localization::default();
        let instance = json!(5);
        let errors = DiagnosticBuilder::new(&ast, &instance, &l10n).build(&output);
        assert_eq!(errors[0].schema_location, SchemaLocation::One("s#/exclusiveMinimum".into()));
        assert_eq!(errors[0].message, "The instance should be greater than 5.");
    }
}
