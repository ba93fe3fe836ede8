//! Array keyword families.
use super::{count_range, push, range_message, DiagnosticBuilder, ErrorObject, Site};
use crate::ast::Keyword;
use crate::keyword::KeywordKind;
use crate::normalized::KeywordOutput;

pub(super) fn items_range(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    let Some(range) = count_range(builder, site, KeywordKind::MinItems, KeywordKind::MaxItems) else {
        return;
    };
    let mut phrases = Vec::new();
    if let Some(min) = range.min {
        phrases.push(builder.message("array-error-min", &[("minItems", min.to_string())]));
    }
    if let Some(max) = range.max {
        phrases.push(builder.message("array-error-max", &[("maxItems", max.to_string())]));
    }
    let message = range_message(builder, "array-error", phrases);
    push(errors, site, range.failed, message);
}

pub(super) fn unique_items(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    for (location, _) in site.output.failed(KeywordKind::UniqueItems) {
        let message = builder.message("unique-items-error", &[]);
        push(errors, site, vec![location.to_string()], message);
    }
}

/// One message per failed `contains`, then whatever each element got wrong.
pub(super) fn contains(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    for (location, output) in site.output.failed(KeywordKind::Contains) {
        let (min_contains, max_contains) = match builder.ast().keyword(location).map(|node| &node.keyword) {
            Some(Keyword::Contains { min_contains, max_contains, .. }) => (*min_contains, *max_contains),
            _ => (1, None),
        };
        let message = match max_contains {
            Some(max) => builder.message(
                "contains-error-min-max",
                &[("minContains", min_contains.to_string()), ("maxContains", max.to_string())],
            ),
            None => builder.message("contains-error-min", &[("minContains", min_contains.to_string())]),
        };
        push(errors, site, vec![location.to_string()], message);

        if let KeywordOutput::Branches(elements) = output {
            for element in elements {
                errors.extend(builder.build(element));
            }
        }
    }
}
