use super::{count_range, push, range_message, DiagnosticBuilder, ErrorObject, Site};
use crate::keyword::KeywordKind;

/// `minLength`/`maxLength`.
pub(super) fn length(builder: &DiagnosticBuilder<'_>, site: &Site<'_, '_>, errors: &mut Vec<ErrorObject>) {
    let Some(range) = count_range(builder, site, KeywordKind::MinLength, KeywordKind::MaxLength) else {
        return;
    };
    let mut phrases = Vec::new();
    if let Some(min) = range.min {
        phrases.push(builder.message("string-error-minLength", &[("minLength", min.to_string())]));
    }
    if let Some(max) = range.max {
        phrases.push(builder.message("string-error-maxLength", &[("maxLength", max.to_string())]));
    }
    let message = range_message(builder, "string-error", phrases);
    push(errors, site, range.failed, message);
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
    fn min_length_names_its_limit() {
        let mut ast = Ast::default();
        ast.insert_literal("s#/minLength".into(), json!(3));
        let mut output = NormalizedOutput::new();
        output.record("#", KeywordKind::MinLength, "s#/minLength", KeywordOutput::Valid(false));

        let l10n = Localization::default();
        let instance = json!("aa");
        let errors = DiagnosticBuilder::new(&ast, &instance, &l10n).build(&output);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].instance_location, "#");
        assert_eq!(errors[0].schema_location, SchemaLocation::One("s#/minLength".into()));
        assert_eq!(errors[0].message, "The instance should be at least 3 characters long.");
    }

    #[test]
    fn both_bounds_share_one_message() {
        let mut ast = Ast::default();
        ast.insert_literal("s#/minLength".into(), json!(2));
        ast.insert_literal("s#/maxLength".into(), json!(4));
        let mut output = NormalizedOutput::new();
        output.record("#", KeywordKind::MinLength, "s#/minLength", KeywordOutput::Valid(true));
        output.record("#", KeywordKind::MaxLength, "s#/maxLength", KeywordOutput::Valid(false));

        let l10n = Localization::default();
        let instance = json!("abcdef");
        let errors = DiagnosticBuilder::new(&ast, &instance, &l10n).build(&output);
        assert_eq!(
            errors[0].message,
            "The instance should be at least 2 characters long and at most 4 characters long."
        );
    }
}
