//! Turn JSON Schema validation output into targeted, human-readable
//! diagnostics.
//!
//! The pipeline:
//! 1. [`ErrorIndex::build`] flattens the validator's output into
//!    `keywordLocation -> failing instance locations`.
//! 2. [`Evaluator::evaluate`] re-walks the compiled schema against the
//!    instance and produces a [`NormalizedOutput`].
//! 3. [`DiagnosticBuilder::build`] turns that into localized [`ErrorObject`]s.
pub mod ast;
pub mod compiler;
pub mod describe;
pub mod error;
pub mod evaluate;
pub mod index;
pub mod instance;
pub mod keyword;
pub mod localization;
pub mod normalized;
pub mod output;
pub mod path_de;
pub mod pointer;
pub mod select;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use compiler::{SchemaCompiler, SchemaRegistry};
pub use describe::{DiagnosticBuilder, Diagnostics, ErrorObject, SchemaLocation};
pub use error::{CompileError, DiagnosticsError, FormatError, LocalizationError};
pub use evaluate::Evaluator;
pub use index::ErrorIndex;
pub use keyword::KeywordKind;
pub use localization::Localization;
pub use normalized::{InstanceOutput, KeywordOutput, NormalizedOutput};
pub use output::OutputUnit;

// ————————————————————————————————————————————————————————————————————————————
// OPTIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    pub locale: String,
    pub max_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            locale: localization::DEFAULT_LOCALE.to_string(),
            max_depth: evaluate::DEFAULT_MAX_DEPTH,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

/// Index and evaluate, stopping before messages are rendered.
pub fn normalized_output(
    instance: &Value,
    output: &OutputUnit,
    schema_id: &str,
    compiler: &dyn SchemaCompiler,
    options: &Options,
) -> Result<NormalizedOutput, DiagnosticsError> {
    let index = ErrorIndex::build(output, schema_id, compiler)?;
    let ast = compiler.compile(schema_id)?;
    Ok(Evaluator::new(&ast, &index).with_max_depth(options.max_depth).evaluate(instance))
}

/// Full pipeline over raw validator output JSON.
pub fn produce_diagnostics(
    instance: &Value,
    output_json: &Value,
    schema_id: &str,
    compiler: &dyn SchemaCompiler,
    options: &Options,
) -> Result<Diagnostics, DiagnosticsError> {
    let l10n = Localization::for_locale(&options.locale)?;
    let output = OutputUnit::from_value(output_json)?;
    explain(instance, &output, schema_id, compiler, options, &l10n)
}

/// Full pipeline with an already-parsed output and a caller-supplied catalog.
pub fn explain(
    instance: &Value,
    output: &OutputUnit,
    schema_id: &str,
    compiler: &dyn SchemaCompiler,
    options: &Options,
    l10n: &Localization,
) -> Result<Diagnostics, DiagnosticsError> {
    let index = ErrorIndex::build(output, schema_id, compiler)?;
    let ast = compiler.compile(schema_id)?;
    let normalized = Evaluator::new(&ast, &index).with_max_depth(options.max_depth).evaluate(instance);
    let errors = DiagnosticBuilder::new(&ast, instance, l10n).build(&normalized);
    Ok(Diagnostics { errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn options_fill_defaults() {
        let options: Options = serde_json::from_value(json!({"maxDepth": 8})).unwrap();
        assert_eq!(options.locale, "en-US");
        assert_eq!(options.max_depth, 8);
    }

    #[test]
    fn unknown_locale_is_rejected() {
        let registry = SchemaRegistry::new();
        let options = Options { locale: "xx".into(), ..Options::default() };
        let result = produce_diagnostics(&json!(1), &json!({"valid": false}), "s", &registry, &options);
        assert!(matches!(result, Err(DiagnosticsError::Localization(_))));
    }
}
