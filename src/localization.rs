//! Message catalogs and template rendering.
//!
//! Templates use `{name}` placeholders. A missing message renders a
//! placeholder string instead of failing the diagnostic pass.
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;

use crate::error::LocalizationError;

pub const DEFAULT_LOCALE: &str = "en-US";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([A-Za-z][A-Za-z0-9_]*)\}").unwrap());

static EN_US: Lazy<IndexMap<&'static str, &'static str>> = Lazy::new(|| {
    IndexMap::from([
        ("type-error", "The instance should be of type {expected} but found {actual}."),
        ("any-of-error", "The instance should be of type {types} or one of {values} but found {actual}."),
        ("number-error", "The instance should be {constraints}."),
        ("number-error-minimum", "greater than or equal to {minimum}"),
        ("number-error-exclusive-minimum", "greater than {minimum}"),
        ("number-error-maximum", "less than or equal to {maximum}"),
        ("number-error-exclusive-maximum", "less than {maximum}"),
        ("string-error", "The instance should be {constraints}."),
        ("string-error-minLength", "at least {minLength} characters long"),
        ("string-error-maxLength", "at most {maxLength} characters long"),
        ("pattern-error", "The instance should match the pattern: {pattern}."),
        ("format-error", "The instance should match the format: {format}."),
        ("multiple-of-error", "The instance should be a multiple of {divisor}."),
        ("const-error", "The instance should be equal to {expectedValue}."),
        ("enum-error-fallback", "Unexpected value {instanceValue}. Expected one of: {allowedValues}."),
        ("enum-error-suggestion", "Unexpected value {instanceValue}. Did you mean {suggestion}?"),
        ("required-error", "\"{instanceLocation}\" is missing required property(s): {missingProperties}."),
        ("properties-error", "The instance should have {constraints}."),
        ("properties-error-min", "minimum {minProperties} properties"),
        ("properties-error-max", "maximum {maxProperties} properties"),
        ("array-error", "The instance should have {constraints}."),
        ("array-error-min", "at least {minItems} items"),
        ("array-error-max", "at most {maxItems} items"),
        ("unique-items-error", "The array should not contain duplicate items."),
        ("contains-error-min", "The array should contain at least {minContains} item(s) matching the contains schema."),
        ("contains-error-min-max", "The array should contain at least {minContains} and at most {maxContains} items matching the contains schema."),
        ("not-error", "The instance is not allowed to be used in this schema."),
        ("additional-properties-error", "The property \"{propertyName}\" is not allowed."),
        ("additional-items-error", "The item at index {index} is not allowed."),
        ("false-schema-error", "The instance is not allowed by this schema."),
        ("one-of-multiple-error", "The instance should match exactly one alternative but matched {matched}."),
        ("list-and", "and"),
        ("list-or", "or"),
    ])
});

#[derive(Clone, Debug)]
pub struct Localization {
    locale: String,
    messages: IndexMap<String, String>,
}

impl Default for Localization {
    fn default() -> Self {
        Localization {
            locale: DEFAULT_LOCALE.to_string(),
            messages: builtin_messages(),
        }
    }
}

fn builtin_messages() -> IndexMap<String, String> {
    EN_US.iter().map(|(id, template)| (id.to_string(), template.to_string())).collect()
}

impl Localization {
    /// Built-in catalog for `locale`. Only English ships with the crate.
    pub fn for_locale(locale: &str) -> Result<Self, LocalizationError> {
        match locale {
            "en-US" | "en" => Ok(Localization { locale: locale.to_string(), ..Localization::default() }),
            other => Err(LocalizationError::UnknownLocale { locale: other.to_string() }),
        }
    }

    /// A catalog made entirely of caller-supplied templates.
    pub fn from_catalog(locale: &str, messages: IndexMap<String, String>) -> Self {
        Localization { locale: locale.to_string(), messages }
    }

    /// Override or extend individual templates.
    pub fn with_messages(mut self, messages: IndexMap<String, String>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    pub fn try_message(&self, id: &str, args: &[(&str, String)]) -> Result<String, LocalizationError> {
        let template = self.messages.get(id).ok_or_else(|| LocalizationError::MissingMessage {
            locale: self.locale.clone(),
            id: id.to_string(),
        })?;
        let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            args.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| caps[0].to_string())
        });
        Ok(rendered.into_owned())
    }

    pub fn message(&self, id: &str, args: &[(&str, String)]) -> String {
        self.try_message(id, args).unwrap_or_else(|err| {
            warn!(locale = %self.locale, id, "missing localization message");
            err.to_string()
        })
    }

    /// `a`, `a and b`, `a, b, and c`.
    pub fn conjunction(&self, items: &[String]) -> String {
        self.join(items, "list-and")
    }

    /// `a`, `a or b`, `a, b, or c`.
    pub fn disjunction(&self, items: &[String]) -> String {
        self.join(items, "list-or")
    }

    fn join(&self, items: &[String], joiner_id: &str) -> String {
        let joiner = self.message(joiner_id, &[]);
        match items {
            [] => String::new(),
            [only] => only.clone(),
            [first, second] => format!("{first} {joiner} {second}"),
            [init @ .., last] => format!("{}, {joiner} {last}", init.join(", ")),
        }
    }
}
