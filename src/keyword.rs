//! The closed keyword table: recursion behavior and type applicability per keyword.
use std::fmt;

use serde::{Serialize, Serializer};

use crate::instance::JsonType;

pub const KEYWORD_URI_PREFIX: &str = "https://json-schema.org/keyword/";
pub const VALIDATION_URI: &str = "https://json-schema.org/validation";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeywordKind {
    // applicators
    AllOf,
    AnyOf,
    OneOf,
    Not,
    Ref,
    If,
    Then,
    Else,
    Properties,
    PatternProperties,
    AdditionalProperties,
    PropertyNames,
    DependentSchemas,
    PrefixItems,
    Items,
    Contains,
    UnevaluatedProperties,
    UnevaluatedItems,
    // assertions
    Type,
    Enum,
    Const,
    MinLength,
    MaxLength,
    Pattern,
    Format,
    Minimum,
    Maximum,
    ExclusiveMinimum,
    ExclusiveMaximum,
    MultipleOf,
    MinItems,
    MaxItems,
    UniqueItems,
    MinContains,
    MaxContains,
    MinProperties,
    MaxProperties,
    Required,
    DependentRequired,
    /// Pseudo-keyword recorded for boolean schemas.
    Validation,
}

use KeywordKind::*;

impl KeywordKind {
    pub const ALL: [KeywordKind; 40] = [
        AllOf, AnyOf, OneOf, Not, Ref, If, Then, Else, Properties, PatternProperties,
        AdditionalProperties, PropertyNames, DependentSchemas, PrefixItems, Items, Contains,
        UnevaluatedProperties, UnevaluatedItems, Type, Enum, Const, MinLength, MaxLength, Pattern,
        Format, Minimum, Maximum, ExclusiveMinimum, ExclusiveMaximum, MultipleOf, MinItems,
        MaxItems, UniqueItems, MinContains, MaxContains, MinProperties, MaxProperties, Required,
        DependentRequired, Validation,
    ];

    /// Look up a schema keyword by its name as written in a schema object.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| *kind != Validation && kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            AllOf => "allOf",
            AnyOf => "anyOf",
            OneOf => "oneOf",
            Not => "not",
            Ref => "$ref",
            If => "if",
            Then => "then",
            Else => "else",
            Properties => "properties",
            PatternProperties => "patternProperties",
            AdditionalProperties => "additionalProperties",
            PropertyNames => "propertyNames",
            DependentSchemas => "dependentSchemas",
            PrefixItems => "prefixItems",
            Items => "items",
            Contains => "contains",
            UnevaluatedProperties => "unevaluatedProperties",
            UnevaluatedItems => "unevaluatedItems",
            Type => "type",
            Enum => "enum",
            Const => "const",
            MinLength => "minLength",
            MaxLength => "maxLength",
            Pattern => "pattern",
            Format => "format",
            Minimum => "minimum",
            Maximum => "maximum",
            ExclusiveMinimum => "exclusiveMinimum",
            ExclusiveMaximum => "exclusiveMaximum",
            MultipleOf => "multipleOf",
            MinItems => "minItems",
            MaxItems => "maxItems",
            UniqueItems => "uniqueItems",
            MinContains => "minContains",
            MaxContains => "maxContains",
            MinProperties => "minProperties",
            MaxProperties => "maxProperties",
            Required => "required",
            DependentRequired => "dependentRequired",
            Validation => "validation",
        }
    }

    pub fn uri(self) -> String {
        match self {
            Validation => VALIDATION_URI.to_string(),
            Ref => format!("{KEYWORD_URI_PREFIX}ref"),
            other => format!("{KEYWORD_URI_PREFIX}{}", other.name()),
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        if uri == VALIDATION_URI {
            return Some(Validation);
        }
        match uri.strip_prefix(KEYWORD_URI_PREFIX)? {
            "ref" => Some(Ref),
            name => Self::from_name(name),
        }
    }

    /// Children's outputs merge into the parent's instance output.
    pub fn simple_applicator(self) -> bool {
        matches!(
            self,
            AllOf | Properties | PatternProperties | AdditionalProperties | Items | PrefixItems
                | PropertyNames | DependentSchemas | Ref | Then | Else | UnevaluatedProperties
                | UnevaluatedItems
        )
    }

    /// Branch outputs are kept as a nested list.
    pub fn branching_applicator(self) -> bool {
        matches!(self, AnyOf | OneOf | Not | Contains)
    }

    /// Whether the keyword records a result at all for an instance of `ty`.
    ///
    /// `if` only selects `then`/`else`, so it never records.
    pub fn applies_to(self, ty: JsonType) -> bool {
        match self {
            If => false,
            MinLength | MaxLength | Pattern => ty == JsonType::String,
            Minimum | Maximum | ExclusiveMinimum | ExclusiveMaximum | MultipleOf => {
                ty == JsonType::Number
            }
            MinItems | MaxItems | UniqueItems | MinContains | MaxContains | Contains => {
                ty == JsonType::Array
            }
            MinProperties | MaxProperties | Required | DependentRequired => ty == JsonType::Object,
            _ => true,
        }
    }
}

impl fmt::Display for KeywordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

impl Serialize for KeywordKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_uris() {
        for kind in KeywordKind::ALL {
            assert_eq!(KeywordKind::from_uri(&kind.uri()), Some(kind));
        }
        assert_eq!(KeywordKind::from_name("$ref"), Some(Ref));
        assert_eq!(Ref.uri(), "https://json-schema.org/keyword/ref");
        assert_eq!(KeywordKind::from_name("validation"), None);
        assert_eq!(KeywordKind::from_name("title"), None);
    }

    #[test]
    fn applicator_flags_are_disjoint() {
        for kind in KeywordKind::ALL {
            assert!(!(kind.simple_applicator() && kind.branching_applicator()), "{kind:?}");
        }
    }

    #[test]
    fn leaf_keywords_are_type_gated() {
        assert!(MinLength.applies_to(JsonType::String));
        assert!(!MinLength.applies_to(JsonType::Number));
        assert!(Maximum.applies_to(JsonType::Number));
        assert!(!Required.applies_to(JsonType::Array));
        assert!(Type.applies_to(JsonType::Null));
        assert!(Enum.applies_to(JsonType::Object));
        assert!(!If.applies_to(JsonType::Object));
    }
}
