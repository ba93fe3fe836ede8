//! Per-location, per-keyword evaluation results.
//!
//! Serialized as `instanceLocation → keywordURI → keywordLocation → bool | [branch…]`.
use indexmap::IndexMap;
use serde::Serialize;

use crate::keyword::KeywordKind;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedOutput(pub IndexMap<String, InstanceOutput>);

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct InstanceOutput(pub IndexMap<KeywordKind, IndexMap<String, KeywordOutput>>);

/// Leaf keywords record a bool; branching applicators keep one output per branch.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KeywordOutput {
    Valid(bool),
    Branches(Vec<NormalizedOutput>),
}

impl KeywordOutput {
    pub fn is_valid(&self) -> bool {
        matches!(self, KeywordOutput::Valid(true))
    }
}

impl NormalizedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, instance_location: &str) -> Option<&InstanceOutput> {
        self.0.get(instance_location)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InstanceOutput)> {
        self.0.iter().map(|(location, output)| (location.as_str(), output))
    }

    /// Record one keyword result. A recorded failure is never overwritten by a pass.
    pub fn record(
        &mut self,
        instance_location: &str,
        kind: KeywordKind,
        keyword_location: &str,
        output: KeywordOutput,
    ) {
        let slot = self
            .0
            .entry(instance_location.to_string())
            .or_default()
            .0
            .entry(kind)
            .or_default();
        match slot.get(keyword_location) {
            Some(existing) if !existing.is_valid() && output.is_valid() => {}
            _ => {
                slot.insert(keyword_location.to_string(), output);
            }
        }
    }

    /// Ensure an (empty) entry exists for a location.
    pub fn touch(&mut self, instance_location: &str) {
        self.0.entry(instance_location.to_string()).or_default();
    }

    /// Additive union; the result's keys are a superset of both inputs.
    pub fn merge(&mut self, other: NormalizedOutput) {
        for (instance_location, instance_output) in other.0 {
            self.touch(&instance_location);
            for (kind, keywords) in instance_output.0 {
                for (keyword_location, output) in keywords {
                    self.record(&instance_location, kind, &keyword_location, output);
                }
            }
        }
    }
}

impl InstanceOutput {
    pub fn get(&self, kind: KeywordKind) -> Option<&IndexMap<String, KeywordOutput>> {
        self.0.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = KeywordKind> + '_ {
        self.0.keys().copied()
    }

    /// Keyword locations of `kind` that did not pass.
    pub fn failed(&self, kind: KeywordKind) -> Vec<(&str, &KeywordOutput)> {
        self.get(kind)
            .map(|keywords| {
                keywords
                    .iter()
                    .filter(|(_, output)| !output.is_valid())
                    .map(|(location, output)| (location.as_str(), output))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every recorded keyword passed.
    pub fn all_valid(&self) -> bool {
        self.0.values().flat_map(IndexMap::values).all(KeywordOutput::is_valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failures_survive_later_passes() {
        let mut output = NormalizedOutput::new();
        output.record("#", KeywordKind::Type, "s#/type", KeywordOutput::Valid(false));
        output.record("#", KeywordKind::Type, "s#/type", KeywordOutput::Valid(true));
        assert_eq!(output.get("#").unwrap().failed(KeywordKind::Type).len(), 1);

        output.record("#", KeywordKind::MinLength, "s#/minLength", KeywordOutput::Valid(true));
        output.record("#", KeywordKind::MinLength, "s#/minLength", KeywordOutput::Valid(false));
        assert_eq!(output.get("#").unwrap().failed(KeywordKind::MinLength).len(), 1);
    }

    #[test]
    fn merge_is_additive() {
        let mut left = NormalizedOutput::new();
        left.record("#", KeywordKind::Type, "s#/type", KeywordOutput::Valid(true));
        let mut right = NormalizedOutput::new();
        right.record("#/a", KeywordKind::Minimum, "s#/properties/a/minimum", KeywordOutput::Valid(false));
        right.touch("#/b");
        left.merge(right);
        let locations: Vec<_> = left.iter().map(|(location, _)| location).collect();
        assert_eq!(locations, vec!["#", "#/a", "#/b"]);
    }

    #[test]
    fn serializes_with_keyword_uris() {
        let mut output = NormalizedOutput::new();
        output.record("#", KeywordKind::Validation, "s#", KeywordOutput::Valid(false));
        let mut branch = NormalizedOutput::new();
        branch.record("#", KeywordKind::Type, "s#/anyOf/0/type", KeywordOutput::Valid(true));
        output.record("#", KeywordKind::AnyOf, "s#/anyOf", KeywordOutput::Branches(vec![branch]));
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({
                "#": {
                    "https://json-schema.org/validation": {"s#": false},
                    "https://json-schema.org/keyword/anyOf": {
                        "s#/anyOf": [{"#": {"https://json-schema.org/keyword/type": {"s#/anyOf/0/type": true}}}]
                    }
                }
            })
        );
    }
}
