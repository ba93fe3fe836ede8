//! Flat failure index built from validator output.
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::debug;

use crate::compiler::SchemaCompiler;
use crate::error::FormatError;
use crate::instance;
use crate::output::OutputUnit;
use crate::pointer;

/// absolute keyword location → instance locations where it failed.
///
/// Absence means "passed or not evaluated".
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorIndex {
    failures: IndexMap<String, IndexSet<String>>,
}

impl ErrorIndex {
    pub fn build(
        output: &OutputUnit,
        schema_id: &str,
        compiler: &dyn SchemaCompiler,
    ) -> Result<Self, FormatError> {
        if output.valid != Some(false) {
            return Err(FormatError::RootNotInvalid);
        }
        if output.errors.is_empty() {
            return Err(FormatError::EmptyErrors);
        }
        let mut builder = Builder { index: ErrorIndex::default(), schema_id, compiler };
        for (position, unit) in output.errors.iter().enumerate() {
            builder.visit(unit, format!("errors[{position}]"))?;
        }
        debug!(
            keywords = builder.index.failures.len(),
            failures = builder.index.len(),
            "built error index"
        );
        Ok(builder.index)
    }

    pub fn insert(&mut self, keyword_location: &str, instance_location: &str) {
        self.failures
            .entry(pointer::canonical_location(keyword_location))
            .or_default()
            .insert(instance::normalize_location(instance_location));
    }

    /// A property-name location (`#*/a`) also matches a failure reported at `#/a`.
    pub fn is_failed(&self, keyword_location: &str, instance_location: &str) -> bool {
        let Some(instances) = self.failures.get(keyword_location) else {
            return false;
        };
        if instances.contains(instance_location) {
            return true;
        }
        instance::value_location_of(instance_location)
            .is_some_and(|plain| instances.contains(&plain))
    }

    /// Number of (keyword, instance) failures.
    pub fn len(&self) -> usize {
        self.failures.values().map(IndexSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.failures.iter().flat_map(|(keyword, instances)| {
            instances.iter().map(move |instance| (keyword.as_str(), instance.as_str()))
        })
    }
}

struct Builder<'a> {
    index: ErrorIndex,
    schema_id: &'a str,
    compiler: &'a dyn SchemaCompiler,
}

impl Builder<'_> {
    fn visit(&mut self, unit: &OutputUnit, path: String) -> Result<(), FormatError> {
        if unit.is_valid() {
            return Ok(());
        }
        let instance_location = unit
            .instance_location
            .as_deref()
            .ok_or_else(|| FormatError::MissingInstanceLocation { path: path.clone() })?;
        let keyword_location = match (&unit.absolute_keyword_location, &unit.keyword_location) {
            (Some(absolute), _) => absolute.clone(),
            (None, Some(relative)) => self
                .compiler
                .resolve_absolute(self.schema_id, relative)
                .map_err(|err| FormatError::UnresolvableKeywordLocation {
                    keyword_location: relative.clone(),
                    reason: err.to_string(),
                })?,
            (None, None) => return Err(FormatError::MissingKeywordLocation { path }),
        };
        self.index.insert(&keyword_location, instance_location);
        for (position, child) in unit.errors.iter().enumerate() {
            self.visit(child, format!("{path}.errors[{position}]"))?;
        }
        Ok(())
    }
}
