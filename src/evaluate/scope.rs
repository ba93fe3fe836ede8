use std::collections::BTreeSet;

use indexmap::IndexSet;
use tracing::debug;

use super::{Applied, Evaluator};
use crate::instance::JsonNode;

/// Property names and item indices evaluated at one instance location.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Claims {
    pub properties: IndexSet<String>,
    pub items: BTreeSet<usize>,
}

impl Claims {
    pub fn extend(&mut self, other: Claims) {
        self.properties.extend(other.properties);
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.properties.len() + self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.items.is_empty()
    }
}

/// The (schema, instance) pair a shadow pass was started for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShadowRoot {
    pub schema: String,
    pub instance: String,
}

// ----------------------------- Shadow pass -------------------------------- //

impl Evaluator<'_> {
    /// Everything the schema at `parent` claims for `node`, not counting the
    /// `unevaluated*` keyword that asked. `None` when this already is that pass.
    fn shadow_claims(
        &mut self,
        parent: &str,
        node: &JsonNode<'_>,
        shadow: Option<&ShadowRoot>,
        depth: usize,
    ) -> Option<Claims> {
        let root = ShadowRoot { schema: parent.to_string(), instance: node.location.clone() };
        if shadow == Some(&root) {
            return None;
        }
        debug!(schema = parent, instance = %node.location, "shadow pass started");
        let frame = self.evaluate_schema(parent, node, Some(&root), depth);
        debug!(
            schema = parent,
            instance = %node.location,
            claimed = frame.claims.len(),
            "shadow pass finished"
        );
        Some(frame.claims)
    }

    pub(super) fn unevaluated_properties(
        &mut self,
        parent: &str,
        schema: &str,
        node: &JsonNode<'_>,
        shadow: Option<&ShadowRoot>,
        depth: usize,
    ) -> Option<Applied> {
        let claimed = self.shadow_claims(parent, node, shadow, depth)?;
        let mut applied = Applied::none();
        for (name, child) in node.entries() {
            if claimed.properties.contains(name) {
                continue;
            }
            let frame = self.evaluate_schema(schema, &child, shadow, depth);
            applied.child(frame);
            applied.claims.properties.insert(name.to_string());
        }
        Some(applied)
    }

    pub(super) fn unevaluated_items(
        &mut self,
        parent: &str,
        schema: &str,
        node: &JsonNode<'_>,
        shadow: Option<&ShadowRoot>,
        depth: usize,
    ) -> Option<Applied> {
        let claimed = self.shadow_claims(parent, node, shadow, depth)?;
        let mut applied = Applied::none();
        for (index, item) in node.items().into_iter().enumerate() {
            if claimed.items.contains(&index) {
                continue;
            }
            let frame = self.evaluate_schema(schema, &item, shadow, depth);
            applied.child(frame);
            applied.claims.items.insert(index);
        }
        Some(applied)
    }
}
