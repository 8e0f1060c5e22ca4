//! Reference counting over a finished node tree.
//!
//! Each definition body is walked once, no matter how often it is referenced,
//! so the pass terminates on cyclic graphs. The walk uses an explicit stack;
//! deeply nested descriptor trees do not grow the call stack.
use std::collections::HashSet;

use crate::definitions::{DefId, DefinitionCollection};
use crate::error::Result;
use crate::node::{NodeKind, SchemaNode};

/// Reset every count, then count each `Ref` reachable from `root`.
pub fn count_references(root: &SchemaNode, definitions: &DefinitionCollection) -> Result<()> {
    definitions.reset_counts();

    let mut visited: HashSet<DefId> = HashSet::new();
    let mut stack: Vec<&SchemaNode> = vec![root];

    while let Some(node) = stack.pop() {
        match &node.kind {
            NodeKind::Ref(id) => {
                let definition = definitions.get(*id)?;
                definition.increment();
                if visited.insert(*id) {
                    stack.push(&definition.schema);
                }
            }
            NodeKind::Object(object) => stack.extend(object.properties.values().rev()),
            NodeKind::Array { items, .. } => stack.push(items),
            NodeKind::AnyOf(alternatives) => stack.extend(alternatives.iter().rev()),
            NodeKind::Any
            | NodeKind::Value { .. }
            | NodeKind::Format { .. }
            | NodeKind::Enum { .. }
            | NodeKind::Const { .. } => {}
        }
    }

    tracing::debug!(definitions = definitions.len(), visited = visited.len(), "references counted");
    Ok(())
}
