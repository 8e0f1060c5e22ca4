//! Per-build table of hoistable object definitions.
//!
//! Definitions live in an arena of slots keyed by type identity. A slot is
//! registered before its body is built, so a self-referential property finds
//! the in-progress definition and yields a `Ref` instead of recursing. The body
//! is written once the properties are done.
//!
//! Reference counts and the root flag use `Cell` so the serializer can collapse
//! single-use references while walking bodies it borrows from the same table.
//! That also keeps a collection `!Sync`: one build, one thread.
use std::cell::Cell;
use std::collections::HashSet;

use indexmap::IndexMap;

use crate::descriptor::TypeKey;
use crate::error::{Result, SchemaError};
use crate::node::{NodeKind, ObjectNode, SchemaNode};

/// Stable handle of a definition within one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId(usize);

impl DefId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct Definition {
    pub key: TypeKey,
    /// Entry name under `$defs`.
    pub name: String,
    /// Always an object node.
    pub schema: SchemaNode,
    ref_count: Cell<usize>,
    is_root: Cell<bool>,
}

impl Definition {
    pub fn ref_count(&self) -> usize {
        self.ref_count.get()
    }

    pub fn is_root(&self) -> bool {
        self.is_root.get()
    }

    pub(crate) fn reset(&self) {
        self.ref_count.set(0);
        self.is_root.set(false);
    }

    pub(crate) fn increment(&self) {
        self.ref_count.set(self.ref_count.get() + 1);
    }

    pub(crate) fn decrement(&self) {
        self.ref_count.set(self.ref_count.get().saturating_sub(1));
    }

    pub(crate) fn mark_root(&self) {
        self.is_root.set(true);
    }

    /// Eligible for the shared-definitions section.
    pub fn is_shared(&self) -> bool {
        self.ref_count() > 1 && !self.is_root()
    }

    pub fn object(&self) -> Option<&ObjectNode> {
        match &self.schema.kind {
            NodeKind::Object(object) => Some(object),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DefinitionCollection {
    slots: IndexMap<TypeKey, Definition>,
    names: HashSet<String>,
}

impl DefinitionCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn try_get_ref(&self, key: &TypeKey) -> Option<DefId> {
        self.slots.get_index_of(key).map(DefId)
    }

    /// Register a definition for `key`. Fails if one already exists.
    pub fn create_ref(&mut self, key: TypeKey, schema: SchemaNode) -> Result<DefId> {
        if self.slots.contains_key(&key) {
            return Err(SchemaError::DuplicateDefinition(key));
        }
        let name = self.unique_name(key.simple_name());
        tracing::trace!(ty = %key, %name, "definition registered");
        let (index, _) = self.slots.insert_full(
            key.clone(),
            Definition { key, name, schema, ref_count: Cell::new(0), is_root: Cell::new(false) },
        );
        Ok(DefId(index))
    }

    /// Write the finished body of a registered definition.
    pub fn fill(&mut self, id: DefId, object: ObjectNode) -> Result<()> {
        let definition = self.get_mut(id)?;
        definition.schema.kind = NodeKind::Object(object);
        Ok(())
    }

    pub fn get(&self, id: DefId) -> Result<&Definition> {
        self.slots
            .get_index(id.0)
            .map(|(_, d)| d)
            .ok_or(SchemaError::Structural { index: id.0 })
    }

    pub fn get_mut(&mut self, id: DefId) -> Result<&mut Definition> {
        self.slots
            .get_index_mut(id.0)
            .map(|(_, d)| d)
            .ok_or(SchemaError::Structural { index: id.0 })
    }

    /// Definitions in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (DefId, &Definition)> {
        self.slots.values().enumerate().map(|(i, d)| (DefId(i), d))
    }

    pub(crate) fn reset_counts(&self) {
        for definition in self.slots.values() {
            definition.reset();
        }
    }

    fn unique_name(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut suffix = 2;
        while !self.names.insert(name.clone()) {
            name = format!("{base}{suffix}");
            suffix += 1;
        }
        name
    }
}
