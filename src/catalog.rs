//! Registry of concrete implementations for abstract object types.
use indexmap::IndexMap;

use crate::descriptor::{
    DerivedType, Describe, PolymorphismOptions, TypeDescriptor, TypeKey, TypeKind, TypeRef,
};

#[derive(Debug, Clone)]
pub struct DerivedTypeCatalog {
    discriminator_name: String,
    implementations: IndexMap<TypeKey, Vec<DerivedType>>,
}

impl DerivedTypeCatalog {
    pub fn new(discriminator_name: impl Into<String>) -> Self {
        Self { discriminator_name: discriminator_name.into(), implementations: IndexMap::new() }
    }

    pub fn discriminator_name(&self) -> &str {
        &self.discriminator_name
    }

    /// Register `C` as an implementation of `A`, tagged with `C`'s simple name.
    pub fn register<A: Describe, C: Describe>(&mut self) -> &mut Self {
        let concrete = C::describe().key;
        let value = concrete.simple_name().to_string();
        self.insert(A::describe().key, DerivedType { key: concrete, ty: TypeRef::of::<C>(), discriminator: Some(value) })
    }

    /// Register an implementation under an explicit discriminator value.
    pub fn register_as(&mut self, abstract_key: TypeKey, ty: TypeRef, value: impl Into<String>) -> &mut Self {
        let key = match &ty {
            TypeRef::Inline(descriptor) => descriptor.key.clone(),
            TypeRef::Deferred(describe) => describe().key,
            TypeRef::Named { key, .. } => key.clone(),
        };
        self.insert(abstract_key, DerivedType { key, ty, discriminator: Some(value.into()) })
    }

    pub fn implementations_of(&self, key: &TypeKey) -> impl Iterator<Item = &DerivedType> {
        self.implementations.get(key).into_iter().flatten()
    }

    /// Attach registered variants to an abstract object that declares none.
    pub fn apply(&self, descriptor: &mut TypeDescriptor) {
        let TypeKind::Object(object) = &mut descriptor.kind else {
            return;
        };
        if !object.is_abstract || object.polymorphism.is_some() {
            return;
        }
        let Some(variants) = self.implementations.get(&descriptor.key) else {
            tracing::debug!(ty = %descriptor.key, "abstract type has no registered implementations");
            return;
        };
        object.polymorphism = Some(PolymorphismOptions {
            discriminator_name: self.discriminator_name.clone(),
            variants: variants.clone(),
        });
    }

    fn insert(&mut self, abstract_key: TypeKey, derived: DerivedType) -> &mut Self {
        let variants = self.implementations.entry(abstract_key).or_default();
        if variants.iter().any(|v| v.key == derived.key) {
            tracing::trace!(ty = %derived.key, "implementation already registered");
        } else {
            variants.push(derived);
        }
        self
    }
}
