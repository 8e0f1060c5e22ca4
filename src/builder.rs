//! Type descriptor → schema node tree.
//!
//! Objects are hoisted into the build's [`DefinitionCollection`] and referred
//! to by `Ref`; whether a definition ends up shared or inlined is decided
//! later by the reference-count pass. Every method on [`SchemaBuilder`] has a
//! default body, so a custom builder overrides only the step it cares about.
use serde_json::Value;

use crate::catalog::DerivedTypeCatalog;
use crate::definitions::{DefId, DefinitionCollection};
use crate::descriptor::{
    ArrayDescriptor, Discriminator, ObjectDescriptor, PropertyDescriptor, Scalar, TypeDescriptor,
    TypeKind, TypeProvider, TypeRef, ValueDescriptor,
};
use crate::error::{Result, SchemaError};
use crate::node::{ObjectNode, PropertySchema, SchemaNode, TypeTag};
use crate::options::SchemaOptions;

// ————————————————————————————————————————————————————————————————————————————
// CONTEXT
// ————————————————————————————————————————————————————————————————————————————

/// State of one generation call. Never shared between calls.
pub struct BuildContext<'a> {
    pub definitions: DefinitionCollection,
    pub options: &'a SchemaOptions,
    provider: Option<&'a dyn TypeProvider>,
    catalog: Option<&'a DerivedTypeCatalog>,
}

impl<'a> BuildContext<'a> {
    pub fn new(options: &'a SchemaOptions) -> Self {
        Self { definitions: DefinitionCollection::new(), options, provider: None, catalog: None }
    }

    pub fn with_provider(mut self, provider: &'a dyn TypeProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_catalog(mut self, catalog: &'a DerivedTypeCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Resolve a type reference and let the catalog fill in abstract variants.
    pub fn resolve(&self, ty: &TypeRef) -> Result<TypeDescriptor> {
        let mut descriptor = ty.resolve(self.provider)?;
        if let Some(catalog) = self.catalog {
            catalog.apply(&mut descriptor);
        }
        Ok(descriptor)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDER
// ————————————————————————————————————————————————————————————————————————————

pub trait SchemaBuilder {
    fn build_schema(&self, ty: &TypeDescriptor, ctx: &mut BuildContext<'_>) -> Result<SchemaNode> {
        match &ty.kind {
            TypeKind::Object(object) => self.build_object_schema(ty, object, ctx),
            TypeKind::Array(array) => self.build_array_schema(ty, array, ctx),
            TypeKind::Value(value) => self.build_value_schema(ty, value, ctx),
        }
    }

    // ---- objects ----

    /// Polymorphic objects become `anyOf` over their variants; everything else
    /// a `Ref` to the type's definition.
    fn build_object_schema(
        &self,
        ty: &TypeDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut BuildContext<'_>,
    ) -> Result<SchemaNode> {
        let Some(polymorphism) = &object.polymorphism else {
            return self.build_object_reference(ty, ctx);
        };
        let mut alternatives = Vec::with_capacity(polymorphism.variants.len() + 1);
        for variant in &polymorphism.variants {
            let mut concrete = ctx.resolve(&variant.ty)?;
            if let (TypeKind::Object(concrete_object), Some(value)) = (&mut concrete.kind, &variant.discriminator) {
                concrete_object.discriminator = Some(Discriminator {
                    name: polymorphism.discriminator_name.clone(),
                    value: Value::String(value.clone()),
                });
            }
            alternatives.push(self.build_schema(&concrete, ctx)?);
        }
        if ty.nullable {
            alternatives.push(SchemaNode::null());
        }
        Ok(SchemaNode::any_of(alternatives).with_description(ty.description.clone()))
    }

    /// `Ref` to the definition for `ty`, creating it on first encounter.
    fn build_object_reference(&self, ty: &TypeDescriptor, ctx: &mut BuildContext<'_>) -> Result<SchemaNode> {
        let id = match ctx.definitions.try_get_ref(&ty.key) {
            Some(id) => id,
            None => self.build_object_definition(ty, ctx)?,
        };
        let reference = SchemaNode::reference(id);
        if ty.nullable {
            return Ok(SchemaNode::any_of(vec![reference, SchemaNode::null()]));
        }
        Ok(reference)
    }

    /// Register first, then fill: properties that loop back to `ty` find the
    /// slot and stop there.
    fn build_object_definition(&self, ty: &TypeDescriptor, ctx: &mut BuildContext<'_>) -> Result<DefId> {
        let placeholder = SchemaNode::object(ObjectNode::closed()).with_description(ty.description.clone());
        let id = ctx.definitions.create_ref(ty.key.clone(), placeholder)?;

        let mut body = ObjectNode::closed();
        if let TypeKind::Object(object) = &ty.kind {
            if let Some(discriminator) = &object.discriminator {
                body.add_property(self.build_discriminator_schema(discriminator, ctx));
            }
            for property in &object.properties {
                body.add_property(self.build_property_schema(property, ctx)?);
            }
        }
        ctx.definitions.fill(id, body)?;
        Ok(id)
    }

    fn build_discriminator_schema(&self, discriminator: &Discriminator, ctx: &mut BuildContext<'_>) -> PropertySchema {
        let value = match &discriminator.value {
            Value::String(s) => Value::String(ctx.options.naming.apply(s)),
            other => other.clone(),
        };
        PropertySchema {
            name: discriminator.name.clone(),
            node: SchemaNode::constant(literal_tag(&value), value),
            required: true,
        }
    }

    fn build_property_schema(&self, property: &PropertyDescriptor, ctx: &mut BuildContext<'_>) -> Result<PropertySchema> {
        let ty = ctx.resolve(&property.ty)?;
        let node = self.build_schema(&ty, ctx)?.with_description(property.description.clone());
        let required = ctx.options.required.is_required(property, &ty);
        Ok(PropertySchema { name: ctx.options.naming.apply(&property.name), node, required })
    }

    // ---- arrays ----

    fn build_array_schema(
        &self,
        ty: &TypeDescriptor,
        array: &ArrayDescriptor,
        ctx: &mut BuildContext<'_>,
    ) -> Result<SchemaNode> {
        let element = ctx.resolve(&array.element)?;
        let items = self.build_schema(&element, ctx)?;
        Ok(SchemaNode::array(items, ty.nullable).with_description(ty.description.clone()))
    }

    // ---- values ----

    fn build_value_schema(
        &self,
        ty: &TypeDescriptor,
        value: &ValueDescriptor,
        ctx: &mut BuildContext<'_>,
    ) -> Result<SchemaNode> {
        let node = self.build_value_node(ty, &value.scalar, ctx)?;
        let Some(literal) = &value.literal else {
            return Ok(node);
        };
        let tag = node.type_tag().unwrap_or_else(|| literal_tag(literal));
        Ok(SchemaNode::constant(tag, literal.clone()).with_description(ty.description.clone()))
    }

    fn build_value_node(&self, ty: &TypeDescriptor, scalar: &Scalar, ctx: &mut BuildContext<'_>) -> Result<SchemaNode> {
        let nullable = ty.nullable;
        let node = match scalar {
            Scalar::String | Scalar::Char => SchemaNode::value(TypeTag::String, nullable),
            Scalar::Integer => SchemaNode::value(TypeTag::Integer, nullable),
            Scalar::Number => SchemaNode::value(TypeTag::Number, nullable),
            Scalar::Boolean => SchemaNode::value(TypeTag::Boolean, nullable),
            Scalar::DateTime => formatted("date-time", nullable, ctx),
            Scalar::Date => formatted("date", nullable, ctx),
            Scalar::Time => formatted("time", nullable, ctx),
            Scalar::Uuid => formatted("uuid", nullable, ctx),
            Scalar::Enum(members) => {
                let values = members
                    .iter()
                    .map(|m| Value::String(ctx.options.naming.apply(m)))
                    .collect();
                SchemaNode::enumeration(TypeTag::String, values, nullable)
            }
            Scalar::Json => SchemaNode::any(),
            Scalar::Custom { string_like: true, .. } => SchemaNode::value(TypeTag::String, nullable),
            Scalar::Custom { name, string_like: false } => {
                return Err(SchemaError::Mapping { type_name: name.clone() });
            }
        };
        Ok(node.with_description(ty.description.clone()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSchemaBuilder;

impl SchemaBuilder for DefaultSchemaBuilder {}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// `format` when the dialect has it, otherwise a plain string that names the
/// format in its description.
fn formatted(format: &str, nullable: bool, ctx: &BuildContext<'_>) -> SchemaNode {
    if ctx.options.format_supported {
        SchemaNode::format(TypeTag::String, format, nullable)
    } else {
        SchemaNode::value(TypeTag::String, nullable).with_description(Some(format.to_string()))
    }
}

pub(crate) fn literal_tag(value: &Value) -> TypeTag {
    match value {
        Value::Bool(_) => TypeTag::Boolean,
        Value::Number(n) if n.is_i64() || n.is_u64() => TypeTag::Integer,
        Value::Number(_) => TypeTag::Number,
        Value::Null => TypeTag::Null,
        Value::Array(_) => TypeTag::Array,
        Value::Object(_) => TypeTag::Object,
        Value::String(_) => TypeTag::String,
    }
}
