//! Hand-assembled schemas over the same builder contracts.
//!
//! ```ignore
//! let document = SchemaGenerator::new().build(&options, |b| {
//!     b.object(|o| {
//!         o.description("A person")
//!             .property_described::<String>("full_name", "First and last name")
//!             .property_with("kind", |b| b.constant("person"));
//!     })
//! })?;
//! ```
//!
//! Object builders collect the first failure and report it when the enclosing
//! `object*` call returns, so member chains stay flat.
use serde_json::Value;

use crate::builder::{BuildContext, SchemaBuilder};
use crate::descriptor::{Describe, PropertyDescriptor, Scalar, TypeDescriptor, TypeKey, TypeRef};
use crate::error::{Result, SchemaError};
use crate::node::{ObjectNode, PropertySchema, SchemaNode};

pub struct FluentSchemaBuilder<'c, 'a, B: SchemaBuilder + ?Sized> {
    builder: &'c B,
    ctx: &'c mut BuildContext<'a>,
}

impl<'c, 'a, B: SchemaBuilder + ?Sized> FluentSchemaBuilder<'c, 'a, B> {
    pub fn new(builder: &'c B, ctx: &'c mut BuildContext<'a>) -> Self {
        Self { builder, ctx }
    }

    fn reborrow(&mut self) -> FluentSchemaBuilder<'_, 'a, B> {
        FluentSchemaBuilder { builder: self.builder, ctx: &mut *self.ctx }
    }

    pub fn value<T: Describe + ?Sized>(&mut self) -> Result<SchemaNode> {
        let ty = self.ctx.resolve(&TypeRef::of::<T>())?;
        self.builder.build_schema(&ty, self.ctx)
    }

    pub fn value_of(&mut self, ty: &TypeDescriptor) -> Result<SchemaNode> {
        self.builder.build_schema(ty, self.ctx)
    }

    pub fn constant(&mut self, value: impl Into<Value>) -> Result<SchemaNode> {
        self.value_of(&TypeDescriptor::constant(value))
    }

    /// String enumeration built on the fly; members go through the naming policy.
    pub fn enumeration<I, S>(&mut self, members: I) -> Result<SchemaNode>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scalar = Scalar::Enum(members.into_iter().map(Into::into).collect());
        self.value_of(&TypeDescriptor::value(TypeKey::new("enum"), scalar))
    }

    /// Inline closed object, never hoisted.
    pub fn object(&mut self, members: impl FnOnce(&mut FluentObjectBuilder<'_, 'a, B>)) -> Result<SchemaNode> {
        let mut object = FluentObjectBuilder::new(self.reborrow(), None);
        members(&mut object);
        let (body, description) = object.finish()?;
        Ok(SchemaNode::object(body).with_description(description))
    }

    pub fn object_of<T: Describe + ?Sized>(&mut self) -> Result<SchemaNode> {
        self.value::<T>()
    }

    /// `T`'s definition with its body replaced by the listed members.
    pub fn object_with<T: Describe + ?Sized>(
        &mut self,
        members: impl FnOnce(&mut FluentObjectBuilder<'_, 'a, B>),
    ) -> Result<SchemaNode> {
        let ty = self.ctx.resolve(&TypeRef::of::<T>())?;
        let node = self.builder.build_schema(&ty, self.ctx)?;
        let id = self
            .ctx
            .definitions
            .try_get_ref(&ty.key)
            .ok_or_else(|| SchemaError::Configuration(format!("`{}` has no object definition", ty.key)))?;

        let mut object = FluentObjectBuilder::new(self.reborrow(), Some(ty));
        members(&mut object);
        let (body, description) = object.finish()?;

        self.ctx.definitions.fill(id, body)?;
        if description.is_some() {
            self.ctx.definitions.get_mut(id)?.schema.description = description;
        }
        Ok(node)
    }

    pub fn array(&mut self, items: impl FnOnce(&mut Self) -> Result<SchemaNode>) -> Result<SchemaNode> {
        let items = items(self)?;
        Ok(SchemaNode::array(items, false))
    }

    pub fn array_of<T: Describe>(&mut self) -> Result<SchemaNode> {
        self.value_of(&TypeDescriptor::array(TypeKey::of::<Vec<T>>(), TypeRef::of::<T>()))
    }

    pub fn any_of(&mut self, alternatives: impl FnOnce(&mut Self) -> Result<Vec<SchemaNode>>) -> Result<SchemaNode> {
        Ok(SchemaNode::any_of(alternatives(self)?))
    }
}

pub struct FluentObjectBuilder<'c, 'a, B: SchemaBuilder + ?Sized> {
    fluent: FluentSchemaBuilder<'c, 'a, B>,
    /// Descriptor of the typed object whose members may be listed.
    typed: Option<TypeDescriptor>,
    object: ObjectNode,
    description: Option<String>,
    error: Option<SchemaError>,
}

impl<'c, 'a, B: SchemaBuilder + ?Sized> FluentObjectBuilder<'c, 'a, B> {
    fn new(fluent: FluentSchemaBuilder<'c, 'a, B>, typed: Option<TypeDescriptor>) -> Self {
        Self { fluent, typed, object: ObjectNode::closed(), description: None, error: None }
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn nullable(&mut self, nullable: bool) -> &mut Self {
        self.object.nullable = nullable;
        self
    }

    pub fn property<T: Describe + ?Sized>(&mut self, name: impl Into<String>) -> &mut Self {
        let property = PropertyDescriptor::of::<T>(name);
        let result = self.fluent.builder.build_property_schema(&property, self.fluent.ctx);
        self.push(result)
    }

    pub fn property_described<T: Describe + ?Sized>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> &mut Self {
        let property = PropertyDescriptor::of::<T>(name);
        let result = self
            .fluent
            .builder
            .build_property_schema(&property, self.fluent.ctx)
            .map(|p| PropertySchema { node: p.node.described(description), ..p });
        self.push(result)
    }

    /// A property whose schema comes from `value`. Required under the active policy.
    pub fn property_with(
        &mut self,
        name: impl Into<String>,
        value: impl FnOnce(&mut FluentSchemaBuilder<'c, 'a, B>) -> Result<SchemaNode>,
    ) -> &mut Self {
        let property = PropertyDescriptor::of::<Value>(name);
        let result = self.custom_property(&property, value);
        self.push(result)
    }

    pub fn member(&mut self, name: &str) -> &mut Self {
        let result = self
            .typed_member(name)
            .and_then(|p| self.fluent.builder.build_property_schema(&p, self.fluent.ctx));
        self.push(result)
    }

    pub fn member_described(&mut self, name: &str, description: impl Into<String>) -> &mut Self {
        let result = self
            .typed_member(name)
            .and_then(|p| self.fluent.builder.build_property_schema(&p, self.fluent.ctx))
            .map(|p| PropertySchema { node: p.node.described(description), ..p });
        self.push(result)
    }

    /// A declared member of the typed object with its schema replaced.
    pub fn member_with(
        &mut self,
        name: &str,
        value: impl FnOnce(&mut FluentSchemaBuilder<'c, 'a, B>) -> Result<SchemaNode>,
    ) -> &mut Self {
        let result = self.typed_member(name).and_then(|p| self.custom_property(&p, value));
        self.push(result)
    }

    fn custom_property(
        &mut self,
        property: &PropertyDescriptor,
        value: impl FnOnce(&mut FluentSchemaBuilder<'c, 'a, B>) -> Result<SchemaNode>,
    ) -> Result<PropertySchema> {
        let ty = self.fluent.ctx.resolve(&property.ty)?;
        let node = value(&mut self.fluent)?;
        let options = self.fluent.ctx.options;
        Ok(PropertySchema {
            name: options.naming.apply(&property.name),
            node,
            required: options.required.is_required(property, &ty),
        })
    }

    fn typed_member(&self, name: &str) -> Result<PropertyDescriptor> {
        let Some(ty) = &self.typed else {
            return Err(SchemaError::Configuration(format!("inline object has no declared member `{name}`")));
        };
        ty.as_object()
            .and_then(|o| o.properties.iter().find(|p| p.name == name))
            .cloned()
            .ok_or_else(|| SchemaError::Configuration(format!("`{}` has no member `{name}`", ty.key)))
    }

    fn push(&mut self, result: Result<PropertySchema>) -> &mut Self {
        match result {
            Ok(property) => self.object.add_property(property),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    fn finish(self) -> Result<(ObjectNode, Option<String>)> {
        match self.error {
            Some(err) => Err(err),
            None => Ok((self.object, self.description)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DefaultSchemaBuilder;
    use crate::naming::NamingPolicy;
    use crate::node::{NodeKind, TypeTag};
    use crate::options::SchemaOptions;

    struct Line;
    impl Describe for Line {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object(TypeKey::new("docs::Line"))
                .with_property(PropertyDescriptor::of::<i32>("number"))
                .with_property(PropertyDescriptor::of::<String>("text"))
        }
    }

    fn with_fluent<R>(options: &SchemaOptions, f: impl FnOnce(&mut FluentSchemaBuilder<'_, '_, DefaultSchemaBuilder>) -> R) -> (R, BuildContext<'_>) {
        let mut ctx = BuildContext::new(options);
        let result = f(&mut FluentSchemaBuilder::new(&DefaultSchemaBuilder, &mut ctx));
        (result, ctx)
    }

    #[test]
    fn inline_object_applies_naming_and_requiredness() {
        let options = SchemaOptions::default().with_naming(NamingPolicy::SnakeCaseLower);
        let (node, _) = with_fluent(&options, |b| {
            b.object(|o| {
                o.description("A person")
                    .property_described::<String>("fullName", "First and last")
                    .property::<Option<i32>>("age")
                    .property_with("$type", |b| b.constant("person"));
            })
        });
        let node = node.unwrap();
        assert_eq!(node.description.as_deref(), Some("A person"));
        let NodeKind::Object(object) = node.kind else { panic!("object") };
        assert_eq!(object.properties.keys().collect::<Vec<_>>(), vec!["full_name", "age", "$type"]);
        assert_eq!(object.required, vec!["full_name".to_string(), "$type".to_string()]);
        assert_eq!(
            object.properties["$type"].kind,
            NodeKind::Const { ty: TypeTag::String, value: Value::from("person") }
        );
    }

    #[test]
    fn object_with_replaces_the_definition_body() {
        let options = SchemaOptions::default();
        let (node, ctx) = with_fluent(&options, |b| {
            b.object_with::<Line>(|o| {
                o.description("A line of text").member_described("text", "Line text");
            })
        });
        let NodeKind::Ref(id) = node.unwrap().kind else { panic!("ref") };
        let definition = ctx.definitions.get(id).unwrap();
        assert_eq!(definition.schema.description.as_deref(), Some("A line of text"));
        let object = definition.object().unwrap();
        assert_eq!(object.properties.keys().collect::<Vec<_>>(), vec!["text"]);
    }

    #[test]
    fn unknown_member_is_reported_when_the_object_closes() {
        let options = SchemaOptions::default();
        let (result, _) = with_fluent(&options, |b| {
            b.object_with::<Line>(|o| {
                o.member("colour").member("text");
            })
        });
        assert!(matches!(result, Err(SchemaError::Configuration(msg)) if msg.contains("colour")));
    }

    #[test]
    fn dynamic_enumeration_inside_array_of_alternatives() {
        let options = SchemaOptions::strict();
        let (node, _) = with_fluent(&options, |b| {
            b.array(|b| {
                b.any_of(|b| {
                    Ok(vec![
                        b.object(|o| {
                            o.property_with("id", |b| b.enumeration(["widget1", "widget2"]));
                        })?,
                        b.array_of::<Line>()?,
                    ])
                })
            })
        });
        let NodeKind::Array { items, .. } = node.unwrap().kind else { panic!("array") };
        let NodeKind::AnyOf(alternatives) = &items.kind else { panic!("anyOf") };
        let NodeKind::Object(object) = &alternatives[0].kind else { panic!("object") };
        assert_eq!(
            object.properties["id"].kind,
            NodeKind::Enum {
                ty: TypeTag::String,
                values: vec![Value::from("widget1"), Value::from("widget2")],
                nullable: false
            }
        );
    }
}
