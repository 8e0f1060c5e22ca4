//! Node tree → JSON Schema document.
//!
//! Rendering is a pure function of the node and the dialect, except that
//! reference counts go down as references are consumed: collapsing a
//! single-use `Ref`, or pointing back at a duplicated root.
//! Counts must already be computed by [`crate::refcount::count_references`].
use serde_json::{Map, Value, json};

use crate::definitions::{DefId, DefinitionCollection};
use crate::error::Result;
use crate::node::{NodeKind, ObjectNode, SchemaNode, TypeTag};
use crate::options::{ConstMode, NullableMode, RootMode, SchemaOptions};

pub const DEFINITIONS_KEY: &str = "$defs";
pub const ROOT_POINTER: &str = "#";

const ANY_TYPES: [&str; 6] = ["number", "string", "boolean", "object", "array", "null"];

/// Render `root` and the shared definitions it reaches.
///
/// A root that is itself a `Ref` is resolved by the configured [`RootMode`]
/// first, so the top level always carries `type` or `anyOf`.
pub fn render_document(
    root: &SchemaNode,
    definitions: &DefinitionCollection,
    options: &SchemaOptions,
) -> Result<Value> {
    let mut renderer = Renderer { definitions, options, duplicated_root: None };

    let mut document = match &root.kind {
        NodeKind::Ref(id) => {
            let definition = definitions.get(*id)?;
            let description = root.description.as_deref().or(definition.schema.description.as_deref());
            match options.root_mode {
                RootMode::InlineDuplication => {
                    definition.decrement();
                    renderer.duplicated_root = Some(*id);
                    let body = renderer.render_with(&definition.schema, description)?;
                    // what is left counts references from hoisted definitions only
                    if definition.is_shared() {
                        renderer.duplicated_root = None;
                    }
                    body
                }
                RootMode::RootRecursion => {
                    definition.mark_root();
                    renderer.render_with(&definition.schema, description)?
                }
            }
        }
        _ => renderer.render(root)?,
    };

    let shared = renderer.render_definitions()?;
    tracing::debug!(shared = shared.len(), root_mode = ?options.root_mode, "document rendered");
    if !shared.is_empty() {
        if let Value::Object(map) = &mut document {
            map.insert(DEFINITIONS_KEY.to_string(), Value::Object(shared));
        }
    }
    Ok(document)
}

pub fn definition_pointer(name: &str) -> String {
    format!("#/{DEFINITIONS_KEY}/{name}")
}

struct Renderer<'a> {
    definitions: &'a DefinitionCollection,
    options: &'a SchemaOptions,
    /// Set while rendering a body copied to the top level; references back to
    /// that definition point at the document root and stop counting. Stays
    /// set afterwards unless hoisted definitions still share it.
    duplicated_root: Option<DefId>,
}

impl Renderer<'_> {
    fn render(&self, node: &SchemaNode) -> Result<Value> {
        self.render_with(node, node.description.as_deref())
    }

    fn render_with(&self, node: &SchemaNode, description: Option<&str>) -> Result<Value> {
        let value = match &node.kind {
            NodeKind::Any => {
                let mut out = Map::new();
                out.insert("type".into(), json!(ANY_TYPES));
                describe(&mut out, description);
                Value::Object(out)
            }
            NodeKind::Value { ty, nullable } => {
                let mut out = Map::new();
                self.type_entry(&mut out, *ty, *nullable);
                describe(&mut out, description);
                Value::Object(out)
            }
            NodeKind::Format { ty, format, nullable } => {
                let mut out = Map::new();
                out.insert("type".into(), Value::from(ty.as_str()));
                out.insert("format".into(), Value::from(format.as_str()));
                self.nullable_entry(&mut out, *ty, *nullable);
                describe(&mut out, description);
                Value::Object(out)
            }
            NodeKind::Enum { ty, values, nullable } => {
                let mut out = Map::new();
                self.type_entry(&mut out, *ty, *nullable);
                describe(&mut out, description);
                let mut values = values.clone();
                if *nullable && self.options.nullable_mode == NullableMode::Default && !values.contains(&Value::Null) {
                    values.push(Value::Null);
                }
                out.insert("enum".into(), Value::Array(values));
                Value::Object(out)
            }
            NodeKind::Const { ty, value } => {
                let mut out = Map::new();
                out.insert("type".into(), Value::from(ty.as_str()));
                match self.options.const_mode {
                    ConstMode::Default => out.insert("const".into(), value.clone()),
                    ConstMode::Enum => out.insert("enum".into(), Value::Array(vec![value.clone()])),
                };
                describe(&mut out, description);
                Value::Object(out)
            }
            NodeKind::Array { items, nullable } => {
                let mut out = Map::new();
                out.insert("type".into(), Value::from(TypeTag::Array.as_str()));
                describe(&mut out, description);
                out.insert("items".into(), self.render(items)?);
                self.wrap_composite(out, *nullable)
            }
            NodeKind::Object(object) => self.render_object(object, description)?,
            NodeKind::AnyOf(alternatives) => {
                let mut out = Map::new();
                describe(&mut out, description);
                let alternatives = alternatives.iter().map(|a| self.render(a)).collect::<Result<Vec<_>>>()?;
                out.insert("anyOf".into(), Value::Array(alternatives));
                Value::Object(out)
            }
            NodeKind::Ref(id) => self.render_ref(*id, description)?,
        };
        Ok(value)
    }

    fn render_object(&self, object: &ObjectNode, description: Option<&str>) -> Result<Value> {
        let mut out = Map::new();
        out.insert("type".into(), Value::from(TypeTag::Object.as_str()));
        describe(&mut out, description);
        let mut properties = Map::new();
        for (name, node) in &object.properties {
            properties.insert(name.clone(), self.render(node)?);
        }
        out.insert("properties".into(), Value::Object(properties));
        if !object.required.is_empty() {
            out.insert("required".into(), json!(object.required));
        }
        if let Some(additional) = object.additional_properties {
            out.insert("additionalProperties".into(), Value::Bool(additional));
        }
        Ok(self.wrap_composite(out, object.nullable))
    }

    /// Single-use definitions collapse into their body; the rest become pointers.
    fn render_ref(&self, id: DefId, description: Option<&str>) -> Result<Value> {
        let definition = self.definitions.get(id)?;
        if self.duplicated_root == Some(id) {
            definition.decrement();
            return Ok(json!({ "$ref": ROOT_POINTER }));
        }
        if definition.ref_count() <= 1 {
            definition.decrement();
            let description = description.or(definition.schema.description.as_deref());
            return self.render_with(&definition.schema, description);
        }
        let pointer = if definition.is_root() { ROOT_POINTER.to_string() } else { definition_pointer(&definition.name) };
        Ok(json!({ "$ref": pointer }))
    }

    fn render_definitions(&self) -> Result<Map<String, Value>> {
        let mut shared = Map::new();
        for (_, definition) in self.definitions.iter() {
            if definition.is_shared() {
                shared.insert(definition.name.clone(), self.render(&definition.schema)?);
            }
        }
        Ok(shared)
    }

    // ---- nullability ----

    fn type_entry(&self, out: &mut Map<String, Value>, ty: TypeTag, nullable: bool) {
        out.insert("type".into(), Value::from(ty.as_str()));
        self.nullable_entry(out, ty, nullable);
    }

    fn nullable_entry(&self, out: &mut Map<String, Value>, ty: TypeTag, nullable: bool) {
        if !nullable {
            return;
        }
        match self.options.nullable_mode {
            NullableMode::Nullable => {
                out.insert("nullable".into(), Value::Bool(true));
            }
            NullableMode::Default => {
                out.insert("type".into(), json!([ty.as_str(), TypeTag::Null.as_str()]));
            }
        }
    }

    fn wrap_composite(&self, mut out: Map<String, Value>, nullable: bool) -> Value {
        if !nullable {
            return Value::Object(out);
        }
        match self.options.nullable_mode {
            NullableMode::Nullable => {
                out.insert("nullable".into(), Value::Bool(true));
                Value::Object(out)
            }
            NullableMode::Default => json!({ "anyOf": [Value::Object(out), { "type": "null" }] }),
        }
    }
}

fn describe(out: &mut Map<String, Value>, description: Option<&str>) {
    if let Some(description) = description {
        out.insert("description".into(), Value::from(description));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildContext, DefaultSchemaBuilder, SchemaBuilder};
    use crate::descriptor::{Describe, PropertyDescriptor, TypeDescriptor, TypeKey};
    use crate::refcount::count_references;
    use pretty_assertions::assert_eq;

    struct Node;
    impl Describe for Node {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object(TypeKey::new("test::Node"))
                .with_description("A linked node")
                .with_property(PropertyDescriptor::of::<i32>("id"))
                .with_property(PropertyDescriptor::of::<Option<Node>>("next"))
        }
    }

    struct Address;
    impl Describe for Address {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object(TypeKey::new("test::Address"))
                .with_property(PropertyDescriptor::of::<String>("city"))
        }
    }

    struct Order;
    impl Describe for Order {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object(TypeKey::new("test::Order"))
                .with_property(PropertyDescriptor::of::<Address>("billing"))
                .with_property(PropertyDescriptor::of::<Address>("shipping"))
                .with_property(PropertyDescriptor::of::<Option<Vec<String>>>("tags"))
        }
    }

    struct Tree;
    impl Describe for Tree {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object(TypeKey::new("test::Tree"))
                .with_property(PropertyDescriptor::of::<Option<Tree>>("left"))
                .with_property(PropertyDescriptor::of::<Option<Tree>>("right"))
        }
    }

    struct Department;
    impl Describe for Department {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object(TypeKey::new("test::Department"))
                .with_property(PropertyDescriptor::of::<Employee>("head"))
                .with_property(PropertyDescriptor::of::<Vec<Employee>>("staff"))
        }
    }

    struct Employee;
    impl Describe for Employee {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object(TypeKey::new("test::Employee"))
                .with_property(PropertyDescriptor::of::<Department>("dept"))
        }
    }

    fn render(ty: TypeDescriptor, options: &SchemaOptions) -> Value {
        let mut ctx = BuildContext::new(options);
        let root = DefaultSchemaBuilder.build_schema(&ty, &mut ctx).unwrap();
        count_references(&root, &ctx.definitions).unwrap();
        render_document(&root, &ctx.definitions, options).unwrap()
    }

    #[test]
    fn scalar_nullability_follows_the_dialect() {
        let keyword = SchemaOptions::default();
        assert_eq!(render(Option::<i64>::describe(), &keyword), json!({"type": "integer", "nullable": true}));

        let union = SchemaOptions::default().with_nullable_mode(NullableMode::Default);
        assert_eq!(render(Option::<i64>::describe(), &union), json!({"type": ["integer", "null"]}));
    }

    #[test]
    fn constants_render_as_const_or_singleton_enum() {
        let constant = TypeDescriptor::constant("meta");
        assert_eq!(
            render(constant.clone(), &SchemaOptions::default()),
            json!({"type": "string", "const": "meta"})
        );
        let options = SchemaOptions::default().with_const_mode(ConstMode::Enum);
        assert_eq!(render(constant, &options), json!({"type": "string", "enum": ["meta"]}));
    }

    #[test]
    fn shared_definitions_are_hoisted_once() {
        let document = render(Order::describe(), &SchemaOptions::default());
        assert_eq!(
            document,
            json!({
                "type": "object",
                "properties": {
                    "billing": {"$ref": "#/$defs/Address"},
                    "shipping": {"$ref": "#/$defs/Address"},
                    "tags": {"type": "array", "items": {"type": "string"}, "nullable": true}
                },
                "required": ["billing", "shipping"],
                "additionalProperties": false,
                "$defs": {
                    "Address": {
                        "type": "object",
                        "properties": {"city": {"type": "string"}},
                        "required": ["city"],
                        "additionalProperties": false
                    }
                }
            })
        );
    }

    #[test]
    fn nullable_composites_wrap_in_any_of_under_type_unions() {
        let options = SchemaOptions::default().with_nullable_mode(NullableMode::Default);
        let document = render(Option::<Vec<bool>>::describe(), &options);
        assert_eq!(
            document,
            json!({"anyOf": [{"type": "array", "items": {"type": "boolean"}}, {"type": "null"}]})
        );
    }

    #[test]
    fn inline_duplication_points_self_references_at_root() {
        let document = render(Node::describe(), &SchemaOptions::default());
        assert_eq!(
            document,
            json!({
                "type": "object",
                "description": "A linked node",
                "properties": {
                    "id": {"type": "integer"},
                    "next": {"anyOf": [{"$ref": "#"}, {"type": "null"}]}
                },
                "required": ["id"],
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn duplicated_root_with_several_self_references_is_not_hoisted() {
        let document = render(Tree::describe(), &SchemaOptions::default());
        assert_eq!(
            document,
            json!({
                "type": "object",
                "properties": {
                    "left": {"anyOf": [{"$ref": "#"}, {"type": "null"}]},
                    "right": {"anyOf": [{"$ref": "#"}, {"type": "null"}]}
                },
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn hoisted_definitions_point_back_at_the_duplicated_root() {
        let document = render(Department::describe(), &SchemaOptions::default());
        assert_eq!(
            document,
            json!({
                "type": "object",
                "properties": {
                    "head": {"$ref": "#/$defs/Employee"},
                    "staff": {"type": "array", "items": {"$ref": "#/$defs/Employee"}}
                },
                "required": ["head", "staff"],
                "additionalProperties": false,
                "$defs": {
                    "Employee": {
                        "type": "object",
                        "properties": {"dept": {"$ref": "#"}},
                        "required": ["dept"],
                        "additionalProperties": false
                    }
                }
            })
        );
    }

    #[test]
    fn root_recursion_flags_the_definition_and_skips_defs() {
        let options = SchemaOptions::default().with_root_mode(RootMode::RootRecursion);
        let document = render(Node::describe(), &options);
        assert_eq!(document.pointer("/properties/next/anyOf/0/$ref"), Some(&json!("#")));
        assert!(document.get(DEFINITIONS_KEY).is_none());
        assert_eq!(document["type"], "object");
    }

    #[test]
    fn any_lists_every_json_type() {
        assert_eq!(
            render(Value::describe(), &SchemaOptions::default()),
            json!({"type": ["number", "string", "boolean", "object", "array", "null"]})
        );
    }

    #[test]
    fn nullable_enum_admits_null_under_type_unions() {
        let options = SchemaOptions::default().with_nullable_mode(NullableMode::Default);
        let status = TypeDescriptor::value(
            TypeKey::new("test::Status"),
            crate::descriptor::Scalar::Enum(vec!["On".into(), "Off".into()]),
        )
        .nullable();
        assert_eq!(render(status, &options), json!({"type": ["string", "null"], "enum": ["On", "Off", null]}));
    }
}
