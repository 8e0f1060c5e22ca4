//! Schema node model: one JSON Schema fragment before rendering.
//!
//! The variant set is closed; the builder produces it and the serializer
//! consumes it by exhaustive matching.
use indexmap::IndexMap;
use serde_json::Value;

use crate::definitions::DefId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    Array,
    Object,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Integer => "integer",
            TypeTag::Number => "number",
            TypeTag::Boolean => "boolean",
            TypeTag::Null => "null",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: NodeKind,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Accepts any JSON value.
    Any,
    Value { ty: TypeTag, nullable: bool },
    Format { ty: TypeTag, format: String, nullable: bool },
    Enum { ty: TypeTag, values: Vec<Value>, nullable: bool },
    Const { ty: TypeTag, value: Value },
    Array { items: Box<SchemaNode>, nullable: bool },
    Object(ObjectNode),
    AnyOf(Vec<SchemaNode>),
    Ref(DefId),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectNode {
    pub properties: IndexMap<String, SchemaNode>,
    pub required: Vec<String>,
    pub additional_properties: Option<bool>,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    pub name: String,
    pub node: SchemaNode,
    pub required: bool,
}

impl SchemaNode {
    pub fn new(kind: NodeKind) -> Self {
        Self { kind, description: None }
    }

    pub fn any() -> Self {
        Self::new(NodeKind::Any)
    }

    pub fn value(ty: TypeTag, nullable: bool) -> Self {
        Self::new(NodeKind::Value { ty, nullable })
    }

    pub fn null() -> Self {
        Self::value(TypeTag::Null, false)
    }

    pub fn format(ty: TypeTag, format: impl Into<String>, nullable: bool) -> Self {
        Self::new(NodeKind::Format { ty, format: format.into(), nullable })
    }

    pub fn enumeration(ty: TypeTag, values: Vec<Value>, nullable: bool) -> Self {
        Self::new(NodeKind::Enum { ty, values, nullable })
    }

    pub fn constant(ty: TypeTag, value: Value) -> Self {
        Self::new(NodeKind::Const { ty, value })
    }

    pub fn array(items: SchemaNode, nullable: bool) -> Self {
        Self::new(NodeKind::Array { items: Box::new(items), nullable })
    }

    pub fn object(object: ObjectNode) -> Self {
        Self::new(NodeKind::Object(object))
    }

    pub fn any_of(alternatives: Vec<SchemaNode>) -> Self {
        Self::new(NodeKind::AnyOf(alternatives))
    }

    pub fn reference(id: DefId) -> Self {
        Self::new(NodeKind::Ref(id))
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        if description.is_some() {
            self.description = description;
        }
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Primitive tag of a scalar node, if it has one.
    pub fn type_tag(&self) -> Option<TypeTag> {
        match &self.kind {
            NodeKind::Value { ty, .. }
            | NodeKind::Format { ty, .. }
            | NodeKind::Enum { ty, .. }
            | NodeKind::Const { ty, .. } => Some(*ty),
            NodeKind::Array { .. } => Some(TypeTag::Array),
            NodeKind::Object(_) => Some(TypeTag::Object),
            NodeKind::Any | NodeKind::AnyOf(_) | NodeKind::Ref(_) => None,
        }
    }
}

impl ObjectNode {
    /// A closed object: no properties beyond the declared ones.
    pub fn closed() -> Self {
        Self { additional_properties: Some(false), ..Self::default() }
    }

    pub fn add_property(&mut self, property: PropertySchema) {
        if property.required && !self.required.contains(&property.name) {
            self.required.push(property.name.clone());
        }
        self.properties.insert(property.name, property.node);
    }

    pub fn clear(&mut self) {
        self.properties.clear();
        self.required.clear();
    }
}
