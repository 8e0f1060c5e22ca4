//! JSON type files: declared types for schema generation without Rust code.
//!
//! ```json
//! {
//!   "root": "Document",
//!   "types": {
//!     "Document": {
//!       "kind": "object",
//!       "description": "A document",
//!       "properties": [
//!         { "name": "id", "type": "integer" },
//!         { "name": "lines", "type": "Line[]" },
//!         { "name": "next", "type": "Document?" },
//!         { "name": "kind", "const": "document" }
//!       ]
//!     },
//!     "Line": { "kind": "object", "properties": [{ "name": "text", "type": "string" }] },
//!     "Status": { "kind": "enum", "values": ["Draft", "Published"] },
//!     "Id": { "kind": "alias", "type": "uuid" }
//!   }
//! }
//! ```
//!
//! Type expressions are a scalar or declared name followed by any mix of `[]`
//! (array of) and `?` (nullable) suffixes, read right to left: `Line[]?` is a
//! nullable array of `Line`.
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::descriptor::{
    DerivedType, PolymorphismOptions, PropertyDescriptor, Scalar, TypeDescriptor, TypeKey, TypeProvider, TypeRef,
};
use crate::error::{Result, SchemaError};
use crate::path_de::from_str_with_path;

pub const DEFAULT_DISCRIMINATOR: &str = "$type";

static TYPE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$.:\-]*$").expect("static type name pattern"));

// ————————————————————————————————————————————————————————————————————————————
// FILE FORMAT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Deserialize)]
struct RawTypeFile {
    root: Option<String>,
    #[serde(default)]
    types: IndexMap<String, TypeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum TypeEntry {
    Object(ObjectEntry),
    Enum(EnumEntry),
    Alias(AliasEntry),
}

#[derive(Debug, Clone, Deserialize)]
struct ObjectEntry {
    description: Option<String>,
    #[serde(default, rename = "abstract")]
    is_abstract: bool,
    /// Discriminator property name shared by `implementations`.
    discriminator: Option<String>,
    #[serde(default)]
    implementations: Vec<ImplementationEntry>,
    #[serde(default)]
    properties: Vec<PropertyEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ImplementationEntry {
    #[serde(rename = "type")]
    ty: String,
    discriminator: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PropertyEntry {
    name: String,
    #[serde(rename = "type")]
    ty: Option<TypeExpr>,
    #[serde(rename = "const")]
    constant: Option<Value>,
    description: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    optional: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct EnumEntry {
    description: Option<String>,
    values: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AliasEntry {
    description: Option<String>,
    #[serde(rename = "type")]
    ty: TypeExpr,
}

// ————————————————————————————————————————————————————————————————————————————
// TYPE EXPRESSIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum TypeExpr {
    Name(String),
    Array(Box<TypeExpr>),
    Nullable(Box<TypeExpr>),
}

impl TypeExpr {
    /// The scalar or declared name at the core of the expression.
    pub fn base_name(&self) -> &str {
        match self {
            TypeExpr::Name(name) => name,
            TypeExpr::Array(inner) | TypeExpr::Nullable(inner) => inner.base_name(),
        }
    }
}

impl FromStr for TypeExpr {
    type Err = String;

    fn from_str(src: &str) -> std::result::Result<Self, Self::Err> {
        let src = src.trim();
        if let Some(inner) = src.strip_suffix('?') {
            return Ok(TypeExpr::Nullable(Box::new(inner.parse()?)));
        }
        if let Some(inner) = src.strip_suffix("[]") {
            return Ok(TypeExpr::Array(Box::new(inner.parse()?)));
        }
        if TYPE_NAME.is_match(src) {
            Ok(TypeExpr::Name(src.to_string()))
        } else {
            Err(format!("invalid type expression `{src}`"))
        }
    }
}

impl TryFrom<String> for TypeExpr {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Name(name) => f.write_str(name),
            TypeExpr::Array(inner) => write!(f, "{inner}[]"),
            TypeExpr::Nullable(inner) => write!(f, "{inner}?"),
        }
    }
}

fn scalar_named(name: &str) -> Option<Scalar> {
    let scalar = match name {
        "string" => Scalar::String,
        "char" => Scalar::Char,
        "integer" => Scalar::Integer,
        "number" => Scalar::Number,
        "boolean" => Scalar::Boolean,
        "date-time" => Scalar::DateTime,
        "date" => Scalar::Date,
        "time" => Scalar::Time,
        "uuid" => Scalar::Uuid,
        "any" => Scalar::Json,
        _ => return None,
    };
    Some(scalar)
}

fn type_ref(expr: &TypeExpr) -> TypeRef {
    match expr {
        TypeExpr::Name(name) => match scalar_named(name) {
            Some(scalar) => TypeRef::inline(TypeDescriptor::value(TypeKey::new(name.as_str()), scalar)),
            None => TypeRef::named(name.as_str()),
        },
        TypeExpr::Array(inner) => {
            TypeRef::inline(TypeDescriptor::array(TypeKey::new(expr.to_string()), type_ref(inner)))
        }
        TypeExpr::Nullable(inner) => match type_ref(inner) {
            TypeRef::Named { key, .. } => TypeRef::Named { key, nullable: true },
            TypeRef::Inline(descriptor) => TypeRef::inline(descriptor.nullable()),
            deferred @ TypeRef::Deferred(_) => deferred,
        },
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PROVIDER
// ————————————————————————————————————————————————————————————————————————————

/// A parsed type file; describes its declared types and the scalar names.
#[derive(Debug, Clone)]
pub struct TypeFile {
    root: Option<TypeKey>,
    descriptors: IndexMap<TypeKey, TypeDescriptor>,
    aliases: IndexMap<TypeKey, Alias>,
}

/// Aliases resolve on demand so they may point at types declared later.
#[derive(Debug, Clone)]
struct Alias {
    target: TypeExpr,
    description: Option<String>,
}

impl TypeFile {
    pub fn parse(src: &str) -> Result<Self> {
        let raw: RawTypeFile = from_str_with_path(src)?;
        let mut file = TypeFile { root: raw.root.map(TypeKey::new), descriptors: IndexMap::new(), aliases: IndexMap::new() };

        for (name, entry) in raw.types {
            if scalar_named(&name).is_some() {
                return Err(SchemaError::Configuration(format!("type `{name}` shadows a scalar name")));
            }
            let key = TypeKey::new(name.as_str());
            match entry {
                TypeEntry::Object(object) => {
                    let descriptor = object_descriptor(key.clone(), object)?;
                    file.descriptors.insert(key, descriptor);
                }
                TypeEntry::Enum(entry) => {
                    let mut descriptor = TypeDescriptor::value(key.clone(), Scalar::Enum(entry.values));
                    descriptor.description = entry.description;
                    file.descriptors.insert(key, descriptor);
                }
                TypeEntry::Alias(alias) => {
                    file.aliases.insert(key, Alias { target: alias.ty, description: alias.description });
                }
            }
        }

        file.check_aliases()?;
        if let Some(root) = &file.root {
            if !file.declares(root) {
                return Err(SchemaError::UnknownType(root.clone()));
            }
        }
        tracing::debug!(types = file.descriptors.len() + file.aliases.len(), "type file parsed");
        Ok(file)
    }

    pub fn root(&self) -> Option<&TypeKey> {
        self.root.as_ref()
    }

    pub fn declares(&self, key: &TypeKey) -> bool {
        self.descriptors.contains_key(key) || self.aliases.contains_key(key)
    }

    /// Declared type names with their kind, in file order.
    pub fn declared(&self) -> impl Iterator<Item = (&TypeKey, &'static str)> {
        let objects = self.descriptors.iter().map(|(key, d)| {
            let kind = if d.as_object().is_some() { "object" } else { "enum" };
            (key, kind)
        });
        objects.chain(self.aliases.keys().map(|k| (k, "alias")))
    }

    /// An alias must reach an object, enum or scalar without coming back to itself.
    fn check_aliases(&self) -> Result<()> {
        for (key, alias) in &self.aliases {
            let target = alias.target.base_name();
            if scalar_named(target).is_none() && !self.declares(&TypeKey::new(target)) {
                tracing::debug!(alias = %key, target, "alias target not declared");
                return Err(SchemaError::UnknownType(TypeKey::new(target)));
            }
        }
        for start in self.aliases.keys() {
            let mut seen = HashSet::new();
            let mut current = start.clone();
            while let Some(alias) = self.aliases.get(&current) {
                if !seen.insert(current.clone()) {
                    return Err(SchemaError::Configuration(format!("alias `{start}` refers to itself")));
                }
                current = TypeKey::new(alias.target.base_name());
            }
        }
        Ok(())
    }
}

impl TypeProvider for TypeFile {
    fn describe(&self, key: &TypeKey) -> Option<TypeDescriptor> {
        if let Some(descriptor) = self.descriptors.get(key) {
            return Some(descriptor.clone());
        }
        if let Some(alias) = self.aliases.get(key) {
            // targets are checked at parse time
            let mut descriptor = type_ref(&alias.target).resolve(Some(self)).ok()?;
            if alias.description.is_some() {
                descriptor.description = alias.description.clone();
            }
            return Some(descriptor);
        }
        scalar_named(key.as_str()).map(|scalar| TypeDescriptor::value(key.clone(), scalar))
    }
}

fn object_descriptor(key: TypeKey, entry: ObjectEntry) -> Result<TypeDescriptor> {
    let mut descriptor = TypeDescriptor::object(key.clone());
    descriptor.description = entry.description;
    if entry.is_abstract {
        descriptor = descriptor.abstract_type();
    }
    if !entry.implementations.is_empty() {
        let discriminator = entry.discriminator.unwrap_or_else(|| DEFAULT_DISCRIMINATOR.to_string());
        let mut options = PolymorphismOptions::new(discriminator);
        for implementation in entry.implementations {
            let value = implementation.discriminator.unwrap_or_else(|| implementation.ty.clone());
            options.variants.push(DerivedType {
                key: TypeKey::new(implementation.ty.as_str()),
                ty: TypeRef::named(implementation.ty),
                discriminator: Some(value),
            });
        }
        descriptor = descriptor.with_polymorphism(options);
    }
    for property in entry.properties {
        descriptor = descriptor.with_property(property_descriptor(&key, property)?);
    }
    Ok(descriptor)
}

fn property_descriptor(owner: &TypeKey, entry: PropertyEntry) -> Result<PropertyDescriptor> {
    let ty = match (entry.ty, entry.constant) {
        (Some(expr), None) => type_ref(&expr),
        (None, Some(value)) => TypeRef::inline(TypeDescriptor::constant(value)),
        _ => {
            return Err(SchemaError::Configuration(format!(
                "property `{owner}.{}` needs exactly one of `type` or `const`",
                entry.name
            )));
        }
    };
    if entry.required && entry.optional {
        return Err(SchemaError::Configuration(format!(
            "property `{owner}.{}` cannot be both required and optional",
            entry.name
        )));
    }
    let mut property = PropertyDescriptor::new(entry.name, ty);
    if entry.required {
        property = property.required();
    }
    if entry.optional {
        property = property.optional();
    }
    property.description = entry.description;
    Ok(property)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeKind;
    use crate::generator::SchemaGenerator;
    use crate::options::SchemaOptions;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const DOCUMENT: &str = r#"{
        "root": "Document",
        "types": {
            "Document": {
                "kind": "object",
                "description": "A document",
                "properties": [
                    { "name": "id", "type": "DocumentId" },
                    { "name": "lines", "type": "Line[]", "description": "Text lines" },
                    { "name": "next", "type": "Document?" },
                    { "name": "status", "type": "Status", "optional": true },
                    { "name": "kind", "const": "document" }
                ]
            },
            "Line": { "kind": "object", "properties": [{ "name": "text", "type": "string" }] },
            "Status": { "kind": "enum", "values": ["Draft", "Published"] },
            "DocumentId": { "kind": "alias", "type": "uuid", "description": "Stable identifier" }
        }
    }"#;

    const FIXTURES: [(&str, &str, &str, &str); 3] = [
        (
            "document",
            include_str!("../fixtures/document.types.json"),
            include_str!("../fixtures/expected/document.permissive.json"),
            include_str!("../fixtures/expected/document.strict.json"),
        ),
        (
            "org",
            include_str!("../fixtures/org.types.json"),
            include_str!("../fixtures/expected/org.permissive.json"),
            include_str!("../fixtures/expected/org.strict.json"),
        ),
        (
            "shapes",
            include_str!("../fixtures/shapes.types.json"),
            include_str!("../fixtures/expected/shapes.permissive.json"),
            include_str!("../fixtures/expected/shapes.strict.json"),
        ),
    ];

    #[test]
    fn fixtures_match_their_snapshots() {
        for (name, types, permissive, strict) in FIXTURES {
            let file = TypeFile::parse(types).unwrap();
            let generator = SchemaGenerator::new().with_provider(&file);
            for (preset, options, expected) in
                [("permissive", SchemaOptions::permissive(), permissive), ("strict", SchemaOptions::strict(), strict)]
            {
                let document = generator.generate_named(file.root().unwrap(), &options).unwrap();
                let expected: Value = serde_json::from_str(expected).unwrap();
                assert_eq!(document.into_value(), expected, "{name} [{preset}]");
            }
        }
    }

    #[test]
    fn type_expressions_nest_right_to_left() {
        let expr: TypeExpr = "Line[]?".parse().unwrap();
        assert_eq!(
            expr,
            TypeExpr::Nullable(Box::new(TypeExpr::Array(Box::new(TypeExpr::Name("Line".into())))))
        );
        assert_eq!(expr.to_string(), "Line[]?");
        assert_eq!(expr.base_name(), "Line");
        assert!("Line[".parse::<TypeExpr>().is_err());
        assert!("".parse::<TypeExpr>().is_err());
    }

    #[test]
    fn declared_types_describe_through_the_provider() {
        let file = TypeFile::parse(DOCUMENT).unwrap();
        assert_eq!(file.root(), Some(&TypeKey::new("Document")));
        let kinds: Vec<_> = file.declared().map(|(k, kind)| (k.as_str(), kind)).collect();
        assert_eq!(
            kinds,
            vec![("Document", "object"), ("Line", "object"), ("Status", "enum"), ("DocumentId", "alias")]
        );
        let id = file.describe(&TypeKey::new("DocumentId")).unwrap();
        assert!(matches!(id.kind, TypeKind::Value(ref v) if v.scalar == Scalar::Uuid));
        assert_eq!(id.description.as_deref(), Some("Stable identifier"));
    }

    #[test]
    fn generates_a_document_from_a_type_file() {
        let file = TypeFile::parse(DOCUMENT).unwrap();
        let generator = SchemaGenerator::new().with_provider(&file);
        let options = SchemaOptions::default().with_format_supported(false);
        let document = generator.generate_named(file.root().unwrap(), &options).unwrap();
        assert_eq!(
            document.into_value(),
            json!({
                "type": "object",
                "description": "A document",
                "properties": {
                    "id": {"type": "string", "description": "Stable identifier"},
                    "lines": {
                        "type": "array",
                        "description": "Text lines",
                        "items": {
                            "type": "object",
                            "properties": {"text": {"type": "string"}},
                            "required": ["text"],
                            "additionalProperties": false
                        }
                    },
                    "next": {"anyOf": [{"$ref": "#"}, {"type": "null"}]},
                    "status": {"type": "string", "enum": ["Draft", "Published"]},
                    "kind": {"type": "string", "const": "document"}
                },
                "required": ["id", "lines", "kind"],
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn implementations_become_polymorphic_variants() {
        let src = r#"{
            "types": {
                "Shape": {
                    "kind": "object",
                    "discriminator": "kind",
                    "implementations": [{ "type": "Circle" }, { "type": "Square", "discriminator": "box" }]
                },
                "Circle": { "kind": "object", "properties": [{ "name": "radius", "type": "number" }] },
                "Square": { "kind": "object", "properties": [{ "name": "side", "type": "number" }] }
            }
        }"#;
        let file = TypeFile::parse(src).unwrap();
        let shape = file.describe(&TypeKey::new("Shape")).unwrap();
        let polymorphism = shape.as_object().unwrap().polymorphism.as_ref().unwrap();
        assert_eq!(polymorphism.discriminator_name, "kind");
        let values: Vec<_> = polymorphism.variants.iter().map(|v| v.discriminator.as_deref()).collect();
        assert_eq!(values, vec![Some("Circle"), Some("box")]);
    }

    #[test]
    fn malformed_files_report_their_json_path() {
        let src = r#"{ "types": { "Doc": { "kind": "object", "properties": [{ "name": "x", "type": "Line[" }] } } }"#;
        let err = TypeFile::parse(src).unwrap_err().to_string();
        assert!(err.contains("types.Doc"), "{err}");
        assert!(err.contains("invalid type expression"), "{err}");
    }

    #[test]
    fn invalid_declarations_are_rejected() {
        let both = r#"{ "types": { "A": { "kind": "object", "properties": [{ "name": "x", "type": "string", "const": 1 }] } } }"#;
        assert!(matches!(TypeFile::parse(both), Err(SchemaError::Configuration(_))));

        let cycle = r#"{ "types": { "A": { "kind": "alias", "type": "B[]" }, "B": { "kind": "alias", "type": "A?" } } }"#;
        assert!(matches!(TypeFile::parse(cycle), Err(SchemaError::Configuration(msg)) if msg.contains("itself")));

        let missing_root = r#"{ "root": "Nope", "types": {} }"#;
        assert!(matches!(TypeFile::parse(missing_root), Err(SchemaError::UnknownType(_))));

        let shadow = r#"{ "types": { "string": { "kind": "enum", "values": [] } } }"#;
        assert!(TypeFile::parse(shadow).is_err());
    }

    #[test]
    fn alias_to_an_undeclared_type_names_the_target() {
        let src = r#"{ "types": { "Ids": { "kind": "alias", "type": "Identifier[]?" } } }"#;
        let err = TypeFile::parse(src).unwrap_err();
        assert!(matches!(&err, SchemaError::UnknownType(key) if key.as_str() == "Identifier"), "{err}");

        let chained = r#"{ "types": { "A": { "kind": "alias", "type": "B" }, "B": { "kind": "alias", "type": "uuid[]" } } }"#;
        let file = TypeFile::parse(chained).unwrap();
        assert!(matches!(file.describe(&TypeKey::new("A")).unwrap().kind, TypeKind::Array(_)));
    }
}
