//! Structural descriptions of host types.
//!
//! A [`TypeDescriptor`] is what the builder consumes: the kind of a type
//! (object, array or scalar value), its identity, nullability, and for
//! objects the ordered properties and polymorphic variants. Descriptors are
//! plain data; Rust types supply them through [`Describe`], and other sources
//! (type files, registries) through [`TypeProvider`].
//!
//! Property types are held as [`TypeRef`]s rather than nested descriptors so
//! that self-referential types can be described without expanding forever.
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, SchemaError};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Type identity, usually a fully-qualified path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(String);

#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub key: TypeKey,
    pub nullable: bool,
    pub description: Option<String>,
    pub kind: TypeKind,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Object(ObjectDescriptor),
    Array(ArrayDescriptor),
    Value(ValueDescriptor),
}

#[derive(Debug, Clone, Default)]
pub struct ObjectDescriptor {
    pub properties: Vec<PropertyDescriptor>,
    pub polymorphism: Option<PolymorphismOptions>,
    /// Fixed discriminator carried by a concrete variant.
    pub discriminator: Option<Discriminator>,
    /// Interface-like type whose variants come from a derived-type catalog.
    pub is_abstract: bool,
}

#[derive(Debug, Clone)]
pub struct ArrayDescriptor {
    pub element: TypeRef,
}

#[derive(Debug, Clone)]
pub struct ValueDescriptor {
    pub scalar: Scalar,
    /// Marks a constant: the only legal value.
    pub literal: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    String,
    Char,
    Integer,
    Number,
    Boolean,
    DateTime,
    Date,
    Time,
    Uuid,
    /// Enumeration; member names before the naming policy is applied.
    Enum(Vec<String>),
    /// Opaque JSON pass-through.
    Json,
    /// Anything else. `string_like` types serialize through their string form.
    Custom { name: String, string_like: bool },
}

#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub name: String,
    pub ty: TypeRef,
    pub presence: Presence,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Presence {
    /// Required unless the property type is nullable.
    #[default]
    Default,
    Required,
    Optional,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    pub name: String,
    pub value: Value,
}

/// Concrete alternatives of a polymorphic object sharing one discriminator
/// property name.
#[derive(Debug, Clone)]
pub struct PolymorphismOptions {
    pub discriminator_name: String,
    pub variants: Vec<DerivedType>,
}

#[derive(Debug, Clone)]
pub struct DerivedType {
    pub key: TypeKey,
    pub ty: TypeRef,
    /// Discriminator literal; `None` leaves the variant untagged.
    pub discriminator: Option<String>,
}

/// A pointer from one descriptor to another.
#[derive(Clone)]
pub enum TypeRef {
    Inline(Box<TypeDescriptor>),
    /// Described on demand; breaks eager recursion for cyclic types.
    Deferred(fn() -> TypeDescriptor),
    /// Resolved through a [`TypeProvider`].
    Named { key: TypeKey, nullable: bool },
}

/// Supplies descriptors for named types.
pub trait TypeProvider {
    fn describe(&self, key: &TypeKey) -> Option<TypeDescriptor>;
}

/// Types that can describe their own JSON shape.
pub trait Describe {
    fn describe() -> TypeDescriptor;
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn of<T: ?Sized>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment without generic arguments: `app::Page<app::User>` → `Page`.
    pub fn simple_name(&self) -> &str {
        let base = match self.0.find('<') {
            Some(i) => &self.0[..i],
            None => &self.0,
        };
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl TypeDescriptor {
    pub fn object(key: TypeKey) -> Self {
        Self::new(key, TypeKind::Object(ObjectDescriptor::default()))
    }

    pub fn array(key: TypeKey, element: TypeRef) -> Self {
        Self::new(key, TypeKind::Array(ArrayDescriptor { element }))
    }

    pub fn value(key: TypeKey, scalar: Scalar) -> Self {
        Self::new(key, TypeKind::Value(ValueDescriptor { scalar, literal: None }))
    }

    /// A constant: the descriptor of the literal's natural scalar, pinned to it.
    pub fn constant(literal: impl Into<Value>) -> Self {
        let literal = literal.into();
        let scalar = match &literal {
            Value::Bool(_) => Scalar::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Scalar::Integer,
            Value::Number(_) => Scalar::Number,
            Value::String(_) => Scalar::String,
            Value::Null | Value::Array(_) | Value::Object(_) => Scalar::Json,
        };
        let key = TypeKey::new(scalar.type_name());
        Self::new(key, TypeKind::Value(ValueDescriptor { scalar, literal: Some(literal) }))
    }

    fn new(key: TypeKey, kind: TypeKind) -> Self {
        Self { key, nullable: false, description: None, kind }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        match &mut self.kind {
            TypeKind::Object(object) => object.properties.push(property),
            _ => tracing::warn!(ty = %self.key, property = %property.name, "property ignored on non-object descriptor"),
        }
        self
    }

    pub fn with_discriminator(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        match &mut self.kind {
            TypeKind::Object(object) => {
                object.discriminator = Some(Discriminator { name: name.into(), value: value.into() });
            }
            _ => tracing::warn!(ty = %self.key, "discriminator ignored on non-object descriptor"),
        }
        self
    }

    pub fn with_polymorphism(mut self, options: PolymorphismOptions) -> Self {
        match &mut self.kind {
            TypeKind::Object(object) => object.polymorphism = Some(options),
            _ => tracing::warn!(ty = %self.key, "polymorphism ignored on non-object descriptor"),
        }
        self
    }

    /// Mark an object as abstract so a derived-type catalog may supply its variants.
    pub fn abstract_type(mut self) -> Self {
        if let TypeKind::Object(object) = &mut self.kind {
            object.is_abstract = true;
        }
        self
    }

    pub fn as_object(&self) -> Option<&ObjectDescriptor> {
        match &self.kind {
            TypeKind::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl Scalar {
    fn type_name(&self) -> &str {
        match self {
            Scalar::String => "string",
            Scalar::Char => "char",
            Scalar::Integer => "integer",
            Scalar::Number => "number",
            Scalar::Boolean => "boolean",
            Scalar::DateTime => "date-time",
            Scalar::Date => "date",
            Scalar::Time => "time",
            Scalar::Uuid => "uuid",
            Scalar::Enum(_) => "enum",
            Scalar::Json => "any",
            Scalar::Custom { name, .. } => name.as_str(),
        }
    }
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self { name: name.into(), ty, presence: Presence::Default, description: None }
    }

    pub fn of<T: Describe + ?Sized>(name: impl Into<String>) -> Self {
        Self::new(name, TypeRef::of::<T>())
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl PolymorphismOptions {
    pub fn new(discriminator_name: impl Into<String>) -> Self {
        Self { discriminator_name: discriminator_name.into(), variants: Vec::new() }
    }

    pub fn variant<T: Describe>(mut self, discriminator: impl Into<String>) -> Self {
        self.variants.push(DerivedType {
            key: T::describe().key,
            ty: TypeRef::of::<T>(),
            discriminator: Some(discriminator.into()),
        });
        self
    }
}

impl TypeRef {
    pub fn of<T: Describe + ?Sized>() -> Self {
        TypeRef::Deferred(T::describe)
    }

    pub fn named(key: impl Into<String>) -> Self {
        TypeRef::Named { key: TypeKey::new(key), nullable: false }
    }

    pub fn inline(descriptor: TypeDescriptor) -> Self {
        TypeRef::Inline(Box::new(descriptor))
    }

    pub fn resolve(&self, provider: Option<&dyn TypeProvider>) -> Result<TypeDescriptor> {
        match self {
            TypeRef::Inline(descriptor) => Ok((**descriptor).clone()),
            TypeRef::Deferred(describe) => Ok(describe()),
            TypeRef::Named { key, nullable } => {
                let mut descriptor = provider
                    .and_then(|p| p.describe(key))
                    .ok_or_else(|| SchemaError::UnknownType(key.clone()))?;
                descriptor.nullable |= *nullable;
                Ok(descriptor)
            }
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Inline(descriptor) => f.debug_tuple("Inline").field(&descriptor.key).finish(),
            TypeRef::Deferred(_) => f.write_str("Deferred(..)"),
            TypeRef::Named { key, nullable } => {
                f.debug_struct("Named").field("key", key).field("nullable", nullable).finish()
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// STANDARD IMPLEMENTATIONS
// ————————————————————————————————————————————————————————————————————————————

macro_rules! describe_scalar {
    ($scalar:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::value(TypeKey::of::<$ty>(), $scalar)
                }
            }
        )+
    };
}

describe_scalar!(Scalar::String => String, str);
describe_scalar!(Scalar::Char => char);
describe_scalar!(Scalar::Boolean => bool);
describe_scalar!(Scalar::Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
describe_scalar!(Scalar::Number => f32, f64);
describe_scalar!(Scalar::Json => Value);
describe_scalar!(Scalar::DateTime => chrono::NaiveDateTime);
describe_scalar!(Scalar::Date => chrono::NaiveDate);
describe_scalar!(Scalar::Time => chrono::NaiveTime);

impl<Tz: chrono::TimeZone> Describe for chrono::DateTime<Tz> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::value(TypeKey::of::<Self>(), Scalar::DateTime)
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescriptor {
        T::describe().nullable()
    }
}

macro_rules! describe_transparent {
    ($($ty:ident),+) => {
        $(
            impl<T: Describe + ?Sized> Describe for $ty<T> {
                fn describe() -> TypeDescriptor {
                    T::describe()
                }
            }
        )+
    };
}

describe_transparent!(Box, Rc, Arc);

impl<T: Describe + ?Sized> Describe for &T {
    fn describe() -> TypeDescriptor {
        T::describe()
    }
}

macro_rules! describe_sequence {
    ($($ty:ty),+) => {
        $(
            impl<T: Describe> Describe for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::array(TypeKey::of::<Self>(), TypeRef::of::<T>())
                }
            }
        )+
    };
}

describe_sequence!(Vec<T>, [T], VecDeque<T>, BTreeSet<T>, HashSet<T>);

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::array(TypeKey::of::<Self>(), TypeRef::of::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Node;

    impl Describe for Node {
        fn describe() -> TypeDescriptor {
            TypeDescriptor::object(TypeKey::of::<Self>())
                .with_property(PropertyDescriptor::of::<i32>("id"))
                .with_property(PropertyDescriptor::of::<Option<Node>>("next"))
        }
    }

    struct Catalog(Vec<TypeDescriptor>);

    impl TypeProvider for Catalog {
        fn describe(&self, key: &TypeKey) -> Option<TypeDescriptor> {
            self.0.iter().find(|d| &d.key == key).cloned()
        }
    }

    #[test]
    fn simple_name_strips_path_and_generics() {
        assert_eq!(TypeKey::new("app::models::Page<app::User>").simple_name(), "Page");
        assert_eq!(TypeKey::new("Document").simple_name(), "Document");
    }

    #[test]
    fn self_referential_type_describes_lazily() {
        let node = Node::describe();
        let object = node.as_object().unwrap();
        assert_eq!(object.properties.len(), 2);
        let next = object.properties[1].ty.resolve(None).unwrap();
        assert!(next.nullable);
        assert_eq!(next.key, node.key);
    }

    #[test]
    fn option_and_containers_map_to_expected_kinds() {
        assert!(Option::<String>::describe().nullable);
        assert!(matches!(Vec::<u8>::describe().kind, TypeKind::Array(_)));
        assert!(matches!(<[bool; 3]>::describe().kind, TypeKind::Array(_)));
        let TypeKind::Value(v) = chrono::NaiveDate::describe().kind else { panic!("value") };
        assert_eq!(v.scalar, Scalar::Date);
    }

    #[test]
    fn constants_pick_their_natural_scalar() {
        let TypeKind::Value(v) = TypeDescriptor::constant("meta").kind else { panic!("value") };
        assert_eq!(v.scalar, Scalar::String);
        assert_eq!(v.literal, Some(Value::from("meta")));
        let TypeKind::Value(v) = TypeDescriptor::constant(3).kind else { panic!("value") };
        assert_eq!(v.scalar, Scalar::Integer);
    }

    #[test]
    fn named_refs_resolve_through_provider() {
        let provider = Catalog(vec![TypeDescriptor::object(TypeKey::new("Line"))]);
        let named = TypeRef::Named { key: TypeKey::new("Line"), nullable: true };
        let resolved = named.resolve(Some(&provider)).unwrap();
        assert!(resolved.nullable);

        let missing = TypeRef::named("Nope").resolve(Some(&provider));
        assert!(matches!(missing, Err(SchemaError::UnknownType(k)) if k.as_str() == "Nope"));
        assert!(TypeRef::named("Line").resolve(None).is_err());
    }
}
