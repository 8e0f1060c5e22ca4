//! JSON Schema generation from type descriptors.
//!
//! A [`TypeDescriptor`] (from [`Describe`], a [`TypeProvider`] or a
//! [`type_file::TypeFile`]) is built into a tree of [`SchemaNode`]s whose
//! object types live in a per-call [`DefinitionCollection`]. Reference counts
//! decide which definitions are shared, and the serializer renders the tree
//! under the dialect chosen in [`SchemaOptions`].
//!
//! ```ignore
//! use json_typeschema::{SchemaGenerator, SchemaOptions};
//!
//! let document = SchemaGenerator::new().generate::<Order>(&SchemaOptions::strict())?;
//! println!("{}", document.to_json_pretty());
//! ```
pub mod builder;
pub mod catalog;
pub mod cli;
pub mod definitions;
pub mod descriptor;
pub mod error;
pub mod fluent;
pub mod generator;
pub mod naming;
pub mod node;
pub mod options;
pub mod refcount;
pub mod serializer;
pub mod type_file;
pub mod validation;

mod path_de;

pub use builder::{BuildContext, DefaultSchemaBuilder, SchemaBuilder};
pub use catalog::DerivedTypeCatalog;
pub use definitions::{DefId, Definition, DefinitionCollection};
pub use descriptor::{
    Describe, PolymorphismOptions, PropertyDescriptor, Scalar, TypeDescriptor, TypeKey, TypeProvider, TypeRef,
};
pub use error::{Result, SchemaError, Violation};
pub use fluent::{FluentObjectBuilder, FluentSchemaBuilder};
pub use generator::{SchemaDocument, SchemaGenerator};
pub use naming::NamingPolicy;
pub use node::{NodeKind, ObjectNode, PropertySchema, SchemaNode, TypeTag};
pub use options::{
    ConstMode, NullableMode, RequiredPolicy, RootMode, SchemaOptions, SchemaTransformer, SchemaValidator,
};
pub use validation::StrictDialectValidator;
