//! Top-level generation pipeline.
//!
//! build → count references → resolve the root → render → transform → validate.
//! Every call owns a fresh [`BuildContext`]; generators hold no per-call state
//! and can be shared across threads when their builder and provider allow it.
use std::fmt;

use serde_json::Value;

use crate::builder::{BuildContext, DefaultSchemaBuilder, SchemaBuilder};
use crate::catalog::DerivedTypeCatalog;
use crate::descriptor::{Describe, TypeDescriptor, TypeKey, TypeProvider, TypeRef};
use crate::error::{Result, SchemaError};
use crate::fluent::FluentSchemaBuilder;
use crate::node::SchemaNode;
use crate::options::SchemaOptions;
use crate::refcount::count_references;
use crate::serializer::render_document;

const ROOT_KEYWORDS: [&str; 3] = ["type", "anyOf", "$ref"];

/// A finished JSON Schema document.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument(Value);

impl SchemaDocument {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn to_json_pretty(&self) -> String {
        format!("{:#}", self.0)
    }
}

impl fmt::Display for SchemaDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct SchemaGenerator<'p, B = DefaultSchemaBuilder> {
    builder: B,
    provider: Option<&'p dyn TypeProvider>,
    catalog: Option<&'p DerivedTypeCatalog>,
}

impl SchemaGenerator<'_> {
    pub fn new() -> Self {
        Self::with_builder(DefaultSchemaBuilder)
    }
}

impl Default for SchemaGenerator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p, B: SchemaBuilder> SchemaGenerator<'p, B> {
    pub fn with_builder(builder: B) -> Self {
        Self { builder, provider: None, catalog: None }
    }

    pub fn with_provider(mut self, provider: &'p dyn TypeProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_catalog(mut self, catalog: &'p DerivedTypeCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn generate<T: Describe + ?Sized>(&self, options: &SchemaOptions) -> Result<SchemaDocument> {
        self.generate_ref(&TypeRef::of::<T>(), options)
    }

    pub fn generate_descriptor(&self, ty: &TypeDescriptor, options: &SchemaOptions) -> Result<SchemaDocument> {
        self.generate_ref(&TypeRef::inline(ty.clone()), options)
    }

    /// Generate for a type known only to the configured [`TypeProvider`].
    pub fn generate_named(&self, key: &TypeKey, options: &SchemaOptions) -> Result<SchemaDocument> {
        self.generate_ref(&TypeRef::Named { key: key.clone(), nullable: false }, options)
    }

    /// Assemble the root node by hand; the rest of the pipeline is unchanged.
    pub fn build(
        &self,
        options: &SchemaOptions,
        root: impl FnOnce(&mut FluentSchemaBuilder<'_, '_, B>) -> Result<SchemaNode>,
    ) -> Result<SchemaDocument> {
        let mut ctx = self.context(options);
        let node = root(&mut FluentSchemaBuilder::new(&self.builder, &mut ctx))?;
        finish(&node, &ctx, options)
    }

    fn generate_ref(&self, ty: &TypeRef, options: &SchemaOptions) -> Result<SchemaDocument> {
        let mut ctx = self.context(options);
        let descriptor = ctx.resolve(ty)?;
        tracing::debug!(ty = %descriptor.key, "generating schema");
        let root = self.builder.build_schema(&descriptor, &mut ctx)?;
        finish(&root, &ctx, options)
    }

    fn context<'s>(&'s self, options: &'s SchemaOptions) -> BuildContext<'s> {
        let mut ctx = BuildContext::new(options);
        if let Some(provider) = self.provider {
            ctx = ctx.with_provider(provider);
        }
        if let Some(catalog) = self.catalog {
            ctx = ctx.with_catalog(catalog);
        }
        ctx
    }
}

fn finish(root: &SchemaNode, ctx: &BuildContext<'_>, options: &SchemaOptions) -> Result<SchemaDocument> {
    tracing::debug!(definitions = ctx.definitions.len(), "schema tree built");
    count_references(root, &ctx.definitions)?;
    let mut document = render_document(root, &ctx.definitions, options)?;

    if let Some(transformer) = &options.transformer {
        document = transformer.transform(document);
        check_root_document(&document)?;
        tracing::debug!("transformer applied");
    }
    if let Some(validator) = &options.validator {
        let violations = validator.validate(&document);
        if !violations.is_empty() {
            tracing::debug!(violations = violations.len(), "document rejected");
            return Err(SchemaError::Validation(violations));
        }
    }
    Ok(SchemaDocument(document))
}

/// A root document is an object carrying exactly one of `type`, `anyOf`, `$ref`.
fn check_root_document(document: &Value) -> Result<()> {
    let Value::Object(map) = document else {
        return Err(SchemaError::Configuration(format!("expected an object, found `{document}`")));
    };
    let present: Vec<_> = ROOT_KEYWORDS.iter().filter(|k| map.contains_key(**k)).collect();
    if present.len() != 1 {
        return Err(SchemaError::Configuration(format!(
            "expected exactly one of `type`, `anyOf`, `$ref` at the root, found {}",
            present.len()
        )));
    }
    Ok(())
}
