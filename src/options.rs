//! Dialect configuration.
//!
//! JSON Schema consumers disagree on how to spell nullability, constants and
//! recursive roots. [`SchemaOptions`] bundles those choices together with the
//! naming and required-property policies and the optional post-build hooks.
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::descriptor::{Presence, PropertyDescriptor, TypeDescriptor};
use crate::error::Violation;
use crate::naming::NamingPolicy;
use crate::validation::StrictDialectValidator;

// ————————————————————————————————————————————————————————————————————————————
// DIALECT POLICIES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum NullableMode {
    /// `"nullable": true` next to the type.
    #[default]
    Nullable,
    /// `"type": [T, "null"]` for scalars, `anyOf` with a null schema for composites.
    Default,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ConstMode {
    /// `"const": value`
    #[default]
    Default,
    /// `"enum": [value]`
    Enum,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum RootMode {
    /// Copy the root definition's body to the top level; its self-references point at `#`.
    #[default]
    InlineDuplication,
    /// Flag the root definition; every reference to it becomes `#`.
    RootRecursion,
}

type RequiredFn = dyn Fn(&PropertyDescriptor, &TypeDescriptor) -> bool + Send + Sync;

/// Decides whether a property lands in its object's `required` list.
#[derive(Clone, Default)]
pub enum RequiredPolicy {
    /// Explicitly required, or neither optional nor nullable.
    #[default]
    Default,
    All,
    Custom(Arc<RequiredFn>),
}

impl RequiredPolicy {
    pub fn custom(f: impl Fn(&PropertyDescriptor, &TypeDescriptor) -> bool + Send + Sync + 'static) -> Self {
        RequiredPolicy::Custom(Arc::new(f))
    }

    /// `property_type` is the resolved descriptor of the property's type.
    pub fn is_required(&self, property: &PropertyDescriptor, property_type: &TypeDescriptor) -> bool {
        match self {
            RequiredPolicy::Default => match property.presence {
                Presence::Required => true,
                Presence::Optional => false,
                Presence::Default => !property_type.nullable,
            },
            RequiredPolicy::All => true,
            RequiredPolicy::Custom(f) => f(property, property_type),
        }
    }
}

impl fmt::Debug for RequiredPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequiredPolicy::Default => f.write_str("Default"),
            RequiredPolicy::All => f.write_str("All"),
            RequiredPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// HOOKS
// ————————————————————————————————————————————————————————————————————————————

/// Rewrites an assembled document. The result must still be a root schema.
pub trait SchemaTransformer: Send + Sync {
    fn transform(&self, document: Value) -> Value;
}

/// Inspects an assembled document; any violation fails the build.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, document: &Value) -> Vec<Violation>;
}

impl<F> SchemaTransformer for F
where
    F: Fn(Value) -> Value + Send + Sync,
{
    fn transform(&self, document: Value) -> Value {
        self(document)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// OPTIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone)]
pub struct SchemaOptions {
    pub nullable_mode: NullableMode,
    pub const_mode: ConstMode,
    pub root_mode: RootMode,
    /// Gates `format` for date/time/identifier scalars.
    pub format_supported: bool,
    pub naming: NamingPolicy,
    pub required: RequiredPolicy,
    pub transformer: Option<Arc<dyn SchemaTransformer>>,
    pub validator: Option<Arc<dyn SchemaValidator>>,
}

impl SchemaOptions {
    /// Keyword nullability, `const`, inline root duplication, formats on.
    pub fn permissive() -> Self {
        Self {
            nullable_mode: NullableMode::Nullable,
            const_mode: ConstMode::Default,
            root_mode: RootMode::InlineDuplication,
            format_supported: true,
            naming: NamingPolicy::Identity,
            required: RequiredPolicy::Default,
            transformer: None,
            validator: None,
        }
    }

    /// No `nullable`, no `const`, no bare `$ref` root, no `format`; checked by
    /// [`StrictDialectValidator`].
    pub fn strict() -> Self {
        Self {
            nullable_mode: NullableMode::Default,
            const_mode: ConstMode::Enum,
            root_mode: RootMode::RootRecursion,
            format_supported: false,
            naming: NamingPolicy::Identity,
            required: RequiredPolicy::Default,
            transformer: None,
            validator: Some(Arc::new(StrictDialectValidator)),
        }
    }

    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_nullable_mode(mut self, mode: NullableMode) -> Self {
        self.nullable_mode = mode;
        self
    }

    pub fn with_const_mode(mut self, mode: ConstMode) -> Self {
        self.const_mode = mode;
        self
    }

    pub fn with_root_mode(mut self, mode: RootMode) -> Self {
        self.root_mode = mode;
        self
    }

    pub fn with_format_supported(mut self, supported: bool) -> Self {
        self.format_supported = supported;
        self
    }

    pub fn with_required(mut self, required: RequiredPolicy) -> Self {
        self.required = required;
        self
    }

    pub fn with_transformer(mut self, transformer: impl SchemaTransformer + 'static) -> Self {
        self.transformer = Some(Arc::new(transformer));
        self
    }

    pub fn with_validator(mut self, validator: impl SchemaValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn without_validator(mut self) -> Self {
        self.validator = None;
        self
    }
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self::permissive()
    }
}

impl fmt::Debug for SchemaOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaOptions")
            .field("nullable_mode", &self.nullable_mode)
            .field("const_mode", &self.const_mode)
            .field("root_mode", &self.root_mode)
            .field("format_supported", &self.format_supported)
            .field("naming", &self.naming)
            .field("required", &self.required)
            .field("transformer", &self.transformer.is_some())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}
