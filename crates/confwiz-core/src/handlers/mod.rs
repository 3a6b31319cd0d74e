//! Type handlers
//!
//! A [`TypeHandler`] owns one type shape end to end: whether it applies to a
//! field, how to ask for a value, and how that value maps to and from
//! document primitives. Handlers are tried in [`TypeHandlerRegistry`] order;
//! wrapper handlers (optional, union, collections, nested schemas) re-enter
//! the registry for their branches.

mod choice;
mod collections;
mod nested;
mod registry;
mod scalar;
mod temporal;
mod wrappers;

use std::fmt;
use std::rc::Rc;

use confwiz_schema::{SchemaResolutionError, Value};
use serde_yaml::Value as Yaml;

use crate::error::{DecodeError, Result, SerializationError, UnsupportedTypeError, WizardError};
use crate::introspection::{FieldSpec, Introspector};
use crate::prompt::PromptEngine;
use crate::validation::Materializer;

pub use choice::{EnumHandler, LiteralHandler};
pub use collections::{ListHandler, MappingHandler, SetHandler};
pub use nested::NestedHandler;
pub use registry::TypeHandlerRegistry;
pub use scalar::{BoolHandler, DecimalHandler, FloatHandler, IntHandler, StrHandler};
pub use temporal::TemporalHandler;
pub use wrappers::{OptionalHandler, UnionHandler};

/// Prompting and canonical conversion for one type shape
pub trait TypeHandler: Send + Sync + fmt::Debug {
    /// Handler name, for logs and listings
    fn name(&self) -> &'static str;

    /// Check if this handler applies to a field
    ///
    /// Must be pure and total.
    fn can_handle(&self, spec: &FieldSpec) -> bool;

    /// Ask the user for a value
    ///
    /// `current` is the value shown as the default: a previously entered or
    /// loaded value, else the schema default.
    ///
    /// # Errors
    /// Returns error if the terminal fails, the user cancels, or a branch
    /// cannot be dispatched.
    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value>;

    /// Convert a value to a document primitive
    ///
    /// # Errors
    /// Returns error if the value does not fit the field.
    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError>;

    /// Convert a document primitive back to a value
    ///
    /// # Errors
    /// Returns error if the primitive is not one `serialize` produces.
    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError>;
}

/// What handlers need to convert branch values
#[derive(Debug, Clone, Copy)]
pub struct CodecContext<'a> {
    registry: &'a TypeHandlerRegistry,
    introspector: &'a Introspector<'a>,
}

impl<'a> CodecContext<'a> {
    /// Create new context
    #[inline]
    #[must_use]
    pub fn new(registry: &'a TypeHandlerRegistry, introspector: &'a Introspector<'a>) -> Self {
        Self {
            registry,
            introspector,
        }
    }

    /// Handler registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &'a TypeHandlerRegistry {
        self.registry
    }

    /// Session introspector
    #[inline]
    #[must_use]
    pub fn introspector(&self) -> &'a Introspector<'a> {
        self.introspector
    }

    /// Serialize through the handler selected for `spec`
    ///
    /// # Errors
    /// Returns error if no handler applies or the handler rejects the value.
    pub fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
    ) -> std::result::Result<Yaml, SerializationError> {
        self.registry.select(spec)?.serialize(spec, value, self)
    }

    /// Deserialize through the handler selected for `spec`
    ///
    /// # Errors
    /// Returns error if no handler applies or the handler rejects the primitive.
    pub fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
    ) -> std::result::Result<Value, DecodeError> {
        self.registry.select(spec)?.deserialize(spec, raw, self)
    }

    /// Field descriptors of a nested schema
    ///
    /// # Errors
    /// Returns error if the schema does not resolve.
    pub fn fields_of(
        &self,
        schema: &str,
    ) -> std::result::Result<Rc<[FieldSpec]>, SchemaResolutionError> {
        self.introspector.fields_of(schema)
    }

    /// Check if a value satisfies a field exactly, without coercion
    #[must_use]
    pub fn conforms(&self, spec: &FieldSpec, value: &Value) -> bool {
        Materializer::new(self.introspector).conforms(spec, value)
    }
}

/// Document primitive for a scalar value
pub(crate) fn scalar_yaml(value: &Value) -> Option<Yaml> {
    match value {
        Value::Null => Some(Yaml::Null),
        Value::Bool(b) => Some(Yaml::Bool(*b)),
        Value::Int(i) => Some(Yaml::Number((*i).into())),
        Value::Float(f) => Some(Yaml::Number((*f).into())),
        Value::Str(s) => Some(Yaml::String(s.clone())),
        Value::Enum { value, .. } => scalar_yaml(value),
        _ => None,
    }
}

pub(crate) fn kind_mismatch(spec: &FieldSpec, value: &Value) -> SerializationError {
    SerializationError::KindMismatch {
        field: spec.name.clone(),
        expected: spec.type_name(),
        found: value.type_label().to_string(),
    }
}

/// A handler was asked for a field shape it cannot work with
pub(crate) fn unsupported(spec: &FieldSpec) -> WizardError {
    UnsupportedTypeError {
        field: spec.name.clone(),
        type_name: spec.type_name(),
    }
    .into()
}

/// Text shown as the default for a scalar prompt
pub(crate) fn default_text(current: Option<&Value>) -> Option<String> {
    current.filter(|v| !v.is_null()).map(Value::render)
}
