//! Schema and field definitions

use serde::de::DeserializeOwned;

use crate::constraints::Constraints;
use crate::error::SchemaError;
use crate::types::{simple_name, TypeExpr};
use crate::value::Value;

/// Declared field of a schema
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name, unique within its schema
    pub name: String,
    /// Declared type
    pub ty: TypeExpr,
    /// Default value, if any
    pub default: Option<Value>,
    /// Human description shown when prompting
    pub description: Option<String>,
    /// Field-level constraints
    pub constraints: Constraints,
    /// Whether the field is supplied by the user (false for computed fields)
    pub init: bool,
}

impl FieldDef {
    /// Create new field without default
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            description: None,
            constraints: Constraints::default(),
            init: true,
        }
    }

    /// Set default value
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace constraints
    #[must_use]
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Inclusive lower bound
    #[must_use]
    pub fn ge(mut self, bound: impl Into<bigdecimal::BigDecimal>) -> Self {
        self.constraints.ge = Some(bound.into());
        self
    }

    /// Exclusive lower bound
    #[must_use]
    pub fn gt(mut self, bound: impl Into<bigdecimal::BigDecimal>) -> Self {
        self.constraints.gt = Some(bound.into());
        self
    }

    /// Inclusive upper bound
    #[must_use]
    pub fn le(mut self, bound: impl Into<bigdecimal::BigDecimal>) -> Self {
        self.constraints.le = Some(bound.into());
        self
    }

    /// Exclusive upper bound
    #[must_use]
    pub fn lt(mut self, bound: impl Into<bigdecimal::BigDecimal>) -> Self {
        self.constraints.lt = Some(bound.into());
        self
    }

    /// Minimum length
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.constraints.min_length = Some(len);
        self
    }

    /// Maximum length
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.constraints.max_length = Some(len);
        self
    }

    /// Pattern for text values
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.constraints.pattern = Some(pattern.into());
        self
    }

    /// Mark as computed: never prompted, filled from its default
    #[must_use]
    pub fn computed(mut self) -> Self {
        self.init = false;
        self
    }
}

/// Named configuration schema
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDef {
    name: String,
    description: Option<String>,
    fields: Vec<FieldDef>,
}

impl SchemaDef {
    /// Start building a schema with a fully-qualified name
    #[inline]
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            description: None,
            fields: Vec::new(),
        }
    }

    /// Fully-qualified name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last segment of the name
    #[inline]
    #[must_use]
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    /// Description, if any
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Fields in declaration order
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Find field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Builder for [`SchemaDef`]
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    description: Option<String>,
    fields: Vec<FieldDef>,
}

impl SchemaBuilder {
    /// Set description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a field
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Finish the schema
    ///
    /// # Errors
    /// Returns error if the name is not a dotted identifier path, a field name
    /// is invalid or repeated, or a pattern constraint does not compile.
    pub fn build(self) -> Result<SchemaDef, SchemaError> {
        if !is_qualified_name(&self.name) {
            return Err(SchemaError::InvalidName(self.name));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if !is_identifier(&field.name) {
                return Err(SchemaError::InvalidFieldName {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            if let Some(pattern) = &field.constraints.pattern {
                regex::Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                    source,
                })?;
            }
        }
        Ok(SchemaDef {
            name: self.name,
            description: self.description,
            fields: self.fields,
        })
    }
}

/// Rust type that carries its own schema
///
/// Lets a validated configuration convert into the caller's typed struct.
pub trait ConfigSchema: DeserializeOwned {
    /// Schema describing this type
    ///
    /// # Errors
    /// Returns error if the schema definition is malformed.
    fn schema() -> Result<SchemaDef, SchemaError>;
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

pub(crate) fn is_qualified_name(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_field_order() {
        let schema = SchemaDef::builder("app.config.ServerConfig")
            .description("Server settings")
            .field(FieldDef::new("host", TypeExpr::Str).with_default("localhost"))
            .field(FieldDef::new("port", TypeExpr::Int).ge(1).le(65535))
            .field(FieldDef::new("debug", TypeExpr::Bool).with_default(false))
            .build()
            .unwrap();

        let names: Vec<_> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["host", "port", "debug"]);
        assert_eq!(schema.simple_name(), "ServerConfig");
        assert_eq!(schema.description(), Some("Server settings"));
    }

    #[test]
    fn builder_rejects_duplicate_fields() {
        let result = SchemaDef::builder("app.A")
            .field(FieldDef::new("x", TypeExpr::Int))
            .field(FieldDef::new("x", TypeExpr::Str))
            .build();
        assert!(matches!(result, Err(SchemaError::DuplicateField { .. })));
    }

    #[test]
    fn builder_rejects_bad_names() {
        assert!(matches!(
            SchemaDef::builder("app..A").build(),
            Err(SchemaError::InvalidName(_))
        ));
        assert!(matches!(
            SchemaDef::builder("app.A")
                .field(FieldDef::new("bad-name", TypeExpr::Int))
                .build(),
            Err(SchemaError::InvalidFieldName { .. })
        ));
    }

    #[test]
    fn builder_rejects_invalid_pattern() {
        let result = SchemaDef::builder("app.A")
            .field(FieldDef::new("s", TypeExpr::Str).pattern("(unclosed"))
            .build();
        assert!(matches!(result, Err(SchemaError::InvalidPattern { .. })));
    }

    #[test]
    fn computed_fields_are_not_init() {
        let field = FieldDef::new("derived", TypeExpr::Int).with_default(0).computed();
        assert!(!field.init);
    }

    #[test]
    fn qualified_names() {
        assert!(is_qualified_name("a.b.C"));
        assert!(is_qualified_name("Single"));
        assert!(!is_qualified_name("a.b."));
        assert!(!is_qualified_name("a b"));
        assert!(!is_qualified_name(""));
    }
}
