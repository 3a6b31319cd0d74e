//! Error types for the schema model

use thiserror::Error;

/// Errors raised while constructing schemas and catalogs
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// Schema name is not a dotted identifier path
    #[error("invalid schema name '{0}' (expected dotted identifiers such as 'app.config.Server')")]
    InvalidName(String),

    /// Field name is not an identifier
    #[error("schema '{schema}': invalid field name '{field}'")]
    InvalidFieldName { schema: String, field: String },

    /// Two fields share a name
    #[error("schema '{schema}': duplicate field '{field}'")]
    DuplicateField { schema: String, field: String },

    /// A schema with this name was already registered
    #[error("schema '{0}' is already registered")]
    DuplicateSchema(String),

    /// An enumeration with this name was already registered
    #[error("enum '{0}' is already registered")]
    DuplicateEnum(String),

    /// Enumeration without members, or with unusable member values
    #[error("enum '{name}': {message}")]
    InvalidEnum { name: String, message: String },

    /// Pattern constraint does not compile
    #[error("schema '{schema}': field '{field}' has invalid pattern: {source}")]
    InvalidPattern {
        schema: String,
        field: String,
        #[source]
        source: regex::Error,
    },

    /// Default value does not fit the declared type
    #[error("schema '{schema}': field '{field}' has invalid default: {message}")]
    InvalidDefault {
        schema: String,
        field: String,
        message: String,
    },

    /// Type expression in a catalog file did not parse
    #[error("schema '{schema}': field '{field}': {source}")]
    Type {
        schema: String,
        field: String,
        #[source]
        source: TypeParseError,
    },

    /// Catalog file is not valid YAML for the catalog layout
    #[error("invalid catalog file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Catalog file could not be read
    #[error("failed to read catalog '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while resolving a schema name to its definition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaResolutionError {
    /// Name is not a dotted identifier path
    #[error("invalid schema name '{0}' (expected 'package.module.ClassName')")]
    InvalidName(String),

    /// No schema registered under the name
    #[error("schema '{name}' not found{}", suggestion_suffix(.suggestions))]
    NotFound {
        name: String,
        suggestions: Vec<String>,
    },

    /// A nested reference points at an unregistered schema
    #[error("schema '{from}' references unknown schema '{missing}'")]
    MissingReference { from: String, missing: String },

    /// Required nested fields form a cycle with no optional escape
    #[error("schema cycle through required fields: {}", .cycle.join(" -> "))]
    RequiredCycle { cycle: Vec<String> },
}

fn suggestion_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

/// Type expression text could not be parsed
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot parse type '{input}': {message}")]
pub struct TypeParseError {
    /// Text that failed to parse
    pub input: String,
    /// What went wrong
    pub message: String,
}

impl TypeParseError {
    /// Create new parse error
    #[inline]
    #[must_use]
    pub fn new(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            message: message.into(),
        }
    }
}

/// Errors related to field paths
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Invalid segment characters
    #[error("invalid segment: {0} (must be alphanumeric or underscore)")]
    InvalidSegment(String),
}
