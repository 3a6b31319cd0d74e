//! Error types for the wizard
//!
//! [`WizardError`] is what every session operation returns. Validation
//! failures are plain data ([`Violations`]) until the fix loop gives up on
//! them.

use std::fmt::{self, Display, Formatter};

use confwiz_schema::{FieldPath, SchemaError, SchemaResolutionError};

/// Main wizard error type
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WizardError {
    /// No handler accepts a field's type
    #[error(transparent)]
    UnsupportedType(#[from] UnsupportedTypeError),

    /// Validation still failed after the configured number of fix rounds
    #[error("configuration still invalid after {attempts} fix attempt(s):\n{violations}")]
    RetryExhausted {
        /// Fix rounds performed
        attempts: u32,
        /// Violations from the last validation
        violations: Violations,
    },

    /// User chose not to fix reported violations
    #[error("validation failed and fixes were declined:\n{violations}")]
    FixDeclined {
        /// Violations the user declined to fix
        violations: Violations,
    },

    /// Schema name could not be resolved
    #[error("schema resolution failed: {0}")]
    SchemaResolution(#[from] SchemaResolutionError),

    /// Schema or catalog definition is malformed
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Value could not be converted to its canonical form
    #[error("serialization failed: {0}")]
    Serialization(#[from] SerializationError),

    /// Document could not be read or written
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Wizard settings are invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Terminal interaction failed
    #[error("terminal error: {0}")]
    Terminal(#[from] TerminalError),

    /// Nested schemas went deeper than allowed
    #[error("nesting deeper than {limit} levels at '{path}'")]
    RecursionLimit {
        /// Breadcrumb where the limit was hit
        path: String,
        /// Configured limit
        limit: usize,
    },

    /// User cancelled
    #[error("cancelled by user")]
    Cancelled,
}

impl WizardError {
    /// Check if the user cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Violations carried by validation outcomes
    #[must_use]
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            Self::RetryExhausted { violations, .. } | Self::FixDeclined { violations } => {
                Some(violations)
            }
            _ => None,
        }
    }
}

/// One failed validation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Location of the offending value
    pub path: FieldPath,
    /// What is wrong with it
    pub reason: String,
}

impl Violation {
    /// Create new violation
    #[inline]
    #[must_use]
    pub fn new(path: FieldPath, reason: impl Into<String>) -> Self {
        Self {
            path,
            reason: reason.into(),
        }
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.reason)
        } else {
            write!(f, "{}: {}", self.path, self.reason)
        }
    }
}

/// Non-empty list of violations from one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    /// Wrap a list of violations
    #[inline]
    #[must_use]
    pub fn new(violations: Vec<Violation>) -> Self {
        Self(violations)
    }

    /// Number of violations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over violations
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    /// Violations at exactly `path`
    pub fn at<'a>(&'a self, path: &'a FieldPath) -> impl Iterator<Item = &'a Violation> {
        self.0.iter().filter(move |v| &v.path == path)
    }
}

impl Display for Violations {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "  {violation}")?;
        }
        Ok(())
    }
}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// No registered handler accepts a field
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("no handler for field '{field}' of type '{type_name}'")]
pub struct UnsupportedTypeError {
    /// Field name
    pub field: String,
    /// Declared type, as displayed
    pub type_name: String,
}

/// Errors converting values to document primitives
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SerializationError {
    /// No handler for a field
    #[error(transparent)]
    Unsupported(#[from] UnsupportedTypeError),

    /// Value kind does not fit the field
    #[error("field '{field}': expected {expected}, found {found}")]
    KindMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// Union value matches none of the branches
    #[error("field '{field}': value matches no branch of {type_name}")]
    NoMatchingBranch { field: String, type_name: String },

    /// Mapping key serialized to a non-scalar
    #[error("field '{field}': mapping keys must be scalars")]
    NonScalarKey { field: String },

    /// Nested schema lookup failed
    #[error(transparent)]
    Schema(#[from] SchemaResolutionError),

    /// YAML emission failed
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Typed conversion failed
    #[error("typed conversion: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors converting document primitives to typed values
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// No handler for a field
    #[error(transparent)]
    Unsupported(#[from] UnsupportedTypeError),

    /// Primitive does not fit the field
    #[error("field '{field}': expected {expected}, found {found}")]
    Mismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// Nested mapping has a key the schema does not declare
    #[error("field '{field}': unknown key '{key}'")]
    UnknownField { field: String, key: String },

    /// Nested schema lookup failed
    #[error(transparent)]
    Schema(#[from] SchemaResolutionError),
}

impl DecodeError {
    /// Mismatch between a field's expected type and a primitive
    #[must_use]
    pub fn mismatch(field: &str, expected: impl Display, raw: &serde_yaml::Value) -> Self {
        Self::Mismatch {
            field: field.to_string(),
            expected: expected.to_string(),
            found: yaml_kind(raw).to_string(),
        }
    }
}

pub(crate) fn yaml_kind(raw: &serde_yaml::Value) -> &'static str {
    use serde_yaml::Value as Yaml;
    match raw {
        Yaml::Null => "null",
        Yaml::Bool(_) => "bool",
        Yaml::Number(n) if n.is_f64() => "float",
        Yaml::Number(_) => "int",
        Yaml::String(_) => "string",
        Yaml::Sequence(_) => "sequence",
        Yaml::Mapping(_) => "mapping",
        Yaml::Tagged(_) => "tagged value",
    }
}

/// Errors interacting with the terminal
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TerminalError {
    /// Underlying I/O failed
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Answer shape does not fit the question
    #[error("unexpected answer for '{field}': expected {expected}")]
    UnexpectedAnswer { field: String, expected: String },

    /// Scripted answers ran out
    #[error("no answer available for '{field}'")]
    Exhausted { field: String },
}

/// Errors reading or writing configuration documents
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DocumentError {
    /// File could not be read or written
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Text is not valid YAML
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Top level is not a mapping
    #[error("document must be a mapping")]
    NotAMapping,

    /// Metadata header is malformed
    #[error("invalid _metadata section: {0}")]
    InvalidMetadata(String),

    /// Configuration section is present but not a mapping
    #[error("configuration section must be a mapping, found {0}")]
    InvalidConfiguration(&'static str),

    /// No schema named by the document or the caller
    #[error("document does not name its schema (pass one explicitly)")]
    MissingSchema,
}

/// Errors loading wizard settings
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Settings file could not be read
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML for the settings layout
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting has an unusable value
    #[error("invalid setting '{key}': {message}")]
    Invalid { key: String, message: String },
}

/// Result type for wizard operations
pub type Result<T, E = WizardError> = std::result::Result<T, E>;
