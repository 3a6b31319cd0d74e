//! Canonical document form
//!
//! A configuration document is a YAML mapping with two sections:
//!
//! ```yaml
//! _metadata:
//!   model_type: DatabaseConfig
//!   configuration_class: myapp.config.DatabaseConfig
//!   version: 0.1.0
//! configuration:
//!   port: 5432
//! ```
//!
//! Values are written through the handler selected for each field, so the
//! canonical forms (quoted decimals, sorted sets, ISO 8601 temporals, enum
//! values) live with the handlers.

use std::sync::Arc;

use confwiz_schema::{iso8601, Record, SchemaDef, Value};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value as Yaml};
use tracing::{debug, warn};

use crate::error::{yaml_kind, DocumentError, Result, SerializationError};
use crate::handlers::CodecContext;
use crate::introspection::FieldSpec;

/// Key of the header section
pub const METADATA_KEY: &str = "_metadata";

/// Key of the data section
pub const CONFIGURATION_KEY: &str = "configuration";

/// Document header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Display name of the configuration
    #[serde(default)]
    pub model_type: String,
    /// Fully-qualified schema name
    #[serde(default)]
    pub configuration_class: String,
    /// Format version that wrote the document
    #[serde(default)]
    pub version: String,
}

/// A document read back into typed values
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    /// Header, when the document carries one
    pub metadata: Option<DocumentMetadata>,
    /// Schema the data was decoded against
    pub schema: Arc<SchemaDef>,
    /// Decoded, not yet validated, data
    pub data: Record,
}

impl LoadedDocument {
    /// Model type from the header, falling back to the schema name
    #[must_use]
    pub fn model_type(&self) -> &str {
        self.metadata
            .as_ref()
            .map(|m| m.model_type.as_str())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.schema.simple_name())
    }
}

/// Converts records to and from the canonical document form
#[derive(Debug, Clone)]
pub struct CanonicalCodec<'a> {
    cx: CodecContext<'a>,
    format_version: String,
}

impl<'a> CanonicalCodec<'a> {
    /// Create new codec writing the crate version into headers
    #[must_use]
    pub fn new(cx: CodecContext<'a>) -> Self {
        Self {
            cx,
            format_version: crate::VERSION.to_string(),
        }
    }

    /// With a different header version
    #[must_use]
    pub fn with_format_version(mut self, version: impl Into<String>) -> Self {
        self.format_version = version.into();
        self
    }

    /// Build a document whose model type is the schema's simple name
    ///
    /// # Errors
    /// Returns error if a value does not fit its field.
    pub fn to_document(
        &self,
        data: &Record,
        schema: &SchemaDef,
    ) -> Result<Yaml, SerializationError> {
        self.to_document_as(data, schema, schema.simple_name())
    }

    /// Build a document with an explicit model type
    ///
    /// # Errors
    /// Returns error if a value does not fit its field.
    pub fn to_document_as(
        &self,
        data: &Record,
        schema: &SchemaDef,
        model_type: &str,
    ) -> Result<Yaml, SerializationError> {
        let metadata = DocumentMetadata {
            model_type: model_type.to_string(),
            configuration_class: schema.name().to_string(),
            version: self.format_version.clone(),
        };
        let specs = self.cx.fields_of(schema.name())?;
        let configuration = self.encode_record(&specs, data)?;

        let mut document = Mapping::new();
        document.insert(METADATA_KEY.into(), serde_yaml::to_value(&metadata)?);
        document.insert(CONFIGURATION_KEY.into(), Yaml::Mapping(configuration));
        Ok(Yaml::Mapping(document))
    }

    /// Fields in schema order; absent fields are left out
    fn encode_record(
        &self,
        specs: &[FieldSpec],
        data: &Record,
    ) -> Result<Mapping, SerializationError> {
        let mut mapping = Mapping::with_capacity(data.len());
        for spec in specs {
            if let Some(value) = data.get(&spec.name) {
                mapping.insert(Yaml::String(spec.name.clone()), self.cx.serialize(spec, value)?);
            }
        }
        Ok(mapping)
    }

    /// Read a document back
    ///
    /// `schema` overrides the schema named in the header. A missing
    /// configuration section reads as empty data. Values that do not decode
    /// as their field's type are kept untyped for validation to report;
    /// keys no field declares are dropped with a warning.
    ///
    /// # Errors
    /// Returns error if the document is malformed, names no schema, or the
    /// schema does not resolve.
    pub fn from_document(&self, doc: &Yaml, schema: Option<&str>) -> Result<LoadedDocument> {
        let Yaml::Mapping(top) = doc else {
            return Err(DocumentError::NotAMapping.into());
        };
        let metadata = top
            .get(METADATA_KEY)
            .filter(|raw| !raw.is_null())
            .map(|raw| {
                serde_yaml::from_value::<DocumentMetadata>(raw.clone())
                    .map_err(|e| DocumentError::InvalidMetadata(e.to_string()))
            })
            .transpose()?;

        let name = schema
            .or_else(|| metadata.as_ref().map(|m| m.configuration_class.as_str()))
            .filter(|name| !name.is_empty())
            .ok_or(DocumentError::MissingSchema)?;
        let resolved = self.cx.introspector().schema(name)?;
        let specs = self.cx.fields_of(name)?;

        let data = match top.get(CONFIGURATION_KEY) {
            None | Some(Yaml::Null) => Record::new(),
            Some(Yaml::Mapping(section)) => self.decode_record(&specs, section),
            Some(other) => return Err(DocumentError::InvalidConfiguration(yaml_kind(other)).into()),
        };
        Ok(LoadedDocument {
            metadata,
            schema: resolved,
            data,
        })
    }

    fn decode_record(&self, specs: &[FieldSpec], section: &Mapping) -> Record {
        for key in section.keys() {
            let known = key.as_str().is_some_and(|k| specs.iter().any(|s| s.name == k));
            if !known {
                let shown = Value::from_yaml(key).render();
                warn!(key = %shown, "ignoring unknown configuration key");
            }
        }
        let mut record = Record::with_capacity(section.len());
        for spec in specs {
            let Some(raw) = section.get(spec.name.as_str()) else {
                continue;
            };
            let value = self.cx.deserialize(spec, raw).unwrap_or_else(|error| {
                debug!(field = %spec.name, %error, "keeping raw value for validation");
                Value::from_yaml(raw)
            });
            record.insert(spec.name.clone(), value);
        }
        record
    }
}

/// JSON form of a value, for conversion into typed structs
///
/// Decimals and temporals become ISO or decimal text; enum members become
/// their underlying value; non-text mapping keys are rendered.
#[must_use]
pub fn to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::Decimal(d) => Json::String(d.to_string()),
        Value::Str(s) => Json::String(s.clone()),
        Value::DateTime(dt) => Json::String(iso8601::format_datetime(dt)),
        Value::ZonedDateTime(dt) => Json::String(iso8601::format_zoned(dt)),
        Value::Date(d) => Json::String(iso8601::format_date(d)),
        Value::Time(t) => Json::String(iso8601::format_time(t)),
        Value::Duration(d) => Json::String(iso8601::format_duration(d)),
        Value::Enum { value, .. } => to_json(value),
        Value::List(items) | Value::Set(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(k, v)| (k.render(), to_json(v)))
                .collect(),
        ),
        Value::Record(record) => Json::Object(
            record
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WizardError;
    use crate::handlers::{testing, TypeHandlerRegistry};
    use crate::introspection::Introspector;
    use bigdecimal::BigDecimal;
    use confwiz_schema::{FieldDef, SchemaCatalog, SchemaResolver, TypeExpr};
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn catalog() -> SchemaCatalog {
        let mut catalog = testing::catalog();
        catalog
            .register(
                SchemaDef::builder("tests.Config")
                    .field(FieldDef::new("label", TypeExpr::Str))
                    .field(
                        FieldDef::new("amount", TypeExpr::Decimal)
                            .with_default(BigDecimal::from_str("30.0").unwrap()),
                    )
                    .field(FieldDef::new("tags", TypeExpr::set(TypeExpr::Str)))
                    .field(FieldDef::new("inner", TypeExpr::schema("tests.InnerModel")))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        catalog
    }

    fn sample() -> Record {
        let mut inner = Record::new();
        inner.insert("name".into(), Value::Str("gear".into()));
        inner.insert("value".into(), Value::Int(7));
        let mut data = Record::new();
        data.insert("label".into(), Value::Str("main".into()));
        data.insert("amount".into(), Value::Decimal(BigDecimal::from_str("30.0").unwrap()));
        data.insert(
            "tags".into(),
            Value::set(["b", "a", "c"].map(Value::from)),
        );
        data.insert("inner".into(), Value::Record(inner));
        data
    }

    #[test]
    fn document_has_header_and_canonical_values() {
        let catalog = catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let codec = CanonicalCodec::new(CodecContext::new(&registry, &introspector))
            .with_format_version("1.2.3");
        let schema = catalog.resolve("tests.Config").unwrap();

        let doc = codec.to_document(&sample(), &schema).unwrap();
        let expected: Yaml = serde_yaml::from_str(
            "\
_metadata:
  model_type: Config
  configuration_class: tests.Config
  version: 1.2.3
configuration:
  label: main
  amount: '30.0'
  tags: [a, b, c]
  inner:
    name: gear
    value: 7
",
        )
        .unwrap();
        assert_eq!(doc, expected);
    }

    #[test]
    fn document_reads_back() {
        let catalog = catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let codec = CanonicalCodec::new(CodecContext::new(&registry, &introspector));
        let schema = catalog.resolve("tests.Config").unwrap();

        let doc = codec.to_document_as(&sample(), &schema, "Primary").unwrap();
        let loaded = codec.from_document(&doc, None).unwrap();
        assert_eq!(loaded.model_type(), "Primary");
        assert_eq!(loaded.schema.name(), "tests.Config");
        assert_eq!(loaded.data, sample());
    }

    #[test]
    fn undecodable_values_kept_raw() {
        let catalog = catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let codec = CanonicalCodec::new(CodecContext::new(&registry, &introspector));

        let doc: Yaml =
            serde_yaml::from_str("configuration:\n  amount: lots\n  colour: red\n  7: seven\n")
                .unwrap();
        let loaded = codec.from_document(&doc, Some("tests.Config")).unwrap();
        let keys: Vec<_> = loaded.data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["amount"]);
        assert_eq!(loaded.data["amount"], Value::Str("lots".into()));
        assert_eq!(loaded.model_type(), "Config");
    }

    #[test]
    fn missing_configuration_is_empty() {
        let catalog = catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let codec = CanonicalCodec::new(CodecContext::new(&registry, &introspector));

        let doc: Yaml =
            serde_yaml::from_str("_metadata:\n  configuration_class: tests.Other\n").unwrap();
        let loaded = codec.from_document(&doc, None).unwrap();
        assert!(loaded.data.is_empty());
    }

    #[test]
    fn malformed_documents_rejected() {
        let catalog = catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let codec = CanonicalCodec::new(CodecContext::new(&registry, &introspector));

        let cases = [
            ("- a\n- b\n", "NotAMapping"),
            ("_metadata: 5\n", "InvalidMetadata"),
            ("configuration: {}\n", "MissingSchema"),
            (
                "_metadata:\n  configuration_class: tests.Other\nconfiguration: [1]\n",
                "InvalidConfiguration",
            ),
        ];
        for (text, expected) in cases {
            let doc: Yaml = serde_yaml::from_str(text).unwrap();
            let err = codec.from_document(&doc, None).unwrap_err();
            let matched = match &err {
                WizardError::Document(DocumentError::NotAMapping) => "NotAMapping",
                WizardError::Document(DocumentError::InvalidMetadata(_)) => "InvalidMetadata",
                WizardError::Document(DocumentError::MissingSchema) => "MissingSchema",
                WizardError::Document(DocumentError::InvalidConfiguration(_)) => {
                    "InvalidConfiguration"
                }
                _ => "other",
            };
            assert_eq!(matched, expected, "{text}");
        }
    }

    #[test]
    fn unknown_schema_reported() {
        let catalog = catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let codec = CanonicalCodec::new(CodecContext::new(&registry, &introspector));

        let doc: Yaml = serde_yaml::from_str("configuration: {}\n").unwrap();
        let err = codec.from_document(&doc, Some("tests.Missing")).unwrap_err();
        assert!(matches!(err, WizardError::SchemaResolution(_)));
    }

    #[test]
    fn json_form_of_records() {
        let json = to_json(&Value::Record(sample()));
        assert_eq!(
            json,
            serde_json::json!({
                "label": "main",
                "amount": "30.0",
                "tags": ["a", "b", "c"],
                "inner": {"name": "gear", "value": 7},
            })
        );
    }
}
