//! Nested schema handler

use confwiz_schema::{Record, Value};
use serde_yaml::{Mapping, Value as Yaml};

use super::{kind_mismatch, unsupported, CodecContext, TypeHandler};
use crate::error::{DecodeError, Result, SerializationError};
use crate::introspection::{FieldKind, FieldSpec};
use crate::prompt::PromptEngine;

/// Fields holding an instance of another schema
///
/// Records are written as mappings in the nested schema's field order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedHandler;

impl TypeHandler for NestedHandler {
    fn name(&self) -> &'static str {
        "nested"
    }

    fn can_handle(&self, spec: &FieldSpec) -> bool {
        spec.kind == FieldKind::NestedSchema && spec.nested.is_some()
    }

    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        let Some(schema) = spec.nested.as_deref() else {
            return Err(unsupported(spec));
        };
        let existing = current.and_then(Value::as_record);
        engine.prompt_nested(schema, existing).map(Value::Record)
    }

    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError> {
        let (Some(schema), Value::Record(record)) = (spec.nested.as_deref(), value) else {
            return Err(kind_mismatch(spec, value));
        };
        let mut mapping = Mapping::new();
        for field in cx.fields_of(schema)?.iter() {
            if let Some(v) = record.get(&field.name) {
                mapping.insert(Yaml::String(field.name.clone()), cx.serialize(field, v)?);
            }
        }
        Ok(Yaml::Mapping(mapping))
    }

    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError> {
        let (Some(schema), Yaml::Mapping(mapping)) = (spec.nested.as_deref(), raw) else {
            return Err(DecodeError::mismatch(&spec.name, spec.type_name(), raw));
        };
        let fields = cx.fields_of(schema)?;
        for key in mapping.keys() {
            let known = key
                .as_str()
                .is_some_and(|k| fields.iter().any(|f| f.name == k));
            if !known {
                return Err(DecodeError::UnknownField {
                    field: spec.name.clone(),
                    key: Value::from_yaml(key).render(),
                });
            }
        }
        let mut record = Record::with_capacity(mapping.len());
        for field in fields.iter() {
            if let Some(raw) = mapping.get(field.name.as_str()) {
                record.insert(field.name.clone(), cx.deserialize(field, raw)?);
            }
        }
        Ok(Value::Record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{testing, TypeHandlerRegistry};
    use crate::introspection::Introspector;
    use crate::terminal::replay::Replay;
    use confwiz_schema::{FieldDef, TypeExpr};
    use pretty_assertions::assert_eq;

    fn inner() -> FieldSpec {
        FieldSpec::from_def(&FieldDef::new("inner", TypeExpr::schema("tests.InnerModel")))
    }

    #[test]
    fn prompt_recurses_in_field_order() {
        let catalog = testing::catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let mut terminal = Replay::new().text("gear").text("12");

        let value = {
            let mut engine = PromptEngine::new(&registry, &introspector, &mut terminal);
            engine.within("inner", |e| NestedHandler.prompt(&inner(), None, e)).unwrap()
        };
        let record = value.as_record().unwrap();
        let keys: Vec<_> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "value"]);
        assert_eq!(terminal.fields(), vec!["inner.name", "inner.value"]);
    }

    #[test]
    fn written_in_schema_order() {
        let catalog = testing::catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let cx = CodecContext::new(&registry, &introspector);

        let mut record = Record::new();
        record.insert("value".into(), Value::Int(3));
        record.insert("name".into(), Value::Str("n".into()));
        let raw = NestedHandler.serialize(&inner(), &Value::Record(record), &cx).unwrap();
        assert_eq!(serde_yaml::to_string(&raw).unwrap(), "name: n\nvalue: 3\n");
    }

    #[test]
    fn unknown_keys_rejected() {
        let catalog = testing::catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let cx = CodecContext::new(&registry, &introspector);

        let raw: Yaml = serde_yaml::from_str("name: n\ncolour: red\n").unwrap();
        let err = NestedHandler.deserialize(&inner(), &raw, &cx).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownField { ref key, .. } if key == "colour"));
    }

    #[test]
    fn nested_prompt_without_schema_fails() {
        let catalog = testing::catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let mut terminal = Replay::new();
        let spec = FieldSpec::from_def(&FieldDef::new("count", TypeExpr::Int));

        let err = {
            let mut engine = PromptEngine::new(&registry, &introspector, &mut terminal);
            NestedHandler.prompt(&spec, Some(&Value::Int(1)), &mut engine).unwrap_err()
        };
        assert!(matches!(err, crate::error::WizardError::UnsupportedType(_)));
        assert!(terminal.asked.is_empty());
    }
}
