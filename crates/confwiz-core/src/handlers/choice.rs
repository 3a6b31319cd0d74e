//! Enum and literal handlers

use confwiz_schema::{EnumDef, TypeExpr, Value};
use serde_yaml::Value as Yaml;

use super::{kind_mismatch, scalar_yaml, unsupported, CodecContext, TypeHandler};
use crate::error::{DecodeError, Result, SerializationError};
use crate::introspection::{FieldKind, FieldSpec};
use crate::prompt::PromptEngine;

/// Selection label for an enum member
pub(crate) fn member_label(member: &confwiz_schema::EnumMember) -> String {
    let value = member.value.render();
    if value == member.name {
        value
    } else {
        format!("{} ({value})", member.name)
    }
}

fn enum_def(spec: &FieldSpec) -> Option<&EnumDef> {
    match &spec.inner {
        TypeExpr::Enum(def) => Some(def),
        _ => None,
    }
}

fn literal_values(spec: &FieldSpec) -> Option<&[Value]> {
    match &spec.inner {
        TypeExpr::Literal(values) => Some(values),
        _ => None,
    }
}

/// Enumeration fields; documents hold the member's underlying value
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumHandler;

impl TypeHandler for EnumHandler {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn can_handle(&self, spec: &FieldSpec) -> bool {
        spec.kind == FieldKind::Enum && enum_def(spec).is_some()
    }

    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        let Some(def) = enum_def(spec) else {
            return Err(unsupported(spec));
        };
        let choices = def.members.iter().map(member_label).collect();
        let default = match current {
            Some(Value::Enum { member, .. }) => def.position(member),
            Some(raw) => def
                .members
                .iter()
                .position(|m| &m.value == raw || raw.as_str() == Some(m.name.as_str())),
            None => None,
        };
        let index = engine.ask_select(&spec.name, choices, default)?;
        Ok(EnumDef::value_of(&def.members[index]))
    }

    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError> {
        let known = enum_def(spec).and_then(|def| match value {
            Value::Enum { member, .. } => def.member_named(member),
            _ => None,
        });
        known
            .and_then(|member| scalar_yaml(&member.value))
            .ok_or_else(|| kind_mismatch(spec, value))
    }

    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError> {
        let expected = spec.type_name();
        let def = enum_def(spec).ok_or_else(|| DecodeError::mismatch(&spec.name, &expected, raw))?;
        let value = Value::from_yaml(raw);
        def.member_with_value(&value)
            .or_else(|| value.as_str().and_then(|name| def.member_named(name)))
            .map(EnumDef::value_of)
            .ok_or_else(|| DecodeError::mismatch(&spec.name, &expected, raw))
    }
}

/// Fields restricted to literal values
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralHandler;

impl TypeHandler for LiteralHandler {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn can_handle(&self, spec: &FieldSpec) -> bool {
        spec.kind == FieldKind::Literal && literal_values(spec).is_some()
    }

    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        let values = literal_values(spec).unwrap_or_default();
        let choices = values.iter().map(Value::render).collect();
        let default = current.and_then(|c| values.iter().position(|v| v == c));
        let index = engine.ask_select(&spec.name, choices, default)?;
        Ok(values[index].clone())
    }

    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError> {
        literal_values(spec)
            .filter(|values| values.contains(value))
            .and_then(|_| scalar_yaml(value))
            .ok_or_else(|| kind_mismatch(spec, value))
    }

    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError> {
        let value = Value::from_yaml(raw);
        literal_values(spec)
            .and_then(|values| values.iter().find(|v| **v == value))
            .cloned()
            .ok_or_else(|| DecodeError::mismatch(&spec.name, spec.type_name(), raw))
    }
}
