//! Scalar handlers: bool, int, float, decimal, str
//!
//! Text that does not parse as the field's type is kept as text so the
//! validator can report it against the field.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use confwiz_schema::{TypeExpr, Value};
use serde_yaml::Value as Yaml;

use super::{default_text, kind_mismatch, CodecContext, TypeHandler};
use crate::error::{DecodeError, Result, SerializationError};
use crate::introspection::{FieldKind, FieldSpec};
use crate::prompt::PromptEngine;

fn is_scalar(spec: &FieldSpec, ty: &TypeExpr) -> bool {
    spec.kind == FieldKind::Scalar && &spec.inner == ty
}

/// Prompt for text and parse it with `parse`; blank input keeps `current`
fn prompt_parsed(
    spec: &FieldSpec,
    current: Option<&Value>,
    engine: &mut PromptEngine<'_>,
    parse: impl FnOnce(&str) -> Option<Value>,
) -> Result<Value> {
    let text = engine.ask_text(&spec.name, default_text(current))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(current.cloned().unwrap_or(Value::Null));
    }
    Ok(parse(trimmed).unwrap_or_else(|| Value::Str(text)))
}

/// `bool` fields, asked as yes/no
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolHandler;

impl TypeHandler for BoolHandler {
    fn name(&self) -> &'static str {
        "bool"
    }

    fn can_handle(&self, spec: &FieldSpec) -> bool {
        is_scalar(spec, &TypeExpr::Bool)
    }

    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        let default = matches!(current, Some(Value::Bool(true)));
        Ok(Value::Bool(engine.ask_yes_no(&spec.name, default)?))
    }

    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError> {
        match value {
            Value::Bool(b) => Ok(Yaml::Bool(*b)),
            other => Err(kind_mismatch(spec, other)),
        }
    }

    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError> {
        match raw {
            Yaml::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(DecodeError::mismatch(&spec.name, "bool", other)),
        }
    }
}

/// `int` fields
#[derive(Debug, Clone, Copy, Default)]
pub struct IntHandler;

impl TypeHandler for IntHandler {
    fn name(&self) -> &'static str {
        "int"
    }

    fn can_handle(&self, spec: &FieldSpec) -> bool {
        is_scalar(spec, &TypeExpr::Int)
    }

    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        prompt_parsed(spec, current, engine, |text| text.parse().ok().map(Value::Int))
    }

    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError> {
        match value {
            Value::Int(i) => Ok(Yaml::Number((*i).into())),
            other => Err(kind_mismatch(spec, other)),
        }
    }

    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError> {
        match raw {
            Yaml::Number(n) if !n.is_f64() => n
                .as_i64()
                .map(Value::Int)
                .ok_or_else(|| DecodeError::mismatch(&spec.name, "int", raw)),
            other => Err(DecodeError::mismatch(&spec.name, "int", other)),
        }
    }
}

/// `float` fields
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatHandler;

impl TypeHandler for FloatHandler {
    fn name(&self) -> &'static str {
        "float"
    }

    fn can_handle(&self, spec: &FieldSpec) -> bool {
        is_scalar(spec, &TypeExpr::Float)
    }

    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        prompt_parsed(spec, current, engine, |text| {
            text.parse::<f64>().ok().map(Value::Float)
        })
    }

    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError> {
        match value {
            Value::Float(f) => Ok(Yaml::Number((*f).into())),
            other => Err(kind_mismatch(spec, other)),
        }
    }

    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError> {
        match raw {
            Yaml::Number(n) => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| DecodeError::mismatch(&spec.name, "float", raw)),
            other => Err(DecodeError::mismatch(&spec.name, "float", other)),
        }
    }
}

/// `Decimal` fields, written as quoted strings
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalHandler;

impl TypeHandler for DecimalHandler {
    fn name(&self) -> &'static str {
        "decimal"
    }

    fn can_handle(&self, spec: &FieldSpec) -> bool {
        is_scalar(spec, &TypeExpr::Decimal)
    }

    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        prompt_parsed(spec, current, engine, |text| {
            BigDecimal::from_str(text).ok().map(Value::Decimal)
        })
    }

    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError> {
        match value {
            Value::Decimal(d) => Ok(Yaml::String(d.to_string())),
            other => Err(kind_mismatch(spec, other)),
        }
    }

    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError> {
        let text = match raw {
            Yaml::String(s) => s.clone(),
            Yaml::Number(n) => n.to_string(),
            other => return Err(DecodeError::mismatch(&spec.name, "Decimal", other)),
        };
        BigDecimal::from_str(text.trim())
            .map(Value::Decimal)
            .map_err(|_| DecodeError::mismatch(&spec.name, "Decimal", raw))
    }
}

/// `str` fields
#[derive(Debug, Clone, Copy, Default)]
pub struct StrHandler;

impl TypeHandler for StrHandler {
    fn name(&self) -> &'static str {
        "str"
    }

    fn can_handle(&self, spec: &FieldSpec) -> bool {
        is_scalar(spec, &TypeExpr::Str)
    }

    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        let text = engine.ask_text(&spec.name, default_text(current))?;
        Ok(Value::Str(text))
    }

    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError> {
        match value {
            Value::Str(s) => Ok(Yaml::String(s.clone())),
            other => Err(kind_mismatch(spec, other)),
        }
    }

    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError> {
        match raw {
            Yaml::String(s) => Ok(Value::Str(s.clone())),
            other => Err(DecodeError::mismatch(&spec.name, "str", other)),
        }
    }
}
