//! Optional and union handlers
//!
//! Neither produces values of its own: both pick a branch and hand the
//! field back to the registry.

use confwiz_schema::Value;
use serde_yaml::{Mapping, Value as Yaml};

use super::{CodecContext, TypeHandler};
use crate::error::{DecodeError, Result, SerializationError};
use crate::introspection::{FieldKind, FieldSpec};
use crate::prompt::PromptEngine;
use crate::validation::Materializer;

/// `T | None` fields
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalHandler;

impl TypeHandler for OptionalHandler {
    fn name(&self) -> &'static str {
        "optional"
    }

    fn can_handle(&self, spec: &FieldSpec) -> bool {
        spec.kind == FieldKind::Optional
    }

    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        let present = current.filter(|v| !v.is_null());
        let message = format!("Configure {}?", spec.name);
        if !engine.ask_yes_no(&message, present.is_some())? {
            return Ok(Value::Null);
        }
        let inner = spec.unwrapped();
        engine.prompt_field(&inner, present.or(inner.default.as_ref()))
    }

    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError> {
        if value.is_null() {
            return Ok(Yaml::Null);
        }
        cx.serialize(&spec.unwrapped(), value)
    }

    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        cx.deserialize(&spec.unwrapped(), raw)
    }
}

/// Fields with several alternatives
///
/// Values belong to the first branch they satisfy exactly; documents are
/// read back with the first branch that decodes. When that would pick a
/// different branch, the value is written tagged:
///
/// ```yaml
/// amount:
///   _type: Decimal
///   value: '30.0'
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UnionHandler;

const TYPE_KEY: &str = "_type";
const VALUE_KEY: &str = "value";

fn branches(spec: &FieldSpec) -> impl Iterator<Item = FieldSpec> + '_ {
    (0..spec.branches.len()).filter_map(move |i| spec.branch(i, spec.name.clone()))
}

/// Branch named by a `{_type, value}` mapping
fn tagged<'r>(options: &[FieldSpec], raw: &'r Yaml) -> Option<(usize, &'r Yaml)> {
    let map = raw.as_mapping().filter(|m| m.len() == 2)?;
    let name = map.get(TYPE_KEY)?.as_str()?;
    let inner = map.get(VALUE_KEY)?;
    let index = options.iter().position(|b| b.type_name() == name)?;
    Some((index, inner))
}

fn decode(options: &[FieldSpec], raw: &Yaml, cx: &CodecContext<'_>) -> Option<(usize, Value)> {
    if let Some((index, inner)) = tagged(options, raw) {
        if let Ok(value) = cx.deserialize(&options[index], inner) {
            return Some((index, value));
        }
    }
    options
        .iter()
        .enumerate()
        .find_map(|(i, b)| cx.deserialize(b, raw).ok().map(|v| (i, v)))
}

impl TypeHandler for UnionHandler {
    fn name(&self) -> &'static str {
        "union"
    }

    fn can_handle(&self, spec: &FieldSpec) -> bool {
        spec.kind == FieldKind::Union && !spec.branches.is_empty()
    }

    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        let options: Vec<FieldSpec> = branches(spec).collect();
        let cx = CodecContext::new(engine.registry(), engine.introspector());
        let matching = current.and_then(|c| options.iter().position(|b| cx.conforms(b, c)));
        let choices = options.iter().map(FieldSpec::type_name).collect();
        let message = format!("{}: choose a type", spec.name);
        let index = engine.ask_select(&message, choices, matching)?;

        let chosen = &options[index];
        let materializer = Materializer::new(engine.introspector());
        let mut current = current.filter(|_| matching == Some(index)).cloned();
        loop {
            let value = engine.prompt_field(chosen, current.as_ref())?;
            match materializer.coerce(chosen, &value) {
                Ok(coerced) => return Ok(coerced),
                // no other branch claims it either; validation reports it
                Err(_) if materializer.coerce(spec, &value).is_err() => return Ok(value),
                Err(violations) => {
                    let reasons: Vec<&str> = violations.iter().map(|v| v.reason.as_str()).collect();
                    engine.show(&format!("{}: {}", spec.name, reasons.join("; ")));
                    current = None;
                }
            }
        }
    }

    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError> {
        let options: Vec<FieldSpec> = branches(spec).collect();
        let index = options.iter().position(|b| cx.conforms(b, value)).ok_or_else(|| {
            SerializationError::NoMatchingBranch {
                field: spec.name.clone(),
                type_name: spec.type_name(),
            }
        })?;
        let raw = cx.serialize(&options[index], value)?;
        if matches!(decode(&options, &raw, cx), Some((i, ref v)) if i == index && v == value) {
            return Ok(raw);
        }

        let mut map = Mapping::new();
        map.insert(Yaml::from(TYPE_KEY), Yaml::String(options[index].type_name()));
        map.insert(Yaml::from(VALUE_KEY), raw);
        Ok(Yaml::Mapping(map))
    }

    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError> {
        let options: Vec<FieldSpec> = branches(spec).collect();
        decode(&options, raw, cx)
            .map(|(_, value)| value)
            .ok_or_else(|| DecodeError::mismatch(&spec.name, spec.type_name(), raw))
    }
}
