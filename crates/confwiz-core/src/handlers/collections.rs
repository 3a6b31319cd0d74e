//! List, set and mapping handlers

use confwiz_schema::{EnumDef, TypeExpr, Value};
use serde_yaml::{Mapping, Value as Yaml};

use super::choice::member_label;
use super::{kind_mismatch, unsupported, CodecContext, TypeHandler};
use crate::error::{DecodeError, Result, SerializationError};
use crate::introspection::{FieldKind, FieldSpec};
use crate::prompt::PromptEngine;

fn element(spec: &FieldSpec, index: usize) -> Option<FieldSpec> {
    spec.branch(0, format!("{}[{index}]", spec.name))
}

/// Ask for items until the user stops; existing items are offered first
fn prompt_items(
    spec: &FieldSpec,
    existing: &[Value],
    engine: &mut PromptEngine<'_>,
) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    loop {
        let index = items.len();
        let message = format!("Add item {} to {}?", index + 1, spec.name);
        if !engine.ask_yes_no(&message, index < existing.len())? {
            return Ok(items);
        }
        let item_spec = element(spec, index).ok_or_else(|| unsupported(spec))?;
        let item = engine.within(index, |e| e.prompt_field(&item_spec, existing.get(index)))?;
        items.push(item);
    }
}

fn serialize_items<'v>(
    spec: &FieldSpec,
    items: impl Iterator<Item = &'v Value>,
    cx: &CodecContext<'_>,
) -> std::result::Result<Yaml, SerializationError> {
    let mut out = Vec::new();
    for (i, item) in items.enumerate() {
        let item_spec = element(spec, i).ok_or_else(|| SerializationError::KindMismatch {
            field: spec.name.clone(),
            expected: spec.type_name(),
            found: "collection without element type".into(),
        })?;
        out.push(cx.serialize(&item_spec, item)?);
    }
    Ok(Yaml::Sequence(out))
}

fn deserialize_items(
    spec: &FieldSpec,
    raw: &Yaml,
    cx: &CodecContext<'_>,
) -> std::result::Result<Vec<Value>, DecodeError> {
    let Yaml::Sequence(items) = raw else {
        return Err(DecodeError::mismatch(&spec.name, spec.type_name(), raw));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let item_spec = element(spec, i)
                .ok_or_else(|| DecodeError::mismatch(&spec.name, spec.type_name(), raw))?;
            cx.deserialize(&item_spec, item)
        })
        .collect()
}

/// `list[T]` fields
#[derive(Debug, Clone, Copy, Default)]
pub struct ListHandler;

impl TypeHandler for ListHandler {
    fn name(&self) -> &'static str {
        "list"
    }

    fn can_handle(&self, spec: &FieldSpec) -> bool {
        spec.kind == FieldKind::List
    }

    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        let existing = current.and_then(Value::as_items).unwrap_or_default();
        Ok(Value::List(prompt_items(spec, existing, engine)?))
    }

    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError> {
        match value {
            Value::List(items) => serialize_items(spec, items.iter(), cx),
            other => Err(kind_mismatch(spec, other)),
        }
    }

    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError> {
        deserialize_items(spec, raw, cx).map(Value::List)
    }
}

/// `set[T]` fields, written as sorted sequences
///
/// Sets of enum members or literals are collected with one multi-select.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetHandler;

impl SetHandler {
    fn prompt_choices(
        spec: &FieldSpec,
        options: Vec<(String, Value)>,
        existing: &[Value],
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        let selected = options
            .iter()
            .map(|(_, v)| existing.iter().any(|e| e == v))
            .collect();
        let (labels, values): (Vec<String>, Vec<Value>) = options.into_iter().unzip();
        let message = format!("Select {}", spec.name);
        let picked = engine.ask_multi(&message, labels, selected)?;
        Ok(Value::set(picked.into_iter().map(|i| values[i].clone())))
    }
}

impl TypeHandler for SetHandler {
    fn name(&self) -> &'static str {
        "set"
    }

    fn can_handle(&self, spec: &FieldSpec) -> bool {
        spec.kind == FieldKind::Set
    }

    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        let existing = current.and_then(Value::as_items).unwrap_or_default();
        let options: Option<Vec<(String, Value)>> = match spec.branches.first().map(|b| &b.ty) {
            Some(TypeExpr::Enum(def)) => Some(
                def.members
                    .iter()
                    .map(|m| (member_label(m), EnumDef::value_of(m)))
                    .collect(),
            ),
            Some(TypeExpr::Literal(values)) => {
                Some(values.iter().map(|v| (v.render(), v.clone())).collect())
            }
            _ => None,
        };
        match options {
            Some(options) => Self::prompt_choices(spec, options, existing, engine),
            None => Ok(Value::set(prompt_items(spec, existing, engine)?)),
        }
    }

    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError> {
        match value {
            Value::Set(items) => {
                let mut sorted: Vec<&Value> = items.iter().collect();
                sorted.sort_by(|a, b| a.canonical_cmp(b));
                serialize_items(spec, sorted.into_iter(), cx)
            }
            other => Err(kind_mismatch(spec, other)),
        }
    }

    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError> {
        deserialize_items(spec, raw, cx).map(Value::set)
    }
}

/// `dict[K, V]` fields
#[derive(Debug, Clone, Copy, Default)]
pub struct MappingHandler;

fn key_value(spec: &FieldSpec) -> Option<(FieldSpec, FieldSpec)> {
    let key = spec.branch(0, format!("{} key", spec.name))?;
    let value = spec.branch(1, format!("{} value", spec.name))?;
    Some((key, value))
}

impl TypeHandler for MappingHandler {
    fn name(&self) -> &'static str {
        "mapping"
    }

    fn can_handle(&self, spec: &FieldSpec) -> bool {
        spec.kind == FieldKind::Mapping && spec.branches.len() == 2
    }

    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        let existing: Vec<(Value, Value)> = match current {
            Some(Value::Map(entries)) => entries.clone(),
            Some(Value::Record(record)) => record
                .iter()
                .map(|(k, v)| (Value::Str(k.clone()), v.clone()))
                .collect(),
            _ => Vec::new(),
        };
        let (key_spec, value_spec) = key_value(spec).ok_or_else(|| unsupported(spec))?;

        let mut entries: Vec<(Value, Value)> = Vec::new();
        loop {
            let index = entries.len();
            let message = format!("Add entry {} to {}?", index + 1, spec.name);
            if !engine.ask_yes_no(&message, index < existing.len())? {
                return Ok(Value::Map(entries));
            }
            let prior = existing.get(index);
            let key = engine.within(index, |e| {
                e.prompt_field(&key_spec, prior.map(|(k, _)| k))
            })?;
            let value = engine.within(key.render(), |e| {
                e.prompt_field(&value_spec, prior.map(|(_, v)| v))
            })?;
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => entries.push((key, value)),
            }
        }
    }

    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError> {
        let Value::Map(entries) = value else {
            return Err(kind_mismatch(spec, value));
        };
        let (key_spec, value_spec) = key_value(spec).ok_or_else(|| kind_mismatch(spec, value))?;
        let mut mapping = Mapping::new();
        for (k, v) in entries {
            let key = cx.serialize(&key_spec, k)?;
            if matches!(key, Yaml::Sequence(_) | Yaml::Mapping(_) | Yaml::Tagged(_)) {
                return Err(SerializationError::NonScalarKey {
                    field: spec.name.clone(),
                });
            }
            mapping.insert(key, cx.serialize(&value_spec, v)?);
        }
        Ok(Yaml::Mapping(mapping))
    }

    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError> {
        let Yaml::Mapping(mapping) = raw else {
            return Err(DecodeError::mismatch(&spec.name, spec.type_name(), raw));
        };
        let (key_spec, value_spec) = key_value(spec)
            .ok_or_else(|| DecodeError::mismatch(&spec.name, spec.type_name(), raw))?;
        mapping
            .iter()
            .map(|(k, v)| Ok((cx.deserialize(&key_spec, k)?, cx.deserialize(&value_spec, v)?)))
            .collect::<std::result::Result<Vec<_>, DecodeError>>()
            .map(Value::Map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{testing, TypeHandlerRegistry};
    use crate::introspection::Introspector;
    use crate::terminal::replay::Replay;
    use crate::terminal::InputShape;
    use bigdecimal::BigDecimal;
    use confwiz_schema::FieldDef;
    use std::str::FromStr;

    fn spec(name: &str, ty: TypeExpr) -> FieldSpec {
        FieldSpec::from_def(&FieldDef::new(name, ty))
    }

    #[test]
    fn list_items_until_declined() {
        let catalog = testing::catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let mut terminal = Replay::new().yes().text("a").yes().text("b").no();
        let s = spec("tags", TypeExpr::list(TypeExpr::Str));

        let value = {
            let mut engine = PromptEngine::new(&registry, &introspector, &mut terminal);
            engine.within("tags", |e| ListHandler.prompt(&s, None, e)).unwrap()
        };
        assert_eq!(
            value,
            Value::List(vec![Value::Str("a".into()), Value::Str("b".into())])
        );
        assert_eq!(terminal.asked[1].field, "tags.0");
        assert_eq!(terminal.asked[3].field, "tags.1");
    }

    #[test]
    fn list_offers_existing_items() {
        let catalog = testing::catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let mut terminal = Replay::new().accept().accept().accept();
        let s = spec("ports", TypeExpr::list(TypeExpr::Int));
        let current = Value::List(vec![Value::Int(80)]);

        let value = {
            let mut engine = PromptEngine::new(&registry, &introspector, &mut terminal);
            ListHandler.prompt(&s, Some(&current), &mut engine).unwrap()
        };
        assert_eq!(value, current);
        assert_eq!(terminal.asked[2].shape, InputShape::YesNo { default: false });
    }

    #[test]
    fn set_sorted_on_write() {
        let catalog = testing::catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let cx = CodecContext::new(&registry, &introspector);
        let s = spec("labels", TypeExpr::set(TypeExpr::Str));

        let value = Value::Set(vec![
            Value::Str("b".into()),
            Value::Str("a".into()),
            Value::Str("c".into()),
        ]);
        let raw = SetHandler.serialize(&s, &value, &cx).unwrap();
        let expected: Yaml = serde_yaml::from_str("[a, b, c]").unwrap();
        assert_eq!(raw, expected);
        assert_eq!(
            SetHandler.deserialize(&s, &raw, &cx).unwrap(),
            Value::set(["a", "b", "c"].map(Value::from))
        );
    }

    #[test]
    fn enum_set_uses_multi_select() {
        let catalog = testing::catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let mut terminal = Replay::new().choose_many(&[2, 0]);
        let def = EnumDef::from_names("tests.SampleEnum", &["a", "b", "c"]);
        let s = spec("modifiers", TypeExpr::set(TypeExpr::Enum(def.clone())));

        let value = {
            let mut engine = PromptEngine::new(&registry, &introspector, &mut terminal);
            SetHandler.prompt(&s, None, &mut engine).unwrap()
        };
        assert_eq!(
            value,
            Value::set([
                EnumDef::value_of(&def.members[0]),
                EnumDef::value_of(&def.members[2])
            ])
        );
        assert!(matches!(terminal.asked[0].shape, InputShape::MultiSelect { .. }));
    }

    #[test]
    fn mapping_entries() {
        let catalog = testing::catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let mut terminal = Replay::new().yes().text("fee").text("0.25").no();
        let s = spec("metadata", TypeExpr::map(TypeExpr::Str, TypeExpr::Decimal));

        let value = {
            let mut engine = PromptEngine::new(&registry, &introspector, &mut terminal);
            engine.within("metadata", |e| MappingHandler.prompt(&s, None, e)).unwrap()
        };
        let fee = Value::Decimal(BigDecimal::from_str("0.25").unwrap());
        assert_eq!(value, Value::Map(vec![(Value::Str("fee".into()), fee)]));
        assert_eq!(terminal.asked[2].field, "metadata.fee");

        let cx = CodecContext::new(&registry, &introspector);
        let raw = MappingHandler.serialize(&s, &value, &cx).unwrap();
        let expected: Yaml = serde_yaml::from_str("fee: '0.25'").unwrap();
        assert_eq!(raw, expected);
        assert_eq!(MappingHandler.deserialize(&s, &raw, &cx).unwrap(), value);
    }

    #[test]
    fn non_scalar_keys_rejected() {
        let catalog = testing::catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let cx = CodecContext::new(&registry, &introspector);
        let s = spec("grid", TypeExpr::map(TypeExpr::list(TypeExpr::Int), TypeExpr::Int));

        let value = Value::Map(vec![(Value::List(vec![Value::Int(1)]), Value::Int(2))]);
        assert!(matches!(
            MappingHandler.serialize(&s, &value, &cx),
            Err(SerializationError::NonScalarKey { .. })
        ));
    }
}
