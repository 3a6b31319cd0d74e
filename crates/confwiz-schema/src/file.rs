//! YAML catalog files
//!
//! ```yaml
//! enums:
//!   - name: app.config.LogLevel
//!     members: {DEBUG: debug, INFO: info}
//! schemas:
//!   - name: app.config.ServerConfig
//!     description: Server settings
//!     fields:
//!       - name: port
//!         type: int
//!         default: 8080
//!         constraints: {ge: 1, le: 65535}
//!       - name: level
//!         type: LogLevel
//! ```
//!
//! Identifiers in field types that name an enumeration (by full or simple
//! name) bind to it; simple names of schemas in the catalog are qualified.
//! Anything else stays a schema reference and is checked when resolved.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value as Yaml;

use crate::catalog::SchemaCatalog;
use crate::constraints::Constraints;
use crate::error::SchemaError;
use crate::iso8601;
use crate::parse::parse_type;
use crate::schema::{FieldDef, SchemaDef};
use crate::types::{simple_name, EnumDef, EnumMember, TypeExpr};
use crate::value::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    enums: Vec<EnumEntry>,
    #[serde(default)]
    schemas: Vec<SchemaEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnumEntry {
    name: String,
    members: IndexMap<String, Yaml>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaEntry {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    fields: Vec<FieldEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldEntry {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    default: Option<Yaml>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    constraints: Constraints,
    #[serde(default = "default_init")]
    init: bool,
}

fn default_init() -> bool {
    true
}

pub(crate) fn load_into(catalog: &mut SchemaCatalog, text: &str) -> Result<(), SchemaError> {
    let file: CatalogFile = serde_yaml::from_str(text)?;

    for entry in file.enums {
        let members = entry
            .members
            .into_iter()
            .map(|(name, raw)| match raw {
                Yaml::String(s) => Ok(EnumMember::new(name, Value::Str(s))),
                Yaml::Number(n) if n.is_i64() => {
                    Ok(EnumMember::new(name, Value::Int(n.as_i64().unwrap_or_default())))
                }
                other => Err(SchemaError::InvalidEnum {
                    name: entry.name.clone(),
                    message: format!("member '{name}' has unsupported value {other:?}"),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        catalog.register_enum(EnumDef::new(entry.name, members))?;
    }

    let local_names: Vec<String> = file.schemas.iter().map(|s| s.name.clone()).collect();

    for entry in file.schemas {
        let mut builder = SchemaDef::builder(entry.name.clone());
        if let Some(description) = entry.description {
            builder = builder.description(description);
        }
        for field in entry.fields {
            let parsed = parse_type(&field.ty).map_err(|source| SchemaError::Type {
                schema: entry.name.clone(),
                field: field.name.clone(),
                source,
            })?;
            let ty = bind(parsed, catalog, &local_names);
            let default = match &field.default {
                Some(raw) => Some(typed_value(raw, &ty).map_err(|message| {
                    SchemaError::InvalidDefault {
                        schema: entry.name.clone(),
                        field: field.name.clone(),
                        message,
                    }
                })?),
                None => None,
            };

            let mut def = FieldDef::new(field.name, ty).with_constraints(field.constraints);
            def.default = default;
            def.description = field.description;
            def.init = field.init;
            builder = builder.field(def);
        }
        catalog.register(builder.build()?)?;
    }
    Ok(())
}

/// Rebind identifiers to enums and qualify local schema names
fn bind(ty: TypeExpr, catalog: &SchemaCatalog, local: &[String]) -> TypeExpr {
    let rebind = |t: Box<TypeExpr>| Box::new(bind(*t, catalog, local));
    match ty {
        TypeExpr::Schema(name) => {
            if let Some(def) = catalog.enum_named(&name) {
                return TypeExpr::Enum(def.clone());
            }
            if name.contains('.') {
                return TypeExpr::Schema(name);
            }
            let mut candidates = local
                .iter()
                .map(String::as_str)
                .chain(catalog.names())
                .filter(|full| simple_name(full) == name);
            match (candidates.next(), candidates.next()) {
                (Some(full), None) => TypeExpr::Schema(full.to_string()),
                _ => TypeExpr::Schema(name),
            }
        }
        TypeExpr::Optional(inner) => TypeExpr::Optional(rebind(inner)),
        TypeExpr::List(inner) => TypeExpr::List(rebind(inner)),
        TypeExpr::Set(inner) => TypeExpr::Set(rebind(inner)),
        TypeExpr::Map(key, value) => TypeExpr::Map(rebind(key), rebind(value)),
        TypeExpr::Union(alternatives) => TypeExpr::Union(
            alternatives
                .into_iter()
                .map(|a| bind(a, catalog, local))
                .collect(),
        ),
        TypeExpr::Constrained(inner, constraints) => {
            TypeExpr::Constrained(rebind(inner), constraints)
        }
        other => other,
    }
}

/// Convert a YAML default into a value of the declared type
pub(crate) fn typed_value(raw: &Yaml, ty: &TypeExpr) -> Result<Value, String> {
    let mismatch = || format!("expected {ty}, got {}", yaml_kind(raw));
    if raw.is_null() {
        return if ty.admits_null() {
            Ok(Value::Null)
        } else {
            Err(mismatch())
        };
    }
    match ty {
        TypeExpr::Constrained(inner, _) | TypeExpr::Optional(inner) => typed_value(raw, inner),
        TypeExpr::Bool => raw.as_bool().map(Value::Bool).ok_or_else(mismatch),
        TypeExpr::Int => raw.as_i64().map(Value::Int).ok_or_else(mismatch),
        TypeExpr::Float => raw.as_f64().map(Value::Float).ok_or_else(mismatch),
        TypeExpr::Decimal => {
            let text = match raw {
                Yaml::String(s) => s.clone(),
                Yaml::Number(n) => n.to_string(),
                _ => return Err(mismatch()),
            };
            BigDecimal::from_str(text.trim())
                .map(Value::Decimal)
                .map_err(|_| mismatch())
        }
        TypeExpr::Str => raw
            .as_str()
            .map(|s| Value::Str(s.to_string()))
            .ok_or_else(mismatch),
        TypeExpr::DateTime => raw
            .as_str()
            .and_then(iso8601::parse_datetime)
            .map(Value::from_datetime)
            .ok_or_else(mismatch),
        TypeExpr::Date => raw
            .as_str()
            .and_then(iso8601::parse_date)
            .map(Value::Date)
            .ok_or_else(mismatch),
        TypeExpr::Time => raw
            .as_str()
            .and_then(iso8601::parse_time)
            .map(Value::Time)
            .ok_or_else(mismatch),
        TypeExpr::Duration => {
            let parsed = match raw {
                Yaml::String(s) => iso8601::parse_duration(s),
                Yaml::Number(n) => iso8601::parse_duration(&n.to_string()),
                _ => None,
            };
            parsed.map(Value::Duration).ok_or_else(mismatch)
        }
        TypeExpr::Enum(def) => {
            let plain = Value::from_yaml(raw);
            def.member_with_value(&plain)
                .or_else(|| plain.as_str().and_then(|s| def.member_named(s)))
                .map(EnumDef::value_of)
                .ok_or_else(mismatch)
        }
        TypeExpr::Literal(values) => {
            let plain = Value::from_yaml(raw);
            if values.contains(&plain) {
                Ok(plain)
            } else {
                Err(mismatch())
            }
        }
        TypeExpr::List(element) | TypeExpr::Set(element) => {
            let items = raw
                .as_sequence()
                .ok_or_else(mismatch)?
                .iter()
                .map(|item| typed_value(item, element))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if matches!(ty, TypeExpr::Set(_)) {
                Value::set(items)
            } else {
                Value::List(items)
            })
        }
        TypeExpr::Map(key, value) => {
            let entries = raw
                .as_mapping()
                .ok_or_else(mismatch)?
                .iter()
                .map(|(k, v)| Ok((typed_value(k, key)?, typed_value(v, value)?)))
                .collect::<Result<Vec<_>, String>>()?;
            Ok(Value::Map(entries))
        }
        TypeExpr::Union(alternatives) => alternatives
            .iter()
            .find_map(|alt| typed_value(raw, alt).ok())
            .ok_or_else(mismatch),
        TypeExpr::Schema(_) => match Value::from_yaml(raw) {
            record @ Value::Record(_) => Ok(record),
            _ => Err(mismatch()),
        },
        TypeExpr::Null => Err(mismatch()),
        TypeExpr::Custom(_) => Ok(Value::from_yaml(raw)),
    }
}

fn yaml_kind(raw: &Yaml) -> &'static str {
    match raw {
        Yaml::Null => "null",
        Yaml::Bool(_) => "bool",
        Yaml::Number(_) => "number",
        Yaml::String(_) => "string",
        Yaml::Sequence(_) => "sequence",
        Yaml::Mapping(_) => "mapping",
        Yaml::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SchemaResolver;
    use pretty_assertions::assert_eq;

    const CATALOG: &str = r"
enums:
  - name: app.config.Mode
    members:
      FAST: fast
      SLOW: slow
schemas:
  - name: app.config.Inner
    fields:
      - name: value
        type: int
        default: 0
        constraints: {ge: 0, le: 100}
  - name: app.config.Outer
    description: Outer settings
    fields:
      - name: mode
        type: Mode
        default: fast
      - name: inner
        type: Inner
      - name: ratio
        type: Decimal
        default: 30.0
      - name: tags
        type: set[str]
        default: [b, a, b]
      - name: maybe
        type: Inner | None
";

    #[test]
    fn loads_enums_and_schemas() {
        let catalog = SchemaCatalog::from_yaml_str(CATALOG).unwrap();
        let outer = catalog.resolve("app.config.Outer").unwrap();

        assert_eq!(outer.description(), Some("Outer settings"));
        let mode = outer.field("mode").unwrap();
        assert!(matches!(&mode.ty, TypeExpr::Enum(def) if def.name == "app.config.Mode"));
        assert_eq!(
            mode.default,
            Some(Value::Enum {
                member: "FAST".into(),
                value: Box::new(Value::Str("fast".into())),
            })
        );
        assert_eq!(
            outer.field("inner").unwrap().ty,
            TypeExpr::schema("app.config.Inner")
        );
        assert_eq!(
            outer.field("maybe").unwrap().ty,
            TypeExpr::optional(TypeExpr::schema("app.config.Inner"))
        );
    }

    #[test]
    fn decimal_default_keeps_precision() {
        let catalog = SchemaCatalog::from_yaml_str(CATALOG).unwrap();
        let outer = catalog.resolve("app.config.Outer").unwrap();
        let ratio = outer.field("ratio").unwrap().default.clone().unwrap();
        assert_eq!(ratio.render(), "30.0");
    }

    #[test]
    fn set_default_is_canonical() {
        let catalog = SchemaCatalog::from_yaml_str(CATALOG).unwrap();
        let outer = catalog.resolve("app.config.Outer").unwrap();
        assert_eq!(
            outer.field("tags").unwrap().default,
            Some(Value::Set(vec![Value::Str("a".into()), Value::Str("b".into())]))
        );
    }

    #[test]
    fn constraints_loaded() {
        let catalog = SchemaCatalog::from_yaml_str(CATALOG).unwrap();
        let inner = catalog.resolve("app.config.Inner").unwrap();
        assert_eq!(inner.field("value").unwrap().constraints.to_string(), "ge=0, le=100");
    }

    #[test]
    fn bad_default_rejected() {
        let text = r"
schemas:
  - name: app.A
    fields:
      - name: port
        type: int
        default: eighty
";
        let err = SchemaCatalog::from_yaml_str(text).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefault { .. }));
    }

    #[test]
    fn bad_type_rejected() {
        let text = r"
schemas:
  - name: app.A
    fields:
      - name: x
        type: list[int
";
        let err = SchemaCatalog::from_yaml_str(text).unwrap_err();
        assert!(matches!(err, SchemaError::Type { .. }));
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = SchemaCatalog::from_yaml_str("schemas: []\nextra: 1\n").unwrap_err();
        assert!(matches!(err, SchemaError::Yaml(_)));
    }

    #[test]
    fn computed_field_flag() {
        let text = r"
schemas:
  - name: app.A
    fields:
      - name: derived
        type: int
        default: 1
        init: false
";
        let catalog = SchemaCatalog::from_yaml_str(text).unwrap();
        assert!(!catalog.resolve("app.A").unwrap().field("derived").unwrap().init);
    }
}
