//! Validation
//!
//! [`Materializer`] turns collected data into a validated record: every
//! field is coerced to its declared type and checked against its
//! constraints, and every failure is reported with its path. [`FixLoop`]
//! drives re-prompting for the failed paths.
//!
//! Coercion runs in two modes. Lax mode performs the conversions a user
//! would expect from text input (`"42"` to an int, `"yes"` to a bool);
//! strict mode accepts only values of the declared kind. Unions try every
//! branch strictly before any branch laxly, so a text value stays text when
//! a text branch exists.

mod fix;

use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive};
use confwiz_schema::iso8601;
use confwiz_schema::{EnumDef, FieldPath, Record, TypeExpr, Value};
use tracing::debug;

use crate::error::{Violation, Violations};
use crate::introspection::{FieldKind, FieldSpec, Introspector};

pub use fix::{FixLoop, FixState, ValidatedConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Strict,
    Lax,
}

/// Coerces and checks records against field descriptors
#[derive(Debug, Clone, Copy)]
pub struct Materializer<'a> {
    introspector: &'a Introspector<'a>,
}

impl<'a> Materializer<'a> {
    /// Create new materializer
    #[inline]
    #[must_use]
    pub fn new(introspector: &'a Introspector<'a>) -> Self {
        Self { introspector }
    }

    /// Validate `data` against `specs`
    ///
    /// Missing fields take their defaults. Keys no field declares are
    /// dropped.
    ///
    /// # Errors
    /// Returns every violation found, in field order.
    pub fn materialize(&self, specs: &[FieldSpec], data: &Record) -> Result<Record, Violations> {
        let mut violations = Vec::new();
        let record = self.record(specs, data, &FieldPath::root(), Mode::Lax, &mut violations);
        if violations.is_empty() {
            Ok(record)
        } else {
            Err(Violations::new(violations))
        }
    }

    /// Coerce a single value the way collected input is coerced
    ///
    /// # Errors
    /// Returns the violations found, with paths relative to the value.
    pub fn coerce(&self, spec: &FieldSpec, value: &Value) -> Result<Value, Violations> {
        let mut violations = Vec::new();
        match self.value(spec, value, &FieldPath::root(), Mode::Lax, &mut violations) {
            Some(v) if violations.is_empty() => Ok(v),
            _ => Err(Violations::new(violations)),
        }
    }

    /// Check if `value` satisfies `spec` without any coercion
    #[must_use]
    pub fn conforms(&self, spec: &FieldSpec, value: &Value) -> bool {
        let mut violations = Vec::new();
        self.value(spec, value, &FieldPath::root(), Mode::Strict, &mut violations);
        violations.is_empty()
    }

    fn record(
        &self,
        specs: &[FieldSpec],
        data: &Record,
        path: &FieldPath,
        mode: Mode,
        out: &mut Vec<Violation>,
    ) -> Record {
        let mut record = Record::with_capacity(specs.len());
        for spec in specs {
            let at = path.child(spec.name.as_str());
            match data.get(&spec.name) {
                Some(value) => {
                    if let Some(v) = self.value(spec, value, &at, mode, out) {
                        record.insert(spec.name.clone(), v);
                    }
                }
                None => match &spec.default {
                    Some(default) => {
                        record.insert(spec.name.clone(), default.clone());
                    }
                    None => out.push(Violation::new(at, "Field required")),
                },
            }
        }
        for key in data.keys().filter(|k| !specs.iter().any(|s| &s.name == *k)) {
            match mode {
                Mode::Strict => {
                    let at = path.child(key.as_str());
                    out.push(Violation::new(at, "Extra inputs are not permitted"));
                }
                Mode::Lax => debug!(path = %path, key = %key, "ignoring undeclared key"),
            }
        }
        record
    }

    /// Coerce and check one value; `None` when a violation was recorded
    fn value(
        &self,
        spec: &FieldSpec,
        value: &Value,
        path: &FieldPath,
        mode: Mode,
        out: &mut Vec<Violation>,
    ) -> Option<Value> {
        if value.is_null() {
            if spec.kind == FieldKind::Optional || spec.declared.admits_null() {
                return Some(Value::Null);
            }
            out.push(Violation::new(path.clone(), "Input should not be None"));
            return None;
        }
        let coerced = match spec.kind {
            FieldKind::Optional => return self.value(&spec.unwrapped(), value, path, mode, out),
            FieldKind::Scalar => scalar(&spec.inner, value, mode),
            FieldKind::Temporal => temporal(&spec.inner, value, mode),
            FieldKind::Enum => enumeration(&spec.inner, value, mode),
            FieldKind::Literal => literal(&spec.inner, value, mode),
            FieldKind::List | FieldKind::Set => {
                return self.collection(spec, value, path, mode, out);
            }
            FieldKind::Mapping => return self.mapping(spec, value, path, mode, out),
            FieldKind::Union => return self.union(spec, value, path, mode, out),
            FieldKind::NestedSchema => return self.nested(spec, value, path, mode, out),
        };
        match coerced.and_then(|v| check_scalar(spec, v)) {
            Ok(v) => Some(v),
            Err(reason) => {
                out.push(Violation::new(path.clone(), reason));
                None
            }
        }
    }

    fn collection(
        &self,
        spec: &FieldSpec,
        value: &Value,
        path: &FieldPath,
        mode: Mode,
        out: &mut Vec<Violation>,
    ) -> Option<Value> {
        let is_set = spec.kind == FieldKind::Set;
        let items = match (value, mode) {
            (Value::List(items), _) if !is_set => items,
            (Value::Set(items), _) if is_set => items,
            (Value::List(items) | Value::Set(items), Mode::Lax) => items,
            _ => {
                let noun = if is_set { "set" } else { "list" };
                out.push(Violation::new(path.clone(), format!("Input should be a valid {noun}")));
                return None;
            }
        };
        let before = out.len();
        let mut coerced = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let Some(item_spec) = spec.branch(0, format!("{}[{i}]", spec.name)) else {
                continue;
            };
            if let Some(v) = self.value(&item_spec, item, &path.child(i), mode, out) {
                coerced.push(v);
            }
        }
        if out.len() > before {
            return None;
        }
        let result = if is_set {
            Value::set(coerced)
        } else {
            Value::List(coerced)
        };
        let len = result.as_items().map_or(0, <[Value]>::len);
        let noun = if is_set { "Set" } else { "List" };
        if let Some(reason) = spec.constraints.check_length(len, noun, "item") {
            out.push(Violation::new(path.clone(), reason));
            return None;
        }
        Some(result)
    }

    fn mapping(
        &self,
        spec: &FieldSpec,
        value: &Value,
        path: &FieldPath,
        mode: Mode,
        out: &mut Vec<Violation>,
    ) -> Option<Value> {
        let entries: Vec<(Value, Value)> = match (value, mode) {
            (Value::Map(entries), _) => entries.clone(),
            (Value::Record(record), Mode::Lax) => record
                .iter()
                .map(|(k, v)| (Value::Str(k.clone()), v.clone()))
                .collect(),
            _ => {
                out.push(Violation::new(path.clone(), "Input should be a valid dictionary"));
                return None;
            }
        };
        let (Some(key_spec), Some(value_spec)) = (
            spec.branch(0, format!("{} key", spec.name)),
            spec.branch(1, format!("{} value", spec.name)),
        ) else {
            return Some(Value::Map(entries));
        };
        let before = out.len();
        let mut coerced: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
        for (k, v) in &entries {
            let at = path.child(k.render());
            let key = self.value(&key_spec, k, &at, mode, out);
            let val = self.value(&value_spec, v, &at, mode, out);
            if let (Some(key), Some(val)) = (key, val) {
                match coerced.iter_mut().find(|(existing, _)| *existing == key) {
                    Some(slot) => slot.1 = val,
                    None => coerced.push((key, val)),
                }
            }
        }
        if out.len() > before {
            return None;
        }
        if let Some(reason) = spec.constraints.check_length(coerced.len(), "Dictionary", "item") {
            out.push(Violation::new(path.clone(), reason));
            return None;
        }
        Some(Value::Map(coerced))
    }

    fn union(
        &self,
        spec: &FieldSpec,
        value: &Value,
        path: &FieldPath,
        mode: Mode,
        out: &mut Vec<Violation>,
    ) -> Option<Value> {
        let branches: Vec<FieldSpec> = (0..spec.branches.len())
            .filter_map(|i| spec.branch(i, spec.name.clone()))
            .collect();
        let passes: &[Mode] = match mode {
            Mode::Strict => &[Mode::Strict],
            Mode::Lax => &[Mode::Strict, Mode::Lax],
        };
        for &pass in passes {
            for branch in &branches {
                let mut scratch = Vec::new();
                if let Some(v) = self.value(branch, value, path, pass, &mut scratch) {
                    if scratch.is_empty() {
                        return Some(v);
                    }
                }
            }
        }
        let names: Vec<String> = branches.iter().map(FieldSpec::type_name).collect();
        out.push(Violation::new(
            path.clone(),
            format!("Input did not match any union member ({})", names.join(", ")),
        ));
        None
    }

    fn nested(
        &self,
        spec: &FieldSpec,
        value: &Value,
        path: &FieldPath,
        mode: Mode,
        out: &mut Vec<Violation>,
    ) -> Option<Value> {
        let schema = spec.nested.as_deref()?;
        let converted;
        let data = match (value, mode) {
            (Value::Record(record), _) => record,
            (Value::Map(entries), Mode::Lax)
                if entries.iter().all(|(k, _)| k.as_str().is_some()) =>
            {
                converted = entries
                    .iter()
                    .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.clone())))
                    .collect::<Record>();
                &converted
            }
            _ => {
                out.push(Violation::new(
                    path.clone(),
                    format!(
                        "Input should be a valid dictionary or instance of {}",
                        spec.type_name()
                    ),
                ));
                return None;
            }
        };
        let specs = match self.introspector.fields_of(schema) {
            Ok(specs) => specs,
            Err(e) => {
                out.push(Violation::new(path.clone(), e.to_string()));
                return None;
            }
        };
        let before = out.len();
        let record = self.record(&specs, data, path, mode, out);
        (out.len() == before).then_some(Value::Record(record))
    }
}

const NOT_AN_INTEGER: &str = "Input should be a valid integer";
const FRACTIONAL_INTEGER: &str =
    "Input should be a valid integer, got a number with a fractional part";
const NOT_A_NUMBER: &str = "Input should be a valid number";

fn scalar(ty: &TypeExpr, value: &Value, mode: Mode) -> Result<Value, String> {
    let lax = mode == Mode::Lax;
    let text = value.as_str().map(str::trim);
    match (ty, value) {
        (TypeExpr::Bool, Value::Bool(_))
        | (TypeExpr::Int, Value::Int(_))
        | (TypeExpr::Float, Value::Float(_))
        | (TypeExpr::Decimal, Value::Decimal(_))
        | (TypeExpr::Str, Value::Str(_))
        | (TypeExpr::Custom(_), _) => Ok(value.clone()),

        (TypeExpr::Bool, _) if lax => match text.map(str::to_ascii_lowercase).as_deref() {
            Some("true" | "yes" | "y" | "on" | "1") => Ok(Value::Bool(true)),
            Some("false" | "no" | "n" | "off" | "0") => Ok(Value::Bool(false)),
            _ => match value {
                Value::Int(0) => Ok(Value::Bool(false)),
                Value::Int(1) => Ok(Value::Bool(true)),
                _ => Err("Input should be a valid boolean".into()),
            },
        },
        (TypeExpr::Bool, _) => Err("Input should be a valid boolean".into()),

        (TypeExpr::Int, _) if lax => match value {
            Value::Str(_) => text
                .and_then(|t| t.parse::<i64>().ok())
                .map(Value::Int)
                .ok_or_else(|| {
                    format!("{NOT_AN_INTEGER}, unable to parse string as an integer")
                }),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                BigDecimal::from_str(&format!("{f:.0}"))
                    .ok()
                    .and_then(|d| d.to_i64())
                    .map(Value::Int)
                    .ok_or_else(|| NOT_AN_INTEGER.into())
            }
            Value::Float(_) => Err(FRACTIONAL_INTEGER.into()),
            Value::Decimal(d) if d.is_integer() => {
                d.to_i64().map(Value::Int).ok_or_else(|| NOT_AN_INTEGER.into())
            }
            Value::Decimal(_) => Err(FRACTIONAL_INTEGER.into()),
            _ => Err(NOT_AN_INTEGER.into()),
        },
        (TypeExpr::Int, _) => Err(NOT_AN_INTEGER.into()),

        (TypeExpr::Float, _) if lax => match value {
            Value::Int(i) => i.to_f64().map(Value::Float).ok_or_else(|| NOT_A_NUMBER.into()),
            Value::Decimal(d) => d.to_f64().map(Value::Float).ok_or_else(|| NOT_A_NUMBER.into()),
            Value::Str(_) => text
                .and_then(|t| t.parse::<f64>().ok())
                .map(Value::Float)
                .ok_or_else(|| format!("{NOT_A_NUMBER}, unable to parse string as a number")),
            _ => Err(NOT_A_NUMBER.into()),
        },
        (TypeExpr::Float, _) => Err(NOT_A_NUMBER.into()),

        (TypeExpr::Decimal, _) if lax => match value {
            Value::Str(_) => text
                .and_then(|t| BigDecimal::from_str(t).ok())
                .map(Value::Decimal)
                .ok_or_else(|| "Input should be a valid decimal".into()),
            Value::Int(_) | Value::Float(_) => value
                .to_decimal()
                .map(Value::Decimal)
                .ok_or_else(|| "Input should be a finite number".into()),
            _ => Err("Input should be a valid decimal".into()),
        },
        (TypeExpr::Decimal, _) => Err("Input should be a valid decimal".into()),

        (TypeExpr::Str, _) => Err("Input should be a valid string".into()),
        (TypeExpr::Null, _) => Err("Input should be None".into()),
        (other, _) => Err(format!("Input should be a valid {other}")),
    }
}

fn temporal(ty: &TypeExpr, value: &Value, mode: Mode) -> Result<Value, String> {
    let lax = mode == Mode::Lax;
    let text = value.as_str().filter(|_| lax);
    let parsed = match (ty, value) {
        (TypeExpr::DateTime, Value::DateTime(_) | Value::ZonedDateTime(_))
        | (TypeExpr::Date, Value::Date(_))
        | (TypeExpr::Time, Value::Time(_))
        | (TypeExpr::Duration, Value::Duration(_)) => Some(value.clone()),
        (TypeExpr::DateTime, _) => text.and_then(iso8601::parse_datetime).map(Value::from_datetime),
        (TypeExpr::Date, _) => text.and_then(iso8601::parse_date).map(Value::Date),
        (TypeExpr::Time, _) => text.and_then(iso8601::parse_time).map(Value::Time),
        (TypeExpr::Duration, Value::Int(_) | Value::Float(_)) if lax => value
            .to_decimal()
            .map(|d| d * BigDecimal::from(1_000_000))
            .and_then(|micros| micros.round(0).to_i64())
            .map(|micros| Value::Duration(chrono::TimeDelta::microseconds(micros))),
        (TypeExpr::Duration, _) => text.and_then(iso8601::parse_duration).map(Value::Duration),
        _ => None,
    };
    parsed.ok_or_else(|| match ty {
        TypeExpr::Duration => "Input should be a valid duration".to_string(),
        other => format!("Input should be a valid {other}"),
    })
}

/// `'a', 'b' or 'c'`
fn expected_choices(values: impl Iterator<Item = String>) -> String {
    let quoted: Vec<String> = values.map(|v| format!("'{v}'")).collect();
    match quoted.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {last}", rest.join(", ")),
        Some((last, _)) => last.clone(),
        None => String::new(),
    }
}

fn enumeration(ty: &TypeExpr, value: &Value, mode: Mode) -> Result<Value, String> {
    let TypeExpr::Enum(def) = ty else {
        return Err("Input should be a valid enumeration member".into());
    };
    let member = match value {
        Value::Enum { member, .. } => def.member_named(member),
        raw if mode == Mode::Lax => def
            .member_with_value(raw)
            .or_else(|| raw.as_str().and_then(|name| def.member_named(name))),
        _ => None,
    };
    member.map(EnumDef::value_of).ok_or_else(|| {
        format!(
            "Input should be {}",
            expected_choices(def.members.iter().map(|m| m.value.render()))
        )
    })
}

fn literal(ty: &TypeExpr, value: &Value, mode: Mode) -> Result<Value, String> {
    let TypeExpr::Literal(values) = ty else {
        return Err("Input should be a literal value".into());
    };
    values
        .iter()
        .find(|v| *v == value || (mode == Mode::Lax && value.as_str() == Some(v.render().as_str())))
        .cloned()
        .ok_or_else(|| {
            let expected = expected_choices(values.iter().map(Value::render));
            format!("Input should be {expected}")
        })
}

/// Apply numeric, length and pattern constraints to a coerced scalar
fn check_scalar(spec: &FieldSpec, value: Value) -> Result<Value, String> {
    let constraints = &spec.constraints;
    if constraints.is_empty() {
        return Ok(value);
    }
    if let Value::Str(text) = &value {
        let length = text.chars().count();
        if let Some(reason) = constraints.check_length(length, "String", "character") {
            return Err(reason);
        }
        if let Some(reason) = constraints.check_pattern(text) {
            return Err(reason);
        }
    } else if matches!(value, Value::Int(_) | Value::Float(_) | Value::Decimal(_)) {
        if let Some(reason) = value.to_decimal().and_then(|n| constraints.check_number(&n)) {
            return Err(reason);
        }
    }
    Ok(value)
}
