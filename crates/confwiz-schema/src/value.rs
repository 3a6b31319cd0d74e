//! Typed configuration values
//!
//! [`Value`] is what prompting produces, what validation checks, and what the
//! canonical codec turns into document primitives. A [`Record`] maps field
//! names to values in schema declaration order.

use std::cmp::Ordering;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use indexmap::IndexMap;

use crate::iso8601::{self, ParsedDateTime};
use crate::path::{FieldPath, Segment};

/// Field values keyed by field name, in insertion order
pub type Record = IndexMap<String, Value>;

/// A configuration value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Binary floating point
    Float(f64),
    /// Decimal, kept at its original precision
    Decimal(BigDecimal),
    /// Text
    Str(String),
    /// Datetime without offset
    DateTime(NaiveDateTime),
    /// Datetime with a UTC offset
    ZonedDateTime(DateTime<FixedOffset>),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// Span of time
    Duration(TimeDelta),
    /// Enumeration member and its underlying value
    Enum {
        /// Member name
        member: String,
        /// Underlying value
        value: Box<Value>,
    },
    /// Ordered sequence
    List(Vec<Value>),
    /// Deduplicated collection in canonical order (see [`Value::set`])
    Set(Vec<Value>),
    /// Key/value pairs in insertion order
    Map(Vec<(Value, Value)>),
    /// Nested schema instance
    Record(Record),
}

impl Value {
    /// Build a set value: sorted canonically with duplicates removed
    #[must_use]
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        let mut items: Vec<Value> = items.into_iter().collect();
        items.sort_by(Value::canonical_cmp);
        items.dedup_by(|a, b| a.canonical_cmp(b) == Ordering::Equal);
        Self::Set(items)
    }

    /// Value from a parsed datetime
    #[must_use]
    pub fn from_datetime(parsed: ParsedDateTime) -> Self {
        match parsed {
            ParsedDateTime::Naive(dt) => Self::DateTime(dt),
            ParsedDateTime::Zoned(dt) => Self::ZonedDateTime(dt),
        }
    }

    /// Check if value is null
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow as text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as nested record
    #[inline]
    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Borrow items of a list or set
    #[inline]
    #[must_use]
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) | Self::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the value's kind, for messages
    #[must_use]
    pub fn type_label(&self) -> &'static str {
        match self {
            Self::Null => "None",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "Decimal",
            Self::Str(_) => "str",
            Self::DateTime(_) | Self::ZonedDateTime(_) => "datetime",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Duration(_) => "timedelta",
            Self::Enum { .. } => "enum",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "dict",
            Self::Record(_) => "record",
        }
    }

    /// Numeric value as a decimal, for integers, floats and decimals
    #[must_use]
    pub fn to_decimal(&self) -> Option<BigDecimal> {
        match self {
            Self::Int(i) => Some(BigDecimal::from(*i)),
            Self::Float(f) if f.is_finite() => BigDecimal::from_str(&float_text(*f)).ok(),
            Self::Decimal(d) => Some(d.clone()),
            Self::Enum { value, .. } => value.to_decimal(),
            _ => None,
        }
    }

    /// Human-readable text, used for echoes, defaults and summaries
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Null => "None".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => float_text(*f),
            Self::Decimal(d) => d.to_string(),
            Self::Str(s) => s.clone(),
            Self::DateTime(dt) => iso8601::format_datetime(dt),
            Self::ZonedDateTime(dt) => iso8601::format_zoned(dt),
            Self::Date(d) => iso8601::format_date(d),
            Self::Time(t) => iso8601::format_time(t),
            Self::Duration(d) => iso8601::format_duration(d),
            Self::Enum { value, .. } => value.render(),
            Self::List(items) => format!("[{}]", join_rendered(items.iter())),
            Self::Set(items) => format!("{{{}}}", join_rendered(items.iter())),
            Self::Map(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.render(), v.render()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Self::Record(record) => {
                let parts: Vec<String> = record
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.render()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
        }
    }

    /// Untyped conversion from a document primitive
    ///
    /// Mappings with only text keys become records; other mappings become
    /// key/value pairs.
    #[must_use]
    pub fn from_yaml(raw: &serde_yaml::Value) -> Self {
        use serde_yaml::Value as Yaml;

        match raw {
            Yaml::Null => Self::Null,
            Yaml::Bool(b) => Self::Bool(*b),
            Yaml::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Yaml::String(s) => Self::Str(s.clone()),
            Yaml::Sequence(items) => Self::List(items.iter().map(Self::from_yaml).collect()),
            Yaml::Mapping(mapping) => {
                if mapping.keys().all(Yaml::is_string) {
                    Self::Record(
                        mapping
                            .iter()
                            .filter_map(|(k, v)| {
                                Some((k.as_str()?.to_string(), Self::from_yaml(v)))
                            })
                            .collect(),
                    )
                } else {
                    Self::Map(
                        mapping
                            .iter()
                            .map(|(k, v)| (Self::from_yaml(k), Self::from_yaml(v)))
                            .collect(),
                    )
                }
            }
            Yaml::Tagged(tagged) => Self::from_yaml(&tagged.value),
        }
    }

    /// Total order used for set members and canonical set output
    ///
    /// Numbers compare numerically across integer, float and decimal; text
    /// compares lexicographically; enum members compare by underlying value;
    /// values of unrelated kinds compare by kind.
    #[must_use]
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Enum { value, .. }, _) => value.canonical_cmp(other),
            (_, Self::Enum { value, .. }) => self.canonical_cmp(value),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (a, b) if a.rank() == 2 && b.rank() == 2 => match (a.to_decimal(), b.to_decimal()) {
                (Some(x), Some(y)) => x.cmp(&y),
                (x, y) => x.is_some().cmp(&y.is_some()),
            },
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (a, b) if a.rank() == 5 && b.rank() == 5 => a.instant().cmp(&b.instant()),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            (Self::Duration(a), Self::Duration(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) | (Self::Set(a), Self::Set(b)) => cmp_seq(a, b),
            (Self::Map(a), Self::Map(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b) {
                    let ord = ka.canonical_cmp(kb).then_with(|| va.canonical_cmp(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (Self::Record(a), Self::Record(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b) {
                    let ord = ka.cmp(kb).then_with(|| va.canonical_cmp(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) | Self::Decimal(_) => 2,
            Self::Str(_) => 3,
            Self::Date(_) => 4,
            Self::DateTime(_) | Self::ZonedDateTime(_) => 5,
            Self::Time(_) => 6,
            Self::Duration(_) => 7,
            Self::Enum { value, .. } => value.rank(),
            Self::List(_) => 8,
            Self::Set(_) => 9,
            Self::Map(_) => 10,
            Self::Record(_) => 11,
        }
    }

    fn instant(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            Self::ZonedDateTime(dt) => Some(dt.naive_utc()),
            _ => None,
        }
    }
}

/// Text form of a float that always reads back as a float
pub(crate) fn float_text(f: f64) -> String {
    format!("{f:?}")
}

fn join_rendered<'a>(items: impl Iterator<Item = &'a Value>) -> String {
    items.map(Value::render).collect::<Vec<_>>().join(", ")
}

fn cmp_seq(a: &[Value], b: &[Value]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = x.canonical_cmp(y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<BigDecimal> for Value {
    fn from(d: BigDecimal) -> Self {
        Self::Decimal(d)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Self::Record(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

/// Find the value at `path` inside `record`
///
/// Named segments descend into records and text-keyed mappings; index
/// segments descend into lists and sets.
#[must_use]
pub fn lookup<'a>(record: &'a Record, path: &FieldPath) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = record.get(first.as_field()?)?;
    for segment in rest {
        current = step(current, segment)?;
    }
    Some(current)
}

fn step<'a>(value: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (value, segment) {
        (Value::Record(r), Segment::Field(name)) => r.get(name),
        (Value::Map(entries), Segment::Field(name)) => entries
            .iter()
            .find(|(k, _)| k.render() == *name)
            .map(|(_, v)| v),
        (Value::List(items) | Value::Set(items), Segment::Index(i)) => items.get(*i),
        _ => None,
    }
}

/// Replace the value at `path` inside `record`
///
/// A missing final field of a record is inserted. Returns `false` when the
/// path does not lead to an existing container.
pub fn assign(record: &mut Record, path: &FieldPath, value: Value) -> bool {
    let Some((first, rest)) = path.segments().split_first() else {
        return false;
    };
    let Some(name) = first.as_field() else {
        return false;
    };
    if rest.is_empty() {
        record.insert(name.to_string(), value);
        return true;
    }
    match record.get_mut(name) {
        Some(current) => assign_within(current, rest, value),
        None => false,
    }
}

fn assign_within(container: &mut Value, path: &[Segment], value: Value) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return false;
    };
    let slot = match (container, head) {
        (Value::Record(r), Segment::Field(name)) => {
            if rest.is_empty() {
                r.insert(name.clone(), value);
                return true;
            }
            r.get_mut(name)
        }
        (Value::Map(entries), Segment::Field(name)) => entries
            .iter_mut()
            .find(|(k, _)| k.render() == *name)
            .map(|(_, v)| v),
        (Value::List(items) | Value::Set(items), Segment::Index(i)) => items.get_mut(*i),
        _ => None,
    };
    match slot {
        Some(slot) if rest.is_empty() => {
            *slot = value;
            true
        }
        Some(slot) => assign_within(slot, rest, value),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Value {
        Value::Decimal(BigDecimal::from_str(s).unwrap())
    }

    #[test]
    fn set_sorts_and_dedups() {
        let set = Value::set(vec![
            Value::Str("b".into()),
            Value::Str("a".into()),
            Value::Str("b".into()),
        ]);
        assert_eq!(
            set,
            Value::Set(vec![Value::Str("a".into()), Value::Str("b".into())])
        );
    }

    #[test]
    fn numbers_compare_across_kinds() {
        assert_eq!(Value::Int(2).canonical_cmp(&Value::Float(1.5)), Ordering::Greater);
        assert_eq!(dec("2.0").canonical_cmp(&Value::Int(2)), Ordering::Equal);
        assert_eq!(Value::Int(10).canonical_cmp(&Value::Int(9)), Ordering::Greater);
    }

    #[test]
    fn numbers_sort_numerically_not_textually() {
        let set = Value::set(vec![Value::Int(10), Value::Int(9), Value::Int(100)]);
        assert_eq!(
            set,
            Value::Set(vec![Value::Int(9), Value::Int(10), Value::Int(100)])
        );
    }

    #[test]
    fn enums_compare_by_value() {
        let a = Value::Enum {
            member: "OPTION_A".into(),
            value: Box::new(Value::Str("a".into())),
        };
        let b = Value::Enum {
            member: "OPTION_B".into(),
            value: Box::new(Value::Str("b".into())),
        };
        assert_eq!(a.canonical_cmp(&b), Ordering::Less);
    }

    #[test]
    fn render_keeps_decimal_precision() {
        assert_eq!(dec("30.0").render(), "30.0");
        assert_eq!(Value::Float(1.0).render(), "1.0");
        assert_eq!(Value::Duration(TimeDelta::seconds(90)).render(), "PT90S");
    }

    #[test]
    fn render_collections() {
        let list = Value::List(vec![Value::Int(1), Value::Str("x".into())]);
        assert_eq!(list.render(), "[1, x]");
    }

    #[test]
    fn from_yaml_mapping_with_text_keys() {
        let raw: serde_yaml::Value = serde_yaml::from_str("name: a\nvalue: 3\n").unwrap();
        let value = Value::from_yaml(&raw);
        let record = value.as_record().unwrap();
        assert_eq!(record.get("value"), Some(&Value::Int(3)));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["name", "value"]);
    }

    #[test]
    fn from_yaml_mapping_with_int_keys() {
        let raw: serde_yaml::Value = serde_yaml::from_str("1: a\n2: b\n").unwrap();
        assert!(matches!(Value::from_yaml(&raw), Value::Map(entries) if entries.len() == 2));
    }

    #[test]
    fn lookup_and_assign_through_lists() {
        let mut element = Record::new();
        element.insert("value".into(), Value::Int(1));
        let mut root = Record::new();
        root.insert("scores".into(), Value::List(vec![Value::Record(element)]));

        let path: FieldPath = "scores.0.value".parse().unwrap();
        assert_eq!(lookup(&root, &path), Some(&Value::Int(1)));

        assert!(assign(&mut root, &path, Value::Int(7)));
        assert_eq!(lookup(&root, &path), Some(&Value::Int(7)));
    }

    #[test]
    fn assign_rejects_missing_container() {
        let mut root = Record::new();
        let path: FieldPath = "inner.value".parse().unwrap();
        assert!(!assign(&mut root, &path, Value::Int(1)));
    }

    #[test]
    fn assign_top_level_keeps_position() {
        let mut root = Record::new();
        root.insert("a".into(), Value::Int(1));
        root.insert("b".into(), Value::Int(2));
        assert!(assign(&mut root, &FieldPath::field("a"), Value::Int(9)));
        assert_eq!(root.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
