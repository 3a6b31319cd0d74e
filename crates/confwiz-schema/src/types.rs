//! Declared field types
//!
//! [`TypeExpr`] is the type of a field exactly as the schema author wrote it.
//! Optionality and unions stay visible here; classifying a type into a prompt
//! strategy happens during introspection.

use std::fmt::{self, Display, Formatter};

use crate::constraints::Constraints;
use crate::value::Value;

/// Declared type of a schema field
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// `true` / `false`
    Bool,
    /// 64-bit signed integer
    Int,
    /// Binary floating point
    Float,
    /// Arbitrary-precision decimal
    Decimal,
    /// Text
    Str,
    /// Date and time of day, with or without offset
    DateTime,
    /// Calendar date
    Date,
    /// Time of day
    Time,
    /// Signed span of time
    Duration,
    /// The absent value
    Null,
    /// Closed set of named members
    Enum(EnumDef),
    /// One of a fixed list of values
    Literal(Vec<Value>),
    /// The inner type, or absent
    Optional(Box<TypeExpr>),
    /// Ordered sequence
    List(Box<TypeExpr>),
    /// Unordered collection without duplicates
    Set(Box<TypeExpr>),
    /// Key/value mapping
    Map(Box<TypeExpr>, Box<TypeExpr>),
    /// Exactly one of the alternatives
    Union(Vec<TypeExpr>),
    /// Reference to a nested schema by fully-qualified name
    Schema(String),
    /// Inner type narrowed by constraints
    Constrained(Box<TypeExpr>, Constraints),
    /// Type known only to a user-registered handler
    Custom(String),
}

impl TypeExpr {
    /// `inner | None`
    #[inline]
    #[must_use]
    pub fn optional(inner: TypeExpr) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// `list[element]`
    #[inline]
    #[must_use]
    pub fn list(element: TypeExpr) -> Self {
        Self::List(Box::new(element))
    }

    /// `set[element]`
    #[inline]
    #[must_use]
    pub fn set(element: TypeExpr) -> Self {
        Self::Set(Box::new(element))
    }

    /// `dict[key, value]`
    #[inline]
    #[must_use]
    pub fn map(key: TypeExpr, value: TypeExpr) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// Union of alternatives, in declaration order
    #[inline]
    #[must_use]
    pub fn union(alternatives: impl IntoIterator<Item = TypeExpr>) -> Self {
        Self::Union(alternatives.into_iter().collect())
    }

    /// Nested schema reference
    #[inline]
    #[must_use]
    pub fn schema(name: impl Into<String>) -> Self {
        Self::Schema(name.into())
    }

    /// Literal choices
    #[inline]
    #[must_use]
    pub fn literal(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::Literal(values.into_iter().map(Into::into).collect())
    }

    /// Attach constraints to a type
    #[inline]
    #[must_use]
    pub fn constrained(inner: TypeExpr, constraints: Constraints) -> Self {
        Self::Constrained(Box::new(inner), constraints)
    }

    /// Check if this is the null type
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if the type accepts the absent value
    #[must_use]
    pub fn admits_null(&self) -> bool {
        match self {
            Self::Null | Self::Optional(_) => true,
            Self::Union(alternatives) => alternatives.iter().any(Self::admits_null),
            Self::Constrained(inner, _) => inner.admits_null(),
            _ => false,
        }
    }

    /// Type with all constraint layers removed
    #[must_use]
    pub fn without_constraints(&self) -> &TypeExpr {
        match self {
            Self::Constrained(inner, _) => inner.without_constraints(),
            other => other,
        }
    }

    /// Names of every schema this type refers to, in order of appearance
    #[must_use]
    pub fn schema_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_schema_refs(&mut refs);
        refs
    }

    fn collect_schema_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Schema(name) => out.push(name),
            Self::Optional(inner) | Self::List(inner) | Self::Set(inner) => {
                inner.collect_schema_refs(out);
            }
            Self::Constrained(inner, _) => inner.collect_schema_refs(out),
            Self::Map(key, value) => {
                key.collect_schema_refs(out);
                value.collect_schema_refs(out);
            }
            Self::Union(alternatives) => {
                for alternative in alternatives {
                    alternative.collect_schema_refs(out);
                }
            }
            _ => {}
        }
    }
}

impl Display for TypeExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Decimal => f.write_str("Decimal"),
            Self::Str => f.write_str("str"),
            Self::DateTime => f.write_str("datetime"),
            Self::Date => f.write_str("date"),
            Self::Time => f.write_str("time"),
            Self::Duration => f.write_str("timedelta"),
            Self::Null => f.write_str("None"),
            Self::Enum(def) => f.write_str(def.simple_name()),
            Self::Literal(values) => {
                f.write_str("Literal[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match value {
                        Value::Str(s) => write!(f, "'{s}'")?,
                        other => f.write_str(&other.render())?,
                    }
                }
                f.write_str("]")
            }
            Self::Optional(inner) => write!(f, "{inner} | None"),
            Self::List(element) => write!(f, "list[{element}]"),
            Self::Set(element) => write!(f, "set[{element}]"),
            Self::Map(key, value) => write!(f, "dict[{key}, {value}]"),
            Self::Union(alternatives) => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{alternative}")?;
                }
                Ok(())
            }
            Self::Schema(name) => f.write_str(simple_name(name)),
            Self::Constrained(inner, _) => write!(f, "{inner}"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Member of an [`EnumDef`]
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    /// Symbolic member name
    pub name: String,
    /// Underlying value written to documents
    pub value: Value,
}

impl EnumMember {
    /// Create new member
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Enumeration definition
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    /// Fully-qualified enumeration name
    pub name: String,
    /// Members in declaration order
    pub members: Vec<EnumMember>,
}

impl EnumDef {
    /// Create new enumeration
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, members: Vec<EnumMember>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    /// Enumeration whose member values equal their names
    #[must_use]
    pub fn from_names(name: impl Into<String>, members: &[&str]) -> Self {
        Self::new(
            name,
            members
                .iter()
                .map(|m| EnumMember::new(*m, Value::Str((*m).to_string())))
                .collect(),
        )
    }

    /// Last segment of the name
    #[inline]
    #[must_use]
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    /// Find member by symbolic name
    #[must_use]
    pub fn member_named(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Find member by underlying value
    #[must_use]
    pub fn member_with_value(&self, value: &Value) -> Option<&EnumMember> {
        self.members.iter().find(|m| &m.value == value)
    }

    /// Position of a member by symbolic name
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }

    /// Enum value for a member
    #[must_use]
    pub fn value_of(member: &EnumMember) -> Value {
        Value::Enum {
            member: member.name.clone(),
            value: Box::new(member.value.clone()),
        }
    }
}

pub(crate) fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_enum() -> EnumDef {
        EnumDef::from_names("tests.SampleEnum", &["a", "b", "c"])
    }

    #[test]
    fn display_scalars_and_collections() {
        assert_eq!(TypeExpr::list(TypeExpr::Int).to_string(), "list[int]");
        assert_eq!(
            TypeExpr::map(TypeExpr::Str, TypeExpr::Decimal).to_string(),
            "dict[str, Decimal]"
        );
        assert_eq!(TypeExpr::optional(TypeExpr::Str).to_string(), "str | None");
        assert_eq!(TypeExpr::Duration.to_string(), "timedelta");
    }

    #[test]
    fn display_union_and_schema() {
        let ty = TypeExpr::union([
            TypeExpr::schema("tests.InnerModel"),
            TypeExpr::schema("tests.SimpleConfig"),
            TypeExpr::Null,
        ]);
        assert_eq!(ty.to_string(), "InnerModel | SimpleConfig | None");
    }

    #[test]
    fn display_literal() {
        let ty = TypeExpr::literal(["aggressive", "passive"]);
        assert_eq!(ty.to_string(), "Literal['aggressive', 'passive']");
    }

    #[test]
    fn admits_null() {
        assert!(TypeExpr::optional(TypeExpr::Int).admits_null());
        assert!(TypeExpr::union([TypeExpr::Int, TypeExpr::Null]).admits_null());
        assert!(!TypeExpr::union([TypeExpr::Int, TypeExpr::Str]).admits_null());
        assert!(!TypeExpr::list(TypeExpr::optional(TypeExpr::Int)).admits_null());
    }

    #[test]
    fn schema_refs_in_order() {
        let ty = TypeExpr::union([
            TypeExpr::list(TypeExpr::schema("a.B")),
            TypeExpr::map(TypeExpr::Str, TypeExpr::schema("a.C")),
        ]);
        assert_eq!(ty.schema_refs(), vec!["a.B", "a.C"]);
    }

    #[test]
    fn enum_lookup() {
        let def = sample_enum();
        assert_eq!(def.simple_name(), "SampleEnum");
        assert_eq!(def.position("b"), Some(1));
        assert!(def.member_with_value(&Value::Str("c".into())).is_some());
        assert!(def.member_named("z").is_none());
    }
}
