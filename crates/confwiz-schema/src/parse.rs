//! Textual type expressions
//!
//! Parses the type notation used by catalog files:
//!
//! ```text
//! int | str | None
//! list[InnerModel]
//! dict[str, Decimal]
//! Optional[set[Mode]]
//! Literal['aggressive', 'passive', 3]
//! ```
//!
//! Unknown bare identifiers become [`TypeExpr::Schema`] references; a catalog
//! later rebinds those naming one of its enumerations.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char, i64 as integer, multispace0};
use nom::combinator::{all_consuming, map, opt, recognize, value};
use nom::error::Error as NomError;
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, pair, preceded};
use nom::{IResult, Parser};

use crate::error::TypeParseError;
use crate::types::TypeExpr;
use crate::value::Value;

/// Syntax tree before names are bound to types
#[derive(Debug, Clone, PartialEq)]
enum Syntax<'a> {
    Named {
        name: &'a str,
        args: Option<Vec<Syntax<'a>>>,
    },
    Literal(Vec<Value>),
    Union(Vec<Syntax<'a>>),
}

/// Parse a type expression
///
/// # Errors
/// Returns error if the text is not a well-formed type expression or uses an
/// unknown generic such as `tuple[int]`.
pub fn parse_type(input: &str) -> Result<TypeExpr, TypeParseError> {
    let parsed = all_consuming(ws(type_expr)).parse(input);
    match parsed {
        Ok((_, syntax)) => lower(input, syntax),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            let offset = input.len() - e.input.len();
            Err(TypeParseError::new(
                input,
                format!("unexpected input at offset {offset}"),
            ))
        }
        Err(nom::Err::Incomplete(_)) => Err(TypeParseError::new(input, "incomplete input")),
    }
}

fn ws<'a, O, P>(inner: P) -> impl Parser<&'a str, Output = O, Error = NomError<&'a str>>
where
    P: Parser<&'a str, Output = O, Error = NomError<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
    ))
    .parse(input)
}

fn type_expr(input: &str) -> IResult<&str, Syntax<'_>> {
    let (input, first) = atom(input)?;
    let (input, rest) = many0(preceded(ws(char('|')), atom)).parse(input)?;
    if rest.is_empty() {
        Ok((input, first))
    } else {
        let mut alternatives = vec![first];
        alternatives.extend(rest);
        Ok((input, Syntax::Union(alternatives)))
    }
}

fn atom(input: &str) -> IResult<&str, Syntax<'_>> {
    let (input, name) = ws(identifier).parse(input)?;
    if name == "Literal" {
        let (input, values) = delimited(
            ws(char('[')),
            separated_list1(ws(char(',')), ws(literal_value)),
            ws(char(']')),
        )
        .parse(input)?;
        return Ok((input, Syntax::Literal(values)));
    }
    let (input, args) = opt(delimited(
        ws(char('[')),
        separated_list1(ws(char(',')), type_expr),
        ws(char(']')),
    ))
    .parse(input)?;
    Ok((input, Syntax::Named { name, args }))
}

fn literal_value(input: &str) -> IResult<&str, Value> {
    alt((
        map(
            delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
            |s: &str| Value::Str(s.to_string()),
        ),
        map(
            delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
            |s: &str| Value::Str(s.to_string()),
        ),
        map(integer, Value::Int),
        map(
            alt((
                value(true, tag("True")),
                value(true, tag("true")),
                value(false, tag("False")),
                value(false, tag("false")),
            )),
            Value::Bool,
        ),
    ))
    .parse(input)
}

fn lower(input: &str, syntax: Syntax<'_>) -> Result<TypeExpr, TypeParseError> {
    match syntax {
        Syntax::Literal(values) => Ok(TypeExpr::Literal(values)),
        Syntax::Union(parts) => {
            let alternatives = parts
                .into_iter()
                .map(|p| lower(input, p))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(normalize_union(alternatives))
        }
        Syntax::Named { name, args: None } => Ok(scalar(name)),
        Syntax::Named {
            name,
            args: Some(args),
        } => {
            let mut args = args
                .into_iter()
                .map(|a| lower(input, a))
                .collect::<Result<Vec<_>, _>>()?;
            let count = args.len();
            let arity = |expected: usize| {
                if count == expected {
                    Ok(())
                } else {
                    Err(TypeParseError::new(
                        input,
                        format!("'{name}' takes {expected} type argument(s), got {count}"),
                    ))
                }
            };
            match name {
                "list" | "List" | "Sequence" => {
                    arity(1)?;
                    Ok(TypeExpr::list(args.remove(0)))
                }
                "set" | "Set" | "frozenset" | "FrozenSet" => {
                    arity(1)?;
                    Ok(TypeExpr::set(args.remove(0)))
                }
                "dict" | "Dict" | "Mapping" => {
                    arity(2)?;
                    let value = args.remove(1);
                    Ok(TypeExpr::map(args.remove(0), value))
                }
                "Optional" => {
                    arity(1)?;
                    Ok(TypeExpr::optional(args.remove(0)))
                }
                "Union" => Ok(normalize_union(args)),
                other => Err(TypeParseError::new(
                    input,
                    format!("unknown generic type '{other}'"),
                )),
            }
        }
    }
}

fn scalar(name: &str) -> TypeExpr {
    match name {
        "bool" => TypeExpr::Bool,
        "int" => TypeExpr::Int,
        "float" => TypeExpr::Float,
        "Decimal" | "decimal" => TypeExpr::Decimal,
        "str" => TypeExpr::Str,
        "datetime" => TypeExpr::DateTime,
        "date" => TypeExpr::Date,
        "time" => TypeExpr::Time,
        "timedelta" | "duration" => TypeExpr::Duration,
        "None" | "null" => TypeExpr::Null,
        other => TypeExpr::Schema(other.to_string()),
    }
}

/// `X | None` reads as `Optional[X]`; anything else stays a union
fn normalize_union(mut alternatives: Vec<TypeExpr>) -> TypeExpr {
    if alternatives.len() == 1 {
        return alternatives.remove(0);
    }
    if alternatives.len() == 2 {
        if let Some(null_at) = alternatives.iter().position(TypeExpr::is_null) {
            let other = alternatives.remove(1 - null_at);
            if !other.is_null() {
                return TypeExpr::optional(other);
            }
            alternatives.insert(0, other);
        }
    }
    TypeExpr::Union(alternatives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalars() {
        assert_eq!(parse_type("int").unwrap(), TypeExpr::Int);
        assert_eq!(parse_type(" Decimal ").unwrap(), TypeExpr::Decimal);
        assert_eq!(parse_type("timedelta").unwrap(), TypeExpr::Duration);
    }

    #[test]
    fn optional_forms_agree() {
        let expected = TypeExpr::optional(TypeExpr::Str);
        assert_eq!(parse_type("str | None").unwrap(), expected);
        assert_eq!(parse_type("None | str").unwrap(), expected);
        assert_eq!(parse_type("Optional[str]").unwrap(), expected);
        assert_eq!(parse_type("Union[str, None]").unwrap(), expected);
    }

    #[test]
    fn unions_keep_order() {
        let ty = parse_type("InnerModel | app.SimpleConfig | None").unwrap();
        assert_eq!(
            ty,
            TypeExpr::union([
                TypeExpr::schema("InnerModel"),
                TypeExpr::schema("app.SimpleConfig"),
                TypeExpr::Null,
            ])
        );
    }

    #[test]
    fn nested_generics() {
        let ty = parse_type("dict[str, list[set[int]]]").unwrap();
        assert_eq!(
            ty,
            TypeExpr::map(
                TypeExpr::Str,
                TypeExpr::list(TypeExpr::set(TypeExpr::Int))
            )
        );
    }

    #[test]
    fn union_inside_generic() {
        let ty = parse_type("list[int | str]").unwrap();
        assert_eq!(
            ty,
            TypeExpr::list(TypeExpr::union([TypeExpr::Int, TypeExpr::Str]))
        );
    }

    #[test]
    fn literals() {
        let ty = parse_type("Literal['aggressive', \"passive\", 3, True]").unwrap();
        assert_eq!(
            ty,
            TypeExpr::Literal(vec![
                Value::Str("aggressive".into()),
                Value::Str("passive".into()),
                Value::Int(3),
                Value::Bool(true),
            ])
        );
    }

    #[test]
    fn wrong_arity() {
        let err = parse_type("dict[str]").unwrap_err();
        assert!(err.message.contains("takes 2"));
    }

    #[test]
    fn unknown_generic() {
        let err = parse_type("tuple[int, str]").unwrap_err();
        assert!(err.message.contains("unknown generic"));
    }

    #[test]
    fn trailing_garbage() {
        assert!(parse_type("int]").is_err());
        assert!(parse_type("list[int").is_err());
        assert!(parse_type("").is_err());
    }
}
