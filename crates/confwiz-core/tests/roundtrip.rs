//! Canonical conversion laws
//!
//! Every built-in handler reads back what it writes, and documents keep
//! declaration order.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime, TimeDelta};
use confwiz_core::{CanonicalCodec, CodecContext, FieldSpec, Introspector, TypeHandlerRegistry};
use confwiz_schema::{Record, SchemaResolver, TypeExpr, Value};
use confwiz_test_utils::{record, sample_complex_data, sample_enum, COMPLEX_CONFIG, INNER_MODEL};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn text() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9 _-]{0,11}"
}

fn case() -> impl Strategy<Value = (TypeExpr, Value)> {
    prop_oneof![
        any::<bool>().prop_map(|b| (TypeExpr::Bool, Value::Bool(b))),
        any::<i64>().prop_map(|i| (TypeExpr::Int, Value::Int(i))),
        (-1.0e9f64..1.0e9).prop_map(|f| (TypeExpr::Float, Value::Float(f))),
        (any::<i32>(), 0u32..1_000_000).prop_map(|(whole, frac)| {
            let d = BigDecimal::from_str(&format!("{whole}.{frac}")).unwrap();
            (TypeExpr::Decimal, Value::Decimal(d))
        }),
        text().prop_map(|s| (TypeExpr::Str, Value::Str(s))),
        (700_000i32..760_000).prop_map(|days| {
            let date = NaiveDate::from_num_days_from_ce_opt(days).unwrap();
            (TypeExpr::Date, Value::Date(date))
        }),
        (0u32..86_400).prop_map(|secs| {
            let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap();
            (TypeExpr::Time, Value::Time(time))
        }),
        (0i64..10_000_000, 0i64..1000).prop_map(|(secs, millis)| {
            let span = TimeDelta::seconds(secs) + TimeDelta::milliseconds(millis);
            (TypeExpr::Duration, Value::Duration(span))
        }),
        (700_000i32..760_000, 0u32..86_400).prop_map(|(days, secs)| {
            let date = NaiveDate::from_num_days_from_ce_opt(days).unwrap();
            let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap();
            (TypeExpr::DateTime, Value::DateTime(date.and_time(time)))
        }),
        (0usize..3).prop_map(|i| {
            let def = sample_enum();
            let value = confwiz_schema::EnumDef::value_of(&def.members[i]);
            (TypeExpr::Enum(def), value)
        }),
        prop::sample::select(vec!["fast", "slow"]).prop_map(|s| {
            (TypeExpr::literal(["fast", "slow"]), Value::from(s))
        }),
        proptest::option::of(any::<i64>()).prop_map(|i| {
            (TypeExpr::optional(TypeExpr::Int), i.map_or(Value::Null, Value::Int))
        }),
        prop_oneof![any::<i64>().prop_map(Value::Int), text().prop_map(Value::Str)]
            .prop_map(|v| (TypeExpr::union([TypeExpr::Int, TypeExpr::Str]), v)),
        (any::<bool>(), any::<i32>(), 0u32..1000, any::<bool>()).prop_map(
            |(str_first, whole, frac, as_text)| {
                let digits = format!("{whole}.{frac}");
                let value = if as_text {
                    Value::Str(digits)
                } else {
                    Value::Decimal(BigDecimal::from_str(&digits).unwrap())
                };
                let branches = if str_first {
                    [TypeExpr::Str, TypeExpr::Decimal]
                } else {
                    [TypeExpr::Decimal, TypeExpr::Str]
                };
                (TypeExpr::union(branches), value)
            }
        ),
        (any::<bool>(), 700_000i32..760_000, "[A-Z0-9-]{0,10}").prop_map(
            |(as_text, days, junk)| {
                let date = NaiveDate::from_num_days_from_ce_opt(days).unwrap();
                let value = if as_text {
                    Value::Str(format!("{date}{junk}"))
                } else {
                    Value::Date(date)
                };
                (TypeExpr::union([TypeExpr::Str, TypeExpr::Date]), value)
            }
        ),
        proptest::collection::vec(any::<i64>(), 0..6).prop_map(|items| {
            (
                TypeExpr::list(TypeExpr::Int),
                Value::List(items.into_iter().map(Value::Int).collect()),
            )
        }),
        proptest::collection::vec(text(), 0..6).prop_map(|items| {
            (TypeExpr::set(TypeExpr::Str), Value::set(items.into_iter().map(Value::Str)))
        }),
        proptest::collection::btree_map(text(), any::<i64>(), 0..5).prop_map(|entries| {
            let entries = entries
                .into_iter()
                .map(|(k, v)| (Value::Str(k), Value::Int(v)))
                .collect();
            (TypeExpr::map(TypeExpr::Str, TypeExpr::Int), Value::Map(entries))
        }),
        (text(), 0i64..=100).prop_map(|(name, value)| {
            let inner = record(&[("name", Value::Str(name)), ("value", Value::Int(value))]);
            (TypeExpr::schema(INNER_MODEL), Value::Record(inner))
        }),
    ]
}

proptest! {
    #[test]
    fn prop_handlers_read_back_what_they_write((ty, value) in case()) {
        let catalog = confwiz_test_utils::catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let cx = CodecContext::new(&registry, &introspector);
        let spec = FieldSpec::from_type("field", &ty);

        let raw = cx.serialize(&spec, &value).unwrap();
        let text = serde_yaml::to_string(&raw).unwrap();
        let reread: serde_yaml::Value = serde_yaml::from_str(&text).unwrap();
        let back = cx.deserialize(&spec, &reread).unwrap();
        prop_assert_eq!(back, value, "document was {}", text);
    }
}

#[test]
fn test_document_follows_declaration_order() {
    let catalog = confwiz_test_utils::catalog();
    let registry = TypeHandlerRegistry::with_defaults();
    let introspector = Introspector::new(&catalog);
    let codec = CanonicalCodec::new(CodecContext::new(&registry, &introspector));
    let schema = catalog.resolve(COMPLEX_CONFIG).unwrap();

    let reversed: Record = sample_complex_data().into_iter().rev().collect();
    let doc = codec.to_document(&reversed, &schema).unwrap();
    let keys: Vec<_> = doc["configuration"]
        .as_mapping()
        .unwrap()
        .keys()
        .filter_map(serde_yaml::Value::as_str)
        .collect();
    let declared: Vec<_> = schema.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(keys, declared);
}

#[test]
fn test_complex_document_reads_back() {
    let catalog = confwiz_test_utils::catalog();
    let registry = TypeHandlerRegistry::with_defaults();
    let introspector = Introspector::new(&catalog);
    let codec = CanonicalCodec::new(CodecContext::new(&registry, &introspector));
    let schema = catalog.resolve(COMPLEX_CONFIG).unwrap();

    let doc = codec.to_document(&sample_complex_data(), &schema).unwrap();
    let text = serde_yaml::to_string(&doc).unwrap();
    assert!(text.contains("key1: '100.5'"), "{text}");
    assert!(text.contains("mode: a"), "{text}");

    let loaded = codec.from_document(&serde_yaml::from_str(&text).unwrap(), None).unwrap();
    assert_eq!(loaded.data, sample_complex_data());
}
