//! Testing utilities for the confwiz workspace
//!
//! A scripted terminal and the fixture schemas shared by integration tests.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use confwiz_core::{Answer, PromptRequest, Terminal, TerminalError};
use confwiz_schema::{
    ConfigSchema, EnumDef, EnumMember, FieldDef, Record, SchemaCatalog, SchemaDef, SchemaError,
    TypeExpr, Value,
};
use serde::Deserialize;

pub const SAMPLE_ENUM: &str = "tests.fixtures.SampleEnum";
pub const INNER_MODEL: &str = "tests.fixtures.InnerModel";
pub const SIMPLE_CONFIG: &str = "tests.fixtures.SimpleConfig";
pub const COMPLEX_CONFIG: &str = "tests.fixtures.ComplexConfig";
pub const SERVER_CONFIG: &str = "tests.fixtures.ServerConfig";

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Answer(Answer),
    AcceptDefault,
}

/// Terminal answering from a queue and recording every prompt
#[derive(Debug, Default)]
pub struct ScriptedTerminal {
    steps: VecDeque<Step>,
    prompts: Vec<PromptRequest>,
    shown: Vec<String>,
}

impl ScriptedTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, answer: Answer) -> Self {
        self.steps.push_back(Step::Answer(answer));
        self
    }

    pub fn text(self, text: &str) -> Self {
        self.answer(Answer::Text(text.to_string()))
    }

    pub fn yes(self) -> Self {
        self.answer(Answer::Bool(true))
    }

    pub fn no(self) -> Self {
        self.answer(Answer::Bool(false))
    }

    pub fn choose(self, index: usize) -> Self {
        self.answer(Answer::Choice(index))
    }

    pub fn choose_many(self, indices: &[usize]) -> Self {
        self.answer(Answer::Choices(indices.to_vec()))
    }

    pub fn cancel(self) -> Self {
        self.answer(Answer::Cancelled)
    }

    /// Take the prompt's own default
    pub fn accept(mut self) -> Self {
        self.steps.push_back(Step::AcceptDefault);
        self
    }

    pub fn accept_n(mut self, count: usize) -> Self {
        for _ in 0..count {
            self.steps.push_back(Step::AcceptDefault);
        }
        self
    }

    pub fn prompts(&self) -> &[PromptRequest] {
        &self.prompts
    }

    /// Prompts asked for one field path
    pub fn prompts_for(&self, field: &str) -> Vec<&PromptRequest> {
        self.prompts.iter().filter(|p| p.field == field).collect()
    }

    /// Field paths in the order they were asked
    pub fn fields(&self) -> Vec<&str> {
        self.prompts.iter().map(|p| p.field.as_str()).collect()
    }

    pub fn shown(&self) -> &[String] {
        &self.shown
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl Terminal for ScriptedTerminal {
    fn ask(&mut self, request: &PromptRequest) -> Result<Answer, TerminalError> {
        self.prompts.push(request.clone());
        let exhausted = || TerminalError::Exhausted {
            field: request.field.clone(),
        };
        match self.steps.pop_front().ok_or_else(exhausted)? {
            Step::Answer(answer) => Ok(answer),
            Step::AcceptDefault => request.default_answer().ok_or_else(exhausted),
        }
    }

    fn show(&mut self, message: &str) {
        self.shown.push(message.to_string());
    }
}

/// Build a record from pairs
pub fn record(entries: &[(&str, Value)]) -> Record {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

pub fn decimal(text: &str) -> Value {
    Value::Decimal(BigDecimal::from_str(text).unwrap())
}

pub fn sample_enum() -> EnumDef {
    EnumDef::new(
        SAMPLE_ENUM,
        vec![
            EnumMember::new("OPTION_A", "a"),
            EnumMember::new("OPTION_B", "b"),
            EnumMember::new("OPTION_C", "c"),
        ],
    )
}

/// Member of [`sample_enum`] by name
pub fn sample_member(name: &str) -> Value {
    let def = sample_enum();
    EnumDef::value_of(def.member_named(name).unwrap())
}

pub fn inner_model() -> SchemaDef {
    SchemaDef::builder(INNER_MODEL)
        .field(FieldDef::new("name", TypeExpr::Str).with_description("Name of the inner model"))
        .field(
            FieldDef::new("value", TypeExpr::Int)
                .with_default(0)
                .ge(0)
                .le(100)
                .with_description("A bounded integer"),
        )
        .build()
        .unwrap()
}

pub fn simple_config() -> SchemaDef {
    SchemaDef::builder(SIMPLE_CONFIG)
        .description("A simple config with primitive fields")
        .field(FieldDef::new("label", TypeExpr::Str).with_description("A label"))
        .field(FieldDef::new("count", TypeExpr::Int).with_default(5).ge(0))
        .field(FieldDef::new("enabled", TypeExpr::Bool).with_default(true))
        .field(FieldDef::new("ratio", TypeExpr::Float).with_default(1.0))
        .field(FieldDef::new("amount", TypeExpr::Decimal).with_default(decimal("0.01")).ge(0))
        .build()
        .unwrap()
}

pub fn complex_config() -> SchemaDef {
    let inner_default = record(&[("name", "default".into()), ("value", Value::Int(10))]);
    SchemaDef::builder(COMPLEX_CONFIG)
        .description("Nested, optional, union, enum and collection fields")
        .field(FieldDef::new("name", TypeExpr::Str))
        .field(
            FieldDef::new("mode", TypeExpr::Enum(sample_enum()))
                .with_default(sample_member("OPTION_A")),
        )
        .field(
            FieldDef::new("strategy", TypeExpr::literal(["aggressive", "passive", "balanced"]))
                .with_default("balanced"),
        )
        .field(FieldDef::new("inner", TypeExpr::schema(INNER_MODEL)).with_default(inner_default))
        .field(FieldDef::new(
            "optional_inner",
            TypeExpr::optional(TypeExpr::schema(INNER_MODEL)),
        ))
        .field(
            FieldDef::new("tags", TypeExpr::list(TypeExpr::Str))
                .with_default(Value::List(Vec::new())),
        )
        .field(
            FieldDef::new("scores", TypeExpr::list(TypeExpr::schema(INNER_MODEL)))
                .with_default(Value::List(Vec::new())),
        )
        .field(
            FieldDef::new("modifiers", TypeExpr::set(TypeExpr::Enum(sample_enum())))
                .with_default(Value::Set(Vec::new())),
        )
        .field(
            FieldDef::new("metadata", TypeExpr::map(TypeExpr::Str, TypeExpr::Decimal))
                .with_default(Value::Map(Vec::new())),
        )
        .field(FieldDef::new(
            "alt",
            TypeExpr::union([
                TypeExpr::schema(INNER_MODEL),
                TypeExpr::schema(SIMPLE_CONFIG),
                TypeExpr::Null,
            ]),
        ))
        .build()
        .unwrap()
}

/// Typed configuration carrying its own schema
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub allowed_origins: Vec<String>,
}

impl ConfigSchema for ServerConfig {
    fn schema() -> Result<SchemaDef, SchemaError> {
        SchemaDef::builder(SERVER_CONFIG)
            .description("Server settings")
            .field(FieldDef::new("host", TypeExpr::Str).with_default("localhost"))
            .field(
                FieldDef::new("port", TypeExpr::Int)
                    .ge(1)
                    .le(65535)
                    .with_description("Listen port"),
            )
            .field(FieldDef::new("debug", TypeExpr::Bool).with_default(false))
            .field(
                FieldDef::new("allowed_origins", TypeExpr::list(TypeExpr::Str))
                    .with_default(Value::List(Vec::new())),
            )
            .build()
    }
}

/// Catalog with every fixture registered
pub fn catalog() -> SchemaCatalog {
    let mut catalog = SchemaCatalog::new();
    catalog.register_enum(sample_enum()).unwrap();
    catalog.register(inner_model()).unwrap();
    catalog.register(simple_config()).unwrap();
    catalog.register(complex_config()).unwrap();
    catalog.register_type::<ServerConfig>().unwrap();
    catalog
}

/// Complete, valid `ComplexConfig` data as a user would enter it
pub fn sample_complex_data() -> Record {
    record(&[
        ("name", "test-model".into()),
        ("mode", sample_member("OPTION_A")),
        ("strategy", "aggressive".into()),
        ("inner", record(&[("name", "nested".into()), ("value", Value::Int(42))]).into()),
        ("optional_inner", Value::Null),
        ("tags", Value::List(vec!["fast".into(), "reliable".into()])),
        (
            "scores",
            Value::List(vec![record(&[("name", "s1".into()), ("value", Value::Int(10))]).into()]),
        ),
        (
            "modifiers",
            Value::set([sample_member("OPTION_A"), sample_member("OPTION_B")]),
        ),
        ("metadata", Value::Map(vec![("key1".into(), decimal("100.5"))])),
        ("alt", Value::Null),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use confwiz_core::InputShape;

    #[test]
    fn scripted_answers_in_order() {
        let mut terminal = ScriptedTerminal::new().text("a").accept();
        let first = PromptRequest::new("x", "x", InputShape::FreeText { default: None });
        let second = PromptRequest::new("y", "y", InputShape::YesNo { default: true });

        assert_eq!(terminal.ask(&first).unwrap(), Answer::Text("a".into()));
        assert_eq!(terminal.ask(&second).unwrap(), Answer::Bool(true));
        assert!(matches!(terminal.ask(&first), Err(TerminalError::Exhausted { .. })));
        assert_eq!(terminal.fields(), vec!["x", "y", "x"]);
        assert_eq!(terminal.prompts_for("x").len(), 2);
    }

    #[test]
    fn fixture_catalog_is_consistent() {
        let catalog = catalog();
        for name in [INNER_MODEL, SIMPLE_CONFIG, COMPLEX_CONFIG, SERVER_CONFIG] {
            catalog.check_graph(name).unwrap();
        }
        assert!(catalog.enum_named(SAMPLE_ENUM).is_some());
    }
}
