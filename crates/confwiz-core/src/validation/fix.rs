//! Validate-and-fix state machine
//!
//! ```text
//! Collecting ──> Validating ──> Done
//!                  ^    │
//!                  │    v
//!                 Fixing ──> Exhausted
//! ```
//!
//! Every round through `Fixing` re-prompts only the fields named by the
//! current violations and counts as one attempt.

use std::sync::Arc;

use confwiz_schema::{assign, lookup, FieldPath, Record, SchemaDef, Segment, TypeExpr, Value};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::Materializer;
use crate::codec;
use crate::display;
use crate::error::{Result, SerializationError, Violations, WizardError};
use crate::introspection::{FieldKind, FieldSpec};
use crate::prompt::PromptEngine;

/// A record that passed validation, with the schema it satisfies
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    schema: Arc<SchemaDef>,
    data: Record,
    model_type: String,
}

impl ValidatedConfig {
    /// Wrap a validated record
    #[must_use]
    pub fn new(schema: Arc<SchemaDef>, data: Record) -> Self {
        let model_type = schema.simple_name().to_string();
        Self {
            schema,
            data,
            model_type,
        }
    }

    /// With the model type written to document headers
    #[must_use]
    pub fn with_model_type(mut self, model_type: impl Into<String>) -> Self {
        self.model_type = model_type.into();
        self
    }

    /// Schema the data satisfies
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaDef> {
        &self.schema
    }

    /// Validated data
    #[inline]
    #[must_use]
    pub fn data(&self) -> &Record {
        &self.data
    }

    /// Model type for document headers
    #[inline]
    #[must_use]
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    /// Take the data
    #[inline]
    #[must_use]
    pub fn into_data(self) -> Record {
        self.data
    }

    /// Convert into the caller's typed struct
    ///
    /// # Errors
    /// Returns error if the record does not deserialize into `T`.
    pub fn to_typed<T: DeserializeOwned>(&self) -> std::result::Result<T, SerializationError> {
        let json = codec::to_json(&Value::Record(self.data.clone()));
        Ok(serde_json::from_value(json)?)
    }
}

/// Fix loop states
#[derive(Debug, Clone, PartialEq)]
pub enum FixState {
    /// Prompting for every field, with optional existing values
    Collecting(Option<Record>),
    /// Checking collected data
    Validating(Record),
    /// Re-prompting for violated fields
    Fixing(Record, Violations),
    /// Data is valid
    Done(Record),
    /// Attempts exhausted with violations remaining
    Exhausted(Violations),
}

impl FixState {
    fn label(&self) -> &'static str {
        match self {
            Self::Collecting(_) => "collecting",
            Self::Validating(_) => "validating",
            Self::Fixing(..) => "fixing",
            Self::Done(_) => "done",
            Self::Exhausted(_) => "exhausted",
        }
    }
}

/// Drives collection, validation and selective re-prompting
#[derive(Debug)]
pub struct FixLoop<'e, 'a> {
    engine: &'e mut PromptEngine<'a>,
    max_attempts: u32,
    confirm: bool,
    attempts: u32,
}

impl<'e, 'a> FixLoop<'e, 'a> {
    /// Create new loop over an engine
    #[must_use]
    pub fn new(engine: &'e mut PromptEngine<'a>, max_attempts: u32) -> Self {
        Self {
            engine,
            max_attempts,
            confirm: true,
            attempts: 0,
        }
    }

    /// With confirmation before each fix round
    #[inline]
    #[must_use]
    pub fn with_confirm(mut self, confirm: bool) -> Self {
        self.confirm = confirm;
        self
    }

    /// Fix rounds performed so far
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Prompt for every field, then validate and fix
    ///
    /// # Errors
    /// Returns [`WizardError::RetryExhausted`] when violations remain after
    /// the attempt budget, [`WizardError::FixDeclined`] when the user
    /// refuses to fix, and any prompting error.
    pub fn collect(
        &mut self,
        schema: &Arc<SchemaDef>,
        existing: Option<Record>,
    ) -> Result<ValidatedConfig> {
        self.drive(schema, FixState::Collecting(existing))
    }

    /// Validate already collected data and fix it
    ///
    /// # Errors
    /// Same as [`collect`](Self::collect).
    pub fn run(&mut self, schema: &Arc<SchemaDef>, data: Record) -> Result<ValidatedConfig> {
        self.drive(schema, FixState::Validating(data))
    }

    fn drive(&mut self, schema: &Arc<SchemaDef>, start: FixState) -> Result<ValidatedConfig> {
        let introspector = self.engine.introspector();
        let specs = introspector.fields_of(schema.name())?;
        let materializer = Materializer::new(introspector);
        let mut state = start;

        loop {
            debug!(
                schema = schema.name(),
                state = state.label(),
                attempts = self.attempts,
                "fix loop"
            );
            state = match state {
                FixState::Collecting(existing) => {
                    FixState::Validating(self.engine.prompt_schema(&specs, existing.as_ref())?)
                }
                FixState::Validating(data) => match materializer.materialize(&specs, &data) {
                    Ok(valid) => FixState::Done(valid),
                    Err(violations) if self.attempts >= self.max_attempts => {
                        FixState::Exhausted(violations)
                    }
                    Err(violations) => FixState::Fixing(data, violations),
                },
                FixState::Fixing(data, violations) => self.fix(&specs, data, violations)?,
                FixState::Done(data) => {
                    return Ok(ValidatedConfig::new(Arc::clone(schema), data));
                }
                FixState::Exhausted(violations) => {
                    return Err(WizardError::RetryExhausted {
                        attempts: self.attempts,
                        violations,
                    });
                }
            };
        }
    }

    fn fix(
        &mut self,
        specs: &[FieldSpec],
        mut data: Record,
        violations: Violations,
    ) -> Result<FixState> {
        self.engine.show(&display::violations_list(&violations));
        if self.confirm && !self.engine.ask_yes_no("Would you like to fix these errors?", true)? {
            return Err(WizardError::FixDeclined { violations });
        }

        let targets = self.targets(specs, &data, &violations);
        if targets.is_empty() {
            return Ok(FixState::Exhausted(violations));
        }
        for (path, spec) in targets {
            let value = {
                let current = lookup(&data, &path);
                self.engine.within_path(&path, |engine| {
                    engine.show_header(&spec, current);
                    engine.prompt_field(&spec, current)
                })?
            };
            if !assign(&mut data, &path, value) {
                debug!(path = %path, "violation path no longer addressable");
            }
        }
        self.attempts += 1;
        Ok(FixState::Validating(data))
    }

    /// Deepest addressable field for each violation, without duplicates
    fn targets(
        &self,
        specs: &[FieldSpec],
        data: &Record,
        violations: &Violations,
    ) -> Vec<(FieldPath, FieldSpec)> {
        let mut targets: Vec<(FieldPath, FieldSpec)> = Vec::new();
        for violation in violations {
            let Some(target) = self.resolve(specs, data, &violation.path) else {
                continue;
            };
            if targets.iter().any(|(p, _)| p.is_prefix_of(&target.0)) {
                continue;
            }
            targets.retain(|(p, _)| !target.0.is_prefix_of(p));
            targets.push(target);
        }
        targets
    }

    fn resolve(
        &self,
        specs: &[FieldSpec],
        data: &Record,
        path: &FieldPath,
    ) -> Option<(FieldPath, FieldSpec)> {
        let mut segments = path.iter();
        let name = segments.next()?.as_field()?;
        let mut spec = specs.iter().find(|s| s.name == name)?.clone();
        let mut at = FieldPath::field(name);

        for segment in segments {
            let Some(next) = self.descend(&spec, segment) else {
                break;
            };
            let next_at = at.child(segment.clone());
            let parent_present = lookup(data, &at).is_some_and(|v| !v.is_null());
            if !parent_present {
                break;
            }
            spec = next;
            at = next_at;
        }
        Some((at, spec))
    }

    /// Descriptor one segment below `spec`, for nested records and list elements
    fn descend(&self, spec: &FieldSpec, segment: &Segment) -> Option<FieldSpec> {
        let spec = spec.unwrapped();
        match (spec.kind, segment) {
            (FieldKind::NestedSchema, Segment::Field(name)) => {
                let schema = spec.nested.as_deref()?;
                let fields = self.engine.introspector().fields_of(schema).ok()?;
                fields.iter().find(|f| &f.name == name).cloned()
            }
            (FieldKind::List, Segment::Index(i)) => {
                let element = spec.branch(0, format!("{}[{i}]", spec.name))?;
                matches!(element.inner, TypeExpr::Schema(_)).then_some(element)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::TypeHandlerRegistry;
    use crate::introspection::Introspector;
    use crate::terminal::replay::Replay;
    use confwiz_schema::{FieldDef, SchemaCatalog, Value};
    use pretty_assertions::assert_eq;

    fn catalog() -> SchemaCatalog {
        let mut catalog = SchemaCatalog::new();
        catalog
            .register(
                SchemaDef::builder("tests.Inner")
                    .field(FieldDef::new("name", TypeExpr::Str))
                    .field(FieldDef::new("value", TypeExpr::Int).with_default(0).ge(0).le(100))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        catalog
            .register(
                SchemaDef::builder("tests.Db")
                    .field(FieldDef::new("host", TypeExpr::Str).with_default("localhost"))
                    .field(FieldDef::new("port", TypeExpr::Int).ge(1).le(65535))
                    .field(FieldDef::new("inner", TypeExpr::schema("tests.Inner")))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        catalog
    }

    fn record(entries: &[(&str, Value)]) -> Record {
        entries.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    fn db_data(port: i64, value: i64) -> Record {
        record(&[
            ("host", "db".into()),
            ("port", Value::Int(port)),
            (
                "inner",
                Value::Record(record(&[("name", "n".into()), ("value", Value::Int(value))])),
            ),
        ])
    }

    #[test]
    fn valid_data_needs_no_prompts() {
        let catalog = catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let mut terminal = Replay::new();
        let schema = introspector.schema("tests.Db").unwrap();

        let config = {
            let mut engine = PromptEngine::new(&registry, &introspector, &mut terminal);
            FixLoop::new(&mut engine, 3).run(&schema, db_data(5432, 1)).unwrap()
        };
        assert_eq!(config.model_type(), "Db");
        assert_eq!(config.data()["port"], Value::Int(5432));
        assert!(terminal.asked.is_empty());
    }

    #[test]
    fn only_violated_fields_reprompted() {
        let catalog = catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let mut terminal = Replay::new().text("5432").text("50");
        let schema = introspector.schema("tests.Db").unwrap();

        let config = {
            let mut engine = PromptEngine::new(&registry, &introspector, &mut terminal);
            FixLoop::new(&mut engine, 3)
                .with_confirm(false)
                .run(&schema, db_data(70000, 500))
                .unwrap()
        };
        assert_eq!(terminal.fields(), vec!["port", "inner.value"]);
        assert_eq!(config.data()["port"], Value::Int(5432));
        assert_eq!(config.data()["host"], Value::Str("db".into()));
        assert_eq!(
            terminal.asked[0].shape,
            crate::terminal::InputShape::FreeText {
                default: Some("70000".into())
            }
        );
    }

    #[test]
    fn budget_exhausted_after_max_attempts() {
        let catalog = catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let mut terminal = Replay::new().text("0").text("0");
        let schema = introspector.schema("tests.Db").unwrap();

        let err = {
            let mut engine = PromptEngine::new(&registry, &introspector, &mut terminal);
            FixLoop::new(&mut engine, 2)
                .with_confirm(false)
                .run(&schema, db_data(0, 1))
                .unwrap_err()
        };
        assert!(matches!(err, WizardError::RetryExhausted { attempts: 2, .. }));
        assert_eq!(terminal.asked.len(), 2);
    }

    #[test]
    fn declined_fix() {
        let catalog = catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let mut terminal = Replay::new().no();
        let schema = introspector.schema("tests.Db").unwrap();

        let err = {
            let mut engine = PromptEngine::new(&registry, &introspector, &mut terminal);
            FixLoop::new(&mut engine, 3).run(&schema, db_data(0, 1)).unwrap_err()
        };
        assert_eq!(err.violations().map(Violations::len), Some(1));
        assert!(matches!(err, WizardError::FixDeclined { .. }));
    }

    #[test]
    fn missing_nested_record_reprompts_whole_field() {
        let catalog = catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let mut terminal = Replay::new().yes().text("fresh").text("7");
        let schema = introspector.schema("tests.Db").unwrap();
        let data = record(&[("port", Value::Int(80))]);

        let config = {
            let mut engine = PromptEngine::new(&registry, &introspector, &mut terminal);
            FixLoop::new(&mut engine, 1).run(&schema, data).unwrap()
        };
        assert_eq!(terminal.fields(), vec!["", "inner.name", "inner.value"]);
        let inner = config.data()["inner"].as_record().unwrap();
        assert_eq!(inner["value"], Value::Int(7));
    }

    #[test]
    fn collecting_state_prompts_everything() {
        let catalog = catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let mut terminal = Replay::new().accept().text("22").text("n").accept();
        let schema = introspector.schema("tests.Db").unwrap();

        let config = {
            let mut engine = PromptEngine::new(&registry, &introspector, &mut terminal);
            let mut fix = FixLoop::new(&mut engine, 3);
            let config = fix.collect(&schema, None).unwrap();
            assert_eq!(fix.attempts(), 0);
            config
        };
        let keys: Vec<_> = config.data().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["host", "port", "inner"]);
        assert_eq!(config.data()["host"], Value::Str("localhost".into()));
    }

    #[test]
    fn zero_budget_fails_immediately() {
        let catalog = catalog();
        let registry = TypeHandlerRegistry::with_defaults();
        let introspector = Introspector::new(&catalog);
        let mut terminal = Replay::new();
        let schema = introspector.schema("tests.Db").unwrap();

        let err = {
            let mut engine = PromptEngine::new(&registry, &introspector, &mut terminal);
            FixLoop::new(&mut engine, 0).run(&schema, db_data(0, 1)).unwrap_err()
        };
        assert!(matches!(err, WizardError::RetryExhausted { attempts: 0, .. }));
        assert!(terminal.asked.is_empty());
    }
}
