//! Datetime, date, time and duration handlers
//!
//! All four use ISO 8601 text for echo and for documents. Durations also
//! read plain numbers as seconds.

use chrono::TimeDelta;
use confwiz_schema::iso8601;
use confwiz_schema::{TypeExpr, Value};
use serde_yaml::Value as Yaml;

use super::{default_text, kind_mismatch, CodecContext, TypeHandler};
use crate::error::{DecodeError, Result, SerializationError};
use crate::introspection::{FieldKind, FieldSpec};
use crate::prompt::PromptEngine;

/// Temporal fields of one type
#[derive(Debug, Clone)]
pub struct TemporalHandler {
    ty: TypeExpr,
    name: &'static str,
    hint: &'static str,
}

impl TemporalHandler {
    /// `datetime` fields
    #[must_use]
    pub fn datetime() -> Self {
        Self {
            ty: TypeExpr::DateTime,
            name: "datetime",
            hint: "YYYY-MM-DDTHH:MM:SS",
        }
    }

    /// `date` fields
    #[must_use]
    pub fn date() -> Self {
        Self {
            ty: TypeExpr::Date,
            name: "date",
            hint: "YYYY-MM-DD",
        }
    }

    /// `time` fields
    #[must_use]
    pub fn time() -> Self {
        Self {
            ty: TypeExpr::Time,
            name: "time",
            hint: "HH:MM:SS",
        }
    }

    /// `timedelta` fields
    #[must_use]
    pub fn duration() -> Self {
        Self {
            ty: TypeExpr::Duration,
            name: "duration",
            hint: "PnDTnHnMnS or seconds",
        }
    }

    fn parse(&self, text: &str) -> Option<Value> {
        match self.ty {
            TypeExpr::DateTime => iso8601::parse_datetime(text).map(Value::from_datetime),
            TypeExpr::Date => iso8601::parse_date(text).map(Value::Date),
            TypeExpr::Time => iso8601::parse_time(text).map(Value::Time),
            TypeExpr::Duration => iso8601::parse_duration(text).map(Value::Duration),
            _ => None,
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(
            (&self.ty, value),
            (TypeExpr::DateTime, Value::DateTime(_) | Value::ZonedDateTime(_))
                | (TypeExpr::Date, Value::Date(_))
                | (TypeExpr::Time, Value::Time(_))
                | (TypeExpr::Duration, Value::Duration(_))
        )
    }
}

fn seconds(raw: &serde_yaml::Number) -> Option<TimeDelta> {
    if let Some(secs) = raw.as_i64() {
        return TimeDelta::try_seconds(secs);
    }
    let secs = raw.as_f64().filter(|f| f.is_finite())?;
    #[allow(clippy::cast_possible_truncation)]
    let micros = (secs * 1_000_000.0).round() as i64;
    Some(TimeDelta::microseconds(micros))
}

impl TypeHandler for TemporalHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    fn can_handle(&self, spec: &FieldSpec) -> bool {
        spec.kind == FieldKind::Temporal && spec.inner == self.ty
    }

    fn prompt(
        &self,
        spec: &FieldSpec,
        current: Option<&Value>,
        engine: &mut PromptEngine<'_>,
    ) -> Result<Value> {
        let message = format!("{} ({})", spec.name, self.hint);
        let text = engine.ask_text(&message, default_text(current))?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(current.cloned().unwrap_or(Value::Null));
        }
        Ok(self.parse(trimmed).unwrap_or_else(|| Value::Str(text)))
    }

    fn serialize(
        &self,
        spec: &FieldSpec,
        value: &Value,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Yaml, SerializationError> {
        if self.accepts(value) {
            Ok(Yaml::String(value.render()))
        } else {
            Err(kind_mismatch(spec, value))
        }
    }

    fn deserialize(
        &self,
        spec: &FieldSpec,
        raw: &Yaml,
        _cx: &CodecContext<'_>,
    ) -> std::result::Result<Value, DecodeError> {
        let parsed = match raw {
            Yaml::String(text) => self.parse(text.trim()),
            Yaml::Number(n) if self.ty == TypeExpr::Duration => seconds(n).map(Value::Duration),
            _ => None,
        };
        parsed.ok_or_else(|| DecodeError::mismatch(&spec.name, &self.ty, raw))
    }
}
