//! Plain-text rendering for the terminal
//!
//! Everything here returns a `String`; writing it out is up to the
//! [`Terminal`](crate::terminal::Terminal) or the binary.

use std::fmt::Write as _;

use confwiz_schema::{Record, SchemaCatalog, SchemaDef, Value};

use crate::error::Violations;
use crate::introspection::FieldSpec;

const VALUE_WIDTH: usize = 80;
const DESCRIPTION_WIDTH: usize = 50;

/// Field metadata shown before prompting
#[must_use]
pub fn field_header(breadcrumb: &str, spec: &FieldSpec, current: Option<&Value>) -> String {
    let title = if breadcrumb.is_empty() {
        spec.name.as_str()
    } else {
        breadcrumb
    };
    let mut out = format!("-- {title} --\n{}", spec.type_name());
    if let Some(description) = &spec.description {
        let _ = write!(out, "\n{description}");
    }
    if !spec.constraints.is_empty() {
        let _ = write!(out, "\nConstraints: {}", spec.constraints);
    }
    if !spec.is_required {
        let _ = write!(out, "\nOptional (default: {})", default_text(spec));
    }
    if let Some(current) = current.filter(|c| Some(*c) != spec.default.as_ref()) {
        let _ = write!(out, "\nCurrent: {}", truncate(&current.render(), VALUE_WIDTH));
    }
    out
}

fn default_text(spec: &FieldSpec) -> String {
    spec.default
        .as_ref()
        .map_or_else(|| "None".to_string(), Value::render)
}

/// Field table for `show-schema`
#[must_use]
pub fn schema_table(schema: &SchemaDef, specs: &[FieldSpec]) -> String {
    let rows: Vec<Vec<String>> = specs
        .iter()
        .map(|spec| {
            let required = if !spec.is_init {
                "auto"
            } else if spec.is_required {
                "yes"
            } else {
                "no"
            };
            let default = if spec.is_required {
                "-".to_string()
            } else {
                default_text(spec)
            };
            vec![
                spec.name.clone(),
                spec.type_name(),
                required.to_string(),
                default,
                truncate(spec.description.as_deref().unwrap_or(""), DESCRIPTION_WIDTH),
            ]
        })
        .collect();
    let mut out = format!("Schema: {}\n", schema.simple_name());
    if let Some(description) = schema.description() {
        let _ = writeln!(out, "{description}");
    }
    out.push_str(&table(&["Field", "Type", "Required", "Default", "Description"], &rows));
    out
}

/// Collected values, one row per top-level field
#[must_use]
pub fn summary_table(model_name: &str, data: &Record) -> String {
    let rows: Vec<Vec<String>> = data
        .iter()
        .map(|(key, value)| vec![key.clone(), truncate(&value.render(), VALUE_WIDTH)])
        .collect();
    format!("{model_name} Summary\n{}", table(&["Field", "Value"], &rows))
}

/// Violations, one per line
#[must_use]
pub fn violations_list(violations: &Violations) -> String {
    let mut out = String::from("Validation Errors:");
    for violation in violations {
        let location = violation
            .path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" > ");
        let _ = write!(out, "\n  {location}: {}", violation.reason);
    }
    out
}

/// Schemas available in a catalog
#[must_use]
pub fn schema_list(catalog: &SchemaCatalog) -> String {
    let rows: Vec<Vec<String>> = catalog
        .schemas()
        .enumerate()
        .map(|(i, schema)| {
            vec![
                (i + 1).to_string(),
                schema.simple_name().to_string(),
                schema.name().to_string(),
                schema.fields().len().to_string(),
            ]
        })
        .collect();
    format!(
        "Available Schemas\n{}",
        table(&["#", "Name", "Configuration Class", "Fields"], &rows)
    )
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let line = |cells: &mut dyn Iterator<Item = &str>| -> String {
        let padded: Vec<String> = cells
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        padded.join(" | ").trim_end().to_string()
    };

    let mut out = line(&mut headers.iter().copied());
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in rows {
        out.push('\n');
        out.push_str(&line(&mut row.iter().map(String::as_str)));
    }
    out
}
