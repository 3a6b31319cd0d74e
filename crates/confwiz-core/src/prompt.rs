//! Recursive prompt engine
//!
//! Walks field descriptors in declaration order, dispatching each one to its
//! handler. Nested schemas come back here through [`PromptEngine::prompt_nested`],
//! which is the only re-entry point into [`PromptEngine::prompt_schema`].

use std::fmt::Display;

use confwiz_schema::{FieldPath, Record, Value};
use tracing::debug;

use crate::display;
use crate::error::{Result, TerminalError, WizardError};
use crate::handlers::TypeHandlerRegistry;
use crate::introspection::{FieldSpec, Introspector};
use crate::terminal::{Answer, InputShape, PromptRequest, Terminal};

/// Default nesting limit for schemas
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// One prompting session
pub struct PromptEngine<'a> {
    registry: &'a TypeHandlerRegistry,
    introspector: &'a Introspector<'a>,
    terminal: &'a mut dyn Terminal,
    max_depth: usize,
    depth: usize,
    trail: Vec<String>,
}

impl<'a> PromptEngine<'a> {
    /// Create new engine
    #[must_use]
    pub fn new(
        registry: &'a TypeHandlerRegistry,
        introspector: &'a Introspector<'a>,
        terminal: &'a mut dyn Terminal,
    ) -> Self {
        Self {
            registry,
            introspector,
            terminal,
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
            trail: Vec::new(),
        }
    }

    /// With nesting limit
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Handler registry of this session
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &'a TypeHandlerRegistry {
        self.registry
    }

    /// Introspector of this session
    #[inline]
    #[must_use]
    pub fn introspector(&self) -> &'a Introspector<'a> {
        self.introspector
    }

    /// Dotted location of the field being collected
    #[must_use]
    pub fn breadcrumb(&self) -> String {
        self.trail.join(".")
    }

    /// Collect every field of a schema, in declaration order
    ///
    /// `defaults` holds previously entered or loaded values; a field missing
    /// from it falls back to its schema default. Computed fields are not
    /// prompted and keep their current value.
    ///
    /// # Errors
    /// Returns error if a field cannot be dispatched, the terminal fails, or
    /// the user cancels.
    pub fn prompt_schema(
        &mut self,
        specs: &[FieldSpec],
        defaults: Option<&Record>,
    ) -> Result<Record> {
        let mut record = Record::with_capacity(specs.len());
        for spec in specs {
            let current = defaults
                .and_then(|d| d.get(&spec.name))
                .or(spec.default.as_ref());
            if !spec.is_init {
                if let Some(value) = current {
                    record.insert(spec.name.clone(), value.clone());
                }
                continue;
            }
            let value = self.within(&spec.name, |engine| {
                engine.show_header(spec, current);
                engine.prompt_field(spec, current)
            })?;
            record.insert(spec.name.clone(), value);
        }
        Ok(record)
    }

    /// Collect one value through the handler selected for `spec`
    ///
    /// # Errors
    /// Returns error if no handler applies, the terminal fails, or the user
    /// cancels.
    pub fn prompt_field(&mut self, spec: &FieldSpec, current: Option<&Value>) -> Result<Value> {
        let registry = self.registry;
        let handler = registry.select(spec)?;
        debug!(field = %self.breadcrumb(), handler = handler.name(), "prompting");
        handler.prompt(spec, current, self)
    }

    /// Collect a nested schema
    ///
    /// # Errors
    /// Returns error if the schema does not resolve or nesting exceeds the
    /// limit, plus everything [`prompt_schema`](Self::prompt_schema) returns.
    pub fn prompt_nested(&mut self, schema: &str, existing: Option<&Record>) -> Result<Record> {
        if self.depth >= self.max_depth {
            return Err(WizardError::RecursionLimit {
                path: self.breadcrumb(),
                limit: self.max_depth,
            });
        }
        let specs = self.introspector.fields_of(schema)?;
        self.depth += 1;
        let result = self.prompt_schema(&specs, existing);
        self.depth -= 1;
        result
    }

    /// Run `f` with `segment` appended to the breadcrumb
    ///
    /// # Errors
    /// Returns whatever `f` returns.
    pub fn within<T>(
        &mut self,
        segment: impl Display,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.trail.push(segment.to_string());
        let result = f(self);
        self.trail.pop();
        result
    }

    /// Run `f` with every segment of `path` appended to the breadcrumb
    ///
    /// # Errors
    /// Returns whatever `f` returns.
    pub fn within_path<T>(
        &mut self,
        path: &FieldPath,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let mark = self.trail.len();
        self.trail.extend(path.iter().map(ToString::to_string));
        let result = f(self);
        self.trail.truncate(mark);
        result
    }

    /// Show informational text
    pub fn show(&mut self, message: &str) {
        self.terminal.show(message);
    }

    /// Show the header for the field about to be collected
    pub fn show_header(&mut self, spec: &FieldSpec, current: Option<&Value>) {
        let header = display::field_header(&self.breadcrumb(), spec, current);
        self.terminal.show(&header);
    }

    /// Ask for free text
    ///
    /// # Errors
    /// Returns error if the terminal fails or the user cancels.
    pub fn ask_text(&mut self, message: &str, default: Option<String>) -> Result<String> {
        match self.ask(message, InputShape::FreeText { default })? {
            Answer::Text(text) => Ok(text),
            _ => Err(self.unexpected("text")),
        }
    }

    /// Ask a yes/no question
    ///
    /// # Errors
    /// Returns error if the terminal fails or the user cancels.
    pub fn ask_yes_no(&mut self, message: &str, default: bool) -> Result<bool> {
        match self.ask(message, InputShape::YesNo { default })? {
            Answer::Bool(answer) => Ok(answer),
            _ => Err(self.unexpected("yes or no")),
        }
    }

    /// Ask to pick one choice; returns its index
    ///
    /// # Errors
    /// Returns error if the terminal fails, the user cancels, or the answer
    /// is out of range.
    pub fn ask_select(
        &mut self,
        message: &str,
        choices: Vec<String>,
        default: Option<usize>,
    ) -> Result<usize> {
        let count = choices.len();
        match self.ask(message, InputShape::SingleSelect { choices, default })? {
            Answer::Choice(index) if index < count => Ok(index),
            _ => Err(self.unexpected(&format!("a choice below {count}"))),
        }
    }

    /// Ask to pick any number of choices; returns their indices in order
    ///
    /// # Errors
    /// Returns error if the terminal fails, the user cancels, or an answer
    /// is out of range.
    pub fn ask_multi(
        &mut self,
        message: &str,
        choices: Vec<String>,
        selected: Vec<bool>,
    ) -> Result<Vec<usize>> {
        let count = choices.len();
        match self.ask(message, InputShape::MultiSelect { choices, selected })? {
            Answer::Choices(mut indices) if indices.iter().all(|&i| i < count) => {
                indices.sort_unstable();
                indices.dedup();
                Ok(indices)
            }
            _ => Err(self.unexpected(&format!("choices below {count}"))),
        }
    }

    fn ask(&mut self, message: &str, shape: InputShape) -> Result<Answer> {
        let request = PromptRequest::new(self.breadcrumb(), message, shape);
        match self.terminal.ask(&request)? {
            Answer::Cancelled => {
                debug!(field = %request.field, "prompt cancelled");
                Err(WizardError::Cancelled)
            }
            answer => Ok(answer),
        }
    }

    fn unexpected(&self, expected: &str) -> WizardError {
        TerminalError::UnexpectedAnswer {
            field: self.breadcrumb(),
            expected: expected.to_string(),
        }
        .into()
    }
}

impl std::fmt::Debug for PromptEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptEngine")
            .field("registry", self.registry)
            .field("max_depth", &self.max_depth)
            .field("depth", &self.depth)
            .field("trail", &self.trail)
            .finish_non_exhaustive()
    }
}
