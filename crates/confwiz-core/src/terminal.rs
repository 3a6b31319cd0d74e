//! Terminal collaborator interface
//!
//! The engine never reads or writes the console itself. Every question goes
//! through [`Terminal::ask`] as a [`PromptRequest`] describing the input
//! shape, and the answer comes back as an [`Answer`].

use crate::error::TerminalError;

/// Input shape a question expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputShape {
    /// Free text, with an optional pre-filled default
    FreeText {
        /// Text accepted on empty input
        default: Option<String>,
    },
    /// Yes or no
    YesNo {
        /// Answer on empty input
        default: bool,
    },
    /// Pick one of the choices
    SingleSelect {
        /// Labels in display order
        choices: Vec<String>,
        /// Pre-selected index
        default: Option<usize>,
    },
    /// Pick any number of the choices
    MultiSelect {
        /// Labels in display order
        choices: Vec<String>,
        /// Pre-selected flags, one per choice
        selected: Vec<bool>,
    },
}

impl InputShape {
    /// Short name of the shape
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::FreeText { .. } => "text",
            Self::YesNo { .. } => "yes/no",
            Self::SingleSelect { .. } => "selection",
            Self::MultiSelect { .. } => "multi-selection",
        }
    }
}

/// One question put to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// Breadcrumb of the field being collected (`inner.value`, `tags.0`)
    pub field: String,
    /// Question text
    pub message: String,
    /// Expected input
    pub shape: InputShape,
}

impl PromptRequest {
    /// Create new request
    #[inline]
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>, shape: InputShape) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            shape,
        }
    }

    /// The default the shape would accept on empty input, as an answer
    #[must_use]
    pub fn default_answer(&self) -> Option<Answer> {
        match &self.shape {
            InputShape::FreeText { default } => default.clone().map(Answer::Text),
            InputShape::YesNo { default } => Some(Answer::Bool(*default)),
            InputShape::SingleSelect { default, .. } => default.map(Answer::Choice),
            InputShape::MultiSelect { selected, .. } => Some(Answer::Choices(
                selected
                    .iter()
                    .enumerate()
                    .filter_map(|(i, on)| on.then_some(i))
                    .collect(),
            )),
        }
    }
}

/// What the user entered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Free text
    Text(String),
    /// Yes (`true`) or no
    Bool(bool),
    /// Index of the chosen item
    Choice(usize),
    /// Indices of the chosen items
    Choices(Vec<usize>),
    /// The user aborted
    Cancelled,
}

/// Interactive input and output
pub trait Terminal {
    /// Ask one question and block until it is answered
    ///
    /// # Errors
    /// Returns error if the terminal cannot be read.
    fn ask(&mut self, request: &PromptRequest) -> Result<Answer, TerminalError>;

    /// Show informational text
    fn show(&mut self, _message: &str) {}
}

impl<T: Terminal + ?Sized> Terminal for &mut T {
    fn ask(&mut self, request: &PromptRequest) -> Result<Answer, TerminalError> {
        (**self).ask(request)
    }

    fn show(&mut self, message: &str) {
        (**self).show(message);
    }
}
