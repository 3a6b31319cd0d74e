//! Console terminal backed by dialoguer

use std::io;

use confwiz_core::{Answer, InputShape, PromptRequest, Terminal, TerminalError};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Select};

/// Interactive prompts on the controlling terminal
///
/// Escape on a confirmation or selection cancels the session.
pub(crate) struct ConsoleTerminal {
    theme: ColorfulTheme,
}

impl ConsoleTerminal {
    pub(crate) fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

fn io_error(err: dialoguer::Error) -> TerminalError {
    TerminalError::Io(io::Error::other(err))
}

fn cancelled_or<T>(answer: Option<T>, f: impl FnOnce(T) -> Answer) -> Answer {
    answer.map_or(Answer::Cancelled, f)
}

impl Terminal for ConsoleTerminal {
    fn ask(&mut self, request: &PromptRequest) -> Result<Answer, TerminalError> {
        let message = request.message.as_str();
        let answer = match &request.shape {
            InputShape::FreeText { default } => {
                let mut input = Input::<String>::with_theme(&self.theme)
                    .with_prompt(message)
                    .allow_empty(true);
                if let Some(default) = default {
                    input = input.default(default.clone());
                }
                Answer::Text(input.interact_text().map_err(io_error)?)
            }
            InputShape::YesNo { default } => {
                let answer = Confirm::with_theme(&self.theme)
                    .with_prompt(message)
                    .default(*default)
                    .interact_opt()
                    .map_err(io_error)?;
                cancelled_or(answer, Answer::Bool)
            }
            InputShape::SingleSelect { choices, default } => {
                let mut select = Select::with_theme(&self.theme)
                    .with_prompt(message)
                    .items(choices);
                if let Some(default) = default {
                    select = select.default(*default);
                }
                cancelled_or(select.interact_opt().map_err(io_error)?, Answer::Choice)
            }
            InputShape::MultiSelect { choices, selected } => {
                let answer = MultiSelect::with_theme(&self.theme)
                    .with_prompt(message)
                    .items(choices)
                    .defaults(selected)
                    .interact_opt()
                    .map_err(io_error)?;
                cancelled_or(answer, Answer::Choices)
            }
        };
        Ok(answer)
    }

    fn show(&mut self, message: &str) {
        eprintln!("{message}");
    }
}
