//! Subcommand implementations

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use confwiz_core::{
    display, read_document, Answer, InputShape, PromptRequest, Terminal, ValidatedConfig, Wizard,
    WizardConfig, WizardError,
};
use confwiz_schema::SchemaCatalog;
use tracing::{debug, info};

use crate::terminal::ConsoleTerminal;

/// Run the selected subcommand
pub(crate) fn run(matches: &ArgMatches) -> Result<()> {
    let wizard = build_wizard(matches)?;
    match matches.subcommand() {
        Some(("new", args)) => {
            let schema = required(args, "schema")?;
            let output = args
                .get_one::<PathBuf>("output")
                .cloned()
                .unwrap_or_else(|| wizard.config().default_output.clone());
            let mut terminal = ConsoleTerminal::new();
            let config = wizard
                .create(schema, &mut terminal)
                .with_context(|| format!("creating {schema}"))?;
            finish(&wizard, &config, &output, &mut terminal)
        }
        Some(("edit", args)) => {
            let file = required_path(args, "file")?;
            let output = args.get_one::<PathBuf>("output").unwrap_or(file);
            let schema = args.get_one::<String>("model").map(String::as_str);
            let doc = read_document(file)?;
            let mut terminal = ConsoleTerminal::new();
            let config = wizard
                .edit(&doc, schema, &mut terminal)
                .with_context(|| format!("editing {}", file.display()))?;
            finish(&wizard, &config, output, &mut terminal)
        }
        Some(("validate", args)) => {
            let file = required_path(args, "file")?;
            let schema = args.get_one::<String>("model").map(String::as_str);
            let doc = read_document(file)?;
            match wizard.validate(&doc, schema) {
                Ok(config) => {
                    println!("{}", wizard.summary(&config));
                    println!("{} is valid", file.display());
                    Ok(())
                }
                Err(err) => {
                    if let Some(violations) = err.violations() {
                        println!("{}", display::violations_list(violations));
                        bail!("{} is not a valid {}", file.display(), schema_label(&doc, schema));
                    }
                    Err(err).with_context(|| format!("validating {}", file.display()))
                }
            }
        }
        Some(("show-schema", args)) => {
            let schema = required(args, "schema")?;
            println!("{}", wizard.show_schema(schema)?);
            Ok(())
        }
        Some(("list-schemas", _)) => {
            println!("{}", wizard.list_schemas());
            Ok(())
        }
        Some((other, _)) => bail!("unknown command '{other}'"),
        None => bail!("no command given (see --help)"),
    }
}

/// Settings and catalog from global options
pub(crate) fn build_wizard(matches: &ArgMatches) -> Result<Wizard> {
    let config_path = matches.get_one::<PathBuf>("config").map(PathBuf::as_path);
    let config = WizardConfig::discover(config_path).context("loading wizard settings")?;
    config.validate().context("checking wizard settings")?;

    let mut catalog = SchemaCatalog::new();
    let cli_files = matches
        .get_many::<PathBuf>("schemas")
        .into_iter()
        .flatten();
    for path in config.schema_files.iter().chain(cli_files) {
        catalog
            .load_file(path)
            .with_context(|| format!("loading schema catalog {}", path.display()))?;
        debug!(path = %path.display(), schemas = catalog.len(), "loaded catalog");
    }
    Ok(Wizard::new(catalog).with_config(config))
}

fn finish(
    wizard: &Wizard,
    config: &ValidatedConfig,
    output: &Path,
    terminal: &mut dyn Terminal,
) -> Result<()> {
    terminal.show(&wizard.summary(config));
    if wizard.config().confirm_save && !confirm(terminal, "Save configuration?")? {
        println!("Configuration not saved.");
        return Ok(());
    }
    wizard
        .save(config, output)
        .with_context(|| format!("saving {}", output.display()))?;
    info!(path = %output.display(), model = config.model_type(), "configuration saved");
    println!("Configuration saved to {}", output.display());
    Ok(())
}

fn confirm(terminal: &mut dyn Terminal, message: &str) -> Result<bool> {
    let request = PromptRequest::new("", message, InputShape::YesNo { default: true });
    match terminal.ask(&request)? {
        Answer::Bool(yes) => Ok(yes),
        Answer::Cancelled => Err(WizardError::Cancelled.into()),
        other => bail!("unexpected answer {other:?}"),
    }
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing <{name}>"))
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .with_context(|| format!("missing <{name}>"))
}

fn schema_label(doc: &serde_yaml::Value, schema: Option<&str>) -> String {
    schema
        .map(str::to_string)
        .or_else(|| {
            doc.get("_metadata")
                .and_then(|m| m.get("configuration_class"))
                .and_then(serde_yaml::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "configuration".into())
}
