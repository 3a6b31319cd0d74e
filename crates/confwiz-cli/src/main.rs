//! confwiz - schema-driven configuration wizard

mod commands;
mod terminal;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{value_parser, Arg, ArgAction, Command};
use confwiz_core::WizardError;
use tracing_subscriber::EnvFilter;

pub(crate) fn cli() -> Command {
    let model = Arg::new("model")
        .short('m')
        .long("model")
        .value_name("SCHEMA")
        .help("Schema to use instead of the one named in the document");
    let output = Arg::new("output")
        .short('o')
        .long("output")
        .value_name("PATH")
        .value_parser(value_parser!(PathBuf));

    Command::new("confwiz")
        .version(confwiz_core::VERSION)
        .about("Interactive, schema-driven configuration wizard")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("schemas")
                .long("schemas")
                .global(true)
                .value_name("FILE")
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("Schema catalog file (repeatable)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Wizard settings file (TOML)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("More log output (-v debug, -vv trace)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Write logs as JSON lines"),
        )
        .subcommand(
            Command::new("new")
                .about("Create a configuration interactively")
                .arg(Arg::new("schema").required(true).value_name("SCHEMA"))
                .arg(output.clone().help("Output file (default from settings)")),
        )
        .subcommand(
            Command::new("edit")
                .about("Edit an existing configuration document")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(output.help("Output file (default: overwrite the input)"))
                .arg(model.clone()),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a configuration document without prompting")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(model),
        )
        .subcommand(
            Command::new("show-schema")
                .about("Show the fields of a schema")
                .arg(Arg::new("schema").required(true).value_name("SCHEMA")),
        )
        .subcommand(Command::new("list-schemas").about("List the schemas in the loaded catalogs"))
}

fn init_logging(verbosity: u8, json: bool) {
    let fallback = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = if verbosity > 0 {
        EnvFilter::new(fallback)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_logging(matches.get_count("verbose"), matches.get_flag("log-json"));

    match commands::run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let cancelled = err
                .downcast_ref::<WizardError>()
                .is_some_and(WizardError::is_cancelled);
            if cancelled {
                eprintln!("Aborted.");
                return ExitCode::from(130);
            }
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
