//! confwiz core - interactive collection of schema-described configurations
//!
//! The engine that:
//! - Extracts ordered field descriptors from schemas
//! - Dispatches each field to a type handler for prompting and conversion
//! - Recurses into nested schemas, optionals, unions and collections
//! - Validates collected data and re-prompts only the failing fields
//! - Writes and reads the canonical YAML document form
//!
//! # Example
//!
//! ```rust,ignore
//! use confwiz_core::{Wizard, WizardConfig};
//! use confwiz_schema::SchemaCatalog;
//!
//! let mut catalog = SchemaCatalog::new();
//! catalog.load_file("schemas.yaml")?;
//!
//! let wizard = Wizard::new(catalog).with_config(WizardConfig::discover(None)?);
//! let config = wizard.create("myapp.config.DatabaseConfig", &mut terminal)?;
//! wizard.save(&config, "database.yaml")?;
//! ```

#![warn(unreachable_pub)]

pub mod codec;
pub mod config;
pub mod display;
pub mod document;
pub mod error;
pub mod handlers;
pub mod introspection;
pub mod prompt;
pub mod terminal;
pub mod validation;
pub mod wizard;

pub use codec::{CanonicalCodec, DocumentMetadata, LoadedDocument};
pub use config::WizardConfig;
pub use document::{read_document, write_document};
pub use error::{
    ConfigError, DecodeError, DocumentError, Result, SerializationError, TerminalError,
    UnsupportedTypeError, Violation, Violations, WizardError,
};
pub use handlers::{CodecContext, TypeHandler, TypeHandlerRegistry};
pub use introspection::{introspect, FieldKind, FieldSpec, Introspector};
pub use prompt::PromptEngine;
pub use terminal::{Answer, InputShape, PromptRequest, Terminal};
pub use validation::{FixLoop, FixState, Materializer, ValidatedConfig};
pub use wizard::Wizard;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with confwiz core
    pub use crate::{
        Answer, FieldSpec, InputShape, PromptRequest, Terminal, TypeHandler, TypeHandlerRegistry,
        ValidatedConfig, Wizard, WizardConfig, WizardError,
    };
    pub use confwiz_schema::{FieldDef, Record, SchemaCatalog, SchemaDef, TypeExpr, Value};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
