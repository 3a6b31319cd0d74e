//! Session façade
//!
//! [`Wizard`] owns a schema catalog, a handler registry and settings, and
//! wires the introspector, prompt engine, fix loop and codec together for
//! each operation.

use std::path::Path;
use std::sync::Arc;

use confwiz_schema::{SchemaCatalog, SchemaDef, SchemaResolver};
use serde_yaml::Value as Yaml;
use tracing::{debug, info};

use crate::codec::{CanonicalCodec, LoadedDocument};
use crate::config::WizardConfig;
use crate::display;
use crate::document;
use crate::error::{Result, WizardError};
use crate::handlers::{CodecContext, TypeHandlerRegistry};
use crate::introspection::Introspector;
use crate::prompt::PromptEngine;
use crate::terminal::Terminal;
use crate::validation::{FixLoop, Materializer, ValidatedConfig};

/// Interactive configuration wizard
#[derive(Debug, Clone)]
pub struct Wizard {
    catalog: SchemaCatalog,
    registry: TypeHandlerRegistry,
    config: WizardConfig,
}

impl Wizard {
    /// Create new wizard with the built-in handlers and default settings
    #[must_use]
    pub fn new(catalog: SchemaCatalog) -> Self {
        Self {
            catalog,
            registry: TypeHandlerRegistry::with_defaults(),
            config: WizardConfig::default(),
        }
    }

    /// With a custom handler registry
    #[must_use]
    pub fn with_registry(mut self, registry: TypeHandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// With settings
    #[must_use]
    pub fn with_config(mut self, config: WizardConfig) -> Self {
        self.config = config;
        self
    }

    /// Schema catalog
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Handler registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &TypeHandlerRegistry {
        &self.registry
    }

    /// Settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    /// Resolve a schema after checking its reference graph
    ///
    /// # Errors
    /// Returns error if the schema or one it references is unknown, or the
    /// schema can only be satisfied by an infinite instance.
    pub fn resolve(&self, name: &str) -> Result<Arc<SchemaDef>> {
        self.catalog.check_graph(name)?;
        Ok(self.catalog.resolve(name)?)
    }

    /// Collect a new configuration
    ///
    /// # Errors
    /// Returns error if the schema does not resolve, prompting fails or is
    /// cancelled, or violations remain after the fix budget.
    pub fn create(&self, schema: &str, terminal: &mut dyn Terminal) -> Result<ValidatedConfig> {
        let schema = self.resolve(schema)?;
        info!(schema = schema.name(), "creating configuration");
        self.collect(&schema, None, terminal)
    }

    /// Re-prompt every field of a document, its values as defaults
    ///
    /// # Errors
    /// Same as [`create`](Self::create), plus document errors.
    pub fn edit(
        &self,
        doc: &Yaml,
        schema: Option<&str>,
        terminal: &mut dyn Terminal,
    ) -> Result<ValidatedConfig> {
        let loaded = self.load(doc, schema)?;
        info!(schema = loaded.schema.name(), "editing configuration");
        let model_type = loaded.model_type().to_string();
        let config = self.collect(&loaded.schema, Some(loaded.data), terminal)?;
        Ok(config.with_model_type(model_type))
    }

    /// Validate a document without prompting
    ///
    /// # Errors
    /// Returns [`WizardError::RetryExhausted`] with zero attempts when the
    /// document has violations, or any load error.
    pub fn validate(&self, doc: &Yaml, schema: Option<&str>) -> Result<ValidatedConfig> {
        let loaded = self.load(doc, schema)?;
        let introspector = Introspector::new(&self.catalog);
        let specs = introspector.fields_of(loaded.schema.name())?;
        let model_type = loaded.model_type().to_string();
        match Materializer::new(&introspector).materialize(&specs, &loaded.data) {
            Ok(data) => {
                Ok(ValidatedConfig::new(loaded.schema, data).with_model_type(model_type))
            }
            Err(violations) => Err(WizardError::RetryExhausted {
                attempts: 0,
                violations,
            }),
        }
    }

    /// Decode a document against its schema
    ///
    /// # Errors
    /// Returns error if the document is malformed or its schema is unknown.
    pub fn load(&self, doc: &Yaml, schema: Option<&str>) -> Result<LoadedDocument> {
        let introspector = Introspector::new(&self.catalog);
        let loaded = self.codec(&introspector).from_document(doc, schema)?;
        self.catalog.check_graph(loaded.schema.name())?;
        Ok(loaded)
    }

    /// Canonical document for a validated configuration
    ///
    /// # Errors
    /// Returns error if a value does not fit its field.
    pub fn render(&self, config: &ValidatedConfig) -> Result<Yaml> {
        let introspector = Introspector::new(&self.catalog);
        let doc = self
            .codec(&introspector)
            .to_document_as(config.data(), config.schema(), config.model_type())?;
        Ok(doc)
    }

    /// Write a validated configuration to `path`
    ///
    /// # Errors
    /// Returns error if rendering or writing fails.
    pub fn save(&self, config: &ValidatedConfig, path: impl AsRef<Path>) -> Result<()> {
        let doc = self.render(config)?;
        document::write_document(path, &doc)?;
        Ok(())
    }

    /// Field table of a schema
    ///
    /// # Errors
    /// Returns error if the schema does not resolve.
    pub fn show_schema(&self, name: &str) -> Result<String> {
        let schema = self.resolve(name)?;
        let introspector = Introspector::new(&self.catalog);
        let specs = introspector.fields_of(schema.name())?;
        Ok(display::schema_table(&schema, &specs))
    }

    /// Table of every registered schema
    #[must_use]
    pub fn list_schemas(&self) -> String {
        display::schema_list(&self.catalog)
    }

    /// Summary table of a validated configuration
    #[must_use]
    pub fn summary(&self, config: &ValidatedConfig) -> String {
        display::summary_table(config.model_type(), config.data())
    }

    fn collect(
        &self,
        schema: &Arc<SchemaDef>,
        existing: Option<confwiz_schema::Record>,
        terminal: &mut dyn Terminal,
    ) -> Result<ValidatedConfig> {
        let introspector = Introspector::new(&self.catalog);
        let mut engine = PromptEngine::new(&self.registry, &introspector, terminal)
            .with_max_depth(self.config.max_depth);
        let mut fix = FixLoop::new(&mut engine, self.config.max_fix_attempts)
            .with_confirm(self.config.confirm_fixes);
        let result = fix.collect(schema, existing);
        debug!(attempts = fix.attempts(), ok = result.is_ok(), "collection finished");
        result
    }

    fn codec<'a>(&'a self, introspector: &'a Introspector<'a>) -> CanonicalCodec<'a> {
        CanonicalCodec::new(CodecContext::new(&self.registry, introspector))
            .with_format_version(self.config.format_version.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing;
    use crate::terminal::replay::Replay;
    use confwiz_schema::{FieldDef, TypeExpr, Value};
    use pretty_assertions::assert_eq;

    fn wizard() -> Wizard {
        let mut catalog = testing::catalog();
        catalog
            .register(
                SchemaDef::builder("tests.Server")
                    .field(FieldDef::new("host", TypeExpr::Str).with_default("localhost"))
                    .field(FieldDef::new("port", TypeExpr::Int).ge(1).le(65535))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        Wizard::new(catalog).with_config(WizardConfig::new().with_format_version("9.9"))
    }

    #[test]
    fn create_fix_and_render() {
        let wizard = wizard();
        let mut terminal = Replay::new().accept().text("70000").yes().text("5432");

        let config = wizard.create("tests.Server", &mut terminal).unwrap();
        assert_eq!(config.data()["port"], Value::Int(5432));
        assert_eq!(config.model_type(), "Server");

        let doc = wizard.render(&config).unwrap();
        let expected: Yaml = serde_yaml::from_str(
            "_metadata:\n  model_type: Server\n  configuration_class: tests.Server\n  version: '9.9'\n\
             configuration:\n  host: localhost\n  port: 5432\n",
        )
        .unwrap();
        assert_eq!(doc, expected);
    }

    #[test]
    fn edit_keeps_model_type() {
        let wizard = wizard();
        let doc: Yaml = serde_yaml::from_str(
            "_metadata:\n  model_type: Primary\n  configuration_class: tests.Server\n\
             configuration:\n  host: db\n  port: 80\n",
        )
        .unwrap();
        let mut terminal = Replay::new().accept().text("8080");

        let config = wizard.edit(&doc, None, &mut terminal).unwrap();
        assert_eq!(config.model_type(), "Primary");
        assert_eq!(config.data()["host"], Value::Str("db".into()));
        assert_eq!(config.data()["port"], Value::Int(8080));
    }

    #[test]
    fn validate_reports_violations() {
        let wizard = wizard();
        let doc: Yaml =
            serde_yaml::from_str("configuration:\n  port: 0\n").unwrap();

        let err = wizard.validate(&doc, Some("tests.Server")).unwrap_err();
        let violations = err.violations().unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations.iter().next().unwrap().path.to_string(), "port");

        let ok: Yaml = serde_yaml::from_str("configuration:\n  port: 22\n").unwrap();
        let config = wizard.validate(&ok, Some("tests.Server")).unwrap();
        assert_eq!(config.data()["host"], Value::Str("localhost".into()));
    }

    #[test]
    fn save_writes_document() {
        let wizard = wizard();
        let mut terminal = Replay::new().text("example.org").text("443");
        let config = wizard.create("tests.Server", &mut terminal).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        wizard.save(&config, &path).unwrap();

        let loaded = wizard.load(&document::read_document(&path).unwrap(), None).unwrap();
        assert_eq!(&loaded.data, config.data());
    }

    #[test]
    fn unknown_schema_fails_before_prompting() {
        let wizard = wizard();
        let mut terminal = Replay::new();
        assert!(matches!(
            wizard.create("tests.Nope", &mut terminal),
            Err(WizardError::SchemaResolution(_))
        ));
        assert!(terminal.asked.is_empty());
    }

    #[test]
    fn schema_views() {
        let wizard = wizard();
        assert!(wizard.show_schema("tests.Server").unwrap().contains("port"));
        let list = wizard.list_schemas();
        assert!(list.contains("tests.InnerModel"));
        assert!(list.contains("tests.Server"));
    }
}
