//! Catalog file loading tests

use std::io::Write;

use confwiz_schema::{
    SchemaCatalog, SchemaError, SchemaResolutionError, SchemaResolver, TypeExpr, Value,
};
use pretty_assertions::assert_eq;

const SERVER_CATALOG: &str = r"
enums:
  - name: app.config.LogLevel
    members:
      DEBUG: debug
      INFO: info
      WARNING: warning
schemas:
  - name: app.config.ServerConfig
    description: HTTP server settings
    fields:
      - name: host
        type: str
        default: localhost
        description: Interface to bind
      - name: port
        type: int
        constraints: {ge: 1, le: 65535}
      - name: debug
        type: bool
        default: false
      - name: log_level
        type: LogLevel
        default: info
      - name: upstreams
        type: list[app.config.Upstream]
        default: []
  - name: app.config.Upstream
    fields:
      - name: url
        type: str
        constraints: {pattern: '^https?://'}
      - name: weight
        type: int | None
";

fn write_catalog(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_file_registers_everything() {
    let file = write_catalog(SERVER_CATALOG);
    let mut catalog = SchemaCatalog::new();
    catalog.load_file(file.path()).unwrap();

    let names: Vec<_> = catalog.names().collect();
    assert_eq!(names, vec!["app.config.ServerConfig", "app.config.Upstream"]);
    assert!(catalog.check_graph("app.config.ServerConfig").is_ok());
}

#[test]
fn test_field_order_and_defaults() {
    let catalog = SchemaCatalog::from_yaml_str(SERVER_CATALOG).unwrap();
    let server = catalog.resolve("app.config.ServerConfig").unwrap();

    let fields: Vec<_> = server.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fields, vec!["host", "port", "debug", "log_level", "upstreams"]);

    assert_eq!(
        server.field("host").unwrap().default,
        Some(Value::Str("localhost".into()))
    );
    assert_eq!(server.field("port").unwrap().default, None);
    assert_eq!(
        server.field("upstreams").unwrap().default,
        Some(Value::List(vec![]))
    );
    assert_eq!(
        server.field("host").unwrap().description.as_deref(),
        Some("Interface to bind")
    );
}

#[test]
fn test_optional_field_type() {
    let catalog = SchemaCatalog::from_yaml_str(SERVER_CATALOG).unwrap();
    let upstream = catalog.resolve("app.config.Upstream").unwrap();
    assert_eq!(
        upstream.field("weight").unwrap().ty,
        TypeExpr::optional(TypeExpr::Int)
    );
}

#[test]
fn test_second_file_cannot_redefine() {
    let mut catalog = SchemaCatalog::from_yaml_str(SERVER_CATALOG).unwrap();
    let err = catalog.load_yaml_str(SERVER_CATALOG).unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateEnum(_)));
}

#[test]
fn test_missing_reference_reported_on_check() {
    let text = r"
schemas:
  - name: app.Root
    fields:
      - name: child
        type: app.Missing
";
    let catalog = SchemaCatalog::from_yaml_str(text).unwrap();
    assert_eq!(
        catalog.check_graph("app.Root").unwrap_err(),
        SchemaResolutionError::MissingReference {
            from: "app.Root".into(),
            missing: "app.Missing".into(),
        }
    );
}

#[test]
fn test_missing_file() {
    let mut catalog = SchemaCatalog::new();
    let err = catalog.load_file("/nonexistent/catalog.yaml").unwrap_err();
    assert!(matches!(err, SchemaError::Io { .. }));
}
