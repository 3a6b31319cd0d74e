//! confwiz schema model
//!
//! The declarative half of the wizard: what a configuration looks like, not
//! how it is collected.
//!
//! # Core Concepts
//!
//! - [`TypeExpr`]: Declared type of a field (scalars, enums, optionals, collections,
//!   nested schemas)
//! - [`Value`]: Typed runtime value held by a configuration record
//! - [`Constraints`]: Numeric bounds, length bounds and patterns attached to a field
//! - [`SchemaDef`]: Named, ordered set of [`FieldDef`]s
//! - [`SchemaCatalog`]: Registry resolving fully-qualified schema names
//! - [`FieldPath`]: Dotted address of a value inside a record
//!
//! # Example
//!
//! ```rust,ignore
//! use confwiz_schema::{FieldDef, SchemaCatalog, SchemaDef, TypeExpr};
//!
//! let server = SchemaDef::builder("app.config.ServerConfig")
//!     .field(FieldDef::new("host", TypeExpr::Str).with_default("localhost"))
//!     .field(FieldDef::new("port", TypeExpr::Int).ge(1).le(65535))
//!     .build()?;
//!
//! let mut catalog = SchemaCatalog::new();
//! catalog.register(server)?;
//! ```

#![warn(unreachable_pub)]

mod catalog;
mod constraints;
mod error;
mod file;
pub mod iso8601;
mod parse;
mod path;
mod schema;
mod types;
mod value;

pub use catalog::{SchemaCatalog, SchemaResolver};
pub use constraints::Constraints;
pub use error::{PathError, SchemaError, SchemaResolutionError, TypeParseError};
pub use parse::parse_type;
pub use path::{FieldPath, Segment};
pub use schema::{ConfigSchema, FieldDef, SchemaBuilder, SchemaDef};
pub use types::{EnumDef, EnumMember, TypeExpr};
pub use value::{assign, lookup, Record, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parsed_types_build_schemas() {
        let ty = parse_type("list[int] | None").unwrap();
        let schema = SchemaDef::builder("app.Sample")
            .field(FieldDef::new("ports", ty.clone()))
            .build()
            .unwrap();

        assert_eq!(schema.field("ports").unwrap().ty, ty);
        assert_eq!(schema.simple_name(), "Sample");
    }

    #[test]
    fn catalog_resolves_registered_schema() {
        let schema = SchemaDef::builder("app.Sample")
            .field(FieldDef::new("name", TypeExpr::Str))
            .build()
            .unwrap();
        let mut catalog = SchemaCatalog::new();
        catalog.register(schema).unwrap();

        let resolved = catalog.resolve("app.Sample").unwrap();
        assert_eq!(resolved.fields().len(), 1);
    }

    #[test]
    fn paths_address_nested_records() {
        let mut inner = Record::new();
        inner.insert("value".into(), Value::Int(3));
        let mut root = Record::new();
        root.insert("inner".into(), Value::Record(inner));

        let path: FieldPath = "inner.value".parse().unwrap();
        assert_eq!(lookup(&root, &path), Some(&Value::Int(3)));
    }
}
