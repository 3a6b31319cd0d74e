//! Schema catalog and name resolution
//!
//! A [`SchemaCatalog`] is the explicit registry behind every wizard session:
//! schemas are registered up front (in code or from catalog files) and looked
//! up by fully-qualified name. There is no dynamic discovery.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::{SchemaError, SchemaResolutionError};
use crate::schema::{is_qualified_name, ConfigSchema, SchemaDef};
use crate::types::{simple_name, EnumDef, TypeExpr};

/// Maps fully-qualified schema names to definitions
pub trait SchemaResolver {
    /// Resolve a schema by fully-qualified name
    ///
    /// # Errors
    /// Returns error if the name is malformed or nothing is registered under it.
    fn resolve(&self, name: &str) -> Result<Arc<SchemaDef>, SchemaResolutionError>;
}

/// Registry of schemas and enumerations
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: BTreeMap<String, Arc<SchemaDef>>,
    enums: BTreeMap<String, EnumDef>,
}

impl SchemaCatalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from YAML text
    ///
    /// # Errors
    /// Returns error if the text is not a valid catalog document.
    pub fn from_yaml_str(text: &str) -> Result<Self, SchemaError> {
        let mut catalog = Self::new();
        catalog.load_yaml_str(text)?;
        Ok(catalog)
    }

    /// Add the schemas and enums of a YAML catalog document
    ///
    /// # Errors
    /// Returns error if the text is invalid or redefines a registered name.
    pub fn load_yaml_str(&mut self, text: &str) -> Result<(), SchemaError> {
        crate::file::load_into(self, text)
    }

    /// Add the schemas and enums of a catalog file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), SchemaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "loading schema catalog");
        self.load_yaml_str(&text)
    }

    /// Register a schema
    ///
    /// # Errors
    /// Returns error if a schema with the same name exists.
    pub fn register(&mut self, schema: SchemaDef) -> Result<(), SchemaError> {
        if self.schemas.contains_key(schema.name()) {
            return Err(SchemaError::DuplicateSchema(schema.name().to_string()));
        }
        debug!(schema = schema.name(), fields = schema.fields().len(), "registered schema");
        self.schemas
            .insert(schema.name().to_string(), Arc::new(schema));
        Ok(())
    }

    /// Register the schema of a Rust type
    ///
    /// # Errors
    /// Returns error if the schema is malformed or already registered.
    pub fn register_type<T: ConfigSchema>(&mut self) -> Result<(), SchemaError> {
        self.register(T::schema()?)
    }

    /// Register an enumeration usable by catalog files
    ///
    /// # Errors
    /// Returns error if an enum with the same name exists or it has no members.
    pub fn register_enum(&mut self, def: EnumDef) -> Result<(), SchemaError> {
        if self.enums.contains_key(&def.name) {
            return Err(SchemaError::DuplicateEnum(def.name));
        }
        if def.members.is_empty() {
            return Err(SchemaError::InvalidEnum {
                name: def.name,
                message: "no members".into(),
            });
        }
        self.enums.insert(def.name.clone(), def);
        Ok(())
    }

    /// Find enumeration by full or unambiguous simple name
    #[must_use]
    pub fn enum_named(&self, name: &str) -> Option<&EnumDef> {
        if let Some(def) = self.enums.get(name) {
            return Some(def);
        }
        let mut matches = self.enums.values().filter(|d| d.simple_name() == name);
        match (matches.next(), matches.next()) {
            (Some(def), None) => Some(def),
            _ => None,
        }
    }

    /// Full name of the schema with an unambiguous simple name
    #[must_use]
    pub fn qualify(&self, name: &str) -> Option<&str> {
        if let Some((full, _)) = self.schemas.get_key_value(name) {
            return Some(full.as_str());
        }
        let mut matches = self
            .schemas
            .keys()
            .filter(|k| simple_name(k) == name);
        match (matches.next(), matches.next()) {
            (Some(full), None) => Some(full.as_str()),
            _ => None,
        }
    }

    /// Check if a schema is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Number of registered schemas
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Check if no schemas are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Registered schemas, sorted by name
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<SchemaDef>> {
        self.schemas.values()
    }

    /// Registered schema names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Verify every schema reachable from `root` is registered
    ///
    /// # Errors
    /// Returns error naming the first missing reference.
    pub fn check_references(&self, root: &str) -> Result<(), SchemaResolutionError> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([root.to_string()]);
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let schema = self.resolve(&name)?;
            for field in schema.fields() {
                for reference in field.ty.schema_refs() {
                    if !self.contains(reference) {
                        return Err(SchemaResolutionError::MissingReference {
                            from: name.clone(),
                            missing: reference.to_string(),
                        });
                    }
                    queue.push_back(reference.to_string());
                }
            }
        }
        Ok(())
    }

    /// Reject schemas whose required nested fields loop back on themselves
    ///
    /// A field is a required edge when it has no default and its type is a
    /// plain schema reference. Optional, defaulted, union and collection
    /// fields break a cycle.
    ///
    /// # Errors
    /// Returns error describing the cycle.
    pub fn check_cycles(&self, root: &str) -> Result<(), SchemaResolutionError> {
        let mut stack = Vec::new();
        let mut done = HashSet::new();
        self.visit(root, &mut stack, &mut done)
    }

    /// Run [`Self::check_references`] and [`Self::check_cycles`]
    ///
    /// # Errors
    /// Returns the first problem found.
    pub fn check_graph(&self, root: &str) -> Result<(), SchemaResolutionError> {
        self.check_references(root)?;
        self.check_cycles(root)
    }

    fn visit(
        &self,
        name: &str,
        stack: &mut Vec<String>,
        done: &mut HashSet<String>,
    ) -> Result<(), SchemaResolutionError> {
        if let Some(at) = stack.iter().position(|n| n == name) {
            let mut cycle = stack[at..].to_vec();
            cycle.push(name.to_string());
            return Err(SchemaResolutionError::RequiredCycle { cycle });
        }
        if done.contains(name) {
            return Ok(());
        }
        let Some(schema) = self.schemas.get(name) else {
            return Ok(());
        };

        stack.push(name.to_string());
        for field in schema.fields() {
            if field.default.is_some() {
                continue;
            }
            if let TypeExpr::Schema(target) = field.ty.without_constraints() {
                self.visit(target, stack, done)?;
            }
        }
        stack.pop();
        done.insert(name.to_string());
        Ok(())
    }

    fn suggestions(&self, name: &str) -> Vec<String> {
        let wanted = simple_name(name).to_lowercase();
        self.schemas
            .keys()
            .filter(|k| simple_name(k).to_lowercase() == wanted)
            .cloned()
            .collect()
    }
}

impl SchemaResolver for SchemaCatalog {
    fn resolve(&self, name: &str) -> Result<Arc<SchemaDef>, SchemaResolutionError> {
        if !is_qualified_name(name) {
            return Err(SchemaResolutionError::InvalidName(name.to_string()));
        }
        self.schemas
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaResolutionError::NotFound {
                name: name.to_string(),
                suggestions: self.suggestions(name),
            })
    }
}
