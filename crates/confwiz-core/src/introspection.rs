//! Field descriptor extraction
//!
//! Turns each declared [`FieldDef`] into a [`FieldSpec`]: the shape a handler
//! dispatches on. Optional wrapping is unwrapped once (chains collapse),
//! unions with more than one real alternative become branches, collections
//! record their element types, and schema references become nested specs
//! that are extracted lazily and memoized per schema name.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;
use std::sync::Arc;

use confwiz_schema::{
    Constraints, FieldDef, SchemaDef, SchemaResolutionError, SchemaResolver, TypeExpr, Value,
};
use tracing::debug;

/// Prompt strategy family of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Bool, numbers, text and custom scalars
    Scalar,
    /// Enumeration member
    Enum,
    /// One of fixed literal values
    Literal,
    /// Datetime, date, time or duration
    Temporal,
    /// Inner type or absent
    Optional,
    /// Ordered sequence
    List,
    /// Deduplicated collection
    Set,
    /// Key/value mapping
    Mapping,
    /// One of several alternatives
    Union,
    /// Nested schema
    NestedSchema,
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scalar => "scalar",
            Self::Enum => "enum",
            Self::Literal => "literal",
            Self::Temporal => "temporal",
            Self::Optional => "optional",
            Self::List => "list",
            Self::Set => "set",
            Self::Mapping => "mapping",
            Self::Union => "union",
            Self::NestedSchema => "nested",
        };
        f.write_str(name)
    }
}

/// Type of a union alternative, collection element, or mapping key/value
#[derive(Debug, Clone, PartialEq)]
pub struct BranchSpec {
    /// Type with constraint layers stripped
    pub ty: TypeExpr,
    /// Strategy family of the type
    pub kind: FieldKind,
    /// Constraints stripped from the type
    pub constraints: Constraints,
}

impl BranchSpec {
    fn of(ty: &TypeExpr) -> Self {
        let mut constraints = Constraints::default();
        let stripped = peel(ty, &mut constraints).clone();
        let kind = resolve(&stripped).kind;
        Self {
            ty: stripped,
            kind,
            constraints,
        }
    }
}

/// Normalized descriptor of one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name
    pub name: String,
    /// Declared type as written
    pub declared: TypeExpr,
    /// Significant type after unwrapping optionality
    ///
    /// For lists and sets this is the element type; for mappings the value
    /// type. Keys and elements are also carried in `branches`.
    pub inner: TypeExpr,
    /// Strategy family
    pub kind: FieldKind,
    /// Whether a value must be supplied
    pub is_required: bool,
    /// Default value
    pub default: Option<Value>,
    /// Normalized constraints
    pub constraints: Constraints,
    /// Description
    pub description: Option<String>,
    /// Referenced schema for nested fields
    pub nested: Option<String>,
    /// Union alternatives, collection element, or mapping key and value
    pub branches: Vec<BranchSpec>,
    /// Whether the field is prompted (false for computed fields)
    pub is_init: bool,
}

impl FieldSpec {
    /// Descriptor for a declared field
    #[must_use]
    pub fn from_def(def: &FieldDef) -> Self {
        let mut spec = Self::from_type(&def.name, &def.ty);
        spec.constraints.merge(&def.constraints);
        spec.description.clone_from(&def.description);
        spec.is_init = def.init;
        spec.default = match &def.default {
            Some(default) => Some(default.clone()),
            None if spec.kind == FieldKind::Optional => Some(Value::Null),
            None => None,
        };
        spec.is_required = spec.default.is_none() && !def.ty.admits_null();
        spec
    }

    /// Descriptor for a bare type, as used for branches and elements
    #[must_use]
    pub fn from_type(name: impl Into<String>, ty: &TypeExpr) -> Self {
        let resolution = resolve(ty);
        Self {
            name: name.into(),
            declared: ty.clone(),
            is_required: !resolution.optional,
            inner: resolution.inner,
            kind: resolution.kind,
            default: None,
            constraints: resolution.constraints,
            description: None,
            nested: resolution.nested,
            branches: resolution.branches,
            is_init: true,
        }
    }

    /// Descriptor for one of this field's branches
    ///
    /// Branch constraints apply to the new descriptor.
    #[must_use]
    pub fn branch(&self, index: usize, name: impl Into<String>) -> Option<FieldSpec> {
        let branch = self.branches.get(index)?;
        let mut spec = Self::from_type(name, &branch.ty);
        spec.constraints.merge(&branch.constraints);
        Some(spec)
    }

    /// Descriptor of the value an optional field holds when present
    ///
    /// Returns a copy of `self` for non-optional fields.
    #[must_use]
    pub fn unwrapped(&self) -> FieldSpec {
        if self.kind != FieldKind::Optional {
            return self.clone();
        }
        let mut spec = Self::from_type(self.name.clone(), &self.inner);
        let mut constraints = self.constraints.clone();
        if let Some(branch) = self.branches.first() {
            constraints.merge(&branch.constraints);
        }
        spec.constraints = constraints;
        spec.description.clone_from(&self.description);
        spec.default = self.default.clone().filter(|d| !d.is_null());
        spec.is_init = self.is_init;
        spec.is_required = false;
        spec
    }

    /// Declared type as displayed
    #[must_use]
    pub fn type_name(&self) -> String {
        self.declared.to_string()
    }

    /// Check if the field is optional
    #[inline]
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.kind == FieldKind::Optional
    }
}

struct Resolution {
    kind: FieldKind,
    inner: TypeExpr,
    optional: bool,
    constraints: Constraints,
    nested: Option<String>,
    branches: Vec<BranchSpec>,
}

fn peel<'t>(ty: &'t TypeExpr, constraints: &mut Constraints) -> &'t TypeExpr {
    match ty {
        TypeExpr::Constrained(inner, layer) => {
            let inner = peel(inner, constraints);
            constraints.merge(layer);
            inner
        }
        other => other,
    }
}

/// Strip optionality, collapsing chains; returns the significant type
fn unwrap_optional(ty: &TypeExpr, constraints: &mut Constraints) -> (TypeExpr, bool) {
    match peel(ty, constraints) {
        TypeExpr::Optional(inner) => (unwrap_optional(inner, constraints).0, true),
        TypeExpr::Union(alternatives) if alternatives.iter().any(TypeExpr::is_null) => {
            let mut rest: Vec<TypeExpr> = alternatives
                .iter()
                .filter(|a| !a.is_null())
                .cloned()
                .collect();
            let inner = match rest.len() {
                0 => TypeExpr::Null,
                1 => rest.remove(0),
                _ => TypeExpr::Union(rest),
            };
            (unwrap_optional(&inner, constraints).0, true)
        }
        TypeExpr::Union(alternatives) if alternatives.len() == 1 => {
            unwrap_optional(&alternatives[0], constraints)
        }
        other => (other.clone(), false),
    }
}

fn resolve(ty: &TypeExpr) -> Resolution {
    let mut constraints = Constraints::default();
    let (base, optional) = unwrap_optional(ty, &mut constraints);

    if optional {
        return Resolution {
            kind: FieldKind::Optional,
            branches: vec![BranchSpec::of(&base)],
            inner: base,
            optional,
            constraints,
            nested: None,
        };
    }

    let (kind, inner, nested, branches) = match &base {
        TypeExpr::Bool
        | TypeExpr::Int
        | TypeExpr::Float
        | TypeExpr::Decimal
        | TypeExpr::Str
        | TypeExpr::Null
        | TypeExpr::Custom(_) => (FieldKind::Scalar, base.clone(), None, Vec::new()),
        TypeExpr::DateTime | TypeExpr::Date | TypeExpr::Time | TypeExpr::Duration => {
            (FieldKind::Temporal, base.clone(), None, Vec::new())
        }
        TypeExpr::Enum(_) => (FieldKind::Enum, base.clone(), None, Vec::new()),
        TypeExpr::Literal(_) => (FieldKind::Literal, base.clone(), None, Vec::new()),
        TypeExpr::List(element) => (
            FieldKind::List,
            element.without_constraints().clone(),
            None,
            vec![BranchSpec::of(element)],
        ),
        TypeExpr::Set(element) => (
            FieldKind::Set,
            element.without_constraints().clone(),
            None,
            vec![BranchSpec::of(element)],
        ),
        TypeExpr::Map(key, value) => (
            FieldKind::Mapping,
            value.without_constraints().clone(),
            None,
            vec![BranchSpec::of(key), BranchSpec::of(value)],
        ),
        TypeExpr::Union(alternatives) => (
            FieldKind::Union,
            base.clone(),
            None,
            alternatives.iter().map(BranchSpec::of).collect(),
        ),
        TypeExpr::Schema(name) => (
            FieldKind::NestedSchema,
            base.clone(),
            Some(name.clone()),
            Vec::new(),
        ),
        TypeExpr::Optional(_) | TypeExpr::Constrained(..) => {
            (FieldKind::Scalar, base.clone(), None, Vec::new())
        }
    };

    Resolution {
        kind,
        inner,
        optional,
        constraints,
        nested,
        branches,
    }
}

/// Descriptors for every field of a schema, in declaration order
#[must_use]
pub fn introspect(schema: &SchemaDef) -> Vec<FieldSpec> {
    schema.fields().iter().map(FieldSpec::from_def).collect()
}

/// Session-scoped extraction with a per-schema memo
pub struct Introspector<'r> {
    resolver: &'r dyn SchemaResolver,
    cache: RefCell<HashMap<String, Rc<[FieldSpec]>>>,
}

impl<'r> Introspector<'r> {
    /// Create new introspector over a resolver
    #[inline]
    #[must_use]
    pub fn new(resolver: &'r dyn SchemaResolver) -> Self {
        Self {
            resolver,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve a schema definition
    ///
    /// # Errors
    /// Returns error if the name does not resolve.
    pub fn schema(&self, name: &str) -> Result<Arc<SchemaDef>, SchemaResolutionError> {
        self.resolver.resolve(name)
    }

    /// Field descriptors of a schema, extracted once per session
    ///
    /// # Errors
    /// Returns error if the name does not resolve.
    pub fn fields_of(&self, name: &str) -> Result<Rc<[FieldSpec]>, SchemaResolutionError> {
        if let Some(specs) = self.cache.borrow().get(name) {
            debug!(schema = name, "field specs memo hit");
            return Ok(Rc::clone(specs));
        }
        let schema = self.resolver.resolve(name)?;
        let specs: Rc<[FieldSpec]> = introspect(&schema).into();
        debug!(schema = name, fields = specs.len(), "field specs extracted");
        self.cache
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&specs));
        Ok(specs)
    }

    /// Number of schemas extracted so far
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl fmt::Debug for Introspector<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Introspector")
            .field("cached", &self.cached())
            .finish_non_exhaustive()
    }
}
