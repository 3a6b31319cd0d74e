//! Ordered handler registry

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{
    BoolHandler, DecimalHandler, EnumHandler, FloatHandler, IntHandler, ListHandler,
    LiteralHandler, MappingHandler, NestedHandler, OptionalHandler, SetHandler, StrHandler,
    TemporalHandler, TypeHandler, UnionHandler,
};
use crate::error::UnsupportedTypeError;
use crate::introspection::FieldSpec;

/// Handlers in dispatch priority order
///
/// Registration never removes handlers. [`register`](Self::register) puts a
/// handler ahead of every existing one so callers can override built-ins.
#[derive(Clone)]
pub struct TypeHandlerRegistry {
    handlers: Vec<Arc<dyn TypeHandler>>,
}

impl TypeHandlerRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Registry with the built-in handlers
    #[must_use]
    pub fn with_defaults() -> Self {
        let handlers: Vec<Arc<dyn TypeHandler>> = vec![
            Arc::new(OptionalHandler),
            Arc::new(UnionHandler),
            Arc::new(ListHandler),
            Arc::new(SetHandler),
            Arc::new(MappingHandler),
            Arc::new(BoolHandler),
            Arc::new(EnumHandler),
            Arc::new(LiteralHandler),
            Arc::new(DecimalHandler),
            Arc::new(IntHandler),
            Arc::new(FloatHandler),
            Arc::new(TemporalHandler::datetime()),
            Arc::new(TemporalHandler::date()),
            Arc::new(TemporalHandler::time()),
            Arc::new(TemporalHandler::duration()),
            Arc::new(NestedHandler),
            Arc::new(StrHandler),
        ];
        Self { handlers }
    }

    /// Register with highest priority
    pub fn register(&mut self, handler: impl TypeHandler + 'static) -> &mut Self {
        debug!(handler = handler.name(), "registering handler first");
        self.handlers.insert(0, Arc::new(handler));
        self
    }

    /// Register with lowest priority
    pub fn register_fallback(&mut self, handler: impl TypeHandler + 'static) -> &mut Self {
        debug!(handler = handler.name(), "registering fallback handler");
        self.handlers.push(Arc::new(handler));
        self
    }

    /// First handler claiming `spec`
    ///
    /// # Errors
    /// Returns error if no handler claims the field.
    pub fn select(&self, spec: &FieldSpec) -> Result<&dyn TypeHandler, UnsupportedTypeError> {
        let handler = self
            .handlers
            .iter()
            .find(|h| h.can_handle(spec))
            .ok_or_else(|| UnsupportedTypeError {
                field: spec.name.clone(),
                type_name: spec.type_name(),
            })?;
        debug!(
            field = %spec.name,
            kind = %spec.kind,
            handler = handler.name(),
            "handler selected"
        );
        Ok(handler.as_ref())
    }

    /// Handler names in priority order
    #[must_use]
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Number of handlers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for TypeHandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for TypeHandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeHandlerRegistry")
            .field("handlers", &self.handler_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confwiz_schema::{EnumDef, FieldDef, TypeExpr};

    fn select_name(registry: &TypeHandlerRegistry, ty: TypeExpr) -> &'static str {
        let spec = FieldSpec::from_def(&FieldDef::new("f", ty));
        registry.select(&spec).unwrap().name()
    }

    #[test]
    fn defaults_dispatch_by_kind() {
        let registry = TypeHandlerRegistry::with_defaults();
        assert_eq!(select_name(&registry, TypeExpr::Int), "int");
        assert_eq!(select_name(&registry, TypeExpr::Decimal), "decimal");
        assert_eq!(select_name(&registry, TypeExpr::Str), "str");
        assert_eq!(select_name(&registry, TypeExpr::optional(TypeExpr::Int)), "optional");
        assert_eq!(
            select_name(&registry, TypeExpr::union([TypeExpr::Int, TypeExpr::Str])),
            "union"
        );
        assert_eq!(select_name(&registry, TypeExpr::set(TypeExpr::Str)), "set");
        assert_eq!(
            select_name(&registry, TypeExpr::map(TypeExpr::Str, TypeExpr::Int)),
            "mapping"
        );
        assert_eq!(
            select_name(&registry, TypeExpr::Enum(EnumDef::from_names("t.E", &["a"]))),
            "enum"
        );
        assert_eq!(select_name(&registry, TypeExpr::Duration), "duration");
        assert_eq!(select_name(&registry, TypeExpr::schema("t.Inner")), "nested");
    }

    #[test]
    fn custom_types_are_unsupported_by_default() {
        let registry = TypeHandlerRegistry::with_defaults();
        let spec = FieldSpec::from_def(&FieldDef::new("addr", TypeExpr::Custom("IpAddr".into())));
        let err = registry.select(&spec).unwrap_err();
        assert_eq!(err.type_name, "IpAddr");
    }

    #[test]
    fn empty_registry_rejects_everything() {
        let registry = TypeHandlerRegistry::new();
        assert!(registry.is_empty());
        let spec = FieldSpec::from_def(&FieldDef::new("f", TypeExpr::Int));
        assert!(registry.select(&spec).is_err());
    }

    #[test]
    fn registration_order() {
        let mut registry = TypeHandlerRegistry::with_defaults();
        let before = registry.len();
        registry.register(StrHandler).register_fallback(IntHandler);
        let names = registry.handler_names();
        assert_eq!(names.len(), before + 2);
        assert_eq!(names[0], "str");
        assert_eq!(names[names.len() - 1], "int");
        assert_eq!(names[1], "optional");
    }

    #[test]
    fn debug_lists_handlers() {
        let registry = TypeHandlerRegistry::with_defaults();
        let debug = format!("{registry:?}");
        assert!(debug.contains("\"optional\""));
        assert!(debug.contains("\"nested\""));
    }
}
