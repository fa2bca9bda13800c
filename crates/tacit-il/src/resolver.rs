//! Type metadata resolution
//!
//! The analysis core asks a [`TypeResolver`] for metadata it cannot derive
//! from the IL itself: member definitions, value-type and delegate
//! classification, and the container classification used by the
//! pure-method heuristic. Resolvers must be safe for concurrent reads so
//! distinct methods can be analyzed in parallel.

use crate::types::{
    FieldDefinition, FieldRef, IlType, MethodDefinition, MethodRef, TypeDefinition, TypeRef,
};
use rustc_hash::FxHashMap;

/// Resolves IL references to metadata definitions.
pub trait TypeResolver: Sync {
    /// Resolve a type reference.
    fn resolve_type(&self, reference: &TypeRef) -> Option<TypeDefinition>;

    /// Resolve a method reference.
    fn resolve_method(&self, reference: &MethodRef) -> Option<MethodDefinition>;

    /// Resolve a field reference.
    fn resolve_field(&self, reference: &FieldRef) -> Option<FieldDefinition>;

    /// Whether the type is a delegate type.
    fn is_delegate_type(&self, ty: &IlType) -> bool {
        self.named_definition(ty).is_some_and(|def| def.is_delegate)
    }

    /// Whether the type is a value type. Unnamed types (arrays, pointers)
    /// and unresolvable types are treated as reference types.
    fn is_value_type(&self, ty: &IlType) -> bool {
        self.named_definition(ty).is_some_and(|def| def.is_value_type)
    }

    /// Whether the type is a container (collection) type.
    fn is_container_type(&self, ty: &IlType) -> bool {
        self.named_definition(ty).is_some_and(|def| def.is_container)
    }

    /// Resolve the named definition behind a type, if it has one.
    fn named_definition(&self, ty: &IlType) -> Option<TypeDefinition> {
        ty.as_named().and_then(|reference| self.resolve_type(reference))
    }
}

/// An in-memory resolver backed by registration tables.
///
/// Embedders register the definitions they know about up front; lookups
/// are plain table reads, which keeps the resolver trivially safe for
/// concurrent use.
#[derive(Debug, Default)]
pub struct TableResolver {
    types: FxHashMap<TypeRef, TypeDefinition>,
    methods: FxHashMap<MethodRef, MethodDefinition>,
    fields: FxHashMap<FieldRef, FieldDefinition>,
}

impl TableResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type definition, replacing any previous one.
    pub fn register_type(&mut self, definition: TypeDefinition) {
        self.types.insert(definition.reference.clone(), definition);
    }

    /// Register a method definition, replacing any previous one.
    pub fn register_method(&mut self, definition: MethodDefinition) {
        self.methods.insert(definition.reference.clone(), definition);
    }

    /// Register a field definition, replacing any previous one.
    pub fn register_field(&mut self, definition: FieldDefinition) {
        self.fields.insert(definition.reference.clone(), definition);
    }

    /// Number of registered types.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

impl TypeResolver for TableResolver {
    fn resolve_type(&self, reference: &TypeRef) -> Option<TypeDefinition> {
        self.types.get(reference).cloned()
    }

    fn resolve_method(&self, reference: &MethodRef) -> Option<MethodDefinition> {
        self.methods.get(reference).cloned()
    }

    fn resolve_field(&self, reference: &FieldRef) -> Option<FieldDefinition> {
        self.fields.get(reference).cloned()
    }
}
