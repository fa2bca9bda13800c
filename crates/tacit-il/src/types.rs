//! Type and member references
//!
//! References are the unresolved names the IL speaks in; definitions are
//! what a [`crate::TypeResolver`] turns them into. References are cheap,
//! value-equal keys and occur throughout the analysis core (field edges in
//! the points-to graph are labeled with [`FieldRef`]s).

use std::fmt;

/// A reference to a named type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef {
    /// Fully qualified type name, e.g. `System.Collections.ArrayList`.
    pub name: String,
}

impl TypeRef {
    /// Create a reference from a fully qualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An IL type as it appears in signatures and instruction operands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IlType {
    /// A named class, interface, or value type.
    Named(TypeRef),
    /// A single-dimensional array of the element type.
    Array(Box<IlType>),
    /// A managed or unmanaged pointer to the pointee type.
    Pointer(Box<IlType>),
    /// A type the loader or resolver could not determine.
    Unknown,
}

impl IlType {
    /// Shorthand for a named type.
    pub fn named(name: impl Into<String>) -> Self {
        IlType::Named(TypeRef::new(name))
    }

    /// Shorthand for an array of `element`.
    pub fn array(element: IlType) -> Self {
        IlType::Array(Box::new(element))
    }

    /// Shorthand for a pointer to `pointee`.
    pub fn pointer(pointee: IlType) -> Self {
        IlType::Pointer(Box::new(pointee))
    }

    /// The element type, if this is an array.
    pub fn element(&self) -> Option<&IlType> {
        match self {
            IlType::Array(element) => Some(element),
            _ => None,
        }
    }

    /// The pointee type, if this is a pointer.
    pub fn pointee(&self) -> Option<&IlType> {
        match self {
            IlType::Pointer(pointee) => Some(pointee),
            _ => None,
        }
    }

    /// The named reference behind this type, if any.
    pub fn as_named(&self) -> Option<&TypeRef> {
        match self {
            IlType::Named(reference) => Some(reference),
            _ => None,
        }
    }
}

impl fmt::Display for IlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IlType::Named(reference) => write!(f, "{reference}"),
            IlType::Array(element) => write!(f, "{element}[]"),
            IlType::Pointer(pointee) => write!(f, "{pointee}*"),
            IlType::Unknown => write!(f, "?"),
        }
    }
}

/// A reference to a field of a named type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// The type declaring the field.
    pub declaring_type: TypeRef,
    /// Field name.
    pub name: String,
    /// Declared field type.
    pub field_type: IlType,
    /// Whether the field is static.
    pub is_static: bool,
}

impl FieldRef {
    /// Create an instance field reference.
    pub fn instance(
        declaring_type: TypeRef,
        name: impl Into<String>,
        field_type: IlType,
    ) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            field_type,
            is_static: false,
        }
    }

    /// Create a static field reference.
    pub fn static_field(
        declaring_type: TypeRef,
        name: impl Into<String>,
        field_type: IlType,
    ) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            field_type,
            is_static: true,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// A reference to a method of a named type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// The type declaring the method.
    pub declaring_type: TypeRef,
    /// Method name (`.ctor` for constructors).
    pub name: String,
    /// Declared return type.
    pub return_type: IlType,
    /// Whether the method is static.
    pub is_static: bool,
}

impl MethodRef {
    /// Create an instance method reference.
    pub fn instance(
        declaring_type: TypeRef,
        name: impl Into<String>,
        return_type: IlType,
    ) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            return_type,
            is_static: false,
        }
    }

    /// Create a static method reference.
    pub fn static_method(
        declaring_type: TypeRef,
        name: impl Into<String>,
        return_type: IlType,
    ) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            return_type,
            is_static: true,
        }
    }

    /// Whether this references a constructor.
    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor"
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// Resolved metadata for a type.
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    /// The reference this definition resolves.
    pub reference: TypeRef,
    /// Base type, if any.
    pub base_type: Option<TypeRef>,
    /// Declared instance and static fields.
    pub fields: Vec<FieldRef>,
    /// Whether the type is a value type.
    pub is_value_type: bool,
    /// Whether the type is a delegate type.
    pub is_delegate: bool,
    /// Whether the type is a container (collection) type.
    pub is_container: bool,
}

impl TypeDefinition {
    /// Create a plain reference-type definition with no members.
    pub fn class(reference: TypeRef) -> Self {
        Self {
            reference,
            base_type: None,
            fields: Vec::new(),
            is_value_type: false,
            is_delegate: false,
            is_container: false,
        }
    }

    /// Create a value-type definition with no members.
    pub fn value_type(reference: TypeRef) -> Self {
        Self {
            is_value_type: true,
            ..Self::class(reference)
        }
    }

    /// Set the base type.
    pub fn with_base(mut self, base: TypeRef) -> Self {
        self.base_type = Some(base);
        self
    }

    /// Mark the type as a delegate type.
    pub fn delegate(mut self) -> Self {
        self.is_delegate = true;
        self
    }

    /// Mark the type as a container type.
    pub fn container(mut self) -> Self {
        self.is_container = true;
        self
    }
}

/// Resolved metadata for a method.
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    /// The reference this definition resolves.
    pub reference: MethodRef,
    /// Declared parameter types, including `this` for instance methods.
    pub parameter_types: Vec<IlType>,
}

/// Resolved metadata for a field.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// The reference this definition resolves.
    pub reference: FieldRef,
}
