//! TAC values and expressions
//!
//! Values are the operands of TAC instructions; expressions add the
//! operator forms that copy propagation tracks. Every value supports the
//! structural substitution protocol: `variables()` lists the variables it
//! mentions, `replace(old, new)` rewrites every occurrence of `old` and
//! returns a value of the same shape, and `ty()` yields its stored or
//! derived type.

use rustc_hash::FxHashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use tacit_il::{FieldRef, IlType, MethodRef};

/// A TAC variable.
///
/// Two variables are equal exactly when their derived names are equal,
/// regardless of variant. Callers introducing temporaries or derived
/// versions must pick names accordingly.
#[derive(Debug, Clone)]
pub enum Variable {
    /// A declared local or parameter.
    Local {
        /// Declared name.
        name: String,
        /// Declared type.
        ty: IlType,
        /// Whether this is a formal parameter.
        is_parameter: bool,
    },
    /// A compiler-introduced temporary; its name is `base` followed by
    /// `index`.
    Temporal {
        /// Name stem, e.g. `$t`.
        base: String,
        /// Sequence number appended to the stem.
        index: u32,
        /// Type assigned by the disassembler.
        ty: IlType,
    },
    /// An SSA version of another variable.
    Derived {
        /// The versioned variable.
        origin: Box<Variable>,
        /// SSA version; version 0 keeps the origin's name.
        index: u32,
    },
}

impl Variable {
    /// A local variable with the given name and type.
    pub fn local(name: impl Into<String>, ty: IlType) -> Self {
        Variable::Local {
            name: name.into(),
            ty,
            is_parameter: false,
        }
    }

    /// A parameter with the given name and type.
    pub fn parameter(name: impl Into<String>, ty: IlType) -> Self {
        Variable::Local {
            name: name.into(),
            ty,
            is_parameter: true,
        }
    }

    /// A temporary `{base}{index}` with the given type.
    pub fn temporal(base: impl Into<String>, index: u32, ty: IlType) -> Self {
        Variable::Temporal {
            base: base.into(),
            index,
            ty,
        }
    }

    /// An SSA version of `origin`.
    pub fn derived(origin: Variable, index: u32) -> Self {
        Variable::Derived {
            origin: Box::new(origin),
            index,
        }
    }

    /// The distinguished variable holding a method's return value.
    pub fn result_variable(ty: IlType) -> Self {
        Variable::local("$RV", ty)
    }

    /// The derived name identifying this variable.
    pub fn name(&self) -> String {
        match self {
            Variable::Local { name, .. } => name.clone(),
            Variable::Temporal { base, index, .. } => format!("{base}{index}"),
            Variable::Derived { origin, index } => {
                if *index == 0 {
                    origin.name()
                } else {
                    format!("{}_{}", origin.name(), index)
                }
            }
        }
    }

    /// Whether this variable is a formal parameter. A derived variable is
    /// a parameter only for version 0 of a parameter.
    pub fn is_parameter(&self) -> bool {
        match self {
            Variable::Local { is_parameter, .. } => *is_parameter,
            Variable::Temporal { .. } => false,
            Variable::Derived { origin, index } => origin.is_parameter() && *index == 0,
        }
    }

    /// The variable's type; derived variables share their origin's type.
    pub fn ty(&self) -> &IlType {
        match self {
            Variable::Local { ty, .. } => ty,
            Variable::Temporal { ty, .. } => ty,
            Variable::Derived { origin, .. } => origin.ty(),
        }
    }

    /// Substitute `new` for this variable if it matches `old`.
    pub fn replace(&self, old: &Variable, new: &Variable) -> Variable {
        if self == old {
            new.clone()
        } else {
            self.clone()
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A compile-time constant payload.
#[derive(Debug, Clone)]
pub enum ConstantValue {
    /// Integer literal of any IL integer width.
    Int(i64),
    /// Floating-point literal.
    Float(f64),
    /// String literal.
    Str(String),
    /// Boolean literal.
    Bool(bool),
    /// The null reference.
    Null,
}

impl PartialEq for ConstantValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConstantValue::Int(a), ConstantValue::Int(b)) => a == b,
            (ConstantValue::Float(a), ConstantValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ConstantValue::Str(a), ConstantValue::Str(b)) => a == b,
            (ConstantValue::Bool(a), ConstantValue::Bool(b)) => a == b,
            (ConstantValue::Null, ConstantValue::Null) => true,
            _ => false,
        }
    }
}

impl Eq for ConstantValue {}

impl Hash for ConstantValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ConstantValue::Int(v) => v.hash(state),
            ConstantValue::Float(v) => v.to_bits().hash(state),
            ConstantValue::Str(v) => v.hash(state),
            ConstantValue::Bool(v) => v.hash(state),
            ConstantValue::Null => 0u8.hash(state),
        }
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Int(v) => write!(f, "{v}"),
            ConstantValue::Float(v) => write!(f, "{v}"),
            ConstantValue::Str(v) => write!(f, "\"{}\"", v.escape_default()),
            ConstantValue::Bool(v) => write!(f, "{v}"),
            ConstantValue::Null => write!(f, "null"),
        }
    }
}

/// A typed compile-time literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constant {
    /// The literal payload.
    pub value: ConstantValue,
    /// The literal's IL type.
    pub ty: IlType,
}

impl Constant {
    /// The typed null constant.
    pub fn null(ty: IlType) -> Self {
        Self {
            value: ConstantValue::Null,
            ty,
        }
    }

    /// An integer constant of the given type.
    pub fn int(value: i64, ty: IlType) -> Self {
        Self {
            value: ConstantValue::Int(value),
            ty,
        }
    }

    /// Whether this is the null constant.
    pub fn is_null(&self) -> bool {
        matches!(self.value, ConstantValue::Null)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// A TAC value: anything that can appear as an instruction operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// A compile-time literal.
    Constant(Constant),
    /// A value not statically known.
    Unknown,
    /// A variable read.
    Variable(Variable),
    /// An instance field access `instance.field`.
    InstanceField {
        /// The object whose field is accessed.
        instance: Variable,
        /// The accessed field.
        field: FieldRef,
    },
    /// A static field access.
    StaticField {
        /// The accessed field.
        field: FieldRef,
    },
    /// The length of an array.
    ArrayLength {
        /// The measured array.
        array: Variable,
    },
    /// An array element access `array[indices]`.
    ArrayElement {
        /// The indexed array.
        array: Variable,
        /// One index per dimension.
        indices: Vec<Variable>,
    },
    /// A pointer dereference `*pointer`.
    Dereference {
        /// The dereferenced pointer.
        pointer: Variable,
    },
    /// An address-of `&target`; the target must be referenceable (a
    /// variable, field access, array element, or dereference).
    Reference {
        /// The referenced storage location.
        target: Box<Value>,
    },
    /// A first-class pointer to a static method.
    StaticMethodRef {
        /// The referenced method.
        method: MethodRef,
    },
    /// A first-class pointer to a virtual method bound to an instance.
    VirtualMethodRef {
        /// The bound receiver.
        instance: Variable,
        /// The referenced method.
        method: MethodRef,
    },
}

impl Value {
    /// The set of variables this value syntactically mentions.
    pub fn variables(&self) -> FxHashSet<Variable> {
        let mut out = FxHashSet::default();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut FxHashSet<Variable>) {
        match self {
            Value::Constant(_) | Value::Unknown | Value::StaticField { .. } => {}
            Value::StaticMethodRef { .. } => {}
            Value::Variable(v) => {
                out.insert(v.clone());
            }
            Value::InstanceField { instance, .. } => {
                out.insert(instance.clone());
            }
            Value::ArrayLength { array } => {
                out.insert(array.clone());
            }
            Value::ArrayElement { array, indices } => {
                out.insert(array.clone());
                out.extend(indices.iter().cloned());
            }
            Value::Dereference { pointer } => {
                out.insert(pointer.clone());
            }
            Value::Reference { target } => target.collect_variables(out),
            Value::VirtualMethodRef { instance, .. } => {
                out.insert(instance.clone());
            }
        }
    }

    /// Rewrite every occurrence of `old` to `new`, returning a value of
    /// the same shape. The result shares no mutable substructure with the
    /// input.
    pub fn replace(&self, old: &Variable, new: &Variable) -> Value {
        match self {
            Value::Constant(_) | Value::Unknown | Value::StaticField { .. } => self.clone(),
            Value::StaticMethodRef { .. } => self.clone(),
            Value::Variable(v) => Value::Variable(v.replace(old, new)),
            Value::InstanceField { instance, field } => Value::InstanceField {
                instance: instance.replace(old, new),
                field: field.clone(),
            },
            Value::ArrayLength { array } => Value::ArrayLength {
                array: array.replace(old, new),
            },
            Value::ArrayElement { array, indices } => Value::ArrayElement {
                array: array.replace(old, new),
                indices: indices.iter().map(|i| i.replace(old, new)).collect(),
            },
            Value::Dereference { pointer } => Value::Dereference {
                pointer: pointer.replace(old, new),
            },
            Value::Reference { target } => Value::Reference {
                target: Box::new(target.replace(old, new)),
            },
            Value::VirtualMethodRef { instance, method } => Value::VirtualMethodRef {
                instance: instance.replace(old, new),
                method: method.clone(),
            },
        }
    }

    /// The value's stored or derived type.
    pub fn ty(&self) -> IlType {
        match self {
            Value::Constant(c) => c.ty.clone(),
            Value::Unknown => IlType::Unknown,
            Value::Variable(v) => v.ty().clone(),
            Value::InstanceField { field, .. } | Value::StaticField { field } => {
                field.field_type.clone()
            }
            Value::ArrayLength { .. } => IlType::named("System.UInt32"),
            Value::ArrayElement { array, .. } => {
                array.ty().element().cloned().unwrap_or(IlType::Unknown)
            }
            Value::Dereference { pointer } => {
                pointer.ty().pointee().cloned().unwrap_or(IlType::Unknown)
            }
            Value::Reference { target } => IlType::pointer(target.ty()),
            Value::StaticMethodRef { .. } | Value::VirtualMethodRef { .. } => {
                IlType::pointer(IlType::Unknown)
            }
        }
    }

    /// Whether a store instruction may use this value as its target.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Value::InstanceField { .. }
                | Value::StaticField { .. }
                | Value::ArrayElement { .. }
                | Value::Dereference { .. }
        )
    }

    /// Whether `&self` is a well-formed reference target.
    pub fn is_referenceable(&self) -> bool {
        self.is_assignable() || matches!(self, Value::Variable(_))
    }
}

impl From<Variable> for Value {
    fn from(v: Variable) -> Self {
        Value::Variable(v)
    }
}

impl From<Constant> for Value {
    fn from(c: Constant) -> Self {
        Value::Constant(c)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Constant(c) => write!(f, "{c}"),
            Value::Unknown => write!(f, "<unknown>"),
            Value::Variable(v) => write!(f, "{v}"),
            Value::InstanceField { instance, field } => {
                write!(f, "{}.{}", instance, field.name)
            }
            Value::StaticField { field } => write!(f, "{field}"),
            Value::ArrayLength { array } => write!(f, "{array}.Length"),
            Value::ArrayElement { array, indices } => {
                write!(f, "{array}[")?;
                for (i, index) in indices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{index}")?;
                }
                write!(f, "]")
            }
            Value::Dereference { pointer } => write!(f, "*{pointer}"),
            Value::Reference { target } => write!(f, "&{target}"),
            Value::StaticMethodRef { method } => write!(f, "&{method}"),
            Value::VirtualMethodRef { instance, method } => {
                write!(f, "&{}::{}", instance, method.name)
            }
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// The operator's rendered symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

/// A TAC expression: a value or an operator applied to values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    /// A plain value.
    Value(Value),
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Value,
        /// Right operand.
        right: Value,
        /// Result type.
        ty: IlType,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Value,
        /// Result type.
        ty: IlType,
    },
}

impl Expression {
    /// The set of variables this expression syntactically mentions.
    pub fn variables(&self) -> FxHashSet<Variable> {
        match self {
            Expression::Value(v) => v.variables(),
            Expression::Binary { left, right, .. } => {
                let mut out = left.variables();
                out.extend(right.variables());
                out
            }
            Expression::Unary { operand, .. } => operand.variables(),
        }
    }

    /// Rewrite every occurrence of `old` to `new`.
    pub fn replace(&self, old: &Variable, new: &Variable) -> Expression {
        match self {
            Expression::Value(v) => Expression::Value(v.replace(old, new)),
            Expression::Binary {
                op,
                left,
                right,
                ty,
            } => Expression::Binary {
                op: *op,
                left: left.replace(old, new),
                right: right.replace(old, new),
                ty: ty.clone(),
            },
            Expression::Unary { op, operand, ty } => Expression::Unary {
                op: *op,
                operand: operand.replace(old, new),
                ty: ty.clone(),
            },
        }
    }

    /// The expression's type.
    pub fn ty(&self) -> IlType {
        match self {
            Expression::Value(v) => v.ty(),
            Expression::Binary { ty, .. } | Expression::Unary { ty, .. } => ty.clone(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Value(v) => write!(f, "{v}"),
            Expression::Binary {
                op, left, right, ..
            } => write!(f, "{left} {op} {right}"),
            Expression::Unary { op, operand, .. } => write!(f, "{op}{operand}"),
        }
    }
}
