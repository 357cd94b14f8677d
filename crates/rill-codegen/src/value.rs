//! Operands
//!
//! A value is a name plus a type. The storage class decides the prefix the
//! name is emitted with; constants carry literal text and are emitted bare.

use crate::types::Type;
use std::fmt;

/// Where a named value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Register or stack slot (`%name`)
    Local,
    /// Global slot (`@name`)
    Global,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub name: String,
    pub ty: Type,
    pub storage: Storage,
    /// Literal text, used without a load
    pub constant: bool,
}

impl Value {
    pub fn local(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            storage: Storage::Local,
            constant: false,
        }
    }

    pub fn global(name: impl Into<String>, ty: Type) -> Self {
        Self {
            storage: Storage::Global,
            ..Self::local(name, ty)
        }
    }

    pub fn constant(text: impl Into<String>, ty: Type) -> Self {
        Self {
            constant: true,
            ..Self::local(text, ty)
        }
    }

    pub fn bool(value: bool) -> Self {
        Self::constant(value.to_string(), Type::Bool)
    }

    /// Same type and storage under a new name
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constant: false,
            ..self.clone()
        }
    }

    pub fn to_local(mut self) -> Self {
        self.storage = Storage::Local;
        self
    }

    pub fn to_global(mut self) -> Self {
        self.storage = Storage::Global;
        self
    }

    pub fn is_global(&self) -> bool {
        self.storage == Storage::Global
    }

    /// The literal, if this is a compile-time boolean
    pub fn as_bool(&self) -> Option<bool> {
        if !self.constant || self.ty != Type::Bool {
            return None;
        }
        match self.name.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    /// Text used where an instruction expects this operand
    pub fn operand(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constant {
            return write!(f, "{}", self.name);
        }
        match self.storage {
            Storage::Local => write!(f, "%{}", self.name),
            Storage::Global => write!(f, "@{}", self.name),
        }
    }
}

/// Renders a double literal so the IR parser accepts it exactly.
/// Integral values stay readable; everything else uses the bit pattern.
pub fn double_literal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("0x{:016X}", value.to_bits())
    }
}
