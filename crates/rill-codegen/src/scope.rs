//! Symbol tables
//!
//! Exactly two tables are active: global and local. The local table is flat;
//! if/else/loop bodies do not open a new one. A function body swaps in an
//! empty local table and restores the previous one when it closes.

use crate::aggregate::{ArrayVar, MatrixVar};
use crate::types::Type;
use crate::value::Value;
use std::collections::HashMap;

/// What a name refers to
#[derive(Debug, Clone)]
pub enum Variable {
    /// Stack or global slot holding a scalar; read with a load
    Scalar { slot: Value },
    /// Function parameter, used directly
    Param { value: Value },
    Array(ArrayVar),
    Matrix(MatrixVar),
    /// Pointer to a class instance
    Object { slot: Value, class: String },
}

impl Variable {
    pub fn ty(&self) -> Type {
        match self {
            Variable::Scalar { slot } => slot.ty.clone(),
            Variable::Param { value } => value.ty.clone(),
            Variable::Array(_) | Variable::Matrix(_) => Type::Int,
            Variable::Object { class, .. } => Type::Complex(class.clone()),
        }
    }

    /// Short description for diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            Variable::Scalar { .. } => "a variable",
            Variable::Param { .. } => "a parameter",
            Variable::Array(_) => "an array",
            Variable::Matrix(_) => "a matrix",
            Variable::Object { .. } => "a class instance",
        }
    }
}

/// Which table receives declarations and whether scalars get global slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Global,
    Local,
}

#[derive(Debug)]
pub struct Scopes {
    global: HashMap<String, Variable>,
    local: HashMap<String, Variable>,
    /// Top-level local table, set aside while a function body is open
    saved: Option<HashMap<String, Variable>>,
    context: Context,
}

impl Default for Scopes {
    fn default() -> Self {
        Self {
            global: HashMap::new(),
            local: HashMap::new(),
            saved: None,
            context: Context::Global,
        }
    }
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> Context {
        self.context
    }

    pub fn is_global(&self) -> bool {
        self.context == Context::Global
    }

    pub fn set_context(&mut self, context: Context) {
        self.context = context;
    }

    /// Whether `name` is taken in the table declarations currently go to
    pub fn declared_in_active(&self, name: &str) -> bool {
        match self.context {
            Context::Global => self.global.contains_key(name),
            Context::Local => self.local.contains_key(name),
        }
    }

    pub fn declared_globally(&self, name: &str) -> bool {
        self.global.contains_key(name)
    }

    /// Registers in the active table. Returns false if the name is taken there.
    pub fn declare(&mut self, name: &str, variable: Variable) -> bool {
        let table = match self.context {
            Context::Global => &mut self.global,
            Context::Local => &mut self.local,
        };
        if table.contains_key(name) {
            return false;
        }
        table.insert(name.to_string(), variable);
        true
    }

    /// Registers in the local table regardless of context
    pub fn declare_local(&mut self, name: &str, variable: Variable) -> bool {
        if self.local.contains_key(name) {
            return false;
        }
        self.local.insert(name.to_string(), variable);
        true
    }

    /// Local first, then global
    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.local.get(name).or_else(|| self.global.get(name))
    }

    pub fn enter_function(&mut self) {
        self.saved = Some(std::mem::take(&mut self.local));
        self.context = Context::Local;
    }

    pub fn exit_function(&mut self) {
        self.local = self.saved.take().unwrap_or_default();
    }
}
