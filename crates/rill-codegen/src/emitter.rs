//! The emitter context
//!
//! One `Emitter` owns every piece of state a compilation needs: the name
//! supply, symbol tables, registries, the operand stack, the open-block
//! stacks and the text regions. The tree walker drives it through
//! `Listener`; `generate` assembles the module once the walk is done.

use crate::aggregate::ClassDef;
use crate::control::IfFrame;
use crate::error::SemanticError;
use crate::expr::Fold;
use crate::function::{CallFrame, FunctionSig};
use crate::module::ModuleBuilder;
use crate::names::NameSupply;
use crate::options::CodegenOptions;
use crate::scope::{Context, Scopes, Variable};
use crate::types::Type;
use crate::value::Value;
use crate::Compilation;
use rill_error::{Diagnostics, Result, Span};
use rill_tree::{Listener, Node, NodeKind, TokenKind};
use std::collections::HashMap;

pub struct Emitter {
    pub(crate) options: CodegenOptions,
    pub(crate) names: NameSupply,
    pub(crate) module: ModuleBuilder,
    pub(crate) scopes: Scopes,
    /// Registered functions, methods under their mangled names
    pub(crate) functions: HashMap<String, FunctionSig>,
    /// Classes whose declaration has closed
    pub(crate) classes: HashMap<String, ClassDef>,
    /// Operand stack
    pub(crate) stack: Vec<Value>,
    /// Calls whose arguments are being evaluated
    pub(crate) calls: Vec<CallFrame>,
    pub(crate) ifs: Vec<IfFrame>,
    pub(crate) elses: Vec<u32>,
    pub(crate) loops: Vec<u32>,
    /// Active short-circuit fold
    pub(crate) fold: Option<Fold>,
    /// Function whose body is open
    pub(crate) function: Option<FunctionSig>,
    /// Class whose declaration is open
    pub(crate) class: Option<ClassDef>,
    /// Operand stack heights at call statements
    pub(crate) statement_marks: Vec<usize>,
    pub(crate) warnings: Diagnostics,
}

impl Emitter {
    pub fn new(options: CodegenOptions) -> Self {
        Self {
            options,
            names: NameSupply::new(),
            module: ModuleBuilder::new(),
            scopes: Scopes::new(),
            functions: HashMap::new(),
            classes: HashMap::new(),
            stack: Vec::new(),
            calls: Vec::new(),
            ifs: Vec::new(),
            elses: Vec::new(),
            loops: Vec::new(),
            fold: None,
            function: None,
            class: None,
            statement_marks: Vec::new(),
            warnings: Diagnostics::new(),
        }
    }

    pub fn warnings(&self) -> &Diagnostics {
        &self.warnings
    }

    /// Checks that every stack drained and renders the module
    pub fn generate(self) -> Result<Compilation> {
        let leftovers = [
            ("operand stack", self.stack.len()),
            ("call stack", self.calls.len()),
            ("if stack", self.ifs.len()),
            ("else stack", self.elses.len()),
            ("loop stack", self.loops.len()),
            ("call statement marks", self.statement_marks.len()),
        ];
        for (what, len) in leftovers {
            if len != 0 {
                let err = SemanticError::EngineInvariant(format!("{} holds {} entries", what, len));
                return Err(err.at(Span::default()));
            }
        }
        if self.fold.is_some() || self.function.is_some() || self.class.is_some() {
            let err = SemanticError::EngineInvariant("a declaration or fold was never closed".into());
            return Err(err.at(Span::default()));
        }

        let module = self
            .module
            .finish(self.options.module_name.clone(), self.options.read_format());
        tracing::debug!(
            "module `{}` generated with {} warning(s)",
            module.name,
            self.warnings.len()
        );

        Ok(Compilation {
            ir: module.to_string(),
            module,
            warnings: self.warnings,
        })
    }

    /// Reports a soft condition, or fails if warnings are errors
    pub(crate) fn soft(&mut self, err: SemanticError, span: Span) -> Result<()> {
        if self.options.warnings_as_errors {
            return Err(err.at(span));
        }
        tracing::warn!("line {}: {}", span.start.line, err);
        self.warnings.push(err.warning_at(span));
        Ok(())
    }

    /// Text of the token at `index`, which must be of `kind`
    pub(crate) fn token_text<'n>(
        &self,
        node: &'n Node,
        index: usize,
        kind: TokenKind,
    ) -> Result<&'n str> {
        match node.token(index) {
            Some(token) if token.kind == kind => Ok(token.text.as_str()),
            _ => Err(SemanticError::malformed(
                node.kind,
                format!("expected {:?} token at position {}", kind, index),
            )
            .at(node.span)),
        }
    }

    pub(crate) fn ident<'n>(&self, node: &'n Node, index: usize) -> Result<&'n str> {
        self.token_text(node, index, TokenKind::Ident)
    }

    pub(crate) fn lookup(&self, name: &str, span: Span) -> Result<Variable> {
        self.scopes
            .lookup(name)
            .cloned()
            .ok_or_else(|| SemanticError::UnknownVariable(name.to_string()).at(span))
    }

    /// Built-in type names plus declared classes (including the open one)
    pub(crate) fn resolve_type(&self, name: &str) -> Option<Type> {
        Type::from_name(name).or_else(|| {
            let open = self.class.as_ref().map(|c| c.name.as_str());
            if self.classes.contains_key(name) || open == Some(name) {
                Some(Type::Complex(name.to_string()))
            } else {
                None
            }
        })
    }

    pub(crate) fn register(&mut self, ty: Type) -> Value {
        self.names.register(ty)
    }

    /// Reads a variable as an operand
    pub(crate) fn load(&mut self, name: &str, variable: &Variable, span: Span) -> Result<Value> {
        match variable {
            Variable::Scalar { slot } => {
                let result = self.register(slot.ty.clone());
                self.module.emit(format!(
                    "{} = load {}, {}* {}",
                    result, slot.ty, slot.ty, slot
                ));
                Ok(result)
            }
            Variable::Param { value } => Ok(value.clone()),
            Variable::Object { slot, .. } => Ok(slot.clone()),
            Variable::Array(_) | Variable::Matrix(_) => Err(SemanticError::NotAScalar {
                name: name.to_string(),
                what: variable.describe(),
            }
            .at(span)),
        }
    }

    /// Pops the operand an expression left behind
    pub(crate) fn pop_value(&mut self, span: Span) -> Result<Value> {
        let floor = self.calls.last().map(|c| c.base).unwrap_or(0);
        if self.stack.len() <= floor {
            return Err(SemanticError::VoidValue.at(span));
        }
        self.stack
            .pop()
            .ok_or_else(|| SemanticError::VoidValue.at(span))
    }

    pub(crate) fn block_open(&self) -> bool {
        !self.ifs.is_empty() || !self.elses.is_empty() || !self.loops.is_empty()
    }

    /// Back to global context once no block and no function is open
    pub(crate) fn restore_context(&mut self) {
        if self.function.is_none() && !self.block_open() {
            self.scopes.set_context(Context::Global);
        }
    }
}

impl Listener for Emitter {
    fn enter(&mut self, node: &Node) -> Result<()> {
        if let Some(fold) = self.fold.as_mut() {
            fold.depth += 1;
            return Ok(());
        }

        match node.kind {
            NodeKind::Disjunction | NodeKind::Conjunction => self.enter_boolean_chain(node),
            NodeKind::IfStatement => self.enter_if(node),
            NodeKind::ElseStatement => self.enter_else(node),
            NodeKind::Loop => self.enter_loop(node),
            NodeKind::ClassDeclaration => self.enter_class(node),
            NodeKind::Function => self.enter_function(node),
            NodeKind::FunctionBlock => self.enter_function_block(node),
            NodeKind::FunctionCall => self.enter_call(node),
            NodeKind::MethodCall => self.enter_method_call(node),
            NodeKind::CallStatement => {
                self.statement_marks.push(self.stack.len());
                Ok(())
            }
            NodeKind::Program
            | NodeKind::VarDeclaration
            | NodeKind::Assignment
            | NodeKind::Print
            | NodeKind::Read
            | NodeKind::Return
            | NodeKind::ArrayDeclaration
            | NodeKind::MatrixDeclaration
            | NodeKind::MatrixRow
            | NodeKind::ArrayIndex
            | NodeKind::MatrixIndex
            | NodeKind::MemberDeclaration
            | NodeKind::ClassInstantiation
            | NodeKind::MemberAccess
            | NodeKind::MemberAssignment
            | NodeKind::Parameter
            | NodeKind::Argument
            | NodeKind::IfBlock
            | NodeKind::Equality
            | NodeKind::Additive
            | NodeKind::Multiplicative
            | NodeKind::Unary => Ok(()),
        }
    }

    fn exit(&mut self, node: &Node) -> Result<()> {
        if let Some(fold) = self.fold.as_mut() {
            if fold.depth > 0 {
                fold.depth -= 1;
                return Ok(());
            }
            let result = fold.result;
            self.fold = None;
            self.stack.push(Value::bool(result));
            return Ok(());
        }

        match node.kind {
            NodeKind::Program | NodeKind::MatrixRow => Ok(()),
            NodeKind::VarDeclaration => self.exit_var_declaration(node),
            NodeKind::Assignment => self.exit_assignment(node),
            NodeKind::Print => self.exit_print(node),
            NodeKind::Read => self.exit_read(node),
            NodeKind::Return => self.exit_return(node),
            NodeKind::CallStatement => self.exit_call_statement(node),
            NodeKind::ArrayDeclaration => self.exit_array_declaration(node),
            NodeKind::MatrixDeclaration => self.exit_matrix_declaration(node),
            NodeKind::ArrayIndex => self.exit_array_index(node),
            NodeKind::MatrixIndex => self.exit_matrix_index(node),
            NodeKind::ClassDeclaration => self.exit_class(node),
            NodeKind::MemberDeclaration => self.exit_member_declaration(node),
            NodeKind::ClassInstantiation => self.exit_instantiation(node),
            NodeKind::MemberAccess => self.exit_member_access(node),
            NodeKind::MemberAssignment => self.exit_member_assignment(node),
            NodeKind::Function => self.exit_function(node),
            NodeKind::Parameter => self.exit_parameter(node),
            NodeKind::FunctionBlock => self.exit_function_block(node),
            NodeKind::FunctionCall | NodeKind::MethodCall => self.exit_call(node),
            NodeKind::Argument => self.exit_argument(node),
            NodeKind::IfStatement => self.exit_if(node),
            NodeKind::IfBlock => self.exit_if_block(node),
            NodeKind::ElseStatement => self.exit_else(node),
            NodeKind::Loop => self.exit_loop(node),
            NodeKind::Disjunction
            | NodeKind::Conjunction
            | NodeKind::Equality
            | NodeKind::Additive
            | NodeKind::Multiplicative => self.exit_chain(node),
            NodeKind::Unary => self.exit_unary(node),
        }
    }
}
