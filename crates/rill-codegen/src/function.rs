//! Functions, methods and calls
//!
//! A function is registered when its body opens, after its parameters are
//! known, so the body can call it recursively. Methods are ordinary
//! functions named `<Class>_<method>` whose first parameter is the
//! receiver, `%<Class>* %this`.

use crate::emitter::Emitter;
use crate::error::SemanticError;
use crate::module::is_reserved_symbol;
use crate::scope::Variable;
use crate::types::Type;
use crate::value::Value;
use rill_error::Result;
use rill_tree::{Node, NodeKind, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    pub name: String,
    pub ret: Type,
    pub params: Vec<(String, Type)>,
}

impl FunctionSig {
    /// `define <ret> @name(<params>) {`
    pub fn header(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|(name, ty)| format!("{} %{}", ty.param_ir(), name))
            .collect::<Vec<_>>()
            .join(", ");
        format!("define {} @{}({}) {{", self.ret, self.name, params)
    }
}

/// A call whose arguments are being collected
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub target: FunctionSig,
    pub args: Vec<Value>,
    /// Operand stack height when the call opened
    pub base: usize,
}

/// Binds a parameter name the way the body reads it
fn parameter_variable(name: &str, ty: &Type) -> Variable {
    match ty {
        Type::Complex(class) => Variable::Object {
            slot: Value::local(name, ty.clone()),
            class: class.clone(),
        },
        _ => Variable::Param {
            value: Value::local(name, ty.clone()),
        },
    }
}

impl Emitter {
    /// Return and parameter types: scalars, `void` returns, class pointers
    fn signature_type(&self, node: &Node, index: usize, is_return: bool) -> Result<Type> {
        let type_name = self.token_text(node, index, TokenKind::TypeName)?;
        match self.resolve_type(type_name) {
            Some(ty) if ty.is_scalar() => Ok(ty),
            Some(Type::Void) if is_return => Ok(Type::Void),
            Some(Type::Complex(class)) if !is_return => Ok(Type::Complex(class)),
            Some(_) => Err(SemanticError::InvalidType(type_name.to_string()).at(node.span)),
            None => Err(SemanticError::UnknownType(type_name.to_string()).at(node.span)),
        }
    }

    pub(crate) fn enter_function(&mut self, node: &Node) -> Result<()> {
        let base_name = self.ident(node, 1)?;
        if self.function.is_some() || self.block_open() {
            return Err(SemanticError::InvalidPlacement(format!(
                "function `{}` must be declared at top level or in a class",
                base_name
            ))
            .at(node.span));
        }

        let ret = self.signature_type(node, 0, true)?;
        let (name, receiver) = match &self.class {
            Some(class) => (class.mangle(base_name), Some(class.name.clone())),
            None => (base_name.to_string(), None),
        };
        if self.functions.contains_key(&name) {
            return Err(SemanticError::DuplicateFunction(name).at(node.span));
        }
        if is_reserved_symbol(&name) || self.scopes.declared_globally(&name) {
            return Err(SemanticError::DuplicateFunction(name).at(node.span));
        }

        self.scopes.enter_function();
        self.module.set_inside_function(true);

        let mut params = Vec::new();
        if let Some(class) = receiver {
            let ty = Type::Complex(class);
            self.scopes
                .declare_local("this", parameter_variable("this", &ty));
            params.push(("this".to_string(), ty));
        }

        self.function = Some(FunctionSig { name, ret, params });
        Ok(())
    }

    pub(crate) fn exit_parameter(&mut self, node: &Node) -> Result<()> {
        let ty = self.signature_type(node, 0, false)?;
        let name = self.ident(node, 1)?;
        let Some(function) = self.function.as_mut() else {
            return Err(SemanticError::malformed(node.kind, "parameter outside a function").at(node.span));
        };

        if function.params.iter().any(|(p, _)| p == name) {
            return Err(SemanticError::DuplicateParameter {
                function: function.name.clone(),
                name: name.to_string(),
            }
            .at(node.span));
        }
        function.params.push((name.to_string(), ty.clone()));
        self.scopes.declare_local(name, parameter_variable(name, &ty));
        Ok(())
    }

    /// Registers the signature and opens the definition
    pub(crate) fn enter_function_block(&mut self, node: &Node) -> Result<()> {
        let sig = self.function.clone().ok_or_else(|| {
            SemanticError::malformed(node.kind, "function body outside a function").at(node.span)
        })?;

        self.module.emit_line(sig.header());
        if let Some(class) = self.class.as_mut() {
            class.methods.push(sig.name.clone());
        }
        tracing::debug!("defining `{}` with {} parameter(s)", sig.name, sig.params.len());
        self.functions.insert(sig.name.clone(), sig);
        Ok(())
    }

    pub(crate) fn exit_function_block(&mut self, node: &Node) -> Result<()> {
        let ret = self
            .function
            .as_ref()
            .map(|f| f.ret.clone())
            .ok_or_else(|| SemanticError::EngineInvariant("no open function".into()).at(node.span))?;
        if ret == Type::Void {
            self.module.emit("ret void");
        } else {
            self.module.emit("unreachable");
        }
        self.module.emit_line("}");
        Ok(())
    }

    pub(crate) fn exit_function(&mut self, _node: &Node) -> Result<()> {
        self.function = None;
        self.scopes.exit_function();
        self.module.set_inside_function(false);
        self.restore_context();
        Ok(())
    }

    /// `return [expr]`
    pub(crate) fn exit_return(&mut self, node: &Node) -> Result<()> {
        let Some(ret) = self.function.as_ref().map(|f| f.ret.clone()) else {
            return Err(SemanticError::InvalidPlacement("`return` outside a function".into()).at(node.span));
        };

        if node.child_count() == 0 {
            if ret != Type::Void {
                return Err(SemanticError::TypeMismatch {
                    expected: ret,
                    found: Type::Void,
                }
                .at(node.span));
            }
            self.module.emit("ret void");
            return Ok(());
        }

        let value = self.pop_value(node.span)?;
        if value.ty != ret {
            return Err(SemanticError::TypeMismatch {
                expected: ret,
                found: value.ty,
            }
            .at(node.span));
        }
        self.module.emit(format!("ret {} {}", value.ty, value));
        Ok(())
    }

    pub(crate) fn enter_call(&mut self, node: &Node) -> Result<()> {
        let name = self.ident(node, 0)?;
        let target = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| SemanticError::UnknownFunction(name.to_string()).at(node.span))?;
        self.calls.push(CallFrame {
            target,
            args: Vec::new(),
            base: self.stack.len(),
        });
        Ok(())
    }

    /// `object.method(args)`: the instance travels as the first argument
    pub(crate) fn enter_method_call(&mut self, node: &Node) -> Result<()> {
        let object = self.ident(node, 0)?;
        let method = self.ident(node, 1)?;
        let Variable::Object { slot, class } = self.lookup(object, node.span)? else {
            return Err(SemanticError::NotAScalar {
                name: object.to_string(),
                what: "not a class instance",
            }
            .at(node.span));
        };

        let mangled = format!("{}_{}", class, method);
        let target = self.functions.get(&mangled).cloned().ok_or_else(|| {
            SemanticError::UnknownMethod {
                class: class.clone(),
                method: method.to_string(),
            }
            .at(node.span)
        })?;
        self.calls.push(CallFrame {
            target,
            args: vec![slot],
            base: self.stack.len(),
        });
        Ok(())
    }

    pub(crate) fn exit_argument(&mut self, node: &Node) -> Result<()> {
        let value = self.pop_value(node.span)?;
        let frame = self
            .calls
            .last_mut()
            .ok_or_else(|| SemanticError::malformed(node.kind, "argument outside a call").at(node.span))?;
        frame.args.push(value);
        Ok(())
    }

    /// Emits the call; non-void results go on the operand stack
    pub(crate) fn exit_call(&mut self, node: &Node) -> Result<()> {
        let frame = self
            .calls
            .pop()
            .ok_or_else(|| SemanticError::EngineInvariant("call stack is empty".into()).at(node.span))?;
        let sig = frame.target;

        if frame.args.len() != sig.params.len() {
            let receiver = usize::from(node.kind == NodeKind::MethodCall);
            return Err(SemanticError::ArityMismatch {
                function: sig.name.clone(),
                expected: sig.params.len() - receiver,
                found: frame.args.len() - receiver,
            }
            .at(node.span));
        }
        for (arg, (_, ty)) in frame.args.iter().zip(&sig.params) {
            if &arg.ty != ty {
                return Err(SemanticError::TypeMismatch {
                    expected: ty.clone(),
                    found: arg.ty.clone(),
                }
                .at(node.span));
            }
        }

        let args = frame
            .args
            .iter()
            .map(|arg| format!("{} {}", arg.ty.param_ir(), arg))
            .collect::<Vec<_>>()
            .join(", ");
        let call = format!("call {} @{}({})", sig.ret, sig.name, args);

        if sig.ret == Type::Void {
            self.module.emit(call);
        } else {
            let result = self.register(sig.ret.clone());
            self.module.emit(format!("{} = {}", result, call));
            self.stack.push(result);
        }
        Ok(())
    }

    /// Drops whatever value the call left behind
    pub(crate) fn exit_call_statement(&mut self, node: &Node) -> Result<()> {
        let mark = self.statement_marks.pop().ok_or_else(|| {
            SemanticError::EngineInvariant("call statement mark missing".into()).at(node.span)
        })?;
        self.stack.truncate(mark);
        Ok(())
    }
}
