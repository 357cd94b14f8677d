//! Declarations, assignment and console I/O

use crate::emitter::Emitter;
use crate::error::SemanticError;
use crate::module::{constant_ptr, is_reserved_symbol};
use crate::scope::Variable;
use crate::types::Type;
use crate::value::Value;
use rill_error::{Result, Span};
use rill_tree::{Element, Node, TokenKind};

impl Emitter {
    /// `ty name [= expr]`
    pub(crate) fn exit_var_declaration(&mut self, node: &Node) -> Result<()> {
        let type_name = self.token_text(node, 0, TokenKind::TypeName)?;
        let name = self.ident(node, 1)?;
        let init = match node.node(2) {
            Some(_) => Some(self.pop_value(node.span)?),
            None => None,
        };

        if self.scopes.declared_in_active(name) || self.clashes_with_global_symbol(name) {
            return self.soft(SemanticError::DuplicateVariable(name.to_string()), node.span);
        }

        let ty = match Type::from_name(type_name) {
            None if init.is_none() => {
                return self.soft(SemanticError::UnknownType(type_name.to_string()), node.span);
            }
            None => return Err(SemanticError::UnknownType(type_name.to_string()).at(node.span)),
            Some(Type::Void) => {
                return Err(SemanticError::InvalidType(type_name.to_string()).at(node.span))
            }
            Some(Type::Dynamic) => match &init {
                Some(value) => value.ty.clone(),
                None => return Err(SemanticError::CannotInfer(name.to_string()).at(node.span)),
            },
            Some(ty) => ty,
        };

        if let Some(value) = &init {
            if value.ty != ty {
                return Err(SemanticError::TypeMismatch {
                    expected: ty,
                    found: value.ty.clone(),
                }
                .at(node.span));
            }
            if !ty.is_scalar() {
                return Err(SemanticError::NotAScalar {
                    name: name.to_string(),
                    what: "not a scalar value",
                }
                .at(node.span));
            }
        }

        let slot = self.declare_scalar(name, ty);
        if let Some(value) = init {
            self.store(&value, &slot);
        }
        Ok(())
    }

    /// Global scalars share the `@` namespace with functions and the prologue
    fn clashes_with_global_symbol(&self, name: &str) -> bool {
        self.scopes.is_global() && (is_reserved_symbol(name) || self.functions.contains_key(name))
    }

    /// Allocates a slot in the active context and registers it
    fn declare_scalar(&mut self, name: &str, ty: Type) -> Value {
        let slot = if self.scopes.is_global() {
            self.module
                .emit_global(format!("@{} = global {} {}", name, ty, ty.default_value()));
            Value::global(name, ty)
        } else {
            self.module.emit(format!("%{} = alloca {}", name, ty));
            Value::local(name, ty)
        };
        self.scopes.declare(name, Variable::Scalar { slot: slot.clone() });
        slot
    }

    pub(crate) fn store(&mut self, value: &Value, slot: &Value) {
        self.module.emit(format!(
            "store {} {}, {}* {}",
            value.ty, value, value.ty, slot
        ));
    }

    /// `name = expr`, into the variable's own slot
    pub(crate) fn exit_assignment(&mut self, node: &Node) -> Result<()> {
        let name = self.ident(node, 0)?;
        let value = self.pop_value(node.span)?;
        let variable = self.lookup(name, node.span)?;

        let Variable::Scalar { slot } = variable else {
            return Err(SemanticError::NotAScalar {
                name: name.to_string(),
                what: "not assignable",
            }
            .at(node.span));
        };
        if slot.ty != value.ty {
            return Err(SemanticError::TypeMismatch {
                expected: slot.ty,
                found: value.ty,
            }
            .at(node.span));
        }

        self.store(&value, &slot);
        Ok(())
    }

    /// `print(ident)` or `print(expr)`
    pub(crate) fn exit_print(&mut self, node: &Node) -> Result<()> {
        let value = match node.child(0) {
            Some(Element::Token(token)) if token.kind == TokenKind::Ident => {
                match self.load_for_io(&token.text, node.span)? {
                    Some((_, value)) => value,
                    None => return Ok(()),
                }
            }
            Some(Element::Node(_)) => self.pop_value(node.span)?,
            _ => {
                return Err(SemanticError::malformed(node.kind, "nothing to print").at(node.span))
            }
        };
        self.printf(value, node.span)
    }

    fn printf(&mut self, value: Value, span: Span) -> Result<()> {
        let (format, arg) = match value.ty {
            Type::Bool => {
                let text = self.register(Type::Str);
                self.module.emit(format!(
                    "{} = select i1 {}, i8* {}, i8* {}",
                    text,
                    value,
                    constant_ptr("true_text", 5),
                    constant_ptr("false_text", 6)
                ));
                ("strps", text)
            }
            ref ty => match ty.print_format() {
                Some(format) => (format, value.clone()),
                None => {
                    return Err(SemanticError::NotAScalar {
                        name: ty.name().to_string(),
                        what: "not printable",
                    }
                    .at(span))
                }
            },
        };

        let result = self.register(Type::Int);
        self.module.emit(format!(
            "{} = call i32 (i8*, ...) @printf(i8* {}, {} {})",
            result,
            constant_ptr(format, 4),
            arg.ty,
            arg
        ));
        Ok(())
    }

    /// `read(ident)`: scans into the variable's slot
    pub(crate) fn exit_read(&mut self, node: &Node) -> Result<()> {
        let name = self.ident(node, 0)?;
        let Some(variable) = self.scopes.lookup(name).cloned() else {
            return self.soft(SemanticError::UnknownVariable(name.to_string()), node.span);
        };

        let slot = match variable {
            Variable::Scalar { slot } => slot,
            other => {
                return Err(SemanticError::NotAScalar {
                    name: name.to_string(),
                    what: other.describe(),
                }
                .at(node.span))
            }
        };

        let (format, format_len, target) = match slot.ty {
            Type::Int => ("strsi", 3, format!("i32* {}", slot)),
            Type::Double => ("strsd", 4, format!("double* {}", slot)),
            Type::Str => {
                let capacity = self.options.read_buffer_len + 1;
                let id = self.names.next_string();
                self.module.emit(format!("%str.{} = alloca [{} x i8]", id, capacity));
                let buffer = self.register(Type::Str);
                self.module.emit(format!(
                    "{} = getelementptr inbounds [{cap} x i8], [{cap} x i8]* %str.{id}, i64 0, i64 0",
                    buffer,
                    cap = capacity,
                    id = id
                ));
                self.store(&buffer, &slot);
                let format_len = self.options.read_format().len() + 1;
                ("strs", format_len, format!("i8* {}", buffer))
            }
            ref ty => {
                return Err(SemanticError::NotAScalar {
                    name: name.to_string(),
                    what: if *ty == Type::Bool {
                        "a bool, which cannot be read"
                    } else {
                        "not readable"
                    },
                }
                .at(node.span))
            }
        };

        let result = self.register(Type::Int);
        self.module.emit(format!(
            "{} = call i32 (i8*, ...) @scanf(i8* {}, {})",
            result,
            constant_ptr(format, format_len),
            target
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::options::CodegenOptions;
    use crate::Emitter;
    use pretty_assertions::assert_eq;
    use rill_error::ErrorCode;
    use rill_tree::{build, walk, Node};

    fn run(statements: Vec<Node>) -> Emitter {
        let mut emitter = Emitter::new(CodegenOptions::default());
        walk(&build::program(statements), &mut emitter).unwrap();
        emitter
    }

    fn fail(statements: Vec<Node>) -> ErrorCode {
        let mut emitter = Emitter::new(CodegenOptions::default());
        let err = walk(&build::program(statements), &mut emitter).unwrap_err();
        err.code.unwrap()
    }

    #[test]
    fn test_global_declaration_and_store() {
        let emitter = run(vec![build::var_decl("int", "x", Some(build::int(2)))]);
        assert_eq!(emitter.module.header(), "@x = global i32 0\n");
        assert_eq!(emitter.module.main(), "  store i32 2, i32* @x\n");
    }

    #[test]
    fn test_var_infers_from_initializer() {
        let emitter = run(vec![build::var_decl("var", "d", Some(build::float("2.0")))]);
        assert_eq!(emitter.module.header(), "@d = global double 0.0\n");
    }

    #[test]
    fn test_var_without_initializer_is_fatal() {
        assert_eq!(fail(vec![build::var_decl("var", "d", None)]), ErrorCode::CANNOT_INFER);
    }

    #[test]
    fn test_declaration_type_mismatch() {
        let code = fail(vec![build::var_decl("bool", "b", Some(build::int(1)))]);
        assert_eq!(code, ErrorCode::TYPE_MISMATCH);
    }

    #[test]
    fn test_unknown_type_without_initializer_is_skipped() {
        let emitter = run(vec![build::var_decl("float", "f", None)]);
        assert_eq!(emitter.warnings().len(), 1);
        assert!(emitter.module.header().is_empty());
    }

    #[test]
    fn test_unknown_type_with_initializer_is_fatal() {
        let code = fail(vec![build::var_decl("float", "f", Some(build::int(1)))]);
        assert_eq!(code, ErrorCode::UNKNOWN_TYPE);
    }

    #[test]
    fn test_duplicate_declaration_warns_and_drops_initializer() {
        let emitter = run(vec![
            build::var_decl("int", "x", None),
            build::var_decl("int", "x", Some(build::int(5))),
        ]);
        assert_eq!(emitter.warnings().len(), 1);
        assert!(emitter.stack.is_empty());
        assert!(!emitter.module.main().contains("store i32 5"));
    }

    #[test]
    fn test_global_cannot_shadow_module_symbols() {
        let emitter = run(vec![
            build::var_decl("int", "main", Some(build::int(1))),
            build::var_decl("int", "strpi", None),
            build::function("void", "f", &[], vec![]),
            build::var_decl("int", "f", None),
        ]);
        let codes: Vec<_> = emitter.warnings().iter().map(|w| w.code).collect();
        assert_eq!(codes, vec![Some(ErrorCode::DUPLICATE_VARIABLE); 3]);
        assert_eq!(emitter.module.header(), "");
        assert_eq!(emitter.module.main(), "");
    }

    #[test]
    fn test_assignment_type_mismatch() {
        let code = fail(vec![
            build::var_decl("int", "x", None),
            build::assign("x", build::string("no")),
        ]);
        assert_eq!(code, ErrorCode::TYPE_MISMATCH);
    }

    #[test]
    fn test_print_bool_selects_text() {
        let emitter = run(vec![
            build::var_decl("bool", "b", Some(build::boolean(true))),
            build::print(build::not(build::ident("b"))),
        ]);
        let main = emitter.module.main();
        assert!(main.contains("%.2 = xor i1 %.1, true"));
        assert!(main.contains("%.3 = select i1 %.2, i8* getelementptr inbounds ([5 x i8], [5 x i8]* @true_text, i32 0, i32 0), i8* getelementptr inbounds ([6 x i8], [6 x i8]* @false_text, i32 0, i32 0)"));
        assert!(main.contains("@printf(i8* getelementptr inbounds ([4 x i8], [4 x i8]* @strps, i32 0, i32 0), i8* %.3)"));
    }

    #[test]
    fn test_print_unknown_variable_is_soft() {
        let emitter = run(vec![build::print_var("ghost")]);
        assert_eq!(emitter.warnings().len(), 1);
        assert!(emitter.module.main().is_empty());
    }

    #[test]
    fn test_read_int_scans_into_slot() {
        let emitter = run(vec![build::var_decl("int", "n", None), build::read("n")]);
        assert_eq!(
            emitter.module.main(),
            "  %.1 = call i32 (i8*, ...) @scanf(i8* getelementptr inbounds ([3 x i8], [3 x i8]* @strsi, i32 0, i32 0), i32* @n)\n"
        );
    }

    #[test]
    fn test_read_string_uses_buffer() {
        let emitter = run(vec![build::var_decl("string", "s", None), build::read("s")]);
        let main = emitter.module.main();
        assert!(main.contains("%str.1 = alloca [101 x i8]"));
        assert!(main.contains("store i8* %.1, i8** @s"));
        assert!(main.contains("[6 x i8]* @strs,"));
    }

    #[test]
    fn test_read_bool_is_fatal() {
        let code = fail(vec![build::var_decl("bool", "b", None), build::read("b")]);
        assert_eq!(code, ErrorCode::NOT_A_SCALAR);
    }
}
