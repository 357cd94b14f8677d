//! Expression evaluation
//!
//! Leaves push operands; every chain node pops `(children + 1) / 2` of them
//! on exit, reduces them left to right and pushes the result. Operand types
//! must match exactly at every step.

use crate::emitter::Emitter;
use crate::error::SemanticError;
use crate::module::byte_string;
use crate::scope::Variable;
use crate::types::Type;
use crate::value::{double_literal, Value};
use rill_error::{Result, Span};
use rill_tree::{Element, Node, NodeKind, TokenKind};

/// Compile-time result of a boolean chain that contains its absorbing literal.
/// While active, every event inside the chain is skipped.
#[derive(Debug, Clone, Copy)]
pub struct Fold {
    pub result: bool,
    /// Nesting below the folded node
    pub depth: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn from_token(text: &str) -> Option<Self> {
        match text {
            "+" => Some(BinaryOp::Add),
            "-" => Some(BinaryOp::Sub),
            "*" => Some(BinaryOp::Mul),
            "/" => Some(BinaryOp::Div),
            "==" => Some(BinaryOp::Eq),
            "!=" => Some(BinaryOp::Ne),
            "&&" => Some(BinaryOp::And),
            "||" => Some(BinaryOp::Or),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Chain level the operator belongs to
    fn level(&self) -> NodeKind {
        match self {
            BinaryOp::Add | BinaryOp::Sub => NodeKind::Additive,
            BinaryOp::Mul | BinaryOp::Div => NodeKind::Multiplicative,
            BinaryOp::Eq | BinaryOp::Ne => NodeKind::Equality,
            BinaryOp::And => NodeKind::Conjunction,
            BinaryOp::Or => NodeKind::Disjunction,
        }
    }
}

/// Truth value of an operand that is, through single-child wrappers, a
/// boolean literal under zero or more `!`
fn literal_truth(operand: &Node) -> Option<bool> {
    let mut current = operand;
    loop {
        if current.kind == NodeKind::Unary {
            let (last, prefix) = current.children.split_last()?;
            if !prefix
                .iter()
                .all(|e| matches!(e, Element::Token(t) if t.kind == TokenKind::Not))
            {
                return None;
            }
            match last {
                Element::Token(token) if token.kind == TokenKind::Bool => {
                    let negated = prefix.len() % 2 == 1;
                    return Some((token.text == "true") != negated);
                }
                Element::Node(inner) if prefix.is_empty() => {
                    current = inner;
                    continue;
                }
                _ => return None,
            }
        }

        if current.child_count() != 1 {
            return None;
        }
        current = current.node(0)?;
    }
}

impl Emitter {
    /// Starts a fold when an operand is the chain's absorbing literal
    pub(crate) fn enter_boolean_chain(&mut self, node: &Node) -> Result<()> {
        let operands: Vec<&Node> = node.nodes().collect();
        if operands.len() < 2 {
            return Ok(());
        }

        let absorbing = node.kind == NodeKind::Disjunction;
        if operands.iter().any(|op| literal_truth(op) == Some(absorbing)) {
            tracing::debug!(
                "line {}: `{}` chain folded to `{}`",
                node.line(),
                node.kind,
                absorbing
            );
            self.fold = Some(Fold {
                result: absorbing,
                depth: 0,
            });
        }
        Ok(())
    }

    pub(crate) fn exit_chain(&mut self, node: &Node) -> Result<()> {
        let count = (node.child_count() + 1) / 2;
        if count == 0 {
            return Err(SemanticError::malformed(node.kind, "no operands").at(node.span));
        }

        let mut operands = Vec::with_capacity(count);
        for _ in 0..count {
            operands.push(self.pop_value(node.span)?);
        }
        operands.reverse();

        let mut ops = Vec::with_capacity(count - 1);
        for i in 1..count {
            let op = node
                .token(2 * i - 1)
                .and_then(|t| BinaryOp::from_token(&t.text))
                .filter(|op| op.level() == node.kind)
                .ok_or_else(|| {
                    SemanticError::malformed(node.kind, format!("bad operator at position {}", 2 * i - 1))
                        .at(node.span)
                })?;
            ops.push(op);
        }

        let result = if node.kind.is_boolean_chain() {
            self.reduce_boolean(node, operands)?
        } else {
            let mut operands = operands.into_iter();
            let mut running = operands
                .next()
                .ok_or_else(|| SemanticError::VoidValue.at(node.span))?;
            for (op, next) in ops.into_iter().zip(operands) {
                check_same_type(&running, &next, node.span)?;
                running = self.binary(op, running, next, node.span)?;
            }
            running
        };

        self.stack.push(result);
        Ok(())
    }

    /// `&&` / `||` chains: identity literals drop out, an absorbing literal
    /// decides the result, what is left lowers to branch + phi pairs
    fn reduce_boolean(&mut self, node: &Node, operands: Vec<Value>) -> Result<Value> {
        let op = if node.kind == NodeKind::Disjunction {
            BinaryOp::Or
        } else {
            BinaryOp::And
        };

        if operands.len() == 1 {
            return operands
                .into_iter()
                .next()
                .ok_or_else(|| SemanticError::VoidValue.at(node.span));
        }

        if let Some(first) = operands.first() {
            for next in &operands[1..] {
                check_same_type(first, next, node.span)?;
            }
            if first.ty != Type::Bool {
                return Err(SemanticError::UnsupportedOperator {
                    op: op.as_str().to_string(),
                    ty: first.ty.clone(),
                }
                .at(node.span));
            }
        }

        let absorbing = op == BinaryOp::Or;
        if operands.iter().any(|v| v.as_bool() == Some(absorbing)) {
            return Ok(Value::bool(absorbing));
        }

        let mut remaining = operands
            .into_iter()
            .filter(|v| v.as_bool() != Some(!absorbing));
        let Some(mut running) = remaining.next() else {
            return Ok(Value::bool(!absorbing));
        };
        for next in remaining {
            running = self.short_circuit(op, running, next);
        }
        Ok(running)
    }

    fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value, span: Span) -> Result<Value> {
        let unsupported = |ty: &Type| {
            SemanticError::UnsupportedOperator {
                op: op.as_str().to_string(),
                ty: ty.clone(),
            }
            .at(span)
        };
        let ty = lhs.ty.clone();
        let float = ty == Type::Double;

        let (instruction, result_ty) = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                if !ty.is_numeric() {
                    return Err(unsupported(&ty));
                }
                let opcode = match (op, float) {
                    (BinaryOp::Add, false) => "add",
                    (BinaryOp::Add, true) => "fadd",
                    (BinaryOp::Sub, false) => "sub",
                    (BinaryOp::Sub, true) => "fsub",
                    (BinaryOp::Mul, false) => "mul",
                    (BinaryOp::Mul, true) => "fmul",
                    (_, false) => "sdiv",
                    (_, true) => "fdiv",
                };
                (format!("{} {} {}, {}", opcode, ty, lhs, rhs), ty.clone())
            }
            BinaryOp::Eq => {
                if !ty.is_scalar() {
                    return Err(unsupported(&ty));
                }
                let predicate = if float { "oeq" } else { "eq" };
                let text = format!("{} {} {} {}, {}", ty.comparator(), predicate, ty, lhs, rhs);
                (text, Type::Bool)
            }
            BinaryOp::Ne => {
                if !ty.is_scalar() {
                    return Err(unsupported(&ty));
                }
                let text = match ty {
                    Type::Bool => format!("xor i1 {}, {}", lhs, rhs),
                    Type::Double => format!("fcmp one double {}, {}", lhs, rhs),
                    _ => format!("icmp ne {} {}, {}", ty, lhs, rhs),
                };
                (text, Type::Bool)
            }
            BinaryOp::And | BinaryOp::Or => {
                if ty != Type::Bool {
                    return Err(unsupported(&ty));
                }
                return Ok(self.short_circuit(op, lhs, rhs));
            }
        };

        let result = self.register(result_ty);
        self.module.emit(format!("{} = {}", result, instruction));
        Ok(result)
    }

    /// Branch on the left operand and merge both paths with a phi
    fn short_circuit(&mut self, op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        let id = self.names.next_register_id();
        let result = Value::local(format!(".{}", id), Type::Bool);
        let prefix = if op == BinaryOp::Or { "or" } else { "and" };
        let label_true = format!("{}_true_{}", prefix, id);
        let label_not_true = format!("{}_not_true_{}", prefix, id);
        let label_end = format!("{}_end_{}", prefix, id);

        self.module.emit(format!(
            "br i1 {}, label %{}, label %{}",
            lhs, label_true, label_not_true
        ));

        self.module.emit_label(&label_true);
        if op == BinaryOp::Or {
            self.module.emit(format!("%true.{} = or i1 true, true", id));
        } else {
            self.module.emit(format!("%true.{} = and i1 {}, {}", id, lhs, rhs));
        }
        self.module.emit(format!("br label %{}", label_end));

        self.module.emit_label(&label_not_true);
        if op == BinaryOp::Or {
            self.module.emit(format!("%false.{} = or i1 {}, {}", id, lhs, rhs));
        } else {
            self.module.emit(format!("%false.{} = and i1 false, false", id));
        }
        self.module.emit(format!("br label %{}", label_end));

        self.module.emit_label(&label_end);
        self.module.emit(format!(
            "{} = phi i1 [ %true.{}, %{} ], [ %false.{}, %{} ]",
            result, id, label_true, id, label_not_true
        ));
        result
    }

    /// `!`* followed by a literal, an identifier or a nested expression
    pub(crate) fn exit_unary(&mut self, node: &Node) -> Result<()> {
        let Some((last, prefix)) = node.children.split_last() else {
            return Err(SemanticError::malformed(node.kind, "empty").at(node.span));
        };
        let negations = prefix
            .iter()
            .filter(|e| matches!(e, Element::Token(t) if t.kind == TokenKind::Not))
            .count();
        if negations != prefix.len() {
            return Err(SemanticError::malformed(node.kind, "only `!` may precede the operand").at(node.span));
        }
        let negate = negations % 2 == 1;
        let not_applicable = |ty: &Type| {
            SemanticError::UnsupportedOperator {
                op: "!".to_string(),
                ty: ty.clone(),
            }
            .at(node.span)
        };

        let value = match last {
            Element::Token(token) => match token.kind {
                TokenKind::Bool => {
                    let literal = match token.text.as_str() {
                        "true" => true,
                        "false" => false,
                        other => {
                            return Err(SemanticError::malformed(
                                node.kind,
                                format!("`{}` is not a boolean literal", other),
                            )
                            .at(token.span))
                        }
                    };
                    self.stack.push(Value::bool(literal != negate));
                    return Ok(());
                }
                TokenKind::Int => {
                    if negations > 0 {
                        return Err(not_applicable(&Type::Int));
                    }
                    let parsed: i32 = token.text.parse().map_err(|_| {
                        SemanticError::malformed(node.kind, format!("`{}` is not an int literal", token.text))
                            .at(token.span)
                    })?;
                    Value::constant(parsed.to_string(), Type::Int)
                }
                TokenKind::Float => {
                    if negations > 0 {
                        return Err(not_applicable(&Type::Double));
                    }
                    let parsed: f64 = token.text.parse().map_err(|_| {
                        SemanticError::malformed(node.kind, format!("`{}` is not a double literal", token.text))
                            .at(token.span)
                    })?;
                    Value::constant(double_literal(parsed), Type::Double)
                }
                TokenKind::Str => {
                    if negations > 0 {
                        return Err(not_applicable(&Type::Str));
                    }
                    self.string_constant(&token.text)
                }
                TokenKind::Ident => {
                    let variable = self.lookup(&token.text, token.span)?;
                    if negate && variable.ty() != Type::Bool {
                        return Err(not_applicable(&variable.ty()));
                    }
                    self.load(&token.text, &variable, token.span)?
                }
                TokenKind::TypeName | TokenKind::Operator | TokenKind::Not => {
                    return Err(SemanticError::malformed(node.kind, "missing operand").at(node.span))
                }
            },
            Element::Node(_) => self.pop_value(node.span)?,
        };

        let value = if negations == 0 {
            value
        } else if value.ty != Type::Bool {
            return Err(not_applicable(&value.ty));
        } else if let Some(literal) = value.as_bool() {
            Value::bool(literal != negate)
        } else if negate {
            let result = self.register(Type::Bool);
            self.module.emit(format!("{} = xor i1 {}, true", result, value));
            result
        } else {
            value
        };

        self.stack.push(value);
        Ok(())
    }

    /// Private global copy of the text, copied into a stack buffer
    pub(crate) fn string_constant(&mut self, text: &str) -> Value {
        let id = self.names.next_string();
        let (bytes, len) = byte_string(text);
        self.module.emit_global(format!(
            "@str.{} = private constant [{} x i8] {}",
            id, len, bytes
        ));

        let result = self.register(Type::Str);
        self.module.emit(format!("%str.{} = alloca [{} x i8]", id, len));
        self.module.emit(format!(
            "{} = bitcast [{} x i8]* %str.{} to i8*",
            result, len, id
        ));
        self.module.emit(format!(
            "call void @llvm.memcpy.p0i8.p0i8.i64(i8* align 1 {}, i8* align 1 getelementptr inbounds ([{len} x i8], [{len} x i8]* @str.{id}, i32 0, i32 0), i64 {len}, i1 false)",
            result,
            len = len,
            id = id
        ));
        result
    }

    /// Reads a variable for `print`, skipping unknown names
    pub(crate) fn load_for_io(&mut self, name: &str, span: Span) -> Result<Option<(Variable, Value)>> {
        let Some(variable) = self.scopes.lookup(name).cloned() else {
            self.soft(SemanticError::UnknownVariable(name.to_string()), span)?;
            return Ok(None);
        };
        let value = self.load(name, &variable, span)?;
        Ok(Some((variable, value)))
    }
}

fn check_same_type(running: &Value, next: &Value, span: Span) -> Result<()> {
    if running.ty != next.ty {
        return Err(SemanticError::TypeMismatch {
            expected: running.ty.clone(),
            found: next.ty.clone(),
        }
        .at(span));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CodegenOptions;
    use rill_tree::{build, walk};

    fn main_text(statements: Vec<Node>) -> String {
        let mut emitter = Emitter::new(CodegenOptions::default());
        walk(&build::program(statements), &mut emitter).unwrap();
        emitter.module.main().to_string()
    }

    #[test]
    fn test_literal_truth_follows_wrappers_and_negations() {
        assert_eq!(literal_truth(&build::boolean(true)), Some(true));
        assert_eq!(literal_truth(&build::not(build::boolean(true))), Some(false));
        let wrapped = build::group(NodeKind::Equality, build::group(NodeKind::Additive, build::boolean(false)));
        assert_eq!(literal_truth(&wrapped), Some(false));
        assert_eq!(literal_truth(&build::ident("a")), None);
        assert_eq!(literal_truth(&build::and(build::boolean(true), build::boolean(true))), None);
    }

    #[test]
    fn test_int_chain_reduces_left_to_right() {
        let expr = build::chain(
            NodeKind::Additive,
            build::int(1),
            vec![("+", build::int(2)), ("-", build::int(3))],
        );
        let text = main_text(vec![build::print(expr)]);
        assert!(text.contains("%.1 = add i32 1, 2\n"));
        assert!(text.contains("%.2 = sub i32 %.1, 3\n"));
    }

    #[test]
    fn test_double_ops_use_float_opcodes() {
        let text = main_text(vec![build::print(build::div(build::float("1.5"), build::float("2")))]);
        assert!(text.contains("fdiv double 0x3FF8000000000000, 2.0"));
    }

    #[test]
    fn test_equality_yields_bool() {
        let text = main_text(vec![build::var_decl(
            "bool",
            "same",
            Some(build::eq(build::float("1.0"), build::float("1.0"))),
        )]);
        assert!(text.contains("%.1 = fcmp oeq double 1.0, 1.0"));
        assert!(text.contains("store i1 %.1, i1* @same"));
    }

    #[test]
    fn test_not_on_literal_folds() {
        let mut emitter = Emitter::new(CodegenOptions::default());
        walk(&build::not(build::not(build::not(build::boolean(true)))), &mut emitter).unwrap();
        assert_eq!(emitter.stack, vec![Value::bool(false)]);
        assert!(emitter.module.main().is_empty());
    }

    #[test]
    fn test_and_lowers_to_branch_and_phi() {
        let text = main_text(vec![
            build::var_decl("bool", "a", Some(build::boolean(true))),
            build::var_decl("bool", "b", Some(build::boolean(false))),
            build::print(build::and(build::ident("a"), build::ident("b"))),
        ]);
        let expected = "\
  br i1 %.1, label %and_true_3, label %and_not_true_3
and_true_3:
  %true.3 = and i1 %.1, %.2
  br label %and_end_3
and_not_true_3:
  %false.3 = and i1 false, false
  br label %and_end_3
and_end_3:
  %.3 = phi i1 [ %true.3, %and_true_3 ], [ %false.3, %and_not_true_3 ]
";
        assert!(text.contains(expected), "{}", text);
    }

    #[test]
    fn test_string_literal_copies_constant() {
        let mut emitter = Emitter::new(CodegenOptions::default());
        walk(&build::program(vec![build::print(build::string("hi"))]), &mut emitter).unwrap();
        assert_eq!(
            emitter.module.header(),
            "@str.1 = private constant [3 x i8] c\"hi\\00\"\n"
        );
        assert!(emitter.module.main().contains("%str.1 = alloca [3 x i8]"));
        assert!(emitter.module.main().contains("%.1 = bitcast [3 x i8]* %str.1 to i8*"));
    }
}
