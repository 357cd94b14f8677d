//! If / else / loop lowering
//!
//! Each construct takes a fresh index from the name supply and keeps it on
//! its own stack until the construct closes, so nested and sibling blocks
//! never share a label.

use crate::emitter::Emitter;
use crate::error::SemanticError;
use crate::scope::{Context, Variable};
use crate::types::Type;
use crate::value::Value;
use rill_error::Result;
use rill_tree::{Node, NodeKind, TokenKind};

/// An open `if` and the condition `else` re-reads
#[derive(Debug, Clone)]
pub struct IfFrame {
    pub index: u32,
    pub name: String,
    pub condition: Variable,
}

impl Emitter {
    /// Condition variable of an if statement, checked to be `bool`
    fn condition(&self, node: &Node) -> Result<(String, Variable)> {
        let name = self.ident(node, 0)?;
        let variable = self.lookup(name, node.span)?;
        let scalar = matches!(variable, Variable::Scalar { .. } | Variable::Param { .. });
        if !scalar || variable.ty() != Type::Bool {
            return Err(SemanticError::InvalidCondition {
                name: name.to_string(),
                expected: Type::Bool,
                found: variable.ty(),
            }
            .at(node.span));
        }
        Ok((name.to_string(), variable))
    }

    pub(crate) fn enter_if(&mut self, node: &Node) -> Result<()> {
        let (name, condition) = self.condition(node)?;
        let index = self.names.next_if();

        self.module.emit(format!("br label %if_start_{}", index));
        self.module.emit_label(&format!("if_start_{}", index));
        let value = self.load(&name, &condition, node.span)?;
        self.module.emit(format!(
            "br i1 {}, label %if_true_{i}, label %if_end_{i}",
            value,
            i = index
        ));
        self.module.emit_label(&format!("if_true_{}", index));

        self.ifs.push(IfFrame {
            index,
            name,
            condition,
        });
        self.scopes.set_context(Context::Local);
        Ok(())
    }

    pub(crate) fn exit_if_block(&mut self, node: &Node) -> Result<()> {
        let index = self
            .ifs
            .last()
            .map(|frame| frame.index)
            .ok_or_else(|| SemanticError::EngineInvariant("if block without an open if".into()).at(node.span))?;
        self.module.emit(format!("br label %if_end_{}", index));
        self.module.emit_label(&format!("if_end_{}", index));
        Ok(())
    }

    /// Runs when the condition is false: branches away when it holds
    pub(crate) fn enter_else(&mut self, node: &Node) -> Result<()> {
        let frame = self
            .ifs
            .pop()
            .ok_or_else(|| SemanticError::EngineInvariant("else without an open if".into()).at(node.span))?;
        let index = self.names.next_else();

        self.module.emit(format!("br label %else_start_{}", index));
        self.module.emit_label(&format!("else_start_{}", index));
        let value = self.load(&frame.name, &frame.condition, node.span)?;
        self.module.emit(format!(
            "br i1 {}, label %else_end_{i}, label %else_true_{i}",
            value,
            i = index
        ));
        self.module.emit_label(&format!("else_true_{}", index));

        self.elses.push(index);
        self.scopes.set_context(Context::Local);
        Ok(())
    }

    pub(crate) fn exit_else(&mut self, node: &Node) -> Result<()> {
        let index = self
            .elses
            .pop()
            .ok_or_else(|| SemanticError::EngineInvariant("else stack is empty".into()).at(node.span))?;
        self.module.emit(format!("br label %else_end_{}", index));
        self.module.emit_label(&format!("else_end_{}", index));
        self.restore_context();
        Ok(())
    }

    pub(crate) fn exit_if(&mut self, node: &Node) -> Result<()> {
        if !node.has_child_kind(NodeKind::ElseStatement) {
            self.ifs.pop().ok_or_else(|| {
                SemanticError::EngineInvariant("if stack is empty".into()).at(node.span)
            })?;
        }
        self.restore_context();
        Ok(())
    }

    /// Counting loop: `body` runs while the counter is below the bound
    pub(crate) fn enter_loop(&mut self, node: &Node) -> Result<()> {
        let bound = match node.token(0) {
            Some(token) if token.kind == TokenKind::Int => {
                let count: i32 = token.text.parse().map_err(|_| {
                    SemanticError::malformed(node.kind, format!("`{}` is not an int literal", token.text))
                        .at(token.span)
                })?;
                Value::constant(count.to_string(), Type::Int)
            }
            Some(token) if token.kind == TokenKind::Ident => {
                let variable = self.lookup(&token.text, token.span)?;
                if variable.ty() != Type::Int {
                    return Err(SemanticError::InvalidCondition {
                        name: token.text.clone(),
                        expected: Type::Int,
                        found: variable.ty(),
                    }
                    .at(token.span));
                }
                self.load(&token.text, &variable, token.span)?
            }
            _ => return Err(SemanticError::malformed(node.kind, "missing loop bound").at(node.span)),
        };

        let i = self.names.next_loop();
        self.module.emit(format!("%counter.{} = alloca i32", i));
        self.module.emit(format!("store i32 0, i32* %counter.{}", i));
        self.module.emit(format!("br label %loop_{}", i));
        self.module.emit_label(&format!("loop_{}", i));
        self.module
            .emit(format!("%counter.val.{i} = load i32, i32* %counter.{i}", i = i));
        self.module.emit(format!(
            "%cmp.{i} = icmp slt i32 %counter.val.{i}, {}",
            bound,
            i = i
        ));
        self.module.emit(format!(
            "br i1 %cmp.{i}, label %body_{i}, label %end_{i}",
            i = i
        ));
        self.module.emit_label(&format!("body_{}", i));

        self.loops.push(i);
        self.scopes.set_context(Context::Local);
        Ok(())
    }

    pub(crate) fn exit_loop(&mut self, node: &Node) -> Result<()> {
        let i = self
            .loops
            .pop()
            .ok_or_else(|| SemanticError::EngineInvariant("loop stack is empty".into()).at(node.span))?;
        self.module
            .emit(format!("%counter.next.{i} = load i32, i32* %counter.{i}", i = i));
        self.module
            .emit(format!("%inc.{i} = add i32 %counter.next.{i}, 1", i = i));
        self.module.emit(format!("store i32 %inc.{i}, i32* %counter.{i}", i = i));
        self.module.emit(format!("br label %loop_{}", i));
        self.module.emit_label(&format!("end_{}", i));
        self.restore_context();
        Ok(())
    }
}
