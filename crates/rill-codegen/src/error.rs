//! Semantic errors raised while emitting
//!
//! Each condition maps to an `ErrorCode`. Fatal ones become error
//! diagnostics and end the compilation; the soft ones are reported as
//! warnings and only skip the construct.

use crate::types::Type;
use rill_error::{Diagnostic, ErrorCode, Span};
use rill_tree::NodeKind;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SemanticError {
    #[error("type mismatch: expected `{}`, found `{}`", .expected.name(), .found.name())]
    TypeMismatch { expected: Type, found: Type },

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("`{0}` is not a valid type here")]
    InvalidType(String),

    #[error("cannot infer the type of `{0}` without an initializer")]
    CannotInfer(String),

    #[error("operator `{op}` is not supported for `{}`", .ty.name())]
    UnsupportedOperator { op: String, ty: Type },

    #[error("condition `{name}` must be `{}`, found `{}`", .expected.name(), .found.name())]
    InvalidCondition {
        name: String,
        expected: Type,
        found: Type,
    },

    #[error("expected a value, but the expression produces none")]
    VoidValue,

    #[error("`{name}` is {what}")]
    NotAScalar { name: String, what: &'static str },

    #[error("variable `{0}` not found")]
    UnknownVariable(String),

    #[error("function `{0}` not found")]
    UnknownFunction(String),

    #[error("class `{0}` not found")]
    UnknownClass(String),

    #[error("class `{class}` has no field `{field}`")]
    UnknownMember { class: String, field: String },

    #[error("class `{class}` has no method `{method}`")]
    UnknownMethod { class: String, method: String },

    #[error("variable `{0}` is already declared")]
    DuplicateVariable(String),

    #[error("function `{0}` is already declared")]
    DuplicateFunction(String),

    #[error("class `{0}` is already declared")]
    DuplicateClass(String),

    #[error("parameter `{name}` appears twice in `{function}`")]
    DuplicateParameter { function: String, name: String },

    #[error("field `{field}` appears twice in class `{class}`")]
    DuplicateField { class: String, field: String },

    #[error("malformed `{kind}` node: {detail}")]
    MalformedTree { kind: NodeKind, detail: String },

    #[error("{0}")]
    InvalidPlacement(String),

    #[error("`{function}` takes {expected} argument(s) but {found} were supplied")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("{0}")]
    InvalidAggregate(String),

    #[error("internal state left inconsistent: {0}")]
    EngineInvariant(String),
}

impl SemanticError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SemanticError::TypeMismatch { .. } => ErrorCode::TYPE_MISMATCH,
            SemanticError::UnknownType(_) | SemanticError::InvalidType(_) => {
                ErrorCode::UNKNOWN_TYPE
            }
            SemanticError::CannotInfer(_) => ErrorCode::CANNOT_INFER,
            SemanticError::UnsupportedOperator { .. } => ErrorCode::UNSUPPORTED_OPERATOR,
            SemanticError::InvalidCondition { .. } => ErrorCode::INVALID_CONDITION,
            SemanticError::VoidValue => ErrorCode::VOID_VALUE,
            SemanticError::NotAScalar { .. } => ErrorCode::NOT_A_SCALAR,
            SemanticError::UnknownVariable(_) => ErrorCode::UNKNOWN_VARIABLE,
            SemanticError::UnknownFunction(_) => ErrorCode::UNKNOWN_FUNCTION,
            SemanticError::UnknownClass(_) => ErrorCode::UNKNOWN_CLASS,
            SemanticError::UnknownMember { .. } => ErrorCode::UNKNOWN_MEMBER,
            SemanticError::UnknownMethod { .. } => ErrorCode::UNKNOWN_METHOD,
            SemanticError::DuplicateVariable(_) => ErrorCode::DUPLICATE_VARIABLE,
            SemanticError::DuplicateFunction(_) => ErrorCode::DUPLICATE_FUNCTION,
            SemanticError::DuplicateClass(_) => ErrorCode::DUPLICATE_CLASS,
            SemanticError::DuplicateParameter { .. } => ErrorCode::DUPLICATE_PARAMETER,
            SemanticError::DuplicateField { .. } => ErrorCode::DUPLICATE_FIELD,
            SemanticError::MalformedTree { .. } => ErrorCode::MALFORMED_TREE,
            SemanticError::InvalidPlacement(_) => ErrorCode::INVALID_PLACEMENT,
            SemanticError::ArityMismatch { .. } => ErrorCode::ARITY_MISMATCH,
            SemanticError::InvalidAggregate(_) => ErrorCode::INVALID_AGGREGATE,
            SemanticError::EngineInvariant(_) => ErrorCode::ENGINE_INVARIANT,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SemanticError::TypeMismatch { .. } | SemanticError::InvalidCondition { .. } => {
                "wrong type"
            }
            SemanticError::UnknownVariable(_)
            | SemanticError::UnknownFunction(_)
            | SemanticError::UnknownClass(_)
            | SemanticError::UnknownMember { .. }
            | SemanticError::UnknownMethod { .. }
            | SemanticError::UnknownType(_) => "not declared",
            SemanticError::DuplicateVariable(_)
            | SemanticError::DuplicateFunction(_)
            | SemanticError::DuplicateClass(_)
            | SemanticError::DuplicateParameter { .. }
            | SemanticError::DuplicateField { .. } => "declared again here",
            _ => "here",
        }
    }

    fn help(&self) -> Option<&'static str> {
        match self {
            SemanticError::TypeMismatch { .. } => Some("operands are never converted implicitly"),
            SemanticError::CannotInfer(_) => Some("give `var` an initializer or write the type"),
            SemanticError::UnknownClass(_) => {
                Some("a class can only be instantiated after its declaration closes")
            }
            _ => None,
        }
    }

    /// Fatal diagnostic at `span`
    pub fn at(self, span: Span) -> Diagnostic {
        let diagnostic = Diagnostic::error(self.to_string())
            .with_code(self.code())
            .with_label(span, self.label());
        match self.help() {
            Some(help) => diagnostic.with_help(help),
            None => diagnostic,
        }
    }

    /// Soft diagnostic at `span`
    pub fn warning_at(self, span: Span) -> Diagnostic {
        Diagnostic::warning(self.to_string())
            .with_code(self.code())
            .with_label(span, "skipped")
    }

    pub fn malformed(kind: NodeKind, detail: impl Into<String>) -> Self {
        SemanticError::MalformedTree {
            kind,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_messages_use_source_type_names() {
        let err = SemanticError::TypeMismatch {
            expected: Type::Int,
            found: Type::Str,
        };
        assert_eq!(err.to_string(), "type mismatch: expected `int`, found `string`");
        assert_eq!(err.code().to_string(), "ET001");
    }

    #[test]
    fn test_at_builds_labelled_diagnostic() {
        let diagnostic = SemanticError::UnknownClass("Point".into()).at(Span::line(3));
        assert!(diagnostic.is_error());
        assert_eq!(diagnostic.code, Some(ErrorCode::UNKNOWN_CLASS));
        assert_eq!(diagnostic.line(), Some(3));
        assert_eq!(diagnostic.suggestions.len(), 1);
    }

    #[test]
    fn test_warning_at() {
        let diagnostic = SemanticError::UnknownVariable("q".into()).warning_at(Span::line(5));
        assert!(!diagnostic.is_error());
        assert_eq!(diagnostic.message, "variable `q` not found");
        assert_eq!(diagnostic.line(), Some(5));
    }
}
