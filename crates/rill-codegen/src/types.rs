//! Rill type descriptors
//!
//! Each concrete type knows its IR token, the print format constant it uses,
//! the comparison instruction family and the initializer of a global slot.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// 32-bit signed integer (`i32`)
    Int,
    /// `double`
    Double,
    /// `i1`
    Bool,
    /// Pointer to a NUL-terminated byte string (`i8*`)
    Str,
    Void,
    /// Instance of a user class, laid out as `%Name`
    Complex(String),
    /// `var`: takes the type of its initializer at the declaration site
    Dynamic,
}

impl Type {
    /// Resolves a built-in type name. Class names are resolved by the caller.
    pub fn from_name(name: &str) -> Option<Type> {
        match name {
            "int" => Some(Type::Int),
            "double" => Some(Type::Double),
            "bool" => Some(Type::Bool),
            "string" => Some(Type::Str),
            "void" => Some(Type::Void),
            "var" => Some(Type::Dynamic),
            _ => None,
        }
    }

    /// Name as written in source, for diagnostics
    pub fn name(&self) -> &str {
        match self {
            Type::Int => "int",
            Type::Double => "double",
            Type::Bool => "bool",
            Type::Str => "string",
            Type::Void => "void",
            Type::Complex(class) => class,
            Type::Dynamic => "var",
        }
    }

    /// Print format constant (`@strpi`, ...). Bool prints through text selection.
    pub fn print_format(&self) -> Option<&'static str> {
        match self {
            Type::Int => Some("strpi"),
            Type::Double => Some("strpd"),
            Type::Str => Some("strps"),
            _ => None,
        }
    }

    /// Comparison instruction family
    pub fn comparator(&self) -> &'static str {
        match self {
            Type::Double => "fcmp",
            _ => "icmp",
        }
    }

    /// Initializer of a global slot of this type
    pub fn default_value(&self) -> &'static str {
        match self {
            Type::Int => "0",
            Type::Double => "0.0",
            Type::Bool => "false",
            Type::Str => "null",
            _ => "zeroinitializer",
        }
    }

    /// Type as passed to a function: class instances travel by pointer
    pub fn param_ir(&self) -> String {
        match self {
            Type::Complex(class) => format!("%{}*", class),
            other => other.to_string(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Double)
    }

    /// Types that fit a single slot and can be printed, compared and stored
    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Int | Type::Double | Type::Bool | Type::Str)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "i32"),
            Type::Double => write!(f, "double"),
            Type::Bool => write!(f, "i1"),
            Type::Str => write!(f, "i8*"),
            Type::Void => write!(f, "void"),
            Type::Complex(class) => write!(f, "%{}", class),
            // Resolved before anything is emitted
            Type::Dynamic => write!(f, "void"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ir_tokens() {
        assert_eq!(Type::Int.to_string(), "i32");
        assert_eq!(Type::Bool.to_string(), "i1");
        assert_eq!(Type::Str.to_string(), "i8*");
        assert_eq!(Type::Complex("Point".into()).to_string(), "%Point");
        assert_eq!(Type::Complex("Point".into()).param_ir(), "%Point*");
        assert_eq!(Type::Double.param_ir(), "double");
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Type::from_name("var"), Some(Type::Dynamic));
        assert_eq!(Type::from_name("string"), Some(Type::Str));
        assert_eq!(Type::from_name("Point"), None);
    }

    #[test]
    fn test_descriptors() {
        assert_eq!(Type::Int.print_format(), Some("strpi"));
        assert_eq!(Type::Bool.print_format(), None);
        assert_eq!(Type::Double.comparator(), "fcmp");
        assert_eq!(Type::Bool.comparator(), "icmp");
        assert_eq!(Type::Str.default_value(), "null");
        assert!(Type::Bool.is_scalar());
        assert!(!Type::Void.is_scalar());
        assert!(!Type::Bool.is_numeric());
    }
}
