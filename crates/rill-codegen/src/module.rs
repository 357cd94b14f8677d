//! Module assembly
//!
//! Three text regions accumulate while the tree is walked: the header
//! (globals, string constants, class layouts), user function bodies, and
//! top-level code that ends up in `@main`. `LlvmModule` renders the final
//! text behind the fixed prologue.

use std::fmt;

/// Module-level symbols every module defines or declares
pub const RESERVED_SYMBOLS: [&str; 11] = [
    "main",
    "printf",
    "scanf",
    "strps",
    "strpi",
    "strpd",
    "strs",
    "strsi",
    "strsd",
    "true_text",
    "false_text",
];

pub fn is_reserved_symbol(name: &str) -> bool {
    RESERVED_SYMBOLS.contains(&name)
}

/// Byte string constant as it appears in IR (`c"..\00"`) and its length
pub fn byte_string(text: &str) -> (String, usize) {
    let mut out = String::new();
    for b in text.bytes() {
        match b {
            b'"' => out.push_str("\\22"),
            b'\\' => out.push_str("\\5C"),
            0x20..=0x7E => out.push(b as char),
            other => out.push_str(&format!("\\{:02X}", other)),
        }
    }
    out.push_str("\\00");
    (format!("c\"{}\"", out), text.len() + 1)
}

/// `i8*` to the first byte of a global byte-array constant
pub fn constant_ptr(name: &str, len: usize) -> String {
    format!(
        "getelementptr inbounds ([{len} x i8], [{len} x i8]* @{name}, i32 0, i32 0)",
        len = len,
        name = name
    )
}

/// Text regions under construction
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    header: String,
    functions: String,
    main: String,
    inside_function: bool,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes subsequent code to the function region (or back to `main`)
    pub fn set_inside_function(&mut self, inside: bool) {
        self.inside_function = inside;
    }

    fn region(&mut self) -> &mut String {
        if self.inside_function {
            &mut self.functions
        } else {
            &mut self.main
        }
    }

    /// Appends an instruction to the current region
    pub fn emit(&mut self, instruction: impl AsRef<str>) {
        let region = self.region();
        region.push_str("  ");
        region.push_str(instruction.as_ref());
        region.push('\n');
    }

    /// Opens a basic block in the current region
    pub fn emit_label(&mut self, label: &str) {
        let region = self.region();
        region.push_str(label);
        region.push_str(":\n");
    }

    /// Appends an unindented line (function headers and closing braces)
    pub fn emit_line(&mut self, line: impl AsRef<str>) {
        let region = self.region();
        region.push_str(line.as_ref());
        region.push('\n');
    }

    /// Appends a line to the header, whichever region is current
    pub fn emit_global(&mut self, line: impl AsRef<str>) {
        self.header.push_str(line.as_ref());
        self.header.push('\n');
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn functions(&self) -> &str {
        &self.functions
    }

    pub fn main(&self) -> &str {
        &self.main
    }

    pub fn finish(self, name: impl Into<String>, read_format: impl Into<String>) -> LlvmModule {
        LlvmModule {
            name: name.into(),
            read_format: read_format.into(),
            header: self.header,
            functions: self.functions,
            main: self.main,
        }
    }
}

/// A complete module, rendered through `Display`
#[derive(Debug, Clone)]
pub struct LlvmModule {
    pub name: String,
    /// scanf format for string reads
    pub read_format: String,
    pub header: String,
    pub functions: String,
    pub main: String,
}

impl fmt::Display for LlvmModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "declare i32 @printf(i8*, ...)")?;
        writeln!(f, "declare i32 @scanf(i8*, ...)")?;
        writeln!(f, "declare void @llvm.memcpy.p0i8.p0i8.i64(i8*, i8*, i64, i1)")?;
        writeln!(f)?;

        let constants = [
            ("strps", "%s\n"),
            ("strpi", "%d\n"),
            ("strpd", "%f\n"),
            ("strs", self.read_format.as_str()),
            ("strsi", "%d"),
            ("strsd", "%lf"),
            ("true_text", "true"),
            ("false_text", "false"),
        ];
        for (name, text) in constants {
            let (bytes, len) = byte_string(text);
            writeln!(f, "@{} = constant [{} x i8] {}", name, len, bytes)?;
        }
        writeln!(f)?;

        if !self.header.is_empty() {
            writeln!(f, "{}", self.header)?;
        }
        if !self.functions.is_empty() {
            writeln!(f, "{}", self.functions)?;
        }

        writeln!(f, "define i32 @main() nounwind {{")?;
        write!(f, "{}", self.main)?;
        writeln!(f, "  ret i32 0")?;
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reserved_symbols() {
        assert!(is_reserved_symbol("main"));
        assert!(is_reserved_symbol("strpi"));
        assert!(!is_reserved_symbol("count"));
    }

    #[test]
    fn test_byte_string_escapes() {
        assert_eq!(byte_string("%d\n"), ("c\"%d\\0A\\00\"".to_string(), 4));
        assert_eq!(byte_string("say \"hi\""), ("c\"say \\22hi\\22\\00\"".to_string(), 9));
        assert_eq!(byte_string("ż").1, 3);
    }

    #[test]
    fn test_regions_follow_function_flag() {
        let mut builder = ModuleBuilder::new();
        builder.emit("%.1 = add i32 1, 2");
        builder.set_inside_function(true);
        builder.emit_line("define void @f() {");
        builder.emit_label("entry_like");
        builder.emit_global("@x = global i32 0");
        builder.set_inside_function(false);

        assert_eq!(builder.main(), "  %.1 = add i32 1, 2\n");
        assert_eq!(builder.functions(), "define void @f() {\nentry_like:\n");
        assert_eq!(builder.header(), "@x = global i32 0\n");
    }

    #[test]
    fn test_empty_module_layout() {
        let text = ModuleBuilder::new().finish("demo", "%100s").to_string();
        let expected = "\
; ModuleID = 'demo'
declare i32 @printf(i8*, ...)
declare i32 @scanf(i8*, ...)
declare void @llvm.memcpy.p0i8.p0i8.i64(i8*, i8*, i64, i1)

@strps = constant [4 x i8] c\"%s\\0A\\00\"
@strpi = constant [4 x i8] c\"%d\\0A\\00\"
@strpd = constant [4 x i8] c\"%f\\0A\\00\"
@strs = constant [6 x i8] c\"%100s\\00\"
@strsi = constant [3 x i8] c\"%d\\00\"
@strsd = constant [4 x i8] c\"%lf\\00\"
@true_text = constant [5 x i8] c\"true\\00\"
@false_text = constant [6 x i8] c\"false\\00\"

define i32 @main() nounwind {
  ret i32 0
}
";
        assert_eq!(text, expected);
    }
}
