//! rill-codegen - Single-pass LLVM IR text generation for Rill
//!
//! The engine reacts to enter/exit events of a syntax tree and writes
//! textual LLVM IR as it goes. There is no intermediate representation:
//! every semantic check happens at the moment the construct is seen, and
//! the first fatal error stops the walk.
//!
//! The output module has three regions:
//! - **header**: global variables, class layouts, string constants
//! - **functions**: user functions and methods
//! - **main**: top-level statements, wrapped in `@main`
//!
//! # Example
//!
//! ```rust
//! use rill_codegen::{compile, CodegenOptions};
//! use rill_tree::build;
//!
//! let tree = build::program(vec![
//!     build::var_decl("int", "x", Some(build::int(2))),
//!     build::print(build::add(build::ident("x"), build::int(3))),
//! ]);
//!
//! let compilation = compile(&tree, &CodegenOptions::default()).unwrap();
//! assert!(compilation.ir.contains("@x = global i32 0"));
//! assert!(compilation.ir.contains("add i32 %.1, 3"));
//! ```

pub mod aggregate;
pub mod control;
pub mod emitter;
pub mod error;
pub mod expr;
pub mod function;
pub mod module;
pub mod names;
pub mod options;
pub mod scope;
pub mod stmt;
pub mod types;
pub mod value;

pub use emitter::Emitter;
pub use error::SemanticError;
pub use module::LlvmModule;
pub use options::CodegenOptions;
pub use types::Type;
pub use value::Value;

use rill_error::{Diagnostic, DiagnosticRenderer, Diagnostics, Result, SourceCache};
use rill_tree::{walk, Node};

/// Output of a successful compilation
#[derive(Debug, Clone)]
pub struct Compilation {
    /// The rendered module
    pub ir: String,
    pub module: LlvmModule,
    /// Soft conditions met along the way
    pub warnings: Diagnostics,
}

/// Walks `tree` once and renders the module
pub fn compile(tree: &Node, options: &CodegenOptions) -> Result<Compilation> {
    let mut emitter = Emitter::new(options.clone());
    let result = walk(tree, &mut emitter).and_then(|()| emitter.generate());
    if let Err(diagnostic) = &result {
        tracing::error!(
            "compilation of `{}` failed\n{}",
            options.module_name,
            report(diagnostic).trim_end()
        );
    }
    result
}

/// Plain-text report of a diagnostic, pointing at its source line
pub fn report(diagnostic: &Diagnostic) -> String {
    let cache = SourceCache::new();
    DiagnosticRenderer::new(&cache).without_colors().render(diagnostic)
}
