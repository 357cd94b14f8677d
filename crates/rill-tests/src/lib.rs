//! End-to-end tests for the Rill IR emitter
//!
//! Trees are assembled with `rill_tree::build`, walked once by
//! `rill_codegen::compile`, and the rendered module is checked as text.

use rill_codegen::{CodegenOptions, Compilation};
use rill_error::{Diagnostic, ErrorCode};
use rill_tree::{build, Node};
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Routes engine logs to the test output. Safe to call from every test.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Compiles a program made of `statements` with default options
pub fn compile(statements: Vec<Node>) -> Result<Compilation, Diagnostic> {
    compile_with(statements, &CodegenOptions::default())
}

pub fn compile_with(statements: Vec<Node>, options: &CodegenOptions) -> Result<Compilation, Diagnostic> {
    init_tracing();
    rill_codegen::compile(&build::program(statements), options)
}

/// Asserts the program compiles and returns the module text
pub fn assert_compiles(statements: Vec<Node>) -> String {
    match compile(statements) {
        Ok(compilation) => compilation.ir,
        Err(diagnostic) => panic!("Expected program to compile, but got:\n{}", diagnostic),
    }
}

/// Asserts the program fails with `code`
pub fn assert_compile_fails(statements: Vec<Node>, code: ErrorCode) {
    match compile(statements) {
        Ok(compilation) => panic!(
            "Expected compilation to fail with {}, but it succeeded.\n\nGenerated IR:\n{}",
            code, compilation.ir
        ),
        Err(diagnostic) => assert_eq!(
            diagnostic.code,
            Some(code),
            "unexpected diagnostic: {}",
            diagnostic
        ),
    }
}

/// Asserts the program compiles and the IR contains `expected`
pub fn assert_ir_contains(statements: Vec<Node>, expected: &str) {
    let ir = assert_compiles(statements);
    if !ir.contains(expected) {
        panic!(
            "Expected IR to contain '{}', but it didn't.\n\nGenerated IR:\n{}",
            expected, ir
        );
    }
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rill_tree::NodeKind;

    // =========================================
    // Module layout
    // =========================================

    #[test]
    fn test_print_literal_module() {
        let ir = assert_compiles(vec![build::print(build::int(1))]);
        let expected = r#"; ModuleID = 'main'
declare i32 @printf(i8*, ...)
declare i32 @scanf(i8*, ...)
declare void @llvm.memcpy.p0i8.p0i8.i64(i8*, i8*, i64, i1)

@strps = constant [4 x i8] c"%s\0A\00"
@strpi = constant [4 x i8] c"%d\0A\00"
@strpd = constant [4 x i8] c"%f\0A\00"
@strs = constant [6 x i8] c"%100s\00"
@strsi = constant [3 x i8] c"%d\00"
@strsd = constant [4 x i8] c"%lf\00"
@true_text = constant [5 x i8] c"true\00"
@false_text = constant [6 x i8] c"false\00"

define i32 @main() nounwind {
  %.1 = call i32 (i8*, ...) @printf(i8* getelementptr inbounds ([4 x i8], [4 x i8]* @strpi, i32 0, i32 0), i32 1)
  ret i32 0
}
"#;
        assert_eq!(ir, expected);
    }

    #[test]
    fn test_module_name_and_buffer_options() {
        let options = CodegenOptions {
            read_buffer_len: 32,
            ..CodegenOptions::new("prog")
        };
        let compilation = compile_with(
            vec![build::var_decl("string", "s", None), build::read("s")],
            &options,
        )
        .unwrap();
        assert!(compilation.ir.starts_with("; ModuleID = 'prog'\n"));
        assert!(compilation.ir.contains("@strs = constant [5 x i8] c\"%32s\\00\""));
        assert!(compilation.ir.contains("%str.1 = alloca [33 x i8]"));
        assert!(compilation.ir.contains("[5 x i8]* @strs,"));
    }

    // =========================================
    // Expressions
    // =========================================

    #[test]
    fn test_sum_of_globals() {
        let ir = assert_compiles(vec![
            build::var_decl("int", "x", Some(build::int(2))),
            build::var_decl("int", "y", Some(build::int(3))),
            build::print(build::add(build::ident("x"), build::ident("y"))),
        ]);
        let main = "\
  store i32 2, i32* @x
  store i32 3, i32* @y
  %.1 = load i32, i32* @x
  %.2 = load i32, i32* @y
  %.3 = add i32 %.1, %.2
  %.4 = call i32 (i8*, ...) @printf(i8* getelementptr inbounds ([4 x i8], [4 x i8]* @strpi, i32 0, i32 0), i32 %.3)
";
        assert!(ir.contains("@x = global i32 0\n@y = global i32 0\n"));
        assert!(ir.contains(main), "IR was:\n{}", ir);
    }

    #[test]
    fn test_double_arithmetic() {
        assert_ir_contains(
            vec![build::print(build::mul(build::float("1.5"), build::float("2.0")))],
            "fmul double 0x3FF8000000000000, 2.0",
        );
    }

    #[test]
    fn test_division_is_signed() {
        assert_ir_contains(
            vec![
                build::var_decl("int", "n", Some(build::int(9))),
                build::print(build::div(build::ident("n"), build::int(3))),
            ],
            "%.2 = sdiv i32 %.1, 3",
        );
    }

    #[test]
    fn test_int_equality() {
        assert_ir_contains(
            vec![
                build::var_decl("int", "a", Some(build::int(1))),
                build::print(build::eq(build::ident("a"), build::int(1))),
            ],
            "%.2 = icmp eq i32 %.1, 1",
        );
    }

    #[test]
    fn test_mismatch_in_two_operand_chain() {
        assert_compile_fails(
            vec![build::print(build::add(build::int(1), build::float("1.0")))],
            ErrorCode::TYPE_MISMATCH,
        );
    }

    #[test]
    fn test_mismatch_in_three_operand_chain() {
        let chain = build::chain(
            NodeKind::Additive,
            build::int(1),
            vec![("+", build::int(2)), ("-", build::float("3.0"))],
        );
        assert_compile_fails(vec![build::print(chain)], ErrorCode::TYPE_MISMATCH);
    }

    #[test]
    fn test_mismatch_deep_in_long_chain() {
        let mut rest: Vec<(&str, Node)> = (0..6).map(|i| ("*", build::int(i + 2))).collect();
        rest.push(("*", build::string("x")));
        let chain = build::chain(NodeKind::Multiplicative, build::int(1), rest);
        assert_compile_fails(vec![build::print(chain)], ErrorCode::TYPE_MISMATCH);
    }

    #[test]
    fn test_arithmetic_on_bool_is_unsupported() {
        assert_compile_fails(
            vec![build::print(build::add(build::boolean(true), build::boolean(false)))],
            ErrorCode::UNSUPPORTED_OPERATOR,
        );
    }

    // =========================================
    // Short-circuit folding
    // =========================================

    fn flags() -> Vec<Node> {
        vec![
            build::var_decl("bool", "a", Some(build::boolean(true))),
            build::var_decl("bool", "b", Some(build::boolean(false))),
        ]
    }

    fn with_flags(expr: Node) -> Vec<Node> {
        let mut statements = flags();
        statements.push(build::var_decl("bool", "r", Some(expr)));
        statements
    }

    #[test]
    fn test_and_with_true_needs_no_branch() {
        for expr in [
            build::and(build::ident("a"), build::boolean(true)),
            build::and(build::boolean(true), build::ident("a")),
        ] {
            let ir = assert_compiles(with_flags(expr));
            assert!(!ir.contains("phi"), "IR was:\n{}", ir);
            assert!(ir.contains("%.1 = load i1, i1* @a\n  store i1 %.1, i1* @r"));
        }
    }

    #[test]
    fn test_and_with_false_folds_away() {
        let ir = assert_compiles(with_flags(build::and(
            build::ident("a"),
            build::not(build::boolean(true)),
        )));
        assert!(!ir.contains("load i1, i1* @a"));
        assert!(ir.contains("store i1 false, i1* @r"));
    }

    #[test]
    fn test_or_with_true_folds_whole_chain() {
        let chain = build::chain(
            NodeKind::Disjunction,
            build::ident("a"),
            vec![
                ("||", build::ident("b")),
                ("||", build::group(NodeKind::Conjunction, build::boolean(true))),
            ],
        );
        let ir = assert_compiles(with_flags(chain));
        assert!(ir.contains("store i1 true, i1* @r"));
        assert!(!ir.contains("or_true"));
    }

    #[test]
    fn test_and_of_variables_branches() {
        let ir = assert_compiles(with_flags(build::and(build::ident("a"), build::ident("b"))));
        let expected = "\
  %.1 = load i1, i1* @a
  %.2 = load i1, i1* @b
  br i1 %.1, label %and_true_3, label %and_not_true_3
and_true_3:
  %true.3 = and i1 %.1, %.2
  br label %and_end_3
and_not_true_3:
  %false.3 = and i1 false, false
  br label %and_end_3
and_end_3:
  %.3 = phi i1 [ %true.3, %and_true_3 ], [ %false.3, %and_not_true_3 ]
  store i1 %.3, i1* @r
";
        assert!(ir.contains(expected), "IR was:\n{}", ir);
    }

    #[test]
    fn test_or_of_variables_branches() {
        assert_ir_contains(
            with_flags(build::or(build::ident("a"), build::ident("b"))),
            "%false.3 = or i1 %.1, %.2",
        );
    }

    // =========================================
    // Control flow
    // =========================================

    #[test]
    fn test_sibling_blocks_get_fresh_labels() {
        let ir = assert_compiles(vec![
            build::var_decl("bool", "c", None),
            build::if_("c", vec![], None),
            build::if_("c", vec![], Some(vec![])),
            build::repeat("2", vec![build::repeat("3", vec![])]),
        ]);
        for label in [
            "if_start_1:",
            "if_start_2:",
            "else_start_1:",
            "loop_1:",
            "loop_2:",
            "end_1:",
            "end_2:",
        ] {
            assert_eq!(ir.matches(&format!("\n{}\n", label)).count(), 1, "label {}", label);
        }
    }

    #[test]
    fn test_loop_body_declares_locals() {
        let ir = assert_compiles(vec![build::repeat(
            "3",
            vec![
                build::var_decl("int", "i", Some(build::int(1))),
                build::print_var("i"),
            ],
        )]);
        assert!(ir.contains("%i = alloca i32\n  store i32 1, i32* %i"));
        assert!(!ir.contains("@i = global"));
    }

    // =========================================
    // Functions
    // =========================================

    #[test]
    fn test_function_call_roundtrip() {
        let ir = assert_compiles(vec![
            build::function(
                "int",
                "inc",
                &[("int", "n")],
                vec![build::ret(Some(build::add(build::ident("n"), build::int(1))))],
            ),
            build::print(build::call("inc", vec![build::int(5)])),
        ]);
        let function = "\
define i32 @inc(i32 %n) {
  %.1 = add i32 %n, 1
  ret i32 %.1
  unreachable
}
";
        assert!(ir.contains(function), "IR was:\n{}", ir);
        assert!(ir.contains("  %.2 = call i32 @inc(i32 5)\n"));
        let functions_at = ir.find("define i32 @inc").unwrap();
        let main_at = ir.find("define i32 @main").unwrap();
        assert!(functions_at < main_at);
    }

    #[test]
    fn test_function_reads_globals() {
        assert_ir_contains(
            vec![
                build::var_decl("double", "rate", Some(build::float("0.5"))),
                build::function(
                    "double",
                    "twice",
                    &[],
                    vec![build::ret(Some(build::add(build::ident("rate"), build::ident("rate"))))],
                ),
            ],
            "%.1 = load double, double* @rate",
        );
    }

    #[test]
    fn test_function_locals_do_not_leak() {
        assert_compile_fails(
            vec![
                build::function("void", "f", &[], vec![build::var_decl("int", "tmp", None)]),
                build::print(build::ident("tmp")),
            ],
            ErrorCode::UNKNOWN_VARIABLE,
        );
    }

    #[test]
    fn test_recursion() {
        assert_ir_contains(
            vec![build::function(
                "int",
                "down",
                &[("int", "n")],
                vec![build::ret(Some(build::call(
                    "down",
                    vec![build::sub(build::ident("n"), build::int(1))],
                )))],
            )],
            "%.2 = call i32 @down(i32 %.1)",
        );
    }

    #[test]
    fn test_call_to_unknown_function() {
        assert_compile_fails(
            vec![build::call_stmt(build::call("missing", vec![]))],
            ErrorCode::UNKNOWN_FUNCTION,
        );
    }

    // =========================================
    // Arrays, matrices and classes
    // =========================================

    #[test]
    fn test_array_index() {
        let ir = assert_compiles(vec![
            build::array_decl("arr", &[10, 20, 30]),
            build::print(build::array_index("arr", 1)),
        ]);
        assert!(ir.contains("%arr = alloca [3 x i32]"));
        assert!(ir.contains("%.4 = getelementptr inbounds [3 x i32], [3 x i32]* %arr, i32 0, i32 1\n  %.5 = load i32, i32* %.4"));
    }

    #[test]
    fn test_matrix_index() {
        assert_ir_contains(
            vec![
                build::matrix_decl("m", &[&[1, 2], &[3, 4]]),
                build::print(build::matrix_index("m", 1, 0)),
            ],
            "%.8 = load [2 x i32]*, [2 x i32]** %.7",
        );
    }

    #[test]
    fn test_ragged_matrix_is_rejected() {
        assert_compile_fails(
            vec![build::matrix_decl("m", &[&[1, 2], &[3]])],
            ErrorCode::INVALID_AGGREGATE,
        );
    }

    #[test]
    fn test_class_layout_and_offsets() {
        let ir = assert_compiles(vec![
            build::class_decl(
                "Point",
                vec![build::member("int", "x"), build::member("double", "y")],
            ),
            build::instantiate("Point", "p"),
            build::member_assign("p", "y", build::float("2.5")),
            build::print(build::member_access("p", "x")),
        ]);
        assert!(ir.contains("%Point = type { i32, double }"));
        assert!(ir.contains("%p = alloca %Point"));
        assert!(ir.contains("%.1 = getelementptr inbounds %Point, %Point* %p, i32 0, i32 1\n  store double 0x4004000000000000, double* %.1"));
        assert!(ir.contains("%.2 = getelementptr inbounds %Point, %Point* %p, i32 0, i32 0"));
    }

    #[test]
    fn test_instantiation_inside_own_class_fails() {
        assert_compile_fails(
            vec![build::class_decl(
                "Node",
                vec![build::function(
                    "void",
                    "clone",
                    &[],
                    vec![build::instantiate("Node", "other")],
                )],
            )],
            ErrorCode::UNKNOWN_CLASS,
        );
    }

    #[test]
    fn test_method_call_passes_instance() {
        let ir = assert_compiles(vec![
            build::class_decl(
                "Acc",
                vec![
                    build::member("int", "total"),
                    build::function(
                        "void",
                        "add",
                        &[("int", "n")],
                        vec![build::member_assign(
                            "this",
                            "total",
                            build::add(build::member_access("this", "total"), build::ident("n")),
                        )],
                    ),
                ],
            ),
            build::instantiate("Acc", "acc"),
            build::call_stmt(build::method_call("acc", "add", vec![build::int(4)])),
        ]);
        assert!(ir.contains("define void @Acc_add(%Acc* %this, i32 %n) {"));
        assert!(ir.contains("  call void @Acc_add(%Acc* %acc, i32 4)\n"));
    }

    #[test]
    fn test_method_arity_excludes_receiver() {
        let statements = vec![
            build::class_decl(
                "K",
                vec![build::function("void", "go", &[("int", "n")], vec![])],
            ),
            build::instantiate("K", "k"),
            build::call_stmt(build::method_call("k", "go", vec![])),
        ];
        let diagnostic = compile(statements).unwrap_err();
        assert_eq!(diagnostic.code, Some(ErrorCode::ARITY_MISMATCH));
        assert!(diagnostic.message.contains("takes 1 argument(s) but 0"), "{}", diagnostic.message);
    }

    // =========================================
    // Warnings
    // =========================================

    #[test]
    fn test_soft_conditions_are_collected() {
        let compilation = compile(vec![
            build::print_var("ghost"),
            build::var_decl("int", "x", None),
            build::var_decl("int", "x", None),
            build::read("nobody"),
        ])
        .unwrap();
        assert_eq!(compilation.warnings.len(), 3);
        assert!(!compilation.warnings.has_errors());
        let codes: Vec<_> = compilation.warnings.iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![
                Some(ErrorCode::UNKNOWN_VARIABLE),
                Some(ErrorCode::DUPLICATE_VARIABLE),
                Some(ErrorCode::UNKNOWN_VARIABLE),
            ]
        );
    }

    #[test]
    fn test_warnings_as_errors() {
        let options = CodegenOptions {
            warnings_as_errors: true,
            ..CodegenOptions::default()
        };
        let diagnostic = compile_with(vec![build::print_var("ghost")], &options).unwrap_err();
        assert!(diagnostic.is_error());
        assert_eq!(diagnostic.code, Some(ErrorCode::UNKNOWN_VARIABLE));
    }

    #[test]
    fn test_fatal_error_stops_the_walk() {
        let diagnostic = compile(vec![
            build::var_decl("bool", "flag", Some(build::int(1))),
            build::print_var("ghost"),
        ])
        .unwrap_err();
        assert_eq!(diagnostic.code, Some(ErrorCode::TYPE_MISMATCH));
    }

    #[test]
    fn test_fatal_report_names_the_line() {
        let diagnostic = compile(vec![
            build::print_var("ok").at_line(3),
            build::var_decl("bool", "b", Some(build::int(1))).at_line(7),
        ])
        .unwrap_err();
        assert_eq!(diagnostic.line(), Some(7));

        let report = rill_codegen::report(&diagnostic);
        assert!(
            report.starts_with("error[ET001]: type mismatch: expected `bool`, found `int`\n"),
            "report was:\n{}",
            report
        );
        assert!(report.contains(" --> line 7\n"), "report was:\n{}", report);
    }

    // =========================================
    // Isolation
    // =========================================

    fn busy_program() -> Vec<Node> {
        vec![
            build::var_decl("bool", "a", Some(build::boolean(true))),
            build::var_decl("string", "s", Some(build::string("hi"))),
            build::var_decl("int", "n", Some(build::int(3))),
            build::if_(
                "a",
                vec![build::print(build::add(build::ident("n"), build::int(1)))],
                Some(vec![build::print_var("s")]),
            ),
            build::repeat("n", vec![build::print(build::string("tick"))]),
        ]
    }

    #[test]
    fn test_compilations_do_not_share_state() {
        let first = assert_compiles(busy_program());
        let second = assert_compiles(busy_program());
        assert!(first.contains("@str.1 = private constant"));
        assert_eq!(first, second);
    }
}
