mod common;

use common::{parse_err, parse_ok};
use parse::{Expr, ExprKind, ExtDecl, FrontError, Stmt, StmtKind};

fn walk_exprs<'a>(stmt: &'a Stmt, out: &mut Vec<&'a Expr>) {
    fn expr_tree<'a>(e: &'a Expr, out: &mut Vec<&'a Expr>) {
        out.push(e);
        match &e.kind {
            ExprKind::Unary { operand, .. } | ExprKind::Cast { operand, .. } => {
                expr_tree(operand, out)
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                expr_tree(lhs, out);
                expr_tree(rhs, out);
            }
            ExprKind::Cond { cond, then_expr, else_expr } => {
                expr_tree(cond, out);
                expr_tree(then_expr, out);
                expr_tree(else_expr, out);
            }
            ExprKind::Call { callee, args, .. } => {
                expr_tree(callee, out);
                for a in args {
                    expr_tree(a, out);
                }
            }
            ExprKind::Member { base, .. } => expr_tree(base, out),
            ExprKind::StmtExpr(s) => walk_exprs(s, out),
            _ => {}
        }
    }
    match &stmt.kind {
        StmtKind::Compound(stmts) => {
            for s in stmts {
                walk_exprs(s, out);
            }
        }
        StmtKind::Expr(Some(e)) | StmtKind::Return(Some(e)) => expr_tree(e, out),
        StmtKind::If { cond, then_stmt, else_stmt } => {
            expr_tree(cond, out);
            walk_exprs(then_stmt, out);
            if let Some(s) = else_stmt {
                walk_exprs(s, out);
            }
        }
        StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
            expr_tree(cond, out);
            walk_exprs(body, out);
        }
        StmtKind::Switch { cond, body, .. } => {
            expr_tree(cond, out);
            walk_exprs(body, out);
        }
        StmtKind::Case { body, .. } | StmtKind::Default(body) | StmtKind::Label { body, .. } => {
            walk_exprs(body, out)
        }
        StmtKind::For { init, cond, step, body } => {
            if let Some(parse::ForInit::Expr(e)) = init {
                expr_tree(e, out);
            }
            if let Some(e) = cond {
                expr_tree(e, out);
            }
            if let Some(e) = step {
                expr_tree(e, out);
            }
            walk_exprs(body, out);
        }
        StmtKind::Decl(d) => {
            for init in &d.inits {
                expr_tree(&init.expr, out);
            }
        }
        _ => {}
    }
}

fn exprs_of(tu: &parse::TranslationUnit) -> Vec<&Expr> {
    let mut out = Vec::new();
    for d in &tu.decls {
        if let ExtDecl::Func(f) = d {
            walk_exprs(&f.body, &mut out);
        }
    }
    out
}

#[test]
fn attributes_are_consumed_and_ignored() {
    parse_ok("int x __attribute__((aligned(8), unused));");
    parse_ok("__attribute__((noreturn)) void die(void);");
    parse_ok("struct __attribute__((packed)) S { int a; } s;");
}

#[test]
fn asm_labels_are_consumed_and_ignored() {
    parse_ok("int setup(void) __asm__(\"real_setup\");");
}

#[test]
fn typeof_yields_the_operand_type() {
    let tu = parse_ok("typeof(1 + 1l) x = 2;");
    let (_, x) = tu.find_symbol("x").unwrap();
    assert_eq!(x.ty.id, tu.types.long_ty());

    let tu = parse_ok("int base; typeof(base) y;");
    let (_, y) = tu.find_symbol("y").unwrap();
    assert_eq!(y.ty.id, tu.types.int_ty());

    let tu = parse_ok("typeof(int *) p;");
    let (_, p) = tu.find_symbol("p").unwrap();
    assert!(tu.types.is_pointer(p.ty.id));
}

#[test]
fn statement_expressions_take_the_last_expression_type() {
    let tu = parse_ok("int f(void) { return ({ int t = 3; t + 1; }); }");
    let found = exprs_of(&tu)
        .iter()
        .any(|e| matches!(e.kind, ExprKind::StmtExpr(_)) && e.ty.id == tu.types.int_ty());
    assert!(found, "statement expression typed as its last statement");
}

#[test]
fn empty_middle_ternary_reuses_the_condition() {
    let tu = parse_ok("int x = 5 ?: 3;");
    match tu.decls.first().unwrap() {
        ExtDecl::Decl(d) => {
            assert!(matches!(
                d.const_init.as_ref().unwrap().kind,
                parse::ValueKind::Int(5)
            ));
        }
        _ => panic!(),
    }
}

#[test]
fn func_name_identifiers_are_string_literals() {
    let tu = parse_ok("char const *f(void) { return __func__; }");
    let lit = tu
        .strings
        .iter()
        .find(|s| s.data == vec![b'f' as u32, 0])
        .expect("__func__ materialized as a string");
    assert_eq!(tu.types.array_len(lit.ty.id), Some(2));

    let err = parse_err("char const *g = __func__;");
    assert!(matches!(err, FrontError::Syntax { .. }), "got {:?}", err);
}

#[test]
fn va_arg_captures_its_type_argument() {
    let tu = parse_ok(
        "int sum(int n, ...) {
             __builtin_va_list ap;
             __builtin_va_start(ap, n);
             int v = __builtin_va_arg(ap, int);
             __builtin_va_end(ap);
             return v;
         }",
    );
    let exprs = exprs_of(&tu);
    let va_arg = exprs
        .iter()
        .find_map(|e| match &e.kind {
            ExprKind::Call { va_arg_ty: Some(t), .. } => Some(*t),
            _ => None,
        })
        .expect("va_arg call with a captured type");
    assert_eq!(va_arg.id, tu.types.int_ty());
}

#[test]
fn va_copy_and_alloca_builtins_resolve() {
    parse_ok(
        "void f(__builtin_va_list src) {
             __builtin_va_list dst;
             __builtin_va_copy(dst, src);
             __sync_synchronize();
         }
         void *grab(unsigned long n) { return __builtin_alloca(n); }",
    );
}

#[test]
fn builtin_references_resolve_against_installed_prototypes() {
    let tu = parse_ok("void f(void) { __sync_synchronize(); }");
    let (_, s) = tu.find_symbol("__sync_synchronize").unwrap();
    assert!(s.is_builtin);
}

#[test]
fn generic_selection_picks_by_type() {
    parse_ok(
        "_Static_assert(_Generic(1.0f, float: 1, double: 2, default: 3) == 1, \"f\");
         _Static_assert(_Generic(1.0, float: 1, double: 2, default: 3) == 2, \"d\");
         _Static_assert(_Generic((char)0, float: 1, double: 2, default: 3) == 3, \"dflt\");",
    );
}

#[test]
fn generic_without_a_match_is_rejected() {
    let err = parse_err("int x = _Generic(1.5, int: 1);");
    assert!(matches!(err, FrontError::Type { .. }), "got {:?}", err);
}

#[test]
fn extension_marker_is_tolerated() {
    parse_ok("__extension__ int x = 0b1010;");
}

#[test]
fn numeric_escapes_keep_the_code_unit_width() {
    parse_ok(
        "_Static_assert(u'\\x1234' == 0x1234, \"char16 escape\");
         _Static_assert(U'\\x10FFFF' == 0x10FFFF, \"char32 escape\");
         _Static_assert(L'\\x4141' == 0x4141, \"wide escape\");
         _Static_assert('\\x141' == 0x41, \"plain char stays 8-bit\");",
    );

    let tu = parse_ok("int f(void) { U\"\\x10000041\"; return 0; }");
    assert!(
        tu.strings.iter().any(|s| s.data == vec![0x1000_0041, 0]),
        "32-bit escape survives in the string data"
    );
}

#[test]
fn wide_and_unicode_strings_take_their_element_types() {
    let tu = parse_ok("int f(void) { return sizeof(L\"ab\") + sizeof(u\"ab\") + sizeof(U\"ab\"); }");
    // L: int[3] = 12, u: ushort[3] = 6, U: uint[3] = 12
    drop(tu);
    parse_ok(
        "_Static_assert(sizeof(L\"ab\") == 12, \"wide\");
         _Static_assert(sizeof(u\"ab\") == 6, \"char16\");
         _Static_assert(sizeof(U\"ab\") == 12, \"char32\");",
    );
}
