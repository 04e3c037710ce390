mod common;

use anyhow::{Context, Result};
use common::{lex, parse_err, parse_ok};
use parse::{FrontError, Linkage};

#[test]
fn file_scope_static_is_internal() -> Result<()> {
    let tu = parse::parse_translation_unit(lex("static int x; static int f(void) { return x; }"))?;
    let (_, x) = tu.find_symbol("x").context("x declared")?;
    assert_eq!(x.linkage, Linkage::Internal);
    let (_, f) = tu.find_symbol("f").context("f declared")?;
    assert_eq!(f.linkage, Linkage::Internal);
    Ok(())
}

#[test]
fn file_scope_default_is_external() -> Result<()> {
    let tu = parse::parse_translation_unit(lex("int x; extern int y; int f(void);"))?;
    for name in ["x", "y", "f"] {
        let (_, s) = tu.find_symbol(name).context(name)?;
        assert_eq!(s.linkage, Linkage::External, "{}", name);
    }
    Ok(())
}

#[test]
fn locals_have_no_linkage() {
    let tu = parse_ok("int f(void) { int a = 1; static int b = 2; return a + b; }");
    let (_, a) = tu.find_symbol("a").unwrap();
    assert_eq!(a.linkage, Linkage::None);
    let (_, b) = tu.find_symbol("b").unwrap();
    assert_eq!(b.linkage, Linkage::None);
    assert!(b.static_storage, "static local has static storage");
}

#[test]
fn redeclarations_with_linkage_merge_into_one_symbol() {
    let tu = parse_ok("int x; int x; extern int x; int x = 5;");
    let count = tu.symbols.iter().filter(|s| s.name == "x").count();
    assert_eq!(count, 1, "all declarations name the same entity");
    let (_, x) = tu.find_symbol("x").unwrap();
    assert_eq!(x.linkage, Linkage::External);
    assert!(x.defined);
}

#[test]
fn extern_inherits_internal_linkage() {
    let tu = parse_ok("static int x; extern int x;");
    let (_, x) = tu.find_symbol("x").unwrap();
    assert_eq!(x.linkage, Linkage::Internal);
}

#[test]
fn static_after_external_is_rejected() {
    let err = parse_err("int x; static int x;");
    assert!(matches!(err, FrontError::Redefinition { .. }), "got {:?}", err);
}

#[test]
fn conflicting_types_on_redeclaration_are_rejected() {
    let err = parse_err("int x; long x;");
    assert!(matches!(err, FrontError::Redefinition { .. }), "got {:?}", err);

    let err = parse_err("int f(int); int f(long);");
    assert!(matches!(err, FrontError::Redefinition { .. }), "got {:?}", err);
}

#[test]
fn redeclaration_completes_an_array_type() {
    let tu = parse_ok("extern int a[]; int a[4];");
    let (_, a) = tu.find_symbol("a").unwrap();
    assert_eq!(tu.types.array_len(a.ty.id), Some(4));
}

#[test]
fn duplicate_definition_is_rejected() {
    let err = parse_err("int x = 1; int x = 2;");
    assert!(matches!(err, FrontError::Redefinition { .. }), "got {:?}", err);
}

#[test]
fn local_redefinition_is_rejected() {
    let err = parse_err("int f(void) { int a; int a; return 0; }");
    assert!(matches!(err, FrontError::Redefinition { .. }), "got {:?}", err);
}

#[test]
fn block_extern_refers_to_the_file_scope_entity() {
    let tu = parse_ok("int x; int f(void) { extern int x; return x; }");
    let count = tu.symbols.iter().filter(|s| s.name == "x").count();
    assert_eq!(count, 1);
}

#[test]
fn block_extern_with_conflicting_type_is_rejected() {
    let err = parse_err("int x; int f(void) { extern long x; return 0; }");
    assert!(matches!(err, FrontError::Redefinition { .. }), "got {:?}", err);
}

#[test]
fn shadowing_in_inner_scopes_is_allowed() {
    parse_ok("int x; int f(void) { int x = 1; { int x = 2; } return x; }");
}

#[test]
fn parameters_conflict_with_their_redeclaration() {
    let err = parse_err("int f(int a, int a);");
    assert!(matches!(err, FrontError::Redefinition { .. }), "got {:?}", err);
}

#[test]
fn enumerators_conflict_with_objects_in_the_same_scope() {
    let err = parse_err("enum E { A }; int A;");
    assert!(matches!(err, FrontError::Redefinition { .. }), "got {:?}", err);
}

#[test]
fn block_scope_function_declarations_are_external() {
    let tu = parse_ok("int g(void) { extern int h(void); return h(); }");
    let (_, h) = tu.find_symbol("h").unwrap();
    assert_eq!(h.linkage, Linkage::External);
}
