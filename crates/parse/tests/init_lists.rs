mod common;

use common::{parse_err, parse_ok};
use parse::{ExtDecl, FrontError};

fn object_decl<'a>(tu: &'a parse::TranslationUnit, name: &str) -> &'a parse::Declaration {
    for d in &tu.decls {
        if let ExtDecl::Decl(decl) = d {
            if tu.symbol(decl.sym).name == name {
                return decl;
            }
        }
    }
    panic!("no object declaration '{}'", name);
}

#[test]
fn struct_initializer_fills_members_in_order() {
    let tu = parse_ok("struct P { int x; int y; }; struct P p = { 1, 2 };");
    let d = object_decl(&tu, "p");
    assert_eq!(d.inits.len(), 2);
    assert_eq!(d.inits[0].offset, 0);
    assert_eq!(d.inits[1].offset, 4);
    assert_eq!(d.inits[1].path.len(), 1);
    assert_eq!(d.inits[1].path[0].index, 1);
}

#[test]
fn designators_jump_and_parsing_resumes_after_them() {
    // .y = 2 jumps; 3 resumes at the member after y (z)
    let tu = parse_ok("struct P { int x; int y; int z; }; struct P p = { .y = 2, 3 };");
    let d = object_decl(&tu, "p");
    assert_eq!(d.inits.len(), 2);
    assert_eq!(d.inits[0].offset, 4);
    assert_eq!(d.inits[1].offset, 8);
}

#[test]
fn array_designators_jump_the_index_cursor() {
    let tu = parse_ok("int a[6] = { 1, [4] = 5, 6 };");
    let d = object_decl(&tu, "a");
    let offsets: Vec<u64> = d.inits.iter().map(|i| i.offset).collect();
    assert_eq!(offsets, vec![0, 16, 20]);
}

#[test]
fn nested_aggregates_take_nested_braces() {
    let tu = parse_ok("struct In { int a; int b; }; struct Out { struct In i; int z; }; \
                       struct Out o = { { 1, 2 }, 3 };");
    let d = object_decl(&tu, "o");
    assert_eq!(d.inits.len(), 3);
    assert_eq!(d.inits[0].path.len(), 2, "scalar path navigates two levels");
    assert_eq!(d.inits[2].offset, 8);
}

#[test]
fn designators_compose_across_levels() {
    let tu = parse_ok("struct In { int a; int b; }; struct Out { struct In i[2]; int z; }; \
                       struct Out o = { .i[1].b = 7 };");
    let d = object_decl(&tu, "o");
    assert_eq!(d.inits.len(), 1);
    // i@0, i[1]@8, .b@4 within => 12
    assert_eq!(d.inits[0].offset, 12);
    assert_eq!(d.inits[0].path.len(), 3);
}

#[test]
fn excess_elements_are_rejected() {
    let err = parse_err("int a[2] = { 1, 2, 3 };");
    assert!(matches!(err, FrontError::Initializer { .. }), "got {:?}", err);

    let err = parse_err("struct P { int x; }; struct P p = { 1, 2 };");
    assert!(matches!(err, FrontError::Initializer { .. }), "got {:?}", err);
}

#[test]
fn array_designator_out_of_bounds_is_rejected() {
    let err = parse_err("int a[2] = { [5] = 1 };");
    assert!(matches!(err, FrontError::Initializer { .. }), "got {:?}", err);
}

#[test]
fn unknown_member_designator_is_rejected() {
    let err = parse_err("struct P { int x; }; struct P p = { .nope = 1 };");
    assert!(matches!(err, FrontError::Initializer { .. }), "got {:?}", err);
}

#[test]
fn string_literal_initializes_a_char_array() {
    let tu = parse_ok("char s[] = \"hey\";");
    let (_, s) = tu.find_symbol("s").unwrap();
    assert_eq!(tu.types.array_len(s.ty.id), Some(4));

    // Exactly-full array may drop the terminating null.
    parse_ok("char t[3] = \"hey\";");
    let err = parse_err("char u[2] = \"hey\";");
    assert!(matches!(err, FrontError::Initializer { .. }), "got {:?}", err);
}

#[test]
fn braced_string_literal_is_accepted() {
    let tu = parse_ok("char s[4] = { \"hey\" };");
    let (_, s) = tu.find_symbol("s").unwrap();
    assert_eq!(tu.types.array_len(s.ty.id), Some(4));
}

#[test]
fn string_element_width_must_match() {
    let err = parse_err("char s[] = U\"hey\";");
    assert!(matches!(err, FrontError::Initializer { .. }), "got {:?}", err);
}

#[test]
fn struct_copy_initializer_from_a_compatible_value() {
    parse_ok(
        "struct P { int x; int y; };
         int f(struct P a) { struct P b = a; return b.x; }",
    );
    let err = parse_err("struct P { int x; }; int f(int v) { struct P b = v; return b.x; }");
    assert!(matches!(err, FrontError::Initializer { .. }), "got {:?}", err);
}

#[test]
fn union_initializes_its_first_member_positionally() {
    let tu = parse_ok("union U { int i; float f; }; union U u = { 1 };");
    let d = object_decl(&tu, "u");
    assert_eq!(d.inits.len(), 1);
    assert_eq!(d.inits[0].path[0].index, 0);
}

#[test]
fn union_designator_selects_the_member() {
    let tu = parse_ok("union U { int i; float f; }; union U u = { .f = 1.5 };");
    let d = object_decl(&tu, "u");
    assert_eq!(d.inits.len(), 1);
    assert_eq!(d.inits[0].path[0].index, 1);
}

#[test]
fn positional_after_designator_in_a_union_is_excess() {
    let err = parse_err("union U { int i; float f; }; union U u = { .i = 1, 2 };");
    assert!(matches!(err, FrontError::Initializer { .. }), "got {:?}", err);

    let err = parse_err("union U { int i; float f; }; union U u = { 1, 2 };");
    assert!(matches!(err, FrontError::Initializer { .. }), "got {:?}", err);
}

#[test]
fn anonymous_members_take_designators_by_inner_name() {
    let tu = parse_ok(
        "struct S { int tag; union { int i; float f; }; };
         struct S s = { 1, .i = 2 };",
    );
    let d = object_decl(&tu, "s");
    assert_eq!(d.inits.len(), 2);
    // The designator unwinds one level: path goes through the anonymous
    // member at index 1 down to its member 0.
    assert_eq!(d.inits[1].offset, 4);
    assert_eq!(d.inits[1].path.len(), 2);
    assert_eq!(d.inits[1].path[0].index, 1);
    assert_eq!(d.inits[1].path[1].index, 0);
}

#[test]
fn unnamed_bit_fields_are_skipped_positionally() {
    let tu = parse_ok("struct B { int a:3; int :5; int b:8; }; struct B v = { 1, 2 };");
    let d = object_decl(&tu, "v");
    assert_eq!(d.inits.len(), 2);
    assert_eq!(d.inits[1].path[0].index, 2, "the unnamed field holds no slot");
}

#[test]
fn scalar_initializer_may_be_braced_once() {
    parse_ok("int x = { 5 };");
    let err = parse_err("int x = { 5, 6 };");
    assert!(matches!(err, FrontError::Syntax { .. }), "got {:?}", err);
}

#[test]
fn local_initializers_are_not_folded() {
    let tu = parse_ok("int f(int n) { int a[2] = { n, 2 }; return a[0]; }");
    // The local initializer stays as records; no constant is attached.
    match &tu.decls[0] {
        ExtDecl::Func(_) => {}
        _ => panic!(),
    }
}

#[test]
fn static_local_initializer_must_be_constant() {
    parse_ok("int f(void) { static int x = 3; return x; }");
    let err = parse_err("int f(int n) { static int x = n; return x; }");
    assert!(matches!(err, FrontError::ConstExpr { .. }), "got {:?}", err);
}

#[test]
fn extern_local_with_initializer_is_rejected() {
    let err = parse_err("int f(void) { extern int x = 5; return x; }");
    assert!(matches!(err, FrontError::Initializer { .. }), "got {:?}", err);
}

#[test]
fn compound_literals_are_addressable_values() {
    parse_ok(
        "struct P { int x; int y; };
         int f(void) { struct P p = (struct P){ 1, 2 }; return p.y + (int[]){ 3, 4 }[0]; }",
    );
}
