mod common;

use common::{parse_err, parse_ok};
use parse::{FrontError, SymKind};

#[test]
fn bit_fields_pack_and_close_per_c_rules() {
    // struct S { int a:3; int b:5; int c; };
    // a@0 bits 0..2, b@0 bits 3..7, c@4, sizeof == 8
    let tu = parse_ok("struct S { int a:3; int b:5; int c; } s;");
    let (_, s) = tu.find_symbol("s").unwrap();
    let r = tu.types.record(s.ty.id).expect("record");

    let a = r.member("a").unwrap();
    assert_eq!((a.offset, a.bit_offset, a.bit_width), (0, Some(0), Some(3)));
    let b = r.member("b").unwrap();
    assert_eq!((b.offset, b.bit_offset, b.bit_width), (0, Some(3), Some(5)));
    let c = r.member("c").unwrap();
    assert_eq!((c.offset, c.bit_width), (4, None));

    assert_eq!(tu.types.size_of(s.ty.id), Some(8));
}

#[test]
fn zero_width_bit_field_forces_a_new_unit() {
    let tu = parse_ok("struct B { int a:3; int :0; int b:5; } v;");
    let (_, v) = tu.find_symbol("v").unwrap();
    let r = tu.types.record(v.ty.id).unwrap();
    assert_eq!(r.member("b").unwrap().offset, 4);
    assert_eq!(tu.types.size_of(v.ty.id), Some(8));
}

#[test]
fn named_zero_width_bit_field_is_rejected() {
    let err = parse_err("struct B { int a:0; };");
    assert!(matches!(err, FrontError::Type { .. }), "got {:?}", err);
}

#[test]
fn bit_field_on_non_integer_type_is_rejected() {
    let err = parse_err("struct B { float f:3; };");
    assert!(matches!(err, FrontError::Type { .. }), "got {:?}", err);
}

#[test]
fn enum_values_count_up_from_assignments() {
    // enum E { A, B=5, C }; => 0, 5, 6; E is a 32-bit int
    let tu = parse_ok("enum E { A, B = 5, C };");

    for (name, want) in [("A", 0i64), ("B", 5), ("C", 6)] {
        let (_, s) = tu.find_symbol(name).unwrap();
        match s.kind {
            SymKind::Enumerator(v) => assert_eq!(v, want, "{}", name),
            _ => panic!("{} is not an enumerator", name),
        }
        assert_eq!(s.ty.id, tu.types.int_ty());
    }
}

#[test]
fn enum_constants_fold_in_initializers() {
    let tu = parse_ok("enum E { A = 3, B }; int x = B;");
    let decl = match tu.decls.last().unwrap() {
        parse::ExtDecl::Decl(d) => d,
        _ => panic!(),
    };
    match &decl.const_init {
        Some(parse::Value { kind: parse::ValueKind::Int(4), .. }) => {}
        other => panic!("expected folded 4, got {:?}", other),
    }
}

#[test]
fn enumerator_redefinition_is_rejected() {
    let err = parse_err("enum E { A, A };");
    assert!(matches!(err, FrontError::Redefinition { .. }), "got {:?}", err);
}

#[test]
fn unknown_enum_reference_is_rejected() {
    let err = parse_err("enum Missing e;");
    assert!(matches!(err, FrontError::Type { .. }), "got {:?}", err);
}

#[test]
fn enum_tag_redefinition_is_rejected() {
    let err = parse_err("enum E { A }; enum E { B };");
    assert!(matches!(err, FrontError::Redefinition { .. }), "got {:?}", err);
}

#[test]
fn struct_tag_completes_a_forward_declaration() {
    // The pointer taken while S was incomplete observes the completion.
    let tu = parse_ok(
        "struct S; struct S *p; struct S { int a; int b; }; \
         int f(void) { return p->b; }",
    );
    let (_, p) = tu.find_symbol("p").unwrap();
    let s = tu.types.pointee(p.ty.id).unwrap();
    assert!(tu.types.is_complete(s.id));
    assert_eq!(tu.types.offset_of(s.id, "b"), Some(4));
}

#[test]
fn struct_redefinition_is_rejected() {
    let err = parse_err("struct S { int a; }; struct S { int b; };");
    assert!(matches!(err, FrontError::Redefinition { .. }), "got {:?}", err);
}

#[test]
fn tag_kind_mismatch_is_rejected() {
    let err = parse_err("struct S { int a; }; union S u;");
    assert!(matches!(err, FrontError::Redefinition { .. }), "got {:?}", err);
}

#[test]
fn self_referential_struct_through_a_pointer() {
    let tu = parse_ok("struct Node { int v; struct Node *next; } n;");
    let (_, n) = tu.find_symbol("n").unwrap();
    let next = tu.types.member_ref(n.ty.id, "next").unwrap();
    assert_eq!(tu.types.pointee(next.ty.id).unwrap().id, n.ty.id);
    assert_eq!(tu.types.size_of(n.ty.id), Some(16));
}

#[test]
fn inner_tags_are_promoted_to_the_enclosing_scope() {
    let tu = parse_ok("struct Outer { struct Inner { int x; } in; }; struct Inner i2;");
    let (_, i2) = tu.find_symbol("i2").unwrap();
    assert!(tu.types.is_complete(i2.ty.id));
    assert_eq!(tu.types.size_of(i2.ty.id), Some(4));
}

#[test]
fn promoted_tag_collision_is_rejected() {
    let err = parse_err(
        "struct Inner { int x; }; struct Outer { struct Inner { int y; } in; };",
    );
    assert!(matches!(err, FrontError::Redefinition { .. }), "got {:?}", err);
}

#[test]
fn anonymous_members_are_transparent() {
    let tu = parse_ok(
        "struct S { int tag; union { int i; float f; }; } s; \
         int g(struct S *p) { return p->i; }",
    );
    let (_, s) = tu.find_symbol("s").unwrap();
    assert_eq!(tu.types.offset_of(s.ty.id, "i"), Some(4));
    assert_eq!(tu.types.offset_of(s.ty.id, "f"), Some(4));
    assert_eq!(tu.types.size_of(s.ty.id), Some(8));
}

#[test]
fn duplicate_member_is_rejected() {
    let err = parse_err("struct S { int a; int a; };");
    assert!(matches!(err, FrontError::Redefinition { .. }), "got {:?}", err);
}

#[test]
fn member_of_incomplete_type_is_rejected() {
    let err = parse_err("struct X { struct Y y; };");
    assert!(matches!(err, FrontError::Incomplete { .. }), "got {:?}", err);
}

#[test]
fn function_typed_member_is_rejected() {
    let err = parse_err("struct S { int f(void); };");
    assert!(matches!(err, FrontError::Type { .. }), "got {:?}", err);
}

#[test]
fn flexible_array_member_must_be_last_in_a_struct() {
    let tu = parse_ok("struct F { int n; int a[]; } f;");
    let (_, f) = tu.find_symbol("f").unwrap();
    assert_eq!(tu.types.size_of(f.ty.id), Some(4));
    assert!(tu.types.record(f.ty.id).unwrap().has_flexible);

    let err = parse_err("struct F { int a[]; int n; };");
    assert!(matches!(err, FrontError::Type { .. }), "got {:?}", err);
}

#[test]
fn flexible_array_member_in_a_union_is_rejected() {
    let err = parse_err("union U { int n; int a[]; };");
    assert!(matches!(err, FrontError::Type { .. }), "got {:?}", err);
}

#[test]
fn flexible_array_member_alone_is_rejected() {
    let err = parse_err("struct F { int a[]; };");
    assert!(matches!(err, FrontError::Type { .. }), "got {:?}", err);
}

#[test]
fn union_members_share_offset_zero() {
    let tu = parse_ok("union U { int i; char c[7]; } u;");
    let (_, u) = tu.find_symbol("u").unwrap();
    let r = tu.types.record(u.ty.id).unwrap();
    assert_eq!(r.member("i").unwrap().offset, 0);
    assert_eq!(r.member("c").unwrap().offset, 0);
    assert_eq!(tu.types.size_of(u.ty.id), Some(8));
}

#[test]
fn struct_member_static_assert_is_checked() {
    parse_ok("struct S { int a; _Static_assert(1, \"ok\"); int b; };");
    let err = parse_err("struct S { int a; _Static_assert(0, \"no\"); };");
    assert!(matches!(err, FrontError::StaticAssert { .. }), "got {:?}", err);
}
