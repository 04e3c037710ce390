use types::{Param, QualType, Quals, TypeTable};

#[test]
fn arith_interning_is_canonical() {
    let mut t = TypeTable::new();
    let a = t.arith(32, types::ArithKind::Signed);
    let b = t.arith(32, types::ArithKind::Signed);
    assert_eq!(a, b);
    assert_eq!(a, t.int_ty());

    // long and long long are the same interned 64-bit type
    let l = t.arith(64, types::ArithKind::Signed);
    assert_eq!(l, t.long_ty());
}

#[test]
fn derived_types_are_interned() {
    let mut t = TypeTable::new();
    let int_q = QualType::new(t.int_ty());
    let p1 = t.pointer_to(int_q);
    let p2 = t.pointer_to(int_q);
    assert_eq!(p1, p2);

    let a1 = t.array_of(int_q, Some(4));
    let a2 = t.array_of(int_q, Some(4));
    assert_eq!(a1, a2);
    assert_ne!(a1, t.array_of(int_q, Some(5)));

    // Array and pointer to the same element are distinct types.
    assert_ne!(p1, a1);
}

#[test]
fn compatibility_is_reflexive_and_symmetric() {
    let mut t = TypeTable::new();
    let int_q = QualType::new(t.int_ty());
    let ptr = QualType::new(t.pointer_to(int_q));
    let arr = QualType::new(t.array_of(int_q, Some(3)));
    let open = QualType::new(t.array_of(int_q, None));
    let f = QualType::new(t.function(int_q, vec![Param { name: None, ty: ptr }], false));
    let rec = QualType::new(t.new_record(true, Some("S".into())));

    for qt in [int_q, ptr, arr, open, f, rec] {
        assert!(t.compatible(qt, qt), "reflexive");
    }
    for a in [int_q, ptr, arr, open, f, rec] {
        for b in [int_q, ptr, arr, open, f, rec] {
            assert_eq!(t.compatible(a, b), t.compatible(b, a), "symmetric");
        }
    }
}

#[test]
fn array_compat_ignores_missing_length() {
    let mut t = TypeTable::new();
    let int_q = QualType::new(t.int_ty());
    let a3 = QualType::new(t.array_of(int_q, Some(3)));
    let a4 = QualType::new(t.array_of(int_q, Some(4)));
    let open = QualType::new(t.array_of(int_q, None));

    assert!(t.compatible(a3, open));
    assert!(t.compatible(open, a4));
    assert!(!t.compatible(a3, a4));
}

#[test]
fn qualifiers_do_not_break_compat() {
    let mut t = TypeTable::new();
    let ci = QualType::new(t.int_ty()).qualified(Quals::CONST);
    let i = QualType::new(t.int_ty());
    assert!(t.compatible(ci, i));
}

#[test]
fn function_compat_checks_shape() {
    let mut t = TypeTable::new();
    let int_q = QualType::new(t.int_ty());
    let long_q = QualType::new(t.long_ty());

    let f1 = QualType::new(t.function(int_q, vec![Param { name: Some("a".into()), ty: int_q }], false));
    let f2 = QualType::new(t.function(int_q, vec![Param { name: Some("b".into()), ty: int_q }], false));
    let f3 = QualType::new(t.function(int_q, vec![Param { name: None, ty: long_q }], false));
    let f4 = QualType::new(t.function(int_q, vec![Param { name: None, ty: int_q }], true));

    // Parameter names are irrelevant to compatibility.
    assert!(t.compatible(f1, f2));
    // Parameter types and variadicity are not.
    assert!(!t.compatible(f1, f3));
    assert!(!t.compatible(f1, f4));
}

#[test]
fn records_are_nominal() {
    let mut t = TypeTable::new();
    let s1 = QualType::new(t.new_record(true, Some("S".into())));
    let s2 = QualType::new(t.new_record(true, Some("S".into())));
    assert!(!t.compatible(s1, s2), "distinct definitions are distinct types");
}

#[test]
fn decay_adjustment() {
    let mut t = TypeTable::new();
    let int_q = QualType::new(t.int_ty());
    let arr = QualType::new(t.array_of(int_q, Some(8)));
    let decayed = t.may_cast(arr);
    assert!(t.is_pointer(decayed.id));
    assert_eq!(t.pointee(decayed.id).unwrap().id, t.int_ty());

    let f = QualType::new(t.function(int_q, vec![], false));
    let fp = t.may_cast(f);
    assert!(t.is_pointer(fp.id));
    assert!(t.is_function(t.pointee(fp.id).unwrap().id));
}

#[test]
fn record_completion_is_visible_through_old_handles() {
    let mut t = TypeTable::new();
    let int_q = QualType::new(t.int_ty());
    let rec = t.new_record(true, Some("Node".into()));
    // A self-referential pointer taken while the record is incomplete.
    let self_ptr = QualType::new(t.pointer_to(QualType::new(rec)));

    assert!(!t.is_complete(rec));
    t.complete_record(
        rec,
        vec![
            types::Member {
                name: Some("v".into()),
                ty: int_q,
                offset: 0,
                bit_offset: None,
                bit_width: None,
                explicit_align: None,
            },
            types::Member {
                name: Some("next".into()),
                ty: self_ptr,
                offset: 0,
                bit_offset: None,
                bit_width: None,
                explicit_align: None,
            },
        ],
        false,
    );

    assert!(t.is_complete(rec));
    let through_ptr = t.pointee(self_ptr.id).unwrap();
    assert!(t.is_complete(through_ptr.id), "completion visible through prior handles");
    assert_eq!(t.size_of(rec), Some(16));
}
