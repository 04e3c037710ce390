use types::{QualType, TypeTable};

// Promotions and usual arithmetic conversions on the LP64 model.

#[test]
fn promotions_narrow_to_int() {
    let mut t = TypeTable::new();
    for id in [t.bool_ty(), t.char_ty(), t.uchar_ty(), t.short_ty(), t.ushort_ty()] {
        assert_eq!(t.promote(QualType::new(id)).id, t.int_ty(), "narrow promotes to int");
    }
    // 32-bit and wider types stay put.
    for id in [t.int_ty(), t.uint_ty(), t.long_ty(), t.ulong_ty()] {
        assert_eq!(t.promote(QualType::new(id)).id, id);
    }
}

#[test]
fn uac_integer_ladder() {
    let mut t = TypeTable::new();
    let q = QualType::new;

    // short op short => int after promotion
    let (short_, int_, uint_, long_, ulong_) =
        (t.short_ty(), t.int_ty(), t.uint_ty(), t.long_ty(), t.ulong_ty());
    assert_eq!(t.usual_arith(q(short_), q(short_)).id, int_);

    // int vs uint => uint (same rank, unsigned wins)
    assert_eq!(t.usual_arith(q(int_), q(uint_)).id, uint_);

    // uint vs long => long (wider rank wins, keeps signedness)
    assert_eq!(t.usual_arith(q(uint_), q(long_)).id, long_);

    // long vs ulong => ulong
    assert_eq!(t.usual_arith(q(long_), q(ulong_)).id, ulong_);

    // char vs ulong => ulong
    let char_ = t.char_ty();
    assert_eq!(t.usual_arith(q(char_), q(ulong_)).id, ulong_);
}

#[test]
fn uac_floating_ranks_first() {
    let mut t = TypeTable::new();
    let q = QualType::new;

    let (f, d, ld, i, ul) =
        (t.float_ty(), t.double_ty(), t.long_double_ty(), t.int_ty(), t.ulong_ty());
    assert_eq!(t.usual_arith(q(f), q(i)).id, f);
    assert_eq!(t.usual_arith(q(d), q(f)).id, d);
    assert_eq!(t.usual_arith(q(ld), q(d)).id, ld);
    assert_eq!(t.usual_arith(q(ul), q(d)).id, d);
}

#[test]
fn uac_strips_qualifiers() {
    let mut t = TypeTable::new();
    let ci = QualType::new(t.int_ty()).qualified(types::Quals::CONST);
    let r = t.usual_arith(ci, ci);
    assert!(r.quals.is_empty());
    assert_eq!(r.id, t.int_ty());
}
