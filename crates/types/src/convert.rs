//! Compatibility, promotions, usual arithmetic conversions, and the
//! expression-level decay adjustment.

use crate::{ArithKind, QualType, Type, TypeId, TypeTable};

/// Classification of an explicit cast per the C cast lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    /// Arithmetic <-> arithmetic representation change.
    Arith,
    /// Pointer <-> pointer, or array decayed to a pointer of its element.
    Pointer,
    /// Integer <-> pointer.
    IntPtr,
    /// Anything discarded to void.
    ToVoid,
    /// Source and target are the same type.
    Identity,
}

impl TypeTable {
    /// C type compatibility. Top-level qualifiers are stripped at each step;
    /// structure is compared recursively through the interned handles.
    pub fn compatible(&self, a: QualType, b: QualType) -> bool {
        if a.id == b.id {
            return true;
        }
        match (self.get(a.id), self.get(b.id)) {
            (Type::Void, Type::Void) => true,
            (Type::Arith { width: w1, kind: k1 }, Type::Arith { width: w2, kind: k2 }) => {
                w1 == w2 && k1 == k2
            }
            (Type::Pointer { pointee: p1 }, Type::Pointer { pointee: p2 }) => {
                self.compatible(*p1, *p2)
            }
            (Type::Array { elem: e1, len: l1 }, Type::Array { elem: e2, len: l2 }) => {
                if !self.compatible(*e1, *e2) {
                    return false;
                }
                match (l1, l2) {
                    (Some(a), Some(b)) => a == b,
                    // Either side incomplete: lengths do not conflict.
                    _ => true,
                }
            }
            (
                Type::Function { ret: r1, params: p1, variadic: v1 },
                Type::Function { ret: r2, params: p2, variadic: v2 },
            ) => {
                v1 == v2
                    && p1.len() == p2.len()
                    && self.compatible(*r1, *r2)
                    && p1
                        .iter()
                        .zip(p2.iter())
                        .all(|(x, y)| self.compatible(x.ty, y.ty))
            }
            // Records are compatible only by identity, handled above.
            _ => false,
        }
    }

    /// Integer promotion: anything narrower than int becomes int.
    pub fn promote(&mut self, qt: QualType) -> QualType {
        match *self.get(qt.id) {
            Type::Arith { width, kind } if kind.is_integer() && width < 32 => {
                QualType::new(self.int_ty())
            }
            _ => qt.unqualified(),
        }
    }

    /// Usual arithmetic conversions: float ranks first, then integer
    /// promotion and the width/signedness ladder. Callers guarantee both
    /// operands are arithmetic.
    pub fn usual_arith(&mut self, a: QualType, b: QualType) -> QualType {
        let (_, ka) = self.arith_parts(a.id);
        let (_, kb) = self.arith_parts(b.id);

        if ka == ArithKind::LongDouble || kb == ArithKind::LongDouble {
            return QualType::new(self.long_double_ty());
        }
        if ka == ArithKind::Double || kb == ArithKind::Double {
            return QualType::new(self.double_ty());
        }
        if ka == ArithKind::Float || kb == ArithKind::Float {
            return QualType::new(self.float_ty());
        }

        let pa = self.promote(a);
        let pb = self.promote(b);
        if pa.id == pb.id {
            return pa;
        }

        let (wa, ka) = self.arith_parts(pa.id);
        let (wb, kb) = self.arith_parts(pb.id);
        if wa != wb {
            // The wider type can represent every value of the narrower one
            // on this target, so it wins outright.
            let (w, k) = if wa > wb { (wa, ka) } else { (wb, kb) };
            QualType::new(self.arith(w, k))
        } else {
            // Same rank, mixed signedness: unsigned wins.
            QualType::new(self.arith(wa, ArithKind::Unsigned))
        }
    }

    fn arith_parts(&self, id: TypeId) -> (u8, ArithKind) {
        match self.get(id) {
            Type::Arith { width, kind } => (*width, *kind),
            _ => unreachable!("usual_arith on non-arithmetic type"),
        }
    }

    /// The adjustment applied when a value is used in an expression:
    /// array-of-T decays to pointer-to-T, function to pointer-to-function.
    pub fn may_cast(&mut self, qt: QualType) -> QualType {
        match self.get(qt.id) {
            Type::Array { elem, .. } => {
                let elem = *elem;
                QualType::new(self.pointer_to(elem))
            }
            Type::Function { .. } => QualType::new(self.pointer_to(qt)),
            _ => qt,
        }
    }

    /// Parameter type adjustment: arrays and functions become pointers,
    /// preserving the declared qualifiers on the adjusted pointer.
    pub fn adjust_param(&mut self, qt: QualType) -> QualType {
        match self.get(qt.id) {
            Type::Array { elem, .. } => {
                let elem = *elem;
                QualType::with_quals(self.pointer_to(elem), qt.quals)
            }
            Type::Function { .. } => QualType::with_quals(self.pointer_to(qt.unqualified()), qt.quals),
            _ => qt,
        }
    }

    /// Validate an explicit cast pair against the allowed lattice.
    pub fn classify_cast(&mut self, src: QualType, dst: QualType) -> Option<CastKind> {
        let src = self.may_cast(src);
        if self.compatible(src, dst) {
            return Some(CastKind::Identity);
        }
        if self.is_void(dst.id) {
            return Some(CastKind::ToVoid);
        }
        if self.is_arith(src.id) && self.is_arith(dst.id) {
            return Some(CastKind::Arith);
        }
        if self.is_pointer(src.id) && self.is_pointer(dst.id) {
            return Some(CastKind::Pointer);
        }
        if (self.is_integer(src.id) && self.is_pointer(dst.id))
            || (self.is_pointer(src.id) && self.is_integer(dst.id))
        {
            return Some(CastKind::IntPtr);
        }
        None
    }
}
