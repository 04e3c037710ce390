//! Constant evaluator: a pure function over the typed expression tree.
//! Folds to a 64-bit integer, a floating value, a symbolic pointer
//! (symbol or string literal plus byte offset), or a constant aggregate.
//! The type attached to each node picks signedness, width, and wrapping;
//! unsigned arithmetic wraps, signed overflow folds freely. The evaluator
//! never interns types or touches scope.

use crate::ast::{BinaryOp, Expr, ExprKind, Initializer, StrId, Symbol, SymbolId, UnaryOp};
use crate::error::{FrontError, Result};
use types::{ArithKind, QualType, Type, TypeTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtrBase {
    Sym(SymbolId),
    Str(StrId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// Raw 64-bit representation; `ty` decides the interpretation. Also
    /// used for integer constants of pointer type (null and friends).
    Int(u64),
    Float(f64),
    /// Address of a static-storage object or string literal.
    Ptr { base: PtrBase, offset: i64 },
    /// (byte offset, value) pairs for a folded aggregate initializer.
    Aggregate(Vec<(u64, Value)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub ty: QualType,
    pub kind: ValueKind,
}

impl Value {
    fn int(ty: QualType, raw: u64) -> Self {
        Self { ty, kind: ValueKind::Int(raw) }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self.kind, ValueKind::Int(0))
    }
}

fn int_parts(types: &TypeTable, ty: QualType) -> Option<(u32, bool)> {
    match types.get(ty.id) {
        Type::Arith { width, kind } if kind.is_integer() => {
            let bits = match width {
                1 => 1,
                8 => 8,
                16 => 16,
                32 => 32,
                64 => 64,
                _ => return None,
            };
            Some((bits, *kind == ArithKind::Signed))
        }
        _ => None,
    }
}

/// Normalize a raw value into the canonical 64-bit form of the given
/// integer type: truncate to the width, then sign- or zero-extend.
fn normalize_int(raw: u64, bits: u32, signed: bool) -> u64 {
    if bits == 1 {
        return (raw != 0) as u64;
    }
    if bits >= 64 {
        return raw;
    }
    let mask = (1u64 << bits) - 1;
    let t = raw & mask;
    if signed && t & (1u64 << (bits - 1)) != 0 {
        t | !mask
    } else {
        t
    }
}

fn err_not_const(e: &Expr) -> FrontError {
    FrontError::const_expr(&e.loc, "expression is not a compile-time constant")
}

fn truthy(v: &Value, e: &Expr) -> Result<bool> {
    match &v.kind {
        ValueKind::Int(x) => Ok(*x != 0),
        ValueKind::Float(f) => Ok(*f != 0.0),
        ValueKind::Ptr { .. } => Ok(true),
        ValueKind::Aggregate(_) => Err(err_not_const(e)),
    }
}

/// Fold one typed expression.
pub fn eval(types: &TypeTable, symbols: &[Symbol], e: &Expr) -> Result<Value> {
    match &e.kind {
        ExprKind::IntConst(v) => Ok(Value::int(e.ty, *v)),
        ExprKind::FloatConst(f) => Ok(Value { ty: e.ty, kind: ValueKind::Float(*f) }),
        ExprKind::Str(id) => Ok(Value {
            ty: e.ty,
            kind: ValueKind::Ptr { base: PtrBase::Str(*id), offset: 0 },
        }),
        ExprKind::EnumConst(id) => {
            let sym = &symbols[id.0 as usize];
            match sym.kind {
                crate::ast::SymKind::Enumerator(v) => Ok(Value::int(e.ty, v as u64)),
                _ => Err(err_not_const(e)),
            }
        }
        ExprKind::Obj(_) => Err(err_not_const(e)),

        ExprKind::Unary { op, operand } => eval_unary(types, symbols, e, *op, operand),
        ExprKind::Binary { op, lhs, rhs } => eval_binary(types, symbols, e, *op, lhs, rhs),

        ExprKind::Cond { cond, then_expr, else_expr } => {
            let c = eval(types, symbols, cond)?;
            if truthy(&c, cond)? {
                let v = eval(types, symbols, then_expr)?;
                convert_value(types, v, e.ty, e)
            } else {
                let v = eval(types, symbols, else_expr)?;
                convert_value(types, v, e.ty, e)
            }
        }

        ExprKind::Cast { operand, .. } => {
            // A decayed array or function designator is an address.
            if (types.is_array(operand.ty.id) || types.is_function(operand.ty.id))
                && types.is_pointer(e.ty.id)
            {
                let (base, offset) = eval_address(types, symbols, operand)?;
                return Ok(Value { ty: e.ty, kind: ValueKind::Ptr { base, offset } });
            }
            let v = eval(types, symbols, operand)?;
            convert_value(types, v, e.ty, e)
        }

        ExprKind::CompoundLit { const_init: Some(v), .. } => Ok((**v).clone()),

        _ => Err(err_not_const(e)),
    }
}

/// Fold to a signed 64-bit integer; the mandate for case labels, array
/// bounds, bit-field widths, enum initializers, and `_Static_assert`.
pub fn eval_int(types: &TypeTable, symbols: &[Symbol], e: &Expr) -> Result<i64> {
    let v = eval(types, symbols, e)?;
    match v.kind {
        ValueKind::Int(raw) => Ok(raw as i64),
        _ => Err(FrontError::const_expr(&e.loc, "integer constant expression required")),
    }
}

fn eval_unary(
    types: &TypeTable,
    symbols: &[Symbol],
    e: &Expr,
    op: UnaryOp,
    operand: &Expr,
) -> Result<Value> {
    match op {
        UnaryOp::AddrOf => {
            let (base, offset) = eval_address(types, symbols, operand)?;
            Ok(Value { ty: e.ty, kind: ValueKind::Ptr { base, offset } })
        }
        UnaryOp::Plus => {
            let v = eval(types, symbols, operand)?;
            convert_value(types, v, e.ty, e)
        }
        UnaryOp::Minus => {
            let v = eval(types, symbols, operand)?;
            match v.kind {
                ValueKind::Int(raw) => {
                    let (bits, signed) = int_parts(types, e.ty).ok_or_else(|| err_not_const(e))?;
                    Ok(Value::int(e.ty, normalize_int(raw.wrapping_neg(), bits, signed)))
                }
                ValueKind::Float(f) => Ok(Value { ty: e.ty, kind: ValueKind::Float(-f) }),
                _ => Err(err_not_const(e)),
            }
        }
        UnaryOp::BitNot => {
            let v = eval(types, symbols, operand)?;
            match v.kind {
                ValueKind::Int(raw) => {
                    let (bits, signed) = int_parts(types, e.ty).ok_or_else(|| err_not_const(e))?;
                    Ok(Value::int(e.ty, normalize_int(!raw, bits, signed)))
                }
                _ => Err(err_not_const(e)),
            }
        }
        UnaryOp::LogNot => {
            let v = eval(types, symbols, operand)?;
            let t = truthy(&v, operand)?;
            Ok(Value::int(e.ty, (!t) as u64))
        }
        // A dereference folds only underneath an address-of.
        _ => Err(err_not_const(e)),
    }
}

/// Fold the address of an lvalue with static storage.
fn eval_address(types: &TypeTable, symbols: &[Symbol], e: &Expr) -> Result<(PtrBase, i64)> {
    match &e.kind {
        ExprKind::Obj(id) => {
            let sym = &symbols[id.0 as usize];
            if sym.static_storage || matches!(sym.kind, crate::ast::SymKind::Func) {
                Ok((PtrBase::Sym(*id), 0))
            } else {
                Err(FrontError::const_expr(
                    &e.loc,
                    format!("address of '{}' is not constant", sym.name),
                ))
            }
        }
        ExprKind::Str(id) => Ok((PtrBase::Str(*id), 0)),
        ExprKind::Member { base, offset, .. } => {
            let (b, off) = eval_address(types, symbols, base)?;
            Ok((b, off + *offset as i64))
        }
        ExprKind::Unary { op: UnaryOp::Deref, operand } => {
            let v = eval(types, symbols, operand)?;
            match v.kind {
                ValueKind::Ptr { base, offset } => Ok((base, offset)),
                _ => Err(err_not_const(e)),
            }
        }
        _ => Err(err_not_const(e)),
    }
}

fn eval_binary(
    types: &TypeTable,
    symbols: &[Symbol],
    e: &Expr,
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
) -> Result<Value> {
    match op {
        BinaryOp::LogAnd => {
            let l = eval(types, symbols, lhs)?;
            if !truthy(&l, lhs)? {
                return Ok(Value::int(e.ty, 0));
            }
            let r = eval(types, symbols, rhs)?;
            return Ok(Value::int(e.ty, truthy(&r, rhs)? as u64));
        }
        BinaryOp::LogOr => {
            let l = eval(types, symbols, lhs)?;
            if truthy(&l, lhs)? {
                return Ok(Value::int(e.ty, 1));
            }
            let r = eval(types, symbols, rhs)?;
            return Ok(Value::int(e.ty, truthy(&r, rhs)? as u64));
        }
        BinaryOp::Assign | BinaryOp::Comma => return Err(err_not_const(e)),
        _ => {}
    }

    let l = eval(types, symbols, lhs)?;
    let r = eval(types, symbols, rhs)?;

    // Pointer arithmetic: scale by the pointee size.
    if types.is_pointer(e.ty.id) && matches!(op, BinaryOp::Add | BinaryOp::Sub) {
        let pointee = types.pointee(e.ty.id).unwrap();
        let scale = types
            .size_of(pointee.id)
            .ok_or_else(|| FrontError::incomplete(&e.loc, "pointer arithmetic on incomplete type"))?
            as i64;
        let (ptr, idx, neg) = match (&l.kind, &r.kind) {
            (ValueKind::Ptr { .. }, ValueKind::Int(i)) => {
                (l.clone(), *i as i64, op == BinaryOp::Sub)
            }
            (ValueKind::Int(i), ValueKind::Ptr { .. }) => (r.clone(), *i as i64, false),
            _ => return Err(err_not_const(e)),
        };
        if let ValueKind::Ptr { base, offset } = ptr.kind {
            let delta = idx * scale;
            let offset = if neg { offset - delta } else { offset + delta };
            return Ok(Value { ty: e.ty, kind: ValueKind::Ptr { base, offset } });
        }
        unreachable!();
    }

    // Pointer difference.
    if op == BinaryOp::Sub {
        if let (ValueKind::Ptr { base: b1, offset: o1 }, ValueKind::Ptr { base: b2, offset: o2 }) =
            (&l.kind, &r.kind)
        {
            if b1 != b2 {
                return Err(err_not_const(e));
            }
            let pointee = types.pointee(lhs.ty.id).unwrap();
            let scale = types.size_of(pointee.id).unwrap_or(1) as i64;
            return Ok(Value::int(e.ty, ((o1 - o2) / scale) as u64));
        }
    }

    match (&l.kind, &r.kind) {
        (ValueKind::Int(a), ValueKind::Int(b)) => {
            eval_int_binary(types, e, op, *a, *b, lhs.ty)
        }
        (ValueKind::Float(_), _) | (_, ValueKind::Float(_)) => {
            let fa = as_float(&l).ok_or_else(|| err_not_const(e))?;
            let fb = as_float(&r).ok_or_else(|| err_not_const(e))?;
            eval_float_binary(e, op, fa, fb)
        }
        // Symbolic pointer comparisons fold only against null.
        (ValueKind::Ptr { .. }, ValueKind::Int(0)) if op == BinaryOp::Ne => {
            Ok(Value::int(e.ty, 1))
        }
        (ValueKind::Ptr { .. }, ValueKind::Int(0)) if op == BinaryOp::Eq => {
            Ok(Value::int(e.ty, 0))
        }
        _ => Err(err_not_const(e)),
    }
}

fn as_float(v: &Value) -> Option<f64> {
    match v.kind {
        ValueKind::Float(f) => Some(f),
        ValueKind::Int(i) => Some(i as i64 as f64),
        _ => None,
    }
}

fn eval_int_binary(
    types: &TypeTable,
    e: &Expr,
    op: BinaryOp,
    a: u64,
    b: u64,
    operand_ty: QualType,
) -> Result<Value> {
    // Comparisons interpret the operands by the converted operand type;
    // everything else by the node's own type.
    let is_cmp = matches!(
        op,
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
    );
    let (bits, signed) = if is_cmp {
        int_parts(types, operand_ty).unwrap_or((64, true))
    } else {
        int_parts(types, e.ty).ok_or_else(|| err_not_const(e))?
    };

    let div_zero = || FrontError::const_expr(&e.loc, "division by zero in constant expression");

    let raw = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(div_zero());
            }
            if signed {
                (a as i64).wrapping_div(b as i64) as u64
            } else {
                a / b
            }
        }
        BinaryOp::Rem => {
            if b == 0 {
                return Err(div_zero());
            }
            if signed {
                (a as i64).wrapping_rem(b as i64) as u64
            } else {
                a % b
            }
        }
        BinaryOp::Shl => a.wrapping_shl(b as u32),
        BinaryOp::Shr => {
            if signed {
                (a as i64).wrapping_shr(b as u32) as u64
            } else {
                // The left operand was normalized to its width, so a
                // logical 64-bit shift is exact.
                a.wrapping_shr(b as u32)
            }
        }
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitXor => a ^ b,
        BinaryOp::BitOr => a | b,
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne => {
            let res = if signed {
                let (x, y) = (a as i64, b as i64);
                match op {
                    BinaryOp::Lt => x < y,
                    BinaryOp::Gt => x > y,
                    BinaryOp::Le => x <= y,
                    BinaryOp::Ge => x >= y,
                    BinaryOp::Eq => x == y,
                    _ => x != y,
                }
            } else {
                let (x, y) = (
                    normalize_int(a, bits, false),
                    normalize_int(b, bits, false),
                );
                match op {
                    BinaryOp::Lt => x < y,
                    BinaryOp::Gt => x > y,
                    BinaryOp::Le => x <= y,
                    BinaryOp::Ge => x >= y,
                    BinaryOp::Eq => x == y,
                    _ => x != y,
                }
            };
            return Ok(Value::int(e.ty, res as u64));
        }
        _ => return Err(err_not_const(e)),
    };

    Ok(Value::int(e.ty, normalize_int(raw, bits, signed)))
}

fn eval_float_binary(e: &Expr, op: BinaryOp, a: f64, b: f64) -> Result<Value> {
    let v = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Lt => return Ok(Value::int(e.ty, (a < b) as u64)),
        BinaryOp::Gt => return Ok(Value::int(e.ty, (a > b) as u64)),
        BinaryOp::Le => return Ok(Value::int(e.ty, (a <= b) as u64)),
        BinaryOp::Ge => return Ok(Value::int(e.ty, (a >= b) as u64)),
        BinaryOp::Eq => return Ok(Value::int(e.ty, (a == b) as u64)),
        BinaryOp::Ne => return Ok(Value::int(e.ty, (a != b) as u64)),
        _ => return Err(err_not_const(e)),
    };
    Ok(Value { ty: e.ty, kind: ValueKind::Float(v) })
}

/// Apply a representation conversion, exactly as a cast would at run time.
pub fn convert_value(types: &TypeTable, v: Value, ty: QualType, at: &Expr) -> Result<Value> {
    if types.is_void(ty.id) {
        return Ok(Value { ty, kind: v.kind });
    }
    if let Some((bits, signed)) = int_parts(types, ty) {
        let raw = match v.kind {
            ValueKind::Int(raw) => raw,
            ValueKind::Float(f) => {
                if signed {
                    f as i64 as u64
                } else {
                    f as u64
                }
            }
            _ => {
                return Err(FrontError::const_expr(
                    &at.loc,
                    "pointer constant cast to integer is not foldable",
                ))
            }
        };
        return Ok(Value::int(ty, normalize_int(raw, bits, signed)));
    }
    if types.is_floating(ty.id) {
        let f = match v.kind {
            ValueKind::Float(f) => f,
            ValueKind::Int(raw) => {
                if types.is_signed(v.ty.id) || types.is_bool(v.ty.id) {
                    raw as i64 as f64
                } else {
                    raw as f64
                }
            }
            _ => return Err(err_not_const(at)),
        };
        // Round through f32 when the target is float.
        let f = match types.get(ty.id) {
            Type::Arith { kind: ArithKind::Float, .. } => f as f32 as f64,
            _ => f,
        };
        return Ok(Value { ty, kind: ValueKind::Float(f) });
    }
    if types.is_pointer(ty.id) {
        return match v.kind {
            ValueKind::Int(raw) => Ok(Value::int(ty, raw)),
            ValueKind::Ptr { base, offset } => {
                Ok(Value { ty, kind: ValueKind::Ptr { base, offset } })
            }
            _ => Err(err_not_const(at)),
        };
    }
    // Record or array: only identity-style reuse.
    Ok(Value { ty, kind: v.kind })
}

/// Fold a parsed initializer list into one constant aggregate (or scalar).
pub fn fold_initializers(
    types: &TypeTable,
    symbols: &[Symbol],
    ty: QualType,
    inits: &[Initializer],
) -> Result<Value> {
    if let [single] = inits {
        if single.path.is_empty() {
            let v = eval(types, symbols, &single.expr)?;
            return convert_value(types, v, ty, &single.expr);
        }
    }

    let mut entries = Vec::with_capacity(inits.len());
    for init in inits {
        let v = eval(types, symbols, &init.expr)?;
        let v = convert_value(types, v, init.ty, &init.expr)?;
        entries.push((init.offset, v));
    }
    Ok(Value { ty, kind: ValueKind::Aggregate(entries) })
}
