//! Canonical, interned representation of C types.
//!
//! Every type lives in a [`TypeTable`] and is referred to by [`TypeId`].
//! All non-record types are hash-consed, so two structurally equal types
//! share one id and id equality is type equality. Struct/union types are
//! nominal: each definition gets a fresh id and is completed in place
//! exactly once.

mod convert;
mod layout;

pub use convert::CastKind;

use bitflags::bitflags;
use std::collections::HashMap;
use std::fmt;

/// Index of an interned type in a [`TypeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

bitflags! {
    /// C type qualifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Quals: u8 {
        const CONST    = 1 << 0;
        const RESTRICT = 1 << 1;
        const VOLATILE = 1 << 2;
    }
}

/// A type together with its qualifier bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QualType {
    pub id: TypeId,
    pub quals: Quals,
}

impl QualType {
    pub fn new(id: TypeId) -> Self {
        Self { id, quals: Quals::empty() }
    }

    pub fn with_quals(id: TypeId, quals: Quals) -> Self {
        Self { id, quals }
    }

    pub fn qualified(self, quals: Quals) -> Self {
        Self { id: self.id, quals: self.quals | quals }
    }

    pub fn unqualified(self) -> Self {
        Self { id: self.id, quals: Quals::empty() }
    }

    pub fn is_const(self) -> bool {
        self.quals.contains(Quals::CONST)
    }
}

/// Kind discriminator for arithmetic types. Interning is by (width, kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithKind {
    Bool,
    Signed,
    Unsigned,
    Float,
    Double,
    LongDouble,
}

impl ArithKind {
    pub fn is_integer(self) -> bool {
        matches!(self, ArithKind::Bool | ArithKind::Signed | ArithKind::Unsigned)
    }

    pub fn is_floating(self) -> bool {
        matches!(self, ArithKind::Float | ArithKind::Double | ArithKind::LongDouble)
    }
}

/// A function parameter after adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: Option<String>,
    pub ty: QualType,
}

/// One struct/union member with its computed layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    /// None for unnamed bit-fields and anonymous struct/union members.
    pub name: Option<String>,
    pub ty: QualType,
    pub offset: u64,
    /// Bit offset inside the storage unit, for bit-field members.
    pub bit_offset: Option<u32>,
    pub bit_width: Option<u32>,
    /// Explicit `_Alignas` alignment, if any.
    pub explicit_align: Option<u32>,
}

impl Member {
    pub fn is_bit_field(&self) -> bool {
        self.bit_width.is_some()
    }

    pub fn is_anonymous_record(&self) -> bool {
        self.name.is_none() && self.bit_width.is_none()
    }
}

/// Nominal struct/union data. Incomplete until the defining body is seen.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub is_struct: bool,
    pub tag: Option<String>,
    pub members: Vec<Member>,
    pub size: u64,
    pub align: u64,
    pub complete: bool,
    /// Last member is a flexible array.
    pub has_flexible: bool,
}

impl Record {
    /// Direct member lookup, no anonymous-member recursion.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name.as_deref() == Some(name))
    }
}

/// The type variants. Pointer/array/function reference other types through
/// `QualType` handles into the same table.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    Arith { width: u8, kind: ArithKind },
    Pointer { pointee: QualType },
    Array { elem: QualType, len: Option<u64> },
    Function { ret: QualType, params: Vec<Param>, variadic: bool },
    Record(Record),
}

/// Interning key for non-record types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeKey {
    Void,
    Arith(u8, ArithKind),
    Pointer(QualType),
    Array(QualType, Option<u64>),
    Function(QualType, Vec<(QualType, Option<String>)>, bool),
}

/// Result of member lookup through anonymous struct/union members.
#[derive(Debug, Clone)]
pub struct MemberRef {
    pub ty: QualType,
    /// Byte offset from the start of the outermost record.
    pub offset: u64,
    pub bit_offset: Option<u32>,
    pub bit_width: Option<u32>,
    /// Member index at each nesting level, outermost first.
    pub path: Vec<u32>,
}

pub struct TypeTable {
    types: Vec<Type>,
    dedup: HashMap<TypeKey, TypeId>,

    void_id: TypeId,
    bool_id: TypeId,
    char_id: TypeId,
    uchar_id: TypeId,
    short_id: TypeId,
    ushort_id: TypeId,
    int_id: TypeId,
    uint_id: TypeId,
    long_id: TypeId,
    ulong_id: TypeId,
    float_id: TypeId,
    double_id: TypeId,
    long_double_id: TypeId,
    void_ptr_id: TypeId,
    char_ptr_id: TypeId,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        let mut t = Self {
            types: Vec::new(),
            dedup: HashMap::new(),
            void_id: TypeId(0),
            bool_id: TypeId(0),
            char_id: TypeId(0),
            uchar_id: TypeId(0),
            short_id: TypeId(0),
            ushort_id: TypeId(0),
            int_id: TypeId(0),
            uint_id: TypeId(0),
            long_id: TypeId(0),
            ulong_id: TypeId(0),
            float_id: TypeId(0),
            double_id: TypeId(0),
            long_double_id: TypeId(0),
            void_ptr_id: TypeId(0),
            char_ptr_id: TypeId(0),
        };

        t.void_id = t.intern(Type::Void);
        t.bool_id = t.arith(1, ArithKind::Bool);
        t.char_id = t.arith(8, ArithKind::Signed);
        t.uchar_id = t.arith(8, ArithKind::Unsigned);
        t.short_id = t.arith(16, ArithKind::Signed);
        t.ushort_id = t.arith(16, ArithKind::Unsigned);
        t.int_id = t.arith(32, ArithKind::Signed);
        t.uint_id = t.arith(32, ArithKind::Unsigned);
        t.long_id = t.arith(64, ArithKind::Signed);
        t.ulong_id = t.arith(64, ArithKind::Unsigned);
        t.float_id = t.arith(32, ArithKind::Float);
        t.double_id = t.arith(64, ArithKind::Double);
        t.long_double_id = t.arith(80, ArithKind::LongDouble);
        t.void_ptr_id = t.pointer_to(QualType::new(t.void_id));
        t.char_ptr_id = t.pointer_to(QualType::new(t.char_id));

        t
    }

    /// Intern a type; structurally equal non-record types share an id.
    pub fn intern(&mut self, ty: Type) -> TypeId {
        if let Some(key) = Self::make_key(&ty) {
            if let Some(&id) = self.dedup.get(&key) {
                return id;
            }
            let id = TypeId(self.types.len() as u32);
            self.types.push(ty);
            self.dedup.insert(key, id);
            id
        } else {
            // Records have identity and are never deduplicated.
            let id = TypeId(self.types.len() as u32);
            self.types.push(ty);
            id
        }
    }

    fn make_key(ty: &Type) -> Option<TypeKey> {
        match ty {
            Type::Void => Some(TypeKey::Void),
            Type::Arith { width, kind } => Some(TypeKey::Arith(*width, *kind)),
            Type::Pointer { pointee } => Some(TypeKey::Pointer(*pointee)),
            Type::Array { elem, len } => Some(TypeKey::Array(*elem, *len)),
            Type::Function { ret, params, variadic } => Some(TypeKey::Function(
                *ret,
                params.iter().map(|p| (p.ty, p.name.clone())).collect(),
                *variadic,
            )),
            Type::Record(_) => None,
        }
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    // Pre-interned basics.
    pub fn void_ty(&self) -> TypeId { self.void_id }
    pub fn bool_ty(&self) -> TypeId { self.bool_id }
    pub fn char_ty(&self) -> TypeId { self.char_id }
    pub fn uchar_ty(&self) -> TypeId { self.uchar_id }
    pub fn short_ty(&self) -> TypeId { self.short_id }
    pub fn ushort_ty(&self) -> TypeId { self.ushort_id }
    pub fn int_ty(&self) -> TypeId { self.int_id }
    pub fn uint_ty(&self) -> TypeId { self.uint_id }
    pub fn long_ty(&self) -> TypeId { self.long_id }
    pub fn ulong_ty(&self) -> TypeId { self.ulong_id }
    pub fn float_ty(&self) -> TypeId { self.float_id }
    pub fn double_ty(&self) -> TypeId { self.double_id }
    pub fn long_double_ty(&self) -> TypeId { self.long_double_id }
    pub fn void_ptr_ty(&self) -> TypeId { self.void_ptr_id }
    pub fn char_ptr_ty(&self) -> TypeId { self.char_ptr_id }

    /// Canonical arithmetic type for (width, kind).
    pub fn arith(&mut self, width: u8, kind: ArithKind) -> TypeId {
        debug_assert!(matches!(width, 1 | 8 | 16 | 32 | 64 | 80));
        self.intern(Type::Arith { width, kind })
    }

    pub fn pointer_to(&mut self, pointee: QualType) -> TypeId {
        self.intern(Type::Pointer { pointee })
    }

    pub fn array_of(&mut self, elem: QualType, len: Option<u64>) -> TypeId {
        self.intern(Type::Array { elem, len })
    }

    pub fn function(&mut self, ret: QualType, params: Vec<Param>, variadic: bool) -> TypeId {
        self.intern(Type::Function { ret, params, variadic })
    }

    /// Fresh incomplete struct/union type.
    pub fn new_record(&mut self, is_struct: bool, tag: Option<String>) -> TypeId {
        self.intern(Type::Record(Record {
            is_struct,
            tag,
            members: Vec::new(),
            size: 0,
            align: 1,
            complete: false,
            has_flexible: false,
        }))
    }

    pub fn record(&self, id: TypeId) -> Option<&Record> {
        match self.get(id) {
            Type::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Complete a record in place: lay out the members and publish the
    /// size/alignment. All handles to the previously incomplete type
    /// observe the completion. Must be called at most once per record.
    pub fn complete_record(&mut self, id: TypeId, members: Vec<Member>, has_flexible: bool) {
        let (members, size, align) = {
            let is_struct = match self.get(id) {
                Type::Record(r) => {
                    debug_assert!(!r.complete, "record completed twice");
                    r.is_struct
                }
                _ => unreachable!("complete_record on non-record type"),
            };
            let mut members = members;
            let (size, align) = if is_struct {
                self.layout_struct(&mut members, has_flexible)
            } else {
                self.layout_union(&mut members)
            };
            (members, size, align)
        };

        if let Type::Record(r) = &mut self.types[id.0 as usize] {
            r.members = members;
            r.size = size;
            r.align = align;
            r.complete = true;
            r.has_flexible = has_flexible;
        }
    }

    // --- kind predicates ---

    pub fn is_void(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Void)
    }

    pub fn is_arith(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Arith { .. })
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Arith { kind, .. } if kind.is_integer())
    }

    pub fn is_floating(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Arith { kind, .. } if kind.is_floating())
    }

    pub fn is_bool(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Arith { kind: ArithKind::Bool, .. })
    }

    pub fn is_signed(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Arith { kind: ArithKind::Signed, .. })
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Pointer { .. })
    }

    pub fn is_array(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Array { .. })
    }

    pub fn is_function(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Function { .. })
    }

    pub fn is_record(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Record(_))
    }

    pub fn is_struct(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Record(r) if r.is_struct)
    }

    pub fn is_union(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Record(r) if !r.is_struct)
    }

    /// Scalar = arithmetic or pointer.
    pub fn is_scalar(&self, id: TypeId) -> bool {
        self.is_arith(id) || self.is_pointer(id)
    }

    pub fn is_complete(&self, id: TypeId) -> bool {
        match self.get(id) {
            Type::Void => false,
            Type::Arith { .. } | Type::Pointer { .. } => true,
            Type::Array { elem, len } => len.is_some() && self.is_complete(elem.id),
            Type::Function { .. } => false,
            Type::Record(r) => r.complete,
        }
    }

    pub fn pointee(&self, id: TypeId) -> Option<QualType> {
        match self.get(id) {
            Type::Pointer { pointee } => Some(*pointee),
            _ => None,
        }
    }

    pub fn elem(&self, id: TypeId) -> Option<QualType> {
        match self.get(id) {
            Type::Array { elem, .. } => Some(*elem),
            _ => None,
        }
    }

    pub fn array_len(&self, id: TypeId) -> Option<u64> {
        match self.get(id) {
            Type::Array { len, .. } => *len,
            _ => None,
        }
    }

    pub fn return_type(&self, id: TypeId) -> Option<QualType> {
        match self.get(id) {
            Type::Function { ret, .. } => Some(*ret),
            _ => None,
        }
    }

    /// Member lookup with anonymous struct/union recursion: a member of an
    /// unnamed record member is visible as if it were a direct member.
    pub fn member_ref(&self, id: TypeId, name: &str) -> Option<MemberRef> {
        let rec = self.record(id)?;
        for (i, m) in rec.members.iter().enumerate() {
            if m.name.as_deref() == Some(name) {
                return Some(MemberRef {
                    ty: m.ty,
                    offset: m.offset,
                    bit_offset: m.bit_offset,
                    bit_width: m.bit_width,
                    path: vec![i as u32],
                });
            }
            if m.is_anonymous_record() && self.is_record(m.ty.id) {
                if let Some(mut inner) = self.member_ref(m.ty.id, name) {
                    inner.offset += m.offset;
                    inner.path.insert(0, i as u32);
                    return Some(inner);
                }
            }
        }
        None
    }

    /// Human-readable spelling for diagnostics.
    pub fn display(&self, qt: QualType) -> String {
        let mut s = String::new();
        if qt.quals.contains(Quals::CONST) {
            s.push_str("const ");
        }
        if qt.quals.contains(Quals::VOLATILE) {
            s.push_str("volatile ");
        }
        if qt.quals.contains(Quals::RESTRICT) {
            s.push_str("restrict ");
        }
        s.push_str(&self.display_id(qt.id));
        s
    }

    fn display_id(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Void => "void".to_string(),
            Type::Arith { width, kind } => match (width, kind) {
                (1, ArithKind::Bool) => "_Bool".to_string(),
                (8, ArithKind::Signed) => "char".to_string(),
                (8, ArithKind::Unsigned) => "unsigned char".to_string(),
                (16, ArithKind::Signed) => "short".to_string(),
                (16, ArithKind::Unsigned) => "unsigned short".to_string(),
                (32, ArithKind::Signed) => "int".to_string(),
                (32, ArithKind::Unsigned) => "unsigned int".to_string(),
                (64, ArithKind::Signed) => "long".to_string(),
                (64, ArithKind::Unsigned) => "unsigned long".to_string(),
                (32, ArithKind::Float) => "float".to_string(),
                (64, ArithKind::Double) => "double".to_string(),
                (80, ArithKind::LongDouble) => "long double".to_string(),
                _ => format!("arith{}", width),
            },
            Type::Pointer { pointee } => format!("{}*", self.display(*pointee)),
            Type::Array { elem, len } => match len {
                Some(n) => format!("{}[{}]", self.display(*elem), n),
                None => format!("{}[]", self.display(*elem)),
            },
            Type::Function { ret, params, variadic } => {
                let mut ps: Vec<String> = params.iter().map(|p| self.display(p.ty)).collect();
                if *variadic {
                    ps.push("...".to_string());
                }
                if ps.is_empty() {
                    ps.push("void".to_string());
                }
                format!("{}({})", self.display(*ret), ps.join(", "))
            }
            Type::Record(r) => {
                let kw = if r.is_struct { "struct" } else { "union" };
                match &r.tag {
                    Some(t) => format!("{} {}", kw, t),
                    None => format!("{} <anonymous>", kw),
                }
            }
        }
    }
}

impl fmt::Debug for TypeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeTable").field("len", &self.types.len()).finish()
    }
}
