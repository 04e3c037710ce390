//! Typed AST. Expression and statement nodes are owned trees; the shared
//! entities (objects, functions, typedefs, enumerators) live in the
//! translation unit's symbol arena and are referenced by `SymbolId`, so no
//! node owns another through a back edge. Types are `TypeId` handles into
//! the table the unit owns.

use crate::fold::Value;
use bitflags::bitflags;
use token::SourceLoc;
use types::{QualType, TypeTable};

/// Handle into [`TranslationUnit::symbols`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// Handle into [`TranslationUnit::strings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrId(pub u32);

bitflags! {
    /// Storage-class specifiers as written. At most one may appear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StorageClass: u8 {
        const TYPEDEF  = 1 << 0;
        const EXTERN   = 1 << 1;
        const STATIC   = 1 << 2;
        const AUTO     = 1 << 3;
        const REGISTER = 1 << 4;
    }
}

bitflags! {
    /// Function specifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FuncSpec: u8 {
        const INLINE   = 1 << 0;
        const NORETURN = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    None,
    Internal,
    External,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymKind {
    Object,
    Func,
    Typedef,
    Enumerator(i64),
}

/// A named entity. Redeclarations with linkage merge into one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: QualType,
    pub loc: SourceLoc,
    pub kind: SymKind,
    pub linkage: Linkage,
    pub storage: StorageClass,
    pub func_spec: FuncSpec,
    /// Explicit `_Alignas` alignment.
    pub align: Option<u32>,
    /// File-scope object or `static` local.
    pub static_storage: bool,
    /// Object with an initializer, or function with a body.
    pub defined: bool,
    pub is_builtin: bool,
}

/// A decoded string literal: code units plus the element and array types.
/// The terminating null is included in `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct StrLit {
    pub data: Vec<u32>,
    pub elem: QualType,
    pub ty: QualType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    BitNot,
    LogNot,
    Deref,
    AddrOf,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    /// Short-circuit; codegen emits the branch structure.
    LogAnd,
    /// Short-circuit; codegen emits the branch structure.
    LogOr,
    Assign,
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub loc: SourceLoc,
    pub ty: QualType,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer or character constant; raw 64-bit value, interpreted by `ty`.
    IntConst(u64),
    FloatConst(f64),
    Str(StrId),
    /// Object or function reference.
    Obj(SymbolId),
    /// Enumerator reference; the value lives on the symbol.
    EnumConst(SymbolId),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Cond { cond: Box<Expr>, then_expr: Box<Expr>, else_expr: Box<Expr> },
    Cast { implicit: bool, operand: Box<Expr> },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        /// `__builtin_va_arg(ap, T)` carries T here; an ordinary expression
        /// cannot carry a type argument.
        va_arg_ty: Option<QualType>,
    },
    Member {
        base: Box<Expr>,
        name: String,
        /// Byte offset from the base object, anonymous members included.
        offset: u64,
        bit_offset: Option<u32>,
        bit_width: Option<u32>,
    },
    /// GNU statement expression; typed as the final expression statement.
    StmtExpr(Box<Stmt>),
    CompoundLit { inits: Vec<Initializer>, const_init: Option<Box<Value>> },
}

impl Expr {
    pub fn new(loc: SourceLoc, ty: QualType, kind: ExprKind) -> Self {
        Self { loc, ty, kind }
    }
}

/// Lvalue test. Needs the symbol arena to tell objects from functions.
pub fn is_lvalue(e: &Expr, symbols: &[Symbol]) -> bool {
    match &e.kind {
        ExprKind::Str(_) => true,
        ExprKind::Obj(id) => matches!(symbols[id.0 as usize].kind, SymKind::Object),
        ExprKind::Unary { op: UnaryOp::Deref, .. } => true,
        ExprKind::Member { base, .. } => is_lvalue(base, symbols),
        ExprKind::CompoundLit { .. } => true,
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub loc: SourceLoc,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(loc: SourceLoc, kind: StmtKind) -> Self {
        Self { loc, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Compound(Vec<Stmt>),
    Expr(Option<Expr>),
    If { cond: Expr, then_stmt: Box<Stmt>, else_stmt: Option<Box<Stmt>> },
    Switch {
        cond: Expr,
        body: Box<Stmt>,
        /// Folded (low, high) per case label; low == high for plain cases.
        cases: Vec<(i64, i64)>,
        has_default: bool,
    },
    While { cond: Expr, body: Box<Stmt> },
    DoWhile { body: Box<Stmt>, cond: Expr },
    For {
        init: Option<ForInit>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    Case { low: i64, high: i64, body: Box<Stmt> },
    Default(Box<Stmt>),
    Label { name: String, body: Box<Stmt> },
    Goto { label: String },
    Continue,
    Break,
    Return(Option<Expr>),
    Decl(Declaration),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Decl(Vec<Declaration>),
    Expr(Expr),
}

/// One step of an initializer's member path: which slot of which aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStep {
    pub agg: QualType,
    pub index: u32,
}

/// A lowered initializer entry: the scalar (or string/copy) expression, the
/// slot type, the navigation path from the outermost object, and the
/// resulting byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Initializer {
    pub ty: QualType,
    pub path: Vec<PathStep>,
    pub offset: u64,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub sym: SymbolId,
    pub inits: Vec<Initializer>,
    /// Folded constant for static-storage initializers.
    pub const_init: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub sym: SymbolId,
    pub body: Stmt,
    /// Labels defined in the body; every goto resolved against this set.
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtDecl {
    Decl(Declaration),
    Func(FuncDef),
}

/// The parse result: an ordered list of external declarations plus the
/// arenas every handle in the tree points into.
#[derive(Debug)]
pub struct TranslationUnit {
    pub types: TypeTable,
    pub symbols: Vec<Symbol>,
    pub strings: Vec<StrLit>,
    pub decls: Vec<ExtDecl>,
}

impl TranslationUnit {
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn string(&self, id: StrId) -> &StrLit {
        &self.strings[id.0 as usize]
    }

    /// First symbol with the given name, in declaration order. File-scope
    /// entities precede the locals of later function bodies.
    pub fn find_symbol(&self, name: &str) -> Option<(SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .find(|(_, s)| s.name == name)
            .map(|(i, s)| (SymbolId(i as u32), s))
    }
}
