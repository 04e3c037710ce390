//! Pre-populates the file scope with the compiler builtins: the va_list
//! machinery, `__sync_synchronize`, and `__builtin_alloca`. The constructs
//! are ordinary identifiers afterwards; only `__builtin_va_arg` gets
//! special parsing (its second argument is a type name).

use crate::ast::{FuncSpec, Linkage, StorageClass, SymKind, Symbol, SymbolId};
use crate::scope::ScopeStack;
use token::SourceLoc;
use types::{Param, QualType, TypeTable};

pub const VA_LIST: &str = "__builtin_va_list";
pub const VA_START: &str = "__builtin_va_start";
pub const VA_ARG: &str = "__builtin_va_arg";
pub const VA_END: &str = "__builtin_va_end";
pub const VA_COPY: &str = "__builtin_va_copy";
pub const SYNC_SYNCHRONIZE: &str = "__sync_synchronize";
pub const ALLOCA: &str = "__builtin_alloca";

fn add(
    symbols: &mut Vec<Symbol>,
    scopes: &mut ScopeStack,
    name: &str,
    ty: QualType,
    kind: SymKind,
) {
    let id = SymbolId(symbols.len() as u32);
    symbols.push(Symbol {
        name: name.to_string(),
        ty,
        loc: SourceLoc::builtin(),
        kind,
        linkage: Linkage::External,
        storage: StorageClass::empty(),
        func_spec: FuncSpec::empty(),
        align: None,
        static_storage: false,
        defined: false,
        is_builtin: true,
    });
    scopes.insert_ordinary(name, id);
}

pub fn install(types: &mut TypeTable, symbols: &mut Vec<Symbol>, scopes: &mut ScopeStack) {
    let void_q = QualType::new(types.void_ty());
    let ulong_q = QualType::new(types.ulong_ty());
    // va_list is an opaque character pointer on this target.
    let va_list = QualType::new(types.char_ptr_ty());

    add(symbols, scopes, VA_LIST, va_list, SymKind::Typedef);

    let ap = |name: &str| Param { name: Some(name.to_string()), ty: va_list };

    // void __builtin_va_start(va_list, ...): the second argument is the
    // last named parameter, whatever its type.
    let start_ty = QualType::new(types.function(void_q, vec![ap("ap")], true));
    add(symbols, scopes, VA_START, start_ty, SymKind::Func);

    // __builtin_va_arg(ap, T): the prototype is a placeholder; the parser
    // captures the type argument into the call node and retypes it.
    let arg_ty = QualType::new(types.function(void_q, vec![ap("ap")], true));
    add(symbols, scopes, VA_ARG, arg_ty, SymKind::Func);

    let end_ty = QualType::new(types.function(void_q, vec![ap("ap")], false));
    add(symbols, scopes, VA_END, end_ty, SymKind::Func);

    let copy_ty = QualType::new(types.function(void_q, vec![ap("dst"), ap("src")], false));
    add(symbols, scopes, VA_COPY, copy_ty, SymKind::Func);

    let sync_ty = QualType::new(types.function(void_q, vec![], false));
    add(symbols, scopes, SYNC_SYNCHRONIZE, sync_ty, SymKind::Func);

    let void_ptr = QualType::new(types.void_ptr_ty());
    let alloca_ty = QualType::new(types.function(
        void_ptr,
        vec![Param { name: Some("size".to_string()), ty: ulong_q }],
        false,
    ));
    add(symbols, scopes, ALLOCA, alloca_ty, SymKind::Func);
}
