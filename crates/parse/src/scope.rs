//! Stack of named environments with the two C namespaces: tags
//! (struct/union/enum names) and ordinary identifiers (objects, functions,
//! typedef names, enumerators). Lookup walks outward; insertion targets the
//! innermost scope. Ordinary bindings are handles into the symbol arena.

use crate::ast::{Linkage, StorageClass, SymbolId};
use std::collections::HashMap;
use token::SourceLoc;
use types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    File,
    Block,
    FuncProto,
    FuncBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Struct,
    Union,
    Enum,
}

#[derive(Debug, Clone)]
pub struct TagEntry {
    pub kind: TagKind,
    pub ty: TypeId,
    pub loc: SourceLoc,
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    tags: HashMap<String, TagEntry>,
    ordinary: HashMap<String, SymbolId>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Self { kind, tags: HashMap::new(), ordinary: HashMap::new() }
    }

    /// Tags of this scope, for promotion out of a struct body.
    pub fn take_tags(&mut self) -> HashMap<String, TagEntry> {
        std::mem::take(&mut self.tags)
    }
}

#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// A fresh stack holding only the file scope.
    pub fn new() -> Self {
        Self { scopes: vec![Scope::new(ScopeKind::File)] }
    }

    pub fn enter(&mut self, kind: ScopeKind) {
        debug_assert!(kind != ScopeKind::File);
        self.scopes.push(Scope::new(kind));
    }

    pub fn exit(&mut self) -> Scope {
        debug_assert!(self.scopes.len() > 1, "cannot exit the file scope");
        self.scopes.pop().unwrap()
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.scopes.last().unwrap().kind
    }

    pub fn is_file_scope(&self) -> bool {
        self.scopes.len() == 1
    }

    pub fn insert_ordinary(&mut self, name: impl Into<String>, id: SymbolId) {
        self.scopes.last_mut().unwrap().ordinary.insert(name.into(), id);
    }

    pub fn insert_tag(&mut self, name: impl Into<String>, entry: TagEntry) {
        self.scopes.last_mut().unwrap().tags.insert(name.into(), entry);
    }

    pub fn find_ordinary(&self, name: &str) -> Option<SymbolId> {
        self.scopes.iter().rev().find_map(|s| s.ordinary.get(name).copied())
    }

    pub fn find_ordinary_current(&self, name: &str) -> Option<SymbolId> {
        self.scopes.last().unwrap().ordinary.get(name).copied()
    }

    pub fn find_tag(&self, name: &str) -> Option<&TagEntry> {
        self.scopes.iter().rev().find_map(|s| s.tags.get(name))
    }

    pub fn find_tag_current(&self, name: &str) -> Option<&TagEntry> {
        self.scopes.last().unwrap().tags.get(name)
    }
}

/// Linkage of a declaration given its scope and storage class.
///
/// | scope | storage        | linkage  |
/// |-------|----------------|----------|
/// | file  | static         | internal |
/// | file  | extern or none | external |
/// | block | extern         | external |
/// | block | static or none | none     |
///
/// Functions get external linkage at block scope regardless of `extern`.
pub fn linkage_for(file_scope: bool, storage: StorageClass, is_function: bool) -> Linkage {
    if file_scope {
        if storage.contains(StorageClass::STATIC) {
            Linkage::Internal
        } else {
            Linkage::External
        }
    } else if is_function || storage.contains(StorageClass::EXTERN) {
        Linkage::External
    } else {
        Linkage::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outward_and_shadows() {
        let mut st = ScopeStack::new();
        st.insert_ordinary("x", SymbolId(0));
        st.enter(ScopeKind::Block);
        assert_eq!(st.find_ordinary("x"), Some(SymbolId(0)));
        assert_eq!(st.find_ordinary_current("x"), None);

        st.insert_ordinary("x", SymbolId(1));
        assert_eq!(st.find_ordinary("x"), Some(SymbolId(1)));

        st.exit();
        assert_eq!(st.find_ordinary("x"), Some(SymbolId(0)));
    }

    #[test]
    fn namespaces_are_independent() {
        let mut st = ScopeStack::new();
        st.insert_ordinary("S", SymbolId(7));
        st.insert_tag(
            "S",
            TagEntry { kind: TagKind::Struct, ty: TypeId(3), loc: SourceLoc::default() },
        );
        assert_eq!(st.find_ordinary("S"), Some(SymbolId(7)));
        assert_eq!(st.find_tag("S").unwrap().ty, TypeId(3));
    }

    #[test]
    fn linkage_table() {
        let none = StorageClass::empty();
        assert_eq!(linkage_for(true, StorageClass::STATIC, false), Linkage::Internal);
        assert_eq!(linkage_for(true, none, false), Linkage::External);
        assert_eq!(linkage_for(true, StorageClass::EXTERN, false), Linkage::External);
        assert_eq!(linkage_for(false, StorageClass::EXTERN, false), Linkage::External);
        assert_eq!(linkage_for(false, StorageClass::STATIC, false), Linkage::None);
        assert_eq!(linkage_for(false, none, false), Linkage::None);
        assert_eq!(linkage_for(false, none, true), Linkage::External);
    }
}
