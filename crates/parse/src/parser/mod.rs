//! Single-pass recursive descent over the C17 grammar. Each production
//! returns a fully typed, checked node; name resolution, conversions, and
//! constant folding happen inline as the tree is built.

mod decl;
mod expr;
mod init;
mod stmt;

pub(crate) use decl::SpecPos;

use crate::ast::{
    Declaration, ExtDecl, FuncDef, StrId, StrLit, SymKind, Symbol, SymbolId, TranslationUnit,
};
use crate::builtins;
use crate::error::{FrontError, Result};
use crate::scope::ScopeStack;
use crate::stream::TokenStream;
use token::{SourceLoc, Tag, Token};
use types::{QualType, Type, TypeTable};

/// The nearest enclosing switch, collecting its case labels.
pub(crate) struct SwitchFrame {
    pub cases: Vec<(i64, i64)>,
    pub has_default: bool,
}

/// Per-function state: return type, label table, pending gotos.
pub(crate) struct FuncCtx {
    pub ret: QualType,
    pub name: String,
    pub labels: Vec<String>,
    pub gotos: Vec<(String, SourceLoc)>,
}

pub struct Parser {
    pub(crate) toks: TokenStream,
    pub(crate) types: TypeTable,
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) strings: Vec<StrLit>,
    pub(crate) scopes: ScopeStack,
    pub(crate) switches: Vec<SwitchFrame>,
    pub(crate) loop_depth: u32,
    pub(crate) func: Option<FuncCtx>,
    pub(crate) decls: Vec<ExtDecl>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut types = TypeTable::new();
        let mut symbols = Vec::new();
        let mut scopes = ScopeStack::new();
        builtins::install(&mut types, &mut symbols, &mut scopes);

        Self {
            toks: TokenStream::new(tokens),
            types,
            symbols,
            strings: Vec::new(),
            scopes,
            switches: Vec::new(),
            loop_depth: 0,
            func: None,
            decls: Vec::new(),
        }
    }

    /// Parse one translation unit to completion. Any error aborts.
    pub fn parse(mut self) -> Result<TranslationUnit> {
        while self.toks.has_next() {
            self.parse_external_decl()?;
        }
        Ok(TranslationUnit {
            types: self.types,
            symbols: self.symbols,
            strings: self.strings,
            decls: self.decls,
        })
    }

    // --- arenas ---

    pub(crate) fn add_symbol(&mut self, sym: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(sym);
        id
    }

    pub(crate) fn sym(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub(crate) fn sym_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub(crate) fn add_string(&mut self, lit: StrLit) -> StrId {
        let id = StrId(self.strings.len() as u32);
        self.strings.push(lit);
        id
    }

    // --- classification against the current scope ---

    /// The ordinary-namespace binding if it names a typedef.
    pub(crate) fn typedef_of(&self, name: &str) -> Option<QualType> {
        let id = self.scopes.find_ordinary(name)?;
        let sym = self.sym(id);
        match sym.kind {
            SymKind::Typedef => Some(sym.ty),
            _ => None,
        }
    }

    pub(crate) fn is_type_name(&self, tok: &Token) -> bool {
        if tok.is_type_spec_qual() {
            return true;
        }
        tok.is_identifier() && self.typedef_of(&tok.lexeme).is_some()
    }

    pub(crate) fn is_decl_start(&self, tok: &Token) -> bool {
        if tok.is_decl_spec() {
            return true;
        }
        tok.is_identifier() && self.typedef_of(&tok.lexeme).is_some()
    }

    // --- external declarations ---

    fn parse_external_decl(&mut self) -> Result<()> {
        if self.toks.eat(Tag::StaticAssert) {
            return self.parse_static_assert_decl();
        }

        let (base, attrs) = self.parse_decl_spec(SpecPos::Decl)?;
        if self.toks.eat(Tag::Semicolon) {
            // A struct/union/enum specifier declared for its side effects.
            return Ok(());
        }

        let first = self.parse_init_declarator(base, &attrs)?;
        self.try_asm()?;
        self.try_attribute_spec()?;

        if self.toks.test(Tag::LeftBrace) {
            let decl = first.ok_or_else(|| {
                FrontError::syntax(&self.toks.loc(), "unexpected function body")
            })?;
            return self.parse_func_def(decl);
        }

        if let Some(d) = first {
            self.decls.push(ExtDecl::Decl(d));
        }
        while self.toks.eat(Tag::Comma) {
            if let Some(d) = self.parse_init_declarator(base, &attrs)? {
                self.decls.push(ExtDecl::Decl(d));
            }
        }
        self.toks.expect(Tag::Semicolon)?;
        Ok(())
    }

    fn parse_func_def(&mut self, decl: Declaration) -> Result<()> {
        let sym_id = decl.sym;
        let (name, loc, ty, kind, defined) = {
            let s = self.sym(sym_id);
            (s.name.clone(), s.loc.clone(), s.ty, s.kind.clone(), s.defined)
        };

        if !matches!(kind, SymKind::Func) {
            return Err(FrontError::syntax(&loc, "expected ';' after declaration"));
        }
        if defined {
            return Err(FrontError::redefinition(&loc, format!("redefinition of '{}'", name)));
        }

        let (ret, params) = match self.types.get(ty.id) {
            Type::Function { ret, params, .. } => (*ret, params.clone()),
            _ => unreachable!("function symbol without function type"),
        };
        for p in &params {
            if p.name.is_none() {
                return Err(FrontError::syntax(&loc, "parameter name omitted"));
            }
        }

        self.sym_mut(sym_id).defined = true;
        self.func = Some(FuncCtx { ret, name, labels: Vec::new(), gotos: Vec::new() });

        let body = self.parse_compound_stmt(Some(&params))?;

        let ctx = self.func.take().unwrap();
        for (label, gloc) in &ctx.gotos {
            if !ctx.labels.contains(label) {
                return Err(FrontError::ty(gloc, format!("use of undeclared label '{}'", label)));
            }
        }

        self.decls.push(ExtDecl::Func(FuncDef { sym: sym_id, body, labels: ctx.labels }));
        Ok(())
    }
}
