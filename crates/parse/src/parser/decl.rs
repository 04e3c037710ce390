//! Declaration grammar: specifier sets, declarators (inside-out), struct
//! and enum bodies, parameter lists, type names, and the tolerated GNU
//! attribute/asm surface.

use super::expr::decode_string_token;
use super::Parser;
use crate::ast::{
    Declaration, FuncSpec, Linkage, StorageClass, SymKind, Symbol, SymbolId,
};
use crate::error::{FrontError, Result};
use crate::scope::{linkage_for, ScopeKind, TagEntry, TagKind};
use bitflags::bitflags;
use token::{SourceLoc, Tag, Token};
use types::{Member, Param, QualType, Quals, TypeId};

bitflags! {
    /// Accumulator for the type-specifier bag. Each specifier names the set
    /// of other specifiers it may combine with; a forbidden transition is
    /// "two or more data types in declaration specifiers".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct TypeSpec: u32 {
        const VOID     = 1 << 0;
        const CHAR     = 1 << 1;
        const SHORT    = 1 << 2;
        const INT      = 1 << 3;
        const LONG     = 1 << 4;
        const LONGLONG = 1 << 5;
        const FLOAT    = 1 << 6;
        const DOUBLE   = 1 << 7;
        const SIGNED   = 1 << 8;
        const UNSIGNED = 1 << 9;
        const BOOL     = 1 << 10;
        const RECORD   = 1 << 11;
        const ENUM     = 1 << 12;
        const NAMED    = 1 << 13;
        const TYPEOF   = 1 << 14;

        const COMP_CHAR   = Self::SIGNED.bits() | Self::UNSIGNED.bits();
        const COMP_SHORT  = Self::SIGNED.bits() | Self::UNSIGNED.bits() | Self::INT.bits();
        const COMP_INT    = Self::SIGNED.bits() | Self::UNSIGNED.bits() | Self::SHORT.bits()
                          | Self::LONG.bits() | Self::LONGLONG.bits();
        const COMP_LONG   = Self::SIGNED.bits() | Self::UNSIGNED.bits() | Self::LONG.bits()
                          | Self::INT.bits() | Self::DOUBLE.bits();
        const COMP_DOUBLE = Self::LONG.bits();
        const COMP_SIGN   = Self::CHAR.bits() | Self::SHORT.bits() | Self::INT.bits()
                          | Self::LONG.bits() | Self::LONGLONG.bits();
    }
}

/// Where a specifier set appears: full declarations allow storage classes,
/// function specifiers, and `_Alignas`; struct members, parameters, and
/// type names allow only type specifiers and qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpecPos {
    Decl,
    SpecQual,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DeclAttrs {
    pub storage: StorageClass,
    pub func_spec: FuncSpec,
    pub align: Option<u32>,
}

impl Parser {
    // --- declaration specifiers ---

    pub(crate) fn parse_decl_spec(&mut self, pos: SpecPos) -> Result<(QualType, DeclAttrs)> {
        let mut spec = TypeSpec::empty();
        let mut quals = Quals::empty();
        let mut attrs = DeclAttrs::default();
        let mut ty: Option<QualType> = None;
        let mut last_loc = self.toks.loc();

        let two_types = |loc: &SourceLoc| {
            FrontError::syntax(loc, "two or more data types in declaration specifiers")
        };

        macro_rules! merge {
            ($loc:expr, $bit:expr, $comp:expr) => {{
                if spec.intersects(!$comp) {
                    return Err(two_types(&$loc));
                }
                spec |= $bit;
            }};
        }

        loop {
            let tok = self.toks.peek().clone();
            last_loc = tok.loc.clone();
            match tok.tag {
                Tag::Extension => {
                    self.toks.next();
                }
                Tag::Attribute => {
                    self.try_attribute_spec()?;
                }

                // Storage-class specifiers, at most one.
                Tag::Typedef | Tag::Extern | Tag::Static | Tag::Auto | Tag::Register => {
                    self.toks.next();
                    if pos == SpecPos::SpecQual {
                        return Err(FrontError::syntax(
                            &tok.loc,
                            "storage class specifier is not allowed here",
                        ));
                    }
                    if !attrs.storage.is_empty() {
                        return Err(FrontError::syntax(&tok.loc, "duplicated storage class specifier"));
                    }
                    attrs.storage |= match tok.tag {
                        Tag::Typedef => StorageClass::TYPEDEF,
                        Tag::Extern => StorageClass::EXTERN,
                        Tag::Static => StorageClass::STATIC,
                        Tag::Auto => StorageClass::AUTO,
                        _ => StorageClass::REGISTER,
                    };
                }
                Tag::ThreadLocal => {
                    return Err(FrontError::unsupported(&tok.loc, "_Thread_local"));
                }

                // Type specifiers.
                Tag::Void => {
                    self.toks.next();
                    merge!(tok.loc, TypeSpec::VOID, TypeSpec::empty());
                }
                Tag::Char => {
                    self.toks.next();
                    merge!(tok.loc, TypeSpec::CHAR, TypeSpec::COMP_CHAR);
                }
                Tag::Short => {
                    self.toks.next();
                    merge!(tok.loc, TypeSpec::SHORT, TypeSpec::COMP_SHORT);
                }
                Tag::Int => {
                    self.toks.next();
                    merge!(tok.loc, TypeSpec::INT, TypeSpec::COMP_INT);
                }
                Tag::Long => {
                    self.toks.next();
                    if spec.intersects(!TypeSpec::COMP_LONG) {
                        return Err(two_types(&tok.loc));
                    }
                    if spec.contains(TypeSpec::LONG) {
                        spec.remove(TypeSpec::LONG);
                        spec |= TypeSpec::LONGLONG;
                    } else {
                        spec |= TypeSpec::LONG;
                    }
                }
                Tag::Float => {
                    self.toks.next();
                    merge!(tok.loc, TypeSpec::FLOAT, TypeSpec::empty());
                }
                Tag::Double => {
                    self.toks.next();
                    merge!(tok.loc, TypeSpec::DOUBLE, TypeSpec::COMP_DOUBLE);
                }
                Tag::Signed => {
                    self.toks.next();
                    merge!(tok.loc, TypeSpec::SIGNED, TypeSpec::COMP_SIGN);
                }
                Tag::Unsigned => {
                    self.toks.next();
                    merge!(tok.loc, TypeSpec::UNSIGNED, TypeSpec::COMP_SIGN);
                }
                Tag::Bool => {
                    self.toks.next();
                    merge!(tok.loc, TypeSpec::BOOL, TypeSpec::empty());
                }
                Tag::Struct | Tag::Union => {
                    self.toks.next();
                    if !spec.is_empty() {
                        return Err(two_types(&tok.loc));
                    }
                    let rec = self.parse_struct_union_spec(tok.tag == Tag::Struct)?;
                    ty = Some(QualType::new(rec));
                    spec |= TypeSpec::RECORD;
                }
                Tag::Enum => {
                    self.toks.next();
                    if !spec.is_empty() {
                        return Err(two_types(&tok.loc));
                    }
                    let e = self.parse_enum_spec()?;
                    ty = Some(QualType::new(e));
                    spec |= TypeSpec::ENUM;
                }
                Tag::Complex => {
                    return Err(FrontError::unsupported(&tok.loc, "_Complex"));
                }
                Tag::Atomic => {
                    return Err(FrontError::unsupported(&tok.loc, "_Atomic"));
                }

                // Type qualifiers.
                Tag::Const => {
                    self.toks.next();
                    quals |= Quals::CONST;
                }
                Tag::Restrict => {
                    self.toks.next();
                    quals |= Quals::RESTRICT;
                }
                Tag::Volatile => {
                    self.toks.next();
                    quals |= Quals::VOLATILE;
                }

                // Function specifiers.
                Tag::Inline | Tag::Noreturn => {
                    self.toks.next();
                    if pos == SpecPos::SpecQual {
                        return Err(FrontError::syntax(
                            &tok.loc,
                            "function specifier is not allowed here",
                        ));
                    }
                    let fs = if tok.tag == Tag::Inline { FuncSpec::INLINE } else { FuncSpec::NORETURN };
                    if attrs.func_spec.contains(fs) {
                        log::warn!("{}: duplicate function specifier", tok.loc);
                    }
                    attrs.func_spec |= fs;
                }

                Tag::Alignas => {
                    self.toks.next();
                    if pos == SpecPos::SpecQual {
                        return Err(FrontError::syntax(&tok.loc, "_Alignas is not allowed here"));
                    }
                    let a = self.parse_alignas()?;
                    if a > 0 {
                        attrs.align = Some(attrs.align.map_or(a, |prev| prev.max(a)));
                    }
                }

                Tag::Typeof => {
                    self.toks.next();
                    if !spec.is_empty() {
                        return Err(two_types(&tok.loc));
                    }
                    ty = Some(self.parse_typeof()?);
                    spec |= TypeSpec::TYPEOF;
                }

                Tag::Identifier if spec.is_empty() => {
                    match self.typedef_of(&tok.lexeme) {
                        Some(t) => {
                            self.toks.next();
                            ty = Some(t);
                            spec |= TypeSpec::NAMED;
                        }
                        None => break,
                    }
                }

                _ => break,
            }
        }

        if spec.is_empty() && quals.is_empty() && attrs.storage.is_empty() {
            return Err(FrontError::syntax(&last_loc, "type specifier missing"));
        }

        let base = match ty {
            Some(t) => t,
            None => QualType::new(self.resolve_type_spec(spec, &last_loc)?),
        };

        self.try_attribute_spec()?;
        Ok((base.qualified(quals), attrs))
    }

    fn resolve_type_spec(&mut self, spec: TypeSpec, loc: &SourceLoc) -> Result<TypeId> {
        let t = &mut self.types;
        let unsigned = spec.contains(TypeSpec::UNSIGNED);
        let id = if spec.contains(TypeSpec::VOID) {
            t.void_ty()
        } else if spec.contains(TypeSpec::BOOL) {
            t.bool_ty()
        } else if spec.contains(TypeSpec::FLOAT) {
            t.float_ty()
        } else if spec.contains(TypeSpec::DOUBLE) {
            if spec.contains(TypeSpec::LONG) {
                t.long_double_ty()
            } else {
                t.double_ty()
            }
        } else if spec.contains(TypeSpec::CHAR) {
            if unsigned {
                t.uchar_ty()
            } else {
                t.char_ty()
            }
        } else if spec.contains(TypeSpec::SHORT) {
            if unsigned {
                t.ushort_ty()
            } else {
                t.short_ty()
            }
        } else if spec.intersects(TypeSpec::LONG | TypeSpec::LONGLONG) {
            if unsigned {
                t.ulong_ty()
            } else {
                t.long_ty()
            }
        } else if spec.intersects(TypeSpec::INT | TypeSpec::SIGNED | TypeSpec::UNSIGNED) {
            if unsigned {
                t.uint_ty()
            } else {
                t.int_ty()
            }
        } else {
            return Err(FrontError::syntax(loc, "type specifier missing"));
        };
        Ok(id)
    }

    // --- struct / union ---

    fn parse_struct_union_spec(&mut self, is_struct: bool) -> Result<TypeId> {
        self.try_attribute_spec()?;
        let kind = if is_struct { TagKind::Struct } else { TagKind::Union };
        let kw = if is_struct { "struct" } else { "union" };

        let tok = self.toks.peek().clone();
        if tok.is_identifier() {
            self.toks.next();
            let tag_name = tok.lexeme.clone();

            if self.toks.eat(Tag::LeftBrace) {
                // Definition. The tag is visible from the opening brace so
                // members can point back at the type being defined.
                let existing = self.scopes.find_tag_current(&tag_name).map(|e| (e.kind, e.ty));
                let rec = match existing {
                    None => {
                        let rec = self.types.new_record(is_struct, Some(tag_name.clone()));
                        self.scopes.insert_tag(
                            &tag_name,
                            TagEntry { kind, ty: rec, loc: tok.loc.clone() },
                        );
                        rec
                    }
                    Some((prev_kind, rec)) => {
                        if prev_kind != kind {
                            return Err(FrontError::redefinition(
                                &tok.loc,
                                format!("use of '{}' with a mismatched tag kind", tag_name),
                            ));
                        }
                        if self.types.is_complete(rec) {
                            return Err(FrontError::redefinition(
                                &tok.loc,
                                format!("redefinition of '{} {}'", kw, tag_name),
                            ));
                        }
                        rec
                    }
                };
                self.parse_struct_decl_list(rec)?;
                self.toks.expect(Tag::RightBrace)?;
                self.try_attribute_spec()?;
                Ok(rec)
            } else {
                // Reference or forward declaration.
                if let Some(entry) = self.scopes.find_tag(&tag_name) {
                    if entry.kind != kind {
                        return Err(FrontError::redefinition(
                            &tok.loc,
                            format!("use of '{}' with a mismatched tag kind", tag_name),
                        ));
                    }
                    return Ok(entry.ty);
                }
                let rec = self.types.new_record(is_struct, Some(tag_name.clone()));
                self.scopes
                    .insert_tag(&tag_name, TagEntry { kind, ty: rec, loc: tok.loc.clone() });
                Ok(rec)
            }
        } else {
            self.toks.expect(Tag::LeftBrace)?;
            let rec = self.types.new_record(is_struct, None);
            self.parse_struct_decl_list(rec)?;
            self.toks.expect(Tag::RightBrace)?;
            self.try_attribute_spec()?;
            Ok(rec)
        }
    }

    fn parse_struct_decl_list(&mut self, rec: TypeId) -> Result<()> {
        let is_struct = self.types.record(rec).map(|r| r.is_struct).unwrap_or(true);

        // Tags declared inside the body get their own scope and are
        // promoted to the enclosing scope on completion.
        self.scopes.enter(ScopeKind::Block);

        let mut members: Vec<Member> = Vec::new();
        let mut has_flex = false;

        while !self.toks.test(Tag::RightBrace) {
            if !self.toks.has_next() {
                return Err(FrontError::syntax(&self.toks.loc(), "premature end of input"));
            }
            if has_flex {
                return Err(FrontError::ty(
                    &self.toks.loc(),
                    "flexible array member must be the last member",
                ));
            }
            if self.toks.eat(Tag::StaticAssert) {
                self.parse_static_assert_decl()?;
                continue;
            }

            let (base, _attrs) = self.parse_decl_spec(SpecPos::SpecQual)?;

            if self.toks.eat(Tag::Semicolon) {
                // A bare specifier: either an anonymous struct/union member
                // or a declaration that declares nothing.
                if self.is_anonymous_record(base.id) {
                    members.push(Member {
                        name: None,
                        ty: base,
                        offset: 0,
                        bit_offset: None,
                        bit_width: None,
                        explicit_align: None,
                    });
                } else {
                    log::warn!("{}: declaration does not declare anything", self.toks.loc());
                }
                continue;
            }

            loop {
                let m = self.parse_struct_declarator(base, is_struct, &members, &mut has_flex)?;
                if let Some(m) = m {
                    members.push(m);
                }
                if !self.toks.eat(Tag::Comma) {
                    break;
                }
            }
            self.toks.expect(Tag::Semicolon)?;
        }

        self.types.complete_record(rec, members, has_flex);

        let mut inner = self.scopes.exit();
        for (name, entry) in inner.take_tags() {
            if self.scopes.find_tag_current(&name).is_some() {
                return Err(FrontError::redefinition(
                    &entry.loc,
                    format!("redefinition of tag '{}'", name),
                ));
            }
            self.scopes.insert_tag(name, entry);
        }
        Ok(())
    }

    fn parse_struct_declarator(
        &mut self,
        base: QualType,
        is_struct: bool,
        members: &[Member],
        has_flex: &mut bool,
    ) -> Result<Option<Member>> {
        let loc = self.toks.loc();
        if *has_flex {
            return Err(FrontError::ty(&loc, "flexible array member must be the last member"));
        }

        // Unnamed bit-field: `int : 3;`
        if self.toks.eat(Tag::Colon) {
            let width = self.parse_bit_width(&loc, base, None)?;
            return Ok(Some(Member {
                name: None,
                ty: base,
                offset: 0,
                bit_offset: None,
                bit_width: Some(width),
                explicit_align: None,
            }));
        }

        let (ntok, ty) = self.parse_declarator(base)?;
        self.try_attribute_spec()?;

        let bit_width = if self.toks.eat(Tag::Colon) {
            Some(self.parse_bit_width(&loc, ty, ntok.as_ref())?)
        } else {
            None
        };

        let ntok = match ntok {
            Some(t) => t,
            None => {
                if bit_width.is_some() {
                    // `int :3` after a declarator-less parse.
                    return Ok(Some(Member {
                        name: None,
                        ty,
                        offset: 0,
                        bit_offset: None,
                        bit_width,
                        explicit_align: None,
                    }));
                }
                if self.is_anonymous_record(ty.id) {
                    return Ok(Some(Member {
                        name: None,
                        ty,
                        offset: 0,
                        bit_offset: None,
                        bit_width: None,
                        explicit_align: None,
                    }));
                }
                return Err(FrontError::syntax(&loc, "declaration does not declare anything"));
            }
        };
        let name = ntok.lexeme.clone();

        if members.iter().any(|m| m.name.as_deref() == Some(name.as_str())) {
            return Err(FrontError::redefinition(
                &ntok.loc,
                format!("duplicate member '{}'", name),
            ));
        }
        if self.types.is_function(ty.id) {
            return Err(FrontError::ty(
                &ntok.loc,
                format!("field '{}' declared as a function", name),
            ));
        }

        if !self.types.is_complete(ty.id) {
            // An incomplete array in trailing position is a flexible array
            // member; anything else is an error.
            let flexible = self.types.is_array(ty.id)
                && self.types.array_len(ty.id).is_none()
                && self
                    .types
                    .elem(ty.id)
                    .map(|e| self.types.is_complete(e.id))
                    .unwrap_or(false);
            if flexible {
                if !is_struct {
                    return Err(FrontError::ty(
                        &ntok.loc,
                        "flexible array member in a union",
                    ));
                }
                if members.is_empty() {
                    return Err(FrontError::ty(
                        &ntok.loc,
                        "flexible array member in an otherwise empty struct",
                    ));
                }
                *has_flex = true;
                return Ok(Some(Member {
                    name: Some(name),
                    ty,
                    offset: 0,
                    bit_offset: None,
                    bit_width: None,
                    explicit_align: None,
                }));
            }
            return Err(FrontError::incomplete(
                &ntok.loc,
                format!("field '{}' has incomplete type", name),
            ));
        }

        Ok(Some(Member {
            name: Some(name),
            ty,
            offset: 0,
            bit_offset: None,
            bit_width,
            explicit_align: None,
        }))
    }

    fn parse_bit_width(
        &mut self,
        loc: &SourceLoc,
        ty: QualType,
        name: Option<&Token>,
    ) -> Result<u32> {
        if !self.types.is_integer(ty.id) {
            return Err(FrontError::ty(loc, "bit-field has non-integer type"));
        }
        let w = self.parse_const_int()?;
        let max_bits = self.types.size_of(ty.id).unwrap_or(4) * 8;
        if w < 0 || w as u64 > max_bits {
            return Err(FrontError::ty(loc, format!("bit-field width {} out of range", w)));
        }
        if w == 0 {
            if let Some(n) = name {
                return Err(FrontError::ty(
                    &n.loc,
                    format!("named bit-field '{}' has zero width", n.lexeme),
                ));
            }
        }
        Ok(w as u32)
    }

    fn is_anonymous_record(&self, id: TypeId) -> bool {
        self.types.record(id).map(|r| r.tag.is_none()).unwrap_or(false)
    }

    // --- enum ---

    fn parse_enum_spec(&mut self) -> Result<TypeId> {
        self.try_attribute_spec()?;
        let int_id = self.types.int_ty();

        let tok = self.toks.peek().clone();
        if tok.is_identifier() {
            self.toks.next();
            let name = tok.lexeme.clone();
            if self.toks.eat(Tag::LeftBrace) {
                if self.scopes.find_tag_current(&name).is_some() {
                    return Err(FrontError::redefinition(
                        &tok.loc,
                        format!("redefinition of enumeration '{}'", name),
                    ));
                }
                self.scopes.insert_tag(
                    &name,
                    TagEntry { kind: TagKind::Enum, ty: int_id, loc: tok.loc.clone() },
                );
                self.parse_enumerator_list()?;
                self.toks.expect(Tag::RightBrace)?;
                Ok(int_id)
            } else {
                // Enums admit no forward declarations.
                match self.scopes.find_tag(&name) {
                    Some(e) if e.kind == TagKind::Enum => Ok(e.ty),
                    Some(_) => Err(FrontError::redefinition(
                        &tok.loc,
                        format!("use of '{}' with a mismatched tag kind", name),
                    )),
                    None => {
                        Err(FrontError::ty(&tok.loc, format!("unknown enumeration '{}'", name)))
                    }
                }
            }
        } else {
            self.toks.expect(Tag::LeftBrace)?;
            self.parse_enumerator_list()?;
            self.toks.expect(Tag::RightBrace)?;
            Ok(int_id)
        }
    }

    fn parse_enumerator_list(&mut self) -> Result<()> {
        let int_q = QualType::new(self.types.int_ty());
        let mut val: i64 = 0;

        loop {
            let tok = self.toks.expect(Tag::Identifier)?;
            self.try_attribute_spec()?;
            let name = tok.lexeme.clone();

            if self.scopes.find_ordinary_current(&name).is_some() {
                return Err(FrontError::redefinition(
                    &tok.loc,
                    format!("redefinition of enumerator '{}'", name),
                ));
            }

            if self.toks.eat(Tag::Equal) {
                // Enumerators are 32-bit int constants.
                val = self.parse_const_int()? as i32 as i64;
            }

            let id = self.add_symbol(Symbol {
                name: name.clone(),
                ty: int_q,
                loc: tok.loc,
                kind: SymKind::Enumerator(val),
                linkage: Linkage::None,
                storage: StorageClass::empty(),
                func_spec: FuncSpec::empty(),
                align: None,
                static_storage: false,
                defined: true,
                is_builtin: false,
            });
            self.scopes.insert_ordinary(name, id);

            val = val.wrapping_add(1);
            self.toks.eat(Tag::Comma);
            if self.toks.test(Tag::RightBrace) {
                return Ok(());
            }
        }
    }

    // --- _Alignas / typeof / _Static_assert ---

    fn parse_alignas(&mut self) -> Result<u32> {
        self.toks.expect(Tag::LeftParen)?;
        let loc = self.toks.loc();

        let align: i64 = if self.is_type_name(self.toks.peek()) {
            let ty = self.parse_type_name()?;
            self.types.align_of(ty.id).ok_or_else(|| {
                FrontError::incomplete(&loc, "_Alignas of an incomplete type")
            })? as i64
        } else {
            self.parse_const_int()?
        };
        self.toks.expect(Tag::RightParen)?;

        if align < 0 || (align & (align - 1)) != 0 {
            return Err(FrontError::ty(&loc, "requested alignment is not a power of 2"));
        }
        Ok(align as u32)
    }

    pub(crate) fn parse_typeof(&mut self) -> Result<QualType> {
        self.toks.expect(Tag::LeftParen)?;
        let ty = if self.is_type_name(self.toks.peek()) {
            self.parse_type_name()?
        } else {
            // The operand is typed but never evaluated.
            let e = self.parse_expr()?;
            e.ty
        };
        self.toks.expect(Tag::RightParen)?;
        Ok(ty)
    }

    pub(crate) fn parse_static_assert_decl(&mut self) -> Result<()> {
        self.toks.expect(Tag::LeftParen)?;
        let loc = self.toks.loc();
        let val = self.parse_const_int()?;
        self.toks.expect(Tag::Comma)?;
        let msg_tok = self.toks.expect(Tag::StringLiteral)?;
        let (_, units) = decode_string_token(&msg_tok)?;
        self.toks.expect(Tag::RightParen)?;
        self.toks.expect(Tag::Semicolon)?;

        if val == 0 {
            let msg: String = units
                .into_iter()
                .filter_map(char::from_u32)
                .collect();
            return Err(FrontError::static_assert(&loc, msg));
        }
        Ok(())
    }

    // --- declarators ---

    pub(crate) fn parse_declarator(&mut self, base: QualType) -> Result<(Option<Token>, QualType)> {
        let base = self.parse_pointer(base)?;
        self.parse_direct_declarator(base)
    }

    fn parse_pointer(&mut self, mut ty: QualType) -> Result<QualType> {
        while self.toks.eat(Tag::Star) {
            ty = QualType::new(self.types.pointer_to(ty));
            ty = self.parse_type_qual_list(ty)?;
        }
        Ok(ty)
    }

    fn parse_type_qual_list(&mut self, mut ty: QualType) -> Result<QualType> {
        loop {
            let tok = self.toks.peek().clone();
            match tok.tag {
                Tag::Const => {
                    self.toks.next();
                    ty.quals |= Quals::CONST;
                }
                Tag::Restrict => {
                    self.toks.next();
                    ty.quals |= Quals::RESTRICT;
                }
                Tag::Volatile => {
                    self.toks.next();
                    ty.quals |= Quals::VOLATILE;
                }
                Tag::Atomic => {
                    return Err(FrontError::unsupported(&tok.loc, "_Atomic"));
                }
                _ => return Ok(ty),
            }
        }
    }

    fn parse_direct_declarator(&mut self, base: QualType) -> Result<(Option<Token>, QualType)> {
        if self.toks.test(Tag::Identifier) {
            let tok = self.toks.next();
            let ty = self.parse_direct_declarator_tail(base)?;
            Ok((Some(tok), ty))
        } else if self.toks.test(Tag::LeftParen) && self.grouped_declarator_ahead() {
            // Grouped declarator: the base type is not yet known on the way
            // in, so skip the group against a dummy base, apply the tail
            // suffixes to the real base, then rewind and re-parse the group
            // around the suffixed type.
            self.toks.next();
            let begin = self.toks.mark();
            let dummy = QualType::new(self.types.int_ty());
            let _ = self.parse_declarator(dummy)?;
            self.toks.expect(Tag::RightParen)?;

            let after = self.parse_direct_declarator_tail(base)?;
            let end = self.toks.mark();

            self.toks.rewind(begin);
            let (tok, ty) = self.parse_declarator(after)?;
            self.toks.expect(Tag::RightParen)?;
            self.toks.rewind(end);
            Ok((tok, ty))
        } else {
            let ty = self.parse_direct_declarator_tail(base)?;
            Ok((None, ty))
        }
    }

    /// '(' opens a grouped declarator unless it starts a parameter list.
    fn grouped_declarator_ahead(&self) -> bool {
        let next = self.toks.peek_n(1);
        next.tag != Tag::RightParen && !self.is_type_name(next)
    }

    fn parse_direct_declarator_tail(&mut self, base: QualType) -> Result<QualType> {
        if self.toks.eat(Tag::LeftSquare) {
            let loc = self.toks.loc();
            if self.types.is_function(base.id) {
                return Err(FrontError::ty(&loc, "array of functions"));
            }

            let len = if self.toks.eat(Tag::RightSquare) {
                None
            } else {
                let n = self.parse_array_length(&loc)?;
                self.toks.expect(Tag::RightSquare)?;
                Some(n)
            };

            let inner = self.parse_direct_declarator_tail(base)?;
            if !self.types.is_complete(inner.id) {
                return Err(FrontError::incomplete(&loc, "array has incomplete element type"));
            }
            Ok(QualType::new(self.types.array_of(inner, len)))
        } else if self.toks.eat(Tag::LeftParen) {
            self.scopes.enter(ScopeKind::FuncProto);
            let (params, variadic) = self.parse_param_type_list()?;
            self.scopes.exit();
            self.toks.expect(Tag::RightParen)?;

            let loc = self.toks.loc();
            let inner = self.parse_direct_declarator_tail(base)?;
            if self.types.is_function(inner.id) {
                return Err(FrontError::ty(&loc, "function returning a function"));
            }
            if self.types.is_array(inner.id) {
                return Err(FrontError::ty(&loc, "function returning an array"));
            }
            Ok(QualType::new(self.types.function(inner, params, variadic)))
        } else {
            Ok(base)
        }
    }

    fn parse_array_length(&mut self, loc: &SourceLoc) -> Result<u64> {
        let e = self.parse_assign_expr()?;
        if !self.types.is_integer(e.ty.id) {
            return Err(FrontError::ty(loc, "array size is not an integer"));
        }
        let n = crate::fold::eval_int(&self.types, &self.symbols, &e)
            .map_err(|_| FrontError::unsupported(loc, "variable length arrays"))?;
        if n <= 0 {
            return Err(FrontError::ty(loc, "array size must be greater than 0"));
        }
        Ok(n as u64)
    }

    fn parse_param_type_list(&mut self) -> Result<(Vec<Param>, bool)> {
        if self.toks.test(Tag::RightParen) {
            log::warn!(
                "{}: empty parameter list; use (void) for a function taking no arguments",
                self.toks.loc()
            );
            return Ok((Vec::new(), false));
        }

        let first_loc = self.toks.loc();
        let first = self.parse_param_decl()?;
        if self.types.is_void(first.ty.id) {
            if first.name.is_some() {
                return Err(FrontError::ty(&first_loc, "parameter may not have void type"));
            }
            return Ok((Vec::new(), false));
        }

        let mut params = vec![first];
        while self.toks.eat(Tag::Comma) {
            if self.toks.eat(Tag::Ellipsis) {
                return Ok((params, true));
            }
            let loc = self.toks.loc();
            let p = self.parse_param_decl()?;
            if self.types.is_void(p.ty.id) {
                return Err(FrontError::ty(&loc, "'void' must be the only parameter"));
            }
            params.push(p);
        }
        Ok((params, false))
    }

    fn parse_param_decl(&mut self) -> Result<Param> {
        let (base, _attrs) = self.parse_decl_spec(SpecPos::SpecQual)?;
        let (tok, ty) = self.parse_declarator(base)?;
        // Parameter adjustment: arrays and functions become pointers.
        let ty = self.types.adjust_param(ty);

        if let Some(t) = &tok {
            if self.scopes.find_ordinary_current(&t.lexeme).is_some() {
                return Err(FrontError::redefinition(
                    &t.loc,
                    format!("redefinition of parameter '{}'", t.lexeme),
                ));
            }
            let id = self.add_symbol(Symbol {
                name: t.lexeme.clone(),
                ty,
                loc: t.loc.clone(),
                kind: SymKind::Object,
                linkage: Linkage::None,
                storage: StorageClass::empty(),
                func_spec: FuncSpec::empty(),
                align: None,
                static_storage: false,
                defined: false,
                is_builtin: false,
            });
            self.scopes.insert_ordinary(&t.lexeme, id);
        }

        Ok(Param { name: tok.map(|t| t.lexeme), ty })
    }

    pub(crate) fn parse_type_name(&mut self) -> Result<QualType> {
        let (base, _) = self.parse_decl_spec(SpecPos::SpecQual)?;
        let (tok, ty) = self.parse_declarator(base)?;
        if let Some(t) = tok {
            return Err(FrontError::syntax(
                &t.loc,
                format!("unexpected identifier '{}' in type name", t.lexeme),
            ));
        }
        Ok(ty)
    }

    // --- init declarators and scope installation ---

    pub(crate) fn parse_init_declarator(
        &mut self,
        base: QualType,
        attrs: &DeclAttrs,
    ) -> Result<Option<Declaration>> {
        let (tok, ty) = self.parse_declarator(base)?;
        self.try_attribute_spec()?;

        let tok = tok.ok_or_else(|| {
            FrontError::syntax(&self.toks.loc(), "declaration does not declare anything")
        })?;

        let decl = self.make_declaration(&tok, ty, attrs)?;
        let Some(mut decl) = decl else {
            // Typedefs take no initializer.
            if self.toks.test(Tag::Equal) {
                return Err(FrontError::initializer(
                    &self.toks.loc(),
                    "illegal initializer (only variables can be initialized)",
                ));
            }
            return Ok(None);
        };

        if self.toks.eat(Tag::Equal) {
            let (inits, const_init) = self.parse_init_declarator_sub(decl.sym, &tok.loc)?;
            decl.inits = inits;
            decl.const_init = const_init;
        } else if !self.scopes.is_file_scope() {
            // A local object must be complete unless it refers elsewhere.
            let s = self.sym(decl.sym);
            if matches!(s.kind, SymKind::Object)
                && !s.storage.contains(StorageClass::EXTERN)
                && !self.types.is_complete(s.ty.id)
            {
                return Err(FrontError::incomplete(
                    &tok.loc,
                    format!("variable '{}' has incomplete type", tok.lexeme),
                ));
            }
        }

        Ok(Some(decl))
    }

    /// Declarations inside a compound statement; one entry per declarator.
    pub(crate) fn parse_block_decl(&mut self) -> Result<Vec<Declaration>> {
        if self.toks.eat(Tag::StaticAssert) {
            self.parse_static_assert_decl()?;
            return Ok(Vec::new());
        }

        let (base, attrs) = self.parse_decl_spec(SpecPos::Decl)?;
        if self.toks.eat(Tag::Semicolon) {
            return Ok(Vec::new());
        }

        let mut decls = Vec::new();
        loop {
            if let Some(d) = self.parse_init_declarator(base, &attrs)? {
                decls.push(d);
            }
            if !self.toks.eat(Tag::Comma) {
                break;
            }
        }
        self.toks.expect(Tag::Semicolon)?;
        Ok(decls)
    }

    /// Install a declarator in scope: compute linkage, detect conflicting
    /// or merging redeclarations, create (or reuse) the symbol.
    fn make_declaration(
        &mut self,
        tok: &Token,
        ty: QualType,
        attrs: &DeclAttrs,
    ) -> Result<Option<Declaration>> {
        let name = tok.lexeme.clone();
        let loc = tok.loc.clone();
        let file_scope = self.scopes.is_file_scope();

        if attrs.storage.contains(StorageClass::TYPEDEF) {
            if attrs.align.is_some() {
                return Err(FrontError::ty(
                    &loc,
                    "'_Alignas' attribute applies only to variables and fields",
                ));
            }
            if let Some(prev) = self.scopes.find_ordinary_current(&name) {
                let prev_sym = self.sym(prev);
                if matches!(prev_sym.kind, SymKind::Typedef)
                    && self.types.compatible(prev_sym.ty, ty)
                {
                    log::warn!("{}: redefinition of typedef '{}'", loc, name);
                    return Ok(None);
                }
                return Err(FrontError::redefinition(
                    &loc,
                    format!("redefinition of '{}' as a different kind of symbol", name),
                ));
            }
            let id = self.add_symbol(Symbol {
                name: name.clone(),
                ty,
                loc,
                kind: SymKind::Typedef,
                linkage: Linkage::None,
                storage: attrs.storage,
                func_spec: FuncSpec::empty(),
                align: None,
                static_storage: false,
                defined: true,
                is_builtin: false,
            });
            self.scopes.insert_ordinary(name, id);
            return Ok(None);
        }

        if self.types.is_void(ty.id) {
            return Err(FrontError::ty(&loc, format!("variable or field '{}' declared void", name)));
        }

        let is_func = self.types.is_function(ty.id);
        if is_func {
            if attrs.align.is_some() {
                return Err(FrontError::ty(
                    &loc,
                    "'_Alignas' attribute applies only to variables and fields",
                ));
            }
            if !file_scope && attrs.storage.contains(StorageClass::STATIC) {
                return Err(FrontError::ty(
                    &loc,
                    "invalid storage class for a block-scope function declaration",
                ));
            }
        }

        let linkage = linkage_for(file_scope, attrs.storage, is_func);
        let static_storage = !is_func && (file_scope || attrs.storage.contains(StorageClass::STATIC));

        if let Some(prev) = self.scopes.find_ordinary_current(&name) {
            return self.merge_redeclaration(prev, &loc, ty, linkage, attrs, is_func);
        }

        // Block-scope extern picks up a prior visible declaration of the
        // same entity and its linkage.
        if !file_scope && linkage == Linkage::External {
            if let Some(outer) = self.scopes.find_ordinary(&name) {
                let (okind, olink, oty) = {
                    let s = self.sym(outer);
                    (s.kind.clone(), s.linkage, s.ty)
                };
                let same_kind = matches!(
                    (&okind, is_func),
                    (SymKind::Func, true) | (SymKind::Object, false)
                );
                if same_kind && olink != Linkage::None {
                    if !self.types.compatible(oty, ty) {
                        return Err(FrontError::redefinition(
                            &loc,
                            format!("conflicting types for '{}'", name),
                        ));
                    }
                    self.scopes.insert_ordinary(name, outer);
                    return Ok(Some(Declaration { sym: outer, inits: Vec::new(), const_init: None }));
                }
            }
        }

        if !file_scope {
            if let Some(outer) = self.scopes.find_ordinary(&name) {
                if !self.sym(outer).is_builtin {
                    log::warn!("{}: declaration of '{}' shadows a previous declaration", loc, name);
                }
            }
        }

        let id = self.add_symbol(Symbol {
            name: name.clone(),
            ty,
            loc,
            kind: if is_func { SymKind::Func } else { SymKind::Object },
            linkage,
            storage: attrs.storage,
            func_spec: attrs.func_spec,
            align: attrs.align,
            static_storage,
            defined: false,
            is_builtin: false,
        });
        self.scopes.insert_ordinary(name, id);
        Ok(Some(Declaration { sym: id, inits: Vec::new(), const_init: None }))
    }

    fn merge_redeclaration(
        &mut self,
        prev: SymbolId,
        loc: &SourceLoc,
        ty: QualType,
        linkage: Linkage,
        attrs: &DeclAttrs,
        is_func: bool,
    ) -> Result<Option<Declaration>> {
        let (name, pkind, plink, pty) = {
            let s = self.sym(prev);
            (s.name.clone(), s.kind.clone(), s.linkage, s.ty)
        };

        let same_kind = matches!(
            (&pkind, is_func),
            (SymKind::Func, true) | (SymKind::Object, false)
        );
        if !same_kind {
            return Err(FrontError::redefinition(
                loc,
                format!("redefinition of '{}' as a different kind of symbol", name),
            ));
        }

        // Only declarations with linkage may repeat.
        if plink == Linkage::None || linkage == Linkage::None {
            return Err(FrontError::redefinition(loc, format!("redefinition of '{}'", name)));
        }

        // An explicit extern inherits the prior linkage; otherwise the two
        // must agree.
        let effective = if attrs.storage.contains(StorageClass::EXTERN) { plink } else { linkage };
        if effective != plink {
            return Err(FrontError::redefinition(
                loc,
                format!("conflicting linkage for '{}'", name),
            ));
        }

        if !self.types.compatible(pty, ty) {
            return Err(FrontError::redefinition(loc, format!("conflicting types for '{}'", name)));
        }

        // Composite type: a known array length survives; otherwise the new
        // declaration (it may carry parameter names) wins.
        let merged = if self.types.is_array(pty.id)
            && self.types.array_len(pty.id).is_some()
            && self.types.array_len(ty.id).is_none()
        {
            pty
        } else {
            ty
        };
        let s = self.sym_mut(prev);
        s.ty = merged;
        s.func_spec |= attrs.func_spec;

        Ok(Some(Declaration { sym: prev, inits: Vec::new(), const_init: None }))
    }

    // --- GNU attribute / asm surface, consumed and ignored ---

    pub(crate) fn try_attribute_spec(&mut self) -> Result<()> {
        while self.toks.eat(Tag::Attribute) {
            self.toks.expect(Tag::LeftParen)?;
            self.toks.expect(Tag::LeftParen)?;
            self.parse_attribute_list()?;
            self.toks.expect(Tag::RightParen)?;
            self.toks.expect(Tag::RightParen)?;
        }
        Ok(())
    }

    fn parse_attribute_list(&mut self) -> Result<()> {
        while !self.toks.test(Tag::RightParen) {
            self.parse_attribute()?;
            if !self.toks.test(Tag::RightParen) {
                self.toks.expect(Tag::Comma)?;
            }
        }
        Ok(())
    }

    fn parse_attribute(&mut self) -> Result<()> {
        if self.toks.test(Tag::RightParen) {
            return Ok(());
        }
        // Attribute names may collide with keywords (`const`, `noreturn`).
        let tok = self.toks.next();
        if !tok.is_identifier() && tok.lexeme.is_empty() {
            return Err(FrontError::syntax(&tok.loc, "expected an attribute name"));
        }
        if self.toks.eat(Tag::LeftParen) {
            self.parse_attribute_param_list()?;
            self.toks.expect(Tag::RightParen)?;
        }
        Ok(())
    }

    fn parse_attribute_param_list(&mut self) -> Result<()> {
        if self.toks.eat(Tag::Identifier) {
            if self.toks.eat(Tag::Comma) {
                self.parse_attribute_expr_list()?;
            }
        } else {
            self.parse_attribute_expr_list()?;
        }
        Ok(())
    }

    fn parse_attribute_expr_list(&mut self) -> Result<()> {
        while !self.toks.test(Tag::RightParen) {
            self.parse_assign_expr()?;
            if !self.toks.test(Tag::RightParen) {
                self.toks.expect(Tag::Comma)?;
            }
        }
        Ok(())
    }

    pub(crate) fn try_asm(&mut self) -> Result<()> {
        if self.toks.eat(Tag::Asm) {
            self.toks.expect(Tag::LeftParen)?;
            self.toks.expect(Tag::StringLiteral)?;
            while self.toks.test(Tag::StringLiteral) {
                self.toks.next();
            }
            self.toks.expect(Tag::RightParen)?;
        }
        Ok(())
    }
}
