//! Initializer parsing. Aggregate state is an explicit path of
//! (aggregate-type, index) steps so designated initializers compose;
//! each scalar slot becomes one `Initializer` record. Static-storage
//! initializers additionally fold to a single constant aggregate.

use super::Parser;
use crate::ast::{Initializer, PathStep, StorageClass, SymKind, SymbolId};
use crate::error::{FrontError, Result};
use crate::fold::{self, Value};
use token::{SourceLoc, Tag};
use types::QualType;

/// Member metadata snapshot taken before recursing, to keep the type table
/// borrow short.
struct MemberInfo {
    name: Option<String>,
    ty: QualType,
    offset: u64,
    /// Unnamed bit-field: holds a slot but takes no initializer.
    skip_positional: bool,
    /// Anonymous struct/union member: designators reach through it.
    anon_record: bool,
}

impl Parser {
    /// Initializer for one declared object; completes an incomplete array
    /// type from its initializer and folds static-storage initializers.
    pub(crate) fn parse_init_declarator_sub(
        &mut self,
        sym_id: SymbolId,
        loc: &SourceLoc,
    ) -> Result<(Vec<Initializer>, Option<Value>)> {
        let (kind, ty, storage, static_storage, defined, name) = {
            let s = self.sym(sym_id);
            (s.kind.clone(), s.ty, s.storage, s.static_storage, s.defined, s.name.clone())
        };

        if !matches!(kind, SymKind::Object) {
            return Err(FrontError::initializer(loc, format!("illegal initializer for '{}'", name)));
        }
        if defined {
            return Err(FrontError::redefinition(loc, format!("redefinition of '{}'", name)));
        }
        if !self.scopes.is_file_scope() && storage.contains(StorageClass::EXTERN) {
            return Err(FrontError::initializer(
                loc,
                format!("'{}' has both 'extern' and an initializer", name),
            ));
        }
        if !self.types.is_complete(ty.id) && !self.types.is_array(ty.id) {
            return Err(FrontError::initializer(
                loc,
                format!("variable '{}' has initializer but incomplete type", name),
            ));
        }

        let (inits, final_ty) = self.parse_braced_initializer(ty)?;
        if final_ty.id != ty.id {
            self.sym_mut(sym_id).ty = final_ty;
        }
        if !self.types.is_complete(final_ty.id) {
            return Err(FrontError::incomplete(
                loc,
                format!("variable '{}' has incomplete type", name),
            ));
        }
        self.sym_mut(sym_id).defined = true;

        let const_init = if static_storage {
            Some(fold::fold_initializers(&self.types, &self.symbols, final_ty, &inits)?)
        } else {
            None
        };
        Ok((inits, const_init))
    }

    /// Entry point shared with compound literals: parses any initializer
    /// form for `ty` and returns the records plus the (possibly completed)
    /// object type.
    pub(crate) fn parse_braced_initializer(
        &mut self,
        ty: QualType,
    ) -> Result<(Vec<Initializer>, QualType)> {
        let mut inits = Vec::new();
        let mut path = Vec::new();

        if self.types.is_array(ty.id) && self.types.array_len(ty.id).is_none() {
            // The length of an open array comes from the highest index
            // actually initialized.
            let n = self.parse_array_initializer(&mut inits, ty, 0, &mut path, false)?;
            if n == 0 {
                return Err(FrontError::initializer(
                    &self.toks.loc(),
                    "empty initializer for an array of unknown size",
                ));
            }
            let elem = self.types.elem(ty.id).unwrap();
            let completed = QualType::with_quals(self.types.array_of(elem, Some(n)), ty.quals);
            patch_completed_array(&mut inits, ty, completed);
            Ok((inits, completed))
        } else {
            self.parse_initializer(&mut inits, ty, 0, &mut path, false)?;
            Ok((inits, ty))
        }
    }

    /// One initializer for a slot of type `ty` at `offset`. `designated`
    /// means a designator is (or may still be) navigating into this slot.
    fn parse_initializer(
        &mut self,
        inits: &mut Vec<Initializer>,
        ty: QualType,
        offset: u64,
        path: &mut Vec<PathStep>,
        designated: bool,
    ) -> Result<()> {
        if self.types.is_array(ty.id) {
            self.parse_array_initializer(inits, ty, offset, path, designated)?;
            return Ok(());
        }
        if self.types.is_record(ty.id) {
            return self.parse_record_initializer(inits, ty, offset, path, designated);
        }

        // Scalar: after any designator navigation an '=' introduces the
        // value, which may carry one redundant brace level.
        if designated {
            self.toks.expect(Tag::Equal)?;
        }
        let braced = self.toks.eat(Tag::LeftBrace);
        let e = self.parse_assign_expr()?;
        let e = self
            .assign_convert(e, ty)
            .map_err(|err| FrontError::initializer(err.loc(), "incompatible initializer type"))?;
        if braced {
            self.toks.eat(Tag::Comma);
            self.toks.expect(Tag::RightBrace)?;
        }
        inits.push(Initializer { ty: ty.unqualified(), path: path.clone(), offset, expr: e });
        Ok(())
    }

    /// Returns the number of elements the initializer covers (highest
    /// index + 1), which sizes an open array.
    fn parse_array_initializer(
        &mut self,
        inits: &mut Vec<Initializer>,
        ty: QualType,
        offset: u64,
        path: &mut Vec<PathStep>,
        designated: bool,
    ) -> Result<u64> {
        let loc = self.toks.loc();
        let elem = self.types.elem(ty.id).unwrap();
        let declared_len = self.types.array_len(ty.id);
        let esize = self
            .types
            .size_of(elem.id)
            .ok_or_else(|| FrontError::incomplete(&loc, "array of incomplete element type"))?;

        if designated {
            if self.toks.test(Tag::Period) {
                return Err(FrontError::initializer(&loc, "field designator in an array initializer"));
            }
            if self.toks.test(Tag::LeftSquare) {
                // Continue navigating: [i] then deeper designators or '='.
                self.toks.next();
                let idx = self.check_array_index(&loc, declared_len)?;
                self.toks.expect(Tag::RightSquare)?;
                path.push(PathStep { agg: ty, index: idx as u32 });
                self.parse_initializer(inits, elem, offset + idx * esize, path, true)?;
                path.pop();
                return Ok(idx + 1);
            }
            self.toks.expect(Tag::Equal)?;
        }

        // A string literal may initialize an array of narrow integers,
        // optionally wrapped in one brace level.
        if self.toks.test(Tag::StringLiteral) && self.types.is_integer(elem.id) {
            return self.parse_string_array_init(inits, ty, offset, path, elem, declared_len);
        }
        if self.toks.test(Tag::LeftBrace)
            && self.toks.peek_n(1).tag == Tag::StringLiteral
            && self.types.is_integer(elem.id)
            && matches!(self.toks.peek_n(2).tag, Tag::RightBrace | Tag::Comma)
        {
            self.toks.next();
            let n = self.parse_string_array_init(inits, ty, offset, path, elem, declared_len)?;
            self.toks.eat(Tag::Comma);
            self.toks.expect(Tag::RightBrace)?;
            return Ok(n);
        }

        if !self.toks.test(Tag::LeftBrace) {
            return Err(FrontError::initializer(
                &loc,
                "array initializer must be a braced list or a string literal",
            ));
        }
        self.toks.next();

        let mut i: u64 = 0;
        let mut count: u64 = 0;
        loop {
            if self.toks.eat(Tag::RightBrace) {
                break;
            }
            if self.toks.test(Tag::Period) {
                return Err(FrontError::initializer(
                    &self.toks.loc(),
                    "field designator in an array initializer",
                ));
            }
            if self.toks.test(Tag::LeftSquare) {
                // Designator jumps the cursor; parsing resumes after it.
                self.toks.next();
                let dloc = self.toks.loc();
                i = self.check_array_index(&dloc, declared_len)?;
                self.toks.expect(Tag::RightSquare)?;
                path.push(PathStep { agg: ty, index: i as u32 });
                self.parse_initializer(inits, elem, offset + i * esize, path, true)?;
                path.pop();
            } else {
                if declared_len.is_some_and(|n| i >= n) {
                    return Err(FrontError::initializer(
                        &self.toks.loc(),
                        "excess elements in array initializer",
                    ));
                }
                path.push(PathStep { agg: ty, index: i as u32 });
                self.parse_initializer(inits, elem, offset + i * esize, path, false)?;
                path.pop();
            }
            count = count.max(i + 1);
            i += 1;

            if !self.toks.eat(Tag::Comma) {
                self.toks.expect(Tag::RightBrace)?;
                break;
            }
        }
        Ok(count)
    }

    fn check_array_index(&mut self, loc: &SourceLoc, declared_len: Option<u64>) -> Result<u64> {
        let idx = self.parse_const_int()?;
        if idx < 0 {
            return Err(FrontError::initializer(loc, "array designator index is negative"));
        }
        if declared_len.is_some_and(|n| idx as u64 >= n) {
            return Err(FrontError::initializer(
                loc,
                format!("array designator index {} exceeds array bounds", idx),
            ));
        }
        Ok(idx as u64)
    }

    fn parse_string_array_init(
        &mut self,
        inits: &mut Vec<Initializer>,
        ty: QualType,
        offset: u64,
        path: &mut [PathStep],
        elem: QualType,
        declared_len: Option<u64>,
    ) -> Result<u64> {
        let e = self.parse_string_literal()?;
        let loc = e.loc.clone();

        let str_elem = match &e.kind {
            crate::ast::ExprKind::Str(id) => self.strings[id.0 as usize].elem,
            _ => unreachable!("string literal expected"),
        };
        let want = self.types.size_of(elem.id).unwrap_or(1);
        let got = self.types.size_of(str_elem.id).unwrap_or(1);
        if want != got {
            return Err(FrontError::initializer(
                &loc,
                "string literal element width does not match the array element",
            ));
        }

        // Length including the terminating null.
        let n = self.types.array_len(e.ty.id).unwrap_or(0);
        if let Some(l) = declared_len {
            // The null may be dropped when the array is exactly full.
            if n - 1 > l {
                return Err(FrontError::initializer(&loc, "initializer-string is too long"));
            }
            inits.push(Initializer { ty: ty.unqualified(), path: path.to_vec(), offset, expr: e });
            Ok(l)
        } else {
            inits.push(Initializer { ty: ty.unqualified(), path: path.to_vec(), offset, expr: e });
            Ok(n)
        }
    }

    fn parse_record_initializer(
        &mut self,
        inits: &mut Vec<Initializer>,
        ty: QualType,
        offset: u64,
        path: &mut Vec<PathStep>,
        designated: bool,
    ) -> Result<()> {
        let loc = self.toks.loc();
        if !self.types.is_complete(ty.id) {
            return Err(FrontError::incomplete(&loc, "initializer for an incomplete type"));
        }
        let (is_struct, members) = self.snapshot_members(ty);

        if designated {
            if self.toks.test(Tag::LeftSquare) {
                return Err(FrontError::initializer(&loc, "array designator in a struct initializer"));
            }
            if self.toks.test(Tag::Period) {
                self.parse_member_designator(inits, ty, offset, path, &members)?;
                return Ok(());
            }
            self.toks.expect(Tag::Equal)?;
        }

        if !self.toks.test(Tag::LeftBrace) {
            // A single compatible-typed expression copies the whole record.
            let e = self.parse_assign_expr()?;
            let e = self.assign_convert(e, ty).map_err(|err| {
                FrontError::initializer(err.loc(), "incompatible initializer type")
            })?;
            inits.push(Initializer { ty: ty.unqualified(), path: path.clone(), offset, expr: e });
            return Ok(());
        }
        self.toks.next();

        let mut idx: usize = 0;
        let mut any = false;
        loop {
            if self.toks.eat(Tag::RightBrace) {
                break;
            }
            if self.toks.test(Tag::Period) {
                let sel = self.parse_member_designator(inits, ty, offset, path, &members)?;
                // Positional parsing resumes after the designated member.
                idx = sel + 1;
                any = true;
            } else {
                if !is_struct && any {
                    // A union holds one member; anything positional after
                    // the first (or after a designator) is excess.
                    return Err(FrontError::initializer(
                        &self.toks.loc(),
                        "excess elements in union initializer",
                    ));
                }
                while idx < members.len() && members[idx].skip_positional {
                    idx += 1;
                }
                if idx >= members.len() {
                    return Err(FrontError::initializer(
                        &self.toks.loc(),
                        "excess elements in struct initializer",
                    ));
                }
                let (mty, moffset) = (members[idx].ty, members[idx].offset);
                path.push(PathStep { agg: ty, index: idx as u32 });
                self.parse_initializer(inits, mty, offset + moffset, path, false)?;
                path.pop();
                idx += 1;
                any = true;
            }

            if !self.toks.eat(Tag::Comma) {
                self.toks.expect(Tag::RightBrace)?;
                break;
            }
        }
        Ok(())
    }

    /// Resolve a `.name` designator against the members, reaching through
    /// anonymous struct/union members: when the name belongs to an
    /// anonymous submember the designator is left unconsumed and parsing
    /// descends one level, where it resolves again.
    fn parse_member_designator(
        &mut self,
        inits: &mut Vec<Initializer>,
        ty: QualType,
        offset: u64,
        path: &mut Vec<PathStep>,
        members: &[MemberInfo],
    ) -> Result<usize> {
        let name_tok = self.toks.peek_n(1).clone();
        if !name_tok.is_identifier() {
            return Err(FrontError::syntax(&name_tok.loc, "expected a member name after '.'"));
        }
        let name = name_tok.lexeme.as_str();

        if let Some(i) = members.iter().position(|m| m.name.as_deref() == Some(name)) {
            self.toks.next();
            self.toks.next();
            let (mty, moffset) = (members[i].ty, members[i].offset);
            path.push(PathStep { agg: ty, index: i as u32 });
            self.parse_initializer(inits, mty, offset + moffset, path, true)?;
            path.pop();
            return Ok(i);
        }

        for (i, m) in members.iter().enumerate() {
            if m.anon_record && self.types.member_ref(m.ty.id, name).is_some() {
                let (mty, moffset) = (m.ty, m.offset);
                path.push(PathStep { agg: ty, index: i as u32 });
                self.parse_initializer(inits, mty, offset + moffset, path, true)?;
                path.pop();
                return Ok(i);
            }
        }

        Err(FrontError::initializer(
            &name_tok.loc,
            format!("no member named '{}' in initializer", name),
        ))
    }

    fn snapshot_members(&self, ty: QualType) -> (bool, Vec<MemberInfo>) {
        let r = self.types.record(ty.id).expect("record type");
        let members = r
            .members
            .iter()
            .map(|m| MemberInfo {
                name: m.name.clone(),
                ty: m.ty,
                offset: m.offset,
                skip_positional: m.name.is_none() && m.bit_width.is_some(),
                anon_record: m.is_anonymous_record() && self.types.is_record(m.ty.id),
            })
            .collect();
        (r.is_struct, members)
    }
}

/// Rewrite path steps and record types that referred to the open array
/// after its length has been inferred.
fn patch_completed_array(inits: &mut [Initializer], old: QualType, new: QualType) {
    for init in inits.iter_mut() {
        if init.ty.id == old.id {
            init.ty = new;
        }
        for step in init.path.iter_mut() {
            if step.agg.id == old.id {
                step.agg = new;
            }
        }
    }
}
