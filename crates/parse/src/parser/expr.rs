//! Expression grammar: a precedence tower from the comma operator down to
//! primaries, building typed nodes with conversions applied as they are
//! constructed.

use super::Parser;
use crate::ast::{is_lvalue, BinaryOp, Expr, ExprKind, StmtKind, StrLit, SymKind, UnaryOp};
use crate::builtins;
use crate::error::{FrontError, Result};
use crate::fold;
use token::{SourceLoc, Tag, Token};
use types::{ArithKind, QualType, Type};

impl Parser {
    // --- the tower ---

    pub(crate) fn parse_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_assign_expr()?;
        while self.toks.test(Tag::Comma) {
            let tok = self.toks.next();
            let rhs = self.parse_assign_expr()?;
            lhs = self.make_binary(BinaryOp::Comma, tok.loc, lhs, rhs)?;
        }
        Ok(lhs)
    }

    pub(crate) fn parse_assign_expr(&mut self) -> Result<Expr> {
        let lhs = self.parse_cond_expr()?;

        let tok = self.toks.peek().clone();
        let desugared = match tok.tag {
            Tag::Equal => None,
            Tag::StarEqual => Some(BinaryOp::Mul),
            Tag::SlashEqual => Some(BinaryOp::Div),
            Tag::PercentEqual => Some(BinaryOp::Rem),
            Tag::PlusEqual => Some(BinaryOp::Add),
            Tag::MinusEqual => Some(BinaryOp::Sub),
            Tag::LessLessEqual => Some(BinaryOp::Shl),
            Tag::GreaterGreaterEqual => Some(BinaryOp::Shr),
            Tag::AmpEqual => Some(BinaryOp::BitAnd),
            Tag::CaretEqual => Some(BinaryOp::BitXor),
            Tag::PipeEqual => Some(BinaryOp::BitOr),
            _ => return Ok(lhs),
        };
        self.toks.next();

        let rhs = self.parse_assign_expr()?;
        // `lhs op= rhs` reads as `lhs = lhs op rhs`, with the implicit
        // conversion back to the lvalue's type handled by the assignment.
        let rhs = match desugared {
            Some(op) => self.make_binary(op, tok.loc.clone(), lhs.clone(), rhs)?,
            None => rhs,
        };
        self.make_assign(tok.loc, lhs, rhs)
    }

    pub(crate) fn parse_cond_expr(&mut self) -> Result<Expr> {
        let cond = self.parse_logical_or_expr()?;

        if self.toks.test(Tag::Question) {
            let tok = self.toks.next();
            // GNU: `a ?: b` reuses the condition as the true arm.
            let then_expr = if self.toks.test(Tag::Colon) {
                cond.clone()
            } else {
                self.parse_expr()?
            };
            self.toks.expect(Tag::Colon)?;
            let else_expr = self.parse_cond_expr()?;
            return self.make_cond(tok.loc, cond, then_expr, else_expr);
        }

        Ok(cond)
    }

    /// Constant expressions exclude assignment and the comma operator.
    pub(crate) fn parse_constant_expr(&mut self) -> Result<Expr> {
        self.parse_cond_expr()
    }

    /// Fold a constant expression to a signed 64-bit integer.
    pub(crate) fn parse_const_int(&mut self) -> Result<i64> {
        let e = self.parse_constant_expr()?;
        fold::eval_int(&self.types, &self.symbols, &e)
    }

    fn parse_logical_or_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_logical_and_expr()?;
        while self.toks.test(Tag::PipePipe) {
            let tok = self.toks.next();
            let rhs = self.parse_logical_and_expr()?;
            lhs = self.make_binary(BinaryOp::LogOr, tok.loc, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_logical_and_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_bitwise_or_expr()?;
        while self.toks.test(Tag::AmpAmp) {
            let tok = self.toks.next();
            let rhs = self.parse_bitwise_or_expr()?;
            lhs = self.make_binary(BinaryOp::LogAnd, tok.loc, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_bitwise_or_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_bitwise_xor_expr()?;
        while self.toks.test(Tag::Pipe) {
            let tok = self.toks.next();
            let rhs = self.parse_bitwise_xor_expr()?;
            lhs = self.make_binary(BinaryOp::BitOr, tok.loc, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_bitwise_xor_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_bitwise_and_expr()?;
        while self.toks.test(Tag::Caret) {
            let tok = self.toks.next();
            let rhs = self.parse_bitwise_and_expr()?;
            lhs = self.make_binary(BinaryOp::BitXor, tok.loc, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_bitwise_and_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_equality_expr()?;
        while self.toks.test(Tag::Amp) {
            let tok = self.toks.next();
            let rhs = self.parse_equality_expr()?;
            lhs = self.make_binary(BinaryOp::BitAnd, tok.loc, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_equality_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_relation_expr()?;
        loop {
            let op = match self.toks.peek().tag {
                Tag::EqualEqual => BinaryOp::Eq,
                Tag::ExclaimEqual => BinaryOp::Ne,
                _ => break,
            };
            let tok = self.toks.next();
            let rhs = self.parse_relation_expr()?;
            lhs = self.make_binary(op, tok.loc, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_relation_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_shift_expr()?;
        loop {
            let op = match self.toks.peek().tag {
                Tag::Less => BinaryOp::Lt,
                Tag::Greater => BinaryOp::Gt,
                Tag::LessEqual => BinaryOp::Le,
                Tag::GreaterEqual => BinaryOp::Ge,
                _ => break,
            };
            let tok = self.toks.next();
            let rhs = self.parse_shift_expr()?;
            lhs = self.make_binary(op, tok.loc, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_shift_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_additive_expr()?;
        loop {
            let op = match self.toks.peek().tag {
                Tag::LessLess => BinaryOp::Shl,
                Tag::GreaterGreater => BinaryOp::Shr,
                _ => break,
            };
            let tok = self.toks.next();
            let rhs = self.parse_additive_expr()?;
            lhs = self.make_binary(op, tok.loc, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative_expr()?;
        loop {
            let op = match self.toks.peek().tag {
                Tag::Plus => BinaryOp::Add,
                Tag::Minus => BinaryOp::Sub,
                _ => break,
            };
            let tok = self.toks.next();
            let rhs = self.parse_multiplicative_expr()?;
            lhs = self.make_binary(op, tok.loc, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_cast_expr()?;
        loop {
            let op = match self.toks.peek().tag {
                Tag::Star => BinaryOp::Mul,
                Tag::Slash => BinaryOp::Div,
                Tag::Percent => BinaryOp::Rem,
                _ => break,
            };
            let tok = self.toks.next();
            let rhs = self.parse_cast_expr()?;
            lhs = self.make_binary(op, tok.loc, lhs, rhs)?;
        }
        Ok(lhs)
    }

    pub(crate) fn parse_cast_expr(&mut self) -> Result<Expr> {
        if self.toks.test(Tag::LeftParen) && self.is_type_name(self.toks.peek_n(1)) {
            let tok = self.toks.next();
            let target = self.parse_type_name()?;
            self.toks.expect(Tag::RightParen)?;

            if self.toks.test(Tag::LeftBrace) {
                // A compound literal is a postfix expression.
                let lit = self.parse_compound_literal(tok.loc, target)?;
                return self.parse_postfix_tail(lit);
            }

            let operand = self.parse_cast_expr()?;
            return self.make_cast(tok.loc, target, operand);
        }
        self.parse_unary_expr()
    }

    fn make_cast(&mut self, loc: SourceLoc, target: QualType, operand: Expr) -> Result<Expr> {
        let operand = self.decay(operand);
        if self.types.classify_cast(operand.ty, target).is_none() {
            return Err(FrontError::ty(
                &loc,
                format!(
                    "cannot cast '{}' to '{}'",
                    self.types.display(operand.ty),
                    self.types.display(target)
                ),
            ));
        }
        Ok(Expr::new(loc, target.unqualified(), ExprKind::Cast {
            implicit: false,
            operand: Box::new(operand),
        }))
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        let tok = self.toks.next();
        match tok.tag {
            Tag::PlusPlus => self.make_incdec(tok, UnaryOp::PreInc),
            Tag::MinusMinus => self.make_incdec(tok, UnaryOp::PreDec),
            Tag::Plus | Tag::Minus => {
                let operand = self.parse_cast_expr()?;
                let operand = self.decay(operand);
                if !self.types.is_arith(operand.ty.id) {
                    return Err(FrontError::ty(&tok.loc, "operand of unary +/- is not arithmetic"));
                }
                let ty = self.types.promote(operand.ty);
                let operand = self.implicit_cast(operand, ty);
                let op = if tok.tag == Tag::Plus { UnaryOp::Plus } else { UnaryOp::Minus };
                Ok(Expr::new(tok.loc, ty, ExprKind::Unary { op, operand: Box::new(operand) }))
            }
            Tag::Tilde => {
                let operand = self.parse_cast_expr()?;
                let operand = self.decay(operand);
                if !self.types.is_integer(operand.ty.id) {
                    return Err(FrontError::ty(&tok.loc, "operand of '~' is not an integer"));
                }
                let ty = self.types.promote(operand.ty);
                let operand = self.implicit_cast(operand, ty);
                Ok(Expr::new(tok.loc, ty, ExprKind::Unary {
                    op: UnaryOp::BitNot,
                    operand: Box::new(operand),
                }))
            }
            Tag::Exclaim => {
                let operand = self.parse_cast_expr()?;
                let operand = self.decay(operand);
                if !self.types.is_scalar(operand.ty.id) {
                    return Err(FrontError::ty(&tok.loc, "operand of '!' is not scalar"));
                }
                let int_q = QualType::new(self.types.int_ty());
                Ok(Expr::new(tok.loc, int_q, ExprKind::Unary {
                    op: UnaryOp::LogNot,
                    operand: Box::new(operand),
                }))
            }
            Tag::Star => {
                let operand = self.parse_cast_expr()?;
                self.make_deref(tok.loc, operand)
            }
            Tag::Amp => {
                let operand = self.parse_cast_expr()?;
                let is_func = self.types.is_function(operand.ty.id);
                if !is_func && !is_lvalue(&operand, &self.symbols) {
                    return Err(FrontError::ty(&tok.loc, "cannot take the address of an rvalue"));
                }
                let ty = QualType::new(self.types.pointer_to(operand.ty));
                Ok(Expr::new(tok.loc, ty, ExprKind::Unary {
                    op: UnaryOp::AddrOf,
                    operand: Box::new(operand),
                }))
            }
            Tag::Sizeof => self.parse_sizeof(tok),
            Tag::Alignof => self.parse_alignof(tok),
            _ => {
                self.toks.put_back();
                self.parse_postfix_expr()
            }
        }
    }

    fn make_incdec(&mut self, tok: Token, op: UnaryOp) -> Result<Expr> {
        let operand = match op {
            UnaryOp::PreInc | UnaryOp::PreDec => self.parse_unary_expr()?,
            _ => unreachable!(),
        };
        self.check_incdec_operand(&tok.loc, &operand)?;
        let ty = operand.ty.unqualified();
        Ok(Expr::new(tok.loc, ty, ExprKind::Unary { op, operand: Box::new(operand) }))
    }

    fn check_incdec_operand(&mut self, loc: &SourceLoc, operand: &Expr) -> Result<()> {
        if !is_lvalue(operand, &self.symbols) {
            return Err(FrontError::ty(loc, "operand of ++/-- is not an lvalue"));
        }
        if operand.ty.is_const() {
            return Err(FrontError::ty(loc, "cannot modify a const-qualified value"));
        }
        let id = operand.ty.id;
        if self.types.is_arith(id) {
            return Ok(());
        }
        if self.types.is_pointer(id) {
            let pointee = self.types.pointee(id).unwrap();
            if self.types.is_complete(pointee.id) {
                return Ok(());
            }
            return Err(FrontError::incomplete(loc, "arithmetic on pointer to incomplete type"));
        }
        Err(FrontError::ty(loc, "operand of ++/-- is not scalar"))
    }

    fn parse_sizeof(&mut self, tok: Token) -> Result<Expr> {
        let ty = if self.toks.test(Tag::LeftParen) && self.is_type_name(self.toks.peek_n(1)) {
            self.toks.next();
            let ty = self.parse_type_name()?;
            self.toks.expect(Tag::RightParen)?;
            ty
        } else {
            // sizeof does not evaluate its operand; the subtree is typed
            // and discarded.
            let e = self.parse_unary_expr()?;
            e.ty
        };

        if self.types.is_function(ty.id) {
            return Err(FrontError::ty(&tok.loc, "sizeof applied to a function type"));
        }
        let size = self
            .types
            .size_of(ty.id)
            .ok_or_else(|| FrontError::incomplete(&tok.loc, "sizeof applied to an incomplete type"))?;
        let ulong_q = QualType::new(self.types.ulong_ty());
        Ok(Expr::new(tok.loc, ulong_q, ExprKind::IntConst(size)))
    }

    fn parse_alignof(&mut self, tok: Token) -> Result<Expr> {
        self.toks.expect(Tag::LeftParen)?;
        if !self.is_type_name(self.toks.peek()) {
            return Err(FrontError::syntax(&self.toks.loc(), "expected a type name"));
        }
        let ty = self.parse_type_name()?;
        self.toks.expect(Tag::RightParen)?;

        let align = self
            .types
            .align_of(ty.id)
            .ok_or_else(|| FrontError::incomplete(&tok.loc, "_Alignof applied to an incomplete type"))?;
        let ulong_q = QualType::new(self.types.ulong_ty());
        Ok(Expr::new(tok.loc, ulong_q, ExprKind::IntConst(align)))
    }

    fn parse_postfix_expr(&mut self) -> Result<Expr> {
        let primary = self.parse_primary_expr()?;
        self.parse_postfix_tail(primary)
    }

    fn parse_postfix_tail(&mut self, mut expr: Expr) -> Result<Expr> {
        loop {
            let tok = self.toks.next();
            match tok.tag {
                Tag::LeftSquare => {
                    // a[i] is *(a + i); the addition applies the pointer rules.
                    let index = self.parse_expr()?;
                    self.toks.expect(Tag::RightSquare)?;
                    let sum = self.make_binary(BinaryOp::Add, tok.loc.clone(), expr, index)?;
                    expr = self.make_deref(tok.loc, sum)?;
                }
                Tag::LeftParen => {
                    expr = self.parse_call_expr(tok.loc, expr)?;
                }
                Tag::Period => {
                    expr = self.parse_member_expr(tok.loc, expr)?;
                }
                Tag::Arrow => {
                    // e->m is (*e).m
                    let base = self.make_deref(tok.loc.clone(), expr)?;
                    expr = self.parse_member_expr(tok.loc, base)?;
                }
                Tag::PlusPlus | Tag::MinusMinus => {
                    self.check_incdec_operand(&tok.loc, &expr)?;
                    let op = if tok.tag == Tag::PlusPlus { UnaryOp::PostInc } else { UnaryOp::PostDec };
                    let ty = expr.ty.unqualified();
                    expr = Expr::new(tok.loc, ty, ExprKind::Unary { op, operand: Box::new(expr) });
                }
                _ => {
                    self.toks.put_back();
                    return Ok(expr);
                }
            }
        }
    }

    pub(crate) fn make_deref(&mut self, loc: SourceLoc, operand: Expr) -> Result<Expr> {
        let operand = self.decay(operand);
        let pointee = self
            .types
            .pointee(operand.ty.id)
            .ok_or_else(|| FrontError::ty(&loc, "cannot dereference a non-pointer"))?;
        if self.types.is_void(pointee.id) {
            return Err(FrontError::ty(&loc, "dereferencing a void pointer"));
        }
        Ok(Expr::new(loc, pointee, ExprKind::Unary {
            op: UnaryOp::Deref,
            operand: Box::new(operand),
        }))
    }

    fn parse_member_expr(&mut self, loc: SourceLoc, base: Expr) -> Result<Expr> {
        let member_tok = self.toks.expect(Tag::Identifier)?;
        let name = member_tok.lexeme;

        if !self.types.is_record(base.ty.id) {
            return Err(FrontError::ty(&loc, "member access on a non-struct/union value"));
        }
        if !self.types.is_complete(base.ty.id) {
            return Err(FrontError::incomplete(&loc, "member access on an incomplete type"));
        }

        let mref = self.types.member_ref(base.ty.id, &name).ok_or_else(|| {
            FrontError::ty(
                &loc,
                format!("'{}' is not a member of '{}'", name, self.types.display(base.ty)),
            )
        })?;

        // Qualifiers of the aggregate flow into the member access.
        let ty = QualType::with_quals(mref.ty.id, mref.ty.quals | base.ty.quals);
        Ok(Expr::new(loc, ty, ExprKind::Member {
            base: Box::new(base),
            name,
            offset: mref.offset,
            bit_offset: mref.bit_offset,
            bit_width: mref.bit_width,
        }))
    }

    fn parse_call_expr(&mut self, loc: SourceLoc, callee: Expr) -> Result<Expr> {
        // __builtin_va_arg needs its type argument captured on the node.
        if let ExprKind::Obj(id) = &callee.kind {
            if self.sym(*id).is_builtin && self.sym(*id).name == builtins::VA_ARG {
                let ap = self.parse_assign_expr()?;
                self.toks.expect(Tag::Comma)?;
                let ty = self.parse_type_name()?;
                self.toks.expect(Tag::RightParen)?;
                return Ok(Expr::new(loc, ty.unqualified(), ExprKind::Call {
                    callee: Box::new(callee),
                    args: vec![ap],
                    va_arg_ty: Some(ty),
                }));
            }
        }

        let mut args = Vec::new();
        while !self.toks.eat(Tag::RightParen) {
            args.push(self.parse_assign_expr()?);
            if !self.toks.test(Tag::RightParen) {
                self.toks.expect(Tag::Comma)?;
            }
        }

        let callee = self.decay(callee);
        let fn_ty = self
            .types
            .pointee(callee.ty.id)
            .filter(|p| self.types.is_function(p.id))
            .ok_or_else(|| FrontError::ty(&loc, "called object is not a function"))?;

        let (ret, params, variadic) = match self.types.get(fn_ty.id) {
            Type::Function { ret, params, variadic } => (*ret, params.clone(), *variadic),
            _ => unreachable!(),
        };

        if args.len() < params.len() {
            return Err(FrontError::ty(
                &loc,
                format!("too few arguments: expected {}, got {}", params.len(), args.len()),
            ));
        }
        if args.len() > params.len() && !variadic {
            return Err(FrontError::ty(
                &loc,
                format!("too many arguments: expected {}, got {}", params.len(), args.len()),
            ));
        }

        let mut converted = Vec::with_capacity(args.len());
        for (i, arg) in args.into_iter().enumerate() {
            if i < params.len() {
                let want = params[i].ty;
                let arg = self.assign_convert(arg, want).map_err(|_| {
                    FrontError::ty(
                        &loc,
                        format!("incompatible type for argument {}", i + 1),
                    )
                })?;
                converted.push(arg);
            } else {
                converted.push(self.default_promote(arg));
            }
        }

        Ok(Expr::new(loc, ret, ExprKind::Call {
            callee: Box::new(callee),
            args: converted,
            va_arg_ty: None,
        }))
    }

    /// Default argument promotions for variadic extras: float to double,
    /// narrow integers to int.
    fn default_promote(&mut self, e: Expr) -> Expr {
        let e = self.decay(e);
        match self.types.get(e.ty.id) {
            Type::Arith { kind: ArithKind::Float, .. } => {
                let d = QualType::new(self.types.double_ty());
                self.implicit_cast(e, d)
            }
            Type::Arith { width, kind } if kind.is_integer() && *width < 32 => {
                let i = QualType::new(self.types.int_ty());
                self.implicit_cast(e, i)
            }
            _ => e,
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Expr> {
        let tok = self.toks.peek().clone();
        match tok.tag {
            Tag::LeftParen => {
                if self.toks.peek_n(1).tag == Tag::LeftBrace {
                    return self.parse_stmt_expr();
                }
                self.toks.next();
                let e = self.parse_expr()?;
                self.toks.expect(Tag::RightParen)?;
                Ok(e)
            }
            Tag::StringLiteral => self.parse_string_literal(),
            Tag::Identifier => {
                self.toks.next();
                let id = self.scopes.find_ordinary(&tok.lexeme).ok_or_else(|| {
                    FrontError::ty(&tok.loc, format!("undefined symbol: {}", tok.lexeme))
                })?;
                let sym = self.sym(id);
                match sym.kind {
                    SymKind::Object | SymKind::Func => {
                        Ok(Expr::new(tok.loc, sym.ty, ExprKind::Obj(id)))
                    }
                    SymKind::Enumerator(_) => {
                        let int_q = QualType::new(self.types.int_ty());
                        Ok(Expr::new(tok.loc, int_q, ExprKind::EnumConst(id)))
                    }
                    SymKind::Typedef => {
                        Err(FrontError::syntax(&tok.loc, format!("unexpected type name '{}'", tok.lexeme)))
                    }
                }
            }
            Tag::IntegerConstant => {
                let tok = self.toks.next();
                self.parse_integer(&tok)
            }
            Tag::FloatingConstant => {
                let tok = self.toks.next();
                self.parse_float(&tok)
            }
            Tag::CharacterConstant => {
                let tok = self.toks.next();
                self.parse_character(&tok)
            }
            Tag::Generic => {
                self.toks.next();
                self.parse_generic(tok.loc)
            }
            Tag::FuncName => {
                self.toks.next();
                let name = match &self.func {
                    Some(f) => f.name.clone(),
                    None => {
                        return Err(FrontError::syntax(
                            &tok.loc,
                            "__func__ used outside of a function",
                        ))
                    }
                };
                self.make_string_expr(tok.loc, name.chars().map(|c| c as u32).collect())
            }
            Tag::Offsetof => {
                self.toks.next();
                self.parse_offsetof(tok.loc)
            }
            _ => Err(FrontError::syntax(&tok.loc, format!("unexpected token '{}'", tok))),
        }
    }

    /// GNU statement expression `({ ... })`: typed as the final expression
    /// statement, or void.
    fn parse_stmt_expr(&mut self) -> Result<Expr> {
        let tok = self.toks.next(); // '('
        let body = self.parse_compound_stmt(None)?;
        self.toks.expect(Tag::RightParen)?;

        let ty = match &body.kind {
            StmtKind::Compound(stmts) => match stmts.last() {
                Some(s) => match &s.kind {
                    StmtKind::Expr(Some(e)) => e.ty,
                    _ => QualType::new(self.types.void_ty()),
                },
                None => QualType::new(self.types.void_ty()),
            },
            _ => unreachable!("compound statement expected"),
        };
        Ok(Expr::new(tok.loc, ty, ExprKind::StmtExpr(Box::new(body))))
    }

    fn parse_generic(&mut self, loc: SourceLoc) -> Result<Expr> {
        self.toks.expect(Tag::LeftParen)?;
        let ctrl = self.parse_assign_expr()?;
        let ctrl_ty = self.types.may_cast(ctrl.ty).unqualified();
        self.toks.expect(Tag::Comma)?;

        let mut chosen: Option<Expr> = None;
        let mut default_expr: Option<Expr> = None;
        loop {
            if self.toks.eat(Tag::Default) {
                self.toks.expect(Tag::Colon)?;
                let e = self.parse_assign_expr()?;
                if default_expr.is_some() {
                    return Err(FrontError::syntax(&loc, "duplicate default generic association"));
                }
                default_expr = Some(e);
            } else {
                let assoc_loc = self.toks.loc();
                if !self.is_type_name(self.toks.peek()) {
                    return Err(FrontError::syntax(&assoc_loc, "expected a type name"));
                }
                let ty = self.parse_type_name()?;
                self.toks.expect(Tag::Colon)?;
                let e = self.parse_assign_expr()?;
                if chosen.is_none() && self.types.compatible(ty, ctrl_ty) {
                    chosen = Some(e);
                }
            }
            if !self.toks.eat(Tag::Comma) {
                break;
            }
        }
        self.toks.expect(Tag::RightParen)?;

        chosen.or(default_expr).ok_or_else(|| {
            FrontError::ty(
                &loc,
                format!("no generic association for '{}'", self.types.display(ctrl_ty)),
            )
        })
    }

    fn parse_offsetof(&mut self, loc: SourceLoc) -> Result<Expr> {
        self.toks.expect(Tag::LeftParen)?;
        let ty = self.parse_type_name()?;
        self.toks.expect(Tag::Comma)?;

        if !self.types.is_record(ty.id) || !self.types.is_complete(ty.id) {
            return Err(FrontError::ty(&loc, "offsetof requires a complete struct/union type"));
        }

        let mut cur = ty;
        let mut offset = 0u64;
        let name = self.toks.expect(Tag::Identifier)?;
        let mref = self.types.member_ref(cur.id, &name.lexeme).ok_or_else(|| {
            FrontError::ty(&name.loc, format!("no member named '{}'", name.lexeme))
        })?;
        offset += mref.offset;
        cur = mref.ty;

        loop {
            if self.toks.eat(Tag::Period) {
                let m = self.toks.expect(Tag::Identifier)?;
                let mref = self.types.member_ref(cur.id, &m.lexeme).ok_or_else(|| {
                    FrontError::ty(&m.loc, format!("no member named '{}'", m.lexeme))
                })?;
                offset += mref.offset;
                cur = mref.ty;
            } else if self.toks.eat(Tag::LeftSquare) {
                let idx = self.parse_const_int()?;
                self.toks.expect(Tag::RightSquare)?;
                let elem = self.types.elem(cur.id).ok_or_else(|| {
                    FrontError::ty(&loc, "subscripted offsetof member is not an array")
                })?;
                let esize = self.types.size_of(elem.id).ok_or_else(|| {
                    FrontError::incomplete(&loc, "offsetof through an incomplete element")
                })?;
                offset += idx as u64 * esize;
                cur = elem;
            } else {
                break;
            }
        }
        self.toks.expect(Tag::RightParen)?;

        let ulong_q = QualType::new(self.types.ulong_ty());
        Ok(Expr::new(loc, ulong_q, ExprKind::IntConst(offset)))
    }

    fn parse_compound_literal(&mut self, loc: SourceLoc, ty: QualType) -> Result<Expr> {
        if !self.types.is_complete(ty.id) && !self.types.is_array(ty.id) {
            return Err(FrontError::incomplete(&loc, "compound literal of incomplete type"));
        }
        let (inits, completed) = self.parse_braced_initializer(ty)?;
        let ty = completed;

        let const_init = if self.scopes.is_file_scope() {
            let v = fold::fold_initializers(&self.types, &self.symbols, ty, &inits)?;
            Some(Box::new(v))
        } else {
            None
        };
        Ok(Expr::new(loc, ty, ExprKind::CompoundLit { inits, const_init }))
    }

    // --- literals ---

    pub(crate) fn parse_string_literal(&mut self) -> Result<Expr> {
        let first = self.toks.expect(Tag::StringLiteral)?;
        let loc = first.loc.clone();

        let (mut enc, mut data) = decode_string_token(&first)?;
        // Adjacent string literals coalesce. A prefixed literal may pair
        // with an unprefixed one but not with a differently prefixed one.
        while self.toks.test(Tag::StringLiteral) {
            let tok = self.toks.next();
            let (e2, mut d2) = decode_string_token(&tok)?;
            enc = match (enc, e2) {
                (None, e) | (e, None) => e,
                (Some(a), Some(b)) if a == b => Some(a),
                _ => {
                    return Err(FrontError::unsupported(
                        &tok.loc,
                        "concatenation of differently encoded string literals",
                    ))
                }
            };
            data.append(&mut d2);
        }
        data.push(0);

        let elem = match enc {
            None | Some(StrEnc::Utf8) => QualType::new(self.types.char_ty()),
            Some(StrEnc::Char16) => QualType::new(self.types.ushort_ty()),
            Some(StrEnc::Char32) => QualType::new(self.types.uint_ty()),
            Some(StrEnc::Wide) => QualType::new(self.types.int_ty()),
        };
        self.make_string_lit(loc, elem, data)
    }

    fn make_string_expr(&mut self, loc: SourceLoc, mut data: Vec<u32>) -> Result<Expr> {
        data.push(0);
        let elem = QualType::new(self.types.char_ty());
        self.make_string_lit(loc, elem, data)
    }

    fn make_string_lit(&mut self, loc: SourceLoc, elem: QualType, data: Vec<u32>) -> Result<Expr> {
        let ty = QualType::new(self.types.array_of(elem, Some(data.len() as u64)));
        let id = self.add_string(StrLit { data, elem, ty });
        Ok(Expr::new(loc, ty, ExprKind::Str(id)))
    }

    fn parse_integer(&mut self, tok: &Token) -> Result<Expr> {
        let s = tok.lexeme.as_str();
        let bytes = s.as_bytes();

        let (base, start): (u32, usize) = if s.len() > 2 && (s.starts_with("0x") || s.starts_with("0X")) {
            (16, 2)
        } else if s.len() > 2 && (s.starts_with("0b") || s.starts_with("0B")) {
            (2, 2)
        } else if s.len() > 1 && bytes[0] == b'0' && bytes[1].is_ascii_digit() {
            (8, 1)
        } else {
            (10, 0)
        };

        let mut val: u64 = 0;
        let mut i = start;
        let mut any = false;
        while i < bytes.len() {
            let d = match (bytes[i] as char).to_digit(base) {
                Some(d) => d,
                None => break,
            };
            any = true;
            val = val
                .checked_mul(base as u64)
                .and_then(|v| v.checked_add(d as u64))
                .ok_or_else(|| FrontError::syntax(&tok.loc, "integer constant out of range"))?;
            i += 1;
        }
        if !any && base != 8 {
            return Err(FrontError::syntax(&tok.loc, format!("invalid integer constant '{}'", s)));
        }

        // Suffix: u/U and l/L/ll/LL in any order, no repeats.
        let mut has_u = false;
        let mut has_l = false;
        while i < bytes.len() {
            match bytes[i] {
                b'u' | b'U' => {
                    if has_u {
                        return Err(FrontError::syntax(&tok.loc, format!("invalid suffix: {}", &s[i..])));
                    }
                    has_u = true;
                    i += 1;
                }
                b'l' | b'L' => {
                    if has_l {
                        return Err(FrontError::syntax(&tok.loc, format!("invalid suffix: {}", &s[i..])));
                    }
                    has_l = true;
                    i += 1;
                    if i < bytes.len() && (bytes[i] == b'l' || bytes[i] == b'L') {
                        i += 1;
                    }
                }
                _ => {
                    return Err(FrontError::syntax(&tok.loc, format!("invalid suffix: {}", &s[i..])))
                }
            }
        }

        // The C17 type table: decimal constants never fall back to an
        // unsigned type without a 'u' suffix.
        let decimal = base == 10;
        let ty = if decimal {
            match (has_u, has_l) {
                (false, false) => {
                    if val <= i32::MAX as u64 {
                        self.types.int_ty()
                    } else if val <= i64::MAX as u64 {
                        self.types.long_ty()
                    } else {
                        return Err(FrontError::syntax(&tok.loc, "integer constant out of range"));
                    }
                }
                (true, false) => {
                    if val <= u32::MAX as u64 {
                        self.types.uint_ty()
                    } else {
                        self.types.ulong_ty()
                    }
                }
                (false, true) => {
                    if val <= i64::MAX as u64 {
                        self.types.long_ty()
                    } else {
                        return Err(FrontError::syntax(&tok.loc, "integer constant out of range"));
                    }
                }
                (true, true) => self.types.ulong_ty(),
            }
        } else {
            match (has_u, has_l) {
                (false, false) => {
                    if val <= i32::MAX as u64 {
                        self.types.int_ty()
                    } else if val <= u32::MAX as u64 {
                        self.types.uint_ty()
                    } else if val <= i64::MAX as u64 {
                        self.types.long_ty()
                    } else {
                        self.types.ulong_ty()
                    }
                }
                (true, false) => {
                    if val <= u32::MAX as u64 {
                        self.types.uint_ty()
                    } else {
                        self.types.ulong_ty()
                    }
                }
                (false, true) => {
                    if val <= i64::MAX as u64 {
                        self.types.long_ty()
                    } else {
                        self.types.ulong_ty()
                    }
                }
                (true, true) => self.types.ulong_ty(),
            }
        };

        Ok(Expr::new(tok.loc.clone(), QualType::new(ty), ExprKind::IntConst(val)))
    }

    fn parse_float(&mut self, tok: &Token) -> Result<Expr> {
        let s = tok.lexeme.as_str();
        let (digits, ty) = if let Some(d) = s.strip_suffix(|c| c == 'f' || c == 'F') {
            (d, self.types.float_ty())
        } else if let Some(d) = s.strip_suffix(|c| c == 'l' || c == 'L') {
            (d, self.types.long_double_ty())
        } else {
            (s, self.types.double_ty())
        };

        let val: f64 = digits
            .parse()
            .map_err(|_| FrontError::syntax(&tok.loc, format!("invalid floating constant '{}'", s)))?;
        Ok(Expr::new(tok.loc.clone(), QualType::new(ty), ExprKind::FloatConst(val)))
    }

    fn parse_character(&mut self, tok: &Token) -> Result<Expr> {
        let s = tok.lexeme.as_str();
        let (enc, rest) = strip_encoding_prefix(s);
        let inner = rest
            .strip_prefix('\'')
            .and_then(|r| r.strip_suffix('\''))
            .ok_or_else(|| FrontError::syntax(&tok.loc, "malformed character constant"))?;
        let units = decode_escapes(inner, &tok.loc, enc)?;
        let v = *units.first().ok_or_else(|| {
            FrontError::syntax(&tok.loc, "empty character constant")
        })?;

        // A plain character constant has type int.
        let ty = match enc {
            None | Some(StrEnc::Utf8) | Some(StrEnc::Wide) => self.types.int_ty(),
            Some(StrEnc::Char16) => self.types.ushort_ty(),
            Some(StrEnc::Char32) => self.types.uint_ty(),
        };
        Ok(Expr::new(tok.loc.clone(), QualType::new(ty), ExprKind::IntConst(v as u64)))
    }

    // --- conversions and checked construction ---

    /// Array and function values decay to pointers when used.
    pub(crate) fn decay(&mut self, e: Expr) -> Expr {
        let adjusted = self.types.may_cast(e.ty);
        if adjusted.id != e.ty.id {
            Expr::new(e.loc.clone(), adjusted, ExprKind::Cast {
                implicit: true,
                operand: Box::new(e),
            })
        } else {
            e
        }
    }

    pub(crate) fn implicit_cast(&mut self, e: Expr, to: QualType) -> Expr {
        if e.ty.id == to.id {
            return e;
        }
        Expr::new(e.loc.clone(), to.unqualified(), ExprKind::Cast {
            implicit: true,
            operand: Box::new(e),
        })
    }

    pub(crate) fn is_null_const(&self, e: &Expr) -> bool {
        if !self.types.is_integer(e.ty.id) && !self.types.is_pointer(e.ty.id) {
            return false;
        }
        matches!(
            fold::eval(&self.types, &self.symbols, e),
            Ok(v) if v.is_zero()
        )
    }

    /// The conversions of simple assignment: used for `=`, initialization,
    /// argument passing, and `return`.
    pub(crate) fn assign_convert(&mut self, e: Expr, target: QualType) -> Result<Expr> {
        let e = self.decay(e);
        let tgt = target.unqualified();

        if self.types.compatible(e.ty, tgt) {
            return Ok(self.implicit_cast(e, tgt));
        }
        if self.types.is_arith(e.ty.id) && self.types.is_arith(tgt.id) {
            return Ok(self.implicit_cast(e, tgt));
        }
        if self.types.is_bool(tgt.id) && self.types.is_scalar(e.ty.id) {
            return Ok(self.implicit_cast(e, tgt));
        }
        if self.types.is_pointer(tgt.id) {
            if self.is_null_const(&e) {
                return Ok(self.implicit_cast(e, tgt));
            }
            if self.types.is_pointer(e.ty.id) {
                let p1 = self.types.pointee(e.ty.id).unwrap();
                let p2 = self.types.pointee(tgt.id).unwrap();
                if self.types.is_void(p1.id)
                    || self.types.is_void(p2.id)
                    || self.types.compatible(p1, p2)
                {
                    return Ok(self.implicit_cast(e, tgt));
                }
            }
        }

        Err(FrontError::ty(
            &e.loc,
            format!(
                "incompatible types: '{}' from '{}'",
                self.types.display(target),
                self.types.display(e.ty)
            ),
        ))
    }

    fn usual_convert(&mut self, l: Expr, r: Expr) -> (Expr, Expr, QualType) {
        let common = self.types.usual_arith(l.ty, r.ty);
        let l = self.implicit_cast(l, common);
        let r = self.implicit_cast(r, common);
        (l, r, common)
    }

    fn make_assign(&mut self, loc: SourceLoc, lhs: Expr, rhs: Expr) -> Result<Expr> {
        if !is_lvalue(&lhs, &self.symbols) {
            return Err(FrontError::ty(&loc, "assignment target is not an lvalue"));
        }
        if lhs.ty.is_const() {
            return Err(FrontError::ty(&loc, "assignment of read-only value"));
        }
        if self.types.is_array(lhs.ty.id) {
            return Err(FrontError::ty(&loc, "cannot assign to an array"));
        }
        if !self.types.is_complete(lhs.ty.id) {
            return Err(FrontError::incomplete(&loc, "assignment to an incomplete type"));
        }

        let ty = lhs.ty.unqualified();
        let rhs = self.assign_convert(rhs, ty)?;
        Ok(Expr::new(loc, ty, ExprKind::Binary {
            op: BinaryOp::Assign,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }))
    }

    fn make_cond(
        &mut self,
        loc: SourceLoc,
        cond: Expr,
        then_expr: Expr,
        else_expr: Expr,
    ) -> Result<Expr> {
        let cond = self.check_condition(cond)?;
        let t = self.decay(then_expr);
        let e = self.decay(else_expr);

        let (t, e, ty) = if self.types.is_arith(t.ty.id) && self.types.is_arith(e.ty.id) {
            let (t, e, common) = self.usual_convert(t, e);
            (t, e, common)
        } else if self.types.is_void(t.ty.id) && self.types.is_void(e.ty.id) {
            (t, e, QualType::new(self.types.void_ty()))
        } else if self.types.is_record(t.ty.id) && t.ty.id == e.ty.id {
            let ty = t.ty.unqualified();
            (t, e, ty)
        } else if self.types.is_pointer(t.ty.id) && self.is_null_const(&e) {
            let ty = t.ty.unqualified();
            let e = self.implicit_cast(e, ty);
            (t, e, ty)
        } else if self.types.is_pointer(e.ty.id) && self.is_null_const(&t) {
            let ty = e.ty.unqualified();
            let t = self.implicit_cast(t, ty);
            (t, e, ty)
        } else if self.types.is_pointer(t.ty.id) && self.types.is_pointer(e.ty.id) {
            let p1 = self.types.pointee(t.ty.id).unwrap();
            let p2 = self.types.pointee(e.ty.id).unwrap();
            if self.types.compatible(p1, p2) {
                let ty = t.ty.unqualified();
                (t, e, ty)
            } else if self.types.is_void(p1.id) || self.types.is_void(p2.id) {
                let ty = QualType::new(self.types.void_ptr_ty());
                let t = self.implicit_cast(t, ty);
                let e = self.implicit_cast(e, ty);
                (t, e, ty)
            } else {
                return Err(FrontError::ty(&loc, "pointer type mismatch in conditional expression"));
            }
        } else {
            return Err(FrontError::ty(&loc, "type mismatch in conditional expression"));
        };

        Ok(Expr::new(loc, ty, ExprKind::Cond {
            cond: Box::new(cond),
            then_expr: Box::new(t),
            else_expr: Box::new(e),
        }))
    }

    /// Conditions of if/while/for/do and ?: must have scalar type.
    pub(crate) fn check_condition(&mut self, e: Expr) -> Result<Expr> {
        let e = self.decay(e);
        if !self.types.is_scalar(e.ty.id) {
            return Err(FrontError::ty(&e.loc, "controlling expression is not scalar"));
        }
        Ok(e)
    }

    pub(crate) fn make_binary(
        &mut self,
        op: BinaryOp,
        loc: SourceLoc,
        lhs: Expr,
        rhs: Expr,
    ) -> Result<Expr> {
        let int_q = QualType::new(self.types.int_ty());
        let l = self.decay(lhs);
        let r = self.decay(rhs);

        let mk = |l: Expr, r: Expr, ty: QualType| {
            Expr::new(loc.clone(), ty, ExprKind::Binary {
                op,
                lhs: Box::new(l),
                rhs: Box::new(r),
            })
        };

        match op {
            BinaryOp::Add => {
                if self.types.is_pointer(l.ty.id) && self.types.is_integer(r.ty.id) {
                    self.check_pointer_arith(&loc, l.ty)?;
                    let ty = l.ty.unqualified();
                    return Ok(mk(l, r, ty));
                }
                if self.types.is_integer(l.ty.id) && self.types.is_pointer(r.ty.id) {
                    self.check_pointer_arith(&loc, r.ty)?;
                    let ty = r.ty.unqualified();
                    return Ok(mk(l, r, ty));
                }
                self.require_arith(&loc, &l, &r)?;
                let (l, r, ty) = self.usual_convert(l, r);
                Ok(mk(l, r, ty))
            }
            BinaryOp::Sub => {
                if self.types.is_pointer(l.ty.id) && self.types.is_integer(r.ty.id) {
                    self.check_pointer_arith(&loc, l.ty)?;
                    let ty = l.ty.unqualified();
                    return Ok(mk(l, r, ty));
                }
                if self.types.is_pointer(l.ty.id) && self.types.is_pointer(r.ty.id) {
                    let p1 = self.types.pointee(l.ty.id).unwrap();
                    let p2 = self.types.pointee(r.ty.id).unwrap();
                    if !self.types.compatible(p1, p2) {
                        return Err(FrontError::ty(&loc, "subtraction of incompatible pointers"));
                    }
                    self.check_pointer_arith(&loc, l.ty)?;
                    // Pointer difference is a signed pointer-sized integer.
                    let ty = QualType::new(self.types.long_ty());
                    return Ok(mk(l, r, ty));
                }
                self.require_arith(&loc, &l, &r)?;
                let (l, r, ty) = self.usual_convert(l, r);
                Ok(mk(l, r, ty))
            }
            BinaryOp::Mul | BinaryOp::Div => {
                self.require_arith(&loc, &l, &r)?;
                let (l, r, ty) = self.usual_convert(l, r);
                Ok(mk(l, r, ty))
            }
            BinaryOp::Rem | BinaryOp::BitAnd | BinaryOp::BitXor | BinaryOp::BitOr => {
                self.require_integer(&loc, &l, &r)?;
                let (l, r, ty) = self.usual_convert(l, r);
                Ok(mk(l, r, ty))
            }
            BinaryOp::Shl | BinaryOp::Shr => {
                self.require_integer(&loc, &l, &r)?;
                // Shifts promote each operand independently; the result has
                // the promoted left operand's type.
                let lt = self.types.promote(l.ty);
                let rt = self.types.promote(r.ty);
                let l = self.implicit_cast(l, lt);
                let r = self.implicit_cast(r, rt);
                Ok(mk(l, r, lt))
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                if self.types.is_arith(l.ty.id) && self.types.is_arith(r.ty.id) {
                    let (l, r, _) = self.usual_convert(l, r);
                    return Ok(mk(l, r, int_q));
                }
                if self.types.is_pointer(l.ty.id) && self.types.is_pointer(r.ty.id) {
                    let p1 = self.types.pointee(l.ty.id).unwrap();
                    let p2 = self.types.pointee(r.ty.id).unwrap();
                    if self.types.compatible(p1, p2)
                        || self.types.is_void(p1.id)
                        || self.types.is_void(p2.id)
                    {
                        return Ok(mk(l, r, int_q));
                    }
                }
                Err(FrontError::ty(&loc, "invalid operands to relational operator"))
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                if self.types.is_arith(l.ty.id) && self.types.is_arith(r.ty.id) {
                    let (l, r, _) = self.usual_convert(l, r);
                    return Ok(mk(l, r, int_q));
                }
                if self.types.is_pointer(l.ty.id) && self.is_null_const(&r) {
                    let ty = l.ty;
                    let r = self.implicit_cast(r, ty);
                    return Ok(mk(l, r, int_q));
                }
                if self.types.is_pointer(r.ty.id) && self.is_null_const(&l) {
                    let ty = r.ty;
                    let l = self.implicit_cast(l, ty);
                    return Ok(mk(l, r, int_q));
                }
                if self.types.is_pointer(l.ty.id) && self.types.is_pointer(r.ty.id) {
                    let p1 = self.types.pointee(l.ty.id).unwrap();
                    let p2 = self.types.pointee(r.ty.id).unwrap();
                    if self.types.compatible(p1, p2)
                        || self.types.is_void(p1.id)
                        || self.types.is_void(p2.id)
                    {
                        return Ok(mk(l, r, int_q));
                    }
                }
                Err(FrontError::ty(&loc, "invalid operands to equality operator"))
            }
            BinaryOp::LogAnd | BinaryOp::LogOr => {
                if !self.types.is_scalar(l.ty.id) || !self.types.is_scalar(r.ty.id) {
                    return Err(FrontError::ty(&loc, "operands of &&/|| must be scalar"));
                }
                Ok(mk(l, r, int_q))
            }
            BinaryOp::Comma => {
                let ty = r.ty;
                Ok(mk(l, r, ty))
            }
            BinaryOp::Assign => unreachable!("assignment goes through make_assign"),
        }
    }

    fn check_pointer_arith(&self, loc: &SourceLoc, ptr: QualType) -> Result<()> {
        let pointee = self.types.pointee(ptr.id).unwrap();
        if !self.types.is_complete(pointee.id) {
            return Err(FrontError::incomplete(loc, "arithmetic on pointer to incomplete type"));
        }
        Ok(())
    }

    fn require_arith(&self, loc: &SourceLoc, l: &Expr, r: &Expr) -> Result<()> {
        if self.types.is_arith(l.ty.id) && self.types.is_arith(r.ty.id) {
            Ok(())
        } else {
            Err(FrontError::ty(
                loc,
                format!(
                    "invalid operands ('{}' and '{}')",
                    self.types.display(l.ty),
                    self.types.display(r.ty)
                ),
            ))
        }
    }

    fn require_integer(&self, loc: &SourceLoc, l: &Expr, r: &Expr) -> Result<()> {
        if self.types.is_integer(l.ty.id) && self.types.is_integer(r.ty.id) {
            Ok(())
        } else {
            Err(FrontError::ty(
                loc,
                format!(
                    "integer operands required ('{}' and '{}')",
                    self.types.display(l.ty),
                    self.types.display(r.ty)
                ),
            ))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StrEnc {
    Utf8,
    Char16,
    Char32,
    Wide,
}

/// Mask for numeric escapes: a code unit is 8, 16, or 32 bits wide
/// depending on the literal's encoding.
fn escape_mask(enc: Option<StrEnc>) -> u32 {
    match enc {
        None | Some(StrEnc::Utf8) => 0xFF,
        Some(StrEnc::Char16) => 0xFFFF,
        Some(StrEnc::Char32) | Some(StrEnc::Wide) => u32::MAX,
    }
}

fn strip_encoding_prefix(s: &str) -> (Option<StrEnc>, &str) {
    if let Some(rest) = s.strip_prefix("u8") {
        (Some(StrEnc::Utf8), rest)
    } else if let Some(rest) = s.strip_prefix('u') {
        (Some(StrEnc::Char16), rest)
    } else if let Some(rest) = s.strip_prefix('U') {
        (Some(StrEnc::Char32), rest)
    } else if let Some(rest) = s.strip_prefix('L') {
        (Some(StrEnc::Wide), rest)
    } else {
        (None, s)
    }
}

pub(crate) fn decode_string_token(tok: &Token) -> Result<(Option<StrEnc>, Vec<u32>)> {
    let (enc, rest) = strip_encoding_prefix(&tok.lexeme);
    let inner = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .ok_or_else(|| FrontError::syntax(&tok.loc, "malformed string literal"))?;
    Ok((enc, decode_escapes(inner, &tok.loc, enc)?))
}

/// Decode the escape sequences of a string or character literal body.
/// Numeric escapes are truncated to the encoding's code-unit width.
fn decode_escapes(inner: &str, loc: &SourceLoc, enc: Option<StrEnc>) -> Result<Vec<u32>> {
    let mask = escape_mask(enc);
    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c as u32);
            continue;
        }
        let esc = chars
            .next()
            .ok_or_else(|| FrontError::syntax(loc, "stray backslash in literal"))?;
        let v = match esc {
            'n' => 10,
            't' => 9,
            'r' => 13,
            'a' => 7,
            'b' => 8,
            'f' => 12,
            'v' => 11,
            '\\' => 92,
            '\'' => 39,
            '"' => 34,
            '?' => 63,
            'x' => {
                let mut v: u32 = 0;
                let mut seen = false;
                while let Some(h) = chars.peek().and_then(|c| c.to_digit(16)) {
                    v = v.wrapping_shl(4) | h;
                    chars.next();
                    seen = true;
                }
                if !seen {
                    return Err(FrontError::syntax(loc, "\\x used with no hex digits"));
                }
                v & mask
            }
            '0'..='7' => {
                let mut v = esc.to_digit(8).unwrap();
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            v = (v << 3) | d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                v & mask
            }
            other => other as u32,
        };
        out.push(v);
    }
    Ok(out)
}
