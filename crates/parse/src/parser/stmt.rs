//! Statement grammar. Case labels attach to the nearest enclosing switch
//! through a parser-owned stack; break/continue validate their nesting;
//! goto targets are collected and resolved at the end of the function body.

use super::{Parser, SwitchFrame};
use crate::ast::{
    ForInit, FuncSpec, Linkage, StmtKind, StorageClass, SymKind, Symbol, Stmt,
};
use crate::error::{FrontError, Result};
use crate::fold;
use crate::scope::ScopeKind;
use token::Tag;
use types::Param;

impl Parser {
    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt> {
        self.try_attribute_spec()?;

        let tok = self.toks.peek().clone();
        match tok.tag {
            Tag::Identifier if self.toks.peek_n(1).tag == Tag::Colon => self.parse_label_stmt(),
            Tag::Case => self.parse_case_stmt(),
            Tag::Default => self.parse_default_stmt(),
            Tag::LeftBrace => self.parse_compound_stmt(None),
            Tag::If => self.parse_if_stmt(),
            Tag::Switch => self.parse_switch_stmt(),
            Tag::While => self.parse_while_stmt(),
            Tag::Do => self.parse_do_while_stmt(),
            Tag::For => self.parse_for_stmt(),
            Tag::Goto => self.parse_goto_stmt(),
            Tag::Continue => {
                self.toks.next();
                self.toks.expect(Tag::Semicolon)?;
                if self.loop_depth == 0 {
                    return Err(FrontError::syntax(&tok.loc, "'continue' outside of a loop"));
                }
                Ok(Stmt::new(tok.loc, StmtKind::Continue))
            }
            Tag::Break => {
                self.toks.next();
                self.toks.expect(Tag::Semicolon)?;
                if self.loop_depth == 0 && self.switches.is_empty() {
                    return Err(FrontError::syntax(&tok.loc, "'break' outside of a loop or switch"));
                }
                Ok(Stmt::new(tok.loc, StmtKind::Break))
            }
            Tag::Return => self.parse_return_stmt(),
            _ => self.parse_expr_stmt(),
        }
    }

    pub(crate) fn parse_compound_stmt(&mut self, params: Option<&[Param]>) -> Result<Stmt> {
        let tok = self.toks.expect(Tag::LeftBrace)?;
        self.scopes.enter(ScopeKind::Block);

        if let Some(params) = params {
            for p in params {
                let name = p.name.clone().expect("named parameter");
                let id = self.add_symbol(Symbol {
                    name: name.clone(),
                    ty: p.ty,
                    loc: tok.loc.clone(),
                    kind: SymKind::Object,
                    linkage: Linkage::None,
                    storage: StorageClass::empty(),
                    func_spec: FuncSpec::empty(),
                    align: None,
                    static_storage: false,
                    defined: true,
                    is_builtin: false,
                });
                self.scopes.insert_ordinary(name, id);
            }
        }

        let mut stmts = Vec::new();
        while !self.toks.eat(Tag::RightBrace) {
            if !self.toks.has_next() {
                return Err(FrontError::syntax(&self.toks.loc(), "premature end of input"));
            }
            if self.is_decl_start(self.toks.peek()) {
                let loc = self.toks.loc();
                for d in self.parse_block_decl()? {
                    stmts.push(Stmt::new(loc.clone(), StmtKind::Decl(d)));
                }
            } else {
                stmts.push(self.parse_stmt()?);
            }
        }

        self.scopes.exit();
        Ok(Stmt::new(tok.loc, StmtKind::Compound(stmts)))
    }

    fn parse_label_stmt(&mut self) -> Result<Stmt> {
        let tok = self.toks.next();
        self.toks.expect(Tag::Colon)?;
        self.try_attribute_spec()?;

        let name = tok.lexeme.clone();
        {
            let ctx = self
                .func
                .as_mut()
                .ok_or_else(|| FrontError::syntax(&tok.loc, "label outside of a function"))?;
            if ctx.labels.contains(&name) {
                return Err(FrontError::redefinition(
                    &tok.loc,
                    format!("duplicate label '{}'", name),
                ));
            }
            ctx.labels.push(name.clone());
        }

        let body = self.parse_stmt()?;
        Ok(Stmt::new(tok.loc, StmtKind::Label { name, body: Box::new(body) }))
    }

    fn parse_case_stmt(&mut self) -> Result<Stmt> {
        let tok = self.toks.next();

        let e = self.parse_constant_expr()?;
        if !self.types.is_integer(e.ty.id) {
            return Err(FrontError::ty(&e.loc, "case label is not an integer"));
        }
        let low = fold::eval_int(&self.types, &self.symbols, &e)?;

        // GNU range: case L ... H:
        let high = if self.toks.eat(Tag::Ellipsis) {
            let e2 = self.parse_constant_expr()?;
            if !self.types.is_integer(e2.ty.id) {
                return Err(FrontError::ty(&e2.loc, "case label is not an integer"));
            }
            let h = fold::eval_int(&self.types, &self.symbols, &e2)?;
            if h < low {
                return Err(FrontError::ty(&e2.loc, "empty case range"));
            }
            h
        } else {
            low
        };
        self.toks.expect(Tag::Colon)?;

        let frame = self
            .switches
            .last_mut()
            .ok_or_else(|| FrontError::syntax(&tok.loc, "'case' outside of a switch"))?;
        for (lo, hi) in &frame.cases {
            if low <= *hi && *lo <= high {
                return Err(FrontError::redefinition(
                    &tok.loc,
                    format!("duplicate case value {}", low),
                ));
            }
        }
        frame.cases.push((low, high));

        let body = self.parse_stmt()?;
        Ok(Stmt::new(tok.loc, StmtKind::Case { low, high, body: Box::new(body) }))
    }

    fn parse_default_stmt(&mut self) -> Result<Stmt> {
        let tok = self.toks.next();
        self.toks.expect(Tag::Colon)?;

        let frame = self
            .switches
            .last_mut()
            .ok_or_else(|| FrontError::syntax(&tok.loc, "'default' outside of a switch"))?;
        if frame.has_default {
            return Err(FrontError::redefinition(&tok.loc, "multiple default labels in one switch"));
        }
        frame.has_default = true;

        let body = self.parse_stmt()?;
        Ok(Stmt::new(tok.loc, StmtKind::Default(Box::new(body))))
    }

    fn parse_if_stmt(&mut self) -> Result<Stmt> {
        let tok = self.toks.next();
        self.toks.expect(Tag::LeftParen)?;
        let cond = self.parse_expr()?;
        let cond = self.check_condition(cond)?;
        self.toks.expect(Tag::RightParen)?;

        let then_stmt = Box::new(self.parse_stmt()?);
        let else_stmt = if self.toks.eat(Tag::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::new(tok.loc, StmtKind::If { cond, then_stmt, else_stmt }))
    }

    fn parse_switch_stmt(&mut self) -> Result<Stmt> {
        let tok = self.toks.next();
        self.toks.expect(Tag::LeftParen)?;
        let cond = self.parse_expr()?;
        let cond = self.decay(cond);
        if !self.types.is_integer(cond.ty.id) {
            return Err(FrontError::ty(&cond.loc, "switch condition is not an integer"));
        }
        let promoted = self.types.promote(cond.ty);
        let cond = self.implicit_cast(cond, promoted);
        self.toks.expect(Tag::RightParen)?;

        self.switches.push(SwitchFrame { cases: Vec::new(), has_default: false });
        let body = self.parse_stmt();
        let frame = self.switches.pop().unwrap();
        let body = body?;

        Ok(Stmt::new(tok.loc, StmtKind::Switch {
            cond,
            body: Box::new(body),
            cases: frame.cases,
            has_default: frame.has_default,
        }))
    }

    fn parse_while_stmt(&mut self) -> Result<Stmt> {
        let tok = self.toks.next();
        self.toks.expect(Tag::LeftParen)?;
        let cond = self.parse_expr()?;
        let cond = self.check_condition(cond)?;
        self.toks.expect(Tag::RightParen)?;

        self.loop_depth += 1;
        let body = self.parse_stmt();
        self.loop_depth -= 1;

        Ok(Stmt::new(tok.loc, StmtKind::While { cond, body: Box::new(body?) }))
    }

    fn parse_do_while_stmt(&mut self) -> Result<Stmt> {
        let tok = self.toks.next();

        self.loop_depth += 1;
        let body = self.parse_stmt();
        self.loop_depth -= 1;
        let body = body?;

        self.toks.expect(Tag::While)?;
        self.toks.expect(Tag::LeftParen)?;
        let cond = self.parse_expr()?;
        let cond = self.check_condition(cond)?;
        self.toks.expect(Tag::RightParen)?;
        self.toks.expect(Tag::Semicolon)?;

        Ok(Stmt::new(tok.loc, StmtKind::DoWhile { body: Box::new(body), cond }))
    }

    fn parse_for_stmt(&mut self) -> Result<Stmt> {
        let tok = self.toks.next();
        self.toks.expect(Tag::LeftParen)?;

        // The whole statement gets its own scope for declarations in the
        // init clause.
        self.scopes.enter(ScopeKind::Block);

        let init = if self.is_decl_start(self.toks.peek()) {
            Some(ForInit::Decl(self.parse_block_decl()?))
        } else if self.toks.eat(Tag::Semicolon) {
            None
        } else {
            let e = self.parse_expr()?;
            self.toks.expect(Tag::Semicolon)?;
            Some(ForInit::Expr(e))
        };

        let cond = if self.toks.eat(Tag::Semicolon) {
            None
        } else {
            let e = self.parse_expr()?;
            let e = self.check_condition(e)?;
            self.toks.expect(Tag::Semicolon)?;
            Some(e)
        };

        let step = if self.toks.eat(Tag::RightParen) {
            None
        } else {
            let e = self.parse_expr()?;
            self.toks.expect(Tag::RightParen)?;
            Some(e)
        };

        self.loop_depth += 1;
        let body = self.parse_stmt();
        self.loop_depth -= 1;

        self.scopes.exit();
        Ok(Stmt::new(tok.loc, StmtKind::For {
            init,
            cond,
            step,
            body: Box::new(body?),
        }))
    }

    fn parse_goto_stmt(&mut self) -> Result<Stmt> {
        let tok = self.toks.next();
        let target = self.toks.expect(Tag::Identifier)?;
        self.toks.expect(Tag::Semicolon)?;

        let ctx = self
            .func
            .as_mut()
            .ok_or_else(|| FrontError::syntax(&tok.loc, "'goto' outside of a function"))?;
        ctx.gotos.push((target.lexeme.clone(), target.loc));

        Ok(Stmt::new(tok.loc, StmtKind::Goto { label: target.lexeme }))
    }

    fn parse_return_stmt(&mut self) -> Result<Stmt> {
        let tok = self.toks.next();
        let ret = self
            .func
            .as_ref()
            .ok_or_else(|| FrontError::syntax(&tok.loc, "'return' outside of a function"))?
            .ret;

        if self.toks.eat(Tag::Semicolon) {
            if !self.types.is_void(ret.id) {
                log::warn!("{}: 'return' with no value in a non-void function", tok.loc);
            }
            return Ok(Stmt::new(tok.loc, StmtKind::Return(None)));
        }

        let e = self.parse_expr()?;
        self.toks.expect(Tag::Semicolon)?;
        if self.types.is_void(ret.id) {
            return Err(FrontError::ty(&tok.loc, "void function should not return a value"));
        }
        let e = self.assign_convert(e, ret)?;
        Ok(Stmt::new(tok.loc, StmtKind::Return(Some(e))))
    }

    fn parse_expr_stmt(&mut self) -> Result<Stmt> {
        let loc = self.toks.loc();
        if self.toks.eat(Tag::Semicolon) {
            return Ok(Stmt::new(loc, StmtKind::Expr(None)));
        }
        let e = self.parse_expr()?;
        self.toks.expect(Tag::Semicolon)?;
        Ok(Stmt::new(loc, StmtKind::Expr(Some(e))))
    }
}
