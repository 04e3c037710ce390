use crate::error::{FrontError, Result};
use token::{SourceLoc, Tag, Token};

/// Random-access cursor over the token sequence. `mark`/`rewind` exist for
/// the grouped-declarator re-parse.
pub struct TokenStream {
    toks: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    pub fn new(mut toks: Vec<Token>) -> Self {
        // The sequence is always EOF-terminated so peeking never runs off.
        if toks.last().map(|t| t.tag) != Some(Tag::Eof) {
            let loc = toks.last().map(|t| t.loc.clone()).unwrap_or_default();
            toks.push(Token::new(Tag::Eof, "", loc));
        }
        Self { toks, pos: 0 }
    }

    pub fn has_next(&self) -> bool {
        self.peek().tag != Tag::Eof
    }

    pub fn peek(&self) -> &Token {
        &self.toks[self.pos.min(self.toks.len() - 1)]
    }

    pub fn peek_n(&self, n: usize) -> &Token {
        let i = (self.pos + n).min(self.toks.len() - 1);
        &self.toks[i]
    }

    pub fn loc(&self) -> SourceLoc {
        self.peek().loc.clone()
    }

    pub fn next(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.toks.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    pub fn put_back(&mut self) {
        debug_assert!(self.pos > 0);
        self.pos -= 1;
    }

    pub fn test(&self, tag: Tag) -> bool {
        self.peek().tag == tag
    }

    /// Consume the next token if it matches.
    pub fn eat(&mut self, tag: Tag) -> bool {
        if self.test(tag) {
            self.next();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, tag: Tag) -> Result<Token> {
        if self.test(tag) {
            Ok(self.next())
        } else {
            let found = self.peek();
            Err(FrontError::syntax(
                &found.loc,
                format!("expected {:?}, found '{}'", tag, found),
            ))
        }
    }

    pub fn mark(&self) -> usize {
        self.pos
    }

    pub fn rewind(&mut self, mark: usize) {
        debug_assert!(mark < self.toks.len());
        self.pos = mark;
    }
}
