//! C17 front-end: recursive-descent parser with integrated semantic
//! analysis. Consumes a preprocessed token stream and produces a typed,
//! checked [`TranslationUnit`]; any diagnostic aborts the unit.

pub mod ast;
pub mod error;
pub mod fold;
pub mod scope;

mod builtins;
mod parser;
mod stream;

pub use ast::*;
pub use error::{FrontError, Result};
pub use fold::{eval, eval_int, PtrBase, Value, ValueKind};
pub use parser::Parser;
pub use stream::TokenStream;

use token::Token;

/// Parse a token sequence into a translation unit.
pub fn parse_translation_unit(tokens: Vec<Token>) -> Result<TranslationUnit> {
    Parser::new(tokens).parse()
}
