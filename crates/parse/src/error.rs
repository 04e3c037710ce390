use thiserror::Error;
use token::SourceLoc;

/// Front-end diagnostics. Every variant carries the source location of the
/// offending construct; an error aborts parsing of the translation unit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrontError {
    #[error("{loc}: syntax error: {msg}")]
    Syntax { loc: SourceLoc, msg: String },

    #[error("{loc}: {msg}")]
    Redefinition { loc: SourceLoc, msg: String },

    #[error("{loc}: {msg}")]
    Type { loc: SourceLoc, msg: String },

    #[error("{loc}: {msg}")]
    Incomplete { loc: SourceLoc, msg: String },

    #[error("{loc}: constant expression required: {msg}")]
    ConstExpr { loc: SourceLoc, msg: String },

    #[error("{loc}: invalid initializer: {msg}")]
    Initializer { loc: SourceLoc, msg: String },

    #[error("{loc}: static assertion failed: {msg}")]
    StaticAssert { loc: SourceLoc, msg: String },

    #[error("{loc}: unsupported: {msg}")]
    Unsupported { loc: SourceLoc, msg: String },
}

impl FrontError {
    pub fn syntax(loc: &SourceLoc, msg: impl Into<String>) -> Self {
        FrontError::Syntax { loc: loc.clone(), msg: msg.into() }
    }

    pub fn redefinition(loc: &SourceLoc, msg: impl Into<String>) -> Self {
        FrontError::Redefinition { loc: loc.clone(), msg: msg.into() }
    }

    pub fn ty(loc: &SourceLoc, msg: impl Into<String>) -> Self {
        FrontError::Type { loc: loc.clone(), msg: msg.into() }
    }

    pub fn incomplete(loc: &SourceLoc, msg: impl Into<String>) -> Self {
        FrontError::Incomplete { loc: loc.clone(), msg: msg.into() }
    }

    pub fn const_expr(loc: &SourceLoc, msg: impl Into<String>) -> Self {
        FrontError::ConstExpr { loc: loc.clone(), msg: msg.into() }
    }

    pub fn initializer(loc: &SourceLoc, msg: impl Into<String>) -> Self {
        FrontError::Initializer { loc: loc.clone(), msg: msg.into() }
    }

    pub fn static_assert(loc: &SourceLoc, msg: impl Into<String>) -> Self {
        FrontError::StaticAssert { loc: loc.clone(), msg: msg.into() }
    }

    pub fn unsupported(loc: &SourceLoc, msg: impl Into<String>) -> Self {
        FrontError::Unsupported { loc: loc.clone(), msg: msg.into() }
    }

    pub fn loc(&self) -> &SourceLoc {
        match self {
            FrontError::Syntax { loc, .. }
            | FrontError::Redefinition { loc, .. }
            | FrontError::Type { loc, .. }
            | FrontError::Incomplete { loc, .. }
            | FrontError::ConstExpr { loc, .. }
            | FrontError::Initializer { loc, .. }
            | FrontError::StaticAssert { loc, .. }
            | FrontError::Unsupported { loc, .. } => loc,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrontError>;
