pub mod loc;
pub mod token;

pub use loc::SourceLoc;
pub use token::{Tag, Token};
