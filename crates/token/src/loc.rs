use std::fmt;

/// Source position carried on every token and AST node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLoc {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self { file: file.into(), line, column }
    }

    /// Location used for identifiers installed by the compiler itself.
    pub fn builtin() -> Self {
        Self { file: "<builtin>".to_string(), line: 0, column: 0 }
    }
}

impl Default for SourceLoc {
    fn default() -> Self {
        Self { file: String::new(), line: 1, column: 1 }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
