//! Test-support scanner: turns C snippets into the token contract the
//! front-end consumes. The real driver feeds preprocessed tokens from an
//! external scanner; tests produce them from source text directly.

use token::{SourceLoc, Tag, Token};

pub fn lex(src: &str) -> Vec<Token> {
    Scanner::new(src).run()
}

/// Parse a snippet, panicking on a diagnostic.
#[allow(dead_code)]
pub fn parse_ok(src: &str) -> parse::TranslationUnit {
    parse::parse_translation_unit(lex(src)).expect("parse ok")
}

/// Parse a snippet that must fail; returns the diagnostic.
#[allow(dead_code)]
pub fn parse_err(src: &str) -> parse::FrontError {
    match parse::parse_translation_unit(lex(src)) {
        Ok(_) => panic!("expected a diagnostic for: {}", src),
        Err(e) => e,
    }
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { bytes: src.as_bytes(), pos: 0, line: 1, col: 1 }
    }

    fn loc(&self) -> SourceLoc {
        SourceLoc::new("<test>", self.line, self.col)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.bytes[self.pos..].starts_with(s.as_bytes())
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if (c as char).is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.bump_n(2);
                    while self.pos < self.bytes.len() && !self.starts_with("*/") {
                        self.bump();
                    }
                    self.bump_n(2);
                }
                _ => return,
            }
        }
    }

    fn run(mut self) -> Vec<Token> {
        let mut out = Vec::new();
        loop {
            self.skip_ws_and_comments();
            let loc = self.loc();
            let Some(c) = self.peek() else {
                out.push(Token::new(Tag::Eof, "", loc));
                return out;
            };

            if is_ident_start(c) {
                out.push(self.ident_or_prefixed_literal(loc));
            } else if c.is_ascii_digit()
                || (c == b'.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()))
            {
                out.push(self.number(loc));
            } else if c == b'"' {
                out.push(self.string_lit(loc, 0));
            } else if c == b'\'' {
                out.push(self.char_lit(loc, 0));
            } else {
                out.push(self.punct(loc));
            }
        }
    }

    fn ident_or_prefixed_literal(&mut self, loc: SourceLoc) -> Token {
        // String/char encoding prefixes glue to the quote.
        for pfx in ["u8", "u", "U", "L"] {
            if self.starts_with(pfx) {
                let after = self.pos + pfx.len();
                match self.bytes.get(after) {
                    Some(b'"') => {
                        self.bump_n(pfx.len());
                        return self.string_lit(loc, pfx.len());
                    }
                    Some(b'\'') if pfx != "u8" => {
                        self.bump_n(pfx.len());
                        return self.char_lit(loc, pfx.len());
                    }
                    _ => {}
                }
            }
        }

        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        match keyword_tag(text) {
            Some(tag) => Token::new(tag, text, loc),
            None => Token::new(Tag::Identifier, text, loc),
        }
    }

    fn number(&mut self, loc: SourceLoc) -> Token {
        let start = self.pos;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                b'0'..=b'9' | b'a'..=b'd' | b'A'..=b'D' | b'f' | b'F' | b'x' | b'X' | b'u'
                | b'U' | b'l' | b'L' => {
                    self.bump();
                }
                b'e' | b'E' => {
                    self.bump();
                    if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                        is_float = true;
                        self.bump();
                    }
                }
                b'.' => {
                    is_float = true;
                    self.bump();
                }
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        let hexish = text.starts_with("0x") || text.starts_with("0X");
        let binish = text.starts_with("0b") || text.starts_with("0B");
        if !hexish && (is_float || (!binish && text.contains(['e', 'E']))) {
            Token::new(Tag::FloatingConstant, text, loc)
        } else {
            Token::new(Tag::IntegerConstant, text, loc)
        }
    }

    fn string_lit(&mut self, loc: SourceLoc, prefix_len: usize) -> Token {
        let start = self.pos - prefix_len;
        self.bump(); // opening quote
        while let Some(c) = self.peek() {
            match c {
                b'\\' => {
                    self.bump();
                    self.bump();
                }
                b'"' => {
                    self.bump();
                    break;
                }
                _ => {
                    self.bump();
                }
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        Token::new(Tag::StringLiteral, text, loc)
    }

    fn char_lit(&mut self, loc: SourceLoc, prefix_len: usize) -> Token {
        let start = self.pos - prefix_len;
        self.bump(); // opening quote
        while let Some(c) = self.peek() {
            match c {
                b'\\' => {
                    self.bump();
                    self.bump();
                }
                b'\'' => {
                    self.bump();
                    break;
                }
                _ => {
                    self.bump();
                }
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        Token::new(Tag::CharacterConstant, text, loc)
    }

    fn punct(&mut self, loc: SourceLoc) -> Token {
        const PUNCTS: &[(&str, Tag)] = &[
            ("...", Tag::Ellipsis),
            ("<<=", Tag::LessLessEqual),
            (">>=", Tag::GreaterGreaterEqual),
            ("->", Tag::Arrow),
            ("++", Tag::PlusPlus),
            ("--", Tag::MinusMinus),
            ("<<", Tag::LessLess),
            (">>", Tag::GreaterGreater),
            ("<=", Tag::LessEqual),
            (">=", Tag::GreaterEqual),
            ("==", Tag::EqualEqual),
            ("!=", Tag::ExclaimEqual),
            ("&&", Tag::AmpAmp),
            ("||", Tag::PipePipe),
            ("+=", Tag::PlusEqual),
            ("-=", Tag::MinusEqual),
            ("*=", Tag::StarEqual),
            ("/=", Tag::SlashEqual),
            ("%=", Tag::PercentEqual),
            ("&=", Tag::AmpEqual),
            ("|=", Tag::PipeEqual),
            ("^=", Tag::CaretEqual),
            ("(", Tag::LeftParen),
            (")", Tag::RightParen),
            ("{", Tag::LeftBrace),
            ("}", Tag::RightBrace),
            ("[", Tag::LeftSquare),
            ("]", Tag::RightSquare),
            (";", Tag::Semicolon),
            (",", Tag::Comma),
            (".", Tag::Period),
            ("+", Tag::Plus),
            ("-", Tag::Minus),
            ("*", Tag::Star),
            ("/", Tag::Slash),
            ("%", Tag::Percent),
            ("&", Tag::Amp),
            ("|", Tag::Pipe),
            ("^", Tag::Caret),
            ("~", Tag::Tilde),
            ("!", Tag::Exclaim),
            ("?", Tag::Question),
            (":", Tag::Colon),
            ("=", Tag::Equal),
            ("<", Tag::Less),
            (">", Tag::Greater),
        ];
        for (text, tag) in PUNCTS {
            if self.starts_with(text) {
                self.bump_n(text.len());
                return Token::new(*tag, *text, loc);
            }
        }
        let c = self.bump().unwrap();
        panic!("test scanner: unexpected character '{}'", c as char);
    }
}

fn is_ident_start(c: u8) -> bool {
    c == b'_' || (c as char).is_ascii_alphabetic()
}

fn is_ident_continue(c: u8) -> bool {
    c == b'_' || (c as char).is_ascii_alphanumeric()
}

fn keyword_tag(text: &str) -> Option<Tag> {
    let tag = match text {
        "auto" => Tag::Auto,
        "break" => Tag::Break,
        "case" => Tag::Case,
        "char" => Tag::Char,
        "const" => Tag::Const,
        "continue" => Tag::Continue,
        "default" => Tag::Default,
        "do" => Tag::Do,
        "double" => Tag::Double,
        "else" => Tag::Else,
        "enum" => Tag::Enum,
        "extern" => Tag::Extern,
        "float" => Tag::Float,
        "for" => Tag::For,
        "goto" => Tag::Goto,
        "if" => Tag::If,
        "inline" => Tag::Inline,
        "int" => Tag::Int,
        "long" => Tag::Long,
        "register" => Tag::Register,
        "restrict" => Tag::Restrict,
        "return" => Tag::Return,
        "short" => Tag::Short,
        "signed" => Tag::Signed,
        "sizeof" => Tag::Sizeof,
        "static" => Tag::Static,
        "struct" => Tag::Struct,
        "switch" => Tag::Switch,
        "typedef" => Tag::Typedef,
        "union" => Tag::Union,
        "unsigned" => Tag::Unsigned,
        "void" => Tag::Void,
        "volatile" => Tag::Volatile,
        "while" => Tag::While,
        "_Alignas" => Tag::Alignas,
        "_Alignof" => Tag::Alignof,
        "_Atomic" => Tag::Atomic,
        "_Bool" => Tag::Bool,
        "_Complex" => Tag::Complex,
        "_Generic" => Tag::Generic,
        "_Noreturn" => Tag::Noreturn,
        "_Static_assert" => Tag::StaticAssert,
        "_Thread_local" => Tag::ThreadLocal,
        "__attribute__" | "__attribute" => Tag::Attribute,
        "asm" | "__asm" | "__asm__" => Tag::Asm,
        "typeof" | "__typeof" | "__typeof__" => Tag::Typeof,
        "__extension__" => Tag::Extension,
        "__builtin_offsetof" => Tag::Offsetof,
        "__func__" | "__FUNCTION__" | "__PRETTY_FUNCTION__" => Tag::FuncName,
        _ => return None,
    };
    Some(tag)
}
