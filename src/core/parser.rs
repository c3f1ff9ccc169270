//! DF-003: Block tree and the parser that produces it.
//!
//! Grammar:
//! ```text
//! document  := block*
//! block     := "variable" STRING body
//!            | "provider" STRING body
//!            | "resource" STRING STRING body
//! body      := "{" (attribute ("," | ";")?)* "}"
//! attribute := IDENT "=" expr
//! expr      := STRING | NUMBER | IDENT ("." IDENT)*
//! ```
//!
//! Labels and expressions keep their raw source text (strings keep their
//! quotes); interpretation belongs to the extractor.

use super::error::{DropformError, Result};
use logos::Logos;
use std::path::Path;

// ============================================================================
// Tree
// ============================================================================

/// Root of a parsed file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

/// One top-level block. The grammar is closed: these are the only kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Variable {
        name: String,
        body: Vec<Attribute>,
    },
    Provider {
        name: String,
        body: Vec<Attribute>,
    },
    Resource {
        kind: String,
        name: String,
        body: Vec<Attribute>,
    },
}

/// `key = expr` inside a block body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub expr: String,
    pub line: usize,
}

// ============================================================================
// Lexer
// ============================================================================

/// DSL token. Strings, numbers, and identifiers keep their source text.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"#[^\n]*")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
enum Tok {
    #[regex(r"[A-Za-z_][A-Za-z0-9_-]*", |lex| lex.slice().to_string())]
    Ident(String),
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice().to_string())]
    Str(String),
    #[regex(r"-?[0-9][0-9.]*", |lex| lex.slice().to_string())]
    Number(String),
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("=")]
    Equals,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    /// Appended after the last token; never produced by the lexer
    Eof,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Self::Ident(s) => format!("identifier '{}'", s),
            Self::Str(s) => format!("string {}", s),
            Self::Number(n) => format!("number {}", n),
            Self::LBrace => "'{'".to_string(),
            Self::RBrace => "'}'".to_string(),
            Self::Equals => "'='".to_string(),
            Self::Dot => "'.'".to_string(),
            Self::Comma => "','".to_string(),
            Self::Semicolon => "';'".to_string(),
            Self::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    tok: Tok,
    line: usize,
    column: usize,
}

fn syntax(line: usize, column: usize, message: impl Into<String>) -> DropformError {
    DropformError::Syntax {
        line,
        column,
        message: message.into(),
    }
}

/// Maps byte offsets to 1-based line and column (in characters).
struct LineIndex<'a> {
    src: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(src: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { src, starts }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&s| s <= offset);
        let start = self.starts[line - 1];
        let column = self.src[start..offset].chars().count() + 1;
        (line, column)
    }
}

/// Explain a lexer failure at `offset`.
fn lex_error(src: &str, offset: usize) -> String {
    let rest = &src[offset..];
    if rest.starts_with('"') {
        "unterminated string".to_string()
    } else if rest.starts_with("/*") {
        "unterminated comment".to_string()
    } else {
        match rest.chars().next() {
            Some(c) => format!("unexpected character '{}'", c),
            None => "unexpected end of input".to_string(),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<Spanned>> {
    let index = LineIndex::new(src);
    let mut lexer = Tok::lexer(src);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let offset = lexer.span().start;
        let (line, column) = index.position(offset);
        match result {
            Ok(tok) => tokens.push(Spanned { tok, line, column }),
            Err(()) => return Err(syntax(line, column, lex_error(src, offset))),
        }
    }

    let (line, column) = index.position(src.len());
    tokens.push(Spanned {
        tok: Tok::Eof,
        line,
        column,
    });
    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Spanned {
        // tokenize always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Spanned {
        let t = self.peek().clone();
        if t.tok != Tok::Eof {
            self.pos += 1;
        }
        t
    }

    fn unexpected(&self, expected: &str) -> DropformError {
        let t = self.peek();
        syntax(
            t.line,
            t.column,
            format!("expected {}, found {}", expected, t.tok.describe()),
        )
    }

    fn expect(&mut self, want: Tok, expected: &str) -> Result<()> {
        if self.peek().tok == want {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn string(&mut self) -> Result<String> {
        match &self.peek().tok {
            Tok::Str(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected("a quoted label")),
        }
    }

    fn document(&mut self) -> Result<Document> {
        let mut blocks = Vec::new();
        loop {
            let t = self.peek().clone();
            let block = match &t.tok {
                Tok::Eof => break,
                Tok::Ident(kw) if kw == "variable" => {
                    self.advance();
                    let name = self.string()?;
                    Block::Variable {
                        name,
                        body: self.body()?,
                    }
                }
                Tok::Ident(kw) if kw == "provider" => {
                    self.advance();
                    let name = self.string()?;
                    Block::Provider {
                        name,
                        body: self.body()?,
                    }
                }
                Tok::Ident(kw) if kw == "resource" => {
                    self.advance();
                    let kind = self.string()?;
                    let name = self.string()?;
                    Block::Resource {
                        kind,
                        name,
                        body: self.body()?,
                    }
                }
                _ => return Err(self.unexpected("'variable', 'provider', or 'resource'")),
            };
            blocks.push(block);
        }
        Ok(Document { blocks })
    }

    fn body(&mut self) -> Result<Vec<Attribute>> {
        self.expect(Tok::LBrace, "'{'")?;
        let mut attrs = Vec::new();
        loop {
            let t = self.peek().clone();
            match t.tok {
                Tok::RBrace => {
                    self.advance();
                    return Ok(attrs);
                }
                Tok::Ident(key) => {
                    self.advance();
                    self.expect(Tok::Equals, "'='")?;
                    let expr = self.expr()?;
                    attrs.push(Attribute {
                        key,
                        expr,
                        line: t.line,
                    });
                    if matches!(self.peek().tok, Tok::Comma | Tok::Semicolon) {
                        self.advance();
                    }
                }
                _ => return Err(self.unexpected("an attribute name or '}'")),
            }
        }
    }

    fn expr(&mut self) -> Result<String> {
        let t = self.peek().clone();
        match t.tok {
            Tok::Str(s) | Tok::Number(s) => {
                self.advance();
                Ok(s)
            }
            Tok::Ident(first) => {
                self.advance();
                let mut raw = first;
                while self.peek().tok == Tok::Dot {
                    self.advance();
                    match self.peek().tok.clone() {
                        Tok::Ident(part) => {
                            self.advance();
                            raw.push('.');
                            raw.push_str(&part);
                        }
                        _ => return Err(self.unexpected("an identifier after '.'")),
                    }
                }
                Ok(raw)
            }
            _ => Err(self.unexpected("a string, number, or reference")),
        }
    }
}

/// Parse DSL source text into a block tree.
pub fn parse(src: &str) -> Result<Document> {
    let tokens = tokenize(src)?;
    Parser { tokens, pos: 0 }.document()
}

/// Parse a DSL file from disk.
pub fn parse_file(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path).map_err(|source| DropformError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content)
}
