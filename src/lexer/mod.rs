use logos::{Lexer, Logos, Skip};

use std::fmt;
use std::ops::Range;
use std::rc::Rc;


/// Line bookkeeping carried by the logos lexer between tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineTracker {
    pub line: usize,
    pub line_start: usize,
}

fn newline(lex: &mut Lexer<TokenKind>) -> Skip {
    lex.extras.line += 1;
    lex.extras.line_start = lex.span().end;
    Skip
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(extras = LineTracker)]
#[logos(skip r"[ \t\r\f\v]+")]
pub enum TokenKind {
    // never produced by logos, appended by `TokenStream::lex`
    Eof,
    Unknown,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    #[regex(r"[0-9]+")]
    Integer,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("if")]
    KeywordIf,

    #[token("else")]
    KeywordElse,

    #[token("while")]
    KeywordWhile,

    #[token("for")]
    KeywordFor,

    #[token("return")]
    KeywordReturn,

    // swallowed by the callback, only moves the line tracker
    #[token("\n", newline)]
    Newline,
}

impl TokenKind {
    /// Binding strength of a binary operator, `None` for everything else.
    pub fn precedence(self) -> Option<u8> {
        match self {
            TokenKind::Star | TokenKind::Slash => Some(2),
            TokenKind::Plus | TokenKind::Minus => Some(1),
            _ => None,
        }
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::KeywordIf
                | TokenKind::KeywordElse
                | TokenKind::KeywordWhile
                | TokenKind::KeywordFor
                | TokenKind::KeywordReturn
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Eof => "end of file",
            TokenKind::Unknown => "unknown character",
            TokenKind::Identifier => "identifier",
            TokenKind::Integer => "integer literal",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::KeywordIf => "keyword 'if'",
            TokenKind::KeywordElse => "keyword 'else'",
            TokenKind::KeywordWhile => "keyword 'while'",
            TokenKind::KeywordFor => "keyword 'for'",
            TokenKind::KeywordReturn => "keyword 'return'",
            TokenKind::Newline => "newline",
        };
        f.write_str(text)
    }
}

/// A source buffer and the name it was loaded under.
#[derive(PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub src: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, src: impl Into<String>) -> Rc<Self> {
        Rc::new(SourceFile {
            name: name.into(),
            src: src.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.src.len()
    }

    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("len", &self.src.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMeta {
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub file: Rc<SourceFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte range into `meta.file.src`.
    pub span: Range<usize>,
    pub meta: TokenMeta,
}

impl Token {
    fn new(
        kind: TokenKind,
        span: Range<usize>,
        line: usize,
        column: usize,
        file: &Rc<SourceFile>,
    ) -> Self {
        let len = span.len();
        Token {
            kind,
            span,
            meta: TokenMeta {
                line,
                start: column,
                end: column + len,
                file: Rc::clone(file),
            },
        }
    }

    pub fn lexeme(&self) -> &str {
        &self.meta.file.src[self.span.clone()]
    }
}

/// Every token of one source file, terminated by a single `Eof`.
#[derive(Debug)]
pub struct TokenStream {
    tokens: Vec<Token>,
    file: Rc<SourceFile>,
    line: usize,
    column: usize,
    offset: usize,
}

impl TokenStream {
    pub fn lex(file: Rc<SourceFile>) -> Self {
        let mut lexer = TokenKind::lexer(&file.src);
        let mut tokens = Vec::new();
        let mut offset = file.len();

        while let Some(result) = lexer.next() {
            let span = lexer.span();
            let column = span.start - lexer.extras.line_start;
            let line = lexer.extras.line;

            match result {
                Ok(kind) => tokens.push(Token::new(kind, span, line, column, &file)),
                Err(()) => {
                    let width = file.src[span.start..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                    let span = span.start..span.start + width;
                    tracing::warn!(
                        line,
                        column,
                        character = &file.src[span.clone()],
                        "unrecognized character, lexing stopped"
                    );
                    offset = span.end;
                    tokens.push(Token::new(TokenKind::Unknown, span, line, column, &file));
                    break;
                }
            }
        }

        let LineTracker { line, line_start } = lexer.extras;
        let column = offset - line_start;
        tokens.push(Token::new(TokenKind::Eof, offset..offset, line, column, &file));

        tracing::debug!(file = %file.name, count = tokens.len(), "lexed tokens");

        TokenStream {
            tokens,
            file,
            line,
            column,
            offset,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn kinds(&self) -> Vec<TokenKind> {
        self.tokens.iter().map(|token| token.kind).collect()
    }

    pub fn file(&self) -> &Rc<SourceFile> {
        &self.file
    }

    /// Where the scan ended as `(line, column, byte offset)`.
    pub fn end_position(&self) -> (usize, usize, usize) {
        (self.line, self.column, self.offset)
    }
}

impl<'a> IntoIterator for &'a TokenStream {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
