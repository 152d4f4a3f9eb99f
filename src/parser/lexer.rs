//! Logos-based lexer for the indexed C/C++ subset.
//!
//! Fast tokenization using the logos crate. Trivia (whitespace, comments)
//! is produced by the raw lexer and filtered by [`tokenize`].

use logos::Logos;
use text_size::{TextRange, TextSize};

/// A token with its kind, text, and byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub range: TextRange,
}

/// Lexer wrapping the logos-generated tokenizer.
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
    offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(input),
            offset: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = self.inner.next()?;
        let text = self.inner.slice();
        let start = TextSize::new(self.offset);
        self.offset += text.len() as u32;

        Some(Token {
            kind: kind.unwrap_or(TokenKind::Error),
            text,
            range: TextRange::at(start, TextSize::of(text)),
        })
    }
}

/// Tokenize an entire string, dropping trivia.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input)
        .filter(|t| {
            !matches!(
                t.kind,
                TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
            )
        })
        .collect()
}

/// Logos token enum.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"")] // Don't skip anything, trivia is filtered later
pub enum TokenKind {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*/")]
    BlockComment,

    // =========================================================================
    // KEYWORDS (must come before Ident)
    // =========================================================================
    #[token("namespace")]
    NamespaceKw,

    #[token("struct")]
    StructKw,

    #[token("class")]
    ClassKw,

    #[token("template")]
    TemplateKw,

    #[token("typename")]
    TypenameKw,

    #[token("friend")]
    FriendKw,

    #[token("operator")]
    OperatorKw,

    #[token("new")]
    NewKw,

    #[token("return")]
    ReturnKw,

    #[token("#include")]
    IncludeKw,

    // Qualifiers consumed and ignored where legal
    #[token("static")]
    StaticKw,

    #[token("constexpr")]
    ConstexprKw,

    #[token("inline")]
    InlineKw,

    #[token("const")]
    ConstKw,

    #[token("virtual")]
    VirtualKw,

    #[token("public")]
    PublicKw,

    #[token("private")]
    PrivateKw,

    #[token("protected")]
    ProtectedKw,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"[0-9]+\.[0-9]+")]
    Decimal,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r#""([^"\\]|\\.)*""#)]
    String,

    // =========================================================================
    // MULTI-CHARACTER PUNCTUATION (must come before single-char)
    // =========================================================================
    #[token("::")]
    ColonColon,

    #[token("==")]
    EqEq,

    #[token("!=")]
    BangEq,

    // NOTE: no `>>` token; nested template argument lists close with
    // two separate `>` tokens.

    // =========================================================================
    // SINGLE-CHARACTER PUNCTUATION
    // =========================================================================
    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    #[token(",")]
    Comma,

    #[token("*")]
    Star,

    #[token("&")]
    Amp,

    #[token("=")]
    Eq,

    #[token(".")]
    Dot,

    #[token("~")]
    Tilde,

    Error,
}

impl TokenKind {
    /// True for keywords that merely qualify a declaration and carry no
    /// meaning for indexing.
    pub fn is_qualifier(self) -> bool {
        matches!(
            self,
            TokenKind::StaticKw
                | TokenKind::ConstexprKw
                | TokenKind::InlineKw
                | TokenKind::ConstKw
                | TokenKind::VirtualKw
        )
    }

    /// True for base-clause access specifiers.
    pub fn is_access_specifier(self) -> bool {
        matches!(
            self,
            TokenKind::PublicKw | TokenKind::PrivateKw | TokenKind::ProtectedKw
        )
    }
}
