//! Recursive-descent parser producing [`SourceFile`] ASTs.

use std::sync::Arc;

use text_size::TextRange;

use crate::base::{LineIndex, Span};
use crate::syntax::{
    Expr, Function, Include, Item, Member, NamePath, NameSeg, Namespace, NamespaceAlias, Param,
    Record, RecordKeyword, SourceFile, Stmt, Template, TemplateDecl, TemplateParam,
    TemplateParamKind, TypeExpr, Variable,
};

use super::errors::ParseError;
use super::lexer::{Token, TokenKind, tokenize};

/// Parse a file's text into an AST, failing fast on the first structural
/// error.
pub fn parse(text: &str) -> Result<SourceFile, ParseError> {
    let tokens = tokenize(text);
    let mut parser = Parser {
        tokens,
        pos: 0,
        line_index: LineIndex::new(text),
    };
    parser.parse_file()
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    line_index: LineIndex,
}

impl<'a> Parser<'a> {
    // ============================================================
    // Token helpers
    // ============================================================

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn nth(&self, n: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.pos + n)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn nth_at(&self, n: usize, kind: TokenKind) -> bool {
        self.nth(n).is_some_and(|t| t.kind == kind)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn bump(&mut self) -> Result<Token<'a>, ParseError> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| self.err_eof("unexpected end of file"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token<'a>, ParseError> {
        if self.at(kind) {
            self.bump()
        } else {
            Err(self.err_here(format!("expected {what}")))
        }
    }

    fn span(&self, range: TextRange) -> Span {
        self.line_index.span(range)
    }

    fn span_here(&self) -> Span {
        match self.peek() {
            Some(t) => self.span(t.range),
            None => self
                .tokens
                .last()
                .map(|t| self.span(t.range))
                .unwrap_or(Span::from_coords(0, 0, 0, 0)),
        }
    }

    fn err_here(&self, message: impl Into<String>) -> ParseError {
        let mut message = message.into();
        if let Some(t) = self.peek() {
            message.push_str(&format!(", found '{}'", t.text));
        }
        ParseError::new(message, self.span_here())
    }

    fn err_eof(&self, message: &str) -> ParseError {
        ParseError::new(message, self.span_here())
    }

    fn skip_qualifiers(&mut self) {
        while self.peek().is_some_and(|t| t.kind.is_qualifier()) {
            self.pos += 1;
        }
    }

    // ============================================================
    // File and items
    // ============================================================

    fn parse_file(&mut self) -> Result<SourceFile, ParseError> {
        let mut items = Vec::new();
        let mut includes = Vec::new();

        while let Some(token) = self.peek() {
            if token.kind == TokenKind::IncludeKw {
                includes.push(self.parse_include()?);
            } else {
                items.push(self.parse_item()?);
            }
        }

        Ok(SourceFile { items, includes })
    }

    fn parse_include(&mut self) -> Result<Include, ParseError> {
        self.expect(TokenKind::IncludeKw, "'#include'")?;
        let token = self.expect(TokenKind::String, "include path string")?;
        let path: Arc<str> = token.text.trim_matches('"').into();
        Ok(Include {
            path,
            span: self.span(token.range),
        })
    }

    fn parse_item(&mut self) -> Result<Item, ParseError> {
        self.skip_qualifiers();
        match self.peek().map(|t| t.kind) {
            Some(TokenKind::NamespaceKw) => self.parse_namespace_or_alias(),
            Some(TokenKind::TemplateKw) => Ok(Item::Template(self.parse_template()?)),
            Some(TokenKind::StructKw) | Some(TokenKind::ClassKw) => {
                Ok(Item::Record(self.parse_record()?))
            }
            Some(_) => match self.parse_decl_or_function()? {
                DeclOrFn::Function(f) => Ok(Item::Function(f)),
                DeclOrFn::Variable(v) => Ok(Item::Variable(v)),
            },
            None => Err(self.err_eof("expected item")),
        }
    }

    fn parse_namespace_or_alias(&mut self) -> Result<Item, ParseError> {
        let kw = self.expect(TokenKind::NamespaceKw, "'namespace'")?;

        // `namespace waldo = ns1;`
        if self.at(TokenKind::Ident) && self.nth_at(1, TokenKind::Eq) {
            let name_tok = self.bump()?;
            self.bump()?; // '='
            let target = self.parse_name_path()?;
            self.expect(TokenKind::Semicolon, "';' after namespace alias")?;
            return Ok(Item::NamespaceAlias(NamespaceAlias {
                name: name_tok.text.into(),
                target,
                span: self.span(name_tok.range),
            }));
        }

        // `namespace N { ... }` or anonymous `namespace { ... }`
        let (name, span) = if self.at(TokenKind::Ident) {
            let tok = self.bump()?;
            (Some(Arc::<str>::from(tok.text)), self.span(tok.range))
        } else {
            (None, self.span(kw.range))
        };

        self.expect(TokenKind::LBrace, "'{' after namespace name")?;
        let mut items = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.peek().is_none() {
                return Err(self.err_eof("unclosed namespace body"));
            }
            items.push(self.parse_item()?);
        }
        self.bump()?; // '}'

        Ok(Item::Namespace(Namespace { name, items, span }))
    }

    // ============================================================
    // Templates
    // ============================================================

    fn parse_template(&mut self) -> Result<Template, ParseError> {
        let kw = self.expect(TokenKind::TemplateKw, "'template'")?;
        self.expect(TokenKind::Lt, "'<' after 'template'")?;

        let mut params = Vec::new();
        if !self.at(TokenKind::Gt) {
            loop {
                params.push(self.parse_template_param()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Gt, "'>' closing template parameter list")?;

        self.skip_qualifiers();
        let decl = match self.peek().map(|t| t.kind) {
            Some(TokenKind::StructKw) | Some(TokenKind::ClassKw) => {
                TemplateDecl::Record(self.parse_record()?)
            }
            Some(_) => match self.parse_decl_or_function()? {
                DeclOrFn::Function(f) => TemplateDecl::Function(f),
                DeclOrFn::Variable(v) => TemplateDecl::Variable(v),
            },
            None => return Err(self.err_eof("expected declaration after template header")),
        };

        Ok(Template {
            params,
            decl,
            span: self.span(kw.range),
        })
    }

    fn parse_template_param(&mut self) -> Result<TemplateParam, ParseError> {
        let kind = match self.peek().map(|t| t.kind) {
            Some(TokenKind::TypenameKw) | Some(TokenKind::ClassKw) => {
                self.bump()?;
                TemplateParamKind::Type
            }
            Some(TokenKind::Ident) => {
                // Non-type parameter: `bool B`, `int N`
                self.bump()?;
                TemplateParamKind::Value
            }
            _ => return Err(self.err_here("expected template parameter")),
        };

        let name = if self.at(TokenKind::Ident) {
            Some(Arc::<str>::from(self.bump()?.text))
        } else {
            None
        };

        let default = if self.eat(TokenKind::Eq) {
            Some(self.parse_type_expr()?)
        } else {
            None
        };

        Ok(TemplateParam {
            name,
            kind,
            default,
        })
    }

    // ============================================================
    // Records
    // ============================================================

    fn parse_record(&mut self) -> Result<Record, ParseError> {
        let kw_tok = self.bump()?;
        let keyword = match kw_tok.kind {
            TokenKind::StructKw => RecordKeyword::Struct,
            TokenKind::ClassKw => RecordKeyword::Class,
            _ => return Err(self.err_here("expected 'struct' or 'class'")),
        };

        let (name, span) = if self.at(TokenKind::Ident) {
            let tok = self.bump()?;
            (Some(Arc::<str>::from(tok.text)), self.span(tok.range))
        } else {
            (None, self.span(kw_tok.range))
        };

        // Specialization arguments on the declared name: `struct atomic<T*>`
        let spec_args = if self.at(TokenKind::Lt) {
            Some(self.parse_template_args()?)
        } else {
            None
        };

        // Base clause: `: public N::B, private base<B>`
        let mut bases = Vec::new();
        if self.at(TokenKind::Colon) && !self.nth_at(1, TokenKind::ColonColon) {
            self.bump()?;
            loop {
                while self
                    .peek()
                    .is_some_and(|t| t.kind.is_access_specifier() || t.kind == TokenKind::VirtualKw)
                {
                    self.pos += 1;
                }
                bases.push(self.parse_name_path()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        let body = if self.at(TokenKind::LBrace) {
            self.bump()?;
            let members = self.parse_members(name.as_deref())?;
            self.expect(TokenKind::RBrace, "'}' closing class body")?;
            self.eat(TokenKind::Semicolon);
            Some(members)
        } else {
            self.expect(TokenKind::Semicolon, "';' after forward declaration")?;
            None
        };

        Ok(Record {
            keyword,
            name,
            spec_args,
            bases,
            body,
            span,
        })
    }

    fn parse_members(&mut self, class_name: Option<&str>) -> Result<Vec<Member>, ParseError> {
        let mut members = Vec::new();

        while !self.at(TokenKind::RBrace) {
            let Some(token) = self.peek() else {
                return Err(self.err_eof("unclosed class body"));
            };

            // Access specifier labels: `public:`
            if token.kind.is_access_specifier() && self.nth_at(1, TokenKind::Colon) {
                self.pos += 2;
                continue;
            }

            // Qualifiers may precede any member (`constexpr derived() ...`)
            if token.kind.is_qualifier() {
                self.skip_qualifiers();
                continue;
            }

            match token.kind {
                TokenKind::FriendKw => members.push(self.parse_friend()?),
                TokenKind::TemplateKw => members.push(Member::Template(self.parse_template()?)),
                TokenKind::StructKw | TokenKind::ClassKw => {
                    members.push(Member::Record(self.parse_record()?))
                }
                TokenKind::OperatorKw => {
                    members.push(Member::Function(self.parse_conversion_operator()?))
                }
                TokenKind::Tilde => {
                    // Destructor: `~A() {}`
                    self.bump()?;
                    let name_tok = self.expect(TokenKind::Ident, "destructor name")?;
                    let name: Arc<str> = format!("~{}", name_tok.text).into();
                    let span = self.span(name_tok.range);
                    members.push(Member::Function(self.parse_function_rest(name, None, span)?));
                }
                TokenKind::Ident
                    if Some(token.text) == class_name && self.nth_at(1, TokenKind::LParen) =>
                {
                    // Constructor: `A(D<U> p);`
                    let name_tok = self.bump()?;
                    let name: Arc<str> = name_tok.text.into();
                    let span = self.span(name_tok.range);
                    members.push(Member::Function(self.parse_function_rest(name, None, span)?));
                }
                _ => {
                    self.skip_qualifiers();
                    match self.parse_decl_or_function()? {
                        DeclOrFn::Function(f) => members.push(Member::Function(f)),
                        DeclOrFn::Variable(v) => members.push(Member::Field(v)),
                    }
                }
            }
        }

        Ok(members)
    }

    fn parse_friend(&mut self) -> Result<Member, ParseError> {
        self.expect(TokenKind::FriendKw, "'friend'")?;

        if self.at(TokenKind::StructKw) || self.at(TokenKind::ClassKw) {
            self.bump()?;
            let name_tok = self.expect(TokenKind::Ident, "friend class name")?;
            self.expect(TokenKind::Semicolon, "';' after friend declaration")?;
            return Ok(Member::FriendClass {
                name: name_tok.text.into(),
                span: self.span(name_tok.range),
            });
        }

        // Friend function: `friend int operator*(double, C) { return 0; }`
        self.skip_qualifiers();
        match self.parse_decl_or_function()? {
            DeclOrFn::Function(f) => Ok(Member::FriendFunction(f)),
            DeclOrFn::Variable(_) => Err(self.err_here("expected friend function declaration")),
        }
    }

    fn parse_conversion_operator(&mut self) -> Result<Function, ParseError> {
        let kw = self.expect(TokenKind::OperatorKw, "'operator'")?;
        let target = self.parse_type_expr()?;
        let name: Arc<str> = match target.name_path() {
            Some(path) => format!("operator {}", path.to_qualified_string()).into(),
            None => return Err(self.err_here("expected conversion target type")),
        };
        self.parse_function_rest(name, None, self.span(kw.range))
    }

    // ============================================================
    // Declarations and functions
    // ============================================================

    fn parse_decl_or_function(&mut self) -> Result<DeclOrFn, ParseError> {
        let ty = self.parse_type_expr()?;

        // Operator function: `int operator*(double, C)`
        if self.at(TokenKind::OperatorKw) {
            let kw = self.bump()?;
            let op_tok = self.bump()?;
            let name: Arc<str> = format!("operator{}", op_tok.text).into();
            let f = self.parse_function_rest(name, Some(ty), self.span(kw.range))?;
            return Ok(DeclOrFn::Function(f));
        }

        let name_tok = self.expect(TokenKind::Ident, "declarator name")?;
        let name: Arc<str> = name_tok.text.into();
        let span = self.span(name_tok.range);

        if self.at(TokenKind::LParen) {
            let f = self.parse_function_rest(name, Some(ty), span)?;
            return Ok(DeclOrFn::Function(f));
        }

        // Variable; skip any initializer up to the terminating ';'
        if self.eat(TokenKind::Eq) || self.at(TokenKind::LBrace) {
            self.skip_to_semicolon()?;
        }
        self.expect(TokenKind::Semicolon, "';' after variable declaration")?;
        Ok(DeclOrFn::Variable(Variable { ty, name, span }))
    }

    /// Parse the remainder of a function after its name: parameter list,
    /// optional mem-initializer list, then a body or `;`.
    fn parse_function_rest(
        &mut self,
        name: Arc<str>,
        ret: Option<TypeExpr>,
        span: Span,
    ) -> Result<Function, ParseError> {
        let params = self.parse_params()?;

        let mut mem_inits = Vec::new();
        if self.at(TokenKind::Colon) && !self.nth_at(1, TokenKind::ColonColon) {
            self.bump()?;
            loop {
                let path = self.parse_name_path()?;
                mem_inits.push(path);
                if self.at(TokenKind::LParen) {
                    self.skip_balanced(TokenKind::LParen, TokenKind::RParen)?;
                } else if self.at(TokenKind::LBrace) {
                    self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        let body = if self.at(TokenKind::LBrace) {
            Some(self.parse_block()?)
        } else {
            self.expect(TokenKind::Semicolon, "';' after function declaration")?;
            None
        };

        Ok(Function {
            name,
            ret,
            params,
            mem_inits,
            body,
            span,
        })
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(TokenKind::LParen, "'(' starting parameter list")?;
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let ty = self.parse_type_expr()?;
                let name = if self.at(TokenKind::Ident) {
                    Some(Arc::<str>::from(self.bump()?.text))
                } else {
                    None
                };
                params.push(Param { ty, name });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')' closing parameter list")?;
        Ok(params)
    }

    // ============================================================
    // Statements and expressions
    // ============================================================

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::LBrace, "'{' starting function body")?;
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.peek().is_none() {
                return Err(self.err_eof("unclosed function body"));
            }
            stmts.push(self.parse_stmt()?);
        }
        self.bump()?; // '}'
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        if self.eat(TokenKind::ReturnKw) {
            if self.eat(TokenKind::Semicolon) {
                return Ok(Stmt::Return(None));
            }
            let expr = self.parse_expr()?;
            self.expect(TokenKind::Semicolon, "';' after return")?;
            return Ok(Stmt::Return(Some(expr)));
        }

        if self.at(TokenKind::NewKw) {
            let expr = self.parse_expr()?;
            self.expect(TokenKind::Semicolon, "';' after expression")?;
            return Ok(Stmt::Expr(expr));
        }

        self.skip_qualifiers();
        let path = self.parse_name_path()?;

        // A name followed by `*`/`&` or another identifier is a local
        // variable declaration; anything else is an expression statement.
        if self.at(TokenKind::Star) || self.at(TokenKind::Amp) || self.at(TokenKind::Ident) {
            let mut ty = TypeExpr::Named(path);
            while self.eat(TokenKind::Star) || self.eat(TokenKind::Amp) {
                ty = TypeExpr::Pointer(Box::new(ty));
            }
            let name_tok = self.expect(TokenKind::Ident, "variable name")?;
            let span = self.span(name_tok.range);
            if self.eat(TokenKind::Eq) || self.at(TokenKind::LBrace) {
                self.skip_to_semicolon()?;
            }
            self.expect(TokenKind::Semicolon, "';' after variable declaration")?;
            return Ok(Stmt::VarDecl(Variable {
                ty,
                name: name_tok.text.into(),
                span,
            }));
        }

        let expr = self.parse_postfix(path)?;
        self.expect(TokenKind::Semicolon, "';' after expression")?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        match self.peek().map(|t| t.kind) {
            Some(TokenKind::NewKw) => {
                self.bump()?;
                let ty = self.parse_name_path()?;
                let args = if self.at(TokenKind::LParen) {
                    self.parse_call_args()?
                } else {
                    Vec::new()
                };
                Ok(Expr::New { ty, args })
            }
            Some(TokenKind::Integer) | Some(TokenKind::Decimal) | Some(TokenKind::String) => {
                let tok = self.bump()?;
                Ok(Expr::Literal(tok.text.into()))
            }
            Some(_) => {
                let path = self.parse_name_path()?;
                self.parse_postfix(path)
            }
            None => Err(self.err_eof("expected expression")),
        }
    }

    fn parse_postfix(&mut self, path: NamePath) -> Result<Expr, ParseError> {
        if self.eat(TokenKind::Dot) {
            let member_tok = self.expect(TokenKind::Ident, "member name")?;
            let member_span = self.span(member_tok.range);
            let args = self.parse_call_args()?;
            return Ok(Expr::MemberCall {
                receiver: path,
                member: member_tok.text.into(),
                member_span,
                args,
            });
        }
        if self.at(TokenKind::LParen) {
            let args = self.parse_call_args()?;
            return Ok(Expr::Call { callee: path, args });
        }
        if self.at(TokenKind::LBrace) {
            self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace)?;
            return Ok(Expr::BraceInit { ty: path });
        }
        Ok(Expr::Name(path))
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::LParen, "'(' starting argument list")?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')' closing argument list")?;
        Ok(args)
    }

    // ============================================================
    // Names and types
    // ============================================================

    fn parse_name_path(&mut self) -> Result<NamePath, ParseError> {
        let start = self.span_here();
        let absolute = self.eat(TokenKind::ColonColon);

        let mut segments = Vec::new();
        loop {
            let tok = self.expect(TokenKind::Ident, "name")?;
            let seg_span = self.span(tok.range);
            let args = if self.at(TokenKind::Lt) {
                Some(self.parse_template_args()?)
            } else {
                None
            };
            segments.push(NameSeg {
                name: tok.text.into(),
                args,
                span: seg_span,
            });

            if self.at(TokenKind::ColonColon) && self.nth_at(1, TokenKind::Ident) {
                self.bump()?;
            } else {
                break;
            }
        }

        let end = segments.last().map(|s| s.span).unwrap_or(start);
        Ok(NamePath {
            absolute,
            segments,
            span: Span::new(start.start, end.end),
        })
    }

    fn parse_template_args(&mut self) -> Result<Vec<TypeExpr>, ParseError> {
        self.expect(TokenKind::Lt, "'<' starting template arguments")?;
        let mut args = Vec::new();
        if !self.at(TokenKind::Gt) {
            loop {
                args.push(self.parse_type_expr()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::Gt, "'>' closing template arguments")?;
        Ok(args)
    }

    fn parse_type_expr(&mut self) -> Result<TypeExpr, ParseError> {
        let mut ty = match self.peek() {
            Some(t) if matches!(t.kind, TokenKind::Integer | TokenKind::Decimal) => {
                let tok = self.bump()?;
                TypeExpr::Literal(tok.text.into())
            }
            Some(t) if t.kind == TokenKind::Ident && matches!(t.text, "true" | "false") => {
                let tok = self.bump()?;
                TypeExpr::Literal(tok.text.into())
            }
            _ => {
                self.skip_qualifiers();
                TypeExpr::Named(self.parse_name_path()?)
            }
        };

        while self.eat(TokenKind::Star) || self.eat(TokenKind::Amp) {
            ty = TypeExpr::Pointer(Box::new(ty));
        }
        Ok(ty)
    }

    // ============================================================
    // Recovery helpers
    // ============================================================

    /// Skip tokens up to (not including) the next top-level `;`.
    fn skip_to_semicolon(&mut self) -> Result<(), ParseError> {
        let mut depth = 0usize;
        while let Some(t) = self.peek() {
            match t.kind {
                TokenKind::LParen | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBrace => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                TokenKind::Semicolon if depth == 0 => return Ok(()),
                _ => {}
            }
            self.pos += 1;
        }
        Err(self.err_eof("expected ';'"))
    }

    /// Skip a balanced `open ... close` region, including the delimiters.
    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) -> Result<(), ParseError> {
        self.expect(open, "opening delimiter")?;
        let mut depth = 1usize;
        while depth > 0 {
            let t = self.bump()?;
            if t.kind == open {
                depth += 1;
            } else if t.kind == close {
                depth -= 1;
            }
        }
        Ok(())
    }
}

enum DeclOrFn {
    Function(Function),
    Variable(Variable),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_namespace_alias() {
        let file = parse("namespace waldo = ::ns1;").unwrap();
        assert_eq!(file.items.len(), 1);
        match &file.items[0] {
            Item::NamespaceAlias(alias) => {
                assert_eq!(alias.name.as_ref(), "waldo");
                assert!(alias.target.absolute);
                assert_eq!(alias.target.last_name().as_ref(), "ns1");
            }
            other => panic!("expected namespace alias, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_anonymous_namespace() {
        let file = parse("namespace {\nstruct B {};\n}").unwrap();
        match &file.items[0] {
            Item::Namespace(ns) => {
                assert!(ns.name.is_none());
                assert_eq!(ns.items.len(), 1);
            }
            other => panic!("expected namespace, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_class_template() {
        let file = parse("template <typename T>\nstruct A {\n  void m(T p);\n};").unwrap();
        match &file.items[0] {
            Item::Template(t) => {
                assert_eq!(t.params.len(), 1);
                assert_eq!(t.params[0].name.as_deref(), Some("T"));
                match &t.decl {
                    TemplateDecl::Record(r) => {
                        assert_eq!(r.name.as_deref(), Some("A"));
                        assert!(r.spec_args.is_none());
                        assert_eq!(r.body.as_ref().unwrap().len(), 1);
                    }
                    other => panic!("expected record, got {other:?}"),
                }
            }
            other => panic!("expected template, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_partial_specialization() {
        let file = parse("template <typename T>\nstruct atomic<T*> {\n  void fetch_sub();\n};")
            .unwrap();
        match &file.items[0] {
            Item::Template(t) => match &t.decl {
                TemplateDecl::Record(r) => {
                    let args = r.spec_args.as_ref().unwrap();
                    assert_eq!(args.len(), 1);
                    assert!(matches!(args[0], TypeExpr::Pointer(_)));
                }
                other => panic!("expected record, got {other:?}"),
            },
            other => panic!("expected template, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_explicit_specialization() {
        let file = parse("template <>\nstruct A<B, C> {\n  A(D<C> p);\n};").unwrap();
        match &file.items[0] {
            Item::Template(t) => {
                assert!(t.params.is_empty());
                match &t.decl {
                    TemplateDecl::Record(r) => {
                        assert_eq!(r.spec_args.as_ref().unwrap().len(), 2);
                        // A(D<C> p) is recognized as a constructor
                        assert!(matches!(
                            r.body.as_ref().unwrap()[0],
                            Member::Function(ref f) if f.name.as_ref() == "A" && f.ret.is_none()
                        ));
                    }
                    other => panic!("expected record, got {other:?}"),
                }
            }
            other => panic!("expected template, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_function_with_member_call() {
        let file = parse("void test(A<B*> a, B* b) {\n  a.m(b);\n}").unwrap();
        match &file.items[0] {
            Item::Function(f) => {
                assert_eq!(f.name.as_ref(), "test");
                assert_eq!(f.params.len(), 2);
                let body = f.body.as_ref().unwrap();
                assert!(matches!(
                    body[0],
                    Stmt::Expr(Expr::MemberCall { ref member, .. }) if member.as_ref() == "m"
                ));
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_friend_declarations() {
        let file = parse(
            "struct C {\n  friend class B;\n  friend int operator*(double, C) { return 0; }\n};",
        )
        .unwrap();
        match &file.items[0] {
            Item::Record(r) => {
                let members = r.body.as_ref().unwrap();
                assert!(matches!(members[0], Member::FriendClass { ref name, .. } if name.as_ref() == "B"));
                assert!(matches!(
                    members[1],
                    Member::FriendFunction(ref f) if f.name.as_ref() == "operator*"
                ));
            }
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_conversion_operator() {
        let file = parse("struct A {\n  operator B();\n};").unwrap();
        match &file.items[0] {
            Item::Record(r) => {
                assert!(matches!(
                    r.body.as_ref().unwrap()[0],
                    Member::Function(ref f) if f.name.as_ref() == "operator B"
                ));
            }
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_new_expression() {
        let file = parse("void test() {\n  D<C> x;\n  new A<B, C>(x);\n}").unwrap();
        match &file.items[0] {
            Item::Function(f) => {
                let body = f.body.as_ref().unwrap();
                assert!(matches!(body[0], Stmt::VarDecl(_)));
                assert!(matches!(body[1], Stmt::Expr(Expr::New { .. })));
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_qualified_variable() {
        let file = parse("namespace ns2 {\nnamespace ns3 {\nwaldo::A a;\n}\n}").unwrap();
        match &file.items[0] {
            Item::Namespace(ns2) => match &ns2.items[0] {
                Item::Namespace(ns3) => {
                    assert!(matches!(ns3.items[0], Item::Variable(_)));
                }
                other => panic!("expected nested namespace, got {other:?}"),
            },
            other => panic!("expected namespace, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_ctor_mem_init_list() {
        let file = parse(
            "template <bool B = false>\nstruct derived : private base<B> {\n    constexpr derived() : base<B>() {}\n};",
        )
        .unwrap();
        match &file.items[0] {
            Item::Template(t) => match &t.decl {
                TemplateDecl::Record(r) => {
                    assert_eq!(r.bases.len(), 1);
                    match &r.body.as_ref().unwrap()[0] {
                        Member::Function(f) => {
                            assert_eq!(f.name.as_ref(), "derived");
                            assert_eq!(f.mem_inits.len(), 1);
                        }
                        other => panic!("expected constructor, got {other:?}"),
                    }
                }
                other => panic!("expected record, got {other:?}"),
            },
            other => panic!("expected template, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_is_file_local() {
        let err = parse("struct {").unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn test_parse_includes() {
        let file = parse("#include \"A.h\"\n#include \"B.h\"\n\nstruct B {};").unwrap();
        assert_eq!(file.includes.len(), 2);
        assert_eq!(file.includes[0].path.as_ref(), "A.h");
        assert_eq!(file.includes[1].path.as_ref(), "B.h");
    }
}
