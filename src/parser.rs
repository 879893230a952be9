//! Parser for the supported JavaScript subset.
//!
//! Recursive descent with precedence climbing for expressions. The parser is
//! the only producer of [`NodeId`]s; every node receives a fresh id, and the
//! root `Script` node always receives id 0.

use crate::ast::*;
use crate::error::Error;
use crate::lexer::{Lexer, Span, Token, TokenKind};
use crate::value::{CheapClone, JsString, number_to_string};

/// Parse source text into a program. Collaborator entry point for the
/// evaluator and for host tooling.
pub fn parse(source: &str) -> Result<Program, Error> {
    Parser::new(source).parse_program()
}

#[derive(Clone)]
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    next_id: u32,
    no_in: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            previous: Token::eof(0, 1, 1),
            next_id: 0,
            no_in: false,
        }
    }

    fn node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.lexer.next_token());
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn require(&mut self, kind: &TokenKind, what: &str) -> Result<(), Error> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    fn unexpected(&self, what: &str) -> Error {
        Error::syntax(
            format!("expected {what}, found {:?}", self.current.kind),
            self.current.span.line,
            self.current.span.column,
        )
    }

    fn unsupported(&self, what: &str) -> Error {
        Error::syntax(
            format!("{what} is not supported"),
            self.current.span.line,
            self.current.span.column,
        )
    }

    fn span_from(&self, start: Span) -> Span {
        Span::new(start.start, self.previous.span.end, start.line, start.column)
    }

    /// Statement termination: an explicit semicolon, a closing brace, end of
    /// input, or a preceding line terminator.
    fn consume_semicolon(&mut self) -> Result<(), Error> {
        if self.eat(&TokenKind::Semicolon) {
            return Ok(());
        }
        if matches!(self.current.kind, TokenKind::RBrace | TokenKind::Eof)
            || self.current.newline_before
        {
            return Ok(());
        }
        Err(self.unexpected("';'"))
    }

    /// Tokens that may act as a name in identifier or property positions.
    fn name_of(kind: &TokenKind) -> Option<JsString> {
        match kind {
            TokenKind::Identifier(name) => Some(name.cheap_clone()),
            TokenKind::Get => Some(JsString::from("get")),
            TokenKind::Set => Some(JsString::from("set")),
            TokenKind::Of => Some(JsString::from("of")),
            TokenKind::Static => Some(JsString::from("static")),
            TokenKind::Default => Some(JsString::from("default")),
            _ => None,
        }
    }

    fn parse_identifier(&mut self) -> Result<Identifier, Error> {
        let span = self.current.span;
        let Some(name) = Self::name_of(&self.current.kind) else {
            return Err(self.unexpected("an identifier"));
        };
        self.advance();
        Ok(Identifier {
            id: self.node_id(),
            name,
            span,
        })
    }

    fn peek_kind(&self) -> TokenKind {
        let mut probe = self.clone();
        probe.advance();
        probe.current.kind
    }

    // ============ PROGRAM & STATEMENTS ============

    pub fn parse_program(&mut self) -> Result<Program, Error> {
        let id = self.node_id(); // the Script node, always id 0
        let start = self.current.span;
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        Ok(Program {
            id,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_statement(&mut self) -> Result<Statement, Error> {
        // Labeled statement: identifier followed by a colon.
        if Self::name_of(&self.current.kind).is_some()
            && self.peek_kind() == TokenKind::Colon
        {
            return self.parse_labeled_statement();
        }

        // `async` is not a keyword in this subset; reject async functions
        // loudly rather than parsing `async` as a plain identifier.
        if let TokenKind::Identifier(name) = &self.current.kind {
            if name == "async" && self.peek_kind() == TokenKind::Function {
                return Err(self.unsupported("async function"));
            }
        }

        match &self.current.kind {
            TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                let decl = self.parse_variable_declaration()?;
                self.consume_semicolon()?;
                Ok(Statement::VariableDeclaration(decl))
            }
            TokenKind::Function => Ok(Statement::FunctionDeclaration(
                self.parse_function_declaration()?,
            )),
            TokenKind::Class => Ok(Statement::ClassDeclaration(self.parse_class_declaration()?)),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break => {
                let start = self.current.span;
                self.advance();
                if !self.current.newline_before && Self::name_of(&self.current.kind).is_some() {
                    return Err(self.unsupported("labeled break"));
                }
                self.consume_semicolon()?;
                Ok(Statement::Break(BreakStatement {
                    id: self.node_id(),
                    span: self.span_from(start),
                }))
            }
            TokenKind::Continue => {
                let start = self.current.span;
                self.advance();
                if !self.current.newline_before && Self::name_of(&self.current.kind).is_some() {
                    return Err(self.unsupported("labeled continue"));
                }
                self.consume_semicolon()?;
                Ok(Statement::Continue(ContinueStatement {
                    id: self.node_id(),
                    span: self.span_from(start),
                }))
            }
            TokenKind::Throw => {
                let start = self.current.span;
                self.advance();
                let argument = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Statement::Throw(ThrowStatement {
                    id: self.node_id(),
                    argument,
                    span: self.span_from(start),
                }))
            }
            TokenKind::LBrace => Ok(Statement::Block(self.parse_block()?)),
            TokenKind::Semicolon => {
                let start = self.current.span;
                self.advance();
                Ok(Statement::Empty(EmptyStatement {
                    id: self.node_id(),
                    span: start,
                }))
            }
            TokenKind::Identifier(name) if name == "debugger" => {
                let start = self.current.span;
                self.advance();
                self.consume_semicolon()?;
                Ok(Statement::Debugger(DebuggerStatement {
                    id: self.node_id(),
                    span: start,
                }))
            }
            _ => {
                let start = self.current.span;
                let expression = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Statement::Expression(ExpressionStatement {
                    id: self.node_id(),
                    expression,
                    span: self.span_from(start),
                }))
            }
        }
    }

    fn parse_variable_declaration(&mut self) -> Result<VariableDeclaration, Error> {
        let start = self.current.span;
        let kind = match self.current.kind {
            TokenKind::Let => VariableKind::Let,
            TokenKind::Const => VariableKind::Const,
            TokenKind::Var => VariableKind::Var,
            _ => return Err(self.unexpected("a declaration keyword")),
        };
        self.advance();

        let mut declarations = Vec::new();
        loop {
            let decl_start = self.current.span;
            let pattern = self.parse_pattern()?;
            let init = if self.eat(&TokenKind::Eq) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarations.push(VariableDeclarator {
                id: self.node_id(),
                pattern,
                init,
                span: self.span_from(decl_start),
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(VariableDeclaration {
            id: self.node_id(),
            kind,
            declarations,
            span: self.span_from(start),
        })
    }

    fn parse_function_declaration(&mut self) -> Result<FunctionDeclaration, Error> {
        let start = self.current.span;
        self.require(&TokenKind::Function, "'function'")?;
        if self.check(&TokenKind::Star) {
            return Err(self.unsupported("generator function"));
        }
        let name = self.parse_identifier()?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(FunctionDeclaration {
            id: self.node_id(),
            name,
            params,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_class_declaration(&mut self) -> Result<ClassDeclaration, Error> {
        let start = self.current.span;
        self.require(&TokenKind::Class, "'class'")?;
        let name = self.parse_identifier()?;
        let super_class = if self.eat(&TokenKind::Extends) {
            Some(Box::new(self.parse_lhs_expression()?))
        } else {
            None
        };
        self.require(&TokenKind::LBrace, "'{'")?;

        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            let member_start = self.current.span;
            let is_static = if self.check(&TokenKind::Static)
                && self.peek_kind() != TokenKind::LParen
            {
                self.advance();
                true
            } else {
                false
            };
            let name = match Self::name_of(&self.current.kind) {
                Some(name) => {
                    self.advance();
                    name
                }
                None => match &self.current.kind {
                    TokenKind::String(s) => {
                        let s = s.cheap_clone();
                        self.advance();
                        s
                    }
                    _ => return Err(self.unexpected("a method name")),
                },
            };
            if !self.check(&TokenKind::LParen) {
                return Err(self.unsupported("class fields and accessors"));
            }
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            members.push(ClassMember {
                is_static,
                name,
                params,
                body,
                span: self.span_from(member_start),
            });
        }
        self.require(&TokenKind::RBrace, "'}'")?;

        Ok(ClassDeclaration {
            id: self.node_id(),
            name,
            super_class,
            members,
            span: self.span_from(start),
        })
    }

    fn parse_if_statement(&mut self) -> Result<Statement, Error> {
        let start = self.current.span;
        self.advance();
        self.require(&TokenKind::LParen, "'('")?;
        let test = self.parse_expression()?;
        self.require(&TokenKind::RParen, "')'")?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            id: self.node_id(),
            test,
            consequent,
            alternate,
            span: self.span_from(start),
        }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, Error> {
        let start = self.current.span;
        self.advance();
        self.require(&TokenKind::LParen, "'('")?;

        // Declaration-headed form: may be a classic for, a for-in or a for-of.
        if matches!(
            self.current.kind,
            TokenKind::Let | TokenKind::Const | TokenKind::Var
        ) {
            let was_no_in = std::mem::replace(&mut self.no_in, true);
            let decl = self.parse_variable_declaration();
            self.no_in = was_no_in;
            let decl = decl?;

            if self.eat(&TokenKind::In) {
                return self.finish_for_in_of(start, ForInOfLeft::Variable(decl), true);
            }
            if self.eat(&TokenKind::Of) {
                return self.finish_for_in_of(start, ForInOfLeft::Variable(decl), false);
            }
            self.require(&TokenKind::Semicolon, "';'")?;
            return self.finish_classic_for(start, Some(ForInit::Variable(decl)));
        }

        // Expression-headed or empty init.
        if self.eat(&TokenKind::Semicolon) {
            return self.finish_classic_for(start, None);
        }

        let was_no_in = std::mem::replace(&mut self.no_in, true);
        let expr = self.parse_expression();
        self.no_in = was_no_in;
        let expr = expr?;

        if self.eat(&TokenKind::In) {
            let left = ForInOfLeft::Pattern(Self::expression_to_pattern(expr, &self.current)?);
            return self.finish_for_in_of(start, left, true);
        }
        if self.eat(&TokenKind::Of) {
            let left = ForInOfLeft::Pattern(Self::expression_to_pattern(expr, &self.current)?);
            return self.finish_for_in_of(start, left, false);
        }
        self.require(&TokenKind::Semicolon, "';'")?;
        self.finish_classic_for(start, Some(ForInit::Expression(expr)))
    }

    fn expression_to_pattern(expr: Expression, at: &Token) -> Result<Pattern, Error> {
        match expr {
            Expression::Identifier(id) => Ok(Pattern::Identifier(id)),
            _ => Err(Error::syntax(
                "invalid left-hand side in for-in/for-of",
                at.span.line,
                at.span.column,
            )),
        }
    }

    fn finish_classic_for(&mut self, start: Span, init: Option<ForInit>) -> Result<Statement, Error> {
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.require(&TokenKind::Semicolon, "';'")?;
        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.require(&TokenKind::RParen, "')'")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::For(ForStatement {
            id: self.node_id(),
            init,
            test,
            update,
            body,
            span: self.span_from(start),
        }))
    }

    fn finish_for_in_of(
        &mut self,
        start: Span,
        left: ForInOfLeft,
        is_in: bool,
    ) -> Result<Statement, Error> {
        let right = self.parse_expression()?;
        self.require(&TokenKind::RParen, "')'")?;
        let body = Box::new(self.parse_statement()?);
        let id = self.node_id();
        let span = self.span_from(start);
        if is_in {
            Ok(Statement::ForIn(ForInStatement {
                id,
                left,
                right,
                body,
                span,
            }))
        } else {
            Ok(Statement::ForOf(ForOfStatement {
                id,
                left,
                right,
                body,
                span,
            }))
        }
    }

    fn parse_while_statement(&mut self) -> Result<Statement, Error> {
        let start = self.current.span;
        self.advance();
        self.require(&TokenKind::LParen, "'('")?;
        let test = self.parse_expression()?;
        self.require(&TokenKind::RParen, "')'")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement {
            id: self.node_id(),
            test,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_do_while_statement(&mut self) -> Result<Statement, Error> {
        let start = self.current.span;
        self.advance();
        let body = Box::new(self.parse_statement()?);
        self.require(&TokenKind::While, "'while'")?;
        self.require(&TokenKind::LParen, "'('")?;
        let test = self.parse_expression()?;
        self.require(&TokenKind::RParen, "')'")?;
        self.consume_semicolon()?;
        Ok(Statement::DoWhile(DoWhileStatement {
            id: self.node_id(),
            body,
            test,
            span: self.span_from(start),
        }))
    }

    fn parse_switch_statement(&mut self) -> Result<Statement, Error> {
        let start = self.current.span;
        self.advance();
        self.require(&TokenKind::LParen, "'('")?;
        let discriminant = self.parse_expression()?;
        self.require(&TokenKind::RParen, "')'")?;
        self.require(&TokenKind::LBrace, "'{'")?;

        let mut cases = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let case_start = self.current.span;
            let test = if self.eat(&TokenKind::Case) {
                let test = self.parse_expression()?;
                Some(test)
            } else {
                self.require(&TokenKind::Default, "'case' or 'default'")?;
                None
            };
            self.require(&TokenKind::Colon, "':'")?;
            let mut consequent = Vec::new();
            while !matches!(
                self.current.kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                consequent.push(self.parse_statement()?);
            }
            cases.push(SwitchCase {
                test,
                consequent,
                span: self.span_from(case_start),
            });
        }
        self.require(&TokenKind::RBrace, "'}'")?;

        Ok(Statement::Switch(SwitchStatement {
            id: self.node_id(),
            discriminant,
            cases,
            span: self.span_from(start),
        }))
    }

    fn parse_labeled_statement(&mut self) -> Result<Statement, Error> {
        let start = self.current.span;
        let Some(label) = Self::name_of(&self.current.kind) else {
            return Err(self.unexpected("a label"));
        };
        self.advance();
        self.require(&TokenKind::Colon, "':'")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::Labeled(LabeledStatement {
            id: self.node_id(),
            label,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_try_statement(&mut self) -> Result<Statement, Error> {
        let start = self.current.span;
        self.advance();
        let block = self.parse_block()?;

        let handler = if self.eat(&TokenKind::Catch) {
            let catch_start = self.previous.span;
            let param = if self.eat(&TokenKind::LParen) {
                let param = self.parse_pattern()?;
                self.require(&TokenKind::RParen, "')'")?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause {
                param,
                body,
                span: self.span_from(catch_start),
            })
        } else {
            None
        };

        let finalizer = if self.eat(&TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.unexpected("'catch' or 'finally'"));
        }

        Ok(Statement::Try(TryStatement {
            id: self.node_id(),
            block,
            handler,
            finalizer,
            span: self.span_from(start),
        }))
    }

    fn parse_return_statement(&mut self) -> Result<Statement, Error> {
        let start = self.current.span;
        self.advance();
        let argument = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RBrace)
            || self.is_at_end()
            || self.current.newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(Statement::Return(ReturnStatement {
            id: self.node_id(),
            argument,
            span: self.span_from(start),
        }))
    }

    fn parse_block(&mut self) -> Result<BlockStatement, Error> {
        let start = self.current.span;
        self.require(&TokenKind::LBrace, "'{'")?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.require(&TokenKind::RBrace, "'}'")?;
        Ok(BlockStatement {
            id: self.node_id(),
            body,
            span: self.span_from(start),
        })
    }

    // ============ PATTERNS ============

    fn parse_pattern(&mut self) -> Result<Pattern, Error> {
        let base = self.parse_pattern_base()?;
        if self.eat(&TokenKind::Eq) {
            let start = self.previous.span;
            let default = self.parse_assignment()?;
            return Ok(Pattern::Default(Box::new(DefaultPattern {
                target: base,
                default,
                span: self.span_from(start),
            })));
        }
        Ok(base)
    }

    fn parse_pattern_base(&mut self) -> Result<Pattern, Error> {
        match &self.current.kind {
            TokenKind::LBracket => {
                let start = self.current.span;
                self.advance();
                let mut elements = Vec::new();
                while !self.check(&TokenKind::RBracket) && !self.is_at_end() {
                    if self.check(&TokenKind::Comma) {
                        elements.push(None);
                        self.advance();
                        continue;
                    }
                    elements.push(Some(self.parse_pattern_element()?));
                    if !self.check(&TokenKind::RBracket) {
                        self.require(&TokenKind::Comma, "','")?;
                    }
                }
                self.require(&TokenKind::RBracket, "']'")?;
                Ok(Pattern::Array(ArrayPattern {
                    id: self.node_id(),
                    elements,
                    span: self.span_from(start),
                }))
            }
            TokenKind::LBrace => {
                let start = self.current.span;
                self.advance();
                let mut properties = Vec::new();
                while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
                    properties.push(self.parse_object_pattern_property()?);
                    if !self.check(&TokenKind::RBrace) {
                        self.require(&TokenKind::Comma, "','")?;
                    }
                }
                self.require(&TokenKind::RBrace, "'}'")?;
                Ok(Pattern::Object(ObjectPattern {
                    id: self.node_id(),
                    properties,
                    span: self.span_from(start),
                }))
            }
            _ => Ok(Pattern::Identifier(self.parse_identifier()?)),
        }
    }

    fn parse_pattern_element(&mut self) -> Result<Pattern, Error> {
        if self.eat(&TokenKind::DotDotDot) {
            let start = self.previous.span;
            let argument = self.parse_pattern_base()?;
            return Ok(Pattern::Rest(Box::new(RestElement {
                argument,
                span: self.span_from(start),
            })));
        }
        self.parse_pattern()
    }

    fn parse_object_pattern_property(&mut self) -> Result<ObjectPatternProperty, Error> {
        let start = self.current.span;
        if self.eat(&TokenKind::DotDotDot) {
            let argument = self.parse_pattern_base()?;
            return Ok(ObjectPatternProperty::Rest(RestElement {
                argument,
                span: self.span_from(start),
            }));
        }

        let key = self.parse_property_name()?;
        let value = if self.eat(&TokenKind::Colon) {
            self.parse_pattern()?
        } else {
            // Shorthand: `{ x }` or `{ x = default }`.
            let PropertyName::Static(name) = &key else {
                return Err(self.unexpected("':' after computed key"));
            };
            let ident = Identifier {
                id: self.node_id(),
                name: name.cheap_clone(),
                span: start,
            };
            if self.eat(&TokenKind::Eq) {
                let default = self.parse_assignment()?;
                Pattern::Default(Box::new(DefaultPattern {
                    target: Pattern::Identifier(ident),
                    default,
                    span: self.span_from(start),
                }))
            } else {
                Pattern::Identifier(ident)
            }
        };
        Ok(ObjectPatternProperty::KeyValue {
            key,
            value,
            span: self.span_from(start),
        })
    }

    fn parse_property_name(&mut self) -> Result<PropertyName, Error> {
        if let Some(name) = Self::name_of(&self.current.kind) {
            self.advance();
            return Ok(PropertyName::Static(name));
        }
        match self.current.kind.clone() {
            TokenKind::String(s) => {
                self.advance();
                Ok(PropertyName::Static(s))
            }
            TokenKind::Number(n) => {
                self.advance();
                Ok(PropertyName::Static(JsString::from(number_to_string(n))))
            }
            TokenKind::LBracket => {
                self.advance();
                let expr = self.parse_assignment()?;
                self.require(&TokenKind::RBracket, "']'")?;
                Ok(PropertyName::Computed(Box::new(expr)))
            }
            _ => Err(self.unexpected("a property name")),
        }
    }

    fn parse_params(&mut self) -> Result<Vec<Pattern>, Error> {
        self.require(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            params.push(self.parse_pattern_element()?);
            if !self.check(&TokenKind::RParen) {
                self.require(&TokenKind::Comma, "','")?;
            }
        }
        self.require(&TokenKind::RParen, "')'")?;
        Ok(params)
    }

    // ============ EXPRESSIONS ============

    /// Full expression including the comma operator.
    pub fn parse_expression(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let first = self.parse_assignment()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.eat(&TokenKind::Comma) {
            expressions.push(self.parse_assignment()?);
        }
        Ok(Expression::Sequence(SequenceExpression {
            id: self.node_id(),
            expressions,
            span: self.span_from(start),
        }))
    }

    fn parse_assignment(&mut self) -> Result<Expression, Error> {
        // Arrow functions bind tighter than assignment in the grammar.
        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }

        let start = self.current.span;
        let lhs = self.parse_conditional()?;

        let operator = match self.current.kind {
            TokenKind::Eq => Some(AssignmentOp::Assign),
            TokenKind::PlusEq => Some(AssignmentOp::Compound(BinaryOp::Add)),
            TokenKind::MinusEq => Some(AssignmentOp::Compound(BinaryOp::Sub)),
            TokenKind::StarEq => Some(AssignmentOp::Compound(BinaryOp::Mul)),
            TokenKind::SlashEq => Some(AssignmentOp::Compound(BinaryOp::Div)),
            TokenKind::PercentEq => Some(AssignmentOp::Compound(BinaryOp::Mod)),
            TokenKind::StarStarEq => Some(AssignmentOp::Compound(BinaryOp::Exp)),
            TokenKind::AmpEq => Some(AssignmentOp::Compound(BinaryOp::BitAnd)),
            TokenKind::PipeEq => Some(AssignmentOp::Compound(BinaryOp::BitOr)),
            TokenKind::CaretEq => Some(AssignmentOp::Compound(BinaryOp::BitXor)),
            TokenKind::LtLtEq => Some(AssignmentOp::Compound(BinaryOp::Shl)),
            TokenKind::GtGtEq => Some(AssignmentOp::Compound(BinaryOp::Shr)),
            TokenKind::GtGtGtEq => Some(AssignmentOp::Compound(BinaryOp::UShr)),
            _ => None,
        };
        let Some(operator) = operator else {
            return Ok(lhs);
        };
        self.advance();

        let target = Self::expression_to_target(lhs, &self.previous)?;
        let value = Box::new(self.parse_assignment()?);
        Ok(Expression::Assignment(AssignmentExpression {
            id: self.node_id(),
            operator,
            target,
            value,
            span: self.span_from(start),
        }))
    }

    fn expression_to_target(expr: Expression, at: &Token) -> Result<AssignmentTarget, Error> {
        match expr {
            Expression::Identifier(id) => Ok(AssignmentTarget::Identifier(id)),
            Expression::Member(member) => Ok(AssignmentTarget::Member(Box::new(member))),
            _ => Err(Error::syntax(
                "invalid assignment target",
                at.span.line,
                at.span.column,
            )),
        }
    }

    /// Recognize `x => ...` and `(a, b) => ...` without committing the main
    /// cursor until the shape is certain.
    fn try_parse_arrow(&mut self) -> Result<Option<Expression>, Error> {
        let is_arrow = if Self::name_of(&self.current.kind).is_some() {
            self.peek_kind() == TokenKind::Arrow
        } else if self.check(&TokenKind::LParen) {
            let mut probe = self.clone();
            probe.advance();
            let mut depth = 1u32;
            loop {
                match probe.current.kind {
                    TokenKind::LParen => depth += 1,
                    TokenKind::RParen => {
                        depth -= 1;
                        if depth == 0 {
                            probe.advance();
                            break probe.current.kind == TokenKind::Arrow;
                        }
                    }
                    TokenKind::Eof => break false,
                    _ => {}
                }
                probe.advance();
            }
        } else {
            false
        };
        if !is_arrow {
            return Ok(None);
        }

        let start = self.current.span;
        let params = if self.check(&TokenKind::LParen) {
            self.parse_params()?
        } else {
            vec![Pattern::Identifier(self.parse_identifier()?)]
        };
        self.require(&TokenKind::Arrow, "'=>'")?;
        let body = if self.check(&TokenKind::LBrace) {
            ArrowBody::Block(self.parse_block()?)
        } else {
            ArrowBody::Expression(Box::new(self.parse_assignment()?))
        };
        Ok(Some(Expression::Arrow(ArrowExpression {
            id: self.node_id(),
            params,
            body,
            span: self.span_from(start),
        })))
    }

    fn parse_conditional(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let test = self.parse_nullish()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }
        let consequent = Box::new(self.parse_assignment()?);
        self.require(&TokenKind::Colon, "':'")?;
        let alternate = Box::new(self.parse_assignment()?);
        Ok(Expression::Conditional(ConditionalExpression {
            id: self.node_id(),
            test: Box::new(test),
            consequent,
            alternate,
            span: self.span_from(start),
        }))
    }

    fn logical(
        &mut self,
        start: Span,
        operator: LogicalOp,
        left: Expression,
        right: Expression,
    ) -> Expression {
        Expression::Logical(LogicalExpression {
            id: self.node_id(),
            operator,
            left: Box::new(left),
            right: Box::new(right),
            span: self.span_from(start),
        })
    }

    fn binary(
        &mut self,
        start: Span,
        operator: BinaryOp,
        left: Expression,
        right: Expression,
    ) -> Expression {
        Expression::Binary(BinaryExpression {
            id: self.node_id(),
            operator,
            left: Box::new(left),
            right: Box::new(right),
            span: self.span_from(start),
        })
    }

    fn parse_nullish(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let mut left = self.parse_logical_or()?;
        while self.eat(&TokenKind::QuestionQuestion) {
            let right = self.parse_logical_or()?;
            left = self.logical(start, LogicalOp::Nullish, left, right);
        }
        Ok(left)
    }

    fn parse_logical_or(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let mut left = self.parse_logical_and()?;
        while self.eat(&TokenKind::PipePipe) {
            let right = self.parse_logical_and()?;
            left = self.logical(start, LogicalOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let mut left = self.parse_bit_or()?;
        while self.eat(&TokenKind::AmpAmp) {
            let right = self.parse_bit_or()?;
            left = self.logical(start, LogicalOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_bit_or(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let mut left = self.parse_bit_xor()?;
        while self.eat(&TokenKind::Pipe) {
            let right = self.parse_bit_xor()?;
            left = self.binary(start, BinaryOp::BitOr, left, right);
        }
        Ok(left)
    }

    fn parse_bit_xor(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let mut left = self.parse_bit_and()?;
        while self.eat(&TokenKind::Caret) {
            let right = self.parse_bit_and()?;
            left = self.binary(start, BinaryOp::BitXor, left, right);
        }
        Ok(left)
    }

    fn parse_bit_and(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::Amp) {
            let right = self.parse_equality()?;
            left = self.binary(start, BinaryOp::BitAnd, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.current.kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::BangEq => BinaryOp::NotEq,
                TokenKind::EqEqEq => BinaryOp::StrictEq,
                TokenKind::BangEqEq => BinaryOp::StrictNotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = self.binary(start, op, left, right);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let mut left = self.parse_shift()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                TokenKind::In if !self.no_in => BinaryOp::In,
                TokenKind::Instanceof => BinaryOp::Instanceof,
                _ => break,
            };
            self.advance();
            let right = self.parse_shift()?;
            left = self.binary(start, op, left, right);
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current.kind {
                TokenKind::LtLt => BinaryOp::Shl,
                TokenKind::GtGt => BinaryOp::Shr,
                TokenKind::GtGtGt => BinaryOp::UShr,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = self.binary(start, op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.binary(start, op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let mut left = self.parse_exponent()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_exponent()?;
            left = self.binary(start, op, left, right);
        }
        Ok(left)
    }

    fn parse_exponent(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let left = self.parse_unary()?;
        if self.eat(&TokenKind::StarStar) {
            // Right-associative.
            let right = self.parse_exponent()?;
            return Ok(self.binary(start, BinaryOp::Exp, left, right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let operator = match self.current.kind {
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(operator) = operator {
            self.advance();
            let argument = Box::new(self.parse_unary()?);
            return Ok(Expression::Unary(UnaryExpression {
                id: self.node_id(),
                operator,
                argument,
                span: self.span_from(start),
            }));
        }

        // Prefix update.
        let update_op = match self.current.kind {
            TokenKind::PlusPlus => Some(UpdateOp::Increment),
            TokenKind::MinusMinus => Some(UpdateOp::Decrement),
            _ => None,
        };
        if let Some(operator) = update_op {
            self.advance();
            let operand = self.parse_unary()?;
            let target = Self::expression_to_target(operand, &self.previous)?;
            return Ok(Expression::Update(UpdateExpression {
                id: self.node_id(),
                operator,
                prefix: true,
                target,
                span: self.span_from(start),
            }));
        }

        let expr = self.parse_lhs_expression()?;

        // Postfix update, forbidden across a line terminator.
        let update_op = match self.current.kind {
            TokenKind::PlusPlus if !self.current.newline_before => Some(UpdateOp::Increment),
            TokenKind::MinusMinus if !self.current.newline_before => Some(UpdateOp::Decrement),
            _ => None,
        };
        if let Some(operator) = update_op {
            self.advance();
            let target = Self::expression_to_target(expr, &self.previous)?;
            return Ok(Expression::Update(UpdateExpression {
                id: self.node_id(),
                operator,
                prefix: false,
                target,
                span: self.span_from(start),
            }));
        }
        Ok(expr)
    }

    fn parse_lhs_expression(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary()?
        };

        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    let Some(name) = Self::name_of(&self.current.kind) else {
                        return Err(self.unexpected("a property name"));
                    };
                    self.advance();
                    expr = Expression::Member(MemberExpression {
                        id: self.node_id(),
                        object: Box::new(expr),
                        property: MemberProperty::Static(name),
                        span: self.span_from(start),
                    });
                }
                TokenKind::LBracket => {
                    self.advance();
                    let property = self.parse_expression()?;
                    self.require(&TokenKind::RBracket, "']'")?;
                    expr = Expression::Member(MemberExpression {
                        id: self.node_id(),
                        object: Box::new(expr),
                        property: MemberProperty::Computed(Box::new(property)),
                        span: self.span_from(start),
                    });
                }
                TokenKind::LParen => {
                    let arguments = self.parse_arguments()?;
                    expr = Expression::Call(CallExpression {
                        id: self.node_id(),
                        callee: Box::new(expr),
                        arguments,
                        span: self.span_from(start),
                    });
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_new_expression(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        self.require(&TokenKind::New, "'new'")?;

        // The callee is a member chain without call suffixes.
        let mut callee = if self.check(&TokenKind::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary()?
        };
        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    let Some(name) = Self::name_of(&self.current.kind) else {
                        return Err(self.unexpected("a property name"));
                    };
                    self.advance();
                    callee = Expression::Member(MemberExpression {
                        id: self.node_id(),
                        object: Box::new(callee),
                        property: MemberProperty::Static(name),
                        span: self.span_from(start),
                    });
                }
                TokenKind::LBracket => {
                    self.advance();
                    let property = self.parse_expression()?;
                    self.require(&TokenKind::RBracket, "']'")?;
                    callee = Expression::Member(MemberExpression {
                        id: self.node_id(),
                        object: Box::new(callee),
                        property: MemberProperty::Computed(Box::new(property)),
                        span: self.span_from(start),
                    });
                }
                _ => break,
            }
        }

        let arguments = if self.check(&TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expression::New(NewExpression {
            id: self.node_id(),
            callee: Box::new(callee),
            arguments,
            span: self.span_from(start),
        }))
    }

    fn parse_arguments(&mut self) -> Result<Vec<Argument>, Error> {
        self.require(&TokenKind::LParen, "'('")?;
        let mut arguments = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            if self.eat(&TokenKind::DotDotDot) {
                let start = self.previous.span;
                let argument = Box::new(self.parse_assignment()?);
                arguments.push(Argument::Spread(SpreadElement {
                    id: self.node_id(),
                    argument,
                    span: self.span_from(start),
                }));
            } else {
                arguments.push(Argument::Expression(self.parse_assignment()?));
            }
            if !self.check(&TokenKind::RParen) {
                self.require(&TokenKind::Comma, "','")?;
            }
        }
        self.require(&TokenKind::RParen, "')'")?;
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        let span = self.current.span;
        match self.current.kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expression::Literal(Literal {
                    id: self.node_id(),
                    value: LiteralValue::Number(n),
                    span,
                }))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expression::Literal(Literal {
                    id: self.node_id(),
                    value: LiteralValue::String(s),
                    span,
                }))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(Literal {
                    id: self.node_id(),
                    value: LiteralValue::Boolean(true),
                    span,
                }))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(Literal {
                    id: self.node_id(),
                    value: LiteralValue::Boolean(false),
                    span,
                }))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expression::Literal(Literal {
                    id: self.node_id(),
                    value: LiteralValue::Null,
                    span,
                }))
            }
            TokenKind::Infinity => {
                self.advance();
                Ok(Expression::Literal(Literal {
                    id: self.node_id(),
                    value: LiteralValue::Infinity,
                    span,
                }))
            }
            TokenKind::This => {
                self.advance();
                Ok(Expression::This(ThisExpression {
                    id: self.node_id(),
                    span,
                }))
            }
            TokenKind::Super => {
                self.advance();
                Ok(Expression::Super(SuperExpression {
                    id: self.node_id(),
                    span,
                }))
            }
            TokenKind::Function => {
                let start = self.current.span;
                self.advance();
                if self.check(&TokenKind::Star) {
                    return Err(self.unsupported("generator function"));
                }
                let name = if Self::name_of(&self.current.kind).is_some() {
                    Some(self.parse_identifier()?)
                } else {
                    None
                };
                let params = self.parse_params()?;
                let body = self.parse_block()?;
                Ok(Expression::Function(FunctionExpression {
                    id: self.node_id(),
                    name,
                    params,
                    body,
                    span: self.span_from(start),
                }))
            }
            TokenKind::Class => Err(self.unsupported("class expression")),
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.require(&TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            kind => {
                if Self::name_of(&kind).is_some() {
                    Ok(Expression::Identifier(self.parse_identifier()?))
                } else {
                    Err(self.unexpected("an expression"))
                }
            }
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        self.require(&TokenKind::LBracket, "'['")?;
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RBracket) && !self.is_at_end() {
            if self.check(&TokenKind::Comma) {
                elements.push(None);
                self.advance();
                continue;
            }
            if self.eat(&TokenKind::DotDotDot) {
                let spread_start = self.previous.span;
                let argument = Box::new(self.parse_assignment()?);
                elements.push(Some(ArrayElement::Spread(SpreadElement {
                    id: self.node_id(),
                    argument,
                    span: self.span_from(spread_start),
                })));
            } else {
                elements.push(Some(ArrayElement::Expression(self.parse_assignment()?)));
            }
            if !self.check(&TokenKind::RBracket) {
                self.require(&TokenKind::Comma, "','")?;
            }
        }
        self.require(&TokenKind::RBracket, "']'")?;
        Ok(Expression::Array(ArrayExpression {
            id: self.node_id(),
            elements,
            span: self.span_from(start),
        }))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, Error> {
        let start = self.current.span;
        self.require(&TokenKind::LBrace, "'{'")?;
        let mut properties = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            properties.push(self.parse_object_property()?);
            if !self.check(&TokenKind::RBrace) {
                self.require(&TokenKind::Comma, "','")?;
            }
        }
        self.require(&TokenKind::RBrace, "'}'")?;
        Ok(Expression::Object(ObjectExpression {
            id: self.node_id(),
            properties,
            span: self.span_from(start),
        }))
    }

    fn parse_object_property(&mut self) -> Result<ObjectProperty, Error> {
        let start = self.current.span;

        // `get name() {}` / `set name(v) {}` — unless `get`/`set` is itself
        // the property name (`get:`, `get(`, `get,`, `get }`).
        let accessor = match self.current.kind {
            TokenKind::Get | TokenKind::Set => {
                let next = self.peek_kind();
                if matches!(
                    next,
                    TokenKind::Colon | TokenKind::LParen | TokenKind::Comma | TokenKind::RBrace
                ) {
                    None
                } else {
                    Some(self.current.kind == TokenKind::Get)
                }
            }
            _ => None,
        };
        if let Some(is_getter) = accessor {
            self.advance();
            let key = self.parse_property_name()?;
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            let method = ObjectMethod {
                key,
                params,
                body,
                span: self.span_from(start),
            };
            return Ok(if is_getter {
                ObjectProperty::Getter(method)
            } else {
                ObjectProperty::Setter(method)
            });
        }

        let key = self.parse_property_name()?;
        if self.eat(&TokenKind::Colon) {
            let value = self.parse_assignment()?;
            return Ok(ObjectProperty::Data {
                key,
                value,
                span: self.span_from(start),
            });
        }
        if self.check(&TokenKind::LParen) {
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            return Ok(ObjectProperty::Method(ObjectMethod {
                key,
                params,
                body,
                span: self.span_from(start),
            }));
        }
        // Shorthand.
        let PropertyName::Static(name) = key else {
            return Err(self.unexpected("':' after computed key"));
        };
        Ok(ObjectProperty::Shorthand(Identifier {
            id: self.node_id(),
            name,
            span: start,
        }))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::panic)]

    use super::*;

    fn parse_ok(source: &str) -> Program {
        parse(source).expect("parse failed")
    }

    #[test]
    fn script_node_is_id_zero() {
        let program = parse_ok("1;");
        assert_eq!(program.id, NodeId(0));
    }

    #[test]
    fn variable_declaration_shapes() {
        let program = parse_ok("const a = 2, b = 4;");
        let Statement::VariableDeclaration(decl) = &program.body[0] else {
            panic!("expected a declaration");
        };
        assert_eq!(decl.kind, VariableKind::Const);
        assert_eq!(decl.declarations.len(), 2);
    }

    #[test]
    fn destructuring_patterns() {
        parse_ok("let [a, , b = 1] = xs; let { x, y: z, 'k': w } = o;");
    }

    #[test]
    fn arrow_functions() {
        let program = parse_ok("let f = x => x + 1; let g = (a, b) => { return a; };");
        assert_eq!(program.body.len(), 2);
    }

    #[test]
    fn arrow_is_not_confused_with_parenthesized() {
        let program = parse_ok("(a + b) * c;");
        let Statement::Expression(stmt) = &program.body[0] else {
            panic!("expected an expression statement");
        };
        assert_eq!(stmt.expression.kind(), NodeKind::BinaryExpression);
    }

    #[test]
    fn classes() {
        parse_ok("class A { constructor(x) { this.x = x; } a() { return 1; } static s() {} }");
        parse_ok("class B extends A { b() { return 2; } }");
    }

    #[test]
    fn getters_and_setters() {
        parse_ok("let o = { get x() { return 1; }, set x(v) { }, get: 3 };");
    }

    #[test]
    fn for_variants() {
        parse_ok("for (let i = 0; i < 3; i++) {}");
        parse_ok("for (const k in obj) {}");
        parse_ok("for (const v of items) {}");
        parse_ok("for (;;) { break; }");
    }

    #[test]
    fn unsupported_constructs_fail_loudly() {
        assert!(parse("function* gen() {}").is_err());
        assert!(parse("async function f() {}").is_err());
        assert!(parse("outer: while (true) { break outer; }").is_err());
    }

    #[test]
    fn semicolons_may_be_omitted_at_line_ends() {
        parse_ok("let a = 1\nlet b = 2\na + b");
    }

    #[test]
    fn sequence_expression() {
        let program = parse_ok("(1, 2, 3);");
        let Statement::Expression(stmt) = &program.body[0] else {
            panic!("expected an expression statement");
        };
        assert_eq!(stmt.expression.kind(), NodeKind::SequenceExpression);
    }

    #[test]
    fn node_ids_are_unique() {
        let program = parse_ok("let a = 1; a = a + 2;");
        let mut ids = vec![program.id];
        for stmt in &program.body {
            ids.push(stmt.node_id());
        }
        let len = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), len);
    }
}
