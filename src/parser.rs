use std::rc::Rc;

use indexmap::IndexSet;

use crate::{
    ast::{
        BinaryOp, Block, CatchClause, Expr, ExprKind, ForInTarget, ForInit, FunctionKind,
        FunctionNode, LexicalDecl, Literal, LogicalOp, Name, ObjectProperty, Program,
        PropertyValue, ScopeInfo, Stmt, StmtKind, SwitchCase, UnaryOp, UpdateOp, VarDeclarator,
    },
    conversions::number_to_string,
    diagnostics::{Diagnostic, DiagnosticKind, SourceSpan},
    lexer::{number_value, Keyword, Lexer, Token, TokenKind},
};

/// Parses a whole script. `strict` forces strict mode without a directive.
pub fn parse_program(source: &str, strict: bool) -> Result<Program, Diagnostic> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(source, tokens, strict).parse_program()
}

const STRICT_RESERVED: [&str; 8] = [
    "implements",
    "interface",
    "package",
    "private",
    "protected",
    "public",
    "static",
    "yield",
];

#[derive(Clone, Copy)]
enum BinaryToken {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

struct LabelEntry {
    name: Name,
    iteration: bool,
}

/// Per-function parsing state: hoisting metadata and jump targets.
struct FunctionScope {
    is_arrow: bool,
    strict: bool,
    var_names: IndexSet<Name>,
    functions: Vec<Rc<FunctionNode>>,
    blocks: Vec<Vec<LexicalDecl>>,
    uses_arguments: bool,
    labels: Vec<LabelEntry>,
    iteration_depth: usize,
    switch_depth: usize,
}

impl FunctionScope {
    fn new(is_arrow: bool, strict: bool) -> Self {
        Self {
            is_arrow,
            strict,
            var_names: IndexSet::new(),
            functions: Vec::new(),
            blocks: vec![Vec::new()],
            uses_arguments: false,
            labels: Vec::new(),
            iteration_depth: 0,
            switch_depth: 0,
        }
    }

    fn into_info(mut self) -> ScopeInfo {
        ScopeInfo {
            var_names: self.var_names.into_iter().collect(),
            functions: self.functions,
            lexical: self.blocks.swap_remove(0),
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    current: usize,
    scopes: Vec<FunctionScope>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>, strict: bool) -> Self {
        Self {
            source,
            tokens,
            current: 0,
            scopes: vec![FunctionScope::new(false, strict)],
        }
    }

    fn parse_program(mut self) -> Result<Program, Diagnostic> {
        let body = self.parse_body(TokenKind::Eof)?;
        let scope = self.scopes.pop().unwrap_or_else(|| FunctionScope::new(false, false));
        Ok(Program {
            body,
            strict: scope.strict,
            scope: scope.into_info(),
        })
    }

    fn scope(&self) -> &FunctionScope {
        &self.scopes[self.scopes.len() - 1]
    }

    fn scope_mut(&mut self) -> &mut FunctionScope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    fn strict(&self) -> bool {
        self.scope().strict
    }

    /// Statements up to `terminator`, honouring a leading directive prologue.
    fn parse_body(&mut self, terminator: TokenKind) -> Result<Vec<Stmt>, Diagnostic> {
        let mut body = Vec::new();
        let mut in_prologue = true;
        while !self.check(terminator) && !self.check(TokenKind::Eof) {
            if in_prologue && self.check(TokenKind::String) {
                let token = self.peek().clone();
                let stmt = self.parse_statement_list_item()?;
                let is_directive = matches!(
                    &stmt.kind,
                    StmtKind::Expr(Expr { kind: ExprKind::Literal(Literal::String(_)), span })
                        if *span == token.span
                );
                if is_directive {
                    let raw = &self.source[token.span.start..token.span.end];
                    if raw.len() >= 2 && &raw[1..raw.len() - 1] == "use strict" {
                        self.scope_mut().strict = true;
                    }
                } else {
                    in_prologue = false;
                }
                body.push(stmt);
                continue;
            }
            in_prologue = false;
            body.push(self.parse_statement_list_item()?);
        }
        Ok(body)
    }

    fn parse_statement_list_item(&mut self) -> Result<Stmt, Diagnostic> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Function) => self.parse_function_declaration(),
            TokenKind::Keyword(Keyword::Let) | TokenKind::Keyword(Keyword::Const) => {
                let start = self.peek().span.start;
                let constant = self.advance().kind == TokenKind::Keyword(Keyword::Const);
                let declarations = self.parse_lexical_declarations(constant, false, true)?;
                self.consume_semicolon()?;
                Ok(Stmt {
                    kind: StmtKind::Lexical {
                        constant,
                        declarations,
                    },
                    span: self.span_from(start),
                })
            }
            _ => self.parse_statement(),
        }
    }

    fn parse_statement(&mut self) -> Result<Stmt, Diagnostic> {
        let token = self.peek().clone();
        let start = token.span.start;
        let kind = match token.kind {
            TokenKind::LBrace => StmtKind::Block(self.parse_block()?),
            TokenKind::Semicolon => {
                self.advance();
                StmtKind::Empty
            }
            TokenKind::Keyword(Keyword::Var) => {
                self.advance();
                let declarations = self.parse_var_declarations(false)?;
                self.consume_semicolon()?;
                StmtKind::Var(declarations)
            }
            TokenKind::Keyword(Keyword::Function) => return self.parse_function_declaration(),
            TokenKind::Keyword(Keyword::Let) | TokenKind::Keyword(Keyword::Const) => {
                return Err(self.error(
                    &token,
                    "lexical declaration cannot appear in a single-statement context",
                ))
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::While) => {
                self.advance();
                self.consume(TokenKind::LParen, "expected `(` after `while`")?;
                let test = self.parse_expression(false)?;
                self.consume(TokenKind::RParen, "expected `)` after loop condition")?;
                let body = self.parse_loop_body()?;
                StmtKind::While { test, body }
            }
            TokenKind::Keyword(Keyword::Do) => {
                self.advance();
                let body = self.parse_loop_body()?;
                self.consume_keyword(Keyword::While, "expected `while` after `do` body")?;
                self.consume(TokenKind::LParen, "expected `(` after `while`")?;
                let test = self.parse_expression(false)?;
                self.consume(TokenKind::RParen, "expected `)` after loop condition")?;
                self.matches(TokenKind::Semicolon);
                StmtKind::DoWhile { body, test }
            }
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::Continue) => self.parse_continue()?,
            TokenKind::Keyword(Keyword::Break) => self.parse_break()?,
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                if self.scopes.len() == 1 {
                    return Err(self.error(&token, "illegal return statement outside of a function"));
                }
                let argument = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression(false)?)
                };
                self.consume_semicolon()?;
                StmtKind::Return(argument)
            }
            TokenKind::Keyword(Keyword::With) => {
                if self.strict() {
                    return Err(self.error(&token, "strict mode code may not include a with statement"));
                }
                self.advance();
                self.consume(TokenKind::LParen, "expected `(` after `with`")?;
                let object = self.parse_expression(false)?;
                self.consume(TokenKind::RParen, "expected `)` after with object")?;
                let body = Box::new(self.parse_statement()?);
                StmtKind::With { object, body }
            }
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch()?,
            TokenKind::Keyword(Keyword::Throw) => {
                self.advance();
                if self.peek().newline_before {
                    return Err(self.error(self.peek(), "illegal newline after throw"));
                }
                let argument = self.parse_expression(false)?;
                self.consume_semicolon()?;
                StmtKind::Throw(argument)
            }
            TokenKind::Keyword(Keyword::Try) => self.parse_try()?,
            TokenKind::Keyword(Keyword::Debugger) => {
                self.advance();
                self.consume_semicolon()?;
                StmtKind::Debugger
            }
            TokenKind::Identifier if self.peek_at(1).kind == TokenKind::Colon => {
                self.parse_labeled()?
            }
            _ => {
                let expr = self.parse_expression(false)?;
                self.consume_semicolon()?;
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt {
            kind,
            span: self.span_from(start),
        })
    }

    fn parse_block(&mut self) -> Result<Block, Diagnostic> {
        self.consume(TokenKind::LBrace, "expected `{` to start block")?;
        self.scope_mut().blocks.push(Vec::new());
        let mut body = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            body.push(self.parse_statement_list_item()?);
        }
        let lexical = self.scope_mut().blocks.pop().unwrap_or_default();
        self.consume(TokenKind::RBrace, "expected `}` to close block")?;
        Ok(Block { body, lexical })
    }

    fn parse_loop_body(&mut self) -> Result<Box<Stmt>, Diagnostic> {
        self.scope_mut().iteration_depth += 1;
        let body = self.parse_statement();
        self.scope_mut().iteration_depth -= 1;
        Ok(Box::new(body?))
    }

    fn parse_if(&mut self) -> Result<StmtKind, Diagnostic> {
        self.advance();
        self.consume(TokenKind::LParen, "expected `(` after `if`")?;
        let test = self.parse_expression(false)?;
        self.consume(TokenKind::RParen, "expected `)` after condition")?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.matches_keyword(Keyword::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_for(&mut self) -> Result<StmtKind, Diagnostic> {
        self.advance();
        self.consume(TokenKind::LParen, "expected `(` after `for`")?;

        let mut init = None;
        if self.matches_keyword(Keyword::Var) {
            let declarations = self.parse_var_declarations(true)?;
            if self.check_keyword(Keyword::In) {
                let name = self.single_for_in_binding(&declarations)?;
                return self.parse_for_in_rest(ForInTarget::Var(name));
            }
            init = Some(ForInit::Var(declarations));
        } else if self.check_keyword(Keyword::Let) || self.check_keyword(Keyword::Const) {
            let constant = self.advance().kind == TokenKind::Keyword(Keyword::Const);
            let for_in = self.peek_at(1).kind == TokenKind::Keyword(Keyword::In);
            let declarations = self.parse_lexical_declarations(constant, true, !for_in)?;
            if self.check_keyword(Keyword::In) {
                let name = self.single_for_in_binding(&declarations)?;
                return self.parse_for_in_rest(ForInTarget::Lexical { constant, name });
            }
            init = Some(ForInit::Lexical {
                constant,
                declarations,
            });
        } else if !self.check(TokenKind::Semicolon) {
            let expr = self.parse_expression(true)?;
            if self.check_keyword(Keyword::In) {
                self.check_assignment_target(&expr)?;
                return self.parse_for_in_rest(ForInTarget::Expr(expr));
            }
            init = Some(ForInit::Expr(expr));
        }

        self.consume(TokenKind::Semicolon, "expected `;` after for initializer")?;
        let test = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression(false)?)
        };
        self.consume(TokenKind::Semicolon, "expected `;` after for condition")?;
        let update = if self.check(TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression(false)?)
        };
        self.consume(TokenKind::RParen, "expected `)` after for clauses")?;
        let body = self.parse_loop_body()?;
        Ok(StmtKind::For {
            init,
            test,
            update,
            body,
        })
    }

    fn single_for_in_binding(&self, declarations: &[VarDeclarator]) -> Result<Name, Diagnostic> {
        match declarations {
            [single] if single.init.is_none() => Ok(single.name.clone()),
            _ => Err(Diagnostic::new(
                DiagnosticKind::Parser,
                "for-in loop requires a single binding without initializer",
            )
            .with_span(self.peek().span)),
        }
    }

    fn parse_for_in_rest(&mut self, target: ForInTarget) -> Result<StmtKind, Diagnostic> {
        self.consume_keyword(Keyword::In, "expected `in`")?;
        let object = self.parse_expression(false)?;
        self.consume(TokenKind::RParen, "expected `)` after for-in object")?;
        let body = self.parse_loop_body()?;
        Ok(StmtKind::ForIn {
            target,
            object,
            body,
        })
    }

    fn optional_label(&mut self) -> Result<Option<Name>, Diagnostic> {
        if self.check(TokenKind::Identifier) && !self.peek().newline_before {
            let token = self.advance();
            Ok(Some(Name::from(token.lexeme.as_str())))
        } else {
            Ok(None)
        }
    }

    fn parse_continue(&mut self) -> Result<StmtKind, Diagnostic> {
        let keyword = self.advance();
        let label = self.optional_label()?;
        match &label {
            Some(name) => {
                let target = self.scope().labels.iter().rev().find(|l| &l.name == name);
                match target {
                    Some(entry) if entry.iteration => {}
                    Some(_) => {
                        return Err(self.error(&keyword, &format!("label '{name}' does not denote an iteration statement")))
                    }
                    None => return Err(self.error(&keyword, &format!("undefined label '{name}'"))),
                }
            }
            None if self.scope().iteration_depth == 0 => {
                return Err(self.error(&keyword, "illegal continue statement: no surrounding iteration statement"))
            }
            None => {}
        }
        self.consume_semicolon()?;
        Ok(StmtKind::Continue(label))
    }

    fn parse_break(&mut self) -> Result<StmtKind, Diagnostic> {
        let keyword = self.advance();
        let label = self.optional_label()?;
        match &label {
            Some(name) => {
                if !self.scope().labels.iter().any(|l| &l.name == name) {
                    return Err(self.error(&keyword, &format!("undefined label '{name}'")));
                }
            }
            None => {
                let scope = self.scope();
                if scope.iteration_depth == 0 && scope.switch_depth == 0 {
                    return Err(self.error(&keyword, "illegal break statement"));
                }
            }
        }
        self.consume_semicolon()?;
        Ok(StmtKind::Break(label))
    }

    fn parse_switch(&mut self) -> Result<StmtKind, Diagnostic> {
        self.advance();
        self.consume(TokenKind::LParen, "expected `(` after `switch`")?;
        let discriminant = self.parse_expression(false)?;
        self.consume(TokenKind::RParen, "expected `)` after switch discriminant")?;
        self.consume(TokenKind::LBrace, "expected `{` to start switch body")?;

        self.scope_mut().switch_depth += 1;
        self.scope_mut().blocks.push(Vec::new());
        let cases = self.parse_switch_cases();
        let lexical = self.scope_mut().blocks.pop().unwrap_or_default();
        self.scope_mut().switch_depth -= 1;
        let cases = cases?;

        self.consume(TokenKind::RBrace, "expected `}` to close switch body")?;
        Ok(StmtKind::Switch {
            discriminant,
            cases,
            lexical,
        })
    }

    fn parse_switch_cases(&mut self) -> Result<Vec<SwitchCase>, Diagnostic> {
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            let token = self.advance();
            let test = match token.kind {
                TokenKind::Keyword(Keyword::Case) => Some(self.parse_expression(false)?),
                TokenKind::Keyword(Keyword::Default) => {
                    if seen_default {
                        return Err(self.error(&token, "more than one default clause in switch statement"));
                    }
                    seen_default = true;
                    None
                }
                _ => return Err(self.error(&token, "expected `case` or `default`")),
            };
            self.consume(TokenKind::Colon, "expected `:` after case")?;
            let mut body = Vec::new();
            while !self.check_keyword(Keyword::Case)
                && !self.check_keyword(Keyword::Default)
                && !self.check(TokenKind::RBrace)
                && !self.check(TokenKind::Eof)
            {
                body.push(self.parse_statement_list_item()?);
            }
            cases.push(SwitchCase { test, body });
        }
        Ok(cases)
    }

    fn parse_try(&mut self) -> Result<StmtKind, Diagnostic> {
        let keyword = self.advance();
        let block = self.parse_block()?;
        let handler = if self.matches_keyword(Keyword::Catch) {
            self.consume(TokenKind::LParen, "expected `(` after `catch`")?;
            let param = self.binding_identifier("expected catch parameter")?;
            self.consume(TokenKind::RParen, "expected `)` after catch parameter")?;
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.matches_keyword(Keyword::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error(&keyword, "missing catch or finally after try"));
        }
        Ok(StmtKind::Try {
            block,
            handler,
            finalizer,
        })
    }

    fn parse_labeled(&mut self) -> Result<StmtKind, Diagnostic> {
        let token = self.advance();
        self.advance();
        let label = Name::from(token.lexeme.as_str());
        if self.scope().labels.iter().any(|l| l.name == label) {
            return Err(self.error(&token, &format!("label '{label}' has already been declared")));
        }

        // Skip over any further labels to see what is being labelled.
        let mut offset = 0;
        while self.peek_at(offset).kind == TokenKind::Identifier
            && self.peek_at(offset + 1).kind == TokenKind::Colon
        {
            offset += 2;
        }
        let iteration = matches!(
            self.peek_at(offset).kind,
            TokenKind::Keyword(Keyword::For | Keyword::While | Keyword::Do)
        );

        self.scope_mut().labels.push(LabelEntry {
            name: label.clone(),
            iteration,
        });
        let body = self.parse_statement();
        self.scope_mut().labels.pop();
        Ok(StmtKind::Labeled {
            label,
            body: Box::new(body?),
        })
    }

    fn parse_var_declarations(&mut self, no_in: bool) -> Result<Vec<VarDeclarator>, Diagnostic> {
        let mut declarations = Vec::new();
        loop {
            let start = self.peek().span.start;
            let name = self.binding_identifier("expected variable name")?;
            let init = if self.matches(TokenKind::Assign) {
                Some(self.parse_assignment(no_in)?)
            } else {
                None
            };
            self.scope_mut().var_names.insert(name.clone());
            declarations.push(VarDeclarator {
                name,
                init,
                span: self.span_from(start),
            });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        Ok(declarations)
    }

    /// `let`/`const` declarators. Names are registered in the enclosing block
    /// unless they belong to a `for` head.
    fn parse_lexical_declarations(
        &mut self,
        constant: bool,
        for_head: bool,
        require_init: bool,
    ) -> Result<Vec<VarDeclarator>, Diagnostic> {
        let mut declarations = Vec::new();
        loop {
            let name_token = self.peek().clone();
            let name = self.binding_identifier("expected variable name")?;
            if name.as_ref() == "let" {
                return Err(self.error(&name_token, "let is disallowed as a lexically bound name"));
            }
            let init = if self.matches(TokenKind::Assign) {
                Some(self.parse_assignment(for_head)?)
            } else {
                None
            };
            if constant && require_init && init.is_none() {
                return Err(self.error(&name_token, "missing initializer in const declaration"));
            }
            if !for_head {
                let block = self.scope().blocks.last();
                if block.is_some_and(|decls| decls.iter().any(|d| d.name == name)) {
                    return Err(self.error(
                        &name_token,
                        &format!("identifier '{name}' has already been declared"),
                    ));
                }
                if let Some(decls) = self.scope_mut().blocks.last_mut() {
                    decls.push(LexicalDecl {
                        name: name.clone(),
                        constant,
                    });
                }
            }
            declarations.push(VarDeclarator {
                name,
                init,
                span: self.span_from(name_token.span.start),
            });
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        Ok(declarations)
    }

    fn parse_function_declaration(&mut self) -> Result<Stmt, Diagnostic> {
        let start = self.advance().span.start;
        let node = self.parse_function(FunctionKind::Declaration, start)?;
        self.scope_mut().functions.push(node.clone());
        Ok(Stmt {
            kind: StmtKind::FunctionDeclaration(node),
            span: self.span_from(start),
        })
    }

    /// Parses the rest of a function after the `function` keyword.
    fn parse_function(&mut self, kind: FunctionKind, start: usize) -> Result<Rc<FunctionNode>, Diagnostic> {
        let name = if self.check(TokenKind::Identifier) {
            Some(self.binding_identifier("expected function name")?)
        } else if kind == FunctionKind::Declaration {
            return Err(self.error(self.peek(), "function statement requires a name"));
        } else {
            None
        };
        let params = self.parse_params()?;
        self.parse_function_body(name, kind, params, start)
    }

    fn parse_params(&mut self) -> Result<Vec<(Name, Token)>, Diagnostic> {
        self.consume(TokenKind::LParen, "expected `(` before parameters")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let token = self.peek().clone();
                let name = self.binding_identifier("expected parameter name")?;
                params.push((name, token));
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "expected `)` after parameters")?;
        Ok(params)
    }

    fn parse_function_body(
        &mut self,
        name: Option<Name>,
        kind: FunctionKind,
        params: Vec<(Name, Token)>,
        start: usize,
    ) -> Result<Rc<FunctionNode>, Diagnostic> {
        self.consume(TokenKind::LBrace, "expected `{` before function body")?;
        let strict = self.strict();
        self.scopes.push(FunctionScope::new(kind == FunctionKind::Arrow, strict));
        let body = self.parse_body(TokenKind::RBrace);
        let scope = self.scopes.pop().unwrap_or_else(|| FunctionScope::new(false, strict));
        let body = body?;
        self.consume(TokenKind::RBrace, "expected `}` after function body")?;

        if scope.strict {
            self.check_strict_params(&params)?;
        }
        let uses_arguments = scope.uses_arguments;
        let strict = scope.strict;
        Ok(Rc::new(FunctionNode {
            name,
            kind,
            params: params.into_iter().map(|(name, _)| name).collect(),
            body,
            strict,
            scope: scope.into_info(),
            uses_arguments,
            source: Rc::from(&self.source[start..self.previous().span.end]),
            span: self.span_from(start),
        }))
    }

    fn check_strict_params(&self, params: &[(Name, Token)]) -> Result<(), Diagnostic> {
        for (idx, (name, token)) in params.iter().enumerate() {
            if matches!(name.as_ref(), "eval" | "arguments") || STRICT_RESERVED.contains(&name.as_ref()) {
                return Err(self.error(token, &format!("unexpected '{name}' in strict mode")));
            }
            if params[..idx].iter().any(|(other, _)| other == name) {
                return Err(self.error(token, "duplicate parameter name not allowed in strict mode"));
            }
        }
        Ok(())
    }

    fn parse_arrow_function(&mut self, params: Vec<(Name, Token)>, start: usize) -> Result<Expr, Diagnostic> {
        self.consume(TokenKind::FatArrow, "expected `=>`")?;
        let node = if self.check(TokenKind::LBrace) {
            self.parse_function_body(None, FunctionKind::Arrow, params, start)?
        } else {
            let strict = self.strict();
            self.scopes.push(FunctionScope::new(true, strict));
            let expr = self.parse_assignment(false);
            let scope = self.scopes.pop().unwrap_or_else(|| FunctionScope::new(true, strict));
            let expr = expr?;
            if strict {
                self.check_strict_params(&params)?;
            }
            let span = expr.span;
            Rc::new(FunctionNode {
                name: None,
                kind: FunctionKind::Arrow,
                params: params.into_iter().map(|(name, _)| name).collect(),
                body: vec![Stmt {
                    kind: StmtKind::Return(Some(expr)),
                    span,
                }],
                strict,
                scope: scope.into_info(),
                uses_arguments: false,
                source: Rc::from(&self.source[start..self.previous().span.end]),
                span: self.span_from(start),
            })
        };
        Ok(Expr {
            kind: ExprKind::Function(node),
            span: self.span_from(start),
        })
    }

    /// Looks past a parenthesised list for `=>`.
    fn is_arrow_parameter_list(&self) -> bool {
        let mut depth = 0usize;
        let mut idx = self.current;
        while let Some(token) = self.tokens.get(idx) {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(idx + 1),
                            Some(next) if next.kind == TokenKind::FatArrow && !next.newline_before
                        );
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            idx += 1;
        }
        false
    }

    fn parse_expression(&mut self, no_in: bool) -> Result<Expr, Diagnostic> {
        let first = self.parse_assignment(no_in)?;
        if !self.check(TokenKind::Comma) {
            return Ok(first);
        }
        let start = first.span.start;
        let mut items = vec![first];
        while self.matches(TokenKind::Comma) {
            items.push(self.parse_assignment(no_in)?);
        }
        Ok(Expr {
            kind: ExprKind::Sequence(items),
            span: self.span_from(start),
        })
    }

    fn parse_assignment(&mut self, no_in: bool) -> Result<Expr, Diagnostic> {
        let start = self.peek().span.start;
        if self.check(TokenKind::Identifier)
            && self.peek_at(1).kind == TokenKind::FatArrow
            && !self.peek_at(1).newline_before
        {
            let token = self.peek().clone();
            let name = self.binding_identifier("expected parameter name")?;
            return self.parse_arrow_function(vec![(name, token)], start);
        }
        if self.check(TokenKind::LParen) && self.is_arrow_parameter_list() {
            let params = self.parse_params()?;
            return self.parse_arrow_function(params, start);
        }

        let target = self.parse_conditional(no_in)?;
        let op = match self.peek().kind {
            TokenKind::Assign => None,
            TokenKind::PlusAssign => Some(BinaryOp::Add),
            TokenKind::MinusAssign => Some(BinaryOp::Sub),
            TokenKind::StarAssign => Some(BinaryOp::Mul),
            TokenKind::SlashAssign => Some(BinaryOp::Div),
            TokenKind::PercentAssign => Some(BinaryOp::Mod),
            TokenKind::ShiftLeftAssign => Some(BinaryOp::ShiftLeft),
            TokenKind::ShiftRightAssign => Some(BinaryOp::ShiftRight),
            TokenKind::UnsignedShiftRightAssign => Some(BinaryOp::UnsignedShiftRight),
            TokenKind::AmpersandAssign => Some(BinaryOp::BitAnd),
            TokenKind::PipeAssign => Some(BinaryOp::BitOr),
            TokenKind::CaretAssign => Some(BinaryOp::BitXor),
            _ => return Ok(target),
        };
        self.check_assignment_target(&target)?;
        self.advance();
        let value = self.parse_assignment(no_in)?;
        Ok(Expr {
            kind: ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span: self.span_from(start),
        })
    }

    fn check_assignment_target(&self, target: &Expr) -> Result<(), Diagnostic> {
        match &target.kind {
            ExprKind::Identifier(name) => {
                if self.strict() && matches!(name.as_ref(), "eval" | "arguments") {
                    return Err(Diagnostic::new(
                        DiagnosticKind::Parser,
                        format!("unexpected '{name}' in strict mode"),
                    )
                    .with_span(target.span));
                }
                Ok(())
            }
            ExprKind::Member { .. } | ExprKind::Index { .. } => Ok(()),
            _ => Err(
                Diagnostic::new(DiagnosticKind::Parser, "invalid assignment target")
                    .with_span(target.span),
            ),
        }
    }

    fn parse_conditional(&mut self, no_in: bool) -> Result<Expr, Diagnostic> {
        let test = self.parse_binary(0, no_in)?;
        if !self.matches(TokenKind::Question) {
            return Ok(test);
        }
        let start = test.span.start;
        let consequent = self.parse_assignment(false)?;
        self.consume(TokenKind::Colon, "expected `:` in conditional expression")?;
        let alternate = self.parse_assignment(no_in)?;
        Ok(Expr {
            kind: ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span: self.span_from(start),
        })
    }

    fn binary_operator(&self, no_in: bool) -> Option<(u8, BinaryToken)> {
        use BinaryToken::{Binary, Logical};
        let entry = match self.peek().kind {
            TokenKind::DoublePipe => (1, Logical(LogicalOp::Or)),
            TokenKind::DoubleAmpersand => (2, Logical(LogicalOp::And)),
            TokenKind::Pipe => (3, Binary(BinaryOp::BitOr)),
            TokenKind::Caret => (4, Binary(BinaryOp::BitXor)),
            TokenKind::Ampersand => (5, Binary(BinaryOp::BitAnd)),
            TokenKind::EqualEqual => (6, Binary(BinaryOp::Equal)),
            TokenKind::BangEqual => (6, Binary(BinaryOp::NotEqual)),
            TokenKind::EqualEqualEqual => (6, Binary(BinaryOp::StrictEqual)),
            TokenKind::BangEqualEqual => (6, Binary(BinaryOp::StrictNotEqual)),
            TokenKind::Less => (7, Binary(BinaryOp::Less)),
            TokenKind::LessEqual => (7, Binary(BinaryOp::LessEqual)),
            TokenKind::Greater => (7, Binary(BinaryOp::Greater)),
            TokenKind::GreaterEqual => (7, Binary(BinaryOp::GreaterEqual)),
            TokenKind::Keyword(Keyword::InstanceOf) => (7, Binary(BinaryOp::InstanceOf)),
            TokenKind::Keyword(Keyword::In) if !no_in => (7, Binary(BinaryOp::In)),
            TokenKind::ShiftLeft => (8, Binary(BinaryOp::ShiftLeft)),
            TokenKind::ShiftRight => (8, Binary(BinaryOp::ShiftRight)),
            TokenKind::UnsignedShiftRight => (8, Binary(BinaryOp::UnsignedShiftRight)),
            TokenKind::Plus => (9, Binary(BinaryOp::Add)),
            TokenKind::Minus => (9, Binary(BinaryOp::Sub)),
            TokenKind::Star => (10, Binary(BinaryOp::Mul)),
            TokenKind::Slash => (10, Binary(BinaryOp::Div)),
            TokenKind::Percent => (10, Binary(BinaryOp::Mod)),
            _ => return None,
        };
        Some(entry)
    }

    /// Precedence climbing over left-associative binary operators.
    fn parse_binary(&mut self, min_precedence: u8, no_in: bool) -> Result<Expr, Diagnostic> {
        let mut left = self.parse_unary()?;
        while let Some((precedence, op)) = self.binary_operator(no_in) {
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(precedence + 1, no_in)?;
            let span = left.span.to(right.span);
            let kind = match op {
                BinaryToken::Binary(op) => ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                BinaryToken::Logical(op) => ExprKind::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
            left = Expr { kind, span };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        let token = self.peek().clone();
        let op = match token.kind {
            TokenKind::Keyword(Keyword::Delete) => UnaryOp::Delete,
            TokenKind::Keyword(Keyword::Void) => UnaryOp::Void,
            TokenKind::Keyword(Keyword::TypeOf) => UnaryOp::TypeOf,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                self.advance();
                let target = self.parse_unary()?;
                self.check_assignment_target(&target)?;
                let op = if token.kind == TokenKind::PlusPlus {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                return Ok(Expr {
                    kind: ExprKind::Update {
                        op,
                        prefix: true,
                        target: Box::new(target),
                    },
                    span: self.span_from(token.span.start),
                });
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        let expr = self.parse_unary()?;
        if op == UnaryOp::Delete && self.strict() && matches!(expr.kind, ExprKind::Identifier(_)) {
            return Err(self.error(&token, "delete of an unqualified identifier in strict mode"));
        }
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                expr: Box::new(expr),
            },
            span: self.span_from(token.span.start),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, Diagnostic> {
        let expr = self.parse_left_hand_side()?;
        let op = match self.peek().kind {
            TokenKind::PlusPlus if !self.peek().newline_before => UpdateOp::Increment,
            TokenKind::MinusMinus if !self.peek().newline_before => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        self.check_assignment_target(&expr)?;
        self.advance();
        let start = expr.span.start;
        Ok(Expr {
            kind: ExprKind::Update {
                op,
                prefix: false,
                target: Box::new(expr),
            },
            span: self.span_from(start),
        })
    }

    fn parse_left_hand_side(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = if self.check_keyword(Keyword::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.check(TokenKind::LParen) {
                let args = self.parse_arguments()?;
                expr = Expr {
                    span: self.span_from(expr.span.start),
                    kind: ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                };
            } else if self.check(TokenKind::Dot) || self.check(TokenKind::LBracket) {
                expr = self.parse_member_suffix(expr)?;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Applies a `.name` or `[index]` suffix to `object`.
    fn parse_member_suffix(&mut self, object: Expr) -> Result<Expr, Diagnostic> {
        let start = object.span.start;
        if self.matches(TokenKind::Dot) {
            let token = self.advance();
            if !matches!(token.kind, TokenKind::Identifier | TokenKind::Keyword(_)) {
                return Err(self.error(&token, "expected property name after `.`"));
            }
            return Ok(Expr {
                kind: ExprKind::Member {
                    object: Box::new(object),
                    property: Name::from(token.lexeme.as_str()),
                },
                span: self.span_from(start),
            });
        }
        self.consume(TokenKind::LBracket, "expected `[`")?;
        let index = self.parse_expression(false)?;
        self.consume(TokenKind::RBracket, "expected `]` after index")?;
        Ok(Expr {
            kind: ExprKind::Index {
                object: Box::new(object),
                index: Box::new(index),
            },
            span: self.span_from(start),
        })
    }

    fn parse_new(&mut self) -> Result<Expr, Diagnostic> {
        let start = self.advance().span.start;
        let mut callee = if self.check_keyword(Keyword::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        while self.check(TokenKind::Dot) || self.check(TokenKind::LBracket) {
            callee = self.parse_member_suffix(callee)?;
        }
        let args = if self.check(TokenKind::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expr {
            kind: ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            span: self.span_from(start),
        })
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, Diagnostic> {
        self.consume(TokenKind::LParen, "expected `(`")?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_assignment(false)?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "expected `)` after arguments")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let token = self.peek().clone();
        let kind = match token.kind {
            TokenKind::Keyword(Keyword::This) => {
                self.advance();
                ExprKind::This
            }
            TokenKind::Identifier => {
                self.advance();
                if token.lexeme == "arguments" {
                    if let Some(scope) = self.scopes.iter_mut().rev().find(|s| !s.is_arrow) {
                        scope.uses_arguments = true;
                    }
                }
                ExprKind::Identifier(Name::from(token.lexeme.as_str()))
            }
            TokenKind::Number => {
                self.advance();
                if token.legacy_octal && self.strict() {
                    return Err(self.error(&token, "octal literals are not allowed in strict mode"));
                }
                ExprKind::Literal(Literal::Number(number_value(&token.lexeme)))
            }
            TokenKind::String => {
                self.advance();
                if token.legacy_octal && self.strict() {
                    return Err(self.error(&token, "octal escape sequences are not allowed in strict mode"));
                }
                ExprKind::Literal(Literal::String(Rc::from(token.lexeme.as_str())))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                ExprKind::Literal(Literal::Bool(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                ExprKind::Literal(Literal::Bool(false))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                ExprKind::Literal(Literal::Null)
            }
            TokenKind::Keyword(Keyword::Function) => {
                self.advance();
                ExprKind::Function(self.parse_function(FunctionKind::Expression, token.span.start)?)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression(false)?;
                self.consume(TokenKind::RParen, "expected `)` after expression")?;
                return Ok(inner);
            }
            TokenKind::LBracket => self.parse_array_literal()?,
            TokenKind::LBrace => self.parse_object_literal()?,
            TokenKind::Eof => return Err(self.error(&token, "unexpected end of input")),
            _ => {
                return Err(self.error(&token, &format!("unexpected token `{}`", token.lexeme)))
            }
        };
        Ok(Expr {
            kind,
            span: self.span_from(token.span.start),
        })
    }

    fn parse_array_literal(&mut self) -> Result<ExprKind, Diagnostic> {
        self.advance();
        let mut elements = Vec::new();
        loop {
            if self.matches(TokenKind::RBracket) {
                break;
            }
            if self.matches(TokenKind::Comma) {
                elements.push(None);
                continue;
            }
            elements.push(Some(self.parse_assignment(false)?));
            if !self.check(TokenKind::RBracket) {
                self.consume(TokenKind::Comma, "expected `,` or `]` in array literal")?;
            }
        }
        Ok(ExprKind::Array(elements))
    }

    fn parse_object_literal(&mut self) -> Result<ExprKind, Diagnostic> {
        self.advance();
        let mut properties = Vec::new();
        loop {
            if self.matches(TokenKind::RBrace) {
                break;
            }
            properties.push(self.parse_object_property()?);
            if !self.check(TokenKind::RBrace) {
                self.consume(TokenKind::Comma, "expected `,` or `}` in object literal")?;
            }
        }
        Ok(ExprKind::Object(properties))
    }

    fn parse_object_property(&mut self) -> Result<ObjectProperty, Diagnostic> {
        let token = self.peek().clone();
        let start = token.span.start;
        let accessor = token.kind == TokenKind::Identifier
            && (token.lexeme == "get" || token.lexeme == "set")
            && !matches!(
                self.peek_at(1).kind,
                TokenKind::Colon | TokenKind::Comma | TokenKind::RBrace | TokenKind::LParen
            );
        if accessor {
            self.advance();
            let key = self.property_name()?;
            let params = self.parse_params()?;
            let is_getter = token.lexeme == "get";
            let arity_ok = if is_getter { params.is_empty() } else { params.len() == 1 };
            if !arity_ok {
                return Err(self.error(
                    &token,
                    if is_getter {
                        "getter must not have parameters"
                    } else {
                        "setter must have exactly one parameter"
                    },
                ));
            }
            let function = self.parse_function_body(None, FunctionKind::Expression, params, start)?;
            let value = if is_getter {
                PropertyValue::Getter(function)
            } else {
                PropertyValue::Setter(function)
            };
            return Ok(ObjectProperty {
                key,
                value,
                span: self.span_from(start),
            });
        }

        let key = self.property_name()?;
        self.consume(TokenKind::Colon, "expected `:` after property name")?;
        let value = self.parse_assignment(false)?;
        Ok(ObjectProperty {
            key,
            value: PropertyValue::Init(value),
            span: self.span_from(start),
        })
    }

    fn property_name(&mut self) -> Result<Name, Diagnostic> {
        let token = self.advance();
        match token.kind {
            TokenKind::Identifier | TokenKind::Keyword(_) | TokenKind::String => {
                Ok(Name::from(token.lexeme.as_str()))
            }
            TokenKind::Number => Ok(Name::from(number_to_string(number_value(&token.lexeme)))),
            _ => Err(self.error(&token, "expected property name")),
        }
    }

    fn binding_identifier(&mut self, message: &str) -> Result<Name, Diagnostic> {
        let token = self.peek().clone();
        if token.kind != TokenKind::Identifier {
            return Err(self.error(&token, message));
        }
        self.advance();
        if self.strict()
            && (matches!(token.lexeme.as_str(), "eval" | "arguments")
                || STRICT_RESERVED.contains(&token.lexeme.as_str()))
        {
            return Err(self.error(&token, &format!("unexpected '{}' in strict mode", token.lexeme)));
        }
        Ok(Name::from(token.lexeme.as_str()))
    }

    fn at_statement_end(&self) -> bool {
        let token = self.peek();
        matches!(token.kind, TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof)
            || token.newline_before
    }

    /// Automatic semicolon insertion.
    fn consume_semicolon(&mut self) -> Result<(), Diagnostic> {
        if self.matches(TokenKind::Semicolon) || self.at_statement_end() {
            return Ok(());
        }
        Err(self.error(self.peek(), &format!("unexpected token `{}`", self.peek().lexeme)))
    }

    fn span_from(&self, start: usize) -> SourceSpan {
        SourceSpan::new(start, self.previous().span.end.max(start))
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn matches_keyword(&mut self, keyword: Keyword) -> bool {
        self.matches(TokenKind::Keyword(keyword))
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(self.peek(), message))
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword, message: &str) -> Result<Token, Diagnostic> {
        self.consume(TokenKind::Keyword(keyword), message)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.check(TokenKind::Keyword(keyword))
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1).min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.current + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn error(&self, token: &Token, message: &str) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Parser, message.to_string()).with_span(token.span)
    }
}
