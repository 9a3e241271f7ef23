//! Recursive-descent parser and AST builder.
//!
//! Parsing the grammar itself is ordinary LL(1) over the token stream; the
//! interesting work lives in the builder steps applied while constructing
//! nodes — implicit type inference, operator-word folding, postfix suffix
//! disambiguation, and wrap/sugar recognition. Those live in
//! [`implicit_types`] and in the expression builder below.

pub mod implicit_types;

use cnl_base::{Interner, Result, Span, SpannedError};
use cnl_lexicon::KeywordKind;

use crate::ast::{
    Decl, DataDecl, EffectDecl, EnumDecl, Expr, Field, FuncDecl, ImportDecl, MatchArm, Module,
    Param, Pattern, Stmt, Type, TypeAliasDecl, WorkflowStep,
};
use crate::token::{Token, TokenKind};
use implicit_types::{infer_param_type, infer_return_type, promote_type_params};

pub type ParseResult<T> = Result<T>;

/// Parses a token stream (as produced by [`crate::lexer::lex`]) into a
/// [`Module`]. `interner` resolves the `Symbol` lexemes the lexer produced.
pub fn parse(tokens: Vec<Token>, interner: &Interner, module_name: impl Into<String>) -> ParseResult<Module> {
    let mut parser = Parser::new(tokens, interner);
    parser.parse_module(module_name.into())
}

struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    interner: &'a Interner,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token>, interner: &'a Interner) -> Self {
        Self { tokens, current: 0, interner }
    }

    fn parse_module(&mut self, name: String) -> ParseResult<Module> {
        let start = self.current_span();
        self.skip_newlines();
        let mut name = name;
        if self.check_keyword(KeywordKind::Module) {
            self.advance();
            name = self.expect_identifier_or_type_text()?;
            self.skip_period();
            self.skip_newlines();
        }
        let mut decls = Vec::new();
        while !self.is_at_end() {
            if self.check(&TokenKind::Eof) {
                break;
            }
            decls.push(self.parse_decl()?);
            self.skip_newlines();
        }
        let end = self.current_span();
        Ok(Module { name, decls, span: start.merge(&end) })
    }

    fn parse_decl(&mut self) -> ParseResult<Decl> {
        if self.check_keyword(KeywordKind::Import) {
            return self.parse_import();
        }
        if self.check_keyword(KeywordKind::Data) {
            return self.parse_data();
        }
        if self.check_keyword(KeywordKind::Enum) {
            return self.parse_enum();
        }
        if self.check_keyword(KeywordKind::TypeAlias) {
            return self.parse_type_alias();
        }
        if self.check_keyword(KeywordKind::Function) {
            return self.parse_func();
        }
        Err(self.unexpected("a declaration"))
    }

    fn parse_import(&mut self) -> ParseResult<Decl> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::Import)?;
        let path = self.expect_identifier_text()?;
        self.skip_period();
        let span = start.merge(&self.previous_span());
        Ok(Decl::Import(ImportDecl { path, span }))
    }

    fn parse_data(&mut self) -> ParseResult<Decl> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::Data)?;
        let name = self.expect_type_identifier_text()?;
        self.expect(&TokenKind::Colon)?;
        self.expect(&TokenKind::Indent)?;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::Dedent) {
            self.skip_newlines();
            if self.check(&TokenKind::Dedent) {
                break;
            }
            fields.push(self.parse_field()?);
            self.skip_newlines();
        }
        self.expect(&TokenKind::Dedent)?;
        let span = start.merge(&self.previous_span());
        Ok(Decl::Data(DataDecl { name, fields, span }))
    }

    fn parse_field(&mut self) -> ParseResult<Field> {
        let start = self.current_span();
        let name = self.expect_identifier_text()?;
        let ty = self.parse_optional_type_annotation(&name);
        self.skip_period();
        let span = start.merge(&self.previous_span());
        Ok(Field { name, ty, span })
    }

    fn parse_enum(&mut self) -> ParseResult<Decl> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::Enum)?;
        let name = self.expect_type_identifier_text()?;
        self.expect(&TokenKind::Colon)?;
        self.expect(&TokenKind::Indent)?;
        let mut variants = Vec::new();
        while !self.check(&TokenKind::Dedent) {
            self.skip_newlines();
            if self.check(&TokenKind::Dedent) {
                break;
            }
            variants.push(self.expect_type_identifier_text()?);
            self.skip_period();
            self.skip_newlines();
        }
        self.expect(&TokenKind::Dedent)?;
        let span = start.merge(&self.previous_span());
        Ok(Decl::Enum(EnumDecl { name, variants, span }))
    }

    fn parse_type_alias(&mut self) -> ParseResult<Decl> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::TypeAlias)?;
        let name = self.expect_type_identifier_text()?;
        let type_params = self.parse_optional_type_param_clause();
        self.expect(&TokenKind::Equals)?;
        let ty = self.parse_type()?;
        self.skip_period();
        let span = start.merge(&self.previous_span());
        Ok(Decl::TypeAlias(TypeAliasDecl { name, type_params, ty, span }))
    }

    fn parse_func(&mut self) -> ParseResult<Decl> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::Function)?;
        let name = self.expect_identifier_text()?;
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            params.push(self.parse_param()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            }
        }
        self.expect(&TokenKind::RParen)?;

        let mut ret = None;
        if self.check_keyword(KeywordKind::Produces) {
            self.advance();
            ret = Some(self.parse_type()?);
        }

        let mut effect = EffectDecl::Pure;
        let mut capabilities = Vec::new();
        if self.check_keyword(KeywordKind::Performs) {
            self.advance();
            effect = self.parse_effect_kind()?;
            if self.check(&TokenKind::LBracket) {
                self.advance();
                while !self.check(&TokenKind::RBracket) {
                    capabilities.push(self.expect_type_identifier_text()?);
                    if self.check(&TokenKind::Comma) {
                        self.advance();
                    }
                }
                self.expect(&TokenKind::RBracket)?;
            }
        }

        let ret = ret.unwrap_or_else(|| infer_return_type(&name));
        let explicit_type_params = self.parse_optional_type_param_clause();
        let type_params = if explicit_type_params.is_empty() {
            promote_type_params(&params, &ret)
        } else {
            explicit_type_params
        };

        self.expect(&TokenKind::Colon)?;
        let body = self.parse_block()?;
        let span = start.merge(&self.previous_span());
        Ok(Decl::Func(FuncDecl {
            name,
            type_params,
            params,
            ret,
            effect,
            capabilities,
            body,
            span,
        }))
    }

    fn parse_effect_kind(&mut self) -> ParseResult<EffectDecl> {
        if self.check_keyword(KeywordKind::Io) {
            self.advance();
            Ok(EffectDecl::Io)
        } else if self.check_keyword(KeywordKind::Cpu) {
            self.advance();
            Ok(EffectDecl::Cpu)
        } else if self.check_keyword(KeywordKind::Async) {
            self.advance();
            Ok(EffectDecl::Async)
        } else if self.check_keyword(KeywordKind::Pure) {
            self.advance();
            Ok(EffectDecl::Pure)
        } else {
            Err(self.unexpected("an effect keyword (pure, cpu, io, async)"))
        }
    }

    fn parse_param(&mut self) -> ParseResult<Param> {
        let start = self.current_span();
        let name = self.expect_identifier_text()?;
        let ty = self.parse_optional_type_annotation(&name);
        let span = start.merge(&self.previous_span());
        Ok(Param { name, ty, span })
    }

    /// A parameter or field without an explicit `: Type` falls back to the
    /// implicit-type rule table keyed on its name.
    fn parse_optional_type_annotation(&mut self, name: &str) -> Type {
        if self.check(&TokenKind::Colon) {
            self.advance();
            self.parse_type().unwrap_or_else(|_| infer_param_type(name))
        } else {
            infer_param_type(name)
        }
    }

    fn parse_optional_type_param_clause(&mut self) -> Vec<String> {
        if self.check_keyword(KeywordKind::Of) {
            self.advance();
            let mut params = Vec::new();
            loop {
                if let Ok(name) = self.expect_type_identifier_text() {
                    params.push(name);
                } else {
                    break;
                }
                if self.check_keyword(KeywordKind::And) {
                    self.advance();
                } else {
                    break;
                }
            }
            params
        } else {
            Vec::new()
        }
    }

    fn parse_type(&mut self) -> ParseResult<Type> {
        let mut annotations = Vec::new();
        while self.check(&TokenKind::At) {
            annotations.push(self.parse_annotation()?);
        }

        let mut ty = self.parse_type_primary()?;
        for ann in annotations.into_iter().rev() {
            ty = Type::Annotated { annotation: ann, inner: Box::new(ty) };
        }
        Ok(ty)
    }

    fn parse_annotation(&mut self) -> ParseResult<crate::ast::Annotation> {
        self.expect(&TokenKind::At)?;
        let name = self.expect_identifier_text()?;
        let mut annotation = crate::ast::Annotation::new(name);
        if self.check(&TokenKind::LParen) {
            self.advance();
            let mut index = 0usize;
            while !self.check(&TokenKind::RParen) {
                let first = self.expect_identifier_or_type_text()?;
                if self.check(&TokenKind::Equals) {
                    self.advance();
                    let value = self.parse_annotation_value()?;
                    annotation = annotation.with_named(first, value);
                } else {
                    annotation = annotation.with_positional(index, crate::ast::AnnotationValue::Ident(first));
                    index += 1;
                }
                if self.check(&TokenKind::Comma) {
                    self.advance();
                }
            }
            self.expect(&TokenKind::RParen)?;
        }
        Ok(annotation)
    }

    fn parse_annotation_value(&mut self) -> ParseResult<crate::ast::AnnotationValue> {
        match &self.peek().kind {
            TokenKind::IntLiteral(n) => {
                let n = *n;
                self.advance();
                Ok(crate::ast::AnnotationValue::Int(n))
            }
            _ => {
                let text = self.expect_identifier_or_type_text()?;
                Ok(crate::ast::AnnotationValue::Ident(text))
            }
        }
    }

    fn parse_type_primary(&mut self) -> ParseResult<Type> {
        if self.check_type_name_text("Result") {
            self.advance();
            self.expect(&TokenKind::Keyword(KeywordKind::Of))?;
            let ok = self.parse_type()?;
            self.expect_keyword(KeywordKind::And)?;
            let err = self.parse_type()?;
            return Ok(Type::Result { ok: Box::new(ok), err: Box::new(err) });
        }
        if self.check_type_name_text("Maybe") {
            self.advance();
            self.expect(&TokenKind::Keyword(KeywordKind::Of))?;
            let inner = self.parse_type()?;
            return Ok(Type::Maybe(Box::new(inner)));
        }
        if self.check_type_name_text("Option") {
            self.advance();
            self.expect(&TokenKind::Keyword(KeywordKind::Of))?;
            let inner = self.parse_type()?;
            return Ok(Type::Option(Box::new(inner)));
        }
        if self.check_type_name_text("List") {
            self.advance();
            self.expect(&TokenKind::Keyword(KeywordKind::Of))?;
            let inner = self.parse_type()?;
            return Ok(Type::List(Box::new(inner)));
        }
        if self.check_type_name_text("Map") {
            self.advance();
            self.expect(&TokenKind::Keyword(KeywordKind::Of))?;
            let key = self.parse_type()?;
            self.expect_keyword(KeywordKind::And)?;
            let value = self.parse_type()?;
            return Ok(Type::Map { key: Box::new(key), value: Box::new(value) });
        }

        let name = self.expect_type_or_identifier_text()?;
        if self.check_keyword(KeywordKind::Of) {
            self.advance();
            let mut args = vec![self.parse_type()?];
            while self.check_keyword(KeywordKind::And) {
                self.advance();
                args.push(self.parse_type()?);
            }
            return Ok(Type::TypeApp { name, args });
        }

        if is_type_variable_name(&name) {
            Ok(Type::TypeVar(name))
        } else {
            Ok(Type::TypeName(name))
        }
    }

    fn parse_block(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.skip_newlines();
        self.expect(&TokenKind::Indent)?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::Dedent) {
            self.skip_newlines();
            if self.check(&TokenKind::Dedent) {
                break;
            }
            statements.push(self.parse_stmt()?);
            self.skip_newlines();
        }
        self.expect(&TokenKind::Dedent)?;
        let span = start.merge(&self.previous_span());
        Ok(Stmt::Block { statements, span })
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        if self.check_keyword(KeywordKind::Let) {
            return self.parse_let();
        }
        if self.check_keyword(KeywordKind::Set) {
            return self.parse_set();
        }
        if self.check_keyword(KeywordKind::Return) {
            return self.parse_return();
        }
        if self.check_keyword(KeywordKind::If) {
            return self.parse_if();
        }
        if self.check_keyword(KeywordKind::Match) {
            return self.parse_match();
        }
        if self.check_keyword(KeywordKind::Start) {
            return self.parse_start();
        }
        if self.check_keyword(KeywordKind::Wait) {
            return self.parse_wait();
        }
        if self.check_keyword(KeywordKind::Workflow) {
            return self.parse_workflow();
        }
        Err(self.unexpected("a statement"))
    }

    fn parse_let(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::Let)?;
        let name = self.expect_identifier_text()?;
        let ty = if self.check(&TokenKind::Colon) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect_keyword(KeywordKind::Be)?;
        let value = self.parse_expr()?;
        self.skip_period();
        let span = start.merge(&self.previous_span());
        Ok(Stmt::Let { name, ty, value, span })
    }

    fn parse_set(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::Set)?;
        let name = self.expect_identifier_text()?;
        self.expect_keyword(KeywordKind::To)?;
        let value = self.parse_expr()?;
        self.skip_period();
        let span = start.merge(&self.previous_span());
        Ok(Stmt::Set { name, value, span })
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::Return)?;
        let value = if self.check(&TokenKind::Period) || self.check(&TokenKind::Newline) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.skip_period();
        let span = start.merge(&self.previous_span());
        Ok(Stmt::Return { value, span })
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::If)?;
        let cond = self.parse_expr()?;
        self.expect_keyword(KeywordKind::Then)?;
        self.expect(&TokenKind::Colon)?;
        let then_branch = Box::new(self.parse_block()?);
        let mut else_branch = None;
        self.skip_newlines();
        if self.check_keyword(KeywordKind::Else) {
            self.advance();
            self.expect(&TokenKind::Colon)?;
            else_branch = Some(Box::new(self.parse_block()?));
        }
        let span = start.merge(&self.previous_span());
        Ok(Stmt::If { cond, then_branch, else_branch, span })
    }

    fn parse_match(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::Match)?;
        let scrutinee = self.parse_expr()?;
        self.expect(&TokenKind::Colon)?;
        self.skip_newlines();
        self.expect(&TokenKind::Indent)?;
        let mut arms = Vec::new();
        while !self.check(&TokenKind::Dedent) {
            self.skip_newlines();
            if self.check(&TokenKind::Dedent) {
                break;
            }
            arms.push(self.parse_match_arm()?);
            self.skip_newlines();
        }
        self.expect(&TokenKind::Dedent)?;
        let span = start.merge(&self.previous_span());
        Ok(Stmt::Match { scrutinee, arms, span })
    }

    fn parse_match_arm(&mut self) -> ParseResult<MatchArm> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::When)?;
        let pattern = self.parse_pattern()?;
        self.expect(&TokenKind::Colon)?;
        let body = Box::new(self.parse_expr()?);
        self.skip_period();
        let span = start.merge(&self.previous_span());
        Ok(MatchArm { pattern, body, span })
    }

    fn parse_pattern(&mut self) -> ParseResult<Pattern> {
        if self.check_keyword(KeywordKind::Null) {
            self.advance();
            return Ok(Pattern::PatternNull);
        }
        if let TokenKind::IntLiteral(n) = self.peek().kind {
            self.advance();
            return Ok(Pattern::PatternInt(n));
        }
        if matches!(self.peek().kind, TokenKind::TypeIdentifier(_)) {
            let name = self.expect_type_identifier_text()?;
            let mut fields = Vec::new();
            if self.check(&TokenKind::LParen) {
                self.advance();
                while !self.check(&TokenKind::RParen) {
                    fields.push(self.parse_pattern()?);
                    if self.check(&TokenKind::Comma) {
                        self.advance();
                    }
                }
                self.expect(&TokenKind::RParen)?;
            }
            return Ok(Pattern::PatternCtor { name, fields });
        }
        let name = self.expect_identifier_text()?;
        Ok(Pattern::PatternName(name))
    }

    fn parse_start(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::Start)?;
        let task = self.expect_identifier_text()?;
        self.expect_keyword(KeywordKind::As)?;
        let value = self.parse_expr()?;
        self.skip_period();
        let span = start.merge(&self.previous_span());
        Ok(Stmt::Start { task, value, span })
    }

    fn parse_wait(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::Wait)?;
        let task = self.expect_identifier_text()?;
        self.skip_period();
        let span = start.merge(&self.previous_span());
        Ok(Stmt::Wait { task, span })
    }

    fn parse_workflow(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::Workflow)?;
        self.expect(&TokenKind::Colon)?;
        self.skip_newlines();
        self.expect(&TokenKind::Indent)?;
        let mut steps = Vec::new();
        while !self.check(&TokenKind::Dedent) {
            self.skip_newlines();
            if self.check(&TokenKind::Dedent) {
                break;
            }
            steps.push(self.parse_workflow_step()?);
            self.skip_newlines();
        }
        self.expect(&TokenKind::Dedent)?;
        let span = start.merge(&self.previous_span());
        Ok(Stmt::Workflow { steps, span })
    }

    fn parse_workflow_step(&mut self) -> ParseResult<WorkflowStep> {
        let start = self.current_span();
        self.expect_keyword(KeywordKind::Step)?;
        let name = self.expect_identifier_text()?;
        let mut depends_on = Vec::new();
        let mut retry = None;
        let mut timeout = None;
        if self.check_keyword(KeywordKind::DependsOn) {
            self.advance();
            loop {
                depends_on.push(self.expect_identifier_text()?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if self.check_keyword(KeywordKind::Retry) {
            self.advance();
            if let TokenKind::IntLiteral(n) = self.peek().kind {
                retry = Some(n as u32);
                self.advance();
            }
        }
        if self.check_keyword(KeywordKind::Timeout) {
            self.advance();
            if let TokenKind::IntLiteral(n) = self.peek().kind {
                timeout = Some(n as u32);
                self.advance();
            }
        }
        self.expect(&TokenKind::Colon)?;
        let body = Box::new(self.parse_block()?);
        let mut compensate = None;
        self.skip_newlines();
        if self.check_keyword(KeywordKind::Compensate) {
            self.advance();
            self.expect(&TokenKind::Colon)?;
            compensate = Some(Box::new(self.parse_block()?));
        }
        let span = start.merge(&self.previous_span());
        Ok(WorkflowStep { name, depends_on, body, compensate, retry, timeout, span })
    }

    // --- Expressions --------------------------------------------------

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let Some((op, precedence)) = self.peek_binary_operator() else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(precedence + 1)?;
            let span = lhs.span().merge(rhs.span());
            let op_span = span.clone();
            lhs = Expr::Call {
                callee: Box::new(Expr::Name { name: op.to_string(), span: op_span }),
                args: vec![lhs, rhs],
                span,
            };
        }
        Ok(lhs)
    }

    fn peek_binary_operator(&self) -> Option<(&'static str, u8)> {
        match &self.peek().kind {
            TokenKind::Lt => Some(("<", 2)),
            TokenKind::Gt => Some((">", 2)),
            TokenKind::LtEq => Some(("<=", 2)),
            TokenKind::GtEq => Some((">=", 2)),
            TokenKind::EqEq => Some(("==", 2)),
            TokenKind::NotEq => Some(("!=", 2)),
            TokenKind::Plus => Some(("+", 3)),
            TokenKind::Minus => Some(("-", 3)),
            TokenKind::Star => Some(("*", 4)),
            TokenKind::Slash => Some(("/", 4)),
            TokenKind::Keyword(KeywordKind::And) => Some(("and", 1)),
            TokenKind::Keyword(KeywordKind::Or) => Some(("or", 1)),
            _ => None,
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.check_keyword(KeywordKind::Not) {
            let start = self.current_span();
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span());
            return Ok(Expr::Call {
                callee: Box::new(Expr::Name { name: "not".to_string(), span: start }),
                args: vec![operand],
                span,
            });
        }
        self.parse_postfix()
    }

    /// After a primary expression, any mixture of `.member`, `(args)`, and
    /// `with args` applies left-to-right. A run of bare `.member` segments
    /// is held as a pending dotted path rather than folded immediately,
    /// since whether it denotes a qualified function (`Http.post`) or a
    /// receiver-plus-method-name call (`user.redact`) is only decided once
    /// we see whether a call follows and whether the chain's root was a
    /// type identifier.
    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let (mut root, root_is_type) = self.parse_primary_with_kind()?;
        let mut pending_path: Vec<String> = Vec::new();

        loop {
            if self.check(&TokenKind::Dot) {
                self.advance();
                pending_path.push(self.expect_identifier_or_type_text()?);
            } else if self.check(&TokenKind::LParen) {
                let args = self.parse_call_args()?;
                root = self.apply_postfix_call(root, root_is_type, &mut pending_path, args);
            } else if self.check_keyword(KeywordKind::With) {
                self.advance();
                let args = self.parse_with_args()?;
                root = self.apply_postfix_call(root, root_is_type, &mut pending_path, args);
            } else {
                break;
            }
        }

        // A dotted path with no trailing call is plain field/property access.
        for member in pending_path.drain(..) {
            let span = root.span().clone();
            root = Expr::Call {
                callee: Box::new(Expr::Name { name: member, span: span.clone() }),
                args: vec![root],
                span,
            };
        }
        Ok(root)
    }

    fn apply_postfix_call(
        &self,
        root: Expr,
        root_is_type: bool,
        pending_path: &mut Vec<String>,
        args: Vec<Expr>,
    ) -> Expr {
        let span = root.span().merge(&self.previous_span());
        if pending_path.is_empty() {
            return Expr::Call { callee: Box::new(root), args, span };
        }

        if root_is_type {
            // `Foo.Bar.baz(x, y)` — every segment including the root joins
            // into one qualified function name.
            let root_name = match &root {
                Expr::Name { name, .. } => name.clone(),
                _ => String::new(),
            };
            let mut segments = vec![root_name];
            segments.extend(pending_path.drain(..));
            let qualified = segments.join(".");
            let name_span = root.span().clone();
            Expr::Call {
                callee: Box::new(Expr::Name { name: qualified, span: name_span }),
                args,
                span,
            }
        } else {
            // `user.redact(x)` — the trailing member is the method name,
            // the chain root (after any intermediate field access) becomes
            // the receiver, prepended as the first argument.
            let method = pending_path.pop().unwrap();
            let mut receiver = root;
            for member in pending_path.drain(..) {
                let member_span = receiver.span().clone();
                receiver = Expr::Call {
                    callee: Box::new(Expr::Name { name: member, span: member_span.clone() }),
                    args: vec![receiver],
                    span: member_span,
                };
            }
            let mut all_args = vec![receiver];
            all_args.extend(args);
            Expr::Call {
                callee: Box::new(Expr::Name { name: method, span: span.clone() }),
                args: all_args,
                span,
            }
        }
    }

    fn parse_call_args(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_with_args(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = vec![self.parse_unary()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            args.push(self.parse_unary()?);
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();
        match self.peek().kind.clone() {
            TokenKind::Keyword(KeywordKind::True) => {
                self.advance();
                Ok(Expr::Bool { value: true, span: start })
            }
            TokenKind::Keyword(KeywordKind::False) => {
                self.advance();
                Ok(Expr::Bool { value: false, span: start })
            }
            TokenKind::Keyword(KeywordKind::Null) => {
                self.advance();
                Ok(Expr::Null { span: start })
            }
            TokenKind::Keyword(KeywordKind::Ok) => {
                self.advance();
                let inner = Box::new(self.parse_unary()?);
                let span = start.merge(inner.span());
                Ok(Expr::Ok { inner, span })
            }
            TokenKind::Keyword(KeywordKind::Err) => {
                self.advance();
                let inner = Box::new(self.parse_unary()?);
                let span = start.merge(inner.span());
                Ok(Expr::Err { inner, span })
            }
            TokenKind::Keyword(KeywordKind::Some) => {
                self.advance();
                let inner = Box::new(self.parse_unary()?);
                let span = start.merge(inner.span());
                Ok(Expr::Some { inner, span })
            }
            TokenKind::Keyword(KeywordKind::None) => {
                self.advance();
                Ok(Expr::None { span: start })
            }
            TokenKind::Keyword(KeywordKind::Await) => {
                self.advance();
                let inner = Box::new(self.parse_unary()?);
                let span = start.merge(inner.span());
                Ok(Expr::Await { inner, span })
            }
            TokenKind::IntLiteral(value) => {
                self.advance();
                let next_is_long = matches!(self.peek().kind, TokenKind::NumberSuffix(crate::token::NumberSuffix::Long));
                if next_is_long {
                    self.advance();
                    Ok(Expr::Long { value, span: start })
                } else {
                    Ok(Expr::Int { value, span: start })
                }
            }
            TokenKind::FloatLiteral(bits) => {
                self.advance();
                Ok(Expr::Double { bits, span: start })
            }
            TokenKind::StringLiteral(_) => {
                let text = self.current_lexeme_text();
                self.advance();
                Ok(Expr::String { value: text, span: start })
            }
            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Identifier(_) | TokenKind::TypeIdentifier(_) => {
                let name = self.current_lexeme_text();
                self.advance();
                if self.check(&TokenKind::LBrace) {
                    self.parse_construct(name, start)
                } else {
                    Ok(Expr::Name { name, span: start })
                }
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    /// Like [`Self::parse_primary`], but also reports whether the token
    /// consumed as the expression's root was a type identifier — needed by
    /// [`Self::parse_postfix`] to disambiguate qualified-function calls
    /// from method calls.
    fn parse_primary_with_kind(&mut self) -> ParseResult<(Expr, bool)> {
        let is_type_root = matches!(self.peek().kind, TokenKind::TypeIdentifier(_))
            && !matches!(self.peek_at(1), Some(TokenKind::LBrace));
        let expr = self.parse_primary()?;
        Ok((expr, is_type_root))
    }

    fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + offset).map(|t| &t.kind)
    }

    fn parse_list_literal(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();
        self.expect(&TokenKind::LBracket)?;
        let mut items = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            items.push(self.parse_expr()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            }
        }
        self.expect(&TokenKind::RBracket)?;
        let span = start.merge(&self.previous_span());
        Ok(Expr::ListLiteral { items, span })
    }

    fn parse_construct(&mut self, type_name: String, start: Span) -> ParseResult<Expr> {
        self.expect(&TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let field_name = self.expect_identifier_text()?;
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expr()?;
            fields.push((field_name, value));
            if self.check(&TokenKind::Comma) {
                self.advance();
            }
        }
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(&self.previous_span());
        Ok(Expr::Construct { type_name, fields, span })
    }

    // --- Token-level helpers --------------------------------------------

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn check_keyword(&self, kind: KeywordKind) -> bool {
        self.peek().is_keyword(kind)
    }

    fn check_type_name_text(&self, text: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::TypeIdentifier(_)) && self.current_lexeme_text() == text
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn current_span(&self) -> Span {
        self.peek().span.clone()
    }

    fn previous_span(&self) -> Span {
        self.previous().span.clone()
    }

    fn current_lexeme_text(&self) -> String {
        self.interner.resolve(self.peek().lexeme).to_string()
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("{kind:?}")))
        }
    }

    fn expect_keyword(&mut self, kind: KeywordKind) -> ParseResult<&Token> {
        if self.check_keyword(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("keyword {kind:?}")))
        }
    }

    fn expect_identifier_text(&mut self) -> ParseResult<String> {
        if matches!(self.peek().kind, TokenKind::Identifier(_)) {
            let text = self.current_lexeme_text();
            self.advance();
            Ok(text)
        } else {
            Err(self.unexpected("an identifier"))
        }
    }

    fn expect_type_identifier_text(&mut self) -> ParseResult<String> {
        if matches!(self.peek().kind, TokenKind::TypeIdentifier(_)) {
            let text = self.current_lexeme_text();
            self.advance();
            Ok(text)
        } else {
            Err(self.unexpected("a type identifier"))
        }
    }

    fn expect_type_or_identifier_text(&mut self) -> ParseResult<String> {
        if matches!(self.peek().kind, TokenKind::TypeIdentifier(_) | TokenKind::Identifier(_)) {
            let text = self.current_lexeme_text();
            self.advance();
            Ok(text)
        } else {
            Err(self.unexpected("a type name"))
        }
    }

    fn expect_identifier_or_type_text(&mut self) -> ParseResult<String> {
        self.expect_type_or_identifier_text()
    }

    fn skip_period(&mut self) {
        if self.check(&TokenKind::Period) {
            self.advance();
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> SpannedError {
        SpannedError::new(
            format!("expected {expected}, found {:?}", self.peek().kind),
            self.current_span(),
        )
    }
}

fn is_type_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_uppercase() => chars.next().map(|c| !c.is_lowercase()).unwrap_or(true),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnl_base::Interner;
    use cnl_lexicon::Lexicon;

    fn parse_source(source: &str) -> Module {
        let lexicon = Lexicon::en_us();
        let mut interner = Interner::new();
        let lexed = crate::lexer::lex(source, &lexicon, &mut interner).expect("lex should succeed");
        parse(lexed.tokens, &interner, "test").expect("parse should succeed")
    }

    #[test]
    fn a_leading_module_declaration_names_the_module_and_is_consumed() {
        let module = parse_source("this module is greeter.\nto f():\n  return true.\n");
        assert_eq!(module.name, "greeter");
        assert_eq!(module.decls.len(), 1);
    }

    #[test]
    fn without_a_module_declaration_the_caller_supplied_name_is_kept() {
        let module = parse_source("to f():\n  return true.\n");
        assert_eq!(module.name, "test");
    }

    #[test]
    fn parses_a_function_with_inferred_param_and_return_types() {
        let module = parse_source("to isValid(driverId):\n  return true.\n");
        assert_eq!(module.decls.len(), 1);
        match &module.decls[0] {
            Decl::Func(f) => {
                assert_eq!(f.name, "isValid");
                assert_eq!(f.params[0].ty, Type::text("Text"));
                assert_eq!(f.ret, Type::text("Bool"));
            }
            other => panic!("expected Func, got {other:?}"),
        }
    }

    #[test]
    fn folds_operator_tokens_into_a_call_expression() {
        let module = parse_source("to f(x, y):\n  return x < y.\n");
        match &module.decls[0] {
            Decl::Func(f) => match &f.body {
                Stmt::Block { statements, .. } => match &statements[0] {
                    Stmt::Return { value: Some(Expr::Call { callee, args, .. }), .. } => {
                        assert_eq!(args.len(), 2);
                        match callee.as_ref() {
                            Expr::Name { name, .. } => assert_eq!(name, "<"),
                            other => panic!("expected Name callee, got {other:?}"),
                        }
                    }
                    other => panic!("expected Return, got {other:?}"),
                },
                other => panic!("expected Block, got {other:?}"),
            },
            other => panic!("expected Func, got {other:?}"),
        }
    }

    #[test]
    fn recognizes_ok_and_list_literal_sugar() {
        let module = parse_source("to f():\n  return Ok [1, 2].\n");
        match &module.decls[0] {
            Decl::Func(f) => match &f.body {
                Stmt::Block { statements, .. } => match &statements[0] {
                    Stmt::Return { value: Some(Expr::Ok { inner, .. }), .. } => {
                        assert!(matches!(inner.as_ref(), Expr::ListLiteral { .. }));
                    }
                    other => panic!("expected Return(Ok), got {other:?}"),
                },
                other => panic!("expected Block, got {other:?}"),
            },
            other => panic!("expected Func, got {other:?}"),
        }
    }

    #[test]
    fn qualified_call_on_a_type_identifier_root_joins_into_one_name() {
        let module = parse_source("to f(url):\n  return Http.get(url).\n");
        match &module.decls[0] {
            Decl::Func(func) => match &func.body {
                Stmt::Block { statements, .. } => match &statements[0] {
                    Stmt::Return { value: Some(Expr::Call { callee, args, .. }), .. } => {
                        match callee.as_ref() {
                            Expr::Name { name, .. } => assert_eq!(name, "Http.get"),
                            other => panic!("expected Name callee, got {other:?}"),
                        }
                        assert_eq!(args.len(), 1);
                    }
                    other => panic!("expected Return, got {other:?}"),
                },
                other => panic!("expected Block, got {other:?}"),
            },
            other => panic!("expected Func, got {other:?}"),
        }
    }

    #[test]
    fn method_call_on_a_value_prepends_receiver_as_first_argument() {
        let module = parse_source("to f(user):\n  return user.redact().\n");
        match &module.decls[0] {
            Decl::Func(func) => match &func.body {
                Stmt::Block { statements, .. } => match &statements[0] {
                    Stmt::Return { value: Some(Expr::Call { callee, args, .. }), .. } => {
                        match callee.as_ref() {
                            Expr::Name { name, .. } => assert_eq!(name, "redact"),
                            other => panic!("expected Name callee, got {other:?}"),
                        }
                        assert_eq!(args.len(), 1);
                        assert!(matches!(&args[0], Expr::Name { name, .. } if name == "user"));
                    }
                    other => panic!("expected Return, got {other:?}"),
                },
                other => panic!("expected Block, got {other:?}"),
            },
            other => panic!("expected Func, got {other:?}"),
        }
    }
}
