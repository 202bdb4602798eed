//! Recursive descent parser for slate
//!
//! Expressions use a fixed precedence ladder; each level delegates to
//! the next tighter one:
//!
//! ```text
//! ternary      a ? b : c
//! or           ||  or
//! and          &&
//! low and      and
//! low not      not
//! comparison   == != < > <= >= === !==   (chained)
//! bitwise      & | ^
//! shift        << >>
//! additive     + -
//! term         * / % //
//! power        **                        (right associative)
//! unary        ! ~ - +
//! postfix      call, member, index
//! primary      literal, name, parens
//! ```
//!
//! # Module Structure
//!
//! - `cursor` - lookahead, pushback and snapshots over the lexer
//! - `error` - `SyntaxError`

pub mod cursor;
pub mod error;

pub use cursor::TokenCursor;
pub use error::{ParseResult, SyntaxError};

use std::collections::HashSet;
use std::rc::Rc;

use crate::ast::*;
use crate::lexer::{SpannedToken, Token};
use crate::resolve;

/// Parse a whole program and resolve the scope of every name in it
pub fn parse(input: &str, source_name: &str) -> ParseResult<Program> {
    Parser::new(input, source_name)?.parse_program()
}

pub struct Parser<'a> {
    cursor: TokenCursor<'a>,
    /// Nesting depth of `def` bodies, for rejecting top-level `return`
    function_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, source_name: &str) -> ParseResult<Self> {
        Ok(Self {
            cursor: TokenCursor::new(input, source_name)?,
            function_depth: 0,
        })
    }

    // ========================================================================
    // Cursor delegation
    // ========================================================================

    fn peek(&self) -> &Token {
        self.cursor.peek()
    }

    fn current_span(&self) -> Span {
        self.cursor.current_span()
    }

    fn advance(&mut self) -> ParseResult<SpannedToken> {
        self.cursor.advance()
    }

    fn check(&self, token: &Token) -> bool {
        self.cursor.check(token)
    }

    fn match_token(&mut self, token: &Token) -> ParseResult<bool> {
        self.cursor.match_token(token)
    }

    fn consume(&mut self, expected: Token) -> ParseResult<SpannedToken> {
        self.cursor.consume(expected)
    }

    fn expect_ident(&mut self, what: &str) -> ParseResult<(Ident, Span)> {
        match self.peek() {
            Token::Ident(name) => {
                let name: Ident = Rc::from(name.as_str());
                let tok = self.advance()?;
                Ok((name, tok.span))
            }
            _ => Err(self.cursor.unexpected(what)),
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), Token::Newline | Token::Dedent | Token::Eof)
    }

    // ========================================================================
    // Program and statements
    // ========================================================================

    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let mut body = Vec::new();
        while !self.cursor.is_at_end() {
            if self.match_token(&Token::Newline)? {
                continue;
            }
            body.push(self.parse_statement()?);
        }
        let mut program = Program {
            source_name: self.cursor.source_name().clone(),
            body,
        };
        resolve::resolve_program(&mut program);
        Ok(program)
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.peek() {
            Token::Def => self.parse_def(),
            Token::Indent => Err(self.cursor.error_here("unexpected indent")),
            _ => {
                let stmt = self.parse_simple_statement()?;
                self.end_statement()?;
                Ok(stmt)
            }
        }
    }

    fn end_statement(&mut self) -> ParseResult<()> {
        match self.peek() {
            Token::Newline => {
                self.advance()?;
                Ok(())
            }
            Token::Dedent | Token::Eof => Ok(()),
            _ => Err(self.cursor.unexpected("end of statement")),
        }
    }

    fn parse_simple_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.current_span();
        match self.peek() {
            Token::Pass => {
                self.advance()?;
                Ok(Spanned::new(StmtKind::Pass, start))
            }
            Token::Return => {
                if self.function_depth == 0 {
                    return Err(self.cursor.error_here("'return' outside function"));
                }
                self.advance()?;
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                let span = value.as_ref().map_or(start.clone(), |v| start.merge(&v.span));
                Ok(Spanned::new(StmtKind::Return(value), span))
            }
            Token::Print => {
                self.advance()?;
                let mut values = Vec::new();
                let mut newline = true;
                while !self.at_statement_end() {
                    values.push(self.parse_expr()?);
                    if !self.match_token(&Token::Comma)? {
                        newline = true;
                        break;
                    }
                    newline = false;
                }
                let span = values.last().map_or(start.clone(), |v| start.merge(&v.span));
                Ok(Spanned::new(StmtKind::Print { values, newline }, span))
            }
            Token::Ident(_) => self.parse_name_statement(),
            _ => {
                let expr = self.parse_expr()?;
                let span = expr.span.clone();
                Ok(Spanned::new(StmtKind::Expr(expr), span))
            }
        }
    }

    /// `name = value`, `type name = value`, or an expression that starts
    /// with a name. The typed form needs two tokens of lookahead, so it is
    /// tried speculatively and rewound on mismatch.
    fn parse_name_statement(&mut self) -> ParseResult<Stmt> {
        let saved = self.cursor.snapshot();
        let first = self.advance()?;
        let first_name = match &first.token {
            Token::Ident(name) => Rc::<str>::from(name.as_str()),
            _ => return Err(self.cursor.error_at("expected a name", first.span)),
        };

        match self.peek() {
            Token::Assign => {
                self.advance()?;
                self.finish_assignment(first_name, None, first.span)
            }
            Token::Ident(second) => {
                let second: Ident = Rc::from(second.as_str());
                self.advance()?;
                if self.match_token(&Token::Assign)? {
                    self.finish_assignment(second, Some(first_name), first.span)
                } else {
                    self.cursor.restore(saved);
                    self.parse_expression_statement()
                }
            }
            _ => {
                self.cursor.push_back(first);
                self.parse_expression_statement()
            }
        }
    }

    fn finish_assignment(&mut self, target: Ident, type_hint: Option<Ident>, start: Span) -> ParseResult<Stmt> {
        let value = self.parse_expr()?;
        let span = start.merge(&value.span);
        Ok(Spanned::new(
            StmtKind::Assign {
                target: Name::new(target),
                type_hint,
                value,
            },
            span,
        ))
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.parse_expr()?;
        let span = expr.span.clone();
        Ok(Spanned::new(StmtKind::Expr(expr), span))
    }

    fn parse_def(&mut self) -> ParseResult<Stmt> {
        let start = self.consume(Token::Def)?.span;
        let (name, _) = self.expect_ident("function name")?;
        self.consume(Token::LParen)?;
        let params = self.parse_params()?;
        self.consume(Token::RParen)?;
        self.consume(Token::Colon)?;

        self.function_depth += 1;
        let body = self.parse_suite();
        self.function_depth -= 1;
        let body = body?;

        let span = body.last().map_or(start.clone(), |s| start.merge(&s.span));
        let def = FunctionDef {
            name: Name::new(name),
            params,
            body,
            captures: Vec::new(),
            span: span.clone(),
        };
        Ok(Spanned::new(StmtKind::Def(Rc::new(def)), span))
    }

    /// Either an indented block or a single statement on the header line
    fn parse_suite(&mut self) -> ParseResult<Vec<Stmt>> {
        if !self.match_token(&Token::Newline)? {
            let stmt = self.parse_simple_statement()?;
            self.end_statement()?;
            return Ok(vec![stmt]);
        }

        if !self.check(&Token::Indent) {
            return Err(self.cursor.error_here("expected indent"));
        }
        self.advance()?;

        let mut body = Vec::new();
        while !matches!(self.peek(), Token::Dedent | Token::Eof) {
            if self.match_token(&Token::Newline)? {
                continue;
            }
            body.push(self.parse_statement()?);
        }
        self.match_token(&Token::Dedent)?;
        Ok(body)
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        let mut params: Vec<Param> = Vec::new();
        let mut seen = HashSet::new();
        let mut seen_default = false;

        while !self.check(&Token::RParen) {
            let start = self.current_span();
            let kind = if self.match_token(&Token::StarStar)? {
                ParamKind::Map
            } else if self.match_token(&Token::Star)? {
                ParamKind::List
            } else {
                ParamKind::Plain
            };

            let (first, _) = self.expect_ident("parameter name")?;
            let (name, type_hint) = match self.peek() {
                Token::Ident(_) => {
                    let (name, _) = self.expect_ident("parameter name")?;
                    (name, Some(first))
                }
                _ => (first, None),
            };
            let span = start.merge(&self.current_span());

            if let Some(prev) = params.last() {
                if prev.kind == ParamKind::Map || (prev.kind == ParamKind::List && kind != ParamKind::Map) {
                    return Err(self.cursor.error_at("parameter follows catch-all parameter", span));
                }
            }
            if !seen.insert(name.clone()) {
                return Err(self.cursor.error_at(format!("duplicate parameter '{name}'"), span));
            }

            let default = if kind == ParamKind::Plain && self.match_token(&Token::Assign)? {
                seen_default = true;
                Some(self.parse_expr()?)
            } else {
                None
            };
            if kind == ParamKind::Plain && default.is_none() && seen_default {
                return Err(self.cursor.error_at("non-default parameter follows default parameter", span));
            }

            params.push(Param {
                name,
                type_hint,
                default,
                kind,
                span,
            });

            if !self.match_token(&Token::Comma)? {
                break;
            }
        }
        Ok(params)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> ParseResult<Expr> {
        let cond = self.parse_or()?;
        if !self.match_token(&Token::Question)? {
            return Ok(cond);
        }
        let then_branch = self.parse_ternary()?;
        self.consume(Token::Colon)?;
        let else_branch = self.parse_ternary()?;
        let span = cond.span.merge(&else_branch.span);
        Ok(Spanned::new(
            ExprKind::Ternary {
                cond: Rc::new(cond),
                then_branch: Rc::new(then_branch),
                else_branch: Rc::new(else_branch),
            },
            span,
        ))
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Token::PipePipe | Token::Or) {
            self.advance()?;
            let right = self.parse_and()?;
            left = logical(LogicOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_low_and()?;
        while self.match_token(&Token::AmpAmp)? {
            let right = self.parse_low_and()?;
            left = logical(LogicOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_low_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_low_not()?;
        while self.match_token(&Token::And)? {
            let right = self.parse_low_not()?;
            left = logical(LogicOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_low_not(&mut self) -> ParseResult<Expr> {
        if self.check(&Token::Not) {
            let start = self.advance()?.span;
            let operand = self.parse_low_not()?;
            return Ok(unary(UnaryOp::Not, operand, start));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let first = self.parse_bitwise()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Token::EqEq => CmpOp::Eq,
                Token::NotEq => CmpOp::Ne,
                Token::Lt => CmpOp::Lt,
                Token::Gt => CmpOp::Gt,
                Token::LtEq => CmpOp::Le,
                Token::GtEq => CmpOp::Ge,
                Token::EqEqEq => CmpOp::Is,
                Token::NotEqEq => CmpOp::IsNot,
                _ => break,
            };
            self.advance()?;
            rest.push((op, self.parse_bitwise()?));
        }
        if rest.is_empty() {
            return Ok(first);
        }
        let span = rest
            .last()
            .map_or(first.span.clone(), |(_, last)| first.span.merge(&last.span));
        Ok(Spanned::new(
            ExprKind::Compare {
                first: Rc::new(first),
                rest,
            },
            span,
        ))
    }

    fn parse_bitwise(&mut self) -> ParseResult<Expr> {
        self.parse_left_assoc(Self::parse_shift, |tok| match tok {
            Token::Amp => Some(BinOp::BitAnd),
            Token::Pipe => Some(BinOp::BitOr),
            Token::Caret => Some(BinOp::BitXor),
            _ => None,
        })
    }

    fn parse_shift(&mut self) -> ParseResult<Expr> {
        self.parse_left_assoc(Self::parse_additive, |tok| match tok {
            Token::Shl => Some(BinOp::Shl),
            Token::Shr => Some(BinOp::Shr),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        self.parse_left_assoc(Self::parse_term, |tok| match tok {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        self.parse_left_assoc(Self::parse_power, |tok| match tok {
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::SlashSlash => Some(BinOp::FloorDiv),
            Token::Percent => Some(BinOp::Mod),
            _ => None,
        })
    }

    fn parse_left_assoc(
        &mut self,
        next: fn(&mut Self) -> ParseResult<Expr>,
        op_for: fn(&Token) -> Option<BinOp>,
    ) -> ParseResult<Expr> {
        let mut left = next(self)?;
        while let Some(op) = op_for(self.peek()) {
            self.advance()?;
            let right = next(self)?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_unary()?;
        if self.match_token(&Token::StarStar)? {
            let exponent = self.parse_power()?;
            return Ok(binary(BinOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek() {
            Token::Bang => UnaryOp::Not,
            Token::Tilde => UnaryOp::BitNot,
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Pos,
            _ => return self.parse_postfix(),
        };
        let start = self.advance()?.span;
        let operand = self.parse_unary()?;
        Ok(unary(op, operand, start))
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::LParen => {
                    self.advance()?;
                    let args = self.parse_call_args()?;
                    let end = self.consume(Token::RParen)?.span;
                    let span = expr.span.merge(&end);
                    expr = Spanned::new(
                        ExprKind::Call {
                            callee: Rc::new(expr),
                            args,
                        },
                        span,
                    );
                }
                Token::Dot => {
                    self.advance()?;
                    let (name, end) = self.expect_ident("member name")?;
                    let span = expr.span.merge(&end);
                    expr = Spanned::new(
                        ExprKind::Member {
                            target: Rc::new(expr),
                            name,
                        },
                        span,
                    );
                }
                Token::LBracket => {
                    self.advance()?;
                    let index = self.parse_expr()?;
                    let end = self.consume(Token::RBracket)?.span;
                    let span = expr.span.merge(&end);
                    expr = Spanned::new(
                        ExprKind::Index {
                            target: Rc::new(expr),
                            index: Rc::new(index),
                        },
                        span,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_call_args(&mut self) -> ParseResult<Vec<Arg>> {
        let mut args = Vec::new();
        let mut seen_keyword = false;
        while !self.check(&Token::RParen) {
            let arg = self.parse_call_arg()?;
            match &arg {
                Arg::Keyword(..) => seen_keyword = true,
                Arg::Positional(expr) if seen_keyword => {
                    return Err(self
                        .cursor
                        .error_at("positional argument follows keyword argument", expr.span.clone()));
                }
                Arg::Positional(_) => {}
            }
            args.push(arg);
            if !self.match_token(&Token::Comma)? {
                break;
            }
        }
        Ok(args)
    }

    fn parse_call_arg(&mut self) -> ParseResult<Arg> {
        if let Token::Ident(name) = self.peek() {
            let name: Ident = Rc::from(name.as_str());
            let tok = self.advance()?;
            if self.match_token(&Token::Assign)? {
                return Ok(Arg::Keyword(name, self.parse_expr()?));
            }
            self.cursor.push_back(tok);
        }
        Ok(Arg::Positional(self.parse_expr()?))
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let span = self.current_span();
        let literal = match self.peek() {
            Token::Int(n) => Literal::Int(*n),
            Token::BigInt(n) => Literal::BigInt(Rc::new(n.clone())),
            Token::Single(n) => Literal::Single(*n),
            Token::Float(n) => Literal::Float(*n),
            Token::Decimal(n) => Literal::Decimal(*n),
            Token::Str(s) => Literal::Str(Rc::from(s.as_str())),
            Token::Char(c) => Literal::Char(*c),
            Token::Null => Literal::Null,
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Ident(name) => {
                let name = Name::new(name.as_str());
                self.advance()?;
                return Ok(Spanned::new(ExprKind::Name(name), span));
            }
            Token::LParen => return self.parse_parenthesized(),
            Token::Indent => return Err(self.cursor.error_here("unexpected indent")),
            _ => return Err(self.cursor.unexpected("expression")),
        };
        self.advance()?;
        Ok(Spanned::new(ExprKind::Literal(literal), span))
    }

    /// `(expr)`, `()` or a tuple `(a, b)`
    fn parse_parenthesized(&mut self) -> ParseResult<Expr> {
        let start = self.consume(Token::LParen)?.span;
        if self.check(&Token::RParen) {
            let end = self.advance()?.span;
            return Ok(Spanned::new(ExprKind::Tuple(Vec::new()), start.merge(&end)));
        }

        let first = self.parse_expr()?;
        if !self.check(&Token::Comma) {
            self.consume(Token::RParen)?;
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&Token::Comma)? {
            if self.check(&Token::RParen) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        let end = self.consume(Token::RParen)?.span;
        Ok(Spanned::new(ExprKind::Tuple(items), start.merge(&end)))
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(&right.span);
    Spanned::new(
        ExprKind::Binary {
            op,
            left: Rc::new(left),
            right: Rc::new(right),
        },
        span,
    )
}

fn logical(op: LogicOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.merge(&right.span);
    Spanned::new(
        ExprKind::Logical {
            op,
            left: Rc::new(left),
            right: Rc::new(right),
        },
        span,
    )
}

fn unary(op: UnaryOp, operand: Expr, start: Span) -> Expr {
    let span = start.merge(&operand.span);
    Spanned::new(
        ExprKind::Unary {
            op,
            operand: Rc::new(operand),
        },
        span,
    )
}
