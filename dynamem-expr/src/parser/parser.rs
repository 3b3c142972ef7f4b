//! Parser implementation
//!
//! Pratt-style parser over the token stream with two entry points: the
//! condition dialect (boolean expressions) and the update dialect
//! (`SET`/`ADD`/`REMOVE`/`DELETE` action clauses). Errors are accumulated
//! rather than aborting at the first; grammatically valid constructs the
//! evaluator does not implement are flagged as unsupported instead of
//! syntax errors.

use super::ast::*;
use crate::lexer::*;

/// Binding powers, low to high. `BETWEEN` sits between equality and the
/// ordering comparisons; its bounds are parsed at comparison strength so
/// the separating `AND` is not swallowed.
const BP_OR: u8 = 1;
const BP_AND: u8 = 2;
const BP_NOT: u8 = 3;
const BP_EQUALITY: u8 = 4;
const BP_BETWEEN: u8 = 5;
const BP_COMPARISON: u8 = 6;
const BP_ADDITIVE: u8 = 7;
const BP_IN: u8 = 9;

/// Hard bound on expression nesting; adversarial input errors out
/// instead of overflowing the stack.
const MAX_DEPTH: usize = 100;

/// Which dialect the parser is currently reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Condition,
    Update,
}

/// Parse a condition/filter/key-condition expression.
pub fn parse_condition(source: &str) -> Result<Expr, ParseErrors> {
    let tokens = Lexer::new(source).tokenize();
    let mut parser = Parser::new(tokens, Dialect::Condition);
    let expr = parser.parse_condition_root();
    parser.finish(expr)
}

/// Parse an update expression into its action program.
pub fn parse_update(source: &str) -> Result<UpdateExpr, ParseErrors> {
    let tokens = Lexer::new(source).tokenize();
    let mut parser = Parser::new(tokens, Dialect::Update);
    let update = parser.parse_update_root();
    parser.finish(update)
}

/// Parse a projection expression: one or more comma-separated paths.
pub fn parse_projection(source: &str) -> Result<Vec<Path>, ParseErrors> {
    let tokens = Lexer::new(source).tokenize();
    let mut parser = Parser::new(tokens, Dialect::Condition);
    let paths = parser.parse_projection_root();
    parser.finish(paths)
}

/// Parser over a token vector.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    dialect: Dialect,
    errors: Vec<ParseError>,
}

impl Parser {
    fn new(tokens: Vec<Token>, dialect: Dialect) -> Self {
        Self {
            tokens,
            pos: 0,
            dialect,
            errors: Vec::new(),
        }
    }

    /// Resolve the accumulated errors against the parse result.
    fn finish<T>(self, parsed: Option<T>) -> Result<T, ParseErrors> {
        if self.errors.is_empty() {
            match parsed {
                Some(value) => Ok(value),
                // An empty result with no recorded error is a parser bug;
                // surface it as a plain syntax error.
                None => Err(ParseErrors {
                    errors: vec![ParseError {
                        message: "empty expression".to_string(),
                        line: 1,
                        column: 1,
                        unsupported: false,
                    }],
                }),
            }
        } else {
            Err(ParseErrors {
                errors: self.errors,
            })
        }
    }

    // ========================================================================
    // CONDITION DIALECT
    // ========================================================================

    fn parse_condition_root(&mut self) -> Option<Expr> {
        let expr = match self.parse_expr(0, 0) {
            Ok(expr) => Some(expr),
            Err(err) => {
                self.errors.push(err);
                self.recover_to_connective();
                None
            }
        };

        // Keep reading after a recovery point to accumulate further
        // diagnostics from the rest of the input.
        while !self.is_at_end() {
            match &self.current().kind {
                TokenKind::And | TokenKind::Or => {
                    self.advance();
                    if let Err(err) = self.parse_expr(0, 0) {
                        self.errors.push(err);
                        self.recover_to_connective();
                    }
                }
                _ => {
                    let err = self.error(&format!(
                        "Unexpected token after expression: {:?}",
                        self.current().kind
                    ));
                    self.errors.push(err);
                    self.recover_to_connective();
                }
            }
        }

        expr
    }

    /// Pratt loop: parse a prefix, then fold infix operators while their
    /// binding power stays at or above `min_bp`.
    fn parse_expr(&mut self, min_bp: u8, depth: usize) -> Result<Expr, ParseError> {
        if depth > MAX_DEPTH {
            return Err(self.error("Expression nesting too deep"));
        }

        let mut lhs = self.parse_prefix(depth)?;

        loop {
            let bp = match &self.current().kind {
                TokenKind::Or => BP_OR,
                TokenKind::And => BP_AND,
                TokenKind::Eq | TokenKind::Ne => BP_EQUALITY,
                TokenKind::Between => BP_BETWEEN,
                TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => BP_COMPARISON,
                TokenKind::Plus | TokenKind::Minus => BP_ADDITIVE,
                TokenKind::In => BP_IN,
                _ => break,
            };
            if bp < min_bp {
                break;
            }

            match self.current().kind.clone() {
                TokenKind::Or => {
                    self.advance();
                    let rhs = self.parse_expr(BP_OR + 1, depth + 1)?;
                    lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
                }
                TokenKind::And => {
                    self.advance();
                    let rhs = self.parse_expr(BP_AND + 1, depth + 1)?;
                    lhs = Expr::And(Box::new(lhs), Box::new(rhs));
                }
                TokenKind::Eq => {
                    self.advance();
                    let rhs = self.parse_expr(BP_EQUALITY + 1, depth + 1)?;
                    lhs = compare(CmpOp::Eq, lhs, rhs);
                }
                TokenKind::Ne => {
                    self.advance();
                    let rhs = self.parse_expr(BP_EQUALITY + 1, depth + 1)?;
                    lhs = compare(CmpOp::Ne, lhs, rhs);
                }
                TokenKind::Between => {
                    self.advance();
                    let lower = self.parse_expr(BP_COMPARISON, depth + 1)?;
                    self.expect(TokenKind::And)?;
                    let upper = self.parse_expr(BP_COMPARISON, depth + 1)?;
                    lhs = Expr::Between {
                        operand: Box::new(lhs),
                        lower: Box::new(lower),
                        upper: Box::new(upper),
                    };
                }
                TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => {
                    let op = match self.current().kind {
                        TokenKind::Lt => CmpOp::Lt,
                        TokenKind::Le => CmpOp::Le,
                        TokenKind::Gt => CmpOp::Gt,
                        _ => CmpOp::Ge,
                    };
                    self.advance();
                    let rhs = self.parse_expr(BP_COMPARISON + 1, depth + 1)?;
                    lhs = compare(op, lhs, rhs);
                }
                TokenKind::Plus | TokenKind::Minus => {
                    let op = if self.current().kind == TokenKind::Plus {
                        ArithOp::Plus
                    } else {
                        ArithOp::Minus
                    };
                    if self.dialect == Dialect::Condition {
                        let err =
                            self.error_unsupported("Arithmetic is not supported in conditions");
                        self.errors.push(err);
                    }
                    self.advance();
                    let rhs = self.parse_expr(BP_ADDITIVE + 1, depth + 1)?;
                    lhs = Expr::Arith {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    };
                }
                TokenKind::In => {
                    self.advance();
                    self.expect(TokenKind::LParen)?;
                    let mut candidates = Vec::new();
                    loop {
                        candidates.push(self.parse_operand(depth + 1)?);
                        if self.check(&TokenKind::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    lhs = Expr::In {
                        operand: Box::new(lhs),
                        candidates,
                    };
                }
                _ => break,
            }
        }

        Ok(lhs)
    }

    /// Parse a prefix position: `NOT`, a parenthesised group, a function
    /// call, a path, or a value placeholder.
    fn parse_prefix(&mut self, depth: usize) -> Result<Expr, ParseError> {
        match self.current().kind.clone() {
            TokenKind::Not => {
                self.advance();
                let operand = self.parse_expr(BP_NOT, depth + 1)?;
                Ok(Expr::Not(Box::new(operand)))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr(0, depth + 1)?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(_) | TokenKind::NamePlaceholder(_) => self.parse_operand(depth),
            TokenKind::ValuePlaceholder(name) => {
                self.advance();
                Ok(Expr::Placeholder(name))
            }
            TokenKind::Number(text) => Err(self.error(&format!(
                "Number literal {text} is only allowed as a list index; use a value placeholder"
            ))),
            TokenKind::Illegal(message) => {
                self.advance();
                Err(self.error(&message))
            }
            TokenKind::Eof => Err(self.error("Unexpected end of expression")),
            other => Err(self.error(&format!("Unexpected token: {other:?}"))),
        }
    }

    /// Parse an operand: a function call, an attribute path, or a value
    /// placeholder. No boolean connectives, no arithmetic.
    fn parse_operand(&mut self, depth: usize) -> Result<Expr, ParseError> {
        if depth > MAX_DEPTH {
            return Err(self.error("Expression nesting too deep"));
        }
        match self.current().kind.clone() {
            TokenKind::Ident(name) => {
                if self.peek_kind(1) == Some(&TokenKind::LParen) {
                    self.advance(); // name
                    self.advance(); // (
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_operand(depth + 1)?);
                            if self.check(&TokenKind::Comma) {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    Ok(Expr::Call { name, args })
                } else {
                    self.parse_path().map(Expr::Path)
                }
            }
            TokenKind::NamePlaceholder(_) => self.parse_path().map(Expr::Path),
            TokenKind::ValuePlaceholder(name) => {
                self.advance();
                Ok(Expr::Placeholder(name))
            }
            TokenKind::Illegal(message) => {
                self.advance();
                Err(self.error(&message))
            }
            TokenKind::Eof => Err(self.error("Unexpected end of expression")),
            other => Err(self.error(&format!("Expected a path or placeholder, found {other:?}"))),
        }
    }

    /// Parse a dotted/indexed attribute path.
    fn parse_path(&mut self) -> Result<Path, ParseError> {
        let mut segments = vec![PathSegment::Attr(self.expect_attr_name()?)];

        loop {
            match &self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    segments.push(PathSegment::Attr(self.expect_attr_name()?));
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = match self.current().kind.clone() {
                        TokenKind::Number(text) => {
                            self.advance();
                            text.parse::<usize>()
                                .map_err(|_| self.error(&format!("List index out of range: {text}")))?
                        }
                        other => {
                            return Err(self.error(&format!(
                                "Expected a non-negative list index, found {other:?}"
                            )))
                        }
                    };
                    self.expect(TokenKind::RBracket)?;
                    segments.push(PathSegment::Index(index));
                }
                _ => break,
            }
        }

        Ok(Path { segments })
    }

    /// A path segment name: a bare identifier or a `#` placeholder.
    /// Keywords are not valid attribute names; callers alias them.
    fn expect_attr_name(&mut self) -> Result<String, ParseError> {
        match self.current().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            TokenKind::NamePlaceholder(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(&format!("Expected an attribute name, found {other:?}"))),
        }
    }

    // ========================================================================
    // UPDATE DIALECT
    // ========================================================================

    fn parse_update_root(&mut self) -> Option<UpdateExpr> {
        let mut actions = Vec::new();

        if self.is_at_end() {
            let err = self.error("Empty update expression");
            self.errors.push(err);
            return None;
        }

        while !self.is_at_end() {
            match self.current().kind.clone() {
                TokenKind::Set => {
                    self.advance();
                    self.parse_clause(&mut actions, Parser::parse_set_action);
                }
                TokenKind::Add => {
                    self.advance();
                    self.parse_clause(&mut actions, Parser::parse_add_action);
                }
                TokenKind::Remove => {
                    self.advance();
                    self.parse_clause(&mut actions, Parser::parse_remove_action);
                }
                TokenKind::Delete => {
                    self.advance();
                    self.parse_clause(&mut actions, Parser::parse_delete_action);
                }
                other => {
                    let err =
                        self.error(&format!("Expected SET, ADD, REMOVE, or DELETE, found {other:?}"));
                    self.errors.push(err);
                    self.recover_to_clause();
                }
            }
        }

        Some(UpdateExpr { actions })
    }

    /// Parse one clause: comma-separated actions until the next clause
    /// keyword or end of input, recovering inside the clause on error.
    fn parse_clause(
        &mut self,
        actions: &mut Vec<UpdateAction>,
        parse_action: fn(&mut Parser) -> Result<UpdateAction, ParseError>,
    ) {
        loop {
            match parse_action(self) {
                Ok(action) => actions.push(action),
                Err(err) => {
                    self.errors.push(err);
                    self.recover_in_clause();
                }
            }
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// `path = value-expression`
    fn parse_set_action(&mut self) -> Result<UpdateAction, ParseError> {
        let path = self.parse_path()?;
        self.expect(TokenKind::Eq)?;
        let value = self.parse_set_value()?;
        Ok(UpdateAction::Set { path, value })
    }

    /// The right-hand side of a `SET`: an operand, optionally one `+` or
    /// `-` of another operand. Longer chains parse but are flagged as
    /// unsupported.
    fn parse_set_value(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_operand(0)?;

        let op = match self.current().kind {
            TokenKind::Plus => ArithOp::Plus,
            TokenKind::Minus => ArithOp::Minus,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_operand(0)?;

        let mut value = Expr::Arith {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };

        while matches!(self.current().kind, TokenKind::Plus | TokenKind::Minus) {
            let err = self.error_unsupported("Chained arithmetic in SET values");
            self.errors.push(err);
            let op = if self.current().kind == TokenKind::Plus {
                ArithOp::Plus
            } else {
                ArithOp::Minus
            };
            self.advance();
            let rhs = self.parse_operand(0)?;
            value = Expr::Arith {
                op,
                lhs: Box::new(value),
                rhs: Box::new(rhs),
            };
        }

        Ok(value)
    }

    /// `path value`
    fn parse_add_action(&mut self) -> Result<UpdateAction, ParseError> {
        let path = self.parse_path()?;
        let value = self.parse_operand(0)?;
        Ok(UpdateAction::Add { path, value })
    }

    /// `path value`
    fn parse_delete_action(&mut self) -> Result<UpdateAction, ParseError> {
        let path = self.parse_path()?;
        let value = self.parse_operand(0)?;
        Ok(UpdateAction::Delete { path, value })
    }

    /// `path`
    fn parse_remove_action(&mut self) -> Result<UpdateAction, ParseError> {
        let path = self.parse_path()?;
        Ok(UpdateAction::Remove { path })
    }

    // ========================================================================
    // PROJECTIONS
    // ========================================================================

    fn parse_projection_root(&mut self) -> Option<Vec<Path>> {
        let mut paths = Vec::new();
        loop {
            match self.parse_path() {
                Ok(path) => paths.push(path),
                Err(err) => {
                    self.errors.push(err);
                    self.recover_in_clause();
                }
            }
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        if !self.is_at_end() {
            let err = self.error(&format!(
                "Unexpected token in projection: {:?}",
                self.current().kind
            ));
            self.errors.push(err);
        }
        Some(paths)
    }

    // ========================================================================
    // RECOVERY & HELPERS
    // ========================================================================

    /// Skip ahead to the next `AND`/`OR` or end of input.
    fn recover_to_connective(&mut self) {
        while !self.is_at_end()
            && !matches!(self.current().kind, TokenKind::And | TokenKind::Or)
        {
            self.advance();
        }
    }

    /// Skip ahead to the next comma, clause keyword, or end of input.
    fn recover_in_clause(&mut self) {
        while !self.is_at_end()
            && !matches!(
                self.current().kind,
                TokenKind::Comma
                    | TokenKind::Set
                    | TokenKind::Add
                    | TokenKind::Remove
                    | TokenKind::Delete
            )
        {
            self.advance();
        }
    }

    /// Skip ahead to the next clause keyword or end of input.
    fn recover_to_clause(&mut self) {
        while !self.is_at_end()
            && !matches!(
                self.current().kind,
                TokenKind::Set | TokenKind::Add | TokenKind::Remove | TokenKind::Delete
            )
        {
            self.advance();
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!(
                "Expected {:?}, found {:?}",
                kind,
                self.current().kind
            )))
        }
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn error(&self, message: &str) -> ParseError {
        let span = self.current().span;
        ParseError {
            message: message.to_string(),
            line: span.line,
            column: span.column,
            unsupported: false,
        }
    }

    fn error_unsupported(&self, message: &str) -> ParseError {
        let span = self.current().span;
        ParseError {
            message: message.to_string(),
            line: span.line,
            column: span.column,
            unsupported: true,
        }
    }
}

fn compare(op: CmpOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Compare {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
