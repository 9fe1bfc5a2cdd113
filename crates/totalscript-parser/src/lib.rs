//! Pratt parser: statement dispatch by leading keyword, expression parsing
//! by prefix/infix handler tables keyed on token kind and precedence.

pub mod ast;
pub mod error;
mod precedence;

use ast::*;
use error::ParseError;
use precedence::{precedence_of, Precedence};
use totalscript_lexer::{Lexer, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

/// Parse a complete source string. Always returns a `Program` (possibly
/// with incomplete statements) alongside every parse error encountered;
/// callers must check `errors` before evaluating.
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    let tokens = Lexer::tokenize(source);
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    (program, parser.errors)
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0, errors: Vec::new() }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    // ── Token stream helpers ─────────────────────────────────────────

    fn cur(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn cur_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.tokens.get(self.pos + offset).map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek_kind_at(1)
    }

    fn at_end(&self) -> bool {
        self.cur_kind() == TokenKind::Eof
    }

    /// Consume and return the current token.
    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn error(&mut self, message: impl Into<String>) {
        let tok = self.cur();
        self.errors.push(ParseError::new(tok.line, tok.column, message.into()));
    }

    fn error_at(&mut self, tok: &Token, message: impl Into<String>) {
        self.errors.push(ParseError::new(tok.line, tok.column, message.into()));
    }

    /// Require the current token to be `kind`, consuming it. Records an
    /// "expected next token" error and returns `None` otherwise.
    fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.cur_kind() == kind {
            Some(self.advance())
        } else {
            self.error(format!("expected next token to be {:?}, got {:?}", kind, self.cur_kind()));
            None
        }
    }

    fn skip_semicolon(&mut self) {
        if self.cur_kind() == TokenKind::Semicolon {
            self.advance();
        }
    }

    // ── Program / statement dispatch ────────────────────────────────

    pub fn parse_program(&mut self) -> Program {
        let mut stmts = Vec::new();
        while !self.at_end() {
            match self.parse_statement() {
                Some(stmt) => stmts.push(stmt),
                None => self.synchronize(),
            }
            self.skip_semicolon();
        }
        Program { stmts }
    }

    /// Skip tokens until a plausible statement boundary, so one error does
    /// not suppress every later error in the same file.
    fn synchronize(&mut self) {
        if self.at_end() {
            return;
        }
        self.advance();
        while !self.at_end() {
            if self.tokens[self.pos - 1].kind == TokenKind::Semicolon {
                return;
            }
            match self.cur_kind() {
                TokenKind::Var
                | TokenKind::Const
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Switch
                | TokenKind::Return
                | TokenKind::Import
                | TokenKind::RBrace => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.cur_kind() {
            TokenKind::Var => self.parse_var_stmt(),
            TokenKind::Const => self.parse_const_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Break => {
                let token = self.advance();
                Some(Stmt::Break { token })
            }
            TokenKind::Continue => {
                let token = self.advance();
                Some(Stmt::Continue { token })
            }
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::Import => self.parse_import_stmt(),
            TokenKind::LBrace => Some(Stmt::Block(self.parse_block()?)),
            _ => self.parse_expr_stmt(),
        }
    }

    fn parse_var_stmt(&mut self) -> Option<Stmt> {
        let token = self.advance(); // 'var'
        let name_tok = self.expect(TokenKind::Ident)?;
        let name = name_tok.literal;
        let type_expr = if self.cur_kind() == TokenKind::Colon {
            self.advance();
            Some(self.parse_type_expr()?)
        } else {
            None
        };
        let value = if self.cur_kind() == TokenKind::Assign {
            self.advance();
            Some(self.parse_expression(Precedence::Lowest)?)
        } else {
            None
        };
        Some(Stmt::Var { token, name, type_expr, value })
    }

    fn parse_const_stmt(&mut self) -> Option<Stmt> {
        let token = self.advance(); // 'const'
        let name_tok = self.expect(TokenKind::Ident)?;
        let name = name_tok.literal;
        let type_expr = if self.cur_kind() == TokenKind::Colon {
            self.advance();
            Some(self.parse_type_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expression(Precedence::Lowest)?;
        Some(Stmt::Const { token, name, type_expr, value })
    }

    fn parse_return_stmt(&mut self) -> Option<Stmt> {
        let token = self.advance(); // 'return'
        let value = if self.at_statement_end() {
            None
        } else {
            Some(self.parse_expression(Precedence::Lowest)?)
        };
        Some(Stmt::Return { token, value })
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.cur_kind(), TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof)
    }

    fn parse_while_stmt(&mut self) -> Option<Stmt> {
        let token = self.advance(); // 'while'
        let cond = self.parse_expression(Precedence::Lowest)?;
        let body = self.parse_block()?;
        Some(Stmt::While { token, cond, body })
    }

    fn parse_for_stmt(&mut self) -> Option<Stmt> {
        let token = self.advance(); // 'for'

        let is_for_in = self.cur_kind() == TokenKind::Ident
            && (self.peek_kind() == TokenKind::In
                || (self.peek_kind() == TokenKind::Comma
                    && self.peek_kind_at(2) == TokenKind::Ident
                    && self.peek_kind_at(3) == TokenKind::In));

        if is_for_in {
            let value_name = self.expect(TokenKind::Ident)?.literal;
            let index_name = if self.cur_kind() == TokenKind::Comma {
                self.advance();
                Some(self.expect(TokenKind::Ident)?.literal)
            } else {
                None
            };
            self.expect(TokenKind::In)?;
            let iterable = self.parse_expression(Precedence::Lowest)?;
            let body = self.parse_block()?;
            return Some(Stmt::ForIn(ForIn { token, value_name, index_name, iterable, body }));
        }

        let init = Box::new(self.parse_statement()?);
        self.skip_semicolon();
        let cond = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::Semicolon)?;
        let post = Box::new(self.parse_statement()?);
        let body = self.parse_block()?;
        Some(Stmt::ForC(ForC { token, init, cond, post, body }))
    }

    fn parse_switch_stmt(&mut self) -> Option<Stmt> {
        let token = self.advance(); // 'switch'
        let value = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::LBrace)?;
        let mut cases = Vec::new();
        let mut default = None;
        while self.cur_kind() != TokenKind::RBrace && !self.at_end() {
            if self.cur_kind() == TokenKind::Case {
                self.advance();
                let mut candidates = vec![self.parse_expression(Precedence::Lowest)?];
                while self.cur_kind() == TokenKind::Comma {
                    self.advance();
                    candidates.push(self.parse_expression(Precedence::Lowest)?);
                }
                let body = self.parse_block()?;
                cases.push(SwitchCase { candidates, body });
            } else if self.cur_kind() == TokenKind::Default {
                self.advance();
                default = Some(self.parse_block()?);
            } else {
                self.error(format!("expected case or default, got {:?}", self.cur_kind()));
                return None;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Some(Stmt::Switch { token, value, cases, default })
    }

    fn parse_import_stmt(&mut self) -> Option<Stmt> {
        let token = self.advance(); // 'import'
        let path_tok = self.expect(TokenKind::String)?;
        let path = path_tok.literal;
        let alias = if self.cur_kind() == TokenKind::As {
            self.advance();
            Some(self.expect(TokenKind::Ident)?.literal)
        } else {
            None
        };
        let derived_name = derive_module_name(&path, alias.as_deref());
        Some(Stmt::Import { token, path, alias, derived_name })
    }

    fn parse_expr_stmt(&mut self) -> Option<Stmt> {
        let token = self.cur().clone();
        let expr = self.parse_expression(Precedence::Lowest)?;
        Some(Stmt::ExprStmt { token, expr })
    }

    fn parse_block(&mut self) -> Option<Block> {
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        while self.cur_kind() != TokenKind::RBrace && !self.at_end() {
            match self.parse_statement() {
                Some(stmt) => stmts.push(stmt),
                None => self.synchronize(),
            }
            self.skip_semicolon();
        }
        self.expect(TokenKind::RBrace)?;
        Some(Block { stmts })
    }

    // ── Type expressions ─────────────────────────────────────────────

    fn parse_type_expr(&mut self) -> Option<TypeExpr> {
        let name_tok = self.expect(TokenKind::Ident)?;
        let name = name_tok.literal;

        let mut generics = Vec::new();
        if self.cur_kind() == TokenKind::Lt {
            self.advance();
            loop {
                generics.push(self.parse_generic_param()?);
                if self.cur_kind() == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(TokenKind::Gt)?;
        }

        let mut union = Vec::new();
        if self.cur_kind() == TokenKind::Pipe {
            union.push(name.clone());
            while self.cur_kind() == TokenKind::Pipe {
                self.advance();
                union.push(self.expect(TokenKind::Ident)?.literal);
            }
        }

        let optional = if self.cur_kind() == TokenKind::Question {
            self.advance();
            true
        } else {
            false
        };

        Some(TypeExpr { name, generics, union, optional })
    }

    /// A generic parameter is captured as raw text: a bare name, or a
    /// `|`-joined union of names (e.g. `integer | string`), reconstructed
    /// for the type validator to re-split later.
    fn parse_generic_param(&mut self) -> Option<String> {
        let mut parts = vec![self.expect(TokenKind::Ident)?.literal];
        while self.cur_kind() == TokenKind::Pipe {
            self.advance();
            parts.push(self.expect(TokenKind::Ident)?.literal);
        }
        Some(parts.join(" | "))
    }

    // ── Expressions: Pratt parsing ────────────────────────────────────

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        let mut left = self.parse_prefix()?;
        while precedence < precedence_of(self.cur_kind()) {
            left = self.parse_infix(left)?;
        }
        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expr> {
        match self.cur_kind() {
            TokenKind::Ident => {
                let token = self.advance();
                let name = token.literal.clone();
                Some(Expr::Ident { token, name })
            }
            TokenKind::Integer => {
                let token = self.advance();
                match token.literal.parse::<i64>() {
                    Ok(value) => Some(Expr::IntLit { token, value }),
                    Err(_) => {
                        let lit = token.literal.clone();
                        self.error_at(&token, format!("invalid integer literal {lit:?}"));
                        None
                    }
                }
            }
            TokenKind::Float => {
                let token = self.advance();
                match token.literal.parse::<f64>() {
                    Ok(value) => Some(Expr::FloatLit { token, value }),
                    Err(_) => {
                        let lit = token.literal.clone();
                        self.error_at(&token, format!("invalid float literal {lit:?}"));
                        None
                    }
                }
            }
            TokenKind::String => {
                let token = self.advance();
                let value = token.literal.clone();
                Some(Expr::StrLit { token, value })
            }
            TokenKind::True => {
                let token = self.advance();
                Some(Expr::BoolLit { token, value: true })
            }
            TokenKind::False => {
                let token = self.advance();
                Some(Expr::BoolLit { token, value: false })
            }
            TokenKind::Null => {
                let token = self.advance();
                Some(Expr::NullLit { token })
            }
            TokenKind::This => {
                let token = self.advance();
                Some(Expr::This { token })
            }
            TokenKind::Bang | TokenKind::Minus => self.parse_prefix_expr(),
            TokenKind::LParen => self.parse_grouped_expr(),
            TokenKind::LBracket => self.parse_array_lit(),
            TokenKind::LBrace => self.parse_map_lit(),
            TokenKind::If => self.parse_if_expr(),
            TokenKind::Function => self.parse_function_expr().map(Expr::Function),
            TokenKind::Model => self.parse_model_expr().map(Expr::Model),
            TokenKind::Enum => self.parse_enum_expr().map(Expr::Enum),
            TokenKind::DotDot | TokenKind::DotDotEq => self.parse_range_prefix(),
            other => {
                self.error(format!("no prefix parse function for {other:?}"));
                None
            }
        }
    }

    fn parse_prefix_expr(&mut self) -> Option<Expr> {
        let token = self.advance();
        let op = token.literal.clone();
        let right = Box::new(self.parse_expression(Precedence::Prefix)?);
        Some(Expr::Prefix { token, op, right })
    }

    fn parse_grouped_expr(&mut self) -> Option<Expr> {
        self.advance(); // '('
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::RParen)?;
        Some(expr)
    }

    fn parse_array_lit(&mut self) -> Option<Expr> {
        let token = self.advance(); // '['
        let mut elems = Vec::new();
        while self.cur_kind() != TokenKind::RBracket && !self.at_end() {
            elems.push(self.parse_expression(Precedence::Lowest)?);
            if self.cur_kind() == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Some(Expr::ArrayLit { token, elems })
    }

    fn parse_map_lit(&mut self) -> Option<Expr> {
        let token = self.advance(); // '{'
        let mut pairs = Vec::new();
        while self.cur_kind() != TokenKind::RBrace && !self.at_end() {
            let key = if self.cur_kind() == TokenKind::Ident {
                let tok = self.advance();
                let name = tok.literal.clone();
                Expr::StrLit { token: tok, value: name }
            } else {
                self.parse_expression(Precedence::Lowest)?
            };
            self.expect(TokenKind::Colon)?;
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));
            if self.cur_kind() == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Some(Expr::MapLit { token, pairs })
    }

    fn parse_if_expr(&mut self) -> Option<Expr> {
        let token = self.advance(); // 'if'
        let cond = Box::new(self.parse_expression(Precedence::Lowest)?);
        let then_branch = self.parse_block()?;
        let else_branch = if self.cur_kind() == TokenKind::Else {
            self.advance();
            if self.cur_kind() == TokenKind::If {
                Some(Box::new(IfElse::If(self.parse_if_expr()?)))
            } else {
                Some(Box::new(IfElse::Block(self.parse_block()?)))
            }
        } else {
            None
        };
        Some(Expr::If { token, cond, then_branch, else_branch })
    }

    fn parse_params(&mut self) -> Option<Vec<Param>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while self.cur_kind() != TokenKind::RParen && !self.at_end() {
            let name = self.expect(TokenKind::Ident)?.literal;
            let type_expr = if self.cur_kind() == TokenKind::Colon {
                self.advance();
                Some(self.parse_type_expr()?)
            } else {
                None
            };
            params.push(Param { name, type_expr });
            if self.cur_kind() == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Some(params)
    }

    fn parse_function_expr(&mut self) -> Option<FunctionExpr> {
        let token = self.advance(); // 'function'
        let params = self.parse_params()?;
        let return_type = if self.cur_kind() == TokenKind::Colon {
            self.advance();
            Some(self.parse_type_expr()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Some(FunctionExpr { token, params, return_type, body })
    }

    fn parse_model_expr(&mut self) -> Option<ModelExpr> {
        let token = self.advance(); // 'model'
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        let mut constructors = Vec::new();
        while self.cur_kind() != TokenKind::RBrace && !self.at_end() {
            if self.cur_kind() == TokenKind::Constructor {
                self.advance();
                self.expect(TokenKind::Assign)?;
                if self.cur_kind() != TokenKind::Function {
                    self.error(format!("expected function, got {:?}", self.cur_kind()));
                    return None;
                }
                let function = self.parse_function_expr()?;
                constructors.push(function);
            } else {
                let name = self.expect(TokenKind::Ident)?.literal;
                match self.cur_kind() {
                    TokenKind::Colon => {
                        self.advance();
                        let type_expr = self.parse_type_expr()?;
                        fields.push(ModelField { name, type_expr });
                    }
                    TokenKind::Assign => {
                        self.advance();
                        if self.cur_kind() != TokenKind::Function {
                            self.error(format!("expected function, got {:?}", self.cur_kind()));
                            return None;
                        }
                        let function = self.parse_function_expr()?;
                        methods.push(ModelMethod { name, function });
                    }
                    other => {
                        self.error(format!("expected ':' or '=' in model body, got {other:?}"));
                        return None;
                    }
                }
            }
            self.skip_semicolon();
        }
        self.expect(TokenKind::RBrace)?;
        Some(ModelExpr { token, fields, methods, constructors })
    }

    fn parse_enum_expr(&mut self) -> Option<EnumExpr> {
        let token = self.advance(); // 'enum'
        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();
        while self.cur_kind() != TokenKind::RBrace && !self.at_end() {
            let name = self.expect(TokenKind::Ident)?.literal;
            self.expect(TokenKind::Assign)?;
            let value = self.parse_expression(Precedence::Lowest)?;
            members.push(EnumMember { name, value });
            self.skip_semicolon();
            if self.cur_kind() == TokenKind::Comma {
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace)?;
        Some(EnumExpr { token, members })
    }

    /// A range with no left operand, e.g. `..5` or `..=5` used as an
    /// open-start slice index.
    fn parse_range_prefix(&mut self) -> Option<Expr> {
        let token = self.advance();
        let inclusive = token.kind == TokenKind::DotDotEq;
        let end = if self.at_range_end() {
            None
        } else {
            Some(Box::new(self.parse_expression(Precedence::Range)?))
        };
        Some(Expr::Range { token, start: None, end, inclusive })
    }

    fn at_range_end(&self) -> bool {
        matches!(
            self.cur_kind(),
            TokenKind::RBracket
                | TokenKind::RParen
                | TokenKind::RBrace
                | TokenKind::Comma
                | TokenKind::Semicolon
                | TokenKind::Colon
                | TokenKind::Eof
        )
    }

    fn parse_infix(&mut self, left: Expr) -> Option<Expr> {
        match self.cur_kind() {
            TokenKind::Assign
            | TokenKind::PlusAssign
            | TokenKind::MinusAssign
            | TokenKind::StarAssign
            | TokenKind::SlashAssign
            | TokenKind::PercentAssign => self.parse_assign_expr(left),
            TokenKind::Or
            | TokenKind::And
            | TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEq
            | TokenKind::GtEq
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::SlashSlash
            | TokenKind::Percent
            | TokenKind::StarStar => self.parse_binary_expr(left),
            TokenKind::Is => self.parse_is_expr(left),
            TokenKind::DotDot | TokenKind::DotDotEq => self.parse_range_infix(left),
            TokenKind::LParen => self.parse_call_expr(left),
            TokenKind::LBracket => self.parse_index_expr(left),
            TokenKind::Dot => self.parse_member_expr(left),
            other => {
                self.error(format!("no infix parse function for {other:?}"));
                None
            }
        }
    }

    fn parse_assign_expr(&mut self, left: Expr) -> Option<Expr> {
        let token = self.advance();
        let op = token.literal.clone();
        let right = Box::new(self.parse_expression(Precedence::Lowest)?);
        Some(Expr::Infix { token, op, left: Box::new(left), right })
    }

    fn parse_binary_expr(&mut self, left: Expr) -> Option<Expr> {
        let token = self.advance();
        let op = token.literal.clone();
        let prec = precedence_of(token.kind);
        let right = Box::new(self.parse_expression(prec)?);
        Some(Expr::Infix { token, op, left: Box::new(left), right })
    }

    fn parse_is_expr(&mut self, left: Expr) -> Option<Expr> {
        let token = self.advance(); // 'is'
        let right = Box::new(self.parse_expression(Precedence::Is)?);
        Some(Expr::Infix { token, op: "is".to_string(), left: Box::new(left), right })
    }

    fn parse_range_infix(&mut self, left: Expr) -> Option<Expr> {
        let token = self.advance();
        let inclusive = token.kind == TokenKind::DotDotEq;
        let end = if self.at_range_end() {
            None
        } else {
            Some(Box::new(self.parse_expression(Precedence::Range)?))
        };
        Some(Expr::Range { token, start: Some(Box::new(left)), end, inclusive })
    }

    fn parse_call_expr(&mut self, callee: Expr) -> Option<Expr> {
        let token = self.advance(); // '('
        let mut args = Vec::new();
        while self.cur_kind() != TokenKind::RParen && !self.at_end() {
            args.push(self.parse_expression(Precedence::Lowest)?);
            if self.cur_kind() == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Some(Expr::Call { token, callee: Box::new(callee), args })
    }

    fn parse_index_expr(&mut self, left: Expr) -> Option<Expr> {
        let token = self.advance(); // '['
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::RBracket)?;
        Some(Expr::Index { token, left: Box::new(left), index: Box::new(index) })
    }

    fn parse_member_expr(&mut self, object: Expr) -> Option<Expr> {
        let token = self.advance(); // '.'
        let name = self.expect(TokenKind::Ident)?.literal;
        Some(Expr::Member { token, object: Box::new(object), name })
    }
}

fn derive_module_name(path: &str, alias: Option<&str>) -> String {
    if let Some(alias) = alias {
        return alias.to_string();
    }
    if path.starts_with("./") || path.starts_with("../") {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        return file_name.strip_suffix(".tsl").unwrap_or(file_name).to_string();
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        let (program, errors) = parse(src);
        assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
        program
    }

    #[test]
    fn parses_var_with_type_and_value() {
        let program = parse_ok("var x: integer = 5");
        assert_eq!(program.stmts.len(), 1);
        match &program.stmts[0] {
            Stmt::Var { name, type_expr, value, .. } => {
                assert_eq!(name, "x");
                assert_eq!(type_expr.as_ref().unwrap().name, "integer");
                assert!(value.is_some());
            }
            other => panic!("expected Var, got {other:?}"),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        let program = parse_ok("a = b = 1");
        match &program.stmts[0] {
            Stmt::ExprStmt { expr: Expr::Infix { op, right, .. }, .. } => {
                assert_eq!(op, "=");
                matches!(**right, Expr::Infix { .. });
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn binary_operators_are_left_associative() {
        let program = parse_ok("1 + 2 + 3");
        match &program.stmts[0] {
            Stmt::ExprStmt { expr: Expr::Infix { left, op, .. }, .. } => {
                assert_eq!(op, "+");
                match &**left {
                    Expr::Infix { op, .. } => assert_eq!(op, "+"),
                    other => panic!("expected nested infix, got {other:?}"),
                }
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_array_slice_with_inclusive_range() {
        let program = parse_ok("a[1..=3]");
        match &program.stmts[0] {
            Stmt::ExprStmt { expr: Expr::Index { index, .. }, .. } => match &**index {
                Expr::Range { inclusive, start, end, .. } => {
                    assert!(*inclusive);
                    assert!(start.is_some());
                    assert!(end.is_some());
                }
                other => panic!("expected Range, got {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_open_ended_range() {
        let program = parse_ok("a[2..]");
        match &program.stmts[0] {
            Stmt::ExprStmt { expr: Expr::Index { index, .. }, .. } => match &**index {
                Expr::Range { end, .. } => assert!(end.is_none()),
                other => panic!("expected Range, got {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_for_in_with_index() {
        let program = parse_ok("for v, i in arr { v }");
        match &program.stmts[0] {
            Stmt::ForIn(for_in) => {
                assert_eq!(for_in.value_name, "v");
                assert_eq!(for_in.index_name.as_deref(), Some("i"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_c_style_for() {
        let program = parse_ok("for var i = 0; i < 3; i = i + 1 { i }");
        matches!(program.stmts[0], Stmt::ForC(_));
    }

    #[test]
    fn parses_model_with_field_method_constructor() {
        let program = parse_ok(
            "const Point = model { x: float; y: float; constructor = function(x, y) { this } distance = function() { this.x } }",
        );
        match &program.stmts[0] {
            Stmt::Const { value: Expr::Model(m), .. } => {
                assert_eq!(m.fields.len(), 2);
                assert_eq!(m.constructors.len(), 1);
                assert_eq!(m.methods.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_enum_literal() {
        let program = parse_ok("const Status = enum { OK = 200; NotFound = 404 }");
        match &program.stmts[0] {
            Stmt::Const { value: Expr::Enum(e), .. } => assert_eq!(e.members.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_union_and_generic_type() {
        let program = parse_ok("var a: array<integer | string>");
        match &program.stmts[0] {
            Stmt::Var { type_expr: Some(t), .. } => {
                assert_eq!(t.name, "array");
                assert_eq!(t.generics, vec!["integer | string".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_optional_union_type() {
        let program = parse_ok("var a: integer | string?");
        match &program.stmts[0] {
            Stmt::Var { type_expr: Some(t), .. } => {
                assert!(t.optional);
                assert_eq!(t.union, vec!["integer".to_string(), "string".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_import_with_alias() {
        let program = parse_ok("import \"./utils\" as u");
        match &program.stmts[0] {
            Stmt::Import { path, alias, derived_name, .. } => {
                assert_eq!(path, "./utils");
                assert_eq!(alias.as_deref(), Some("u"));
                assert_eq!(derived_name, "u");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn import_without_alias_derives_name_from_path() {
        let program = parse_ok("import \"./lib/helpers\"");
        match &program.stmts[0] {
            Stmt::Import { derived_name, .. } => assert_eq!(derived_name, "helpers"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn stdlib_import_keeps_bare_name() {
        let program = parse_ok("import \"math\"");
        match &program.stmts[0] {
            Stmt::Import { derived_name, .. } => assert_eq!(derived_name, "math"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_prefix_handler_records_error() {
        let (_, errors) = parse(") x");
        assert!(!errors.is_empty());
        assert!(errors[0].message.contains("no prefix parse function"));
    }

    #[test]
    fn switch_statement_parses_cases_and_default() {
        let program = parse_ok("switch x { case 1, 2 { 1 } default { 0 } }");
        match &program.stmts[0] {
            Stmt::Switch { cases, default, .. } => {
                assert_eq!(cases.len(), 1);
                assert_eq!(cases[0].candidates.len(), 2);
                assert!(default.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
