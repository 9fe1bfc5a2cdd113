//! Uniform AST produced by the parser. Every node is a pure data carrier
//! that retains the token that introduced it, for diagnostics.

use totalscript_lexer::Token;

/// A parsed type annotation: `NAME[<G1, G2, ...>][| U1 | U2 ...][?]`.
///
/// When `union` is non-empty it contains every alternative *including* the
/// lead name (the lead name moves into the union list alongside the rest).
/// `generics` holds the raw, unparsed generic parameter names (e.g. the
/// `T` in `array<T>`).
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub name: String,
    pub generics: Vec<String>,
    pub union: Vec<String>,
    pub optional: bool,
}

impl TypeExpr {
    pub fn simple(name: impl Into<String>) -> Self {
        TypeExpr { name: name.into(), generics: Vec::new(), union: Vec::new(), optional: false }
    }

    /// Render the way type-mismatch error messages quote it, e.g.
    /// `integer | string` or `array<integer>`.
    pub fn display(&self) -> String {
        if !self.union.is_empty() {
            return self.union.join(" | ");
        }
        if !self.generics.is_empty() {
            return format!("{}<{}>", self.name, self.generics.join(", "));
        }
        self.name.clone()
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_expr: Option<TypeExpr>,
}

#[derive(Debug, Clone)]
pub struct FunctionExpr {
    pub token: Token,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct ModelField {
    pub name: String,
    pub type_expr: TypeExpr,
}

#[derive(Debug, Clone)]
pub struct ModelMethod {
    pub name: String,
    pub function: FunctionExpr,
}

#[derive(Debug, Clone)]
pub struct ModelExpr {
    pub token: Token,
    pub fields: Vec<ModelField>,
    pub methods: Vec<ModelMethod>,
    pub constructors: Vec<FunctionExpr>,
}

#[derive(Debug, Clone)]
pub struct EnumMember {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub struct EnumExpr {
    pub token: Token,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident { token: Token, name: String },
    IntLit { token: Token, value: i64 },
    FloatLit { token: Token, value: f64 },
    StrLit { token: Token, value: String },
    BoolLit { token: Token, value: bool },
    NullLit { token: Token },
    This { token: Token },
    ArrayLit { token: Token, elems: Vec<Expr> },
    MapLit { token: Token, pairs: Vec<(Expr, Expr)> },
    Prefix { token: Token, op: String, right: Box<Expr> },
    Infix { token: Token, op: String, left: Box<Expr>, right: Box<Expr> },
    If { token: Token, cond: Box<Expr>, then_branch: Block, else_branch: Option<Box<IfElse>> },
    Function(FunctionExpr),
    Call { token: Token, callee: Box<Expr>, args: Vec<Expr> },
    Index { token: Token, left: Box<Expr>, index: Box<Expr> },
    Member { token: Token, object: Box<Expr>, name: String },
    Range { token: Token, start: Option<Box<Expr>>, end: Option<Box<Expr>>, inclusive: bool },
    Model(ModelExpr),
    Enum(EnumExpr),
    TypeExprLit { token: Token, type_expr: TypeExpr },
}

/// The `else` arm of an `if` expression: either another `if` (`else if`)
/// or a plain block.
#[derive(Debug, Clone)]
pub enum IfElse {
    If(Expr),
    Block(Block),
}

impl Expr {
    pub fn token(&self) -> &Token {
        match self {
            Expr::Ident { token, .. }
            | Expr::IntLit { token, .. }
            | Expr::FloatLit { token, .. }
            | Expr::StrLit { token, .. }
            | Expr::BoolLit { token, .. }
            | Expr::NullLit { token }
            | Expr::This { token }
            | Expr::ArrayLit { token, .. }
            | Expr::MapLit { token, .. }
            | Expr::Prefix { token, .. }
            | Expr::Infix { token, .. }
            | Expr::If { token, .. }
            | Expr::Call { token, .. }
            | Expr::Index { token, .. }
            | Expr::Member { token, .. }
            | Expr::Range { token, .. }
            | Expr::TypeExprLit { token, .. } => token,
            Expr::Function(f) => &f.token,
            Expr::Model(m) => &m.token,
            Expr::Enum(e) => &e.token,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForIn {
    pub token: Token,
    pub value_name: String,
    pub index_name: Option<String>,
    pub iterable: Expr,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct ForC {
    pub token: Token,
    pub init: Box<Stmt>,
    pub cond: Expr,
    pub post: Box<Stmt>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub candidates: Vec<Expr>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Var { token: Token, name: String, type_expr: Option<TypeExpr>, value: Option<Expr> },
    Const { token: Token, name: String, type_expr: Option<TypeExpr>, value: Expr },
    Return { token: Token, value: Option<Expr> },
    Break { token: Token },
    Continue { token: Token },
    While { token: Token, cond: Expr, body: Block },
    ForIn(ForIn),
    ForC(ForC),
    Switch { token: Token, value: Expr, cases: Vec<SwitchCase>, default: Option<Block> },
    Block(Block),
    ExprStmt { token: Token, expr: Expr },
    Import { token: Token, path: String, alias: Option<String>, derived_name: String },
}

/// A whole parsed program: an ordered sequence of top-level statements.
#[derive(Debug, Clone)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}
