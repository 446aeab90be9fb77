//! The parsed surface syntax tree, one function definition at a time.
//! Deliberately small: the statement/expression subset spec §6 names and
//! nothing else.

#[derive(Debug, Clone)]
pub struct Module {
    pub funcdefs: Vec<FuncDef>,
}

#[derive(Debug, Clone)]
pub struct FuncDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    /// Decorator-shaped marker identifiers written one-per-line directly
    /// above `def`; only `green` is meaningful.
    pub decorators: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Pass,
    Return(Expr),
    Assign(String, Expr),
    If { cond: Expr, body: Vec<Stmt>, orelse: Vec<Stmt> },
    For { target: String, iter: Expr, body: Vec<Stmt> },
    ExprStmt(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Mul,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Gt,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Int(i64),
    Str(String),
    Name(String),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Tuple(Vec<Expr>),
    /// Call-by-name: the callee is always a bare identifier.
    Call(String, Vec<Expr>),
    Print(Vec<Expr>),
    Unroll(Box<Expr>),
}
