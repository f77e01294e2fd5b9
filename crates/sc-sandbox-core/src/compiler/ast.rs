//! Syntax tree for contract sources.

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub functions: Vec<FunctionDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assign {
        target: String,
        value: Expr,
    },
    If {
        /// `if` followed by every `elif`, in order
        branches: Vec<(Expr, Vec<Stmt>)>,
        orelse: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Pass,
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Str(String),
    Bool(bool),
    None,
    Name {
        name: String,
        line: usize,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Call by bare name. Dotted callees keep only their last segment.
    Call {
        name: String,
        args: Vec<Expr>,
        line: usize,
    },
}

impl Stmt {
    /// Visit every assignment target in this statement and nested blocks.
    pub fn assigned_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match &self.kind {
            StmtKind::Assign { target, .. } => out.push(target),
            StmtKind::If { branches, orelse } => {
                for (_, body) in branches {
                    body.iter().for_each(|s| s.assigned_names(out));
                }
                orelse.iter().for_each(|s| s.assigned_names(out));
            }
            StmtKind::While { body, .. } => body.iter().for_each(|s| s.assigned_names(out)),
            StmtKind::Return(_) | StmtKind::Pass | StmtKind::Expr(_) => {}
        }
    }
}
