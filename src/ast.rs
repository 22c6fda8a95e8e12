use std::rc::Rc;

use crate::diagnostics::SourceSpan;

pub type Name = Rc<str>;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
    BitAnd,
    BitOr,
    BitXor,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    In,
    InstanceOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
    BitNot,
    TypeOf,
    Void,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    Identifier(Name),
    This,
    /// `None` entries are elisions (`[1, , 3]`).
    Array(Vec<Option<Expr>>),
    Object(Vec<ObjectProperty>),
    Function(Rc<FunctionNode>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    /// `op` is `None` for plain `=`.
    Assign {
        op: Option<BinaryOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Sequence(Vec<Expr>),
    Member {
        object: Box<Expr>,
        property: Name,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone)]
pub struct ObjectProperty {
    pub key: Name,
    pub value: PropertyValue,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub enum PropertyValue {
    Init(Expr),
    Getter(Rc<FunctionNode>),
    Setter(Rc<FunctionNode>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Declaration,
    Expression,
    Arrow,
}

/// A block-scoped `let`/`const` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalDecl {
    pub name: Name,
    pub constant: bool,
}

/// Names hoisted to the top of a function body or script.
#[derive(Debug, Clone, Default)]
pub struct ScopeInfo {
    pub var_names: Vec<Name>,
    /// Function declarations anywhere in the body, outside nested functions.
    pub functions: Vec<Rc<FunctionNode>>,
    /// Top-level `let`/`const` of the body.
    pub lexical: Vec<LexicalDecl>,
}

#[derive(Debug)]
pub struct FunctionNode {
    pub name: Option<Name>,
    pub kind: FunctionKind,
    pub params: Vec<Name>,
    pub body: Vec<Stmt>,
    pub strict: bool,
    pub scope: ScopeInfo,
    /// Whether the body (or a nested arrow) mentions `arguments`.
    pub uses_arguments: bool,
    pub source: Rc<str>,
    pub span: SourceSpan,
}

impl FunctionNode {
    pub fn is_arrow(&self) -> bool {
        self.kind == FunctionKind::Arrow
    }
}

#[derive(Debug, Clone)]
pub struct VarDeclarator {
    pub name: Name,
    pub init: Option<Expr>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub body: Vec<Stmt>,
    pub lexical: Vec<LexicalDecl>,
}

#[derive(Debug, Clone)]
pub enum ForInit {
    Var(Vec<VarDeclarator>),
    Lexical {
        constant: bool,
        declarations: Vec<VarDeclarator>,
    },
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum ForInTarget {
    Var(Name),
    Lexical { constant: bool, name: Name },
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: Name,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` for `default:`.
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Var(Vec<VarDeclarator>),
    Lexical {
        constant: bool,
        declarations: Vec<VarDeclarator>,
    },
    FunctionDeclaration(Rc<FunctionNode>),
    Expr(Expr),
    Block(Block),
    Empty,
    Debugger,
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForIn {
        target: ForInTarget,
        object: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Break(Option<Name>),
    Continue(Option<Name>),
    Throw(Expr),
    Try {
        block: Block,
        handler: Option<CatchClause>,
        finalizer: Option<Block>,
    },
    Labeled {
        label: Name,
        body: Box<Stmt>,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
        lexical: Vec<LexicalDecl>,
    },
    With {
        object: Expr,
        body: Box<Stmt>,
    },
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: SourceSpan,
}

#[derive(Debug)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub strict: bool,
    pub scope: ScopeInfo,
}
