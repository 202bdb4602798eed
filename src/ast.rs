//! Syntax tree for slate programs

use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;
use rust_decimal::Decimal;

pub type Ident = Rc<str>;

/// Byte range of a node or token in its source text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Human-readable source position (1-indexed line and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    /// Counted in characters, not bytes
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps byte offsets back to line/column positions.
///
/// Line starts are computed once, so `position` is a binary search.
#[derive(Debug, Clone)]
pub struct SourceMap {
    source: String,
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source: source.to_string(),
            line_starts,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_start = self.line_starts[line_idx];
        let column = self
            .source
            .get(line_start..offset)
            .map(|text| text.chars().count())
            .unwrap_or(0)
            + 1;
        Position {
            line: line_idx + 1,
            column,
        }
    }

    /// Text of a 1-indexed line without its line terminator
    pub fn line(&self, line_num: usize) -> Option<&str> {
        let start = *self.line_starts.get(line_num.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line_num)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches('\r'))
    }

    pub fn span_text(&self, span: &Span) -> &str {
        let end = span.end.min(self.source.len());
        self.source.get(span.start.min(end)..end).unwrap_or("")
    }
}

/// A node together with the span it was parsed from
#[derive(Debug, Clone)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

// ============================================================================
// Names
// ============================================================================

/// Where a name lives, fixed by the resolver after parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeKind {
    /// Not assigned anywhere in the program; looked up in the root frame
    #[default]
    Free,
    /// Parameter, assignment target or nested `def` of the current function
    Local,
    /// Assigned at module level
    Global,
    /// Local to an enclosing function
    ClosedOver,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub ident: Ident,
    pub scope: ScopeKind,
}

impl Name {
    pub fn new(ident: impl Into<Ident>) -> Self {
        Self {
            ident: ident.into(),
            scope: ScopeKind::Free,
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }

    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Mul | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Is,
    IsNot,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
            CmpOp::Is => "===",
            CmpOp::IsNot => "!==",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!` and `not`
    Not,
    BitNot,
    Neg,
    Pos,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
        }
    }
}

/// Short-circuit operators; `&&`/`and` and `||`/`or` share a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

// ============================================================================
// Expressions
// ============================================================================

pub type Expr = Spanned<ExprKind>;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    BigInt(Rc<BigInt>),
    Single(f32),
    Float(f64),
    Decimal(Decimal),
    Char(char),
    Str(Rc<str>),
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),

    Name(Name),

    Unary {
        op: UnaryOp,
        operand: Rc<Expr>,
    },

    Binary {
        op: BinOp,
        left: Rc<Expr>,
        right: Rc<Expr>,
    },

    /// `a < b <= c`: every operand is evaluated at most once
    Compare {
        first: Rc<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },

    Logical {
        op: LogicOp,
        left: Rc<Expr>,
        right: Rc<Expr>,
    },

    /// `cond ? then : otherwise`
    Ternary {
        cond: Rc<Expr>,
        then_branch: Rc<Expr>,
        else_branch: Rc<Expr>,
    },

    Call {
        callee: Rc<Expr>,
        args: Vec<Arg>,
    },

    // Parsed but rejected when run
    Member {
        target: Rc<Expr>,
        name: Ident,
    },
    Index {
        target: Rc<Expr>,
        index: Rc<Expr>,
    },
    Tuple(Vec<Expr>),
}

#[derive(Debug, Clone)]
pub enum Arg {
    Positional(Expr),
    Keyword(Ident, Expr),
}

// ============================================================================
// Statements
// ============================================================================

pub type Stmt = Spanned<StmtKind>;

#[derive(Debug, Clone)]
pub enum StmtKind {
    Def(Rc<FunctionDef>),
    Return(Option<Expr>),
    /// `newline` is false when the item list ends with a comma
    Print {
        values: Vec<Expr>,
        newline: bool,
    },
    Assign {
        target: Name,
        type_hint: Option<Ident>,
        value: Expr,
    },
    Expr(Expr),
    Pass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Plain,
    /// `*rest`
    List,
    /// `**options`
    Map,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub type_hint: Option<Ident>,
    pub default: Option<Expr>,
    pub kind: ParamKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: Name,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    /// Enclosing-function names this body (or a nested body) reads, in first-use order
    pub captures: Vec<Ident>,
    pub span: Span,
}

impl FunctionDef {
    pub fn has_list_param(&self) -> bool {
        self.params.iter().any(|p| p.kind == ParamKind::List)
    }

    pub fn has_map_param(&self) -> bool {
        self.params.iter().any(|p| p.kind == ParamKind::Map)
    }

    pub fn param_names(&self) -> Vec<Ident> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    /// Default expressions in declaration order (the tail of the plain region)
    pub fn defaults(&self) -> impl Iterator<Item = &Expr> {
        self.params.iter().filter_map(|p| p.default.as_ref())
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    pub source_name: Ident,
    pub body: Vec<Stmt>,
}
