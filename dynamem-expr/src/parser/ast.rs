//! Abstract Syntax Tree types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// Arithmetic operators (update `SET` values only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Plus,
    Minus,
}

/// One segment of an attribute path.
///
/// `Attr` holds either a bare name or a `#alias` that the environment
/// substitutes at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    Attr(String),
    Index(usize),
}

/// A dotted/indexed attribute path bottoming in an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    pub segments: Vec<PathSegment>,
}

impl Path {
    pub fn attr(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Attr(name.into())],
        }
    }

    /// The first segment's attribute text; paths always start with one.
    pub fn root(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Attr(name)) => Some(name),
            _ => None,
        }
    }

    /// True for a single bare-attribute path.
    pub fn is_top_level(&self) -> bool {
        self.segments.len() == 1 && matches!(self.segments[0], PathSegment::Attr(_))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Attr(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// A condition-dialect expression (also the value side of update `SET`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Path(Path),
    /// `:value` placeholder
    Placeholder(String),
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Between {
        operand: Box<Expr>,
        lower: Box<Expr>,
        upper: Box<Expr>,
    },
    In {
        operand: Box<Expr>,
        candidates: Vec<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Path(path) => write!(f, "{path}"),
            Expr::Placeholder(name) => write!(f, "{name}"),
            Expr::Compare { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Expr::Arith { op, lhs, rhs } => {
                let sym = match op {
                    ArithOp::Plus => "+",
                    ArithOp::Minus => "-",
                };
                write!(f, "{lhs} {sym} {rhs}")
            }
            Expr::Between {
                operand,
                lower,
                upper,
            } => write!(f, "{operand} BETWEEN {lower} AND {upper}"),
            Expr::In {
                operand,
                candidates,
            } => {
                write!(f, "{operand} IN (")?;
                for (i, c) in candidates.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, ")")
            }
            Expr::And(lhs, rhs) => write!(f, "({lhs} AND {rhs})"),
            Expr::Or(lhs, rhs) => write!(f, "({lhs} OR {rhs})"),
            Expr::Not(inner) => write!(f, "NOT {inner}"),
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// One action of an update expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UpdateAction {
    Set { path: Path, value: Expr },
    Add { path: Path, value: Expr },
    Delete { path: Path, value: Expr },
    Remove { path: Path },
}

impl UpdateAction {
    /// The path this action writes through.
    pub fn path(&self) -> &Path {
        match self {
            UpdateAction::Set { path, .. }
            | UpdateAction::Add { path, .. }
            | UpdateAction::Delete { path, .. }
            | UpdateAction::Remove { path } => path,
        }
    }
}

/// A parsed update program: the actions of every clause, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateExpr {
    pub actions: Vec<UpdateAction>,
}

/// Parse error with location information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    /// True when the construct is grammatically valid but not implemented.
    pub unsupported: bool,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// All errors accumulated over one parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseErrors {
    pub errors: Vec<ParseError>,
}

impl ParseErrors {
    /// True when any accumulated error marks an unsupported construct
    /// rather than a syntax error.
    pub fn is_unsupported(&self) -> bool {
        self.errors.iter().any(|e| e.unsupported)
    }
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}
