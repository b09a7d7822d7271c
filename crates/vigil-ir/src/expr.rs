//! Model-level expression language.
//!
//! Expressions reference variables, defines and parameters by dotted path
//! relative to the instance that declares them (`state`, `G1.is_on`,
//! `SC.B1.is_broken`). The Composite Builder resolves the paths and
//! compiles them into [`crate::compiled::CExpr`].

use std::fmt;

use crate::domain::Literal;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "snake_case"))]
pub enum BinOp {
    And,
    Or,
    Implies,
    Iff,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Implies => "->",
            BinOp::Iff => "<->",
            BinOp::Eq => "=",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
        }
    }

    /// Operators that take two booleans.
    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or | BinOp::Implies | BinOp::Iff)
    }

    /// Operators that order two integers.
    pub fn is_ordering(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub)
    }
}

/// One `guard : result;` branch of a `case` expression.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct CaseArm {
    pub guard: Expr,
    pub result: Expr,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "snake_case"))]
pub enum Expr {
    Lit(Literal),
    /// Current value of a variable, define or parameter.
    Ref(String),
    /// Next-state value; only legal inside transition constraints.
    Next(String),
    Not(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Number of true arguments.
    Count(Vec<Expr>),
    /// First arm whose guard holds selects the result.
    Case(Vec<CaseArm>),
    /// Nondeterministic choice `{a, b, ...}`; only legal in `init`/`next` rules.
    Choice(Vec<Expr>),
}

impl Expr {
    pub fn path(path: impl Into<String>) -> Self {
        Expr::Ref(path.into())
    }

    pub fn next(path: impl Into<String>) -> Self {
        Expr::Next(path.into())
    }

    pub fn sym(symbol: impl Into<String>) -> Self {
        Expr::Lit(Literal::Symbol(symbol.into()))
    }

    pub fn bool(value: bool) -> Self {
        Expr::Lit(Literal::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Expr::Lit(Literal::Int(value))
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn and(self, rhs: Expr) -> Self {
        Expr::binary(BinOp::And, self, rhs)
    }

    pub fn or(self, rhs: Expr) -> Self {
        Expr::binary(BinOp::Or, self, rhs)
    }

    pub fn implies(self, rhs: Expr) -> Self {
        Expr::binary(BinOp::Implies, self, rhs)
    }

    pub fn equals(self, rhs: Expr) -> Self {
        Expr::binary(BinOp::Eq, self, rhs)
    }

    pub fn differs(self, rhs: Expr) -> Self {
        Expr::binary(BinOp::Ne, self, rhs)
    }

    pub fn greater_than(self, rhs: Expr) -> Self {
        Expr::binary(BinOp::Gt, self, rhs)
    }

    pub fn at_least(self, rhs: Expr) -> Self {
        Expr::binary(BinOp::Ge, self, rhs)
    }

    pub fn plus(self, rhs: Expr) -> Self {
        Expr::binary(BinOp::Add, self, rhs)
    }

    /// Conjunction of all items; `TRUE` when empty.
    pub fn all(items: impl IntoIterator<Item = Expr>) -> Self {
        items
            .into_iter()
            .reduce(Expr::and)
            .unwrap_or(Expr::bool(true))
    }

    pub fn count(items: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Count(items.into_iter().collect())
    }

    pub fn case(arms: impl IntoIterator<Item = (Expr, Expr)>) -> Self {
        Expr::Case(
            arms.into_iter()
                .map(|(guard, result)| CaseArm { guard, result })
                .collect(),
        )
    }

    pub fn choice(items: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Choice(items.into_iter().collect())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Lit(lit) => write!(f, "{lit}"),
            Expr::Ref(path) => write!(f, "{path}"),
            Expr::Next(path) => write!(f, "next({path})"),
            Expr::Not(inner) => write!(f, "!({inner})"),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::Count(items) => {
                write!(f, "count(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
            Expr::Case(arms) => {
                write!(f, "case ")?;
                for arm in arms {
                    write!(f, "{} : {}; ", arm.guard, arm.result)?;
                }
                write!(f, "esac")
            }
            Expr::Choice(items) => {
                write!(f, "{{")?;
                write_list(f, items)?;
                write!(f, "}}")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
