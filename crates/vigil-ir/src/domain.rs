use std::fmt;

/// Finite value domain of a state variable or formal parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "snake_case"))]
pub enum Domain {
    /// `{FALSE, TRUE}`.
    Boolean,
    /// Enumerated symbol set, e.g. `{on, off}`.
    Enum(Vec<String>),
    /// Inclusive bounded integer range `min..max`.
    Range { min: i64, max: i64 },
}

impl Domain {
    /// Convenience constructor for enumerated domains.
    pub fn enumeration<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Domain::Enum(symbols.into_iter().map(Into::into).collect())
    }

    /// Number of values in the domain.
    pub fn size(&self) -> usize {
        match self {
            Domain::Boolean => 2,
            Domain::Enum(symbols) => symbols.len(),
            Domain::Range { min, max } => {
                if max < min {
                    0
                } else {
                    (max.abs_diff(*min) as usize).saturating_add(1)
                }
            }
        }
    }

    /// Literal stored at dense index `idx`, if in range.
    pub fn literal_at(&self, idx: usize) -> Option<Literal> {
        match self {
            Domain::Boolean => match idx {
                0 => Some(Literal::Bool(false)),
                1 => Some(Literal::Bool(true)),
                _ => None,
            },
            Domain::Enum(symbols) => symbols.get(idx).cloned().map(Literal::Symbol),
            Domain::Range { min, max } => {
                let value = min.checked_add(i64::try_from(idx).ok()?)?;
                (value <= *max).then_some(Literal::Int(value))
            }
        }
    }

    /// Dense index of `literal`, if it belongs to the domain.
    pub fn index_of(&self, literal: &Literal) -> Option<usize> {
        match (self, literal) {
            (Domain::Boolean, Literal::Bool(b)) => Some(usize::from(*b)),
            (Domain::Enum(symbols), Literal::Symbol(s)) => symbols.iter().position(|x| x == s),
            (Domain::Range { min, max }, Literal::Int(v)) if v >= min && v <= max => {
                usize::try_from(v - min).ok()
            }
            _ => None,
        }
    }

    /// All literals in index order.
    pub fn literals(&self) -> impl Iterator<Item = Literal> + '_ {
        (0..self.size()).filter_map(move |idx| self.literal_at(idx))
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Boolean => write!(f, "boolean"),
            Domain::Enum(symbols) => write!(f, "{{{}}}", symbols.join(", ")),
            Domain::Range { min, max } => write!(f, "{min}..{max}"),
        }
    }
}

/// A constant appearing in a model description or a decoded state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(untagged))]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Symbol(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(true) => write!(f, "TRUE"),
            Literal::Bool(false) => write!(f, "FALSE"),
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Symbol(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Symbol(value.to_string())
    }
}
