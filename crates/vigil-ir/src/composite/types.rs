use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexSet;

use crate::compiled::SymbolId;
use crate::domain::Domain;

/// Static type of a compiled expression.
///
/// Integers carry the interval of values they can take and symbols the set
/// of symbols they can take, so domain conformance of rule results and
/// parameter bindings is decided at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    Bool,
    Int { lo: i64, hi: i64 },
    Sym(BTreeSet<SymbolId>),
}

impl Ty {
    pub fn int(value: i64) -> Self {
        Ty::Int {
            lo: value,
            hi: value,
        }
    }

    /// Type of a variable or parameter ranging over `domain`.
    pub(crate) fn of_domain(domain: &Domain, symbols: &mut IndexSet<String>) -> Self {
        match domain {
            Domain::Boolean => Ty::Bool,
            Domain::Range { min, max } => Ty::Int { lo: *min, hi: *max },
            Domain::Enum(names) => Ty::Sym(
                names
                    .iter()
                    .map(|name| symbols.insert_full(name.clone()).0 as SymbolId)
                    .collect(),
            ),
        }
    }

    /// Smallest type covering both operands, if they are of the same kind.
    pub fn union(&self, other: &Ty) -> Option<Ty> {
        match (self, other) {
            (Ty::Bool, Ty::Bool) => Some(Ty::Bool),
            (Ty::Int { lo: a, hi: b }, Ty::Int { lo: c, hi: d }) => Some(Ty::Int {
                lo: *a.min(c),
                hi: *b.max(d),
            }),
            (Ty::Sym(a), Ty::Sym(b)) => Some(Ty::Sym(a.union(b).copied().collect())),
            _ => None,
        }
    }

    /// Whether `=`/`!=` between values of the two types is meaningful.
    pub fn comparable(&self, other: &Ty) -> bool {
        matches!(
            (self, other),
            (Ty::Bool, Ty::Bool) | (Ty::Int { .. }, Ty::Int { .. }) | (Ty::Sym(_), Ty::Sym(_))
        )
    }

    /// Whether every value of this type belongs to `domain`.
    pub(crate) fn conforms(&self, domain: &Domain, symbols: &IndexSet<String>) -> bool {
        match (self, domain) {
            (Ty::Bool, Domain::Boolean) => true,
            (Ty::Int { lo, hi }, Domain::Range { min, max }) => lo >= min && hi <= max,
            (Ty::Sym(set), Domain::Enum(names)) => set.iter().all(|id| {
                symbols
                    .get_index(*id as usize)
                    .is_some_and(|name| names.contains(name))
            }),
            _ => false,
        }
    }

    pub(crate) fn describe(&self, symbols: &IndexSet<String>) -> String {
        match self {
            Ty::Sym(set) => {
                let names: Vec<&str> = set
                    .iter()
                    .filter_map(|id| symbols.get_index(*id as usize).map(String::as_str))
                    .collect();
                format!("symbol in {{{}}}", names.join(", "))
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Bool => write!(f, "boolean"),
            Ty::Int { lo, hi } if lo == hi => write!(f, "integer {lo}"),
            Ty::Int { lo, hi } => write!(f, "integer in {lo}..{hi}"),
            Ty::Sym(set) => write!(f, "symbol (one of {} values)", set.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_union_covers_both_intervals() {
        let u = Ty::int(3).union(&Ty::Int { lo: -1, hi: 1 });
        assert_eq!(u, Some(Ty::Int { lo: -1, hi: 3 }));
        assert_eq!(Ty::Bool.union(&Ty::int(0)), None);
    }

    #[test]
    fn symbol_conformance_checks_membership() {
        let mut symbols = IndexSet::new();
        let domain = Domain::enumeration(["on", "off"]);
        let ty = Ty::of_domain(&domain, &mut symbols);
        assert!(ty.conforms(&domain, &symbols));

        let other = Domain::enumeration(["on"]);
        assert!(!ty.conforms(&other, &symbols));
        assert!(Ty::Int { lo: 0, hi: 2 }.conforms(&Domain::Range { min: 0, max: 3 }, &symbols));
        assert!(!Ty::Int { lo: 0, hi: 4 }.conforms(&Domain::Range { min: 0, max: 3 }, &symbols));
    }

    #[test]
    fn comparison_needs_matching_kinds() {
        let a = Ty::Sym([0].into_iter().collect());
        let b = Ty::Sym([1].into_iter().collect());
        assert!(a.comparable(&b));
        assert!(!a.comparable(&Ty::Bool));
        assert!(!Ty::int(1).comparable(&Ty::Bool));
    }
}
