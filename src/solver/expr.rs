//! Backend-neutral linear expressions.
//!
//! Components describe their constraints and objectives with [`LinearExpr`]
//! values; each solver backend maps the expression onto its own variable and
//! constraint primitives at solve time. A pure constant is a valid
//! expression, which lets data-driven ports (fatal flows) travel through the
//! same channel as decision variables.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Opaque handle to a decision variable owned by a solver backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// An affine expression `sum(coeff * var) + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn variable(var: VarId) -> Self {
        Self {
            terms: vec![(var, 1.0)],
            constant: 0.0,
        }
    }

    pub fn term(var: VarId, coeff: f64) -> Self {
        Self {
            terms: vec![(var, coeff)],
            constant: 0.0,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn constant_part(&self) -> f64 {
        self.constant
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn add_term(&mut self, var: VarId, coeff: f64) {
        self.terms.push((var, coeff));
    }

    /// Sums a collection of expressions, the way a solver module would sum
    /// a mixed list of variables and constants.
    pub fn sum<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = LinearExpr>,
    {
        let mut acc = LinearExpr::default();
        for e in exprs {
            acc += e;
        }
        acc
    }

    /// Merges duplicate variable terms and drops zero coefficients.
    /// Backends call this before handing terms to the underlying solver,
    /// some of which reject repeated columns in one row.
    pub fn coalesced(&self) -> Self {
        let mut terms = self.terms.clone();
        terms.sort_by_key(|(v, _)| *v);
        let mut merged: Vec<(VarId, f64)> = Vec::with_capacity(terms.len());
        for (var, coeff) in terms {
            match merged.last_mut() {
                Some((last, acc)) if *last == var => *acc += coeff,
                _ => merged.push((var, coeff)),
            }
        }
        merged.retain(|(_, c)| *c != 0.0);
        Self {
            terms: merged,
            constant: self.constant,
        }
    }
}

impl From<f64> for LinearExpr {
    fn from(value: f64) -> Self {
        LinearExpr::constant(value)
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        LinearExpr::variable(var)
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self += rhs;
        self
    }
}

impl AddAssign for LinearExpr {
    fn add_assign(&mut self, rhs: LinearExpr) {
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: LinearExpr) -> LinearExpr {
        self -= rhs;
        self
    }
}

impl SubAssign for LinearExpr {
    fn sub_assign(&mut self, rhs: LinearExpr) {
        self.terms
            .extend(rhs.terms.into_iter().map(|(v, c)| (v, -c)));
        self.constant -= rhs.constant;
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(mut self) -> LinearExpr {
        for (_, c) in &mut self.terms {
            *c = -*c;
        }
        self.constant = -self.constant;
        self
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, rhs: f64) -> LinearExpr {
        for (_, c) in &mut self.terms {
            *c *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Mul<LinearExpr> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: LinearExpr) -> LinearExpr {
        rhs * self
    }
}

impl Sum for LinearExpr {
    fn sum<I: Iterator<Item = LinearExpr>>(iter: I) -> Self {
        LinearExpr::sum(iter)
    }
}
