//! Affine expressions over model columns and the relations built from them.
//!
//! Columns are addressed by [`VarId`], the flat position of a variable cell in
//! the registry. Expressions are plain term lists; duplicate columns are only
//! merged when a relation is formed, so building an expression never sorts.

use serde::Serialize;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A single model column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(pub usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// `Σ coefficient·column + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_constant(constant: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }

    pub fn term(var: VarId, coefficient: f64) -> Self {
        Self {
            terms: vec![(var, coefficient)],
            constant: 0.0,
        }
    }

    pub fn add_term(&mut self, var: VarId, coefficient: f64) {
        self.terms.push((var, coefficient));
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// True when the expression references no column.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Net coefficient of `var`, zero when absent.
    pub fn coefficient(&self, var: VarId) -> f64 {
        self.terms
            .iter()
            .filter(|(v, _)| *v == var)
            .map(|(_, c)| c)
            .sum()
    }

    /// Merges repeated columns and drops zero coefficients.
    pub fn normalized(mut self) -> Self {
        self.terms.sort_by_key(|(v, _)| *v);
        let mut merged: Vec<(VarId, f64)> = Vec::with_capacity(self.terms.len());
        for (var, coef) in self.terms {
            match merged.last_mut() {
                Some((last, acc)) if *last == var => *acc += coef,
                _ => merged.push((var, coef)),
            }
        }
        merged.retain(|(_, c)| *c != 0.0);
        self.terms = merged;
        self
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values[v.0])
            .sum::<f64>()
            + self.constant
    }

    pub fn le(self, rhs: impl Into<LinearExpr>) -> LinearRelation {
        LinearRelation::new(self, Sense::Le, rhs.into())
    }

    pub fn ge(self, rhs: impl Into<LinearExpr>) -> LinearRelation {
        LinearRelation::new(self, Sense::Ge, rhs.into())
    }

    pub fn eq_to(self, rhs: impl Into<LinearExpr>) -> LinearRelation {
        LinearRelation::new(self, Sense::Eq, rhs.into())
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        LinearExpr::term(var, 1.0)
    }
}

impl From<f64> for LinearExpr {
    fn from(value: f64) -> Self {
        LinearExpr::from_constant(value)
    }
}

impl<T: Into<LinearExpr>> AddAssign<T> for LinearExpr {
    fn add_assign(&mut self, rhs: T) {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl<T: Into<LinearExpr>> SubAssign<T> for LinearExpr {
    fn sub_assign(&mut self, rhs: T) {
        *self += -rhs.into();
    }
}

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: T) -> LinearExpr {
        self += rhs;
        self
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: T) -> LinearExpr {
        self -= rhs;
        self
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self * -1.0
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, factor: f64) -> LinearExpr {
        for (_, c) in &mut self.terms {
            *c *= factor;
        }
        self.constant *= factor;
        self
    }
}

impl Mul<LinearExpr> for f64 {
    type Output = LinearExpr;

    fn mul(self, expr: LinearExpr) -> LinearExpr {
        expr * self
    }
}

impl<T: Into<LinearExpr>> Add<T> for VarId {
    type Output = LinearExpr;

    fn add(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) + rhs
    }
}

impl<T: Into<LinearExpr>> Sub<T> for VarId {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Mul<f64> for VarId {
    type Output = LinearExpr;

    fn mul(self, factor: f64) -> LinearExpr {
        LinearExpr::term(self, factor)
    }
}

impl Mul<VarId> for f64 {
    type Output = LinearExpr;

    fn mul(self, var: VarId) -> LinearExpr {
        LinearExpr::term(var, self)
    }
}

impl Neg for VarId {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        LinearExpr::term(self, -1.0)
    }
}

impl std::iter::Sum for LinearExpr {
    fn sum<I: Iterator<Item = LinearExpr>>(iter: I) -> Self {
        iter.fold(LinearExpr::new(), |acc, e| acc + e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

impl Sense {
    pub fn symbol(&self) -> &'static str {
        match self {
            Sense::Le => "<=",
            Sense::Ge => ">=",
            Sense::Eq => "=",
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `expr (sense) rhs`, with every column on the left and the constant on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRelation {
    pub expr: LinearExpr,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearRelation {
    pub fn new(lhs: LinearExpr, sense: Sense, rhs: LinearExpr) -> Self {
        let mut expr = (lhs - rhs).normalized();
        let rhs = -expr.constant;
        expr.constant = 0.0;
        Self { expr, sense, rhs }
    }

    /// Amount by which `values` break the relation; zero when satisfied.
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.evaluate(values);
        match self.sense {
            Sense::Le => (lhs - self.rhs).max(0.0),
            Sense::Ge => (self.rhs - lhs).max(0.0),
            Sense::Eq => (lhs - self.rhs).abs(),
        }
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        self.violation(values) <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_moves_constants_right_and_merges_terms() {
        let x = VarId(0);
        let y = VarId(1);
        // x + 2y + 3 <= x + 10  ->  2y <= 7
        let rel = (x + y * 2.0 + 3.0).le(x + 10.0);
        assert_eq!(rel.expr.terms(), &[(y, 2.0)]);
        assert_eq!(rel.rhs, 7.0);
        assert_eq!(rel.sense, Sense::Le);
    }

    #[test]
    fn violation_by_sense() {
        let x = VarId(0);
        let values = [4.0];
        assert_eq!(LinearExpr::from(x).le(3.0).violation(&values), 1.0);
        assert_eq!(LinearExpr::from(x).ge(3.0).violation(&values), 0.0);
        assert!(LinearExpr::from(x).eq_to(4.0).is_satisfied(&values, 1e-12));
    }

    #[test]
    fn coefficient_sums_repeats() {
        let x = VarId(3);
        let expr = x * 2.0 - x * 0.5 + VarId(1);
        assert_eq!(expr.coefficient(x), 1.5);
        assert_eq!(expr.coefficient(VarId(9)), 0.0);
        let summed: LinearExpr = [LinearExpr::from(x), LinearExpr::from(5.0)].into_iter().sum();
        assert_eq!(summed.evaluate(&[0.0, 0.0, 0.0, 2.0]), 7.0);
    }
}
