//! Discrete factors and their algebra.
//!
//! A [`Factor`] is a non-negative table over an ordered scope of [`Variable`]s.
//! Factors are value objects: [`product`][Factor::product],
//! [`marginalize_out`][Factor::marginalize_out], [`reduce`][Factor::reduce] and
//! [`normalize`][Factor::normalize] all return new factors and never mutate their inputs.
//!
//! Tables follow the row-major convention documented in [`crate::index`]:
//! the last variable of the scope varies fastest.
//!
//! # Scope of a product
//!
//! The scope of `a.product(&b)` is the scope of `a` followed by the variables of `b`
//! that are not in `a`, in the order they appear in `b`.
//!
//! # Example
//!
//! ```
//! use bayes_rs::factor::Factor;
//! use bayes_rs::types::Variable;
//!
//! let rain = Variable::binary("Rain");
//! let wet = Variable::binary("Wet");
//!
//! let p_rain = Factor::new(vec![rain.clone()], vec![0.8, 0.2]).unwrap();
//! let p_wet = Factor::cpd(&wet, &[rain.clone()], &[[0.9, 0.1], [0.1, 0.9]]).unwrap();
//!
//! let joint = p_rain.product(&p_wet).unwrap();
//! let p_wet_marginal = joint.marginalize_out("Rain").unwrap();
//! assert!((p_wet_marginal.get(&[1]) - 0.26).abs() < 1e-12);
//! ```

use std::collections::HashSet;

use crate::error::{ConstructionError, Error, Result};
use crate::index::{self, checked_table_size, offset, strides, table_size, Assignments, Odometer};
use crate::types::{Assignment, Evidence, Variable};
use crate::utils::approx_eq;

#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    scope: Vec<Variable>,
    values: Vec<f64>,
}

impl Factor {
    /// Creates a factor from a scope and a flat row-major table.
    ///
    /// Fails if the scope repeats a variable name, if the table length is not the product
    /// of the scope cardinalities, or if any value is negative or not finite.
    pub fn new(scope: Vec<Variable>, values: Vec<f64>) -> Result<Self, ConstructionError> {
        let mut seen = HashSet::new();
        for var in &scope {
            if !seen.insert(var.name()) {
                return Err(ConstructionError::InvalidFactor(format!(
                    "variable '{}' appears twice in scope",
                    var.name()
                )));
            }
        }

        let expected = checked_table_size(&cardinalities(&scope)).ok_or_else(overflow)?;
        if values.len() != expected {
            return Err(ConstructionError::InvalidFactor(format!(
                "table has {} entries, scope requires {}",
                values.len(),
                expected
            )));
        }

        if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| !v.is_finite() || **v < 0.0) {
            return Err(ConstructionError::InvalidFactor(format!("entry {} has invalid value {}", i, v)));
        }

        Ok(Self { scope, values })
    }

    /// The factor with empty scope and value 1, the identity of [`product`][Factor::product].
    pub fn unit() -> Self {
        Self {
            scope: Vec::new(),
            values: vec![1.0],
        }
    }

    /// Builds a conditional probability table for `variable` given `parents`.
    ///
    /// `rows` holds one row per state of `variable`; each row lists the probabilities for
    /// every parent assignment, enumerated in `parents` order with the last parent varying
    /// fastest. The resulting scope is `[variable, parents...]`.
    ///
    /// ```
    /// use bayes_rs::factor::Factor;
    /// use bayes_rs::types::Variable;
    ///
    /// let a = Variable::binary("A");
    /// let b = Variable::binary("B");
    /// // P(B | A): column A=0 is (0.3, 0.7), column A=1 is (0.9, 0.1).
    /// let cpd = Factor::cpd(&b, &[a], &[[0.3, 0.9], [0.7, 0.1]]).unwrap();
    /// assert_eq!(cpd.get(&[1, 0]), 0.7);
    /// ```
    pub fn cpd<R: AsRef<[f64]>>(
        variable: &Variable,
        parents: &[Variable],
        rows: &[R],
    ) -> Result<Self, ConstructionError> {
        if rows.len() != variable.cardinality() {
            return Err(ConstructionError::InvalidFactor(format!(
                "CPD of '{}' needs {} rows, got {}",
                variable,
                variable.cardinality(),
                rows.len()
            )));
        }

        let columns = checked_table_size(&cardinalities(parents)).ok_or_else(overflow)?;
        let mut values = Vec::with_capacity(columns.saturating_mul(rows.len()));
        for (state, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != columns {
                return Err(ConstructionError::InvalidFactor(format!(
                    "row {} of CPD of '{}' has {} columns, expected {}",
                    state,
                    variable,
                    row.len(),
                    columns
                )));
            }
            values.extend_from_slice(row);
        }

        let mut scope = Vec::with_capacity(parents.len() + 1);
        scope.push(variable.clone());
        scope.extend(parents.iter().cloned());
        Factor::new(scope, values)
    }

    pub fn scope(&self) -> &[Variable] {
        &self.scope
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Names of the scope variables, in scope order.
    pub fn names(&self) -> Vec<&str> {
        self.scope.iter().map(Variable::name).collect()
    }

    pub fn cardinalities(&self) -> Vec<usize> {
        cardinalities(&self.scope)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.scope.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Position of a variable in the scope.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.scope.iter().position(|v| v.name() == name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.scope.iter().find(|v| v.name() == name)
    }

    /// Value at a positional assignment (states in scope order).
    ///
    /// # Panics
    ///
    /// Panics if the assignment does not fit the scope.
    pub fn get(&self, states: &[usize]) -> f64 {
        self.values[index::encode(&self.cardinalities(), states)]
    }

    /// Value at a named assignment. Extra entries in `assignment` are ignored.
    ///
    /// Returns `None` if a scope variable is missing from `assignment` or its state is out of range.
    pub fn value_of(&self, assignment: &Assignment) -> Option<f64> {
        let mut index = 0;
        for var in &self.scope {
            let state = *assignment.get(var.name())?;
            if !var.has_state(state) {
                return None;
            }
            index = index * var.cardinality() + state;
        }
        Some(self.values[index])
    }

    /// Total mass of the table.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Positional assignment of the largest entry. Ties resolve to the lowest index.
    pub fn argmax(&self) -> Vec<usize> {
        let mut best = 0;
        for (i, &v) in self.values.iter().enumerate() {
            if v > self.values[best] {
                best = i;
            }
        }
        index::decode(&self.cardinalities(), best)
    }

    /// Iterates over all joint assignments together with their values, in table order.
    pub fn assignments(&self) -> impl Iterator<Item = (Assignment, f64)> + '_ {
        Assignments::new(self.cardinalities())
            .zip(self.values.iter().copied())
            .map(move |(states, value)| {
                let assignment = self
                    .scope
                    .iter()
                    .zip(states)
                    .map(|(var, state)| (var.name().to_string(), state))
                    .collect();
                (assignment, value)
            })
    }

    /// Factor product.
    ///
    /// For every joint assignment `x` over the union scope,
    /// `result[x] = self[x restricted to self] * other[x restricted to other]`.
    pub fn product(&self, other: &Factor) -> Result<Factor> {
        let mut scope = self.scope.clone();
        for var in &other.scope {
            match self.variable(var.name()) {
                Some(own) if own.cardinality() != var.cardinality() => {
                    return Err(Error::InvalidOperation(format!(
                        "variable '{}' has cardinality {} and {} in product operands",
                        var,
                        own.cardinality(),
                        var.cardinality()
                    )));
                }
                Some(_) => {}
                None => scope.push(var.clone()),
            }
        }

        let cards = cardinalities(&scope);
        let size = checked_table_size(&cards).ok_or_else(|| {
            Error::InvalidOperation(format!("product table over {} variables overflows usize", scope.len()))
        })?;
        let lhs = projection(&scope, &self.scope);
        let rhs = projection(&scope, &other.scope);

        let mut values = Vec::with_capacity(size);
        let mut odometer = Odometer::new(cards);
        while let Some(states) = odometer.next() {
            values.push(self.values[offset(states, &lhs)] * other.values[offset(states, &rhs)]);
        }

        Ok(Factor { scope, values })
    }

    /// Sums `name` out of the factor.
    ///
    /// Fails with [`Error::InvalidOperation`] if `name` is not in the scope.
    pub fn marginalize_out(&self, name: &str) -> Result<Factor> {
        let position = self.position(name).ok_or_else(|| {
            Error::InvalidOperation(format!("cannot marginalize '{}' out of factor over {:?}", name, self.names()))
        })?;

        let mut scope = self.scope.clone();
        scope.remove(position);

        let target = projection(&self.scope, &scope);
        let mut values = vec![0.0; table_size(&cardinalities(&scope))];
        let mut odometer = Odometer::new(self.cardinalities());
        let mut i = 0;
        while let Some(states) = odometer.next() {
            values[offset(states, &target)] += self.values[i];
            i += 1;
        }

        Ok(Factor { scope, values })
    }

    /// Sums out every variable in `names`, in the given order.
    pub fn marginalize<S: AsRef<str>>(&self, names: &[S]) -> Result<Factor> {
        let mut result = self.clone();
        for name in names {
            result = result.marginalize_out(name.as_ref())?;
        }
        Ok(result)
    }

    /// Slices the table at the observed states.
    ///
    /// Every scope variable that appears in `evidence` is fixed to its observed state and
    /// removed from the scope. Evidence on variables outside the scope is ignored.
    pub fn reduce(&self, evidence: &Evidence) -> Result<Factor> {
        let all_strides = strides(&self.cardinalities());

        let mut base = 0;
        let mut scope = Vec::new();
        let mut kept = Vec::new();
        for (var, &stride) in self.scope.iter().zip(&all_strides) {
            match evidence.get(var.name()) {
                Some(state) if !var.has_state(state) => {
                    return Err(Error::InvalidOperation(format!(
                        "state {} of '{}' is out of range 0..{}",
                        state,
                        var,
                        var.cardinality()
                    )));
                }
                Some(state) => base += state * stride,
                None => {
                    scope.push(var.clone());
                    kept.push(stride);
                }
            }
        }

        if scope.len() == self.scope.len() {
            return Ok(self.clone());
        }

        let cards = cardinalities(&scope);
        let mut values = Vec::with_capacity(table_size(&cards));
        let mut odometer = Odometer::new(cards);
        while let Some(states) = odometer.next() {
            values.push(self.values[base + offset(states, &kept)]);
        }

        Ok(Factor { scope, values })
    }

    /// Divides every entry by the total mass.
    ///
    /// Fails with [`Error::DegenerateDistribution`] if the total mass is zero,
    /// and with [`Error::InvalidOperation`] on a scalar factor.
    pub fn normalize(&self) -> Result<Factor> {
        if self.scope.is_empty() {
            return Err(Error::InvalidOperation("cannot normalize a factor with empty scope".to_string()));
        }
        let sum = self.sum();
        if !(sum > 0.0 && sum.is_finite()) {
            return Err(Error::DegenerateDistribution { sum });
        }
        Ok(Factor {
            scope: self.scope.clone(),
            values: self.values.iter().map(|v| v / sum).collect(),
        })
    }

    /// Permutes the scope into the given order.
    ///
    /// `names` must list exactly the scope variables.
    pub fn reorder<S: AsRef<str>>(&self, names: &[S]) -> Result<Factor> {
        if names.len() != self.scope.len() {
            return Err(Error::InvalidOperation(format!(
                "reorder expects {} variables, got {}",
                self.scope.len(),
                names.len()
            )));
        }
        let mut scope = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let var = self
                .variable(name)
                .ok_or_else(|| Error::InvalidOperation(format!("'{}' is not in scope {:?}", name, self.names())))?;
            if scope.iter().any(|v: &Variable| v.name() == name) {
                return Err(Error::InvalidOperation(format!("'{}' listed twice in reorder", name)));
            }
            scope.push(var.clone());
        }
        if scope == self.scope {
            return Ok(self.clone());
        }

        let source = projection(&scope, &self.scope);
        let mut values = Vec::with_capacity(self.values.len());
        let mut odometer = Odometer::new(cardinalities(&scope));
        while let Some(states) = odometer.next() {
            values.push(self.values[offset(states, &source)]);
        }

        Ok(Factor { scope, values })
    }

    /// Checks whether two factors represent the same function, up to scope order.
    pub fn approx_eq(&self, other: &Factor, tolerance: f64) -> bool {
        if self.scope.len() != other.scope.len() {
            return false;
        }
        if self.scope.iter().any(|v| other.variable(v.name()) != Some(v)) {
            return false;
        }
        let Ok(other) = other.reorder(&self.names()) else {
            return false;
        };
        self.values
            .iter()
            .zip(&other.values)
            .all(|(&a, &b)| approx_eq(a, b, tolerance))
    }
}

fn overflow() -> ConstructionError {
    ConstructionError::InvalidFactor("table size overflows usize".to_string())
}

pub(crate) fn cardinalities(scope: &[Variable]) -> Vec<usize> {
    scope.iter().map(Variable::cardinality).collect()
}

/// For every variable of `from`, its stride in the table of `onto` (zero if absent).
///
/// The dot product of an assignment over `from` with the result is the flat index of
/// the restricted assignment in `onto`.
fn projection(from: &[Variable], onto: &[Variable]) -> Vec<usize> {
    let onto_strides = strides(&cardinalities(onto));
    from.iter()
        .map(|var| {
            onto.iter()
                .position(|v| v.name() == var.name())
                .map_or(0, |i| onto_strides[i])
        })
        .collect()
}
