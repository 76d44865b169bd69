//! Core value types: discrete variables, evidence and assignments.
//!
//! A [`Variable`] is identified by its name and carries a fixed cardinality.
//! States of a variable are the indices `0..cardinality`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConstructionError;

/// A discrete random variable.
///
/// # Invariants
///
/// - The name is non-empty.
/// - The cardinality is at least 2.
/// - Variables are immutable once created; clones share the name.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Variable {
    name: Arc<str>,
    cardinality: usize,
}

impl Variable {
    /// Creates a new variable with the given name and number of states.
    pub fn new(name: impl AsRef<str>, cardinality: usize) -> Result<Self, ConstructionError> {
        let name = name.as_ref();
        if name.is_empty() {
            return Err(ConstructionError::EmptyName);
        }
        if cardinality < 2 {
            return Err(ConstructionError::InvalidCardinality {
                name: name.to_string(),
                cardinality,
            });
        }
        Ok(Variable {
            name: Arc::from(name),
            cardinality,
        })
    }

    /// Creates a binary variable.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn binary(name: impl AsRef<str>) -> Self {
        match Variable::new(name, 2) {
            Ok(var) => var,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Checks whether `state` is a valid state index of this variable.
    pub fn has_state(&self, state: usize) -> bool {
        state < self.cardinality
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A joint assignment of states, keyed by variable name.
///
/// This is the external representation of one row of a factor.
pub type Assignment = BTreeMap<String, usize>;

/// Observed states for a subset of variables.
///
/// Evidence is keyed by variable name. Validity against a network
/// (known variables, states in range) is checked at query time.
///
/// ```
/// use bayes_rs::types::Evidence;
///
/// let evidence = Evidence::from([("Rain", 1), ("Sprinkler", 0)]);
/// assert_eq!(evidence.get("Rain"), Some(1));
/// assert_eq!(evidence.len(), 2);
/// ```
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Evidence(BTreeMap<String, usize>);

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observation, returning `self` for chaining.
    pub fn with(mut self, name: impl Into<String>, state: usize) -> Self {
        self.insert(name, state);
        self
    }

    /// Adds an observation, returning the previously observed state if any.
    pub fn insert(&mut self, name: impl Into<String>, state: usize) -> Option<usize> {
        self.0.insert(name.into(), state)
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, state)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(name, &state)| (name.as_str(), state))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for Evidence {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        Evidence(iter.into_iter().map(|(name, state)| (name.into(), state)).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[(S, usize); N]> for Evidence {
    fn from(pairs: [(S, usize); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<Assignment> for Evidence {
    fn from(assignment: Assignment) -> Self {
        Evidence(assignment)
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, state)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, state)?;
        }
        write!(f, "}}")
    }
}
