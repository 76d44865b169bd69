//! Error taxonomy for network construction, validation and inference.
//!
//! Errors fall into four groups:
//!
//! - [`ConstructionError`]: a malformed edit was rejected at call time.
//! - Model errors ([`Error::CyclicGraph`], [`Error::MissingCpd`], [`Error::ScopeMismatch`],
//!   [`Error::NotNormalized`]): reported by
//!   [`check_model`][crate::network::BayesianNetwork::check_model].
//! - Query errors ([`Error::InvalidQuery`], [`Error::DegenerateDistribution`]): caller input
//!   is inconsistent with the network or has zero probability under it.
//! - [`Error::InvalidOperation`]: misuse of the factor algebra.
//!   Inside the inference engine this is a defect and is raised as a panic.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A rejected edit to a variable, factor or network.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
    #[error("variable name must not be empty")]
    EmptyName,

    #[error("variable '{name}' has cardinality {cardinality}, expected at least 2")]
    InvalidCardinality { name: String, cardinality: usize },

    #[error("variable '{0}' is already defined")]
    DuplicateVariable(String),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("self-loop on variable '{0}'")]
    SelfLoop(String),

    #[error("variable '{0}' already has a CPD")]
    DuplicateCpd(String),

    #[error("invalid factor: {0}")]
    InvalidFactor(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("graph contains a cycle among {}", format_cycle(.cycle))]
    CyclicGraph { cycle: Vec<String> },

    #[error("variable '{0}' has no CPD")]
    MissingCpd(String),

    #[error("CPD of '{variable}' has scope {actual:?}, expected {expected:?}")]
    ScopeMismatch {
        variable: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("CPD of '{variable}' sums to {sum} for parent assignment {}", format_assignment(.parent_assignment))]
    NotNormalized {
        variable: String,
        parent_assignment: Vec<(String, usize)>,
        sum: f64,
    },

    /// `variable` names the offending variable, or is empty when the query as a whole is
    /// malformed (no targets).
    #[error("invalid query on '{variable}': {reason}")]
    InvalidQuery { variable: String, reason: String },

    #[error("invalid factor operation: {0}")]
    InvalidOperation(String),

    #[error("cannot normalize a factor with total mass {sum}")]
    DegenerateDistribution { sum: f64 },
}

impl Error {
    pub(crate) fn invalid_query(variable: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidQuery {
            variable: variable.into(),
            reason: reason.into(),
        }
    }
}

fn format_cycle(cycle: &[String]) -> String {
    cycle.join(", ")
}

fn format_assignment(assignment: &[(String, usize)]) -> String {
    if assignment.is_empty() {
        return "{}".to_string();
    }
    let parts: Vec<String> = assignment.iter().map(|(name, state)| format!("{}={}", name, state)).collect();
    format!("{{{}}}", parts.join(", "))
}
