//! # bayes-rs: Exact inference in discrete Bayesian networks
//!
//! **`bayes-rs`** computes exact posterior distributions over discrete Bayesian networks
//! using **variable elimination**, without ever materializing the full joint distribution.
//!
//! ## What is a Bayesian network?
//!
//! A Bayesian network is a directed acyclic graph of random variables in which every
//! variable is conditioned only on its parents. Each variable carries a conditional
//! probability table (CPD) giving its distribution for every combination of parent states.
//! The joint distribution is the product of all CPDs.
//!
//! ## Key Features
//!
//! - **Value-typed factor algebra**: [`Factor`][crate::factor::Factor] product, marginalization,
//!   evidence reduction and normalization never mutate their inputs.
//! - **Explicit validation**: [`check_model`][crate::network::BayesianNetwork::check_model] reports
//!   the first broken invariant (cycle, missing CPD, wrong scope, unnormalized column) with enough
//!   context to fix the model. An invalid network cannot be used for inference.
//! - **Pluggable elimination orders**: greedy min-fill, min-neighbors, min-weight and weighted
//!   min-fill heuristics, or a fixed caller-supplied order.
//! - **Shareable**: a validated network and its engine are read-only and may serve concurrent queries.
//!
//! ## Basic Usage
//!
//! ```rust
//! use bayes_rs::factor::Factor;
//! use bayes_rs::inference::{Inference, VariableElimination};
//! use bayes_rs::network::BayesianNetwork;
//! use bayes_rs::types::Evidence;
//!
//! // 1. Declare variables and edges
//! let mut bn = BayesianNetwork::new();
//! let burglary = bn.add_variable("Burglary", 2).unwrap();
//! let alarm = bn.add_variable("Alarm", 2).unwrap();
//! bn.add_edge("Burglary", "Alarm").unwrap();
//!
//! // 2. Attach CPDs: one row per state, one column per parent assignment
//! bn.set_cpd("Burglary", Factor::cpd(&burglary, &[], &[[0.99], [0.01]]).unwrap()).unwrap();
//! bn.set_cpd("Alarm", Factor::cpd(&alarm, &[burglary], &[[0.95, 0.06], [0.05, 0.94]]).unwrap()).unwrap();
//!
//! // 3. Validate and query
//! let engine = VariableElimination::new(&bn).unwrap();
//! let posterior = engine.query(&["Burglary"], &Evidence::from([("Alarm", 1)])).unwrap();
//!
//! let p = posterior.get(&[1]);
//! assert!((p - 0.0094 / (0.0094 + 0.0495)).abs() < 1e-12);
//! ```
//!
//! ## Core Components
//!
//! - **[`factor`]**: The algebraic core. Tables follow the row-major layout described in [`index`].
//! - **[`network`]**: Construction API and model validation.
//! - **[`planner`]**: Interaction graph, elimination heuristics and cost model.
//! - **[`inference`]**: The variable elimination engine.
//! - **[`dot`]**: Graphviz export of the network structure.

pub mod dot;
pub mod error;
pub mod factor;
pub mod index;
pub mod inference;
pub mod network;
pub mod planner;
pub mod table;
pub mod types;
pub mod utils;
