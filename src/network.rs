//! Bayesian network structure and model validation.
//!
//! A [`BayesianNetwork`] is built incrementally: variables first, then directed edges
//! from parents to children, then one CPD per variable. Construction methods reject
//! malformed edits immediately with a [`ConstructionError`]; structural and numeric
//! validity is deferred to an explicit [`check_model`][BayesianNetwork::check_model] call.
//!
//! # Model check
//!
//! `check_model` verifies, in this order, failing at the first violation:
//!
//! 1. The edge set is acyclic ([`Error::CyclicGraph`]).
//! 2. Every variable has a CPD ([`Error::MissingCpd`]).
//! 3. Every CPD's scope is exactly the variable and its parents ([`Error::ScopeMismatch`]).
//! 4. Every CPD sums to one over the variable's states, for each parent assignment
//!    ([`Error::NotNormalized`]).
//!
//! # Example
//!
//! ```
//! use bayes_rs::factor::Factor;
//! use bayes_rs::network::BayesianNetwork;
//!
//! let mut bn = BayesianNetwork::new();
//! let rain = bn.add_variable("Rain", 2).unwrap();
//! let wet = bn.add_variable("Wet", 2).unwrap();
//! bn.add_edge("Rain", "Wet").unwrap();
//!
//! bn.set_cpd("Rain", Factor::cpd(&rain, &[], &[[0.8], [0.2]]).unwrap()).unwrap();
//! bn.set_cpd("Wet", Factor::cpd(&wet, &[rain], &[[0.9, 0.1], [0.1, 0.9]]).unwrap()).unwrap();
//!
//! assert!(bn.check_model().is_ok());
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use log::{debug, info};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{ConstructionError, Error, Result};
use crate::factor::Factor;
use crate::index;
use crate::types::Variable;
use crate::utils::{approx_eq, DEFAULT_TOLERANCE};

#[derive(Debug, Clone, Default)]
pub struct BayesianNetwork {
    graph: DiGraph<Variable, ()>,
    nodes: HashMap<String, NodeIndex>,
    cpds: BTreeMap<String, Factor>,
}

impl BayesianNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable with the given number of states.
    pub fn add_variable(&mut self, name: &str, cardinality: usize) -> Result<Variable, ConstructionError> {
        if self.nodes.contains_key(name) {
            return Err(ConstructionError::DuplicateVariable(name.to_string()));
        }
        let var = Variable::new(name, cardinality)?;
        let node = self.graph.add_node(var.clone());
        self.nodes.insert(name.to_string(), node);
        debug!("add_variable(name = {}, cardinality = {})", name, cardinality);
        Ok(var)
    }

    /// Adds a directed edge `parent -> child`. Adding an existing edge again is a no-op.
    ///
    /// Cycles are not rejected here; they are reported by [`check_model`][Self::check_model].
    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<(), ConstructionError> {
        let p = self.node(parent)?;
        let c = self.node(child)?;
        if p == c {
            return Err(ConstructionError::SelfLoop(parent.to_string()));
        }
        if self.graph.find_edge(p, c).is_none() {
            self.graph.add_edge(p, c, ());
            debug!("add_edge({} -> {})", parent, child);
        }
        Ok(())
    }

    /// Attaches the CPD of variable `name`.
    ///
    /// The scope of `cpd` is validated later by [`check_model`][Self::check_model].
    pub fn set_cpd(&mut self, name: &str, cpd: Factor) -> Result<(), ConstructionError> {
        self.node(name)?;
        if self.cpds.contains_key(name) {
            return Err(ConstructionError::DuplicateCpd(name.to_string()));
        }
        self.cpds.insert(name.to_string(), cpd);
        Ok(())
    }

    /// Replaces the CPD of variable `name`, returning the previous one.
    pub fn replace_cpd(&mut self, name: &str, cpd: Factor) -> Result<Option<Factor>, ConstructionError> {
        self.node(name)?;
        Ok(self.cpds.insert(name.to_string(), cpd))
    }

    fn node(&self, name: &str) -> Result<NodeIndex, ConstructionError> {
        self.nodes
            .get(name)
            .copied()
            .ok_or_else(|| ConstructionError::UnknownVariable(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.nodes.get(name).map(|&node| &self.graph[node])
    }

    /// All variables, in insertion order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.graph.node_weights()
    }

    /// All edges as `(parent, child)` name pairs, in insertion order.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|e| (self.graph[e.source()].name(), self.graph[e.target()].name()))
            .collect()
    }

    pub fn cpd(&self, name: &str) -> Option<&Factor> {
        self.cpds.get(name)
    }

    /// All CPDs keyed by variable name, in name order.
    pub fn cpds(&self) -> impl Iterator<Item = (&str, &Factor)> {
        self.cpds.iter().map(|(name, cpd)| (name.as_str(), cpd))
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&Variable> {
        let Some(&node) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut result: Vec<NodeIndex> = self.graph.neighbors_directed(node, direction).collect();
        result.sort();
        result.into_iter().map(|n| &self.graph[n]).collect()
    }

    /// Parents of `name`, in the order the variables were added (not the order of the edges).
    /// Empty for unknown variables.
    pub fn parents(&self, name: &str) -> Vec<&Variable> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Children of `name`, in the order the variables were added (not the order of the edges).
    /// Empty for unknown variables.
    pub fn children(&self, name: &str) -> Vec<&Variable> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Variables without parents.
    pub fn roots(&self) -> Vec<&Variable> {
        self.variables().filter(|v| self.parents(v.name()).is_empty()).collect()
    }

    /// Variables without children.
    pub fn leaves(&self) -> Vec<&Variable> {
        self.variables().filter(|v| self.children(v.name()).is_empty()).collect()
    }

    /// Parents, children, and the other parents of the children of `name`.
    pub fn markov_blanket(&self, name: &str) -> BTreeSet<String> {
        let mut blanket = BTreeSet::new();
        for parent in self.parents(name) {
            blanket.insert(parent.name().to_string());
        }
        for child in self.children(name) {
            blanket.insert(child.name().to_string());
            for co_parent in self.parents(child.name()) {
                blanket.insert(co_parent.name().to_string());
            }
        }
        blanket.remove(name);
        blanket
    }

    /// The given variables together with all their ancestors. Unknown names are skipped.
    pub fn ancestors<S: AsRef<str>>(&self, names: &[S]) -> BTreeSet<String> {
        let mut visited = BTreeSet::new();
        let mut queue: VecDeque<NodeIndex> = names.iter().filter_map(|n| self.nodes.get(n.as_ref()).copied()).collect();
        while let Some(node) = queue.pop_front() {
            if visited.insert(self.graph[node].name().to_string()) {
                queue.extend(self.graph.neighbors_directed(node, Direction::Incoming));
            }
        }
        visited
    }

    /// Variables ordered so that every parent precedes its children.
    pub fn topological_order(&self) -> Result<Vec<&Variable>> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().map(|n| &self.graph[n]).collect()),
            Err(_) => Err(self.cycle_error()),
        }
    }

    fn cycle_error(&self) -> Error {
        let mut components = tarjan_scc(&self.graph);
        components.retain(|scc| scc.len() > 1);
        let mut cycle: Vec<NodeIndex> = components.into_iter().next().unwrap_or_default();
        cycle.sort();
        Error::CyclicGraph {
            cycle: cycle.into_iter().map(|n| self.graph[n].name().to_string()).collect(),
        }
    }

    /// Validates the network with the default tolerance.
    pub fn check_model(&self) -> Result<()> {
        self.check_model_with_tolerance(DEFAULT_TOLERANCE)
    }

    /// Validates structure and CPDs, failing at the first violated invariant.
    ///
    /// `tolerance` bounds the absolute deviation from 1 of each conditional distribution.
    pub fn check_model_with_tolerance(&self, tolerance: f64) -> Result<()> {
        self.topological_order()?;

        for var in self.variables() {
            if !self.cpds.contains_key(var.name()) {
                return Err(Error::MissingCpd(var.name().to_string()));
            }
        }

        for var in self.variables() {
            self.check_scope(var)?;
        }

        for var in self.variables() {
            self.check_normalized(var, tolerance)?;
        }

        info!(
            "check_model: {} variables, {} edges, OK",
            self.len(),
            self.graph.edge_count()
        );
        Ok(())
    }

    fn check_scope(&self, var: &Variable) -> Result<()> {
        let cpd = &self.cpds[var.name()];
        let parents = self.parents(var.name());

        let mut expected: Vec<&Variable> = vec![var];
        expected.extend(parents);

        let matches = cpd.scope().len() == expected.len()
            && expected.iter().all(|&e| cpd.variable(e.name()) == Some(e));
        if matches {
            return Ok(());
        }

        let actual = cpd
            .scope()
            .iter()
            .map(|v| match self.variable(v.name()) {
                Some(known) if known.cardinality() != v.cardinality() => {
                    format!("{}[{}]", v.name(), v.cardinality())
                }
                _ => v.name().to_string(),
            })
            .collect();
        Err(Error::ScopeMismatch {
            variable: var.name().to_string(),
            expected: expected.iter().map(|v| v.name().to_string()).collect(),
            actual,
        })
    }

    fn check_normalized(&self, var: &Variable, tolerance: f64) -> Result<()> {
        let cpd = &self.cpds[var.name()];
        let sums = cpd.marginalize_out(var.name())?;
        let cards = sums.cardinalities();

        for (i, &sum) in sums.values().iter().enumerate() {
            if !approx_eq(sum, 1.0, tolerance) {
                let states = index::decode(&cards, i);
                let parent_assignment = sums
                    .names()
                    .into_iter()
                    .zip(states)
                    .map(|(name, state)| (name.to_string(), state))
                    .collect();
                return Err(Error::NotNormalized {
                    variable: var.name().to_string(),
                    parent_assignment,
                    sum,
                });
            }
        }
        Ok(())
    }
}
