//! Elimination ordering for variable elimination.
//!
//! # Why the order matters
//!
//! Eliminating a variable multiplies every factor that mentions it, producing an
//! intermediate factor over the variable and all of its current neighbors. The size of
//! that factor is the product of their cardinalities, so a poor order can blow up the
//! working tables exponentially while a good one keeps them small.
//!
//! Any order over the right set of variables yields the same posterior; the order only
//! affects cost. Finding an optimal order is NP-hard, so we use greedy heuristics.
//!
//! # Interaction graph
//!
//! Two variables are adjacent in the [`InteractionGraph`] if they co-occur in the scope of
//! some active factor. Eliminating `v` connects all neighbors of `v` pairwise (the *fill*
//! edges) and removes `v`.
//!
//! # Greedy heuristics
//!
//! At each step the variable with the lowest score is eliminated; ties go to the
//! lexicographically smallest name, so orders are reproducible.
//!
//! | Heuristic         | Score of `v`                                                   |
//! |-------------------|----------------------------------------------------------------|
//! | `MinNeighbors`    | number of neighbors                                            |
//! | `MinWeight`       | product of neighbor cardinalities                              |
//! | `MinFill`         | number of fill edges introduced                                |
//! | `WeightedMinFill` | sum over fill edges of the product of the endpoint cardinalities |
//!
//! # References
//!
//! - D. Koller & N. Friedman. "Probabilistic Graphical Models." MIT Press, 2009. Section 9.4.3.
//! - U. Kjaerulff. "Triangulation of graphs: algorithms giving small total state space." 1990.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use log::debug;
use num_bigint::BigUint;

use crate::factor::Factor;
use crate::utils::big_table_size;

/// Undirected graph of variables that share a factor.
#[derive(Debug, Clone, Default)]
pub struct InteractionGraph {
    cardinalities: BTreeMap<String, usize>,
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl InteractionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph induced by the scopes of `factors`.
    pub fn from_factors<'a>(factors: impl IntoIterator<Item = &'a Factor>) -> Self {
        let mut graph = Self::new();
        for factor in factors {
            graph.add_clique(factor.scope().iter().map(|v| (v.name(), v.cardinality())));
        }
        graph
    }

    /// Adds the given variables and connects them pairwise.
    pub fn add_clique<'a>(&mut self, vars: impl IntoIterator<Item = (&'a str, usize)>) {
        let vars: Vec<(&str, usize)> = vars.into_iter().collect();
        for &(name, card) in &vars {
            self.cardinalities.insert(name.to_string(), card);
            let neighbors = self.adjacency.entry(name.to_string()).or_default();
            for &(other, _) in &vars {
                if other != name {
                    neighbors.insert(other.to_string());
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adjacency.contains_key(name)
    }

    pub fn neighbors(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.adjacency.get(name)
    }

    pub fn cardinality(&self, name: &str) -> Option<usize> {
        self.cardinalities.get(name).copied()
    }

    /// Pairs of neighbors of `name` that are not yet adjacent.
    pub fn fill_edges(&self, name: &str) -> Vec<(&str, &str)> {
        let Some(neighbors) = self.adjacency.get(name) else {
            return Vec::new();
        };
        let neighbors: Vec<&String> = neighbors.iter().collect();
        let mut fill = Vec::new();
        for (i, a) in neighbors.iter().enumerate() {
            for b in &neighbors[i + 1..] {
                if !self.adjacency[a.as_str()].contains(b.as_str()) {
                    fill.push((a.as_str(), b.as_str()));
                }
            }
        }
        fill
    }

    /// Removes `name`, connecting its former neighbors pairwise.
    pub fn eliminate(&mut self, name: &str) {
        let Some(neighbors) = self.adjacency.remove(name) else {
            return;
        };
        for a in &neighbors {
            let entry = self.adjacency.entry(a.clone()).or_default();
            entry.remove(name);
            for b in &neighbors {
                if a != b {
                    entry.insert(b.clone());
                }
            }
        }
    }

    /// Size of the factor created by eliminating `name` next: its own cardinality times
    /// the cardinalities of its neighbors.
    fn clique_size(&self, name: &str) -> BigUint {
        let own = self.cardinality(name).unwrap_or(1);
        big_table_size(std::iter::once(own).chain(self.neighbor_cardinalities(name)))
    }

    fn neighbor_cardinalities<'a>(&'a self, name: &str) -> impl Iterator<Item = usize> + 'a {
        self.adjacency
            .get(name)
            .into_iter()
            .flatten()
            .map(|n| self.cardinalities[n.as_str()])
    }

    /// Cost of eliminating variables in the given order.
    ///
    /// Variables unknown to the graph contribute a table of size 1.
    pub fn elimination_cost<S: AsRef<str>>(&self, order: &[S]) -> EliminationCost {
        let mut graph = self.clone();
        let mut cost = EliminationCost::default();
        for name in order {
            let name = name.as_ref();
            let size = graph.clique_size(name);
            let width = graph.neighbors(name).map_or(0, BTreeSet::len);
            cost.total_size += &size;
            if size > cost.peak_size {
                cost.peak_size = size;
            }
            cost.induced_width = cost.induced_width.max(width);
            graph.eliminate(name);
        }
        cost
    }
}

/// Cost summary of an elimination order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct EliminationCost {
    /// Largest intermediate table (number of entries)
    pub peak_size: BigUint,
    /// Sum of the sizes of all intermediate tables
    pub total_size: BigUint,
    /// Largest neighbor count of an eliminated variable
    pub induced_width: usize,
}

/// Checks that `order` lists every variable of `to_eliminate` exactly once and nothing else.
pub fn is_valid_order<S: AsRef<str>>(order: &[S], to_eliminate: &BTreeSet<String>) -> bool {
    if order.len() != to_eliminate.len() {
        return false;
    }
    let seen: BTreeSet<&str> = order.iter().map(AsRef::as_ref).collect();
    seen.len() == order.len() && seen.iter().all(|name| to_eliminate.contains(*name))
}

/// Strategy that chooses an elimination order.
pub trait EliminationOrdering {
    /// Orders `to_eliminate` for elimination over `graph`.
    fn elimination_order(&self, graph: &InteractionGraph, to_eliminate: &BTreeSet<String>) -> Vec<String>;
}

/// Greedy elimination heuristics.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Heuristic {
    #[default]
    MinFill,
    MinNeighbors,
    MinWeight,
    WeightedMinFill,
}

impl Heuristic {
    pub const ALL: [Heuristic; 4] = [
        Heuristic::MinFill,
        Heuristic::MinNeighbors,
        Heuristic::MinWeight,
        Heuristic::WeightedMinFill,
    ];

    /// Score of eliminating `name` next. Lower is better.
    pub fn score(self, graph: &InteractionGraph, name: &str) -> BigUint {
        match self {
            Heuristic::MinNeighbors => BigUint::from(graph.neighbors(name).map_or(0, BTreeSet::len)),
            Heuristic::MinWeight => big_table_size(graph.neighbor_cardinalities(name)),
            Heuristic::MinFill => BigUint::from(graph.fill_edges(name).len()),
            Heuristic::WeightedMinFill => graph
                .fill_edges(name)
                .into_iter()
                .map(|(a, b)| {
                    let ca = graph.cardinality(a).unwrap_or(1);
                    let cb = graph.cardinality(b).unwrap_or(1);
                    BigUint::from(ca) * BigUint::from(cb)
                })
                .sum(),
        }
    }
}

impl EliminationOrdering for Heuristic {
    fn elimination_order(&self, graph: &InteractionGraph, to_eliminate: &BTreeSet<String>) -> Vec<String> {
        let mut graph = graph.clone();
        let mut remaining = to_eliminate.clone();
        let mut order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            // `remaining` iterates in name order, so the first minimum wins ties.
            let mut best: Option<(BigUint, &String)> = None;
            for name in &remaining {
                let score = self.score(&graph, name);
                if best.as_ref().map_or(true, |(s, _)| score < *s) {
                    best = Some((score, name));
                }
            }
            let Some((score, name)) = best else {
                break;
            };
            let name = name.clone();
            debug!("{}: eliminate {} (score = {})", self, name, score);

            graph.eliminate(&name);
            remaining.remove(&name);
            order.push(name);
        }

        order
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Heuristic::MinFill => "min-fill",
            Heuristic::MinNeighbors => "min-neighbors",
            Heuristic::MinWeight => "min-weight",
            Heuristic::WeightedMinFill => "weighted-min-fill",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Heuristic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Heuristic::ALL
            .into_iter()
            .find(|h| h.to_string() == s)
            .ok_or_else(|| format!("unknown heuristic '{}'", s))
    }
}

/// A caller-supplied order, used as is.
///
/// The inference engine rejects it unless it lists exactly the variables to eliminate.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FixedOrder(pub Vec<String>);

impl FixedOrder {
    pub fn new<S: Into<String>>(order: impl IntoIterator<Item = S>) -> Self {
        FixedOrder(order.into_iter().map(Into::into).collect())
    }
}

impl EliminationOrdering for FixedOrder {
    fn elimination_order(&self, _graph: &InteractionGraph, _to_eliminate: &BTreeSet<String>) -> Vec<String> {
        self.0.clone()
    }
}
