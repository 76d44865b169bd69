//! Exact inference by variable elimination.
//!
//! # Algorithm
//!
//! For a query `P(targets | evidence)`:
//!
//! 1. Every CPD is reduced to the evidence, removing observed variables from all scopes.
//! 2. An [`EliminationOrdering`] orders the variables that are neither targets nor evidence.
//! 3. For each variable `v` in that order, all factors mentioning `v` are multiplied and
//!    `v` is summed out of the product, which replaces them in the working pool.
//! 4. The remaining factors are multiplied; their joint scope is exactly the targets.
//! 5. The result is normalized.
//!
//! Step 3 is inherently sequential: each elimination consumes the pool produced by the
//! previous one. Independent queries, however, share nothing mutable: the engine only
//! borrows the network, so one engine may serve many threads at once.
//!
//! Before step 1, CPDs of *barren* variables (those that are not ancestors of any target
//! or evidence variable) are dropped when [`InferenceConfig::prune`] is set. Summing a
//! barren variable out contributes a factor of exactly one, so the result is unchanged.
//!
//! # Example
//!
//! ```
//! use bayes_rs::factor::Factor;
//! use bayes_rs::inference::{Inference, VariableElimination};
//! use bayes_rs::network::BayesianNetwork;
//! use bayes_rs::types::Evidence;
//!
//! let mut bn = BayesianNetwork::new();
//! let rain = bn.add_variable("Rain", 2).unwrap();
//! let wet = bn.add_variable("Wet", 2).unwrap();
//! bn.add_edge("Rain", "Wet").unwrap();
//! bn.set_cpd("Rain", Factor::cpd(&rain, &[], &[[0.8], [0.2]]).unwrap()).unwrap();
//! bn.set_cpd("Wet", Factor::cpd(&wet, &[rain], &[[0.9, 0.1], [0.1, 0.9]]).unwrap()).unwrap();
//!
//! let engine = VariableElimination::new(&bn).unwrap();
//! let posterior = engine.query(&["Rain"], &Evidence::from([("Wet", 1)])).unwrap();
//! // P(Rain=1 | Wet=1) = 0.18 / (0.08 + 0.18)
//! assert!((posterior.get(&[1]) - 0.18 / 0.26).abs() < 1e-12);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::error::{Error, Result};
use crate::factor::Factor;
use crate::network::BayesianNetwork;
use crate::planner::{is_valid_order, EliminationCost, EliminationOrdering, Heuristic, InteractionGraph};
use crate::types::{Assignment, Evidence};

/// An exact or approximate inference algorithm over a fixed network.
pub trait Inference {
    /// Computes the normalized posterior `P(targets | evidence)`.
    ///
    /// The scope of the returned factor lists `targets` in the given order.
    /// An empty `targets` list fails with [`Error::InvalidQuery`] whose `variable` is the
    /// empty string, since no single variable is at fault.
    fn query(&self, targets: &[&str], evidence: &Evidence) -> Result<Factor>;
}

/// Configuration of [`VariableElimination`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InferenceConfig {
    /// Heuristic used to order eliminations (default: min-fill)
    pub ordering: Heuristic,
    /// Drop CPDs of barren variables before eliminating (default: true)
    pub prune: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            ordering: Heuristic::MinFill,
            prune: true,
        }
    }
}

/// Elimination order chosen for a query, with its cost.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EliminationPlan {
    pub order: Vec<String>,
    pub cost: EliminationCost,
}

/// Variable elimination over a validated network.
#[derive(Debug, Clone)]
pub struct VariableElimination<'a> {
    network: &'a BayesianNetwork,
    config: InferenceConfig,
}

impl<'a> VariableElimination<'a> {
    /// Creates an engine with the default configuration.
    ///
    /// Fails with the first violated invariant if the network does not pass
    /// [`check_model`][BayesianNetwork::check_model].
    pub fn new(network: &'a BayesianNetwork) -> Result<Self> {
        Self::with_config(network, InferenceConfig::default())
    }

    pub fn with_config(network: &'a BayesianNetwork, config: InferenceConfig) -> Result<Self> {
        network.check_model()?;
        Ok(Self { network, config })
    }

    pub fn network(&self) -> &'a BayesianNetwork {
        self.network
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Like [`query`][Inference::query], but with an explicit elimination strategy.
    pub fn query_with_ordering(
        &self,
        targets: &[&str],
        evidence: &Evidence,
        ordering: &dyn EliminationOrdering,
    ) -> Result<Factor> {
        self.check_targets(targets)?;
        self.joint(targets, evidence, ordering)?.normalize()
    }

    /// Normalized marginal of each target separately.
    pub fn query_marginals(&self, targets: &[&str], evidence: &Evidence) -> Result<BTreeMap<String, Factor>> {
        let joint = self.query(targets, evidence)?;
        let mut marginals = BTreeMap::new();
        for &target in targets {
            let others: Vec<&str> = targets.iter().copied().filter(|&t| t != target).collect();
            let marginal = expect_consistent(joint.marginalize(&others));
            marginals.insert(target.to_string(), marginal.normalize()?);
        }
        Ok(marginals)
    }

    /// Most probable joint state of `targets` given `evidence`.
    ///
    /// Non-target variables are summed out. With no targets, every non-evidence variable is
    /// a target. Ties resolve to the assignment that comes first in table order.
    pub fn map_query(&self, targets: &[&str], evidence: &Evidence) -> Result<Assignment> {
        let all: Vec<&str>;
        let targets = if targets.is_empty() {
            all = self
                .network
                .variables()
                .map(|v| v.name())
                .filter(|name| !evidence.contains(name))
                .collect();
            &all[..]
        } else {
            targets
        };

        let posterior = self.query(targets, evidence)?;
        let states = posterior.argmax();
        Ok(targets.iter().map(|t| t.to_string()).zip(states).collect())
    }

    /// Marginal probability of the evidence, `P(evidence)`.
    pub fn probability_of_evidence(&self, evidence: &Evidence) -> Result<f64> {
        let joint = self.joint(&[], evidence, &self.config.ordering)?;
        Ok(joint.sum())
    }

    /// Elimination order and cost the engine would use for a query.
    pub fn plan(&self, targets: &[&str], evidence: &Evidence) -> Result<EliminationPlan> {
        self.check_targets(targets)?;
        self.check_query(targets, evidence)?;
        let pool = self.working_factors(targets, evidence);
        let graph = InteractionGraph::from_factors(&pool);
        let order = self.elimination_order(&graph, targets, evidence, &self.config.ordering)?;
        let cost = graph.elimination_cost(&order);
        Ok(EliminationPlan { order, cost })
    }

    fn check_targets(&self, targets: &[&str]) -> Result<()> {
        if targets.is_empty() {
            return Err(Error::invalid_query("", "no target variables"));
        }
        Ok(())
    }

    fn check_query(&self, targets: &[&str], evidence: &Evidence) -> Result<()> {
        let mut seen = BTreeSet::new();
        for &target in targets {
            if !self.network.contains(target) {
                return Err(Error::invalid_query(target, "unknown variable"));
            }
            if !seen.insert(target) {
                return Err(Error::invalid_query(target, "listed twice among targets"));
            }
            if evidence.contains(target) {
                return Err(Error::invalid_query(target, "variable is both target and evidence"));
            }
        }
        for (name, state) in evidence.iter() {
            let Some(var) = self.network.variable(name) else {
                return Err(Error::invalid_query(name, "unknown variable"));
            };
            if !var.has_state(state) {
                return Err(Error::invalid_query(
                    name,
                    format!("state {} out of range 0..{}", state, var.cardinality()),
                ));
            }
        }
        Ok(())
    }

    /// Evidence-reduced CPDs, without barren variables if pruning is enabled.
    fn working_factors(&self, targets: &[&str], evidence: &Evidence) -> Vec<Factor> {
        let relevant = if self.config.prune {
            let mut names: Vec<&str> = targets.to_vec();
            names.extend(evidence.names());
            Some(self.network.ancestors(&names))
        } else {
            None
        };

        let mut pool = Vec::new();
        for (name, cpd) in self.network.cpds() {
            if relevant.as_ref().map_or(true, |r| r.contains(name)) {
                pool.push(expect_consistent(cpd.reduce(evidence)));
            } else {
                debug!("prune barren variable {}", name);
            }
        }
        pool
    }

    fn elimination_order(
        &self,
        graph: &InteractionGraph,
        targets: &[&str],
        evidence: &Evidence,
        ordering: &dyn EliminationOrdering,
    ) -> Result<Vec<String>> {
        let to_eliminate: BTreeSet<String> = self
            .network
            .variables()
            .map(|v| v.name())
            .filter(|name| !targets.contains(name) && !evidence.contains(name))
            .map(str::to_string)
            .collect();

        let order = ordering.elimination_order(graph, &to_eliminate);
        if !is_valid_order(&order, &to_eliminate) {
            let offender = order
                .iter()
                .find(|name| !to_eliminate.contains(*name))
                .or_else(|| to_eliminate.iter().find(|name| !order.contains(name)))
                .cloned()
                .unwrap_or_default();
            return Err(Error::invalid_query(
                offender,
                format!("elimination order must list exactly {:?}", to_eliminate),
            ));
        }
        Ok(order)
    }

    /// Unnormalized joint factor over `targets`, in the given order.
    fn joint(&self, targets: &[&str], evidence: &Evidence, ordering: &dyn EliminationOrdering) -> Result<Factor> {
        self.check_query(targets, evidence)?;

        let mut pool = self.working_factors(targets, evidence);
        let graph = InteractionGraph::from_factors(&pool);
        let order = self.elimination_order(&graph, targets, evidence, ordering)?;
        debug!("query(targets = {:?}, evidence = {}) with order {:?}", targets, evidence, order);

        for var in &order {
            let (involved, rest): (Vec<Factor>, Vec<Factor>) = pool.into_iter().partition(|f| f.contains(var));
            pool = rest;
            if involved.is_empty() {
                continue;
            }
            let product = multiply(&involved);
            let summed = expect_consistent(product.marginalize_out(var));
            debug!(
                "eliminate {}: {} factors, product size {}, result scope {:?}",
                var,
                involved.len(),
                product.len(),
                summed.names()
            );
            pool.push(summed);
        }

        let joint = multiply(&pool);
        Ok(expect_consistent(joint.reorder(targets)))
    }
}

impl Inference for VariableElimination<'_> {
    fn query(&self, targets: &[&str], evidence: &Evidence) -> Result<Factor> {
        self.query_with_ordering(targets, evidence, &self.config.ordering)
    }
}

fn multiply(factors: &[Factor]) -> Factor {
    factors
        .iter()
        .fold(Factor::unit(), |acc, f| expect_consistent(acc.product(f)))
}

/// Unwraps the result of an algebra step whose preconditions the engine has established.
///
/// A failure here is a defect in the engine, not a user error.
fn expect_consistent<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("variable elimination reached an inconsistent state: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::planner::FixedOrder;
    use crate::types::Variable;

    /// Cloudy -> {Sprinkler, Rain} -> WetGrass.
    fn sprinkler() -> BayesianNetwork {
        let mut bn = BayesianNetwork::new();
        let c = bn.add_variable("Cloudy", 2).unwrap();
        let s = bn.add_variable("Sprinkler", 2).unwrap();
        let r = bn.add_variable("Rain", 2).unwrap();
        let w = bn.add_variable("WetGrass", 2).unwrap();
        bn.add_edge("Cloudy", "Sprinkler").unwrap();
        bn.add_edge("Cloudy", "Rain").unwrap();
        bn.add_edge("Sprinkler", "WetGrass").unwrap();
        bn.add_edge("Rain", "WetGrass").unwrap();
        bn.set_cpd("Cloudy", Factor::cpd(&c, &[], &[[0.5], [0.5]]).unwrap()).unwrap();
        bn.set_cpd("Sprinkler", Factor::cpd(&s, &[c.clone()], &[[0.5, 0.9], [0.5, 0.1]]).unwrap())
            .unwrap();
        bn.set_cpd("Rain", Factor::cpd(&r, &[c], &[[0.8, 0.2], [0.2, 0.8]]).unwrap())
            .unwrap();
        bn.set_cpd(
            "WetGrass",
            Factor::cpd(&w, &[s, r], &[[1.0, 0.1, 0.1, 0.01], [0.0, 0.9, 0.9, 0.99]]).unwrap(),
        )
        .unwrap();
        bn
    }

    /// Posterior by brute-force enumeration of the full joint.
    fn brute_force(bn: &BayesianNetwork, targets: &[&str], evidence: &Evidence) -> Factor {
        let mut joint = Factor::unit();
        for (_, cpd) in bn.cpds() {
            joint = joint.product(cpd).unwrap();
        }
        let joint = joint.reduce(evidence).unwrap();
        let others: Vec<String> = joint
            .names()
            .into_iter()
            .filter(|n| !targets.contains(n))
            .map(str::to_string)
            .collect();
        joint.marginalize(&others).unwrap().reorder(targets).unwrap().normalize().unwrap()
    }

    #[test]
    fn test_prior_marginal() {
        let bn = sprinkler();
        let ve = VariableElimination::new(&bn).unwrap();
        let p = ve.query(&["Rain"], &Evidence::new()).unwrap();
        assert!(p.approx_eq(&Factor::new(vec![Variable::binary("Rain")], vec![0.5, 0.5]).unwrap(), 1e-12));
    }

    #[test]
    fn test_matches_brute_force() {
        let bn = sprinkler();
        let ve = VariableElimination::new(&bn).unwrap();
        let cases: Vec<(Vec<&str>, Evidence)> = vec![
            (vec!["Rain"], Evidence::from([("WetGrass", 1)])),
            (vec!["Sprinkler"], Evidence::from([("WetGrass", 1), ("Cloudy", 0)])),
            (vec!["Cloudy", "Rain"], Evidence::from([("WetGrass", 0)])),
            (vec!["WetGrass", "Cloudy"], Evidence::new()),
        ];
        for (targets, evidence) in cases {
            let expected = brute_force(&bn, &targets, &evidence);
            let actual = ve.query(&targets, &evidence).unwrap();
            assert_eq!(actual.names(), targets);
            assert!(actual.approx_eq(&expected, 1e-12), "{:?} | {}", targets, evidence);
        }
    }

    #[test]
    fn test_pruning_does_not_change_result() {
        let bn = sprinkler();
        let pruned = VariableElimination::new(&bn).unwrap();
        let full = VariableElimination::with_config(
            &bn,
            InferenceConfig {
                prune: false,
                ..InferenceConfig::default()
            },
        )
        .unwrap();
        let evidence = Evidence::from([("Sprinkler", 1)]);
        let a = pruned.query(&["Cloudy"], &evidence).unwrap();
        let b = full.query(&["Cloudy"], &evidence).unwrap();
        assert!(a.approx_eq(&b, 1e-12));
    }

    #[test]
    fn test_fixed_orders_agree() {
        let bn = sprinkler();
        let ve = VariableElimination::new(&bn).unwrap();
        let evidence = Evidence::from([("WetGrass", 1)]);
        let a = ve
            .query_with_ordering(&["Rain"], &evidence, &FixedOrder::new(["Cloudy", "Sprinkler"]))
            .unwrap();
        let b = ve
            .query_with_ordering(&["Rain"], &evidence, &FixedOrder::new(["Sprinkler", "Cloudy"]))
            .unwrap();
        assert!(a.approx_eq(&b, 1e-9));
    }

    #[test]
    fn test_fixed_order_must_match() {
        let bn = sprinkler();
        let ve = VariableElimination::new(&bn).unwrap();
        let err = ve
            .query_with_ordering(&["Rain"], &Evidence::new(), &FixedOrder::new(["Cloudy"]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { ref variable, .. } if variable == "Sprinkler"));

        let err = ve
            .query_with_ordering(
                &["Rain"],
                &Evidence::new(),
                &FixedOrder::new(["Cloudy", "Sprinkler", "WetGrass", "Rain"]),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { ref variable, .. } if variable == "Rain"));
    }

    #[test]
    fn test_invalid_queries() {
        let bn = sprinkler();
        let ve = VariableElimination::new(&bn).unwrap();
        let offender = |r: Result<Factor>| match r {
            Err(Error::InvalidQuery { variable, .. }) => variable,
            other => panic!("expected InvalidQuery, got {:?}", other),
        };
        assert_eq!(offender(ve.query(&["Fog"], &Evidence::new())), "Fog");
        assert_eq!(offender(ve.query(&["Rain"], &Evidence::from([("Fog", 0)]))), "Fog");
        assert_eq!(offender(ve.query(&["Rain"], &Evidence::from([("Cloudy", 2)]))), "Cloudy");
        assert_eq!(offender(ve.query(&["Rain"], &Evidence::from([("Rain", 1)]))), "Rain");
        assert_eq!(offender(ve.query(&["Rain", "Rain"], &Evidence::new())), "Rain");
        assert_eq!(offender(ve.query(&[], &Evidence::new())), "");
    }

    #[test]
    fn test_invalid_network_rejected() {
        let mut bn = sprinkler();
        let c = bn.variable("Cloudy").unwrap().clone();
        bn.replace_cpd("Cloudy", Factor::cpd(&c, &[], &[[0.5], [0.6]]).unwrap())
            .unwrap();
        assert!(matches!(VariableElimination::new(&bn), Err(Error::NotNormalized { .. })));
    }

    #[test]
    fn test_degenerate_evidence() {
        let bn = sprinkler();
        let ve = VariableElimination::new(&bn).unwrap();
        // The grass is never wet when neither the sprinkler nor the rain is on.
        let evidence = Evidence::from([("Sprinkler", 0), ("Rain", 0), ("WetGrass", 1)]);
        let result = ve.query(&["Cloudy"], &evidence);
        assert_eq!(result, Err(Error::DegenerateDistribution { sum: 0.0 }));
    }

    #[test]
    fn test_query_marginals() {
        let bn = sprinkler();
        let ve = VariableElimination::new(&bn).unwrap();
        let evidence = Evidence::from([("WetGrass", 1)]);
        let marginals = ve.query_marginals(&["Sprinkler", "Rain"], &evidence).unwrap();
        assert_eq!(marginals.len(), 2);
        let rain = ve.query(&["Rain"], &evidence).unwrap();
        assert!(marginals["Rain"].approx_eq(&rain, 1e-12));
        let sprinkler = ve.query(&["Sprinkler"], &evidence).unwrap();
        assert!(marginals["Sprinkler"].approx_eq(&sprinkler, 1e-12));
    }

    #[test]
    fn test_map_query() {
        let bn = sprinkler();
        let ve = VariableElimination::new(&bn).unwrap();
        let evidence = Evidence::from([("WetGrass", 1)]);
        let map = ve.map_query(&["Rain"], &evidence).unwrap();
        assert_eq!(map.get("Rain"), Some(&1));

        // Without targets, every non-evidence variable is assigned.
        let mpe = ve.map_query(&[], &evidence).unwrap();
        assert_eq!(mpe.keys().map(String::as_str).collect::<Vec<_>>(), vec!["Cloudy", "Rain", "Sprinkler"]);
    }

    #[test]
    fn test_probability_of_evidence() {
        let bn = sprinkler();
        let ve = VariableElimination::new(&bn).unwrap();
        assert!((ve.probability_of_evidence(&Evidence::new()).unwrap() - 1.0).abs() < 1e-12);
        // P(Cloudy=1, Rain=1) = 0.5 * 0.8
        let p = ve
            .probability_of_evidence(&Evidence::from([("Cloudy", 1), ("Rain", 1)]))
            .unwrap();
        assert!((p - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_plan() {
        let bn = sprinkler();
        let ve = VariableElimination::new(&bn).unwrap();
        let plan = ve.plan(&["WetGrass"], &Evidence::new()).unwrap();
        assert_eq!(plan.order.len(), 3);
        assert!(plan.cost.peak_size <= num_bigint::BigUint::from(8u32));
    }

    #[test]
    fn test_concurrent_queries() {
        let bn = sprinkler();
        let ve = VariableElimination::new(&bn).unwrap();
        let expected = ve.query(&["Rain"], &Evidence::from([("WetGrass", 1)])).unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| ve.query(&["Rain"], &Evidence::from([("WetGrass", 1)])).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
