//! End-to-end queries on the symptom/disease network.

use bayes_rs::error::{ConstructionError, Error};
use bayes_rs::factor::Factor;
use bayes_rs::inference::{Inference, InferenceConfig, VariableElimination};
use bayes_rs::network::BayesianNetwork;
use bayes_rs::planner::{FixedOrder, Heuristic};
use bayes_rs::types::Evidence;
use test_log::test;

const DISEASE_ROWS: [[f64; 8]; 2] = [
    [0.99, 0.01, 0.05, 0.95, 0.05, 0.95, 0.01, 0.99],
    [0.01, 0.99, 0.95, 0.05, 0.95, 0.05, 0.99, 0.01],
];

/// Three binary symptoms, each a parent of the binary disease variable.
fn diagnosis() -> BayesianNetwork {
    let mut bn = BayesianNetwork::new();
    let s1 = bn.add_variable("Sintoma1", 2).unwrap();
    let s2 = bn.add_variable("Sintoma2", 2).unwrap();
    let s3 = bn.add_variable("Sintoma3", 2).unwrap();
    let d = bn.add_variable("Doença", 2).unwrap();
    for s in ["Sintoma1", "Sintoma2", "Sintoma3"] {
        bn.add_edge(s, "Doença").unwrap();
    }

    bn.set_cpd("Sintoma1", Factor::cpd(&s1, &[], &[[0.8], [0.2]]).unwrap()).unwrap();
    bn.set_cpd("Sintoma2", Factor::cpd(&s2, &[], &[[0.6], [0.4]]).unwrap()).unwrap();
    bn.set_cpd("Sintoma3", Factor::cpd(&s3, &[], &[[0.7], [0.3]]).unwrap()).unwrap();
    bn.set_cpd("Doença", Factor::cpd(&d, &[s1, s2, s3], &DISEASE_ROWS).unwrap())
        .unwrap();
    bn
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{:?} != {:?}", actual, expected);
    }
}

#[test]
fn test_full_evidence_reads_the_cpd_column() {
    let bn = diagnosis();
    let engine = VariableElimination::new(&bn).unwrap();

    // Parent assignment (1, 0, 1) is column 5.
    let evidence = Evidence::from([("Sintoma1", 1), ("Sintoma2", 0), ("Sintoma3", 1)]);
    let posterior = engine.query(&["Doença"], &evidence).unwrap();
    assert_eq!(posterior.names(), vec!["Doença"]);
    assert_close(posterior.values(), &[0.95, 0.05]);

    // All ones is the last column.
    let evidence = Evidence::from([("Sintoma1", 1), ("Sintoma2", 1), ("Sintoma3", 1)]);
    let posterior = engine.query(&["Doença"], &evidence).unwrap();
    assert_close(posterior.values(), &[0.99, 0.01]);
}

#[test]
fn test_every_column_with_full_evidence() {
    let bn = diagnosis();
    let engine = VariableElimination::new(&bn).unwrap();
    for column in 0..8 {
        let evidence = Evidence::from([
            ("Sintoma1", column >> 2 & 1),
            ("Sintoma2", column >> 1 & 1),
            ("Sintoma3", column & 1),
        ]);
        let posterior = engine.query(&["Doença"], &evidence).unwrap();
        assert_close(posterior.values(), &[DISEASE_ROWS[0][column], DISEASE_ROWS[1][column]]);
    }
}

#[test]
fn test_partial_evidence_matches_hand_computation() {
    let bn = diagnosis();
    let engine = VariableElimination::new(&bn).unwrap();
    let evidence = Evidence::from([("Sintoma1", 1)]);
    let posterior = engine.query(&["Doença"], &evidence).unwrap();

    // Sum over Sintoma2 and Sintoma3 of P(s2) P(s3) P(D = 1 | 1, s2, s3).
    let p2 = [0.6, 0.4];
    let p3 = [0.7, 0.3];
    let mut sick = 0.0;
    for s2 in 0..2 {
        for s3 in 0..2 {
            sick += p2[s2] * p3[s3] * DISEASE_ROWS[1][4 + 2 * s2 + s3];
        }
    }
    assert_close(posterior.values(), &[1.0 - sick, sick]);
}

#[test]
fn test_order_independence() {
    let bn = diagnosis();
    let evidence = Evidence::from([("Doença", 1)]);

    let reference = VariableElimination::new(&bn)
        .unwrap()
        .query(&["Sintoma1"], &evidence)
        .unwrap();

    for heuristic in Heuristic::ALL {
        for prune in [true, false] {
            let config = InferenceConfig { ordering: heuristic, prune };
            let engine = VariableElimination::with_config(&bn, config).unwrap();
            let posterior = engine.query(&["Sintoma1"], &evidence).unwrap();
            assert!(posterior.approx_eq(&reference, 1e-9), "{} (prune = {})", heuristic, prune);
        }
    }

    let engine = VariableElimination::new(&bn).unwrap();
    for order in [["Sintoma2", "Sintoma3"], ["Sintoma3", "Sintoma2"]] {
        let posterior = engine
            .query_with_ordering(&["Sintoma1"], &evidence, &FixedOrder::new(order))
            .unwrap();
        assert!(posterior.approx_eq(&reference, 1e-9), "{:?}", order);
    }
}

#[test]
fn test_explaining_away() {
    let bn = diagnosis();
    let engine = VariableElimination::new(&bn).unwrap();

    let sick = engine.query(&["Sintoma1"], &Evidence::from([("Doença", 1)])).unwrap();
    let prior = engine.query(&["Sintoma1"], &Evidence::new()).unwrap();
    assert_close(prior.values(), &[0.8, 0.2]);
    assert_ne!(sick.values(), prior.values());

    let joint = engine
        .query(&["Sintoma1", "Sintoma2"], &Evidence::from([("Doença", 1)]))
        .unwrap();
    assert_eq!(joint.names(), vec!["Sintoma1", "Sintoma2"]);
    assert!((joint.sum() - 1.0).abs() < 1e-9);
}

#[test]
fn test_probability_of_evidence() {
    let bn = diagnosis();
    let engine = VariableElimination::new(&bn).unwrap();
    let p = engine
        .probability_of_evidence(&Evidence::from([("Sintoma1", 1), ("Sintoma2", 0)]))
        .unwrap();
    assert!((p - 0.2 * 0.6).abs() < 1e-12);
}

#[test]
fn test_unnormalized_cpd_is_reported() {
    let mut bn = diagnosis();
    let s1 = bn.variable("Sintoma1").unwrap().clone();
    bn.replace_cpd("Sintoma1", Factor::cpd(&s1, &[], &[[0.8], [0.3]]).unwrap())
        .unwrap();

    match bn.check_model() {
        Err(Error::NotNormalized { variable, sum, .. }) => {
            assert_eq!(variable, "Sintoma1");
            assert!((sum - 1.1).abs() < 1e-12);
        }
        other => panic!("expected NotNormalized, got {:?}", other),
    }
    assert!(matches!(
        VariableElimination::new(&bn),
        Err(Error::NotNormalized { .. })
    ));
}

#[test]
fn test_wrong_parents_are_a_scope_mismatch() {
    let mut bn = diagnosis();
    let d = bn.variable("Doença").unwrap().clone();
    let s1 = bn.variable("Sintoma1").unwrap().clone();
    bn.replace_cpd("Doença", Factor::cpd(&d, &[s1], &[[0.5, 0.5], [0.5, 0.5]]).unwrap())
        .unwrap();

    match bn.check_model() {
        Err(Error::ScopeMismatch { variable, .. }) => assert_eq!(variable, "Doença"),
        other => panic!("expected ScopeMismatch, got {:?}", other),
    }
}

#[test]
fn test_missing_cpd_and_duplicates() {
    let mut bn = BayesianNetwork::new();
    let a = bn.add_variable("A", 2).unwrap();
    bn.add_variable("B", 2).unwrap();
    bn.add_edge("A", "B").unwrap();
    bn.set_cpd("A", Factor::cpd(&a, &[], &[[0.5], [0.5]]).unwrap()).unwrap();

    assert_eq!(bn.check_model(), Err(Error::MissingCpd("B".to_string())));

    let again = bn.set_cpd("A", Factor::cpd(&a, &[], &[[0.5], [0.5]]).unwrap());
    assert_eq!(again, Err(ConstructionError::DuplicateCpd("A".to_string())));
    assert_eq!(
        bn.add_variable("A", 2),
        Err(ConstructionError::DuplicateVariable("A".to_string()))
    );
}

#[test]
fn test_impossible_evidence_is_degenerate() {
    let mut bn = diagnosis();
    let s1 = bn.variable("Sintoma1").unwrap().clone();
    bn.replace_cpd("Sintoma1", Factor::cpd(&s1, &[], &[[1.0], [0.0]]).unwrap())
        .unwrap();
    let engine = VariableElimination::new(&bn).unwrap();

    let result = engine.query(&["Doença"], &Evidence::from([("Sintoma1", 1)]));
    assert!(matches!(result, Err(Error::DegenerateDistribution { .. })), "{:?}", result);
}

#[test]
fn test_invalid_queries() {
    let bn = diagnosis();
    let engine = VariableElimination::new(&bn).unwrap();

    let unknown = engine.query(&["Febre"], &Evidence::new());
    assert!(matches!(unknown, Err(Error::InvalidQuery { ref variable, .. }) if variable == "Febre"));

    let overlap = engine.query(&["Doença"], &Evidence::from([("Doença", 0)]));
    assert!(matches!(overlap, Err(Error::InvalidQuery { ref variable, .. }) if variable == "Doença"));

    let out_of_range = engine.query(&["Doença"], &Evidence::from([("Sintoma2", 2)]));
    assert!(matches!(out_of_range, Err(Error::InvalidQuery { ref variable, .. }) if variable == "Sintoma2"));

    let bad_order = engine.query_with_ordering(&["Doença"], &Evidence::new(), &FixedOrder::new(["Sintoma1"]));
    assert!(matches!(bad_order, Err(Error::InvalidQuery { .. })));
}

#[test]
fn test_posterior_display() {
    let bn = diagnosis();
    let engine = VariableElimination::new(&bn).unwrap();
    let evidence = Evidence::from([("Sintoma1", 1), ("Sintoma2", 0), ("Sintoma3", 1)]);
    let posterior = engine.query(&["Doença"], &evidence).unwrap();

    let table = posterior.to_string();
    assert!(table.contains("Doença(0)"));
    assert!(table.contains("0.9500"));
    assert!(table.contains("0.0500"));
}
