use std::collections::BTreeMap;

use clap::Parser;
use log::info;

use bayes_rs::factor::Factor;
use bayes_rs::inference::{Inference, InferenceConfig, VariableElimination};
use bayes_rs::network::BayesianNetwork;
use bayes_rs::planner::Heuristic;
use bayes_rs::types::Evidence;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Observed state of Sintoma1 (0 = absent, 1 = present).
    #[arg(long, value_name = "STATE")]
    s1: Option<usize>,

    /// Observed state of Sintoma2.
    #[arg(long, value_name = "STATE")]
    s2: Option<usize>,

    /// Observed state of Sintoma3.
    #[arg(long, value_name = "STATE")]
    s3: Option<usize>,

    /// Elimination heuristic: min-fill, min-neighbors, min-weight or weighted-min-fill.
    #[arg(long, value_name = "NAME", default_value = "min-fill")]
    heuristic: Heuristic,

    /// Keep barren variables instead of pruning them.
    #[arg(long)]
    no_prune: bool,

    /// Also print the network in DOT format.
    #[arg(long)]
    dot: bool,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

/// Three symptoms, each a parent of the disease.
fn build_network() -> color_eyre::Result<BayesianNetwork> {
    let mut bn = BayesianNetwork::new();
    let s1 = bn.add_variable("Sintoma1", 2)?;
    let s2 = bn.add_variable("Sintoma2", 2)?;
    let s3 = bn.add_variable("Sintoma3", 2)?;
    let disease = bn.add_variable("Doença", 2)?;
    for symptom in [&s1, &s2, &s3] {
        bn.add_edge(symptom.name(), disease.name())?;
    }

    bn.set_cpd("Sintoma1", Factor::cpd(&s1, &[], &[[0.8], [0.2]])?)?;
    bn.set_cpd("Sintoma2", Factor::cpd(&s2, &[], &[[0.6], [0.4]])?)?;
    bn.set_cpd("Sintoma3", Factor::cpd(&s3, &[], &[[0.7], [0.3]])?)?;

    // Columns run over (Sintoma1, Sintoma2, Sintoma3) in ascending binary order.
    let rows = [
        [0.99, 0.01, 0.05, 0.95, 0.05, 0.95, 0.01, 0.99],
        [0.01, 0.99, 0.95, 0.05, 0.95, 0.05, 0.99, 0.01],
    ];
    bn.set_cpd("Doença", Factor::cpd(&disease, &[s1, s2, s3], &rows)?)?;

    Ok(bn)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        if args.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();
    info!("args = {:?}", args);

    let bn = build_network()?;
    bn.check_model()?;
    info!("network has {} variables and {} edges", bn.len(), bn.edges().len());

    if args.dot {
        println!("{}", bn.to_dot()?);
    }

    let mut observed = BTreeMap::new();
    for (name, state) in [("Sintoma1", args.s1), ("Sintoma2", args.s2), ("Sintoma3", args.s3)] {
        if let Some(state) = state {
            observed.insert(name.to_string(), state);
        }
    }
    let evidence = Evidence::from(observed);

    let config = InferenceConfig {
        ordering: args.heuristic,
        prune: !args.no_prune,
    };
    let engine = VariableElimination::with_config(&bn, config)?;

    let plan = engine.plan(&["Doença"], &evidence)?;
    info!(
        "elimination order {:?}: peak factor size {}, induced width {}",
        plan.order, plan.cost.peak_size, plan.cost.induced_width
    );

    let posterior = engine.query(&["Doença"], &evidence)?;
    println!("P(Doença | {}):", evidence);
    println!("{}", posterior);

    if evidence.len() < 3 {
        let p = engine.probability_of_evidence(&evidence)?;
        println!("P({}) = {:.6}", evidence, p);

        let explanation = engine.map_query(&[], &evidence)?;
        println!("Most probable assignment: {:?}", explanation);
    }

    println!("\nAll done in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
