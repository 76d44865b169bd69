//! Network to DOT (Graphviz) conversion.
//!
//! The structure of a [`BayesianNetwork`] can be rendered with Graphviz tools like `dot`.
//!
//! # DOT Format
//!
//! - **Variables** are nodes, labelled with their name (and optionally their cardinality)
//! - **Root variables** (no parents) share the top rank
//! - **Edges** point from parent to child
//!
//! # Examples
//!
//! ```
//! use bayes_rs::network::BayesianNetwork;
//!
//! let mut bn = BayesianNetwork::new();
//! bn.add_variable("Rain", 2).unwrap();
//! bn.add_variable("Wet", 2).unwrap();
//! bn.add_edge("Rain", "Wet").unwrap();
//!
//! let dot = bn.to_dot().unwrap();
//! assert!(dot.contains("\"Rain\" -> \"Wet\";"));
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! ```

use std::fmt::Write as _;

use crate::network::BayesianNetwork;

/// Configuration options for DOT output generation.
///
/// Use `DotConfig::default()` for standard settings and override fields with
/// struct-update syntax:
///
/// ```
/// use bayes_rs::dot::DotConfig;
///
/// let config = DotConfig {
///     node_shape: "box",
///     ..DotConfig::default()
/// };
/// assert!(config.show_cardinality);
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for variable nodes (default: "ellipse")
    pub node_shape: &'static str,
    /// Style for parent-child edges (default: "solid")
    pub edge_style: &'static str,
    /// Graph direction (default: "TB")
    pub rank_dir: &'static str,
    /// Whether to show the number of states under the name (default: true)
    pub show_cardinality: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "ellipse",
            edge_style: "solid",
            rank_dir: "TB",
            show_cardinality: true,
        }
    }
}

impl BayesianNetwork {
    /// Converts the network structure to DOT format with default settings.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the network structure to DOT format.
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "rankdir={};", config.rank_dir)?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        for var in self.variables() {
            let label = if config.show_cardinality {
                format!("{}\\n({} states)", escape(var.name()), var.cardinality())
            } else {
                escape(var.name())
            };
            writeln!(dot, "\"{}\" [label=\"{}\"];", escape(var.name()), label)?;
        }

        let roots = self.roots();
        if !roots.is_empty() {
            write!(dot, "{{ rank=source;")?;
            for var in roots {
                write!(dot, " \"{}\";", escape(var.name()))?;
            }
            writeln!(dot, " }}")?;
        }

        for (parent, child) in self.edges() {
            if config.edge_style == "solid" {
                writeln!(dot, "\"{}\" -> \"{}\";", escape(parent), escape(child))?;
            } else {
                writeln!(
                    dot,
                    "\"{}\" -> \"{}\" [style={}];",
                    escape(parent),
                    escape(child),
                    config.edge_style
                )?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

fn escape(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}
