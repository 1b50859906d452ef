//! Writers for a selected part of a reaction network.
//!
//! The text format has one block per kind of stationary point:
//!
//! ```text
//! > <id> title
//! > <wells>
//! name energy
//! > <bimolec>
//! name energy
//! > <ts>
//! name barrier reactant product [red]
//! ```
//!
//! Energies are kcal/mol with two decimals. Highlighted reactions end in `red`.

use super::error::NetworkError;
use super::graph::{NodeKind, ReactionNetwork};
use super::query::Selection;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Replace chemids and reaction names by `w_N`, `pr_N` and `rxn_N`.
    pub short_names: bool,
}

/// Display names of nodes and reactions, in selection order.
pub(super) struct Names {
    pub(super) nodes: HashMap<usize, String>,
    pub(super) reactions: HashMap<usize, String>,
}

impl Names {
    pub(super) fn new(network: &ReactionNetwork, selection: &Selection, short: bool) -> Self {
        let mut nodes = HashMap::new();
        let (mut wells, mut products) = (0, 0);
        for node in selection.nodes(network) {
            let name = if !short {
                network.node(node).name.clone()
            } else if network.node(node).kind == NodeKind::Well {
                wells += 1;
                format!("w_{wells}")
            } else {
                products += 1;
                format!("pr_{products}")
            };
            nodes.insert(node, name);
        }
        let reactions = selection
            .reactions
            .iter()
            .enumerate()
            .map(|(n, &edge)| {
                let name = if short {
                    format!("rxn_{}", n + 1)
                } else {
                    network.edges()[edge].name.clone()
                };
                (edge, name)
            })
            .collect();
        Self { nodes, reactions }
    }
}

pub fn to_text(
    network: &ReactionNetwork,
    selection: &Selection,
    title: &str,
    options: ExportOptions,
) -> String {
    let names = Names::new(network, selection, options.short_names);
    let nodes = selection.nodes(network);
    let mut out = String::new();

    let _ = writeln!(out, "> <id> {title}");
    let _ = writeln!(out, "> <wells>");
    for &node in nodes.iter().filter(|&&n| network.node(n).kind == NodeKind::Well) {
        let _ = writeln!(out, "{} {:.2}", names.nodes[&node], network.node(node).energy);
    }
    let _ = writeln!(out, "> <bimolec>");
    for &node in nodes.iter().filter(|&&n| network.node(n).kind == NodeKind::Bimolecular) {
        let _ = writeln!(out, "{} {:.2}", names.nodes[&node], network.node(node).energy);
    }
    let _ = writeln!(out, "> <ts>");
    for &edge in &selection.reactions {
        let reaction = &network.edges()[edge];
        let _ = write!(
            out,
            "{} {:.2} {} {}",
            names.reactions[&edge],
            reaction.barrier,
            names.nodes[&reaction.reactant],
            names.nodes[&reaction.product]
        );
        if selection.highlight.contains(&edge) {
            out.push_str(" red");
        }
        out.push('\n');
    }
    out
}

#[derive(Debug, Serialize)]
struct NodeEntry<'a> {
    name: &'a str,
    chemid: &'a str,
    kind: NodeKind,
    energy: f64,
    parent: &'a str,
}

#[derive(Debug, Serialize)]
struct ReactionEntry<'a> {
    name: &'a str,
    instance: &'a str,
    family: &'a str,
    barrier: f64,
    reactant: &'a str,
    product: &'a str,
    highlighted: bool,
}

#[derive(Debug, Serialize)]
struct NetworkDocument<'a> {
    title: &'a str,
    nodes: Vec<NodeEntry<'a>>,
    reactions: Vec<ReactionEntry<'a>>,
}

pub fn to_json(
    network: &ReactionNetwork,
    selection: &Selection,
    title: &str,
    options: ExportOptions,
) -> Result<String, NetworkError> {
    let names = Names::new(network, selection, options.short_names);
    let nodes = selection
        .nodes(network)
        .into_iter()
        .map(|id| {
            let node = network.node(id);
            NodeEntry {
                name: &names.nodes[&id],
                chemid: &node.name,
                kind: node.kind,
                energy: node.energy,
                parent: &node.parent,
            }
        })
        .collect();
    let reactions = selection
        .reactions
        .iter()
        .map(|&edge| {
            let reaction = &network.edges()[edge];
            ReactionEntry {
                name: &names.reactions[&edge],
                instance: &reaction.name,
                family: &reaction.family,
                barrier: reaction.barrier,
                reactant: &names.nodes[&reaction.reactant],
                product: &names.nodes[&reaction.product],
                highlighted: selection.highlight.contains(&edge),
            }
        })
        .collect();
    let document = NetworkDocument {
        title,
        nodes,
        reactions,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn write_text(
    path: &Path,
    network: &ReactionNetwork,
    selection: &Selection,
    title: &str,
    options: ExportOptions,
) -> Result<(), NetworkError> {
    fs::write(path, to_text(network, selection, title, options)).map_err(|source| {
        NetworkError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

pub fn write_json(
    path: &Path,
    network: &ReactionNetwork,
    selection: &Selection,
    title: &str,
    options: ExportOptions,
) -> Result<(), NetworkError> {
    let json = to_json(network, selection, title, options)?;
    fs::write(path, json).map_err(|source| NetworkError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::graph::tests::{reaction, species};
    use crate::network::query::Query;
    use tempfile::tempdir;

    fn network() -> ReactionNetwork {
        ReactionNetwork::assemble(&[
            species(
                "A",
                0.0,
                vec![
                    reaction("A", &["B"], 10.0, -1.5),
                    reaction("A", &["Y", "X"], 25.25, 4.0),
                ],
            ),
            species("B", -1.5, vec![reaction("B", &["C"], 5.0, -2.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn text_export_lists_every_block() {
        let network = network();
        let selection = network.select(&Query::All).unwrap();
        let text = to_text(&network, &selection, "demo", ExportOptions::default());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "> <id> demo");
        assert_eq!(lines[1], "> <wells>");
        assert_eq!(lines[2], "A 0.00");
        assert_eq!(lines[3], "B -1.50");
        assert_eq!(lines[4], "C -2.00");
        assert_eq!(lines[5], "> <bimolec>");
        assert_eq!(lines[6], "X_Y 4.00");
        assert_eq!(lines[7], "> <ts>");
        assert_eq!(lines[8], "A_to_B 10.00 A B");
        assert_eq!(lines[9], "A_to_Y_X 25.25 A X_Y");
    }

    #[test]
    fn short_names_and_highlights() {
        let network = network();
        let selection = network
            .select(&Query::AllPaths {
                from: "A".to_string(),
                to: "C".to_string(),
            })
            .unwrap();
        let options = ExportOptions { short_names: true };
        let text = to_text(&network, &selection, "demo", options);

        assert!(text.contains("w_1 0.00\n"));
        assert!(text.contains("rxn_1 10.00 w_1 w_2 red\n"));
        assert!(text.contains("rxn_2 5.00 w_2 w_3 red\n"));
        assert!(!text.contains("pr_1"));
    }

    #[test]
    fn json_export_is_written() {
        let dir = tempdir().unwrap();
        let network = network();
        let selection = network.select(&Query::Well("B".to_string())).unwrap();
        let path = dir.path().join("network.json");
        write_json(&path, &network, &selection, "demo", ExportOptions::default()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["title"], "demo");
        assert_eq!(value["reactions"].as_array().unwrap().len(), 2);
        assert_eq!(value["nodes"][0]["kind"], "well");
    }
}
