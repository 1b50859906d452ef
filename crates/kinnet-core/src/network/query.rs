use super::error::NetworkError;
use super::graph::{NodeKind, ReactionNetwork};
use crate::core::utils::units::GAS_CONSTANT_CAL;
use tracing::debug;

/// Longest path, in reactions, considered between two species.
pub const PATH_LENGTH_CUTOFF: usize = 5;

/// Smallest branching fraction a channel needs to be kept by the temperature filter.
pub const BRANCHING_CUTOFF: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    All,
    /// The path with the lowest highest barrier.
    LowestPath { from: String, to: String },
    /// Every path, with the lowest one highlighted.
    AllPaths { from: String, to: String },
    /// Every reaction of one species.
    Well(String),
    /// Channels reachable from the root well with a branching fraction above
    /// [`BRANCHING_CUTOFF`] at this temperature (K).
    Temperature(f64),
    /// Reactions whose barrier is below this value (kcal/mol).
    BarrierBelow(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub nodes: Vec<usize>,
    pub edges: Vec<usize>,
    /// Highest barrier along the path.
    pub bottleneck: f64,
}

/// Reactions picked by a query, as edge indices in selection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub reactions: Vec<usize>,
    pub highlight: Vec<usize>,
}

impl Selection {
    /// Nodes touched by the selected reactions, in network order.
    pub fn nodes(&self, network: &ReactionNetwork) -> Vec<usize> {
        (0..network.nodes().len())
            .filter(|&node| {
                self.reactions
                    .iter()
                    .any(|&e| network.edges()[e].touches(node))
            })
            .collect()
    }
}

impl ReactionNetwork {
    pub fn select(&self, query: &Query) -> Result<Selection, NetworkError> {
        let selection = match query {
            Query::All => Selection {
                reactions: (0..self.edges().len()).collect(),
                highlight: Vec::new(),
            },
            Query::LowestPath { from, to } => Selection {
                reactions: self
                    .bottleneck_path(from, to)?
                    .map(|path| path.edges)
                    .unwrap_or_default(),
                highlight: Vec::new(),
            },
            Query::AllPaths { from, to } => self.all_paths(from, to)?,
            Query::Well(name) => Selection {
                reactions: self.well_reactions(name)?,
                highlight: Vec::new(),
            },
            Query::Temperature(temperature) => {
                let Some(root) = self.wells().next() else {
                    return Err(NetworkError::NoSpecies);
                };
                Selection {
                    reactions: self.boltzmann_filter(&root.name, *temperature)?,
                    highlight: Vec::new(),
                }
            }
            Query::BarrierBelow(threshold) => Selection {
                reactions: self.barrier_below(*threshold),
                highlight: Vec::new(),
            },
        };
        debug!(?query, reactions = selection.reactions.len(), "Network query evaluated");
        Ok(selection)
    }

    /// Simple paths of at most [`PATH_LENGTH_CUTOFF`] reactions whose
    /// intermediate species are all wells, in depth-first order.
    pub fn paths(&self, from: &str, to: &str) -> Result<Vec<Path>, NetworkError> {
        let start = self.find(from)?;
        let end = self.find(to)?;
        let mut paths = Vec::new();
        if start != end {
            let mut nodes = vec![start];
            let mut edges = Vec::new();
            self.extend_paths(end, &mut nodes, &mut edges, &mut paths);
        }
        Ok(paths)
    }

    fn extend_paths(
        &self,
        end: usize,
        nodes: &mut Vec<usize>,
        edges: &mut Vec<usize>,
        paths: &mut Vec<Path>,
    ) {
        let Some(&current) = nodes.last() else {
            return;
        };
        for (next, edge) in self.neighbours(current) {
            if nodes.contains(&next) {
                continue;
            }
            let length = edges.len() + 1;
            if next == end {
                let mut path_edges = edges.clone();
                path_edges.push(edge);
                let mut path_nodes = nodes.clone();
                path_nodes.push(next);
                let bottleneck = path_edges
                    .iter()
                    .map(|&e| self.edges()[e].barrier)
                    .fold(f64::NEG_INFINITY, f64::max);
                paths.push(Path {
                    nodes: path_nodes,
                    edges: path_edges,
                    bottleneck,
                });
            } else if length < PATH_LENGTH_CUTOFF && self.node(next).kind == NodeKind::Well {
                nodes.push(next);
                edges.push(edge);
                self.extend_paths(end, nodes, edges, paths);
                nodes.pop();
                edges.pop();
            }
        }
    }

    /// The path whose highest barrier is lowest. Among equal bottlenecks the
    /// path found first wins.
    pub fn bottleneck_path(&self, from: &str, to: &str) -> Result<Option<Path>, NetworkError> {
        let mut best: Option<Path> = None;
        for path in self.paths(from, to)? {
            if best.as_ref().is_none_or(|b| path.bottleneck < b.bottleneck) {
                best = Some(path);
            }
        }
        Ok(best)
    }

    /// Every reaction on any path, each once, with the bottleneck path highlighted.
    pub fn all_paths(&self, from: &str, to: &str) -> Result<Selection, NetworkError> {
        let paths = self.paths(from, to)?;
        let mut selection = Selection::default();
        for path in &paths {
            for &edge in &path.edges {
                if !selection.reactions.contains(&edge) {
                    selection.reactions.push(edge);
                }
            }
        }
        let mut best: Option<&Path> = None;
        for path in &paths {
            if best.is_none_or(|b| path.bottleneck < b.bottleneck) {
                best = Some(path);
            }
        }
        if let Some(best) = best {
            selection.highlight = best.edges.clone();
        }
        Ok(selection)
    }

    pub fn well_reactions(&self, name: &str) -> Result<Vec<usize>, NetworkError> {
        let node = self.find(name)?;
        Ok(self
            .edges()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.touches(node))
            .map(|(i, _)| i)
            .collect())
    }

    pub fn barrier_below(&self, threshold: f64) -> Vec<usize> {
        self.edges()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.barrier < threshold)
            .map(|(i, _)| i)
            .collect()
    }

    /// Channels kept by Boltzmann branching at `temperature`, starting from
    /// `well` and following every well a kept channel reaches.
    pub fn boltzmann_filter(&self, well: &str, temperature: f64) -> Result<Vec<usize>, NetworkError> {
        if !(temperature > 0.0) {
            return Err(NetworkError::InvalidTemperature(temperature));
        }
        let start = self.find(well)?;
        if self.node(start).kind != NodeKind::Well {
            return Err(NetworkError::NotAWell(well.to_string()));
        }
        let mut visited = vec![start];
        let mut selected = Vec::new();
        self.branch(start, temperature, &mut visited, &mut selected);
        Ok(selected)
    }

    fn branch(&self, well: usize, temperature: f64, visited: &mut Vec<usize>, selected: &mut Vec<usize>) {
        let channels = self.well_channels(well);
        let Some(lowest) = channels
            .iter()
            .map(|&e| self.edges()[e].barrier)
            .reduce(f64::min)
        else {
            return;
        };
        // Shifting by the lowest barrier leaves the fractions unchanged and
        // keeps the exponentials finite.
        let weights: Vec<f64> = channels
            .iter()
            .map(|&e| {
                let excess = self.edges()[e].barrier - lowest;
                (-excess * 1000.0 / GAS_CONSTANT_CAL / temperature).exp()
            })
            .collect();
        let total: f64 = weights.iter().sum();

        for (&edge, weight) in channels.iter().zip(weights) {
            if weight / total <= BRANCHING_CUTOFF || selected.contains(&edge) {
                continue;
            }
            selected.push(edge);
            let reaction = &self.edges()[edge];
            for node in [reaction.reactant, reaction.product] {
                if self.node(node).kind == NodeKind::Well && !visited.contains(&node) {
                    visited.push(node);
                    self.branch(node, temperature, visited, selected);
                }
            }
        }
    }

    fn well_channels(&self, well: usize) -> Vec<usize> {
        self.edges()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.touches(well))
            .map(|(i, _)| i)
            .collect()
    }
}
