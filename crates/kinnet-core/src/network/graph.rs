use super::error::NetworkError;
use crate::core::models::structure::Chemid;
use crate::core::utils::units::relative_kcal;
use crate::engine::instance::ReactionRecord;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Well,
    /// Several fragments; named by their sorted chemids joined with `_`.
    Bimolecular,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    /// kcal/mol relative to the root well, zero-point corrected.
    pub energy: f64,
    /// Well whose exploration first reached this node.
    pub parent: String,
}

/// One reaction, stored once for both directions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    /// Name of the reaction instance that found it.
    pub name: String,
    pub family: String,
    pub reactant: usize,
    pub product: usize,
    /// kcal/mol relative to the root well, zero-point corrected.
    pub barrier: f64,
}

impl Edge {
    pub fn other(&self, node: usize) -> usize {
        if self.reactant == node {
            self.product
        } else {
            self.reactant
        }
    }

    pub fn touches(&self, node: usize) -> bool {
        self.reactant == node || self.product == node
    }

    fn joins(&self, a: usize, b: usize) -> bool {
        (self.reactant == a && self.product == b) || (self.reactant == b && self.product == a)
    }
}

/// The reactions found while exploring one well.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesResult {
    pub reactant: Chemid,
    /// Electronic plus zero-point energy of the optimized well, Hartree.
    pub energy: f64,
    pub reactions: Vec<ReactionRecord>,
}

/// Wells, bimolecular products and the reactions between them.
///
/// All energies are relative to the first species the network was assembled
/// from. Between two nodes there is at most one edge, the lowest barrier found
/// in either direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactionNetwork {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
}

pub fn product_name(products: &[Chemid]) -> String {
    let mut names: Vec<&str> = products.iter().map(Chemid::as_str).collect();
    names.sort_unstable();
    names.join("_")
}

impl ReactionNetwork {
    /// Builds the network from per-species results; the first species is
    /// the energy reference.
    pub fn assemble(species: &[SpeciesResult]) -> Result<Self, NetworkError> {
        let base = species.first().ok_or(NetworkError::NoSpecies)?.energy;
        let mut network = Self::default();
        for result in species {
            let reactant = result.reactant.to_string();
            let reactant_node = network.add_node(
                &reactant,
                NodeKind::Well,
                relative_kcal(result.energy, base),
                &reactant,
            );
            for record in &result.reactions {
                let (name, kind) = match record.products.as_slice() {
                    [single] => (single.to_string(), NodeKind::Well),
                    many => (product_name(many), NodeKind::Bimolecular),
                };
                let product_node = network.add_node(
                    &name,
                    kind,
                    relative_kcal(record.product_energy, base),
                    &reactant,
                );
                let barrier = relative_kcal(record.ts_energy + record.ts_zpe, base);
                network.add_edge(Edge {
                    name: record.name.clone(),
                    family: record.family.clone(),
                    reactant: reactant_node,
                    product: product_node,
                    barrier,
                });
            }
        }
        info!(
            wells = network.wells().count(),
            bimolecular = network.nodes.len() - network.wells().count(),
            reactions = network.edges.len(),
            "Assembled reaction network"
        );
        Ok(network)
    }

    /// Returns the node of that name, adding it first if it is new. A known
    /// node keeps its energy and parent.
    fn add_node(&mut self, name: &str, kind: NodeKind, energy: f64, parent: &str) -> usize {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            kind,
            energy,
            parent: parent.to_string(),
        });
        self.index.insert(name.to_string(), id);
        id
    }

    /// Adds a reaction, or lowers the barrier of the one already joining the
    /// same pair of nodes.
    fn add_edge(&mut self, edge: Edge) {
        match self
            .edges
            .iter_mut()
            .find(|e| e.joins(edge.reactant, edge.product))
        {
            Some(existing) if edge.barrier < existing.barrier => {
                debug!(kept = %edge.name, dropped = %existing.name, "Replaced duplicate reaction");
                *existing = edge;
            }
            Some(existing) => {
                debug!(kept = %existing.name, dropped = %edge.name, "Ignored duplicate reaction");
            }
            None => self.edges.push(edge),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn wells(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Well)
    }

    pub fn bimolecular(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Bimolecular)
    }

    pub fn find(&self, name: &str) -> Result<usize, NetworkError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| NetworkError::UnknownSpecies(name.to_string()))
    }

    /// Where the artifacts of a node live: the well whose search reached it first.
    pub fn parent(&self, name: &str) -> Result<&str, NetworkError> {
        Ok(&self.nodes[self.find(name)?].parent)
    }

    /// Neighbours of a node with the connecting edge, by ascending node id.
    pub fn neighbours(&self, node: usize) -> Vec<(usize, usize)> {
        let mut neighbours: Vec<(usize, usize)> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.touches(node))
            .map(|(i, e)| (e.other(node), i))
            .collect();
        neighbours.sort_unstable();
        neighbours
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::utils::units::HARTREE_TO_KCAL_MOL;

    pub(crate) fn hartree(kcal: f64) -> f64 {
        kcal / HARTREE_TO_KCAL_MOL
    }

    pub(crate) fn reaction(reactant: &str, products: &[&str], barrier: f64, energy: f64) -> ReactionRecord {
        ReactionRecord {
            reactant: Chemid::new(reactant),
            family: "test".to_string(),
            name: format!("{reactant}_to_{}", products.join("_")),
            products: products.iter().map(|&p| Chemid::new(p)).collect(),
            barrier,
            ts_energy: hartree(barrier),
            ts_zpe: 0.0,
            product_energy: hartree(energy),
        }
    }

    pub(crate) fn species(name: &str, energy: f64, reactions: Vec<ReactionRecord>) -> SpeciesResult {
        SpeciesResult {
            reactant: Chemid::new(name),
            energy: hartree(energy),
            reactions,
        }
    }

    #[test]
    fn duplicate_reactions_keep_the_lower_barrier() {
        let network = ReactionNetwork::assemble(&[
            species("A", 0.0, vec![reaction("A", &["B"], 12.0, -5.0)]),
            species("B", -5.0, vec![reaction("B", &["A"], 9.0, 0.0)]),
        ])
        .unwrap();

        assert_eq!(network.edges().len(), 1);
        assert!((network.edges()[0].barrier - 9.0).abs() < 1e-9);
        assert_eq!(network.edges()[0].name, "B_to_A");
    }

    #[test]
    fn products_are_classified_and_parented() {
        let network = ReactionNetwork::assemble(&[
            species(
                "A",
                0.0,
                vec![
                    reaction("A", &["B"], 30.0, -2.0),
                    reaction("A", &["Y", "X"], 40.0, 15.0),
                ],
            ),
            species("B", -2.0, vec![reaction("B", &["C"], 25.0, -8.0)]),
        ])
        .unwrap();

        assert_eq!(network.wells().count(), 3);
        let bimolecular: Vec<_> = network.bimolecular().map(|n| n.name.as_str()).collect();
        assert_eq!(bimolecular, vec!["X_Y"]);
        assert_eq!(network.parent("C").unwrap(), "B");
        assert_eq!(network.parent("X_Y").unwrap(), "A");
        let b = network.find("B").unwrap();
        assert!((network.node(b).energy + 2.0).abs() < 1e-9);
    }

    #[test]
    fn energies_are_relative_to_the_first_species() {
        let mut first = species("A", 0.0, vec![reaction("A", &["B"], 0.0, 0.0)]);
        first.energy = -100.0;
        first.reactions[0].ts_energy = -100.0 + hartree(20.0) - 0.01;
        first.reactions[0].ts_zpe = 0.01;
        first.reactions[0].product_energy = -100.0 + hartree(-3.0);

        let network = ReactionNetwork::assemble(&[first]).unwrap();

        assert!((network.edges()[0].barrier - 20.0).abs() < 1e-6);
        assert!((network.node(network.find("B").unwrap()).energy + 3.0).abs() < 1e-6);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            ReactionNetwork::assemble(&[]),
            Err(NetworkError::NoSpecies)
        ));
    }
}
