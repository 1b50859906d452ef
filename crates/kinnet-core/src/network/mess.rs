//! Master-equation input for MESS.
//!
//! The selected wells, bimolecular products and reactions are written with
//! short names (`w_N`, `pr_N`, `fr_N`, `rxn_N`) followed by `! <full name>`.
//! Every stationary point is a rigid-rotor harmonic-oscillator species built
//! from its stored molecular data; single atoms are written as `Atom`
//! fragments. Zero energies are the zero-point corrected network energies.

use super::error::NetworkError;
use super::export::Names;
use super::graph::{NodeKind, ReactionNetwork};
use super::query::Selection;
use crate::core::models::element::atomic_mass;
use crate::engine::molecular::MolecularData;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const SEPARATOR: &str = "!****************************************";

/// Conditions and collision model of the master-equation run.
#[derive(Debug, Clone, PartialEq)]
pub struct MessParameters {
    /// K.
    pub temperatures: Vec<f64>,
    /// torr.
    pub pressures: Vec<f64>,
    pub energy_step_over_temperature: f64,
    pub excess_energy_over_temperature: f64,
    /// kcal/mol.
    pub model_energy_limit: f64,
    pub calculation_method: String,
    pub chemical_eigenvalue_max: f64,
    /// cm^-1.
    pub relaxation_factor: f64,
    pub relaxation_power: f64,
    pub relaxation_exponent_cutoff: f64,
    /// Lennard-Jones parameters of the bath gas and the reactant, cm^-1.
    pub epsilons: [f64; 2],
    /// Angstrom.
    pub sigmas: [f64; 2],
    /// amu.
    pub masses: [f64; 2],
}

impl Default for MessParameters {
    fn default() -> Self {
        Self {
            temperatures: (0..16u32).map(|i| 500.0 + 100.0 * f64::from(i)).collect(),
            pressures: vec![760.0],
            energy_step_over_temperature: 0.2,
            excess_energy_over_temperature: 30.0,
            model_energy_limit: 400.0,
            calculation_method: "direct".to_string(),
            chemical_eigenvalue_max: 0.2,
            relaxation_factor: 200.0,
            relaxation_power: 0.85,
            relaxation_exponent_cutoff: 15.0,
            epsilons: [7.08, 310.387],
            sigmas: [2.576, 6.0],
            masses: [4.0, 87.0],
        }
    }
}

fn list(values: &[f64]) -> String {
    values
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn lookup<'a>(
    data: &'a HashMap<String, MolecularData>,
    name: &str,
) -> Result<&'a MolecularData, NetworkError> {
    data.get(name)
        .ok_or_else(|| NetworkError::MissingMolecularData(name.to_string()))
}

fn header(out: &mut String, parameters: &MessParameters, reactant: &str) {
    let p = parameters;
    let _ = writeln!(out, "TemperatureList[K] {}", list(&p.temperatures));
    let _ = writeln!(out, "PressureList[torr] {}", list(&p.pressures));
    let _ = writeln!(out, "EnergyStepOverTemperature {}", p.energy_step_over_temperature);
    let _ = writeln!(out, "ExcessEnergyOverTemperature {}", p.excess_energy_over_temperature);
    let _ = writeln!(out, "ModelEnergyLimit[kcal/mol] {}", p.model_energy_limit);
    let _ = writeln!(out, "CalculationMethod {}", p.calculation_method);
    let _ = writeln!(out, "  ChemicalEigenvalueMax {}", p.chemical_eigenvalue_max);
    let _ = writeln!(out, "Reactant {reactant}");
    out.push_str("Model\n");
    out.push_str("  EnergyRelaxation\n    Exponential\n");
    let _ = writeln!(out, "      Factor[1/cm] {}", p.relaxation_factor);
    let _ = writeln!(out, "      Power {}", p.relaxation_power);
    let _ = writeln!(out, "      ExponentCutoff {}", p.relaxation_exponent_cutoff);
    out.push_str("    End\n");
    out.push_str("  CollisionFrequency\n    LennardJones\n");
    let _ = writeln!(out, "      Epsilons[1/cm] {}", list(&p.epsilons));
    let _ = writeln!(out, "      Sigmas[angstrom] {}", list(&p.sigmas));
    let _ = writeln!(out, "      Masses[amu] {}", list(&p.masses));
    out.push_str("    End\n");
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "######################\n# {title}\n######################");
}

/// Eckart tunneling through a barrier: the imaginary wavenumber and the
/// depths of the wells on both sides, kcal/mol.
struct Tunneling {
    frequency: f64,
    depths: [f64; 2],
}

fn rrho(
    out: &mut String,
    indent: usize,
    data: &MolecularData,
    zero_energy: f64,
    tunneling: Option<Tunneling>,
) {
    let pad = " ".repeat(indent);
    let _ = writeln!(out, "{pad}RRHO");
    let _ = writeln!(out, "{pad}  Geometry[angstrom] {}", data.atoms.len());
    for (atom, [x, y, z]) in data.atoms.iter().zip(&data.geometry) {
        let _ = writeln!(out, "{pad}    {atom} {x:.6} {y:.6} {z:.6}");
    }
    let _ = writeln!(out, "{pad}  Core RigidRotor\n{pad}    SymmetryFactor 1\n{pad}  End");
    let frequencies: Vec<String> = data.real_frequencies().map(|f| format!("{f:.2}")).collect();
    let _ = writeln!(out, "{pad}  Frequencies[1/cm] {}", frequencies.len());
    let _ = writeln!(out, "{pad}    {}", frequencies.join(" "));
    let _ = writeln!(out, "{pad}  ZeroEnergy[kcal/mol] {zero_energy:.2}");
    let _ = writeln!(out, "{pad}  ElectronicLevels[1/cm] 1\n{pad}    0 {}", data.multiplicity);
    if let Some(tunneling) = tunneling {
        let _ = writeln!(out, "{pad}  Tunneling Eckart");
        let _ = writeln!(out, "{pad}    ImaginaryFrequency[1/cm] {:.2}", tunneling.frequency);
        for depth in tunneling.depths {
            let _ = writeln!(out, "{pad}    WellDepth[kcal/mol] {depth:.2}");
        }
        let _ = writeln!(out, "{pad}  End");
    }
    let _ = writeln!(out, "{pad}End");
}

fn atom(out: &mut String, indent: usize, data: &MolecularData) -> Result<(), NetworkError> {
    let pad = " ".repeat(indent);
    let symbol = &data.atoms[0];
    let mass = atomic_mass(symbol).ok_or_else(|| NetworkError::UnknownElement(symbol.clone()))?;
    let _ = writeln!(out, "{pad}Atom");
    let _ = writeln!(out, "{pad}  Mass[amu] {mass}");
    let _ = writeln!(out, "{pad}  ElectronicLevels[1/cm] 1\n{pad}    0 {}", data.multiplicity);
    let _ = writeln!(out, "{pad}End");
    Ok(())
}

/// Builds the input. `data` holds the molecular data of every selected well
/// and fragment under its chemid and of every selected saddle point under its
/// reaction name.
pub fn to_mess(
    network: &ReactionNetwork,
    selection: &Selection,
    parameters: &MessParameters,
    data: &HashMap<String, MolecularData>,
) -> Result<String, NetworkError> {
    let names = Names::new(network, selection, true);
    let nodes = selection.nodes(network);
    let wells: Vec<usize> = nodes
        .iter()
        .copied()
        .filter(|&n| network.node(n).kind == NodeKind::Well)
        .collect();
    let Some(&first) = wells.first() else {
        return Err(NetworkError::NoSpecies);
    };

    let mut out = String::new();
    header(&mut out, parameters, &names.nodes[&first]);

    section(&mut out, "WELLS");
    for &well in &wells {
        let node = network.node(well);
        let _ = writeln!(out, "Well {} ! {}", names.nodes[&well], node.name);
        out.push_str("  Species\n");
        rrho(&mut out, 4, lookup(data, &node.name)?, node.energy, None);
        out.push_str("End\n");
        let _ = writeln!(out, "{SEPARATOR}");
    }

    section(&mut out, "BIMOLECULAR PRODUCTS");
    let mut fragments: HashMap<&str, String> = HashMap::new();
    for &product in nodes
        .iter()
        .filter(|&&n| network.node(n).kind == NodeKind::Bimolecular)
    {
        let node = network.node(product);
        let _ = writeln!(out, "Bimolecular {} ! {}", names.nodes[&product], node.name);
        // Bimolecular nodes are named by their fragment chemids joined with `_`.
        for fragment in node.name.split('_') {
            let next = fragments.len() + 1;
            let short = fragments
                .entry(fragment)
                .or_insert_with(|| format!("fr_{next}"));
            let _ = writeln!(out, "  Fragment {short} ! {fragment}");
            let molecule = lookup(data, fragment)?;
            if molecule.is_atom() {
                atom(&mut out, 4, molecule)?;
            } else {
                rrho(&mut out, 4, molecule, 0.0, None);
            }
        }
        let _ = writeln!(out, "  GroundEnergy[kcal/mol] {:.2}", node.energy);
        out.push_str("End\n");
        let _ = writeln!(out, "{SEPARATOR}");
    }

    section(&mut out, "BARRIERS");
    for &edge in &selection.reactions {
        let reaction = &network.edges()[edge];
        let _ = writeln!(
            out,
            "Barrier {} {} {} ! {}",
            names.reactions[&edge],
            names.nodes[&reaction.reactant],
            names.nodes[&reaction.product],
            reaction.name
        );
        let molecule = lookup(data, &reaction.name)?;
        let tunneling = molecule.imaginary_frequency().map(|frequency| Tunneling {
            frequency: frequency.abs(),
            depths: [
                reaction.barrier - network.node(reaction.reactant).energy,
                reaction.barrier - network.node(reaction.product).energy,
            ],
        });
        rrho(&mut out, 2, molecule, reaction.barrier, tunneling);
        out.push_str("End\n");
        let _ = writeln!(out, "{SEPARATOR}");
    }

    let _ = writeln!(out, "{SEPARATOR}");
    out.push_str("End ! end kinetics\n");
    Ok(out)
}

pub fn write_mess(
    path: &Path,
    network: &ReactionNetwork,
    selection: &Selection,
    parameters: &MessParameters,
    data: &HashMap<String, MolecularData>,
) -> Result<(), NetworkError> {
    let input = to_mess(network, selection, parameters, data)?;
    fs::write(path, input).map_err(|source| NetworkError::Io {
        path: path.to_path_buf(),
        source,
    })
}
