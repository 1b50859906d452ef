//! Per-species reaction list, `summary_{chemid}.csv`.
//!
//! Every instance gets one row. Successful rows carry the full
//! [`ReactionRecord`]; failed rows carry the reason. Network assembly reads
//! the successful rows back.

use super::error::EngineError;
use super::instance::{InstanceState, ReactionInstance, ReactionRecord};
use crate::core::models::structure::Chemid;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum Outcome {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SummaryRow {
    status: Outcome,
    reactant: Chemid,
    family: String,
    name: String,
    /// Space-separated product chemids.
    products: String,
    barrier: Option<f64>,
    ts_energy: Option<f64>,
    ts_zpe: Option<f64>,
    product_energy: Option<f64>,
    reason: Option<String>,
}

impl From<&ReactionRecord> for SummaryRow {
    fn from(record: &ReactionRecord) -> Self {
        Self {
            status: Outcome::Success,
            reactant: record.reactant.clone(),
            family: record.family.clone(),
            name: record.name.clone(),
            products: record
                .products
                .iter()
                .map(Chemid::as_str)
                .collect::<Vec<_>>()
                .join(" "),
            barrier: Some(record.barrier),
            ts_energy: Some(record.ts_energy),
            ts_zpe: Some(record.ts_zpe),
            product_energy: Some(record.product_energy),
            reason: None,
        }
    }
}

pub fn summary_path(workdir: &Path, chemid: &Chemid) -> PathBuf {
    workdir.join(format!("summary_{chemid}.csv"))
}

/// Writes one row per terminal instance. Instances still running are left out.
pub fn write_summary<'a>(
    path: &Path,
    reactant: &Chemid,
    instances: impl IntoIterator<Item = &'a ReactionInstance>,
) -> Result<(), EngineError> {
    let table_error = |source| EngineError::Table {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(table_error)?;
    for instance in instances {
        let row = match (instance.state(), instance.record()) {
            (InstanceState::Success, Some(record)) => SummaryRow::from(record),
            (InstanceState::Failed, _) => SummaryRow {
                status: Outcome::Failed,
                reactant: reactant.clone(),
                family: instance.family_name().to_string(),
                name: instance.name().to_string(),
                products: String::new(),
                barrier: instance.barrier(),
                ts_energy: None,
                ts_zpe: None,
                product_energy: None,
                reason: instance.failure().map(ToString::to_string),
            },
            _ => continue,
        };
        writer.serialize(row).map_err(table_error)?;
    }
    writer.flush().map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// The successful reactions of a summary file, in file order.
pub fn read_summary(path: &Path) -> Result<Vec<ReactionRecord>, EngineError> {
    let table_error = |source| EngineError::Table {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(table_error)?;
    let mut records = Vec::new();
    for row in reader.deserialize::<SummaryRow>() {
        let row = row.map_err(table_error)?;
        if row.status != Outcome::Success {
            continue;
        }
        let (Some(barrier), Some(ts_energy), Some(ts_zpe), Some(product_energy)) =
            (row.barrier, row.ts_energy, row.ts_zpe, row.product_energy)
        else {
            return Err(EngineError::Internal(format!(
                "successful reaction '{}' in {} lacks energies",
                row.name,
                path.display()
            )));
        };
        records.push(ReactionRecord {
            reactant: row.reactant,
            family: row.family,
            name: row.name,
            products: row.products.split_whitespace().map(Chemid::from).collect(),
            barrier,
            ts_energy,
            ts_zpe,
            product_energy,
        });
    }
    Ok(records)
}
