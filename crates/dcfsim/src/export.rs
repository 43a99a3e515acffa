//! JSON export of a finished run

use std::collections::BTreeMap;
use std::path::Path;

use dcfsim_core::analysis::{Sensitivity, SimulationSummary};
use dcfsim_core::model::{ConvergenceWarning, MonteCarloResult, ResultTable};
use dcfsim_core::simulation::MonteCarloConfig;
use serde::{Deserialize, Serialize};

use crate::storage::StorageError;
use crate::util::io::atomic_write;

/// Everything needed to reproduce and inspect a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunExport {
    pub run: MonteCarloConfig,
    pub n_valid: usize,
    pub n_failed: usize,
    pub warnings: Vec<ConvergenceWarning>,
    pub summaries: Vec<SimulationSummary>,
    /// Sensitivity ranking per summarized metric
    pub sensitivity: BTreeMap<String, Vec<Sensitivity>>,
    /// One row per iteration, inputs then outputs
    pub table: ResultTable,
}

impl RunExport {
    #[must_use]
    pub fn new(
        run: &MonteCarloConfig,
        result: &MonteCarloResult,
        summaries: Vec<SimulationSummary>,
        sensitivity: BTreeMap<String, Vec<Sensitivity>>,
    ) -> Self {
        Self {
            run: run.clone(),
            n_valid: result.n_valid(),
            n_failed: result.n_failed(),
            warnings: result.warnings.clone(),
            summaries,
            sensitivity,
            table: result.to_table(),
        }
    }
}

/// Write `export` as pretty-printed JSON, atomically
pub fn export_json(path: &Path, export: &RunExport) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(export)
        .map_err(|e| StorageError::Serialize(format!("Failed to serialize run: {}", e)))?;

    atomic_write(path, json)
        .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))?;

    tracing::info!(
        path = %path.display(),
        rows = export.table.rows.len(),
        "run exported"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcfsim_core::analysis::{SummaryOptions, sensitivity_ranking, summarize_with};
    use dcfsim_core::config::RegistryBuilder;
    use dcfsim_core::model::{Outputs, Parameters};
    use dcfsim_core::simulation::monte_carlo_simulate;
    use tempfile::tempdir;

    fn doubled(p: &Parameters) -> Result<Outputs, String> {
        let x = p["x"];
        if x > 2.5 {
            return Err("too large".into());
        }
        Ok(Outputs::from([("y".to_string(), 2.0 * x)]))
    }

    #[test]
    fn test_export_json_round_trip() {
        let config = RegistryBuilder::new()
            .triangular("x", 0.0, 1.0, 3.0, 1.0)
            .build()
            .unwrap();
        let mc = MonteCarloConfig::new(200, 7);
        let result = monte_carlo_simulate(&config, &doubled, &mc).unwrap();
        let summary = summarize_with(&result, "y", &SummaryOptions::default()).unwrap();
        let sensitivity =
            BTreeMap::from([("y".to_string(), sensitivity_ranking(&result, "y").unwrap())]);

        let export = RunExport::new(&mc, &result, vec![summary], sensitivity);
        assert_eq!(export.n_valid + export.n_failed, 200);
        assert!(export.n_failed > 0);

        let dir = tempdir().unwrap();
        let path = dir.path().join("run.json");
        export_json(&path, &export).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["run"]["seed"], 7);
        assert_eq!(value["table"]["columns"][0], "x");
        assert_eq!(value["table"]["columns"][1], "y");
        assert_eq!(value["table"]["rows"].as_array().unwrap().len(), 200);
        assert_eq!(value["summaries"][0]["metric"], "y");
        assert_eq!(value["sensitivity"]["y"][0]["variable"], "x");

        let failed_row = value["table"]["rows"]
            .as_array()
            .unwrap()
            .iter()
            .find(|row| row["failed"] == true)
            .unwrap();
        assert!(failed_row["values"][1].is_null());
        assert_eq!(failed_row["failure_reason"], "too large");
    }
}
