use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::SimulationConfig;
use crate::engine::{RunOutcome, RunSummary};

/// Convergence record for one simulation, written next to its plots.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scenario: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub simulation: String,
    pub seed: u64,
    pub config: SimulationConfig,
    pub outcome: RunOutcome,
    pub iterations: u64,
    pub total_relocations: usize,
    pub changes_per_iteration: Vec<usize>,
    pub initial_unsatisfied: usize,
    pub final_unsatisfied: usize,
    pub race_counts: Vec<usize>,
}

impl RunReport {
    pub fn new(
        scenario: &str,
        simulation: &str,
        seed: u64,
        config: &SimulationConfig,
        summary: RunSummary,
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            description: None,
            simulation: simulation.to_string(),
            seed,
            config: config.clone(),
            outcome: summary.outcome,
            iterations: summary.iterations,
            total_relocations: summary.total_relocations,
            changes_per_iteration: summary.changes_per_iteration,
            initial_unsatisfied: 0,
            final_unsatisfied: 0,
            race_counts: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_unsatisfied(mut self, initial: usize, last: usize) -> Self {
        self.initial_unsatisfied = initial;
        self.final_unsatisfied = last;
        self
    }

    pub fn with_race_counts(mut self, race_counts: Vec<usize>) -> Self {
        self.race_counts = race_counts;
        self
    }

    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create report directory {}", dir.display()))?;
        let path = dir.join(format!("{}_report.json", self.simulation));
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        Ok(path)
    }
}
