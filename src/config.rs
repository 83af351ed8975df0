use serde::{Deserialize, Serialize};

use crate::error::{SimulationError, SimulationResult};

fn default_max_iterations() -> u64 {
    500
}

fn default_race_count() -> u16 {
    2
}

/// Construction parameters for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub width: u32,
    pub height: u32,
    pub empty_ratio: f64,
    pub similarity_threshold: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,
    #[serde(default = "default_race_count")]
    pub race_count: u16,
}

impl SimulationConfig {
    pub fn new(width: u32, height: u32, empty_ratio: f64, similarity_threshold: f64) -> Self {
        Self {
            width,
            height,
            empty_ratio,
            similarity_threshold,
            max_iterations: default_max_iterations(),
            race_count: default_race_count(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_race_count(mut self, race_count: u16) -> Self {
        self.race_count = race_count;
        self
    }

    pub fn total_cells(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of cells left empty by `populate`.
    pub fn empty_cell_count(&self) -> usize {
        (self.empty_ratio * self.total_cells() as f64).floor() as usize
    }

    pub fn validate(&self) -> SimulationResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SimulationError::Configuration(format!(
                "grid must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }

        if !self.empty_ratio.is_finite() || !(0.0..1.0).contains(&self.empty_ratio) {
            return Err(SimulationError::Configuration(format!(
                "empty_ratio must lie in [0, 1), got {}",
                self.empty_ratio
            )));
        }

        if self.empty_ratio == 0.0 {
            return Err(SimulationError::Configuration(
                "empty_ratio of 0 leaves no cell to relocate into".into(),
            ));
        }

        if !self.similarity_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.similarity_threshold)
        {
            return Err(SimulationError::Configuration(format!(
                "similarity_threshold must lie in [0, 1], got {}",
                self.similarity_threshold
            )));
        }

        if self.race_count == 0 {
            return Err(SimulationError::Configuration(
                "race_count must be at least 1".into(),
            ));
        }

        if self.empty_cell_count() == 0 {
            return Err(SimulationError::Configuration(format!(
                "empty_ratio {} leaves no empty cell on a {}x{} grid",
                self.empty_ratio, self.width, self.height
            )));
        }

        Ok(())
    }
}
