use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::SimulationConfig;

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    pub simulations: Vec<ScenarioSimulation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioSimulation {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub config: SimulationConfig,
}

impl ScenarioSimulation {
    pub fn initial_title(&self) -> String {
        format!(
            "Schelling Model with {} colors: Initial State",
            self.config.race_count
        )
    }

    pub fn final_title(&self) -> String {
        self.title.clone().unwrap_or_else(|| {
            format!(
                "Schelling Model with {} colors: Final State with Similarity Threshold {}%",
                self.config.race_count,
                (self.config.similarity_threshold * 100.0).round()
            )
        })
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario
            .validate()
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    /// The three 50x50 runs from the classic segregation write-up:
    /// 30% empty, two races, thresholds of 30%, 50% and 70%.
    pub fn binpress_demo() -> Self {
        let simulations = [0.3, 0.5, 0.7]
            .into_iter()
            .map(|threshold: f64| ScenarioSimulation {
                name: format!("schelling_2_{}", (threshold * 100.0).round()),
                title: None,
                config: SimulationConfig::new(50, 50, 0.3, threshold),
            })
            .collect();
        Self {
            name: "binpress".into(),
            description: Some("Two races on a 50x50 grid at three similarity thresholds".into()),
            seed: 7,
            output_dir: default_output_dir(),
            simulations,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.simulations.is_empty() {
            anyhow::bail!("scenario '{}' defines no simulations", self.name);
        }
        let mut seen: Vec<&str> = Vec::with_capacity(self.simulations.len());
        for simulation in &self.simulations {
            if seen.contains(&simulation.name.as_str()) {
                anyhow::bail!("simulation '{}' defined more than once", simulation.name);
            }
            seen.push(&simulation.name);
            simulation
                .config
                .validate()
                .with_context(|| format!("simulation '{}'", simulation.name))?;
        }
        Ok(())
    }

    pub fn with_max_iterations(mut self, max_iterations: Option<u64>) -> Self {
        if let Some(max_iterations) = max_iterations {
            for simulation in &mut self.simulations {
                simulation.config.max_iterations = max_iterations;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_has_three_thresholds() {
        let scenario = Scenario::binpress_demo();
        assert!(scenario.validate().is_ok());
        let names: Vec<_> = scenario.simulations.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["schelling_2_30", "schelling_2_50", "schelling_2_70"]);
        assert_eq!(
            scenario.simulations[1].final_title(),
            "Schelling Model with 2 colors: Final State with Similarity Threshold 50%"
        );
    }

    #[test]
    fn parses_flattened_simulation_config() {
        let yaml = r#"
name: small
seed: 3
simulations:
  - name: quick
    width: 12
    height: 10
    empty_ratio: 0.25
    similarity_threshold: 0.6
    race_count: 3
"#;
        let scenario: Scenario = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(scenario.output_dir, PathBuf::from("output"));
        let quick = &scenario.simulations[0];
        assert_eq!(quick.config.width, 12);
        assert_eq!(quick.config.race_count, 3);
        assert_eq!(quick.config.max_iterations, 500);
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_names_and_bad_configs() {
        let mut scenario = Scenario::binpress_demo();
        scenario.simulations[1].name = scenario.simulations[0].name.clone();
        assert!(scenario.validate().is_err());

        let mut scenario = Scenario::binpress_demo();
        scenario.simulations[2].config.empty_ratio = 0.0;
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn iteration_override_applies_to_every_simulation() {
        let scenario = Scenario::binpress_demo().with_max_iterations(Some(12));
        assert!(scenario
            .simulations
            .iter()
            .all(|s| s.config.max_iterations == 12));
    }
}
