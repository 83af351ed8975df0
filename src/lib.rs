pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod render;
pub mod report;
pub mod rng;
pub mod runner;
pub mod scenario;
pub mod telemetry;

pub use config::SimulationConfig;
pub use engine::{IterationReport, RunOutcome, RunSummary, SegregationSimulator};
pub use error::{SimulationError, SimulationResult};
pub use grid::{Cell, GridPopulation, PopulationSnapshot, Race};
