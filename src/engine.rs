use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::SimulationResult;
use crate::grid::GridPopulation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// A round finished without any relocation.
    Converged,
    /// Every round in the budget relocated at least one agent.
    BudgetExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationReport {
    pub iteration: u64,
    pub changes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub iterations: u64,
    pub total_relocations: usize,
    pub changes_per_iteration: Vec<usize>,
}

/// Drives relocation rounds over a borrowed population.
pub struct SegregationSimulator<'a> {
    population: &'a mut GridPopulation,
    max_iterations: u64,
    history: Vec<usize>,
}

impl<'a> SegregationSimulator<'a> {
    pub fn new(population: &'a mut GridPopulation, max_iterations: u64) -> Self {
        Self {
            population,
            max_iterations,
            history: Vec::new(),
        }
    }

    pub fn population(&self) -> &GridPopulation {
        self.population
    }

    pub fn max_iterations(&self) -> u64 {
        self.max_iterations
    }

    /// Relocations performed in each completed round.
    pub fn history(&self) -> &[usize] {
        &self.history
    }

    /// Runs one round and returns the number of relocations.
    ///
    /// The set of agents evaluated is fixed at round start. Each evaluation
    /// and each move works on live state, so an earlier move in the round can
    /// change what a later agent sees.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SimulationResult<usize> {
        let round = self.population.occupied_cells();
        let mut changes = 0;
        for (cell, _) in round {
            if self.population.is_unsatisfied(cell)? {
                let destination = self.population.random_empty_cell(rng)?;
                self.population.relocate(cell, destination)?;
                changes += 1;
            }
        }
        self.history.push(changes);
        Ok(changes)
    }

    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SimulationResult<RunSummary> {
        self.run_with_hook(rng, |_| {})
    }

    pub fn run_with_hook<R, F>(&mut self, rng: &mut R, mut hook: F) -> SimulationResult<RunSummary>
    where
        R: Rng + ?Sized,
        F: FnMut(&IterationReport),
    {
        let start = self.history.len();
        let mut outcome = RunOutcome::BudgetExhausted;
        for iteration in 1..=self.max_iterations {
            let changes = self.step(rng)?;
            debug!(iteration, changes, "relocation round finished");
            hook(&IterationReport { iteration, changes });
            if changes == 0 {
                outcome = RunOutcome::Converged;
                break;
            }
        }

        let changes_per_iteration = self.history[start..].to_vec();
        let summary = RunSummary {
            outcome,
            iterations: changes_per_iteration.len() as u64,
            total_relocations: changes_per_iteration.iter().sum(),
            changes_per_iteration,
        };
        match summary.outcome {
            RunOutcome::Converged => info!(
                iterations = summary.iterations,
                relocations = summary.total_relocations,
                "population converged"
            ),
            RunOutcome::BudgetExhausted => info!(
                iterations = summary.iterations,
                relocations = summary.total_relocations,
                "iteration budget exhausted before convergence"
            ),
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::error::SimulationError;
    use crate::grid::{Cell, Race};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn single_race_converges_in_one_round() {
        let config = SimulationConfig::new(4, 4, 0.5, 0.9).with_race_count(1);
        let mut population = GridPopulation::new(&config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        population.populate(&mut rng);

        let mut simulator = SegregationSimulator::new(&mut population, 500);
        let summary = simulator.run(&mut rng).unwrap();

        assert_eq!(summary.outcome, RunOutcome::Converged);
        assert_eq!(summary.iterations, 1);
        assert_eq!(summary.changes_per_iteration, vec![0]);
        assert_eq!(summary.total_relocations, 0);
    }

    #[test]
    fn zero_budget_runs_no_round() {
        let config = SimulationConfig::new(4, 4, 0.5, 0.5);
        let mut population = GridPopulation::new(&config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        population.populate(&mut rng);
        let before = population.snapshot();

        let mut simulator = SegregationSimulator::new(&mut population, 0);
        let summary = simulator.run(&mut rng).unwrap();

        assert_eq!(summary.outcome, RunOutcome::BudgetExhausted);
        assert_eq!(summary.iterations, 0);
        assert_eq!(population.snapshot(), before);
    }

    #[test]
    fn pair_that_never_settles_exhausts_budget() {
        // Two opposing agents on a 2x2 grid are always adjacent, so at a
        // threshold of 1 each of them moves every round.
        let config = SimulationConfig::new(2, 2, 0.5, 1.0);
        let mut population = GridPopulation::from_layout(
            &config,
            [
                (Cell::new(0, 0), Race::new(1)),
                (Cell::new(1, 1), Race::new(2)),
            ],
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let mut rounds = 0;
        let mut simulator = SegregationSimulator::new(&mut population, 25);
        let summary = simulator
            .run_with_hook(&mut rng, |report| {
                rounds += 1;
                assert_eq!(report.iteration, rounds);
                assert_eq!(report.changes, 2);
            })
            .unwrap();

        assert_eq!(summary.outcome, RunOutcome::BudgetExhausted);
        assert_eq!(summary.iterations, 25);
        assert_eq!(rounds, 25);
        assert_eq!(summary.total_relocations, 50);
        assert_eq!(population.race_counts(), vec![1, 1]);
    }

    #[test]
    fn unhappy_agent_on_full_grid_aborts_the_run() {
        let config = SimulationConfig::new(2, 1, 0.5, 1.0);
        let mut population = GridPopulation::from_layout(
            &config,
            [
                (Cell::new(0, 0), Race::new(1)),
                (Cell::new(1, 0), Race::new(2)),
            ],
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(6);

        let mut simulator = SegregationSimulator::new(&mut population, 5);
        assert!(matches!(
            simulator.step(&mut rng),
            Err(SimulationError::Exhausted)
        ));
        assert!(matches!(
            simulator.run(&mut rng),
            Err(SimulationError::Exhausted)
        ));
        assert!(simulator.history().is_empty());
        assert_eq!(population.label(Cell::new(0, 0)), Some(Race::new(1)));
        assert_eq!(population.label(Cell::new(1, 0)), Some(Race::new(2)));
    }

    #[test]
    fn later_agents_see_earlier_moves() {
        let config = SimulationConfig::new(3, 1, 0.5, 1.0);
        let mut population = GridPopulation::from_layout(
            &config,
            [
                (Cell::new(0, 0), Race::new(1)),
                (Cell::new(1, 0), Race::new(2)),
            ],
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(8);

        let mut simulator = SegregationSimulator::new(&mut population, 1);
        let changes = simulator.step(&mut rng).unwrap();

        // The left agent can only move to (2, 0), still next to the middle
        // agent, which then sees it on the live grid and takes the freed
        // (0, 0).
        assert_eq!(changes, 2);
        assert_eq!(population.label(Cell::new(2, 0)), Some(Race::new(1)));
        assert_eq!(population.label(Cell::new(0, 0)), Some(Race::new(2)));
        assert!(population.is_empty(Cell::new(1, 0)));
    }

    #[test]
    fn runs_are_reproducible_with_a_seed() {
        let config = SimulationConfig::new(20, 20, 0.3, 0.5);
        let run = |seed: u64| {
            let mut population = GridPopulation::new(&config).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            population.populate(&mut rng);
            let summary = SegregationSimulator::new(&mut population, 100)
                .run(&mut rng)
                .unwrap();
            (summary, population.snapshot())
        };
        assert_eq!(run(13), run(13));
    }

    #[test]
    fn history_accumulates_across_steps() {
        let config = SimulationConfig::new(10, 10, 0.3, 0.7);
        let mut population = GridPopulation::new(&config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        population.populate(&mut rng);
        let counts = population.race_counts();

        let mut simulator = SegregationSimulator::new(&mut population, 3);
        simulator.step(&mut rng).unwrap();
        simulator.step(&mut rng).unwrap();
        assert_eq!(simulator.history().len(), 2);
        assert_eq!(simulator.population().race_counts(), counts);
    }
}
