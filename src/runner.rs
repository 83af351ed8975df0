use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    engine::{IterationReport, SegregationSimulator},
    grid::GridPopulation,
    render::Renderer,
    report::RunReport,
    rng::RngManager,
    scenario::{Scenario, ScenarioSimulation},
};

pub struct RunnerSettings {
    pub output_dir: PathBuf,
    pub render: bool,
    pub write_reports: bool,
}

impl RunnerSettings {
    pub fn from_scenario(scenario: &Scenario) -> Self {
        Self {
            output_dir: scenario.output_dir.clone(),
            render: true,
            write_reports: true,
        }
    }
}

/// Runs every simulation of a scenario in order, each with its own random
/// streams derived from the scenario seed.
pub struct ScenarioRunner<'a> {
    scenario: &'a Scenario,
    settings: RunnerSettings,
    renderer: Box<dyn Renderer + 'a>,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(
        scenario: &'a Scenario,
        settings: RunnerSettings,
        renderer: impl Renderer + 'a,
    ) -> Self {
        Self {
            scenario,
            settings,
            renderer: Box::new(renderer),
        }
    }

    pub fn run(&self) -> Result<Vec<RunReport>> {
        self.run_with_progress(|_, _| {})
    }

    /// Like [`run`](Self::run), calling `progress` with the simulation name
    /// after every relocation round.
    pub fn run_with_progress<F>(&self, mut progress: F) -> Result<Vec<RunReport>>
    where
        F: FnMut(&str, &IterationReport),
    {
        match &self.scenario.description {
            Some(description) => info!(
                scenario = %self.scenario.name,
                %description,
                seed = self.scenario.seed,
                "running scenario"
            ),
            None => info!(
                scenario = %self.scenario.name,
                seed = self.scenario.seed,
                "running scenario"
            ),
        }
        let mut rng = RngManager::new(self.scenario.seed);
        let mut reports = Vec::with_capacity(self.scenario.simulations.len());
        for simulation in &self.scenario.simulations {
            reports.push(self.run_one(simulation, &mut rng, &mut progress)?);
        }
        Ok(reports)
    }

    fn run_one(
        &self,
        simulation: &ScenarioSimulation,
        rng: &mut RngManager,
        progress: &mut dyn FnMut(&str, &IterationReport),
    ) -> Result<RunReport> {
        let name = &simulation.name;
        let config = &simulation.config;
        info!(
            simulation = %name,
            width = config.width,
            height = config.height,
            threshold = config.similarity_threshold,
            races = config.race_count,
            "starting simulation"
        );

        let mut population = GridPopulation::new(config)
            .with_context(|| format!("simulation '{name}' has an invalid configuration"))?;
        population.populate(rng.stream(&format!("{name}/populate")));
        self.maybe_render(&population, &simulation.initial_title(), "initial", name)?;
        let initial_unsatisfied = population.unsatisfied_count()?;

        let summary = {
            let relocate_rng = rng.stream(&format!("{name}/relocate"));
            let mut simulator = SegregationSimulator::new(&mut population, config.max_iterations);
            simulator
                .run_with_hook(relocate_rng, |report| {
                    info!(
                        simulation = %name,
                        iteration = report.iteration,
                        changes = report.changes,
                        "relocation round"
                    );
                    progress(name.as_str(), report);
                })
                .with_context(|| format!("simulation '{name}' aborted"))?
        };

        self.maybe_render(&population, &simulation.final_title(), "final", name)?;
        let report = RunReport::new(&self.scenario.name, name, self.scenario.seed, config, summary)
            .with_description(self.scenario.description.clone())
            .with_unsatisfied(initial_unsatisfied, population.unsatisfied_count()?)
            .with_race_counts(population.race_counts());

        if self.settings.write_reports {
            let path = report.write(&self.settings.output_dir)?;
            info!(path = %path.display(), "wrote report");
        }
        Ok(report)
    }

    fn maybe_render(
        &self,
        population: &GridPopulation,
        title: &str,
        phase: &str,
        name: &str,
    ) -> Result<()> {
        if !self.settings.render {
            return Ok(());
        }
        let target = self.settings.output_dir.join(format!("{name}_{phase}.svg"));
        self.renderer
            .render(&population.snapshot(), title, &target)
            .with_context(|| format!("Failed to render {}", target.display()))?;
        info!(path = %target.display(), "wrote plot");
        Ok(())
    }
}
