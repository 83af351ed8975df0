use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use schelling::{
    render::SvgRenderer,
    runner::{RunnerSettings, ScenarioRunner},
    scenario::{Scenario, ScenarioLoader},
    telemetry,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Schelling segregation model runner")]
struct Cli {
    /// Path to a scenario YAML file (runs the built-in three-threshold demo when omitted)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Override the iteration budget of every simulation
    #[arg(long)]
    iterations: Option<u64>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for plots and reports
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Skip writing SVG plots
    #[arg(long)]
    no_render: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(&cli.log_level);

    let mut scenario = match &cli.scenario {
        Some(path) => ScenarioLoader::new(".").load(path)?,
        None => Scenario::binpress_demo(),
    }
    .with_max_iterations(cli.iterations);
    if let Some(seed) = cli.seed {
        scenario.seed = seed;
    }
    if let Some(dir) = cli.output_dir {
        scenario.output_dir = dir;
    }
    scenario.validate()?;

    let mut settings = RunnerSettings::from_scenario(&scenario);
    settings.render = !cli.no_render;

    let reports = ScenarioRunner::new(&scenario, settings, SvgRenderer::new()).run()?;
    for report in &reports {
        info!(
            simulation = %report.simulation,
            outcome = ?report.outcome,
            iterations = report.iterations,
            unsatisfied = report.final_unsatisfied,
            "simulation finished"
        );
    }
    println!(
        "Scenario '{}' completed {} simulations. Output in {}",
        scenario.name,
        reports.len(),
        scenario.output_dir.display()
    );
    Ok(())
}
