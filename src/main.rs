use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rs_surface_trajopt::config::PlannerConfig;
use rs_surface_trajopt::config_from_file::CellDescription;
use rs_surface_trajopt::environment::Environment;
use rs_surface_trajopt::problem::ProblemBuilder;
use rs_surface_trajopt::tool_path::ToolPath;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Build the surface following problem for the scanned path and report on it.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Scan file, two header rows followed by x,y,z,i,j,k rows (millimeters)
    #[arg(long)]
    path: PathBuf,

    /// YAML with the planner settings and the cell description
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print every cost and constraint term
    #[arg(long)]
    terms: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let (config, cell) = match &args.config {
        Some(file) => (
            PlannerConfig::from_yaml_file(file)
                .with_context(|| format!("reading planner settings from {}", file.display()))?,
            CellDescription::from_yaml_file(file)
                .with_context(|| format!("reading cell description from {}", file.display()))?,
        ),
        None => (PlannerConfig::default(), CellDescription::default()),
    };

    let mut env = cell.into_environment();
    env.set_state(&config.initial_state);

    let path = ToolPath::from_file(&args.path)
        .with_context(|| format!("reading tool path from {}", args.path.display()))?;
    if path.is_empty() {
        warn!("{} has no samples, zero planning steps", args.path.display());
    }

    let problem = ProblemBuilder::new(&config)
        .build(&env, &path)
        .context("building the planning problem")?;

    println!(
        "{}: {} steps, {} joints, {} cost terms, {} constraint terms",
        problem.manipulator.name,
        problem.n_steps,
        problem.dof(),
        problem.costs.len(),
        problem.constraints.len()
    );
    if args.terms {
        for term in problem.costs.iter().chain(&problem.constraints) {
            println!("  {}", term);
        }
    }

    let collisions = env.continuous_collision_check(
        &problem.manipulator.joint_names,
        &problem.manipulator.link_names,
        &problem.init_trajectory,
    );
    info!("Initial trajectory number of continuous collisions: {}", collisions.len());
    Ok(())
}
