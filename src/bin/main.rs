//! Samples trajectory configuration files onto a regular time grid and
//! prints the result as CSV on stdout. Diagnostics go to stderr.

use clap::Parser;
use rayon::prelude::*;
use serial_robots::config::{robot_trajectory_from_json, trajectory_from_json};
use serial_robots::{Result, RobotTrajectory, Space, Trajectory};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

const ORDER_NAMES: [&str; 4] = ["position", "velocity", "acceleration", "jerk"];

#[derive(Parser)]
#[command(about = "Sample 1-D or robot trajectories as CSV")]
struct Args {
    /// Sample step [s]
    #[arg(long, default_value_t = 0.02)]
    dt: f64,

    /// Padding before the earliest start and after the latest end [s]
    #[arg(long, default_value_t = 0.2)]
    margin: f64,

    /// Read robot-trajectory records instead of 1-D ones
    #[arg(long)]
    robot: bool,

    /// Derivative orders to emit
    #[arg(long, value_delimiter = ',', default_value = "0,1,2")]
    degrees: Vec<u32>,

    /// Trajectory configuration files (JSON records)
    #[arg(required = true)]
    trajectories: Vec<PathBuf>,
}

enum Source {
    OneDim(Box<dyn Trajectory>),
    Robot(RobotTrajectory),
}

impl Source {
    fn start(&self) -> f64 {
        match self {
            Source::OneDim(trajectory) => trajectory.start(),
            Source::Robot(trajectory) => trajectory.start(),
        }
    }

    fn end(&self) -> f64 {
        match self {
            Source::OneDim(trajectory) => trajectory.end(),
            Source::Robot(trajectory) => trajectory.end(),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    if let Err(error) = run(&args) {
        error!("failed to sample trajectories: {error}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut sources = Vec::new();
    for path in &args.trajectories {
        let text = std::fs::read_to_string(path)?;
        let source = if args.robot {
            Source::Robot(robot_trajectory_from_json(&text)?)
        } else {
            Source::OneDim(trajectory_from_json(&text)?)
        };
        sources.push((path.display().to_string(), source));
    }

    let tmin = sources
        .iter()
        .map(|(_, source)| source.start())
        .fold(f64::INFINITY, f64::min)
        - args.margin;
    let tmax = sources
        .iter()
        .map(|(_, source)| source.end())
        .fold(f64::NEG_INFINITY, f64::max)
        + args.margin;
    let steps = ((tmax - tmin) / args.dt).ceil() as usize;

    println!("source,t,order,variable,value");
    for (name, source) in &sources {
        let rows: Vec<String> = (0..steps)
            .into_par_iter()
            .flat_map_iter(|k| sample(name, source, tmin + k as f64 * args.dt, &args.degrees))
            .collect();
        for row in &rows {
            println!("{row}");
        }
    }
    Ok(())
}

fn sample(name: &str, source: &Source, t: f64, degrees: &[u32]) -> Vec<String> {
    let mut rows = Vec::new();
    for &degree in degrees {
        let order = ORDER_NAMES
            .get(degree as usize)
            .copied()
            .unwrap_or("derivative");
        match source {
            Source::OneDim(trajectory) => {
                let value = trajectory.value_at(t, degree);
                rows.push(format!("{name},{t},{order},x,{value}"));
            }
            Source::Robot(trajectory) => {
                let spaces = [
                    (Space::Joint, trajectory.model().joint_names()),
                    (Space::Operational, trajectory.model().operational_names()),
                ];
                for (space, variables) in spaces {
                    for (dim, variable) in variables.iter().enumerate() {
                        if let Some(value) = trajectory.value(t, dim, degree, space) {
                            rows.push(format!("{name},{t},{order},{variable},{value}"));
                        }
                    }
                }
            }
        }
    }
    rows
}
