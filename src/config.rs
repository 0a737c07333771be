//! Configuration records for trajectories.
//!
//! Records mirror the JSON surface of the sampling tool: a 1-D trajectory
//! names its type and knots, a robot trajectory adds the model and the
//! target/planification spaces.

use crate::robot::robot_by_name;
use crate::robot_trajectory::RobotTrajectory;
use crate::trajectory::{build_trajectory, Trajectory, TrajectoryParameters};
use crate::Result;
use serde::Deserialize;

/// Knot payload of a trajectory record: spline rows `[t, x, ...]`, or the
/// flat endpoint pair of a velocity profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KnotArray {
    Rows(Vec<Vec<f64>>),
    Flat(Vec<f64>),
}

impl KnotArray {
    fn rows(&self) -> Vec<Vec<f64>> {
        match self {
            KnotArray::Rows(rows) => rows.clone(),
            KnotArray::Flat(values) => values.iter().map(|value| vec![*value]).collect(),
        }
    }
}

/// Record describing a 1-D trajectory.
#[derive(Debug, Clone, Deserialize)]
pub struct TrajectoryConfig {
    pub type_name: String,
    pub start: f64,
    pub knots: KnotArray,
    #[serde(default)]
    pub parameters: Option<TrajectoryParameters>,
}

/// Record describing a robot trajectory.
#[derive(Debug, Clone, Deserialize)]
pub struct RobotTrajectoryConfig {
    pub model_name: String,
    pub targets: Vec<Vec<f64>>,
    pub trajectory_type: String,
    pub target_space: String,
    pub planification_space: String,
    pub start: f64,
    #[serde(default)]
    pub parameters: Option<TrajectoryParameters>,
}

/// Builds the trajectory a record describes.
pub fn build_trajectory_config(config: &TrajectoryConfig) -> Result<Box<dyn Trajectory>> {
    build_trajectory(
        &config.type_name,
        config.start,
        &config.knots.rows(),
        config.parameters.as_ref(),
    )
}

/// Resolves the model and builds the robot trajectory a record describes.
pub fn build_robot_trajectory_config(config: &RobotTrajectoryConfig) -> Result<RobotTrajectory> {
    let model = robot_by_name(&config.model_name)?;
    RobotTrajectory::new(
        model,
        &config.targets,
        &config.trajectory_type,
        config.target_space.parse()?,
        config.planification_space.parse()?,
        config.start,
        config.parameters.as_ref(),
    )
}

pub fn trajectory_from_json(text: &str) -> Result<Box<dyn Trajectory>> {
    let config: TrajectoryConfig = serde_json::from_str(text)?;
    build_trajectory_config(&config)
}

pub fn robot_trajectory_from_json(text: &str) -> Result<RobotTrajectory> {
    let config: RobotTrajectoryConfig = serde_json::from_str(text)?;
    build_robot_trajectory_config(&config)
}
