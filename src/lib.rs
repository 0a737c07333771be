//! Kinematics and trajectory generation for a family of serial-link robots.
//!
//! The crate pairs closed-form forward/inverse kinematics for three robot
//! topologies with a set of one-dimensional trajectory generators, and
//! composes both into multi-dimensional robot trajectories that can be
//! planned in joint or operational space.

pub mod config;
pub mod ik;
pub mod robot;
pub mod robot_trajectory;
pub mod trajectory;
pub mod transform;

pub use ik::{solve, IkMethod};
pub use robot::{cosine_law, robot_by_name, IkSolutions, LegRobot, RobotModel, RobotRrr, RobotRt};
pub use robot_trajectory::{RobotTrajectory, Space};
pub use trajectory::{build_trajectory, Trajectory, TrajectoryParameters};

/// Errors raised while building models or trajectories from configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown trajectory type '{0}'")]
    UnknownTrajectoryType(String),
    #[error("unknown robot model '{0}'")]
    UnknownRobotModel(String),
    #[error("unknown space '{0}', expected 'joint' or 'operational'")]
    UnknownSpace(String),
    #[error("unknown inverse kinematics method '{0}'")]
    UnknownIkMethod(String),
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),
    #[error("parameter '{name}' must be strictly positive, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("invalid knots: {0}")]
    InvalidKnots(String),
    #[error("target {0:?} is outside the reachable workspace")]
    UnreachableTarget(Vec<f64>),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
