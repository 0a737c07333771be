//! Robot models: the shared kinematic contract plus the three concrete
//! serial-link robots of the family.
//!
//! Every model exposes closed-form forward kinematics built from homogeneous
//! transforms, an analytical inverse, a Jacobian assembled column by column
//! from transform derivatives, and its joint/operational limits. The models
//! are immutable after construction and freely shareable across threads.

use crate::{Error, Result};
use nalgebra::{DMatrix, DVector, Matrix4};

mod leg;
mod rrr;
mod rt;

pub use leg::LegRobot;
pub use rrr::RobotRrr;
pub use rt::RobotRt;

/// Outcome of an analytical inverse-kinematics query.
///
/// An out-of-workspace target is a value, not a fault, so unreachable poses
/// are reported here rather than through `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum IkSolutions {
    /// The target lies outside the reachable workspace.
    Unreachable,
    /// The pose is singular: infinitely many configurations reach the
    /// target, one representative is kept.
    Infinite(DVector<f64>),
    /// A finite number of configurations reach the target; the stored one
    /// is the first branch, which downstream callers use as the default.
    Finite(usize, DVector<f64>),
}

impl IkSolutions {
    /// The default configuration, if the target is reachable at all.
    pub fn first(&self) -> Option<&DVector<f64>> {
        match self {
            IkSolutions::Unreachable => None,
            IkSolutions::Infinite(q) | IkSolutions::Finite(_, q) => Some(q),
        }
    }

    /// Solution count: -1 for infinitely many, 0 for unreachable,
    /// otherwise the number of discrete branches found.
    pub fn count(&self) -> i32 {
        match self {
            IkSolutions::Unreachable => 0,
            IkSolutions::Infinite(_) => -1,
            IkSolutions::Finite(n, _) => *n as i32,
        }
    }
}

/// Kinematic contract shared by all robot models.
pub trait RobotModel: Send + Sync {
    /// Names of the joints, in joint-vector order.
    fn joint_names(&self) -> &'static [&'static str];

    /// Names of the operational-space dimensions.
    fn operational_names(&self) -> &'static [&'static str];

    fn nb_joints(&self) -> usize {
        self.joint_names().len()
    }

    fn nb_operational_dims(&self) -> usize {
        self.operational_names().len()
    }

    /// Per-joint `[min, max]` bounds, one row per joint.
    fn joints_limits(&self) -> Vec<[f64; 2]>;

    /// Per-dimension `[min, max]` bounds of the operational space.
    fn operational_limits(&self) -> Vec<[f64; 2]>;

    /// Base-to-tool placement for the joint configuration `q`.
    fn base_to_tool(&self, q: &DVector<f64>) -> Matrix4<f64>;

    /// Forward kinematics: operational-space coordinates of the tool.
    fn forward(&self, q: &DVector<f64>) -> DVector<f64>;

    /// Partial derivatives of [`RobotModel::forward`] with respect to each
    /// joint, one column per joint.
    fn jacobian(&self, q: &DVector<f64>) -> DMatrix<f64>;

    /// Closed-form inverse kinematics for an operational-space target.
    fn analytical_ik(&self, target: &DVector<f64>) -> IkSolutions;
}

/// Looks up a robot model by its public name.
pub fn robot_by_name(name: &str) -> Result<Box<dyn RobotModel>> {
    match name {
        "RobotRT" => Ok(Box::new(RobotRt::new())),
        "RobotRRR" => Ok(Box::new(RobotRrr::new())),
        "LegRobot" => Ok(Box::new(LegRobot::new())),
        _ => Err(Error::UnknownRobotModel(name.to_string())),
    }
}

/// Joint angles `(alpha, beta)` reaching a planar target with a two-link
/// chain. The first entry is the branch downstream callers treat as the
/// default, so the ordering is part of the contract. When the elbow is
/// aligned with the target (alpha below 1e-9) the two branches coincide
/// and only one is emitted.
///
/// # Arguments
///
/// * `x`, `y`: the target position in the chain's plane
/// * `l1`: length of the link attached to the first joint
/// * `l2`: length of the link carrying the end point
///
/// returns: zero, one or two `[alpha, beta]` solutions
pub fn cosine_law(x: f64, y: f64, l1: f64, l2: f64) -> Vec<[f64; 2]> {
    use std::f64::consts::PI;

    let mut solutions = Vec::new();
    let dist = x.hypot(y);
    if dist < (l1 - l2).abs() || dist > l1 + l2 {
        return solutions;
    }
    let phi = y.atan2(x);
    let alpha = ((l1 * l1 + dist * dist - l2 * l2) / (2.0 * l1 * dist)).acos();
    let beta = ((l1 * l1 + l2 * l2 - dist * dist) / (2.0 * l1 * l2)).acos();
    solutions.push([phi + alpha, beta - PI]);
    if alpha.abs() > 1e-9 {
        solutions.push([phi - alpha, PI - beta]);
    }
    solutions
}
