//! Multi-dimensional trajectories for a robot model.
//!
//! A robot trajectory plans one 1-D trajectory per dimension of its
//! planification space and answers queries in either space, converting
//! positions through the kinematics and derivatives through the Jacobian.

use crate::robot::RobotModel;
use crate::trajectory::{build_trajectory, Trajectory, TrajectoryParameters};
use crate::{Error, Result};
use nalgebra::DVector;
use std::str::FromStr;

/// Space in which targets are expressed or trajectories are planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    Joint,
    Operational,
}

impl FromStr for Space {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "joint" => Ok(Space::Joint),
            "operational" => Ok(Space::Operational),
            _ => Err(Error::UnknownSpace(s.to_string())),
        }
    }
}

/// One 1-D trajectory per planification-space dimension, attached to the
/// robot model that converts between spaces.
pub struct RobotTrajectory {
    model: Box<dyn RobotModel>,
    trajectories: Vec<Box<dyn Trajectory>>,
    planification_space: Space,
    start: f64,
    end: f64,
}

impl RobotTrajectory {
    /// Builds the per-dimension trajectories from a target matrix.
    ///
    /// Each target row holds one knot in `target_space`; spline trajectory
    /// types additionally require a leading time column. Targets are
    /// converted into `planification_space` at construction (positions
    /// through the forward model, joint targets through the first branch of
    /// the analytical inverse), so the trajectory owns its converted knots
    /// and never aliases the caller's matrix. A target the inverse cannot
    /// reach aborts construction.
    pub fn new(
        model: Box<dyn RobotModel>,
        targets: &[Vec<f64>],
        trajectory_type: &str,
        target_space: Space,
        planification_space: Space,
        start: f64,
        parameters: Option<&TrajectoryParameters>,
    ) -> Result<Self> {
        let target_dims = match target_space {
            Space::Joint => model.nb_joints(),
            Space::Operational => model.nb_operational_dims(),
        };
        let plan_dims = match planification_space {
            Space::Joint => model.nb_joints(),
            Space::Operational => model.nb_operational_dims(),
        };
        let has_time = trajectory_type != "TrapezoidalVelocity";
        let expected = target_dims + usize::from(has_time);

        let mut times = Vec::with_capacity(targets.len());
        let mut converted: Vec<DVector<f64>> = Vec::with_capacity(targets.len());
        for row in targets {
            if row.len() != expected {
                return Err(Error::InvalidKnots(format!(
                    "target rows need {expected} columns, got {}",
                    row.len()
                )));
            }
            let values = if has_time {
                times.push(row[0]);
                &row[1..]
            } else {
                &row[..]
            };
            let vector = DVector::from_row_slice(values);
            let in_plan = if target_space == planification_space {
                vector
            } else {
                match planification_space {
                    Space::Operational => model.forward(&vector),
                    Space::Joint => model
                        .analytical_ik(&vector)
                        .first()
                        .cloned()
                        .ok_or_else(|| Error::UnreachableTarget(values.to_vec()))?,
                }
            };
            converted.push(in_plan);
        }

        let mut trajectories = Vec::with_capacity(plan_dims);
        for dim in 0..plan_dims {
            let knots: Vec<Vec<f64>> = converted
                .iter()
                .enumerate()
                .map(|(i, row)| {
                    if has_time {
                        vec![times[i], row[dim]]
                    } else {
                        vec![row[dim]]
                    }
                })
                .collect();
            trajectories.push(build_trajectory(trajectory_type, start, &knots, parameters)?);
        }
        let end = trajectories
            .iter()
            .map(|trajectory| trajectory.end())
            .fold(f64::NEG_INFINITY, f64::max);
        Ok(Self {
            model,
            trajectories,
            planification_space,
            start,
            end,
        })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    /// Latest end across the per-dimension trajectories.
    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn planification_space(&self) -> Space {
        self.planification_space
    }

    pub fn model(&self) -> &dyn RobotModel {
        self.model.as_ref()
    }

    /// Derivative of order `degree` of one planification-space dimension.
    pub fn planification_value(&self, t: f64, dim: usize, degree: u32) -> f64 {
        self.trajectories[dim].value_at(t, degree)
    }

    fn planification_vector(&self, t: f64, degree: u32) -> DVector<f64> {
        DVector::from_iterator(
            self.trajectories.len(),
            self.trajectories.iter().map(|traj| traj.value_at(t, degree)),
        )
    }

    /// Tool position in operational space at time `t`.
    pub fn operational_target(&self, t: f64) -> Option<DVector<f64>> {
        let plan = self.planification_vector(t, 0);
        match self.planification_space {
            Space::Operational => Some(plan),
            Space::Joint => Some(self.model.forward(&plan)),
        }
    }

    /// Joint configuration at time `t`, through the analytical inverse when
    /// the plan lives in operational space.
    pub fn joint_target(&self, t: f64) -> Option<DVector<f64>> {
        let plan = self.planification_vector(t, 0);
        match self.planification_space {
            Space::Joint => Some(plan),
            Space::Operational => self.model.analytical_ik(&plan).first().cloned(),
        }
    }

    /// Tool velocity, converted through the Jacobian when planning in joint
    /// space.
    pub fn operational_velocity(&self, t: f64) -> Option<DVector<f64>> {
        let velocity = self.planification_vector(t, 1);
        match self.planification_space {
            Space::Operational => Some(velocity),
            Space::Joint => {
                let joints = self.planification_vector(t, 0);
                Some(self.model.jacobian(&joints) * velocity)
            }
        }
    }

    /// Joint velocity, through the Moore-Penrose pseudoinverse of the
    /// Jacobian when planning in operational space. `None` when the current
    /// pose has no analytical inverse or the pseudoinverse fails.
    pub fn joint_velocity(&self, t: f64) -> Option<DVector<f64>> {
        let velocity = self.planification_vector(t, 1);
        match self.planification_space {
            Space::Joint => Some(velocity),
            Space::Operational => {
                let position = self.planification_vector(t, 0);
                let joints = self.model.analytical_ik(&position).first().cloned()?;
                let pinv = self.model.jacobian(&joints).svd(true, true).pseudo_inverse(1e-10).ok()?;
                Some(pinv * velocity)
            }
        }
    }

    /// Tool acceleration. Cross-space conversion reuses the position map
    /// and drops the J̇·q̇ term, so it is only exact where the Jacobian is
    /// locally constant.
    pub fn operational_acceleration(&self, t: f64) -> Option<DVector<f64>> {
        let acc = self.planification_vector(t, 2);
        match self.planification_space {
            Space::Operational => Some(acc),
            Space::Joint => Some(self.model.forward(&acc)),
        }
    }

    /// Joint acceleration, with the same simplification as
    /// [`RobotTrajectory::operational_acceleration`].
    pub fn joint_acceleration(&self, t: f64) -> Option<DVector<f64>> {
        let acc = self.planification_vector(t, 2);
        match self.planification_space {
            Space::Joint => Some(acc),
            Space::Operational => self.model.analytical_ik(&acc).first().cloned(),
        }
    }

    /// Derivative of order `degree` of dimension `dim` in `space`.
    ///
    /// Cross-space derivatives above order 2 are not available.
    pub fn value(&self, t: f64, dim: usize, degree: u32, space: Space) -> Option<f64> {
        if space == self.planification_space {
            return Some(self.trajectories[dim].value_at(t, degree));
        }
        let vector = match (space, degree) {
            (Space::Operational, 0) => self.operational_target(t),
            (Space::Joint, 0) => self.joint_target(t),
            (Space::Operational, 1) => self.operational_velocity(t),
            (Space::Joint, 1) => self.joint_velocity(t),
            (Space::Operational, 2) => self.operational_acceleration(t),
            (Space::Joint, 2) => self.joint_acceleration(t),
            _ => None,
        };
        vector.map(|v| v[dim])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::robot_by_name;
    use approx::assert_relative_eq;

    fn rrr_operational_targets() -> Vec<Vec<f64>> {
        vec![vec![0.0, 0.3, 1.0, 1.0], vec![2.0, 0.0, 1.1, 1.2]]
    }

    #[test]
    fn joint_plan_reaches_operational_targets() {
        let model = robot_by_name("RobotRRR").unwrap();
        let trajectory = RobotTrajectory::new(
            model,
            &rrr_operational_targets(),
            "LinearSpline",
            Space::Operational,
            Space::Joint,
            0.0,
            None,
        )
        .unwrap();
        assert_eq!(trajectory.start(), 0.0);
        assert_eq!(trajectory.end(), 2.0);
        for (dim, expected) in [0.0, 1.1, 1.2].iter().enumerate() {
            let value = trajectory
                .value(trajectory.end(), dim, 0, Space::Operational)
                .unwrap();
            assert_relative_eq!(value, *expected, epsilon = 1e-6);
        }
        // same-space queries read the planned trajectory directly
        let q0 = trajectory.value(0.0, 0, 0, Space::Joint).unwrap();
        assert_relative_eq!(q0, trajectory.planification_value(0.0, 0, 0));
    }

    #[test]
    fn operational_velocity_matches_finite_differences() {
        let model = robot_by_name("RobotRRR").unwrap();
        let trajectory = RobotTrajectory::new(
            model,
            &rrr_operational_targets(),
            "LinearSpline",
            Space::Operational,
            Space::Joint,
            0.0,
            None,
        )
        .unwrap();
        let t = 1.0;
        let h = 1e-6;
        for dim in 0..3 {
            let hi = trajectory.value(t + h, dim, 0, Space::Operational).unwrap();
            let lo = trajectory.value(t - h, dim, 0, Space::Operational).unwrap();
            let velocity = trajectory.value(t, dim, 1, Space::Operational).unwrap();
            assert_relative_eq!(velocity, (hi - lo) / (2.0 * h), epsilon = 1e-4);
        }
    }

    #[test]
    fn operational_plan_converts_back_to_joints() {
        let model = robot_by_name("RobotRRR").unwrap();
        let trajectory = RobotTrajectory::new(
            model,
            &rrr_operational_targets(),
            "LinearSpline",
            Space::Operational,
            Space::Operational,
            0.0,
            None,
        )
        .unwrap();
        let t = 0.7;
        let joints = trajectory.joint_target(t).unwrap();
        let model = robot_by_name("RobotRRR").unwrap();
        let reached = model.forward(&joints);
        for dim in 0..3 {
            assert_relative_eq!(
                reached[dim],
                trajectory.planification_value(t, dim, 0),
                epsilon = 1e-6
            );
        }
        // pinv(J) maps the operational velocity onto joint rates J can undo
        let joint_velocity = trajectory.joint_velocity(t).unwrap();
        let back = model.jacobian(&joints) * joint_velocity;
        for dim in 0..3 {
            assert_relative_eq!(
                back[dim],
                trajectory.planification_value(t, dim, 1),
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn trapezoid_plan_without_time_column() {
        let model = robot_by_name("RobotRT").unwrap();
        let params = TrajectoryParameters {
            vel_max: Some(1.0),
            acc_max: Some(2.0),
        };
        let trajectory = RobotTrajectory::new(
            model,
            &[vec![0.0, 0.1], vec![0.5, 0.3]],
            "TrapezoidalVelocity",
            Space::Joint,
            Space::Joint,
            0.0,
            Some(&params),
        )
        .unwrap();
        // per-dimension profiles end at different times; the longest wins
        assert!(trajectory.end() > trajectory.start());
        let t_end = trajectory.end();
        assert_relative_eq!(trajectory.planification_value(t_end, 0, 0), 0.5);
        assert_relative_eq!(trajectory.planification_value(t_end, 1, 0), 0.3);
    }

    #[test]
    fn unreachable_target_aborts_construction() {
        let model = robot_by_name("RobotRT").unwrap();
        let result = RobotTrajectory::new(
            model,
            &[vec![0.0, 0.3, -0.275], vec![1.0, 5.0, 5.0]],
            "LinearSpline",
            Space::Operational,
            Space::Joint,
            0.0,
            None,
        );
        assert!(matches!(result, Err(Error::UnreachableTarget(_))));
    }

    #[test]
    fn row_width_is_validated() {
        let model = robot_by_name("RobotRRR").unwrap();
        let result = RobotTrajectory::new(
            model,
            &[vec![0.0, 0.3, 1.0], vec![1.0, 0.0, 1.1]],
            "LinearSpline",
            Space::Operational,
            Space::Joint,
            0.0,
            None,
        );
        assert!(matches!(result, Err(Error::InvalidKnots(_))));
    }

    #[test]
    fn cross_space_jerk_is_not_available() {
        let model = robot_by_name("RobotRRR").unwrap();
        let trajectory = RobotTrajectory::new(
            model,
            &rrr_operational_targets(),
            "LinearSpline",
            Space::Operational,
            Space::Joint,
            0.0,
            None,
        )
        .unwrap();
        assert!(trajectory.value(1.0, 0, 3, Space::Operational).is_none());
        // same-space jerk stays answerable through the 1-D contract
        assert_eq!(trajectory.value(1.0, 0, 3, Space::Joint), Some(0.0));
    }

    #[test]
    fn space_names_parse() {
        assert_eq!("joint".parse::<Space>().unwrap(), Space::Joint);
        assert_eq!("operational".parse::<Space>().unwrap(), Space::Operational);
        assert!("cartesian".parse::<Space>().is_err());
    }
}
