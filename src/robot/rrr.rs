//! Three-revolute robot reaching positions in 3-D space.

use crate::robot::{cosine_law, IkSolutions, RobotModel};
use crate::transform::{d_rot_x, d_rot_z, invert, rot_x, rot_z, translation};
use nalgebra::{DMatrix, DVector, Matrix4, Vector3, Vector4};
use std::f64::consts::{FRAC_PI_2, PI};

/// Robot with a vertical-axis base joint followed by two horizontal-axis
/// joints; the operational space is the 3-D tool position.
pub struct RobotRrr {
    l0: f64,
    l1: f64,
    l2: f64,
    l3: f64,
    t_0_1: Matrix4<f64>,
    t_1_2: Matrix4<f64>,
    t_2_3: Matrix4<f64>,
    t_3_e: Matrix4<f64>,
}

impl RobotRrr {
    pub fn new() -> Self {
        let w = 0.05;
        let l0 = 1.0 + w / 2.0;
        let l1 = 0.5;
        let l2 = 0.4;
        let l3 = 0.3 + w / 2.0;
        Self {
            l0,
            l1,
            l2,
            l3,
            t_0_1: translation(Vector3::new(0.0, 0.0, l0)),
            t_1_2: translation(Vector3::new(0.0, l1, 0.0)),
            t_2_3: translation(Vector3::new(0.0, l2, 0.0)),
            t_3_e: translation(Vector3::new(0.0, l3, 0.0)),
        }
    }

    fn tool_position(t: &Matrix4<f64>) -> DVector<f64> {
        DVector::from_vec(vec![t[(0, 3)], t[(1, 3)], t[(2, 3)]])
    }
}

impl Default for RobotRrr {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotModel for RobotRrr {
    fn joint_names(&self) -> &'static [&'static str] {
        &["q1", "q2", "q3"]
    }

    fn operational_names(&self) -> &'static [&'static str] {
        &["x", "y", "z"]
    }

    fn joints_limits(&self) -> Vec<[f64; 2]> {
        vec![[-PI, PI]; 3]
    }

    fn operational_limits(&self) -> Vec<[f64; 2]> {
        let max_xy = self.l1 + self.l2 + self.l3;
        let min_z = self.l0 - self.l2 - self.l3;
        let max_z = self.l0 + self.l2 + self.l3;
        vec![[-max_xy, max_xy], [-max_xy, max_xy], [min_z, max_z]]
    }

    fn base_to_tool(&self, q: &DVector<f64>) -> Matrix4<f64> {
        self.t_0_1
            * rot_z(q[0])
            * self.t_1_2
            * rot_x(q[1])
            * self.t_2_3
            * rot_x(q[2])
            * self.t_3_e
    }

    fn forward(&self, q: &DVector<f64>) -> DVector<f64> {
        Self::tool_position(&self.base_to_tool(q))
    }

    fn jacobian(&self, q: &DVector<f64>) -> DMatrix<f64> {
        let by_q0 = self.t_0_1
            * d_rot_z(q[0])
            * self.t_1_2
            * rot_x(q[1])
            * self.t_2_3
            * rot_x(q[2])
            * self.t_3_e;
        let by_q1 = self.t_0_1
            * rot_z(q[0])
            * self.t_1_2
            * d_rot_x(q[1])
            * self.t_2_3
            * rot_x(q[2])
            * self.t_3_e;
        let by_q2 = self.t_0_1
            * rot_z(q[0])
            * self.t_1_2
            * rot_x(q[1])
            * self.t_2_3
            * d_rot_x(q[2])
            * self.t_3_e;
        let mut j = DMatrix::zeros(3, 3);
        j.set_column(0, &Self::tool_position(&by_q0));
        j.set_column(1, &Self::tool_position(&by_q1));
        j.set_column(2, &Self::tool_position(&by_q2));
        j
    }

    fn analytical_ik(&self, target: &DVector<f64>) -> IkSolutions {
        // Directly above the base axis the first joint is unconstrained.
        let singular = target[0].hypot(target[1]) < 1e-9;
        let theta = if singular {
            0.0
        } else {
            target[1].atan2(target[0]) - FRAC_PI_2
        };
        let mut solutions = Vec::new();
        for q0 in [theta, theta + PI] {
            let target_in_0 = Vector4::new(target[0], target[1], target[2], 1.0);
            let target_in_2a =
                invert(&self.t_1_2) * rot_z(-q0) * invert(&self.t_0_1) * target_in_0;
            for q12 in cosine_law(target_in_2a[1], target_in_2a[2], self.l2, self.l3) {
                solutions.push(DVector::from_vec(vec![q0, q12[0], q12[1]]));
            }
        }
        if solutions.is_empty() {
            return IkSolutions::Unreachable;
        }
        let first = solutions.swap_remove(0);
        if singular {
            IkSolutions::Infinite(first)
        } else {
            IkSolutions::Finite(solutions.len() + 1, first)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    #[test]
    fn forward_at_zero() {
        let robot = RobotRrr::new();
        let x = robot.forward(&DVector::zeros(3));
        assert_relative_eq!(x[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.225, epsilon = 1e-12);
        assert_relative_eq!(x[2], 1.025, epsilon = 1e-12);
    }

    #[test_case(0.3, 0.4, -0.5)]
    #[test_case(-1.2, 0.8, 0.9)]
    #[test_case(2.0, -0.3, -1.1)]
    #[test_case(0.0, 1.0, 1.0)]
    fn ik_round_trip_through_forward(q0: f64, q1: f64, q2: f64) {
        let robot = RobotRrr::new();
        let q = DVector::from_vec(vec![q0, q1, q2]);
        let target = robot.forward(&q);
        let sols = robot.analytical_ik(&target);
        assert!(sols.count() > 0, "no solution for {target:?}");
        let reached = robot.forward(sols.first().unwrap());
        for dim in 0..3 {
            assert_relative_eq!(reached[dim], target[dim], epsilon = 1e-6);
        }
    }

    #[test]
    fn ik_reports_singularity_on_the_base_axis() {
        let robot = RobotRrr::new();
        let target = DVector::from_vec(vec![0.0, 0.0, 1.5]);
        let sols = robot.analytical_ik(&target);
        assert_eq!(sols.count(), -1);
        let reached = robot.forward(sols.first().unwrap());
        for dim in 0..3 {
            assert_relative_eq!(reached[dim], target[dim], epsilon = 1e-6);
        }
    }

    #[test]
    fn ik_rejects_far_targets() {
        let robot = RobotRrr::new();
        let target = DVector::from_vec(vec![2.0, 2.0, 1.0]);
        assert_eq!(robot.analytical_ik(&target), IkSolutions::Unreachable);
    }

    #[test_case(0.0, 0.3, 0.3)]
    #[test_case(1.1, -0.7, 0.4)]
    #[test_case(-0.4, 1.9, -2.2)]
    fn jacobian_matches_finite_differences(q0: f64, q1: f64, q2: f64) {
        let robot = RobotRrr::new();
        let q = DVector::from_vec(vec![q0, q1, q2]);
        let j = robot.jacobian(&q);
        let h = 1e-7;
        for col in 0..3 {
            let mut hi = q.clone();
            let mut lo = q.clone();
            hi[col] += h;
            lo[col] -= h;
            let num = (robot.forward(&hi) - robot.forward(&lo)) / (2.0 * h);
            for row in 0..3 {
                assert_relative_eq!(j[(row, col)], num[row], epsilon = 1e-6);
            }
        }
    }
}
