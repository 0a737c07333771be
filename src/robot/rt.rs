//! Two-joint robot with a revolute base and a prismatic forearm.

use crate::robot::{IkSolutions, RobotModel};
use crate::transform::{d_rot_z, d_translation, rot_z, translation};
use nalgebra::{DMatrix, DVector, Matrix4, Vector3};
use std::f64::consts::PI;

/// Revolute-translational robot. The tool moves in a horizontal plane, so
/// its operational space is the 2-D `(x, y)` position.
pub struct RobotRt {
    l1: f64,
    l2: f64,
    /// Prismatic stroke assumed by the analytical inverse.
    max_q1: f64,
    t_0_1: Matrix4<f64>,
    t_1_2: Matrix4<f64>,
    t_2_e: Matrix4<f64>,
}

impl RobotRt {
    pub fn new() -> Self {
        let w = 0.05;
        let l0 = 1.0;
        let l1 = 0.2;
        let l2 = 0.25 + w / 2.0;
        Self {
            l1,
            l2,
            max_q1: 0.25,
            t_0_1: translation(Vector3::new(0.0, 0.0, l0 + w / 2.0)),
            t_1_2: translation(Vector3::new(l1, 0.0, 0.0)),
            t_2_e: translation(Vector3::new(0.0, -l2, 0.0)) * rot_z(PI),
        }
    }
}

impl Default for RobotRt {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotModel for RobotRt {
    fn joint_names(&self) -> &'static [&'static str] {
        &["q1", "q2"]
    }

    fn operational_names(&self) -> &'static [&'static str] {
        &["x", "y"]
    }

    fn joints_limits(&self) -> Vec<[f64; 2]> {
        vec![[-PI, PI], [0.0, 0.55]]
    }

    fn operational_limits(&self) -> Vec<[f64; 2]> {
        let max_dist = (self.l1 + self.max_q1).hypot(self.l2);
        vec![[-max_dist, max_dist], [-max_dist, max_dist]]
    }

    fn base_to_tool(&self, q: &DVector<f64>) -> Matrix4<f64> {
        self.t_0_1
            * rot_z(q[0])
            * self.t_1_2
            * translation(Vector3::new(q[1], 0.0, 0.0))
            * self.t_2_e
    }

    fn forward(&self, q: &DVector<f64>) -> DVector<f64> {
        let t = self.base_to_tool(q);
        DVector::from_vec(vec![t[(0, 3)], t[(1, 3)]])
    }

    fn jacobian(&self, q: &DVector<f64>) -> DMatrix<f64> {
        let ext = translation(Vector3::new(q[1], 0.0, 0.0));
        let by_q0 = self.t_0_1 * d_rot_z(q[0]) * self.t_1_2 * ext * self.t_2_e;
        let by_q1 = self.t_0_1 * rot_z(q[0]) * self.t_1_2 * d_translation(Vector3::x()) * self.t_2_e;
        let mut j = DMatrix::zeros(2, 2);
        j[(0, 0)] = by_q0[(0, 3)];
        j[(1, 0)] = by_q0[(1, 3)];
        j[(0, 1)] = by_q1[(0, 3)];
        j[(1, 1)] = by_q1[(1, 3)];
        j
    }

    fn analytical_ik(&self, target: &DVector<f64>) -> IkSolutions {
        let dist = target[0].hypot(target[1]);
        let min_dist = self.l1.hypot(self.l2);
        let max_dist = (self.l1 + self.max_q1).hypot(self.l2);
        if dist < min_dist || dist > max_dist {
            return IkSolutions::Unreachable;
        }
        let q1 = (dist * dist - self.l2 * self.l2).sqrt() - self.l1;
        let dir_to_target = target[1].atan2(target[0]);
        let dir_offset = self.l2.atan2(self.l1 + q1);
        IkSolutions::Finite(1, DVector::from_vec(vec![dir_to_target + dir_offset, q1]))
    }
}
