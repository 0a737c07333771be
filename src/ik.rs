//! Numerical inverse kinematics.
//!
//! Two iterative solvers complement the closed-form inverses: a bounded-step
//! Newton iteration on the Jacobian inverse, and a bounded least-squares
//! descent driven by the Jacobian transpose. Both escape singular
//! configurations by injecting uniform joint noise drawn from a seeded
//! ChaCha stream, so identical seeds always reproduce identical runs.

use crate::robot::RobotModel;
use crate::{Error, Result};
use nalgebra::DVector;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::str::FromStr;
use tracing::{debug, trace};

/// Half-width of the uniform noise used to escape singularities.
const NOISE_LEVEL: f64 = 0.1;

/// Options for [`solve_jacobian_inverse`].
#[derive(Debug, Clone, Copy)]
pub struct JacobianInverseOptions {
    pub max_steps: usize,
    pub tol: f64,
    pub max_step_size: f64,
    pub seed: Option<u64>,
}

impl Default for JacobianInverseOptions {
    fn default() -> Self {
        Self {
            max_steps: 500,
            tol: 1e-6,
            max_step_size: 0.05,
            seed: None,
        }
    }
}

/// Options for [`solve_jacobian_transposed`].
#[derive(Debug, Clone, Copy)]
pub struct JacobianTransposedOptions {
    pub max_epochs: usize,
    pub max_iterations: usize,
    pub seed: Option<u64>,
}

impl Default for JacobianTransposedOptions {
    fn default() -> Self {
        Self {
            max_epochs: 10,
            max_iterations: 500,
            seed: None,
        }
    }
}

/// Newton iteration on the Jacobian inverse.
///
/// Steps are capped at `max_step_size`; when the Jacobian cannot be
/// inverted the joints are randomized and the iteration continues. The
/// final iterate is returned after at most `max_steps` steps whether or
/// not the tolerance was reached.
pub fn solve_jacobian_inverse(
    model: &dyn RobotModel,
    joints: &DVector<f64>,
    target: &DVector<f64>,
    options: &JacobianInverseOptions,
) -> DVector<f64> {
    let mut rng = rng_from_seed(options.seed);
    let mut q = joints.clone();
    for _ in 0..options.max_steps {
        let error = target - model.forward(&q);
        if error.norm() < options.tol {
            break;
        }
        match model.jacobian(&q).try_inverse() {
            Some(j_inv) => {
                let mut step = j_inv * error;
                let size = step.norm();
                if size > options.max_step_size {
                    step *= options.max_step_size / size;
                }
                q += step;
            }
            None => {
                debug!("jacobian not invertible, randomizing joints");
                q += random_offset(&mut rng, q.len());
            }
        }
    }
    q
}

/// Bounded least-squares descent on the tool-position error.
///
/// Minimizes `|forward(q) - target|` under the per-joint limits with a
/// projected-gradient inner loop (the gradient comes from the Jacobian
/// transpose), restarted over `max_epochs` outer epochs. When an epoch
/// leaves the joints essentially unchanged without improving the cost,
/// noise is injected to escape the local minimum. The best configuration
/// found is returned even when the cost never reaches tolerance; every
/// returned joint value satisfies the limits exactly.
pub fn solve_jacobian_transposed(
    model: &dyn RobotModel,
    joints: &DVector<f64>,
    target: &DVector<f64>,
    options: &JacobianTransposedOptions,
) -> DVector<f64> {
    let limits = model.joints_limits();
    let cost = |q: &DVector<f64>| (model.forward(q) - target).norm();
    let gradient =
        |q: &DVector<f64>| (model.jacobian(q).transpose() * (target - model.forward(q))) * -2.0;

    let tol_cost = 1e-4;
    let tol_joints = 1e-3;
    let min_improvement = 1e-6;

    let mut rng = rng_from_seed(options.seed);
    let mut q = clamp_to_limits(joints, &limits);
    let mut current_cost = cost(&q);
    let mut previous: Option<(DVector<f64>, f64)> = None;
    let mut epoch = 0;
    while epoch < options.max_epochs && current_cost > tol_cost {
        trace!(epoch, cost = current_cost, "transposed solver epoch");
        if let Some((last_q, last_cost)) = &previous {
            let joint_diff = (last_q - &q).norm();
            let improvement = last_cost - current_cost;
            if joint_diff < tol_joints && improvement < min_improvement {
                debug!("local minimum, randomizing joints");
                q += random_offset(&mut rng, q.len());
                q = clamp_to_limits(&q, &limits);
            }
        }
        previous = Some((q.clone(), current_cost));
        q = minimize_bounded(&cost, &gradient, q, &limits, options.max_iterations);
        current_cost = cost(&q);
        epoch += 1;
    }
    q
}

/// Projected-gradient descent with a backtracking line search. Bounds are
/// enforced by clamping after every trial step, so the result never leaves
/// the feasible box.
fn minimize_bounded(
    cost: &dyn Fn(&DVector<f64>) -> f64,
    gradient: &dyn Fn(&DVector<f64>) -> DVector<f64>,
    start: DVector<f64>,
    limits: &[[f64; 2]],
    max_iterations: usize,
) -> DVector<f64> {
    let mut q = clamp_to_limits(&start, limits);
    let mut current = cost(&q);
    for _ in 0..max_iterations {
        let g = gradient(&q);
        if g.norm() < 1e-12 {
            break;
        }
        let mut alpha = 1.0;
        let mut accepted = false;
        for _ in 0..40 {
            let candidate = clamp_to_limits(&(&q - &g * alpha), limits);
            let value = cost(&candidate);
            if value < current {
                if (&candidate - &q).norm() < 1e-12 {
                    return candidate;
                }
                q = candidate;
                current = value;
                accepted = true;
                break;
            }
            alpha *= 0.5;
        }
        if !accepted {
            break;
        }
    }
    q
}

fn clamp_to_limits(q: &DVector<f64>, limits: &[[f64; 2]]) -> DVector<f64> {
    DVector::from_fn(q.len(), |i, _| q[i].clamp(limits[i][0], limits[i][1]))
}

fn rng_from_seed(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_os_rng(),
    }
}

fn random_offset(rng: &mut ChaCha8Rng, n: usize) -> DVector<f64> {
    DVector::from_fn(n, |_, _| rng.random_range(-NOISE_LEVEL..NOISE_LEVEL))
}

/// Inverse-kinematics strategies selectable by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IkMethod {
    Analytical,
    JacobianInverse,
    JacobianTransposed,
}

impl FromStr for IkMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "analyticalMGI" => Ok(Self::Analytical),
            "jacobianInverse" => Ok(Self::JacobianInverse),
            "jacobianTransposed" => Ok(Self::JacobianTransposed),
            _ => Err(Error::UnknownIkMethod(s.to_string())),
        }
    }
}

/// Routes a target to the requested solver.
///
/// The analytical route answers with the default branch, or `None` for an
/// unreachable target. The numerical routes start from `joints` and always
/// return their final iterate.
pub fn solve(
    model: &dyn RobotModel,
    joints: &DVector<f64>,
    target: &DVector<f64>,
    method: IkMethod,
    seed: Option<u64>,
) -> Option<DVector<f64>> {
    match method {
        IkMethod::Analytical => model.analytical_ik(target).first().cloned(),
        IkMethod::JacobianInverse => {
            let options = JacobianInverseOptions {
                seed,
                ..Default::default()
            };
            Some(solve_jacobian_inverse(model, joints, target, &options))
        }
        IkMethod::JacobianTransposed => {
            let options = JacobianTransposedOptions {
                seed,
                ..Default::default()
            };
            Some(solve_jacobian_transposed(model, joints, target, &options))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::{RobotRrr, RobotRt};
    use approx::assert_relative_eq;
    use test_case::test_case;

    #[test_case(0.05, -0.03, 0.04)]
    #[test_case(-0.08, 0.06, 0.02)]
    #[test_case(0.02, 0.09, -0.07)]
    fn jacobian_inverse_converges_from_nearby_starts(d0: f64, d1: f64, d2: f64) {
        let robot = RobotRrr::new();
        let goal = DVector::from_vec(vec![0.3, 0.4, -0.5]);
        let target = robot.forward(&goal);
        let start = DVector::from_vec(vec![0.3 + d0, 0.4 + d1, -0.5 + d2]);
        for seed in 0..10 {
            let options = JacobianInverseOptions {
                seed: Some(seed),
                ..Default::default()
            };
            let q = solve_jacobian_inverse(&robot, &start, &target, &options);
            let residual = (robot.forward(&q) - &target).norm();
            assert!(residual < 1e-6, "seed {seed} residual {residual}");
        }
    }

    #[test]
    fn jacobian_inverse_is_deterministic_per_seed() {
        let robot = RobotRrr::new();
        let target = DVector::from_vec(vec![0.3, 1.0, 1.0]);
        let start = DVector::from_vec(vec![0.1, 0.1, 0.1]);
        let options = JacobianInverseOptions {
            seed: Some(7),
            ..Default::default()
        };
        let a = solve_jacobian_inverse(&robot, &start, &target, &options);
        let b = solve_jacobian_inverse(&robot, &start, &target, &options);
        assert_eq!(a, b);
    }

    #[test]
    fn transposed_solver_honors_joint_limits() {
        let robot = RobotRrr::new();
        // Unreachable target: the solver must still stay inside the box.
        let target = DVector::from_vec(vec![2.0, 0.0, 1.0]);
        let start = DVector::from_vec(vec![0.5, -0.2, 0.3]);
        let options = JacobianTransposedOptions {
            seed: Some(3),
            ..Default::default()
        };
        let q = solve_jacobian_transposed(&robot, &start, &target, &options);
        for (value, limits) in q.iter().zip(robot.joints_limits()) {
            assert!(*value >= limits[0] && *value <= limits[1]);
        }
    }

    #[test]
    fn transposed_solver_reaches_an_easy_target() {
        let robot = RobotRt::new();
        let goal = DVector::from_vec(vec![0.4, 0.15]);
        let target = robot.forward(&goal);
        let start = DVector::from_vec(vec![0.35, 0.18]);
        let options = JacobianTransposedOptions {
            seed: Some(1),
            ..Default::default()
        };
        let q = solve_jacobian_transposed(&robot, &start, &target, &options);
        let residual = (robot.forward(&q) - &target).norm();
        assert!(residual < 1e-3, "residual {residual}");
    }

    #[test]
    fn method_names_parse() {
        assert_eq!("analyticalMGI".parse::<IkMethod>().unwrap(), IkMethod::Analytical);
        assert_eq!(
            "jacobianInverse".parse::<IkMethod>().unwrap(),
            IkMethod::JacobianInverse
        );
        assert_eq!(
            "jacobianTransposed".parse::<IkMethod>().unwrap(),
            IkMethod::JacobianTransposed
        );
        assert!("gradientDescent".parse::<IkMethod>().is_err());
    }

    #[test]
    fn solve_analytical_route_returns_none_when_unreachable() {
        let robot = RobotRt::new();
        let start = DVector::zeros(2);
        let target = DVector::from_vec(vec![5.0, 5.0]);
        assert!(solve(&robot, &start, &target, IkMethod::Analytical, None).is_none());
        let reachable = robot.forward(&DVector::from_vec(vec![0.2, 0.1]));
        let q = solve(&robot, &start, &reachable, IkMethod::Analytical, None).unwrap();
        assert_relative_eq!(robot.forward(&q)[0], reachable[0], epsilon = 1e-9);
    }
}
