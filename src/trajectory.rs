//! One-dimensional trajectories.
//!
//! A trajectory maps a time to the value of any derivative order of a scalar
//! signal. All implementations are piecewise polynomials solved once at
//! construction, so evaluation is a segment lookup plus a cubic evaluation.

use crate::{Error, Result};
use serde::Deserialize;

mod spline;
mod trapezoidal;

pub use spline::{
    ConstantSpline, CubicCustomDerivativeSpline, CubicWideStencilSpline,
    CubicZeroDerivativeSpline, LinearSpline, NaturalCubicSpline, PeriodicCubicSpline,
};
pub use trapezoidal::TrapezoidalVelocity;

/// A one-dimensional trajectory over `[start, end]`.
pub trait Trajectory: Send + Sync {
    fn start(&self) -> f64;

    fn end(&self) -> f64;

    /// Value of the derivative of order `d` at time `t` (0 is position,
    /// 1 speed, 2 acceleration, ...).
    ///
    /// Outside the time span the boundary rule applies: the position holds
    /// the nearest endpoint value and every higher derivative is 0.
    /// Periodic trajectories instead wrap `t` modulo their span.
    fn value_at(&self, t: f64, d: u32) -> f64;
}

/// Extra options for trajectory types that need them.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TrajectoryParameters {
    pub vel_max: Option<f64>,
    pub acc_max: Option<f64>,
}

/// Builds a trajectory from its public type name and raw knot rows.
///
/// Spline rows are `[time, value]` (plus a velocity column for
/// `CubicCustomDerivativeSpline`); `TrapezoidalVelocity` takes two
/// single-value rows holding the endpoints and requires
/// `parameters.vel_max` / `parameters.acc_max`.
pub fn build_trajectory(
    type_name: &str,
    start: f64,
    knots: &[Vec<f64>],
    parameters: Option<&TrajectoryParameters>,
) -> Result<Box<dyn Trajectory>> {
    match type_name {
        "ConstantSpline" => Ok(Box::new(ConstantSpline::new(point_rows(knots)?, start)?)),
        "LinearSpline" => Ok(Box::new(LinearSpline::new(point_rows(knots)?, start)?)),
        "CubicZeroDerivativeSpline" => Ok(Box::new(CubicZeroDerivativeSpline::new(
            point_rows(knots)?,
            start,
        )?)),
        "CubicWideStencilSpline" => Ok(Box::new(CubicWideStencilSpline::new(
            point_rows(knots)?,
            start,
        )?)),
        "CubicCustomDerivativeSpline" => Ok(Box::new(CubicCustomDerivativeSpline::new(
            velocity_rows(knots)?,
            start,
        )?)),
        "NaturalCubicSpline" => Ok(Box::new(NaturalCubicSpline::new(point_rows(knots)?, start)?)),
        "PeriodicCubicSpline" => Ok(Box::new(PeriodicCubicSpline::new(
            point_rows(knots)?,
            start,
        )?)),
        "TrapezoidalVelocity" => {
            let parameters = parameters.ok_or(Error::MissingParameter("parameters"))?;
            let vel_max = parameters.vel_max.ok_or(Error::MissingParameter("vel_max"))?;
            let acc_max = parameters.acc_max.ok_or(Error::MissingParameter("acc_max"))?;
            Ok(Box::new(TrapezoidalVelocity::new(
                endpoint_rows(knots)?,
                vel_max,
                acc_max,
                start,
            )?))
        }
        _ => Err(Error::UnknownTrajectoryType(type_name.to_string())),
    }
}

fn point_rows(rows: &[Vec<f64>]) -> Result<Vec<[f64; 2]>> {
    rows.iter()
        .map(|row| match row[..] {
            [t, x, ..] => Ok([t, x]),
            _ => Err(Error::InvalidKnots(
                "spline knots need a time and a value column".to_string(),
            )),
        })
        .collect()
}

fn velocity_rows(rows: &[Vec<f64>]) -> Result<Vec<[f64; 3]>> {
    rows.iter()
        .map(|row| match row[..] {
            [t, x, v, ..] => Ok([t, x, v]),
            _ => Err(Error::InvalidKnots(
                "knots need time, value and velocity columns".to_string(),
            )),
        })
        .collect()
}

fn endpoint_rows(rows: &[Vec<f64>]) -> Result<[f64; 2]> {
    match rows {
        [a, b] if a.len() == 1 && b.len() == 1 => Ok([a[0], b[0]]),
        _ => Err(Error::InvalidKnots(
            "a velocity profile takes exactly two scalar knots".to_string(),
        )),
    }
}
