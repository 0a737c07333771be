//! Piecewise polynomial splines.
//!
//! Each spline solves for its segment coefficients at construction time and
//! shares the same storage and evaluation path afterwards. Coefficients are
//! stored lowest order first in the local variable `u = t - t_i` of each
//! segment.

use crate::trajectory::Trajectory;
use crate::{Error, Result};
use nalgebra::{DMatrix, DVector, Matrix4, Vector4};

/// Knot times, values and solved segment coefficients, with the shared
/// boundary rule and derivative evaluation.
#[derive(Debug, Clone)]
struct PiecewisePoly {
    start: f64,
    end: f64,
    knots: Vec<[f64; 2]>,
    coeffs: Vec<[f64; 4]>,
}

impl PiecewisePoly {
    fn new(knots: Vec<[f64; 2]>, coeffs: Vec<[f64; 4]>, start: f64) -> Self {
        debug_assert_eq!(coeffs.len() + 1, knots.len());
        let end = start + knots[knots.len() - 1][0];
        Self {
            start,
            end,
            knots,
            coeffs,
        }
    }

    /// Segment index for a time strictly inside the span. Segments are
    /// half-open on the right, so an interior knot evaluates through the
    /// segment starting there; both neighbors agree on the value anyway.
    fn segment(&self, local: f64) -> usize {
        let n = self.knots.len();
        self.knots[..n - 1].partition_point(|k| k[0] <= local) - 1
    }

    fn value_at(&self, t: f64, d: u32) -> f64 {
        // knot times are relative to start; anything at or before the
        // first knot clamps to it
        if t <= self.start + self.knots[0][0] {
            return if d == 0 { self.knots[0][1] } else { 0.0 };
        }
        if t >= self.end {
            return if d == 0 { self.knots[self.knots.len() - 1][1] } else { 0.0 };
        }
        let local = t - self.start;
        let seg = self.segment(local);
        let u = local - self.knots[seg][0];
        let mut p = self.coeffs[seg];
        for _ in 0..d {
            p = [p[1], 2.0 * p[2], 3.0 * p[3], 0.0];
        }
        p[0] + u * (p[1] + u * (p[2] + u * p[3]))
    }
}

/// Knot times must be strictly increasing and define at least one segment.
fn check_knot_times(knots: &[[f64; 2]]) -> Result<()> {
    if knots.len() < 2 {
        return Err(Error::InvalidKnots(
            "a spline needs at least two knots".to_string(),
        ));
    }
    for pair in knots.windows(2) {
        if pair[1][0] <= pair[0][0] {
            return Err(Error::InvalidKnots(format!(
                "knot times must be strictly increasing, got {} after {}",
                pair[1][0], pair[0][0]
            )));
        }
    }
    Ok(())
}

/// Cubic through positions and velocities imposed at both segment ends.
fn hermite_coeffs(dt: f64, x0: f64, x1: f64, v0: f64, v1: f64) -> Result<[f64; 4]> {
    let a = Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        1.0, dt, dt * dt, dt * dt * dt,
        0.0, 1.0, 0.0, 0.0,
        0.0, 1.0, 2.0 * dt, 3.0 * dt * dt,
    );
    let b = Vector4::new(x0, x1, v0, v1);
    let c = a
        .lu()
        .solve(&b)
        .ok_or_else(|| Error::InvalidKnots("degenerate spline segment".to_string()))?;
    Ok([c[0], c[1], c[2], c[3]])
}

/// Piecewise-constant trajectory holding each knot value until the next.
pub struct ConstantSpline {
    poly: PiecewisePoly,
}

impl ConstantSpline {
    pub fn new(knots: Vec<[f64; 2]>, start: f64) -> Result<Self> {
        check_knot_times(&knots)?;
        let coeffs = knots[..knots.len() - 1]
            .iter()
            .map(|k| [k[1], 0.0, 0.0, 0.0])
            .collect();
        Ok(Self {
            poly: PiecewisePoly::new(knots, coeffs, start),
        })
    }
}

impl Trajectory for ConstantSpline {
    fn start(&self) -> f64 {
        self.poly.start
    }

    fn end(&self) -> f64 {
        self.poly.end
    }

    fn value_at(&self, t: f64, d: u32) -> f64 {
        self.poly.value_at(t, d)
    }
}

/// Straight-line interpolation between consecutive knots.
pub struct LinearSpline {
    poly: PiecewisePoly,
}

impl LinearSpline {
    pub fn new(knots: Vec<[f64; 2]>, start: f64) -> Result<Self> {
        check_knot_times(&knots)?;
        let coeffs = knots
            .windows(2)
            .map(|pair| {
                let slope = (pair[1][1] - pair[0][1]) / (pair[1][0] - pair[0][0]);
                [pair[0][1], slope, 0.0, 0.0]
            })
            .collect();
        Ok(Self {
            poly: PiecewisePoly::new(knots, coeffs, start),
        })
    }
}

impl Trajectory for LinearSpline {
    fn start(&self) -> f64 {
        self.poly.start
    }

    fn end(&self) -> f64 {
        self.poly.end
    }

    fn value_at(&self, t: f64, d: u32) -> f64 {
        self.poly.value_at(t, d)
    }
}

/// Cubic segments that stop at every knot: the velocity is 0 on both sides
/// of each via point.
pub struct CubicZeroDerivativeSpline {
    poly: PiecewisePoly,
}

impl CubicZeroDerivativeSpline {
    pub fn new(knots: Vec<[f64; 2]>, start: f64) -> Result<Self> {
        check_knot_times(&knots)?;
        let coeffs = knots
            .windows(2)
            .map(|pair| hermite_coeffs(pair[1][0] - pair[0][0], pair[0][1], pair[1][1], 0.0, 0.0))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            poly: PiecewisePoly::new(knots, coeffs, start),
        })
    }
}

impl Trajectory for CubicZeroDerivativeSpline {
    fn start(&self) -> f64 {
        self.poly.start
    }

    fn end(&self) -> f64 {
        self.poly.end
    }

    fn value_at(&self, t: f64, d: u32) -> f64 {
        self.poly.value_at(t, d)
    }
}

/// Cubic segments interpolating a four-knot neighborhood.
///
/// Each segment fits its own cubic through the four closest knots (shifted
/// to a one-sided stencil at both ends of the span), so the curve passes
/// exactly through every knot of the stencil inside that segment.
pub struct CubicWideStencilSpline {
    poly: PiecewisePoly,
}

impl CubicWideStencilSpline {
    pub fn new(knots: Vec<[f64; 2]>, start: f64) -> Result<Self> {
        check_knot_times(&knots)?;
        let n = knots.len();
        if n < 4 {
            return Err(Error::InvalidKnots(
                "a wide-stencil spline needs at least four knots".to_string(),
            ));
        }
        let mut coeffs = Vec::with_capacity(n - 1);
        for i in 0..n - 1 {
            let first = if i == 0 {
                0
            } else if i == n - 2 {
                i - 2
            } else {
                i - 1
            };
            coeffs.push(Self::stencil_coeffs(&knots[first..first + 4], knots[i][0])?);
        }
        Ok(Self {
            poly: PiecewisePoly::new(knots, coeffs, start),
        })
    }

    /// Single cubic through four points, in a frame centered at `origin`.
    fn stencil_coeffs(stencil: &[[f64; 2]], origin: f64) -> Result<[f64; 4]> {
        let mut a = Matrix4::zeros();
        let mut b = Vector4::zeros();
        for (row, knot) in stencil.iter().enumerate() {
            let tau = knot[0] - origin;
            a[(row, 0)] = 1.0;
            a[(row, 1)] = tau;
            a[(row, 2)] = tau * tau;
            a[(row, 3)] = tau * tau * tau;
            b[row] = knot[1];
        }
        let c = a
            .lu()
            .solve(&b)
            .ok_or_else(|| Error::InvalidKnots("degenerate stencil".to_string()))?;
        Ok([c[0], c[1], c[2], c[3]])
    }
}

impl Trajectory for CubicWideStencilSpline {
    fn start(&self) -> f64 {
        self.poly.start
    }

    fn end(&self) -> f64 {
        self.poly.end
    }

    fn value_at(&self, t: f64, d: u32) -> f64 {
        self.poly.value_at(t, d)
    }
}

/// Cubic segments matching user-provided velocities at every knot.
pub struct CubicCustomDerivativeSpline {
    poly: PiecewisePoly,
}

impl CubicCustomDerivativeSpline {
    /// Knot rows are `[time, value, velocity]`.
    pub fn new(knots: Vec<[f64; 3]>, start: f64) -> Result<Self> {
        let positions: Vec<[f64; 2]> = knots.iter().map(|k| [k[0], k[1]]).collect();
        check_knot_times(&positions)?;
        let coeffs = knots
            .windows(2)
            .map(|pair| {
                hermite_coeffs(
                    pair[1][0] - pair[0][0],
                    pair[0][1],
                    pair[1][1],
                    pair[0][2],
                    pair[1][2],
                )
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            poly: PiecewisePoly::new(positions, coeffs, start),
        })
    }
}

impl Trajectory for CubicCustomDerivativeSpline {
    fn start(&self) -> f64 {
        self.poly.start
    }

    fn end(&self) -> f64 {
        self.poly.end
    }

    fn value_at(&self, t: f64, d: u32) -> f64 {
        self.poly.value_at(t, d)
    }
}

/// Where the boundary rows of the global cubic system differ.
enum CubicBoundary {
    /// Zero curvature at both ends of the span.
    Natural,
    /// First and second derivative tied across the span ends.
    Periodic,
}

/// Solves the coupled system for all segments of a C2 cubic spline: per
/// segment two interpolation rows, per interior knot one velocity and one
/// curvature continuity row, and two boundary rows.
fn global_cubic_coeffs(knots: &[[f64; 2]], boundary: CubicBoundary) -> Result<Vec<[f64; 4]>> {
    let segments = knots.len() - 1;
    let size = 4 * segments;
    let mut a = DMatrix::zeros(size, size);
    let mut b = DVector::zeros(size);
    let mut row = 0;
    for i in 0..segments {
        let dt = knots[i + 1][0] - knots[i][0];
        a[(row, 4 * i)] = 1.0;
        b[row] = knots[i][1];
        row += 1;
        a[(row, 4 * i)] = 1.0;
        a[(row, 4 * i + 1)] = dt;
        a[(row, 4 * i + 2)] = dt * dt;
        a[(row, 4 * i + 3)] = dt * dt * dt;
        b[row] = knots[i + 1][1];
        row += 1;
        if i + 1 < segments {
            a[(row, 4 * i + 1)] = 1.0;
            a[(row, 4 * i + 2)] = 2.0 * dt;
            a[(row, 4 * i + 3)] = 3.0 * dt * dt;
            a[(row, 4 * (i + 1) + 1)] = -1.0;
            row += 1;
            a[(row, 4 * i + 2)] = 2.0;
            a[(row, 4 * i + 3)] = 6.0 * dt;
            a[(row, 4 * (i + 1) + 2)] = -2.0;
            row += 1;
        }
    }
    let last = segments - 1;
    let last_dt = knots[segments][0] - knots[last][0];
    match boundary {
        CubicBoundary::Natural => {
            a[(row, 2)] = 2.0;
            row += 1;
            a[(row, 4 * last + 2)] = 2.0;
            a[(row, 4 * last + 3)] = 6.0 * last_dt;
        }
        CubicBoundary::Periodic => {
            a[(row, 1)] = 1.0;
            a[(row, 4 * last + 1)] = -1.0;
            a[(row, 4 * last + 2)] = -2.0 * last_dt;
            a[(row, 4 * last + 3)] = -3.0 * last_dt * last_dt;
            row += 1;
            a[(row, 2)] = 2.0;
            a[(row, 4 * last + 2)] = -2.0;
            a[(row, 4 * last + 3)] = -6.0 * last_dt;
        }
    }
    let solution = a
        .lu()
        .solve(&b)
        .ok_or_else(|| Error::InvalidKnots("singular spline system".to_string()))?;
    Ok((0..segments)
        .map(|i| {
            [
                solution[4 * i],
                solution[4 * i + 1],
                solution[4 * i + 2],
                solution[4 * i + 3],
            ]
        })
        .collect())
}

/// C2 cubic spline with zero curvature at both ends.
pub struct NaturalCubicSpline {
    poly: PiecewisePoly,
}

impl NaturalCubicSpline {
    pub fn new(knots: Vec<[f64; 2]>, start: f64) -> Result<Self> {
        check_knot_times(&knots)?;
        let coeffs = global_cubic_coeffs(&knots, CubicBoundary::Natural)?;
        Ok(Self {
            poly: PiecewisePoly::new(knots, coeffs, start),
        })
    }
}

impl Trajectory for NaturalCubicSpline {
    fn start(&self) -> f64 {
        self.poly.start
    }

    fn end(&self) -> f64 {
        self.poly.end
    }

    fn value_at(&self, t: f64, d: u32) -> f64 {
        self.poly.value_at(t, d)
    }
}

/// C2 cubic spline whose velocity and curvature match across the span ends;
/// evaluation wraps around, so the trajectory repeats forever.
pub struct PeriodicCubicSpline {
    poly: PiecewisePoly,
}

impl PeriodicCubicSpline {
    pub fn new(knots: Vec<[f64; 2]>, start: f64) -> Result<Self> {
        check_knot_times(&knots)?;
        let coeffs = global_cubic_coeffs(&knots, CubicBoundary::Periodic)?;
        Ok(Self {
            poly: PiecewisePoly::new(knots, coeffs, start),
        })
    }
}

impl Trajectory for PeriodicCubicSpline {
    fn start(&self) -> f64 {
        self.poly.start
    }

    fn end(&self) -> f64 {
        self.poly.end
    }

    fn value_at(&self, t: f64, d: u32) -> f64 {
        let span = self.poly.end - self.poly.start;
        let wrapped = self.poly.start + (t - self.poly.start).rem_euclid(span);
        self.poly.value_at(wrapped, d)
    }
}
