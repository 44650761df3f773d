use glam::{DVec3, Vec3};

use kinfu_3d::{is_valid_point, PinholeCamera, PointNormalMap};
use kinfu_imgproc::parallel;
use kinfu_lie::{Twist, SE3F32};

/// Relative pivot size below which the 6x6 system is treated as singular.
const PIVOT_EPS: f64 = 1e-10;

/// The Gauss-Newton system `(Σ JᵀJ) ξ = -Σ Jᵀr` of point-to-plane ICP,
/// accumulated in `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalEquations {
    /// `Σ JᵀJ`.
    pub jtj: [[f64; 6]; 6],
    /// `Σ Jᵀr`.
    pub jtr: [f64; 6],
    /// `Σ r²`.
    pub residual_sq: f64,
    /// Number of accumulated correspondences.
    pub count: usize,
}

impl Default for NormalEquations {
    fn default() -> Self {
        Self {
            jtj: [[0.0; 6]; 6],
            jtr: [0.0; 6],
            residual_sq: 0.0,
            count: 0,
        }
    }
}

impl NormalEquations {
    /// Add one residual `r` with Jacobian row `j`.
    pub fn accumulate(&mut self, j: &[f64; 6], r: f64) {
        for (row, jr) in self.jtj.iter_mut().zip(j) {
            for (a, jc) in row.iter_mut().zip(j) {
                *a += jr * jc;
            }
        }
        for (b, ji) in self.jtr.iter_mut().zip(j) {
            *b += ji * r;
        }
        self.residual_sq += r * r;
        self.count += 1;
    }

    /// Add another system into this one.
    pub fn add(&mut self, other: &NormalEquations) {
        for (row, other_row) in self.jtj.iter_mut().zip(&other.jtj) {
            for (a, b) in row.iter_mut().zip(other_row) {
                *a += b;
            }
        }
        for (a, b) in self.jtr.iter_mut().zip(&other.jtr) {
            *a += b;
        }
        self.residual_sq += other.residual_sq;
        self.count += other.count;
    }

    /// Root mean square of the accumulated residuals, 0 if empty.
    pub fn rms(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.residual_sq / self.count as f64).sqrt()
    }

    /// Solve for the twist `ξ = [ω; v]` minimizing the linearized residuals.
    ///
    /// Returns `None` when `Σ JᵀJ` is not numerically positive definite.
    pub fn solve(&self) -> Option<Twist> {
        let l = cholesky_6x6(&self.jtj)?;
        let b = self.jtr.map(|v| -v);
        let x = cholesky_solve_6x6(&l, &b);
        if !x.iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(x.map(|v| v as f32))
    }
}

impl std::ops::AddAssign<&NormalEquations> for NormalEquations {
    fn add_assign(&mut self, rhs: &NormalEquations) {
        self.add(rhs);
    }
}

/// Lower triangular `L` with `A = L Lᵀ`, or `None` if a pivot is not
/// positive relative to the largest diagonal entry.
fn cholesky_6x6(a: &[[f64; 6]; 6]) -> Option<[[f64; 6]; 6]> {
    let max_diag = (0..6).map(|i| a[i][i]).fold(0.0f64, f64::max);
    if !(max_diag.is_finite() && max_diag > 0.0) {
        return None;
    }
    let min_pivot = PIVOT_EPS * max_diag;

    let mut l = [[0.0; 6]; 6];
    for j in 0..6 {
        let pivot = a[j][j] - (0..j).map(|k| l[j][k] * l[j][k]).sum::<f64>();
        if pivot.is_nan() || pivot <= min_pivot {
            return None;
        }
        let d = pivot.sqrt();
        l[j][j] = d;
        for i in (j + 1)..6 {
            let s = a[i][j] - (0..j).map(|k| l[i][k] * l[j][k]).sum::<f64>();
            l[i][j] = s / d;
        }
    }
    Some(l)
}

/// Solve `L Lᵀ x = b` by forward and back substitution.
fn cholesky_solve_6x6(l: &[[f64; 6]; 6], b: &[f64; 6]) -> [f64; 6] {
    let mut y = [0.0; 6];
    for i in 0..6 {
        let s = b[i] - (0..i).map(|k| l[i][k] * y[k]).sum::<f64>();
        y[i] = s / l[i][i];
    }
    let mut x = [0.0; 6];
    for i in (0..6).rev() {
        let s = y[i] - ((i + 1)..6).map(|k| l[k][i] * x[k]).sum::<f64>();
        x[i] = s / l[i][i];
    }
    x
}

/// Gates applied to each putative correspondence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrespondenceParams {
    /// Minimum cosine of the angle between the model and current normals.
    pub min_normal_cos: f32,
    /// Maximum distance between corresponding points in metres.
    pub max_distance: f32,
}

impl CorrespondenceParams {
    /// Gates from an angle in degrees and a distance in metres.
    pub fn new(angle_threshold_deg: f32, max_distance: f32) -> Self {
        Self {
            min_normal_cos: angle_threshold_deg.to_radians().cos(),
            max_distance,
        }
    }
}

/// Accumulate the point-to-plane system of one pyramid level.
///
/// Each current point `p_c` is moved into the model camera with `t_mc` and
/// projected to its nearest model pixel. The pair is rejected if either point
/// or normal is invalid, if the normals differ by more than the angle gate or
/// if the points are farther apart than the distance gate. Accepted pairs add
/// `r = n_m · (p - p_m)` with `J = [p × n_m, n_m]`.
///
/// Rows are reduced in parallel and their partial systems summed in row order,
/// so the result does not depend on thread scheduling.
pub fn compute_normal_equations(
    model: &PointNormalMap,
    current: &PointNormalMap,
    camera: &PinholeCamera,
    t_mc: &SE3F32,
    params: &CorrespondenceParams,
) -> NormalEquations {
    let cols = current.points.width();
    let current_normals = current.normals.as_slice();
    let model_cols = model.points.width();
    let model_points = model.points.as_slice();
    let model_normals = model.normals.as_slice();
    let max_dist_sq = params.max_distance * params.max_distance;

    let rows = parallel::par_map_rows(&current.points, |v, row| {
        let mut eq = NormalEquations::default();
        for (u, &p_c) in row.iter().enumerate() {
            let n_c = current_normals[v * cols + u];
            if !(is_valid_point(p_c) && is_valid_point(n_c)) {
                continue;
            }

            let p = t_mc.transform_point(p_c);
            let Some((um, vm)) = camera.project_to_pixel(p) else {
                continue;
            };

            let idx = vm * model_cols + um;
            let (Some(&p_m), Some(&n_m)) = (model_points.get(idx), model_normals.get(idx)) else {
                continue;
            };
            if !(is_valid_point(p_m) && is_valid_point(n_m)) {
                continue;
            }

            let n = t_mc.rotate(n_c);
            if n_m.dot(n) < params.min_normal_cos {
                continue;
            }

            let diff = p - p_m;
            if diff.length_squared() > max_dist_sq {
                continue;
            }

            let (j, r) = point_to_plane(p, diff, n_m);
            eq.accumulate(&j, r);
        }
        eq
    });

    rows.iter().fold(NormalEquations::default(), |mut acc, eq| {
        acc += eq;
        acc
    })
}

/// Jacobian and residual of a point-to-plane term under a left update.
#[inline]
fn point_to_plane(p: Vec3, diff: Vec3, n_m: Vec3) -> ([f64; 6], f64) {
    let p = p.as_dvec3();
    let n = n_m.as_dvec3();
    let r = n.dot(diff.as_dvec3());
    let w: DVec3 = p.cross(n);
    ([w.x, w.y, w.z, n.x, n.y, n.z], r)
}
