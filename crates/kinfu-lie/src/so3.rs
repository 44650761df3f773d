//! # SO(3): rotations in 3D
//!
//! Rotations are stored as unit quaternions. `q` and `-q` describe the same
//! rotation; [`SO3F32::log`] picks the representative with a non-negative
//! real part so that the returned angle lies in `[0, π]`.
//!
//! The exponential and logarithmic maps, as well as the left Jacobian and its
//! inverse, switch to Taylor expansions below [`SMALL_ANGLE`] to stay finite at
//! the identity. Trigonometric coefficients are evaluated in `f64`: the closed
//! forms such as `(1 - cos θ) / θ²` lose most of their digits in `f32` well
//! before the series branch kicks in.

use glam::{Mat3, Quat, Vec3};
use rand::Rng;

/// Rotation angle (radians) below which series expansions are used.
pub const SMALL_ANGLE: f64 = 1.0e-4;

/// A 3D rotation, stored as a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SO3F32 {
    /// The unit quaternion.
    pub q: Quat,
}

impl Default for SO3F32 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl SO3F32 {
    /// The identity rotation.
    pub const IDENTITY: Self = Self { q: Quat::IDENTITY };

    /// Create a new rotation from a quaternion.
    ///
    /// NOTE: the quaternion is expected to be normalized.
    #[inline]
    pub fn new(q: Quat) -> Self {
        Self { q }
    }

    /// Create a rotation of `angle` radians around `axis`.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        Self {
            q: Quat::from_axis_angle(axis.normalize(), angle),
        }
    }

    /// Create a rotation from a 3x3 rotation matrix.
    pub fn from_matrix(mat: &Mat3) -> Self {
        Self {
            q: Quat::from_mat3(mat).normalize(),
        }
    }

    /// Sample a uniformly distributed rotation (Shoemake's method).
    pub fn from_random() -> Self {
        let mut rng = rand::rng();

        let r1: f32 = rng.random();
        let r2: f32 = rng.random();
        let r3: f32 = rng.random();

        let one_minus_r1_sqrt = (1.0 - r1).sqrt();
        let r1_sqrt = r1.sqrt();

        let w = one_minus_r1_sqrt * (2.0 * std::f32::consts::PI * r2).cos();
        let x = one_minus_r1_sqrt * (2.0 * std::f32::consts::PI * r2).sin();
        let y = r1_sqrt * (2.0 * std::f32::consts::PI * r3).cos();
        let z = r1_sqrt * (2.0 * std::f32::consts::PI * r3).sin();

        Self {
            q: Quat::from_xyzw(x, y, z, w).normalize(),
        }
    }

    /// The rotation as a 3x3 matrix.
    #[inline]
    pub fn matrix(&self) -> Mat3 {
        Mat3::from_quat(self.q)
    }

    /// The inverse rotation.
    #[inline]
    pub fn inverse(&self) -> Self {
        Self {
            q: self.q.conjugate(),
        }
    }

    /// Project the quaternion back onto the unit sphere.
    ///
    /// Repeated compositions drift off S³; the rotation matrix derived from a
    /// drifted quaternion is no longer orthonormal.
    #[inline]
    pub fn normalize(&self) -> Self {
        Self {
            q: self.q.normalize(),
        }
    }

    /// Exponential map: axis-angle vector -> rotation.
    pub fn exp(omega: Vec3) -> Self {
        let omega_d = omega.as_dvec3();
        let theta_sq = omega_d.length_squared();
        let theta = theta_sq.sqrt();

        let (w, b) = if theta < SMALL_ANGLE {
            // taylor series of cos(θ/2) and sin(θ/2)/θ around 0
            (1.0 - theta_sq / 8.0, 0.5 - theta_sq / 48.0)
        } else {
            let half = 0.5 * theta;
            (half.cos(), half.sin() / theta)
        };

        let xyz = omega_d * b;
        Self {
            q: Quat::from_xyzw(xyz.x as f32, xyz.y as f32, xyz.z as f32, w as f32).normalize(),
        }
    }

    /// Logarithmic map: rotation -> axis-angle vector.
    pub fn log(&self) -> Vec3 {
        let mut w = self.q.w as f64;
        let mut vec = glam::DVec3::new(self.q.x as f64, self.q.y as f64, self.q.z as f64);

        if w < 0.0 {
            w = -w;
            vec = -vec;
        }

        let sin_half = vec.length();
        let scale = if sin_half < 0.5 * SMALL_ANGLE {
            // 2 atan(s / w) / s around s = 0
            2.0 / w * (1.0 - sin_half * sin_half / (3.0 * w * w))
        } else {
            2.0 * sin_half.atan2(w) / sin_half
        };

        (vec * scale).as_vec3()
    }

    /// Vector -> skew-symmetric matrix, such that `hat(a) * b == a.cross(b)`.
    pub fn hat(v: Vec3) -> Mat3 {
        Mat3::from_cols(
            Vec3::new(0.0, v.z, -v.y),
            Vec3::new(-v.z, 0.0, v.x),
            Vec3::new(v.y, -v.x, 0.0),
        )
    }

    /// Skew-symmetric matrix -> vector.
    pub fn vee(omega: Mat3) -> Vec3 {
        Vec3::new(omega.y_axis.z, omega.z_axis.x, omega.x_axis.y)
    }

    /// Left Jacobian of SO(3).
    ///
    /// `J(ω) = I + (1 - cos θ)/θ² [ω]× + (θ - sin θ)/θ³ [ω]×²`. It is also the
    /// matrix coupling rotation and translation in the SE(3) exponential.
    pub fn left_jacobian(omega: Vec3) -> Mat3 {
        let theta_sq = omega.as_dvec3().length_squared();
        let theta = theta_sq.sqrt();

        let (b, c) = if theta < SMALL_ANGLE {
            (
                0.5 - theta_sq / 24.0 * (1.0 - theta_sq / 30.0),
                (1.0 - theta_sq / 20.0 * (1.0 - theta_sq / 42.0)) / 6.0,
            )
        } else {
            (
                (1.0 - theta.cos()) / theta_sq,
                (theta - theta.sin()) / (theta_sq * theta),
            )
        };

        let skew = Self::hat(omega);
        Mat3::IDENTITY + skew * b as f32 + (skew * skew) * c as f32
    }

    /// Inverse of the left Jacobian of SO(3).
    pub fn left_jacobian_inverse(omega: Vec3) -> Mat3 {
        let theta_sq = omega.as_dvec3().length_squared();
        let theta = theta_sq.sqrt();

        let c = if theta < SMALL_ANGLE {
            1.0 / 12.0 + theta_sq / 720.0 + theta_sq * theta_sq / 30240.0
        } else {
            (1.0 - theta * theta.sin() / (2.0 * (1.0 - theta.cos()))) / theta_sq
        };

        let skew = Self::hat(omega);
        Mat3::IDENTITY - skew * 0.5 + (skew * skew) * c as f32
    }
}

impl std::ops::Mul<SO3F32> for SO3F32 {
    type Output = SO3F32;

    fn mul(self, rhs: SO3F32) -> Self::Output {
        Self {
            q: (self.q * rhs.q).normalize(),
        }
    }
}

impl std::ops::MulAssign<SO3F32> for SO3F32 {
    #[inline]
    fn mul_assign(&mut self, rhs: SO3F32) {
        *self = *self * rhs;
    }
}

impl std::ops::Mul<Vec3> for SO3F32 {
    type Output = Vec3;

    #[inline]
    fn mul(self, rhs: Vec3) -> Self::Output {
        self.q * rhs
    }
}
