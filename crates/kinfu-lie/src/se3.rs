//! # SE(3): rigid body transformations in 3D
//!
//! A pose `T = (R, t)` maps a point `p` to `R p + t`. Throughout the fusion
//! pipeline the sensor pose is `T_wc`, mapping camera coordinates into the
//! world (volume) frame.

use glam::{Mat3, Mat4, Vec3};

use crate::so3::SO3F32;

/// A tangent vector of SE(3): `[ω_x, ω_y, ω_z, v_x, v_y, v_z]`.
pub type Twist = [f32; 6];

/// A rigid body transformation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE3F32 {
    /// The rotation part.
    pub rotation: SO3F32,
    /// The translation part.
    pub translation: Vec3,
}

impl Default for SE3F32 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl SE3F32 {
    /// The identity transformation.
    pub const IDENTITY: Self = Self {
        rotation: SO3F32::IDENTITY,
        translation: Vec3::ZERO,
    };

    /// Create a new transformation from a rotation and a translation.
    #[inline]
    pub fn new(rotation: SO3F32, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Create a pure translation.
    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(SO3F32::IDENTITY, translation)
    }

    /// Create a transformation from a 4x4 homogeneous matrix.
    pub fn from_matrix(mat: &Mat4) -> Self {
        Self {
            rotation: SO3F32::from_matrix(&Mat3::from_mat4(*mat)),
            translation: mat.w_axis.truncate(),
        }
    }

    /// The transformation as a 4x4 homogeneous matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation.q, self.translation)
    }

    /// The rotation as a 3x3 matrix.
    #[inline]
    pub fn rotation_matrix(&self) -> Mat3 {
        self.rotation.matrix()
    }

    /// The inverse transformation.
    pub fn inverse(&self) -> Self {
        let inv_rot = self.rotation.inverse();
        Self {
            rotation: inv_rot,
            translation: -(inv_rot * self.translation),
        }
    }

    /// Transform a point: `R p + t`.
    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }

    /// Apply the inverse transformation to a point: `Rᵀ (p - t)`.
    #[inline]
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.inverse() * (p - self.translation)
    }

    /// Rotate a direction, ignoring the translation.
    #[inline]
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        self.rotation * v
    }

    /// Exponential map: twist -> transformation.
    ///
    /// The rotation is `exp(ω)` and the translation is `J_l(ω) v`, where
    /// `J_l` is the left Jacobian of SO(3).
    pub fn exp(twist: &Twist) -> Self {
        let omega = Vec3::new(twist[0], twist[1], twist[2]);
        let v = Vec3::new(twist[3], twist[4], twist[5]);
        Self {
            rotation: SO3F32::exp(omega),
            translation: SO3F32::left_jacobian(omega) * v,
        }
    }

    /// Logarithmic map: transformation -> twist.
    pub fn log(&self) -> Twist {
        let omega = self.rotation.log();
        let v = SO3F32::left_jacobian_inverse(omega) * self.translation;
        [omega.x, omega.y, omega.z, v.x, v.y, v.z]
    }

    /// Left retraction: `exp(τ) * self`.
    #[inline]
    pub fn lplus(&self, tau: &Twist) -> Self {
        SE3F32::exp(tau) * *self
    }

    /// Right retraction: `self * exp(τ)`.
    #[inline]
    pub fn rplus(&self, tau: &Twist) -> Self {
        *self * SE3F32::exp(tau)
    }

    /// Rotation angle in radians.
    #[inline]
    pub fn angle(&self) -> f32 {
        self.rotation.log().length()
    }
}

impl std::ops::Mul<SE3F32> for SE3F32 {
    type Output = SE3F32;

    fn mul(self, rhs: SE3F32) -> Self::Output {
        Self {
            rotation: self.rotation * rhs.rotation,
            translation: self.translation + self.rotation * rhs.translation,
        }
    }
}

impl std::ops::MulAssign<SE3F32> for SE3F32 {
    #[inline]
    fn mul_assign(&mut self, rhs: SE3F32) {
        *self = *self * rhs;
    }
}

impl std::ops::Mul<Vec3> for SE3F32 {
    type Output = Vec3;

    #[inline]
    fn mul(self, rhs: Vec3) -> Self::Output {
        self.transform_point(rhs)
    }
}
