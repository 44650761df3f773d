use glam::{Mat3, Vec2, Vec3};

use kinfu_image::ImageSize;

use crate::error::TsdfError;

/// Intrinsic parameters of a pinhole camera together with its resolution.
///
/// Pixel `(u, v)` has its center at integer coordinates; the camera looks down
/// `+z` with `x` to the right and `y` down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeCamera {
    /// Focal length along x in pixels.
    pub fx: f32,
    /// Focal length along y in pixels.
    pub fy: f32,
    /// Principal point x coordinate in pixels.
    pub cx: f32,
    /// Principal point y coordinate in pixels.
    pub cy: f32,
    /// Image resolution.
    pub size: ImageSize,
}

impl PinholeCamera {
    /// Create a new camera.
    ///
    /// # Errors
    ///
    /// Returns an error if a focal length is not positive and finite, if the
    /// principal point is not finite or if the resolution is empty.
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32, size: ImageSize) -> Result<Self, TsdfError> {
        if !(fx.is_finite() && fx > 0.0 && fy.is_finite() && fy > 0.0) {
            return Err(TsdfError::InvalidCamera(format!(
                "focal lengths must be positive, got ({fx}, {fy})"
            )));
        }
        if !(cx.is_finite() && cy.is_finite()) {
            return Err(TsdfError::InvalidCamera(format!(
                "principal point must be finite, got ({cx}, {cy})"
            )));
        }
        if size.num_pixels() == 0 {
            return Err(TsdfError::InvalidCamera(format!("empty resolution {size}")));
        }
        Ok(Self {
            fx,
            fy,
            cx,
            cy,
            size,
        })
    }

    /// The 3x3 camera matrix `K`.
    pub fn matrix(&self) -> Mat3 {
        Mat3::from_cols(
            Vec3::new(self.fx, 0.0, 0.0),
            Vec3::new(0.0, self.fy, 0.0),
            Vec3::new(self.cx, self.cy, 1.0),
        )
    }

    /// Project a camera-space point to continuous pixel coordinates.
    ///
    /// Returns `None` for points on or behind the image plane.
    #[inline]
    pub fn project(&self, p: Vec3) -> Option<Vec2> {
        if !p.z.is_finite() || p.z <= 0.0 {
            return None;
        }
        let inv_z = 1.0 / p.z;
        Some(Vec2::new(
            self.fx * p.x * inv_z + self.cx,
            self.fy * p.y * inv_z + self.cy,
        ))
    }

    /// Project a camera-space point to the nearest pixel inside the image.
    #[inline]
    pub fn project_to_pixel(&self, p: Vec3) -> Option<(usize, usize)> {
        let uv = self.project(p)?;
        let u = (uv.x + 0.5).floor();
        let v = (uv.y + 0.5).floor();
        if u < 0.0 || v < 0.0 || u >= self.size.width as f32 || v >= self.size.height as f32 {
            return None;
        }
        Some((u as usize, v as usize))
    }

    /// Back-project pixel `(u, v)` with depth `z` to a camera-space point.
    #[inline]
    pub fn unproject(&self, u: f32, v: f32, z: f32) -> Vec3 {
        self.ray(u, v) * z
    }

    /// The viewing ray through pixel `(u, v)`, scaled to unit depth.
    #[inline]
    pub fn ray(&self, u: f32, v: f32) -> Vec3 {
        Vec3::new((u - self.cx) / self.fx, (v - self.cy) / self.fy, 1.0)
    }

    /// Scale the intrinsics by `s`.
    ///
    /// The principal point is scaled about pixel corners so that a pixel
    /// center at `c` maps to the center of the block it falls in.
    pub fn scaled(&self, s: f32, size: ImageSize) -> Self {
        Self {
            fx: self.fx * s,
            fy: self.fy * s,
            cx: (self.cx + 0.5) * s - 0.5,
            cy: (self.cy + 0.5) * s - 0.5,
            size,
        }
    }

    /// The camera of pyramid level `level`, where each level halves the resolution.
    pub fn level(&self, level: usize) -> Self {
        let s = 0.5f32.powi(level as i32);
        self.scaled(s, self.size.downscaled(level))
    }
}
