//! Analytic scenes for tests, benchmarks and demos.
//!
//! A [`Scene`] is a list of planes and spheres in world coordinates. Rendering
//! casts the viewing ray of every pixel from a camera pose `T_wc` and keeps the
//! nearest intersection, giving an exact z-depth map.

use glam::Vec3;

use kinfu_image::Image;
use kinfu_imgproc::parallel;
use kinfu_lie::SE3F32;

use crate::camera::PinholeCamera;

/// A geometric primitive in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    /// An infinite plane through `point` with normal `normal`.
    Plane {
        /// A point on the plane.
        point: Vec3,
        /// The plane normal, not necessarily unit length.
        normal: Vec3,
    },
    /// A sphere.
    Sphere {
        /// Center of the sphere.
        center: Vec3,
        /// Radius of the sphere.
        radius: f32,
    },
}

impl Primitive {
    /// Smallest positive ray parameter `t` with `origin + t * dir` on the surface.
    pub fn intersect(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        match *self {
            Primitive::Plane { point, normal } => {
                let denom = normal.dot(dir);
                if denom.abs() < 1e-9 {
                    return None;
                }
                let t = normal.dot(point - origin) / denom;
                (t > 0.0).then_some(t)
            }
            Primitive::Sphere { center, radius } => {
                let oc = origin - center;
                let a = dir.length_squared();
                let half_b = oc.dot(dir);
                let c = oc.length_squared() - radius * radius;
                let disc = half_b * half_b - a * c;
                if disc < 0.0 {
                    return None;
                }
                let sqrt_disc = disc.sqrt();
                [(-half_b - sqrt_disc) / a, (-half_b + sqrt_disc) / a]
                    .into_iter()
                    .find(|t| *t > 0.0)
            }
        }
    }
}

/// A collection of primitives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    primitives: Vec<Primitive>,
}

impl Scene {
    /// An empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plane through `point` with normal `normal`.
    pub fn with_plane(mut self, point: Vec3, normal: Vec3) -> Self {
        self.primitives.push(Primitive::Plane { point, normal });
        self
    }

    /// Add a sphere.
    pub fn with_sphere(mut self, center: Vec3, radius: f32) -> Self {
        self.primitives.push(Primitive::Sphere { center, radius });
        self
    }

    /// The primitives of the scene.
    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Nearest positive intersection of a ray with the scene.
    pub fn intersect(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        self.primitives
            .iter()
            .filter_map(|p| p.intersect(origin, dir))
            .reduce(f32::min)
    }

    /// Render the z-depth seen from `pose`, NaN where no surface is hit.
    pub fn render_depth(&self, camera: &PinholeCamera, pose: &SE3F32) -> Image<f32> {
        let mut depth = Image::from_fn(camera.size, |_, _| f32::NAN);
        let origin = pose.translation;

        parallel::par_fill_with(&mut depth, |u, v| {
            // the camera ray has unit z, so the ray parameter is the depth
            let dir = pose.rotate(camera.ray(u as f32, v as f32));
            self.intersect(origin, dir).unwrap_or(f32::NAN)
        });

        depth
    }

    /// Render the depth as sensor units of `scale` metres, 0 where invalid.
    pub fn render_raw_depth(&self, camera: &PinholeCamera, pose: &SE3F32, scale: f32) -> Image<u16> {
        self.render_depth(camera, pose).map(|z| {
            if z.is_finite() {
                (z / scale).round().clamp(0.0, u16::MAX as f32) as u16
            } else {
                0
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kinfu_lie::SO3F32;

    use crate::error::TsdfError;

    #[test]
    fn test_plane_depth() -> Result<(), TsdfError> {
        let cam = PinholeCamera::new(50.0, 50.0, 15.5, 11.5, [32, 24].into())?;
        let scene = Scene::new().with_plane(Vec3::new(0.0, 0.0, 2.0), Vec3::NEG_Z);
        let depth = scene.render_depth(&cam, &SE3F32::IDENTITY);
        assert!(depth.as_slice().iter().all(|&z| (z - 2.0).abs() < 1e-5));

        // moving the camera forward shortens the depth
        let pose = SE3F32::from_translation(Vec3::new(0.0, 0.0, 0.5));
        let depth = scene.render_depth(&cam, &pose);
        assert_relative_eq!(depth.as_slice()[0], 1.5, epsilon = 1e-5);
        Ok(())
    }

    #[test]
    fn test_rotated_camera_sees_nothing() -> Result<(), TsdfError> {
        let cam = PinholeCamera::new(50.0, 50.0, 15.5, 11.5, [32, 24].into())?;
        let scene = Scene::new().with_plane(Vec3::new(0.0, 0.0, 2.0), Vec3::NEG_Z);
        let pose = SE3F32::new(
            SO3F32::from_axis_angle(Vec3::Y, std::f32::consts::PI),
            Vec3::ZERO,
        );
        let depth = scene.render_depth(&cam, &pose);
        assert!(depth.as_slice().iter().all(|z| z.is_nan()));
        Ok(())
    }

    #[test]
    fn test_sphere_occludes_plane() -> Result<(), TsdfError> {
        let cam = PinholeCamera::new(50.0, 50.0, 16.0, 12.0, [33, 25].into())?;
        let scene = Scene::new()
            .with_plane(Vec3::new(0.0, 0.0, 3.0), Vec3::Z)
            .with_sphere(Vec3::new(0.0, 0.0, 2.0), 0.5);
        let depth = scene.render_depth(&cam, &SE3F32::IDENTITY);
        assert_relative_eq!(*depth.get(16, 12).unwrap_or(&f32::NAN), 1.5, epsilon = 1e-5);
        assert_relative_eq!(*depth.get(0, 0).unwrap_or(&f32::NAN), 3.0, epsilon = 1e-5);
        Ok(())
    }

    #[test]
    fn test_inside_sphere() {
        let sphere = Primitive::Sphere {
            center: Vec3::ZERO,
            radius: 2.0,
        };
        let t = sphere.intersect(Vec3::ZERO, Vec3::X);
        assert_eq!(t, Some(2.0));
    }

    #[test]
    fn test_raw_depth() -> Result<(), TsdfError> {
        let cam = PinholeCamera::new(50.0, 50.0, 15.5, 11.5, [32, 24].into())?;
        let scene = Scene::new().with_plane(Vec3::new(0.0, 0.0, 1.234), Vec3::NEG_Z);
        let raw = scene.render_raw_depth(&cam, &SE3F32::IDENTITY, 1e-3);
        assert!(raw.as_slice().iter().all(|&d| d == 1234));
        let empty = Scene::new().render_raw_depth(&cam, &SE3F32::IDENTITY, 1e-3);
        assert!(empty.as_slice().iter().all(|&d| d == 0));
        Ok(())
    }
}
