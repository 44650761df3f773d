use glam::Vec3;

use kinfu_image::{Image, Pyramid};
use kinfu_imgproc::{is_valid_depth, parallel};

use crate::{camera::PinholeCamera, error::TsdfError};

/// Whether a point or normal holds a usable value.
///
/// Invalid entries of point and normal maps are `Vec3::NAN`.
#[inline]
pub fn is_valid_point(p: Vec3) -> bool {
    p.is_finite()
}

/// Back-project every pixel of a depth image to a camera-space point.
///
/// Pixels with invalid depth produce `Vec3::NAN`.
///
/// # Arguments
///
/// * `depth` - The depth image in metres.
/// * `camera` - The camera matching the resolution of `depth`.
/// * `points` - The destination point map, same size as `depth`.
pub fn depth_to_points(
    depth: &Image<f32>,
    camera: &PinholeCamera,
    points: &mut Image<Vec3>,
) -> Result<(), TsdfError> {
    if depth.size() != camera.size {
        return Err(TsdfError::SizeMismatch(camera.size, depth.size()));
    }
    if points.size() != depth.size() {
        return Err(TsdfError::SizeMismatch(depth.size(), points.size()));
    }

    let depth_data = depth.as_slice();
    let cols = depth.width();

    parallel::par_fill_with(points, |u, v| {
        let z = depth_data[v * cols + u];
        if is_valid_depth(z) {
            camera.unproject(u as f32, v as f32, z)
        } else {
            Vec3::NAN
        }
    });

    Ok(())
}

/// Estimate per-pixel normals from a point map by finite differences.
///
/// The normal at `(u, v)` is the normalized cross product of the tangents
/// towards `(u + 1, v)` and `(u, v + 1)`, oriented towards the camera. The
/// normal is `Vec3::NAN` if any of the three points is invalid, on the last row
/// and column, and where the tangents are degenerate.
pub fn points_to_normals(points: &Image<Vec3>, normals: &mut Image<Vec3>) -> Result<(), TsdfError> {
    if points.size() != normals.size() {
        return Err(TsdfError::SizeMismatch(points.size(), normals.size()));
    }

    let cols = points.width();
    let rows = points.height();
    let data = points.as_slice();

    parallel::par_fill_with(normals, |u, v| {
        if u + 1 >= cols || v + 1 >= rows {
            return Vec3::NAN;
        }

        let p = data[v * cols + u];
        let p_right = data[v * cols + u + 1];
        let p_down = data[(v + 1) * cols + u];

        if !(is_valid_point(p) && is_valid_point(p_right) && is_valid_point(p_down)) {
            return Vec3::NAN;
        }

        let n = (p_right - p).cross(p_down - p);
        let len = n.length();
        if len <= f32::EPSILON {
            return Vec3::NAN;
        }

        let n = n / len;
        if n.dot(p) > 0.0 {
            -n
        } else {
            n
        }
    });

    Ok(())
}

/// Camera-space points and normals of a single depth image.
#[derive(Debug, Clone, PartialEq)]
pub struct PointNormalMap {
    /// Per-pixel points, `Vec3::NAN` where invalid.
    pub points: Image<Vec3>,
    /// Per-pixel unit normals, `Vec3::NAN` where invalid.
    pub normals: Image<Vec3>,
}

impl PointNormalMap {
    /// Compute the point and normal maps of a depth image.
    pub fn from_depth(depth: &Image<f32>, camera: &PinholeCamera) -> Result<Self, TsdfError> {
        let mut points = Image::from_size_val(depth.size(), Vec3::NAN)?;
        depth_to_points(depth, camera, &mut points)?;

        let mut normals = Image::from_size_val(depth.size(), Vec3::NAN)?;
        points_to_normals(&points, &mut normals)?;

        Ok(Self { points, normals })
    }

    /// Number of pixels with both a valid point and a valid normal.
    pub fn num_valid(&self) -> usize {
        self.points
            .as_slice()
            .iter()
            .zip(self.normals.as_slice())
            .filter(|(p, n)| is_valid_point(**p) && is_valid_point(**n))
            .count()
    }
}

/// Point and normal maps for every level of a depth pyramid.
#[derive(Debug, Clone, PartialEq)]
pub struct PointNormalPyramid {
    levels: Vec<PointNormalMap>,
}

impl PointNormalPyramid {
    /// Compute the point and normal maps of each pyramid level.
    ///
    /// `camera` is the level 0 camera; level `k` uses `camera.level(k)`.
    pub fn from_depth_pyramid(
        pyramid: &Pyramid<f32>,
        camera: &PinholeCamera,
    ) -> Result<Self, TsdfError> {
        let levels = pyramid
            .iter()
            .enumerate()
            .map(|(k, depth)| PointNormalMap::from_depth(depth, &camera.level(k)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { levels })
    }

    /// Number of levels.
    #[inline]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// The maps of level `level`, where level 0 is the finest.
    #[inline]
    pub fn level(&self, level: usize) -> Option<&PointNormalMap> {
        self.levels.get(level)
    }

    /// Iterate over the levels from finest to coarsest.
    pub fn iter(&self) -> std::slice::Iter<'_, PointNormalMap> {
        self.levels.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kinfu_imgproc::build_depth_pyramid;

    fn camera() -> Result<PinholeCamera, TsdfError> {
        PinholeCamera::new(100.0, 100.0, 15.5, 11.5, [32, 24].into())
    }

    #[test]
    fn test_depth_to_points() -> Result<(), TsdfError> {
        let cam = camera()?;
        let mut depth = Image::<f32>::from_size_val(cam.size, 2.0)?;
        depth.set(3, 4, f32::NAN)?;
        let mut points = Image::from_size_val(cam.size, Vec3::ZERO)?;
        depth_to_points(&depth, &cam, &mut points)?;

        let p = *points.get(0, 0).expect("in bounds");
        assert_relative_eq!(p.x, -15.5 * 2.0 / 100.0);
        assert_relative_eq!(p.y, -11.5 * 2.0 / 100.0);
        assert_relative_eq!(p.z, 2.0);
        assert!(!is_valid_point(*points.get(3, 4).expect("in bounds")));
        Ok(())
    }

    #[test]
    fn test_frontal_plane_normals() -> Result<(), TsdfError> {
        let cam = camera()?;
        let depth = Image::<f32>::from_size_val(cam.size, 1.5)?;
        let map = PointNormalMap::from_depth(&depth, &cam)?;

        for v in 0..cam.size.height - 1 {
            for u in 0..cam.size.width - 1 {
                let n = *map.normals.get(u, v).expect("in bounds");
                assert_relative_eq!(n.z, -1.0, epsilon = 1e-5);
            }
        }
        // last row and column have no forward neighbour
        assert!(!is_valid_point(*map.normals.get(31, 0).expect("in bounds")));
        assert!(!is_valid_point(*map.normals.get(0, 23).expect("in bounds")));
        assert_eq!(map.num_valid(), 31 * 23);
        Ok(())
    }

    #[test]
    fn test_invalid_neighbour_invalidates_normal() -> Result<(), TsdfError> {
        let cam = camera()?;
        let mut depth = Image::<f32>::from_size_val(cam.size, 1.0)?;
        depth.set(10, 10, f32::NAN)?;
        let map = PointNormalMap::from_depth(&depth, &cam)?;
        assert!(!is_valid_point(*map.normals.get(10, 10).expect("in bounds")));
        assert!(!is_valid_point(*map.normals.get(9, 10).expect("in bounds")));
        assert!(!is_valid_point(*map.normals.get(10, 9).expect("in bounds")));
        assert!(is_valid_point(*map.normals.get(11, 10).expect("in bounds")));
        Ok(())
    }

    #[test]
    fn test_slanted_plane_normal() -> Result<(), TsdfError> {
        // plane x + z = 2 seen by the camera
        let cam = camera()?;
        let depth = Image::from_fn(cam.size, |u, v| {
            let ray = cam.ray(u as f32, v as f32);
            2.0 / (ray.x + ray.z)
        });
        let map = PointNormalMap::from_depth(&depth, &cam)?;
        let n = *map.normals.get(12, 12).expect("in bounds");
        let expected = Vec3::new(-1.0, 0.0, -1.0).normalize();
        assert!((n - expected).length() < 1e-3);
        Ok(())
    }

    #[test]
    fn test_point_normal_pyramid() -> Result<(), TsdfError> {
        let cam = camera()?;
        let depth = Image::<f32>::from_size_val(cam.size, 1.0)?;
        let pyramid = build_depth_pyramid(&depth, 3)?;
        let maps = PointNormalPyramid::from_depth_pyramid(&pyramid, &cam)?;
        assert_eq!(maps.num_levels(), 3);
        let coarse = maps.level(2).expect("three levels");
        assert_eq!(coarse.points.width(), 8);
        // the coarse camera keeps the optical axis on the same 3D ray
        let p = *coarse.points.get(0, 0).expect("in bounds");
        let l2 = cam.level(2);
        assert_relative_eq!(p.x, -l2.cx / l2.fx, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_size_mismatch() -> Result<(), TsdfError> {
        let cam = camera()?;
        let depth = Image::<f32>::from_size_val([8, 8].into(), 1.0)?;
        let mut points = Image::from_size_val([8, 8].into(), Vec3::ZERO)?;
        assert!(matches!(
            depth_to_points(&depth, &cam, &mut points),
            Err(TsdfError::SizeMismatch(_, _))
        ));
        Ok(())
    }
}
