use glam::Vec3;
use rayon::prelude::*;

use kinfu_image::Image;
use kinfu_imgproc::is_valid_depth;
use kinfu_lie::SE3F32;

use crate::{camera::PinholeCamera, error::TsdfError, tsdf::TsdfVolume};

/// Weights of the running average used by [`integrate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationParams {
    /// Weight of a single observation.
    pub weight: f32,
    /// Cap on the accumulated weight of a voxel.
    pub max_weight: f32,
}

impl Default for IntegrationParams {
    fn default() -> Self {
        Self {
            weight: 1.0,
            max_weight: 100.0,
        }
    }
}

/// Fuse a depth frame into the volume.
///
/// Every voxel center is transformed into the camera with the inverse of
/// `pose` and projected to its nearest pixel. With `z_meas` the depth at that
/// pixel and `z` the voxel depth, the normalized distance is
/// `sdf = (z_meas - z) / mu`. Voxels with `sdf < -1` are left untouched so that
/// occluded geometry is kept; otherwise `sdf` is clamped to `1` and averaged
/// into the voxel:
///
/// `D' = (W D + w sdf) / (W + w)`, `W' = min(W + w, W_max)`.
///
/// # Arguments
///
/// * `volume` - The volume to update.
/// * `depth` - The depth frame in metres, NaN where invalid.
/// * `camera` - The camera that captured `depth`.
/// * `pose` - The camera pose `T_wc` in the volume frame.
/// * `params` - The observation weight and its cap.
///
/// # Returns
///
/// The number of voxels that were updated.
pub fn integrate(
    volume: &mut TsdfVolume,
    depth: &Image<f32>,
    camera: &PinholeCamera,
    pose: &SE3F32,
    params: &IntegrationParams,
) -> Result<usize, TsdfError> {
    if depth.size() != camera.size {
        return Err(TsdfError::SizeMismatch(camera.size, depth.size()));
    }
    if !(params.weight.is_finite()
        && params.weight > 0.0
        && params.max_weight.is_finite()
        && params.max_weight >= params.weight)
    {
        return Err(TsdfError::InvalidWeight(params.weight, params.max_weight));
    }

    let now = std::time::Instant::now();

    let size = volume.size();
    let t_cw = pose.inverse();
    let inv_mu = 1.0 / volume.truncation();
    let cols = depth.width();
    let depth_data = depth.as_slice();

    // voxel centers are recomputed per plane so the closure does not borrow the volume
    let origin = volume.origin();
    let voxel_size = volume.voxel_size();
    let center = |x: usize, y: usize, z: usize| {
        origin + voxel_size * Vec3::new(x as f32, y as f32, z as f32)
    };

    let updated: usize = volume
        .voxels_mut()
        .as_slice_mut()
        .par_chunks_exact_mut(size.plane_len())
        .enumerate()
        .map(|(z, plane)| {
            let mut count = 0;
            for y in 0..size.height {
                for x in 0..size.width {
                    let p_c = t_cw.transform_point(center(x, y, z));
                    let Some((u, v)) = camera.project_to_pixel(p_c) else {
                        continue;
                    };

                    let z_meas = depth_data[v * cols + u];
                    if !is_valid_depth(z_meas) {
                        continue;
                    }

                    let sdf = (z_meas - p_c.z) * inv_mu;
                    if sdf < -1.0 {
                        continue;
                    }
                    let sdf = sdf.min(1.0);

                    let voxel = &mut plane[x + size.width * y];
                    let w = voxel.weight + params.weight;
                    voxel.sdf = (voxel.weight * voxel.sdf + params.weight * sdf) / w;
                    voxel.weight = w.min(params.max_weight);
                    count += 1;
                }
            }
            count
        })
        .sum();

    log::debug!("integrated {} voxels in {:?}", updated, now.elapsed());

    Ok(updated)
}
