use glam::Vec3;

use kinfu_image::Image;
use kinfu_imgproc::{is_valid_depth, parallel};
use kinfu_lie::SE3F32;

use crate::{camera::PinholeCamera, error::TsdfError, tsdf::TsdfVolume};

/// Render the z-depth of the fused surface as seen from `pose`.
///
/// For every pixel the viewing ray is clipped to the volume box and marched in
/// steps of one voxel, sampling the trilinearly interpolated distance. The
/// first sample that is observed and negative ends the march:
///
/// - after an observed non-negative sample, the depth of the zero crossing is
///   linearly interpolated between both samples;
/// - after an unobserved sample, the surface is placed `D * mu` in front of
///   the sample.
///
/// Pixels whose ray finds no crossing are written as NaN.
///
/// # Arguments
///
/// * `volume` - The volume to render.
/// * `camera` - The virtual camera.
/// * `pose` - The camera pose `T_wc` in the volume frame.
/// * `depth` - The destination depth image, sized like the camera.
pub fn raycast(
    volume: &TsdfVolume,
    camera: &PinholeCamera,
    pose: &SE3F32,
    depth: &mut Image<f32>,
) -> Result<(), TsdfError> {
    if depth.size() != camera.size {
        return Err(TsdfError::SizeMismatch(camera.size, depth.size()));
    }

    let now = std::time::Instant::now();

    let origin = pose.translation;
    let (lo, hi) = volume.bounds();
    let min_voxel = volume.voxel_size().min_element();

    parallel::par_fill_with(depth, |u, v| {
        // camera rays have unit z, so the ray parameter is the depth
        let dir = pose.rotate(camera.ray(u as f32, v as f32));
        let step = min_voxel / dir.length();
        match ray_box(origin, dir, lo, hi) {
            Some((t_near, t_far)) => {
                march(volume, origin, dir, t_near, t_far, step).unwrap_or(f32::NAN)
            }
            None => f32::NAN,
        }
    });

    log::debug!(
        "raycast {} valid pixels in {:?}",
        depth.as_slice().iter().filter(|d| is_valid_depth(**d)).count(),
        now.elapsed()
    );

    Ok(())
}

/// Allocate a depth image and [`raycast`] into it.
pub fn raycast_depth(
    volume: &TsdfVolume,
    camera: &PinholeCamera,
    pose: &SE3F32,
) -> Result<Image<f32>, TsdfError> {
    let mut depth = Image::from_size_val(camera.size, f32::NAN)?;
    raycast(volume, camera, pose, &mut depth)?;
    Ok(depth)
}

fn march(
    volume: &TsdfVolume,
    origin: Vec3,
    dir: Vec3,
    t_near: f32,
    t_far: f32,
    step: f32,
) -> Option<f32> {
    let num_steps = ((t_far - t_near) / step).ceil() as usize;

    let mut prev_t = t_near;
    let mut prev_sdf: Option<f32> = None;

    for i in 0..=num_steps {
        let t = (t_near + i as f32 * step).min(t_far);
        let sdf = volume.interpolate(origin + dir * t);

        if let Some(d) = sdf {
            if d < 0.0 {
                match prev_sdf {
                    Some(d_prev) if d_prev >= 0.0 => {
                        return Some(prev_t + (t - prev_t) * d_prev / (d_prev - d));
                    }
                    None => {
                        let hit = t + d * volume.truncation();
                        if hit > 0.0 {
                            return Some(hit);
                        }
                    }
                    // still behind a surface seen from the other side
                    Some(_) => {}
                }
            }
        }

        prev_t = t;
        prev_sdf = sdf;
    }

    None
}

/// Intersect a ray with an axis-aligned box, returning the clipped
/// `[t_near, t_far]` interval with `t_near >= 0`.
fn ray_box(origin: Vec3, dir: Vec3, lo: Vec3, hi: Vec3) -> Option<(f32, f32)> {
    let mut t_near = 0.0f32;
    let mut t_far = f32::INFINITY;

    for axis in 0..3 {
        let (o, d) = (origin[axis], dir[axis]);
        if d.abs() < 1e-12 {
            if o < lo[axis] || o > hi[axis] {
                return None;
            }
            continue;
        }
        let t1 = (lo[axis] - o) / d;
        let t2 = (hi[axis] - o) / d;
        t_near = t_near.max(t1.min(t2));
        t_far = t_far.min(t1.max(t2));
    }

    (t_near <= t_far).then_some((t_near, t_far))
}
