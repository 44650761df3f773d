use kinfu_3d::{PinholeCamera, PointNormalPyramid};
use kinfu_lie::SE3F32;

use crate::{
    error::IcpError,
    normal_equations::{compute_normal_equations, CorrespondenceParams},
};

/// Parameters of a single pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcpLevelParams {
    /// Number of Gauss-Newton iterations run at this level.
    pub iterations: usize,
}

/// Parameters of the coarse-to-fine alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct IcpParams {
    /// Per-level parameters, finest level first. Levels are processed from
    /// the last entry to the first.
    pub levels: Vec<IcpLevelParams>,
    /// Maximum angle between corresponding normals in degrees.
    pub angle_threshold_deg: f32,
    /// Maximum distance between corresponding points in metres.
    pub distance_threshold: f32,
    /// Minimum number of accepted correspondences for an update.
    pub min_correspondences: usize,
}

impl Default for IcpParams {
    fn default() -> Self {
        Self {
            levels: vec![
                IcpLevelParams { iterations: 10 },
                IcpLevelParams { iterations: 5 },
                IcpLevelParams { iterations: 4 },
            ],
            angle_threshold_deg: 20.0,
            distance_threshold: 0.15,
            min_correspondences: 64,
        }
    }
}

/// Diagnostics of one pyramid level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelReport {
    /// The pyramid level, 0 being the finest.
    pub level: usize,
    /// Number of iterations run.
    pub iterations: usize,
    /// Accepted correspondences of every iteration.
    pub correspondences: Vec<usize>,
    /// RMS point-to-plane residual of the last iteration, in metres.
    pub rms: f64,
    /// Whether the level was aborted on a degenerate system. The pose is then
    /// left as it was when the level started.
    pub degenerate: bool,
}

/// Result of the coarse-to-fine alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct IcpResult {
    /// The refined transformation from the current camera to the model camera.
    pub pose: SE3F32,
    /// Per-level diagnostics, in processing order (coarsest first).
    pub levels: Vec<LevelReport>,
}

impl IcpResult {
    /// Whether any level was aborted as degenerate.
    pub fn is_degenerate(&self) -> bool {
        self.levels.iter().any(|l| l.degenerate)
    }
}

/// Align the current frame to the model by projective point-to-plane ICP.
///
/// Both pyramids hold camera-space points and normals; `camera` is the level 0
/// camera and level `k` uses `camera.level(k)` for the projective association.
/// Starting from `initial`, the transformation from the current camera to the
/// model camera is refined coarse to fine. Every iteration solves the linearized
/// system and applies the left update `T ← exp(ξ) T`.
///
/// A level whose system has fewer than `min_correspondences` accepted pairs or
/// cannot be solved is aborted, keeping the pose it started with.
///
/// # Arguments
///
/// * `model` - Points and normals of the model, e.g. from raycasting.
/// * `current` - Points and normals of the live frame.
/// * `camera` - The level 0 camera shared by both pyramids.
/// * `initial` - Initial transformation from the current to the model camera.
/// * `params` - Level schedule and rejection gates.
///
/// # Errors
///
/// Returns an error if the pyramids do not match or if the parameters are invalid.
pub fn align(
    model: &PointNormalPyramid,
    current: &PointNormalPyramid,
    camera: &PinholeCamera,
    initial: &SE3F32,
    params: &IcpParams,
) -> Result<IcpResult, IcpError> {
    if model.num_levels() != current.num_levels() {
        return Err(IcpError::LevelCountMismatch(
            model.num_levels(),
            current.num_levels(),
        ));
    }
    if params.levels.len() > model.num_levels() {
        return Err(IcpError::TooManyLevels(
            params.levels.len(),
            model.num_levels(),
        ));
    }
    if !(params.angle_threshold_deg.is_finite()
        && params.angle_threshold_deg > 0.0
        && params.angle_threshold_deg <= 180.0)
    {
        return Err(IcpError::InvalidThreshold(format!(
            "angle threshold {} deg",
            params.angle_threshold_deg
        )));
    }
    if !(params.distance_threshold.is_finite() && params.distance_threshold > 0.0) {
        return Err(IcpError::InvalidThreshold(format!(
            "distance threshold {} m",
            params.distance_threshold
        )));
    }

    let gates = CorrespondenceParams::new(params.angle_threshold_deg, params.distance_threshold);
    let min_correspondences = params.min_correspondences.max(6);

    let mut pose = *initial;
    let mut reports = Vec::with_capacity(params.levels.len());

    for (level, level_params) in params.levels.iter().enumerate().rev() {
        let (Some(model_level), Some(current_level)) = (model.level(level), current.level(level))
        else {
            continue;
        };
        if model_level.points.size() != current_level.points.size() {
            return Err(IcpError::SizeMismatch(
                level,
                model_level.points.size(),
                current_level.points.size(),
            ));
        }

        let now = std::time::Instant::now();
        let cam = camera.level(level);
        let level_start = pose;

        let mut report = LevelReport {
            level,
            iterations: 0,
            correspondences: Vec::with_capacity(level_params.iterations),
            rms: 0.0,
            degenerate: false,
        };

        for _ in 0..level_params.iterations {
            let eq = compute_normal_equations(model_level, current_level, &cam, &pose, &gates);
            report.iterations += 1;
            report.correspondences.push(eq.count);
            report.rms = eq.rms();

            let update = if eq.count < min_correspondences {
                None
            } else {
                eq.solve()
            };

            match update {
                Some(xi) => pose = SE3F32::exp(&xi) * pose,
                None => {
                    log::warn!(
                        "icp level {} degenerate with {} correspondences, keeping pose",
                        level,
                        eq.count
                    );
                    report.degenerate = true;
                    pose = level_start;
                    break;
                }
            }
        }

        log::debug!(
            "icp level {}: {} iterations, correspondences {:?}, rms {:.5} in {:?}",
            level,
            report.iterations,
            report.correspondences,
            report.rms,
            now.elapsed()
        );

        reports.push(report);
    }

    Ok(IcpResult {
        pose,
        levels: reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use kinfu_3d::{is_valid_point, synthetic::Scene, PointNormalMap};
    use kinfu_image::Image;
    use kinfu_imgproc::build_depth_pyramid;
    use kinfu_lie::SO3F32;

    use crate::normal_equations::NormalEquations;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn camera() -> Result<PinholeCamera, Box<dyn std::error::Error>> {
        Ok(PinholeCamera::new(
            120.0,
            120.0,
            79.5,
            59.5,
            [160, 120].into(),
        )?)
    }

    // back wall, floor and left wall: constrains all six degrees of freedom
    fn corner_scene() -> Scene {
        Scene::new()
            .with_plane(Vec3::new(0.0, 0.0, 1.5), Vec3::NEG_Z)
            .with_plane(Vec3::new(0.0, 0.5, 0.0), Vec3::NEG_Y)
            .with_plane(Vec3::new(-0.6, 0.0, 0.0), Vec3::X)
    }

    fn pyramid(
        scene: &Scene,
        camera: &PinholeCamera,
        pose: &SE3F32,
    ) -> Result<PointNormalPyramid, Box<dyn std::error::Error>> {
        let depth = scene.render_depth(camera, pose);
        let depth_pyramid = build_depth_pyramid(&depth, 3)?;
        Ok(PointNormalPyramid::from_depth_pyramid(&depth_pyramid, camera)?)
    }

    fn delta() -> SE3F32 {
        SE3F32::new(
            SO3F32::from_axis_angle(Vec3::new(0.3, 1.0, -0.2), 2f32.to_radians()),
            Vec3::new(0.006, -0.004, 0.007),
        )
    }

    #[test]
    fn test_align_recovers_motion() -> TestResult {
        let cam = camera()?;
        let scene = corner_scene();
        let delta = delta();

        let model = pyramid(&scene, &cam, &SE3F32::IDENTITY)?;
        let current = pyramid(&scene, &cam, &delta)?;

        let result = align(&model, &current, &cam, &SE3F32::IDENTITY, &IcpParams::default())?;

        let error = result.pose.inverse() * delta;
        assert!(
            error.angle().to_degrees() < 0.1,
            "rotation error {} deg",
            error.angle().to_degrees()
        );
        assert!(
            error.translation.length() < 1e-3,
            "translation error {} m",
            error.translation.length()
        );

        assert!(!result.is_degenerate());
        let levels = result.levels.iter().map(|l| l.level).collect::<Vec<_>>();
        assert_eq!(levels, vec![2, 1, 0]);
        assert_eq!(result.levels[2].iterations, 10);
        assert!(result.levels.iter().all(|l| l.correspondences.iter().all(|c| *c > 0)));
        Ok(())
    }

    #[test]
    fn test_align_identity_is_stable() -> TestResult {
        let cam = camera()?;
        let model = pyramid(&corner_scene(), &cam, &SE3F32::IDENTITY)?;
        let result = align(&model, &model, &cam, &SE3F32::IDENTITY, &IcpParams::default())?;
        assert!(result.pose.angle() < 1e-5);
        assert!(result.pose.translation.length() < 1e-5);
        assert!(result.levels.iter().all(|l| l.rms < 1e-5));
        Ok(())
    }

    #[test]
    fn test_too_few_correspondences_keeps_pose() -> TestResult {
        let cam = camera()?;
        let current = pyramid(&corner_scene(), &cam, &SE3F32::IDENTITY)?;
        // a model without any surface
        let empty = build_depth_pyramid(&Image::from_fn(cam.size, |_, _| f32::NAN), 3)?;
        let model = PointNormalPyramid::from_depth_pyramid(&empty, &cam)?;

        let initial = delta();
        let result = align(&model, &current, &cam, &initial, &IcpParams::default())?;
        assert_eq!(result.pose, initial);
        assert!(result.levels.iter().all(|l| l.degenerate));
        assert!(result.levels.iter().all(|l| l.correspondences == vec![0]));
        Ok(())
    }

    #[test]
    fn test_planar_scene_is_degenerate() -> TestResult {
        let cam = camera()?;
        let scene = Scene::new().with_plane(Vec3::new(0.0, 0.0, 1.0), Vec3::NEG_Z);
        let model = pyramid(&scene, &cam, &SE3F32::IDENTITY)?;
        let current = pyramid(&scene, &cam, &SE3F32::from_translation(Vec3::new(0.01, 0.0, 0.0)))?;
        let result = align(&model, &current, &cam, &SE3F32::IDENTITY, &IcpParams::default())?;
        assert!(result.is_degenerate());
        assert_eq!(result.pose, SE3F32::IDENTITY);
        Ok(())
    }

    #[test]
    fn test_angle_gate_rejects_points() -> TestResult {
        let cam = camera()?.level(2);
        let scene = corner_scene();
        let model = PointNormalMap::from_depth(&scene.render_depth(&cam, &SE3F32::IDENTITY), &cam)?;
        let mut current =
            PointNormalMap::from_depth(&scene.render_depth(&cam, &delta()), &cam)?;
        let gates = CorrespondenceParams::new(20.0, 0.15);

        // drop a block of the current frame
        let block = |u: usize, v: usize| (10..20).contains(&u) && (5..15).contains(&v);
        for v in 0..cam.size.height {
            for u in 0..cam.size.width {
                if block(u, v) {
                    current.points.set(u, v, Vec3::NAN)?;
                }
            }
        }
        let before = compute_normal_equations(&model, &current, &cam, &SE3F32::IDENTITY, &gates);
        assert!(before.count > 0);

        // put the block back with normals at 90 degrees from the surface
        let pristine = PointNormalMap::from_depth(&scene.render_depth(&cam, &delta()), &cam)?;
        for v in 0..cam.size.height {
            for u in 0..cam.size.width {
                if block(u, v) {
                    let p = *pristine.points.get(u, v).unwrap_or(&Vec3::NAN);
                    let n = *pristine.normals.get(u, v).unwrap_or(&Vec3::NAN);
                    current.points.set(u, v, p)?;
                    let n = if is_valid_point(n) {
                        n.any_orthonormal_vector()
                    } else {
                        Vec3::NAN
                    };
                    current.normals.set(u, v, n)?;
                }
            }
        }
        let after = compute_normal_equations(&model, &current, &cam, &SE3F32::IDENTITY, &gates);
        assert_eq!(before, after);

        // with the true normals the block contributes
        let all = compute_normal_equations(&model, &pristine, &cam, &SE3F32::IDENTITY, &gates);
        assert!(all.count > before.count);
        Ok(())
    }

    #[test]
    fn test_distance_gate() -> TestResult {
        let cam = camera()?.level(2);
        let scene = corner_scene();
        let model = PointNormalMap::from_depth(&scene.render_depth(&cam, &SE3F32::IDENTITY), &cam)?;
        // the same surface seen 30 cm further away
        let shifted = SE3F32::from_translation(Vec3::new(0.0, 0.0, -0.3));
        let current = PointNormalMap::from_depth(&scene.render_depth(&cam, &shifted), &cam)?;
        let gates = CorrespondenceParams::new(20.0, 0.15);
        let eq = compute_normal_equations(&model, &current, &cam, &SE3F32::IDENTITY, &gates);
        let wide = CorrespondenceParams::new(20.0, 1.0);
        let eq_wide = compute_normal_equations(&model, &current, &cam, &SE3F32::IDENTITY, &wide);
        assert!(eq.count < eq_wide.count);
        assert_ne!(eq, NormalEquations::default());
        Ok(())
    }

    #[test]
    fn test_deterministic() -> TestResult {
        let cam = camera()?;
        let scene = corner_scene();
        let model = pyramid(&scene, &cam, &SE3F32::IDENTITY)?;
        let current = pyramid(&scene, &cam, &delta())?;
        let a = align(&model, &current, &cam, &SE3F32::IDENTITY, &IcpParams::default())?;
        let b = align(&model, &current, &cam, &SE3F32::IDENTITY, &IcpParams::default())?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_invalid_params() -> TestResult {
        let cam = camera()?;
        let model = pyramid(&corner_scene(), &cam, &SE3F32::IDENTITY)?;
        let mut params = IcpParams::default();
        params.levels.push(IcpLevelParams { iterations: 1 });
        assert_eq!(
            align(&model, &model, &cam, &SE3F32::IDENTITY, &params),
            Err(IcpError::TooManyLevels(4, 3))
        );
        let params = IcpParams {
            distance_threshold: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            align(&model, &model, &cam, &SE3F32::IDENTITY, &params),
            Err(IcpError::InvalidThreshold(_))
        ));
        Ok(())
    }
}
