use glam::Vec3;
use num_traits::AsPrimitive;

use kinfu_3d::{
    integrate, raycast, IntegrationParams, PinholeCamera, PointNormalPyramid, TsdfVolume,
};
use kinfu_icp::{align, IcpParams, IcpResult};
use kinfu_image::Image;
use kinfu_imgproc::{build_depth_pyramid, depth_from_raw};
use kinfu_lie::SE3F32;

use crate::{config::FusionConfig, error::FusionError};

/// What happened to a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStatus {
    /// Index of the frame since creation or the last reset.
    pub frame: usize,
    /// The tracker output, if the frame was tracked.
    pub icp: Option<IcpResult>,
    /// The number of updated voxels, if the frame was integrated.
    pub integrated_voxels: Option<usize>,
}

impl FrameStatus {
    /// Whether the frame was aligned to the model.
    pub fn tracked(&self) -> bool {
        self.icp.is_some()
    }

    /// Whether the frame was fused into the volume.
    pub fn fused(&self) -> bool {
        self.integrated_voxels.is_some()
    }
}

/// Dense depth fusion with frame-to-model tracking.
///
/// Every frame runs the same sequence:
///
/// 1. the volume is raycast from the current pose into a model depth map;
/// 2. model and live depth are turned into point and normal pyramids;
/// 3. after the warm-up, the live frame is aligned to the model and the pose
///    is updated with the resulting motion;
/// 4. the live frame is integrated at the (updated) pose.
///
/// The first `warmup_frames + 1` integrated frames are fused without tracking
/// so that the model has some surface to track against.
///
/// # Example
///
/// ```no_run
/// use kinfu::{image::Image, FusionConfig, KinectFusion};
///
/// let config = FusionConfig::default();
/// let mut fusion = KinectFusion::new(config.clone()).unwrap();
///
/// let frame = Image::<u16>::from_size_val(config.image_size(), 1500).unwrap();
/// let status = fusion.process_frame(&frame).unwrap();
///
/// assert!(status.fused());
/// assert_eq!(fusion.num_fused(), 1);
/// ```
pub struct KinectFusion {
    config: FusionConfig,
    camera: PinholeCamera,
    icp_params: IcpParams,
    integration_params: IntegrationParams,
    volume: TsdfVolume,
    pose: SE3F32,
    depth: Image<f32>,
    model_depth: Image<f32>,
    model: Option<PointNormalPyramid>,
    current: Option<PointNormalPyramid>,
    num_fused: usize,
    num_frames: usize,
}

impl KinectFusion {
    /// Create a pipeline with an empty volume at the identity pose.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or if the volume
    /// cannot be allocated.
    pub fn new(config: FusionConfig) -> Result<Self, FusionError> {
        config.validate()?;

        let camera = config.pinhole_camera()?;
        let volume = TsdfVolume::new(
            config.volume_size(),
            config.origin(),
            config.voxel_size(),
            config.volume.truncation,
        )?;

        let depth = Image::from_size_val(camera.size, f32::NAN)?;
        let model_depth = Image::from_size_val(camera.size, f32::NAN)?;

        log::info!(
            "kinect fusion ready: camera {}, {} pyramid levels, warm-up {} frames",
            camera.size,
            config.depth.pyramid_levels,
            config.warmup_frames
        );

        Ok(Self {
            icp_params: config.icp_params(),
            integration_params: config.integration_params(),
            config,
            camera,
            volume,
            pose: SE3F32::IDENTITY,
            depth,
            model_depth,
            model: None,
            current: None,
            num_fused: 0,
            num_frames: 0,
        })
    }

    /// Process a raw sensor frame, converting it to metres with the configured
    /// scale and depth range.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidInput`] if the frame does not match the
    /// camera resolution. The state is left untouched in that case.
    pub fn process_frame<T>(&mut self, raw: &Image<T>) -> Result<FrameStatus, FusionError>
    where
        T: AsPrimitive<f32> + Send + Sync,
    {
        self.check_size(raw)?;
        let cfg = &self.config.depth;
        depth_from_raw(
            raw,
            &mut self.depth,
            cfg.scale,
            cfg.min_depth,
            cfg.max_depth,
        )?;
        self.step()
    }

    /// Process a depth frame already in metres.
    ///
    /// Values outside the configured depth range are treated as invalid.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidInput`] if the frame does not match the
    /// camera resolution. The state is left untouched in that case.
    pub fn process_depth(&mut self, depth: &Image<f32>) -> Result<FrameStatus, FusionError> {
        self.check_size(depth)?;
        let cfg = &self.config.depth;
        depth_from_raw(depth, &mut self.depth, 1.0, cfg.min_depth, cfg.max_depth)?;
        self.step()
    }

    fn check_size<T>(&self, frame: &Image<T>) -> Result<(), FusionError> {
        if frame.size() != self.camera.size {
            return Err(FusionError::InvalidInput(format!(
                "frame is {}, the camera expects {}",
                frame.size(),
                self.camera.size
            )));
        }
        Ok(())
    }

    fn step(&mut self) -> Result<FrameStatus, FusionError> {
        let now = std::time::Instant::now();
        let levels = self.config.depth.pyramid_levels;

        raycast(&self.volume, &self.camera, &self.pose, &mut self.model_depth)?;

        let model = PointNormalPyramid::from_depth_pyramid(
            &build_depth_pyramid(&self.model_depth, levels)?,
            &self.camera,
        )?;
        let current = PointNormalPyramid::from_depth_pyramid(
            &build_depth_pyramid(&self.depth, levels)?,
            &self.camera,
        )?;

        let warming_up = self.num_fused <= self.config.warmup_frames;

        let icp = if self.config.track && !warming_up {
            // the model is rendered at the previous pose, so the motion since
            // then is the transformation from the live camera to the model camera
            let result = align(
                &model,
                &current,
                &self.camera,
                &SE3F32::IDENTITY,
                &self.icp_params,
            )?;
            self.pose = self.pose * result.pose;
            Some(result)
        } else {
            None
        };

        let integrated_voxels = if self.config.fuse || warming_up {
            let count = integrate(
                &mut self.volume,
                &self.depth,
                &self.camera,
                &self.pose,
                &self.integration_params,
            )?;
            self.num_fused += 1;
            Some(count)
        } else {
            None
        };

        self.model = Some(model);
        self.current = Some(current);

        let status = FrameStatus {
            frame: self.num_frames,
            icp,
            integrated_voxels,
        };
        self.num_frames += 1;

        log::debug!(
            "frame {}: tracked {}, fused {}, translation {:?} in {:?}",
            status.frame,
            status.tracked(),
            status.fused(),
            self.pose.translation,
            now.elapsed()
        );

        Ok(status)
    }

    /// Clear the volume and restart from the identity pose.
    pub fn reset(&mut self) {
        self.volume.reset();
        self.pose = SE3F32::IDENTITY;
        self.depth.fill(f32::NAN);
        self.model_depth.fill(f32::NAN);
        self.model = None;
        self.current = None;
        self.num_fused = 0;
        self.num_frames = 0;
        log::info!("kinect fusion reset");
    }

    /// The camera pose `T_wc` in the volume frame.
    #[inline]
    pub fn pose(&self) -> &SE3F32 {
        &self.pose
    }

    /// Override the camera pose, e.g. to nudge the sensor inside the volume.
    pub fn set_pose(&mut self, pose: SE3F32) {
        self.pose = pose;
    }

    /// The model depth raycast at the start of the last frame.
    #[inline]
    pub fn raycast_depth(&self) -> &Image<f32> {
        &self.model_depth
    }

    /// The last live depth in metres, NaN where invalid.
    #[inline]
    pub fn depth(&self) -> &Image<f32> {
        &self.depth
    }

    /// Full resolution model points of the last frame, in camera coordinates.
    pub fn model_points(&self) -> Option<&Image<Vec3>> {
        self.model.as_ref()?.level(0).map(|m| &m.points)
    }

    /// Full resolution model normals of the last frame, in camera coordinates.
    pub fn model_normals(&self) -> Option<&Image<Vec3>> {
        self.model.as_ref()?.level(0).map(|m| &m.normals)
    }

    /// Full resolution live points of the last frame, in camera coordinates.
    pub fn current_points(&self) -> Option<&Image<Vec3>> {
        self.current.as_ref()?.level(0).map(|m| &m.points)
    }

    /// Full resolution live normals of the last frame, in camera coordinates.
    pub fn current_normals(&self) -> Option<&Image<Vec3>> {
        self.current.as_ref()?.level(0).map(|m| &m.normals)
    }

    /// The fused volume.
    #[inline]
    pub fn volume(&self) -> &TsdfVolume {
        &self.volume
    }

    /// The level 0 camera.
    #[inline]
    pub fn camera(&self) -> &PinholeCamera {
        &self.camera
    }

    /// The configuration the pipeline was built with.
    #[inline]
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Number of frames integrated since creation or the last reset.
    #[inline]
    pub fn num_fused(&self) -> usize {
        self.num_fused
    }

    /// Number of frames processed since creation or the last reset.
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }
}
