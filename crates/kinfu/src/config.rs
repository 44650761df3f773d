use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use kinfu_3d::{IntegrationParams, PinholeCamera};
use kinfu_icp::{IcpLevelParams, IcpParams};
use kinfu_image::{ImageSize, VolumeSize};

use crate::error::FusionError;

/// Intrinsics and resolution of the depth sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Focal length along x in pixels.
    pub fx: f32,
    /// Focal length along y in pixels.
    pub fy: f32,
    /// Principal point x in pixels.
    pub cx: f32,
    /// Principal point y in pixels.
    pub cy: f32,
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fx: 550.0,
            fy: 550.0,
            cx: 319.5,
            cy: 239.5,
            width: 640,
            height: 480,
        }
    }
}

/// Conversion of raw sensor frames and pyramid depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    /// Metres per raw depth unit.
    pub scale: f32,
    /// Depth below which a measurement is discarded, in metres.
    pub min_depth: f32,
    /// Depth above which a measurement is discarded, in metres.
    pub max_depth: f32,
    /// Number of pyramid levels, including the full resolution.
    pub pyramid_levels: usize,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            scale: 1e-3,
            min_depth: 0.1,
            max_depth: 4.0,
            pyramid_levels: 3,
        }
    }
}

/// Geometry of the fused volume and the running average weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Number of voxels along x, y and z.
    pub size: [usize; 3],
    /// World position of the center of voxel `(0, 0, 0)`.
    pub origin: [f32; 3],
    /// Spacing between voxel centers along x, y and z, in metres.
    pub voxel_size: [f32; 3],
    /// Truncation distance `mu` in metres.
    pub truncation: f32,
    /// Weight of a single observation.
    pub weight: f32,
    /// Cap on the accumulated weight of a voxel.
    pub max_weight: f32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        let size = [512, 512, 128];
        Self {
            size,
            origin: [-1.0, -1.0, 0.5],
            voxel_size: size.map(|n| 2.0 / (n - 1) as f32),
            truncation: 0.05,
            weight: 1.0,
            max_weight: 100.0,
        }
    }
}

/// Schedule and rejection gates of the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcpConfig {
    /// Iterations per pyramid level, finest level first.
    pub iterations: Vec<usize>,
    /// Maximum angle between corresponding normals in degrees.
    pub angle_threshold_deg: f32,
    /// Maximum distance between corresponding points in metres.
    pub distance_threshold: f32,
    /// Minimum number of accepted correspondences for an update.
    pub min_correspondences: usize,
}

impl Default for IcpConfig {
    fn default() -> Self {
        let params = IcpParams::default();
        Self {
            iterations: params.levels.iter().map(|l| l.iterations).collect(),
            angle_threshold_deg: params.angle_threshold_deg,
            distance_threshold: params.distance_threshold,
            min_correspondences: params.min_correspondences,
        }
    }
}

/// Configuration of the fusion pipeline.
///
/// Every field has a default, so a JSON file only needs the values that differ.
///
/// # Example
///
/// ```
/// use kinfu::FusionConfig;
///
/// let config = FusionConfig::default();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.volume.size, [512, 512, 128]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// The depth sensor.
    pub camera: CameraConfig,
    /// Raw depth conversion and pyramid.
    pub depth: DepthConfig,
    /// The fused volume.
    pub volume: VolumeConfig,
    /// The tracker.
    pub icp: IcpConfig,
    /// Integrate frames after the warm-up.
    pub fuse: bool,
    /// Track frames after the warm-up.
    pub track: bool,
    /// Frames integrated at the start without tracking.
    pub warmup_frames: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            depth: DepthConfig::default(),
            volume: VolumeConfig::default(),
            icp: IcpConfig::default(),
            fuse: true,
            track: true,
            warmup_frames: 30,
        }
    }
}

fn positive(name: &str, value: f32) -> Result<(), FusionError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FusionError::InvalidConfig(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

impl FusionConfig {
    /// Load and validate a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// configuration is invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FusionError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        log::debug!("loaded fusion config from {}", path.display());
        Ok(config)
    }

    /// Check that the configuration describes a usable setup.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidConfig`] naming the first offending value.
    pub fn validate(&self) -> Result<(), FusionError> {
        let cam = &self.camera;
        positive("camera.fx", cam.fx)?;
        positive("camera.fy", cam.fy)?;
        if !(cam.cx.is_finite() && cam.cy.is_finite()) {
            return Err(FusionError::InvalidConfig(format!(
                "camera principal point must be finite, got ({}, {})",
                cam.cx, cam.cy
            )));
        }
        if cam.width == 0 || cam.height == 0 {
            return Err(FusionError::InvalidConfig(format!(
                "camera resolution must not be empty, got {}x{}",
                cam.width, cam.height
            )));
        }

        let depth = &self.depth;
        positive("depth.scale", depth.scale)?;
        positive("depth.max_depth", depth.max_depth)?;
        if !(depth.min_depth.is_finite() && depth.min_depth >= 0.0)
            || depth.min_depth >= depth.max_depth
        {
            return Err(FusionError::InvalidConfig(format!(
                "depth range [{}, {}] is empty",
                depth.min_depth, depth.max_depth
            )));
        }
        if depth.pyramid_levels == 0 {
            return Err(FusionError::InvalidConfig(
                "depth.pyramid_levels must be at least 1".to_string(),
            ));
        }
        let coarsest = self.image_size().downscaled(depth.pyramid_levels - 1);
        if coarsest.width < 2 || coarsest.height < 2 {
            return Err(FusionError::InvalidConfig(format!(
                "{} pyramid levels leave a {} coarsest level",
                depth.pyramid_levels, coarsest
            )));
        }

        let vol = &self.volume;
        if vol.size.iter().any(|&n| n < 2) {
            return Err(FusionError::InvalidConfig(format!(
                "volume.size needs at least 2 voxels per axis, got {:?}",
                vol.size
            )));
        }
        if vol.origin.iter().any(|o| !o.is_finite()) {
            return Err(FusionError::InvalidConfig(format!(
                "volume.origin must be finite, got {:?}",
                vol.origin
            )));
        }
        for s in vol.voxel_size {
            positive("volume.voxel_size", s)?;
        }
        positive("volume.truncation", vol.truncation)?;
        positive("volume.weight", vol.weight)?;
        if !(vol.max_weight.is_finite() && vol.max_weight >= vol.weight) {
            return Err(FusionError::InvalidConfig(format!(
                "volume.max_weight {} is below the observation weight {}",
                vol.max_weight, vol.weight
            )));
        }

        let icp = &self.icp;
        if icp.iterations.is_empty() || icp.iterations.len() > depth.pyramid_levels {
            return Err(FusionError::InvalidConfig(format!(
                "icp.iterations needs between 1 and {} levels, got {}",
                depth.pyramid_levels,
                icp.iterations.len()
            )));
        }
        if !(icp.angle_threshold_deg.is_finite()
            && icp.angle_threshold_deg > 0.0
            && icp.angle_threshold_deg <= 180.0)
        {
            return Err(FusionError::InvalidConfig(format!(
                "icp.angle_threshold_deg must be in (0, 180], got {}",
                icp.angle_threshold_deg
            )));
        }
        positive("icp.distance_threshold", icp.distance_threshold)?;

        Ok(())
    }

    /// The sensor resolution.
    pub fn image_size(&self) -> ImageSize {
        ImageSize {
            width: self.camera.width,
            height: self.camera.height,
        }
    }

    /// The level 0 camera.
    pub fn pinhole_camera(&self) -> Result<PinholeCamera, FusionError> {
        let cam = &self.camera;
        Ok(PinholeCamera::new(
            cam.fx,
            cam.fy,
            cam.cx,
            cam.cy,
            self.image_size(),
        )?)
    }

    /// The number of voxels per axis.
    pub fn volume_size(&self) -> VolumeSize {
        VolumeSize::from(self.volume.size)
    }

    /// The voxel spacing as a vector.
    pub fn voxel_size(&self) -> Vec3 {
        Vec3::from_array(self.volume.voxel_size)
    }

    /// The volume origin as a vector.
    pub fn origin(&self) -> Vec3 {
        Vec3::from_array(self.volume.origin)
    }

    /// The running average weights.
    pub fn integration_params(&self) -> IntegrationParams {
        IntegrationParams {
            weight: self.volume.weight,
            max_weight: self.volume.max_weight,
        }
    }

    /// The tracker parameters.
    pub fn icp_params(&self) -> IcpParams {
        IcpParams {
            levels: self
                .icp
                .iterations
                .iter()
                .map(|&iterations| IcpLevelParams { iterations })
                .collect(),
            angle_threshold_deg: self.icp.angle_threshold_deg,
            distance_threshold: self.icp.distance_threshold,
            min_correspondences: self.icp.min_correspondences,
        }
    }
}
