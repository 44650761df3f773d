use glam::Vec3;

use kinfu_image::{Image, Volume, VolumeSize};

use crate::error::TsdfError;

/// Signed distance stored in unobserved voxels: "behind or unknown".
pub const INITIAL_SDF: f32 = -1.01;

/// A voxel of the TSDF volume.
///
/// `sdf` is the signed distance to the surface normalized by the truncation
/// distance, positive in front of the surface. It is only meaningful when
/// `weight > 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voxel {
    /// Normalized signed distance in `[-1, 1]`.
    pub sdf: f32,
    /// Accumulated observation weight.
    pub weight: f32,
}

impl Voxel {
    /// A voxel that was never observed.
    pub const EMPTY: Self = Self {
        sdf: INITIAL_SDF,
        weight: 0.0,
    };

    /// Whether the voxel received at least one observation.
    #[inline]
    pub fn is_observed(&self) -> bool {
        self.weight > 0.0
    }
}

impl Default for Voxel {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// A dense truncated signed distance volume over a fixed box in world space.
///
/// Voxel `(x, y, z)` has its center at `origin + voxel_size * (x, y, z)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TsdfVolume {
    voxels: Volume<Voxel>,
    origin: Vec3,
    voxel_size: Vec3,
    truncation: f32,
}

impl TsdfVolume {
    /// Allocate a new volume with every voxel unobserved.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of voxels per axis, at least 2 each.
    /// * `origin` - World position of the center of voxel `(0, 0, 0)`.
    /// * `voxel_size` - Spacing between voxel centers along each axis.
    /// * `truncation` - Truncation distance `mu` in metres.
    ///
    /// # Errors
    ///
    /// Returns an error on invalid geometry or if the grid cannot be allocated.
    pub fn new(
        size: VolumeSize,
        origin: Vec3,
        voxel_size: Vec3,
        truncation: f32,
    ) -> Result<Self, TsdfError> {
        if size.width < 2 || size.height < 2 || size.depth < 2 {
            return Err(TsdfError::GridTooSmall(size.width, size.height, size.depth));
        }
        if !(voxel_size.is_finite() && voxel_size.min_element() > 0.0) {
            return Err(TsdfError::InvalidVoxelSize(
                voxel_size.x,
                voxel_size.y,
                voxel_size.z,
            ));
        }
        if !(truncation.is_finite() && truncation > 0.0) {
            return Err(TsdfError::InvalidTruncation(truncation));
        }

        let voxels = Volume::from_size_val(size, Voxel::EMPTY)?;

        log::info!(
            "allocated tsdf volume {} ({:.1} MiB), origin {:?}, voxel size {:?}",
            size,
            (size.num_cells() * std::mem::size_of::<Voxel>()) as f64 / (1024.0 * 1024.0),
            origin,
            voxel_size
        );

        Ok(Self {
            voxels,
            origin,
            voxel_size,
            truncation,
        })
    }

    /// Clear every voxel back to the unobserved state.
    pub fn reset(&mut self) {
        self.voxels.fill(Voxel::EMPTY);
        log::info!("tsdf volume reset");
    }

    /// Number of voxels per axis.
    #[inline]
    pub fn size(&self) -> VolumeSize {
        self.voxels.size()
    }

    /// World position of the center of voxel `(0, 0, 0)`.
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Spacing between voxel centers.
    #[inline]
    pub fn voxel_size(&self) -> Vec3 {
        self.voxel_size
    }

    /// Truncation distance `mu` in metres.
    #[inline]
    pub fn truncation(&self) -> f32 {
        self.truncation
    }

    /// The underlying voxel grid.
    #[inline]
    pub fn voxels(&self) -> &Volume<Voxel> {
        &self.voxels
    }

    #[inline]
    pub(crate) fn voxels_mut(&mut self) -> &mut Volume<Voxel> {
        &mut self.voxels
    }

    /// The voxel at `(x, y, z)`.
    #[inline]
    pub fn voxel(&self, x: usize, y: usize, z: usize) -> Option<&Voxel> {
        self.voxels.get(x, y, z)
    }

    /// World position of the center of voxel `(x, y, z)`.
    #[inline]
    pub fn voxel_center(&self, x: usize, y: usize, z: usize) -> Vec3 {
        self.origin + self.voxel_size * Vec3::new(x as f32, y as f32, z as f32)
    }

    /// World-space box spanned by the voxel centers, as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let size = self.size();
        let last = Vec3::new(
            (size.width - 1) as f32,
            (size.height - 1) as f32,
            (size.depth - 1) as f32,
        );
        (self.origin, self.origin + self.voxel_size * last)
    }

    /// Continuous grid coordinates of a world point.
    #[inline]
    pub fn world_to_grid(&self, p: Vec3) -> Vec3 {
        (p - self.origin) / self.voxel_size
    }

    /// Trilinearly interpolate the signed distance at a world point.
    ///
    /// Returns `None` outside the grid or when any of the 8 surrounding voxels
    /// is unobserved.
    pub fn interpolate(&self, p: Vec3) -> Option<f32> {
        let size = self.size();
        let g = self.world_to_grid(p);

        let max = Vec3::new(
            (size.width - 1) as f32,
            (size.height - 1) as f32,
            (size.depth - 1) as f32,
        );
        if !(g.cmpge(Vec3::ZERO).all() && g.cmple(max).all()) {
            return None;
        }

        let x0 = (g.x as usize).min(size.width - 2);
        let y0 = (g.y as usize).min(size.height - 2);
        let z0 = (g.z as usize).min(size.depth - 2);
        let f = g - Vec3::new(x0 as f32, y0 as f32, z0 as f32);

        let data = self.voxels.as_slice();
        let mut sdf = 0.0;
        for (dz, wz) in [(0, 1.0 - f.z), (1, f.z)] {
            for (dy, wy) in [(0, 1.0 - f.y), (1, f.y)] {
                for (dx, wx) in [(0, 1.0 - f.x), (1, f.x)] {
                    let voxel = data[size.index(x0 + dx, y0 + dy, z0 + dz)];
                    if !voxel.is_observed() {
                        return None;
                    }
                    sdf += wx * wy * wz * voxel.sdf;
                }
            }
        }

        Some(sdf)
    }

    /// The signed distances of z-plane `k` as an image.
    ///
    /// `k` is clamped to the last plane.
    pub fn slice_z(&self, k: usize) -> Result<Image<f32>, TsdfError> {
        self.map_slice_z(k, |v| v.sdf)
    }

    /// The weights of z-plane `k` as an image.
    ///
    /// `k` is clamped to the last plane.
    pub fn weight_slice_z(&self, k: usize) -> Result<Image<f32>, TsdfError> {
        self.map_slice_z(k, |v| v.weight)
    }

    fn map_slice_z(&self, k: usize, f: impl Fn(&Voxel) -> f32) -> Result<Image<f32>, TsdfError> {
        let size = self.size();
        let k = k.min(size.depth - 1);
        let plane = self.voxels.plane(k).unwrap_or_default();
        let data = plane.iter().map(f).collect();
        Ok(Image::new([size.width, size.height].into(), data)?)
    }

    /// Number of voxels with a positive weight.
    pub fn observed_voxels(&self) -> usize {
        self.voxels
            .as_slice()
            .iter()
            .filter(|v| v.is_observed())
            .count()
    }
}
