use kinfu_3d::TsdfError;
use kinfu_icp::IcpError;
use kinfu_image::ImageError;
use kinfu_imgproc::DepthError;

/// An error type for the fusion pipeline.
#[derive(thiserror::Error, Debug)]
pub enum FusionError {
    /// Error when a frame does not fit the configured sensor.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error when the configuration describes a non-physical setup.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error from the image containers.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error from the depth processing.
    #[error(transparent)]
    Depth(#[from] DepthError),

    /// Error from the volume or the camera model.
    #[error(transparent)]
    Tsdf(#[from] TsdfError),

    /// Error from the tracker.
    #[error(transparent)]
    Icp(#[from] IcpError),

    /// Error when reading a configuration file.
    #[error("Failed to read the configuration file")]
    Io(#[from] std::io::Error),

    /// Error when parsing a configuration file.
    #[error("Failed to parse the configuration file")]
    Json(#[from] serde_json::Error),
}
