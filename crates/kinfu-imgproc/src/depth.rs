use num_traits::AsPrimitive;

use kinfu_image::Image;

use crate::{error::DepthError, parallel};

/// Whether a depth value in metres is usable.
///
/// Invalid depth is encoded as NaN; zero and negative values are also
/// rejected so that sensor "no return" pixels never reach the pipeline.
#[inline]
pub fn is_valid_depth(d: f32) -> bool {
    d.is_finite() && d > 0.0
}

/// Convert a sensor-native depth image to metres.
///
/// Each pixel is multiplied by `scale`. Pixels whose metric depth is zero, not
/// finite or outside `[min_depth, max_depth]` are written as NaN.
///
/// # Arguments
///
/// * `src` - The raw depth image, e.g. millimetres stored as `u16`.
/// * `dst` - The destination depth image in metres, same size as `src`.
/// * `scale` - Metres per raw unit.
/// * `min_depth` - The minimum valid depth in metres.
/// * `max_depth` - The maximum valid depth in metres.
///
/// # Example
///
/// ```
/// use kinfu_image::Image;
/// use kinfu_imgproc::depth::depth_from_raw;
///
/// let raw = Image::<u16>::new([3, 1].into(), vec![0, 1000, 9000]).unwrap();
/// let mut depth = Image::<f32>::from_size_val(raw.size(), 0.0).unwrap();
///
/// depth_from_raw(&raw, &mut depth, 1e-3, 0.3, 4.0).unwrap();
///
/// assert!(depth.as_slice()[0].is_nan());
/// assert_eq!(depth.as_slice()[1], 1.0);
/// assert!(depth.as_slice()[2].is_nan());
/// ```
pub fn depth_from_raw<T>(
    src: &Image<T>,
    dst: &mut Image<f32>,
    scale: f32,
    min_depth: f32,
    max_depth: f32,
) -> Result<(), DepthError>
where
    T: AsPrimitive<f32> + Send + Sync,
{
    if !(scale.is_finite() && scale > 0.0) {
        return Err(DepthError::InvalidScale(scale));
    }

    if !(min_depth.is_finite() && max_depth.is_finite() && min_depth >= 0.0)
        || min_depth > max_depth
    {
        return Err(DepthError::InvalidRange(min_depth, max_depth));
    }

    if src.size() != dst.size() {
        return Err(DepthError::SizeMismatch(src.size(), dst.size()));
    }

    parallel::par_iter_rows_val(src, dst, |raw, d| {
        let z = (*raw).as_() * scale;
        *d = if is_valid_depth(z) && z >= min_depth && z <= max_depth {
            z
        } else {
            f32::NAN
        };
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinfu_image::ImageSize;

    #[test]
    fn test_is_valid_depth() {
        assert!(is_valid_depth(0.5));
        assert!(!is_valid_depth(0.0));
        assert!(!is_valid_depth(-1.0));
        assert!(!is_valid_depth(f32::NAN));
        assert!(!is_valid_depth(f32::INFINITY));
    }

    #[test]
    fn test_depth_from_raw_range() -> Result<(), DepthError> {
        let raw = Image::<u16>::new([4, 1].into(), vec![0, 299, 300, 4001])?;
        let mut depth = Image::<f32>::from_size_val(raw.size(), 0.0)?;
        depth_from_raw(&raw, &mut depth, 1e-3, 0.3, 4.0)?;
        let d = depth.as_slice();
        assert!(d[0].is_nan());
        assert!(d[1].is_nan());
        assert!((d[2] - 0.3).abs() < 1e-6);
        assert!(d[3].is_nan());
        Ok(())
    }

    #[test]
    fn test_depth_from_raw_float_input() -> Result<(), DepthError> {
        let raw = Image::<f32>::new([3, 1].into(), vec![1.5, f32::NAN, f32::INFINITY])?;
        let mut depth = Image::<f32>::from_size_val(raw.size(), 0.0)?;
        depth_from_raw(&raw, &mut depth, 1.0, 0.1, 10.0)?;
        assert_eq!(depth.as_slice()[0], 1.5);
        assert!(depth.as_slice()[1].is_nan());
        assert!(depth.as_slice()[2].is_nan());
        Ok(())
    }

    #[test]
    fn test_depth_from_raw_errors() -> Result<(), DepthError> {
        let raw = Image::<u16>::from_size_val([2, 2].into(), 1)?;
        let mut depth = Image::<f32>::from_size_val(raw.size(), 0.0)?;
        assert_eq!(
            depth_from_raw(&raw, &mut depth, 0.0, 0.1, 1.0),
            Err(DepthError::InvalidScale(0.0))
        );
        assert_eq!(
            depth_from_raw(&raw, &mut depth, 1.0, 2.0, 1.0),
            Err(DepthError::InvalidRange(2.0, 1.0))
        );
        let mut wrong = Image::<f32>::from_size_val([3, 2].into(), 0.0)?;
        assert_eq!(
            depth_from_raw(&raw, &mut wrong, 1.0, 0.1, 1.0),
            Err(DepthError::SizeMismatch(
                ImageSize { width: 2, height: 2 },
                ImageSize { width: 3, height: 2 }
            ))
        );
        Ok(())
    }
}
