use kinfu_image::{Image, Pyramid};

use crate::{depth::is_valid_depth, error::DepthError, parallel};

/// Halve a depth image by averaging the valid pixels of each 2×2 block.
///
/// Invalid pixels are excluded from the mean; a block without any valid pixel
/// produces NaN. Odd trailing rows and columns of `src` are dropped.
///
/// # Arguments
///
/// * `src` - The source depth image in metres.
/// * `dst` - The destination image of size `(src.width() / 2, src.height() / 2)`.
pub fn pyrdown_depth(src: &Image<f32>, dst: &mut Image<f32>) -> Result<(), DepthError> {
    let expected = src.size().downscaled(1);
    if dst.size() != expected {
        return Err(DepthError::SizeMismatch(expected, dst.size()));
    }

    let src_cols = src.width();
    let src_data = src.as_slice();

    parallel::par_fill_with(dst, |x, y| {
        let top = 2 * y * src_cols + 2 * x;
        let bottom = top + src_cols;
        let block = [
            src_data[top],
            src_data[top + 1],
            src_data[bottom],
            src_data[bottom + 1],
        ];

        let (sum, count) = block
            .iter()
            .filter(|d| is_valid_depth(**d))
            .fold((0.0f32, 0u32), |(sum, count), d| (sum + d, count + 1));

        if count == 0 {
            f32::NAN
        } else {
            sum / count as f32
        }
    });

    Ok(())
}

/// Build a depth pyramid of `levels` levels.
///
/// Level 0 is a copy of `depth`; each following level is produced by
/// [`pyrdown_depth`] from the previous one.
///
/// # Errors
///
/// Returns an error if `levels` is zero or if the coarsest level would be empty.
///
/// # Example
///
/// ```
/// use kinfu_image::Image;
/// use kinfu_imgproc::pyramid::build_depth_pyramid;
///
/// let depth = Image::<f32>::from_size_val([8, 4].into(), 1.0).unwrap();
/// let pyramid = build_depth_pyramid(&depth, 3).unwrap();
///
/// assert_eq!(pyramid.num_levels(), 3);
/// assert_eq!(pyramid.level(2).unwrap().width(), 2);
/// ```
pub fn build_depth_pyramid(depth: &Image<f32>, levels: usize) -> Result<Pyramid<f32>, DepthError> {
    if levels == 0 {
        return Err(DepthError::ZeroLevels);
    }

    let coarsest = depth.size().downscaled(levels - 1);
    if coarsest.num_pixels() == 0 {
        return Err(DepthError::LevelTooSmall(levels - 1, depth.size()));
    }

    let mut images = Vec::with_capacity(levels);
    images.push(depth.clone());

    for level in 1..levels {
        let prev = &images[level - 1];
        let mut next = Image::from_size_val(prev.size().downscaled(1), f32::NAN)?;
        pyrdown_depth(prev, &mut next)?;
        images.push(next);
    }

    log::trace!(
        "built depth pyramid with {} levels from {}",
        levels,
        depth.size()
    );

    Ok(Pyramid::new(images)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pyramid_constant_depth() -> Result<(), DepthError> {
        let depth = Image::<f32>::from_size_val([64, 48].into(), 1.25)?;
        let pyramid = build_depth_pyramid(&depth, 3)?;
        assert_eq!(pyramid.num_levels(), 3);
        for (k, level) in pyramid.iter().enumerate() {
            assert_eq!(level.width(), 64 >> k);
            assert_eq!(level.height(), 48 >> k);
            assert!(level.as_slice().iter().all(|&d| d == 1.25));
        }
        Ok(())
    }

    #[test]
    fn test_pyrdown_ignores_invalid_pixel() -> Result<(), DepthError> {
        #[rustfmt::skip]
        let depth = Image::<f32>::new(
            [4, 2].into(),
            vec![
                1.0, f32::NAN, 2.0, 2.0,
                2.0, 3.0,      2.0, 2.0,
            ],
        )?;
        let mut dst = Image::<f32>::from_size_val([2, 1].into(), 0.0)?;
        pyrdown_depth(&depth, &mut dst)?;
        assert_relative_eq!(dst.as_slice()[0], 2.0);
        assert_relative_eq!(dst.as_slice()[1], 2.0);
        Ok(())
    }

    #[test]
    fn test_pyrdown_all_invalid_block() -> Result<(), DepthError> {
        #[rustfmt::skip]
        let depth = Image::<f32>::new(
            [4, 2].into(),
            vec![
                f32::NAN, 0.0,      1.0, 1.0,
                -1.0,     f32::NAN, 1.0, 1.0,
            ],
        )?;
        let mut dst = Image::<f32>::from_size_val([2, 1].into(), 0.0)?;
        pyrdown_depth(&depth, &mut dst)?;
        assert!(dst.as_slice()[0].is_nan());
        assert_eq!(dst.as_slice()[1], 1.0);
        Ok(())
    }

    #[test]
    fn test_pyrdown_odd_size() -> Result<(), DepthError> {
        let depth = Image::<f32>::from_fn([5, 3].into(), |x, _| x as f32 + 1.0);
        let pyramid = build_depth_pyramid(&depth, 2)?;
        let level = pyramid.level(1).ok_or(DepthError::ZeroLevels)?;
        assert_eq!(level.as_slice(), &[1.5, 3.5]);
        Ok(())
    }

    #[test]
    fn test_pyramid_errors() -> Result<(), DepthError> {
        let depth = Image::<f32>::from_size_val([4, 4].into(), 1.0)?;
        assert_eq!(
            build_depth_pyramid(&depth, 0).err(),
            Some(DepthError::ZeroLevels)
        );
        assert!(matches!(
            build_depth_pyramid(&depth, 4),
            Err(DepthError::LevelTooSmall(3, _))
        ));
        let mut wrong = Image::<f32>::from_size_val([3, 2].into(), 0.0)?;
        assert!(pyrdown_depth(&depth, &mut wrong).is_err());
        Ok(())
    }
}
