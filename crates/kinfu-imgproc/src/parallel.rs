use rayon::prelude::*;

use kinfu_image::Image;

/// Apply a function to each pixel of `src`, writing into the matching pixel of
/// `dst`. Rows are processed in parallel.
///
/// Both images must have the same size.
pub fn par_iter_rows_val<T1, T2>(
    src: &Image<T1>,
    dst: &mut Image<T2>,
    f: impl Fn(&T1, &mut T2) + Send + Sync,
) where
    T1: Send + Sync,
    T2: Send + Sync,
{
    let cols = src.width().max(1);
    src.as_slice()
        .par_chunks_exact(cols)
        .zip(dst.as_slice_mut().par_chunks_exact_mut(cols))
        .for_each(|(src_row, dst_row)| {
            src_row
                .iter()
                .zip(dst_row.iter_mut())
                .for_each(|(src_pixel, dst_pixel)| f(src_pixel, dst_pixel));
        });
}

/// Fill every pixel of `dst` in parallel with `f(x, y)`.
pub fn par_fill_with<T>(dst: &mut Image<T>, f: impl Fn(usize, usize) -> T + Send + Sync)
where
    T: Send + Sync,
{
    let cols = dst.width().max(1);
    dst.as_slice_mut()
        .par_chunks_exact_mut(cols)
        .enumerate()
        .for_each(|(y, row)| {
            row.iter_mut()
                .enumerate()
                .for_each(|(x, pixel)| *pixel = f(x, y));
        });
}

/// Compute one value per row in parallel and collect them in row order.
///
/// Used for reductions that must not depend on thread scheduling: the caller
/// combines the returned partials sequentially.
pub fn par_map_rows<T, R>(src: &Image<T>, f: impl Fn(usize, &[T]) -> R + Send + Sync) -> Vec<R>
where
    T: Send + Sync,
    R: Send,
{
    let cols = src.width().max(1);
    src.as_slice()
        .par_chunks_exact(cols)
        .enumerate()
        .map(|(y, row)| f(y, row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinfu_image::ImageError;

    #[test]
    fn test_par_iter_rows_val() -> Result<(), ImageError> {
        let src = Image::<u16>::new([3, 2].into(), vec![1, 2, 3, 4, 5, 6])?;
        let mut dst = Image::<f32>::from_size_val(src.size(), 0.0)?;
        par_iter_rows_val(&src, &mut dst, |s, d| *d = *s as f32 * 0.5);
        assert_eq!(dst.as_slice(), &[0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
        Ok(())
    }

    #[test]
    fn test_par_fill_with() -> Result<(), ImageError> {
        let mut dst = Image::<usize>::from_size_val([4, 3].into(), 0)?;
        par_fill_with(&mut dst, |x, y| x + 10 * y);
        assert_eq!(dst.get(3, 2), Some(&23));
        Ok(())
    }

    #[test]
    fn test_par_map_rows_keeps_order() {
        let src = Image::<u32>::from_fn([5, 64].into(), |x, y| (x + y) as u32);
        let sums = par_map_rows(&src, |y, row| (y, row.iter().sum::<u32>()));
        for (i, (y, sum)) in sums.iter().enumerate() {
            assert_eq!(i, *y);
            assert_eq!(*sum, (5 * i + 10) as u32);
        }
    }
}
