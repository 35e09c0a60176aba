use crate::api::error::{BlockExpandError, BlockExpandResult};
use crate::core::geometry::Geometry;
use crate::core::runtime::expand_par_threshold;
use rayon::prelude::*;

/// Expands a batch of feature maps into block rows.
///
/// `input` holds `batch` examples of `[channels, img_h, img_w]`. The result
/// holds `batch * block_num` rows of `block_size` values. Rows run over
/// examples, then `oy`, then `ox`. Within a row the layout is channel-major:
/// `c * block_h * block_w + kh * block_w + kw` (the im2col column matrix,
/// transposed). Window cells outside the image read as zero.
pub fn expand(input: &[f32], batch: usize, geo: &Geometry) -> BlockExpandResult<Vec<f32>> {
    let total = batch.checked_mul(geo.expanded_len()).ok_or_else(|| {
        BlockExpandError::ShapeMismatch(format!(
            "{} examples of {} expanded values overflow",
            batch,
            geo.expanded_len()
        ))
    })?;
    if batch.checked_mul(geo.image_len()) != Some(input.len()) {
        return Err(BlockExpandError::ShapeMismatch(format!(
            "{} input values do not hold {} examples of {}",
            input.len(),
            batch,
            geo.image_len()
        )));
    }
    if total >= expand_par_threshold() {
        Ok(expand_parallel(input, batch, geo))
    } else {
        Ok(expand_sequential(input, batch, geo))
    }
}

pub(crate) fn expand_sequential(input: &[f32], batch: usize, geo: &Geometry) -> Vec<f32> {
    debug_assert_eq!(input.len(), batch * geo.image_len());
    let mut output = vec![0.0f32; batch * geo.expanded_len()];
    for (rows, image) in output
        .chunks_mut(geo.expanded_len())
        .zip(input.chunks(geo.image_len()))
    {
        expand_example(image, geo, rows);
    }
    output
}

/// One worker per example; every example writes a disjoint slice of rows.
pub(crate) fn expand_parallel(input: &[f32], batch: usize, geo: &Geometry) -> Vec<f32> {
    debug_assert_eq!(input.len(), batch * geo.image_len());
    let mut output = vec![0.0f32; batch * geo.expanded_len()];
    output
        .par_chunks_mut(geo.expanded_len())
        .zip(input.par_chunks(geo.image_len()))
        .for_each(|(rows, image)| expand_example(image, geo, rows));
    output
}

/// `rows` must be zeroed; padding cells are left untouched.
fn expand_example(image: &[f32], geo: &Geometry, rows: &mut [f32]) {
    let plane = geo.img_h * geo.img_w;
    let block_area = geo.block_h * geo.block_w;
    let block_size = geo.block_size();

    for oy in 0..geo.output_h {
        for ox in 0..geo.output_w {
            let row_start = (oy * geo.output_w + ox) * block_size;
            let row = &mut rows[row_start..row_start + block_size];

            for c in 0..geo.channels {
                let src = &image[c * plane..(c + 1) * plane];
                for kh in 0..geo.block_h {
                    let Some(y) = geo.source_row(oy, kh) else {
                        continue;
                    };
                    let dst = c * block_area + kh * geo.block_w;
                    for kw in 0..geo.block_w {
                        if let Some(x) = geo.source_col(ox, kw) {
                            row[dst + kw] = src[y * geo.img_w + x];
                        }
                    }
                }
            }
        }
    }
}
