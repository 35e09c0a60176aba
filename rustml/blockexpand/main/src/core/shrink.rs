use crate::core::geometry::Geometry;
use crate::core::runtime::expand_par_threshold;
use rayon::prelude::*;

/// Adds block-row gradients back onto the feature-map gradient.
///
/// Exact transpose of [`expand`](crate::core::expand::expand): every entry of
/// `grad_rows` is added to the image cell it was read from. Cells covered by
/// several overlapping blocks receive the sum of their contributions; entries
/// that came from padding have no destination and are dropped. `grad_map` is
/// accumulated into, never overwritten.
pub fn accumulate(grad_rows: &[f32], batch: usize, geo: &Geometry, grad_map: &mut [f32]) {
    if batch.saturating_mul(geo.expanded_len()) >= expand_par_threshold() {
        accumulate_parallel(grad_rows, batch, geo, grad_map);
    } else {
        accumulate_sequential(grad_rows, batch, geo, grad_map);
    }
}

pub(crate) fn accumulate_sequential(
    grad_rows: &[f32],
    batch: usize,
    geo: &Geometry,
    grad_map: &mut [f32],
) {
    debug_assert_eq!(grad_rows.len(), batch * geo.expanded_len());
    debug_assert_eq!(grad_map.len(), batch * geo.image_len());
    for (image, rows) in grad_map
        .chunks_mut(geo.image_len())
        .zip(grad_rows.chunks(geo.expanded_len()))
    {
        shrink_example(rows, geo, image);
    }
}

/// Examples never share destination cells, so one worker per example needs no
/// synchronisation.
pub(crate) fn accumulate_parallel(
    grad_rows: &[f32],
    batch: usize,
    geo: &Geometry,
    grad_map: &mut [f32],
) {
    debug_assert_eq!(grad_rows.len(), batch * geo.expanded_len());
    debug_assert_eq!(grad_map.len(), batch * geo.image_len());
    grad_map
        .par_chunks_mut(geo.image_len())
        .zip(grad_rows.par_chunks(geo.expanded_len()))
        .for_each(|(image, rows)| shrink_example(rows, geo, image));
}

fn shrink_example(rows: &[f32], geo: &Geometry, image: &mut [f32]) {
    let plane = geo.img_h * geo.img_w;
    let block_area = geo.block_h * geo.block_w;
    let block_size = geo.block_size();

    for oy in 0..geo.output_h {
        for ox in 0..geo.output_w {
            let row_start = (oy * geo.output_w + ox) * block_size;
            let row = &rows[row_start..row_start + block_size];

            for c in 0..geo.channels {
                let dst = &mut image[c * plane..(c + 1) * plane];
                for kh in 0..geo.block_h {
                    let Some(y) = geo.source_row(oy, kh) else {
                        continue;
                    };
                    let src = c * block_area + kh * geo.block_w;
                    for kw in 0..geo.block_w {
                        if let Some(x) = geo.source_col(ox, kw) {
                            dst[y * geo.img_w + x] += row[src + kw];
                        }
                    }
                }
            }
        }
    }
}
