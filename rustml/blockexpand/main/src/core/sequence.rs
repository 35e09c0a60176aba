use crate::api::error::{BlockExpandError, BlockExpandResult};
use crate::api::types::SequenceBoundaries;
use crate::core::geometry::Geometry;

/// Sequence boundaries for `batch` examples of `geo.block_num()` rows each.
pub fn annotate(batch: usize, geo: &Geometry) -> SequenceBoundaries {
    let block_num = geo.block_num();
    let starts = (0..=batch).map(|i| i * block_num).collect();
    let dims = vec![(geo.output_h, geo.output_w); batch];
    SequenceBoundaries::new(starts, dims)
}

/// Checks that `boundaries` describe `batch` sequences laid out by `geo`:
/// `batch + 1` starts from row 0 in steps of `block_num`, and one
/// `(output_h, output_w)` grid per sequence.
pub fn check(boundaries: &SequenceBoundaries, batch: usize, geo: &Geometry) -> BlockExpandResult<()> {
    let starts = boundaries.starts();
    if batch.checked_add(1) != Some(starts.len()) {
        return Err(BlockExpandError::ShapeMismatch(format!(
            "boundaries hold {} start offsets, batch of {} needs {}",
            starts.len(),
            batch,
            batch.saturating_add(1)
        )));
    }
    if starts[0] != 0 {
        return Err(BlockExpandError::ShapeMismatch(format!(
            "first sequence starts at row {}, expected 0",
            starts[0]
        )));
    }
    let block_num = geo.block_num();
    for (i, pair) in starts.windows(2).enumerate() {
        if pair[1].checked_sub(pair[0]) != Some(block_num) {
            return Err(BlockExpandError::ShapeMismatch(format!(
                "sequence {} spans rows {}..{}, expected {} blocks",
                i, pair[0], pair[1], block_num
            )));
        }
    }
    let dims = boundaries.dims();
    if dims.len() != batch {
        return Err(BlockExpandError::ShapeMismatch(format!(
            "boundaries hold {} grid dims, batch has {}",
            dims.len(),
            batch
        )));
    }
    let grid = (geo.output_h, geo.output_w);
    if let Some((i, &d)) = dims.iter().enumerate().find(|&(_, &d)| d != grid) {
        return Err(BlockExpandError::ShapeMismatch(format!(
            "sequence {} is a {}x{} grid, expected {}x{}",
            i, d.0, d.1, grid.0, grid.1
        )));
    }
    Ok(())
}
