//! Sequence-annotated outputs of the block expansion

use crate::api::tensor::Tensor;
use std::ops::Range;

/// Row offsets delimiting each example's block sequence.
///
/// `starts` has one entry per example plus a terminal sentinel equal to the
/// total number of rows. `dims` holds the `(output_h, output_w)` grid each
/// sequence was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceBoundaries {
    starts: Vec<usize>,
    dims: Vec<(usize, usize)>,
}

impl SequenceBoundaries {
    pub fn new(starts: Vec<usize>, dims: Vec<(usize, usize)>) -> Self {
        Self { starts, dims }
    }

    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    pub fn dims(&self) -> &[(usize, usize)] {
        &self.dims
    }

    /// Number of sequences (examples) delimited.
    pub fn num_sequences(&self) -> usize {
        self.starts.len().saturating_sub(1)
    }

    pub fn total_rows(&self) -> usize {
        self.starts.last().copied().unwrap_or(0)
    }

    /// Row range of sequence `i`, or `None` past the end.
    pub fn range(&self, i: usize) -> Option<Range<usize>> {
        let start = *self.starts.get(i)?;
        let end = *self.starts.get(i + 1)?;
        Some(start..end)
    }
}

/// A matrix of rows grouped into per-example sequences.
///
/// Forward returns the expanded blocks in this form; backward takes the
/// downstream gradient in the same form.
#[derive(Debug, Clone)]
pub struct SequenceBatch {
    pub value: Tensor,
    pub boundaries: SequenceBoundaries,
}

impl SequenceBatch {
    pub fn new(value: Tensor, boundaries: SequenceBoundaries) -> Self {
        Self { value, boundaries }
    }

    pub fn num_sequences(&self) -> usize {
        self.boundaries.num_sequences()
    }
}
