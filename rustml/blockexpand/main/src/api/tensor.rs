use crate::api::error::{BlockExpandError, BlockExpandResult};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TensorId(pub(crate) u64);

impl TensorId {
    fn next() -> Self {
        TensorId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for TensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TensorId({})", self.0)
    }
}

/// Dense row-major f32 tensor with a tape identity.
///
/// Feature maps are `[batch, channels, height, width]` (or the flat
/// `[batch, channels * height * width]`), expanded matrices are
/// `[rows, channels * block_h * block_w]`.
#[derive(Debug, Clone)]
pub struct Tensor {
    pub(crate) id: TensorId,
    pub(crate) data: Vec<f32>,
    pub(crate) shape: Vec<usize>,
    pub(crate) requires_grad: bool,
}

impl Tensor {
    // --- Constructors ---

    fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        Self {
            id: TensorId::next(),
            data,
            shape,
            requires_grad: false,
        }
    }

    pub fn zeros(shape: impl Into<Vec<usize>>) -> Self {
        Self::full(shape, 0.0)
    }

    pub fn ones(shape: impl Into<Vec<usize>>) -> Self {
        Self::full(shape, 1.0)
    }

    pub fn full(shape: impl Into<Vec<usize>>, value: f32) -> Self {
        let shape = shape.into();
        let numel = shape.iter().product();
        Self::new(vec![value; numel], shape)
    }

    pub fn from_vec(data: Vec<f32>, shape: impl Into<Vec<usize>>) -> BlockExpandResult<Self> {
        let shape = shape.into();
        let numel: usize = shape.iter().product();
        if data.len() != numel {
            return Err(BlockExpandError::ShapeMismatch(format!(
                "{} values cannot fill shape {:?} ({} elements)",
                data.len(),
                shape,
                numel
            )));
        }
        Ok(Self::new(data, shape))
    }

    // --- Accessors ---

    pub fn id(&self) -> TensorId {
        self.id
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub fn set_requires_grad(&mut self, requires_grad: bool) {
        self.requires_grad = requires_grad;
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.data.clone()
    }

    // --- Raw ops (no tape recording) ---

    pub fn add_raw(&self, other: &Tensor) -> BlockExpandResult<Tensor> {
        if self.shape != other.shape {
            return Err(BlockExpandError::ShapeMismatch(format!(
                "add: {:?} vs {:?}",
                self.shape, other.shape
            )));
        }
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| a + b)
            .collect();
        Ok(Tensor::new(data, self.shape.clone()))
    }
}
