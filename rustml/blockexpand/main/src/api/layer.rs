use crate::api::error::BlockExpandResult;
use crate::api::tensor::Tensor;
use crate::api::types::SequenceBatch;

/// Receives each parameter after its gradient has been computed.
pub type UpdateCallback<'a> = &'a mut dyn FnMut(&mut Tensor);

pub trait Layer {
    fn name(&self) -> &str;

    /// Maps an input feature map to a sequence batch.
    fn forward(&mut self, input: &Tensor) -> BlockExpandResult<SequenceBatch>;

    /// Adds the input gradient for `output_grad` into `input_grad`, which has
    /// the input's shape. Layers with parameters hand them to `callback`.
    fn backward(
        &mut self,
        output_grad: &SequenceBatch,
        input_grad: &mut Tensor,
        callback: Option<UpdateCallback<'_>>,
    ) -> BlockExpandResult<()>;

    fn parameters(&self) -> Vec<&Tensor>;
    fn parameters_mut(&mut self) -> Vec<&mut Tensor>;

    fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }
}
