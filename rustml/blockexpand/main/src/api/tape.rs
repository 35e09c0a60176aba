use crate::api::error::{BlockExpandError, BlockExpandResult};
use crate::api::tensor::{Tensor, TensorId};
use std::cell::RefCell;
use std::collections::HashMap;

// --- BackwardOp trait ---

pub trait BackwardOp: Send + Sync {
    /// Compute gradients for inputs given the gradient of the output.
    /// Returns one gradient per input_id (in the same order as input_ids in TapeEntry).
    fn backward(&self, grad_output: &Tensor, saved: &[Tensor]) -> BlockExpandResult<Vec<Tensor>>;
    fn name(&self) -> &str;
}

// --- TapeEntry ---

pub struct TapeEntry {
    pub backward_op: Box<dyn BackwardOp>,
    pub output_id: TensorId,
    pub input_ids: Vec<TensorId>,
    pub saved_tensors: Vec<Tensor>,
}

// --- GradientTape ---

pub struct GradientTape {
    entries: Vec<TapeEntry>,
    grads: HashMap<TensorId, Tensor>,
    enabled: bool,
}

impl GradientTape {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            grads: HashMap::new(),
            enabled: true,
        }
    }

    pub fn record(&mut self, entry: TapeEntry) {
        if self.enabled {
            self.entries.push(entry);
        }
    }

    pub fn backward(&mut self, loss_id: TensorId, loss_shape: &[usize]) -> BlockExpandResult<()> {
        // Seed gradient: ones with the shape of the loss
        self.grads.insert(loss_id, Tensor::ones(loss_shape.to_vec()));

        // Replay in reverse
        for entry in self.entries.iter().rev() {
            let grad_output = match self.grads.get(&entry.output_id) {
                Some(g) => g.clone(),
                None => continue,
            };

            let input_grads = entry
                .backward_op
                .backward(&grad_output, &entry.saved_tensors)?;

            for (input_id, new_grad) in entry.input_ids.iter().zip(input_grads) {
                let accumulated = match self.grads.get(input_id) {
                    Some(existing) => existing.add_raw(&new_grad).map_err(|e| {
                        BlockExpandError::TapeError(format!(
                            "{}: cannot accumulate gradient for {}: {}",
                            entry.backward_op.name(),
                            input_id,
                            e
                        ))
                    })?,
                    None => new_grad,
                };
                self.grads.insert(*input_id, accumulated);
            }
        }
        Ok(())
    }

    pub fn grad(&self, id: TensorId) -> Option<&Tensor> {
        self.grads.get(&id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.grads.clear();
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

// --- Thread-local API ---

thread_local! {
    static TAPE: RefCell<GradientTape> = RefCell::new(GradientTape::new());
}

pub fn record_op(entry: TapeEntry) {
    TAPE.with(|tape| tape.borrow_mut().record(entry));
}

pub fn backward(loss: &Tensor) -> BlockExpandResult<()> {
    TAPE.with(|tape| tape.borrow_mut().backward(loss.id(), loss.shape()))
}

pub fn grad(tensor: &Tensor) -> Option<Tensor> {
    TAPE.with(|tape| tape.borrow().grad(tensor.id()).cloned())
}

pub fn no_grad<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let was_enabled = TAPE.with(|tape| {
        let mut t = tape.borrow_mut();
        let prev = t.is_enabled();
        t.disable();
        prev
    });
    let result = f();
    if was_enabled {
        TAPE.with(|tape| tape.borrow_mut().enable());
    }
    result
}

pub fn clear_tape() {
    TAPE.with(|tape| tape.borrow_mut().clear());
}

pub fn is_recording() -> bool {
    TAPE.with(|tape| tape.borrow().is_enabled())
}
