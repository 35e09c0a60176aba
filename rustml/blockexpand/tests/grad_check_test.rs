use rustml_blockexpand::api::tape::{BackwardOp, TapeEntry};
use rustml_blockexpand::*;

const EPS: f32 = 1e-2;
const REL_TOL: f64 = 1e-3;

fn numerical_gradient<F>(f: F, input: &Tensor, eps: f32) -> Vec<f64>
where
    F: Fn(&Tensor) -> f64,
{
    let data = input.to_vec();
    let mut grads = vec![0.0f64; data.len()];

    for i in 0..data.len() {
        let mut plus_data = data.clone();
        plus_data[i] += eps;
        let f_plus = f(&Tensor::from_vec(plus_data, input.shape().to_vec()).unwrap());

        let mut minus_data = data.clone();
        minus_data[i] -= eps;
        let f_minus = f(&Tensor::from_vec(minus_data, input.shape().to_vec()).unwrap());

        grads[i] = (f_plus - f_minus) / (2.0 * eps as f64);
    }

    grads
}

fn check_gradient(analytical: &[f32], numerical: &[f64], name: &str) {
    assert_eq!(analytical.len(), numerical.len(), "{name}: gradient length mismatch");
    for (i, (&a, &n)) in analytical.iter().zip(numerical.iter()).enumerate() {
        let a = a as f64;
        let denom = a.abs().max(n.abs()).max(1e-8);
        let rel_err = (a - n).abs() / denom;
        assert!(
            rel_err < REL_TOL,
            "{name}[{i}]: analytical={a}, numerical={n}, rel_err={rel_err}"
        );
    }
}

/// Gradient of `sum(x * weights)` with respect to `x` is `weights`.
struct WeightedSumBackward {
    weights: Tensor,
}

impl BackwardOp for WeightedSumBackward {
    fn backward(&self, _grad_output: &Tensor, _saved: &[Tensor]) -> BlockExpandResult<Vec<Tensor>> {
        Ok(vec![self.weights.clone()])
    }

    fn name(&self) -> &str {
        "WeightedSumBackward"
    }
}

fn weighted_sum(values: &Tensor, weights: &Tensor) -> f64 {
    values
        .data()
        .iter()
        .zip(weights.data())
        .map(|(&v, &w)| v as f64 * w as f64)
        .sum()
}

#[test]
fn test_block_expand_gradient() {
    tape::clear_tape();

    let config = BlockExpandConfig::new(2, 2, 2).with_padding(1, 1);
    let mut layer = BlockExpand::new(config.clone()).unwrap();

    let mut input = Tensor::from_vec(
        (0..18).map(|v| (v % 5) as f32 * 0.1 + 0.05).collect(),
        vec![1, 2, 3, 3],
    )
    .unwrap();
    input.set_requires_grad(true);

    let out = layer.forward(&input).unwrap();
    // 4x4 grid of 2-channel 2x2 blocks
    assert_eq!(out.value.shape(), &[16, 8]);

    let n = out.value.numel();
    let weights = Tensor::from_vec(
        (0..n).map(|i| 0.1 + (i % 9) as f32 * 0.1).collect(),
        out.value.shape().to_vec(),
    )
    .unwrap();

    let loss_val = weighted_sum(&out.value, &weights) as f32;
    let loss = Tensor::from_vec(vec![loss_val], vec![1]).unwrap();
    tape::record_op(TapeEntry {
        backward_op: Box::new(WeightedSumBackward { weights: weights.clone() }),
        output_id: loss.id(),
        input_ids: vec![out.value.id()],
        saved_tensors: vec![],
    });

    tape::backward(&loss).unwrap();
    let grad = tape::grad(&input).expect("grad_input");
    assert_eq!(grad.shape(), input.shape());

    let num_grad = numerical_gradient(
        |x| {
            let mut fresh = BlockExpand::new(config.clone()).unwrap();
            let out = tape::no_grad(|| fresh.forward(x).unwrap());
            weighted_sum(&out.value, &weights)
        },
        &input,
        EPS,
    );
    check_gradient(&grad.to_vec(), &num_grad, "block_expand_grad_input");
}

#[test]
fn test_tape_seed_gives_coverage_counts() {
    tape::clear_tape();

    let mut layer = BlockExpand::new(BlockExpandConfig::new(1, 2, 2)).unwrap();
    let input = Tensor::zeros([1, 1, 4, 4]);
    let out = layer.forward(&input).unwrap();

    tape::backward(&out.value).unwrap();
    let grad = tape::grad(&input).expect("grad_input");
    assert_eq!(
        grad.to_vec(),
        vec![
            1.0, 2.0, 2.0, 1.0, //
            2.0, 4.0, 4.0, 2.0, //
            2.0, 4.0, 4.0, 2.0, //
            1.0, 2.0, 2.0, 1.0,
        ]
    );
}

#[test]
fn test_no_grad_records_nothing() {
    tape::clear_tape();

    let mut layer = BlockExpand::new(BlockExpandConfig::new(1, 2, 2)).unwrap();
    let input = Tensor::ones([1, 1, 3, 3]);
    let out = tape::no_grad(|| layer.forward(&input).unwrap());
    assert!(tape::is_recording());

    tape::backward(&out.value).unwrap();
    assert!(tape::grad(&input).is_none());
}
