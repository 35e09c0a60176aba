use crate::api::config::{BlockExpandConfig, LayerConfig};
use crate::api::error::{BlockExpandError, BlockExpandResult};
use crate::api::layer::{Layer, UpdateCallback};
use crate::api::tape::{self, BackwardOp, TapeEntry};
use crate::api::tensor::Tensor;
use crate::api::types::SequenceBatch;
use crate::core::geometry::{self, Geometry};
use crate::core::{expand, sequence, shrink};
use std::time::Instant;

/// Expands a feature map into a sequence of flattened blocks.
///
/// Input is `[batch, channels, img_h, img_w]`, or `[batch, channels*img_h*img_w]`
/// when the config fixes the image size. Output is
/// `[batch * output_h * output_w, channels * block_h * block_w]` with one
/// sequence per example. Typically placed after convolutions and before a
/// recurrent stage.
///
/// The geometry is cached and recomputed only when the input's spatial size
/// changes. There are no parameters.
pub struct BlockExpand {
    config: BlockExpandConfig,
    geometry: Option<Geometry>,
}

impl BlockExpand {
    pub fn new(config: BlockExpandConfig) -> BlockExpandResult<Self> {
        geometry::validate(&config)?;
        let geometry = match config.img_size() {
            Some((h, w)) => Some(Geometry::new(&config, h, w)?),
            None => None,
        };
        Ok(Self { config, geometry })
    }

    pub fn config(&self) -> &BlockExpandConfig {
        &self.config
    }

    /// Geometry of the most recent input size, if any.
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Returns `(batch, img_h, img_w)` for a feature map or its gradient.
    fn resolve_input(&self, input: &Tensor) -> BlockExpandResult<(usize, usize, usize)> {
        match *input.shape() {
            [batch, channels, h, w] => {
                if channels != self.config.channels {
                    return Err(BlockExpandError::ShapeMismatch(format!(
                        "expected {} channels, got input {:?}",
                        self.config.channels,
                        input.shape()
                    )));
                }
                Ok((batch, h, w))
            }
            [batch, width] => {
                let (h, w) = self.config.img_size().ok_or_else(|| {
                    BlockExpandError::InvalidConfig(
                        "flat input requires img_size_h and img_size_w".into(),
                    )
                })?;
                let expected = self.config.channels * h * w;
                if width != expected {
                    return Err(BlockExpandError::ShapeMismatch(format!(
                        "expected {} values per example ({} channels of {}x{}), got {}",
                        expected, self.config.channels, h, w, width
                    )));
                }
                Ok((batch, h, w))
            }
            _ => Err(BlockExpandError::ShapeMismatch(format!(
                "input must be [batch, channels, h, w] or [batch, channels*h*w], got {:?}",
                input.shape()
            ))),
        }
    }

    fn geometry_for(&mut self, img_h: usize, img_w: usize) -> BlockExpandResult<Geometry> {
        match self.geometry {
            Some(geo) if geo.matches(img_h, img_w) => Ok(geo),
            _ => {
                let geo = Geometry::new(&self.config, img_h, img_w)?;
                log::debug!(
                    "block_expand: {}x{} image -> {}x{} blocks of {}",
                    img_h,
                    img_w,
                    geo.output_h,
                    geo.output_w,
                    geo.block_size()
                );
                self.geometry = Some(geo);
                Ok(geo)
            }
        }
    }
}

impl Layer for BlockExpand {
    fn name(&self) -> &str {
        "block_expand"
    }

    fn forward(&mut self, input: &Tensor) -> BlockExpandResult<SequenceBatch> {
        let start = if log::log_enabled!(log::Level::Trace) { Some(Instant::now()) } else { None };

        let (batch, img_h, img_w) = self.resolve_input(input)?;
        let geo = self.geometry_for(img_h, img_w)?;

        let rows = expand::expand(input.data(), batch, &geo)?;
        let value = Tensor::from_vec(rows, vec![batch * geo.block_num(), geo.block_size()])?;
        let boundaries = sequence::annotate(batch, &geo);

        if tape::is_recording() {
            tape::record_op(TapeEntry {
                backward_op: Box::new(BlockExpandBackward {
                    geometry: geo,
                    input_shape: input.shape().to_vec(),
                }),
                output_id: value.id(),
                input_ids: vec![input.id()],
                saved_tensors: vec![],
            });
        }

        if let Some(t) = start {
            log::trace!(
                "[perf] block_expand::forward {:?}->{:?} {:.3}ms",
                input.shape(),
                value.shape(),
                t.elapsed().as_secs_f64() * 1000.0
            );
        }
        Ok(SequenceBatch::new(value, boundaries))
    }

    fn backward(
        &mut self,
        output_grad: &SequenceBatch,
        input_grad: &mut Tensor,
        _callback: Option<UpdateCallback<'_>>,
    ) -> BlockExpandResult<()> {
        let (batch, img_h, img_w) = self.resolve_input(input_grad)?;
        let geo = self.geometry_for(img_h, img_w)?;

        sequence::check(&output_grad.boundaries, batch, &geo)?;
        check_grad_shape(output_grad.value.shape(), batch, &geo)?;

        shrink::accumulate(output_grad.value.data(), batch, &geo, input_grad.data_mut());
        Ok(())
    }

    fn parameters(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        Vec::new()
    }
}

fn check_grad_shape(shape: &[usize], batch: usize, geo: &Geometry) -> BlockExpandResult<()> {
    let rows = batch.checked_mul(geo.block_num()).ok_or_else(|| {
        BlockExpandError::ShapeMismatch(format!(
            "{} examples of {} blocks overflow",
            batch,
            geo.block_num()
        ))
    })?;
    let expected = [rows, geo.block_size()];
    if shape != expected {
        return Err(BlockExpandError::ShapeMismatch(format!(
            "gradient must be {:?}, got {:?}",
            expected, shape
        )));
    }
    Ok(())
}

/// Builds the layer selected by `config`.
pub fn build_layer(config: &LayerConfig) -> BlockExpandResult<Box<dyn Layer>> {
    match config {
        LayerConfig::BlockExpand(c) => Ok(Box::new(BlockExpand::new(c.clone())?)),
    }
}

/// Tape backward for [`BlockExpand`]: accumulates the row gradient into a
/// fresh zero gradient of the input's shape.
struct BlockExpandBackward {
    geometry: Geometry,
    input_shape: Vec<usize>,
}

impl BackwardOp for BlockExpandBackward {
    fn backward(&self, grad_output: &Tensor, _saved: &[Tensor]) -> BlockExpandResult<Vec<Tensor>> {
        let batch = self.input_shape[0];
        check_grad_shape(grad_output.shape(), batch, &self.geometry)?;

        let mut grad_input = vec![0.0f32; batch * self.geometry.image_len()];
        shrink::accumulate(grad_output.data(), batch, &self.geometry, &mut grad_input);
        Ok(vec![Tensor::from_vec(grad_input, self.input_shape.clone())?])
    }

    fn name(&self) -> &str {
        "BlockExpandBackward"
    }
}
