use crate::api::config::BlockExpandConfig;
use crate::api::error::{BlockExpandError, BlockExpandResult};

/// Number of block positions along one axis.
///
/// `1 + (2*padding + img_size - block_size + stride - 1) / stride`
///
/// The `stride - 1` bias rounds the division up, so a trailing partial block
/// is kept (its missing pixels read as padding). Fails when the block does not
/// fit even once in the padded input.
pub fn output_size(
    img_size: usize,
    block_size: usize,
    stride: usize,
    padding: usize,
) -> BlockExpandResult<usize> {
    if block_size == 0 || stride == 0 {
        return Err(BlockExpandError::InvalidConfig(format!(
            "block size and stride must be positive, got block={} stride={}",
            block_size, stride
        )));
    }
    let padded = padding
        .checked_mul(2)
        .and_then(|p| p.checked_add(img_size))
        .ok_or_else(|| {
            BlockExpandError::InvalidConfig(format!(
                "padding {} around image {} overflows",
                padding, img_size
            ))
        })?;
    if padded < block_size {
        return Err(BlockExpandError::InvalidConfig(format!(
            "block {} does not fit in image {} with padding {}",
            block_size, img_size, padding
        )));
    }
    let biased = (padded - block_size).checked_add(stride - 1).ok_or_else(|| {
        BlockExpandError::InvalidConfig(format!(
            "stride {} overflows padded image {}",
            stride, padded
        ))
    })?;
    Ok(1 + biased / stride)
}

fn checked_product(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Checks the size-independent parts of a config, plus the output size when
/// the image size is configured.
pub fn validate(config: &BlockExpandConfig) -> BlockExpandResult<()> {
    if config.channels == 0 {
        return Err(BlockExpandError::InvalidConfig("channels must be positive".into()));
    }
    if config.block_h == 0 || config.block_w == 0 {
        return Err(BlockExpandError::InvalidConfig(format!(
            "block must be positive, got {}x{}",
            config.block_h, config.block_w
        )));
    }
    if config.stride_h == 0 || config.stride_w == 0 {
        return Err(BlockExpandError::InvalidConfig(format!(
            "stride must be positive, got {}x{}",
            config.stride_h, config.stride_w
        )));
    }
    if (config.img_size_h == 0) != (config.img_size_w == 0) {
        return Err(BlockExpandError::InvalidConfig(format!(
            "img_size_h and img_size_w must be set together, got {}x{}",
            config.img_size_h, config.img_size_w
        )));
    }
    if let Some((h, w)) = config.img_size() {
        Geometry::new(config, h, w)?;
    }
    Ok(())
}

/// Block layout for one input spatial size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub channels: usize,
    pub block_h: usize,
    pub block_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
    pub padding_h: usize,
    pub padding_w: usize,
    pub img_h: usize,
    pub img_w: usize,
    pub output_h: usize,
    pub output_w: usize,
}

impl Geometry {
    pub fn new(config: &BlockExpandConfig, img_h: usize, img_w: usize) -> BlockExpandResult<Self> {
        if img_h == 0 || img_w == 0 {
            return Err(BlockExpandError::InvalidConfig(format!(
                "image size must be positive, got {}x{}",
                img_h, img_w
            )));
        }
        let output_h = output_size(img_h, config.block_h, config.stride_h, config.padding_h)?;
        let output_w = output_size(img_w, config.block_w, config.stride_w, config.padding_w)?;
        // every size derived below stays within these two products
        let expanded = [config.channels, config.block_h, config.block_w, output_h, output_w];
        if checked_product(&expanded).is_none()
            || checked_product(&[config.channels, img_h, img_w]).is_none()
        {
            return Err(BlockExpandError::InvalidConfig(format!(
                "{} channels of {}x{} blocks over a {}x{} image overflow",
                config.channels, config.block_h, config.block_w, img_h, img_w
            )));
        }
        Ok(Self {
            channels: config.channels,
            block_h: config.block_h,
            block_w: config.block_w,
            stride_h: config.stride_h,
            stride_w: config.stride_w,
            padding_h: config.padding_h,
            padding_w: config.padding_w,
            img_h,
            img_w,
            output_h,
            output_w,
        })
    }

    /// Blocks per example, i.e. the sequence length.
    pub fn block_num(&self) -> usize {
        self.output_h * self.output_w
    }

    /// Values per block row.
    pub fn block_size(&self) -> usize {
        self.channels * self.block_h * self.block_w
    }

    /// Values per example in the feature map.
    pub fn image_len(&self) -> usize {
        self.channels * self.img_h * self.img_w
    }

    /// Values per example in the expanded matrix.
    pub fn expanded_len(&self) -> usize {
        self.block_num() * self.block_size()
    }

    pub fn matches(&self, img_h: usize, img_w: usize) -> bool {
        self.img_h == img_h && self.img_w == img_w
    }

    /// Image row read by block row `oy` at offset `kh`; `None` inside padding.
    #[inline]
    pub(crate) fn source_row(&self, oy: usize, kh: usize) -> Option<usize> {
        (oy * self.stride_h + kh)
            .checked_sub(self.padding_h)
            .filter(|&y| y < self.img_h)
    }

    /// Image column read by block column `ox` at offset `kw`; `None` inside padding.
    #[inline]
    pub(crate) fn source_col(&self, ox: usize, kw: usize) -> Option<usize> {
        (ox * self.stride_w + kw)
            .checked_sub(self.padding_w)
            .filter(|&x| x < self.img_w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_size_formula() {
        for img in 1..12 {
            for block in 1..6 {
                for stride in 1..5 {
                    for padding in 0..3 {
                        let padded = 2 * padding + img;
                        match output_size(img, block, stride, padding) {
                            Ok(n) => {
                                assert!(padded >= block);
                                assert_eq!(n, 1 + (padded - block + stride - 1) / stride);
                                assert!(n >= 1);
                            }
                            Err(_) => assert!(padded < block),
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_output_size_rounds_up() {
        // floor division would give 2 here
        assert_eq!(output_size(5, 2, 2, 0).unwrap(), 3);
        assert_eq!(output_size(4, 2, 2, 0).unwrap(), 2);
        assert_eq!(output_size(4, 2, 1, 0).unwrap(), 3);
        assert_eq!(output_size(3, 5, 1, 1).unwrap(), 1);
    }

    #[test]
    fn test_output_size_rejects() {
        assert!(output_size(3, 5, 1, 0).is_err());
        assert!(output_size(3, 0, 1, 0).is_err());
        assert!(output_size(3, 2, 0, 0).is_err());
    }

    #[test]
    fn test_output_size_overflow_is_config_error() {
        assert!(matches!(
            output_size(1, 1, 1, usize::MAX / 2 + 1),
            Err(BlockExpandError::InvalidConfig(_))
        ));
        assert!(matches!(
            output_size(usize::MAX, 1, 1, 1),
            Err(BlockExpandError::InvalidConfig(_))
        ));
        assert!(matches!(
            output_size(4, 2, usize::MAX, 0),
            Err(BlockExpandError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_geometry_rejects_overflowing_sizes() {
        let wide = BlockExpandConfig::new(usize::MAX / 2, 2, 2);
        assert!(matches!(
            Geometry::new(&wide, 2, 2),
            Err(BlockExpandError::InvalidConfig(_))
        ));
        let tall = BlockExpandConfig::new(1, 1, 1);
        assert!(matches!(
            Geometry::new(&tall, usize::MAX / 2, 4),
            Err(BlockExpandError::InvalidConfig(_))
        ));
        let padded = BlockExpandConfig::new(1, 1, 1)
            .with_padding(usize::MAX / 2 + 1, 0)
            .with_img_size(1, 1);
        assert!(matches!(
            validate(&padded),
            Err(BlockExpandError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(validate(&BlockExpandConfig::new(1, 2, 2)).is_ok());
        assert!(validate(&BlockExpandConfig::new(0, 2, 2)).is_err());
        assert!(validate(&BlockExpandConfig::new(1, 0, 2)).is_err());
        assert!(validate(&BlockExpandConfig::new(1, 2, 2).with_stride(1, 0)).is_err());
        assert!(validate(&BlockExpandConfig::new(1, 2, 2).with_img_size(4, 0)).is_err());
        assert!(validate(&BlockExpandConfig::new(1, 5, 5).with_img_size(4, 4)).is_err());
        assert!(validate(&BlockExpandConfig::new(1, 5, 5).with_img_size(4, 4).with_padding(1, 1)).is_ok());
    }

    #[test]
    fn test_geometry_sizes() {
        let config = BlockExpandConfig::new(3, 2, 3).with_stride(2, 1).with_padding(1, 0);
        let g = Geometry::new(&config, 4, 5).unwrap();
        // h: 1 + (2 + 4 - 2 + 1) / 2 = 3, w: 1 + (5 - 3) / 1 = 3
        assert_eq!((g.output_h, g.output_w), (3, 3));
        assert_eq!(g.block_num(), 9);
        assert_eq!(g.block_size(), 18);
        assert_eq!(g.image_len(), 60);
        assert_eq!(g.expanded_len(), 162);
        assert!(g.matches(4, 5));
        assert!(!g.matches(5, 4));
    }

    #[test]
    fn test_source_coordinates() {
        let config = BlockExpandConfig::new(1, 2, 2).with_padding(1, 1);
        let g = Geometry::new(&config, 2, 2).unwrap();
        assert_eq!(g.source_row(0, 0), None);
        assert_eq!(g.source_row(0, 1), Some(0));
        assert_eq!(g.source_row(2, 0), Some(1));
        assert_eq!(g.source_row(2, 1), None);
        assert_eq!(g.source_col(1, 1), Some(1));
    }

    #[test]
    fn test_geometry_rejects_empty_image() {
        assert!(Geometry::new(&BlockExpandConfig::new(1, 1, 1), 0, 3).is_err());
    }
}
