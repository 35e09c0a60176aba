//! Layer configuration

/// Configuration of a block expansion layer.
///
/// `img_size_h`/`img_size_w` of 0 mean "take the spatial size from the
/// input"; they are required only for flat `[batch, channels*h*w]` inputs.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct BlockExpandConfig {
    pub channels: usize,
    pub block_h: usize,
    pub block_w: usize,
    #[serde(default = "default_stride")]
    pub stride_h: usize,
    #[serde(default = "default_stride")]
    pub stride_w: usize,
    #[serde(default)]
    pub padding_h: usize,
    #[serde(default)]
    pub padding_w: usize,
    #[serde(default)]
    pub img_size_h: usize,
    #[serde(default)]
    pub img_size_w: usize,
}

fn default_stride() -> usize {
    1
}

impl BlockExpandConfig {
    /// Creates a config with stride 1, no padding and no fixed image size.
    pub fn new(channels: usize, block_h: usize, block_w: usize) -> Self {
        Self {
            channels,
            block_h,
            block_w,
            stride_h: 1,
            stride_w: 1,
            padding_h: 0,
            padding_w: 0,
            img_size_h: 0,
            img_size_w: 0,
        }
    }

    /// Sets the stride and returns self (builder pattern).
    pub fn with_stride(mut self, stride_h: usize, stride_w: usize) -> Self {
        self.stride_h = stride_h;
        self.stride_w = stride_w;
        self
    }

    /// Sets the padding and returns self (builder pattern).
    pub fn with_padding(mut self, padding_h: usize, padding_w: usize) -> Self {
        self.padding_h = padding_h;
        self.padding_w = padding_w;
        self
    }

    /// Sets the default image size and returns self (builder pattern).
    pub fn with_img_size(mut self, img_size_h: usize, img_size_w: usize) -> Self {
        self.img_size_h = img_size_h;
        self.img_size_w = img_size_w;
        self
    }

    /// Configured image size, if both axes are set.
    pub fn img_size(&self) -> Option<(usize, usize)> {
        (self.img_size_h > 0 && self.img_size_w > 0).then_some((self.img_size_h, self.img_size_w))
    }
}

/// Selects a transform kind by its `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerConfig {
    BlockExpand(BlockExpandConfig),
}
