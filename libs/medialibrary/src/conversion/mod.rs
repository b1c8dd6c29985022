//! Image transform engine
//!
//! Conversions are named functions over a decoded image. Responsive recipes
//! name a list of target widths and the options used to produce them.

mod codec;
mod imaging;

pub use codec::{DerivedCodec, JPEG_QUALITY};
pub use imaging::{ImageTransformer, parse_color, resize_conversion, resize_image};

use image::{DynamicImage, ImageError};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};
use thiserror::Error;

/// Custom error type for transform operations
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Unknown conversion: {0}")]
    UnknownConversion(String),

    #[error("Unknown responsive recipe: {0}")]
    UnknownRecipe(String),

    #[error("Invalid transform option: {0}")]
    InvalidOption(String),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),
}

/// Type alias for Result with TransformError
pub type TransformResult<T> = Result<T, TransformError>;

/// A registered conversion
pub type ConversionFn =
    Arc<dyn Fn(&DynamicImage, &TransformOptions) -> TransformResult<DynamicImage> + Send + Sync>;

/// How an image is fitted into the target box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fit {
    /// Scale down to fit inside the box, keeping the aspect ratio
    #[default]
    Contain,
    /// Scale to the target width, keeping the aspect ratio
    Max,
    /// Cover the box and crop the overflow around the centre
    Fill,
    /// Scale to exactly the box, ignoring the aspect ratio
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Rotate90,
    Rotate180,
    Rotate270,
    FlipHorizontal,
    FlipVertical,
}

/// Parameters of a transform; unset fields leave the image alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Recorded with recipes; derived files use the codec's own quality
    pub quality: Option<u8>,
    pub fit: Option<Fit>,
    pub orientation: Option<Orientation>,
    /// Hex colour padding a contained image to the exact box
    pub background: Option<String>,
    /// Hex colour of a 5px frame
    pub border: Option<String>,
    pub blur: Option<f32>,
    pub sharpen: Option<f32>,
    pub brightness: Option<i32>,
    pub contrast: Option<f32>,
    /// Image file overlaid in the bottom-right corner
    pub watermark: Option<PathBuf>,
}

impl TransformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_fit(mut self, fit: Fit) -> Self {
        self.fit = Some(fit);
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background = Some(color.into());
        self
    }

    pub fn with_border(mut self, color: impl Into<String>) -> Self {
        self.border = Some(color.into());
        self
    }

    /// Fields set on `self` win, the rest come from `base`
    pub fn or(&self, base: &TransformOptions) -> TransformOptions {
        TransformOptions {
            width: self.width.or(base.width),
            height: self.height.or(base.height),
            quality: self.quality.or(base.quality),
            fit: self.fit.or(base.fit),
            orientation: self.orientation.or(base.orientation),
            background: self.background.clone().or_else(|| base.background.clone()),
            border: self.border.clone().or_else(|| base.border.clone()),
            blur: self.blur.or(base.blur),
            sharpen: self.sharpen.or(base.sharpen),
            brightness: self.brightness.or(base.brightness),
            contrast: self.contrast.or(base.contrast),
            watermark: self.watermark.clone().or_else(|| base.watermark.clone()),
        }
    }
}

/// Named set of widths generated for one source image
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsiveRecipe {
    pub name: String,
    pub widths: Vec<u32>,
    pub options: TransformOptions,
}

/// Pluggable transform backend
pub trait Transformer: Send + Sync {
    /// Apply the conversion registered as `conversion`
    fn transform(
        &self,
        image: &DynamicImage,
        conversion: &str,
        options: &TransformOptions,
    ) -> TransformResult<DynamicImage>;

    fn has_conversion(&self, conversion: &str) -> bool;

    fn register_conversion(&self, name: &str, conversion: ConversionFn);

    fn register_responsive_recipe(&self, name: &str, widths: Vec<u32>, options: TransformOptions);

    fn responsive_recipe(&self, name: &str) -> Option<ResponsiveRecipe>;

    /// Produce one width of a recipe
    ///
    /// A recipe sharing its name with a conversion runs that conversion with
    /// the width overridden; otherwise the image is resized to the width.
    fn transform_responsive(
        &self,
        image: &DynamicImage,
        recipe: &ResponsiveRecipe,
        width: u32,
    ) -> TransformResult<DynamicImage> {
        let options = TransformOptions {
            width: Some(width),
            height: None,
            ..recipe.options.clone()
        };

        if self.has_conversion(&recipe.name) {
            self.transform(image, &recipe.name, &options)
        } else {
            resize_image(image, &options)
        }
    }
}
