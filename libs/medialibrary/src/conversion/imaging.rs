//! Transformer built on the `image` crate

use image::{
    DynamicImage, GenericImageView, Rgba, RgbaImage,
    imageops::{self, FilterType},
};
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};
use tracing::debug;

use super::{
    ConversionFn, Fit, Orientation, ResponsiveRecipe, TransformError, TransformOptions,
    TransformResult, Transformer,
};

const FILTER: FilterType = FilterType::Lanczos3;
const BORDER_WIDTH: u32 = 5;
const WATERMARK_MARGIN: i64 = 10;

/// Registry of named conversions and responsive recipes
#[derive(Default)]
pub struct ImageTransformer {
    conversions: RwLock<HashMap<String, ConversionFn>>,
    recipes: RwLock<HashMap<String, ResponsiveRecipe>>,
}

impl ImageTransformer {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `thumbnail`, `preview` and the `responsive` recipe
    pub fn with_defaults() -> Self {
        let transformer = Self::new();
        transformer.register_default_conversions();
        transformer.register_default_responsive_recipes();
        transformer
    }

    /// `thumbnail` (150x150) and `preview` (600x400), both contained
    pub fn register_default_conversions(&self) {
        self.register_resize("thumbnail", TransformOptions::new().with_size(150, 150));
        self.register_resize("preview", TransformOptions::new().with_size(600, 400));
    }

    pub fn register_default_responsive_recipes(&self) {
        self.register_responsive_recipe(
            "responsive",
            vec![320, 640, 960, 1280, 1600, 1920],
            TransformOptions::new()
                .with_quality(85)
                .with_fit(Fit::Contain),
        );
    }

    /// Register a conversion that resizes with `options`
    pub fn register_resize(&self, name: &str, options: TransformOptions) {
        self.register_conversion(name, resize_conversion(options));
    }

    /// Registered conversion names, sorted
    pub fn conversion_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .conversions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Registered recipe names, sorted
    pub fn recipe_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .recipes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ImageTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageTransformer")
            .field("conversions", &self.conversion_names())
            .field("recipes", &self.recipe_names())
            .finish()
    }
}

impl Transformer for ImageTransformer {
    fn transform(
        &self,
        image: &DynamicImage,
        conversion: &str,
        options: &TransformOptions,
    ) -> TransformResult<DynamicImage> {
        let registered = self
            .conversions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(conversion)
            .cloned()
            .ok_or_else(|| TransformError::UnknownConversion(conversion.to_string()))?;

        registered(image, options)
    }

    fn has_conversion(&self, conversion: &str) -> bool {
        self.conversions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(conversion)
    }

    fn register_conversion(&self, name: &str, conversion: ConversionFn) {
        debug!("Registering conversion: {}", name);
        self.conversions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), conversion);
    }

    fn register_responsive_recipe(&self, name: &str, widths: Vec<u32>, options: TransformOptions) {
        debug!("Registering responsive recipe {} with widths {:?}", name, widths);
        self.recipes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                name.to_string(),
                ResponsiveRecipe {
                    name: name.to_string(),
                    widths,
                    options,
                },
            );
    }

    fn responsive_recipe(&self, name: &str) -> Option<ResponsiveRecipe> {
        self.recipes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

/// Conversion resizing with `defaults`; options passed at call time win
pub fn resize_conversion(defaults: TransformOptions) -> ConversionFn {
    Arc::new(move |image, options| resize_image(image, &options.or(&defaults)))
}

/// Orient, resize and filter `image` according to `options`
pub fn resize_image(
    image: &DynamicImage,
    options: &TransformOptions,
) -> TransformResult<DynamicImage> {
    if options.width == Some(0) || options.height == Some(0) {
        return Err(TransformError::InvalidOption(
            "width and height must be positive".to_string(),
        ));
    }

    let oriented = match options.orientation {
        Some(Orientation::Rotate90) => image.rotate90(),
        Some(Orientation::Rotate180) => image.rotate180(),
        Some(Orientation::Rotate270) => image.rotate270(),
        Some(Orientation::FlipHorizontal) => image.fliph(),
        Some(Orientation::FlipVertical) => image.flipv(),
        None => image.clone(),
    };

    let fit = options.fit.unwrap_or_default();
    let mut result = match (fit, options.width, options.height) {
        (_, None, None) => oriented,
        (Fit::Contain, width, height) => contain(&oriented, width, height),
        (Fit::Fill, Some(width), Some(height)) => oriented.resize_to_fill(width, height, FILTER),
        (Fit::Max | Fit::Fill, width, height) => scale(&oriented, width, height),
        (Fit::Stretch, width, height) => {
            let (src_width, src_height) = oriented.dimensions();
            oriented.resize_exact(
                width.unwrap_or(src_width),
                height.unwrap_or(src_height),
                FILTER,
            )
        }
    };

    if let (Fit::Contain, Some(width), Some(height), Some(background)) =
        (fit, options.width, options.height, &options.background)
    {
        result = pad(&result, width, height, parse_color(background)?);
    }

    if let Some(sigma) = options.blur.filter(|s| *s > 0.0) {
        result = result.blur(sigma);
    }
    if let Some(sigma) = options.sharpen.filter(|s| *s > 0.0) {
        result = result.unsharpen(sigma, 1);
    }
    if let Some(amount) = options.brightness.filter(|b| *b != 0) {
        result = result.brighten(amount);
    }
    if let Some(amount) = options.contrast.filter(|c| *c != 0.0) {
        result = result.adjust_contrast(amount);
    }

    if let Some(border) = &options.border {
        result = frame(&result, parse_color(border)?);
    }

    if let Some(path) = &options.watermark {
        let mark = image::open(path)?;
        result = watermark(&result, &mark);
    }

    Ok(result)
}

/// Scale down to fit inside the given bounds, never up
fn contain(image: &DynamicImage, width: Option<u32>, height: Option<u32>) -> DynamicImage {
    let (src_width, src_height) = image.dimensions();
    let mut factor = 1.0_f64;

    if let Some(width) = width {
        factor = factor.min(f64::from(width) / f64::from(src_width));
    }
    if let Some(height) = height {
        factor = factor.min(f64::from(height) / f64::from(src_height));
    }

    if factor >= 1.0 {
        return image.clone();
    }

    image.resize_exact(
        scaled(src_width, factor),
        scaled(src_height, factor),
        FILTER,
    )
}

/// Scale to the width (or the height when no width is given), keeping the ratio
fn scale(image: &DynamicImage, width: Option<u32>, height: Option<u32>) -> DynamicImage {
    let (src_width, src_height) = image.dimensions();

    let factor = match (width, height) {
        (Some(width), _) => f64::from(width) / f64::from(src_width),
        (None, Some(height)) => f64::from(height) / f64::from(src_height),
        (None, None) => return image.clone(),
    };

    image.resize_exact(
        scaled(src_width, factor),
        scaled(src_height, factor),
        FILTER,
    )
}

fn scaled(length: u32, factor: f64) -> u32 {
    ((f64::from(length) * factor).round() as u32).max(1)
}

fn pad(image: &DynamicImage, width: u32, height: u32, color: Rgba<u8>) -> DynamicImage {
    let mut canvas = RgbaImage::from_pixel(width, height, color);
    let x = (i64::from(width) - i64::from(image.width())) / 2;
    let y = (i64::from(height) - i64::from(image.height())) / 2;
    imageops::overlay(&mut canvas, &image.to_rgba8(), x, y);
    DynamicImage::ImageRgba8(canvas)
}

fn frame(image: &DynamicImage, color: Rgba<u8>) -> DynamicImage {
    let mut canvas = RgbaImage::from_pixel(
        image.width() + 2 * BORDER_WIDTH,
        image.height() + 2 * BORDER_WIDTH,
        color,
    );
    imageops::overlay(
        &mut canvas,
        &image.to_rgba8(),
        i64::from(BORDER_WIDTH),
        i64::from(BORDER_WIDTH),
    );
    DynamicImage::ImageRgba8(canvas)
}

fn watermark(image: &DynamicImage, mark: &DynamicImage) -> DynamicImage {
    let mut canvas = image.to_rgba8();
    let x = i64::from(image.width()) - i64::from(mark.width()) - WATERMARK_MARGIN;
    let y = i64::from(image.height()) - i64::from(mark.height()) - WATERMARK_MARGIN;
    imageops::overlay(&mut canvas, &mark.to_rgba8(), x.max(0), y.max(0));
    DynamicImage::ImageRgba8(canvas)
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (the `#` is optional)
pub fn parse_color(value: &str) -> TransformResult<Rgba<u8>> {
    let invalid = || TransformError::InvalidOption(format!("invalid hex colour: {}", value));
    let hex = value.strip_prefix('#').unwrap_or(value);

    let digits = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(invalid)?;

    let pair = |i: usize| (digits[i] << 4) | digits[i + 1];

    match digits.len() {
        3 => Ok(Rgba([digits[0] * 17, digits[1] * 17, digits[2] * 17, 255])),
        6 => Ok(Rgba([pair(0), pair(2), pair(4), 255])),
        8 => Ok(Rgba([pair(0), pair(2), pair(4), pair(6)])),
        _ => Err(invalid()),
    }
}
