//! Encoder selection for derived files
//!
//! Derived files keep the original's extension in their key, so the encoder
//! is chosen from that same extension.

use image::{
    ColorType, DynamicImage, ImageEncoder, ImageResult,
    codecs::{gif::GifEncoder, jpeg::JpegEncoder, png::PngEncoder},
};
use std::io::Write;

/// JPEG quality of every derived JPEG
pub const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedCodec {
    Png,
    Gif,
    Jpeg { quality: u8 },
}

impl DerivedCodec {
    /// PNG for `.png`, GIF for `.gif`, JPEG for everything else
    pub fn for_file_name(file_name: &str) -> Self {
        match crate::path::extension(file_name).as_str() {
            "png" => Self::Png,
            "gif" => Self::Gif,
            _ => Self::Jpeg {
                quality: JPEG_QUALITY,
            },
        }
    }

    pub fn encode<W: Write>(&self, image: &DynamicImage, writer: W) -> ImageResult<()> {
        match self {
            Self::Png => {
                let rgba = image.to_rgba8();
                PngEncoder::new(writer).write_image(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ColorType::Rgba8,
                )
            }
            Self::Gif => {
                let rgba = image.to_rgba8();
                let mut encoder = GifEncoder::new(writer);
                encoder.encode(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ColorType::Rgba8,
                )
            }
            Self::Jpeg { quality } => {
                let rgb = image.to_rgb8();
                JpegEncoder::new_with_quality(writer, *quality).encode(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    ColorType::Rgb8,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgba, RgbaImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([0, 120, 255, 255])))
    }

    #[test]
    fn test_codec_follows_extension() {
        assert_eq!(DerivedCodec::for_file_name("a.PNG"), DerivedCodec::Png);
        assert_eq!(DerivedCodec::for_file_name("a.gif"), DerivedCodec::Gif);
        assert_eq!(
            DerivedCodec::for_file_name("a.webp"),
            DerivedCodec::Jpeg { quality: 90 }
        );
        assert_eq!(
            DerivedCodec::for_file_name("no-extension"),
            DerivedCodec::Jpeg { quality: 90 }
        );
    }

    #[test]
    fn test_encoded_bytes_match_codec() {
        let cases = [
            (DerivedCodec::Png, ImageFormat::Png),
            (DerivedCodec::Gif, ImageFormat::Gif),
            (DerivedCodec::Jpeg { quality: 90 }, ImageFormat::Jpeg),
        ];

        for (codec, format) in cases {
            let mut bytes = Vec::new();
            codec.encode(&sample(), &mut bytes).unwrap();

            assert_eq!(image::guess_format(&bytes).unwrap(), format);
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (8, 6));
        }
    }
}
