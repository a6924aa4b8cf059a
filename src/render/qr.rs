//! QR code rendering to PNG

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageBuffer, ImageEncoder, Luma, imageops};
use qrcode::{EcLevel, QrCode};

use super::Renderer;
use crate::{Error, Result};

/// Renders tokens as grayscale PNG QR codes
#[derive(Debug, Clone, Copy)]
pub struct QrPngRenderer {
    ec_level: EcLevel,
}

impl QrPngRenderer {
    /// Create a renderer with medium error correction
    pub fn new() -> Self {
        Self {
            ec_level: EcLevel::M,
        }
    }

    /// Use a different error correction level
    pub fn with_ec_level(mut self, ec_level: EcLevel) -> Self {
        self.ec_level = ec_level;
        self
    }
}

impl Default for QrPngRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for QrPngRenderer {
    fn render(&self, token: &str, size: u32) -> Result<Vec<u8>> {
        let code = QrCode::with_error_correction_level(token.as_bytes(), self.ec_level)
            .map_err(|e| Error::render(format!("QR encoding failed: {}", e)))?;

        // Largest whole module size that fits; padded out to exactly `size`.
        // Sizes below the symbol's minimum yield the minimum instead.
        let symbol: ImageBuffer<Luma<u8>, Vec<u8>> =
            code.render::<Luma<u8>>().max_dimensions(size, size).build();

        let image = if symbol.width() < size {
            let mut canvas = ImageBuffer::from_pixel(size, size, Luma([255u8]));
            let offset = i64::from((size - symbol.width()) / 2);
            imageops::overlay(&mut canvas, &symbol, offset, offset);
            canvas
        } else {
            symbol
        };

        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::L8,
            )
            .map_err(|e| Error::render(format!("PNG encoding failed: {}", e)))?;

        Ok(png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_render_produces_png_of_requested_size() {
        let renderer = QrPngRenderer::new();
        let png = renderer.render("ABC123", 256).unwrap();

        assert_eq!(&png[..8], &PNG_MAGIC);
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.dimensions(), (256, 256));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = QrPngRenderer::new();
        assert_eq!(
            renderer.render("ABC123", 300).unwrap(),
            renderer.render("ABC123", 300).unwrap()
        );
    }

    #[test]
    fn test_different_tokens_render_differently() {
        let renderer = QrPngRenderer::new();
        assert_ne!(
            renderer.render("ABC123", 256).unwrap(),
            renderer.render("XYZ999", 256).unwrap()
        );
    }

    #[test]
    fn test_tiny_size_falls_back_to_minimum_symbol() {
        let renderer = QrPngRenderer::new();
        let png = renderer.render("ABC123", 4).unwrap();

        let decoded = image::load_from_memory(&png).unwrap();
        let (width, height) = decoded.dimensions();
        assert_eq!(width, height);
        assert!(width > 4);
    }

    #[test]
    fn test_corners_are_quiet_zone() {
        let renderer = QrPngRenderer::new().with_ec_level(EcLevel::L);
        let png = renderer.render("ABC123", 257).unwrap();

        let decoded = image::load_from_memory(&png).unwrap().to_luma8();
        assert_eq!(decoded.get_pixel(0, 0), &Luma([255u8]));
        assert_eq!(decoded.get_pixel(256, 256), &Luma([255u8]));
    }
}
