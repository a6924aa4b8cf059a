//! QR rendering of the current token
//!
//! [`Renderer`] turns a token into image bytes; [`RenderCache`] keeps one
//! rendering per requested size for the lifetime of a token.

pub mod cache;
pub mod qr;

pub use cache::RenderCache;
pub use qr::QrPngRenderer;

use crate::Result;

/// Pure token-to-bitmap conversion
pub trait Renderer: Send + Sync {
    /// Render `token` into an encoded image `size` pixels wide and high
    fn render(&self, token: &str, size: u32) -> Result<Vec<u8>>;
}
