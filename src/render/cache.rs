//! Per-size memo of the current token's rendering

use bytes::Bytes;
use std::collections::HashMap;

use super::Renderer;
use crate::Result;

/// Renderings of one token, keyed by edge length.
///
/// Holds no token of its own; the owner clears it whenever the token changes.
#[derive(Debug, Default)]
pub struct RenderCache {
    images: HashMap<u32, Bytes>,
}

impl RenderCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached rendering for `size`, rendering `token` on a miss
    pub fn get_or_render(
        &mut self,
        token: &str,
        size: u32,
        renderer: &dyn Renderer,
    ) -> Result<Bytes> {
        if let Some(image) = self.images.get(&size) {
            return Ok(image.clone());
        }

        let image = Bytes::from(renderer.render(token, size)?);
        tracing::debug!("Rendered token at {}px ({} bytes)", size, image.len());
        self.images.insert(size, image.clone());
        Ok(image)
    }

    /// Drop every rendering
    pub fn clear(&mut self) {
        self.images.clear();
    }

    /// Whether a rendering for `size` is cached
    pub fn contains(&self, size: u32) -> bool {
        self.images.contains_key(&size)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
