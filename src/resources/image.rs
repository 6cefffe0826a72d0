use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// Global Image ID generator
static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct ImageInner {
    pub id: u64,
    pub label: String,
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 pixels.
    pub data: Vec<u8>,
    /// xxh3 hash of the encoded source bytes.
    pub content_hash: u64,
    pub flipped_y: bool,
}

/// Decoded RGBA8 pixel data.
///
/// Cheap to clone: the pixels are shared, so the sRGB and linear textures built
/// from one packed image point at the same buffer.
#[derive(Debug, Clone)]
pub struct Image(Arc<ImageInner>);

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for Image {}
impl std::hash::Hash for Image {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl Image {
    #[must_use]
    pub fn new(
        label: &str,
        width: u32,
        height: u32,
        data: Vec<u8>,
        content_hash: u64,
        flipped_y: bool,
    ) -> Self {
        Self(Arc::new(ImageInner {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            label: label.to_string(),
            width,
            height,
            data,
            content_hash,
            flipped_y,
        }))
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.0.label
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height
    }

    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.0.data
    }

    #[inline]
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        self.0.content_hash
    }

    #[inline]
    #[must_use]
    pub fn flipped_y(&self) -> bool {
        self.0.flipped_y
    }

    /// RGBA value of one pixel, `None` when out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.0.width || y >= self.0.height {
            return None;
        }
        let offset = ((y * self.0.width + x) * 4) as usize;
        let px = self.0.data.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}
