use serde::{Deserialize, Serialize};

/// A single captured raster, stored as tightly packed RGB8.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Uniformly coloured frame, handy for dry runs.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        let pixels = rgb.iter().copied().cycle().take(count * Self::CHANNELS).collect();
        Self::from_rgb(width, height, pixels)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    /// True when the buffer length matches the declared dimensions.
    pub fn is_consistent(&self) -> bool {
        self.pixels.len() == self.width as usize * self.height as usize * Self::CHANNELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_frame_has_matching_buffer() {
        let frame = Frame::solid(4, 2, [10, 20, 30]);
        assert!(frame.is_consistent());
        assert!(!frame.is_empty());
        assert_eq!(&frame.pixels[..6], &[10, 20, 30, 10, 20, 30]);
    }

    #[test]
    fn truncated_buffer_is_inconsistent() {
        let frame = Frame::from_rgb(2, 2, vec![0; 5]);
        assert!(!frame.is_consistent());
        assert!(Frame::from_rgb(0, 0, Vec::new()).is_empty());
    }
}
