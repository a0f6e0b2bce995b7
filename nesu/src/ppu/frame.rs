use alloc::{vec, vec::Vec};

pub const WIDTH: usize = 256;
pub const HEIGHT: usize = 240;
pub const FRAME_BYTES: usize = WIDTH * HEIGHT * 3;

/// Two RGB888 buffers. The PPU draws into the back buffer and swaps once a
/// frame, so the front buffer always holds a complete picture.
pub struct Frame {
    buffers: [Vec<u8>; 2],
    back: usize,
    count: u64,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    pub fn new() -> Self {
        Self {
            buffers: [vec![0; FRAME_BYTES], vec![0; FRAME_BYTES]],
            back: 0,
            count: 0,
        }
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let offset = (y * WIDTH + x) * 3;
        self.buffers[self.back][offset..offset + 3].copy_from_slice(&rgb);
    }

    pub fn swap(&mut self) {
        self.back ^= 1;
        self.count += 1;
    }

    pub fn front(&self) -> &[u8] {
        &self.buffers[self.back ^ 1]
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let offset = (y * WIDTH + x) * 3;
        let front = self.front();
        [front[offset], front[offset + 1], front[offset + 2]]
    }

    /// Completed frames so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawing_is_hidden_until_swap() {
        let mut frame = Frame::new();
        frame.set_pixel(3, 2, [1, 2, 3]);
        assert_eq!(frame.pixel(3, 2), [0, 0, 0]);
        frame.swap();
        assert_eq!(frame.pixel(3, 2), [1, 2, 3]);
        assert_eq!(frame.count(), 1);
    }
}
