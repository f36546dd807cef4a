use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};

/// # FrameBuffer
/// The display is composed of 64x32 black/white pixels, indexed as `[y][x]`.
///
/// Coordinates wrap around both axes, so a sprite drawn off the right edge
/// reappears on the left and one drawn off the bottom reappears at the top.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    pixels: [[bool; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
}

impl FrameBuffer {
    pub fn new() -> Self {
        FrameBuffer {
            pixels: [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
        }
    }

    /// Unlights every pixel
    pub fn clear(&mut self) {
        self.pixels = [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
    }

    /// XORs a sprite onto the display with wrapping.
    ///
    /// Each byte of `sprite` is one row; its most significant bit is the leftmost column.
    /// Returns whether any lit pixel was turned off (a collision).
    ///
    /// # Arguments
    /// * `x` the column of the sprite's top left corner
    /// * `y` the row of the sprite's top left corner
    /// * `sprite` the rows of the sprite
    pub fn draw(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let mut collision = false;
        for (row, byte) in sprite.iter().enumerate() {
            let py = (y + row) % DISPLAY_HEIGHT;
            for bit in 0..8 {
                let px = (x + bit) % DISPLAY_WIDTH;
                let pixel = (byte >> (7 - bit)) & 1 == 1;
                let cell = &mut self.pixels[py][px];
                collision |= pixel && *cell;
                *cell ^= pixel;
            }
        }
        collision
    }

    /// Whether the pixel at `(x, y)` is lit; coordinates wrap like `draw`
    pub fn is_lit(&self, x: usize, y: usize) -> bool {
        self.pixels[y % DISPLAY_HEIGHT][x % DISPLAY_WIDTH]
    }

    /// Sets a single pixel, wrapping like `draw`
    pub fn set(&mut self, x: usize, y: usize, lit: bool) {
        self.pixels[y % DISPLAY_HEIGHT][x % DISPLAY_WIDTH] = lit;
    }

    /// The rows of the display, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[bool; DISPLAY_WIDTH]> {
        self.pixels.iter()
    }

    /// Whether every pixel is unlit
    pub fn is_blank(&self) -> bool {
        self.rows().all(|row| row.iter().all(|&lit| !lit))
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
