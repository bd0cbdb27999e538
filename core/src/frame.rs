//! The composited frame buffer and the immediate-mode painter that native
//! visuals draw through.
//!
//! Storage is RGBA, 8 bits per channel, row-major, with row 0 at the
//! BOTTOM of the frame (origin bottom-left, y grows upward). Pixel data
//! crossing this boundary carries an explicit row stride: a positive stride
//! means rows are given bottom-up, a negative stride means top-down.

use crate::{
    error::{SimError, SimResult},
    types::Rgba,
};

pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width:      u32,
    height:     u32,
    background: Rgba,
    pixels:     Vec<u8>,
    released:   bool,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32, background: Rgba) -> Self {
        let mut frame = Self {
            width,
            height,
            background,
            pixels: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
            released: false,
        };
        frame.clear();
        frame
    }

    pub fn width(&self) -> u32  { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn background(&self) -> Rgba { self.background }

    /// Raw bottom-up pixel storage.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn clear(&mut self) {
        for px in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&self.background);
        }
    }

    /// Reallocate to a new size. Contents are cleared.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width as usize * height as usize * BYTES_PER_PIXEL];
        self.clear();
    }

    /// Mark the surface as gone. Later reads fail.
    pub fn release(&mut self) {
        self.released = true;
    }

    fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        self.offset(x as i64, y as i64).map(|o| {
            let mut px = [0u8; 4];
            px.copy_from_slice(&self.pixels[o..o + BYTES_PER_PIXEL]);
            px
        })
    }

    /// Source-over blend of `color` at (x, y). Out-of-bounds writes are dropped.
    pub fn blend_pixel(&mut self, x: i64, y: i64, color: Rgba) {
        let Some(o) = self.offset(x, y) else { return };
        let alpha = color[3] as u32;
        if alpha == 255 {
            self.pixels[o..o + BYTES_PER_PIXEL].copy_from_slice(&color);
            return;
        }
        if alpha == 0 {
            return;
        }
        for c in 0..3 {
            let dst = self.pixels[o + c] as u32;
            self.pixels[o + c] = ((color[c] as u32 * alpha + dst * (255 - alpha)) / 255) as u8;
        }
        self.pixels[o + 3] = 255;
    }

    /// Copy an RGBA image into the frame with its bottom-left corner at
    /// (x, y). `stride` is the byte distance between successive rows of
    /// `src` as presented bottom-up; pass `-(4 * width)` for top-down data.
    pub fn blit(&mut self, src: &[u8], width: u32, height: u32, stride: isize, x: i64, y: i64) {
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        let pitch = stride.unsigned_abs();
        for row in 0..height as usize {
            let src_row = if stride < 0 { height as usize - 1 - row } else { row };
            let start = src_row * pitch;
            let Some(line) = src.get(start..start + row_bytes) else { continue };
            let dy = y + row as i64;
            if dy < 0 || dy >= self.height as i64 {
                continue;
            }
            // Clip horizontally, then copy the visible span in one go.
            let x0 = x.max(0);
            let x1 = (x + width as i64).min(self.width as i64);
            if x0 >= x1 {
                continue;
            }
            let src_from = (x0 - x) as usize * BYTES_PER_PIXEL;
            let src_to = (x1 - x) as usize * BYTES_PER_PIXEL;
            let Some(dst) = self.offset(x0, dy) else { continue };
            self.pixels[dst..dst + (src_to - src_from)].copy_from_slice(&line[src_from..src_to]);
        }
    }

    /// Read the whole frame in RGBA with the given row stride convention.
    /// `-(4 * width)` yields top-down rows, the layout video encoders expect.
    pub fn read_rgba(&self, stride: isize) -> SimResult<Vec<u8>> {
        if self.released {
            return Err(SimError::FrameGrab {
                reason:     "frame buffer has been released".into(),
                diagnostic: None,
            });
        }
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        if stride > 0 {
            return Ok(self.pixels.clone());
        }
        let mut out = Vec::with_capacity(self.pixels.len());
        for row in self.pixels.chunks_exact(row_bytes.max(1)).rev() {
            out.extend_from_slice(row);
        }
        Ok(out)
    }

    /// Top-down copy of the frame for image export.
    pub fn to_image(&self) -> SimResult<image::RgbaImage> {
        let data = self.read_rgba(-(self.width as isize * BYTES_PER_PIXEL as isize))?;
        image::RgbaImage::from_raw(self.width, self.height, data).ok_or_else(|| {
            SimError::Other(anyhow::anyhow!(
                "frame of {}x{} does not fit its pixel data",
                self.width,
                self.height
            ))
        })
    }
}

/// Immediate-mode drawing into a frame, with a translation stack.
///
/// Coordinates are in pixels, origin bottom-left, y up, relative to the
/// sum of all pushed translations.
pub struct Painter<'a> {
    frame:  &'a mut FrameBuffer,
    stack:  Vec<(i64, i64)>,
    origin: (i64, i64),
}

impl<'a> Painter<'a> {
    pub fn new(frame: &'a mut FrameBuffer) -> Self {
        Self { frame, stack: Vec::new(), origin: (0, 0) }
    }

    pub fn push_translation(&mut self, dx: i64, dy: i64) {
        self.stack.push(self.origin);
        self.origin = (self.origin.0 + dx, self.origin.1 + dy);
    }

    pub fn pop_translation(&mut self) {
        if let Some(previous) = self.stack.pop() {
            self.origin = previous;
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn frame(&self) -> &FrameBuffer {
        &*self.frame
    }

    pub fn point(&mut self, x: i64, y: i64, color: Rgba) {
        self.frame.blend_pixel(self.origin.0 + x, self.origin.1 + y, color);
    }

    /// Blit RGBA pixels with their bottom-left corner at (x, y).
    /// See `FrameBuffer::blit` for the stride convention.
    pub fn blit(&mut self, src: &[u8], width: u32, height: u32, stride: isize, x: i64, y: i64) {
        self.frame.blit(src, width, height, stride, self.origin.0 + x, self.origin.1 + y);
    }

    /// Axis-aligned filled rectangle with its bottom-left corner at (x, y).
    pub fn fill_rect(&mut self, x: i64, y: i64, w: u32, h: u32, color: Rgba) {
        for py in y..y + h as i64 {
            for px in x..x + w as i64 {
                self.point(px, py, color);
            }
        }
    }

    /// Draw a non-negative number with the built-in 3x5 digit font.
    /// Returns the drawn width in pixels.
    pub fn digits(&mut self, x: i64, y: i64, text: &str, scale: u32, color: Rgba) -> i64 {
        let scale = scale.max(1) as i64;
        let mut cursor = x;
        for ch in text.chars() {
            let Some(rows) = glyph(ch) else {
                cursor += 2 * scale;
                continue;
            };
            for (r, bits) in rows.iter().enumerate() {
                // Glyph rows are listed top-down; frame y grows upward.
                let gy = y + (4 - r as i64) * scale;
                for col in 0..3 {
                    if bits & (0b100 >> col) != 0 {
                        self.fill_rect(cursor + col * scale, gy, scale as u32, scale as u32, color);
                    }
                }
            }
            cursor += 4 * scale;
        }
        cursor - x
    }
}

fn glyph(ch: char) -> Option<[u8; 5]> {
    let rows = match ch {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        _ => return None,
    };
    Some(rows)
}
