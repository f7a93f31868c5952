// src/picking/id_buffer.rs
// Identification render target: colour-encoded grid tiles for pixel picking
// Rasterizes terrain triangles into RGBA8 and reads single pixels back

use glam::{Mat4, Vec4};

/// Vertex format for id rendering
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct IdVertex {
    pub position: [f32; 3],
}

impl IdVertex {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
        }
    }
}

/// Blue channel of the lower-left half-triangle `k, l, m`.
pub const LOWER_TRIANGLE_BLUE: f32 = 0.25;
/// Blue channel of the upper-right half-triangle `l, n, m`.
pub const UPPER_TRIANGLE_BLUE: f32 = 0.75;

/// Flat colour of one id triangle, channels in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IdColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// Tile indices and half-triangle decoded from an id pixel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IdCell {
    pub tile_i: usize,
    pub tile_j: usize,
    pub upper: bool,
}

impl IdColor {
    /// Background clear colour; never decodes to a cell.
    pub const BACKGROUND: IdColor = IdColor {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    /// Colour for tile `(tile_i, tile_j)` quantised in `levels` steps.
    pub fn encode(tile_i: usize, tile_j: usize, upper: bool, levels: f32) -> Self {
        Self {
            r: tile_i as f32 / levels,
            g: tile_j as f32 / levels,
            b: if upper {
                UPPER_TRIANGLE_BLUE
            } else {
                LOWER_TRIANGLE_BLUE
            },
        }
    }

    /// Recover the tile, or `None` for background and foreign colours.
    pub fn decode(&self, levels: f32) -> Option<IdCell> {
        if self.r == 1.0 || self.g == 1.0 || !(self.b > 0.2 && self.b < 0.8) {
            return None;
        }
        Some(IdCell {
            tile_i: (levels * self.r).round().max(0.0) as usize,
            tile_j: (levels * self.g).round().max(0.0) as usize,
            upper: self.b >= 0.5,
        })
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), 255]
    }

    pub fn from_rgba8(px: [u8; 4]) -> Self {
        Self {
            r: f32::from(px[0]) / 255.0,
            g: f32::from(px[1]) / 255.0,
            b: f32::from(px[2]) / 255.0,
        }
    }
}

/// Render target used by the pick resolver and the view bounds pass.
///
/// Pixel `(0, 0)` is the bottom-left corner of the window.
pub trait IdRasterizer {
    /// Viewport size in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Clear to the background colour and set the clip transform.
    fn clear(&mut self, view_projection: Mat4, depth_test: bool);

    /// Fill one flat-coloured triangle.
    fn draw_triangle(&mut self, vertices: &[IdVertex; 3], color: IdColor);

    /// Colour at a pixel, `None` outside the viewport.
    fn read_pixel(&self, x: u32, y: u32) -> Option<IdColor>;
}

/// CPU id buffer with RGBA8 colour and f32 depth storage.
///
/// Triangles are rasterized with edge functions at pixel centres; there is
/// no near/far clipping, and triangles with a vertex behind the eye are
/// dropped.
#[derive(Debug, Clone)]
pub struct SoftwareIdBuffer {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
    depth: Vec<f32>,
    view_projection: Mat4,
    depth_test: bool,
    triangles_drawn: usize,
}

impl SoftwareIdBuffer {
    /// Create a new id buffer
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: vec![IdColor::BACKGROUND.to_rgba8(); count],
            depth: vec![f32::INFINITY; count],
            view_projection: Mat4::IDENTITY,
            depth_test: false,
            triangles_drawn: 0,
        }
    }

    /// Reallocate storage for a new viewport size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width.max(1), height.max(1)) != (self.width, self.height) {
            *self = Self::new(width, height);
        }
    }

    /// Triangles that reached the rasterizer since the last clear.
    pub fn triangles_drawn(&self) -> usize {
        self.triangles_drawn
    }

    /// Raw RGBA8 bytes, bottom row first.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    fn to_window(&self, v: &IdVertex) -> Option<[f32; 3]> {
        let clip = self.view_projection
            * Vec4::new(v.position[0], v.position[1], v.position[2], 1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some([
            0.5 * (ndc.x + 1.0) * self.width as f32,
            0.5 * (ndc.y + 1.0) * self.height as f32,
            ndc.z,
        ])
    }
}

#[inline]
fn edge(a: [f32; 3], b: [f32; 3], px: f32, py: f32) -> f32 {
    (b[0] - a[0]) * (py - a[1]) - (b[1] - a[1]) * (px - a[0])
}

impl IdRasterizer for SoftwareIdBuffer {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, view_projection: Mat4, depth_test: bool) {
        self.pixels.fill(IdColor::BACKGROUND.to_rgba8());
        self.depth.fill(f32::INFINITY);
        self.view_projection = view_projection;
        self.depth_test = depth_test;
        self.triangles_drawn = 0;
    }

    fn draw_triangle(&mut self, vertices: &[IdVertex; 3], color: IdColor) {
        let (a, b, c) = match (
            self.to_window(&vertices[0]),
            self.to_window(&vertices[1]),
            self.to_window(&vertices[2]),
        ) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return,
        };
        let area = edge(a, b, c[0], c[1]);
        if area == 0.0 || !area.is_finite() {
            return;
        }
        self.triangles_drawn += 1;

        let xmin = a[0].min(b[0]).min(c[0]).floor().max(0.0) as u32;
        let ymin = a[1].min(b[1]).min(c[1]).floor().max(0.0) as u32;
        let xmax = (a[0].max(b[0]).max(c[0]).ceil() as i64).min(i64::from(self.width) - 1);
        let ymax = (a[1].max(b[1]).max(c[1]).ceil() as i64).min(i64::from(self.height) - 1);
        if xmax < 0 || ymax < 0 {
            return;
        }
        let rgba = color.to_rgba8();
        let inv_area = 1.0 / area;

        for y in ymin..=ymax as u32 {
            let py = y as f32 + 0.5;
            for x in xmin..=xmax as u32 {
                let px = x as f32 + 0.5;
                // barycentric weights, sign-normalised for either winding
                let w0 = edge(b, c, px, py) * inv_area;
                let w1 = edge(c, a, px, py) * inv_area;
                let w2 = edge(a, b, px, py) * inv_area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let idx = y as usize * self.width as usize + x as usize;
                let z = w0 * a[2] + w1 * b[2] + w2 * c[2];
                if self.depth_test && z >= self.depth[idx] {
                    continue;
                }
                self.depth[idx] = z;
                self.pixels[idx] = rgba;
            }
        }
    }

    fn read_pixel(&self, x: u32, y: u32) -> Option<IdColor> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.width as usize + x as usize;
        Some(IdColor::from_rgba8(self.pixels[idx]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_all_tiles() {
        let levels = 16.0;
        for ti in 0..15 {
            for tj in [0usize, 7, 14] {
                for upper in [false, true] {
                    let color = IdColor::encode(ti, tj, upper, levels);
                    let read = IdColor::from_rgba8(color.to_rgba8());
                    let cell = read.decode(levels).unwrap();
                    assert_eq!(cell, IdCell { tile_i: ti, tile_j: tj, upper });
                }
            }
        }
        assert_eq!(IdColor::BACKGROUND.decode(levels), None);
    }

    #[test]
    fn test_triangle_covers_interior_pixels_only() {
        let mut buffer = SoftwareIdBuffer::new(10, 10);
        buffer.clear(Mat4::IDENTITY, false);
        let color = IdColor::encode(3, 4, false, 16.0);
        // lower-left half of the viewport in NDC
        buffer.draw_triangle(
            &[
                IdVertex::new(-1.0, -1.0, 0.0),
                IdVertex::new(1.0, -1.0, 0.0),
                IdVertex::new(-1.0, 1.0, 0.0),
            ],
            color,
        );
        assert_eq!(buffer.triangles_drawn(), 1);
        assert_eq!(buffer.read_pixel(1, 1).unwrap().decode(16.0).unwrap().tile_i, 3);
        assert_eq!(buffer.read_pixel(8, 8).unwrap(), IdColor::from_rgba8([255; 4]));
        assert_eq!(buffer.read_pixel(10, 0), None);
        assert_eq!(buffer.as_bytes().len(), 400);
    }

    #[test]
    fn test_depth_test_keeps_nearest() {
        let mut buffer = SoftwareIdBuffer::new(4, 4);
        let tri = |z: f32| {
            [
                IdVertex::new(-1.0, -1.0, z),
                IdVertex::new(3.0, -1.0, z),
                IdVertex::new(-1.0, 3.0, z),
            ]
        };
        let near = IdColor::encode(1, 1, false, 16.0);
        let far = IdColor::encode(2, 2, true, 16.0);

        buffer.clear(Mat4::IDENTITY, true);
        buffer.draw_triangle(&tri(-0.5), near);
        buffer.draw_triangle(&tri(0.5), far);
        assert_eq!(buffer.read_pixel(2, 2).unwrap().decode(16.0).unwrap().tile_i, 1);

        buffer.clear(Mat4::IDENTITY, false);
        buffer.draw_triangle(&tri(-0.5), near);
        buffer.draw_triangle(&tri(0.5), far);
        assert_eq!(buffer.read_pixel(2, 2).unwrap().decode(16.0).unwrap().tile_i, 2);
    }
}
