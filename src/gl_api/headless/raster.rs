//! Software framebuffer and triangle fill.

/// Window-space rectangle set by `glViewport`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    /// Maps a normalized device coordinate to window space.
    pub fn to_window(&self, ndc: [f32; 2]) -> [f32; 2] {
        [
            self.x as f32 + (ndc[0] + 1.0) * 0.5 * self.width as f32,
            self.y as f32 + (ndc[1] + 1.0) * 0.5 * self.height as f32,
        ]
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RasterVertex {
    /// Clip-space position; `w` is always 1 for the dialect we execute.
    pub position: [f32; 2],
    pub color: [f32; 3],
}

/// RGBA color buffer with GL's bottom-left origin.
#[derive(Clone, Debug, PartialEq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Framebuffer {
            width,
            height,
            pixels: vec![[0.0, 0.0, 0.0, 0.0]; width as usize * height as usize],
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel at window coordinates `(x, y)`, `y` counted from the bottom row.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x < self.width && y < self.height {
            Some(self.pixels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    pub fn clear(&mut self, color: [f32; 4]) {
        let color = color.map(|c| c.clamp(0.0, 1.0));
        for pixel in &mut self.pixels {
            *pixel = color;
        }
    }

    /// 8-bit RGBA rows ordered top to bottom, ready for image export.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for row in self.pixels.chunks(self.width.max(1) as usize).rev() {
            for pixel in row {
                out.extend(pixel.iter().map(|&c| (c.clamp(0.0, 1.0) * 255.0).round() as u8));
            }
        }
        out
    }

    /// Fills one triangle, interpolating vertex colors. Pixels are covered
    /// when their center lies inside the triangle; winding does not matter.
    /// Returns the number of pixels written.
    pub fn fill_triangle(&mut self, viewport: Viewport, vertices: &[RasterVertex; 3]) -> usize {
        let [a, b, c] = [
            viewport.to_window(vertices[0].position),
            viewport.to_window(vertices[1].position),
            viewport.to_window(vertices[2].position),
        ];

        let mut area = edge(a, b, c);
        if area == 0.0 || !area.is_finite() {
            return 0;
        }
        let sign = area.signum();
        area *= sign;

        // Clip to both the viewport and the framebuffer.
        let min_x = viewport.x.max(0) as f32;
        let min_y = viewport.y.max(0) as f32;
        let max_x = ((viewport.x as i64 + viewport.width as i64) as f32).min(self.width as f32);
        let max_y = ((viewport.y as i64 + viewport.height as i64) as f32).min(self.height as f32);

        let x0 = a[0].min(b[0]).min(c[0]).floor().max(min_x);
        let y0 = a[1].min(b[1]).min(c[1]).floor().max(min_y);
        let x1 = a[0].max(b[0]).max(c[0]).ceil().min(max_x);
        let y1 = a[1].max(b[1]).max(c[1]).ceil().min(max_y);
        if x0 >= x1 || y0 >= y1 {
            return 0;
        }

        let mut written = 0;
        for y in y0 as u32..y1 as u32 {
            for x in x0 as u32..x1 as u32 {
                let p = [x as f32 + 0.5, y as f32 + 0.5];
                let w0 = edge(b, c, p) * sign;
                let w1 = edge(c, a, p) * sign;
                let w2 = edge(a, b, p) * sign;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let mut color = [0.0, 0.0, 0.0, 1.0];
                for channel in 0..3 {
                    let value = w0 * vertices[0].color[channel]
                        + w1 * vertices[1].color[channel]
                        + w2 * vertices[2].color[channel];
                    color[channel] = (value / area).clamp(0.0, 1.0);
                }
                self.pixels[(y * self.width + x) as usize] = color;
                written += 1;
            }
        }
        written
    }
}

/// Twice the signed area of `(a, b, p)`; positive when counter-clockwise.
fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(width: i32, height: i32) -> Viewport {
        Viewport { x: 0, y: 0, width, height }
    }

    fn vertex(x: f32, y: f32, color: [f32; 3]) -> RasterVertex {
        RasterVertex { position: [x, y], color }
    }

    #[test]
    fn ndc_maps_to_window() {
        let viewport = Viewport { x: 10, y: 20, width: 100, height: 50 };
        assert_eq!(viewport.to_window([-1.0, -1.0]), [10.0, 20.0]);
        assert_eq!(viewport.to_window([1.0, 1.0]), [110.0, 70.0]);
        assert_eq!(viewport.to_window([0.0, 0.0]), [60.0, 45.0]);
    }

    #[test]
    fn fills_regardless_of_winding() {
        let red = [1.0, 0.0, 0.0];
        let ccw = [vertex(-1.0, -1.0, red), vertex(1.0, -1.0, red), vertex(-1.0, 1.0, red)];
        let cw = [ccw[0], ccw[2], ccw[1]];

        let mut a = Framebuffer::new(8, 8);
        let mut b = Framebuffer::new(8, 8);
        let written = a.fill_triangle(full(8, 8), &ccw);
        assert!(written > 0);
        assert_eq!(written, b.fill_triangle(full(8, 8), &cw));
        assert_eq!(a.to_rgba8(), b.to_rgba8());
        let corner = a.pixel(0, 0).unwrap();
        assert!(corner[0] > 0.999 && corner[1] == 0.0 && corner[3] == 1.0);
        assert_eq!(a.pixel(7, 7), Some([0.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn interpolates_colors() {
        let mut fb = Framebuffer::new(64, 64);
        let vertices = [
            vertex(-1.0, -1.0, [1.0, 0.0, 0.0]),
            vertex(3.0, -1.0, [1.0, 0.0, 0.0]),
            vertex(-1.0, 3.0, [0.0, 0.0, 1.0]),
        ];
        fb.fill_triangle(full(64, 64), &vertices);
        let bottom = fb.pixel(32, 0).unwrap();
        let top = fb.pixel(32, 63).unwrap();
        assert!(bottom[0] > top[0]);
        assert!(top[2] > bottom[2]);
    }

    #[test]
    fn degenerate_triangles_write_nothing() {
        let mut fb = Framebuffer::new(4, 4);
        let white = [1.0; 3];
        let line = [vertex(-1.0, -1.0, white), vertex(0.0, 0.0, white), vertex(1.0, 1.0, white)];
        assert_eq!(fb.fill_triangle(full(4, 4), &line), 0);
    }

    #[test]
    fn respects_viewport() {
        let mut fb = Framebuffer::new(8, 8);
        let green = [0.0, 1.0, 0.0];
        let cover = [vertex(-1.0, -1.0, green), vertex(3.0, -1.0, green), vertex(-1.0, 3.0, green)];
        let written = fb.fill_triangle(Viewport { x: 0, y: 0, width: 4, height: 4 }, &cover);
        assert_eq!(written, 16);
        assert_eq!(fb.pixel(4, 4), Some([0.0; 4]));
    }

    #[test]
    fn far_offset_viewport_writes_nothing() {
        let mut fb = Framebuffer::new(8, 8);
        let white = [1.0; 3];
        let cover = [vertex(-1.0, -1.0, white), vertex(3.0, -1.0, white), vertex(-1.0, 3.0, white)];
        let viewport = Viewport { x: i32::MAX - 500, y: 0, width: 4000, height: 4000 };
        assert_eq!(fb.fill_triangle(viewport, &cover), 0);
        assert_eq!(fb.pixel(0, 0), Some([0.0; 4]));
    }

    #[test]
    fn export_is_top_down() {
        let mut fb = Framebuffer::new(1, 2);
        fb.clear([0.0, 0.0, 0.0, 1.0]);
        fb.pixels[0] = [1.0, 1.0, 1.0, 1.0]; // bottom row
        assert_eq!(fb.to_rgba8(), vec![0, 0, 0, 255, 255, 255, 255, 255]);
    }
}
