use image::RgbImage;
use log::debug;

use crate::color::Rgb;
use crate::figure::{Figure, HAlign, Point, VAlign};

use super::font::glyph;
use super::{flatten, Op};

/// Glyph cell width including one column of spacing.
const GLYPH_ADVANCE: u32 = 6;
const GLYPH_ROWS: u32 = 8;

/// RGBA pixel buffer with the handful of fill routines the renderer needs.
pub struct Canvas {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        let mut buffer = vec![255u8; (width * height * 4) as usize];
        for px in buffer.chunks_mut(4) {
            px[0] = background.0;
            px[1] = background.1;
            px[2] = background.2;
        }
        Canvas { width, height, buffer }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        Some(Rgb(self.buffer[idx], self.buffer[idx + 1], self.buffer[idx + 2]))
    }

    fn blend(&mut self, x: i64, y: i64, c: Rgb, alpha: f64) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
        if alpha >= 1.0 {
            self.buffer[idx] = c.0;
            self.buffer[idx + 1] = c.1;
            self.buffer[idx + 2] = c.2;
        } else {
            let mix = |dst: u8, src: u8| (dst as f64 * (1.0 - alpha) + src as f64 * alpha).round() as u8;
            self.buffer[idx] = mix(self.buffer[idx], c.0);
            self.buffer[idx + 1] = mix(self.buffer[idx + 1], c.1);
            self.buffer[idx + 2] = mix(self.buffer[idx + 2], c.2);
        }
        self.buffer[idx + 3] = 255;
    }

    /// Square brush of side `width` centred on `(x, y)`.
    fn stamp(&mut self, x: f64, y: f64, width: f64, c: Rgb, alpha: f64) {
        if width <= 1.5 {
            self.blend(x.round() as i64, y.round() as i64, c, alpha);
            return;
        }
        let half = width / 2.0;
        let x0 = (x - half).round() as i64;
        let x1 = (x + half).round() as i64;
        let y0 = (y - half).round() as i64;
        let y1 = (y + half).round() as i64;
        for py in y0..y1.max(y0 + 1) {
            for px in x0..x1.max(x0 + 1) {
                self.blend(px, py, c, alpha);
            }
        }
    }

    pub fn draw_line(&mut self, a: Point, b: Point, width: f64, c: Rgb, dashed: bool, alpha: f64) {
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        let dash_on = (width * 3.7).max(3.0);
        let dash_period = dash_on + (width * 1.6).max(2.0);
        let step_len = (dx * dx + dy * dy).sqrt() / steps as f64;
        let mut travelled = 0.0;
        let mut last: Option<(i64, i64)> = None;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let (x, y) = (a.0 + dx * t, a.1 + dy * t);
            let visible = !dashed || (travelled % dash_period) < dash_on;
            travelled += step_len;
            let key = (x.round() as i64, y.round() as i64);
            // translucent strokes must not blend the same pixel twice
            if alpha < 1.0 && last == Some(key) {
                continue;
            }
            last = Some(key);
            if visible {
                self.stamp(x, y, width, c, alpha);
            }
        }
    }

    /// Even-odd scanline fill.
    pub fn fill_polygon(&mut self, points: &[Point], c: Rgb, alpha: f64) {
        if points.len() < 3 {
            return;
        }
        let min_y = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min).floor().max(0.0) as i64;
        let max_y = points
            .iter()
            .map(|p| p.1)
            .fold(f64::NEG_INFINITY, f64::max)
            .ceil()
            .min(self.height as f64) as i64;

        let mut crossings: Vec<f64> = Vec::new();
        for y in min_y..max_y {
            let sy = y as f64 + 0.5;
            crossings.clear();
            for i in 0..points.len() {
                let (x0, y0) = points[i];
                let (x1, y1) = points[(i + 1) % points.len()];
                if (y0 <= sy && y1 > sy) || (y1 <= sy && y0 > sy) {
                    crossings.push(x0 + (sy - y0) / (y1 - y0) * (x1 - x0));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for pair in crossings.chunks(2) {
                if let [start, end] = pair {
                    let xs = start.round() as i64;
                    let xe = end.round() as i64;
                    for x in xs..xe {
                        self.blend(x, y, c, alpha);
                    }
                }
            }
        }
    }

    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, c: Rgb) {
        let x0 = x.round() as i64;
        let y0 = y.round() as i64;
        let x1 = (x + width).round() as i64;
        let y1 = (y + height).round() as i64;
        for py in y0..y1.max(y0 + 1) {
            for px in x0..x1.max(x0 + 1) {
                self.blend(px, py, c, 1.0);
            }
        }
    }

    pub fn fill_circle(&mut self, center: Point, radius: f64, c: Rgb) {
        let r = radius.max(0.5);
        let (cx, cy) = center;
        for py in (cy - r).floor() as i64..=(cy + r).ceil() as i64 {
            for px in (cx - r).floor() as i64..=(cx + r).ceil() as i64 {
                let dx = px as f64 + 0.5 - cx;
                let dy = py as f64 + 0.5 - cy;
                if dx * dx + dy * dy <= r * r {
                    self.blend(px, py, c, 1.0);
                }
            }
        }
    }

    /// Bitmap text, scaled to `size` pixels and rotated counter-clockwise around `at`.
    pub fn draw_text(
        &mut self,
        at: Point,
        text: &str,
        size: f64,
        c: Rgb,
        rotation: f64,
        halign: HAlign,
        valign: VAlign,
    ) {
        let ratio = ((size / GLYPH_ROWS as f64).round() as u32).max(1);
        let n = text.chars().count() as u32;
        let box_w = (n * GLYPH_ADVANCE * ratio) as f64;
        let box_h = (GLYPH_ROWS * ratio) as f64;

        let ox = match halign {
            HAlign::Left => 0.0,
            HAlign::Center => -box_w / 2.0,
            HAlign::Right => -box_w,
        };
        let oy = match valign {
            VAlign::Top => 0.0,
            VAlign::Center => -box_h / 2.0,
            VAlign::Bottom => -box_h,
        };

        let theta = rotation.to_radians();
        let (sin, cos) = theta.sin_cos();
        // screen y points down, so a counter-clockwise turn uses the transposed matrix
        let place = |lx: f64, ly: f64| (at.0 + lx * cos + ly * sin, at.1 - lx * sin + ly * cos);
        let sub = if rotation == 0.0 { 1.0 } else { 0.5 };
        let per_cell = (ratio as f64 / sub) as u32;

        for (i, ch) in text.chars().enumerate() {
            let rows = glyph(ch);
            let base_x = ox + (i as u32 * GLYPH_ADVANCE * ratio) as f64;
            for (row_idx, &row) in rows.iter().enumerate() {
                for col in 0..8u32 {
                    if (row >> (7 - col)) & 1 == 0 {
                        continue;
                    }
                    let cell_x = base_x + (col * ratio) as f64;
                    let cell_y = oy + (row_idx as u32 * ratio) as f64;
                    for sy in 0..per_cell {
                        for sx in 0..per_cell {
                            let (px, py) = place(cell_x + sx as f64 * sub, cell_y + sy as f64 * sub);
                            self.blend(px.round() as i64, py.round() as i64, c, 1.0);
                        }
                    }
                }
            }
        }
    }

    pub fn into_rgb(self) -> RgbImage {
        let mut rgb_pixels = Vec::with_capacity((self.width * self.height * 3) as usize);
        for chunk in self.buffer.chunks(4) {
            rgb_pixels.extend_from_slice(&chunk[..3]);
        }
        RgbImage::from_raw(self.width, self.height, rgb_pixels)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }
}

/// Paint a figure into a pixel canvas.
pub fn rasterize(figure: &Figure) -> Canvas {
    let mut canvas = Canvas::new(figure.width, figure.height, figure.background);
    let ops = flatten(figure);
    debug!("Rasterizing {} draw operations", ops.len());

    for op in &ops {
        match op {
            Op::Line { points, color, width, dashed, alpha } => {
                for pair in points.windows(2) {
                    canvas.draw_line(pair[0], pair[1], *width, *color, *dashed, *alpha);
                }
            }
            Op::Polygon { points, fill, alpha } => canvas.fill_polygon(points, *fill, *alpha),
            Op::Rect { x, y, width, height, fill, edge } => {
                canvas.fill_rect(*x, *y, *width, *height, *fill);
                if let Some(edge) = edge {
                    let corners = [(*x, *y), (x + width, *y), (x + width, y + height), (*x, y + height), (*x, *y)];
                    for pair in corners.windows(2) {
                        canvas.draw_line(pair[0], pair[1], 1.0, *edge, false, 1.0);
                    }
                }
            }
            Op::Circle { center, radius, fill } => canvas.fill_circle(*center, *radius, *fill),
            Op::Text { at, text, size, color, rotation, halign, valign } => {
                canvas.draw_text(*at, text, *size, *color, *rotation, *halign, *valign)
            }
        }
    }
    canvas
}

pub fn render_image(figure: &Figure) -> RgbImage {
    rasterize(figure).into_rgb()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_line_paints_its_row() {
        let mut canvas = Canvas::new(10, 10, Rgb::WHITE);
        canvas.draw_line((1.0, 5.0), (8.0, 5.0), 1.0, Rgb::BLACK, false, 1.0);
        for x in 1..=8 {
            assert_eq!(canvas.pixel(x, 5), Some(Rgb::BLACK));
        }
        assert_eq!(canvas.pixel(0, 5), Some(Rgb::WHITE));
        assert_eq!(canvas.pixel(5, 4), Some(Rgb::WHITE));
    }

    #[test]
    fn polygon_fill_covers_interior_only() {
        let mut canvas = Canvas::new(20, 20, Rgb::WHITE);
        canvas.fill_polygon(&[(2.0, 2.0), (12.0, 2.0), (12.0, 12.0), (2.0, 12.0)], Rgb(255, 0, 0), 1.0);
        assert_eq!(canvas.pixel(5, 5), Some(Rgb(255, 0, 0)));
        assert_eq!(canvas.pixel(15, 15), Some(Rgb::WHITE));
    }

    #[test]
    fn translucent_fill_blends_with_background() {
        let mut canvas = Canvas::new(4, 4, Rgb::WHITE);
        canvas.fill_polygon(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)], Rgb::BLACK, 0.5);
        assert_eq!(canvas.pixel(1, 1), Some(Rgb(128, 128, 128)));
    }

    #[test]
    fn text_leaves_ink() {
        let mut canvas = Canvas::new(40, 20, Rgb::WHITE);
        canvas.draw_text((2.0, 2.0), "A", 8.0, Rgb::BLACK, 0.0, HAlign::Left, VAlign::Top);
        let inked = (0..40)
            .flat_map(|x| (0..20).map(move |y| (x, y)))
            .filter(|&(x, y)| canvas.pixel(x, y) == Some(Rgb::BLACK))
            .count();
        assert!(inked > 5);
    }
}
