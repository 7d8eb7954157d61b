//! The drawing surface every plot writes into.
//!
//! A [`Figure`] owns a list of [`Panel`]s. Each panel maps a data-space
//! window (`xlim`, `ylim`) onto a pixel frame and records draw commands as
//! [`Primitive`]s; nothing is rasterized until a renderer consumes the figure.

use crate::color::Rgb;

pub type Point = (f64, f64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

/// Font size is in points, rotation in degrees counter-clockwise around the anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub size: f64,
    pub color: Rgb,
    pub rotation: f64,
    pub halign: HAlign,
    pub valign: VAlign,
}

impl TextStyle {
    pub fn new(size: f64) -> Self {
        TextStyle {
            size,
            color: Rgb::BLACK,
            rotation: 0.0,
            halign: HAlign::Left,
            valign: VAlign::Bottom,
        }
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn align(mut self, halign: HAlign, valign: VAlign) -> Self {
        self.halign = halign;
        self.valign = valign;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
}

/// One recorded draw command, in data coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Open polyline; a plain segment has two points. Width is in points.
    Line {
        points: Vec<Point>,
        color: Rgb,
        width: f64,
        style: LineStyle,
        alpha: f64,
    },
    Polygon {
        points: Vec<Point>,
        fill: Rgb,
        alpha: f64,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Rgb,
        edge: Option<Rgb>,
    },
    Text {
        at: Point,
        text: String,
        style: TextStyle,
    },
    /// Filled circle; `size` is the marker area in points squared.
    Marker { at: Point, color: Rgb, size: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisSide {
    Bottom,
    Top,
    Left,
    Right,
}

/// Tick positions and labels for one axis of a panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub side: AxisSide,
    pub ticks: Vec<f64>,
    pub labels: Vec<String>,
    pub label_size: f64,
    pub label_rotation: f64,
    pub show_marks: bool,
    pub show_labels: bool,
    pub title: Option<String>,
    pub title_size: f64,
}

impl Axis {
    pub fn new(side: AxisSide, ticks: Vec<f64>, labels: Vec<String>) -> Self {
        Axis {
            side,
            ticks,
            labels,
            label_size: 8.0,
            label_rotation: 0.0,
            show_marks: true,
            show_labels: true,
            title: None,
            title_size: 10.0,
        }
    }

    pub fn numeric(side: AxisSide, ticks: Vec<f64>) -> Self {
        let labels = ticks.iter().map(|t| format_tick(*t)).collect();
        Axis::new(side, ticks, labels)
    }
}

/// Shortest decimal rendering of a tick value.
pub fn format_tick(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        let s = format!("{:.3}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Evenly spaced "nice" ticks covering `[lo, hi]`.
pub fn nice_ticks(lo: f64, hi: f64) -> Vec<f64> {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let total = hi - lo;
    if total <= f64::EPSILON {
        return vec![lo];
    }

    let magnitude = 10.0f64.powf(total.log10().floor());
    let normalized = total / magnitude;
    let step = if normalized < 2.0 {
        0.2
    } else if normalized < 5.0 {
        0.5
    } else {
        1.0
    } * magnitude;

    let first = (lo / step).ceil() as i64;
    let last = (hi / step + 1e-9).floor() as i64;
    (first..=last).map(|k| k as f64 * step).collect()
}

/// Most ticks [`step_ticks`] returns before it coarsens the step.
pub const MAX_STEP_TICKS: usize = 100;

/// Ticks `0, step, 2*step, ...` strictly below `end`. The step grows tenfold
/// until at most [`MAX_STEP_TICKS`] remain; a non-finite `end` gives no ticks.
pub fn step_ticks(step: f64, end: f64) -> Vec<f64> {
    if !end.is_finite() || !step.is_finite() || step <= 0.0 || end <= 0.0 {
        return Vec::new();
    }
    let mut step = step;
    while end / step > MAX_STEP_TICKS as f64 {
        step *= 10.0;
    }
    (0..=MAX_STEP_TICKS)
        .map(|k| k as f64 * step)
        .take_while(|t| *t < end)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spines {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl Default for Spines {
    fn default() -> Self {
        Spines { top: true, bottom: true, left: true, right: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendSymbol {
    Marker,
    Line,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb,
    pub symbol: LegendSymbol,
}

/// A legend is drawn outside the right edge of its panel, top aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub title: Option<String>,
    pub entries: Vec<LegendEntry>,
    pub font_size: f64,
    pub title_size: f64,
}

/// Pixel rectangle of a panel inside its figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Frame { left, top, width, height }
    }

    /// Largest centred square that fits in this frame.
    pub fn square(self) -> Frame {
        let side = self.width.min(self.height);
        Frame {
            left: self.left + (self.width - side) / 2.0,
            top: self.top + (self.height - side) / 2.0,
            width: side,
            height: side,
        }
    }
}

/// An axes-like region: a data window mapped onto a pixel frame plus the
/// primitives drawn in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub frame: Frame,
    pub xlim: (f64, f64),
    pub ylim: (f64, f64),
    pub primitives: Vec<Primitive>,
    pub x_axis: Option<Axis>,
    pub y_axis: Option<Axis>,
    pub spines: Spines,
    pub legends: Vec<Legend>,
}

impl Panel {
    pub fn new(frame: Frame) -> Self {
        Panel {
            frame,
            xlim: (0.0, 1.0),
            ylim: (0.0, 1.0),
            primitives: Vec::new(),
            x_axis: None,
            y_axis: None,
            spines: Spines::default(),
            legends: Vec::new(),
        }
    }

    pub fn set_xlim(&mut self, lo: f64, hi: f64) {
        self.xlim = (lo, hi);
    }

    pub fn set_ylim(&mut self, lo: f64, hi: f64) {
        self.ylim = (lo, hi);
    }

    pub fn hide_spines(&mut self, sides: &[AxisSide]) {
        for side in sides {
            match side {
                AxisSide::Top => self.spines.top = false,
                AxisSide::Bottom => self.spines.bottom = false,
                AxisSide::Left => self.spines.left = false,
                AxisSide::Right => self.spines.right = false,
            }
        }
    }

    pub fn hide_all_spines(&mut self) {
        self.spines = Spines { top: false, bottom: false, left: false, right: false };
    }

    pub fn set_xticks(&mut self, axis: Axis) {
        self.x_axis = Some(axis);
    }

    pub fn set_yticks(&mut self, axis: Axis) {
        self.y_axis = Some(axis);
    }

    /// Remove both tick sets (marks and labels).
    pub fn hide_ticks(&mut self) {
        self.x_axis = None;
        self.y_axis = None;
    }

    pub fn line(&mut self, from: Point, to: Point, color: Rgb, width: f64) {
        self.polyline(vec![from, to], color, width);
    }

    pub fn dashed_line(&mut self, from: Point, to: Point, color: Rgb, width: f64) {
        self.primitives.push(Primitive::Line {
            points: vec![from, to],
            color,
            width,
            style: LineStyle::Dashed,
            alpha: 1.0,
        });
    }

    pub fn polyline(&mut self, points: Vec<Point>, color: Rgb, width: f64) {
        self.primitives.push(Primitive::Line {
            points,
            color,
            width,
            style: LineStyle::Solid,
            alpha: 1.0,
        });
    }

    pub fn translucent_line(&mut self, from: Point, to: Point, color: Rgb, width: f64, alpha: f64) {
        self.primitives.push(Primitive::Line {
            points: vec![from, to],
            color,
            width,
            style: LineStyle::Solid,
            alpha,
        });
    }

    pub fn polygon(&mut self, points: Vec<Point>, fill: Rgb) {
        self.primitives.push(Primitive::Polygon { points, fill, alpha: 1.0 });
    }

    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, fill: Rgb, edge: Option<Rgb>) {
        self.primitives.push(Primitive::Rect { x, y, width, height, fill, edge });
    }

    pub fn text(&mut self, at: Point, text: impl Into<String>, style: TextStyle) {
        self.primitives.push(Primitive::Text { at, text: text.into(), style });
    }

    pub fn scatter(&mut self, at: Point, color: Rgb, size: f64) {
        self.primitives.push(Primitive::Marker { at, color, size });
    }

    pub fn add_legend(&mut self, legend: Legend) {
        self.legends.push(legend);
    }

    /// Map a data point to figure pixels (y grows downwards).
    pub fn to_pixel(&self, (x, y): Point) -> Point {
        let (x0, x1) = self.xlim;
        let (y0, y1) = self.ylim;
        let fx = if x1 != x0 { (x - x0) / (x1 - x0) } else { 0.5 };
        let fy = if y1 != y0 { (y - y0) / (y1 - y0) } else { 0.5 };
        (
            self.frame.left + fx * self.frame.width,
            self.frame.top + (1.0 - fy) * self.frame.height,
        )
    }

    /// Pixel length of one data unit along x, ignoring direction.
    pub fn x_scale(&self) -> f64 {
        let span = (self.xlim.1 - self.xlim.0).abs();
        if span > 0.0 { self.frame.width / span } else { 1.0 }
    }

    pub fn y_scale(&self) -> f64 {
        let span = (self.ylim.1 - self.ylim.0).abs();
        if span > 0.0 { self.frame.height / span } else { 1.0 }
    }
}

/// A whole image: pixel size, resolution and its panels, drawn in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub width: u32,
    pub height: u32,
    pub dpi: f64,
    pub background: Rgb,
    pub panels: Vec<Panel>,
}

impl Figure {
    pub fn new(width: u32, height: u32, dpi: f64) -> Self {
        Figure { width, height, dpi, background: Rgb::WHITE, panels: Vec::new() }
    }

    /// Pixels per typographic point.
    pub fn px_per_pt(&self) -> f64 {
        self.dpi / 72.0
    }

    pub fn add_panel(&mut self, panel: Panel) -> usize {
        self.panels.push(panel);
        self.panels.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_pixel_flips_y_and_honours_reversed_limits() {
        let mut panel = Panel::new(Frame::new(10.0, 20.0, 100.0, 50.0));
        panel.set_xlim(0.0, 10.0);
        panel.set_ylim(0.0, 5.0);
        assert_eq!(panel.to_pixel((0.0, 0.0)), (10.0, 70.0));
        assert_eq!(panel.to_pixel((10.0, 5.0)), (110.0, 20.0));

        panel.set_xlim(10.0, 0.0);
        assert_eq!(panel.to_pixel((10.0, 0.0)), (10.0, 70.0));
        assert_eq!(panel.to_pixel((0.0, 0.0)), (110.0, 70.0));
    }

    #[test]
    fn nice_ticks_cover_range() {
        assert_eq!(nice_ticks(0.0, 10.0), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        let ticks = nice_ticks(0.0, 340.0);
        assert_eq!(ticks.first(), Some(&0.0));
        assert_eq!(ticks.last(), Some(&300.0));
        assert_eq!(nice_ticks(3.0, 3.0), vec![3.0]);
    }

    #[test]
    fn step_ticks_stay_bounded() {
        assert_eq!(step_ticks(1.0, 3.0), vec![0.0, 1.0, 2.0]);
        assert_eq!(step_ticks(0.5, 1.2), vec![0.0, 0.5, 1.0]);
        let coarse = step_ticks(1.0, 1e12);
        assert!(coarse.len() <= MAX_STEP_TICKS);
        assert_eq!(coarse[1], 1e10);
        assert!(step_ticks(1.0, f64::INFINITY).is_empty());
        assert!(step_ticks(1.0, f64::NAN).is_empty());
    }

    #[test]
    fn formats_ticks_compactly() {
        assert_eq!(format_tick(2.0), "2");
        assert_eq!(format_tick(0.5), "0.5");
        assert_eq!(format_tick(-1.25), "-1.25");
    }

    #[test]
    fn square_frame_is_centred() {
        let sq = Frame::new(0.0, 0.0, 200.0, 100.0).square();
        assert_eq!(sq, Frame::new(50.0, 0.0, 100.0, 100.0));
    }
}
