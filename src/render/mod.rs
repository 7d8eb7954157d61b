//! Turning a [`Figure`] into pixels or SVG.
//!
//! Both back ends share [`flatten`], which resolves data coordinates, axes,
//! spines and legends into pixel-space [`Op`]s. The SVG writer serializes
//! those ops as vector elements, the raster writer paints them into an RGBA
//! buffer that is handed to the `image` crate.

mod font;
pub mod raster;
pub mod svg;

use std::fs::File;
use std::io::Write;
use std::path::Path;

use log::info;

use crate::color::Rgb;
use crate::error::Result;
use crate::figure::{AxisSide, Figure, HAlign, LegendSymbol, LineStyle, Panel, Point, Primitive, VAlign};

/// Tick mark length in points.
const TICK_LENGTH: f64 = 3.5;
/// Gap between a tick mark and its label, in points.
const TICK_PAD: f64 = 2.0;
const SPINE_WIDTH: f64 = 0.8;

/// A pixel-space draw operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Line {
        points: Vec<Point>,
        color: Rgb,
        width: f64,
        dashed: bool,
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
    Circle {
        center: Point,
        radius: f64,
        fill: Rgb,
    },
    Text {
        at: Point,
        text: String,
        size: f64,
        color: Rgb,
        rotation: f64,
        halign: HAlign,
        valign: VAlign,
    },
}

/// Rough rendered width of `text` at `size_px`, used for layout only.
pub fn text_width(text: &str, size_px: f64) -> f64 {
    text.chars().count() as f64 * size_px * 0.6
}

/// Resolve every panel of `figure` into pixel-space operations, in paint order.
pub fn flatten(figure: &Figure) -> Vec<Op> {
    let pt = figure.px_per_pt();
    let mut ops = Vec::new();
    for panel in &figure.panels {
        flatten_primitives(panel, pt, &mut ops);
        flatten_spines(panel, pt, &mut ops);
        flatten_axes(panel, pt, &mut ops);
        flatten_legends(panel, pt, &mut ops);
    }
    ops
}

fn flatten_primitives(panel: &Panel, pt: f64, ops: &mut Vec<Op>) {
    for prim in &panel.primitives {
        let op = match prim {
            Primitive::Line { points, color, width, style, alpha } => Op::Line {
                points: points.iter().map(|p| panel.to_pixel(*p)).collect(),
                color: *color,
                width: width * pt,
                dashed: *style == LineStyle::Dashed,
                alpha: *alpha,
            },
            Primitive::Polygon { points, fill, alpha } => Op::Polygon {
                points: points.iter().map(|p| panel.to_pixel(*p)).collect(),
                fill: *fill,
                alpha: *alpha,
            },
            Primitive::Rect { x, y, width, height, fill, edge } => {
                let (ax, ay) = panel.to_pixel((*x, *y));
                let (bx, by) = panel.to_pixel((x + width, y + height));
                Op::Rect {
                    x: ax.min(bx),
                    y: ay.min(by),
                    width: (bx - ax).abs(),
                    height: (by - ay).abs(),
                    fill: *fill,
                    edge: *edge,
                }
            }
            Primitive::Text { at, text, style } => Op::Text {
                at: panel.to_pixel(*at),
                text: text.clone(),
                size: style.size * pt,
                color: style.color,
                rotation: style.rotation,
                halign: style.halign,
                valign: style.valign,
            },
            Primitive::Marker { at, color, size } => Op::Circle {
                center: panel.to_pixel(*at),
                radius: size.max(0.0).sqrt() / 2.0 * pt,
                fill: *color,
            },
        };
        ops.push(op);
    }
}

fn flatten_spines(panel: &Panel, pt: f64, ops: &mut Vec<Op>) {
    let f = panel.frame;
    let (l, t, r, b) = (f.left, f.top, f.left + f.width, f.top + f.height);
    let edges = [
        (panel.spines.top, (l, t), (r, t)),
        (panel.spines.bottom, (l, b), (r, b)),
        (panel.spines.left, (l, t), (l, b)),
        (panel.spines.right, (r, t), (r, b)),
    ];
    for (visible, from, to) in edges {
        if visible {
            ops.push(Op::Line {
                points: vec![from, to],
                color: Rgb::BLACK,
                width: SPINE_WIDTH * pt,
                dashed: false,
                alpha: 1.0,
            });
        }
    }
}

fn within(value: f64, (a, b): (f64, f64)) -> bool {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let eps = (hi - lo).abs() * 1e-9;
    value >= lo - eps && value <= hi + eps
}

fn flatten_axes(panel: &Panel, pt: f64, ops: &mut Vec<Op>) {
    let f = panel.frame;
    let mark = TICK_LENGTH * pt;
    let pad = TICK_PAD * pt;

    if let Some(axis) = &panel.x_axis {
        let (y_edge, dir) = match axis.side {
            AxisSide::Top => (f.top, -1.0),
            _ => (f.top + f.height, 1.0),
        };
        let size = axis.label_size * pt;
        for (i, &tick) in axis.ticks.iter().enumerate() {
            if !within(tick, panel.xlim) {
                continue;
            }
            let x = panel.to_pixel((tick, panel.ylim.0)).0;
            if axis.show_marks {
                ops.push(Op::Line {
                    points: vec![(x, y_edge), (x, y_edge + dir * mark)],
                    color: Rgb::BLACK,
                    width: SPINE_WIDTH * pt,
                    dashed: false,
                    alpha: 1.0,
                });
            }
            if axis.show_labels {
                if let Some(label) = axis.labels.get(i) {
                    let valign = if dir > 0.0 { VAlign::Top } else { VAlign::Bottom };
                    let halign = if axis.label_rotation != 0.0 { HAlign::Right } else { HAlign::Center };
                    ops.push(Op::Text {
                        at: (x, y_edge + dir * (mark + pad)),
                        text: label.clone(),
                        size,
                        color: Rgb::BLACK,
                        rotation: axis.label_rotation,
                        halign,
                        valign,
                    });
                }
            }
        }
        if let Some(title) = &axis.title {
            let offset = mark + pad + size * 1.4;
            let valign = if dir > 0.0 { VAlign::Top } else { VAlign::Bottom };
            ops.push(Op::Text {
                at: (f.left + f.width / 2.0, y_edge + dir * offset),
                text: title.clone(),
                size: axis.title_size * pt,
                color: Rgb::BLACK,
                rotation: 0.0,
                halign: HAlign::Center,
                valign,
            });
        }
    }

    if let Some(axis) = &panel.y_axis {
        let (x_edge, dir) = match axis.side {
            AxisSide::Right => (f.left + f.width, 1.0),
            _ => (f.left, -1.0),
        };
        let size = axis.label_size * pt;
        let mut widest: f64 = 0.0;
        for (i, &tick) in axis.ticks.iter().enumerate() {
            if !within(tick, panel.ylim) {
                continue;
            }
            let y = panel.to_pixel((panel.xlim.0, tick)).1;
            if axis.show_marks {
                ops.push(Op::Line {
                    points: vec![(x_edge, y), (x_edge + dir * mark, y)],
                    color: Rgb::BLACK,
                    width: SPINE_WIDTH * pt,
                    dashed: false,
                    alpha: 1.0,
                });
            }
            if axis.show_labels {
                if let Some(label) = axis.labels.get(i) {
                    widest = widest.max(text_width(label, size));
                    let halign = if dir > 0.0 { HAlign::Left } else { HAlign::Right };
                    ops.push(Op::Text {
                        at: (x_edge + dir * (mark + pad), y),
                        text: label.clone(),
                        size,
                        color: Rgb::BLACK,
                        rotation: axis.label_rotation,
                        halign,
                        valign: VAlign::Center,
                    });
                }
            }
        }
        if let Some(title) = &axis.title {
            let offset = mark + pad + widest + pad * 2.0;
            ops.push(Op::Text {
                at: (x_edge + dir * offset, f.top + f.height / 2.0),
                text: title.clone(),
                size: axis.title_size * pt,
                color: Rgb::BLACK,
                rotation: 90.0,
                halign: HAlign::Center,
                valign: if dir > 0.0 { VAlign::Top } else { VAlign::Bottom },
            });
        }
    }
}

fn flatten_legends(panel: &Panel, pt: f64, ops: &mut Vec<Op>) {
    let f = panel.frame;
    let x0 = f.left + f.width * 1.04;
    let mut y = f.top;
    for legend in &panel.legends {
        let size = legend.font_size * pt;
        let row = size * 1.6;
        if let Some(title) = &legend.title {
            ops.push(Op::Text {
                at: (x0, y),
                text: title.clone(),
                size: legend.title_size * pt,
                color: Rgb::BLACK,
                rotation: 0.0,
                halign: HAlign::Left,
                valign: VAlign::Top,
            });
            y += legend.title_size * pt * 1.6;
        }
        for entry in &legend.entries {
            let cy = y + row / 2.0;
            match entry.symbol {
                LegendSymbol::Marker => ops.push(Op::Circle {
                    center: (x0 + size / 2.0, cy),
                    radius: size * 0.4,
                    fill: entry.color,
                }),
                LegendSymbol::Line => ops.push(Op::Line {
                    points: vec![(x0, cy), (x0 + size * 1.5, cy)],
                    color: entry.color,
                    width: 4.0 * pt,
                    dashed: false,
                    alpha: 1.0,
                }),
            }
            ops.push(Op::Text {
                at: (x0 + size * 2.0, cy),
                text: entry.label.clone(),
                size,
                color: Rgb::BLACK,
                rotation: 0.0,
                halign: HAlign::Left,
                valign: VAlign::Center,
            });
            y += row;
        }
        y += row;
    }
}

/// Write `figure` to `path`: SVG when the extension is `.svg`, otherwise a raster image.
pub fn save(figure: &Figure, path: &Path) -> Result<()> {
    let is_svg = path
        .extension()
        .map(|ext| ext.to_ascii_lowercase() == "svg")
        .unwrap_or(false);

    if is_svg {
        info!("Rendering SVG...");
        let content = svg::render_svg(figure);
        info!("Saving to {:?}...", path);
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
    } else {
        info!("Rendering image...");
        let img = raster::render_image(figure);
        info!("Saving to {:?}...", path);
        img.save(path)?;
    }
    Ok(())
}
