use std::fmt::Write as _;

use crate::color::Rgb;
use crate::figure::{Figure, HAlign, Point, VAlign};

use super::{flatten, Op};

/// Escape special XML characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn rgb(c: Rgb) -> String {
    format!("rgb({},{},{})", c.0, c.1, c.2)
}

fn points_attr(points: &[Point]) -> String {
    let mut out = String::with_capacity(points.len() * 16);
    for (i, (x, y)) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:.2},{:.2}", x, y);
    }
    out
}

/// Render a figure as a standalone SVG document with vector text.
pub fn render_svg(figure: &Figure) -> String {
    let (w, h) = (figure.width, figure.height);
    let mut svg = String::new();

    svg.push_str(&format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
  text {{ font-family: Arial, 'DejaVu Sans', Helvetica, sans-serif; }}
</style>
<rect width="100%" height="100%" fill="{}"/>
"#,
        w,
        h,
        w,
        h,
        rgb(figure.background)
    ));

    for op in flatten(figure) {
        match op {
            Op::Line { points, color, width, dashed, alpha } => {
                if points.len() < 2 {
                    continue;
                }
                let dash = if dashed {
                    format!(r#" stroke-dasharray="{:.1},{:.1}""#, width * 3.7, width * 1.6)
                } else {
                    String::new()
                };
                let opacity = if alpha < 1.0 {
                    format!(r#" stroke-opacity="{:.3}""#, alpha)
                } else {
                    String::new()
                };
                svg.push_str(&format!(
                    r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{:.2}" stroke-linecap="butt"{}{}/>"#,
                    points_attr(&points),
                    rgb(color),
                    width,
                    dash,
                    opacity
                ));
            }
            Op::Polygon { points, fill, alpha } => {
                svg.push_str(&format!(
                    r#"<polygon points="{}" fill="{}" fill-opacity="{:.3}"/>"#,
                    points_attr(&points),
                    rgb(fill),
                    alpha
                ));
            }
            Op::Rect { x, y, width, height, fill, edge } => {
                let stroke = match edge {
                    Some(c) => format!(r#" stroke="{}" stroke-width="1""#, rgb(c)),
                    None => String::new(),
                };
                svg.push_str(&format!(
                    r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"{}/>"#,
                    x,
                    y,
                    width,
                    height,
                    rgb(fill),
                    stroke
                ));
            }
            Op::Circle { center, radius, fill } => {
                svg.push_str(&format!(
                    r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}"/>"#,
                    center.0,
                    center.1,
                    radius,
                    rgb(fill)
                ));
            }
            Op::Text { at, text, size, color, rotation, halign, valign } => {
                let anchor = match halign {
                    HAlign::Left => "start",
                    HAlign::Center => "middle",
                    HAlign::Right => "end",
                };
                let baseline = match valign {
                    VAlign::Top => "hanging",
                    VAlign::Center => "central",
                    VAlign::Bottom => "auto",
                };
                // SVG rotates clockwise, figure text rotates counter-clockwise
                let transform = if rotation != 0.0 {
                    format!(r#" transform="rotate({:.3} {:.2} {:.2})""#, -rotation, at.0, at.1)
                } else {
                    String::new()
                };
                svg.push_str(&format!(
                    r#"<text x="{:.2}" y="{:.2}" font-size="{:.2}" fill="{}" text-anchor="{}" dominant-baseline="{}"{}>{}</text>"#,
                    at.0,
                    at.1,
                    size,
                    rgb(color),
                    anchor,
                    baseline,
                    transform,
                    escape_xml(&text)
                ));
            }
        }
        svg.push('\n');
    }

    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::{Frame, Panel, TextStyle};

    #[test]
    fn writes_rotated_escaped_text() {
        let mut fig = Figure::new(100, 100, 72.0);
        let mut panel = Panel::new(Frame::new(0.0, 0.0, 100.0, 100.0));
        panel.hide_all_spines();
        panel.text((0.5, 0.5), "a<b", TextStyle::new(10.0).rotation(45.0));
        fig.add_panel(panel);

        let out = render_svg(&fig);
        assert!(out.starts_with("<?xml"));
        assert!(out.contains("a&lt;b"));
        assert!(out.contains(r#"transform="rotate(-45.000 50.00 50.00)""#));
        assert!(out.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn lines_become_polylines() {
        let mut fig = Figure::new(10, 10, 72.0);
        let mut panel = Panel::new(Frame::new(0.0, 0.0, 10.0, 10.0));
        panel.hide_all_spines();
        panel.line((0.0, 0.0), (1.0, 1.0), Rgb::BLACK, 1.0);
        fig.add_panel(panel);

        let out = render_svg(&fig);
        assert!(out.contains(r#"<polyline points="0.00,10.00 10.00,0.00""#));
    }
}
