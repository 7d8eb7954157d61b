//! Transposon insertion plots: insertion counts as bars over a CDS track.

use std::f64::consts::FRAC_PI_2;
use std::str::FromStr;

use log::{debug, info, warn};
use serde::Deserialize;

use crate::color::{parse_color, Rgb};
use crate::error::{PlotError, Result};
use crate::figure::{nice_ticks, Axis, AxisSide, Figure, Frame, HAlign, Panel, Point, TextStyle, VAlign};
use crate::genes::arrow_outline;

const HEAD_FRACTION: f64 = 0.015;
const CORNER_SAMPLES: usize = 8;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 20.0;
const MARGIN_BOTTOM: f64 = 30.0;

/// Number of reads at one insertion site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insertion {
    pub pos: u64,
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Cds {
    pub start: u64,
    pub end: u64,
    #[serde(default = "forward")]
    pub strand: i8,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

fn forward() -> i8 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CdsStyle {
    #[default]
    BigArrow,
    Arrow,
    BigBox,
    Box,
    BigRBox,
    RBox,
}

impl CdsStyle {
    fn is_big(self) -> bool {
        matches!(self, CdsStyle::BigArrow | CdsStyle::BigBox | CdsStyle::BigRBox)
    }
}

impl FromStr for CdsStyle {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bigarrow" => Ok(CdsStyle::BigArrow),
            "arrow" => Ok(CdsStyle::Arrow),
            "bigbox" => Ok(CdsStyle::BigBox),
            "box" => Ok(CdsStyle::Box),
            "bigrbox" => Ok(CdsStyle::BigRBox),
            "rbox" => Ok(CdsStyle::RBox),
            other => Err(PlotError::InvalidOption(format!("unknown CDS plot style '{}'", other))),
        }
    }
}

/// A `vertical-horizontal` placement such as `bottom-right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub vertical: VAlign,
    pub horizontal: HAlign,
}

fn parse_vertical(s: &str) -> Result<VAlign> {
    match s {
        "top" => Ok(VAlign::Top),
        "center" => Ok(VAlign::Center),
        "bottom" => Ok(VAlign::Bottom),
        other => Err(PlotError::InvalidOption(format!("unknown vertical position '{}'", other))),
    }
}

fn parse_horizontal(s: &str) -> Result<HAlign> {
    match s {
        "left" => Ok(HAlign::Left),
        "center" => Ok(HAlign::Center),
        "right" => Ok(HAlign::Right),
        other => Err(PlotError::InvalidOption(format!("unknown horizontal position '{}'", other))),
    }
}

impl FromStr for Placement {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self> {
        let (v, h) = s
            .split_once('-')
            .ok_or_else(|| PlotError::InvalidOption(format!("position '{}' is not vertical-horizontal", s)))?;
        Ok(Placement { vertical: parse_vertical(v)?, horizontal: parse_horizontal(h)? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TnseqOptions {
    /// Figure width in inches.
    pub fig_width: f64,
    pub dpi: f64,
    pub track_start: u64,
    pub track_length: Option<u64>,
    /// CDS track height in inches; the bar panel is sized relative to it.
    pub track_height: f64,
    pub track_label: Option<String>,
    pub track_labelsize: f64,
    pub track_sublabelpos: Placement,
    pub track_sublabelsize: f64,
    pub cds_plotstyle: CdsStyle,
    pub cds_color: Rgb,
    pub cds_label: bool,
    pub cds_labelsize: f64,
    pub cds_labvpos: VAlign,
    pub cds_labhpos: HAlign,
    pub cds_labrotation: f64,
    pub cds_arrowshaftratio: f64,
    /// Bottom of the bar panel, in track heights above the track's bottom.
    pub bax_bottompos: f64,
    pub bax_height: f64,
    pub bax_ylabel: Option<String>,
    pub bax_ylabelsize: f64,
    pub bax_xticklabelsize: f64,
    pub bax_yticklabelsize: f64,
    pub bar_width: f64,
    pub bar_color: Rgb,
    pub bar_alpha: f64,
}

impl Default for TnseqOptions {
    fn default() -> Self {
        TnseqOptions {
            fig_width: 10.0,
            dpi: 100.0,
            track_start: 1,
            track_length: None,
            track_height: 0.6,
            track_label: None,
            track_labelsize: 12.0,
            track_sublabelpos: Placement { vertical: VAlign::Bottom, horizontal: HAlign::Right },
            track_sublabelsize: 6.0,
            cds_plotstyle: CdsStyle::BigArrow,
            cds_color: Rgb(173, 216, 230),
            cds_label: false,
            cds_labelsize: 6.0,
            cds_labvpos: VAlign::Bottom,
            cds_labhpos: HAlign::Center,
            cds_labrotation: 0.0,
            cds_arrowshaftratio: 0.5,
            bax_bottompos: 1.5,
            bax_height: 4.0,
            bax_ylabel: None,
            bax_ylabelsize: 10.0,
            bax_xticklabelsize: 8.0,
            bax_yticklabelsize: 8.0,
            bar_width: 1.0,
            bar_color: Rgb::GREY,
            bar_alpha: 0.7,
        }
    }
}

/// Vertical band a feature occupies on the track, which spans `[-1, 1]`.
fn feature_band(style: CdsStyle, strand: i8) -> (f64, f64) {
    if style.is_big() {
        (-0.8, 0.8)
    } else if strand == -1 {
        (-0.8, 0.0)
    } else {
        (0.0, 0.8)
    }
}

fn rounded_box(x0: f64, x1: f64, y0: f64, y1: f64, radius_x: f64) -> Vec<Point> {
    let ry = (y1 - y0) / 4.0;
    let rx = radius_x.min((x1 - x0) / 2.0);
    let corners = [
        (x1 - rx, y0 + ry, -FRAC_PI_2),
        (x1 - rx, y1 - ry, 0.0),
        (x0 + rx, y1 - ry, FRAC_PI_2),
        (x0 + rx, y0 + ry, 2.0 * FRAC_PI_2),
    ];
    let mut points = Vec::with_capacity(4 * (CORNER_SAMPLES + 1));
    for (cx, cy, from) in corners {
        for k in 0..=CORNER_SAMPLES {
            let a = from + FRAC_PI_2 * k as f64 / CORNER_SAMPLES as f64;
            points.push((cx + rx * a.cos(), cy + ry * a.sin()));
        }
    }
    points
}

/// Outline of one CDS in track coordinates (`x` already relative to the track start).
pub fn cds_outline(style: CdsStyle, start: f64, end: f64, strand: i8, track_length: f64, shaft_ratio: f64) -> Vec<Point> {
    let (y0, y1) = feature_band(style, strand);
    let length = end - start;
    match style {
        CdsStyle::BigArrow | CdsStyle::Arrow => {
            let head_length = (track_length * HEAD_FRACTION).min(length);
            let head_width = y1 - y0;
            let (tail, tip) = if strand == -1 { (end, start) } else { (start, end) };
            arrow_outline(tail, tip, (y0 + y1) / 2.0, head_width, head_width * shaft_ratio, head_length)
        }
        CdsStyle::BigBox | CdsStyle::Box => vec![(start, y0), (end, y0), (end, y1), (start, y1)],
        CdsStyle::BigRBox | CdsStyle::RBox => rounded_box(start, end, y0, y1, track_length * HEAD_FRACTION),
    }
}

fn cds_label_anchor(opts: &TnseqOptions, start: f64, end: f64, strand: i8) -> (Point, TextStyle) {
    let (y0, y1) = feature_band(opts.cds_plotstyle, strand);
    let x = match opts.cds_labhpos {
        HAlign::Left => start,
        HAlign::Center => (start + end) / 2.0,
        HAlign::Right => end,
    };
    let (y, valign) = match opts.cds_labvpos {
        VAlign::Top => (y1, VAlign::Bottom),
        VAlign::Center => ((y0 + y1) / 2.0, VAlign::Center),
        VAlign::Bottom => (y0, VAlign::Top),
    };
    let style = TextStyle::new(opts.cds_labelsize)
        .rotation(opts.cds_labrotation)
        .align(opts.cds_labhpos, valign);
    ((x, y), style)
}

fn draw_track(cds: &[Cds], opts: &TnseqOptions, track_length: u64, panel: &mut Panel) -> Result<usize> {
    let start = opts.track_start;
    let end = start + track_length - 1;
    let span = track_length as f64;

    panel.line((0.0, 0.0), (span, 0.0), Rgb::GREY, 1.0);

    let mut drawn = 0;
    for gene in cds {
        if gene.start < start || gene.end > end {
            continue;
        }
        if gene.start >= gene.end {
            warn!("Skipping CDS {:?} with start {} >= end {}", gene.name, gene.start, gene.end);
            continue;
        }
        let color = match &gene.color {
            Some(c) => parse_color(c)?,
            None => opts.cds_color,
        };
        let x0 = (gene.start - start) as f64;
        let x1 = (gene.end - start + 1) as f64;
        let outline = cds_outline(opts.cds_plotstyle, x0, x1, gene.strand, span, opts.cds_arrowshaftratio);
        panel.polygon(outline, color);

        if let (true, Some(name)) = (opts.cds_label, &gene.name) {
            let (at, style) = cds_label_anchor(opts, x0, x1, gene.strand);
            panel.text(at, name.clone(), style);
        }
        drawn += 1;
    }

    if let Some(label) = &opts.track_label {
        let style = TextStyle::new(opts.track_labelsize).align(HAlign::Right, VAlign::Center);
        panel.text((-0.01 * span, 0.0), label.clone(), style);
    }
    let sub = opts.track_sublabelpos;
    let x = match sub.horizontal {
        HAlign::Left => 0.0,
        HAlign::Center => span / 2.0,
        HAlign::Right => span,
    };
    let (y, valign) = match sub.vertical {
        VAlign::Top => (1.0, VAlign::Bottom),
        VAlign::Center => (0.0, VAlign::Center),
        VAlign::Bottom => (-1.0, VAlign::Top),
    };
    panel.text(
        (x, y),
        format!("{} - {} bp", start, end),
        TextStyle::new(opts.track_sublabelsize).align(sub.horizontal, valign),
    );

    panel.set_xlim(0.0, span);
    panel.set_ylim(-1.0, 1.0);
    panel.hide_all_spines();
    panel.hide_ticks();
    Ok(drawn)
}

fn draw_bars(insertions: &[Insertion], opts: &TnseqOptions, track_length: u64, panel: &mut Panel) -> usize {
    let mut max_count: f64 = 0.0;
    let mut drawn = 0;
    for ins in insertions.iter().filter(|i| i.pos >= opts.track_start) {
        let x = (ins.pos - opts.track_start + 1) as f64;
        panel.translucent_line((x, 0.0), (x, ins.count), opts.bar_color, opts.bar_width, opts.bar_alpha);
        max_count = max_count.max(ins.count);
        drawn += 1;
    }
    let top = if max_count > 0.0 { max_count * 1.05 } else { 1.0 };

    let span = track_length as f64;
    panel.set_xlim(0.0, span);
    panel.set_ylim(0.0, top);

    let xticks = nice_ticks(0.0, span);
    let xlabels = xticks.iter().map(|t| (t + opts.track_start as f64).round().to_string()).collect();
    let mut x_axis = Axis::new(AxisSide::Bottom, xticks, xlabels);
    x_axis.label_size = opts.bax_xticklabelsize;
    panel.set_xticks(x_axis);

    let mut y_axis = Axis::numeric(AxisSide::Left, nice_ticks(0.0, top));
    y_axis.label_size = opts.bax_yticklabelsize;
    y_axis.title = opts.bax_ylabel.clone();
    y_axis.title_size = opts.bax_ylabelsize;
    panel.set_yticks(y_axis);

    panel.hide_spines(&[AxisSide::Top, AxisSide::Right]);
    drawn
}

/// Figure with the insertion bar panel stacked above the CDS track; both
/// share the x coordinates `pos - track_start + 1`.
pub fn tnseqplot(insertions: &[Insertion], cds: &[Cds], opts: &TnseqOptions) -> Result<Figure> {
    let track_length = opts
        .track_length
        .filter(|len| *len > 0)
        .ok_or_else(|| PlotError::InvalidOption("the CDS track length is not set".to_string()))?;
    if cds.is_empty() {
        return Err(PlotError::InvalidInput("no CDS list was passed".to_string()));
    }
    info!(
        "Tn-seq plot: {} insertions, {} CDS over {}..{}",
        insertions.len(),
        cds.len(),
        opts.track_start,
        opts.track_start + track_length - 1
    );

    let width_px = opts.fig_width * opts.dpi;
    let track_px = opts.track_height * opts.dpi;
    let bar_px = opts.bax_height * track_px;
    let gap_px = (opts.bax_bottompos - 1.0).max(0.0) * track_px;
    let inner_width = (width_px - MARGIN_LEFT - MARGIN_RIGHT).max(1.0);
    let height_px = MARGIN_TOP + bar_px + gap_px + track_px + MARGIN_BOTTOM;

    let mut bars = Panel::new(Frame::new(MARGIN_LEFT, MARGIN_TOP, inner_width, bar_px));
    let n_bars = draw_bars(insertions, opts, track_length, &mut bars);

    let mut track = Panel::new(Frame::new(MARGIN_LEFT, MARGIN_TOP + bar_px + gap_px, inner_width, track_px));
    let n_cds = draw_track(cds, opts, track_length, &mut track)?;
    debug!("Drew {} bars and {} CDS features", n_bars, n_cds);

    let mut figure = Figure::new(width_px.round() as u32, height_px.round() as u32, opts.dpi);
    figure.add_panel(track);
    figure.add_panel(bars);
    Ok(figure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::Primitive;

    fn cds() -> Vec<Cds> {
        vec![
            Cds { start: 10, end: 50, strand: 1, name: Some("gene1".into()), color: None },
            Cds { start: 60, end: 100, strand: -1, name: Some("gene2".into()), color: Some("#ff0000".into()) },
            Cds { start: 120, end: 250, strand: 1, name: Some("gene3".into()), color: None },
        ]
    }

    fn insertions() -> Vec<Insertion> {
        vec![
            Insertion { pos: 5, count: 3.0 },
            Insertion { pos: 20, count: 10.0 },
            Insertion { pos: 70, count: 4.0 },
        ]
    }

    fn opts() -> TnseqOptions {
        TnseqOptions { track_start: 10, track_length: Some(200), cds_label: true, ..Default::default() }
    }

    fn polygons(panel: &Panel) -> Vec<(&Vec<Point>, Rgb)> {
        panel
            .primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Polygon { points, fill, .. } => Some((points, *fill)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn requires_track_length_and_cds() {
        let err = tnseqplot(&insertions(), &cds(), &TnseqOptions::default());
        assert!(matches!(err, Err(PlotError::InvalidOption(_))));
        let err = tnseqplot(&insertions(), &[], &opts());
        assert!(matches!(err, Err(PlotError::InvalidInput(_))));
    }

    #[test]
    fn keeps_features_inside_the_track() {
        let fig = tnseqplot(&insertions(), &cds(), &opts()).unwrap();
        assert_eq!(fig.panels.len(), 2);
        assert_eq!(fig.width, 1000);
        let track = &fig.panels[0];
        let shapes = polygons(track);
        // gene3 ends past 209
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].1, Rgb(173, 216, 230));
        assert_eq!(shapes[1].1, Rgb(255, 0, 0));
        // gene1 is [0, 41) relative to the track, tip on the right
        assert_eq!(shapes[0].0[0], (41.0, 0.0));
        // gene2 points left, tip at its start
        assert_eq!(shapes[1].0[0], (50.0, 0.0));
        let names: Vec<&str> = track
            .primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["gene1", "gene2", "10 - 209 bp"]);
    }

    #[test]
    fn bars_are_shifted_and_translucent() {
        let fig = tnseqplot(&insertions(), &cds(), &opts()).unwrap();
        let bars = &fig.panels[1];
        let lines: Vec<_> = bars
            .primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Line { points, alpha, .. } => Some((points.clone(), *alpha)),
                _ => None,
            })
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, vec![(11.0, 0.0), (11.0, 10.0)]);
        assert_eq!(lines[1].0, vec![(61.0, 0.0), (61.0, 4.0)]);
        assert!(lines.iter().all(|(_, a)| *a == 0.7));
        assert_eq!(bars.ylim.0, 0.0);
        assert!((bars.ylim.1 - 10.5).abs() < 1e-9);
        let x_axis = bars.x_axis.as_ref().unwrap();
        assert_eq!(x_axis.labels[0], "10");
        assert!(!bars.spines.top && !bars.spines.right && bars.spines.left);
    }

    #[test]
    fn styles_place_features_by_strand() {
        let small = cds_outline(CdsStyle::Box, 0.0, 10.0, -1, 100.0, 0.5);
        assert_eq!(small, vec![(0.0, -0.8), (10.0, -0.8), (10.0, 0.0), (0.0, 0.0)]);
        let arrow = cds_outline(CdsStyle::Arrow, 0.0, 10.0, 1, 100.0, 0.5);
        assert_eq!(arrow[0], (10.0, 0.4));
        assert_eq!(arrow[1], (8.5, 0.0));
        let rbox = cds_outline(CdsStyle::RBox, 0.0, 10.0, 1, 100.0, 0.5);
        assert!(rbox.iter().all(|(x, y)| (-1e-9..=10.0 + 1e-9).contains(x) && (-1e-9..=0.8 + 1e-9).contains(y)));
        assert_eq!("bigrbox".parse::<CdsStyle>().unwrap(), CdsStyle::BigRBox);
        assert!("circle".parse::<CdsStyle>().is_err());
        let pos: Placement = "top-left".parse().unwrap();
        assert_eq!(pos, Placement { vertical: VAlign::Top, horizontal: HAlign::Left });
    }
}
