//! Gene neighbourhood diagrams: one horizontal track per genome, genes drawn
//! as arrows pointing along their strand.

use std::str::FromStr;

use log::{debug, info};
use serde::Deserialize;

use crate::color::{parse_color, Rgb};
use crate::error::{PlotError, Result};
use crate::figure::{Axis, AxisSide, HAlign, Panel, Point, TextStyle, VAlign};

pub const DEFAULT_ARROW_COLOR: Rgb = Rgb(0xec, 0x96, 0x31);
const TRACK_COLOR: Rgb = Rgb(0x75, 0x75, 0x75);
const TRACK_SPACING: f64 = 10.0;
const HEAD_FRACTION: f64 = 0.015;

/// One gene on a track. Field names match the upper-case keys of the JSON input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Arrow {
    #[serde(rename = "START")]
    pub start: f64,
    #[serde(rename = "END")]
    pub end: f64,
    /// `1` forward, `-1` reverse.
    #[serde(rename = "STRAND")]
    pub strand: i8,
    #[serde(rename = "LABEL", default)]
    pub label: String,
    #[serde(rename = "COLOR", default)]
    pub color: Option<String>,
}

/// Track name to the genes on it.
pub type GeneTracks = Vec<(String, Vec<Arrow>)>;

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowLabel {
    pub at: Point,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelTrack {
    #[default]
    All,
    Top,
    Bottom,
}

impl FromStr for LabelTrack {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(LabelTrack::All),
            "top" => Ok(LabelTrack::Top),
            "bottom" => Ok(LabelTrack::Bottom),
            other => Err(PlotError::InvalidOption(format!(
                "label track '{}' is not one of all, top, bottom",
                other
            ))),
        }
    }
}

/// Outline of one arrow (tail to head, `length_includes_head` geometry) and
/// where its label goes.
///
/// `ylim` is the vertical extent reserved for the head, so the head is
/// `ylim.1 - ylim.0` tall and the shaft half that.
pub fn arrow_patch(
    y: f64,
    arrow: &Arrow,
    ylim: (f64, f64),
    max_track_size: f64,
    no_head_length: bool,
) -> Result<(Vec<Point>, ArrowLabel)> {
    if arrow.start.partial_cmp(&arrow.end) != Some(std::cmp::Ordering::Less) {
        return Err(PlotError::InvalidInput(format!(
            "the end position {} should be greater than the start position {}",
            arrow.end, arrow.start
        )));
    }
    let dir = if arrow.strand == -1 { -1.0 } else { 1.0 };
    let tail = if dir < 0.0 { arrow.end } else { arrow.start };
    let length = arrow.end - arrow.start;

    let max_width = ylim.1 - ylim.0;
    let label = ArrowLabel {
        at: (tail + length * dir / 2.0, y + max_width / 2.0 + 1.0),
        text: arrow.label.clone(),
    };

    let shaft = max_width * 0.5;
    let (head_width, head_length) = if no_head_length {
        (shaft, 0.0)
    } else {
        (max_width, (max_track_size * HEAD_FRACTION).min(length))
    };

    let outline = arrow_outline(tail, tail + length * dir, y, head_width, shaft, head_length);
    Ok((outline, label))
}

/// Seven-point arrow from `tail` to `tip` along the line `y`, tip first.
pub fn arrow_outline(tail: f64, tip: f64, y: f64, head_width: f64, shaft_width: f64, head_length: f64) -> Vec<Point> {
    let length = (tip - tail).abs();
    let dir = if tip < tail { -1.0 } else { 1.0 };
    let back = |u: f64| tip - u * dir;
    vec![
        (tip, y),
        (back(head_length), y - head_width / 2.0),
        (back(head_length), y - shaft_width / 2.0),
        (back(length), y - shaft_width / 2.0),
        (back(length), y + shaft_width / 2.0),
        (back(head_length), y + shaft_width / 2.0),
        (back(head_length), y + head_width / 2.0),
    ]
}

/// A laid out arrow ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowShape {
    pub outline: Vec<Point>,
    pub color: Rgb,
}

fn track_positions(n: usize) -> Vec<f64> {
    (0..n).map(|i| TRACK_SPACING * i as f64 + TRACK_SPACING / 2.0).collect()
}

/// Lay out every track listed in `order`, bottom to top, and collect the
/// labels of the tracks selected by `label_track`.
pub fn get_arrows(
    tracks: &GeneTracks,
    order: &[String],
    label_track: LabelTrack,
    ylim: (f64, f64),
    max_track_size: f64,
) -> Result<(Vec<ArrowShape>, Vec<ArrowLabel>)> {
    if order.is_empty() {
        return Err(PlotError::InvalidInput("no tracks to draw".to_string()));
    }
    let positions = track_positions(order.len());
    let last = order.len() - 1;

    let mut arrows = Vec::new();
    let mut labels = Vec::new();
    for (i, (name, y)) in order.iter().zip(&positions).enumerate() {
        let genes = tracks
            .iter()
            .find(|(track, _)| track == name)
            .map(|(_, genes)| genes)
            .ok_or_else(|| PlotError::MissingLabel(name.clone()))?;
        let keep_labels = match label_track {
            LabelTrack::All => true,
            LabelTrack::Top => i == last,
            LabelTrack::Bottom => i == 0,
        };
        for gene in genes {
            let (outline, label) = arrow_patch(*y, gene, ylim, max_track_size, false)?;
            let color = match &gene.color {
                Some(c) => parse_color(c)?,
                None => DEFAULT_ARROW_COLOR,
            };
            arrows.push(ArrowShape { outline, color });
            if keep_labels {
                labels.push(label);
            }
        }
    }
    debug!("{} arrows, {} labels", arrows.len(), labels.len());
    Ok((arrows, labels))
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenesOptions {
    pub add_labels: bool,
    pub max_track_size: f64,
    pub trackname_size: f64,
    pub label_track: LabelTrack,
    pub label_rotation: f64,
    pub label_size: f64,
    pub ylim: (f64, f64),
}

impl Default for GenesOptions {
    fn default() -> Self {
        GenesOptions {
            add_labels: false,
            max_track_size: 5000.0,
            trackname_size: 18.0,
            label_track: LabelTrack::All,
            label_rotation: 45.0,
            label_size: 12.0,
            ylim: (-3.0, 3.0),
        }
    }
}

/// Draw the gene tracks named in `order` into `panel`.
pub fn plotgenes(tracks: &GeneTracks, order: &[String], opts: &GenesOptions, panel: &mut Panel) -> Result<()> {
    info!("Gene diagram: {} tracks", order.len());
    let (arrows, labels) = get_arrows(tracks, order, opts.label_track, opts.ylim, opts.max_track_size)?;

    let positions = track_positions(order.len());
    for y in &positions {
        panel.line((0.0, *y), (opts.max_track_size, *y), TRACK_COLOR, 1.0);
    }
    for arrow in arrows {
        panel.polygon(arrow.outline, arrow.color);
    }
    if opts.add_labels {
        let style = TextStyle::new(opts.label_size)
            .rotation(opts.label_rotation)
            .align(HAlign::Left, VAlign::Bottom);
        for label in labels {
            panel.text(label.at, label.text, style.clone());
        }
    }

    let mut names = Axis::new(AxisSide::Right, positions, order.to_vec());
    names.label_size = opts.trackname_size;
    names.show_marks = false;
    panel.set_yticks(names);
    panel.set_xlim(0.0, opts.max_track_size);
    panel.set_ylim(0.0, TRACK_SPACING * order.len() as f64);
    panel.hide_spines(&[AxisSide::Top, AxisSide::Left, AxisSide::Right]);
    Ok(())
}
