//! Radial dendrogram layout.
//!
//! Rectangular link coordinates are projected onto a circle: leaf position
//! becomes an angle, merge height becomes a radius (root at the centre,
//! leaves on the unit circle). Each U-shaped link turns into two radial legs
//! and a circular arc bridging them at the merge radius.

use std::f64::consts::PI;

use log::{debug, info};
use rustc_hash::FxHashSet;

use super::{Dendrogram, Link};
use crate::color::{cycle_color, get_colormap, Rgb};
use crate::error::{PlotError, Result};
use crate::figure::{HAlign, Legend, LegendEntry, LegendSymbol, Panel, Point, TextStyle, VAlign};

/// Samples per bridge sub-arc, endpoints included.
pub const ARC_SAMPLES: usize = 1000;
/// Radius of the leaf circle.
const R: f64 = 1.0;
/// Label anchors sit this far out, relative to the leaf circle.
const LABEL_RADIUS: f64 = 1.05;
const RING_WIDTH: f64 = R * 0.1;
const RING_SPACE: f64 = R * 0.05;
const LINE_WIDTH: f64 = 0.5;
const POINT_COLOR: Rgb = Rgb(0, 128, 0);
const RING_COLORMAPS: [&str; 4] = ["set1", "tab10", "spectral", "viridis"];

/// Rotate `(x, y)` counter-clockwise around the origin by `degrees`.
pub fn rotate_point((x, y): Point, degrees: f64) -> Point {
    let angle = 2.0 * PI * degrees / 360.0;
    let new_x = x * angle.cos() - y * angle.sin();
    let new_y = x * angle.sin() + y * angle.cos();
    (new_x, new_y)
}

/// Maps rectangular dendrogram coordinates to rotated cartesian positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialMapping {
    pub xmax: f64,
    pub ymax: f64,
    pub open_angle: f64,
    pub start_angle: f64,
}

impl RadialMapping {
    pub fn new(dendro: &Dendrogram, open_angle: f64, start_angle: f64) -> Result<Self> {
        if dendro.icoord.is_empty() || dendro.dcoord.is_empty() {
            return Err(PlotError::InvalidInput("dendrogram has no links".to_string()));
        }
        let xmax = dendro.max_x();
        let ymax = dendro.max_height();
        if !xmax.is_finite() || xmax == 0.0 {
            return Err(PlotError::InvalidInput(format!(
                "leaf axis spans nothing (max icoord = {}), a tree needs at least 2 leaves",
                xmax
            )));
        }
        if !ymax.is_finite() || ymax == 0.0 {
            return Err(PlotError::InvalidInput(format!(
                "all merges are at height {}, nothing to lay out radially",
                ymax
            )));
        }
        Ok(RadialMapping { xmax, ymax, open_angle, start_angle })
    }

    /// Angle in radians of a leaf-axis position, before rotation.
    pub fn angle(&self, x: f64) -> f64 {
        (2.0 * PI * (360.0 - self.open_angle) / 360.0) * x / self.xmax
    }

    pub fn radius(&self, y: f64) -> f64 {
        R * (1.0 - y / self.ymax)
    }

    pub fn project(&self, x: f64, y: f64) -> Point {
        let angle = self.angle(x);
        let r = self.radius(y);
        rotate_point((angle.cos() * r, angle.sin() * r), self.start_angle)
    }

    /// Text rotation in degrees for a label at leaf-axis position `x`.
    pub fn label_rotation(&self, x: f64) -> f64 {
        (360.0 - self.open_angle) * x / self.xmax + self.start_angle
    }
}

fn half_circle(r: f64, from: f64, to: f64, upper: bool) -> Vec<Point> {
    let sign = if upper { 1.0 } else { -1.0 };
    (0..ARC_SAMPLES)
        .map(|i| {
            let x = from + (to - from) * i as f64 / (ARC_SAMPLES - 1) as f64;
            (x, sign * (r * r - x * x).max(0.0).sqrt())
        })
        .collect()
}

/// Circular bridge of radius `r` from `p1` to `p2`, as one or two polylines.
///
/// The arc is swept along x, so a bridge crossing the horizontal axis is split
/// where it meets the axis: at `-r` when it goes from the upper to the lower
/// half, at `+r` the other way round.
pub fn bridge(p1: Point, p2: Point, r: f64) -> Vec<Vec<Point>> {
    let (x1, y1) = p1;
    let (x2, y2) = p2;
    if y1 >= 0.0 && y2 >= 0.0 {
        vec![half_circle(r, x1, x2, true)]
    } else if y1 <= 0.0 && y2 <= 0.0 {
        vec![half_circle(r, x1, x2, false)]
    } else if y1 >= 0.0 {
        vec![half_circle(r, x1, -r, true), half_circle(r, -r, x2, false)]
    } else {
        vec![half_circle(r, x1, r, false), half_circle(r, r, x2, true)]
    }
}

/// Projected geometry of one link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkGeometry {
    /// Projected `p0..p3`.
    pub points: [Point; 4],
    /// Radius of each point; `radii[1] == radii[2]`.
    pub radii: [f64; 4],
    pub legs: [[Point; 2]; 2],
    pub arcs: Vec<Vec<Point>>,
}

pub fn link_segments(link: &Link, mapping: &RadialMapping) -> LinkGeometry {
    let radii = link.y.map(|y| mapping.radius(y));
    let points = [
        mapping.project(link.x[0], link.y[0]),
        mapping.project(link.x[0], link.y[1]),
        mapping.project(link.x[2], link.y[2]),
        mapping.project(link.x[2], link.y[3]),
    ];
    LinkGeometry {
        points,
        radii,
        legs: [[points[0], points[1]], [points[2], points[3]]],
        arcs: bridge(points[1], points[2], radii[1]),
    }
}

/// Where a leaf sits and where its label goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafAnchor {
    pub x: f64,
    pub y: f64,
    pub label_x: f64,
    pub label_y: f64,
    /// Degrees counter-clockwise.
    pub rotation: f64,
    /// Position on the rectangular leaf axis.
    pub source_x: f64,
}

/// Leaf endpoints of all links, one per leaf, ordered along the leaf axis.
///
/// An endpoint is a leaf when its height is exactly 0 and it sits on one of
/// the leaf ticks `10i + 5`.
pub fn collect_leaves(dendro: &Dendrogram, mapping: &RadialMapping, offset: f64) -> Vec<LeafAnchor> {
    let ticks: FxHashSet<u64> = dendro.leaf_ticks().iter().map(|t| t.to_bits()).collect();
    let mut seen: FxHashSet<(u64, u64)> = FxHashSet::default();
    let mut anchors = Vec::with_capacity(dendro.leaf_count());
    let scale = LABEL_RADIUS + offset;

    for link in dendro.sorted_links() {
        for (x, y) in [(link.x[0], link.y[0]), (link.x[3], link.y[3])] {
            // +0.0 and -0.0 must hash alike
            let (x, y) = (x + 0.0, y + 0.0);
            if y != 0.0 || !ticks.contains(&x.to_bits()) {
                continue;
            }
            if !seen.insert((x.to_bits(), y.to_bits())) {
                continue;
            }
            let (px, py) = mapping.project(x, y);
            anchors.push(LeafAnchor {
                x: px,
                y: py,
                label_x: scale * px,
                label_y: scale * py,
                rotation: mapping.label_rotation(x),
                source_x: x,
            });
        }
    }
    anchors.sort_by(|a, b| a.source_x.total_cmp(&b.source_x));
    anchors
}

/// Color and category assigned to one leaf label.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryColor {
    pub color: Rgb,
    pub category: String,
}

/// Leaf label -> colored category, in file order.
pub type CategoryColors = Vec<(String, CategoryColor)>;

fn lookup<'a>(map: &'a CategoryColors, label: &str) -> Result<&'a CategoryColor> {
    map.iter()
        .find(|(l, _)| l == label)
        .map(|(_, c)| c)
        .ok_or_else(|| PlotError::MissingLabel(label.to_string()))
}

/// One legend entry per category, using the first color seen for it.
pub fn point_legend(colors: &CategoryColors) -> Vec<LegendEntry> {
    let mut entries: Vec<LegendEntry> = Vec::new();
    for (_, cc) in colors {
        if entries.iter().any(|e| e.label == cc.category) {
            continue;
        }
        entries.push(LegendEntry {
            label: cc.category.clone(),
            color: cc.color,
            symbol: LegendSymbol::Marker,
        });
    }
    entries
}

/// A ring of per-sample classes drawn outside the leaf labels.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRing {
    pub name: String,
    /// Class of every sample, indexed by original observation order.
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircularOptions {
    pub font_size: f64,
    pub open_angle: f64,
    pub start_angle: f64,
    pub add_points: bool,
    pub point_size: f64,
    pub point_colors: Option<CategoryColors>,
    pub point_legend_title: String,
    pub palette: String,
    pub add_labels: bool,
    pub label_colors: Option<CategoryColors>,
    pub branch_color: bool,
    pub rings: Vec<ColorRing>,
}

impl Default for CircularOptions {
    fn default() -> Self {
        CircularOptions {
            font_size: 8.0,
            open_angle: 0.0,
            start_angle: 0.0,
            add_points: false,
            point_size: 15.0,
            point_colors: None,
            point_legend_title: "Category".to_string(),
            palette: "gist_rainbow".to_string(),
            add_labels: true,
            label_colors: None,
            branch_color: false,
            rings: Vec::new(),
        }
    }
}

/// Space reserved between the leaves and their labels for `rings` color rings.
pub fn ring_offset(rings: usize) -> f64 {
    if rings == 0 {
        0.0
    } else {
        RING_WIDTH * rings as f64 / R + RING_SPACE * (rings - 1) as f64 / R + 0.05
    }
}

/// Half the side of the square data window.
pub fn max_radius(rings: usize) -> f64 {
    if rings == 0 {
        R * LABEL_RADIUS
    } else {
        R * LABEL_RADIUS + RING_WIDTH * rings as f64 + RING_SPACE * (rings - 1) as f64
    }
}

fn check_color_map(map: &CategoryColors, expected: usize) -> Result<()> {
    if map.len() != expected {
        return Err(PlotError::ColorMapMismatch { expected, actual: map.len() });
    }
    Ok(())
}

/// Annular sector between `inner` and `outer` from angle `a0` to `a1` (radians).
fn wedge(inner: f64, outer: f64, a0: f64, a1: f64) -> Vec<Point> {
    const STEPS: usize = 24;
    let mut points = Vec::with_capacity(2 * (STEPS + 1));
    for i in 0..=STEPS {
        let a = a0 + (a1 - a0) * i as f64 / STEPS as f64;
        points.push((outer * a.cos(), outer * a.sin()));
    }
    for i in (0..=STEPS).rev() {
        let a = a0 + (a1 - a0) * i as f64 / STEPS as f64;
        points.push((inner * a.cos(), inner * a.sin()));
    }
    points
}

fn draw_rings(
    dendro: &Dendrogram,
    mapping: &RadialMapping,
    anchors: &[LeafAnchor],
    rings: &[ColorRing],
    panel: &mut Panel,
) -> Result<()> {
    let k = rings.len();
    let mut outer = max_radius(k);
    let half_step = super::LEAF_SPACING / 2.0;
    let rotate = mapping.start_angle.to_radians();

    for (j, ring) in rings.iter().enumerate() {
        if j > 0 {
            outer -= RING_WIDTH + RING_SPACE;
        }
        let inner = outer - RING_WIDTH;

        let mut classes: Vec<&str> = ring.classes.iter().map(String::as_str).collect();
        classes.sort_unstable();
        classes.dedup();
        let cmap = get_colormap(RING_COLORMAPS[j % RING_COLORMAPS.len()])?;
        let color_of = |class: &str| {
            let idx = classes.iter().position(|c| *c == class).unwrap_or(0);
            let t = if classes.len() > 1 { idx as f64 / (classes.len() - 1) as f64 } else { 0.0 };
            cmap.at(t)
        };

        for (leaf_pos, anchor) in anchors.iter().enumerate() {
            let sample = dendro.leaves.get(leaf_pos).copied().unwrap_or(leaf_pos);
            let class = ring.classes.get(sample).ok_or_else(|| {
                PlotError::InvalidInput(format!(
                    "ring '{}' has {} classes, sample {} is missing",
                    ring.name,
                    ring.classes.len(),
                    sample
                ))
            })?;
            let a0 = mapping.angle(anchor.source_x - half_step) + rotate;
            let a1 = mapping.angle(anchor.source_x + half_step) + rotate;
            panel.polygon(wedge(inner, outer, a0, a1), color_of(class));
        }

        panel.add_legend(Legend {
            title: Some(ring.name.clone()),
            entries: classes
                .iter()
                .map(|c| LegendEntry { label: c.to_string(), color: color_of(c), symbol: LegendSymbol::Line })
                .collect(),
            font_size: 8.0,
            title_size: 9.0,
        });
    }
    Ok(())
}

/// Draw a radial dendrogram into `panel`.
pub fn circulartree(dendro: &Dendrogram, opts: &CircularOptions, panel: &mut Panel) -> Result<()> {
    dendro.validate()?;
    let mapping = RadialMapping::new(dendro, opts.open_angle, opts.start_angle)?;
    let offset = ring_offset(opts.rings.len());
    info!(
        "Circular dendrogram: {} leaves, {} links, open angle {}",
        dendro.leaf_count(),
        dendro.icoord.len(),
        opts.open_angle
    );

    let anchors = collect_leaves(dendro, &mapping, offset);
    if (opts.add_labels || opts.add_points || !opts.rings.is_empty()) && anchors.len() != dendro.ivl.len() {
        return Err(PlotError::LeafCountMismatch { expected: dendro.ivl.len(), actual: anchors.len() });
    }

    let ucolors = dendro.unique_colors();
    let palette = get_colormap(&opts.palette)?.sample(ucolors.len());

    let mut arc_points = 0usize;
    for link in dendro.sorted_links() {
        let color = if !opts.branch_color || link.color == "C0" {
            Rgb::BLACK
        } else {
            ucolors
                .iter()
                .position(|c| *c == link.color)
                .and_then(|i| palette.get(i).copied())
                .or_else(|| cycle_color(link.color))
                .unwrap_or(Rgb::BLACK)
        };
        let geometry = link_segments(&link, &mapping);
        for [from, to] in geometry.legs {
            panel.line(from, to, color, LINE_WIDTH);
        }
        for arc in geometry.arcs {
            arc_points += arc.len();
            panel.polyline(arc, color, LINE_WIDTH);
        }
    }
    debug!("Bridges sampled with {} points", arc_points);

    if opts.add_labels {
        if let Some(map) = &opts.label_colors {
            check_color_map(map, dendro.ivl.len())?;
        }
        for (anchor, label) in anchors.iter().zip(&dendro.ivl) {
            let color = match &opts.label_colors {
                Some(map) => lookup(map, label)?.color,
                None => Rgb::BLACK,
            };
            let style = TextStyle::new(opts.font_size)
                .color(color)
                .rotation(anchor.rotation)
                .align(HAlign::Left, VAlign::Center);
            panel.text((anchor.label_x, anchor.label_y), label.as_str(), style);
        }
    }

    if opts.add_points {
        match &opts.point_colors {
            Some(map) => {
                check_color_map(map, dendro.ivl.len())?;
                for (anchor, label) in anchors.iter().zip(&dendro.ivl) {
                    panel.scatter((anchor.x, anchor.y), lookup(map, label)?.color, opts.point_size);
                }
                panel.add_legend(Legend {
                    title: Some(opts.point_legend_title.clone()),
                    entries: point_legend(map),
                    font_size: opts.font_size + 2.0,
                    title_size: opts.font_size + 3.0,
                });
            }
            None => {
                for anchor in &anchors {
                    panel.scatter((anchor.x, anchor.y), POINT_COLOR, opts.point_size);
                }
            }
        }
    }

    if !opts.rings.is_empty() {
        draw_rings(dendro, &mapping, &anchors, &opts.rings, panel)?;
    }

    let maxr = max_radius(opts.rings.len());
    panel.set_xlim(-maxr, maxr);
    panel.set_ylim(-maxr, maxr);
    panel.hide_all_spines();
    panel.hide_ticks();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dendrogram::four_leaves;
    use crate::figure::{Frame, Primitive};

    const EPS: f64 = 1e-9;

    fn close(a: Point, b: Point) -> bool {
        (a.0 - b.0).abs() < EPS && (a.1 - b.1).abs() < EPS
    }

    fn panel() -> Panel {
        Panel::new(Frame::new(0.0, 0.0, 400.0, 400.0))
    }

    #[test]
    fn rotation_preserves_norm_and_round_trips() {
        for &(x, y) in &[(1.0, 0.0), (0.3, -0.7), (-2.5, 1.25)] {
            for &theta in &[0.0, 17.0, 90.0, 181.5, -45.0, 720.0] {
                let (nx, ny) = rotate_point((x, y), theta);
                assert!(((nx * nx + ny * ny).sqrt() - (x * x + y * y).sqrt()).abs() < EPS);
                assert!(close(rotate_point((nx, ny), -theta), (x, y)));
            }
        }
        assert!(close(rotate_point((1.0, 0.0), 90.0), (0.0, 1.0)));
    }

    #[test]
    fn bridge_endpoints_share_radius() {
        let d = four_leaves();
        for &(open, start) in &[(0.0, 0.0), (90.0, 30.0), (45.0, 200.0)] {
            let m = RadialMapping::new(&d, open, start).unwrap();
            for link in d.links() {
                let g = link_segments(&link, &m);
                assert_eq!(g.radii[1], g.radii[2]);
                let r1 = (g.points[1].0.powi(2) + g.points[1].1.powi(2)).sqrt();
                let r2 = (g.points[2].0.powi(2) + g.points[2].1.powi(2)).sqrt();
                assert!((r1 - r2).abs() < EPS);
            }
        }
    }

    #[test]
    fn root_maps_to_centre_and_leaves_to_unit_circle() {
        let d = four_leaves();
        let m = RadialMapping::new(&d, 0.0, 0.0).unwrap();
        assert_eq!(m.radius(3.0), 0.0);
        assert_eq!(m.radius(0.0), 1.0);
        assert!(close(m.project(35.0, 0.0), (1.0, 0.0)));
    }

    #[test]
    fn upper_and_lower_bridges_stay_on_their_half() {
        let r = 0.5;
        let upper = bridge((0.5, 0.0), (-0.5, 0.0), r);
        assert_eq!(upper.len(), 1);
        assert_eq!(upper[0].len(), ARC_SAMPLES);
        assert!(upper[0].iter().all(|p| p.1 >= 0.0));
        assert!(close(upper[0][ARC_SAMPLES / 2], (0.0, 0.5)) || upper[0][ARC_SAMPLES / 2].1 > 0.49);

        let lower = bridge((-0.3, -0.4), (0.3, -0.4), r);
        assert_eq!(lower.len(), 1);
        assert!(lower[0].iter().all(|p| p.1 <= 0.0));
    }

    #[test]
    fn crossing_bridges_meet_on_the_axis() {
        let r = 0.8;
        let down = bridge((0.0, 0.8), (0.0, -0.8), r);
        assert_eq!(down.len(), 2);
        let end_first = *down[0].last().unwrap();
        let start_second = down[1][0];
        assert!(close(end_first, (-r, 0.0)));
        assert!(close(start_second, (-r, 0.0)));

        let up = bridge((0.0, -0.8), (0.0, 0.8), r);
        assert_eq!(up.len(), 2);
        assert!(close(*up[0].last().unwrap(), (r, 0.0)));
        assert!(close(up[1][0], (r, 0.0)));
        for p in up.iter().flatten() {
            assert!(((p.0 * p.0 + p.1 * p.1).sqrt() - r).abs() < 1e-9);
        }
    }

    #[test]
    fn rounding_never_yields_nan() {
        let r = 0.3;
        let arcs = bridge((0.30000000000000004, 0.0), (-0.3, 0.0), r);
        assert!(arcs.iter().flatten().all(|p| p.0.is_finite() && p.1.is_finite()));
    }

    #[test]
    fn four_leaf_anchors_follow_full_circle() {
        let d = four_leaves();
        let m = RadialMapping::new(&d, 0.0, 0.0).unwrap();
        let anchors = collect_leaves(&d, &m, 0.0);
        assert_eq!(anchors.len(), d.ivl.len());

        let xs: Vec<f64> = anchors.iter().map(|a| a.source_x).collect();
        assert_eq!(xs, vec![5.0, 15.0, 25.0, 35.0]);
        for a in &anchors {
            let expected_deg = a.source_x / 35.0 * 360.0;
            assert!((a.rotation - expected_deg).abs() < EPS);
            let theta = expected_deg.to_radians();
            assert!(close((a.x, a.y), (theta.cos(), theta.sin())));
            assert!(close((a.label_x, a.label_y), (1.05 * theta.cos(), 1.05 * theta.sin())));
        }
        // the last leaf closes the circle at angle 0
        assert!(close((anchors[3].x, anchors[3].y), (1.0, 0.0)));
    }

    /// `((a,(b,c)),d)`: sorted links meet the leaves as 5, 35, 15, 25.
    fn unbalanced() -> Dendrogram {
        Dendrogram {
            icoord: vec![[15.0, 15.0, 25.0, 25.0], [5.0, 5.0, 20.0, 20.0], [12.5, 12.5, 35.0, 35.0]],
            dcoord: vec![[0.0, 1.0, 1.0, 0.0], [0.0, 2.0, 2.0, 1.0], [2.0, 3.0, 3.0, 0.0]],
            color_list: vec!["C1".into(), "C1".into(), "C0".into()],
            ivl: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            leaves: vec![0, 1, 2, 3],
        }
    }

    #[test]
    fn unbalanced_anchors_follow_leaf_axis() {
        let d = unbalanced();
        let m = RadialMapping::new(&d, 0.0, 0.0).unwrap();
        let anchors = collect_leaves(&d, &m, 0.0);
        let xs: Vec<f64> = anchors.iter().map(|a| a.source_x).collect();
        assert_eq!(xs, vec![5.0, 15.0, 25.0, 35.0]);

        let mut p = panel();
        circulartree(&d, &CircularOptions::default(), &mut p).unwrap();
        let texts: Vec<(Point, &str)> = p
            .primitives
            .iter()
            .filter_map(|prim| match prim {
                Primitive::Text { at, text, .. } => Some((*at, text.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(texts.iter().map(|t| t.1).collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
        for (anchor, (at, _)) in anchors.iter().zip(&texts) {
            assert!(close(*at, (anchor.label_x, anchor.label_y)));
        }
    }

    #[test]
    fn open_angle_shrinks_span() {
        let d = four_leaves();
        let m = RadialMapping::new(&d, 90.0, 0.0).unwrap();
        let anchors = collect_leaves(&d, &m, 0.0);
        let last = anchors.last().unwrap();
        assert!((last.rotation - 270.0).abs() < EPS);
        let theta = 270f64.to_radians();
        assert!(close((last.x, last.y), (theta.cos(), theta.sin())));
        for a in &anchors {
            assert!((a.rotation - 270.0 * a.source_x / 35.0).abs() < EPS);
        }
    }

    #[test]
    fn start_angle_rotates_labels() {
        let d = four_leaves();
        let m = RadialMapping::new(&d, 0.0, 90.0).unwrap();
        let anchors = collect_leaves(&d, &m, 0.0);
        assert!((anchors[3].rotation - 450.0).abs() < EPS);
        assert!(close((anchors[3].x, anchors[3].y), (0.0, 1.0)));
    }

    #[test]
    fn degenerate_trees_are_rejected() {
        let single = Dendrogram {
            icoord: vec![[0.0; 4]],
            dcoord: vec![[0.0; 4]],
            color_list: vec!["C0".into()],
            ivl: vec!["only".into()],
            leaves: vec![],
        };
        assert!(matches!(RadialMapping::new(&single, 0.0, 0.0), Err(PlotError::InvalidInput(_))));
        let mut p = panel();
        assert!(matches!(
            circulartree(&single, &CircularOptions::default(), &mut p),
            Err(PlotError::InvalidInput(_))
        ));

        let flat = Dendrogram { icoord: vec![[5.0, 5.0, 15.0, 15.0]], dcoord: vec![[0.0; 4]], ..single.clone() };
        assert!(matches!(RadialMapping::new(&flat, 0.0, 0.0), Err(PlotError::InvalidInput(_))));

        let empty = Dendrogram { icoord: vec![], dcoord: vec![], color_list: vec![], ..single };
        assert!(matches!(RadialMapping::new(&empty, 0.0, 0.0), Err(PlotError::InvalidInput(_))));
    }

    #[test]
    fn label_count_mismatch_is_an_error() {
        let mut d = four_leaves();
        d.ivl.push("e".into());
        d.leaves.clear();
        let mut p = panel();
        match circulartree(&d, &CircularOptions::default(), &mut p) {
            Err(PlotError::LeafCountMismatch { expected, actual }) => {
                assert_eq!(expected, 5);
                assert_eq!(actual, 4);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(p.primitives.is_empty());
    }

    #[test]
    fn draws_links_labels_and_limits() {
        let d = four_leaves();
        let mut p = panel();
        circulartree(&d, &CircularOptions::default(), &mut p).unwrap();

        let texts: Vec<&str> = p
            .primitives
            .iter()
            .filter_map(|prim| match prim {
                Primitive::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["a", "b", "c", "d"]);
        assert_eq!(p.xlim, (-1.05, 1.05));
        assert!(!p.spines.left && p.x_axis.is_none());
        assert!(p.primitives.iter().all(|prim| match prim {
            Primitive::Line { color, .. } => *color == Rgb::BLACK,
            _ => true,
        }));
    }

    #[test]
    fn branch_colors_skip_above_threshold_links() {
        let d = four_leaves();
        let opts = CircularOptions { branch_color: true, add_labels: false, ..Default::default() };
        let mut p = panel();
        circulartree(&d, &opts, &mut p).unwrap();
        let colors: FxHashSet<(u8, u8, u8)> = p
            .primitives
            .iter()
            .filter_map(|prim| match prim {
                Primitive::Line { color, .. } => Some((color.0, color.1, color.2)),
                _ => None,
            })
            .collect();
        // black for C0 plus two palette colors
        assert_eq!(colors.len(), 3);
        assert!(colors.contains(&(0, 0, 0)));
    }

    fn categories() -> CategoryColors {
        vec![
            ("a".into(), CategoryColor { color: Rgb(255, 0, 0), category: "red".into() }),
            ("b".into(), CategoryColor { color: Rgb(0, 0, 255), category: "blue".into() }),
            ("c".into(), CategoryColor { color: Rgb(255, 0, 0), category: "red".into() }),
            ("d".into(), CategoryColor { color: Rgb(250, 0, 0), category: "red".into() }),
        ]
    }

    #[test]
    fn point_legend_has_one_entry_per_category() {
        let entries = point_legend(&categories());
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["red", "blue"]);
        assert_eq!(entries[0].color, Rgb(255, 0, 0));
    }

    #[test]
    fn colored_points_add_a_legend() {
        let d = four_leaves();
        let opts = CircularOptions { add_points: true, point_colors: Some(categories()), ..Default::default() };
        let mut p = panel();
        circulartree(&d, &opts, &mut p).unwrap();
        let markers = p.primitives.iter().filter(|prim| matches!(prim, Primitive::Marker { .. })).count();
        assert_eq!(markers, 4);
        assert_eq!(p.legends.len(), 1);
        assert_eq!(p.legends[0].title.as_deref(), Some("Category"));
    }

    #[test]
    fn short_color_map_is_rejected() {
        let d = four_leaves();
        let mut map = categories();
        map.pop();
        let opts = CircularOptions { label_colors: Some(map), ..Default::default() };
        let mut p = panel();
        assert!(matches!(
            circulartree(&d, &opts, &mut p),
            Err(PlotError::ColorMapMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn rings_widen_the_window_and_add_legends() {
        let d = four_leaves();
        let ring = ColorRing { name: "host".into(), classes: vec!["x".into(), "y".into(), "x".into(), "z".into()] };
        let opts = CircularOptions { rings: vec![ring.clone(), ring], ..Default::default() };
        let mut p = panel();
        circulartree(&d, &opts, &mut p).unwrap();
        let expected = 1.05 + 0.2 + 0.05;
        assert!((p.xlim.1 - expected).abs() < EPS);
        assert!((ring_offset(2) - 0.3).abs() < EPS);
        assert_eq!(p.legends.len(), 2);
        let wedges = p.primitives.iter().filter(|prim| matches!(prim, Primitive::Polygon { .. })).count();
        assert_eq!(wedges, 8);
    }
}
