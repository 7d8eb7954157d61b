use log::info;

use super::{dendrogram, Dendrogram, LinkageMatrix, LEAF_SPACING};
use crate::color::{cycle_color, Rgb};
use crate::error::{PlotError, Result};
use crate::figure::{step_ticks, Axis, AxisSide, Panel};

const LINE_WIDTH: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RectTreeOptions {
    /// Leaf names by observation index; defaults to `0..n`.
    pub labels: Option<Vec<String>>,
    pub no_labels: bool,
    pub scale_max: f64,
    pub label_size: f64,
}

impl Default for RectTreeOptions {
    fn default() -> Self {
        RectTreeOptions { labels: None, no_labels: false, scale_max: 10.0, label_size: 8.0 }
    }
}

/// Cluster `z` and draw it left-oriented; returns the leaf order.
pub fn rectree(z: &LinkageMatrix, opts: &RectTreeOptions, panel: &mut Panel) -> Result<Vec<String>> {
    let labels = match &opts.labels {
        Some(labels) => labels.clone(),
        None => (0..=z.len()).map(|i| i.to_string()).collect(),
    };
    let dendro = dendrogram(z, &labels)?;
    draw(&dendro, opts, panel)
}

/// Draw precomputed dendrogram coordinates with the root on the left and
/// leaves on the right, merge height growing leftwards.
pub fn draw(dendro: &Dendrogram, opts: &RectTreeOptions, panel: &mut Panel) -> Result<Vec<String>> {
    dendro.validate()?;
    if !opts.scale_max.is_finite() || opts.scale_max <= 0.0 {
        return Err(PlotError::InvalidOption(format!(
            "scale_max must be a positive number, got {}",
            opts.scale_max
        )));
    }
    info!("Rectangular dendrogram: {} leaves", dendro.leaf_count());

    for link in dendro.links() {
        let color = cycle_color(link.color).unwrap_or(Rgb::BLACK);
        let points = (0..4).map(|k| (link.y[k], link.x[k])).collect();
        panel.polyline(points, color, LINE_WIDTH);
    }

    let n = dendro.leaf_count();
    panel.set_xlim(opts.scale_max, 0.0);
    panel.set_ylim(0.0, LEAF_SPACING * n as f64);

    panel.set_xticks(Axis::numeric(AxisSide::Top, step_ticks(1.0, opts.scale_max)));

    let mut leaf_axis = Axis::new(AxisSide::Right, dendro.leaf_ticks(), dendro.ivl.clone());
    leaf_axis.label_size = opts.label_size;
    leaf_axis.show_labels = !opts.no_labels;
    panel.set_yticks(leaf_axis);

    panel.hide_spines(&[AxisSide::Bottom, AxisSide::Right, AxisSide::Left]);
    Ok(dendro.ivl.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dendrogram::{four_leaves, linkage, Method};
    use crate::figure::{Frame, Primitive};

    #[test]
    fn draws_sideways_with_scale_on_top() {
        let d = four_leaves();
        let mut panel = Panel::new(Frame::new(0.0, 0.0, 300.0, 200.0));
        let order = draw(&d, &RectTreeOptions::default(), &mut panel).unwrap();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
        assert_eq!(panel.xlim, (10.0, 0.0));
        assert_eq!(panel.ylim, (0.0, 40.0));

        let x_axis = panel.x_axis.as_ref().unwrap();
        assert_eq!(x_axis.side, AxisSide::Top);
        assert_eq!(x_axis.ticks.len(), 10);
        assert!(panel.spines.top && !panel.spines.bottom);

        match &panel.primitives[0] {
            Primitive::Line { points, color, .. } => {
                assert_eq!(points, &vec![(0.0, 5.0), (1.0, 5.0), (1.0, 15.0), (0.0, 15.0)]);
                assert_eq!(*color, cycle_color("C1").unwrap());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unusable_scale_is_rejected() {
        let d = four_leaves();
        for scale_max in [f64::INFINITY, f64::NAN, 0.0, -2.0] {
            let opts = RectTreeOptions { scale_max, ..Default::default() };
            let mut panel = Panel::new(Frame::new(0.0, 0.0, 300.0, 200.0));
            assert!(matches!(draw(&d, &opts, &mut panel), Err(PlotError::InvalidOption(_))));
            assert!(panel.primitives.is_empty());
        }
    }

    #[test]
    fn rectree_uses_given_labels() {
        let dist = vec![vec![0.0, 3.0, 1.0], vec![3.0, 0.0, 3.5], vec![1.0, 3.5, 0.0]];
        let z = linkage(&dist, Method::Complete).unwrap();
        let opts = RectTreeOptions {
            labels: Some(vec!["x".into(), "y".into(), "z".into()]),
            no_labels: true,
            ..Default::default()
        };
        let mut panel = Panel::new(Frame::new(0.0, 0.0, 300.0, 200.0));
        let order = rectree(&z, &opts, &mut panel).unwrap();
        assert_eq!(order, vec!["y", "x", "z"]);
        assert!(!panel.y_axis.as_ref().unwrap().show_labels);
    }
}
