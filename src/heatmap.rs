//! Heatmaps whose rows line up with a dendrogram's leaves.
//!
//! Row `i` occupies `[10i, 10i + 10]` on the y axis, the same band a
//! rectangular dendrogram gives its `i`-th leaf, so a heatmap reindexed to
//! the leaf order can sit right next to the tree.

use log::{debug, info};

use crate::color::{get_colormap, Colormap, Rgb};
use crate::dendrogram::LEAF_SPACING;
use crate::error::{PlotError, Result};
use crate::figure::{Axis, AxisSide, Frame, Panel};
use crate::matrix::Matrix;

/// Entries of the resampled lookup table.
const LUT_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum CmapChoice {
    Named(String),
    Colors(Vec<Rgb>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapOptions {
    pub order: Option<Vec<String>>,
    pub cmap: Option<CmapChoice>,
    pub yticklabel: bool,
    pub vmin: f64,
    pub vmax: f64,
    pub center: Option<f64>,
    /// Tick label size in points.
    pub font_size: f64,
    /// Resolution used to turn the panel size into inches for tick thinning.
    pub dpi: f64,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        HeatmapOptions {
            order: None,
            cmap: None,
            yticklabel: true,
            vmin: 0.0,
            vmax: 100.0,
            center: None,
            font_size: 10.0,
            dpi: 100.0,
        }
    }
}

/// Value-to-color lookup of a drawn heatmap, reused for its colorbar.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    pub lut: Colormap,
    pub vmin: f64,
    pub vmax: f64,
    pub under: Rgb,
    pub over: Rgb,
}

impl ColorScale {
    pub fn new(opts: &HeatmapOptions) -> Result<Self> {
        if opts.vmax.is_nan() || opts.vmin.is_nan() || opts.vmax <= opts.vmin {
            return Err(PlotError::InvalidOption(format!(
                "vmax ({}) must be greater than vmin ({})",
                opts.vmax, opts.vmin
            )));
        }
        let base = match &opts.cmap {
            Some(CmapChoice::Named(name)) => get_colormap(name)?,
            Some(CmapChoice::Colors(colors)) if !colors.is_empty() => Colormap::Listed(colors.clone()),
            Some(CmapChoice::Colors(_)) => {
                return Err(PlotError::InvalidOption("empty color list".to_string()));
            }
            None if opts.center.is_some() => get_colormap("icefire")?,
            None => get_colormap("rocket")?,
        };

        let lut = match opts.center {
            Some(center) => {
                let vrange = (opts.vmax - center).max(center - opts.vmin);
                let lo = center - vrange;
                let norm = |v: f64| (v - lo) / (2.0 * vrange);
                debug!("Recentred colormap on {} (range {})", center, vrange);
                base.window(norm(opts.vmin), norm(opts.vmax), LUT_SIZE)
            }
            None => base.window(0.0, 1.0, LUT_SIZE),
        };
        Ok(ColorScale { lut, vmin: opts.vmin, vmax: opts.vmax, under: Rgb::OUT_OF_RANGE, over: Rgb::OUT_OF_RANGE })
    }

    /// Cell color, or `None` for a missing value.
    pub fn color(&self, value: f64) -> Option<Rgb> {
        if value.is_nan() {
            return None;
        }
        let t = (value - self.vmin) / (self.vmax - self.vmin);
        if t < 0.0 {
            Some(self.under)
        } else if t > 1.0 {
            Some(self.over)
        } else {
            Some(self.lut.at(t))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAxis {
    X,
    Y,
}

/// Keep every how-many-th label so ticks of `font_pt` fit along `axis_inches`.
///
/// Returns 0 when not even one label fits.
pub fn auto_ticks(n_labels: usize, axis_inches: f64, font_pt: f64) -> usize {
    let max_ticks = (axis_inches / (font_pt / 72.0)).floor();
    if max_ticks.is_nan() || max_ticks < 1.0 {
        return 0;
    }
    n_labels / max_ticks as usize + 1
}

/// Tick positions and labels for every `tick_every`-th label.
pub fn skip_ticks(labels: &[String], tick_every: usize, axis: TickAxis) -> (Vec<f64>, Vec<String>) {
    if tick_every == 0 {
        return (Vec::new(), Vec::new());
    }
    labels
        .iter()
        .enumerate()
        .step_by(tick_every)
        .map(|(i, label)| {
            let pos = match axis {
                TickAxis::X => i as f64 + 0.5,
                TickAxis::Y => LEAF_SPACING * i as f64 + LEAF_SPACING / 2.0,
            };
            (pos, label.clone())
        })
        .unzip()
}

/// Draw `data` as colored cells; returns the color scale for an optional colorbar.
pub fn heatmap(data: &Matrix, opts: &HeatmapOptions, panel: &mut Panel) -> Result<ColorScale> {
    let data = match &opts.order {
        Some(order) => data.reindex(order),
        None => data.clone(),
    };
    if data.nrows() == 0 || data.ncols() == 0 {
        return Err(PlotError::InvalidInput("heatmap data is empty".to_string()));
    }
    info!("Heatmap: {} rows x {} columns", data.nrows(), data.ncols());

    let scale = ColorScale::new(opts)?;
    let mut missing = 0usize;
    for (i, row) in data.values.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            match scale.color(v) {
                Some(fill) => panel.rect(
                    j as f64,
                    LEAF_SPACING * i as f64,
                    1.0,
                    LEAF_SPACING,
                    fill,
                    Some(Rgb::WHITE),
                ),
                None => missing += 1,
            }
        }
    }
    if missing > 0 {
        debug!("{} missing cells left blank", missing);
    }

    panel.set_xlim(0.0, data.ncols() as f64);
    panel.set_ylim(0.0, LEAF_SPACING * data.nrows() as f64);

    let every_x = auto_ticks(data.ncols(), panel.frame.width / opts.dpi, opts.font_size);
    let (xticks, xlabels) = skip_ticks(&data.col_labels, every_x, TickAxis::X);
    let mut x_axis = Axis::new(AxisSide::Bottom, xticks, xlabels);
    x_axis.label_size = opts.font_size;
    panel.set_xticks(x_axis);

    let every_y = auto_ticks(data.nrows(), panel.frame.height / opts.dpi, opts.font_size);
    let (yticks, ylabels) = skip_ticks(&data.row_labels, every_y, TickAxis::Y);
    debug!("Heatmap ticks: every {} column(s), every {} row(s)", every_x, every_y);
    let mut y_axis = Axis::new(AxisSide::Right, yticks, ylabels);
    y_axis.label_size = opts.font_size;
    y_axis.show_labels = opts.yticklabel;
    y_axis.show_marks = opts.yticklabel;
    panel.set_yticks(y_axis);

    Ok(scale)
}

/// Horizontal colorbar spanning `[vmin, vmax]`.
pub fn colorbar(scale: &ColorScale, frame: Frame) -> Panel {
    let mut panel = Panel::new(frame);
    panel.set_xlim(scale.vmin, scale.vmax);
    panel.set_ylim(0.0, 1.0);
    let step = (scale.vmax - scale.vmin) / LUT_SIZE as f64;
    for k in 0..LUT_SIZE {
        let x = scale.vmin + step * k as f64;
        let fill = scale.lut.at((k as f64 + 0.5) / LUT_SIZE as f64);
        panel.rect(x, 0.0, step, 1.0, fill, None);
    }
    panel.set_xticks(Axis::numeric(AxisSide::Bottom, crate::figure::nice_ticks(scale.vmin, scale.vmax)));
    panel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::Primitive;

    fn labels(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    #[test]
    fn thins_labels_to_fit() {
        assert_eq!(auto_ticks(100, 2.0, 10.0), 8);
        assert_eq!(auto_ticks(5, 2.0, 10.0), 1);
        assert_eq!(auto_ticks(5, 0.1, 10.0), 0);

        let names = labels("r", 20);
        let (ticks, kept) = skip_ticks(&names, 8, TickAxis::Y);
        assert_eq!(ticks, vec![5.0, 85.0, 165.0]);
        assert_eq!(kept, vec!["r0", "r8", "r16"]);

        let (ticks, kept) = skip_ticks(&names[..3], 1, TickAxis::X);
        assert_eq!(ticks, vec![0.5, 1.5, 2.5]);
        assert_eq!(kept.len(), 3);
        assert_eq!(skip_ticks(&names, 0, TickAxis::X), (vec![], vec![]));
    }

    #[test]
    fn out_of_range_values_use_grey() {
        let scale = ColorScale::new(&HeatmapOptions::default()).unwrap();
        assert_eq!(scale.color(-1.0), Some(Rgb::OUT_OF_RANGE));
        assert_eq!(scale.color(101.0), Some(Rgb::OUT_OF_RANGE));
        assert_eq!(scale.color(f64::NAN), None);
        assert_eq!(scale.color(0.0), get_colormap("rocket").ok().map(|c| c.at(0.0)));
    }

    #[test]
    fn centred_scale_puts_center_in_the_middle() {
        let opts = HeatmapOptions { vmin: -10.0, vmax: 10.0, center: Some(0.0), ..Default::default() };
        let scale = ColorScale::new(&opts).unwrap();
        let icefire = get_colormap("icefire").unwrap();
        assert_eq!(scale.color(-10.0), Some(icefire.at(0.0)));
        assert_eq!(scale.color(10.0), Some(icefire.at(1.0)));
    }

    #[test]
    fn asymmetric_center_uses_part_of_the_map() {
        let opts = HeatmapOptions { vmin: 0.0, vmax: 10.0, center: Some(8.0), ..Default::default() };
        let scale = ColorScale::new(&opts).unwrap();
        // vrange is 8: vmin maps to the start, vmax to 10/16 of the map
        let icefire = get_colormap("icefire").unwrap();
        assert_eq!(scale.color(0.0), Some(icefire.at(0.0)));
        assert_eq!(scale.color(10.0), Some(icefire.at(10.0 / 16.0)));
    }

    #[test]
    fn reorders_rows_and_labels_together() {
        let m = Matrix::new(
            vec!["a".into(), "b".into()],
            vec!["x".into()],
            vec![vec![0.0], vec![100.0]],
        )
        .unwrap();
        let opts = HeatmapOptions {
            order: Some(vec!["b".into(), "a".into()]),
            cmap: Some(CmapChoice::Colors(vec![Rgb::BLACK, Rgb::WHITE])),
            ..Default::default()
        };
        let mut panel = Panel::new(Frame::new(0.0, 0.0, 200.0, 200.0));
        heatmap(&m, &opts, &mut panel).unwrap();

        let fills: Vec<(f64, Rgb)> = panel
            .primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Rect { y, fill, .. } => Some((*y, *fill)),
                _ => None,
            })
            .collect();
        assert_eq!(fills, vec![(0.0, Rgb::WHITE), (10.0, Rgb::BLACK)]);
        assert_eq!(panel.y_axis.as_ref().unwrap().labels, vec!["b", "a"]);
        assert_eq!(panel.y_axis.as_ref().unwrap().side, AxisSide::Right);
        assert_eq!(panel.ylim, (0.0, 20.0));
    }

    #[test]
    fn missing_cells_are_blank() {
        let m = Matrix::new(vec!["a".into()], vec!["x".into(), "y".into()], vec![vec![f64::NAN, 5.0]]).unwrap();
        let mut panel = Panel::new(Frame::new(0.0, 0.0, 200.0, 200.0));
        heatmap(&m, &HeatmapOptions::default(), &mut panel).unwrap();
        assert_eq!(panel.primitives.len(), 1);
    }

    #[test]
    fn rejects_inverted_limits() {
        let opts = HeatmapOptions { vmin: 5.0, vmax: 5.0, ..Default::default() };
        assert!(matches!(ColorScale::new(&opts), Err(PlotError::InvalidOption(_))));
    }
}
