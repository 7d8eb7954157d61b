use std::str::FromStr;

use log::debug;

use super::{Dendrogram, LEAF_SPACING};
use crate::error::{PlotError, Result};

/// Rows of `(cluster_a, cluster_b, height, size)`; merge `i` creates cluster `n + i`.
pub type LinkageMatrix = Vec<[f64; 4]>;

/// Fraction of the highest merge below which subtrees get their own color.
const COLOR_THRESHOLD_RATIO: f64 = 0.7;
const ABOVE_THRESHOLD_COLOR: &str = "C0";
const LINK_COLOR_PALETTE: [&str; 9] = ["C1", "C2", "C3", "C4", "C5", "C6", "C7", "C8", "C9"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    Single,
    #[default]
    Complete,
    Average,
    Weighted,
}

impl FromStr for Method {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(Method::Single),
            "complete" => Ok(Method::Complete),
            "average" => Ok(Method::Average),
            "weighted" => Ok(Method::Weighted),
            other => Err(PlotError::InvalidOption(format!("unknown linkage method '{}'", other))),
        }
    }
}

impl Method {
    /// Lance-Williams update of the distance from cluster `k` to the union of `i` and `j`.
    fn update(self, d_ik: f64, d_jk: f64, n_i: f64, n_j: f64) -> f64 {
        match self {
            Method::Single => d_ik.min(d_jk),
            Method::Complete => d_ik.max(d_jk),
            Method::Average => (n_i * d_ik + n_j * d_jk) / (n_i + n_j),
            Method::Weighted => (d_ik + d_jk) / 2.0,
        }
    }
}

/// Agglomerative clustering of a square distance matrix.
///
/// Merges the closest pair of active clusters until one remains; ties go to
/// the lowest index pair. Each row lists the smaller cluster id first.
pub fn linkage(distances: &[Vec<f64>], method: Method) -> Result<LinkageMatrix> {
    let n = distances.len();
    if n < 2 {
        return Err(PlotError::InvalidInput(format!(
            "clustering needs at least 2 observations, got {}",
            n
        )));
    }
    for (i, row) in distances.iter().enumerate() {
        if row.len() != n {
            return Err(PlotError::InvalidInput(format!(
                "distance matrix row {} has {} columns, expected {}",
                i,
                row.len(),
                n
            )));
        }
        if let Some(v) = row.iter().find(|v| !v.is_finite()) {
            return Err(PlotError::InvalidInput(format!("non-finite distance {} in row {}", v, i)));
        }
    }

    let mut d: Vec<Vec<f64>> = distances.to_vec();
    // slot -> (cluster id, size); None once merged away
    let mut slots: Vec<Option<(usize, usize)>> = (0..n).map(|i| Some((i, 1))).collect();
    let mut z: LinkageMatrix = Vec::with_capacity(n - 1);

    for step in 0..n - 1 {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..n {
            if slots[i].is_none() {
                continue;
            }
            for j in (i + 1)..n {
                if slots[j].is_none() {
                    continue;
                }
                // the matrix may be slightly asymmetric; use the mean
                let dist = (d[i][j] + d[j][i]) / 2.0;
                if best.map_or(true, |(_, _, b)| dist < b) {
                    best = Some((i, j, dist));
                }
            }
        }
        let Some((i, j, height)) = best else {
            break;
        };
        let (Some((id_i, n_i)), Some((id_j, n_j))) = (slots[i], slots[j]) else {
            break;
        };

        for k in 0..n {
            if k == i || k == j || slots[k].is_none() {
                continue;
            }
            let updated = method.update(d[i][k], d[j][k], n_i as f64, n_j as f64);
            d[i][k] = updated;
            d[k][i] = updated;
        }
        slots[i] = Some((n + step, n_i + n_j));
        slots[j] = None;

        let (a, b) = if id_i < id_j { (id_i, id_j) } else { (id_j, id_i) };
        z.push([a as f64, b as f64, height, (n_i + n_j) as f64]);
    }

    debug!("Linkage ({:?}): {} observations, {} merges", method, n, z.len());
    Ok(z)
}

/// Depth-first accumulator for the rectangular layout.
struct Layout<'a> {
    z: &'a LinkageMatrix,
    n: usize,
    labels: &'a [String],
    threshold: f64,
    current_color: usize,
    below_threshold: bool,
    dendro: Dendrogram,
}

impl Layout<'_> {
    /// Lay out cluster `id` starting at leaf offset `iv`; returns `(centre, width, height)`.
    fn place(&mut self, id: usize, iv: f64) -> (f64, f64, f64) {
        if id < self.n {
            self.dendro.ivl.push(self.labels[id].clone());
            self.dendro.leaves.push(id);
            return (iv + LEAF_SPACING / 2.0, LEAF_SPACING, 0.0);
        }
        let row = self.z[id - self.n];
        let (a, b, h) = (row[0] as usize, row[1] as usize, row[2]);

        let (xa, wa, ha) = self.place(a, iv);

        let color = if h >= self.threshold || self.threshold <= 0.0 {
            if self.below_threshold {
                self.current_color = (self.current_color + 1) % LINK_COLOR_PALETTE.len();
            }
            self.below_threshold = false;
            ABOVE_THRESHOLD_COLOR
        } else {
            self.below_threshold = true;
            LINK_COLOR_PALETTE[self.current_color]
        };

        let (xb, wb, hb) = self.place(b, iv + wa);

        self.dendro.icoord.push([xa, xa, xb, xb]);
        self.dendro.dcoord.push([ha, h, h, hb]);
        self.dendro.color_list.push(color.to_string());
        ((xa + xb) / 2.0, wa + wb, h)
    }
}

/// Rectangular dendrogram coordinates for a linkage matrix.
///
/// Leaves sit at `10i + 5` in traversal order, links are emitted post-order
/// and colored by the `0.7 * max height` threshold rule.
pub fn dendrogram(z: &LinkageMatrix, labels: &[String]) -> Result<Dendrogram> {
    let n = z.len() + 1;
    if z.is_empty() {
        return Err(PlotError::InvalidInput("linkage matrix is empty".to_string()));
    }
    if labels.len() != n {
        return Err(PlotError::InvalidInput(format!(
            "{} labels for {} observations",
            labels.len(),
            n
        )));
    }
    for (i, row) in z.iter().enumerate() {
        let (a, b) = (row[0], row[1]);
        let limit = (n + i) as f64;
        if a < 0.0 || b < 0.0 || a >= limit || b >= limit || a.fract() != 0.0 || b.fract() != 0.0 {
            return Err(PlotError::InvalidInput(format!("linkage row {} refers to an unknown cluster", i)));
        }
    }

    let max_height = z.iter().map(|r| r[2]).fold(f64::NEG_INFINITY, f64::max);
    let mut layout = Layout {
        z,
        n,
        labels,
        threshold: COLOR_THRESHOLD_RATIO * max_height,
        current_color: 0,
        below_threshold: false,
        dendro: Dendrogram {
            icoord: Vec::with_capacity(n - 1),
            dcoord: Vec::with_capacity(n - 1),
            color_list: Vec::with_capacity(n - 1),
            ivl: Vec::with_capacity(n),
            leaves: Vec::with_capacity(n),
        },
    };
    layout.place(2 * n - 2, 0.0);
    Ok(layout.dendro)
}
