//! Dendrogram coordinates and the layouts that draw them.
//!
//! A [`Dendrogram`] is the coordinate dictionary a hierarchical clustering
//! produces: one U-shaped link per merge (`icoord`/`dcoord`), a color key per
//! link and the leaf labels in left-to-right order. It is either read from
//! JSON or computed here from a distance matrix ([`linkage`] + [`dendrogram`]).

pub mod circular;
pub mod linkage;
pub mod rectangular;

use serde::Deserialize;

use crate::error::{PlotError, Result};

pub use linkage::{dendrogram, linkage, LinkageMatrix, Method};

/// Horizontal spacing between neighbouring leaves in rectangular coordinates.
pub const LEAF_SPACING: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Dendrogram {
    pub icoord: Vec<[f64; 4]>,
    pub dcoord: Vec<[f64; 4]>,
    pub color_list: Vec<String>,
    pub ivl: Vec<String>,
    /// Original observation index of every leaf, in `ivl` order.
    #[serde(default)]
    pub leaves: Vec<usize>,
}

/// One U-shaped connector: left leg `x[0..2]`, bridge at `y[1] == y[2]`, right leg `x[2..4]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link<'a> {
    pub x: [f64; 4],
    pub y: [f64; 4],
    pub color: &'a str,
}

impl Dendrogram {
    pub fn validate(&self) -> Result<()> {
        if self.icoord.len() != self.dcoord.len() || self.icoord.len() != self.color_list.len() {
            return Err(PlotError::InvalidInput(format!(
                "icoord, dcoord and color_list lengths differ ({}, {}, {})",
                self.icoord.len(),
                self.dcoord.len(),
                self.color_list.len()
            )));
        }
        if self.icoord.is_empty() {
            return Err(PlotError::InvalidInput("dendrogram has no links".to_string()));
        }
        if self.ivl.is_empty() {
            return Err(PlotError::InvalidInput("dendrogram has no leaf labels".to_string()));
        }
        if !self.leaves.is_empty() && self.leaves.len() != self.ivl.len() {
            return Err(PlotError::InvalidInput(format!(
                "{} leaf indices for {} leaf labels",
                self.leaves.len(),
                self.ivl.len()
            )));
        }
        Ok(())
    }

    pub fn links(&self) -> impl Iterator<Item = Link<'_>> + '_ {
        self.icoord
            .iter()
            .zip(&self.dcoord)
            .zip(&self.color_list)
            .map(|((x, y), c)| Link { x: *x, y: *y, color: c.as_str() })
    }

    /// Links in lexicographic `(icoord, dcoord, color)` order.
    pub fn sorted_links(&self) -> Vec<Link<'_>> {
        let mut links: Vec<Link> = self.links().collect();
        links.sort_by(|a, b| {
            cmp_f64s(&a.x, &b.x)
                .then_with(|| cmp_f64s(&a.y, &b.y))
                .then_with(|| a.color.cmp(b.color))
        });
        links
    }

    pub fn leaf_count(&self) -> usize {
        self.ivl.len()
    }

    /// Rectangular x position of every leaf: `5, 15, 25, ...`.
    pub fn leaf_ticks(&self) -> Vec<f64> {
        (0..self.ivl.len()).map(|i| LEAF_SPACING * i as f64 + LEAF_SPACING / 2.0).collect()
    }

    pub fn max_x(&self) -> f64 {
        self.icoord.iter().flatten().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn max_height(&self) -> f64 {
        self.dcoord.iter().flatten().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Distinct color keys, sorted.
    pub fn unique_colors(&self) -> Vec<&str> {
        let mut colors: Vec<&str> = self.color_list.iter().map(String::as_str).collect();
        colors.sort_unstable();
        colors.dedup();
        colors
    }
}

fn cmp_f64s(a: &[f64; 4], b: &[f64; 4]) -> std::cmp::Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(std::cmp::Ordering::Equal)
}

#[cfg(test)]
pub(crate) fn four_leaves() -> Dendrogram {
    // ((a, b), (c, d)) merged at heights 1, 2 and 3
    Dendrogram {
        icoord: vec![[5.0, 5.0, 15.0, 15.0], [25.0, 25.0, 35.0, 35.0], [10.0, 10.0, 30.0, 30.0]],
        dcoord: vec![[0.0, 1.0, 1.0, 0.0], [0.0, 2.0, 2.0, 0.0], [1.0, 3.0, 3.0, 2.0]],
        color_list: vec!["C1".into(), "C2".into(), "C0".into()],
        ivl: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        leaves: vec![0, 1, 2, 3],
    }
}
