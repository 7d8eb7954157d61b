pub mod newick;

use log::{debug, info};

pub use newick::{NodeId, Tree, TreeNode};

use crate::color::Rgb;
use crate::error::{PlotError, Result};
use crate::figure::{step_ticks, Axis, AxisSide, HAlign, Panel, TextStyle, VAlign};

const ROW_HEIGHT: f64 = 10.0;
const LEADER_WIDTH: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct PhyloOptions {
    pub show_label: bool,
    /// Put all tip labels in one column right of the deepest tip.
    pub align_label: bool,
    pub label_size: f64,
    pub color: Rgb,
    pub line_width: f64,
}

impl Default for PhyloOptions {
    fn default() -> Self {
        PhyloOptions {
            show_label: true,
            align_label: false,
            label_size: 8.0,
            color: Rgb::BLACK,
            line_width: 1.0,
        }
    }
}

/// Distance of every node from the root, indexed by `NodeId`.
///
/// A tree without any branch lengths is laid out with unit lengths.
pub fn x_positions(tree: &Tree) -> Vec<f64> {
    let scaled = depths(tree, |node| node.length.unwrap_or(0.0));
    if scaled.iter().any(|d| *d != 0.0) {
        scaled
    } else {
        depths(tree, |_| 1.0)
    }
}

fn depths(tree: &Tree, length: impl Fn(&TreeNode) -> f64) -> Vec<f64> {
    let mut out = vec![0.0; tree.nodes.len()];
    out[tree.root] = tree.node(tree.root).length.unwrap_or(0.0);
    let mut stack = vec![tree.root];
    while let Some(id) = stack.pop() {
        for &child in &tree.node(id).children {
            out[child] = out[id] + length(tree.node(child));
            stack.push(child);
        }
    }
    out
}

/// Row of every node: the first tip sits on row 1, the last on row `n`;
/// an internal node is centred between its first and last child.
pub fn y_positions(tree: &Tree) -> Vec<f64> {
    let mut out = vec![0.0; tree.nodes.len()];
    let tips = tree.terminals();
    let n = tips.len();
    for (i, &tip) in tips.iter().rev().enumerate() {
        out[tip] = (n - i) as f64;
    }
    fill_internal(tree, tree.root, &mut out);
    out
}

fn fill_internal(tree: &Tree, id: NodeId, out: &mut [f64]) -> f64 {
    let children = &tree.node(id).children;
    if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
        for &child in children {
            fill_internal(tree, child, out);
        }
        out[id] = (out[first] + out[last]) / 2.0;
    }
    out[id]
}

/// Branch drawing state shared by the recursive walk.
struct CladeLines<'a> {
    xs: &'a [f64],
    ys: &'a [f64],
    xmax: f64,
    opts: &'a PhyloOptions,
    labels: Vec<(f64, String)>,
}

impl CladeLines<'_> {
    fn row(&self, id: NodeId) -> f64 {
        (self.ys[id] - 0.5) * ROW_HEIGHT
    }

    fn draw(&mut self, tree: &Tree, id: NodeId, x_start: f64, panel: &mut Panel) {
        let node = tree.node(id);
        let x_here = self.xs[id];
        let y_here = self.row(id);
        panel.line((x_start, y_here), (x_here, y_here), self.opts.color, self.opts.line_width);

        if node.is_leaf() {
            let name = node.name.clone().unwrap_or_default();
            if self.opts.show_label {
                let style = TextStyle::new(self.opts.label_size).align(HAlign::Left, VAlign::Center);
                if self.opts.align_label {
                    panel.text((self.xmax * 1.16, y_here), format!(" {}", name), style);
                    panel.dashed_line((x_here, y_here), (self.xmax * 1.15, y_here), Rgb::GREY, LEADER_WIDTH);
                } else {
                    panel.text((x_here, y_here), format!(" {}", name), style);
                }
            }
            self.labels.push((y_here, name));
            return;
        }

        if let (Some(&first), Some(&last)) = (node.children.first(), node.children.last()) {
            panel.line((x_here, self.row(first)), (x_here, self.row(last)), self.opts.color, self.opts.line_width);
        }
        for &child in &node.children {
            self.draw(tree, child, x_here, panel);
        }
    }
}

/// Draw `tree` as a rectangular phylogram with the root on the left.
///
/// Returns the tip labels from the bottom row to the top one.
pub fn phylotree(tree: &Tree, opts: &PhyloOptions, panel: &mut Panel) -> Result<Vec<String>> {
    if opts.align_label && !opts.show_label {
        return Err(PlotError::InvalidOption(
            "align_label requires show_label to be enabled".to_string(),
        ));
    }

    let xs = x_positions(tree);
    if let Some(bad) = xs.iter().find(|x| !x.is_finite()) {
        return Err(PlotError::InvalidInput(format!("tree depth {} is not finite", bad)));
    }
    let ys = y_positions(tree);
    let xmax = xs.iter().cloned().fold(0.0, f64::max);
    let ymax = ys.iter().cloned().fold(0.0, f64::max);
    info!("Phylogenetic tree: {} tips, depth {:.4}", tree.count_terminals(), xmax);

    let mut lines = CladeLines { xs: &xs, ys: &ys, xmax, opts, labels: Vec::new() };
    lines.draw(tree, tree.root, 0.0, panel);
    debug!("Drew {} primitives", panel.primitives.len());

    panel.set_xlim(-0.05 * xmax, 1.25 * xmax);
    panel.set_ylim(0.0, ymax * ROW_HEIGHT);
    panel.set_xticks(Axis::numeric(AxisSide::Top, step_ticks(0.5, 1.25 * xmax + 0.5)));
    panel.y_axis = None;
    panel.hide_spines(&[AxisSide::Bottom, AxisSide::Right, AxisSide::Left]);

    let mut labels = lines.labels;
    labels.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(labels.into_iter().map(|(_, name)| name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::{Frame, LineStyle, Primitive};

    fn panel() -> Panel {
        Panel::new(Frame::new(0.0, 0.0, 400.0, 300.0))
    }

    fn texts(panel: &Panel) -> Vec<(f64, f64, String)> {
        panel
            .primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Text { at, text, .. } => Some((at.0, at.1, text.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn positions_follow_branch_lengths() {
        let tree = Tree::from_newick("((A:1,B:2):1,C:1);").unwrap();
        let xs = x_positions(&tree);
        let ys = y_positions(&tree);
        let tips = tree.terminals();
        assert_eq!(tips.iter().map(|&t| xs[t]).collect::<Vec<_>>(), vec![2.0, 3.0, 1.0]);
        assert_eq!(tips.iter().map(|&t| ys[t]).collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        let ab = tree.node(tree.root).children[0];
        assert_eq!(xs[ab], 1.0);
        assert_eq!(ys[ab], 1.5);
        assert_eq!(ys[tree.root], 2.25);
    }

    #[test]
    fn unit_lengths_when_tree_has_none() {
        let tree = Tree::from_newick("((A,B),C);").unwrap();
        let xs = x_positions(&tree);
        let tips = tree.terminals();
        assert_eq!(tips.iter().map(|&t| xs[t]).collect::<Vec<_>>(), vec![2.0, 2.0, 1.0]);
    }

    #[test]
    fn draws_branches_labels_and_limits() {
        let tree = Tree::from_newick("((A:1,B:2):1,C:1);").unwrap();
        let mut p = panel();
        let order = phylotree(&tree, &PhyloOptions::default(), &mut p).unwrap();
        assert_eq!(order, vec!["A", "B", "C"]);
        assert!((p.xlim.0 + 0.15).abs() < 1e-12);
        assert_eq!(p.xlim.1, 3.75);
        assert_eq!(p.ylim, (0.0, 30.0));
        assert!(p.y_axis.is_none());
        let ticks = &p.x_axis.as_ref().unwrap().ticks;
        assert_eq!(ticks.first(), Some(&0.0));
        assert_eq!(ticks.last(), Some(&4.0));

        let labels = texts(&p);
        assert_eq!(labels.len(), 3);
        assert!(labels.contains(&(3.0, 15.0, " B".to_string())));

        // root stub, root vertical, then the (A,B) clade
        match &p.primitives[1] {
            Primitive::Line { points, .. } => assert_eq!(points, &vec![(0.0, 10.0), (0.0, 25.0)]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn aligned_labels_get_leaders() {
        let tree = Tree::from_newick("(A:1,B:2);").unwrap();
        let opts = PhyloOptions { align_label: true, ..Default::default() };
        let mut p = panel();
        phylotree(&tree, &opts, &mut p).unwrap();
        let leaders = p
            .primitives
            .iter()
            .filter(|prim| matches!(prim, Primitive::Line { style: LineStyle::Dashed, .. }))
            .count();
        assert_eq!(leaders, 2);
        assert!(texts(&p).iter().all(|(x, _, _)| (*x - 2.32).abs() < 1e-12));
    }

    #[test]
    fn deep_trees_get_coarse_ticks() {
        let tree = Tree::from_newick("(A:1,B:4000000000);").unwrap();
        let mut p = panel();
        phylotree(&tree, &PhyloOptions::default(), &mut p).unwrap();
        let ticks = &p.x_axis.as_ref().unwrap().ticks;
        assert!(ticks.len() <= crate::figure::MAX_STEP_TICKS);
        assert_eq!(ticks[1], 5e8);
    }

    #[test]
    fn aligned_without_labels_is_rejected() {
        let tree = Tree::from_newick("(A:1,B:2);").unwrap();
        let opts = PhyloOptions { align_label: true, show_label: false, ..Default::default() };
        assert!(matches!(phylotree(&tree, &opts, &mut panel()), Err(PlotError::InvalidOption(_))));
    }
}
