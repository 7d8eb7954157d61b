//! Static figures for microbial genomics.
//!
//! Every plot writes [`figure::Primitive`]s into a [`figure::Panel`]; a
//! [`figure::Figure`] of panels is then written as SVG or PNG by
//! [`render::save`].

pub mod color;
pub mod dendrogram;
pub mod distance;
pub mod error;
pub mod figure;
pub mod genes;
pub mod heatmap;
pub mod io;
pub mod matrix;
pub mod phylo;
pub mod render;
pub mod tnseq;

pub use error::{PlotError, Result};
