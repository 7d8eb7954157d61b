use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, error, info};

use microplot::color::{parse_color, Rgb};
use microplot::dendrogram::circular::{circulartree, CircularOptions};
use microplot::dendrogram::rectangular::{self, rectree, RectTreeOptions};
use microplot::dendrogram::{dendrogram, linkage, Dendrogram, LinkageMatrix, Method};
use microplot::distance::diff_matrix;
use microplot::figure::{Figure, Frame, Panel};
use microplot::genes::{plotgenes, GenesOptions, LabelTrack};
use microplot::heatmap::{colorbar, heatmap, CmapChoice, HeatmapOptions};
use microplot::matrix::Matrix;
use microplot::phylo::{phylotree, PhyloOptions};
use microplot::tnseq::{tnseqplot, CdsStyle, Placement, TnseqOptions};
use microplot::{io, render};

const MARGIN: f64 = 20.0;

#[derive(Parser)]
#[command(name = "microplot")]
#[command(about = "Draw dendrograms, heatmaps, phylogenies, gene maps and Tn-seq tracks.", long_about = None)]
struct Args {
    /// Write the figure to this FILE (SVG or PNG based on extension; TSV for `distance`).
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    out: PathBuf,

    /// Set the width in pixels of the output image.
    #[arg(short = 'x', long = "width", value_name = "N", default_value_t = 1000)]
    width: u32,

    /// Set the height in pixels of the output image.
    #[arg(short = 'y', long = "height", value_name = "N", default_value_t = 1000)]
    height: u32,

    /// Pixels per inch; font sizes are in points.
    #[arg(long = "dpi", value_name = "N", default_value_t = 100.0)]
    dpi: f64,

    /// Number of threads to use for parallel operations.
    #[arg(short = 't', long = "threads", value_name = "N")]
    threads: Option<usize>,

    /// Verbosity level (0 = error, 1 = info, 2 = debug).
    #[arg(short = 'v', long = "verbose", value_name = "N", default_value_t = 1)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Radial dendrogram with optional leaf markers and color rings.
    Circular(CircularArgs),
    /// Left-oriented rectangular dendrogram, optionally next to a heatmap.
    Rectree(RectreeArgs),
    /// Heatmap of a labelled table.
    Heatmap(HeatmapArgs),
    /// Rectangular phylogram of a Newick tree.
    Phylo(PhyloArgs),
    /// Gene neighbourhood arrows, one track per genome.
    Genes(GenesArgs),
    /// Transposon insertion counts over a CDS track.
    Tnseq(TnseqArgs),
    /// Pairwise allele difference counts between profiles, written as TSV.
    Distance(DistanceArgs),
}

/// Where the tree comes from: precomputed coordinates or clustering.
#[derive(clap::Args)]
#[group(required = true, multiple = false)]
struct TreeSource {
    /// Dendrogram coordinates as JSON (icoord, dcoord, color_list, ivl, leaves).
    #[arg(long = "dendrogram", value_name = "JSON")]
    dendrogram: Option<PathBuf>,

    /// Square distance matrix TSV to cluster.
    #[arg(long = "distances", value_name = "TSV")]
    distances: Option<PathBuf>,

    /// Allele profile TSV; rows are clustered on their difference counts.
    #[arg(long = "profiles", value_name = "TSV")]
    profiles: Option<PathBuf>,
}

#[derive(clap::Args)]
struct CircularArgs {
    #[command(flatten)]
    source: TreeSource,

    /// Linkage method (single, complete, average, weighted).
    #[arg(long = "method", value_name = "NAME", default_value = "complete")]
    method: Method,

    /// Degrees left open between the last and the first leaf.
    #[arg(long = "open-angle", value_name = "DEG", default_value_t = 0.0)]
    open_angle: f64,

    /// Rotate the whole tree counter-clockwise by DEG.
    #[arg(long = "start-angle", value_name = "DEG", default_value_t = 0.0)]
    start_angle: f64,

    #[arg(long = "font-size", value_name = "PT", default_value_t = 8.0)]
    font_size: f64,

    /// Color branches by cluster.
    #[arg(long = "branch-color")]
    branch_color: bool,

    /// Colormap for branch colors.
    #[arg(long = "palette", value_name = "NAME", default_value = "gist_rainbow")]
    palette: String,

    /// Mark every leaf with a dot.
    #[arg(long = "points")]
    points: bool,

    #[arg(long = "point-size", value_name = "N", default_value_t = 15.0)]
    point_size: f64,

    /// Per-leaf marker colors: label, color and optional category per line.
    #[arg(long = "point-colors", value_name = "TSV", requires = "points")]
    point_colors: Option<PathBuf>,

    #[arg(long = "point-legend-title", value_name = "STRING", default_value = "Category")]
    point_legend_title: String,

    /// Per-leaf label colors, same format as --point-colors.
    #[arg(long = "label-colors", value_name = "TSV")]
    label_colors: Option<PathBuf>,

    /// Hide the leaf labels.
    #[arg(long = "no-labels")]
    no_labels: bool,

    /// Add a color ring from a `sample\tclass` file (repeatable, innermost last).
    #[arg(long = "ring", value_name = "TSV")]
    rings: Vec<PathBuf>,
}

#[derive(clap::Args)]
struct RectreeArgs {
    #[command(flatten)]
    source: TreeSource,

    #[arg(long = "method", value_name = "NAME", default_value = "complete")]
    method: Method,

    /// Largest merge height on the scale.
    #[arg(long = "scale-max", value_name = "N", default_value_t = 10.0)]
    scale_max: f64,

    #[arg(long = "no-labels")]
    no_labels: bool,

    #[arg(long = "label-size", value_name = "PT", default_value_t = 8.0)]
    label_size: f64,

    /// Draw this table as a heatmap next to the tree, rows in leaf order.
    #[arg(long = "heatmap", value_name = "TSV")]
    heatmap: Option<PathBuf>,

    #[command(flatten)]
    colors: HeatmapColorArgs,
}

/// Heatmap coloring shared by `heatmap` and `rectree --heatmap`.
#[derive(clap::Args)]
struct HeatmapColorArgs {
    /// Named colormap, or colors separated by ';' (e.g. `#ffffff;#ff0000`).
    #[arg(long = "cmap", value_name = "NAME")]
    cmap: Option<String>,

    #[arg(long = "vmin", value_name = "F", default_value_t = 0.0)]
    vmin: f64,

    #[arg(long = "vmax", value_name = "F", default_value_t = 100.0)]
    vmax: f64,

    /// Value at the middle of a diverging colormap.
    #[arg(long = "center", value_name = "F")]
    center: Option<f64>,

    /// Add a colorbar below the heatmap.
    #[arg(long = "cbar")]
    cbar: bool,

    #[arg(long = "no-yticklabels")]
    no_yticklabels: bool,

    #[arg(long = "heatmap-font-size", value_name = "PT", default_value_t = 10.0)]
    font_size: f64,
}

#[derive(clap::Args)]
struct HeatmapArgs {
    /// Labelled table TSV.
    #[arg(long = "data", value_name = "TSV")]
    data: PathBuf,

    /// Row order, one label per line.
    #[arg(long = "order", value_name = "FILE")]
    order: Option<PathBuf>,

    #[command(flatten)]
    colors: HeatmapColorArgs,
}

#[derive(clap::Args)]
struct PhyloArgs {
    /// Tree in Newick format.
    #[arg(long = "tree", value_name = "NEWICK")]
    tree: PathBuf,

    #[arg(long = "no-labels")]
    no_labels: bool,

    /// Align tip labels in one column with dashed leaders.
    #[arg(long = "align-labels")]
    align_labels: bool,

    #[arg(long = "label-size", value_name = "PT", default_value_t = 8.0)]
    label_size: f64,

    #[arg(long = "color", value_name = "COLOR", default_value = "black")]
    color: String,

    #[arg(long = "line-width", value_name = "PT", default_value_t = 1.0)]
    line_width: f64,
}

#[derive(clap::Args)]
struct GenesArgs {
    /// Gene arrows per track as JSON.
    #[arg(long = "arrows", value_name = "JSON")]
    arrows: PathBuf,

    /// Track order from bottom to top, one name per line (default: all tracks by name).
    #[arg(long = "order", value_name = "FILE")]
    order: Option<PathBuf>,

    /// Draw the gene labels.
    #[arg(long = "labels")]
    labels: bool,

    /// Which tracks get labels (all, top, bottom).
    #[arg(long = "label-track", value_name = "WHICH", default_value = "all")]
    label_track: LabelTrack,

    #[arg(long = "label-rotation", value_name = "DEG", default_value_t = 45.0)]
    label_rotation: f64,

    #[arg(long = "label-size", value_name = "PT", default_value_t = 12.0)]
    label_size: f64,

    #[arg(long = "trackname-size", value_name = "PT", default_value_t = 18.0)]
    trackname_size: f64,

    #[arg(long = "max-track-size", value_name = "BP", default_value_t = 5000.0)]
    max_track_size: f64,
}

#[derive(clap::Args)]
struct TnseqArgs {
    /// Insertion sites as `pos\tcount`.
    #[arg(long = "insertions", value_name = "TSV")]
    insertions: PathBuf,

    /// CDS features as a JSON list of {start, end, strand, name, color}.
    #[arg(long = "cds", value_name = "JSON")]
    cds: PathBuf,

    #[arg(long = "track-start", value_name = "BP", default_value_t = 1)]
    track_start: u64,

    #[arg(long = "track-length", value_name = "BP")]
    track_length: Option<u64>,

    /// Height of the CDS track in inches.
    #[arg(long = "track-height", value_name = "IN", default_value_t = 0.6)]
    track_height: f64,

    #[arg(long = "track-label", value_name = "STRING")]
    track_label: Option<String>,

    /// Position of the range sublabel, e.g. bottom-right.
    #[arg(long = "track-sublabel-pos", value_name = "POS", default_value = "bottom-right")]
    track_sublabel_pos: Placement,

    /// bigarrow, arrow, bigbox, box, bigrbox or rbox.
    #[arg(long = "cds-style", value_name = "STYLE", default_value = "bigarrow")]
    cds_style: CdsStyle,

    #[arg(long = "cds-color", value_name = "COLOR", default_value = "lightblue")]
    cds_color: String,

    /// Label the CDS features with their names.
    #[arg(long = "cds-labels")]
    cds_labels: bool,

    #[arg(long = "cds-label-size", value_name = "PT", default_value_t = 6.0)]
    cds_label_size: f64,

    #[arg(long = "cds-label-rotation", value_name = "DEG", default_value_t = 0.0)]
    cds_label_rotation: f64,

    #[arg(long = "ylabel", value_name = "STRING")]
    ylabel: Option<String>,

    #[arg(long = "bar-width", value_name = "PT", default_value_t = 1.0)]
    bar_width: f64,

    #[arg(long = "bar-color", value_name = "COLOR", default_value = "grey")]
    bar_color: String,

    #[arg(long = "bar-alpha", value_name = "F", default_value_t = 0.7)]
    bar_alpha: f64,
}

#[derive(clap::Args)]
struct DistanceArgs {
    /// Allele profile TSV, one sample per row.
    #[arg(long = "profiles", value_name = "TSV")]
    profiles: PathBuf,
}

/// A tree either as clustering output or as precomputed coordinates.
enum TreeInput {
    Linkage { z: LinkageMatrix, labels: Vec<String> },
    Coords(Dendrogram),
}

impl TreeInput {
    fn load(source: &TreeSource, method: Method) -> Result<TreeInput> {
        let distances = if let Some(path) = &source.dendrogram {
            let dendro = io::read_dendrogram(path)
                .with_context(|| format!("Failed to read dendrogram {:?}", path))?;
            return Ok(TreeInput::Coords(dendro));
        } else if let Some(path) = &source.distances {
            io::read_matrix(path).with_context(|| format!("Failed to read distances {:?}", path))?
        } else if let Some(path) = &source.profiles {
            let profiles = io::read_matrix(path).with_context(|| format!("Failed to read profiles {:?}", path))?;
            diff_matrix(&profiles)
        } else {
            bail!("one of --dendrogram, --distances or --profiles is required");
        };
        if distances.nrows() != distances.ncols() {
            bail!("distance matrix is {}x{}, expected a square table", distances.nrows(), distances.ncols());
        }
        let z = linkage(&distances.values, method)?;
        debug!("Linkage matrix has {} merges", z.len());
        Ok(TreeInput::Linkage { z, labels: distances.row_labels })
    }

    fn dendrogram(&self) -> Result<Dendrogram> {
        Ok(match self {
            TreeInput::Linkage { z, labels } => dendrogram(z, labels)?,
            TreeInput::Coords(dendro) => dendro.clone(),
        })
    }

    /// Sample labels in original observation order.
    fn observations(&self) -> Vec<String> {
        match self {
            TreeInput::Linkage { labels, .. } => labels.clone(),
            TreeInput::Coords(dendro) if dendro.leaves.len() == dendro.ivl.len() => {
                let mut obs = vec![String::new(); dendro.ivl.len()];
                for (label, &idx) in dendro.ivl.iter().zip(&dendro.leaves) {
                    if let Some(slot) = obs.get_mut(idx) {
                        *slot = label.clone();
                    }
                }
                obs
            }
            TreeInput::Coords(dendro) => dendro.ivl.clone(),
        }
    }
}

fn heatmap_options(colors: &HeatmapColorArgs, dpi: f64) -> Result<HeatmapOptions> {
    let cmap = match &colors.cmap {
        Some(list) if list.contains(';') => Some(CmapChoice::Colors(
            list.split(';').map(parse_color).collect::<microplot::Result<Vec<Rgb>>>()?,
        )),
        Some(name) => Some(CmapChoice::Named(name.clone())),
        None => None,
    };
    Ok(HeatmapOptions {
        cmap,
        yticklabel: !colors.no_yticklabels,
        vmin: colors.vmin,
        vmax: colors.vmax,
        center: colors.center,
        font_size: colors.font_size,
        dpi,
        ..Default::default()
    })
}

fn figure(args: &Args) -> Figure {
    Figure::new(args.width, args.height, args.dpi)
}

fn run_circular(args: &Args, cmd: &CircularArgs) -> Result<Figure> {
    let input = TreeInput::load(&cmd.source, cmd.method)?;
    let dendro = input.dendrogram()?;
    let observations = input.observations();

    let mut opts = CircularOptions {
        font_size: cmd.font_size,
        open_angle: cmd.open_angle,
        start_angle: cmd.start_angle,
        add_points: cmd.points,
        point_size: cmd.point_size,
        point_legend_title: cmd.point_legend_title.clone(),
        palette: cmd.palette.clone(),
        add_labels: !cmd.no_labels,
        branch_color: cmd.branch_color,
        ..Default::default()
    };
    if let Some(path) = &cmd.point_colors {
        opts.point_colors = Some(io::read_category_colors(path).with_context(|| format!("Failed to read {:?}", path))?);
    }
    if let Some(path) = &cmd.label_colors {
        opts.label_colors = Some(io::read_category_colors(path).with_context(|| format!("Failed to read {:?}", path))?);
    }
    for path in &cmd.rings {
        opts.rings
            .push(io::read_ring(path, &observations).with_context(|| format!("Failed to read ring {:?}", path))?);
    }

    let mut fig = figure(args);
    let (w, h) = (args.width as f64, args.height as f64);
    let has_legend = (cmd.points && opts.point_colors.is_some()) || !opts.rings.is_empty();
    let usable = if has_legend { w * 0.75 } else { w };
    let frame = Frame::new(MARGIN, MARGIN, usable - 2.0 * MARGIN, h - 2.0 * MARGIN).square();
    let mut panel = Panel::new(frame);
    circulartree(&dendro, &opts, &mut panel)?;
    fig.add_panel(panel);
    Ok(fig)
}

fn run_rectree(args: &Args, cmd: &RectreeArgs) -> Result<Figure> {
    let input = TreeInput::load(&cmd.source, cmd.method)?;
    let (w, h) = (args.width as f64, args.height as f64);
    let top = 3.0 * MARGIN;
    let bottom = if cmd.colors.cbar { 5.0 * MARGIN } else { 3.0 * MARGIN };
    let tree_width = if cmd.heatmap.is_some() { w * 0.3 } else { w - 8.0 * MARGIN };

    let mut opts = RectTreeOptions {
        no_labels: cmd.no_labels || cmd.heatmap.is_some(),
        scale_max: cmd.scale_max,
        label_size: cmd.label_size,
        ..Default::default()
    };
    let mut tree_panel = Panel::new(Frame::new(MARGIN, top, tree_width, h - top - bottom));
    let order = match &input {
        TreeInput::Linkage { z, labels } => {
            opts.labels = Some(labels.clone());
            rectree(z, &opts, &mut tree_panel)?
        }
        TreeInput::Coords(dendro) => rectangular::draw(dendro, &opts, &mut tree_panel)?,
    };
    info!("Leaf order: {}", order.join(", "));

    let mut fig = figure(args);
    fig.add_panel(tree_panel);
    if let Some(path) = &cmd.heatmap {
        let data = io::read_matrix(path).with_context(|| format!("Failed to read heatmap {:?}", path))?;
        let mut hopts = heatmap_options(&cmd.colors, args.dpi)?;
        hopts.order = Some(order);
        let left = MARGIN + tree_width + MARGIN / 2.0;
        let frame = Frame::new(left, top, w - left - 8.0 * MARGIN, h - top - bottom);
        add_heatmap(&mut fig, &data, &hopts, frame, cmd.colors.cbar)?;
    }
    Ok(fig)
}

fn add_heatmap(fig: &mut Figure, data: &Matrix, opts: &HeatmapOptions, frame: Frame, cbar: bool) -> Result<()> {
    let mut panel = Panel::new(frame);
    let scale = heatmap(data, opts, &mut panel)?;
    fig.add_panel(panel);
    if cbar {
        let bar = Frame::new(frame.left, frame.top + frame.height + 2.5 * MARGIN, frame.width, MARGIN);
        fig.add_panel(colorbar(&scale, bar));
    }
    Ok(())
}

fn run_heatmap(args: &Args, cmd: &HeatmapArgs) -> Result<Figure> {
    let data = io::read_matrix(&cmd.data).with_context(|| format!("Failed to read {:?}", cmd.data))?;
    let mut opts = heatmap_options(&cmd.colors, args.dpi)?;
    if let Some(path) = &cmd.order {
        opts.order = Some(io::read_list(path).with_context(|| format!("Failed to read order {:?}", path))?);
    }
    let (w, h) = (args.width as f64, args.height as f64);
    let bottom = if cmd.colors.cbar { 7.0 * MARGIN } else { 4.0 * MARGIN };
    let frame = Frame::new(MARGIN, MARGIN, w - 9.0 * MARGIN, h - MARGIN - bottom);
    let mut fig = figure(args);
    add_heatmap(&mut fig, &data, &opts, frame, cmd.colors.cbar)?;
    Ok(fig)
}

fn run_phylo(args: &Args, cmd: &PhyloArgs) -> Result<Figure> {
    let tree = io::read_newick(&cmd.tree).with_context(|| format!("Failed to read tree {:?}", cmd.tree))?;
    let opts = PhyloOptions {
        show_label: !cmd.no_labels,
        align_label: cmd.align_labels,
        label_size: cmd.label_size,
        color: parse_color(&cmd.color)?,
        line_width: cmd.line_width,
    };
    let (w, h) = (args.width as f64, args.height as f64);
    let mut panel = Panel::new(Frame::new(MARGIN, 2.0 * MARGIN, w - 2.0 * MARGIN, h - 3.0 * MARGIN));
    let labels = phylotree(&tree, &opts, &mut panel)?;
    debug!("Tips bottom to top: {}", labels.join(", "));
    let mut fig = figure(args);
    fig.add_panel(panel);
    Ok(fig)
}

fn run_genes(args: &Args, cmd: &GenesArgs) -> Result<Figure> {
    let tracks = io::read_gene_tracks(&cmd.arrows).with_context(|| format!("Failed to read {:?}", cmd.arrows))?;
    let order = match &cmd.order {
        Some(path) => io::read_list(path).with_context(|| format!("Failed to read order {:?}", path))?,
        None => tracks.iter().map(|(name, _)| name.clone()).collect(),
    };
    let opts = GenesOptions {
        add_labels: cmd.labels,
        max_track_size: cmd.max_track_size,
        trackname_size: cmd.trackname_size,
        label_track: cmd.label_track,
        label_rotation: cmd.label_rotation,
        label_size: cmd.label_size,
        ..Default::default()
    };
    let (w, h) = (args.width as f64, args.height as f64);
    let mut panel = Panel::new(Frame::new(MARGIN, 2.0 * MARGIN, w - 10.0 * MARGIN, h - 4.0 * MARGIN));
    plotgenes(&tracks, &order, &opts, &mut panel)?;
    let mut fig = figure(args);
    fig.add_panel(panel);
    Ok(fig)
}

fn run_tnseq(args: &Args, cmd: &TnseqArgs) -> Result<Figure> {
    let insertions =
        io::read_insertions(&cmd.insertions).with_context(|| format!("Failed to read {:?}", cmd.insertions))?;
    let cds = io::read_cds(&cmd.cds).with_context(|| format!("Failed to read {:?}", cmd.cds))?;
    let opts = TnseqOptions {
        fig_width: args.width as f64 / args.dpi,
        dpi: args.dpi,
        track_start: cmd.track_start,
        track_length: cmd.track_length,
        track_height: cmd.track_height,
        track_label: cmd.track_label.clone(),
        track_sublabelpos: cmd.track_sublabel_pos,
        cds_plotstyle: cmd.cds_style,
        cds_color: parse_color(&cmd.cds_color)?,
        cds_label: cmd.cds_labels,
        cds_labelsize: cmd.cds_label_size,
        cds_labrotation: cmd.cds_label_rotation,
        bax_ylabel: cmd.ylabel.clone(),
        bar_width: cmd.bar_width,
        bar_color: parse_color(&cmd.bar_color)?,
        bar_alpha: cmd.bar_alpha,
        ..Default::default()
    };
    Ok(tnseqplot(&insertions, &cds, &opts)?)
}

fn run_distance(out: &Path, cmd: &DistanceArgs) -> Result<()> {
    let profiles = io::read_matrix(&cmd.profiles).with_context(|| format!("Failed to read {:?}", cmd.profiles))?;
    let diffs = diff_matrix(&profiles);
    io::write_matrix(out, &diffs)?;
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let fig = match &args.command {
        Command::Circular(cmd) => run_circular(args, cmd)?,
        Command::Rectree(cmd) => run_rectree(args, cmd)?,
        Command::Heatmap(cmd) => run_heatmap(args, cmd)?,
        Command::Phylo(cmd) => run_phylo(args, cmd)?,
        Command::Genes(cmd) => run_genes(args, cmd)?,
        Command::Tnseq(cmd) => run_tnseq(args, cmd)?,
        Command::Distance(cmd) => return run_distance(&args.out, cmd),
    };
    render::save(&fig, &args.out).with_context(|| format!("Failed to write {:?}", args.out))?;
    Ok(())
}

fn main() {
    let args = Args::parse();

    // Initialize logger based on verbosity
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    if let Some(n) = args.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
            error!("Could not configure {} threads: {}", n, e);
            std::process::exit(1);
        }
        info!("Using {} threads for parallel operations.", n);
    }

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
    info!("Done.");
}
