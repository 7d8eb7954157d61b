//! Readers for the tabular, JSON and Newick inputs and the TSV writer for
//! difference matrices.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::{info, warn};
use rustc_hash::FxHashMap;

use crate::color::{hashed_color, parse_color};
use crate::dendrogram::circular::{CategoryColor, CategoryColors, ColorRing};
use crate::dendrogram::Dendrogram;
use crate::error::{PlotError, Result};
use crate::genes::{Arrow, GeneTracks};
use crate::matrix::Matrix;
use crate::phylo::Tree;
use crate::tnseq::{Cds, Insertion};

fn bad_line(path: &Path, line_no: usize, msg: &str) -> PlotError {
    PlotError::InvalidInput(format!("{}:{}: {}", path.display(), line_no + 1, msg))
}

/// Non-empty lines that are not `#` comments, with their 0-based line numbers.
fn content_lines(path: &Path) -> Result<Vec<(usize, String)>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() || trimmed.starts_with('#') {
            continue;
        }
        lines.push((i, trimmed.to_string()));
    }
    Ok(lines)
}

fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    cell.parse().ok()
}

/// Read a labelled TSV table. The first row holds the column labels (its
/// first cell is the corner), every further row `label\tv1\tv2...`.
pub fn read_matrix(path: &Path) -> Result<Matrix> {
    let lines = content_lines(path)?;
    let mut rows = lines.into_iter();
    let (_, header) = rows
        .next()
        .ok_or_else(|| PlotError::InvalidInput(format!("{}: empty table", path.display())))?;
    let col_labels: Vec<String> = header.split('\t').skip(1).map(|s| s.trim().to_string()).collect();

    let mut row_labels = Vec::new();
    let mut values = Vec::new();
    for (line_no, line) in rows {
        let mut cells = line.split('\t');
        let label = cells.next().unwrap_or_default().trim().to_string();
        let row: Vec<f64> = cells
            .map(|c| parse_cell(c).ok_or_else(|| bad_line(path, line_no, &format!("'{}' is not a number", c))))
            .collect::<Result<_>>()?;
        row_labels.push(label);
        values.push(row);
    }
    info!("Loaded {}x{} table from {}", row_labels.len(), col_labels.len(), path.display());
    Matrix::new(row_labels, col_labels, values)
}

/// Write a matrix as TSV with an empty corner cell; integral values are
/// written without a decimal point.
pub fn write_matrix(path: &Path, matrix: &Matrix) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "\t{}", matrix.col_labels.join("\t"))?;
    for (label, row) in matrix.row_labels.iter().zip(&matrix.values) {
        let cells: Vec<String> = row
            .iter()
            .map(|v| if v.is_nan() { String::new() } else { crate::figure::format_tick(*v) })
            .collect();
        writeln!(out, "{}\t{}", label, cells.join("\t"))?;
    }
    out.flush()?;
    info!("Matrix saved to {}", path.display());
    Ok(())
}

/// Read `label\tcolor[\tcategory]` lines. Without a category the color text
/// itself is the category; an empty color is derived from the category name.
pub fn read_category_colors(path: &Path) -> Result<CategoryColors> {
    let mut colors = CategoryColors::new();
    for (line_no, line) in content_lines(path)? {
        let parts: Vec<&str> = line.split('\t').map(str::trim).collect();
        let (label, color_str, category) = match parts.as_slice() {
            [label, color] => (*label, *color, *color),
            [label, color, category, ..] => (*label, *color, *category),
            _ => {
                warn!("{}:{}: expected label and color, skipping", path.display(), line_no + 1);
                continue;
            }
        };
        let color = if color_str.is_empty() {
            hashed_color(category)
        } else {
            parse_color(color_str)?
        };
        colors.push((label.to_string(), CategoryColor { color, category: category.to_string() }));
    }
    Ok(colors)
}

/// One name per line, e.g. a leaf or track order.
pub fn read_list(path: &Path) -> Result<Vec<String>> {
    Ok(content_lines(path)?.into_iter().map(|(_, l)| l.trim().to_string()).collect())
}

/// Read `sample\tclass` lines into a ring ordered like `observations`.
/// The ring is named after the file stem.
pub fn read_ring(path: &Path, observations: &[String]) -> Result<ColorRing> {
    let mut by_sample: FxHashMap<String, String> = FxHashMap::default();
    for (line_no, line) in content_lines(path)? {
        match line.split_once('\t') {
            Some((sample, class)) => {
                by_sample.insert(sample.trim().to_string(), class.trim().to_string());
            }
            None => return Err(bad_line(path, line_no, "expected sample and class")),
        }
    }
    let classes = observations
        .iter()
        .map(|s| by_sample.get(s).cloned().ok_or_else(|| PlotError::MissingLabel(s.clone())))
        .collect::<Result<Vec<_>>>()?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ring".to_string());
    Ok(ColorRing { name, classes })
}

/// Insertion sites as `pos\tcount`; a non-numeric first line is taken as a header.
pub fn read_insertions(path: &Path) -> Result<Vec<Insertion>> {
    let mut insertions = Vec::new();
    for (idx, (line_no, line)) in content_lines(path)?.into_iter().enumerate() {
        let mut cells = line.split('\t').map(str::trim);
        let pos = cells.next().unwrap_or_default();
        let count = cells.next().unwrap_or_default();
        match (pos.parse::<u64>(), count.parse::<f64>()) {
            (Ok(pos), Ok(count)) => insertions.push(Insertion { pos, count }),
            _ if idx == 0 => continue,
            _ => return Err(bad_line(path, line_no, "expected an integer position and a count")),
        }
    }
    info!("Loaded {} insertion sites", insertions.len());
    Ok(insertions)
}

pub fn read_dendrogram(path: &Path) -> Result<Dendrogram> {
    let dendro: Dendrogram = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    dendro.validate()?;
    Ok(dendro)
}

/// `{"track": [{"START": .., "END": .., "STRAND": .., "LABEL": .., "COLOR": ..}, ...]}`,
/// returned in key order.
pub fn read_gene_tracks(path: &Path) -> Result<GeneTracks> {
    let tracks: BTreeMap<String, Vec<Arrow>> = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    Ok(tracks.into_iter().collect())
}

pub fn read_cds(path: &Path) -> Result<Vec<Cds>> {
    Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
}

pub fn read_newick(path: &Path) -> Result<Tree> {
    let text = std::fs::read_to_string(path)?;
    Tree::from_newick(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn matrix_roundtrips_with_missing_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profiles.tsv");
        fs::write(&path, "sample\tl1\tl2\n# comment\ns1\t1\tNA\ns2\t\t3.5\n").unwrap();
        let m = read_matrix(&path).unwrap();
        assert_eq!(m.row_labels, vec!["s1", "s2"]);
        assert_eq!(m.col_labels, vec!["l1", "l2"]);
        assert!(m.values[0][1].is_nan() && m.values[1][0].is_nan());
        assert_eq!(m.values[1][1], 3.5);

        let out = dir.path().join("out.tsv");
        write_matrix(&out, &m).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "\tl1\tl2\ns1\t1\t\ns2\t\t3.5\n");
    }

    #[test]
    fn matrix_rejects_text_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.tsv");
        fs::write(&path, "x\ta\ns1\tfoo\n").unwrap();
        assert!(matches!(read_matrix(&path), Err(PlotError::InvalidInput(_))));
    }

    #[test]
    fn category_colors_default_their_category() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("colors.tsv");
        fs::write(&path, "a\t#ff0000\tST1\nb\t0,0,255\nc\t\tST2\nbroken\n").unwrap();
        let colors = read_category_colors(&path).unwrap();
        assert_eq!(colors.len(), 3);
        assert_eq!(colors[0].1, CategoryColor { color: Rgb(255, 0, 0), category: "ST1".into() });
        assert_eq!(colors[1].1.category, "0,0,255");
        assert_eq!(colors[2].1.color, hashed_color("ST2"));
    }

    #[test]
    fn ring_follows_observation_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("host.tsv");
        fs::write(&path, "b\tpig\na\tcow\n").unwrap();
        let ring = read_ring(&path, &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(ring.name, "host");
        assert_eq!(ring.classes, vec!["cow", "pig"]);
        let missing = read_ring(&path, &["z".to_string()]);
        assert!(matches!(missing, Err(PlotError::MissingLabel(_))));
    }

    #[test]
    fn insertions_skip_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ins.tsv");
        fs::write(&path, "pos\tcount\n10\t3\n25\t7.5\n").unwrap();
        let ins = read_insertions(&path).unwrap();
        assert_eq!(ins, vec![Insertion { pos: 10, count: 3.0 }, Insertion { pos: 25, count: 7.5 }]);
    }

    #[test]
    fn json_inputs() {
        let dir = tempdir().unwrap();
        let genes = dir.path().join("genes.json");
        fs::write(
            &genes,
            r##"{"g2": [{"START": 0, "END": 100, "STRAND": -1, "LABEL": "x", "COLOR": null}],
                "g1": [{"START": 5, "END": 50, "STRAND": 1, "LABEL": "y", "COLOR": "#000000"}]}"##,
        )
        .unwrap();
        let tracks = read_gene_tracks(&genes).unwrap();
        assert_eq!(tracks[0].0, "g1");
        assert_eq!(tracks[1].1[0].strand, -1);

        let cds = dir.path().join("cds.json");
        fs::write(&cds, r#"[{"start": 10, "end": 50, "strand": -1, "name": "gene1"}, {"start": 60, "end": 90}]"#)
            .unwrap();
        let cds = read_cds(&cds).unwrap();
        assert_eq!(cds[0].name.as_deref(), Some("gene1"));
        assert_eq!(cds[1].strand, 1);

        let dendro = dir.path().join("d.json");
        fs::write(
            &dendro,
            r#"{"icoord": [[5, 5, 15, 15]], "dcoord": [[0, 1, 1, 0]], "color_list": ["C0"],
                "ivl": ["a", "b"], "leaves": [1, 0], "dcolor": {}}"#,
        )
        .unwrap();
        let d = read_dendrogram(&dendro).unwrap();
        assert_eq!(d.leaves, vec![1, 0]);
    }
}
