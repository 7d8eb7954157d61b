use sha2::{Digest, Sha256};

use crate::error::{PlotError, Result};

/// An opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const GREY: Rgb = Rgb(128, 128, 128);
    /// Colour of out-of-range heatmap cells.
    pub const OUT_OF_RANGE: Rgb = Rgb(0xc8, 0xc8, 0xc8);

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

/// The matplotlib property cycle, addressed by the "C0".."C9" keys that
/// dendrogram color lists use.
const TAB10: [Rgb; 10] = [
    Rgb(0x1f, 0x77, 0xb4),
    Rgb(0xff, 0x7f, 0x0e),
    Rgb(0x2c, 0xa0, 0x2c),
    Rgb(0xd6, 0x27, 0x28),
    Rgb(0x94, 0x67, 0xbd),
    Rgb(0x8c, 0x56, 0x4b),
    Rgb(0xe3, 0x77, 0xc2),
    Rgb(0x7f, 0x7f, 0x7f),
    Rgb(0xbc, 0xbd, 0x22),
    Rgb(0x17, 0xbe, 0xcf),
];

/// ColorBrewer Set1 qualitative palette
const SET1: [Rgb; 9] = [
    Rgb(228, 26, 28),
    Rgb(55, 126, 184),
    Rgb(77, 175, 74),
    Rgb(152, 78, 163),
    Rgb(255, 127, 0),
    Rgb(255, 255, 51),
    Rgb(166, 86, 40),
    Rgb(247, 129, 191),
    Rgb(153, 153, 153),
];

/// ColorBrewer Spectral 11-class diverging palette
const SPECTRAL: [Rgb; 11] = [
    Rgb(158, 1, 66),
    Rgb(213, 62, 79),
    Rgb(244, 109, 67),
    Rgb(253, 174, 97),
    Rgb(254, 224, 139),
    Rgb(255, 255, 191),
    Rgb(230, 245, 152),
    Rgb(171, 221, 164),
    Rgb(102, 194, 165),
    Rgb(50, 136, 189),
    Rgb(94, 79, 162),
];

/// A continuous or listed mapping from `[0, 1]` to colors.
#[derive(Debug, Clone, PartialEq)]
pub enum Colormap {
    /// Piecewise-linear stops, positions increasing from 0 to 1.
    Linear(Vec<(f64, Rgb)>),
    /// Discrete colors picked by `floor(t * len)`.
    Listed(Vec<Rgb>),
}

impl Colormap {
    pub fn at(&self, t: f64) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Colormap::Listed(colors) => {
                let idx = ((t * colors.len() as f64) as usize).min(colors.len() - 1);
                colors[idx]
            }
            Colormap::Linear(stops) => {
                for pair in stops.windows(2) {
                    let (p0, c0) = pair[0];
                    let (p1, c1) = pair[1];
                    if t <= p1 {
                        let span = p1 - p0;
                        let local = if span > 0.0 { (t - p0) / span } else { 0.0 };
                        return c0.lerp(c1, local);
                    }
                }
                stops[stops.len() - 1].1
            }
        }
    }

    /// `n` colors taken at `linspace(0, 1, n)`.
    pub fn sample(&self, n: usize) -> Vec<Rgb> {
        match n {
            0 => Vec::new(),
            1 => vec![self.at(0.0)],
            _ => (0..n).map(|i| self.at(i as f64 / (n - 1) as f64)).collect(),
        }
    }

    /// Resample the window `[lo, hi]` of this map into a listed map of `n` colors.
    pub fn window(&self, lo: f64, hi: f64, n: usize) -> Colormap {
        let colors = (0..n)
            .map(|i| {
                let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
                self.at(lo + (hi - lo) * t)
            })
            .collect();
        Colormap::Listed(colors)
    }
}

fn linear(stops: &[(f64, (u8, u8, u8))]) -> Colormap {
    Colormap::Linear(stops.iter().map(|&(p, (r, g, b))| (p, Rgb(r, g, b))).collect())
}

/// Look up a registered colormap by name (case-insensitive, `_r` reverses it).
pub fn get_colormap(name: &str) -> Result<Colormap> {
    let lower = name.to_ascii_lowercase();
    if let Some(base) = lower.strip_suffix("_r") {
        return get_colormap(base).map(reversed);
    }
    let cmap = match lower.as_str() {
        "gist_rainbow" => linear(&[
            (0.000, (255, 0, 41)),
            (0.030, (255, 0, 0)),
            (0.215, (255, 255, 0)),
            (0.400, (0, 255, 0)),
            (0.586, (0, 255, 255)),
            (0.770, (0, 0, 255)),
            (0.954, (255, 0, 255)),
            (1.000, (255, 0, 191)),
        ]),
        "rocket" => linear(&[
            (0.0, (3, 5, 26)),
            (0.2, (76, 29, 75)),
            (0.4, (161, 26, 91)),
            (0.6, (232, 63, 63)),
            (0.8, (246, 156, 115)),
            (1.0, (250, 235, 221)),
        ]),
        "icefire" => linear(&[
            (0.0, (189, 231, 219)),
            (0.17, (84, 159, 205)),
            (0.33, (55, 80, 160)),
            (0.5, (31, 30, 30)),
            (0.67, (150, 45, 60)),
            (0.83, (232, 95, 45)),
            (1.0, (255, 236, 183)),
        ]),
        "viridis" => linear(&[
            (0.0, (68, 1, 84)),
            (0.25, (59, 82, 139)),
            (0.5, (33, 145, 140)),
            (0.75, (94, 201, 98)),
            (1.0, (253, 231, 37)),
        ]),
        "coolwarm" => linear(&[(0.0, (59, 76, 192)), (0.5, (221, 221, 221)), (1.0, (180, 4, 38))]),
        "greys" => linear(&[(0.0, (255, 255, 255)), (1.0, (0, 0, 0))]),
        "blues" => linear(&[(0.0, (247, 251, 255)), (0.5, (107, 174, 214)), (1.0, (8, 48, 107))]),
        "reds" => linear(&[(0.0, (255, 245, 240)), (0.5, (251, 106, 74)), (1.0, (103, 0, 13))]),
        "spectral" => Colormap::Listed(SPECTRAL.to_vec()),
        "set1" => Colormap::Listed(SET1.to_vec()),
        "tab10" => Colormap::Listed(TAB10.to_vec()),
        _ => return Err(PlotError::UnknownColormap(name.to_string())),
    };
    Ok(cmap)
}

fn reversed(cmap: Colormap) -> Colormap {
    match cmap {
        Colormap::Listed(mut colors) => {
            colors.reverse();
            Colormap::Listed(colors)
        }
        Colormap::Linear(stops) => {
            Colormap::Linear(stops.into_iter().rev().map(|(p, c)| (1.0 - p, c)).collect())
        }
    }
}

/// Resolve a dendrogram color key ("C0".."C9") to its cycle color.
pub fn cycle_color(key: &str) -> Option<Rgb> {
    let idx: usize = key.strip_prefix('C')?.parse().ok()?;
    Some(TAB10[idx % TAB10.len()])
}

/// Parse `#rgb`, `#rrggbb`, `r,g,b`, cycle keys (`C3`) and common color names.
pub fn parse_color(s: &str) -> Result<Rgb> {
    let s = s.trim();
    let bad = || PlotError::InvalidColor(s.to_string());

    if let Some(hex) = s.strip_prefix('#') {
        // tolerate the doubled '##' that shows up in hand-written color tables
        let hex = hex.trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad());
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| bad());
        return match hex.len() {
            6 | 8 => Ok(Rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => Err(bad()),
        };
    }

    if s.contains(',') {
        let parts: Vec<u8> = s
            .split(',')
            .map(|p| p.trim().parse::<u8>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| bad())?;
        return match parts.as_slice() {
            [r, g, b] => Ok(Rgb(*r, *g, *b)),
            _ => Err(bad()),
        };
    }

    if let Some(c) = cycle_color(s) {
        return Ok(c);
    }

    let rgb = match s.to_ascii_lowercase().as_str() {
        "k" | "black" => Rgb::BLACK,
        "w" | "white" => Rgb::WHITE,
        "r" | "red" => Rgb(255, 0, 0),
        "g" => Rgb(0, 128, 0),
        "green" => Rgb(0, 128, 0),
        "b" | "blue" => Rgb(0, 0, 255),
        "c" => Rgb(0, 191, 191),
        "m" => Rgb(191, 0, 191),
        "y" => Rgb(191, 191, 0),
        "cyan" => Rgb(0, 255, 255),
        "magenta" => Rgb(255, 0, 255),
        "yellow" => Rgb(255, 255, 0),
        "grey" | "gray" => Rgb::GREY,
        "darkgrey" | "darkgray" => Rgb(169, 169, 169),
        "lightgrey" | "lightgray" => Rgb(211, 211, 211),
        "lightblue" => Rgb(173, 216, 230),
        "orange" => Rgb(255, 165, 0),
        "purple" => Rgb(128, 0, 128),
        "brown" => Rgb(165, 42, 42),
        "pink" => Rgb(255, 192, 203),
        "navy" => Rgb(0, 0, 128),
        _ => return Err(bad()),
    };
    Ok(rgb)
}

/// Deterministic color for a name: SHA-256 bytes, normalized and brightened.
pub fn hashed_color(name: &str) -> Rgb {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();

    let mut r = digest[24] as f32 / 255.0;
    let mut g = digest[8] as f32 / 255.0;
    let mut b = digest[16] as f32 / 255.0;

    let sum = r + g + b;
    if sum > 0.0 {
        r /= sum;
        g /= sum;
        b /= sum;
    }

    let max_component = r.max(g).max(b);
    let f = if max_component > 0.0 { 1.5f32.min(1.0 / max_component) } else { 1.0 };

    let to_u8 = |v: f32| (255.0 * (v * f).min(1.0)).round() as u8;
    Rgb(to_u8(r), to_u8(g), to_u8(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_names() {
        assert_eq!(parse_color("#ff8000").unwrap(), Rgb(255, 128, 0));
        assert_eq!(parse_color("##f77124").unwrap(), Rgb(0xf7, 0x71, 0x24));
        assert_eq!(parse_color("#fff").unwrap(), Rgb::WHITE);
        assert_eq!(parse_color("10, 20,30").unwrap(), Rgb(10, 20, 30));
        assert_eq!(parse_color("lightblue").unwrap(), Rgb(173, 216, 230));
        assert_eq!(parse_color("C1").unwrap(), Rgb(0xff, 0x7f, 0x0e));
        assert!(parse_color("not-a-color").is_err());
        assert!(parse_color("#12345").is_err());
        assert!(matches!(parse_color("#aéééb"), Err(PlotError::InvalidColor(_))));
        assert!(matches!(parse_color("#ffé"), Err(PlotError::InvalidColor(_))));
    }

    #[test]
    fn sample_hits_both_ends() {
        let cmap = get_colormap("gist_rainbow").unwrap();
        let colors = cmap.sample(5);
        assert_eq!(colors.len(), 5);
        assert_eq!(colors[0], Rgb(255, 0, 41));
        assert_eq!(colors[4], Rgb(255, 0, 191));
        assert_eq!(cmap.sample(1), vec![Rgb(255, 0, 41)]);
        assert!(cmap.sample(0).is_empty());
    }

    #[test]
    fn listed_map_indexes_by_floor() {
        let cmap = get_colormap("set1").unwrap();
        assert_eq!(cmap.at(0.0), SET1[0]);
        assert_eq!(cmap.at(1.0), SET1[8]);
        assert_eq!(cmap.at(0.5), SET1[4]);
    }

    #[test]
    fn reversed_map_swaps_ends() {
        let fwd = get_colormap("greys").unwrap();
        let rev = get_colormap("Greys_r").unwrap();
        assert_eq!(fwd.at(0.0), rev.at(1.0));
        assert_eq!(fwd.at(1.0), rev.at(0.0));
        assert!(matches!(get_colormap("nope"), Err(PlotError::UnknownColormap(_))));
    }

    #[test]
    fn hashed_color_is_stable() {
        assert_eq!(hashed_color("sample_A"), hashed_color("sample_A"));
        assert_ne!(hashed_color("sample_A"), hashed_color("sample_B"));
    }
}
