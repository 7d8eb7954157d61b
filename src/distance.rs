use log::debug;
use rayon::prelude::*;

use crate::matrix::Matrix;

/// Number of columns where both values are present and differ.
fn count_differences(a: &[f64], b: &[f64]) -> usize {
    a.iter()
        .zip(b)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan() && x != y)
        .count()
}

/// Pairwise difference counts between the rows of an allele profile table.
///
/// Missing (`NaN`) cells are ignored. The result is square and labelled by
/// the input row labels on both axes.
pub fn diff_matrix(profiles: &Matrix) -> Matrix {
    let n = profiles.nrows();
    debug!("Computing {}x{} pairwise difference matrix", n, n);

    // Upper triangle in parallel
    let rows = &profiles.values;
    let pairs: Vec<(usize, usize, usize)> = (0..n)
        .into_par_iter()
        .flat_map(|i| {
            (i + 1..n)
                .map(move |j| (i, j, count_differences(&rows[i], &rows[j])))
                .collect::<Vec<_>>()
        })
        .collect();

    let mut values = vec![vec![0.0; n]; n];
    for (i, j, diff) in pairs {
        values[i][j] = diff as f64;
        values[j][i] = diff as f64;
    }
    Matrix {
        row_labels: profiles.row_labels.clone(),
        col_labels: profiles.row_labels.clone(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_differences_ignoring_missing() {
        let nan = f64::NAN;
        let profiles = Matrix::new(
            vec!["s1".into(), "s2".into(), "s3".into()],
            vec!["l1".into(), "l2".into(), "l3".into(), "l4".into()],
            vec![
                vec![1.0, 2.0, 3.0, 4.0],
                vec![1.0, 5.0, nan, 6.0],
                vec![nan, 2.0, 7.0, 4.0],
            ],
        )
        .unwrap();
        let d = diff_matrix(&profiles);
        assert_eq!(d.col_labels, vec!["s1", "s2", "s3"]);
        assert_eq!(d.values[0], vec![0.0, 2.0, 1.0]);
        assert_eq!(d.values[1], vec![2.0, 0.0, 2.0]);
        assert_eq!(d.values[2], vec![1.0, 2.0, 0.0]);
    }
}
