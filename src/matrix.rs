use crate::error::{PlotError, Result};

/// Labelled 2D table; missing cells are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn new(row_labels: Vec<String>, col_labels: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self> {
        if values.len() != row_labels.len() {
            return Err(PlotError::InvalidInput(format!(
                "{} rows of values for {} row labels",
                values.len(),
                row_labels.len()
            )));
        }
        if let Some((i, row)) = values.iter().enumerate().find(|(_, r)| r.len() != col_labels.len()) {
            return Err(PlotError::InvalidInput(format!(
                "row '{}' has {} values, expected {}",
                row_labels[i],
                row.len(),
                col_labels.len()
            )));
        }
        Ok(Matrix { row_labels, col_labels, values })
    }

    pub fn nrows(&self) -> usize {
        self.values.len()
    }

    pub fn ncols(&self) -> usize {
        self.col_labels.len()
    }

    /// Rows rearranged to follow `order`; labels not present become all-NaN rows.
    pub fn reindex(&self, order: &[String]) -> Matrix {
        let values = order
            .iter()
            .map(|label| match self.row_labels.iter().position(|l| l == label) {
                Some(i) => self.values[i].clone(),
                None => vec![f64::NAN; self.ncols()],
            })
            .collect();
        Matrix { row_labels: order.to_vec(), col_labels: self.col_labels.clone(), values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reindex_moves_rows_and_fills_missing() {
        let m = Matrix::new(labels(&["a", "b"]), labels(&["x", "y"]), vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let r = m.reindex(&labels(&["b", "zz", "a"]));
        assert_eq!(r.row_labels, labels(&["b", "zz", "a"]));
        assert_eq!(r.values[0], vec![3.0, 4.0]);
        assert!(r.values[1].iter().all(|v| v.is_nan()));
        assert_eq!(r.values[2], vec![1.0, 2.0]);
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Matrix::new(labels(&["a"]), labels(&["x", "y"]), vec![vec![1.0]]);
        assert!(matches!(err, Err(PlotError::InvalidInput(_))));
    }
}
