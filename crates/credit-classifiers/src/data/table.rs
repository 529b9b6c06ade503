use std::ops::Index;

use crate::error::{PipelineError, Result};

/// Ordered, named `f64` columns with a uniform row count.
///
/// Values are stored row-major. Missing cells are `NaN`. An optional string
/// index labels the rows (the CSV index column, when one was requested).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    index: Option<Vec<String>>,
    data: Vec<f64>,
    rows: usize,
}

impl Table {
    /// Build a table from row-major data.
    pub fn from_shape_vec(columns: Vec<String>, rows: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * columns.len() {
            return Err(PipelineError::Shape(format!(
                "invalid shape ({}, {}) for buffer of length {}",
                rows,
                columns.len(),
                data.len()
            )));
        }
        Ok(Self {
            columns,
            index: None,
            data,
            rows,
        })
    }

    /// Build a table from a list of rows; every row must have one value per column.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_rows = rows.len();
        let mut data = Vec::with_capacity(n_rows * columns.len());
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(PipelineError::Shape(format!(
                    "row {} has {} values but the table has {} columns",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
            data.extend(row);
        }
        Self::from_shape_vec(columns, n_rows, data)
    }

    /// Build a table from named columns of equal length.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != rows) {
            return Err(PipelineError::Shape(format!(
                "column '{}' has {} values, expected {}",
                name,
                values.len(),
                rows
            )));
        }
        let names: Vec<String> = columns.iter().map(|(n, _)| n.clone()).collect();
        let mut data = Vec::with_capacity(rows * names.len());
        for r in 0..rows {
            for (_, values) in &columns {
                data.push(values[r]);
            }
        }
        Self::from_shape_vec(names, rows, data)
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns.len())
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> Option<&[String]> {
        self.index.as_deref()
    }

    pub fn set_index(&mut self, index: Vec<String>) -> Result<()> {
        if index.len() != self.rows {
            return Err(PipelineError::Shape(format!(
                "index has {} labels but the table has {} rows",
                index.len(),
                self.rows
            )));
        }
        self.index = Some(index);
        Ok(())
    }

    /// Replace every column name, positionally.
    pub fn set_columns(&mut self, names: &[String]) -> Result<()> {
        if names.len() != self.columns.len() {
            return Err(PipelineError::Shape(format!(
                "length mismatch: table has {} columns, new names have {} elements",
                self.columns.len(),
                names.len()
            )));
        }
        self.columns = names.to_vec();
        Ok(())
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_position(name).is_some()
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.columns.len();
        &self.data[start..start + self.columns.len()]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.rows).map(move |r| self.row(r))
    }

    pub fn column_at(&self, col: usize) -> Vec<f64> {
        assert!(col < self.columns.len(), "column index out of bounds");
        (0..self.rows).map(|r| self[(r, col)]).collect()
    }

    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let col = self
            .column_position(name)
            .ok_or_else(|| PipelineError::NotFound(format!("column '{}'", name)))?;
        Ok(self.column_at(col))
    }

    /// Copy out the given rows, keeping their index labels.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        let mut data = Vec::with_capacity(indices.len() * self.columns.len());
        for &row in indices {
            data.extend_from_slice(self.row(row));
        }
        Table {
            columns: self.columns.clone(),
            index: self
                .index
                .as_ref()
                .map(|labels| indices.iter().map(|&i| labels[i].clone()).collect()),
            data,
            rows: indices.len(),
        }
    }

    /// The first `n` rows (or all of them when the table is shorter).
    pub fn head(&self, n: usize) -> Table {
        let indices: Vec<usize> = (0..n.min(self.rows)).collect();
        self.select_rows(&indices)
    }

    /// A copy of the table without the named column.
    pub fn drop_column(&self, name: &str) -> Result<Table> {
        let drop = self
            .column_position(name)
            .ok_or_else(|| PipelineError::NotFound(format!("column '{}'", name)))?;
        let keep: Vec<usize> = (0..self.columns.len()).filter(|&c| c != drop).collect();
        Ok(self.select_columns(&keep))
    }

    /// A copy of the table with only the given column positions, in that order.
    pub fn select_columns(&self, cols: &[usize]) -> Table {
        let mut data = Vec::with_capacity(self.rows * cols.len());
        for r in 0..self.rows {
            let row = self.row(r);
            data.extend(cols.iter().map(|&c| row[c]));
        }
        Table {
            columns: cols.iter().map(|&c| self.columns[c].clone()).collect(),
            index: self.index.clone(),
            data,
            rows: self.rows,
        }
    }

    /// A copy of the table with only the named columns, in that order.
    pub fn select_named(&self, names: &[String]) -> Result<Table> {
        let cols = names
            .iter()
            .map(|n| {
                self.column_position(n)
                    .ok_or_else(|| PipelineError::NotFound(format!("column '{}'", n)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.select_columns(&cols))
    }

    /// A copy of the table with `values` appended as a new last column.
    pub fn with_column(&self, name: &str, values: &[f64]) -> Result<Table> {
        if values.len() != self.rows {
            return Err(PipelineError::Shape(format!(
                "column '{}' has {} values but the table has {} rows",
                name,
                values.len(),
                self.rows
            )));
        }
        let mut columns = self.columns.clone();
        columns.push(name.to_string());
        let mut data = Vec::with_capacity(self.rows * columns.len());
        for (r, value) in values.iter().enumerate() {
            data.extend_from_slice(self.row(r));
            data.push(*value);
        }
        Ok(Table {
            columns,
            index: self.index.clone(),
            data,
            rows: self.rows,
        })
    }

    /// Apply `f` to every value of column `col` in place.
    pub fn map_column_mut<F>(&mut self, col: usize, mut f: F)
    where
        F: FnMut(f64) -> f64,
    {
        let ncols = self.columns.len();
        for r in 0..self.rows {
            let cell = &mut self.data[r * ncols + col];
            *cell = f(*cell);
        }
    }

    /// Rows as `f32` features, the layout the boosting library expects.
    pub fn to_f32_rows(&self) -> Vec<Vec<f32>> {
        self.rows()
            .map(|row| row.iter().map(|&v| v as f32).collect())
            .collect()
    }

    pub fn missing_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }
}

impl Index<(usize, usize)> for Table {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.data[index.0 * self.columns.len() + index.1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> Table {
        Table::from_rows(
            names(&["a", "b", "c"]),
            vec![vec![1.0, 2.0, 3.0], vec![4.0, f64::NAN, 6.0], vec![7.0, 8.0, 9.0]],
        )
        .unwrap()
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Table::from_rows(names(&["a", "b"]), vec![vec![1.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::Shape(_)));
    }

    #[test]
    fn from_columns_matches_from_rows() {
        let by_columns = Table::from_columns(vec![
            ("a".to_string(), vec![1.0, 4.0]),
            ("b".to_string(), vec![2.0, 5.0]),
        ])
        .unwrap();
        let by_rows =
            Table::from_rows(names(&["a", "b"]), vec![vec![1.0, 2.0], vec![4.0, 5.0]]).unwrap();
        assert_eq!(by_columns, by_rows);
    }

    #[test]
    fn drop_and_append_columns() {
        let t = sample().drop_column("b").unwrap();
        assert_eq!(t.columns(), &names(&["a", "c"])[..]);
        assert_eq!(t.row(1), &[4.0, 6.0]);

        let t = t.with_column("p", &[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(t.column("p").unwrap(), vec![0.1, 0.2, 0.3]);
        assert!(t.with_column("q", &[1.0]).is_err());
    }

    #[test]
    fn head_and_select_rows_keep_index() {
        let mut t = sample();
        t.set_index(names(&["r0", "r1", "r2"])).unwrap();
        let h = t.head(2);
        assert_eq!(h.nrows(), 2);
        assert_eq!(h.index().unwrap(), &names(&["r0", "r1"])[..]);
        assert_eq!(t.head(10).nrows(), 3);

        let s = t.select_rows(&[2, 0]);
        assert_eq!(s.row(0), &[7.0, 8.0, 9.0]);
        assert_eq!(s.index().unwrap(), &names(&["r2", "r0"])[..]);
    }

    #[test]
    fn set_columns_requires_matching_length() {
        let mut t = sample();
        assert!(t.set_columns(&names(&["x", "y"])).is_err());
        t.set_columns(&names(&["x", "y", "z"])).unwrap();
        assert!(t.has_column("y"));
        assert_eq!(t.missing_count(), 1);
    }
}
