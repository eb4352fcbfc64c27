use std::cmp::Ordering;
use std::path::Path;
use thiserror::Error;

/// System-missing sentinel, borrowed from SPSS: the most negative finite
/// 64-bit float. Imported fields that fail numeric parsing are stored as
/// this value, and it participates in tabulation as an ordinary (very
/// small) distinct value.
pub const SYSMIS: f64 = f64::MIN;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read delimited file: {0}")]
    Import(#[from] csv::Error),
    #[error("no variable names found in header row")]
    NoVariables,
    #[error("duplicate variable name: {0}")]
    DuplicateVariable(String),
    #[error("observation has {got} fields, dataset has {expected} variables")]
    ArityMismatch { expected: usize, got: usize },
    #[error("weight variable index {0} is out of range")]
    WeightOutOfRange(usize),
}

/// Canonicalize NaNs to a single bit pattern so that value identity is
/// well-defined; every other value keeps its exact bits.
#[inline]
fn canonical(v: f64) -> f64 {
    if v.is_nan() { f64::NAN } else { v }
}

/// Total order over raw IEEE-754 bit patterns (after NaN canonicalization).
/// Frequency tables and the crosstab key on this ordering; it must not be
/// replaced by a tolerance-based comparison.
#[inline]
pub fn compare_values(a: f64, b: f64) -> Ordering {
    canonical(a).total_cmp(&canonical(b))
}

/// Bit-exact value identity under the same NaN canonicalization.
#[inline]
pub fn values_equal(a: f64, b: f64) -> bool {
    canonical(a).to_bits() == canonical(b).to_bits()
}

/// Lexicographic comparison of the first `prefix` entries of two rows.
#[inline]
pub fn compare_rows(a: &[f64], b: &[f64], prefix: usize) -> Ordering {
    for i in 0..prefix {
        match compare_values(a[i], b[i]) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// A dense, row-major table of 64-bit floats with named columns and an
/// optional per-row weight column. Observations all share the same arity.
#[derive(Debug, Clone)]
pub struct Dataset {
    handle: String,
    var_names: Vec<String>,
    values: Vec<f64>,
    n_rows: usize,
    weight: Option<usize>,
}

impl Dataset {
    pub fn new(handle: impl Into<String>, var_names: Vec<String>) -> Result<Self, DatasetError> {
        if var_names.is_empty() {
            return Err(DatasetError::NoVariables);
        }
        for (i, name) in var_names.iter().enumerate() {
            if var_names[..i].iter().any(|n| n == name) {
                return Err(DatasetError::DuplicateVariable(name.clone()));
            }
        }
        Ok(Self {
            handle: handle.into(),
            var_names,
            values: Vec::new(),
            n_rows: 0,
            weight: None,
        })
    }

    /// Import a delimited text file. The first row supplies variable names;
    /// fields that do not parse as numbers are stored as [`SYSMIS`].
    pub fn from_delimited(
        handle: impl Into<String>,
        path: impl AsRef<Path>,
        delimiter: u8,
    ) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;

        let var_names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut ds = Dataset::new(handle, var_names)?;
        log::info!(
            "importing dataset '{}' from {} ({} variables)",
            ds.handle,
            path.as_ref().display(),
            ds.n_vars()
        );

        let mut row = Vec::with_capacity(ds.n_vars());
        for record in reader.records() {
            let record = record?;
            row.clear();
            row.extend(record.iter().map(|f| f.parse::<f64>().unwrap_or(SYSMIS)));
            ds.push_row(&row)?;
        }
        log::info!("import complete: {} observations read", ds.n_rows);
        Ok(ds)
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_vars(&self) -> usize {
        self.var_names.len()
    }

    pub fn var_names(&self) -> &[String] {
        &self.var_names
    }

    pub fn var_name(&self, index: usize) -> &str {
        &self.var_names[index]
    }

    pub fn find_var(&self, name: &str) -> Option<usize> {
        self.var_names.iter().position(|n| n == name)
    }

    pub fn push_row(&mut self, row: &[f64]) -> Result<(), DatasetError> {
        if row.len() != self.n_vars() {
            return Err(DatasetError::ArityMismatch {
                expected: self.n_vars(),
                got: row.len(),
            });
        }
        self.values.extend_from_slice(row);
        self.n_rows += 1;
        Ok(())
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let width = self.n_vars();
        &self.values[index * width..(index + 1) * width]
    }

    pub fn value(&self, row: usize, var: usize) -> f64 {
        self.values[row * self.n_vars() + var]
    }

    pub fn weight_var(&self) -> Option<usize> {
        self.weight
    }

    pub fn set_weight_var(&mut self, var: usize) -> Result<(), DatasetError> {
        if var >= self.n_vars() {
            self.weight = None;
            return Err(DatasetError::WeightOutOfRange(var));
        }
        log::info!("weight variable set to '{}' ({var})", self.var_names[var]);
        self.weight = Some(var);
        Ok(())
    }

    /// Weight of one observation: the weight column's value, or 1.
    pub fn row_weight(&self, row: usize) -> f64 {
        match self.weight {
            Some(w) => self.value(row, w),
            None => 1.0,
        }
    }
}
