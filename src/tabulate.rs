use crate::dataset::{compare_rows, compare_values, values_equal, Dataset};
use crate::model::Model;

/// Weighted frequency table for one variable: `value -> accumulated weight`,
/// keyed bit-exactly and materialized sorted ascending.
#[derive(Debug, Clone)]
pub struct FrequencyTable {
    pub var_name: String,
    rows: Vec<(f64, f64)>,
}

impl FrequencyTable {
    fn new(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
            rows: Vec::new(),
        }
    }

    /// Linear scan is deliberate: categorical level counts are tiny.
    fn tally(&mut self, value: f64, weight: f64) {
        match self.rows.iter_mut().find(|(v, _)| values_equal(*v, value)) {
            Some((_, w)) => *w += weight,
            None => self.rows.push((value, weight)),
        }
    }

    fn sort(&mut self) {
        self.rows.sort_by(|a, b| compare_values(a.0, b.0));
    }

    pub fn n_levels(&self) -> usize {
        self.rows.len()
    }

    /// The k-th smallest distinct value.
    pub fn level(&self, k: usize) -> f64 {
        self.rows[k].0
    }

    pub fn rows(&self) -> &[(f64, f64)] {
        &self.rows
    }

    pub fn position(&self, value: f64) -> Option<usize> {
        self.rows.iter().position(|(v, _)| values_equal(*v, value))
    }
}

/// Joint crosstab over all model variables: one row per distinct
/// `(covariates..., response)` tuple, with the accumulated weight.
#[derive(Debug, Clone)]
pub struct Crosstab {
    pub var_names: Vec<String>,
    rows: Vec<(Vec<f64>, f64)>,
}

impl Crosstab {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Key tuple of one row: covariate values in effect order, response last.
    pub fn key(&self, row: usize) -> &[f64] {
        &self.rows[row].0
    }

    pub fn weight(&self, row: usize) -> f64 {
        self.rows[row].1
    }

    /// Number of key columns (covariates plus the response).
    pub fn n_key_cols(&self) -> usize {
        self.var_names.len() - 1
    }
}

/// Frequency tables for every model variable plus the joint crosstab.
/// Tables are ordered as the main effects were declared, dependent last.
#[derive(Debug, Clone)]
pub struct Tabulation {
    pub tables: Vec<FrequencyTable>,
    pub crosstab: Crosstab,
}

impl Tabulation {
    pub fn effect_table(&self, effect: usize) -> &FrequencyTable {
        &self.tables[effect]
    }

    pub fn dv_table(&self) -> &FrequencyTable {
        &self.tables[self.tables.len() - 1]
    }
}

/// Univariate weighted frequency table, as produced by the `table` command.
/// Unlike model tabulation this accumulates every observation's weight.
pub fn frequency_table(ds: &Dataset, var: usize) -> FrequencyTable {
    log::debug!(
        "building frequency table for variable '{}' in dataset '{}'",
        ds.var_name(var),
        ds.handle()
    );
    let mut table = FrequencyTable::new(ds.var_name(var));
    for i in 0..ds.n_rows() {
        table.tally(ds.value(i, var), ds.row_weight(i));
    }
    table.sort();
    table
}

/// Collapse the dataset into per-variable frequency tables and the joint
/// crosstab for the given model. Observations with weight <= 0 are skipped
/// silently; SYSMIS values tabulate as ordinary distinct values.
pub fn tabulate(ds: &Dataset, model: &Model) -> Tabulation {
    let n_effects = model.main_effects.len();

    let mut tables: Vec<FrequencyTable> = model
        .main_effects
        .iter()
        .map(|e| FrequencyTable::new(e.name.clone()))
        .collect();
    tables.push(FrequencyTable::new(model.dv_name.clone()));

    let mut xtab_names: Vec<String> = model
        .main_effects
        .iter()
        .map(|e| e.name.clone())
        .collect();
    xtab_names.push(model.dv_name.clone());
    xtab_names.push("_Count".to_string());
    let mut xtab_rows: Vec<(Vec<f64>, f64)> = Vec::new();

    let mut key = vec![0.0; n_effects + 1];
    for i in 0..ds.n_rows() {
        let weight = ds.row_weight(i);
        if weight <= 0.0 {
            continue;
        }

        for (j, slot) in key.iter_mut().enumerate() {
            let var = if j < n_effects {
                model.main_effects[j].var
            } else {
                model.dv
            };
            let target = ds.value(i, var);
            tables[j].tally(target, weight);
            *slot = target;
        }

        match xtab_rows
            .iter_mut()
            .find(|(k, _)| compare_rows(k, &key, n_effects + 1).is_eq())
        {
            Some((_, w)) => *w += weight,
            None => xtab_rows.push((key.clone(), weight)),
        }
    }

    for table in &mut tables {
        table.sort();
    }
    xtab_rows.sort_by(|a, b| compare_rows(&a.0, &b.0, n_effects + 1));

    log::debug!(
        "tabulation complete: {} crosstab rows, {} response levels",
        xtab_rows.len(),
        tables[n_effects].n_levels()
    );

    Tabulation {
        tables,
        crosstab: Crosstab {
            var_names: xtab_names,
            rows: xtab_rows,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SYSMIS;
    use crate::types::VariableRole;

    fn dataset(rows: &[[f64; 3]]) -> Dataset {
        let mut ds = Dataset::new(
            "d",
            ["x", "y", "w"].iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        for row in rows {
            ds.push_row(row).unwrap();
        }
        ds.set_weight_var(2).unwrap();
        ds
    }

    fn model(ds: &Dataset) -> Model {
        let mut m = Model::new(ds, "y").unwrap();
        m.add_variable(ds, "x", VariableRole::Main).unwrap();
        m
    }

    #[test]
    fn weights_accumulate_per_distinct_value() {
        let ds = dataset(&[
            [1.0, 0.0, 2.0],
            [1.0, 0.0, 3.0],
            [2.0, 1.0, 4.0],
        ]);
        let m = model(&ds);
        let tab = tabulate(&ds, &m);
        assert_eq!(tab.effect_table(0).rows(), &[(1.0, 5.0), (2.0, 4.0)]);
        assert_eq!(tab.dv_table().rows(), &[(0.0, 5.0), (1.0, 4.0)]);
        assert_eq!(tab.crosstab.n_rows(), 2);
        assert_eq!(tab.crosstab.key(0), &[1.0, 0.0]);
        assert_eq!(tab.crosstab.weight(0), 5.0);
    }

    #[test]
    fn non_positive_weights_are_skipped() {
        let ds = dataset(&[
            [1.0, 0.0, 2.0],
            [1.0, 0.0, 0.0],
            [2.0, 1.0, -1.0],
        ]);
        let m = model(&ds);
        let tab = tabulate(&ds, &m);
        assert_eq!(tab.crosstab.n_rows(), 1);
        assert_eq!(tab.effect_table(0).rows(), &[(1.0, 2.0)]);
    }

    #[test]
    fn tables_sort_ascending_with_sysmis_first() {
        let ds = dataset(&[
            [2.0, 1.0, 1.0],
            [SYSMIS, 0.0, 1.0],
            [1.0, 0.0, 1.0],
        ]);
        let m = model(&ds);
        let tab = tabulate(&ds, &m);
        let levels: Vec<f64> = tab
            .effect_table(0)
            .rows()
            .iter()
            .map(|(v, _)| *v)
            .collect();
        assert_eq!(levels, vec![SYSMIS, 1.0, 2.0]);
        assert_eq!(tab.crosstab.key(0)[0], SYSMIS);
    }

    #[test]
    fn standalone_frequency_table_keeps_non_positive_weights() {
        let ds = dataset(&[[1.0, 0.0, -2.0], [1.0, 0.0, 3.0]]);
        let table = frequency_table(&ds, 0);
        assert_eq!(table.rows(), &[(1.0, 1.0)]);
    }

    #[test]
    fn crosstab_distinguishes_response_within_one_covariate_pattern() {
        let ds = dataset(&[
            [1.0, 0.0, 4.0],
            [1.0, 1.0, 6.0],
        ]);
        let m = model(&ds);
        let tab = tabulate(&ds, &m);
        assert_eq!(tab.crosstab.n_rows(), 2);
        assert_eq!(tab.crosstab.key(1), &[1.0, 1.0]);
    }
}
