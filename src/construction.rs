use crate::dataset::values_equal;
use crate::model::{EffectKind, Model};
use crate::tabulate::Tabulation;
use crate::types::Coding;
use ndarray::{Array1, Array2};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("no observations with positive weight to build a design from")]
    NoObservations,
    #[error("response value {0} is missing from the dependent frequency table")]
    MissingResponseLevel(f64),
}

/// Design artifacts for one fit: `x` is N populations by K columns, `y` is
/// N by J response totals, `totals` the per-population counts.
#[derive(Debug, Clone)]
pub struct Design {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub totals: Array1<f64>,
    /// One label per design column; all encoding columns of a categorical
    /// variable share that variable's name.
    pub labels: Vec<String>,
    /// Population index of each crosstab row.
    pub pop_index: Vec<usize>,
    /// Total accumulated weight M.
    pub total_weight: f64,
}

impl Design {
    pub fn n_populations(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_params(&self) -> usize {
        self.x.ncols()
    }

    pub fn n_response_levels(&self) -> usize {
        self.y.ncols()
    }
}

/// Number of design columns contributed by one main effect.
fn effect_span(model: &Model, tab: &Tabulation, effect: usize) -> usize {
    match model.main_effects[effect].kind {
        EffectKind::Direct => 1,
        EffectKind::Categorical => tab.effect_table(effect).n_levels().saturating_sub(1),
    }
}

/// Build X, Y, n, and the parameter labels from the sorted crosstab.
pub fn build_design(
    tab: &Tabulation,
    model: &Model,
    coding: Coding,
) -> Result<Design, ConstructionError> {
    let xtab = &tab.crosstab;
    if xtab.n_rows() == 0 {
        return Err(ConstructionError::NoObservations);
    }
    let n_effects = model.main_effects.len();

    // Segment the sorted crosstab into populations: a row opens a new
    // population when its covariate prefix differs from its predecessor's.
    let mut pop_index = vec![0usize; xtab.n_rows()];
    let mut total_weight = xtab.weight(0);
    let mut n_pops = 1usize;
    for i in 1..xtab.n_rows() {
        let changed = (0..n_effects)
            .any(|j| !values_equal(xtab.key(i)[j], xtab.key(i - 1)[j]));
        if changed {
            n_pops += 1;
        }
        pop_index[i] = n_pops - 1;
        total_weight += xtab.weight(i);
    }

    let n_levels_dv = tab.dv_table().n_levels();
    let spans: Vec<usize> = (0..n_effects)
        .map(|e| effect_span(model, tab, e))
        .collect();
    let interaction_spans: Vec<usize> = model
        .interactions
        .iter()
        .map(|group| group.terms.iter().map(|&t| spans[t]).product())
        .collect();
    let n_params = 1 + spans.iter().sum::<usize>() + interaction_spans.iter().sum::<usize>();

    let mut x = Array2::<f64>::zeros((n_pops, n_params));
    let mut y = Array2::<f64>::zeros((n_pops, n_levels_dv));
    let mut totals = Array1::<f64>::zeros(n_pops);

    // Main-effect block of X, written at the first crosstab row of each
    // population; Y and n accumulate over every row.
    let mut last_pop = usize::MAX;
    for i in 0..xtab.n_rows() {
        let pop = pop_index[i];
        if pop != last_pop {
            x[[pop, 0]] = 1.0;
            let mut col = 1;
            for (e, span) in spans.iter().enumerate() {
                let value = xtab.key(i)[e];
                match model.main_effects[e].kind {
                    EffectKind::Direct => {
                        x[[pop, col]] = value;
                    }
                    EffectKind::Categorical => {
                        let table = tab.effect_table(e);
                        let reference = table.level(table.n_levels() - 1);
                        for k in 0..*span {
                            x[[pop, col + k]] = if values_equal(value, table.level(k)) {
                                1.0
                            } else if coding == Coding::CenterPoint
                                && values_equal(value, reference)
                            {
                                -1.0
                            } else {
                                0.0
                            };
                        }
                    }
                }
                col += span;
            }
            last_pop = pop;
        }

        let response = xtab.key(i)[n_effects];
        let j = tab
            .dv_table()
            .position(response)
            .ok_or(ConstructionError::MissingResponseLevel(response))?;
        y[[pop, j]] = xtab.weight(i);
        totals[pop] += xtab.weight(i);
    }

    // Interaction columns: Cartesian products of the constituent encoding
    // columns, rightmost term cycling fastest.
    let start_col: Vec<usize> = spans
        .iter()
        .scan(1usize, |acc, span| {
            let start = *acc;
            *acc += span;
            Some(start)
        })
        .collect();
    let mut col = 1 + spans.iter().sum::<usize>();
    for group in &model.interactions {
        let group_spans: Vec<usize> = group.terms.iter().map(|&t| spans[t]).collect();
        if group_spans.iter().any(|&s| s == 0) {
            continue;
        }
        let mut idx = vec![0usize; group.terms.len()];
        loop {
            for pop in 0..n_pops {
                let mut product = 1.0;
                for (r, &term) in group.terms.iter().enumerate() {
                    product *= x[[pop, start_col[term] + idx[r]]];
                }
                x[[pop, col]] = product;
            }
            col += 1;

            let mut carried = true;
            for r in (0..idx.len()).rev() {
                idx[r] += 1;
                if idx[r] < group_spans[r] {
                    carried = false;
                    break;
                }
                idx[r] = 0;
            }
            if carried {
                break;
            }
        }
    }

    let mut labels = Vec::with_capacity(n_params);
    labels.push("Intercept".to_string());
    for (e, span) in spans.iter().enumerate() {
        for _ in 0..*span {
            labels.push(model.main_effects[e].name.clone());
        }
    }
    for (g, span) in interaction_spans.iter().enumerate() {
        for _ in 0..*span {
            labels.push(model.interactions[g].name.clone());
        }
    }

    Ok(Design {
        x,
        y,
        totals,
        labels,
        pop_index,
        total_weight,
    })
}
