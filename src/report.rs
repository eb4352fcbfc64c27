use crate::dataset::{values_equal, Dataset, SYSMIS};
use crate::estimate::FitResult;
use crate::model::{EffectKind, Model};
use crate::tabulate::{Crosstab, FrequencyTable};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Row, Table};
use std::io::{self, Write};

fn table_with_header(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Data values print with two decimals; SYSMIS prints as a dot.
fn value_cell(v: f64) -> Cell {
    if values_equal(v, SYSMIS) {
        Cell::new(".")
    } else {
        Cell::new(format!("{v:.2}"))
    }
}

fn stat_cell(v: f64) -> Cell {
    if v.is_nan() {
        Cell::new(".")
    } else {
        Cell::new(format!("{v:.4}"))
    }
}

fn section(out: &mut dyn Write, title: &str) -> io::Result<()> {
    writeln!(out, "\n{title}")?;
    writeln!(out, "{}", "=".repeat(title.len() + 1))
}

/// Print a dataset, optionally preceded by a header block. `n_rows` of 0
/// prints every observation.
pub fn render_dataset(
    ds: &Dataset,
    n_rows: usize,
    with_header: bool,
    out: &mut dyn Write,
) -> io::Result<()> {
    if with_header {
        writeln!(out, "Dataset: {}", ds.handle())?;
        writeln!(out, "Number of observations: {}", ds.n_rows())?;
        writeln!(out, "Number of variables: {}", ds.n_vars())?;
    }
    let limit = if n_rows == 0 { ds.n_rows() } else { n_rows.min(ds.n_rows()) };
    let mut table =
        table_with_header(ds.var_names().iter().map(String::as_str).collect());
    for i in 0..limit {
        let cells: Vec<Cell> = ds.row(i).iter().map(|&v| value_cell(v)).collect();
        table.add_row(Row::from(cells));
    }
    writeln!(out, "{table}")
}

pub fn render_frequency_table(freq: &FrequencyTable, out: &mut dyn Write) -> io::Result<()> {
    let mut table = table_with_header(vec!["Value", "Freq"]);
    for &(value, weight) in freq.rows() {
        table.add_row(Row::from(vec![value_cell(value), value_cell(weight)]));
    }
    writeln!(out, "{table}")
}

fn render_crosstab(xtab: &Crosstab, out: &mut dyn Write) -> io::Result<()> {
    let mut table =
        table_with_header(xtab.var_names.iter().map(String::as_str).collect());
    for i in 0..xtab.n_rows() {
        let mut cells: Vec<Cell> = xtab.key(i).iter().map(|&v| value_cell(v)).collect();
        cells.push(value_cell(xtab.weight(i)));
        table.add_row(Row::from(cells));
    }
    writeln!(out, "{table}")
}

fn render_model_summary(model: &Model, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "Dependent variable: {}", model.dv_name)?;
    writeln!(
        out,
        "Number of independent variables: {}",
        model.main_effects.len()
    )?;
    for (i, effect) in model.main_effects.iter().enumerate() {
        match effect.kind {
            EffectKind::Direct => writeln!(out, "Effect {}: {} (DIRECT)", i + 1, effect.name)?,
            EffectKind::Categorical => writeln!(out, "Effect {}: {}", i + 1, effect.name)?,
        }
    }
    writeln!(out, "Number of interactions: {}", model.interactions.len())?;
    for (i, group) in model.interactions.iter().enumerate() {
        writeln!(
            out,
            "Interaction {}: {}, {} terms {:?}",
            i + 1,
            group.name,
            group.terms.len(),
            group.terms
        )?;
    }
    Ok(())
}

/// Render the full fit report in the fixed section order: summary,
/// dependent-variable frequencies, crosstab, rounded design matrix,
/// convergence, fit tests, parameter table.
pub fn render(result: &FitResult, model: &Model, out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        "\n=============================================================="
    )?;
    writeln!(
        out,
        "  Maximum Likelihood Estimation of Logistic Regression Model"
    )?;
    writeln!(
        out,
        "=============================================================="
    )?;

    section(out, "Model Summary")?;
    render_model_summary(model, out)?;
    writeln!(out, "Number of populations: {}", result.design.n_populations())?;
    writeln!(out, "Total frequency: {}", result.design.total_weight)?;
    writeln!(out, "Response Levels: {}", result.design.n_response_levels())?;
    writeln!(out, "Number of columns in X: {}", result.design.n_params())?;

    section(out, "Frequency Table for Dependent Variable")?;
    render_frequency_table(result.tabulation.dv_table(), out)?;

    section(out, "Crosstabulation of all Model Variables")?;
    render_crosstab(&result.tabulation.crosstab, out)?;

    section(out, "Design Matrix (all values rounded)")?;
    for i in 0..result.design.n_populations() {
        for j in 0..result.design.n_params() {
            write!(out, "{:4.0}  ", result.design.x[[i, j]])?;
        }
        writeln!(out)?;
    }

    section(out, "Model Results")?;
    writeln!(
        out,
        "Number of Newton-Raphson iterations: {}",
        result.iterations
    )?;
    writeln!(
        out,
        "Convergence: {}",
        if result.converged { "YES" } else { "NO" }
    )?;
    if let Some(failure) = result.failure {
        writeln!(out, "Failure: {failure} (stage {})", failure.stage())?;
    }

    if let Some(tests) = &result.tests {
        section(out, "Model Fit Results")?;
        writeln!(out, "Test 1:  Fitted model vs. intercept-only model")?;
        writeln!(out, "Initial log likelihood: {:.6}", result.log_likelihood0)?;
        writeln!(out, "Final log likelihood:   {:.6}", result.log_likelihood)?;
        writeln!(
            out,
            "Chisq value: {:10.4}, df: {:5.0}, Pr(ChiSq): {:8.4}\n",
            tests.chi_intercept, tests.df_intercept, tests.p_intercept
        )?;
        writeln!(out, "Test 2:  Fitted model vs. saturated model")?;
        writeln!(out, "Deviance: {:.6}", tests.chi_saturated)?;
        writeln!(
            out,
            "Chisq value: {:10.4}, df: {:5.0}, Pr(ChiSq): {:8.4}",
            tests.chi_saturated, tests.df_saturated, tests.p_saturated
        )?;
    }

    section(out, "Maximum Likelihood Parameter Estimates")?;
    let mut table = table_with_header(vec![
        "Parameter",
        "DV",
        "Estimate",
        "Std Err",
        "Wald Chisq",
        "Pr > Chisq",
    ]);
    for row in &result.parameters {
        table.add_row(Row::from(vec![
            Cell::new(&row.label),
            Cell::new(row.response),
            Cell::new(format!("{:.8}", row.estimate)),
            stat_cell(row.std_err),
            stat_cell(row.wald),
            if row.p_value < 0.0 {
                Cell::new(".")
            } else {
                stat_cell(row.p_value)
            },
        ]));
    }
    writeln!(out, "{table}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::{fit, FitOptions};
    use crate::types::VariableRole;

    #[test]
    fn report_sections_appear_in_order() {
        let mut ds = Dataset::new(
            "d",
            ["y", "x", "w"].iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        for row in [
            [0.0, 0.0, 40.0],
            [1.0, 0.0, 10.0],
            [0.0, 1.0, 20.0],
            [1.0, 1.0, 30.0],
        ] {
            ds.push_row(&row).unwrap();
        }
        ds.set_weight_var(2).unwrap();
        let mut m = Model::new(&ds, "y").unwrap();
        m.add_variable(&ds, "x", VariableRole::Main).unwrap();
        let result = fit(&ds, &m, &FitOptions::default()).unwrap();

        let mut buf = Vec::new();
        render(&result, &m, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let sections = [
            "Model Summary",
            "Frequency Table for Dependent Variable",
            "Crosstabulation of all Model Variables",
            "Design Matrix (all values rounded)",
            "Model Results",
            "Model Fit Results",
            "Maximum Likelihood Parameter Estimates",
        ];
        let mut last = 0;
        for name in sections {
            let pos = text[last..]
                .find(name)
                .unwrap_or_else(|| panic!("section '{name}' missing or out of order"));
            last += pos;
        }
        assert!(text.contains("Convergence: YES"));
    }

    #[test]
    fn sysmis_prints_as_a_dot() {
        let mut ds =
            Dataset::new("d", vec!["a".to_string()]).unwrap();
        ds.push_row(&[SYSMIS]).unwrap();
        let mut buf = Vec::new();
        render_dataset(&ds, 0, false, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains('.'));
        assert!(!text.contains("179769313486231"));
    }
}
