use crate::estimate::{fit, FitOptions};
use crate::model::Model;
use crate::report;
use crate::session::Session;
use crate::tabulate::frequency_table;
use crate::types::{Coding, VariableRole};
use std::io::{self, Write};

const LOGREG_SYNTAX: &str = "logreg expects a dataset handle, a dependent variable name, \
    '=', then one or more effects; interactions as var1*var2, direct effects as direct.var1";

/// What the input loop should do after one command.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

/// Execute one input line against the session. Command errors are warnings;
/// only `quit` stops the loop.
pub fn execute(session: &mut Session, line: &str, out: &mut dyn Write) -> io::Result<Outcome> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&command) = tokens.first() else {
        return Ok(Outcome::Continue);
    };

    match command {
        "import" => cmd_import(session, &tokens),
        "print" => cmd_print(session, &tokens, out)?,
        "table" => cmd_table(session, &tokens, out)?,
        "weight" => cmd_weight(session, &tokens),
        "option" => cmd_option(session, &tokens),
        "logreg" => cmd_logreg(session, &tokens, out)?,
        "help" => cmd_help(out)?,
        "#" => {}
        "q" | "quit" => {
            log::info!("exiting");
            return Ok(Outcome::Quit);
        }
        _ => log::warn!(
            "command not found: {command}; enter 'help' for a list of available commands"
        ),
    }
    Ok(Outcome::Continue)
}

fn cmd_import(session: &mut Session, tokens: &[&str]) {
    if tokens.len() != 4 {
        log::warn!("syntax error: import expects 3 arguments: handle filename delimiter");
        return;
    }
    let delimiter = if tokens[3].starts_with("\\t") {
        b'\t'
    } else {
        tokens[3].as_bytes()[0]
    };
    if let Err(e) = session.import(tokens[1], tokens[2], delimiter) {
        log::warn!("import failed: {e}");
    }
}

fn cmd_print(session: &Session, tokens: &[&str], out: &mut dyn Write) -> io::Result<()> {
    if tokens.len() != 3 {
        log::warn!("syntax error: print expects 2 arguments: handle numlines");
        return Ok(());
    }
    let n_rows = tokens[2].parse::<usize>().unwrap_or(0);
    match session.dataset(tokens[1]) {
        Some(ds) => report::render_dataset(ds, n_rows, true, out),
        None => {
            log::warn!("dataset not found: {}", tokens[1]);
            Ok(())
        }
    }
}

fn cmd_table(session: &Session, tokens: &[&str], out: &mut dyn Write) -> io::Result<()> {
    if tokens.len() != 3 {
        log::warn!("syntax error: table expects 2 arguments: handle varname");
        return Ok(());
    }
    let Some(ds) = session.dataset(tokens[1]) else {
        log::warn!("dataset not found: {}", tokens[1]);
        return Ok(());
    };
    let Some(var) = ds.find_var(tokens[2]) else {
        log::warn!("variable not found: {}", tokens[2]);
        return Ok(());
    };
    writeln!(out, "Frequency table for: {}", tokens[2])?;
    report::render_frequency_table(&frequency_table(ds, var), out)
}

fn cmd_weight(session: &mut Session, tokens: &[&str]) {
    if tokens.len() != 3 {
        log::warn!("syntax error: weight expects 2 arguments: handle varname");
        return;
    }
    let Some(ds) = session.dataset_mut(tokens[1]) else {
        log::warn!("dataset not found: {}", tokens[1]);
        return;
    };
    match ds.find_var(tokens[2]) {
        Some(var) => {
            if let Err(e) = ds.set_weight_var(var) {
                log::warn!("{e}");
            }
        }
        None => log::warn!("variable not found: {}", tokens[2]),
    }
}

fn cmd_option(session: &mut Session, tokens: &[&str]) {
    if tokens.len() != 3 {
        log::warn!("syntax error: option expects 2 arguments: key value");
        return;
    }
    session.options_mut().set(tokens[1], tokens[2]);
}

/// Parse the effect tokens of a logreg command into a model. Unknown
/// variables reject the whole model.
fn parse_model(session: &Session, tokens: &[&str]) -> Option<Model> {
    let ds = session.dataset(tokens[1])?;
    let mut model = match Model::new(ds, tokens[2]) {
        Ok(m) => m,
        Err(e) => {
            log::warn!("{e}");
            return None;
        }
    };

    for effect in &tokens[4..] {
        let result = if effect.contains('*') {
            effect.split('*').enumerate().try_for_each(|(i, part)| {
                let role = if i == 0 {
                    VariableRole::NewInteraction
                } else {
                    VariableRole::Interaction
                };
                model.add_variable(ds, part, role)
            })
        } else if let Some(name) = effect.strip_prefix("direct.").filter(|n| !n.is_empty()) {
            model.add_variable(ds, name, VariableRole::Direct)
        } else {
            model.add_variable(ds, effect, VariableRole::Main)
        };

        if let Err(e) = result {
            log::warn!("{e}");
            log::warn!("syntax error: {LOGREG_SYNTAX}");
            return None;
        }
    }
    Some(model)
}

fn cmd_logreg(session: &Session, tokens: &[&str], out: &mut dyn Write) -> io::Result<()> {
    if tokens.len() < 5 || tokens[3] != "=" {
        log::warn!("syntax error: {LOGREG_SYNTAX}");
        return Ok(());
    }
    if session.dataset(tokens[1]).is_none() {
        log::warn!("dataset not found: {}", tokens[1]);
        return Ok(());
    }
    let Some(model) = parse_model(session, tokens) else {
        return Ok(());
    };
    let Some(ds) = session.dataset(tokens[1]) else {
        return Ok(());
    };

    let options = FitOptions {
        coding: Coding::from_option(session.options().get("params")),
        ..FitOptions::default()
    };
    match fit(ds, &model, &options) {
        Ok(result) => report::render(&result, &model, out),
        Err(e) => {
            log::warn!("model estimation failed: {e}");
            Ok(())
        }
    }
}

fn cmd_help(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "Available commands:")?;
    writeln!(out, "  import    Import a delimited text file.")?;
    writeln!(out, "  print     Print a dataset.")?;
    writeln!(out, "  table     Univariate frequency tabulation.")?;
    writeln!(out, "  logreg    Estimate a logistic regression model.")?;
    writeln!(out, "  weight    Assign a weight variable to the dataset.")?;
    writeln!(out, "  option    Set a session option.")?;
    writeln!(out, "  help      Print this message.")?;
    writeln!(out, "  q, quit   Exit the program.")?;
    writeln!(out, "  #         This line is a comment.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    fn session_with_data() -> Session {
        let mut session = Session::new();
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
        session.insert(ds);
        session
    }

    fn run(session: &mut Session, line: &str) -> (Outcome, String) {
        let mut buf = Vec::new();
        let outcome = execute(session, line, &mut buf).unwrap();
        (outcome, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn blank_and_comment_lines_are_no_ops() {
        let mut session = Session::new();
        assert_eq!(run(&mut session, "").0, Outcome::Continue);
        assert_eq!(run(&mut session, "   ").0, Outcome::Continue);
        assert_eq!(run(&mut session, "# a comment line").0, Outcome::Continue);
    }

    #[test]
    fn quit_stops_the_loop() {
        let mut session = Session::new();
        assert_eq!(run(&mut session, "q").0, Outcome::Quit);
        assert_eq!(run(&mut session, "quit").0, Outcome::Quit);
    }

    #[test]
    fn unknown_commands_warn_and_continue() {
        let mut session = Session::new();
        assert_eq!(run(&mut session, "frobnicate now").0, Outcome::Continue);
    }

    #[test]
    fn weight_then_logreg_produces_a_report() {
        let mut session = session_with_data();
        run(&mut session, "weight d w");
        let (_, text) = run(&mut session, "logreg d y = x");
        assert!(text.contains("Convergence: YES"), "report was:\n{text}");
        assert!(text.contains("Total frequency: 100"));
    }

    #[test]
    fn the_params_option_switches_the_coding() {
        let mut session = session_with_data();
        run(&mut session, "weight d w");
        run(&mut session, "option params dummy");
        let (_, text) = run(&mut session, "logreg d y = x");
        // dummy coding leaves the largest level without a -1 row
        assert!(text.contains("Convergence: YES"));
        assert!(!text.contains("-1  "), "design matrix should be 0/1:\n{text}");
    }

    #[test]
    fn logreg_with_bad_separator_is_rejected() {
        let mut session = session_with_data();
        let (_, text) = run(&mut session, "logreg d y x");
        assert!(text.is_empty());
    }

    #[test]
    fn logreg_with_unknown_variable_is_rejected() {
        let mut session = session_with_data();
        let (_, text) = run(&mut session, "logreg d y = nosuchvar");
        assert!(text.is_empty());
    }

    #[test]
    fn interaction_formula_expands_both_components() {
        let mut session = session_with_data();
        run(&mut session, "weight d w");
        let (_, text) = run(&mut session, "logreg d y = x*x");
        // duplicate term inside the interaction collapses to the main effect
        assert!(text.contains("Number of interactions: 1"));
    }

    #[test]
    fn print_renders_the_dataset() {
        let mut session = session_with_data();
        let (_, text) = run(&mut session, "print d 2");
        assert!(text.contains("Dataset: d"));
        assert!(text.contains("Number of observations: 4"));
    }

    #[test]
    fn table_renders_a_frequency_table() {
        let mut session = session_with_data();
        let (_, text) = run(&mut session, "table d x");
        assert!(text.contains("Frequency table for: x"));
    }
}
