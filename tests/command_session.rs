use mlogit::command::{execute, Outcome};
use mlogit::{Session, SYSMIS};
use std::fs;
use std::path::PathBuf;

fn temp_csv(name: &str, contents: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("mlogit-test-{name}-{}.csv", std::process::id()));
    fs::write(&path, contents).expect("temp file is writable");
    path
}

fn run(session: &mut Session, line: &str) -> (Outcome, String) {
    let mut buf = Vec::new();
    let outcome = execute(session, line, &mut buf).expect("command io succeeds");
    (outcome, String::from_utf8(buf).expect("report is utf-8"))
}

#[test]
fn import_weight_and_fit_over_a_csv_file() {
    let path = temp_csv(
        "fit",
        "x,y,w\n0,0,40\n0,1,10\n1,0,20\n1,1,30\n",
    );
    let mut session = Session::new();

    run(&mut session, &format!("import d {} ,", path.display()));
    let ds = session.dataset("d").expect("import registered the dataset");
    assert_eq!(ds.n_rows(), 4);
    assert_eq!(ds.n_vars(), 3);

    run(&mut session, "weight d w");
    let (_, report) = run(&mut session, "logreg d y = x");
    assert!(report.contains("Convergence: YES"), "report was:\n{report}");
    assert!(report.contains("Total frequency: 100"));
    assert!(report.contains("Intercept"));

    fs::remove_file(path).ok();
}

#[test]
fn unparseable_fields_import_as_distinct_missing_values() {
    let path = temp_csv("sysmis", "x,y\noops,0\n1,1\n,0\n");
    let mut session = Session::new();

    run(&mut session, &format!("import d {} ,", path.display()));
    let ds = session.dataset("d").expect("import registered the dataset");
    assert_eq!(ds.n_rows(), 3);
    assert_eq!(ds.value(0, 0), SYSMIS);
    assert_eq!(ds.value(1, 0), 1.0);
    assert_eq!(ds.value(2, 0), SYSMIS);

    // the sentinel tabulates as one ordinary level
    let (_, table) = run(&mut session, "table d x");
    assert!(table.contains("Frequency table for: x"));

    fs::remove_file(path).ok();
}

#[test]
fn tab_delimited_import_accepts_the_literal_escape() {
    let path = temp_csv("tab", "x\ty\n1\t0\n2\t1\n");
    let mut session = Session::new();

    run(&mut session, &format!("import d {} \\t", path.display()));
    let ds = session.dataset("d").expect("import registered the dataset");
    assert_eq!(ds.n_vars(), 2);
    assert_eq!(ds.value(1, 0), 2.0);

    fs::remove_file(path).ok();
}

#[test]
fn a_scripted_session_runs_to_quit() {
    let path = temp_csv("script", "x,y\n0,0\n0,1\n1,0\n1,1\n");
    let mut session = Session::new();

    let script = [
        "# fit a tiny model".to_string(),
        format!("import d {} ,", path.display()),
        "option params dummy".to_string(),
        "logreg d y = x".to_string(),
        "q".to_string(),
    ];
    let mut quit = false;
    let mut output = String::new();
    for line in &script {
        let (outcome, text) = run(&mut session, line);
        output.push_str(&text);
        if outcome == Outcome::Quit {
            quit = true;
            break;
        }
    }
    assert!(quit, "script must reach quit");
    assert!(output.contains("Maximum Likelihood Parameter Estimates"));

    fs::remove_file(path).ok();
}

#[test]
fn missing_dataset_and_missing_variable_leave_the_session_usable() {
    let mut session = Session::new();
    let (outcome, text) = run(&mut session, "logreg ghost y = x");
    assert_eq!(outcome, Outcome::Continue);
    assert!(text.is_empty());

    let (outcome, _) = run(&mut session, "weight ghost w");
    assert_eq!(outcome, Outcome::Continue);

    let (outcome, _) = run(&mut session, "help");
    assert_eq!(outcome, Outcome::Continue);
}
