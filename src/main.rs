use clap::Parser;
use mlogit::command::{execute, Outcome};
use mlogit::session::Session;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mlogit")]
#[command(about = "Maximum likelihood estimation of logistic regression models")]
#[command(version)]
struct Cli {
    /// Read and execute commands from the named file instead of stdin.
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// Redirect report output to a file.
    #[arg(short = 'o', long = "out")]
    out: Option<PathBuf>,

    /// Log extra detail.
    #[arg(short = 'v', long = "verbose", conflicts_with = "silent")]
    verbose: bool,

    /// Suppress all logging.
    #[arg(short = 's', long = "silent")]
    silent: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.silent {
        "off"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    if let Err(e) = run(&cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> io::Result<()> {
    let mut session = Session::new();

    let mut out: Box<dyn Write> = match &cli.out {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };

    let interactive = cli.file.is_none();
    let input: Box<dyn BufRead> = match &cli.file {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    log::info!(
        "mlogit {} - logistic regression by maximum likelihood",
        env!("CARGO_PKG_VERSION")
    );

    let mut lines = input.lines();
    loop {
        if interactive {
            write!(out, "mlogit-> ")?;
            out.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        if execute(&mut session, &line?, out.as_mut())? == Outcome::Quit {
            break;
        }
    }
    Ok(())
}
