//! The `tsl` launcher: reads a script, evaluates it once, and reports
//! parse/runtime errors the way an external watcher or shell expects.
//!
//! The live-reload loop itself is an external collaborator (a file
//! watcher that calls back into `totalscript_modules::clear` between
//! evaluations); this binary only ever evaluates once per invocation.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use totalscript_eval::Interpreter;
use totalscript_modules::ModuleSystem;
use totalscript_object::{Environment, Value};

#[derive(Parser)]
#[command(name = "tsl", about = "Run TotalScript scripts", disable_version_flag = true)]
struct Cli {
    /// Script file to run
    file: Option<PathBuf>,

    /// Evaluate once and exit, without live reload
    #[arg(long)]
    no_watch: bool,

    /// Print version and exit
    #[arg(short = 'v', long = "version")]
    version: bool,
}

enum RunError {
    Parse(Vec<totalscript_parser::error::ParseError>),
    Runtime(String),
    Io(String),
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.version {
        println!("tsl {}", env!("CARGO_PKG_VERSION"));
        process::exit(0);
    }

    let Some(file) = cli.file else {
        eprintln!("usage: tsl [--no-watch] FILE");
        process::exit(1);
    };

    if !cli.no_watch {
        log::info!(
            "live reload requires an external file watcher; evaluating {} once",
            file.display()
        );
    }

    match run_file(&file) {
        Ok(()) => process::exit(0),
        Err(RunError::Parse(errors)) => {
            for e in &errors {
                eprintln!("parse error at {}:{}: {}", e.line, e.column, e.message);
            }
            process::exit(1);
        }
        Err(RunError::Runtime(msg)) => {
            eprintln!("ERROR: {msg}");
            process::exit(1);
        }
        Err(RunError::Io(msg)) => {
            eprintln!("ERROR: {msg}");
            process::exit(1);
        }
    }
}

fn run_file(path: &PathBuf) -> Result<(), RunError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| RunError::Io(format!("failed to read '{}': {e}", path.display())))?;

    let (program, errors) = totalscript_parser::parse(&source);
    if !errors.is_empty() {
        return Err(RunError::Parse(errors));
    }

    let abs_path = std::fs::canonicalize(path)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.to_string_lossy().to_string());
    log::debug!("evaluating {abs_path}");

    let resolver = ModuleSystem;
    let interp = Interpreter::new(&resolver);
    let env = Environment::root(abs_path);
    match interp.eval_program(&program, &env) {
        Value::Error(msg) => Err(RunError::Runtime(msg)),
        _ => Ok(()),
    }
}
