use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Args, Parser, Subcommand};

use tessera::{EngineOptions, Interpreter, Repl, TesseraError, DEFAULT_MAX_CALL_DEPTH};

#[derive(Parser)]
#[command(author, version, about = "Tessera script interpreter")]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args)]
struct EngineArgs {
    /// Evaluate every script in strict mode
    #[arg(long, global = true)]
    strict: bool,
    /// Maximum nesting of function calls before a stack overflow
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,
}

impl EngineArgs {
    fn options(&self) -> EngineOptions {
        EngineOptions {
            max_call_depth: self.max_call_depth,
            strict: self.strict,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run a script file
    Run { script: PathBuf },
    /// Start an interactive REPL session
    Repl,
    /// Evaluate a snippet and print its completion value
    Eval { source: String },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let options = cli.engine.options();

    let outcome = match cli.command.unwrap_or(Command::Repl) {
        Command::Run { script } => run_script(&script, options),
        Command::Repl => Repl::with_options(options).run(),
        Command::Eval { source } => eval_snippet(&source, options),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Installs a stderr formatter when `RUST_LOG` is set.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run_script(path: &Path, options: EngineOptions) -> Result<(), TesseraError> {
    let source = fs::read_to_string(path)?;
    let mut interpreter = Interpreter::with_options(options);
    interpreter.eval_source(&source).map_err(|err| locate(err, path, &source))?;
    Ok(())
}

fn eval_snippet(source: &str, options: EngineOptions) -> Result<(), TesseraError> {
    let mut interpreter = Interpreter::with_options(options);
    let value = interpreter.eval_source(source)?;
    println!("{value}");
    Ok(())
}

/// Adds a `file:line:column` note to syntax errors.
fn locate(err: TesseraError, path: &Path, source: &str) -> TesseraError {
    match err {
        TesseraError::Diagnostic(diag) => {
            let note = diag
                .location(source)
                .map(|(line, column)| format!("{}:{line}:{column}", path.display()));
            match note {
                Some(note) => TesseraError::Diagnostic(diag.with_note(note)),
                None => TesseraError::Diagnostic(diag),
            }
        }
        other => other,
    }
}
