use std::path::PathBuf;

use flint::error::FlintError;
use flint::repl;
use flint::runner::{self, RunOutcome};

use clap::Parser as ClapParser;

/// Interpreter for the Flint scripting language.
///
/// With no script, drops into an interactive prompt.
#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a Flint script to execute
    script: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::parse();

    match args.script {
        Some(path) => {
            let outcome: RunOutcome = match runner::run_file(&path) {
                Ok(outcome) => outcome,

                Err(FlintError::Io(e)) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(74);
                }

                Err(e) => return Err(e.into()),
            };

            if outcome.had_compile_error {
                std::process::exit(65);
            }

            if outcome.had_runtime_error {
                std::process::exit(70);
            }
        }

        None => repl::start()?,
    }

    Ok(())
}
