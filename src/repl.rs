use std::io::{self, BufRead, Write};

use log::info;

use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::runner::run_source;

/// Interactive line loop.  Globals, classes, and closures persist across
/// lines; error state does not — each line starts clean.
pub fn start() -> Result<()> {
    info!("Starting REPL");

    let mut interpreter: Interpreter = Interpreter::new();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, ">> ")?;
        stdout.flush()?;

        let mut line: String = String::new();
        let read: usize = stdin.lock().read_line(&mut line)?;

        // EOF ends the session.
        if read == 0 {
            writeln!(stdout)?;
            break;
        }

        if line.trim().is_empty() {
            continue;
        }

        run_source(&mut interpreter, line.into_bytes());
    }

    Ok(())
}
