use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::info;

use crate::error::{FlintError, Result};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::{scan_all, Scanner};
use crate::stmt::Stmt;

/// What a run of one source unit produced, for exit-code mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOutcome {
    pub had_compile_error: bool,
    pub had_runtime_error: bool,
}

/// Runs one source buffer through the whole pipeline against the given
/// interpreter: scan, parse, resolve, then execute.  Compile-stage
/// diagnostics go to stderr and gate execution; runtime errors are
/// reported per top-level statement by the interpreter itself.
pub fn run_source(interpreter: &mut Interpreter, source: Vec<u8>) -> RunOutcome {
    let scanner: Scanner = Scanner::new(source);
    let (tokens, scan_errors) = scan_all(scanner);

    for e in &scan_errors {
        eprintln!("{}", e);
    }

    let parser: Parser = Parser::new(tokens);
    let (statements, parse_errors): (Vec<Stmt>, Vec<FlintError>) = parser.parse();

    for e in &parse_errors {
        eprintln!("{}", e);
    }

    let resolve_errors: Vec<FlintError> = Resolver::new(interpreter).resolve(&statements);

    for e in &resolve_errors {
        eprintln!("{}", e);
    }

    let had_compile_error: bool =
        !scan_errors.is_empty() || !parse_errors.is_empty() || !resolve_errors.is_empty();

    if had_compile_error {
        info!("Skipping execution: compile-stage errors present");
        return RunOutcome {
            had_compile_error: true,
            had_runtime_error: false,
        };
    }

    let clean: bool = interpreter.interpret(&statements);

    RunOutcome {
        had_compile_error: false,
        had_runtime_error: !clean,
    }
}

/// Reads and runs a script file with a fresh interpreter.
pub fn run_file(path: &Path) -> Result<RunOutcome> {
    info!("Running script {}", path.display());

    let mut buf: Vec<u8> = Vec::new();
    let mut reader: BufReader<File> = BufReader::new(File::open(path)?);
    reader.read_to_end(&mut buf)?;

    let mut interpreter: Interpreter = Interpreter::new();

    Ok(run_source(&mut interpreter, buf))
}
