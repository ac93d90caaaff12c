use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use stackfort::codegen::compile;
use stackfort::encoder::{encode, pack_words};
use stackfort::error::{CompileError, ErrorKind, Span};
use stackfort::lexer::tokenize;
use stackfort::parser::parse;
use stackfort::preprocessor::preprocess;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        eprintln!("usage: stackfort <source.fs> <instructions.bin> <data.bin>");
        return ExitCode::from(1);
    }

    match run(&args[1], &args[2], &args[3]) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}

/// Runs the full pipeline fail-fast: the moment any stage errors, we
/// return without touching the filesystem, so a failed compile never
/// leaves behind a stale or partial output file.
fn run(source_path: &str, instructions_path: &str, data_path: &str) -> Result<(), CompileError> {
    let source = preprocess(Path::new(source_path))?;

    let lexed = tokenize(&source);
    if let Some(first) = lexed.errors.into_iter().next() {
        return Err(first);
    }

    let program = parse(&lexed.tokens)?;
    let compiled = compile(&program)?;
    compiled.symbol_table.print_table();
    let encoded = encode(&compiled.instructions)?;

    fs::write(instructions_path, pack_words(&encoded.words)).map_err(write_error)?;
    fs::write(data_path, pack_words(&compiled.data_words)).map_err(write_error)?;

    let listing_path = format!("{instructions_path}.hex");
    fs::write(&listing_path, encoded.listing.join("\n") + "\n").map_err(write_error)?;

    Ok(())
}

fn write_error(err: std::io::Error) -> CompileError {
    CompileError::new(ErrorKind::OutputWriteFailed, format!("failed to write output: {err}"), Span::dummy())
}
