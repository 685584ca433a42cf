//! Lox CLI

use clap::{Parser, Subcommand};
use lox::error::report_error;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lox", version, about = "Lox - tree-walking interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Lox source file
    Run {
        /// Source file to run
        file: PathBuf,
    },
    /// Parse and dump AST (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
    /// Start an interactive session
    Repl,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run { file } => run_file(&file),
        Command::Parse { file } => parse_file(&file),
        Command::Tokens { file } => tokenize_file(&file),
        Command::Repl => run_repl(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run_file(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    let program = match compile(&filename, &source) {
        Ok(program) => program,
        Err(e) => {
            report_error(&filename, &source, &e);
            std::process::exit(1);
        }
    };

    let mut interpreter = lox::interp::Interpreter::new();
    if let Err(e) = interpreter.interpret(&program) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    Ok(())
}

fn parse_file(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    match compile(&filename, &source) {
        Ok(program) => {
            println!("{}", serde_json::to_string_pretty(&program)?);
            Ok(())
        }
        Err(e) => {
            report_error(&filename, &source, &e);
            std::process::exit(1);
        }
    }
}

fn tokenize_file(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;

    let tokens = lox::lexer::tokenize(&source)?;
    for (tok, span) in &tokens {
        println!("{:?} @ {}..{}", tok, span.start, span.end);
    }

    Ok(())
}

fn run_repl() -> Result<(), Box<dyn std::error::Error>> {
    let mut repl = lox::repl::Repl::new()?;
    repl.run()?;
    Ok(())
}

fn compile(filename: &str, source: &str) -> lox::Result<lox::ast::Program> {
    let tokens = lox::lexer::tokenize(source)?;
    lox::parser::parse(filename, source, tokens)
}
