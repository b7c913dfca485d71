//! biblex: Tokenize BibTeX files from the command line.
//!
//! Usage:
//!   biblex [options] [file...]
//!
//! Prints one token per line (offset, kind, literal), or a JSON array
//! with `--json`. Malformed input is reported as colored diagnostics
//! with line and column information.

use bibtex_core::text::{LineMap, TextSpan};
use bibtex_diagnostics::Diagnostic;
use bibtex_scanner::{ScanError, Scanner, TokenInfo, TokenKind};
use clap::Parser;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "biblex", about = "biblex - A BibTeX tokenizer")]
struct Cli {
    /// BibTeX files to tokenize.
    #[arg(value_name = "FILE", required = true)]
    files: Vec<String>,

    /// Print tokens as a JSON array instead of one token per line.
    #[arg(long)]
    json: bool,

    /// Disable colored diagnostics.
    #[arg(long = "no-color")]
    no_color: bool,
}

// ANSI color codes
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn main() {
    let cli = Cli::parse();

    let mut exit_code = 0;
    for file in &cli.files {
        let code = run_file(&cli, file);
        exit_code = exit_code.max(code);
    }
    process::exit(exit_code);
}

fn run_file(cli: &Cli, path: &str) -> i32 {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            print_error(&format!("Failed to read '{}': {}", path, e));
            return 1;
        }
    };

    let line_map = LineMap::new(&source);
    let mut scanner = Scanner::new(&source);
    let mut tokens: Vec<TokenInfo> = Vec::new();
    let fatal = loop {
        match scanner.scan() {
            Ok(TokenKind::Eof) => break None,
            Ok(_) => tokens.push(scanner.token_info()),
            Err(err) => break Some(err),
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&tokens) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                print_error(&format!("Failed to serialize tokens: {}", e));
                return 1;
            }
        }
    } else {
        for token in &tokens {
            println!("{:>6}  {:<10} {}", token.pos, token.kind.name(), token.text);
        }
    }

    let use_color = !cli.no_color && atty_is_terminal();
    let mut code = 0;
    for diag in scanner.diagnostics().diagnostics() {
        print_diagnostic(path, &line_map, diag, use_color);
        code = 2;
    }
    if let Some(err) = fatal {
        print_fatal(path, &line_map, err, use_color);
        code = 2;
    }
    code
}

fn print_diagnostic(path: &str, line_map: &LineMap, diag: &Diagnostic, use_color: bool) {
    let location = diag
        .span
        .map(|span| format_location(path, line_map, span))
        .unwrap_or_else(|| path.to_string());
    if use_color {
        eprintln!(
            "{}{}{}: {}{}error{} {}BIB{}{}: {}",
            CYAN, location, RESET, BOLD, RED, RESET, CYAN, diag.code, RESET, diag.message_text
        );
    } else {
        eprintln!("{}: error BIB{}: {}", location, diag.code, diag.message_text);
    }
}

fn print_fatal(path: &str, line_map: &LineMap, err: ScanError, use_color: bool) {
    let span = TextSpan::new(err.pos(), 1);
    let location = format_location(path, line_map, span);
    if use_color {
        eprintln!(
            "{}{}{}: {}{}error{}: {}",
            CYAN, location, RESET, BOLD, RED, RESET, err
        );
    } else {
        eprintln!("{}: error: {}", location, err);
    }
}

fn format_location(path: &str, line_map: &LineMap, span: TextSpan) -> String {
    let lc = line_map.line_and_column_of(span.start);
    format!("{}({},{})", path, lc.line + 1, lc.column + 1)
}

fn print_error(msg: &str) {
    if atty_is_terminal() {
        eprintln!("{}{}error{}: {}", BOLD, RED, RESET, msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

fn atty_is_terminal() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::isatty(2) != 0 }
    }
    #[cfg(not(unix))]
    {
        true
    }
}
