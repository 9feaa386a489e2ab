use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use log::info;
use lox_core::parser::Parser;
use lox_core::printer::print_stmt;
use lox_core::scanner::scan_tokens;
use lox_lang::config::{ClosureScope, RuntimeConfig};
use lox_lang::diagnostics;
use lox_lang::interpreter::Interpreter;
use rustyline::DefaultEditor;
use std::fs;
use std::io;
use std::process::ExitCode;

// sysexits.h
const EX_USAGE: u8 = 64;
const EX_DATAERR: u8 = 65;
const EX_SOFTWARE: u8 = 70;

#[derive(ClapParser)]
#[command(name = "lox")]
#[command(about = "A tree-walking interpreter for Lox")]
struct Cli {
    /// Script file to run (omit for REPL)
    script: Option<String>,

    /// Let functions see the locals of the scope they were declared in
    #[arg(long)]
    lexical_closures: bool,

    /// Print the syntax tree of every statement before running it
    #[arg(long)]
    print_ast: bool,
}

enum Outcome {
    Success,
    CompileError,
    RuntimeError,
}

fn main() -> Result<ExitCode> {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version also land here, on stdout
            let is_usage_error = e.use_stderr();
            e.print()?;
            return Ok(if is_usage_error {
                ExitCode::from(EX_USAGE)
            } else {
                ExitCode::SUCCESS
            });
        }
    };

    let runtime_config = RuntimeConfig {
        closure_scope: if cli.lexical_closures {
            ClosureScope::Lexical
        } else {
            ClosureScope::Global
        },
    };
    info!("closure scope: {:?}", runtime_config.closure_scope);

    let mut stdout = io::stdout();
    let mut interpreter = Interpreter::new(&mut stdout, runtime_config);

    match cli.script {
        None => {
            run_prompt(&mut interpreter, cli.print_ast)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(path) => run_file(&path, &mut interpreter, cli.print_ast),
    }
}

fn run_prompt(interpreter: &mut Interpreter, print_ast: bool) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut buffer = String::new();

    let history_path = dirs::home_dir().map(|p| p.join(".lox_history"));
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    loop {
        let prompt = if buffer.is_empty() { "> " } else { "| " };

        match rl.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');

                if is_complete(&buffer) {
                    if !buffer.trim().is_empty() {
                        let _ = rl.add_history_entry(buffer.trim());
                        // errors were already reported, the session goes on
                        run(&buffer, interpreter, print_ast);
                    }
                    buffer.clear();
                }
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                buffer.clear();
                println!("^C");
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = rl.save_history(path);
    }

    Ok(())
}

// True once every brace, paren and block comment opened in `code` is closed.
fn is_complete(code: &str) -> bool {
    let mut depth = 0;
    let mut comment_depth = 0;
    let mut in_string = false;
    let mut iter = code.chars().peekable();

    while let Some(c) = iter.next() {
        if in_string {
            if c == '"' {
                in_string = false;
            }
            continue;
        }

        if comment_depth > 0 {
            match (c, iter.peek()) {
                ('/', Some('*')) => {
                    iter.next();
                    comment_depth += 1;
                }
                ('*', Some('/')) => {
                    iter.next();
                    comment_depth -= 1;
                }
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '/' => match iter.peek() {
                Some('/') => {
                    while let Some(&next) = iter.peek() {
                        if next == '\n' {
                            break;
                        }
                        iter.next();
                    }
                }
                Some('*') => {
                    iter.next();
                    comment_depth += 1;
                }
                _ => {}
            },
            '{' | '(' => depth += 1,
            '}' | ')' => depth -= 1,
            _ => {}
        }
    }

    // strings may span lines, so an open one keeps reading too
    depth <= 0 && comment_depth == 0 && !in_string
}

fn run_file(path: &str, interpreter: &mut Interpreter, print_ast: bool) -> Result<ExitCode> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("could not read script '{}'", path))?;

    let code = match run(&contents, interpreter, print_ast) {
        Outcome::Success => ExitCode::SUCCESS,
        Outcome::CompileError => ExitCode::from(EX_DATAERR),
        Outcome::RuntimeError => ExitCode::from(EX_SOFTWARE),
    };
    Ok(code)
}

fn run(source: &str, interpreter: &mut Interpreter, print_ast: bool) -> Outcome {
    let tokens = match scan_tokens(source) {
        Ok(tokens) => tokens,
        Err(e) => {
            eprint!("{}", diagnostics::render(source, "scan", e.span, &e.message));
            return Outcome::CompileError;
        }
    };

    let result = Parser::new(tokens).parse();
    if result.has_errors() {
        for e in &result.errors {
            eprint!("{}", diagnostics::render(source, "parse", e.span, &e.message));
        }
        return Outcome::CompileError;
    }

    if print_ast {
        for statement in &result.statements {
            println!("{}", print_stmt(statement));
        }
    }

    match interpreter.interpret(&result.statements) {
        Ok(()) => Outcome::Success,
        Err(e) => {
            eprint!("{}", diagnostics::render(source, "runtime", e.span, &e.message));
            Outcome::RuntimeError
        }
    }
}
