#![deny(rust_2018_idioms)]

use clap::{ArgAction, Parser};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tako::compile::{finish, EvalError};
use tako::parse::Module;
use tako::source::{FileId, Source};
use tako::symbols::Path;
use tako::{run_compiler, run_compiler_interactive, Config, Context, PassStep};
use tracing_subscriber::EnvFilter;

/// An experimental compiler for ergonomic software verification.
#[derive(Debug, Parser)]
#[command(name = "tako", version)]
struct Cli {
    /// Source files to compile, in order.
    targets: Vec<PathBuf>,

    /// Stop after this step (init, lex, parse, check, eval or final).
    #[arg(short, long, default_value_t = PassStep::Final)]
    step: PassStep,

    /// Read definitions from stdin after compiling the targets, until `:q`.
    #[arg(short, long)]
    interactive: bool,

    /// Give up on a file after this many errors.
    #[arg(long, default_value_t = 20)]
    max_errors: usize,

    /// Color diagnostics.
    #[arg(long)]
    color: bool,

    /// Increase logging verbosity (-v: debug, -vv+: trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(cli.verbose))),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config {
        last_step: cli.step,
        max_errors: cli.max_errors,
        color: cli.color,
    };
    if config.last_step != PassStep::Final {
        tracing::info!(step = %config.last_step, "stopping early");
    }

    let mut ok = true;
    for (index, target) in cli.targets.iter().enumerate() {
        let name = target.display().to_string();
        let text = match std::fs::read_to_string(target) {
            Ok(text) => text,
            Err(error) => {
                eprintln!("{name}: {error}");
                ok = false;
                continue;
            }
        };
        tracing::info!(file = %name, "compiling");
        let file = FileId(index as u32);
        let mut ctx = Context::new(Source::new(name, text).with_id(file), config.clone());
        let result = run_compiler(&mut ctx, &mut no_check);
        eprint!("{}", finish(&mut ctx));
        match result {
            Ok(output) if ctx.step() < PassStep::Final => {
                print!("{}", output.render(&ctx.source))
            }
            Ok(_) => {}
            Err(error) => {
                eprintln!("{}: {error}", ctx.source.name);
                ok = false;
            }
        }
    }

    if cli.interactive {
        if let Err(error) = interactive(&config) {
            eprintln!("stdin: {error}");
            ok = false;
        }
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn directive_for_verbosity(v: u8) -> &'static str {
    match v {
        0 => "tako=warn",
        1 => "tako=debug",
        _ => "tako=trace",
    }
}

/// Checking happens outside the front end.
fn no_check(_: &Module, _: &mut Context) {}

fn echo(_: &Path, module: &Module, _: &mut Context) -> Result<String, EvalError> {
    match module.definitions.last() {
        Some(definition) => Ok(definition.to_string()),
        None => Err(EvalError("nothing to evaluate".to_string())),
    }
}

/// Each line is compiled along with the lines kept so far. A line is kept
/// only when it compiled without any message.
fn interactive(config: &Config) -> io::Result<()> {
    eprintln!("tako {}", env!("CARGO_PKG_VERSION"));
    let mut content = String::new();
    let mut stdin = io::stdin().lock();
    loop {
        eprint!("> ");
        io::stderr().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line == ":q" {
            break;
        }
        let text = format!("{content}\n{line}");
        let mut ctx = Context::new(Source::new("stdin", text), config.clone());
        match run_compiler_interactive(&mut ctx, &mut no_check, &mut echo) {
            Ok(value) => println!("{value}"),
            Err(error) => eprintln!("{error}"),
        }
        let clean = ctx.messages.is_empty();
        eprint!("{}", finish(&mut ctx));
        if clean {
            content.push('\n');
            content.push_str(line);
        }
    }
    Ok(())
}
