mod debug_report;

use colloquy::{Kernel, Options};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tracing::Level;

const NO_MATCH: &str = "...";

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(if config.verbose { Level::DEBUG } else { Level::WARN })
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(&config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

struct CliConfig {
    config: PathBuf,
    user: Option<String>,
    seed: Option<u64>,
    trace: bool,
    verbose: bool,
    color: bool,
}

fn build_kernel(config: &CliConfig) -> Result<Kernel, Box<dyn std::error::Error>> {
    let options = Options::default();
    let mut kernel = match config.seed {
        Some(seed) => Kernel::with_rng(options, StdRng::seed_from_u64(seed)),
        None => Kernel::new(options),
    };
    kernel.load_config(&config.config)?;

    if let Some(user) = &config.user {
        if !kernel.environment().has_user(user) {
            kernel.add_user(user)?;
        }
        kernel.set_active_user(user)?;
    }
    Ok(kernel)
}

fn run(config: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut kernel = build_kernel(config)?;
    let interactive = io::stdin().is_terminal();
    let mut stdout = io::stdout();

    if interactive {
        print!("> ");
        stdout.flush()?;
    }
    for line in io::stdin().lock().lines() {
        let line = line?;
        let input = line.trim();
        if !input.is_empty() {
            if config.trace {
                let details = kernel.respond_verbose(input, None)?;
                debug_report::print_turn(&details, config.color);
            } else {
                let reply = kernel.respond(input, None)?;
                println!("{}", reply.as_deref().unwrap_or(NO_MATCH));
            }
        }
        if interactive {
            print!("> ");
            stdout.flush()?;
        }
    }
    Ok(())
}

fn parse_args() -> Result<CliConfig, String> {
    let mut config: Option<PathBuf> = None;
    let mut user: Option<String> = None;
    let mut seed: Option<u64> = None;
    let mut trace = false;
    let mut verbose = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("colloquy {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--trace" => trace = true,
            "-v" | "--verbose" => verbose = true,
            "--config" | "-c" => {
                let value = args.next().ok_or_else(|| "error: --config expects a value".to_string())?;
                config = Some(PathBuf::from(value));
            }
            "--user" | "-u" => {
                let value = args.next().ok_or_else(|| "error: --user expects a value".to_string())?;
                user = Some(value);
            }
            "--seed" => {
                let value = args.next().ok_or_else(|| "error: --seed expects a value".to_string())?;
                seed = Some(parse_seed(&value)?);
            }
            _ if arg.starts_with("--config=") => {
                config = Some(PathBuf::from(arg.trim_start_matches("--config=")));
            }
            _ if arg.starts_with("--user=") => {
                user = Some(arg.trim_start_matches("--user=").to_string());
            }
            _ if arg.starts_with("--seed=") => {
                seed = Some(parse_seed(arg.trim_start_matches("--seed="))?);
            }
            _ => {
                return Err(format!("error: unknown argument '{arg}'"));
            }
        }
    }

    let Some(config) = config else {
        return Err(format!("error: no configuration file provided\n\n{}", help_text()));
    };
    if user.as_deref().is_some_and(|u| u.trim().is_empty()) {
        return Err("error: --user must not be empty".to_string());
    }

    Ok(CliConfig { config, user, seed, trace, verbose, color })
}

fn parse_seed(value: &str) -> Result<u64, String> {
    value.parse().map_err(|_| format!("error: invalid --seed '{value}' (expected an unsigned integer)"))
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "colloquy {version}

Rule-based conversation engine. Reads one utterance per line from stdin and
prints one reply per line ('{no_match}' when no rule answers).

Usage:
  colloquy --config <file> [OPTIONS]

Options:
  -c, --config <file>        YAML configuration listing conversation, synonym
                             and meaning files.
  -u, --user <id>            Talk as this user (created if needed).
                             Default: the built-in default user.
  --seed <n>                 Seed output selection for reproducible replies.
  --trace                    Print a per-turn report instead of bare replies.
  -v, --verbose              Log engine activity to stderr.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Exit codes:
  0  Success.
  1  Load or engine error.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
        no_match = NO_MATCH
    )
}
