mod shell;

use std::path::PathBuf;

use clap::Parser;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use evopedia::Archive;

/// Offline Evopedia archive reader: a REPL over title lookup, article
/// decompression, geographic search, and math-image lookup.
#[derive(Parser, Debug)]
#[command(name = "evopedia", version, about)]
struct Args {
    /// Directory containing the archive's files (titles.idx, wikipedia_NN.dat, ...)
    archive_dir: PathBuf,

    /// Emit structured JSON logs instead of the default human-readable format
    #[arg(long)]
    json: bool,

    /// Enable debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if args.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    println!("{}", "=".repeat(60).cyan());
    println!("{}", "  evopedia - offline encyclopedia reader".bold().cyan());
    println!("{}", "=".repeat(60).cyan());
    println!();

    let archive = match Archive::from_directory(&args.archive_dir).await {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{} failed to open archive: {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    println!(
        "loaded {} archive ({}), type 'help' for commands",
        archive.metadata().language,
        archive.metadata().date
    );
    println!();

    let mut state = shell::ShellState::new(archive, args.json);
    let mut rl = DefaultEditor::new()?;

    let history_file = dirs::home_dir().map(|mut p| {
        p.push(".evopedia_history");
        p
    });
    if let Some(path) = &history_file {
        let _ = rl.load_history(path);
    }

    loop {
        let prompt = state.prompt();
        match rl.readline(&prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match state.execute(&line).await {
                    Ok(_) => {}
                    Err(e) => {
                        if e.to_string() == "exit" {
                            break;
                        }
                        eprintln!("{} {}", "error:".red().bold(), e);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("exit");
                break;
            }
            Err(err) => {
                eprintln!("{} {:?}", "error:".red().bold(), err);
                break;
            }
        }
    }

    if let Some(path) = &history_file {
        let _ = rl.save_history(path);
    }

    println!("goodbye!");
    Ok(())
}
