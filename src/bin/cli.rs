// CLI binary: exiting on unrecoverable errors is standard for CLI tools.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::io::BufRead;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use study_commands::context::{ContentData, Difficulty, ExecutionContext};
use study_commands::engine::CommandEngine;
use study_commands::registry::catalog;
use study_commands::result::{CommandOutcome, CommandResult};
use study_commands::topics::TopicRecord;
use study_commands::{paths, settings, storage};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "study-commands-cli", about = "Conversational study commands, headless", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding settings.json and credentials
    #[arg(long, global = true, default_value = paths::DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// JSON file with the topic catalog (array of topic records)
    #[arg(long, global = true)]
    topics: Option<PathBuf>,

    /// Page the reader is currently on
    #[arg(long, global = true)]
    page: Option<u32>,

    /// Content identifier used to fetch page text
    #[arg(long, global = true)]
    content_id: Option<String>,

    /// Total pages in the content, for navigation bounds
    #[arg(long, global = true)]
    total_pages: Option<u32>,

    /// Audience level for explanations and diagrams
    #[arg(long, global = true, value_enum)]
    difficulty: Option<Difficulty>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a command line such as "/explain @Photosynthesis". Reads one
    /// command per line from stdin when no input is given.
    Run { input: Vec<String> },
    /// Show how a command line parses without executing it
    Parse { input: Vec<String> },
    /// Print help for all commands, or for one
    Help { command: Option<String> },
    /// List registered commands with their patterns
    Commands,
    /// Store the inference API key (an empty key removes it)
    SetKey { key: String },
}

// ── Setup ────────────────────────────────────────────────────────

fn load_topics(path: Option<&PathBuf>) -> Vec<TopicRecord> {
    let Some(path) = path else {
        return Vec::new();
    };
    storage::read_json::<Vec<TopicRecord>>(path).unwrap_or_else(|e| {
        eprintln!("Failed to read topics from {}: {e}", path.display());
        process::exit(1);
    })
}

fn build_context(cli: &Cli) -> ExecutionContext {
    ExecutionContext {
        content_data: cli.total_pages.map(|total| ContentData {
            total_pages: Some(total),
            ..Default::default()
        }),
        content_id: cli.content_id.clone(),
        current_page: cli.page,
        available_topics: load_topics(cli.topics.as_ref()),
        difficulty: cli.difficulty,
        ..Default::default()
    }
}

fn build_engine(cli: &Cli) -> CommandEngine {
    CommandEngine::from_config_dir(&cli.config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration from {}: {e}", cli.config_dir.display());
        process::exit(1);
    })
}

// ── Output ───────────────────────────────────────────────────────

fn print_result(result: &CommandResult) {
    println!("{}", result.message);
    for action in &result.actions {
        println!("→ {}", serde_json::to_string(action).unwrap_or_default());
    }
}

fn print_outcome(outcome: &CommandOutcome, raw_json: bool) {
    if raw_json {
        println!("{}", serde_json::to_string_pretty(outcome).unwrap_or_default());
        return;
    }
    match outcome {
        CommandOutcome::Single(result) => print_result(result),
        CommandOutcome::Chained(chain) => {
            println!("{}", chain.message);
            for result in &chain.results {
                for action in &result.actions {
                    println!("→ {}", serde_json::to_string(action).unwrap_or_default());
                }
            }
        }
    }
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { input } => {
            let engine = build_engine(&cli);
            let context = build_context(&cli);
            let mut all_ok = true;
            if input.is_empty() {
                for line in std::io::stdin().lock().lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            eprintln!("Skipping unreadable input line: {e}");
                            all_ok = false;
                            continue;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let outcome = engine.execute(&line, &context).await;
                    all_ok &= outcome.success();
                    print_outcome(&outcome, cli.json);
                }
            } else {
                let outcome = engine.execute(&input.join(" "), &context).await;
                all_ok = outcome.success();
                print_outcome(&outcome, cli.json);
            }
            if !all_ok {
                process::exit(1);
            }
        }
        Commands::Parse { input } => {
            let engine = build_engine(&cli);
            let topics = load_topics(cli.topics.as_ref());
            match engine.parse(&input.join(" "), &topics) {
                Some(parsed) => println!("{}", serde_json::to_string_pretty(&parsed).unwrap()),
                None => {
                    eprintln!("Not a command: {}", input.join(" "));
                    process::exit(1);
                }
            }
        }
        Commands::Help { command } => {
            let engine = build_engine(&cli);
            match command {
                None => println!("{}", catalog::help_text(engine.registry())),
                Some(name) => match catalog::command_help(engine.registry(), name.trim_start_matches('/')) {
                    Some(text) => println!("{text}"),
                    None => {
                        eprintln!("Command '{name}' not found.");
                        process::exit(1);
                    }
                },
            }
        }
        Commands::Commands => {
            let engine = build_engine(&cli);
            let entries = engine.registry().catalog();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&entries).unwrap());
            } else {
                for entry in entries {
                    println!("/{} - {}", entry.name, entry.description);
                    for pattern in entry.patterns {
                        println!("    {pattern}");
                    }
                }
            }
        }
        Commands::SetKey { key } => {
            settings::save_api_key(&cli.config_dir, key.trim()).unwrap_or_else(|e| {
                eprintln!("Failed to save API key: {e}");
                process::exit(1);
            });
            eprintln!("API key saved to {}", paths::credentials_path(&cli.config_dir).display());
        }
    }
}
