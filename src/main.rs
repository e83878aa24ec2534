mod agents;
mod batch;
mod config;
mod error;
mod files;
mod llm;
mod normalize;
mod orchestrator;
mod routing;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

use batch::{open_writer, BatchRunner, FileRef, OutputFormat, Task};
use config::{AppConfig, ConfigOverrides};
use orchestrator::AgentSystem;
use routing::Router;

#[derive(Parser)]
#[command(name = "mfqa")]
#[command(about = "Answer questions over xlsx/txt/pptx/image/audio/video/pdf files with routed LLM agents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// Environment file with the model credentials
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    /// First directory searched for task files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Second directory searched for task files
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// TOML file replacing the built-in routing table
    #[arg(long, global = true)]
    routes: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer every task in a line-delimited JSON file
    Run {
        #[arg(short, long, default_value = "test/data.jsonl")]
        input: PathBuf,

        #[arg(short, long, default_value = "result.json")]
        output: PathBuf,

        #[arg(short, long, value_enum, default_value = "array")]
        format: OutputFormat,

        /// Skip the desensitisation reminder
        #[arg(short, long)]
        yes: bool,
    },
    /// Answer a single question
    Ask {
        query: String,

        #[arg(short, long)]
        file: Vec<String>,
    },
    /// Show which agents a question is routed to
    Route {
        query: String,

        #[arg(short, long)]
        file: Vec<String>,
    },
    /// Prepare a file and print what the agents would see
    Inspect { file: String },
    Interactive,
}

/// Manual reminder before a batch; the desensitisation step itself is
/// external and not checked.
fn confirm_desensitised() -> Result<bool> {
    println!("Please confirm data desensitization is completed.");
    println!("1. Run the desensitization script on the local data cache (if needed).");
    println!("2. Confirm the desensitized files are in place (if applicable).");

    let mut rl = DefaultEditor::new()?;
    match rl.readline("\nPress Enter to continue...") {
        Ok(_) => Ok(true),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn ask_task(query: impl Into<String>, files: Vec<String>) -> Task {
    let file_name = match files.len() {
        0 => None,
        1 => files.into_iter().next().map(FileRef::One),
        _ => Some(FileRef::Many(files)),
    };
    Task {
        task_id: "ask".to_string(),
        query: query.into(),
        file_name,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    use tracing_subscriber::EnvFilter;

    let filter = if cli.verbose {
        EnvFilter::new("mfqa=debug,warn") // dependencies stay at WARN
    } else {
        EnvFilter::new("mfqa=info,warn")
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(ConfigOverrides {
        env_file: cli.env_file,
        data_dir: cli.data_dir,
        project_root: cli.project_root,
        routes: cli.routes,
    })?;

    match cli.command {
        Commands::Route { query, file } => {
            let router = Router::new(config.routing.clone());
            let prompt = batch::build_prompt(&ask_task(query, file), &config.roots);
            println!("{}", serde_json::to_string(&router.route(&prompt.route_text))?);
        }
        Commands::Inspect { file } => {
            let resolved = config
                .roots
                .resolve(&file)
                .ok_or_else(|| anyhow::anyhow!("No file name in '{}'", file))?;
            info!("Resolved {} to {:?} (exists: {})", file, resolved.path, resolved.exists);

            let record = files::prepare_file(&resolved.path).await;
            let json = serde_json::to_string_pretty(&record)?;
            println!("type: {}", record.kind.as_str());
            println!("{}", json.chars().take(500).collect::<String>());
        }
        Commands::Ask { query, file } => {
            let system = Arc::new(AgentSystem::from_config(&config)?);
            let runner = BatchRunner::new(system, config.roots.clone());
            let answer = runner.ask(&ask_task(query, file)).await?;
            println!("{}", answer);
        }
        Commands::Run {
            input,
            output,
            format,
            yes,
        } => {
            if !yes && !confirm_desensitised()? {
                println!("Aborted.");
                return Ok(());
            }

            let content = tokio::fs::read_to_string(&input)
                .await
                .with_context(|| format!("Failed to read tasks from {}", input.display()))?;

            let system = Arc::new(AgentSystem::from_config(&config)?);
            let runner = BatchRunner::new(system, config.roots.clone());
            let mut writer = open_writer(format, &output).await?;
            let summary = runner.run(&content, writer.as_mut()).await?;

            println!(
                "\nAll {} tasks processed! Result saved to: {}",
                summary.total,
                output.display()
            );
        }
        Commands::Interactive => {
            let system = Arc::new(AgentSystem::from_config(&config)?);
            let runner = BatchRunner::new(system, config.roots.clone());

            println!("Interactive mode - type 'exit' to quit");
            println!("Attach files with: <question> @file1 @file2");

            let mut rl = DefaultEditor::new()?;

            let history_path = std::env::var("HOME")
                .map(|h| format!("{}/.mfqa_history.txt", h))
                .unwrap_or_else(|_| ".mfqa-history.txt".to_string());

            let _ = rl.load_history(&history_path);

            loop {
                match rl.readline("\n> ") {
                    Ok(line) => {
                        let line = line.trim();

                        if line.is_empty() {
                            continue;
                        }

                        if line == "exit" || line == "quit" {
                            println!("Goodbye!");
                            break;
                        }

                        let _ = rl.add_history_entry(line);

                        let (files, words): (Vec<&str>, Vec<&str>) =
                            line.split_whitespace().partition(|w| w.starts_with('@'));
                        let files = files.iter().map(|f| f[1..].to_string()).collect();
                        let task = ask_task(words.join(" "), files);

                        match runner.ask(&task).await {
                            Ok(answer) => println!("\n{}", answer),
                            Err(e) => eprintln!("\n{}", batch::sanitize_error(&e.to_string())),
                        }
                    }
                    Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                        println!("\nGoodbye!");
                        break;
                    }
                    Err(err) => {
                        eprintln!("Error reading input: {}", err);
                        break;
                    }
                }
            }

            let _ = rl.save_history(&history_path);
        }
    }

    Ok(())
}
