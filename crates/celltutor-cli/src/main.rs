use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

use celltutor_core::agent::{CellAgentBuilder, CellAgentRuntime};
use celltutor_core::config::{LoggingSettings, TutorConfig};
use celltutor_core::providers::{create_generator, GenerateOptions};
use celltutor_core::storage::Registry;
use celltutor_core::types::QuizAnswer;
use celltutor_core::visual::PlaceholderRenderer;

/// CellTutor CLI - tutoring agents for code cells
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and register a cell agent from a Python file
    Build {
        /// Position of the cell in its notebook
        cell_index: i64,

        /// File containing the cell source
        file: PathBuf,

        /// Display title (default: CellAgent_<index>)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Print the stored manifest
    Show { id: String },

    /// Print the summary or the line-by-line explanation
    Explain {
        id: String,

        /// "summary" or "line"
        #[arg(short, long, default_value = "summary")]
        depth: String,
    },

    /// Print the diagram and animation references
    Visuals { id: String },

    /// Ask a follow-up question about the cell
    Ask { id: String, question: String },

    /// Grade answers given as INDEX=ANSWER
    Quiz {
        id: String,

        #[arg(required = true, value_parser = parse_answer)]
        answers: Vec<QuizAnswer>,
    },

    /// List recorded quiz attempts for a cell
    Attempts { id: String },

    /// List registered cell agents, newest first
    List {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

fn parse_answer(raw: &str) -> Result<QuizAnswer, String> {
    let (index, answer) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=ANSWER, got '{}'", raw))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid question index '{}': {}", index, e))?;
    Ok(QuizAnswer::new(index, answer))
}

fn init_tracing(settings: &LoggingSettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .context("Invalid log filter")?;

    match &settings.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Opening log file {:?}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = TutorConfig::load(cli.config.as_deref()).context("Loading configuration")?;
    init_tracing(&config.logging)?;

    let registry = Registry::open(&config.storage.db_path)
        .with_context(|| format!("Opening registry {:?}", config.storage.db_path))?;
    let generator = create_generator(&config.generator)?;
    tracing::debug!(
        "Registry {} with generator {}",
        config.storage.db_path.display(),
        generator.name()
    );
    let options = GenerateOptions {
        temperature: config.generator.temperature,
        max_tokens: config.generator.max_tokens,
    };
    let runtime = CellAgentRuntime::new(registry.clone(), generator.clone()).with_options(options);

    match cli.command {
        Commands::Build {
            cell_index,
            file,
            title,
        } => {
            let code = std::fs::read_to_string(&file)
                .with_context(|| format!("Reading cell source {:?}", file))?;
            let renderer = Arc::new(PlaceholderRenderer::new(&config.storage.artifacts_dir)?);
            let builder =
                CellAgentBuilder::new(generator, renderer, registry).with_options(options);
            let manifest = builder.build_for_cell(cell_index, &code, title.as_deref())?;

            if cli.json {
                print_json(&manifest)?;
            } else {
                println!("Built agent: {}", manifest.id().unwrap_or_default());
                println!("Name:        {}", manifest.name);
                println!("Questions:   {}", manifest.quiz.len());
            }
        }
        Commands::Show { id } => {
            let manifest = runtime.manifest(&id)?;
            print_json(&manifest)?;
        }
        Commands::Explain { id, depth } => {
            let text = runtime.explain(&id, depth.as_str())?;
            if cli.json {
                print_json(&serde_json::json!({ "id": id, "depth": depth, "text": text }))?;
            } else {
                println!("{}", text);
            }
        }
        Commands::Visuals { id } => {
            let visuals = runtime.get_visuals(&id)?;
            if cli.json {
                print_json(&visuals)?;
            } else {
                if visuals.diagram.is_none() && visuals.animation.is_none() {
                    bail!("No visuals for cell agent {}", id);
                }
                println!("Diagram:   {}", visuals.diagram.unwrap_or_default());
                println!("Animation: {}", visuals.animation.unwrap_or_default());
            }
        }
        Commands::Ask { id, question } => {
            let answer = runtime.ask_question(&id, &question)?;
            if cli.json {
                print_json(&serde_json::json!({ "question": question, "answer": answer }))?;
            } else {
                println!("{}", answer);
            }
        }
        Commands::Quiz { id, answers } => {
            let result = runtime.run_quiz(&id, &answers)?;
            if cli.json {
                print_json(&result)?;
            } else {
                for d in &result.details {
                    let mark = if d.correct { "✓" } else { "✗" };
                    println!("{} Q{}: {}", mark, d.index, d.user_answer);
                }
                println!("Score: {}/{}", result.score, result.total);
            }
        }
        Commands::Attempts { id } => {
            let attempts = runtime.registry().attempts_for_cell(&id)?;
            if cli.json {
                print_json(&attempts)?;
            } else if attempts.is_empty() {
                println!("No attempts recorded for {}", id);
            } else {
                for a in &attempts {
                    println!(
                        "{}  {:.0}  {}/{}",
                        a.id, a.ts, a.quiz_result.score, a.quiz_result.total
                    );
                }
            }
        }
        Commands::List { limit } => {
            let manifests = runtime.registry().list_manifests(limit)?;
            if cli.json {
                print_json(&manifests)?;
            } else {
                for m in &manifests {
                    println!("{}  cell {:>3}  {}", m.id, m.cell_index, m.name);
                }
            }
        }
    }

    Ok(())
}
