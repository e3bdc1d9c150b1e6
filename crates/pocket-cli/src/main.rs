//! Pocket Classroom CLI
//!
//! Command-line interface for Pocket Classroom - learning capsules with
//! notes, flashcards and quizzes, stored locally.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pocket_core::{Config, Store};

mod commands;
mod editor;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "pocket")]
#[command(about = "Pocket Classroom - offline learning capsules")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use a specific config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize storage (seeds an example capsule on first run)
    Init,
    /// List capsules
    #[command(alias = "ls")]
    List {
        /// Only capsules whose title, description or tags contain this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show capsule details
    Show {
        /// Capsule ID (full or prefix)
        id: String,
    },
    /// Create a new capsule
    #[command(alias = "create")]
    New {
        #[arg(short = 'T', long)]
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        author: Option<String>,
        /// Tags to add
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// Edit a capsule interactively with autosave
    Author {
        /// Capsule ID (full or prefix)
        id: String,
    },
    /// Manage notes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Manage flashcards
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },
    /// Manage quiz questions
    Quiz {
        #[command(subcommand)]
        command: QuizCommands,
    },
    /// Attach files to a capsule
    Attach {
        /// Capsule ID (full or prefix)
        id: String,
        /// Files to attach
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Work with attached files
    Attachment {
        #[command(subcommand)]
        command: AttachmentCommands,
    },
    /// Delete a capsule and its progress
    #[command(alias = "rm")]
    Delete {
        /// Capsule ID (full or prefix)
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Export a capsule as a portable JSON file
    Export {
        /// Capsule ID (full or prefix)
        id: String,
        /// File or directory to write (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import a capsule from an exported file
    Import {
        /// File to import
        file: PathBuf,
    },
    /// Record and show study progress
    Study {
        #[command(subcommand)]
        command: StudyCommands,
    },
    /// Show storage status
    Status {
        /// Rebuild the capsule index from stored records
        #[arg(long)]
        rebuild: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Add a note to a capsule
    Add {
        /// Capsule ID (full or prefix)
        id: String,
        /// Note content in Markdown (opens editor if not provided)
        #[arg(short, long)]
        content: Option<String>,
    },
}

#[derive(Subcommand)]
enum CardCommands {
    /// Add a flashcard to a capsule
    Add {
        /// Capsule ID (full or prefix)
        id: String,
        #[arg(short, long)]
        front: String,
        #[arg(short, long)]
        back: String,
    },
}

#[derive(Subcommand)]
enum QuizCommands {
    /// Add a multiple-choice question to a capsule
    Add {
        /// Capsule ID (full or prefix)
        id: String,
        #[arg(short = 'Q', long)]
        question: String,
        /// A possible answer (repeat for each choice)
        #[arg(short, long = "choice")]
        choices: Vec<String>,
        /// Index of the correct choice, starting at 0
        #[arg(long)]
        correct: usize,
        #[arg(short, long)]
        explanation: Option<String>,
    },
}

#[derive(Subcommand)]
enum AttachmentCommands {
    /// Write an attachment's file to disk
    Save {
        /// Capsule ID (full or prefix)
        id: String,
        /// Attachment ID (full or prefix)
        attachment: String,
        /// File or directory to write (current directory if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum StudyCommands {
    /// Mark a flashcard as known
    Known {
        /// Capsule ID (full or prefix)
        id: String,
        /// Flashcard ID (full or prefix)
        card: String,
    },
    /// Mark a flashcard as not yet known
    Unknown {
        /// Capsule ID (full or prefix)
        id: String,
        /// Flashcard ID (full or prefix)
        card: String,
    },
    /// Record a finished quiz (number of correct answers)
    Score {
        /// Capsule ID (full or prefix)
        id: String,
        score: u32,
    },
    /// Show progress for a capsule
    Show {
        /// Capsule ID (full or prefix)
        id: String,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, autosave_interval_secs, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands work even when the stored config cannot be used
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    let mut store = Store::open_with_config(&config)?;
    debug!("Opened store at {:?}", config.sqlite_path());

    match cli.command {
        Commands::Init => commands::capsule::init(&mut store, &output),
        Commands::List { search } => commands::capsule::list(&store, search, &output),
        Commands::Show { id } => commands::capsule::show(&store, id, &output),
        Commands::New {
            title,
            description,
            author,
            tag,
        } => commands::capsule::create(&mut store, title, description, author, tag, &output),
        Commands::Author { id } => {
            return commands::author::run(store, id, config.autosave_interval(), &output).await;
        }
        Commands::Note { command } => handle_note_command(command, &mut store, &output),
        Commands::Card { command } => handle_card_command(command, &mut store, &output),
        Commands::Quiz { command } => handle_quiz_command(command, &mut store, &output),
        Commands::Attach { id, files } => {
            commands::content::attach(&mut store, id, files, &output).await
        }
        Commands::Attachment { command } => handle_attachment_command(command, &store, &output),
        Commands::Delete { id, yes } => commands::capsule::delete(&mut store, id, yes, &output),
        Commands::Export { id, output: path } => {
            commands::transfer::export(&store, id, path, &output)
        }
        Commands::Import { file } => commands::transfer::import(&mut store, file, &output),
        Commands::Study { command } => handle_study_command(command, &mut store, &output),
        Commands::Status { rebuild } => {
            commands::status::show(&mut store, &config, rebuild, &output)
        }
        Commands::Config { .. } => unreachable!(), // Handled above
    }?;

    store.close()
}

fn handle_note_command(command: NoteCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        NoteCommands::Add { id, content } => commands::content::add_note(store, id, content, output),
    }
}

fn handle_card_command(command: CardCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        CardCommands::Add { id, front, back } => {
            commands::content::add_card(store, id, front, back, output)
        }
    }
}

fn handle_quiz_command(command: QuizCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        QuizCommands::Add {
            id,
            question,
            choices,
            correct,
            explanation,
        } => commands::content::add_question(
            store,
            id,
            question,
            choices,
            correct,
            explanation,
            output,
        ),
    }
}

fn handle_attachment_command(
    command: AttachmentCommands,
    store: &Store,
    output: &Output,
) -> Result<()> {
    match command {
        AttachmentCommands::Save {
            id,
            attachment,
            output: path,
        } => commands::content::save_attachment(store, id, attachment, path, output),
    }
}

fn handle_study_command(command: StudyCommands, store: &mut Store, output: &Output) -> Result<()> {
    match command {
        StudyCommands::Known { id, card } => commands::study::known(store, id, card, output),
        StudyCommands::Unknown { id, card } => commands::study::unknown(store, id, card, output),
        StudyCommands::Score { id, score } => commands::study::score(store, id, score, output),
        StudyCommands::Show { id } => commands::study::show(store, id, output),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Install the tracing subscriber
///
/// The level comes from `-v` flags, or `RUST_LOG` when no flag is given.
/// Logs go to the configured log file, or stderr.
fn init_logging(config: &Config, verbose: u8) {
    let directives = match (verbose, std::env::var("RUST_LOG")) {
        (0, Ok(rust_log)) if !rust_log.is_empty() => rust_log,
        (0, _) => format_filter("warn"),
        (1, _) => format_filter("debug"),
        _ => format_filter("trace"),
    };
    let env_filter = EnvFilter::new(directives);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore the error if a subscriber is already installed
    match &config.log_file {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let _ = builder.with_ansi(false).with_writer(file).try_init();
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                let _ = builder.with_writer(std::io::stderr).try_init();
            }
        },
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

fn format_filter(level: &str) -> String {
    format!("pocket_core={},pocket_cli={}", level, level)
}
