mod categories;
mod document;
mod exec;
mod extract;
mod record;
mod store;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use extract::SystemSource;
use record::Record;
use store::{DiffOutcome, DocumentStore};

#[derive(Parser)]
#[command(
    name = "mandraft",
    about = "Generate, persist and compare structured command manuals"
)]
struct Cli {
    /// Directory holding the generated documents
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build manuals for every listed command and write canonical + draft documents
    Generate {
        /// Command list, one name per line
        file: PathBuf,
    },
    /// Print the canonical document for a command
    Show { command: String },
    /// Print one stored field from a command's canonical document
    Info {
        command: String,
        #[arg(value_enum)]
        field: InfoField,
    },
    /// Diff canonical documents against their drafts
    Verify {
        /// Command list, one name per line
        file: PathBuf,
    },
    /// Search generated descriptions for a word
    Search {
        /// Command list, one name per line
        file: PathBuf,
        word: String,
    },
    /// Suggest related commands by category
    Recommend { command: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum InfoField {
    Description,
    Version,
    Example,
    Related,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let source = SystemSource;

    match cli.command {
        Commands::Generate { file } => {
            let commands = read_command_list(&file)?;
            let mut store = DocumentStore::open(&cli.dir);
            store.load_existing(&commands);
            if store.existing_count() > 0 {
                println!("Loaded {} existing manuals.", store.existing_count());
            }

            let pb = ProgressBar::new(commands.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?
                    .progress_chars("=> "),
            );

            let mut saved = 0usize;
            for command in &commands {
                pb.set_message(command.clone());
                let record = Record::live(command.as_str());
                let result = store
                    .save_canonical(&record, &source)
                    .and_then(|_| store.save_draft(&record, &source));
                match result {
                    Ok(()) => saved += 1,
                    Err(err) => warn!("failed to save documents for '{command}': {err}"),
                }
                store.record_generated(record);
                pb.inc(1);
            }
            pb.finish_and_clear();
            println!(
                "Saved {} of {} manuals to {}",
                saved,
                commands.len(),
                cli.dir.display()
            );
        }
        Commands::Show { command } => {
            let store = DocumentStore::open(&cli.dir);
            let path = store.canonical_path(&record::canonical_key(&command));
            match fs::read_to_string(&path) {
                Ok(xml) => println!("{xml}"),
                Err(_) => println!("No document found for '{command}' at {}", path.display()),
            }
        }
        Commands::Info { command, field } => {
            let mut store = DocumentStore::open(&cli.dir);
            store.load_existing(std::slice::from_ref(&command));
            match store.existing_record(&record::canonical_key(&command)) {
                Some(rec) => {
                    let value = match field {
                        InfoField::Description => rec.description(&source),
                        InfoField::Version => rec.version_info(&source),
                        InfoField::Example => rec.example(&source),
                        InfoField::Related => rec.related_commands(&source),
                    };
                    match value {
                        Ok(text) => println!("{text}"),
                        Err(err) => println!("{err}"),
                    }
                }
                None => println!("No document found for '{command}'."),
            }
        }
        Commands::Verify { file } => {
            let commands = read_command_list(&file)?;
            let store = DocumentStore::open(&cli.dir);
            for command in &commands {
                match store.diff(&record::canonical_key(command)) {
                    Ok(DiffOutcome::Unchanged) => {
                        println!("Pass: no changes detected for '{command}'.");
                    }
                    Ok(DiffOutcome::Changed(patch)) => {
                        println!("Changes detected for '{command}':\n{patch}");
                    }
                    Ok(DiffOutcome::MissingCanonical) => {
                        println!("Missing canonical document for '{command}'.");
                    }
                    Ok(DiffOutcome::MissingDraft) => {
                        println!("Missing draft document for '{command}'.");
                    }
                    Err(err) => warn!("diff failed for '{command}': {err}"),
                }
            }
            println!("Verification complete.");
        }
        Commands::Search { file, word } => {
            let commands = read_command_list(&file)?;
            let mut store = DocumentStore::open(&cli.dir);
            for command in &commands {
                store.record_generated(Record::live(command.as_str()));
            }
            let mut found = false;
            for identifier in store.search_by_description(&word, &source) {
                println!("Command: {identifier}");
                found = true;
            }
            if !found {
                println!("No commands found with '{word}' in their descriptions.");
            }
        }
        Commands::Recommend { command } => {
            let matches = categories::matching(&record::canonical_key(&command));
            if matches.is_empty() {
                println!("No specific recommendations found for '{command}'.");
            } else {
                for category in matches {
                    println!("{}:", category.name);
                    for name in category.commands {
                        println!("  {name}");
                    }
                }
            }
        }
    }

    Ok(())
}

fn read_command_list(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading command list {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
