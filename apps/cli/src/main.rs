//! Command-line import/export and deck administration for kioku.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use kioku_core::io::{
    export_deck, export_to_csv, export_to_json, parse_import_json, prepare_import_cards,
    prepare_import_deck, CardDuplicateStrategy, DeckConflictStrategy, DeckImportAction,
    ImportOptions,
};
use kioku_core::stats::{aggregate_daily_stats, deck_stats, forecast_reviews};
use kioku_core::types::Deck;
use kioku_store::{CardStore, DeckStore, ReviewStore, SqliteStore, StatsStore};

#[derive(Parser)]
#[command(name = "kioku", about = "Flashcard deck administration and import/export", version)]
struct Cli {
    /// Database file (default: platform data dir)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DeckConflictArg {
    Skip,
    Rename,
    Replace,
}

impl From<DeckConflictArg> for DeckConflictStrategy {
    fn from(value: DeckConflictArg) -> Self {
        match value {
            DeckConflictArg::Skip => Self::Skip,
            DeckConflictArg::Rename => Self::Rename,
            DeckConflictArg::Replace => Self::Replace,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DuplicateArg {
    Skip,
    Replace,
    KeepBoth,
}

impl From<DuplicateArg> for CardDuplicateStrategy {
    fn from(value: DuplicateArg) -> Self {
        match value {
            DuplicateArg::Skip => Self::Skip,
            DuplicateArg::Replace => Self::Replace,
            DuplicateArg::KeepBoth => Self::KeepBoth,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List decks with their card counts
    Decks,

    /// Create an empty deck
    CreateDeck {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a deck and everything in it
    DeleteDeck {
        name: String,
    },

    /// Import a deck from a JSON export
    Import {
        file: PathBuf,
        /// What to do when the deck name already exists
        #[arg(long, value_enum, default_value = "rename")]
        on_deck_conflict: DeckConflictArg,
        /// What to do with cards whose front and back already exist
        #[arg(long, value_enum, default_value = "skip")]
        on_duplicate: DuplicateArg,
        /// Import into this existing deck instead of the one in the file
        #[arg(long)]
        into: Option<String>,
    },

    /// Export a deck to JSON (or CSV with --csv)
    Export {
        name: String,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Export cards as CSV instead of the JSON envelope
        #[arg(long)]
        csv: bool,
        /// Include review history in the JSON export
        #[arg(long)]
        include_reviews: bool,
    },

    /// Show statistics for a deck
    Stats {
        name: String,
    },

    /// Show the review forecast for a deck
    Forecast {
        name: String,
        #[arg(long, default_value_t = 14)]
        days: usize,
    },

    /// Show due counts
    Due {
        name: Option<String>,
    },
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kioku")
        .join("kioku.db")
}

fn resolve_deck(store: &SqliteStore, name: &str) -> Result<Deck> {
    match store.get_deck_by_name(name)? {
        Some(deck) => Ok(deck),
        None => bail!("deck not found: {name}"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or_else(default_db_path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut store = SqliteStore::open(&db_path)
        .with_context(|| format!("opening {}", db_path.display()))?;

    match cli.command {
        Command::Decks => {
            let now = Utc::now();
            for deck in store.get_all_decks()? {
                let cards = store.get_cards_by_deck(&deck.id)?;
                let due = store.deck_due_count(&deck.id, now)?;
                println!("{}  ({} cards, {} due)", deck.name, cards.len(), due);
            }
        }

        Command::CreateDeck { name, description } => {
            let deck = store.create_deck(&name, description.as_deref(), None, Utc::now())?;
            println!("created deck {} ({})", deck.name, deck.id);
        }

        Command::DeleteDeck { name } => {
            let deck = resolve_deck(&store, &name)?;
            store.delete_deck(&deck.id)?;
            println!("deleted deck {}", deck.name);
        }

        Command::Import {
            file,
            on_deck_conflict,
            on_duplicate,
            into,
        } => {
            let json = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let imported = parse_import_json(&json)?;
            for warning in &imported.warnings {
                eprintln!("warning: {warning}");
            }

            let now = Utc::now();
            let mut options = ImportOptions {
                deck_name_conflict: on_deck_conflict.into(),
                card_duplicate: on_duplicate.into(),
                include_reviews: false,
                target_deck_id: None,
            };
            if let Some(into) = &into {
                options.target_deck_id = Some(resolve_deck(&store, into)?.id);
            }

            let target_deck_id = match &options.target_deck_id {
                Some(id) => id.clone(),
                None => {
                    let existing = store.get_all_decks()?;
                    let plan = prepare_import_deck(&imported.data, &existing, &options, now);
                    match (plan.action, plan.deck) {
                        (DeckImportAction::Skip, _) | (_, None) => {
                            println!("deck {:?} already exists, skipping", imported.data.deck.name);
                            return Ok(());
                        }
                        (DeckImportAction::Replace, Some(deck)) => {
                            store.update_deck(&deck)?;
                            deck.id
                        }
                        (DeckImportAction::Create, Some(deck)) => {
                            store
                                .create_deck(
                                    &deck.name,
                                    deck.description.as_deref(),
                                    Some(deck.settings),
                                    now,
                                )?
                                .id
                        }
                    }
                }
            };

            let existing_cards = store.get_cards_by_deck(&target_deck_id)?;
            let plan =
                prepare_import_cards(&imported.data, &target_deck_id, &existing_cards, &options, now);
            store.upsert_cards(&plan.cards)?;
            println!(
                "imported {} cards ({} duplicates skipped)",
                plan.cards.len(),
                plan.skipped
            );
        }

        Command::Export {
            name,
            output,
            csv,
            include_reviews,
        } => {
            let deck = resolve_deck(&store, &name)?;
            let cards = store.get_cards_by_deck(&deck.id)?;

            let content = if csv {
                export_to_csv(&cards)?
            } else {
                let reviews = if include_reviews {
                    Some(store.get_reviews_by_deck(&deck.id)?)
                } else {
                    None
                };
                let data = export_deck(&deck, &cards, reviews.as_deref(), Utc::now());
                export_to_json(&data, true)?
            };

            match output {
                Some(path) => {
                    fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("exported {} cards to {}", cards.len(), path.display());
                }
                None => print!("{content}"),
            }
        }

        Command::Stats { name } => {
            let deck = resolve_deck(&store, &name)?;
            let now = Utc::now();
            let cards = store.get_cards_by_deck(&deck.id)?;
            let reviews = store.get_reviews_by_deck(&deck.id)?;
            let stats = deck_stats(&cards, &reviews, now);

            println!("{}", deck.name);
            println!("  cards:     {} total", stats.total_cards);
            println!(
                "  by status: {} new / {} learning / {} review / {} suspended",
                stats.new_cards, stats.learning_cards, stats.review_cards, stats.suspended_cards
            );
            println!(
                "  due:       {} today, {} tomorrow",
                stats.due_today, stats.due_tomorrow
            );
            println!("  avg ease:  {:.2}", stats.average_ease_factor);
            println!("  retention: {:.0}% (30 days)", stats.retention_rate);
            println!(
                "  streak:    {} days (longest {})",
                stats.current_streak, stats.longest_streak
            );

            let start = now.date_naive() - chrono::Duration::days(30);
            let rows = store.get_daily_stats_range(start, now.date_naive(), Some(&deck.id))?;
            let summary = aggregate_daily_stats(&rows);
            println!(
                "  last 30d:  {} reviews over {} days ({} / active day)",
                summary.total_reviewed, summary.days, summary.average_per_day
            );
        }

        Command::Forecast { name, days } => {
            let deck = resolve_deck(&store, &name)?;
            let cards = store.get_cards_by_deck(&deck.id)?;
            for day in forecast_reviews(&cards, days, Utc::now()) {
                println!("{}  {}", day.date, day.due);
            }
        }

        Command::Due { name } => {
            let now = Utc::now();
            let count = match name {
                Some(name) => {
                    let deck = resolve_deck(&store, &name)?;
                    store.deck_due_count(&deck.id, now)?
                }
                None => store.total_due_count(now)?,
            };
            println!("{count}");
        }
    }

    Ok(())
}
