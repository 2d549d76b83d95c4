mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use famalbum_core::error::Error;
use famalbum_core::Album;
use tracing_subscriber::EnvFilter;

/// famalbum: family photo album with per-field counters
#[derive(Parser)]
#[command(name = "famalbum", version, about)]
struct Cli {
    /// Path to the catalog database
    #[arg(long, default_value_t = default_catalog_path())]
    catalog: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish, list, edit and delete photos
    Photos {
        #[command(subcommand)]
        action: PhotosAction,
    },
    /// Show or rebuild the per-field counters
    Stats {
        /// Print the counters as JSON
        #[arg(long)]
        json: bool,

        #[command(subcommand)]
        action: Option<StatsAction>,
    },
    /// Manage the e-mail to nick mapping
    Family {
        #[command(subcommand)]
        action: Option<FamilyAction>,
    },
    /// Show or change album settings
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum PhotosAction {
    /// Publish a single image file
    Add {
        /// Path to the image
        path: PathBuf,
        /// Uploader e-mail
        #[arg(long)]
        email: String,
        /// Headline (defaults to the album's no_title setting)
        #[arg(long)]
        headline: Option<String>,
        /// Tags, comma separated
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Publish every image under a directory
    Import {
        /// Directory to walk
        dir: PathBuf,
        /// Uploader e-mail
        #[arg(long)]
        email: String,
    },
    /// List one page of photos, newest first
    Ls {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        day: Option<u32>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        lens: Option<String>,
        #[arg(long)]
        nick: Option<String>,
        /// Match photos with any of these tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Match headlines starting with any of these words
        #[arg(long)]
        text: Option<String>,
        /// Continue after this photo id
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Change fields of a photo
    Edit {
        id: String,
        #[arg(long)]
        headline: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// YYYY-MM-DD or YYYY-MM-DD HH:MM
        #[arg(long)]
        date: Option<String>,
        /// Camera model (empty string clears it)
        #[arg(long)]
        model: Option<String>,
        /// Lens (empty string clears it)
        #[arg(long)]
        lens: Option<String>,
        /// Replace tags, comma separated
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },
    /// Delete photos
    Rm {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Replace the tags of several photos
    Tag {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Tags, comma separated
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Set the headline of several photos
    Headline {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        headline: String,
    },
}

#[derive(Subcommand)]
enum StatsAction {
    /// Rebuild the counters of one field (or `all`) from the photo records
    Recompute {
        /// year, month, tags, model, lens, email, nick or all
        field: String,
    },
    /// Show storage totals
    Bucket {
        /// Recompute totals from the photo records first
        #[arg(long)]
        recompute: bool,
    },
}

#[derive(Subcommand)]
enum FamilyAction {
    /// Map an e-mail to a nick
    Add { email: String, nick: String },
    /// List the mapping
    Ls,
    /// Remove an e-mail from the mapping
    Rm { email: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Change a setting (page_limit, no_title)
    Set { key: String, value: String },
    /// Show all settings
    Show,
}

fn default_catalog_path() -> String {
    dirs_path().to_string_lossy().to_string()
}

fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".famalbum").join("catalog.db")
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let catalog_path = PathBuf::from(&cli.catalog);
    tracing::debug!(catalog = %catalog_path.display(), "opening album");
    let mut album = Album::open(&catalog_path)?;

    let result = run(&mut album, cli.command);
    if let Err(err) = &result {
        if let Some(Error::PartialUpdate { stale_fields, .. }) = err.downcast_ref::<Error>() {
            for field in stale_fields {
                eprintln!("  hint: run `famalbum stats recompute {field}`");
            }
        }
    }
    result
}

fn run(album: &mut Album, command: Commands) -> Result<()> {
    match command {
        Commands::Photos { action } => match action {
            PhotosAction::Add {
                path,
                email,
                headline,
                tags,
            } => commands::photos::add(album, &path, email, headline, tags)?,
            PhotosAction::Import { dir, email } => commands::photos::import(album, &dir, &email)?,
            PhotosAction::Ls {
                year,
                month,
                day,
                model,
                lens,
                nick,
                tags,
                text,
                cursor,
            } => {
                let filter = commands::photos::build_filter(
                    year,
                    month,
                    day,
                    model,
                    lens,
                    nick,
                    tags,
                    text.as_deref(),
                );
                commands::photos::ls(album, &filter, cursor.as_deref())?
            }
            PhotosAction::Edit {
                id,
                headline,
                email,
                date,
                model,
                lens,
                tags,
            } => {
                let update = famalbum_core::domain::PhotoUpdate {
                    headline,
                    email,
                    date,
                    model: model.map(commands::photos::clearable),
                    lens: lens.map(commands::photos::clearable),
                    tags,
                };
                commands::photos::edit(album, &id, update)?
            }
            PhotosAction::Rm { ids } => commands::photos::rm(album, &ids)?,
            PhotosAction::Tag { ids, tags } => commands::photos::tag(album, &ids, &tags)?,
            PhotosAction::Headline { ids, headline } => {
                commands::photos::headline(album, &ids, &headline)?
            }
        },
        Commands::Stats { json, action } => match action {
            None => commands::stats::show(album, json)?,
            Some(StatsAction::Recompute { field }) => commands::stats::recompute(album, &field)?,
            Some(StatsAction::Bucket { recompute }) => commands::stats::bucket(album, recompute)?,
        },
        Commands::Family { action } => match action {
            None | Some(FamilyAction::Ls) => commands::family::list(album),
            Some(FamilyAction::Add { email, nick }) => commands::family::add(album, &email, &nick)?,
            Some(FamilyAction::Rm { email }) => commands::family::rm(album, &email)?,
        },
        Commands::Config { action } => match action {
            None | Some(ConfigAction::Show) => commands::config::show(album),
            Some(ConfigAction::Set { key, value }) => {
                commands::config::set(album, &key, &value)?
            }
        },
    }

    Ok(())
}
