//! `folio` command line entry point.
//!
//! # Responsibility
//! - Load `folio.toml`, start logging and open the content store.
//! - Expose init/show/index/image-cache/delete over the content service, one output
//!   line per record.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use folio_core::model::value::format_date;
use folio_core::{
    init_from_config, open_db, Content, ContentService, FolioConfig, FsBodyStore,
    SqliteContentRepository,
};
use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const DEFAULT_CONFIG_FILE: &str = "folio.toml";

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Inspect and manage a folio content store")]
struct Cli {
    /// Path to the TOML config file. Defaults apply when `folio.toml` is absent.
    #[arg(short, long, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    /// Override `[database] path`.
    #[arg(long, env = "FOLIO_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the schema and the `pages/` body directory.
    Init,
    /// Print one active record by address.
    Show {
        address: String,
        /// Also print the body.
        #[arg(long)]
        body: bool,
    },
    /// List active records, newest first.
    Index {
        /// Only list records below this address; repeatable.
        #[arg(long = "parent")]
        parents: Vec<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Recompute a post's `has_img` flag from the image tree.
    ImageCache {
        address: String,
        /// Overrides `content.images_dir`.
        #[arg(long)]
        images_dir: Option<PathBuf>,
    },
    /// Delete one record by address.
    Delete {
        address: String,
        /// Leave the body file in place.
        #[arg(long)]
        keep_body: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database.path = database;
    }
    init_from_config(&config.logging).context("failed to start logging")?;

    let mut conn = open_db(&config.database.path).with_context(|| {
        format!("failed to open database {}", config.database.path.display())
    })?;
    let bodies = FsBodyStore::new(&config.content.root_dir);

    if let Command::Init = cli.command {
        let pages = bodies.ensure_pages_dir()?;
        info!("event=cli_init module=cli status=ok");
        println!(
            "initialized database={} pages={}",
            config.database.path.display(),
            pages.display()
        );
        return Ok(());
    }

    let repo = SqliteContentRepository::try_new(&mut conn, bodies)?;
    let mut service = ContentService::with_limits(repo, config.index);

    match cli.command {
        Command::Init => {}
        Command::Show { address, body } => {
            let content = service.get_by_address(&address)?;
            println!("{}", summary_line(&content));
            if body {
                println!("{}", content.body().unwrap_or_default());
            }
        }
        Command::Index {
            parents,
            limit,
            page,
        } => {
            let listing = service.list_index(&parents, limit, page)?;
            for content in &listing.items {
                println!("{}", summary_line(content));
            }
            eprintln!(
                "page={} limit={} count={}",
                listing.page,
                listing.applied_limit,
                listing.items.len()
            );
        }
        Command::ImageCache {
            address,
            images_dir,
        } => {
            let images_dir = images_dir.unwrap_or_else(|| config.content.images_dir.clone());
            let (content, has_img) = service.refresh_image_cache(&address, &images_dir)?;
            match has_img {
                Some(has_img) => println!("{}\thas_img={has_img}", summary_line(&content)),
                None => println!("{}\tno image flag", summary_line(&content)),
            }
        }
        Command::Delete { address, keep_body } => {
            let removed = service.delete(&address, !keep_body)?;
            println!("deleted {}", summary_line(&removed));
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<FolioConfig> {
    match path {
        Some(path) => FolioConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => FolioConfig::load(DEFAULT_CONFIG_FILE)
            .with_context(|| format!("failed to load config {DEFAULT_CONFIG_FILE}")),
        None => Ok(FolioConfig::default()),
    }
}

fn summary_line(content: &Content) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        content.id().map_or_else(|| "-".to_string(), |id| id.to_string()),
        content.content_class().unwrap_or("-"),
        content.address().unwrap_or_default(),
        content
            .date_created()
            .map(|date| format_date(&date))
            .unwrap_or_default(),
        content.title().unwrap_or_default()
    )
}
