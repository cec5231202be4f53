mod config;
mod logging;
mod remote;
mod store;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use remote::client::HttpRemote;
use remote::types::Writing;
use store::persist::SqliteStorage;
use store::writings::WritingsStore;

#[derive(Parser, Debug)]
#[command(name = "quillbox")]
#[command(about = "Local-first store for a writing app's articles and drafts")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/quillbox/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Refresh the local articles from the backend
  Sync,
  /// Print the local articles
  List,
  /// Print the local drafts
  Drafts,
  /// Publish a writing from a JSON file (upserts remotely)
  Publish { file: PathBuf },
  /// Delete an article remotely and locally
  Unpublish { id: String },
  /// Manage local-only drafts
  Draft {
    #[command(subcommand)]
    action: DraftAction,
  },
  /// Print one writing (article or draft) by id
  Show { id: String },
}

#[derive(Subcommand, Debug)]
enum DraftAction {
  /// Save a draft from a JSON file (local only)
  Save { file: PathBuf },
  /// Delete a draft by id (local only)
  Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init()?;

  let config = config::Config::load(args.config.as_deref())?;

  let storage = match &config.store.db_path {
    Some(path) => SqliteStorage::open_at(path)?,
    None => SqliteStorage::open()?,
  };
  let remote = HttpRemote::new(&config)?;
  let store = WritingsStore::open(remote, storage)?;

  match args.command {
    Command::Sync => {
      store.articles_by_owner().await;
      println!("{} articles", store.articles().await.len());
    }
    Command::List => print_writings(&store.articles().await)?,
    Command::Drafts => print_writings(&store.drafts().await)?,
    Command::Publish { file } => {
      let writing = load_writing(&file)?;
      let id = writing.id.clone();
      store.add_article(writing).await;
      println!("published {}", id);
    }
    Command::Unpublish { id } => {
      store.remove_article(&id).await;
    }
    Command::Draft { action } => match action {
      DraftAction::Save { file } => {
        let draft = load_writing(&file)?;
        let id = draft.id.clone();
        store.save_draft(draft).await;
        println!("saved draft {}", id);
      }
      DraftAction::Delete { id } => {
        store.delete_draft(&id).await;
      }
    },
    Command::Show { id } => {
      let found = store
        .articles()
        .await
        .into_iter()
        .chain(store.drafts().await)
        .find(|w| w.id == id)
        .ok_or_else(|| eyre!("No writing with id {}", id))?;
      println!("{}", serde_json::to_string_pretty(&found)?);
    }
  }

  Ok(())
}

/// Read a writing from a JSON file, minting an id when the file leaves it
/// empty.
fn load_writing(path: &Path) -> Result<Writing> {
  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;

  let mut writing: Writing = serde_json::from_str(&contents)
    .map_err(|e| eyre!("Failed to parse {}: {}", path.display(), e))?;

  if writing.id.is_empty() {
    writing.id = Uuid::new_v4().to_string();
  }

  Ok(writing)
}

fn print_writings(writings: &[Writing]) -> Result<()> {
  if writings.is_empty() {
    println!("(none)");
    return Ok(());
  }

  for w in writings {
    println!(
      "{}  {}  [{}]  {}",
      w.id,
      w.updated_at.format("%Y-%m-%d %H:%M"),
      w.category,
      w.title
    );
  }

  Ok(())
}
