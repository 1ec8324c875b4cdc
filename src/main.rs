use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use gitlab_ls::config::Config;
use gitlab_ls::gitlab::client::GitlabClient;
use gitlab_ls::store::IndexStore;
use gitlab_ls::sync::{LogProgress, SyncEngine};

#[derive(Parser, Debug)]
#[command(name = "gitlab-ls")]
#[command(about = "Synchronize the GitLab issue/merge-request reference index")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/gitlab-ls/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Project paths to sync (overrides the configured list)
  #[arg(short, long)]
  project: Vec<String>,
}

/// Log to a file; stdout/stderr belong to the editor transport.
fn init_logging() -> Result<WorkerGuard> {
  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("gitlab-ls");
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory: {}", e))?;

  let appender = tracing_appender::rolling::never(log_dir, "gitlab-ls.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_logging()?;

  let config = Config::load(args.config.as_deref())?;
  let projects = if args.project.is_empty() {
    config.projects.clone()
  } else {
    args.project.clone()
  };

  let token = Config::get_api_token()?;
  let client = GitlabClient::new(&config.gitlab.url, &token)?;
  let store = IndexStore::open()?;
  let engine = SyncEngine::new(client, store);

  let index = engine.sync(&projects, &mut LogProgress).await?;

  for (path, project) in &index {
    println!(
      "{}: {} issues, {} merge requests (as of {})",
      path,
      project.issues.len(),
      project.merge_requests.len(),
      project.last_update
    );
  }

  Ok(())
}
