pub mod board;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod error;
pub mod id;
pub mod render;
pub mod reorder;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting dayboard CLI"
  );

  let mut cfg = config::Config::load(
    cli.rc_file.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );
  debug!(files = ?cfg.loaded_files, "configuration loaded");

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store =
    datastore::FileStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open datastore at \
         {}",
        data_dir.display()
      )
    })?;

  let mut board = board::Board::open(
    datastore::PersistenceBridge::new(
      store,
      cfg.storage_key()
    )
  );

  let renderer =
    render::Renderer::new(&cfg)?;
  let mut out = std::io::stdout().lock();

  commands::dispatch(
    &mut board,
    &cfg,
    &renderer,
    &mut out,
    cli.command,
    Utc::now()
  )?;

  info!("done");
  Ok(())
}
