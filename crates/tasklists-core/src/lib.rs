pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod ids;
pub mod model;
pub mod render;
pub mod state;
pub mod storage;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting tasklists CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.rc_file.as_deref()
  )?;
  cfg.apply_overrides(
    pre
      .rc_overrides
      .into_iter()
      .chain(cli.rc_overrides)
  );

  let data_dir = cfg
    .data_dir(cli.data.as_deref())
    .context(
      "failed to resolve data \
       directory"
    )?;

  let kv = storage::DirStore::open(
    &data_dir,
    cfg.storage_quota()?
  )
  .with_context(|| {
    format!(
      "failed to open store at {}",
      data_dir.display()
    )
  })?;

  let mut app = app::TaskListApp::open(
    kv,
    cfg.id_scheme()?
  );

  let mut renderer =
    render::Renderer::new(&cfg)?;
  let inv =
    cli::Invocation::parse(cli.rest)?;

  commands::dispatch(
    &mut app,
    &cfg,
    &mut renderer,
    inv
  )?;

  info!("done");
  Ok(())
}
