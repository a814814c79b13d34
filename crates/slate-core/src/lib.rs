pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod form;
pub mod list;
pub mod render;
pub mod session;
pub mod task;
pub mod token;

use std::ffi::OsString;

use clap::Parser;
use tracing::info;

#[tracing::instrument(skip_all)]
pub async fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(verbose = cli.verbose, quiet = cli.quiet, "starting slate CLI");

    let mut cfg = config::Config::load(cli.slaterc.as_deref())?;
    cfg.apply_overrides(
        cli.rc_overrides
            .iter()
            .map(|kv| (kv.key.clone(), kv.value.clone())),
    );

    let mut renderer = render::Renderer::new(&cfg)?;

    commands::dispatch(&cfg, &mut renderer, cli).await?;

    info!("done");
    Ok(())
}
