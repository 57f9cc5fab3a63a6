pub mod build;
pub mod cli;
pub mod config;
pub mod host;
pub mod presentation;
mod utils;
pub mod version;

use anyhow::Result;
use clap::Parser;

use cli::Cli;
use config::RzdConfig;

pub use host::{hard_reload, ClientHost, StorageHost};
pub use presentation::{PromptAction, PromptView, UpdateBanner, UpdatePresenter, UpdatePrompt};
pub use version::{
    ProviderOptions, ReconciliationStatus, VersionError, VersionHandle, VersionProvider,
    VersionRecord, VersionSnapshot,
};

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    utils::logging::init();
    utils::logging::set_debug(cli.debug);

    let config = RzdConfig::load_with_env(&cli.project)?;
    utils::logging::set_debug(config.debug);

    log::debug!("rzd {} starting", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(cli::dispatch(cli, config))
}
