pub mod init;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::time::Duration;

use crate::{
    build::{self, generate_identity, write_manifest},
    config::{AdapterKind, RzdConfig},
};

use watch::WatchSettings;

#[derive(Parser)]
#[command(name = "rzd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Zero-downtime builds and new-build detection for web apps", long_about = None)]
pub struct Cli {
    /// Project root containing package.json and rzd.config.json
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub project: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create rzd.config.json and route `npm run build` through rzd
    Init,

    /// Build into a scratch dir, merge over the output dir and publish app-version.json
    Build {
        /// Override the configured adapter
        #[arg(long)]
        adapter: Option<AdapterKind>,
    },

    /// Write only a fresh app-version.json into a directory
    Manifest {
        /// Target directory (default: the adapter's output dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Poll a deployed origin and prompt when a newer build is published
    Watch {
        /// Origin serving the app, e.g. https://app.example.com
        #[arg(long)]
        url: String,

        /// Manifest of the build considered "running"
        #[arg(long)]
        current: Option<PathBuf>,

        /// Poll interval in milliseconds (default: config checkInterval)
        #[arg(long)]
        interval: Option<u64>,

        /// Show a banner instead of the modal prompt
        #[arg(long)]
        banner: bool,

        /// Replace the default prompt text
        #[arg(long)]
        message: Option<String>,

        /// Directory holding named caches cleared by a hard reload
        #[arg(long, default_value = ".rzd/caches")]
        cache_dir: PathBuf,

        /// Key/value file cleared by a hard reload
        #[arg(long, default_value = ".rzd/local-storage.json")]
        local_storage: PathBuf,
    },
}

pub async fn dispatch(cli: Cli, config: RzdConfig) -> Result<()> {
    let project = cli.project;

    // Build is the default when run as the package.json build script.
    match cli.command.unwrap_or(Commands::Build { adapter: None }) {
        Commands::Init => {
            init::init_project(&project)?;
            println!("Setup complete. Wrap your app with the version watcher, then run: npm run build");
        }
        Commands::Build { adapter } => {
            let mut config = config;
            if let Some(adapter) = adapter {
                config.adapter = adapter;
            }
            let report = tokio::task::spawn_blocking(move || build::build(&config, &project))
                .await
                .context("build worker join failed")??;
            println!(
                "Build {} ({}) published to {}",
                report.identity.version,
                report.identity.build_id,
                report.manifest_path.display()
            );
        }
        Commands::Manifest { out } => {
            let out = out.unwrap_or_else(|| {
                project.join(build::adapter_for(config.adapter).output_dir(&config))
            });
            let identity = generate_identity(&project, Utc::now());
            let path = write_manifest(&out, &identity)?;
            println!("Wrote {} (buildId {})", path.display(), identity.build_id);
        }
        Commands::Watch {
            url,
            current,
            interval,
            banner,
            message,
            cache_dir,
            local_storage,
        } => {
            watch::watch(WatchSettings {
                origin: url,
                endpoint: config.version_endpoint.clone(),
                interval: Duration::from_millis(interval.unwrap_or(config.check_interval)),
                current_manifest: current,
                cache_dir: project.join(cache_dir),
                local_storage: project.join(local_storage),
                banner,
                message,
            })
            .await?;
        }
    }

    Ok(())
}
