//! CLI definitions and command routing.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::{Settings, TrustPaths};
use crate::fs::HostFs;
use crate::platform::{HostEnv, NssTrust, Toolbox, TrustStore};

#[derive(Parser)]
#[command(name = "trust-cert")]
#[command(about = "Install, remove and check root certificates in system and Firefox trust stores")]
pub struct Cli {
    /// Log every command that is executed
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct StoreArgs {
    /// Store to use: darwin, win32, linux or nss (default: this host)
    #[arg(long)]
    pub target: Option<String>,
    /// Entry name for stores that key by name (default: issuer common name)
    #[arg(long)]
    pub name: Option<String>,
    /// Application name shown on the elevation prompt
    #[arg(long)]
    pub app_name: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a root certificate to the trust store
    Install {
        cert: PathBuf,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Remove a root certificate from the trust store
    Uninstall {
        cert: PathBuf,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Report whether a root certificate is trusted (exit code 0 either way)
    Check {
        cert: PathBuf,
        #[command(flatten)]
        store: StoreArgs,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the issuer common name of a certificate
    Identity { cert: PathBuf },
    /// List the Firefox profile databases that NSS operations touch
    Databases,
    /// Show configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
}

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Print path to config.toml
    Path,
    /// Print effective settings (file plus environment overrides)
    Show,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TRUST_CERT_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Run CLI and dispatch to handlers.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let paths = TrustPaths::default_paths();
    let settings = Settings::load(&paths)?;

    match cli.command {
        Commands::Install { cert, store } => {
            let backend = resolve(&store, &settings)?;
            block_on(backend.install(&cert, store.name.as_deref()))??;
            println!("Installed {} into {}", cert.display(), backend.name());
            Ok(())
        }
        Commands::Uninstall { cert, store } => {
            let backend = resolve(&store, &settings)?;
            block_on(backend.uninstall(&cert, store.name.as_deref()))??;
            println!("Removed {} from {}", cert.display(), backend.name());
            Ok(())
        }
        Commands::Check { cert, store, json } => {
            let backend = resolve(&store, &settings)?;
            let trusted = block_on(backend.exists(&cert, store.name.as_deref()))?;
            if json {
                let report = serde_json::json!({
                    "store": backend.name(),
                    "cert": cert.display().to_string(),
                    "trusted": trusted,
                });
                println!("{report}");
            } else {
                let status = if trusted { "trusted" } else { "not trusted" };
                println!("{}: {status} ({})", cert.display(), backend.name());
            }
            Ok(())
        }
        Commands::Identity { cert } => {
            let cn = crate::identity::read_common_name(&HostFs, &cert)?;
            println!("{cn}");
            Ok(())
        }
        Commands::Databases => {
            let nss = NssTrust::new(Toolbox::host(None), &HostEnv::detect(), &settings)?;
            for db in nss.get_firefox_databases()? {
                println!("{db}");
            }
            Ok(())
        }
        Commands::Config { cmd } => match cmd {
            ConfigCmd::Path => {
                println!("{}", paths.config_file.display());
                Ok(())
            }
            ConfigCmd::Show => {
                let s = toml::to_string_pretty(&settings).context("serialize settings")?;
                print!("{s}");
                Ok(())
            }
        },
    }
}

fn resolve(store: &StoreArgs, settings: &Settings) -> Result<Box<dyn TrustStore>> {
    let backend = crate::trust::resolve_backend_with_settings(
        store.target.as_deref(),
        store.app_name.as_deref(),
        settings,
    )?;
    Ok(backend)
}

fn block_on<F: std::future::Future>(fut: F) -> Result<F::Output> {
    let rt = tokio::runtime::Runtime::new()?;
    Ok(rt.block_on(fut))
}
