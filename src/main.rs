//! winpacman - demo CLI over the aggregator core.
//!
//! A thin binary that exercises `winpacman_api::WinpacmanApi`, in the
//! same spirit as the teacher's own `vx` binary delegating straight to
//! `vx_cli`: almost no logic here, just argument parsing, wiring up the
//! facade's dependencies, and printing what the facade streams back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tracing_subscriber::EnvFilter;

use winpacman_api::{FacadePaths, OperationStreamEvent, SyncPhase, WinpacmanApi};
use winpacman_cache::MetadataCache;
use winpacman_model::Manager;
use winpacman_provider::ProviderRegistry;
use winpacman_provider_cargo::CargoProvider;
use winpacman_provider_chocolatey::ChocolateyProvider;
use winpacman_provider_npm::NpmProvider;
use winpacman_provider_scoop::ScoopProvider;
use winpacman_provider_winget::WingetProvider;
use winpacman_state::{AppPaths, HistoryStore, WinpacmanConfig};

#[derive(Parser)]
#[command(name = "winpacman")]
#[command(about = "Unified view over winget, Chocolatey, Scoop, npm, and cargo")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Where the SQLite cache lives (defaults to a file under the data dir)
    #[arg(long, global = true)]
    cache_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full-text search the cache
    Search {
        query: String,
        #[arg(long)]
        manager: Option<Manager>,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// List everything in the cache
    List {
        #[arg(long)]
        manager: Option<Manager>,
    },

    /// List installed packages
    Installed {
        #[arg(long)]
        manager: Option<Manager>,
    },

    /// Refresh one provider's catalog, or all of them
    Refresh {
        #[arg(long)]
        manager: Option<Manager>,
        #[arg(long)]
        force: bool,
    },

    /// Rescan the Registry + Scoop installed inventory
    RescanInstalled,

    /// Install a package
    Install {
        package_id: String,
        manager: Manager,
        #[arg(long)]
        version: Option<String>,
    },

    /// Uninstall a package
    Uninstall { package_id: String, manager: Manager },

    /// Show per-provider catalog freshness
    Freshness,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Registers every ecosystem provider this spec names (spec §4.3).
/// Source locations (manifest clone root, bucket root) are taken as
/// conventional defaults here; a GUI wiring this facade up for real
/// would surface these as configuration instead. The NPM/Cargo keyword
/// seed lists come from the loaded config (Open Question (c)).
fn build_registry(manifests_root: &Path, config: &WinpacmanConfig) -> ProviderRegistry {
    let home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(WingetProvider::new(manifests_root.to_path_buf())));
    registry.register(Arc::new(ChocolateyProvider::new("https://community.chocolatey.org/api/v2")));
    registry.register(Arc::new(ScoopProvider::new(home.join("scoop").join("buckets"))));
    registry.register(Arc::new(
        NpmProvider::new("https://registry.npmjs.org").with_keywords(config.ecosystem_keywords.npm_keywords.clone()),
    ));
    registry.register(Arc::new(CargoProvider::new("https://index.crates.io", "https://crates.io/api/v1")));
    registry
}

async fn build_api(cache_path: Option<PathBuf>) -> anyhow::Result<WinpacmanApi> {
    let app_paths = AppPaths::discover().unwrap_or_else(|| AppPaths::new(std::env::temp_dir().join("winpacman")));
    app_paths.ensure_dirs()?;
    let config = WinpacmanConfig::load_or_default(&app_paths.config_file());

    let cache_path = cache_path.unwrap_or_else(|| app_paths.metadata_cache_db());
    let cache = MetadataCache::open(&cache_path).await?;
    let history = HistoryStore::new(app_paths.history_file());
    let home = dirs::home_dir().unwrap_or_else(std::env::temp_dir);
    let paths = FacadePaths {
        scoop_apps_dir: home.join("scoop").join("apps"),
        winget_installed_db: PathBuf::from(
            r"C:\Users\Default\AppData\Local\Packages\Microsoft.DesktopAppInstaller_8wekyb3d8bbwe\LocalState\installed.db",
        ),
        chocolatey_lib_dir: PathBuf::from(r"C:\ProgramData\chocolatey\lib"),
    };
    let manifests_root = app_paths.cache_dir().join("winget-manifests");
    let registry = build_registry(&manifests_root, &config);

    Ok(WinpacmanApi::new(cache, registry, history, paths))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let api = build_api(cli.cache_path).await?;

    match cli.command {
        Commands::Search { query, manager, limit } => {
            let records = api.search(&query, manager.map(|m| vec![m]), limit).await?;
            print_records(&records);
        }
        Commands::List { manager } => {
            let records = api.list_available(manager.map(|m| vec![m])).await?;
            print_records(&records);
        }
        Commands::Installed { manager } => {
            let records = api.list_installed(manager.map(|m| vec![m])).await?;
            print_records(&records);
        }
        Commands::Refresh { manager, force } => {
            let mut stream = api.refresh(manager, force).await?;
            while let Some(event) = stream.next().await {
                println!("[{:?}] {:?} {}", event.provider, event.phase, event.message.unwrap_or_default());
            }
        }
        Commands::RescanInstalled => {
            let mut stream = api.refresh_installed();
            while let Some(event) = stream.next().await {
                println!("[installed] {:?} {}", event.phase, event.message.unwrap_or_default());
                if event.phase == SyncPhase::Done || event.phase == SyncPhase::Failed {
                    break;
                }
            }
        }
        Commands::Install { package_id, manager, version } => {
            run_operation(api.install(package_id, manager, version)).await;
        }
        Commands::Uninstall { package_id, manager } => {
            run_operation(api.uninstall(package_id, manager)).await;
        }
        Commands::Freshness => {
            for (manager, freshness) in api.get_freshness_summary().await? {
                println!("{manager}: {freshness:?}");
            }
        }
    }

    Ok(())
}

fn print_records(records: &[winpacman_model::PackageRecord]) {
    for record in records {
        println!("{:<10} {:<30} {:<12} {}", record.manager.as_str(), record.package_id, record.version.as_str(), record.name);
    }
}

async fn run_operation(mut stream: winpacman_api::OperationStream) {
    while let Some(event) = stream.next().await {
        match event {
            OperationStreamEvent::Progress(progress) => {
                println!("... {:?} {}", progress.phase, progress.line.unwrap_or_default());
            }
            OperationStreamEvent::Finished(Ok(result)) => {
                println!("done: {}", result.message);
            }
            OperationStreamEvent::Finished(Err(error)) => {
                eprintln!("failed: {error}");
            }
        }
    }
}
