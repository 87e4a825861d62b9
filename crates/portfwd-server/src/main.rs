//! portfwd — TCP port forwarder with a UI bridge.

use std::path::PathBuf;
use std::sync::Arc;

use portfwd_store::{SqliteStorage, StorageArea, CONFIG_KEY};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod background;
mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("PORTFWD_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

fn open_storage(config: &portfwd_core::PortfwdConfig) -> anyhow::Result<SqliteStorage> {
    SqliteStorage::open(&config.data_paths.storage)
        .map_err(|e| anyhow::anyhow!("Failed to open storage: {}", e))
}

fn print_help() {
    println!("portfwd — TCP port forwarder with a UI bridge");
    println!();
    println!("Usage: portfwd [command]");
    println!();
    println!("Commands:");
    println!("  (none) | serve           Start the forwarder and the UI server");
    println!("  get-config               Print the stored configuration");
    println!("  set-config <value>       Store a configuration (applied on next start)");
    println!("  help                     Show this help message");
}

/// A parsed command line. Only `Serve`, `GetConfig` and `SetConfig` touch the
/// data directory.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Serve,
    GetConfig,
    SetConfig(String),
    Help,
    MissingValue(&'static str),
    Unknown(String),
}

fn parse_command(args: &[String]) -> Command {
    match args.get(1).map(String::as_str) {
        None | Some("serve") => Command::Serve,
        Some("get-config") => Command::GetConfig,
        Some("set-config") => match args.get(2) {
            Some(value) => Command::SetConfig(value.clone()),
            None => Command::MissingValue("Usage: portfwd set-config <value>"),
        },
        Some("--help") | Some("-h") | Some("help") => Command::Help,
        Some(other) => Command::Unknown(other.to_string()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = match parse_command(&args) {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::MissingValue(usage) => {
            eprintln!("{}", usage);
            std::process::exit(1);
        }
        Command::Unknown(other) => {
            eprintln!("Unknown command: {}. Use 'portfwd help' for usage.", other);
            std::process::exit(1);
        }
        command => command,
    };

    let data_dir = resolve_data_dir();
    let config = portfwd_core::PortfwdConfig::from_env(&data_dir)?;

    match command {
        Command::GetConfig => {
            let storage = open_storage(&config)?;
            println!("{}", storage.get(CONFIG_KEY)?.unwrap_or_default());
            return Ok(());
        }
        Command::SetConfig(value) => {
            let storage = open_storage(&config)?;
            storage.set(CONFIG_KEY, &value)?;
            info!("Stored configuration ({} bytes)", value.len());
            return Ok(());
        }
        _ => {}
    }

    info!("Data directory: {}", data_dir.display());

    let storage: Arc<dyn StorageArea> = Arc::new(open_storage(&config)?);
    let addr = config.bind_addr();

    let state = Arc::new(AppState::new(config, storage));

    // Config watcher + bridge
    background::start_background_tasks(state.clone());

    let app = routes::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("portfwd UI server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    state.forwarder.shutdown().await;

    Ok(())
}
