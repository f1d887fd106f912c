use anyhow::{Context, Result, bail};
use hot_exit::cli::{Args, ConfigDiscovery, ExecutionMode, SessionSummary};
use hot_exit::session::{SessionStore, VersionedSession, migrate_session, needs_migration};
use hot_exit::HotExitConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `inspect --json` stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hot_exit=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut config = ConfigDiscovery::load(args.config.as_deref())?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = Some(data_dir);
    }

    match mode {
        ExecutionMode::Inspect { json } => run_inspect(&config, json).await,
        ExecutionMode::Migrate => run_migrate(&config).await,
        ExecutionMode::Clear => run_clear(&config).await,
        ExecutionMode::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            println!();
            println!("{}", config.to_toml_string()?);
            Ok(())
        }
        ExecutionMode::InitConfig => {
            let path = ConfigDiscovery::create_default_user_config()?;
            println!("Configuration file: {}", path.display());
            Ok(())
        }
    }
}

fn open_store(config: &HotExitConfig) -> SessionStore {
    SessionStore::new(config.resolve_data_dir()).with_backup(config.keep_backup)
}

async fn run_inspect(config: &HotExitConfig, json: bool) -> Result<()> {
    let store = open_store(config);
    let Some(session) = store.read_session().await? else {
        println!("No session snapshot at {}", store.session_path().display());
        return Ok(());
    };

    if json {
        let value = session
            .to_json_value()
            .context("Failed to serialize session")?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", store.session_path().display());
        println!(
            "{}",
            SessionSummary::from_session(&session, chrono::Utc::now().timestamp())
        );
    }
    Ok(())
}

async fn run_migrate(config: &HotExitConfig) -> Result<()> {
    let store = open_store(config);
    let Some(session) = store.read_session().await? else {
        println!("No session snapshot at {}", store.session_path().display());
        return Ok(());
    };

    if let VersionedSession::Unrecognized { version, .. } = session {
        bail!("Session version {} cannot be migrated by this build", version);
    }

    if !needs_migration(&session) {
        println!("Session is already at version {}", session.version());
        return Ok(());
    }

    let from = session.version();
    let migrated = migrate_session(session)?;
    store.write_session_atomic(&migrated).await?;

    info!("Migrated session from v{} to v{}", from, migrated.version);
    println!("Migrated session from v{} to v{}", from, migrated.version);
    Ok(())
}

async fn run_clear(config: &HotExitConfig) -> Result<()> {
    let store = open_store(config);
    store.delete_session().await?;
    println!("Session snapshot cleared");
    Ok(())
}
