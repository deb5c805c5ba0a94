use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use medrelay_core::config::Config;
use medrelay_core::store::Store;

#[derive(Parser)]
#[command(
    name = "medrelay",
    about = "Physician messaging compliance service — filtered search and keyword classification",
    version,
    propagate_version = true
)]
struct Cli {
    /// SQLite database path (default: from medrelay.yaml, else medrelay.db)
    #[arg(long, global = true, env = "MEDRELAY_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Migrate,

    /// Load physicians, messages, and compliance policies from data files
    Load {
        /// Directory containing physicians.csv, messages.csv, and
        /// compliance_policies.json
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Classify a message against a compliance policy version
    #[command(disable_version_flag = true)]
    Classify {
        /// Message id to classify
        message_id: i64,

        /// Compliance policy version to classify against
        #[arg(long, default_value = "v1")]
        version: String,
    },

    /// Start the HTTP API server
    Serve {
        /// Port to listen on (default: from medrelay.yaml, else 8000)
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let result = run(cli);

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(Path::new("."))?;
    let db_path = cli.db.unwrap_or_else(|| config.db_path.clone());

    match cli.command {
        Commands::Migrate => run_migrate(&db_path),
        Commands::Load { data_dir } => {
            run_load(&db_path, &data_dir.unwrap_or_else(|| config.data_dir.clone()))
        }
        Commands::Classify {
            message_id,
            version,
        } => run_classify(&db_path, message_id, &version),
        Commands::Serve { port } => run_serve(db_path, port.unwrap_or(config.port)),
    }
}

fn run_migrate(db_path: &Path) -> anyhow::Result<()> {
    let store = Store::open(db_path)?;
    store.migrate()?;
    println!("migrated {}", db_path.display());
    Ok(())
}

fn run_load(db_path: &Path, data_dir: &Path) -> anyhow::Result<()> {
    let store = Store::open(db_path)?;
    store.migrate()?;
    medrelay_core::loader::load_data(&store, data_dir)?;
    println!("loaded data from {}", data_dir.display());
    Ok(())
}

fn run_classify(db_path: &Path, message_id: i64, version: &str) -> anyhow::Result<()> {
    let store = Store::open(db_path)?;
    let classification = medrelay_core::classifier::classify(&store, message_id, version)?;
    println!("{}", serde_json::to_string_pretty(&classification)?);
    Ok(())
}

fn run_serve(db_path: PathBuf, port: u16) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(medrelay_server::serve(db_path, port))
}
