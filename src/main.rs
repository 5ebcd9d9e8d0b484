use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use orgsentry::audit::sqlite::{query_recent, query_stats, SqliteAuditSink};
use orgsentry::audit::{export, AuditLogger};
use orgsentry::cli::{Cli, Commands};
use orgsentry::config::AppConfig;
use orgsentry::guard::GuardEngine;
use orgsentry::store::sqlite::{self, SqliteDirectory};
use orgsentry::web::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            cmd_serve(&cli.config).await?;
        }
        Commands::Status => {
            cmd_status(&cli.config)?;
        }
        Commands::Logs {
            tail,
            export,
            format,
        } => {
            cmd_logs(&cli.config, tail, export, &format)?;
        }
        Commands::Init => {
            cmd_init(&cli.config)?;
        }
    }

    Ok(())
}

async fn cmd_serve(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path);
    println!("OrgSentry starting...");
    println!("Config: {}", config_path.display());
    println!("Listen: {}", config.server.listen);
    println!("Fallback posture: {:?}", config.guard.fallback);

    let pool = sqlite::open_pool(Path::new(&config.audit.db_path))?;
    let store = SqliteDirectory::new(pool.clone());
    let sink = SqliteAuditSink::new(pool.clone())?;
    let audit = AuditLogger::spawn(Arc::new(sink));

    let engine = GuardEngine::new(Arc::new(store), audit)
        .with_lookup_timeout(Duration::from_millis(config.guard.lookup_timeout_ms))
        .with_session_policy(config.guard.session_policy());

    let state = Arc::new(AppState {
        engine: Arc::new(engine),
        fallback: config.guard.fallback,
        audit_db: Some(pool),
    });

    let addr = web::start(state, &config.server.listen).await?;
    println!("Verdict engine running on {}", addr);

    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");
    Ok(())
}

fn cmd_status(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path);
    let pool = sqlite::open_pool(Path::new(&config.audit.db_path))?;
    let conn = pool.get().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    orgsentry::audit::sqlite::init_db(&conn)?;
    let stats = query_stats(&conn)?;
    println!("Total evaluations: {}", stats.total);
    println!("  allowed:   {}", stats.allowed);
    println!("  blocked:   {}", stats.blocked);
    println!("  escalated: {}", stats.escalated);
    Ok(())
}

fn cmd_logs(config_path: &Path, tail: usize, do_export: bool, format: &str) -> anyhow::Result<()> {
    let config = load_config(config_path);
    let pool = sqlite::open_pool(Path::new(&config.audit.db_path))?;
    let conn = pool.get().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    orgsentry::audit::sqlite::init_db(&conn)?;

    if do_export {
        let out = match format {
            "csv" => export::export_csv(&conn)?,
            _ => export::export_json(&conn)?,
        };
        println!("{}", out);
        return Ok(());
    }

    let entries = query_recent(&conn, tail)?;
    for e in entries.iter().rev() {
        println!(
            "{} {:<8} {:<25} risk={:<8} {} {}",
            e.timestamp, e.verdict, e.reason, e.risk_level, e.email, e.detail
        );
    }
    Ok(())
}

fn cmd_init(config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
    } else {
        let default = AppConfig::default();
        std::fs::write(config_path, toml::to_string_pretty(&default)?)?;
        println!("Wrote default config to {}", config_path.display());
    }

    let config = load_config(config_path);
    let pool = sqlite::open_pool(Path::new(&config.audit.db_path))?;
    let conn = pool.get().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    orgsentry::audit::sqlite::init_db(&conn)?;
    println!("Database ready at {}", config.audit.db_path);
    Ok(())
}

/// Load config, falling back to defaults when the file is absent.
fn load_config(path: &Path) -> AppConfig {
    if path.exists() {
        match AppConfig::load_from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {} (using defaults)", path.display(), e);
                AppConfig::default()
            }
        }
    } else {
        AppConfig::default()
    }
}
