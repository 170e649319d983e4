//! Stoneyard operator binary
//!
//! Maintenance commands against the inventory database.
//!
//! ## Usage
//!
//! ```bash
//! stoneyard migrate
//! stoneyard seed
//! stoneyard status
//! stoneyard lock-state <qbid>
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use stoneyard_store::InventoryDb;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn print_usage() {
    eprintln!(
        r#"stoneyard - quarry inventory maintenance

USAGE:
    stoneyard <COMMAND>

COMMANDS:
    migrate               Create or upgrade the database schema
    seed                  Insert the demo fixture (material, QBID, blocks)
    status                Print per-table row counts
    lock-state <qbid>     Print the derived lock state of a QBID

OPTIONS:
    --help, -h            Show this help

DATABASE:
    The database file is taken from STONEYARD_DB_FILE, or built as
    <STONEYARD_DB_NAME>.db in the working directory (default: stoneyard.db).
"#
    );
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return ExitCode::FAILURE;
    }

    let result = match args[1].as_str() {
        "--help" | "-h" => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        "migrate" => cmd_migrate(),
        "seed" => cmd_seed(),
        "status" => cmd_status(),
        "lock-state" => match args.get(2) {
            Some(qbid) => cmd_lock_state(qbid),
            None => {
                eprintln!("Usage: stoneyard lock-state <qbid>");
                return ExitCode::FAILURE;
            }
        },
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Resolve the database path from the environment.
fn db_path() -> PathBuf {
    if let Ok(file) = env::var("STONEYARD_DB_FILE") {
        if !file.trim().is_empty() {
            return PathBuf::from(file);
        }
    }
    let name = env::var("STONEYARD_DB_NAME")
        .ok()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "stoneyard".to_string());
    if name.ends_with(".db") {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{name}.db"))
    }
}

fn open_db() -> Result<(PathBuf, InventoryDb)> {
    let path = db_path();
    tracing::info!("Opening inventory database at {}...", path.display());
    let db = InventoryDb::open(&path)
        .with_context(|| format!("opening database at {}", path.display()))?;
    Ok((path, db))
}

fn cmd_migrate() -> Result<()> {
    let (path, db) = open_db()?;
    println!(
        "{} is at schema version {}",
        path.display(),
        db.schema_version()?
    );
    Ok(())
}

fn cmd_seed() -> Result<()> {
    let (path, db) = open_db()?;
    db.seed_demo().context("seeding demo fixture")?;
    println!("seeded demo fixture into {}", path.display());
    Ok(())
}

fn cmd_status() -> Result<()> {
    let (path, db) = open_db()?;
    println!("{}", path.display());
    for (table, count) in db.table_counts()? {
        println!("  {table:<14} {count}");
    }
    Ok(())
}

fn cmd_lock_state(qbid: &str) -> Result<()> {
    let (_, db) = open_db()?;
    let state = db
        .lock_state(qbid)
        .with_context(|| format!("reading lock state of {qbid}"))?;
    println!(
        "{qbid}: {} (blocks: {}, slabs: {})",
        if state.locked { "LOCKED" } else { "OPEN" },
        state.has_blocks,
        state.has_slabs
    );
    Ok(())
}
