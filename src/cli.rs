//! The `codex status` / `migrate` CLI subset (§6). Thin wiring over
//! `Repository`; the binary just parses arguments and prints JSON or a
//! one-line error, matching §7's "CLI prints a one-line error and exits
//! non-zero" contract.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::config::CodexConfig;
use crate::errors::CodexError;
use crate::repository::Repository;

#[derive(Parser)]
#[command(name = "codex", about = "codex-core status and maintenance CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print a status summary for the codex directory at `path`.
    Status {
        #[arg(default_value = ".codex")]
        path: PathBuf,
    },
    /// Back up the codex directory (and an adjacent database file, if any)
    /// into a timestamped zip, and report object counts.
    Migrate {
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        backup: bool,
        #[arg(default_value = ".codex")]
        path: PathBuf,
    },
}

/// Exit codes per §6: 0 success, 1 usage error, 2 runtime error. Usage
/// errors from `clap` itself exit 1 via clap's own handling; this enum
/// covers the runtime-error path.
pub async fn run(command: Command) -> Result<(), CodexError> {
    match command {
        Command::Status { path } => run_status(&path).await,
        Command::Migrate { dry_run, backup, path } => run_migrate(&path, dry_run, backup).await,
    }
}

async fn run_status(path: &Path) -> Result<(), CodexError> {
    let config = CodexConfig::new(path);
    let repo = Repository::new(&config);
    let count = repo.objects.list_objects("").await?.len();
    let body = json!({
        "objects_dir": config.objects_dir().to_string_lossy(),
        "objects_count": count,
        "checked_at": Utc::now(),
    });
    println!("{}", serde_json::to_string_pretty(&body).unwrap());
    Ok(())
}

async fn run_migrate(path: &Path, dry_run: bool, backup: bool) -> Result<(), CodexError> {
    let config = CodexConfig::new(path);
    let repo = Repository::new(&config);
    let count = repo.objects.list_objects("").await?.len();

    if backup && !dry_run {
        let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ");
        let backup_path = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!("codex-backup-{timestamp}.zip"));
        write_backup_zip(path, &backup_path).await?;
        println!("wrote backup to {}", backup_path.display());
    }

    let body = json!({
        "path": path.to_string_lossy(),
        "dry_run": dry_run,
        "backup": backup,
        "objects_count": count,
    });
    println!("{}", serde_json::to_string_pretty(&body).unwrap());
    Ok(())
}

async fn write_backup_zip(codex_dir: &Path, backup_path: &Path) -> Result<(), CodexError> {
    let file = std::fs::File::create(backup_path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    add_dir_to_zip(&mut zip, codex_dir, codex_dir, options)?;

    let db_path = codex_dir.parent().unwrap_or(codex_dir).join("app.db");
    if db_path.is_file() {
        let bytes = std::fs::read(&db_path)?;
        zip.start_file("app.db", options)
            .map_err(|e| CodexError::StorageError(format!("zip: {e}")))?;
        zip.write_all(&bytes)
            .map_err(|e| CodexError::StorageError(format!("zip: {e}")))?;
    }

    zip.finish().map_err(|e| CodexError::StorageError(format!("zip: {e}")))?;
    Ok(())
}

fn add_dir_to_zip<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    root: &Path,
    dir: &Path,
    options: SimpleFileOptions,
) -> Result<(), CodexError> {
    if !dir.is_dir() {
        return Ok(());
    }
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.path());
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            add_dir_to_zip(zip, root, &path, options)?;
        } else {
            let rel = path.strip_prefix(root).unwrap_or(&path);
            zip.start_file(rel.to_string_lossy(), options)
                .map_err(|e| CodexError::StorageError(format!("zip: {e}")))?;
            let bytes = std::fs::read(&path)?;
            zip.write_all(&bytes)
                .map_err(|e| CodexError::StorageError(format!("zip: {e}")))?;
        }
    }
    Ok(())
}
