use colored::*;
use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets::UTF8_FULL};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::catalog::{self, Database, PartitionDescriptor};
use crate::config::manifest::BackupManifest;
use crate::config::settings::{BackupSettings, RestoreSettings};
use crate::drivers::Connection;
use crate::error::{Error, Result};
use crate::freeze::{FreezeRequest, freeze_partitions};
use crate::restore::restore_database;
use crate::storage;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BackupSummary {
    pub databases: usize,
    pub frozen: usize,
    /// Databases whose listing or freeze failed.
    pub failed: Vec<String>,
    /// Partitions that would have been frozen, filled on dry runs only.
    pub planned: Vec<PartitionDescriptor>,
}

/// Back up every database (or the one named in `settings`).
///
/// Failures are scoped to a database: they are logged, recorded in the
/// summary, and the run moves on to the next database.
pub fn do_backup(
    conn: &dyn Connection,
    settings: &BackupSettings,
    host: &str,
    bar: &ProgressBar,
) -> Result<BackupSummary> {
    let databases = match &settings.database {
        Some(name) => vec![Database { name: name.clone() }],
        None => catalog::list_databases(conn).unwrap_or_else(|err| {
            error!("can't get database list, {err}");
            Vec::new()
        }),
    };

    let mut summary = BackupSummary { databases: databases.len(), ..Default::default() };
    let mut manifest = BackupManifest::new(host, &settings.source_root.display().to_string());

    for database in &databases {
        bar.set_message(format!("Listing partitions of {}", database.name));
        let partitions = match catalog::list_partitions(conn, &database.name) {
            Ok(partitions) => partitions,
            Err(err) => {
                error!("can't get partition list, {err}");
                summary.failed.push(database.name.clone());
                continue;
            }
        };

        if settings.dry_run {
            summary.planned.extend(partitions.iter().cloned());
        }

        let request = FreezeRequest {
            partitions,
            dry_run: settings.dry_run,
            source_root: settings.source_root.clone(),
            destination_root: settings.destination_root.clone(),
        };
        match freeze_partitions(conn, &request, bar) {
            Ok(frozen) => {
                summary.frozen += frozen.len();
                manifest.record(&frozen);
            }
            Err(err) => {
                error!("can't freeze partition, {err}");
                summary.failed.push(database.name.clone());
            }
        }
    }

    if settings.dry_run {
        print_plan(&summary.planned);
    } else {
        storage::save_manifest(&settings.destination_root, &manifest)?;
        info!(
            "froze {} partitions across {} databases into {}",
            summary.frozen,
            summary.databases,
            settings.destination_root.display()
        );
    }
    Ok(summary)
}

pub fn do_restore(conn: &dyn Connection, settings: &RestoreSettings, bar: &ProgressBar) -> Result<()> {
    let tables = restore_database(conn, settings, bar)?;
    println!(
        "{} {}",
        "✔".green().bold(),
        format!("Restored {} ({} tables)", settings.database, tables.len()).green()
    );
    Ok(())
}

fn print_plan(planned: &[PartitionDescriptor]) {
    if planned.is_empty() {
        println!("{} {}", "i".yellow().bold(), "No partitions found".yellow());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Database").add_attribute(Attribute::Bold),
            Cell::new("Table").add_attribute(Attribute::Bold),
            Cell::new("Partition").add_attribute(Attribute::Bold),
        ]);
    for p in planned {
        table.add_row(vec![Cell::new(&p.database), Cell::new(&p.table), Cell::new(&p.partition_id)]);
    }
    println!("{}", table);
}

pub fn create_progress_bar(prefix: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
    }
    bar.set_message(prefix.to_string());
    bar.enable_steady_tick(std::time::Duration::from_millis(80));
    bar
}

pub fn prompt_password(message: &str) -> Result<String> {
    rpassword::prompt_password(format!("{} {}", "?".cyan().bold(), message.cyan()))
        .map_err(|e| Error::Config(format!("can't read password: {e}")))
}
