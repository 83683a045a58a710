use indicatif::ProgressBar;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::catalog::list_databases;
use crate::config::settings::RestoreSettings;
use crate::drivers::Connection;
use crate::error::{Error, IoContext, Result};
use crate::storage;
use crate::utils::io::{copy_dir, ensure_dir};

/// Copy one archived database back under the live storage root.
///
/// `partitions/<db>` lands in `data/<db>` and `metadata/<db>` in
/// `metadata/<db>`. No ATTACH is issued; the returned table names are the
/// ones the operator still has to attach.
pub fn restore_database(conn: &dyn Connection, settings: &RestoreSettings, bar: &ProgressBar) -> Result<Vec<String>> {
    let db = settings.database.as_str();
    let archived_parts = storage::archive_partitions_dir(&settings.source_root, db);
    let archived_meta = storage::metadata_dir(&settings.source_root, db);

    if !archived_parts.is_dir() && !archived_meta.is_dir() {
        return Err(Error::DatabaseNotInArchive {
            database: db.to_string(),
            archive: settings.source_root.clone(),
        });
    }

    match storage::load_manifest(&settings.source_root)? {
        Some(manifest) => {
            info!(created_at = %manifest.created_at, host = %manifest.host, "restoring from archive");
            if manifest.database(db).is_none() {
                warn!("manifest has no entry for {db}, restoring whatever the archive holds");
            }
        }
        None => info!("archive has no manifest"),
    }

    match list_databases(conn) {
        Ok(live) if live.iter().any(|d| d.name == db) => {
            warn!("database {db} is attached on the server, restored files may clash with live parts");
        }
        Ok(_) => {}
        Err(err) => warn!("can't check live databases, {err}"),
    }

    let mut tables = Vec::new();
    if archived_parts.is_dir() {
        let live_data = storage::live_data_dir(&settings.destination_root, db);
        ensure_dir(&live_data)?;
        bar.set_message(format!("Restoring {db} data"));
        copy_dir(&archived_parts, &live_data, bar)?;
        tables = table_dirs(&archived_parts)?;
    }

    if archived_meta.is_dir() {
        let live_meta = storage::metadata_dir(&settings.destination_root, db);
        ensure_dir(&live_meta)?;
        bar.set_message(format!("Restoring {db} metadata"));
        copy_dir(&archived_meta, &live_meta, bar)?;
    }

    info!("restored {db} tables [{}], attach them on the server to bring them online", tables.join(", "));
    Ok(tables)
}

fn table_dirs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).at(dir)? {
        let entry = entry.at(dir)?;
        if entry.file_type().at(entry.path())?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::fake::FakeConnection;
    use crate::logging::capture::with_captured_logs;
    use serde_json::json;

    fn seed_archive(root: &Path) {
        let part = root.join("partitions/analytics/events/202401_1_1_0");
        fs::create_dir_all(&part).unwrap();
        fs::write(part.join("data.bin"), "payload").unwrap();
        fs::create_dir_all(root.join("partitions/analytics/visits")).unwrap();
        fs::create_dir_all(root.join("metadata/analytics")).unwrap();
        fs::write(root.join("metadata/analytics/events.sql"), "ATTACH TABLE events").unwrap();
    }

    fn settings(src: &Path, dst: &Path) -> RestoreSettings {
        RestoreSettings {
            database: "analytics".into(),
            source_root: src.to_path_buf(),
            destination_root: dst.to_path_buf(),
        }
    }

    #[test]
    fn copies_archive_back_into_live_layout() {
        let archive = tempfile::tempdir().unwrap();
        let live = tempfile::tempdir().unwrap();
        seed_archive(archive.path());
        let conn = FakeConnection::new();

        let tables = restore_database(&conn, &settings(archive.path(), live.path()), &ProgressBar::hidden()).unwrap();

        assert_eq!(tables, ["events", "visits"]);
        assert_eq!(
            fs::read_to_string(live.path().join("data/analytics/events/202401_1_1_0/data.bin")).unwrap(),
            "payload"
        );
        assert!(live.path().join("metadata/analytics/events.sql").is_file());
        assert!(conn.executed().is_empty());
    }

    #[test]
    fn unknown_database_is_an_error() {
        let archive = tempfile::tempdir().unwrap();
        let live = tempfile::tempdir().unwrap();
        let conn = FakeConnection::new();

        let err = restore_database(&conn, &settings(archive.path(), live.path()), &ProgressBar::hidden()).unwrap_err();

        assert!(matches!(err, Error::DatabaseNotInArchive { ref database, .. } if database == "analytics"));
        assert_eq!(fs::read_dir(live.path()).unwrap().count(), 0);
    }

    #[test]
    fn warns_when_database_is_live() {
        let archive = tempfile::tempdir().unwrap();
        let live = tempfile::tempdir().unwrap();
        seed_archive(archive.path());
        let conn = FakeConnection::new().respond("SHOW DATABASES", vec![json!({"name": "analytics"})]);

        let (result, logs) = with_captured_logs(|| {
            restore_database(&conn, &settings(archive.path(), live.path()), &ProgressBar::hidden())
        });

        assert!(result.is_ok());
        assert!(logs.contains("database analytics is attached on the server"));
    }

    #[test]
    fn live_database_check_failure_still_restores() {
        let archive = tempfile::tempdir().unwrap();
        let live = tempfile::tempdir().unwrap();
        seed_archive(archive.path());
        let conn = FakeConnection::new().fail_query("SHOW DATABASES", "ACCESS_DENIED");

        let (result, logs) = with_captured_logs(|| {
            restore_database(&conn, &settings(archive.path(), live.path()), &ProgressBar::hidden())
        });

        assert_eq!(result.unwrap(), ["events", "visits"]);
        assert!(live.path().join("data/analytics/events/202401_1_1_0/data.bin").is_file());
        assert!(live.path().join("metadata/analytics/events.sql").is_file());
        assert!(logs.contains("can't check live databases"));
    }

    #[test]
    fn metadata_only_archive_restores_metadata() {
        let archive = tempfile::tempdir().unwrap();
        let live = tempfile::tempdir().unwrap();
        fs::create_dir_all(archive.path().join("metadata/analytics")).unwrap();
        fs::write(archive.path().join("metadata/analytics/events.sql"), "ATTACH").unwrap();
        let conn = FakeConnection::new();

        let tables = restore_database(&conn, &settings(archive.path(), live.path()), &ProgressBar::hidden()).unwrap();

        assert!(tables.is_empty());
        assert!(live.path().join("metadata/analytics/events.sql").is_file());
        assert!(!live.path().join("data").exists());
    }
}
