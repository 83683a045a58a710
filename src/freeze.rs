use indicatif::ProgressBar;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::catalog::PartitionDescriptor;
use crate::drivers::Connection;
use crate::error::Result;
use crate::storage;
use crate::utils::io::{copy_dir, ensure_dir};

#[derive(Debug, Clone)]
pub struct FreezeRequest {
    pub partitions: Vec<PartitionDescriptor>,
    /// Log the statements instead of running them; nothing is copied.
    pub dry_run: bool,
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
}

/// Freeze each partition in order and copy the database's shadow data and
/// metadata into the archive.
///
/// Stops at the first failure. Partitions handled before it stay in the
/// archive, the rest are never attempted. Returns the partitions that were
/// frozen, which is empty for a dry run.
pub fn freeze_partitions(
    conn: &dyn Connection,
    request: &FreezeRequest,
    bar: &ProgressBar,
) -> Result<Vec<PartitionDescriptor>> {
    let mut frozen = Vec::new();

    for partition in &request.partitions {
        let statement = partition.freeze_statement();
        if request.dry_run {
            info!("{statement}");
            continue;
        }

        bar.set_message(format!("Freezing {}.{} {}", partition.database, partition.table, partition.partition_id));
        conn.execute(&statement)?;

        let db = partition.database.as_str();
        let partitions_out = storage::archive_partitions_dir(&request.destination_root, db);
        let metadata_out = storage::metadata_dir(&request.destination_root, db);
        ensure_dir(&partitions_out)?;
        ensure_dir(&metadata_out)?;

        let shadow = storage::shadow_data_dir(&request.source_root, db);
        debug!(from = %shadow.display(), to = %partitions_out.display(), "copying partition data");
        copy_dir(&shadow, &partitions_out, bar)?;

        let metadata = storage::metadata_dir(&request.source_root, db);
        debug!(from = %metadata.display(), to = %metadata_out.display(), "copying metadata");
        copy_dir(&metadata, &metadata_out, bar)?;

        frozen.push(partition.clone());
    }

    Ok(frozen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::fake::FakeConnection;
    use crate::error::Error;
    use crate::logging::capture::with_captured_logs;
    use std::fs;
    use std::path::Path;

    fn seed_live_root(root: &Path) {
        let part = root.join("shadow/1/data/analytics/events/202401_1_1_0");
        fs::create_dir_all(&part).unwrap();
        fs::write(part.join("data.bin"), b"\x01\x02\x03").unwrap();
        fs::create_dir_all(root.join("metadata/analytics")).unwrap();
        fs::write(root.join("metadata/analytics/events.sql"), "ATTACH TABLE events ...").unwrap();
    }

    fn request(src: &Path, dst: &Path, partitions: Vec<PartitionDescriptor>, dry_run: bool) -> FreezeRequest {
        FreezeRequest {
            partitions,
            dry_run,
            source_root: src.to_path_buf(),
            destination_root: dst.to_path_buf(),
        }
    }

    #[test]
    fn freezes_and_copies_one_partition() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        seed_live_root(src.path());
        let conn = FakeConnection::new();
        let parts = vec![PartitionDescriptor::new("analytics", "events", "202401")];

        let frozen =
            freeze_partitions(&conn, &request(src.path(), dst.path(), parts.clone(), false), &ProgressBar::hidden())
                .unwrap();

        assert_eq!(frozen, parts);
        assert_eq!(conn.executed(), ["ALTER TABLE analytics.events FREEZE PARTITION '202401';"]);
        assert!(dst.path().join("partitions/analytics").is_dir());
        assert!(dst.path().join("metadata/analytics").is_dir());
        assert_eq!(
            fs::read(dst.path().join("partitions/analytics/events/202401_1_1_0/data.bin")).unwrap(),
            b"\x01\x02\x03"
        );
        assert_eq!(
            fs::read_to_string(dst.path().join("metadata/analytics/events.sql")).unwrap(),
            "ATTACH TABLE events ..."
        );
    }

    #[test]
    fn second_partition_of_same_database_does_not_fail() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        seed_live_root(src.path());
        let conn = FakeConnection::new();
        let parts = vec![
            PartitionDescriptor::new("analytics", "events", "202401"),
            PartitionDescriptor::new("analytics", "events", "202402"),
        ];

        let frozen =
            freeze_partitions(&conn, &request(src.path(), dst.path(), parts, false), &ProgressBar::hidden()).unwrap();

        assert_eq!(frozen.len(), 2);
        assert_eq!(conn.executed().len(), 2);
    }

    #[test]
    fn dry_run_only_logs() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let conn = FakeConnection::new();
        let parts = vec![
            PartitionDescriptor::new("analytics", "events", "202401"),
            PartitionDescriptor::new("billing", "invoices", "2024"),
        ];

        let (result, logs) = with_captured_logs(|| {
            freeze_partitions(&conn, &request(src.path(), dst.path(), parts, true), &ProgressBar::hidden())
        });

        assert!(result.unwrap().is_empty());
        assert!(conn.executed().is_empty());
        assert!(logs.contains("ALTER TABLE analytics.events FREEZE PARTITION '202401';"));
        assert!(logs.contains("ALTER TABLE billing.invoices FREEZE PARTITION '2024';"));
        assert_eq!(fs::read_dir(src.path()).unwrap().count(), 0);
        assert_eq!(fs::read_dir(dst.path()).unwrap().count(), 0);
    }

    #[test]
    fn first_failure_stops_the_batch() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        seed_live_root(src.path());
        let conn = FakeConnection::new().fail_execute("gone");
        let parts = vec![
            PartitionDescriptor::new("analytics", "events", "202401"),
            PartitionDescriptor::new("analytics", "gone", "1"),
            PartitionDescriptor::new("analytics", "events", "202402"),
        ];

        let err = freeze_partitions(&conn, &request(src.path(), dst.path(), parts, false), &ProgressBar::hidden())
            .unwrap_err();

        assert!(matches!(err, Error::Server { code: 60, .. }));
        assert_eq!(conn.executed().len(), 2);
        assert!(dst.path().join("partitions/analytics/events/202401_1_1_0/data.bin").exists());
    }

    #[test]
    fn missing_shadow_directory_aborts() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let conn = FakeConnection::new();
        let parts = vec![
            PartitionDescriptor::new("analytics", "events", "202401"),
            PartitionDescriptor::new("analytics", "events", "202402"),
        ];

        let err = freeze_partitions(&conn, &request(src.path(), dst.path(), parts, false), &ProgressBar::hidden())
            .unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(conn.executed().len(), 1);
    }
}
