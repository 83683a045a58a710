use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::catalog::PartitionDescriptor;

/// Summary written next to the archive after a backup run.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct BackupManifest {
    pub created_at: DateTime<Local>,
    pub host: String,
    pub source_root: String,
    pub databases: Vec<DatabaseEntry>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DatabaseEntry {
    pub name: String,
    pub partitions: Vec<PartitionEntry>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PartitionEntry {
    pub table: String,
    pub partition: String,
}

impl BackupManifest {
    pub fn new(host: &str, source_root: &str) -> Self {
        Self {
            created_at: Local::now(),
            host: host.to_string(),
            source_root: source_root.to_string(),
            databases: Vec::new(),
        }
    }

    /// Record frozen partitions, grouping them under their database in
    /// first-seen order.
    pub fn record(&mut self, frozen: &[PartitionDescriptor]) {
        for part in frozen {
            let idx = match self.databases.iter().position(|d| d.name == part.database) {
                Some(idx) => idx,
                None => {
                    self.databases.push(DatabaseEntry { name: part.database.clone(), partitions: Vec::new() });
                    self.databases.len() - 1
                }
            };
            self.databases[idx].partitions.push(PartitionEntry {
                table: part.table.clone(),
                partition: part.partition_id.clone(),
            });
        }
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseEntry> {
        self.databases.iter().find(|d| d.name == name)
    }
}
