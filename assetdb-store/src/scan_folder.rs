// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Scan folder repository.

use rusqlite::named_params;
use tracing::debug;

use crate::connection::AssetDb;
use crate::error::{Error, Result};
use crate::query::Query;
use crate::statements::StatementId;
use crate::types::{INVALID_ID, ScanFolderEntry};

impl AssetDb {
    pub fn get_scan_folder_by_id(&self, id: i64) -> Result<Option<ScanFolderEntry>> {
        self.fetch_one(
            StatementId::GetScanFolderById,
            named_params! { ":scanFolderID": id },
            ScanFolderEntry::from_row,
        )
    }

    /// Look up a scan folder by its natural key.
    pub fn get_scan_folder_by_portable_key(
        &self,
        portable_key: &str,
    ) -> Result<Option<ScanFolderEntry>> {
        self.fetch_one(
            StatementId::GetScanFolderByPortableKey,
            named_params! { ":portableKey": portable_key },
            ScanFolderEntry::from_row,
        )
    }

    pub fn get_scan_folder_by_source_id(&self, source_id: i64) -> Result<Option<ScanFolderEntry>> {
        self.fetch_one(
            StatementId::GetScanFolderBySourceId,
            named_params! { ":sourceID": source_id },
            ScanFolderEntry::from_row,
        )
    }

    pub fn get_scan_folder_by_job_id(&self, job_id: i64) -> Result<Option<ScanFolderEntry>> {
        self.fetch_one(
            StatementId::GetScanFolderByJobId,
            named_params! { ":jobID": job_id },
            ScanFolderEntry::from_row,
        )
    }

    pub fn get_scan_folder_by_product_id(
        &self,
        product_id: i64,
    ) -> Result<Option<ScanFolderEntry>> {
        self.fetch_one(
            StatementId::GetScanFolderByProductId,
            named_params! { ":productID": product_id },
            ScanFolderEntry::from_row,
        )
    }

    pub fn get_scan_folders(&self) -> Result<Query<'_, ScanFolderEntry>> {
        self.query(StatementId::GetScanFolders, Vec::new(), ScanFolderEntry::from_row)
    }

    /// Insert or update a scan folder, deduplicating on `portable_key`.
    ///
    /// On return `entry.id` holds the row's identity.
    pub fn set_scan_folder(&self, entry: &mut ScanFolderEntry) -> Result<i64> {
        if entry.id == INVALID_ID {
            if let Some(existing) = self.get_scan_folder_by_portable_key(&entry.portable_key)? {
                entry.id = existing.id;
                return self.set_scan_folder(entry).inspect_err(|_| entry.id = INVALID_ID);
            }
            self.execute(
                StatementId::InsertScanFolder,
                named_params! {
                    ":path": entry.path,
                    ":displayName": entry.display_name,
                    ":portableKey": entry.portable_key,
                    ":outputPrefix": entry.output_prefix,
                    ":isRoot": entry.is_root,
                },
            )?;
            entry.id = self.last_insert_id()?;
            debug!(id = entry.id, portable_key = %entry.portable_key, "inserted scan folder");
            return Ok(entry.id);
        }

        let existing = self
            .get_scan_folder_by_id(entry.id)?
            .ok_or(Error::NotFound {
                entity: "ScanFolder",
                id: entry.id,
            })?;
        if existing == *entry {
            return Ok(entry.id);
        }
        self.execute(
            StatementId::UpdateScanFolder,
            named_params! {
                ":scanFolderID": entry.id,
                ":path": entry.path,
                ":displayName": entry.display_name,
                ":portableKey": entry.portable_key,
                ":outputPrefix": entry.output_prefix,
                ":isRoot": entry.is_root,
            },
        )?;
        Ok(entry.id)
    }

    /// Set each entry in turn, stopping at the first failure.
    pub fn set_scan_folders(&self, entries: &mut [ScanFolderEntry]) -> Result<()> {
        for entry in entries {
            self.set_scan_folder(entry)?;
        }
        Ok(())
    }

    /// Delete a scan folder together with its sources, their jobs and products.
    pub fn remove_scan_folder(&self, id: i64) -> Result<()> {
        self.in_transaction(|| {
            let removed = self.execute(
                StatementId::DeleteScanFolder,
                named_params! { ":scanFolderID": id },
            )?;
            debug!(id, removed, "removed scan folder");
            Ok(())
        })
    }

    /// Remove each entry and reset its id, stopping at the first failure.
    pub fn remove_scan_folders(&self, entries: &mut [ScanFolderEntry]) -> Result<()> {
        for entry in entries {
            self.remove_scan_folder(entry.id)?;
            entry.id = INVALID_ID;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn folder(key: &str) -> ScanFolderEntry {
        ScanFolderEntry::new(format!("C:/project/{key}"), key, key, "", false)
    }

    #[test]
    fn test_set_assigns_id_and_round_trips() {
        let db = AssetDb::open_memory().unwrap();
        let mut entry = folder("game");
        let id = db.set_scan_folder(&mut entry).unwrap();
        assert_ne!(id, INVALID_ID);
        assert_eq!(db.get_scan_folder_by_id(id).unwrap(), Some(entry));
    }

    #[test]
    fn test_portable_key_is_case_insensitive_natural_key() {
        let db = AssetDb::open_memory().unwrap();
        let mut first = folder("Game");
        db.set_scan_folder(&mut first).unwrap();

        let mut second = folder("GAME");
        second.display_name = "Renamed".into();
        db.set_scan_folder(&mut second).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(db.get_scan_folders().unwrap().count().unwrap(), 1);
        let stored = db.get_scan_folder_by_id(first.id).unwrap().unwrap();
        assert_eq!(stored.display_name, "Renamed");
    }

    #[test]
    fn test_stale_id_is_not_found() {
        let db = AssetDb::open_memory().unwrap();
        let mut entry = folder("game");
        entry.id = 42;
        let err = db.set_scan_folder(&mut entry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_bulk_remove_resets_ids() {
        let db = AssetDb::open_memory().unwrap();
        let mut entries = vec![folder("a"), folder("b")];
        db.set_scan_folders(&mut entries).unwrap();
        assert!(entries.iter().all(|e| e.id != INVALID_ID));

        db.remove_scan_folders(&mut entries).unwrap();
        assert!(entries.iter().all(|e| e.id == INVALID_ID));
        assert!(db.get_scan_folders().unwrap().is_empty().unwrap());
    }
}
