// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Source repository.

use rusqlite::named_params;
use rusqlite::types::Value;
use tracing::debug;
use uuid::Uuid;

use crate::connection::AssetDb;
use crate::error::{Error, Result};
use crate::filter::LikeType;
use crate::query::{Query, text};
use crate::statements::StatementId;
use crate::types::{INVALID_ID, SourceEntry};

impl AssetDb {
    pub fn get_source_by_id(&self, id: i64) -> Result<Option<SourceEntry>> {
        self.fetch_one(
            StatementId::GetSourceById,
            named_params! { ":sourceID": id },
            SourceEntry::from_row,
        )
    }

    /// Look up a source by its natural key.
    pub fn get_source_by_guid(&self, source_guid: Uuid) -> Result<Option<SourceEntry>> {
        self.fetch_one(
            StatementId::GetSourceByGuid,
            named_params! { ":sourceGuid": source_guid },
            SourceEntry::from_row,
        )
    }

    pub fn get_source_by_job_id(&self, job_id: i64) -> Result<Option<SourceEntry>> {
        self.fetch_one(
            StatementId::GetSourceByJobId,
            named_params! { ":jobID": job_id },
            SourceEntry::from_row,
        )
    }

    pub fn get_source_by_product_id(&self, product_id: i64) -> Result<Option<SourceEntry>> {
        self.fetch_one(
            StatementId::GetSourceByProductId,
            named_params! { ":productID": product_id },
            SourceEntry::from_row,
        )
    }

    /// The source called `source_name` inside one scan folder.
    pub fn get_source_by_name_in_scan_folder(
        &self,
        scan_folder_id: i64,
        source_name: &str,
    ) -> Result<Option<SourceEntry>> {
        self.fetch_one(
            StatementId::GetSourcesByNameInScanFolder,
            named_params! { ":scanFolderID": scan_folder_id, ":sourceName": source_name },
            SourceEntry::from_row,
        )
    }

    pub fn get_sources(&self) -> Result<Query<'_, SourceEntry>> {
        self.query(StatementId::GetSources, Vec::new(), SourceEntry::from_row)
    }

    pub fn get_sources_by_scan_folder_id(
        &self,
        scan_folder_id: i64,
    ) -> Result<Query<'_, SourceEntry>> {
        self.query(
            StatementId::GetSourcesByScanFolderId,
            vec![(":scanFolderID", Value::Integer(scan_folder_id))],
            SourceEntry::from_row,
        )
    }

    /// Sources whose name equals `source_name`, ignoring case, in any scan folder.
    pub fn get_sources_by_name(&self, source_name: &str) -> Result<Query<'_, SourceEntry>> {
        self.query(
            StatementId::GetSourcesByName,
            vec![(":sourceName", text(source_name))],
            SourceEntry::from_row,
        )
    }

    pub fn get_sources_like_name(
        &self,
        source_name: &str,
        like: LikeType,
    ) -> Result<Query<'_, SourceEntry>> {
        self.query(
            StatementId::GetSourcesLikeName,
            vec![(":pattern", Value::Text(like.pattern(source_name)))],
            SourceEntry::from_row,
        )
    }

    /// Sources that produced a product called `product_name`.
    pub fn get_sources_by_product_name(
        &self,
        product_name: &str,
    ) -> Result<Query<'_, SourceEntry>> {
        self.query(
            StatementId::GetSourcesByProductName,
            vec![(":productName", text(product_name))],
            SourceEntry::from_row,
        )
    }

    pub fn get_sources_like_product_name(
        &self,
        product_name: &str,
        like: LikeType,
    ) -> Result<Query<'_, SourceEntry>> {
        self.query(
            StatementId::GetSourcesLikeProductName,
            vec![(":pattern", Value::Text(like.pattern(product_name)))],
            SourceEntry::from_row,
        )
    }

    /// Insert or update a source, deduplicating on `source_guid`.
    ///
    /// A source keeps its row when it moves to another scan folder or is
    /// renamed, as long as the GUID is unchanged.
    pub fn set_source(&self, entry: &mut SourceEntry) -> Result<i64> {
        if entry.id == INVALID_ID {
            if let Some(existing) = self.get_source_by_guid(entry.source_guid)? {
                entry.id = existing.id;
                return self.set_source(entry).inspect_err(|_| entry.id = INVALID_ID);
            }
            self.execute(
                StatementId::InsertSource,
                named_params! {
                    ":scanFolderPK": entry.scan_folder_pk,
                    ":sourceName": entry.source_name,
                    ":sourceGuid": entry.source_guid,
                },
            )?;
            entry.id = self.last_insert_id()?;
            debug!(id = entry.id, source = %entry.source_name, "inserted source");
            return Ok(entry.id);
        }

        let existing = self.get_source_by_id(entry.id)?.ok_or(Error::NotFound {
            entity: "Source",
            id: entry.id,
        })?;
        if existing == *entry {
            return Ok(entry.id);
        }
        self.execute(
            StatementId::UpdateSource,
            named_params! {
                ":sourceID": entry.id,
                ":scanFolderPK": entry.scan_folder_pk,
                ":sourceName": entry.source_name,
                ":sourceGuid": entry.source_guid,
            },
        )?;
        Ok(entry.id)
    }

    pub fn set_sources(&self, entries: &mut [SourceEntry]) -> Result<()> {
        for entry in entries {
            self.set_source(entry)?;
        }
        Ok(())
    }

    /// Delete a source together with its jobs and their products.
    pub fn remove_source(&self, id: i64) -> Result<()> {
        self.in_transaction(|| {
            let removed = self.execute(StatementId::DeleteSource, named_params! { ":sourceID": id })?;
            debug!(id, removed, "removed source");
            Ok(())
        })
    }

    pub fn remove_sources(&self, entries: &mut [SourceEntry]) -> Result<()> {
        for entry in entries {
            self.remove_source(entry.id)?;
            entry.id = INVALID_ID;
        }
        Ok(())
    }

    /// Delete every source of a scan folder, keeping the folder itself.
    pub fn remove_sources_by_scan_folder_id(&self, scan_folder_id: i64) -> Result<()> {
        self.in_transaction(|| {
            let removed = self.execute(
                StatementId::DeleteSourcesByScanFolderId,
                named_params! { ":scanFolderID": scan_folder_id },
            )?;
            debug!(scan_folder_id, removed, "removed sources of scan folder");
            Ok(())
        })
    }
}
