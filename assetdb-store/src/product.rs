// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Product repository.

use rusqlite::{ToSql, named_params};
use rusqlite::types::Value;
use tracing::debug;
use uuid::Uuid;

use crate::connection::AssetDb;
use crate::error::{Error, Result};
use crate::filter::{JobFilter, LikeType};
use crate::query::{Query, text};
use crate::statements::StatementId;
use crate::types::{INVALID_ID, ProductEntry};

impl AssetDb {
    pub fn get_product_by_id(&self, id: i64) -> Result<Option<ProductEntry>> {
        self.fetch_one(
            StatementId::GetProductById,
            named_params! { ":productID": id },
            ProductEntry::from_row,
        )
    }

    /// Look up a product by its natural key.
    pub fn get_product_by_natural_key(
        &self,
        job_pk: i64,
        sub_id: u32,
        product_name: &str,
        asset_type: Uuid,
        legacy_guid: Uuid,
    ) -> Result<Option<ProductEntry>> {
        self.fetch_one(
            StatementId::GetProductByNaturalKey,
            named_params! {
                ":jobPK": job_pk,
                ":subID": sub_id,
                ":productName": product_name,
                ":assetType": asset_type,
                ":legacyGuid": legacy_guid,
            },
            ProductEntry::from_row,
        )
    }

    /// Products of every job matching `filter`.
    pub fn get_products(&self, filter: &JobFilter) -> Result<Query<'_, ProductEntry>> {
        Ok(self
            .query(StatementId::GetProducts, Vec::new(), ProductEntry::from_row)?
            .filtered(filter))
    }

    pub fn get_products_by_job_id(&self, job_id: i64) -> Result<Query<'_, ProductEntry>> {
        self.query(
            StatementId::GetProductsByJobId,
            vec![(":jobID", Value::Integer(job_id))],
            ProductEntry::from_row,
        )
    }

    pub fn get_products_by_source_id(
        &self,
        source_id: i64,
        filter: &JobFilter,
    ) -> Result<Query<'_, ProductEntry>> {
        Ok(self
            .query(
                StatementId::GetProductsBySourceId,
                vec![(":sourceID", Value::Integer(source_id))],
                ProductEntry::from_row,
            )?
            .filtered(filter))
    }

    pub fn get_products_by_name(
        &self,
        product_name: &str,
        filter: &JobFilter,
    ) -> Result<Query<'_, ProductEntry>> {
        Ok(self
            .query(
                StatementId::GetProductsByName,
                vec![(":productName", text(product_name))],
                ProductEntry::from_row,
            )?
            .filtered(filter))
    }

    pub fn get_products_like_name(
        &self,
        product_name: &str,
        like: LikeType,
        filter: &JobFilter,
    ) -> Result<Query<'_, ProductEntry>> {
        Ok(self
            .query(
                StatementId::GetProductsLikeName,
                vec![(":pattern", Value::Text(like.pattern(product_name)))],
                ProductEntry::from_row,
            )?
            .filtered(filter))
    }

    /// Products emitted for sources called `source_name`.
    pub fn get_products_by_source_name(
        &self,
        source_name: &str,
        filter: &JobFilter,
    ) -> Result<Query<'_, ProductEntry>> {
        Ok(self
            .query(
                StatementId::GetProductsBySourceName,
                vec![(":sourceName", text(source_name))],
                ProductEntry::from_row,
            )?
            .filtered(filter))
    }

    pub fn get_products_like_source_name(
        &self,
        source_name: &str,
        like: LikeType,
        filter: &JobFilter,
    ) -> Result<Query<'_, ProductEntry>> {
        Ok(self
            .query(
                StatementId::GetProductsLikeSourceName,
                vec![(":pattern", Value::Text(like.pattern(source_name)))],
                ProductEntry::from_row,
            )?
            .filtered(filter))
    }

    /// Insert or update a product, deduplicating on every field but `id`.
    pub fn set_product(&self, entry: &mut ProductEntry) -> Result<i64> {
        if entry.id == INVALID_ID {
            let existing = self.get_product_by_natural_key(
                entry.job_pk,
                entry.sub_id,
                &entry.product_name,
                entry.asset_type,
                entry.legacy_guid,
            )?;
            if let Some(existing) = existing {
                entry.id = existing.id;
                return self.set_product(entry).inspect_err(|_| entry.id = INVALID_ID);
            }
            self.execute(
                StatementId::InsertProduct,
                named_params! {
                    ":jobPK": entry.job_pk,
                    ":subID": entry.sub_id,
                    ":productName": entry.product_name,
                    ":assetType": entry.asset_type,
                    ":legacyGuid": entry.legacy_guid,
                },
            )?;
            entry.id = self.last_insert_id()?;
            debug!(id = entry.id, product = %entry.product_name, "inserted product");
            return Ok(entry.id);
        }

        let existing = self.get_product_by_id(entry.id)?.ok_or(Error::NotFound {
            entity: "Product",
            id: entry.id,
        })?;
        if existing == *entry {
            return Ok(entry.id);
        }
        self.execute(
            StatementId::UpdateProduct,
            named_params! {
                ":productID": entry.id,
                ":jobPK": entry.job_pk,
                ":subID": entry.sub_id,
                ":productName": entry.product_name,
                ":assetType": entry.asset_type,
                ":legacyGuid": entry.legacy_guid,
            },
        )?;
        Ok(entry.id)
    }

    pub fn set_products(&self, entries: &mut [ProductEntry]) -> Result<()> {
        for entry in entries {
            self.set_product(entry)?;
        }
        Ok(())
    }

    pub fn remove_product(&self, id: i64) -> Result<()> {
        self.in_transaction(|| {
            let removed =
                self.execute(StatementId::DeleteProduct, named_params! { ":productID": id })?;
            debug!(id, removed, "removed product");
            Ok(())
        })
    }

    pub fn remove_products(&self, entries: &mut [ProductEntry]) -> Result<()> {
        for entry in entries {
            self.remove_product(entry.id)?;
            entry.id = INVALID_ID;
        }
        Ok(())
    }

    pub fn remove_products_by_job_id(&self, job_id: i64) -> Result<()> {
        self.in_transaction(|| {
            let removed = self.execute(
                StatementId::DeleteProductsByJobId,
                named_params! { ":jobID": job_id },
            )?;
            debug!(job_id, removed, "removed products of job");
            Ok(())
        })
    }

    /// Delete the products of every job of `source_id` that matches `filter`.
    pub fn remove_products_by_source_id(&self, source_id: i64, filter: &JobFilter) -> Result<()> {
        let filter_params = filter.params();
        let mut params: Vec<(&str, &dyn ToSql)> = vec![(":sourceID", &source_id as &dyn ToSql)];
        params.extend(
            filter_params
                .iter()
                .map(|(name, value)| (*name, value as &dyn ToSql)),
        );
        self.in_transaction(|| {
            let removed = self.execute(StatementId::DeleteProductsBySourceId, &params)?;
            debug!(source_id, removed, "removed products of source");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JobEntry, JobStatus, ScanFolderEntry, SourceEntry};

    const BUILDER: Uuid = Uuid::from_u128(0xb1);
    const TEXTURE: Uuid = Uuid::from_u128(0x7e);

    struct Fixture {
        db: AssetDb,
        source_id: i64,
        pc_job: i64,
        android_job: i64,
    }

    fn fixture() -> Fixture {
        let db = AssetDb::open_memory().unwrap();
        let mut folder = ScanFolderEntry::new("/project", "project", "project", "", true);
        let folder_id = db.set_scan_folder(&mut folder).unwrap();
        let mut source = SourceEntry::new(folder_id, "rock.png", Uuid::from_u128(1));
        let source_id = db.set_source(&mut source).unwrap();
        let mut pc = JobEntry::new(source_id, "tex", "pc", BUILDER, 1);
        pc.status = JobStatus::Completed;
        let pc_job = db.set_job(&mut pc).unwrap();
        let mut android = JobEntry::new(source_id, "tex", "android", BUILDER, 1);
        let android_job = db.set_job(&mut android).unwrap();
        Fixture {
            db,
            source_id,
            pc_job,
            android_job,
        }
    }

    #[test]
    fn test_same_composite_is_a_no_op() {
        let f = fixture();
        let mut first = ProductEntry::new(f.pc_job, 0, "pc/rock.dds", TEXTURE);
        let mut again = first.clone();
        f.db.set_product(&mut first).unwrap();
        f.db.set_product(&mut again).unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(f.db.get_products_by_job_id(f.pc_job).unwrap().count().unwrap(), 1);
    }

    #[test]
    fn test_sub_id_distinguishes_products() {
        let f = fixture();
        let mut products = vec![
            ProductEntry::new(f.pc_job, 0, "pc/rock.dds", TEXTURE),
            ProductEntry::new(f.pc_job, 1, "pc/rock.dds", TEXTURE),
        ];
        f.db.set_products(&mut products).unwrap();
        assert_ne!(products[0].id, products[1].id);
    }

    #[test]
    fn test_remove_by_source_respects_filter() {
        let f = fixture();
        let mut products = vec![
            ProductEntry::new(f.pc_job, 0, "pc/rock.dds", TEXTURE),
            ProductEntry::new(f.android_job, 0, "android/rock.astc", TEXTURE),
        ];
        f.db.set_products(&mut products).unwrap();

        f.db.remove_products_by_source_id(f.source_id, &JobFilter::any().platform("pc"))
            .unwrap();
        let remaining = f
            .db
            .get_products_by_source_id(f.source_id, &JobFilter::any())
            .unwrap()
            .collect_vec()
            .unwrap();
        assert_eq!(remaining, vec![products[1].clone()]);

        f.db.remove_products_by_source_id(f.source_id, &JobFilter::any())
            .unwrap();
        assert!(f.db.get_products(&JobFilter::any()).unwrap().is_empty().unwrap());
        // jobs are untouched
        assert!(f.db.get_job_by_id(f.android_job).unwrap().is_some());
    }

    #[test]
    fn test_lookups_through_joins() {
        let f = fixture();
        let mut product = ProductEntry::new(f.pc_job, 0, "pc/rock.dds", TEXTURE);
        let id = f.db.set_product(&mut product).unwrap();

        assert_eq!(f.db.get_job_by_product_id(id).unwrap().unwrap().id, f.pc_job);
        assert_eq!(f.db.get_source_by_product_id(id).unwrap().unwrap().id, f.source_id);
        assert!(f.db.get_scan_folder_by_product_id(id).unwrap().is_some());

        let by_source = f
            .db
            .get_products_by_source_name("ROCK.png", &JobFilter::any().status(JobStatus::Completed))
            .unwrap();
        assert_eq!(by_source.count().unwrap(), 1);
        let like = f
            .db
            .get_products_like_name("rock", LikeType::Matches, &JobFilter::any())
            .unwrap();
        assert_eq!(like.count().unwrap(), 1);
        assert_eq!(
            f.db.get_sources_by_product_name("PC/ROCK.DDS")
                .unwrap()
                .count()
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_remove_job_by_product_id_cascades() {
        let f = fixture();
        let mut product = ProductEntry::new(f.pc_job, 0, "pc/rock.dds", TEXTURE);
        let id = f.db.set_product(&mut product).unwrap();

        f.db.remove_job_by_product_id(id).unwrap();
        assert!(f.db.get_job_by_id(f.pc_job).unwrap().is_none());
        assert!(f.db.get_product_by_id(id).unwrap().is_none());
    }
}
