// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Job repository.

use rusqlite::named_params;
use rusqlite::types::Value;
use tracing::debug;
use uuid::Uuid;

use crate::connection::AssetDb;
use crate::error::{Error, Result};
use crate::filter::{JobFilter, LikeType};
use crate::query::{Query, text};
use crate::statements::StatementId;
use crate::types::{INVALID_ID, JobEntry};

impl AssetDb {
    /// The largest job run key in the store, or 0 when there are no jobs.
    ///
    /// Schedulers allocate the key for a new build pass as this value plus one.
    pub fn get_highest_job_run_key(&self) -> Result<i64> {
        let highest = self.fetch_one(StatementId::GetHighestJobRunKey, &[], |row| {
            row.get::<_, Option<i64>>(0)
        })?;
        Ok(highest.flatten().unwrap_or(0))
    }

    pub fn get_job_by_id(&self, id: i64) -> Result<Option<JobEntry>> {
        self.fetch_one(
            StatementId::GetJobById,
            named_params! { ":jobID": id },
            JobEntry::from_row,
        )
    }

    /// Look up a job by its natural key.
    pub fn get_job_by_natural_key(
        &self,
        source_pk: i64,
        builder_guid: Uuid,
        job_key: &str,
        platform: &str,
    ) -> Result<Option<JobEntry>> {
        self.fetch_one(
            StatementId::GetJobByNaturalKey,
            named_params! {
                ":sourcePK": source_pk,
                ":builderGuid": builder_guid,
                ":jobKey": job_key,
                ":platform": platform,
            },
            JobEntry::from_row,
        )
    }

    /// The job that emitted a product.
    pub fn get_job_by_product_id(&self, product_id: i64) -> Result<Option<JobEntry>> {
        self.fetch_one(
            StatementId::GetJobByProductId,
            named_params! { ":productID": product_id },
            JobEntry::from_row,
        )
    }

    pub fn get_jobs(&self, filter: &JobFilter) -> Result<Query<'_, JobEntry>> {
        Ok(self
            .query(StatementId::GetJobs, Vec::new(), JobEntry::from_row)?
            .filtered(filter))
    }

    pub fn get_jobs_by_source_id(
        &self,
        source_id: i64,
        filter: &JobFilter,
    ) -> Result<Query<'_, JobEntry>> {
        Ok(self
            .query(
                StatementId::GetJobsBySourceId,
                vec![(":sourceID", Value::Integer(source_id))],
                JobEntry::from_row,
            )?
            .filtered(filter))
    }

    pub fn get_jobs_by_source_name(
        &self,
        source_name: &str,
        filter: &JobFilter,
    ) -> Result<Query<'_, JobEntry>> {
        Ok(self
            .query(
                StatementId::GetJobsBySourceName,
                vec![(":sourceName", text(source_name))],
                JobEntry::from_row,
            )?
            .filtered(filter))
    }

    pub fn get_jobs_like_source_name(
        &self,
        source_name: &str,
        like: LikeType,
        filter: &JobFilter,
    ) -> Result<Query<'_, JobEntry>> {
        Ok(self
            .query(
                StatementId::GetJobsLikeSourceName,
                vec![(":pattern", Value::Text(like.pattern(source_name)))],
                JobEntry::from_row,
            )?
            .filtered(filter))
    }

    pub fn get_jobs_by_product_name(
        &self,
        product_name: &str,
        filter: &JobFilter,
    ) -> Result<Query<'_, JobEntry>> {
        Ok(self
            .query(
                StatementId::GetJobsByProductName,
                vec![(":productName", text(product_name))],
                JobEntry::from_row,
            )?
            .filtered(filter))
    }

    pub fn get_jobs_like_product_name(
        &self,
        product_name: &str,
        like: LikeType,
        filter: &JobFilter,
    ) -> Result<Query<'_, JobEntry>> {
        Ok(self
            .query(
                StatementId::GetJobsLikeProductName,
                vec![(":pattern", Value::Text(like.pattern(product_name)))],
                JobEntry::from_row,
            )?
            .filtered(filter))
    }

    /// Every job that ran during one build pass.
    pub fn get_jobs_by_job_run_key(&self, job_run_key: i64) -> Result<Query<'_, JobEntry>> {
        self.query(
            StatementId::GetJobsByJobRunKey,
            vec![(":jobRunKey", Value::Integer(job_run_key))],
            JobEntry::from_row,
        )
    }

    /// Insert or update a job, deduplicating on
    /// `(source_pk, builder_guid, job_key, platform)`.
    ///
    /// Jobs without a positive `job_run_key` are rejected before the store
    /// is touched.
    pub fn set_job(&self, entry: &mut JobEntry) -> Result<i64> {
        if entry.job_run_key <= 0 {
            return Err(Error::InvalidArgument(format!(
                "job run key must be positive, got {}",
                entry.job_run_key
            )));
        }

        if entry.id == INVALID_ID {
            let existing = self.get_job_by_natural_key(
                entry.source_pk,
                entry.builder_guid,
                &entry.job_key,
                &entry.platform,
            )?;
            if let Some(existing) = existing {
                entry.id = existing.id;
                return self.set_job(entry).inspect_err(|_| entry.id = INVALID_ID);
            }
            self.execute(
                StatementId::InsertJob,
                named_params! {
                    ":sourcePK": entry.source_pk,
                    ":jobKey": entry.job_key,
                    ":fingerprint": entry.fingerprint,
                    ":platform": entry.platform,
                    ":builderGuid": entry.builder_guid,
                    ":status": entry.status,
                    ":jobRunKey": entry.job_run_key,
                    ":firstFailLogTime": entry.first_fail_log_time,
                    ":firstFailLogFile": entry.first_fail_log_file,
                    ":lastFailLogTime": entry.last_fail_log_time,
                    ":lastFailLogFile": entry.last_fail_log_file,
                    ":lastLogTime": entry.last_log_time,
                    ":lastLogFile": entry.last_log_file,
                },
            )?;
            entry.id = self.last_insert_id()?;
            debug!(
                id = entry.id,
                source_pk = entry.source_pk,
                job_key = %entry.job_key,
                platform = %entry.platform,
                "inserted job"
            );
            return Ok(entry.id);
        }

        let existing = self.get_job_by_id(entry.id)?.ok_or(Error::NotFound {
            entity: "Job",
            id: entry.id,
        })?;
        if existing == *entry {
            return Ok(entry.id);
        }
        self.execute(
            StatementId::UpdateJob,
            named_params! {
                ":jobID": entry.id,
                ":sourcePK": entry.source_pk,
                ":jobKey": entry.job_key,
                ":fingerprint": entry.fingerprint,
                ":platform": entry.platform,
                ":builderGuid": entry.builder_guid,
                ":status": entry.status,
                ":jobRunKey": entry.job_run_key,
                ":firstFailLogTime": entry.first_fail_log_time,
                ":firstFailLogFile": entry.first_fail_log_file,
                ":lastFailLogTime": entry.last_fail_log_time,
                ":lastFailLogFile": entry.last_fail_log_file,
                ":lastLogTime": entry.last_log_time,
                ":lastLogFile": entry.last_log_file,
            },
        )?;
        Ok(entry.id)
    }

    pub fn set_jobs(&self, entries: &mut [JobEntry]) -> Result<()> {
        for entry in entries {
            self.set_job(entry)?;
        }
        Ok(())
    }

    /// Delete a job together with its products.
    pub fn remove_job(&self, id: i64) -> Result<()> {
        self.in_transaction(|| {
            let removed = self.execute(StatementId::DeleteJob, named_params! { ":jobID": id })?;
            debug!(id, removed, "removed job");
            Ok(())
        })
    }

    pub fn remove_jobs(&self, entries: &mut [JobEntry]) -> Result<()> {
        for entry in entries {
            self.remove_job(entry.id)?;
            entry.id = INVALID_ID;
        }
        Ok(())
    }

    /// Delete the job that emitted `product_id`, and with it all of its products.
    pub fn remove_job_by_product_id(&self, product_id: i64) -> Result<()> {
        self.in_transaction(|| match self.get_job_by_product_id(product_id)? {
            Some(job) => self.remove_job(job.id),
            None => Ok(()),
        })
    }
}
