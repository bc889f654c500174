// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Read-only job projections joined with their source and scan folder.

use rusqlite::named_params;
use rusqlite::types::Value;

use crate::connection::AssetDb;
use crate::error::Result;
use crate::filter::JobFilter;
use crate::query::{Query, text};
use crate::statements::StatementId;
use crate::types::JobInfo;

impl AssetDb {
    pub fn get_job_info_by_job_id(&self, job_id: i64) -> Result<Option<JobInfo>> {
        self.fetch_one(
            StatementId::GetJobInfoByJobId,
            named_params! { ":jobID": job_id },
            JobInfo::from_row,
        )
    }

    pub fn get_job_infos_by_job_key(&self, job_key: &str) -> Result<Query<'_, JobInfo>> {
        self.query(
            StatementId::GetJobInfoByJobKey,
            vec![(":jobKey", text(job_key))],
            JobInfo::from_row,
        )
    }

    pub fn get_job_infos_by_job_run_key(&self, job_run_key: i64) -> Result<Query<'_, JobInfo>> {
        self.query(
            StatementId::GetJobInfoByJobRunKey,
            vec![(":jobRunKey", Value::Integer(job_run_key))],
            JobInfo::from_row,
        )
    }

    pub fn get_job_infos_by_source_name(
        &self,
        source_name: &str,
        filter: &JobFilter,
    ) -> Result<Query<'_, JobInfo>> {
        Ok(self
            .query(
                StatementId::GetJobInfoBySourceName,
                vec![(":sourceName", text(source_name))],
                JobInfo::from_row,
            )?
            .filtered(filter))
    }
}
