// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Name patterns and compound job filters shared by the repositories.

use rusqlite::types::Value;
use uuid::Uuid;

use crate::types::JobStatus;

/// How a name pattern is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeType {
    /// `name%`
    StartsWith,
    /// `%name`
    EndsWith,
    /// `%name%`
    Matches,
}

impl LikeType {
    /// Build the LIKE operand for `text`, escaping SQL wildcards in it.
    ///
    /// The statements using the result declare `ESCAPE '\'`.
    pub fn pattern(self, text: &str) -> String {
        let mut escaped = String::with_capacity(text.len() + 2);
        if matches!(self, LikeType::EndsWith | LikeType::Matches) {
            escaped.push('%');
        }
        for c in text.chars() {
            if matches!(c, '\\' | '%' | '_') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        if matches!(self, LikeType::StartsWith | LikeType::Matches) {
            escaped.push('%');
        }
        escaped
    }
}

/// Optional restrictions on the jobs a query considers.
///
/// Every unset field matches anything; set fields combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub builder_guid: Option<Uuid>,
    pub job_key: Option<String>,
    pub platform: Option<String>,
    pub status: Option<JobStatus>,
}

impl JobFilter {
    /// A filter that matches every job.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn builder(mut self, builder_guid: Uuid) -> Self {
        self.builder_guid = Some(builder_guid);
        self
    }

    pub fn job_key(mut self, job_key: impl Into<String>) -> Self {
        self.job_key = Some(job_key.into());
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_any(&self) -> bool {
        *self == Self::default()
    }

    /// Named parameters consumed by the `job_filter!` SQL fragment.
    pub(crate) fn params(&self) -> [(&'static str, Value); 4] {
        [
            (":builderGuid", guid_value(self.builder_guid)),
            (":jobKey", Value::from(self.job_key.clone())),
            (":platform", Value::from(self.platform.clone())),
            (
                ":status",
                self.status
                    .map_or(Value::Null, |status| Value::Integer(status as i64)),
            ),
        ]
    }
}

/// Encode a GUID the same way the `uuid` column type does.
pub(crate) fn guid_value(guid: Option<Uuid>) -> Value {
    guid.map_or(Value::Null, |guid| Value::Blob(guid.as_bytes().to_vec()))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::prefix(LikeType::StartsWith, "foo/", "foo/%")]
    #[case::suffix(LikeType::EndsWith, "a.tif", "%a.tif")]
    #[case::contains(LikeType::Matches, "tex", "%tex%")]
    #[case::escapes_wildcards(LikeType::StartsWith, "50%_off\\", "50\\%\\_off\\\\%")]
    fn test_like_pattern(#[case] like: LikeType, #[case] text: &str, #[case] expected: &str) {
        assert_eq!(like.pattern(text), expected);
    }

    #[test]
    fn test_filter_builder() {
        let guid = Uuid::from_u128(7);
        let filter = JobFilter::any()
            .builder(guid)
            .platform("pc")
            .status(JobStatus::Completed);
        assert!(!filter.is_any());
        assert_eq!(filter.builder_guid, Some(guid));
        assert_eq!(filter.job_key, None);

        let params = filter.params();
        assert_eq!(params[1].1, Value::Null);
        assert_eq!(params[2].1, Value::Text("pc".into()));
        assert_eq!(params[3].1, Value::Integer(JobStatus::Completed as i64));
    }

    #[test]
    fn test_any_filter_binds_nulls() {
        assert!(JobFilter::any().is_any());
        for (_, value) in JobFilter::any().params() {
            assert_eq!(value, Value::Null);
        }
    }
}
