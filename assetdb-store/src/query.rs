// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Statement execution and lazy enumeration over the statement registry.

use std::ops::ControlFlow;

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::connection::AssetDb;
use crate::error::{Result, StatementContext};
use crate::filter::JobFilter;
use crate::statements::StatementId;

type Decode<T> = fn(&Row<'_>) -> rusqlite::Result<T>;

/// A finite, restartable sequence of rows.
///
/// Nothing touches the database until the query is consumed, and every
/// consuming call re-executes the statement, so the same `Query` can be
/// walked several times and always reflects the current contents.
pub struct Query<'db, T> {
    conn: &'db Connection,
    id: StatementId,
    params: Vec<(&'static str, Value)>,
    decode: Decode<T>,
}

impl<'db, T> Query<'db, T> {
    pub(crate) fn new(
        conn: &'db Connection,
        id: StatementId,
        params: Vec<(&'static str, Value)>,
        decode: Decode<T>,
    ) -> Self {
        Self {
            conn,
            id,
            params,
            decode,
        }
    }

    /// Bind the compound job filter used by the statement.
    pub(crate) fn filtered(mut self, filter: &JobFilter) -> Self {
        self.params.extend(filter.params());
        self
    }

    /// Feed each row to `visit` until it breaks or the rows run out.
    ///
    /// Returns `true` when every row was visited and `false` when the
    /// visitor stopped early.
    pub fn for_each<F>(&self, mut visit: F) -> Result<bool>
    where
        F: FnMut(T) -> ControlFlow<()>,
    {
        let mut stmt = self.conn.prepare_cached(self.id.sql()).statement(self.id)?;
        let params: Vec<(&str, &dyn ToSql)> = self
            .params
            .iter()
            .map(|(name, value)| (*name, value as &dyn ToSql))
            .collect();
        let mut rows = stmt.query(params.as_slice()).statement(self.id)?;
        while let Some(row) = rows.next().statement(self.id)? {
            let item = (self.decode)(row).statement(self.id)?;
            if visit(item).is_break() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn collect_vec(&self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        self.for_each(|item| {
            items.push(item);
            ControlFlow::Continue(())
        })?;
        Ok(items)
    }

    /// The first row, if any; stops reading after it.
    pub fn first(&self) -> Result<Option<T>> {
        let mut found = None;
        self.for_each(|item| {
            found = Some(item);
            ControlFlow::Break(())
        })?;
        Ok(found)
    }

    pub fn count(&self) -> Result<usize> {
        let mut count = 0;
        self.for_each(|_| {
            count += 1;
            ControlFlow::Continue(())
        })?;
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.first()?.is_none())
    }
}

impl AssetDb {
    /// Build a lazy query over one of the registered statements.
    pub(crate) fn query<T>(
        &self,
        id: StatementId,
        params: Vec<(&'static str, Value)>,
        decode: Decode<T>,
    ) -> Result<Query<'_, T>> {
        Ok(Query::new(self.connection()?, id, params, decode))
    }

    /// Run a statement expected to yield at most one row.
    pub(crate) fn fetch_one<T>(
        &self,
        id: StatementId,
        params: &[(&str, &dyn ToSql)],
        decode: Decode<T>,
    ) -> Result<Option<T>> {
        let mut stmt = self
            .connection()?
            .prepare_cached(id.sql())
            .statement(id)?;
        stmt.query_row(params, decode).optional().statement(id)
    }

    /// Run a statement that returns no rows; yields the affected row count.
    pub(crate) fn execute(&self, id: StatementId, params: &[(&str, &dyn ToSql)]) -> Result<usize> {
        let mut stmt = self
            .connection()?
            .prepare_cached(id.sql())
            .statement(id)?;
        stmt.execute(params).statement(id)
    }

    /// Row id assigned by the most recent successful insert.
    pub(crate) fn last_insert_id(&self) -> Result<i64> {
        Ok(self.connection()?.last_insert_rowid())
    }

    pub(crate) fn count_rows(&self, id: StatementId) -> Result<u64> {
        let count = self.fetch_one(id, &[], |row| row.get::<_, i64>(0))?;
        Ok(count.unwrap_or(0).max(0) as u64)
    }
}

/// Text parameter for an owned query.
pub(crate) fn text(value: &str) -> Value {
    Value::Text(value.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScanFolderEntry;

    fn store_with_folders(keys: &[&str]) -> AssetDb {
        let db = AssetDb::open_memory().unwrap();
        for key in keys {
            let mut folder = ScanFolderEntry::new(format!("/{key}"), *key, *key, "", false);
            db.set_scan_folder(&mut folder).unwrap();
        }
        db
    }

    #[test]
    fn test_visitor_can_stop_early() {
        let db = store_with_folders(&["a", "b", "c"]);
        let query = db.get_scan_folders().unwrap();

        let mut seen = 0;
        let completed = query
            .for_each(|_| {
                seen += 1;
                if seen == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert!(!completed);
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_query_is_restartable() {
        let db = store_with_folders(&["a"]);
        let query = db.get_scan_folders().unwrap();
        assert_eq!(query.count().unwrap(), 1);
        assert_eq!(query.count().unwrap(), 1);

        let mut folder = ScanFolderEntry::new("/b", "b", "b", "", false);
        db.set_scan_folder(&mut folder).unwrap();
        assert_eq!(query.count().unwrap(), 2);
    }

    #[test]
    fn test_empty_query() {
        let db = store_with_folders(&[]);
        let query = db.get_scan_folders().unwrap();
        assert!(query.is_empty().unwrap());
        assert!(query.first().unwrap().is_none());
        assert!(query.for_each(|_| ControlFlow::Continue(())).unwrap());
    }
}
