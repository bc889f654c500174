// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Source file dependency repository.
//!
//! Dependencies are edges between source paths declared by builders. They
//! are not owned by any other entity, and are queried in both directions:
//! [`AssetDb::get_depends_on`] answers "what does this file need" and
//! [`AssetDb::get_dependents`] answers "what must be rebuilt when this file
//! changes".

use rusqlite::named_params;
use tracing::debug;
use uuid::Uuid;

use crate::connection::AssetDb;
use crate::error::{Error, Result};
use crate::filter::guid_value;
use crate::query::{Query, text};
use crate::statements::StatementId;
use crate::types::{INVALID_ID, SourceFileDependencyEntry};

impl AssetDb {
    pub fn get_source_dependency_by_id(
        &self,
        id: i64,
    ) -> Result<Option<SourceFileDependencyEntry>> {
        self.fetch_one(
            StatementId::GetSourceDependencyById,
            named_params! { ":sourceDependencyID": id },
            SourceFileDependencyEntry::from_row,
        )
    }

    pub fn get_source_dependency_by_natural_key(
        &self,
        builder_guid: Uuid,
        source: &str,
        depends_on_source: &str,
    ) -> Result<Option<SourceFileDependencyEntry>> {
        self.fetch_one(
            StatementId::GetSourceDependencyByNaturalKey,
            named_params! {
                ":builderGuid": builder_guid,
                ":source": source,
                ":dependsOnSource": depends_on_source,
            },
            SourceFileDependencyEntry::from_row,
        )
    }

    /// Dependencies declared for `source`, optionally only by one builder.
    pub fn get_depends_on(
        &self,
        source: &str,
        builder_guid: Option<Uuid>,
    ) -> Result<Query<'_, SourceFileDependencyEntry>> {
        self.query(
            StatementId::GetSourceDependenciesBySource,
            vec![
                (":source", text(source)),
                (":builderGuid", guid_value(builder_guid)),
            ],
            SourceFileDependencyEntry::from_row,
        )
    }

    /// Dependencies that point at `depends_on_source`.
    pub fn get_dependents(
        &self,
        depends_on_source: &str,
    ) -> Result<Query<'_, SourceFileDependencyEntry>> {
        self.query(
            StatementId::GetSourceDependenciesByDependsOnSource,
            vec![(":dependsOnSource", text(depends_on_source))],
            SourceFileDependencyEntry::from_row,
        )
    }

    /// Insert or update a dependency, deduplicating on
    /// `(builder_guid, source, depends_on_source)`.
    pub fn set_source_dependency(&self, entry: &mut SourceFileDependencyEntry) -> Result<i64> {
        if entry.id == INVALID_ID {
            let existing = self.get_source_dependency_by_natural_key(
                entry.builder_guid,
                &entry.source,
                &entry.depends_on_source,
            )?;
            if let Some(existing) = existing {
                entry.id = existing.id;
                return self.set_source_dependency(entry).inspect_err(|_| entry.id = INVALID_ID);
            }
            self.execute(
                StatementId::InsertSourceDependency,
                named_params! {
                    ":builderGuid": entry.builder_guid,
                    ":source": entry.source,
                    ":dependsOnSource": entry.depends_on_source,
                },
            )?;
            entry.id = self.last_insert_id()?;
            debug!(
                id = entry.id,
                source = %entry.source,
                depends_on = %entry.depends_on_source,
                "inserted source dependency"
            );
            return Ok(entry.id);
        }

        let existing = self
            .get_source_dependency_by_id(entry.id)?
            .ok_or(Error::NotFound {
                entity: "SourceFileDependency",
                id: entry.id,
            })?;
        if existing == *entry {
            return Ok(entry.id);
        }
        self.execute(
            StatementId::UpdateSourceDependency,
            named_params! {
                ":sourceDependencyID": entry.id,
                ":builderGuid": entry.builder_guid,
                ":source": entry.source,
                ":dependsOnSource": entry.depends_on_source,
            },
        )?;
        Ok(entry.id)
    }

    pub fn set_source_dependencies(&self, entries: &mut [SourceFileDependencyEntry]) -> Result<()> {
        for entry in entries {
            self.set_source_dependency(entry)?;
        }
        Ok(())
    }

    pub fn remove_source_dependency(&self, id: i64) -> Result<()> {
        self.in_transaction(|| {
            let removed = self.execute(
                StatementId::DeleteSourceDependency,
                named_params! { ":sourceDependencyID": id },
            )?;
            debug!(id, removed, "removed source dependency");
            Ok(())
        })
    }

    /// Remove the row `entry` describes and reset its id.
    ///
    /// An entry without an id is matched by its natural key; if no such row
    /// exists nothing happens.
    pub fn remove_source_dependency_entry(
        &self,
        entry: &mut SourceFileDependencyEntry,
    ) -> Result<()> {
        let id = if entry.id == INVALID_ID {
            match self.get_source_dependency_by_natural_key(
                entry.builder_guid,
                &entry.source,
                &entry.depends_on_source,
            )? {
                Some(existing) => existing.id,
                None => return Ok(()),
            }
        } else {
            entry.id
        };
        self.remove_source_dependency(id)?;
        entry.id = INVALID_ID;
        Ok(())
    }

    pub fn remove_source_dependencies(
        &self,
        entries: &mut [SourceFileDependencyEntry],
    ) -> Result<()> {
        for entry in entries {
            self.remove_source_dependency_entry(entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILDER: Uuid = Uuid::from_u128(0xb1);
    const OTHER_BUILDER: Uuid = Uuid::from_u128(0xb2);

    fn sources(query: Query<'_, SourceFileDependencyEntry>) -> Vec<(String, String)> {
        let mut edges: Vec<_> = query
            .collect_vec()
            .unwrap()
            .into_iter()
            .map(|d| (d.source, d.depends_on_source))
            .collect();
        edges.sort();
        edges
    }

    #[test]
    fn test_direction_matters() {
        let db = AssetDb::open_memory().unwrap();
        let mut edge = SourceFileDependencyEntry::new(BUILDER, "A.fbx", "tex.png");
        db.set_source_dependency(&mut edge).unwrap();

        let expected = vec![("A.fbx".to_owned(), "tex.png".to_owned())];
        assert_eq!(sources(db.get_depends_on("a.FBX", None).unwrap()), expected);
        assert_eq!(sources(db.get_dependents("TEX.png").unwrap()), expected);

        assert!(db.get_depends_on("tex.png", None).unwrap().is_empty().unwrap());
        assert!(db.get_dependents("A.fbx").unwrap().is_empty().unwrap());
    }

    #[test]
    fn test_builder_narrows_forward_lookup() {
        let db = AssetDb::open_memory().unwrap();
        let mut edges = vec![
            SourceFileDependencyEntry::new(BUILDER, "a.fbx", "x.png"),
            SourceFileDependencyEntry::new(OTHER_BUILDER, "a.fbx", "y.png"),
        ];
        db.set_source_dependencies(&mut edges).unwrap();

        assert_eq!(db.get_depends_on("a.fbx", None).unwrap().count().unwrap(), 2);
        let only = sources(db.get_depends_on("a.fbx", Some(OTHER_BUILDER)).unwrap());
        assert_eq!(only, vec![("a.fbx".to_owned(), "y.png".to_owned())]);
    }

    #[test]
    fn test_duplicate_edge_is_deduplicated() {
        let db = AssetDb::open_memory().unwrap();
        let mut first = SourceFileDependencyEntry::new(BUILDER, "a.fbx", "x.png");
        let mut second = SourceFileDependencyEntry::new(BUILDER, "A.FBX", "X.PNG");
        db.set_source_dependency(&mut first).unwrap();
        db.set_source_dependency(&mut second).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(db.statistics().unwrap().source_dependencies, 1);
    }

    #[test]
    fn test_remove_by_natural_key() {
        let db = AssetDb::open_memory().unwrap();
        let mut stored = SourceFileDependencyEntry::new(BUILDER, "a.fbx", "x.png");
        db.set_source_dependency(&mut stored).unwrap();

        let mut unknown = SourceFileDependencyEntry::new(BUILDER, "a.fbx", "missing.png");
        db.remove_source_dependency_entry(&mut unknown).unwrap();
        assert_eq!(db.statistics().unwrap().source_dependencies, 1);

        let mut by_key = SourceFileDependencyEntry::new(BUILDER, "a.fbx", "x.png");
        db.remove_source_dependency_entry(&mut by_key).unwrap();
        assert_eq!(db.statistics().unwrap().source_dependencies, 0);
        assert!(db.get_source_dependency_by_id(stored.id).unwrap().is_none());
    }
}
