// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Database schema definitions for the asset database.
//!
//! Every table and index is declared here together with the ordered list of
//! schema versions and the incremental steps known to upgrade between them.

/// Schema versions, oldest first. The discriminant is the stamped value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i64)]
pub enum SchemaVersion {
    Initial = 1,
    AddedOutputPrefixToScanFolders = 2,
    AddedJobKeyIndex = 3,
    AddedSourceGuidIndex = 4,
    AddedSourceDependencyTable = 5,
}

impl SchemaVersion {
    pub const ALL: [SchemaVersion; 5] = [
        SchemaVersion::Initial,
        SchemaVersion::AddedOutputPrefixToScanFolders,
        SchemaVersion::AddedJobKeyIndex,
        SchemaVersion::AddedSourceGuidIndex,
        SchemaVersion::AddedSourceDependencyTable,
    ];

    /// The version this build reads and writes.
    pub const fn current() -> Self {
        SchemaVersion::AddedSourceDependencyTable
    }

    pub fn from_stored(version: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|v| *v as i64 == version)
    }
}

/// Schema version stamped into new databases.
pub const SCHEMA_VERSION: i64 = SchemaVersion::current() as i64;

/// A named DDL statement.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ddl {
    pub(crate) name: &'static str,
    pub(crate) sql: &'static str,
}

/// DDL that moves a database stamped `from` to `to`.
pub(crate) struct UpgradeStep {
    pub(crate) from: SchemaVersion,
    pub(crate) to: SchemaVersion,
    pub(crate) statements: &'static [Ddl],
}

const CREATE_DBINFO_TABLE: Ddl = Ddl {
    name: "CreateDbInfoTable",
    sql: r#"
create table if not exists dbinfo (
    rowID   integer primary key,
    version integer not null
);
"#,
};

const CREATE_SCAN_FOLDERS_TABLE: Ddl = Ddl {
    name: "CreateScanFoldersTable",
    sql: r#"
create table if not exists ScanFolders (
    id           integer primary key autoincrement not null,
    path         text not null collate nocase,
    displayName  text not null collate nocase,
    portableKey  text unique not null collate nocase,
    outputPrefix text not null collate nocase,
    isRoot       integer not null
);
"#,
};

const CREATE_SOURCES_TABLE: Ddl = Ddl {
    name: "CreateSourcesTable",
    sql: r#"
create table if not exists Sources (
    id           integer primary key autoincrement not null,
    scanFolderPK integer not null,
    sourceName   text not null collate nocase,
    sourceGuid   blob unique not null,
    foreign key (scanFolderPK) references ScanFolders(id) on delete cascade
);
"#,
};

const CREATE_JOBS_TABLE: Ddl = Ddl {
    name: "CreateJobsTable",
    sql: r#"
create table if not exists Jobs (
    id               integer primary key autoincrement not null,
    sourcePK         integer not null,
    jobKey           text not null collate nocase,
    fingerprint      integer not null,
    platform         text not null collate nocase,
    builderGuid      blob not null,
    status           integer not null,
    jobRunKey        integer not null,
    firstFailLogTime integer not null,
    firstFailLogFile text collate nocase,
    lastFailLogTime  integer not null,
    lastFailLogFile  text collate nocase,
    lastLogTime      integer not null,
    lastLogFile      text collate nocase,
    foreign key (sourcePK) references Sources(id) on delete cascade
);
"#,
};

const CREATE_PRODUCTS_TABLE: Ddl = Ddl {
    name: "CreateProductsTable",
    sql: r#"
create table if not exists Products (
    id          integer primary key autoincrement not null,
    jobPK       integer not null,
    subID       integer not null,
    productName text not null collate nocase,
    assetType   blob not null,
    legacyGuid  blob not null,
    foreign key (jobPK) references Jobs(id) on delete cascade
);
"#,
};

const CREATE_SOURCE_DEPENDENCY_TABLE: Ddl = Ddl {
    name: "CreateSourceDependencyTable",
    sql: r#"
create table if not exists SourceDependency (
    id              integer primary key autoincrement not null,
    builderGuid     blob not null,
    source          text not null collate nocase,
    dependsOnSource text not null collate nocase
);
"#,
};

const CREATE_INDEX_JOBS_JOB_RUN_KEY: Ddl = Ddl {
    name: "CreateIndexJobsJobRunKey",
    sql: "create index if not exists IndexJobsJobRunKey on Jobs(jobRunKey);",
};

const CREATE_INDEX_JOBS_JOB_KEY: Ddl = Ddl {
    name: "CreateIndexJobsJobKey",
    sql: "create index if not exists IndexJobsJobKey on Jobs(jobKey);",
};

const CREATE_INDEX_JOBS_SOURCE: Ddl = Ddl {
    name: "CreateIndexJobsSource",
    sql: "create index if not exists IndexJobsSource on Jobs(sourcePK);",
};

const CREATE_INDEX_SOURCES_SCAN_FOLDER: Ddl = Ddl {
    name: "CreateIndexSourcesScanFolder",
    sql: "create index if not exists IndexSourcesScanFolder on Sources(scanFolderPK);",
};

const CREATE_INDEX_SOURCES_SCAN_FOLDER_NAME: Ddl = Ddl {
    name: "CreateIndexSourcesScanFolderName",
    sql: "create index if not exists IndexSourcesScanFolderName on Sources(scanFolderPK, sourceName);",
};

const CREATE_INDEX_SOURCES_NAME: Ddl = Ddl {
    name: "CreateIndexSourcesName",
    sql: "create index if not exists IndexSourcesName on Sources(sourceName);",
};

const CREATE_INDEX_SOURCES_GUID: Ddl = Ddl {
    name: "CreateIndexSourcesGuid",
    sql: "create index if not exists IndexSourcesGuid on Sources(sourceGuid);",
};

const CREATE_INDEX_PRODUCTS_JOB: Ddl = Ddl {
    name: "CreateIndexProductsJob",
    sql: "create index if not exists IndexProductsJob on Products(jobPK);",
};

const CREATE_INDEX_PRODUCTS_NAME: Ddl = Ddl {
    name: "CreateIndexProductsName",
    sql: "create index if not exists IndexProductsName on Products(productName);",
};

const CREATE_INDEX_DEPENDENCY_DEPENDS_ON: Ddl = Ddl {
    name: "CreateIndexSourceDependencyDependsOn",
    sql: "create index if not exists IndexSourceDependencyDependsOn on SourceDependency(dependsOnSource);",
};

const CREATE_INDEX_DEPENDENCY_BUILDER_SOURCE: Ddl = Ddl {
    name: "CreateIndexSourceDependencyBuilderSource",
    sql: "create index if not exists IndexSourceDependencyBuilderSource on SourceDependency(builderGuid, source);",
};

/// Full DDL for a current-version database, in dependency order.
pub(crate) const CREATE_STATEMENTS: &[Ddl] = &[
    CREATE_DBINFO_TABLE,
    CREATE_SCAN_FOLDERS_TABLE,
    CREATE_SOURCES_TABLE,
    CREATE_JOBS_TABLE,
    CREATE_PRODUCTS_TABLE,
    CREATE_SOURCE_DEPENDENCY_TABLE,
    CREATE_INDEX_JOBS_JOB_RUN_KEY,
    CREATE_INDEX_JOBS_JOB_KEY,
    CREATE_INDEX_JOBS_SOURCE,
    CREATE_INDEX_SOURCES_SCAN_FOLDER,
    CREATE_INDEX_SOURCES_SCAN_FOLDER_NAME,
    CREATE_INDEX_SOURCES_NAME,
    CREATE_INDEX_SOURCES_GUID,
    CREATE_INDEX_PRODUCTS_JOB,
    CREATE_INDEX_PRODUCTS_NAME,
    CREATE_INDEX_DEPENDENCY_DEPENDS_ON,
    CREATE_INDEX_DEPENDENCY_BUILDER_SOURCE,
];

/// Known incremental upgrades. Stored versions not reachable through this
/// chain are discarded and recreated.
pub(crate) const UPGRADE_STEPS: &[UpgradeStep] = &[
    UpgradeStep {
        from: SchemaVersion::AddedOutputPrefixToScanFolders,
        to: SchemaVersion::AddedJobKeyIndex,
        statements: &[CREATE_INDEX_JOBS_JOB_KEY],
    },
    UpgradeStep {
        from: SchemaVersion::AddedJobKeyIndex,
        to: SchemaVersion::AddedSourceGuidIndex,
        statements: &[
            CREATE_INDEX_SOURCES_GUID,
            CREATE_INDEX_SOURCES_SCAN_FOLDER_NAME,
        ],
    },
    UpgradeStep {
        from: SchemaVersion::AddedSourceGuidIndex,
        to: SchemaVersion::AddedSourceDependencyTable,
        statements: &[
            CREATE_SOURCE_DEPENDENCY_TABLE,
            CREATE_INDEX_DEPENDENCY_DEPENDS_ON,
            CREATE_INDEX_DEPENDENCY_BUILDER_SOURCE,
        ],
    },
];

/// Tables that must exist once a database is open.
pub const TABLES: &[&str] = &[
    "dbinfo",
    "ScanFolders",
    "Sources",
    "Jobs",
    "Products",
    "SourceDependency",
];

/// Indices that must exist once a database is open.
pub const INDICES: &[&str] = &[
    "IndexJobsJobRunKey",
    "IndexJobsJobKey",
    "IndexJobsSource",
    "IndexSourcesScanFolder",
    "IndexSourcesScanFolderName",
    "IndexSourcesName",
    "IndexSourcesGuid",
    "IndexProductsJob",
    "IndexProductsName",
    "IndexSourceDependencyDependsOn",
    "IndexSourceDependencyBuilderSource",
];

pub(crate) const QUERY_VERSION: &str = "select version from dbinfo where rowID = 1";

pub(crate) const SET_VERSION: &str =
    "insert or replace into dbinfo (rowID, version) values (1, :version)";

pub(crate) const HAS_SCHEMA_OBJECT: &str =
    "select count(*) from sqlite_master where type = :type and name = :name";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_ordered() {
        for pair in SchemaVersion::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0] as i64 + 1, pair[1] as i64);
        }
        assert_eq!(SCHEMA_VERSION, 5);
    }

    #[test]
    fn test_upgrade_chain_reaches_current() {
        let mut at = UPGRADE_STEPS[0].from;
        for step in UPGRADE_STEPS {
            assert_eq!(step.from, at);
            assert!(step.to > step.from);
            at = step.to;
        }
        assert_eq!(at, SchemaVersion::current());
    }

    #[test]
    fn test_every_declared_object_is_created() {
        let all_sql: String = CREATE_STATEMENTS.iter().map(|ddl| ddl.sql).collect();
        for table in TABLES {
            assert!(all_sql.contains(&format!("exists {table} (")), "{table}");
        }
        for index in INDICES {
            assert!(all_sql.contains(&format!("exists {index} on")), "{index}");
        }
    }
}
