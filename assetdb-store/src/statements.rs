// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! The prepared statements every repository operation goes through.
//!
//! Statements are identified by [`StatementId`], prepared once when the
//! database is opened and kept in the connection's statement cache. All
//! values are bound through named parameters.

macro_rules! scan_folder_columns {
    () => {
        "ScanFolders.id, ScanFolders.path, ScanFolders.displayName, ScanFolders.portableKey, \
         ScanFolders.outputPrefix, ScanFolders.isRoot"
    };
}

macro_rules! source_columns {
    () => {
        "Sources.id, Sources.scanFolderPK, Sources.sourceName, Sources.sourceGuid"
    };
}

macro_rules! job_columns {
    () => {
        "Jobs.id, Jobs.sourcePK, Jobs.jobKey, Jobs.fingerprint, Jobs.platform, Jobs.builderGuid, \
         Jobs.status, Jobs.jobRunKey, Jobs.firstFailLogTime, Jobs.firstFailLogFile, \
         Jobs.lastFailLogTime, Jobs.lastFailLogFile, Jobs.lastLogTime, Jobs.lastLogFile"
    };
}

macro_rules! product_columns {
    () => {
        "Products.id, Products.jobPK, Products.subID, Products.productName, Products.assetType, \
         Products.legacyGuid"
    };
}

macro_rules! dependency_columns {
    () => {
        "SourceDependency.id, SourceDependency.builderGuid, SourceDependency.source, \
         SourceDependency.dependsOnSource"
    };
}

/// Compound job filter; see [`crate::JobFilter`].
macro_rules! job_filter {
    () => {
        " (:builderGuid IS NULL OR Jobs.builderGuid = :builderGuid) \
         AND (:jobKey IS NULL OR Jobs.jobKey = :jobKey) \
         AND (:platform IS NULL OR Jobs.platform = :platform) \
         AND (:status IS NULL OR Jobs.status = :status)"
    };
}

macro_rules! statements {
    ($($name:ident => $sql:expr,)*) => {
        /// Identifies one prepared statement.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub(crate) enum StatementId {
            $($name,)*
        }

        impl StatementId {
            pub(crate) const ALL: &'static [StatementId] = &[$(StatementId::$name,)*];

            pub(crate) const fn name(self) -> &'static str {
                match self {
                    $(StatementId::$name => stringify!($name),)*
                }
            }

            pub(crate) const fn sql(self) -> &'static str {
                match self {
                    $(StatementId::$name => $sql,)*
                }
            }
        }
    };
}

statements! {
    // ScanFolders
    GetScanFolderById => concat!(
        "SELECT ", scan_folder_columns!(), " FROM ScanFolders WHERE ScanFolders.id = :scanFolderID"
    ),
    GetScanFolderByPortableKey => concat!(
        "SELECT ", scan_folder_columns!(),
        " FROM ScanFolders WHERE ScanFolders.portableKey = :portableKey"
    ),
    GetScanFolderBySourceId => concat!(
        "SELECT ", scan_folder_columns!(),
        " FROM ScanFolders JOIN Sources ON Sources.scanFolderPK = ScanFolders.id",
        " WHERE Sources.id = :sourceID"
    ),
    GetScanFolderByJobId => concat!(
        "SELECT ", scan_folder_columns!(),
        " FROM ScanFolders JOIN Sources ON Sources.scanFolderPK = ScanFolders.id",
        " JOIN Jobs ON Jobs.sourcePK = Sources.id WHERE Jobs.id = :jobID"
    ),
    GetScanFolderByProductId => concat!(
        "SELECT ", scan_folder_columns!(),
        " FROM ScanFolders JOIN Sources ON Sources.scanFolderPK = ScanFolders.id",
        " JOIN Jobs ON Jobs.sourcePK = Sources.id",
        " JOIN Products ON Products.jobPK = Jobs.id WHERE Products.id = :productID"
    ),
    GetScanFolders => concat!("SELECT ", scan_folder_columns!(), " FROM ScanFolders"),
    InsertScanFolder => "INSERT INTO ScanFolders (path, displayName, portableKey, outputPrefix, isRoot) \
         VALUES (:path, :displayName, :portableKey, :outputPrefix, :isRoot)",
    UpdateScanFolder => "UPDATE ScanFolders SET path = :path, displayName = :displayName, \
         portableKey = :portableKey, outputPrefix = :outputPrefix, isRoot = :isRoot \
         WHERE id = :scanFolderID",
    DeleteScanFolder => "DELETE FROM ScanFolders WHERE id = :scanFolderID",
    CountScanFolders => "SELECT COUNT(*) FROM ScanFolders",

    // Sources
    GetSourceById => concat!(
        "SELECT ", source_columns!(), " FROM Sources WHERE Sources.id = :sourceID"
    ),
    GetSourceByGuid => concat!(
        "SELECT ", source_columns!(), " FROM Sources WHERE Sources.sourceGuid = :sourceGuid"
    ),
    GetSources => concat!("SELECT ", source_columns!(), " FROM Sources"),
    GetSourcesByScanFolderId => concat!(
        "SELECT ", source_columns!(), " FROM Sources WHERE Sources.scanFolderPK = :scanFolderID"
    ),
    GetSourcesByName => concat!(
        "SELECT ", source_columns!(), " FROM Sources WHERE Sources.sourceName = :sourceName"
    ),
    GetSourcesByNameInScanFolder => concat!(
        "SELECT ", source_columns!(),
        " FROM Sources WHERE Sources.scanFolderPK = :scanFolderID",
        " AND Sources.sourceName = :sourceName"
    ),
    GetSourcesLikeName => concat!(
        "SELECT ", source_columns!(),
        " FROM Sources WHERE Sources.sourceName LIKE :pattern ESCAPE '\\'"
    ),
    GetSourceByJobId => concat!(
        "SELECT ", source_columns!(),
        " FROM Sources JOIN Jobs ON Jobs.sourcePK = Sources.id WHERE Jobs.id = :jobID"
    ),
    GetSourceByProductId => concat!(
        "SELECT ", source_columns!(),
        " FROM Sources JOIN Jobs ON Jobs.sourcePK = Sources.id",
        " JOIN Products ON Products.jobPK = Jobs.id WHERE Products.id = :productID"
    ),
    GetSourcesByProductName => concat!(
        "SELECT DISTINCT ", source_columns!(),
        " FROM Sources JOIN Jobs ON Jobs.sourcePK = Sources.id",
        " JOIN Products ON Products.jobPK = Jobs.id WHERE Products.productName = :productName"
    ),
    GetSourcesLikeProductName => concat!(
        "SELECT DISTINCT ", source_columns!(),
        " FROM Sources JOIN Jobs ON Jobs.sourcePK = Sources.id",
        " JOIN Products ON Products.jobPK = Jobs.id",
        " WHERE Products.productName LIKE :pattern ESCAPE '\\'"
    ),
    InsertSource => "INSERT INTO Sources (scanFolderPK, sourceName, sourceGuid) \
         VALUES (:scanFolderPK, :sourceName, :sourceGuid)",
    UpdateSource => "UPDATE Sources SET scanFolderPK = :scanFolderPK, sourceName = :sourceName, \
         sourceGuid = :sourceGuid WHERE id = :sourceID",
    DeleteSource => "DELETE FROM Sources WHERE id = :sourceID",
    DeleteSourcesByScanFolderId => "DELETE FROM Sources WHERE scanFolderPK = :scanFolderID",
    CountSources => "SELECT COUNT(*) FROM Sources",

    // Jobs
    GetHighestJobRunKey => "SELECT MAX(jobRunKey) FROM Jobs",
    GetJobById => concat!("SELECT ", job_columns!(), " FROM Jobs WHERE Jobs.id = :jobID"),
    GetJobByNaturalKey => concat!(
        "SELECT ", job_columns!(),
        " FROM Jobs WHERE Jobs.sourcePK = :sourcePK AND Jobs.builderGuid = :builderGuid",
        " AND Jobs.jobKey = :jobKey AND Jobs.platform = :platform"
    ),
    GetJobByProductId => concat!(
        "SELECT ", job_columns!(),
        " FROM Jobs JOIN Products ON Products.jobPK = Jobs.id WHERE Products.id = :productID"
    ),
    GetJobs => concat!("SELECT ", job_columns!(), " FROM Jobs WHERE", job_filter!()),
    GetJobsBySourceId => concat!(
        "SELECT ", job_columns!(), " FROM Jobs WHERE Jobs.sourcePK = :sourceID AND", job_filter!()
    ),
    GetJobsBySourceName => concat!(
        "SELECT ", job_columns!(),
        " FROM Jobs JOIN Sources ON Sources.id = Jobs.sourcePK",
        " WHERE Sources.sourceName = :sourceName AND", job_filter!()
    ),
    GetJobsLikeSourceName => concat!(
        "SELECT ", job_columns!(),
        " FROM Jobs JOIN Sources ON Sources.id = Jobs.sourcePK",
        " WHERE Sources.sourceName LIKE :pattern ESCAPE '\\' AND", job_filter!()
    ),
    GetJobsByProductName => concat!(
        "SELECT DISTINCT ", job_columns!(),
        " FROM Jobs JOIN Products ON Products.jobPK = Jobs.id",
        " WHERE Products.productName = :productName AND", job_filter!()
    ),
    GetJobsLikeProductName => concat!(
        "SELECT DISTINCT ", job_columns!(),
        " FROM Jobs JOIN Products ON Products.jobPK = Jobs.id",
        " WHERE Products.productName LIKE :pattern ESCAPE '\\' AND", job_filter!()
    ),
    GetJobsByJobRunKey => concat!(
        "SELECT ", job_columns!(), " FROM Jobs WHERE Jobs.jobRunKey = :jobRunKey"
    ),
    InsertJob => "INSERT INTO Jobs (sourcePK, jobKey, fingerprint, platform, builderGuid, status, \
         jobRunKey, firstFailLogTime, firstFailLogFile, lastFailLogTime, lastFailLogFile, \
         lastLogTime, lastLogFile) \
         VALUES (:sourcePK, :jobKey, :fingerprint, :platform, :builderGuid, :status, :jobRunKey, \
         :firstFailLogTime, :firstFailLogFile, :lastFailLogTime, :lastFailLogFile, :lastLogTime, \
         :lastLogFile)",
    UpdateJob => "UPDATE Jobs SET sourcePK = :sourcePK, jobKey = :jobKey, fingerprint = :fingerprint, \
         platform = :platform, builderGuid = :builderGuid, status = :status, jobRunKey = :jobRunKey, \
         firstFailLogTime = :firstFailLogTime, firstFailLogFile = :firstFailLogFile, \
         lastFailLogTime = :lastFailLogTime, lastFailLogFile = :lastFailLogFile, \
         lastLogTime = :lastLogTime, lastLogFile = :lastLogFile WHERE id = :jobID",
    DeleteJob => "DELETE FROM Jobs WHERE id = :jobID",
    CountJobs => "SELECT COUNT(*) FROM Jobs",

    // Products
    GetProductById => concat!(
        "SELECT ", product_columns!(), " FROM Products WHERE Products.id = :productID"
    ),
    GetProductByNaturalKey => concat!(
        "SELECT ", product_columns!(),
        " FROM Products WHERE Products.jobPK = :jobPK AND Products.subID = :subID",
        " AND Products.productName = :productName AND Products.assetType = :assetType",
        " AND Products.legacyGuid = :legacyGuid"
    ),
    GetProducts => concat!(
        "SELECT ", product_columns!(),
        " FROM Products JOIN Jobs ON Jobs.id = Products.jobPK WHERE", job_filter!()
    ),
    GetProductsByJobId => concat!(
        "SELECT ", product_columns!(), " FROM Products WHERE Products.jobPK = :jobID"
    ),
    GetProductsBySourceId => concat!(
        "SELECT ", product_columns!(),
        " FROM Products JOIN Jobs ON Jobs.id = Products.jobPK",
        " WHERE Jobs.sourcePK = :sourceID AND", job_filter!()
    ),
    GetProductsByName => concat!(
        "SELECT ", product_columns!(),
        " FROM Products JOIN Jobs ON Jobs.id = Products.jobPK",
        " WHERE Products.productName = :productName AND", job_filter!()
    ),
    GetProductsLikeName => concat!(
        "SELECT ", product_columns!(),
        " FROM Products JOIN Jobs ON Jobs.id = Products.jobPK",
        " WHERE Products.productName LIKE :pattern ESCAPE '\\' AND", job_filter!()
    ),
    GetProductsBySourceName => concat!(
        "SELECT ", product_columns!(),
        " FROM Products JOIN Jobs ON Jobs.id = Products.jobPK",
        " JOIN Sources ON Sources.id = Jobs.sourcePK",
        " WHERE Sources.sourceName = :sourceName AND", job_filter!()
    ),
    GetProductsLikeSourceName => concat!(
        "SELECT ", product_columns!(),
        " FROM Products JOIN Jobs ON Jobs.id = Products.jobPK",
        " JOIN Sources ON Sources.id = Jobs.sourcePK",
        " WHERE Sources.sourceName LIKE :pattern ESCAPE '\\' AND", job_filter!()
    ),
    InsertProduct => "INSERT INTO Products (jobPK, subID, productName, assetType, legacyGuid) \
         VALUES (:jobPK, :subID, :productName, :assetType, :legacyGuid)",
    UpdateProduct => "UPDATE Products SET jobPK = :jobPK, subID = :subID, productName = :productName, \
         assetType = :assetType, legacyGuid = :legacyGuid WHERE id = :productID",
    DeleteProduct => "DELETE FROM Products WHERE id = :productID",
    DeleteProductsByJobId => "DELETE FROM Products WHERE jobPK = :jobID",
    DeleteProductsBySourceId => concat!(
        "DELETE FROM Products WHERE jobPK IN",
        " (SELECT Jobs.id FROM Jobs WHERE Jobs.sourcePK = :sourceID AND", job_filter!(), ")"
    ),
    CountProducts => "SELECT COUNT(*) FROM Products",

    // SourceDependency
    GetSourceDependencyById => concat!(
        "SELECT ", dependency_columns!(),
        " FROM SourceDependency WHERE SourceDependency.id = :sourceDependencyID"
    ),
    GetSourceDependencyByNaturalKey => concat!(
        "SELECT ", dependency_columns!(),
        " FROM SourceDependency WHERE SourceDependency.builderGuid = :builderGuid",
        " AND SourceDependency.source = :source",
        " AND SourceDependency.dependsOnSource = :dependsOnSource"
    ),
    GetSourceDependenciesBySource => concat!(
        "SELECT ", dependency_columns!(),
        " FROM SourceDependency WHERE SourceDependency.source = :source",
        " AND (:builderGuid IS NULL OR SourceDependency.builderGuid = :builderGuid)"
    ),
    GetSourceDependenciesByDependsOnSource => concat!(
        "SELECT ", dependency_columns!(),
        " FROM SourceDependency WHERE SourceDependency.dependsOnSource = :dependsOnSource"
    ),
    InsertSourceDependency => "INSERT INTO SourceDependency (builderGuid, source, dependsOnSource) \
         VALUES (:builderGuid, :source, :dependsOnSource)",
    UpdateSourceDependency => "UPDATE SourceDependency SET builderGuid = :builderGuid, \
         source = :source, dependsOnSource = :dependsOnSource WHERE id = :sourceDependencyID",
    DeleteSourceDependency => "DELETE FROM SourceDependency WHERE id = :sourceDependencyID",
    CountSourceDependencies => "SELECT COUNT(*) FROM SourceDependency",

    // Job info
    GetJobInfoByJobId => concat!(
        "SELECT ", job_columns!(), ", Sources.sourceName, ScanFolders.path",
        " FROM Jobs JOIN Sources ON Sources.id = Jobs.sourcePK",
        " JOIN ScanFolders ON ScanFolders.id = Sources.scanFolderPK WHERE Jobs.id = :jobID"
    ),
    GetJobInfoByJobKey => concat!(
        "SELECT ", job_columns!(), ", Sources.sourceName, ScanFolders.path",
        " FROM Jobs JOIN Sources ON Sources.id = Jobs.sourcePK",
        " JOIN ScanFolders ON ScanFolders.id = Sources.scanFolderPK WHERE Jobs.jobKey = :jobKey"
    ),
    GetJobInfoByJobRunKey => concat!(
        "SELECT ", job_columns!(), ", Sources.sourceName, ScanFolders.path",
        " FROM Jobs JOIN Sources ON Sources.id = Jobs.sourcePK",
        " JOIN ScanFolders ON ScanFolders.id = Sources.scanFolderPK",
        " WHERE Jobs.jobRunKey = :jobRunKey"
    ),
    GetJobInfoBySourceName => concat!(
        "SELECT ", job_columns!(), ", Sources.sourceName, ScanFolders.path",
        " FROM Jobs JOIN Sources ON Sources.id = Jobs.sourcePK",
        " JOIN ScanFolders ON ScanFolders.id = Sources.scanFolderPK",
        " WHERE Sources.sourceName = :sourceName AND", job_filter!()
    ),
}

impl From<StatementId> for &'static str {
    fn from(id: StatementId) -> Self {
        id.name()
    }
}
