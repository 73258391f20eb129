//! Default names and values used across subpatch.
//!
//! This module provides the file names of the on-disk ledger, ensuring the
//! library and the commands agree on them.

/// Name of the superproject configuration file at the toplevel directory.
pub const SUPERPROJECT_CONFIG_FILENAME: &str = ".subpatch";

/// Name of the metadata file inside every subproject.
pub const METADATA_FILENAME: &str = ".subproject";

/// Name of the directory that holds the patch stack of a subproject.
pub const PATCHES_DIRNAME: &str = "patches";

/// Extension a file in the patches directory must have to be tracked.
pub const PATCH_EXTENSION: &str = ".patch";

/// Suffix of the scratch directory an upstream tree is downloaded into.
pub const DOWNLOAD_DIR_SUFFIX: &str = "-tmp";

/// Section and key names of the `.subpatch` file.
pub mod superproject {
    pub const SECTION: &str = "subprojects";
    pub const PATH: &str = "path";
}

/// Section and key names of the `.subproject` file.
pub mod metadata {
    pub const UPSTREAM: &str = "upstream";
    pub const URL: &str = "url";
    pub const REVISION: &str = "revision";
    pub const OBJECT_ID: &str = "objectId";

    pub const SUBTREE: &str = "subtree";
    pub const CHECKSUM: &str = "checksum";
    pub const APPLIED_INDEX: &str = "appliedIndex";
}
