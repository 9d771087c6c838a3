use std::path::{Path, PathBuf};

const DATA_DIR: &str = "data";
const DATA_BACKUP_DIR: &str = "data.old";
const VERSION_FILE: &str = "CHECKED_OUT_VERSION";
const EXTRACT_STAGING_DIR: &str = ".moztest-extract";
const CHECKOUT_STAGING_DIR: &str = ".moztest-checkout";

/// On-disk paths of one suite, all derived from the suite root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteLayout {
    root: PathBuf,
}

impl SuiteLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The corpus root; test identifiers are relative to it.
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn data_dir_name(&self) -> &'static str {
        DATA_DIR
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join(DATA_BACKUP_DIR)
    }

    pub fn version_file(&self) -> PathBuf {
        self.root.join(VERSION_FILE)
    }

    pub fn snapshot_file(&self, version: &str) -> PathBuf {
        self.root.join(format!("downloaded_{version}.tar.gz"))
    }

    pub fn extract_staging_dir(&self) -> PathBuf {
        self.root.join(EXTRACT_STAGING_DIR)
    }

    pub fn checkout_staging_dir(&self) -> PathBuf {
        self.root.join(CHECKOUT_STAGING_DIR)
    }

    /// Where the source-control checkout lands inside its staging dir.
    pub fn checkout_target(&self) -> PathBuf {
        self.checkout_staging_dir()
            .join("mozilla")
            .join("js")
            .join("tests")
    }

    pub fn shim_script(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
