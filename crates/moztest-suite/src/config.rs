use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IoResultExt as _, Result, SuiteError};

pub const CONFIG_SCHEMA_VERSION: &str = "moztest.suite@0.1.0";
pub const CONFIG_FILE: &str = "moztest.json";

pub const MOZILLA_VERSION: &str = "51236";
pub const SVN_SERVER: &str = "svn://svn.chromium.org/chrome/trunk/deps/third_party/mozilla-tests";

/// Everything about the corpus that is data rather than algorithm.
///
/// The defaults describe the Mozilla JavaScript test corpus. A
/// `moztest.json` next to the corpus may override any subset of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub schema_version: String,
    pub version: String,
    pub remote: String,
    /// Top-level corpus directories that hold tests, walked in this order.
    pub test_dirs: Vec<String>,
    pub excluded_dirs: Vec<String>,
    /// Shared harness scripts that are never tests themselves.
    pub framework_files: Vec<String>,
    pub script_extension: String,
    pub setup_script: String,
    pub shim_script: String,
    pub feature_flags: Vec<String>,
    pub negative_suffix: String,
    pub failure_marker: String,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION.to_string(),
            version: MOZILLA_VERSION.to_string(),
            remote: SVN_SERVER.to_string(),
            test_dirs: strings(&[
                "ecma", "ecma_2", "ecma_3", "js1_1", "js1_2", "js1_3", "js1_4", "js1_5",
            ]),
            excluded_dirs: strings(&["CVS", ".svn"]),
            framework_files: strings(&["browser.js", "shell.js", "jsref.js", "template.js"]),
            script_extension: ".js".to_string(),
            setup_script: "shell.js".to_string(),
            shim_script: "mozilla-shell-emulation.js".to_string(),
            feature_flags: strings(&["--expose-gc"]),
            negative_suffix: "-n".to_string(),
            failure_marker: "FAILED!".to_string(),
        }
    }
}

impl SuiteConfig {
    /// Loads `<root>/moztest.json`, or the defaults when it does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let bytes = std::fs::read(&path).io_context(|| format!("read {}", path.display()))?;
        let cfg: Self = serde_json::from_slice(&bytes).map_err(|err| SuiteError::Config {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        if cfg.schema_version != CONFIG_SCHEMA_VERSION {
            return Err(SuiteError::Config {
                path,
                reason: format!(
                    "unsupported schema_version: {} (expected {CONFIG_SCHEMA_VERSION})",
                    cfg.schema_version
                ),
            });
        }
        if cfg.script_extension.is_empty() {
            return Err(SuiteError::Config {
                path,
                reason: "script_extension must not be empty".to_string(),
            });
        }
        Ok(cfg)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            br#"{"schema_version":"moztest.suite@0.1.0","version":"60000","test_dirs":["js1_5"]}"#,
        )
        .expect("write config");

        let cfg = SuiteConfig::load(tmp.path()).expect("load");
        assert_eq!(cfg.version, "60000");
        assert_eq!(cfg.test_dirs, vec!["js1_5".to_string()]);
        assert_eq!(cfg.setup_script, "shell.js");
        assert_eq!(cfg.failure_marker, "FAILED!");
    }

    #[test]
    fn wrong_schema_is_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            br#"{"schema_version":"moztest.suite@9.9.9"}"#,
        )
        .expect("write config");

        let err = SuiteConfig::load(tmp.path()).unwrap_err();
        assert!(matches!(err, SuiteError::Config { .. }), "got {err:?}");
    }

    #[test]
    fn missing_file_means_defaults() {
        let tmp = tempfile::tempdir().expect("tempdir");
        assert_eq!(SuiteConfig::load(tmp.path()).unwrap(), SuiteConfig::default());
    }
}
