use std::cmp::Ordering;
use std::fmt;
use std::path::{Component, Path};

use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::error::{Result, SuiteError};

/// A test script's path relative to the corpus root, `/`-separated and
/// without the script extension, e.g. `js1_5/Array/regress-101488`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Accepts an identifier typed by a user: `/`-separated segments, none
    /// empty, `.` or `..`, and no leading `/` or `\`.
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |reason| SuiteError::InvalidTestId {
            id: s.to_string(),
            reason,
        };
        if s.is_empty() {
            return Err(invalid("empty"));
        }
        if s.contains('\\') {
            return Err(invalid("backslash separator"));
        }
        if s.starts_with('/') {
            return Err(invalid("absolute path"));
        }
        for segment in s.split('/') {
            match segment {
                "" => return Err(invalid("empty segment")),
                "." | ".." => return Err(invalid("relative segment")),
                _ => {}
            }
        }
        Ok(Self(s.to_string()))
    }

    /// Builds the identifier of the script at `rel` (relative to the corpus
    /// root). `None` if `rel` does not carry `extension` or is not a plain
    /// relative path.
    pub fn from_relative_path(rel: &Path, extension: &str) -> Option<Self> {
        let mut parts = Vec::new();
        for c in rel.components() {
            match c {
                Component::Normal(p) => parts.push(p.to_str()?),
                Component::CurDir => {}
                _ => return None,
            }
        }
        let joined = parts.join("/");
        let stem = joined.strip_suffix(extension)?;
        if stem.is_empty() || stem.ends_with('/') {
            return None;
        }
        Some(Self(stem.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory segments leading to the script, root first.
    pub fn dir_segments(&self) -> impl Iterator<Item = &str> {
        let mut segments: Vec<&str> = self.0.split('/').collect();
        segments.pop();
        segments.into_iter()
    }

    pub fn script_file_name(&self, extension: &str) -> String {
        format!("{}{extension}", self.0)
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The subset of the suite configuration that shapes discovery.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryRules<'a> {
    pub test_dirs: &'a [String],
    pub excluded_dirs: &'a [String],
    pub framework_files: &'a [String],
    pub script_extension: &'a str,
}

/// Walks every configured top-level directory under `corpus_root` and
/// returns one identifier per test script.
///
/// Each directory level yields its files in name order before descending
/// into its subdirectories in name order, so the result is stable across
/// runs and platforms.
#[tracing::instrument(skip_all, fields(corpus_root = %corpus_root.display()))]
pub fn list_test_ids(corpus_root: &Path, rules: &DiscoveryRules<'_>) -> Result<Vec<TestId>> {
    let mut out = Vec::new();
    for test_dir in rules.test_dirs {
        let current = corpus_root.join(test_dir);
        if !current.is_dir() {
            tracing::debug!(dir = %current.display(), "test directory missing, skipped");
            continue;
        }
        let walker = WalkDir::new(&current)
            .follow_links(false)
            .sort_by(files_then_dirs)
            .into_iter()
            .filter_entry(|e| should_walk_dir_entry(e, rules.excluded_dirs));
        for entry in walker {
            let entry = entry?;
            // A symlink to a directory is a directory entry, not a script.
            if entry.file_type().is_dir() || entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !name.ends_with(rules.script_extension)
                || rules.framework_files.iter().any(|f| f == name)
            {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(corpus_root) else {
                continue;
            };
            if let Some(id) = TestId::from_relative_path(rel, rules.script_extension) {
                out.push(id);
            }
        }
    }
    tracing::debug!(count = out.len(), "discovered tests");
    Ok(out)
}

fn files_then_dirs(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn should_walk_dir_entry(entry: &DirEntry, excluded: &[String]) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    !(name.starts_with('.') || excluded.iter().any(|x| *x == name))
}
