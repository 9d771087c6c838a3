use std::path::{Path, PathBuf};

use crate::discovery::TestId;

/// Per-run settings supplied by the test runner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunContext {
    pub mode_flags: Vec<String>,
}

impl RunContext {
    pub fn new(mode_flags: Vec<String>) -> Self {
        Self { mode_flags }
    }
}

/// Fixed inputs of flag derivation for one suite.
#[derive(Debug, Clone, Copy)]
pub struct FlagRules<'a> {
    pub corpus_root: &'a Path,
    pub feature_flags: &'a [String],
    pub shim_script: &'a Path,
    pub setup_script: &'a str,
    pub script_extension: &'a str,
}

/// Launch arguments for one test, in order: `case_flags`, the run's mode
/// flags, the feature flags, the shim, every existing setup script from the
/// corpus root down to the test's directory, then the test script itself.
///
/// Recomputed on every call; only reads the filesystem.
pub fn flags_for(
    id: &TestId,
    case_flags: &[String],
    ctx: &RunContext,
    rules: &FlagRules<'_>,
) -> Vec<String> {
    let mut out = Vec::with_capacity(case_flags.len() + ctx.mode_flags.len() + 4);
    out.extend(case_flags.iter().cloned());
    out.extend(ctx.mode_flags.iter().cloned());
    out.extend(rules.feature_flags.iter().cloned());
    out.push(path_arg(rules.shim_script));

    for script in setup_scripts(id, rules) {
        out.push(path_arg(&script));
    }

    out.push(path_arg(&script_path(rules.corpus_root, id, rules.script_extension)));
    out
}

pub fn script_path(corpus_root: &Path, id: &TestId, extension: &str) -> PathBuf {
    let mut path = corpus_root.to_path_buf();
    for segment in id.dir_segments() {
        path.push(segment);
    }
    let file = id.as_str().rsplit('/').next().unwrap_or(id.as_str());
    path.push(format!("{file}{extension}"));
    path
}

/// Existing setup scripts along the path to `id`, root first.
fn setup_scripts(id: &TestId, rules: &FlagRules<'_>) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut dir = rules.corpus_root.to_path_buf();
    let mut check = |dir: &Path| {
        let candidate = dir.join(rules.setup_script);
        if candidate.is_file() {
            tracing::debug!(script = %candidate.display(), "including setup script");
            found.push(candidate);
        }
    };
    check(dir.as_path());
    for segment in id.dir_segments() {
        dir.push(segment);
        check(dir.as_path());
    }
    found
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
