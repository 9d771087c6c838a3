//! Versioned local copy of the test corpus.
//!
//! The corpus under `data/` is considered valid exactly when the version
//! marker matches the requested version. Otherwise the current tree is moved
//! aside and replaced, either from a `downloaded_<version>.tar.gz` snapshot or
//! from a fresh source-control checkout that is then packed into such a
//! snapshot. The marker is written last, so any failure leaves it absent or
//! stale and the next call provisions again from scratch.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use tar::EntryType;

use crate::checkout::Checkout;
use crate::error::{IoResultExt as _, Result, SuiteError};
use crate::layout::SuiteLayout;

/// Which path `ensure_corpus` took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provisioned {
    UpToDate,
    Restored,
    CheckedOut,
}

/// Content of the version marker, if one has been written.
pub fn read_checked_out_version(layout: &SuiteLayout) -> Result<Option<String>> {
    let path = layout.version_file();
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path).io_context(|| format!("read {}", path.display()))?;
    Ok(Some(text.trim().to_string()))
}

#[tracing::instrument(skip_all, fields(root = %layout.root().display(), version = %version))]
pub fn ensure_corpus(
    layout: &SuiteLayout,
    version: &str,
    remote: &str,
    checkout: &dyn Checkout,
) -> Result<Provisioned> {
    if read_checked_out_version(layout)?.as_deref() == Some(version) {
        tracing::debug!("corpus already at requested version");
        return Ok(Provisioned::UpToDate);
    }

    move_aside(layout)?;

    let snapshot = layout.snapshot_file(version);
    if snapshot.is_file() {
        tracing::info!(snapshot = %snapshot.display(), "restoring corpus from local snapshot");
        restore_snapshot(layout, &snapshot)?;
        write_version_marker(layout, version)?;
        return Ok(Provisioned::Restored);
    }

    tracing::info!(remote, "no local snapshot, checking out corpus");
    fetch_checkout(layout, version, remote, checkout)?;
    write_snapshot(layout, &snapshot)?;
    write_version_marker(layout, version)?;
    Ok(Provisioned::CheckedOut)
}

fn move_aside(layout: &SuiteLayout) -> Result<()> {
    let data = layout.data_dir();
    if !data.exists() {
        return Ok(());
    }
    let backup = layout.backup_dir();
    if backup.exists() {
        std::fs::remove_dir_all(&backup)
            .io_context(|| format!("remove {}", backup.display()))?;
    }
    std::fs::rename(&data, &backup)
        .io_context(|| format!("rename {} -> {}", data.display(), backup.display()))?;
    tracing::info!(backup = %backup.display(), "moved previous corpus aside");
    Ok(())
}

fn restore_snapshot(layout: &SuiteLayout, snapshot: &Path) -> Result<()> {
    validate_members(snapshot)?;

    let staging = layout.extract_staging_dir();
    remove_dir_if_exists(&staging)?;
    std::fs::create_dir_all(&staging).io_context(|| format!("mkdir {}", staging.display()))?;

    if let Err(err) = unpack_into(snapshot, &staging) {
        discard_scaffolding(&staging);
        return Err(err);
    }

    let staged = staging.join(layout.data_dir_name());
    if !staged.is_dir() {
        discard_scaffolding(&staging);
        return Err(SuiteError::Io {
            context: format!("extract {}", snapshot.display()),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("snapshot has no top-level {} directory", layout.data_dir_name()),
            ),
        });
    }
    let data = layout.data_dir();
    std::fs::rename(&staged, &data)
        .io_context(|| format!("rename {} -> {}", staged.display(), data.display()))?;
    remove_dir_if_exists(&staging)
}

/// Rejects the whole archive if any member would land outside the
/// destination. Runs before anything is written.
///
/// Symlink members are remembered so that no later member, and no hard
/// link target, can pass through one of them.
fn validate_members(snapshot: &Path) -> Result<()> {
    let mut ar = open_snapshot(snapshot)?;
    let entries = ar
        .entries()
        .io_context(|| format!("read tar entries {}", snapshot.display()))?;
    let mut symlinks: HashSet<PathBuf> = HashSet::new();
    for entry in entries {
        let entry = entry.io_context(|| format!("read tar entry {}", snapshot.display()))?;
        let kind = entry.header().entry_type();
        if kind.is_pax_global_extensions() {
            continue;
        }
        let member = entry
            .path()
            .io_context(|| format!("read tar entry path {}", snapshot.display()))?
            .into_owned();
        let rel = sanitize_member_path(snapshot, &member)?;
        if passes_through_symlink(&rel, &symlinks) {
            return Err(traversal(snapshot, &member));
        }

        let link = entry
            .link_name()
            .io_context(|| format!("read tar link name {}", snapshot.display()))?;
        match (kind, link) {
            (EntryType::Link, Some(target)) => {
                let target_rel = sanitize_member_path(snapshot, &target)?;
                if passes_through_symlink(&target_rel, &symlinks) || symlinks.contains(&target_rel)
                {
                    return Err(traversal(snapshot, &target));
                }
            }
            (EntryType::Symlink, Some(target)) => {
                if !link_stays_inside(&rel, &target) {
                    return Err(traversal(snapshot, &target));
                }
                symlinks.insert(rel);
            }
            _ => {}
        }
    }
    Ok(())
}

/// True if a proper ancestor of `rel` is a symlink member.
fn passes_through_symlink(rel: &Path, symlinks: &HashSet<PathBuf>) -> bool {
    rel.ancestors()
        .skip(1)
        .any(|ancestor| symlinks.contains(ancestor))
}

/// `unpack_in` resolves hard links against `dest` and refuses to write
/// anywhere whose resolved parent lies outside it.
fn unpack_into(snapshot: &Path, dest: &Path) -> Result<()> {
    let mut ar = open_snapshot(snapshot)?;
    let entries = ar
        .entries()
        .io_context(|| format!("read tar entries {}", snapshot.display()))?;
    for entry in entries {
        let mut entry = entry.io_context(|| format!("read tar entry {}", snapshot.display()))?;
        if entry.header().entry_type().is_pax_global_extensions() {
            continue;
        }
        let member = entry
            .path()
            .io_context(|| format!("read tar entry path {}", snapshot.display()))?
            .into_owned();
        sanitize_member_path(snapshot, &member)?;
        let unpacked = entry
            .unpack_in(dest)
            .io_context(|| format!("unpack {} into {}", member.display(), dest.display()))?;
        if !unpacked {
            return Err(traversal(snapshot, &member));
        }
    }
    Ok(())
}

fn open_snapshot(snapshot: &Path) -> Result<tar::Archive<GzDecoder<File>>> {
    let f = File::open(snapshot).io_context(|| format!("open {}", snapshot.display()))?;
    Ok(tar::Archive::new(GzDecoder::new(f)))
}

fn sanitize_member_path(snapshot: &Path, member: &Path) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for c in member.components() {
        match c {
            Component::Normal(p) => out.push(p),
            Component::CurDir => {}
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => {
                return Err(traversal(snapshot, member));
            }
        }
    }
    Ok(out)
}

/// `member` is already sanitized; `target` is resolved against its parent.
fn link_stays_inside(member: &Path, target: &Path) -> bool {
    let mut depth = member.components().count().saturating_sub(1);
    for c in target.components() {
        match c {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Component::Prefix(_) | Component::RootDir => return false,
        }
    }
    true
}

fn traversal(snapshot: &Path, member: &Path) -> SuiteError {
    SuiteError::PathTraversal {
        archive: snapshot.to_path_buf(),
        member: member.display().to_string(),
    }
}

fn fetch_checkout(
    layout: &SuiteLayout,
    version: &str,
    remote: &str,
    checkout: &dyn Checkout,
) -> Result<()> {
    let staging = layout.checkout_staging_dir();
    remove_dir_if_exists(&staging)?;
    let target = layout.checkout_target();
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).io_context(|| format!("mkdir {}", parent.display()))?;
    }

    if let Err(err) = checkout.checkout(remote, version, &target) {
        discard_scaffolding(&staging);
        return Err(err);
    }
    if !target.is_dir() {
        discard_scaffolding(&staging);
        return Err(SuiteError::Checkout {
            remote: remote.to_string(),
            revision: version.to_string(),
            reason: format!("no tree at {}", target.display()),
        });
    }

    let data = layout.data_dir();
    std::fs::rename(&target, &data)
        .io_context(|| format!("rename {} -> {}", target.display(), data.display()))?;
    remove_dir_if_exists(&staging)
}

fn write_snapshot(layout: &SuiteLayout, snapshot: &Path) -> Result<()> {
    let tmp = snapshot.with_extension("gz.tmp");
    let f = File::create(&tmp).io_context(|| format!("create {}", tmp.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(f, Compression::default()));
    builder.follow_symlinks(false);

    let data = layout.data_dir();
    builder
        .append_dir_all(layout.data_dir_name(), &data)
        .io_context(|| format!("pack {}", data.display()))?;
    builder
        .into_inner()
        .and_then(|gz| gz.finish())
        .io_context(|| format!("finish {}", tmp.display()))?;

    rename_overwrite_file(&tmp, snapshot)?;
    tracing::info!(snapshot = %snapshot.display(), "wrote corpus snapshot");
    Ok(())
}

fn write_version_marker(layout: &SuiteLayout, version: &str) -> Result<()> {
    let path = layout.version_file();
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, version).io_context(|| format!("write {}", tmp.display()))?;
    rename_overwrite_file(&tmp, &path)
}

fn rename_overwrite_file(src: &Path, dst: &Path) -> Result<()> {
    #[cfg(windows)]
    {
        if dst.is_file() {
            std::fs::remove_file(dst).io_context(|| format!("remove {}", dst.display()))?;
        }
    }
    std::fs::rename(src, dst)
        .io_context(|| format!("rename {} -> {}", src.display(), dst.display()))
}

fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).io_context(|| format!("remove {}", dir.display()))?;
    }
    Ok(())
}

fn discard_scaffolding(dir: &Path) {
    if let Err(err) = remove_dir_if_exists(dir) {
        tracing::warn!(%err, "could not remove staging directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_paths_must_stay_relative() {
        let ar = Path::new("a.tar.gz");
        assert_eq!(
            sanitize_member_path(ar, Path::new("./data/js1_5/a.js")).unwrap(),
            PathBuf::from("data/js1_5/a.js")
        );
        assert!(sanitize_member_path(ar, Path::new("data/../../x")).is_err());
        assert!(sanitize_member_path(ar, Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn symlink_targets_resolve_against_member_parent() {
        let member = Path::new("data/js1_5/link.js");
        assert!(link_stays_inside(member, Path::new("../shell.js")));
        assert!(link_stays_inside(member, Path::new("../../data/shell.js")));
        assert!(!link_stays_inside(member, Path::new("../../../outside")));
        assert!(!link_stays_inside(member, Path::new("/etc/passwd")));
    }

    #[test]
    fn members_below_a_symlink_member_are_detected() {
        let symlinks: HashSet<PathBuf> = [PathBuf::from("data/l")].into_iter().collect();
        assert!(passes_through_symlink(Path::new("data/l/u1"), &symlinks));
        assert!(passes_through_symlink(Path::new("data/l/u1/x.js"), &symlinks));
        assert!(!passes_through_symlink(Path::new("data/l"), &symlinks));
        assert!(!passes_through_symlink(Path::new("data/lib/x.js"), &symlinks));
    }
}
