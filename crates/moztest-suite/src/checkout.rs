use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Result, SuiteError};

/// Materialises a revision of a remote corpus into a local directory.
pub trait Checkout {
    fn checkout(&self, remote: &str, revision: &str, dest: &Path) -> Result<()>;
}

/// `svn co -r <revision> <remote> <dest>`; only the exit code is consulted.
#[derive(Debug, Clone)]
pub struct SvnCheckout {
    program: OsString,
}

impl Default for SvnCheckout {
    fn default() -> Self {
        Self {
            program: OsString::from("svn"),
        }
    }
}

impl SvnCheckout {
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Checkout for SvnCheckout {
    #[tracing::instrument(skip_all, fields(remote = %remote, revision = %revision, dest = %dest.display()))]
    fn checkout(&self, remote: &str, revision: &str, dest: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("co").arg("-r").arg(revision).arg(remote).arg(dest);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());

        let fail = |reason: String| SuiteError::Checkout {
            remote: remote.to_string(),
            revision: revision.to_string(),
            reason,
        };
        let status = cmd.status().map_err(|err| {
            fail(format!(
                "spawn {}: {err}",
                Path::new(&self.program).display()
            ))
        })?;
        if !status.success() {
            return Err(fail(match status.code() {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_string(),
            }));
        }
        Ok(())
    }
}
