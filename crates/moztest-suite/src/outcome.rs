use crate::discovery::TestId;

/// What the runner captured from a finished test process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// A nonzero exit always fails; otherwise the run fails iff stdout carries
/// `failure_marker`.
pub fn is_failure_output(output: &ProcessOutput, failure_marker: &str) -> bool {
    if output.exit_code != 0 {
        return true;
    }
    output.stdout.contains(failure_marker)
}

/// Negative tests are expected to fail. Inverting the verdict is up to the
/// runner.
pub fn is_negative_test(id: &TestId, negative_suffix: &str) -> bool {
    id.as_str().ends_with(negative_suffix)
}
