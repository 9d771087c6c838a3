use std::path::{Path, PathBuf};

use crate::cache::{self, Provisioned};
use crate::checkout::{Checkout, SvnCheckout};
use crate::config::SuiteConfig;
use crate::discovery::{self, DiscoveryRules, TestId};
use crate::error::{IoResultExt as _, Result, SuiteError};
use crate::flags::{self, FlagRules, RunContext};
use crate::layout::SuiteLayout;
use crate::outcome::{self, ProcessOutput};

/// One test of a suite, as handed around by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    suite: String,
    path: TestId,
    flags: Vec<String>,
}

impl TestCase {
    pub fn new(suite: impl Into<String>, path: TestId) -> Self {
        Self {
            suite: suite.into(),
            path,
            flags: Vec::new(),
        }
    }

    /// Extra launch arguments placed before everything the suite derives.
    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.flags = flags;
        self
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn path(&self) -> &TestId {
        &self.path
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }
}

/// What a test runner needs from a suite adapter.
pub trait TestSuite {
    fn name(&self) -> &str;
    fn root(&self) -> &Path;
    fn list_tests(&self) -> Result<Vec<TestCase>>;
    fn flags_for_test_case(&self, case: &TestCase, ctx: &RunContext) -> Vec<String>;
    fn source_for_test(&self, case: &TestCase) -> Result<String>;
    fn is_negative_test(&self, case: &TestCase) -> bool;
    fn is_failure_output(&self, output: &ProcessOutput, case: &TestCase) -> bool;
    fn download_data(&self) -> Result<Provisioned>;
}

pub struct MozillaTestSuite {
    name: String,
    layout: SuiteLayout,
    config: SuiteConfig,
    checkout: Box<dyn Checkout + Send + Sync>,
}

impl std::fmt::Debug for MozillaTestSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MozillaTestSuite")
            .field("name", &self.name)
            .field("layout", &self.layout)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MozillaTestSuite {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, config: SuiteConfig) -> Self {
        Self {
            name: name.into(),
            layout: SuiteLayout::new(root),
            config,
            checkout: Box::new(SvnCheckout::default()),
        }
    }

    pub fn with_checkout(mut self, checkout: impl Checkout + Send + Sync + 'static) -> Self {
        self.checkout = Box::new(checkout);
        self
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn layout(&self) -> &SuiteLayout {
        &self.layout
    }

    /// The marker content on disk, independent of the configured version.
    pub fn checked_out_version(&self) -> Result<Option<String>> {
        cache::read_checked_out_version(&self.layout)
    }

    pub fn test_case(&self, path: TestId) -> TestCase {
        TestCase::new(self.name.clone(), path)
    }

    pub fn script_path(&self, case: &TestCase) -> PathBuf {
        flags::script_path(
            &self.layout.data_dir(),
            case.path(),
            &self.config.script_extension,
        )
    }

    fn discovery_rules(&self) -> DiscoveryRules<'_> {
        DiscoveryRules {
            test_dirs: &self.config.test_dirs,
            excluded_dirs: &self.config.excluded_dirs,
            framework_files: &self.config.framework_files,
            script_extension: &self.config.script_extension,
        }
    }
}

impl TestSuite for MozillaTestSuite {
    fn name(&self) -> &str {
        &self.name
    }

    fn root(&self) -> &Path {
        self.layout.root()
    }

    fn list_tests(&self) -> Result<Vec<TestCase>> {
        let ids = discovery::list_test_ids(&self.layout.data_dir(), &self.discovery_rules())?;
        Ok(ids.into_iter().map(|id| self.test_case(id)).collect())
    }

    fn flags_for_test_case(&self, case: &TestCase, ctx: &RunContext) -> Vec<String> {
        let corpus_root = self.layout.data_dir();
        let shim = self.layout.shim_script(&self.config.shim_script);
        let rules = FlagRules {
            corpus_root: &corpus_root,
            feature_flags: &self.config.feature_flags,
            shim_script: &shim,
            setup_script: &self.config.setup_script,
            script_extension: &self.config.script_extension,
        };
        flags::flags_for(case.path(), case.flags(), ctx, &rules)
    }

    fn source_for_test(&self, case: &TestCase) -> Result<String> {
        let path = self.script_path(case);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(SuiteError::NotFound { path })
            }
            Err(err) => Err(err).io_context(|| format!("read {}", path.display())),
        }
    }

    fn is_negative_test(&self, case: &TestCase) -> bool {
        outcome::is_negative_test(case.path(), &self.config.negative_suffix)
    }

    fn is_failure_output(&self, output: &ProcessOutput, _case: &TestCase) -> bool {
        outcome::is_failure_output(output, &self.config.failure_marker)
    }

    fn download_data(&self) -> Result<Provisioned> {
        cache::ensure_corpus(
            &self.layout,
            &self.config.version,
            &self.config.remote,
            self.checkout.as_ref(),
        )
    }
}

/// Builds the Mozilla suite rooted at `root`, reading `moztest.json` there
/// if present.
pub fn get_suite(name: impl Into<String>, root: impl Into<PathBuf>) -> Result<MozillaTestSuite> {
    let root = root.into();
    let config = SuiteConfig::load(&root)?;
    Ok(MozillaTestSuite::new(name, root, config))
}
