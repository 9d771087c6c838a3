//! Test-suite adapter for the Mozilla JavaScript test corpus.
//!
//! Provisions the corpus on demand, enumerates its test scripts, derives the
//! shell arguments for each test and interprets the shell's output.

pub mod cache;
pub mod checkout;
pub mod config;
pub mod discovery;
pub mod error;
pub mod flags;
pub mod layout;
pub mod outcome;
pub mod suite;

pub use cache::{ensure_corpus, read_checked_out_version, Provisioned};
pub use checkout::{Checkout, SvnCheckout};
pub use config::SuiteConfig;
pub use discovery::TestId;
pub use error::{Result, SuiteError};
pub use flags::RunContext;
pub use layout::SuiteLayout;
pub use outcome::ProcessOutput;
pub use suite::{get_suite, MozillaTestSuite, TestCase, TestSuite};
