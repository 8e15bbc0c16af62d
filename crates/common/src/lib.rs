//! Stepcase Common Library
//!
//! Project model, error type and test-case formatting shared by the
//! Stepcase service.

pub mod error;
pub mod format;
pub mod types;

pub use error::{Error, Result};
pub use format::{format_test_cases, FormattedOutput, OutputFormat, TestSuite};
pub use types::*;

/// Stepcase version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
