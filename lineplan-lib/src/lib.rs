#![allow(clippy::needless_return)]

pub mod referential_validator;
pub mod utils;
pub mod workbook_reader;

// Test utilities - only compiled when testing or with test feature
// #[cfg(test)] alone doesn't work for integration tests (they're external crates)
// The feature flag makes it available to integration tests via dev-dependencies
#[cfg(any(test, feature = "test"))]
pub mod test_utils;

pub use referential_validator::{
    DEFAULT_REQUIRED_COLUMNS, Finding, HeaderPolicy, LogicalTable, REFERENCE_SHEET_NAME,
    ReferentialValidator, ValidatorConfig,
};
pub use workbook_reader::{CellValue, SheetMatrix, SheetSource, Workbook, WorkbookError};

pub const ERRORS_LOG_FILE: &str = "errors.log";
