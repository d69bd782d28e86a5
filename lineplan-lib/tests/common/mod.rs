use lineplan_lib::{HeaderPolicy, ReferentialValidator, ValidatorConfig};

// Re-export shared test utilities from src/test_utils.rs
pub use lineplan_lib::test_utils::{
    InMemoryWorkbook, XlsbBuilder, matrix, reference_workbook, text, xlsb_record, zip_package,
};

/// Validator with the default line plan configuration
#[allow(dead_code)]
pub fn default_validator() -> ReferentialValidator {
    ReferentialValidator::new(ValidatorConfig::default())
}

/// Validator reporting blank headers in a single message
#[allow(dead_code)]
pub fn aggregate_header_validator() -> ReferentialValidator {
    ReferentialValidator::new(ValidatorConfig::default().with_header_policy(HeaderPolicy::Aggregate))
}

/// Validate a reference sheet built from string rows with the default validator
#[allow(dead_code)]
pub fn validate_rows(rows: &[&[&str]]) -> Vec<String> {
    default_validator().validate(&mut reference_workbook(rows))
}
