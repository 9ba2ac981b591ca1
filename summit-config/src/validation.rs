// Configuration validation

use crate::{ConfigError, Result};

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Configuration validator with rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate that a value is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Validate that a number is strictly positive
    pub fn positive(value: u64, field: &str) -> Result<()> {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} must be greater than zero",
                field
            )));
        }
        Ok(())
    }

    /// Validate URL format
    pub fn is_url(value: &str, field: &str) -> Result<()> {
        if !value.starts_with("http://") && !value.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "{} must be an http or https URL, got '{}'",
                field, value
            )));
        }
        Ok(())
    }

    /// Validate that two optional settings are not both present
    pub fn mutually_exclusive(a: Option<&str>, b: Option<&str>, fields: (&str, &str)) -> Result<()> {
        let present = |v: Option<&str>| v.is_some_and(|s| !s.trim().is_empty());
        if present(a) && present(b) {
            return Err(ConfigError::ValidationError(format!(
                "Cannot specify both {} and {}. Only one can be used at a time.",
                fields.0, fields.1
            )));
        }
        Ok(())
    }
}
