//! Error types shared across the harvest workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Errors raised while parsing or validating shared values
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Unknown license '{0}'. Expected one of: {known}", known = crate::types::License::known_list())]
    InvalidLicense(String),

    #[error("Invalid date window: from {from} is after to {to}")]
    InvalidWindow { from: String, to: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_bad_value() {
        let errors = [
            HarvestError::InvalidLicense("gpl".to_string()),
            HarvestError::InvalidWindow {
                from: "2016-02-07".to_string(),
                to: "2016-02-06".to_string(),
            },
        ];

        for err in &errors {
            let msg = err.to_string();
            match err {
                HarvestError::InvalidLicense(value) => {
                    assert!(msg.contains(value.as_str()));
                    assert!(msg.contains("cc-by"));
                }
                HarvestError::InvalidWindow { from, to } => {
                    assert!(msg.contains(from.as_str()));
                    assert!(msg.contains(to.as_str()));
                }
            }
        }
    }
}
