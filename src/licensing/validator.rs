use crate::licensing::types::LicenseError;

/// Decides whether a license key may be stored.
///
/// Returns the normalized key to persist.
pub trait LicenseValidator: Send + Sync {
    fn validate(&self, key: &str) -> Result<String, LicenseError>;
}

/// Accepts any key that is non-empty after trimming whitespace.
///
/// No signature or server check happens here. A deployment that needs real
/// verification supplies its own `LicenseValidator`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonEmptyKeyValidator;

impl LicenseValidator for NonEmptyKeyValidator {
    fn validate(&self, key: &str) -> Result<String, LicenseError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(LicenseError::InvalidKey);
        }
        Ok(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_accepts() {
        let key = NonEmptyKeyValidator.validate("  LNGO-ABCD \n").unwrap();
        assert_eq!(key, "LNGO-ABCD");
    }

    #[test]
    fn test_rejects_blank() {
        assert!(matches!(NonEmptyKeyValidator.validate(""), Err(LicenseError::InvalidKey)));
        assert!(matches!(NonEmptyKeyValidator.validate(" \t "), Err(LicenseError::InvalidKey)));
    }
}
