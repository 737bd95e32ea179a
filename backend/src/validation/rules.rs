//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Validates password strength.
///
/// Requirements:
/// - At least 8 characters
/// - At least one uppercase letter
/// - At least one lowercase letter
/// - At least one digit
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.len() < 8 {
        return Err(ValidationError::new("password_too_short"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::new("password_missing_uppercase"));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ValidationError::new("password_missing_lowercase"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("password_missing_digit"));
    }
    Ok(())
}

/// Validates the optional display handle.
///
/// Requirements:
/// - Only alphanumeric characters and underscores
/// - 3-50 characters in length
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.len() < 3 || username.len() > 50 {
        return Err(ValidationError::new("username_invalid_length"));
    }

    if !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ValidationError::new("username_invalid_characters"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_rejects_too_short() {
        assert!(validate_password_strength("Ab1").is_err());
    }

    #[test]
    fn password_rejects_missing_uppercase() {
        assert!(validate_password_strength("lowercase1only").is_err());
    }

    #[test]
    fn password_rejects_missing_lowercase() {
        assert!(validate_password_strength("UPPERCASE1ONLY").is_err());
    }

    #[test]
    fn password_rejects_missing_digit() {
        assert!(validate_password_strength("NoDigitsHere").is_err());
    }

    #[test]
    fn password_accepts_valid() {
        assert!(validate_password_strength("Sturdy1Password").is_ok());
    }

    #[test]
    fn username_rejects_too_short() {
        assert!(validate_username("ab").is_err());
    }

    #[test]
    fn username_rejects_special_chars() {
        assert!(validate_username("user@name").is_err());
    }

    #[test]
    fn username_accepts_valid() {
        assert!(validate_username("valid_user123").is_ok());
    }
}
