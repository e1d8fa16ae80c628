/// Input validation utilities
use once_cell::sync::Lazy;
use regex::Regex;

// Compiled once at startup; the pattern is a compile-time constant in practice.
static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_-]{3,32}$")
        .expect("hardcoded username regex is invalid - fix source code")
});

/// Post and comment bodies must contain visible text. Whitespace-only input
/// counts as empty.
pub fn validate_text(text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        Err("Text cannot be empty.".to_string())
    } else {
        Ok(())
    }
}

/// Validate username format (3-32 characters, alphanumeric with - and _)
pub fn validate_username(username: &str) -> bool {
    USERNAME_REGEX.is_match(username)
}

/// Minimum password length for registration
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn validate_password(password: &str) -> bool {
    password.len() >= MIN_PASSWORD_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_rejected() {
        assert!(validate_text("").is_err());
        assert!(validate_text("   \n\t").is_err());
        assert!(validate_text("hello").is_ok());
        assert!(validate_text("  x  ").is_ok());
    }

    #[test]
    fn username_shape() {
        assert!(validate_username("alice"));
        assert!(validate_username("a_b-c123"));
        assert!(!validate_username("ab")); // too short
        assert!(!validate_username("has space"));
        assert!(!validate_username("über"));
        assert!(!validate_username(&"x".repeat(33)));
    }

    #[test]
    fn password_length() {
        assert!(!validate_password("12345"));
        assert!(validate_password("123456"));
    }
}
