//! Password strength validation.
//!
//! Applied to any new or initial vault password. The rejection reasons
//! are part of the API contract: the settings UI surfaces them to the
//! user verbatim, so each check produces a specific human-readable
//! message rather than a bare boolean.

use crate::errors::{Result, VaultError};

/// Minimum password length after trimming.
const MIN_LENGTH: usize = 8;

/// How many of the four character classes (upper, lower, digit,
/// special) a password must contain.
const MIN_CHAR_CLASSES: usize = 3;

/// Extremely common passwords, rejected outright. Matched exactly,
/// case-insensitively, against the trimmed candidate.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "qwerty123",
    "admin123",
    "letmein123",
    "welcome123",
    "monkey123",
    "iloveyou1",
    "dragon123",
    "sunshine1",
    "princess1",
    "football1",
    "baseball1",
    "abc12345",
];

/// Validate a candidate vault password.
///
/// Checks, in order: non-empty after trimming, minimum length, not
/// entirely numeric, not a known common password, and at least three
/// of the four character classes. Returns [`VaultError::WeakPassword`]
/// with the first failing reason.
pub fn validate_password(password: &str) -> Result<()> {
    let trimmed = password.trim();

    if trimmed.is_empty() {
        return Err(VaultError::WeakPassword(
            "password cannot be empty".to_string(),
        ));
    }

    if trimmed.chars().count() < MIN_LENGTH {
        return Err(VaultError::WeakPassword(format!(
            "password must be at least {MIN_LENGTH} characters"
        )));
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(VaultError::WeakPassword(
            "password cannot be all numbers".to_string(),
        ));
    }

    let lowered = trimmed.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        return Err(VaultError::WeakPassword(
            "password is too common".to_string(),
        ));
    }

    let has_upper = trimmed.chars().any(|c| c.is_uppercase());
    let has_lower = trimmed.chars().any(|c| c.is_lowercase());
    let has_digit = trimmed.chars().any(|c| c.is_ascii_digit());
    let has_special = trimmed.chars().any(|c| !c.is_alphanumeric());

    let classes = [has_upper, has_lower, has_digit, has_special]
        .iter()
        .filter(|&&present| present)
        .count();

    if classes < MIN_CHAR_CLASSES {
        return Err(VaultError::WeakPassword(format!(
            "password must contain at least {MIN_CHAR_CLASSES} of: uppercase letters, \
             lowercase letters, numbers, special characters"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(password: &str) -> String {
        match validate_password(password) {
            Err(VaultError::WeakPassword(reason)) => reason,
            other => panic!("expected WeakPassword for {password:?}, got {other:?}"),
        }
    }

    #[test]
    fn strong_passwords_pass() {
        assert!(validate_password("TestPass123!").is_ok());
        assert!(validate_password("TestPass123").is_ok());
        assert!(validate_password("TestPass!").is_ok());
    }

    #[test]
    fn empty_and_whitespace_fail() {
        assert!(reason("").contains("empty"));
        assert!(reason("   ").contains("empty"));
    }

    #[test]
    fn short_password_fails_on_length() {
        assert!(reason("Short1!").contains("at least 8"));
    }

    #[test]
    fn all_numeric_fails_before_class_check() {
        assert!(reason("12345678").contains("all numbers"));
        assert!(reason("123456789").contains("all numbers"));
    }

    #[test]
    fn common_passwords_rejected() {
        for pwd in ["password123", "qwerty123", "admin123", "Password123"] {
            assert!(reason(pwd).contains("too common"), "{pwd}");
        }
    }

    #[test]
    fn two_character_classes_insufficient() {
        assert!(reason("testpass123").contains("at least 3 of"));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_first() {
        assert!(validate_password("  TestPass123!  ").is_ok());
    }
}
