//! Integration tests for password strength validation.

use credvault::vault::validate_password;
use credvault::VaultError;

fn reason(password: &str) -> String {
    match validate_password(password) {
        Err(VaultError::WeakPassword(reason)) => reason,
        other => panic!("expected WeakPassword for {password:?}, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Accepted passwords
// ---------------------------------------------------------------------------

#[test]
fn strong_passwords_accepted() {
    for pw in [
        "Str0ngPass!",
        "TestPass123",
        "correct-Horse-7",
        "Abcdef1!",
        "xK9#mPl2qR",
    ] {
        assert!(validate_password(pw).is_ok(), "{pw:?} should be accepted");
    }
}

#[test]
fn exactly_eight_characters_accepted() {
    assert!(validate_password("Abcdef12").is_ok());
}

// ---------------------------------------------------------------------------
// Rejected passwords, with the specific reason
// ---------------------------------------------------------------------------

#[test]
fn empty_password_rejected() {
    assert!(reason("").contains("empty"));
    assert!(reason("   \t  ").contains("empty"));
}

#[test]
fn short_password_rejected_on_length() {
    assert!(reason("Abc1!").contains("at least 8"));
    // Seven characters, even with every class present.
    assert!(reason("Abcde1!").contains("at least 8"));
}

#[test]
fn all_numeric_password_rejected() {
    assert!(reason("12345678").contains("all numbers"));
    assert!(reason("123456789012").contains("all numbers"));
}

#[test]
fn common_passwords_rejected_case_insensitively() {
    assert!(reason("password1").contains("too common"));
    assert!(reason("Password123").contains("too common"));
    assert!(reason("QWERTY123").contains("too common"));
}

#[test]
fn too_few_character_classes_rejected() {
    // Only lowercase.
    assert!(reason("justlowercase").contains("at least 3"));
    // Lowercase plus digits is still only two classes.
    assert!(reason("lower123nums").contains("at least 3"));
    // Uppercase plus lowercase.
    assert!(reason("OnlyLetters").contains("at least 3"));
}

#[test]
fn surrounding_whitespace_is_ignored() {
    // Trimmed form is what gets validated.
    assert!(validate_password("  Str0ngPass!  ").is_ok());
    assert!(reason("  1234567890  ").contains("all numbers"));
}
