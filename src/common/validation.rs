// src/common/validation.rs

use std::borrow::Cow;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use validator::{ValidationError, ValidationErrors};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const MAX_BRAND_OR_MODEL_LEN: usize = 100;

/// Builds a `ValidationError` carrying a human-readable message.
pub fn violation(code: &'static str, message: impl Into<String>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Owned(message.into()));
    err
}

/// Turns an accumulated error set into a `Result`.
pub fn into_result(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), DATE_TIME_FORMAT).ok()
}

// ---
// Custom validator functions
// ---

pub fn validate_email_shape(email: &str) -> Result<(), ValidationError> {
    if !email.contains('@') {
        return Err(violation("email", "The email must contain '@'."));
    }
    Ok(())
}

pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 8 {
        return Err(violation("password_length", "The password must be at least 8 characters long."));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(violation("password_uppercase", "The password must contain an uppercase letter."));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(violation("password_digit", "The password must contain a digit."));
    }
    Ok(())
}

pub fn validate_iso_date(value: &str) -> Result<(), ValidationError> {
    match parse_date(value) {
        Some(_) => Ok(()),
        None => Err(violation("date_format", format!("'{value}' is not a YYYY-MM-DD date."))),
    }
}

pub fn validate_date_time(value: &str) -> Result<(), ValidationError> {
    match parse_date_time(value) {
        Some(_) => Ok(()),
        None => Err(violation(
            "date_time_format",
            format!("'{value}' is not a YYYY-MM-DD HH:MM:SS timestamp."),
        )),
    }
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(violation("blank", "The value must not be blank."));
    }
    Ok(())
}

/// Brand and model strings: non-blank and at most 100 characters.
pub fn validate_brand_or_model(value: &str) -> Result<(), ValidationError> {
    validate_not_blank(value)?;
    if value.chars().count() > MAX_BRAND_OR_MODEL_LEN {
        return Err(violation(
            "too_long",
            format!("The value must be at most {MAX_BRAND_OR_MODEL_LEN} characters."),
        ));
    }
    Ok(())
}

pub fn validate_non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        return Err(violation("negative", "The amount cannot be negative."));
    }
    Ok(())
}

pub fn validate_digits(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(violation("digits", "The value must contain only digits."));
    }
    Ok(())
}

/// Object storage file names: a single path segment.
pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
    validate_not_blank(name)?;
    if name.len() > 255 || name.contains('/') || name.contains("..") {
        return Err(violation(
            "file_name",
            "The file name must be a single path segment of at most 255 characters.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_rules_are_checked_in_order() {
        assert!(validate_password_strength("HelloWorld123").is_ok());
        assert_eq!(
            validate_password_strength("Hw1").unwrap_err().code,
            "password_length"
        );
        assert_eq!(
            validate_password_strength("helloworld123").unwrap_err().code,
            "password_uppercase"
        );
        assert_eq!(
            validate_password_strength("HelloWorld").unwrap_err().code,
            "password_digit"
        );
    }

    #[test]
    fn iso_dates_only() {
        assert_eq!(parse_date("2025-06-15"), NaiveDate::from_ymd_opt(2025, 6, 15));
        assert!(parse_date("06/15/2025").is_none());
        assert!(validate_iso_date("06/15/2025").is_err());
    }

    #[test]
    fn date_time_requires_seconds() {
        assert!(parse_date_time("2030-01-01 00:00:00").is_some());
        assert!(parse_date_time("2030-01-01").is_none());
    }

    #[test]
    fn brand_and_model_bounds() {
        assert!(validate_brand_or_model("GE").is_ok());
        assert!(validate_brand_or_model("   ").is_err());
        assert!(validate_brand_or_model(&"x".repeat(101)).is_err());
        assert!(validate_brand_or_model(&"x".repeat(100)).is_ok());
    }

    #[test]
    fn file_names_cannot_escape_their_prefix() {
        assert!(validate_file_name("kitchen.jpg").is_ok());
        assert!(validate_file_name("../secret").is_err());
        assert!(validate_file_name("a/b.jpg").is_err());
        assert!(validate_file_name("").is_err());
    }
}
