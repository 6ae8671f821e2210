use bigdecimal::BigDecimal;
use std::fmt;

use crate::domain::{InquiryType, PaymentStatus, TransactionStatus, TransactionType};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;
pub const MESSAGE_MAX_LEN: usize = 4000;
pub const SUBJECT_MAX_LEN: usize = 200;
pub const REVIEW_MAX_LEN: usize = 2000;
pub const REASON_MAX_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_enum(field: &'static str, value: &str, allowed: &[&str]) -> ValidationResult {
    if allowed.iter().all(|candidate| value != *candidate) {
        return Err(ValidationError::new(
            field,
            format!("must be one of: {}", allowed.join(", ")),
        ));
    }

    Ok(())
}

/// Resolves `value` to the member of `all` whose wire name matches it.
fn parse_member<T: Copy>(
    field: &'static str,
    value: &str,
    all: &[T],
    name: fn(&T) -> &'static str,
) -> Result<T, ValidationError> {
    let value = value.trim();
    let names: Vec<&str> = all.iter().map(name).collect();
    validate_enum(field, value, &names)?;

    all.iter()
        .copied()
        .find(|candidate| name(candidate) == value)
        .ok_or_else(|| ValidationError::new(field, "unknown value"))
}

pub fn parse_transaction_status(value: &str) -> Result<TransactionStatus, ValidationError> {
    parse_member("status", value, &TransactionStatus::ALL, TransactionStatus::as_str)
}

pub fn parse_payment_status(value: &str) -> Result<PaymentStatus, ValidationError> {
    parse_member(
        "payment_status",
        value,
        &PaymentStatus::ALL,
        PaymentStatus::as_str,
    )
}

pub fn parse_transaction_type(value: &str) -> Result<TransactionType, ValidationError> {
    parse_member(
        "transaction_type",
        value,
        &TransactionType::ALL,
        TransactionType::as_str,
    )
}

pub fn parse_inquiry_type(value: &str) -> Result<InquiryType, ValidationError> {
    parse_member("inquiry_type", value, &InquiryType::ALL, InquiryType::as_str)
}

pub fn validate_rating(rating: i32) -> ValidationResult {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ValidationError::new(
            "rating",
            format!("must be between {} and {}", MIN_RATING, MAX_RATING),
        ));
    }

    Ok(())
}

pub fn validate_quantity(quantity: i32) -> ValidationResult {
    if quantity < 1 {
        return Err(ValidationError::new("quantity", "must be at least 1"));
    }

    Ok(())
}

pub fn validate_non_negative_amount(field: &'static str, amount: &BigDecimal) -> ValidationResult {
    if amount < &BigDecimal::from(0) {
        return Err(ValidationError::new(field, "must not be negative"));
    }

    Ok(())
}

/// Sanitizes free text and enforces presence and length.
pub fn clean_text(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<String, ValidationError> {
    let cleaned = sanitize_string(value);
    validate_required(field, &cleaned)?;
    validate_max_len(field, &cleaned, max_len)?;
    Ok(cleaned)
}

/// Like [`clean_text`] but maps blank input to `None`.
pub fn clean_optional_text(
    field: &'static str,
    value: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(sanitize_string) {
        Some(cleaned) if !cleaned.is_empty() => {
            validate_max_len(field, &cleaned, max_len)?;
            Ok(Some(cleaned))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn validates_required_field() {
        assert!(validate_required("field", "value").is_ok());
        assert!(validate_required("field", "   ").is_err());
    }

    #[test]
    fn validates_max_len() {
        assert!(validate_max_len("field", "abc", 3).is_ok());
        assert!(validate_max_len("field", "abcd", 3).is_err());
        assert!(validate_max_len("field", "ñandú", 5).is_ok());
    }

    #[test]
    fn validates_enum_values() {
        assert!(validate_enum("status", "pending", &["pending", "completed"]).is_ok());
        assert!(validate_enum("status", "unknown", &["pending", "completed"]).is_err());
    }

    #[test]
    fn sanitizes_string() {
        assert_eq!(sanitize_string("  hello\tworld  "), "hello world");
        assert_eq!(sanitize_string("single"), "single");
        assert_eq!(sanitize_string(" \n "), "");
        assert_eq!(sanitize_string("ab\u{0000}cd\u{0007}"), "abcd");
    }

    #[test]
    fn parses_every_status() {
        for status in TransactionStatus::ALL {
            assert_eq!(parse_transaction_status(status.as_str()), Ok(status));
        }
        assert_eq!(
            parse_transaction_status(" in_progress "),
            Ok(TransactionStatus::InProgress)
        );
        assert!(parse_transaction_status("shipped").is_err());
        assert!(parse_transaction_status("Pending").is_err());
    }

    #[test]
    fn parses_payment_status() {
        assert_eq!(parse_payment_status("partial"), Ok(PaymentStatus::Partial));
        let err = parse_payment_status("paid").unwrap_err();
        assert_eq!(err.field, "payment_status");
        assert!(err.message.contains("refunded"));
    }

    #[test]
    fn parses_inquiry_and_transaction_types() {
        assert_eq!(parse_inquiry_type("availability"), Ok(InquiryType::Availability));
        assert!(parse_inquiry_type("complaint").is_err());
        assert_eq!(parse_transaction_type("rental"), Ok(TransactionType::Rental));
        assert!(parse_transaction_type("barter").is_err());
    }

    #[test]
    fn validates_rating_bounds() {
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(6).is_err());
        assert!(validate_rating(-3).is_err());
    }

    #[test]
    fn validates_quantity_and_amounts() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());

        let zero = BigDecimal::from(0);
        let negative = BigDecimal::from_str("-0.01").expect("valid decimal");
        assert!(validate_non_negative_amount("price", &zero).is_ok());
        assert!(validate_non_negative_amount("price", &negative).is_err());
    }

    #[test]
    fn cleans_text() {
        assert_eq!(clean_text("message", "  hola \n che ", 100), Ok("hola che".to_string()));
        assert!(clean_text("message", " \t ", 100).is_err());
        assert_eq!(clean_optional_text("subject", Some("   "), 10), Ok(None));
        assert_eq!(clean_optional_text("subject", None, 10), Ok(None));
        assert!(clean_optional_text("subject", Some("a very long subject"), 10).is_err());
    }
}
