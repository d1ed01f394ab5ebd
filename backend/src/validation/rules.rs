//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Validates a display name.
///
/// Requirements:
/// - 1-100 characters after trimming
/// - No control characters
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 100 {
        return Err(with_message(
            "display_name_invalid_length",
            "must be 1-100 characters",
        ));
    }

    if trimmed.chars().any(char::is_control) {
        return Err(with_message(
            "display_name_invalid_characters",
            "must not contain control characters",
        ));
    }

    Ok(())
}

/// Validates an organization identifier supplied by the client.
pub fn validate_org_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > 64 {
        return Err(with_message("org_id_invalid_length", "must be 1-64 characters"));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(with_message(
            "org_id_invalid_characters",
            "may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

fn with_message(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}
