//! Input validation: structural checks run before any state is touched.

use crate::contract::NewContract;
use crate::error::ValidationError;
use crate::party::NewParty;
use crate::types::Timestamp;

/// Maximum length of a contract title.
pub const MAX_TITLE_LEN: usize = 255;

/// Maximum length of a party name.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of a file name.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// Validate input for a new contract.
///
/// This performs:
/// - Title presence and length
/// - Expiry not before creation
pub fn validate_new_contract(input: &NewContract, now: Timestamp) -> Result<(), ValidationError> {
    // 1. Title
    let title = input.title.trim();
    if title.is_empty() {
        return Err(ValidationError::Required { field: "title" });
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(ValidationError::TooLong {
            field: "title",
            len: title.len(),
            max: MAX_TITLE_LEN,
        });
    }

    // 2. Expiry
    if let Some(expires_at) = input.expires_at {
        validate_expiry(expires_at, now)?;
    }

    Ok(())
}

/// An expiry must not precede the contract's creation.
pub fn validate_expiry(expires_at: Timestamp, created_at: Timestamp) -> Result<(), ValidationError> {
    if expires_at < created_at {
        return Err(ValidationError::ExpiryBeforeCreation {
            expires_at,
            created_at,
        });
    }
    Ok(())
}

/// Validate a patched title. Empty titles are treated as absent by the patch.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.len() > MAX_TITLE_LEN {
        return Err(ValidationError::TooLong {
            field: "title",
            len: title.len(),
            max: MAX_TITLE_LEN,
        });
    }
    Ok(())
}

/// Validate input for a new party.
///
/// This performs:
/// - Name presence and length
/// - Email shape (one `@`, non-empty local and domain parts)
/// - Mobile shape (optional leading `+`, 7 to 15 digits)
pub fn validate_new_party(input: &NewParty) -> Result<(), ValidationError> {
    // 1. Name
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required { field: "name" });
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name",
            len: name.len(),
            max: MAX_NAME_LEN,
        });
    }

    // 2. Email
    if let Some(email) = input.email.as_deref().filter(|e| !e.is_empty()) {
        if !is_plausible_email(email) {
            return Err(ValidationError::InvalidEmail(email.to_string()));
        }
    }

    // 3. Mobile
    if let Some(mobile) = input.mobile.as_deref().filter(|m| !m.is_empty()) {
        if !is_plausible_mobile(mobile) {
            return Err(ValidationError::InvalidMobile(mobile.to_string()));
        }
    }

    Ok(())
}

/// Validate an uploaded file name: one non-empty path segment.
pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
    let invalid = name.is_empty()
        || name.len() > MAX_FILE_NAME_LEN
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || name == "."
        || name.contains("..");
    if invalid {
        return Err(ValidationError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

/// Validate an uploaded file's size.
pub fn validate_file_size(size: usize, max: usize) -> Result<(), ValidationError> {
    if size == 0 {
        return Err(ValidationError::EmptyFile);
    }
    if size > max {
        return Err(ValidationError::FileTooLarge { size, max });
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

fn is_plausible_mobile(mobile: &str) -> bool {
    let digits = mobile.strip_prefix('+').unwrap_or(mobile);
    (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_requires_title() {
        let err = validate_new_contract(&NewContract::titled("   "), 0).unwrap_err();
        assert_eq!(err, ValidationError::Required { field: "title" });
    }

    #[test]
    fn test_contract_title_too_long() {
        let input = NewContract::titled("x".repeat(MAX_TITLE_LEN + 1));
        assert!(matches!(
            validate_new_contract(&input, 0),
            Err(ValidationError::TooLong { field: "title", .. })
        ));
    }

    #[test]
    fn test_contract_expiry_in_past() {
        let input = NewContract::titled("NDA").expires_at(99);
        assert!(matches!(
            validate_new_contract(&input, 100),
            Err(ValidationError::ExpiryBeforeCreation { .. })
        ));
        assert!(validate_new_contract(&NewContract::titled("NDA").expires_at(100), 100).is_ok());
    }

    #[test]
    fn test_party_requires_name() {
        let err = validate_new_party(&NewParty::named("")).unwrap_err();
        assert_eq!(err, ValidationError::Required { field: "name" });
    }

    #[test]
    fn test_party_email_shape() {
        assert!(validate_new_party(&NewParty::named("A").email("a@firm.law")).is_ok());
        assert!(validate_new_party(&NewParty::named("A").email("a@@firm")).is_err());
        assert!(validate_new_party(&NewParty::named("A").email("@firm")).is_err());
        assert!(validate_new_party(&NewParty::named("A").email("a b@firm")).is_err());
        // Empty contact fields are treated as absent.
        assert!(validate_new_party(&NewParty::named("A").email("")).is_ok());
    }

    #[test]
    fn test_party_mobile_shape() {
        assert!(validate_new_party(&NewParty::named("A").mobile("+919876543210")).is_ok());
        assert!(validate_new_party(&NewParty::named("A").mobile("12345")).is_err());
        assert!(validate_new_party(&NewParty::named("A").mobile("98765-43210")).is_err());
    }

    #[test]
    fn test_file_name_rules() {
        assert!(validate_file_name("nda-v2.pdf").is_ok());
        assert!(validate_file_name("").is_err());
        assert!(validate_file_name("../secret").is_err());
        assert!(validate_file_name("a/b.pdf").is_err());
        assert!(validate_file_name("a\\b.pdf").is_err());
    }

    #[test]
    fn test_file_size_rules() {
        assert_eq!(validate_file_size(0, 10), Err(ValidationError::EmptyFile));
        assert!(validate_file_size(10, 10).is_ok());
        assert!(matches!(
            validate_file_size(11, 10),
            Err(ValidationError::FileTooLarge { size: 11, max: 10 })
        ));
    }
}
