use murmur_config::{LoggingConfig, MAX_PAGE_SIZE};
use murmur_error::{AppError, AppResult};
use murmur_types::{Page, PrincipalId};
use sha2::{Digest, Sha256};

/// Creates a truncated, salted hash of an identifier for safe logging.
///
/// # Arguments
/// * `id` - The identifier to hash (e.g., user_id).
/// * `salt` - A salt value from the application's configuration.
///
/// # Returns
/// A short, hexadecimal string representing the salted hash.
pub fn log_safe_id(id: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(id.as_bytes());
    let hash = hasher.finalize();

    hash[..4]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
}

/// Principal id as it should appear in logs: raw when identifiers are
/// enabled, otherwise the salted hash
pub fn principal_label(principal: &PrincipalId, logging: &LoggingConfig) -> String {
    if logging.enable_user_identifiers {
        principal.to_string()
    } else {
        log_safe_id(&principal.to_string(), &logging.hash_salt)
    }
}

/// Trim and bound user-supplied text. Empty (after trim) or over-long
/// content is rejected.
pub fn validate_content(what: &str, content: &str, max_chars: usize) -> AppResult<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{} cannot be empty", what)));
    }
    if trimmed.chars().count() > max_chars {
        return Err(AppError::validation(format!(
            "{} exceeds {} characters",
            what, max_chars
        )));
    }
    Ok(trimmed.to_string())
}

/// Cap a caller-supplied page at the maximum page size
pub fn clamp_page(page: Page) -> Page {
    Page::new(page.page, page.limit.min(MAX_PAGE_SIZE))
}
