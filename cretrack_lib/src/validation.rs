use crate::error::CreTrackerError;

pub const MAX_SEARCH_LENGTH: usize = 100;
pub const MAX_PAGE_SIZE: usize = 100;

/// Strip ASCII control characters (0x00-0x1F except space 0x20), trim whitespace,
/// and enforce a byte-length limit.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, CreTrackerError> {
    if input.len() > max_len {
        return Err(CreTrackerError::InvalidInput(format!(
            "input exceeds maximum length of {} bytes",
            max_len
        )));
    }
    let sanitized: String = input
        .chars()
        .filter(|c| !c.is_ascii_control() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized.is_empty() {
        return Err(CreTrackerError::InvalidInput(
            "input is empty after sanitization".to_string(),
        ));
    }
    Ok(sanitized)
}

/// Validate a search string: enforce length, strip control chars, trim.
pub fn validate_search(input: &str) -> Result<String, CreTrackerError> {
    sanitize_text(input, MAX_SEARCH_LENGTH)
}

/// Validate a 1-based page number.
pub fn validate_page(page: usize) -> Result<usize, CreTrackerError> {
    if page < 1 {
        return Err(CreTrackerError::InvalidInput(
            "page must be >= 1".to_string(),
        ));
    }
    Ok(page)
}

/// Validate page size (must be 1..=100).
pub fn validate_page_size(page_size: usize) -> Result<usize, CreTrackerError> {
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(CreTrackerError::InvalidInput(format!(
            "page_size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok(page_size)
}
