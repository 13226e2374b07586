//! String canonicalization shared by every stage of the ingestion pipeline.
//!
//! Two concerns live here: turning free-text names and column headers into
//! comparison keys, and scrubbing raw CSV cells of the artifacts left behind
//! by spreadsheet exports (NUL bytes from UTF-16 files, stray quoting).

/// Canonical comparison key for a name: ASCII letters and digits only, lowercased.
///
/// Total and idempotent; an empty or symbol-only input yields an empty key.
pub fn normalize_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Canonical form of a column header, used for dictionary and marker lookups.
pub fn normalize_header(raw: &str) -> String {
    normalize_name(raw)
}

/// Clean a raw CSV cell: drop embedded NULs, strip one layer of surrounding
/// double quotes, trim whitespace.
pub fn clean_cell(raw: &str) -> String {
    let without_nul: String = raw.chars().filter(|c| *c != '\u{0000}').collect();
    let trimmed = without_nul.trim();
    let unquoted = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let unquoted = unquoted.strip_suffix('"').unwrap_or(unquoted);
    unquoted.trim().to_string()
}

/// Case-insensitive exact comparison of two display names (surrounding whitespace ignored).
pub fn same_name_ignore_case(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
