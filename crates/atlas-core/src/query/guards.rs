//! Shared guardrails for query input bounds.

pub const MAX_QUERY_LENGTH: usize = 512;
pub const DEFAULT_TOP_FILES: usize = 5;
pub const MAX_TOP_FILES: usize = 50;

pub fn clamp_int(value: usize, minimum: usize, maximum: usize) -> usize {
    value.max(minimum).min(maximum)
}

pub fn clamp_limit(value: usize, maximum: usize) -> usize {
    clamp_int(value, 1, maximum)
}

/// Trim surrounding whitespace and cap the query at `MAX_QUERY_LENGTH`
/// bytes without splitting a character.
pub fn truncate_query(query: &str) -> String {
    let stripped = query.trim();
    if stripped.len() <= MAX_QUERY_LENGTH {
        return stripped.to_string();
    }
    let mut end = MAX_QUERY_LENGTH;
    while !stripped.is_char_boundary(end) {
        end -= 1;
    }
    stripped[..end].to_string()
}
