use chrono::{DateTime, SubsecRound, Utc};

/// Current time, truncated to milliseconds so values survive a round trip
/// through SQLite text columns unchanged.
pub fn get_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Generate an opaque record id
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Sanitize string for database (remove null bytes, trim)
pub fn sanitize_string(input: &str) -> String {
    input.replace('\0', "").trim().to_string()
}

/// Sanitize an optional field, mapping blank input to `None`
pub fn sanitize_optional(input: Option<&str>) -> Option<String> {
    input.map(sanitize_string).filter(|s| !s.is_empty())
}
