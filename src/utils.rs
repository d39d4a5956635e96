/// Generate a compact correlation ID (8 hex characters) from the first 4 bytes of a UUID v4.
///
/// Short enough to read in log lines, wide enough that concurrent sessions
/// do not collide in practice.
pub fn generate_correlation_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    format!(
        "{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}

/// Render bytes for a log line: lossy UTF-8 with control characters escaped.
pub fn printable(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).escape_debug().to_string()
}
