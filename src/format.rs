//! Human-readable formatting helpers.

const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

/// Formats a byte count with binary prefixes, dropping trailing zeros.
///
/// ```
/// use putsync::format_size;
///
/// assert_eq!(format_size(1536), "1.5 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;
    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    let number = format!("{:.2}", size);
    let number = number.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", number, UNITS[unit_index])
}
