/// Display formatting for byte counts and timestamps.
///
/// Sizes are `u64` bytes everywhere inside the engine; floating point only
/// appears here, at the formatting boundary.
use chrono::{DateTime, Utc};

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count with binary units (1 KB = 1024 B).
///
/// One decimal place up to GB, two beyond — small sizes don't need fake
/// precision, terabyte drives do.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit >= 3 {
        format!("{value:.2} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Render a stored unix-nanosecond mtime as a UTC timestamp string.
/// Out-of-range values (clamped or corrupt) render as a dash.
pub fn format_mtime(nanos: i64) -> String {
    match DateTime::<Utc>::from_timestamp(
        nanos.div_euclid(1_000_000_000),
        nanos.rem_euclid(1_000_000_000) as u32,
    ) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1_048_576), "1.0 MB");
        assert_eq!(format_size(1_073_741_824), "1.00 GB");
        assert_eq!(format_size(1_099_511_627_776), "1.00 TB");
    }

    #[test]
    fn test_format_mtime() {
        // 2023-11-14 22:13:20 UTC
        assert_eq!(format_mtime(1_700_000_000_000_000_000), "2023-11-14 22:13:20");
    }
}
