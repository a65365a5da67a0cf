use std::time::Duration;

use crate::errors::Result;
use crate::io_common::parse_number;

/// Turns a millisecond count, as stored in the result files, into `HH:MM:SS.mmm`.
///
/// An empty string means "no value" (a driver without a valid lap, for
/// instance) and is returned unchanged. Hours do not wrap around.
pub fn format_milliseconds(milliseconds: &str) -> Result<String> {
    if milliseconds.is_empty() {
        return Ok(String::new());
    }
    let ms = parse_number("milliseconds", milliseconds)?;
    Ok(format_duration(Duration::from_millis(ms)))
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        d.subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn formats_clock_values() {
        assert_eq!(format_milliseconds("0").unwrap(), "00:00:00.000");
        assert_eq!(format_milliseconds("3661001").unwrap(), "01:01:01.001");
        assert_eq!(format_milliseconds("62000").unwrap(), "00:01:02.000");
        assert_eq!(format_milliseconds("").unwrap(), "");
    }

    #[test]
    fn hours_do_not_wrap() {
        // 100 hours, 59 seconds, 999 ms
        assert_eq!(format_milliseconds("360059999").unwrap(), "100:00:59.999");
    }

    #[test]
    fn rejects_garbage() {
        let e = format_milliseconds("1:02.3").unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Malformed);
        assert!(format_milliseconds("-5").is_err());
    }
}
