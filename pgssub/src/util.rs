//! Miscellaneous utilities.

use std::fmt;

/// Wrapper to force a `&[u8]` to display as nicely-formatted hexadecimal
/// bytes with only the the first line or so of bytes shown.
pub struct BytesFormatter<'a>(pub &'a [u8]);

impl<'a> fmt::Debug for BytesFormatter<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let BytesFormatter(bytes) = *self;
        for byte in bytes.iter().take(16) {
            write!(f, "{:02x} ", byte)?;
        }
        write!(f, "({} bytes)", bytes.len())?;
        Ok(())
    }
}

/// Format a time in milliseconds the way SRT files want it:
/// `HH:MM:SS,mmm`.
pub fn srt_time(ms: u32) -> String {
    let h = ms / 3_600_000;
    let m = (ms / 60_000) % 60;
    let s = (ms / 1000) % 60;
    let ms = ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

#[test]
fn bytes_formatter_truncates_long_input() {
    let bytes = (0..20).collect::<Vec<u8>>();
    let out = format!("{:?}", BytesFormatter(&bytes));
    assert!(out.starts_with("00 01 02 "));
    assert!(out.ends_with("0f (20 bytes)"));
}

#[test]
fn srt_time_formats_hours_minutes_and_millis() {
    assert_eq!(srt_time(0), "00:00:00,000");
    assert_eq!(srt_time(3_723_004), "01:02:03,004");
}
