//! Wall-clock timecode reported with recording confirmations

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Frame rate the confirmation timecode is expressed in
const TIMECODE_FPS: u32 = 30;

/// Current time of day as an `HH:MM:SS:FF` timecode (UTC, 30 fps)
pub fn now() -> String {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    format_timecode(since_epoch)
}

/// Format a duration since midnight (or the epoch) as `HH:MM:SS:FF`
pub fn format_timecode(elapsed: Duration) -> String {
    let seconds_of_day = elapsed.as_secs() % 86_400;
    let hours = seconds_of_day / 3600;
    let minutes = (seconds_of_day % 3600) / 60;
    let seconds = seconds_of_day % 60;
    let frames = elapsed.subsec_millis() * TIMECODE_FPS / 1000;
    format!("{:02}:{:02}:{:02}:{:02}", hours, minutes, seconds, frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(Duration::ZERO), "00:00:00:00");
        assert_eq!(
            format_timecode(Duration::from_millis(3_661_500)),
            "01:01:01:15"
        );
        // 999 ms lands on the last frame, never frame 30
        assert_eq!(format_timecode(Duration::from_millis(999)), "00:00:00:29");
    }

    #[test]
    fn test_format_wraps_at_midnight() {
        let day_and_a_second = Duration::from_secs(86_400 + 1);
        assert_eq!(format_timecode(day_and_a_second), "00:00:01:00");
    }

    #[test]
    fn test_now_shape() {
        let timecode = now();
        assert_eq!(timecode.len(), 11);
        assert!(timecode.chars().enumerate().all(|(i, c)| {
            if i % 3 == 2 { c == ':' } else { c.is_ascii_digit() }
        }));
    }
}
