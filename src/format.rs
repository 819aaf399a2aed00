//! Display formatting for the dashboard views.

/// Pace seconds as `m:ss` (fractional seconds are dropped)
pub fn fmt_pace_sec(total_sec: f64) -> String {
    let total = total_sec.max(0.0);
    let m = (total / 60.0).floor() as i64;
    let s = (total % 60.0).floor() as i64;
    format!("{}:{:02}", m, s)
}

/// Duration seconds as `h:mm:ss`, collapsed to `m:ss` under an hour
pub fn fmt_hhmmss(total_sec: f64) -> String {
    let total = total_sec.max(0.0);
    let h = (total / 3600.0).floor() as i64;
    let m = ((total % 3600.0) / 60.0).floor() as i64;
    let s = (total % 60.0).floor() as i64;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Convert a 24h `HH:MM` label to `h:MM AM/PM`.
///
/// Empty input yields `None`; an unparsable hour is returned unchanged.
pub fn to_12h(hhmm: Option<&str>) -> Option<String> {
    let value = hhmm.filter(|s| !s.is_empty())?;
    let (hour_str, minute_str) = value.split_once(':').unwrap_or((value, ""));

    // An empty hour reads as midnight
    let hour: u32 = match hour_str.trim() {
        "" => 0,
        h => match h.parse() {
            Ok(h) => h,
            Err(_) => return Some(value.to_string()),
        },
    };

    let meridiem = if hour >= 12 { "PM" } else { "AM" };
    let hour12 = if hour % 12 == 0 { 12 } else { hour % 12 };
    Some(format!("{}:{} {}", hour12, minute_str, meridiem))
}

/// Miles with two decimals, e.g. `12.50 mi`
pub fn fmt_miles(miles: f64) -> String {
    format!("{:.2} mi", miles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_pace_sec() {
        assert_eq!(fmt_pace_sec(0.0), "0:00");
        assert_eq!(fmt_pace_sec(65.0), "1:05");
        assert_eq!(fmt_pace_sec(600.0), "10:00");
        assert_eq!(fmt_pace_sec(431.9), "7:11");
    }

    #[test]
    fn test_fmt_hhmmss_collapses_hours() {
        assert_eq!(fmt_hhmmss(59.0), "0:59");
        assert_eq!(fmt_hhmmss(61.0), "1:01");
        assert_eq!(fmt_hhmmss(3661.0), "1:01:01");
    }

    #[test]
    fn test_to_12h() {
        assert_eq!(to_12h(Some("00:15")).as_deref(), Some("12:15 AM"));
        assert_eq!(to_12h(Some("12:30")).as_deref(), Some("12:30 PM"));
        assert_eq!(to_12h(Some("18:45")).as_deref(), Some("6:45 PM"));
        assert_eq!(to_12h(Some("xx:45")).as_deref(), Some("xx:45"));
        assert_eq!(to_12h(Some(":30")).as_deref(), Some("12:30 AM"));
        assert_eq!(to_12h(Some("")), None);
        assert_eq!(to_12h(None), None);
    }

    #[test]
    fn test_fmt_miles() {
        assert_eq!(fmt_miles(12.5), "12.50 mi");
    }
}
