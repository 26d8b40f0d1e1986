use chrono::{DateTime, Local};

/// Placeholder for a missing value
pub const MISSING: &str = "—";

/// Locale-style number: at most `max_digits` fraction digits, trailing zeros
/// trimmed, thousands grouped with commas.
pub fn number(value: Option<f64>, max_digits: usize) -> String {
    let Some(v) = value.filter(|v| !v.is_nan()) else {
        return MISSING.to_string();
    };
    if v.is_infinite() {
        return if v > 0.0 { "∞".to_string() } else { "-∞".to_string() };
    }

    let fixed = format!("{:.*}", max_digits, v.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (fixed.as_str(), ""),
    };

    let mut out = String::with_capacity(fixed.len() + 4);
    let is_zero = int_part.bytes().all(|b| b == b'0') && frac_part.is_empty();
    if v < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Unix seconds as local `YYYY-MM-DD HH:MM:SS`
pub fn local_time(timestamp: Option<f64>) -> String {
    timestamp
        .and_then(to_datetime)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

fn to_datetime(timestamp: f64) -> Option<DateTime<chrono::Utc>> {
    if !timestamp.is_finite() {
        return None;
    }
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9) as u32;
    DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
}

/// Raw timestamp as received, without a trailing `.0`
pub fn timestamp(timestamp: Option<f64>) -> String {
    match timestamp {
        Some(ts) if ts.is_finite() && ts.fract() == 0.0 => format!("{}", ts as i64),
        Some(ts) if ts.is_finite() => ts.to_string(),
        _ => MISSING.to_string(),
    }
}

/// Altitude delta in km with sign and three decimals
pub fn delta_km(delta: Option<f64>) -> String {
    match delta {
        Some(d) if d.is_finite() => format!("{:+.3} km", d),
        _ => MISSING.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_trims_and_groups() {
        assert_eq!(number(Some(27_580.456), 1), "27,580.5");
        assert_eq!(number(Some(51.6), 4), "51.6");
        assert_eq!(number(Some(420.0), 2), "420");
        assert_eq!(number(Some(1_234_567.0), 0), "1,234,567");
        assert_eq!(number(Some(999.9996), 3), "1,000");
    }

    #[test]
    fn test_number_negative() {
        assert_eq!(number(Some(-12.34567), 4), "-12.3457");
        assert_eq!(number(Some(-1234.5), 1), "-1,234.5");
        assert_eq!(number(Some(-0.00001), 2), "0");
    }

    #[test]
    fn test_number_missing() {
        assert_eq!(number(None, 2), "—");
        assert_eq!(number(Some(f64::NAN), 2), "—");
    }

    #[test]
    fn test_timestamp() {
        assert_eq!(timestamp(Some(1_700_000_000.0)), "1700000000");
        assert_eq!(timestamp(Some(1.5)), "1.5");
        assert_eq!(timestamp(None), "—");
    }

    #[test]
    fn test_local_time() {
        assert_eq!(local_time(None), "—");
        assert_eq!(local_time(Some(f64::NAN)), "—");
        // Shape only, the zone depends on the machine
        let rendered = local_time(Some(1_700_000_000.0));
        assert_eq!(rendered.len(), 19);
        assert_eq!(&rendered[4..5], "-");
        assert_eq!(&rendered[13..14], ":");
    }

    #[test]
    fn test_delta_km() {
        assert_eq!(delta_km(Some(0.0123)), "+0.012 km");
        assert_eq!(delta_km(Some(-0.5)), "-0.500 km");
        assert_eq!(delta_km(None), "—");
    }
}
